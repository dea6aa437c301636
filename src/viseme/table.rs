//! Phoneme -> viseme channel lookup.

use std::collections::BTreeMap;

use crate::foundation::error::{VisemixError, VisemixResult};

/// Neutral, closed-mouth channel.
pub const VISEME_SIL: &str = "viseme_sil";

/// Viseme shape keys present on the rigs, in canonical order.
pub const OVR_VISEME_CHANNELS: [&str; 14] = [
    "viseme_sil",
    "viseme_PP",
    "viseme_FF",
    "viseme_TH",
    "viseme_DD",
    "viseme_kk",
    "viseme_CH",
    "viseme_SS",
    "viseme_nn",
    "viseme_RR",
    "viseme_aa",
    "viseme_E",
    "viseme_I",
    "viseme_O",
];

const CMU_TO_OVR: &[(&str, &str)] = &[
    ("SIL", "viseme_sil"),
    ("SP", "viseme_sil"),
    ("PAUSE", "viseme_sil"),
    ("M", "viseme_PP"),
    ("B", "viseme_PP"),
    ("P", "viseme_PP"),
    ("F", "viseme_FF"),
    ("V", "viseme_FF"),
    ("TH", "viseme_TH"),
    ("DH", "viseme_TH"),
    ("T", "viseme_DD"),
    ("D", "viseme_DD"),
    ("L", "viseme_DD"),
    ("N", "viseme_nn"),
    ("S", "viseme_SS"),
    ("Z", "viseme_SS"),
    ("R", "viseme_RR"),
    ("SH", "viseme_CH"),
    ("ZH", "viseme_CH"),
    ("CH", "viseme_CH"),
    ("JH", "viseme_CH"),
    ("K", "viseme_kk"),
    ("G", "viseme_kk"),
    ("NG", "viseme_kk"),
    ("Y", "viseme_I"),
    ("W", "viseme_O"),
    ("AA", "viseme_aa"),
    ("AE", "viseme_aa"),
    ("AH", "viseme_aa"),
    ("AO", "viseme_O"),
    ("OW", "viseme_O"),
    ("UH", "viseme_O"),
    ("UW", "viseme_O"),
    ("EH", "viseme_E"),
    ("EY", "viseme_E"),
    ("ER", "viseme_E"),
    ("AX", "viseme_E"),
    ("IH", "viseme_I"),
    ("IY", "viseme_I"),
];

/// Many-to-one phoneme table. Anything it does not know lands on [`VISEME_SIL`].
#[derive(Clone, Debug)]
pub struct VisemeTable {
    map: BTreeMap<String, &'static str>,
}

impl Default for VisemeTable {
    fn default() -> Self {
        Self {
            map: CMU_TO_OVR
                .iter()
                .map(|(p, v)| ((*p).to_string(), *v))
                .collect(),
        }
    }
}

impl VisemeTable {
    /// Add or replace a mapping. The target must be one of [`OVR_VISEME_CHANNELS`].
    pub fn insert(&mut self, phoneme: &str, channel: &str) -> VisemixResult<()> {
        let target = canonical_channel(channel).ok_or_else(|| {
            VisemixError::validation(format!("'{channel}' is not a known viseme channel"))
        })?;
        self.map.insert(normalize_symbol(phoneme), target);
        Ok(())
    }

    pub fn lookup(&self, symbol: &str) -> &'static str {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return VISEME_SIL;
        }
        // Legacy director events already carry the viseme key.
        if let Some(ch) = canonical_channel(trimmed) {
            return ch;
        }
        self.map
            .get(&normalize_symbol(trimmed))
            .copied()
            .unwrap_or(VISEME_SIL)
    }

    pub fn channels(&self) -> &'static [&'static str] {
        &OVR_VISEME_CHANNELS
    }
}

fn canonical_channel(name: &str) -> Option<&'static str> {
    OVR_VISEME_CHANNELS.iter().copied().find(|c| *c == name)
}

/// Uppercase and drop ARPAbet stress digits (`AA1` -> `AA`).
fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .to_ascii_uppercase()
}

#[cfg(test)]
#[path = "../../tests/unit/viseme/table.rs"]
mod tests;
