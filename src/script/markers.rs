//! Script text scan. Produces tokens in script order with no timing attached.

use std::path::Path;

use anyhow::Context as _;
use regex::Regex;

use crate::foundation::error::VisemixResult;

struct Patterns {
    speaker_line: Regex,
    overlay_marker: Regex,
}

impl Patterns {
    fn new() -> VisemixResult<Self> {
        Ok(Self {
            speaker_line: Regex::new(
                r"^\s*([A-Z0-9 ]+?)(?:\s*\(([A-Z \.]+)\))?\s*(?:\{[^}]*\})?\s*$",
            )
            .context("compile speaker line pattern")?,
            overlay_marker: Regex::new(r"(?i)^\[OVERLAY(\d+)?\]$")
                .context("compile overlay marker pattern")?,
        })
    }
}

const PAUSE_MARKER: &str = "[PAUSE]";
const PROCESS_FORM_SWAP_MARKER: &str = "[ProcessFormSwap]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerKind {
    /// Pause slate; `id` selects per-overlay settings (`[OVERLAY7]`).
    Overlay { id: Option<u32> },
    /// Icon side swap.
    ProcessFormSwap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenKind {
    /// Speaker header followed by at least one spoken line; aligns with a speech beat.
    Line,
    /// `[PAUSE]`; aligns with a pause beat.
    Pause,
    Marker { marker: MarkerKind },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptToken {
    pub kind: TokenKind,
    /// 1-based line in the script.
    pub line: usize,
    /// Position among all tokens.
    pub index: usize,
}

/// A script annotation; it has a script position but no time until anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub line: usize,
    pub script_index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptScan {
    pub tokens: Vec<ScriptToken>,
}

impl ScriptScan {
    pub fn parse(text: &str) -> VisemixResult<Self> {
        let patterns = Patterns::new()?;
        let lines: Vec<&str> = text.lines().collect();
        let mut tokens = Vec::new();
        let mut push = |kind: TokenKind, line: usize| {
            let index = tokens.len();
            tokens.push(ScriptToken {
                kind,
                line: line + 1,
                index,
            });
        };

        let mut i = 0;
        while i < lines.len() {
            let stripped = lines[i].trim();
            if stripped == PAUSE_MARKER {
                push(TokenKind::Pause, i);
                i += 1;
                continue;
            }
            if let Some(caps) = patterns.overlay_marker.captures(stripped) {
                let id = caps.get(1).and_then(|m| m.as_str().parse().ok());
                push(
                    TokenKind::Marker {
                        marker: MarkerKind::Overlay { id },
                    },
                    i,
                );
                i += 1;
                continue;
            }
            if stripped == PROCESS_FORM_SWAP_MARKER {
                push(
                    TokenKind::Marker {
                        marker: MarkerKind::ProcessFormSwap,
                    },
                    i,
                );
                i += 1;
                continue;
            }
            if patterns.speaker_line.is_match(stripped) && i + 1 < lines.len() {
                let mut j = i + 1;
                let mut spoken = false;
                while j < lines.len() {
                    let t = lines[j].trim();
                    if t.is_empty()
                        || (t.starts_with('[') && t.ends_with(']'))
                        || patterns.speaker_line.is_match(t)
                    {
                        break;
                    }
                    spoken = true;
                    j += 1;
                }
                if spoken {
                    push(TokenKind::Line, i);
                }
                // A header with nothing spoken under it is skipped.
                i = j.max(i + 1);
            } else {
                i += 1;
            }
        }
        Ok(Self { tokens })
    }

    pub fn from_path(path: &Path) -> VisemixResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read script '{}'", path.display()))?;
        Self::parse(&text)
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Marker { marker } => Some(Marker {
                    kind: marker,
                    line: t.line,
                    script_index: t.index,
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/markers.rs"]
mod tests;
