//! Serialized director document (`director_visemes.json`).
//!
//! Every struct tolerates unknown fields and fills omitted ones with defaults so
//! documents written by newer upstream tools still load.

use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::parse_timecode;
use crate::foundation::error::{VisemixError, VisemixResult};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DirectorDoc {
    pub fps: i64,
    pub render: RenderConfig,
    pub timing: TimingConfig,
    pub beats: Vec<BeatDoc>,
}

impl Default for DirectorDoc {
    fn default() -> Self {
        Self {
            fps: 24,
            render: RenderConfig::default(),
            timing: TimingConfig::default(),
            beats: Vec::new(),
        }
    }
}

impl DirectorDoc {
    pub fn from_json_str(s: &str) -> VisemixResult<Self> {
        serde_json::from_str(s).map_err(|e| VisemixError::serde(format!("director json: {e}")))
    }

    pub fn from_path(path: &Path) -> VisemixResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read director '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// Render configuration handed to the external renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub resolution: [u32; 2],
    pub engine: String,
    pub transparent: bool,
    pub quality: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: [1920, 1080],
            engine: "BLENDER_EEVEE".to_string(),
            transparent: true,
            quality: None,
        }
    }
}

/// Global timing corrections for pose synthesis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Mouth movement leads the audio by this many frames.
    pub lead_frames: i64,
    /// Positive values show transcript content later.
    pub time_offset_sec: f64,
    /// 0 = instant, 1 = frozen.
    pub smooth_factor: f64,
    /// Ramp length as a fraction of each phoneme's duration.
    pub ramp_fraction: f64,
    pub blink: BlinkConfig,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lead_frames: 2,
            time_offset_sec: 0.0,
            smooth_factor: 0.0,
            ramp_fraction: 0.25,
            blink: BlinkConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub enabled: bool,
    pub min_interval_sec: f64,
    pub max_interval_sec: f64,
    pub half_frames: u32,
    pub seed: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_sec: 3.0,
            max_interval_sec: 6.0,
            half_frames: 2,
            seed: 0,
        }
    }
}

/// `tc_in` may be written as `"HH:MM:SS.sss"` or as plain seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum TimecodeDoc {
    Seconds(f64),
    Text(String),
}

impl Default for TimecodeDoc {
    fn default() -> Self {
        Self::Seconds(0.0)
    }
}

impl TimecodeDoc {
    pub fn to_secs(&self) -> VisemixResult<f64> {
        match self {
            Self::Seconds(s) if s.is_finite() && *s >= 0.0 => Ok(*s),
            Self::Seconds(s) => Err(VisemixError::validation(format!("invalid tc_in {s}"))),
            Self::Text(t) => parse_timecode(t),
        }
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BeatDoc {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tc_in: TimecodeDoc,
    #[serde(rename = "char")]
    pub speaker: Option<String>,
    pub audio: Option<String>,
    pub duration: Option<f64>,
    pub words: Vec<WordDoc>,
    pub visemes: Vec<VisemeEventDoc>,
}

impl BeatDoc {
    pub fn is_pause(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("pause"))
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WordDoc {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub phonemes: Vec<PhonemeDoc>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PhonemeDoc {
    #[serde(alias = "phone")]
    pub symbol: String,
    pub start: f64,
    pub end: f64,
}

/// Legacy per-beat viseme event; `t` is absolute timeline seconds.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisemeEventDoc {
    pub p: String,
    pub t: f64,
}
