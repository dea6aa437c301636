use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::audio::clip::probe_duration_secs;
use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::schedule::anchor::AnchoredMarker;
use crate::timeline::characters::CharacterMap;
use crate::timeline::document::{BeatDoc, DirectorDoc, RenderConfig, TimingConfig};

/// Symbol used for words the aligner returned without phoneme sub-timing.
pub const WORD_FALLBACK_PHONEME: &str = "AE";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatKind {
    Speech,
    Pause,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Phoneme {
    pub symbol: String,
    /// Beat-local seconds.
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub phonemes: Vec<Phoneme>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Beat {
    pub id: String,
    pub kind: BeatKind,
    pub speaker: Option<String>,
    pub words: Vec<Word>,
    pub audio: Option<PathBuf>,
    pub tc_in: f64,
    pub duration: f64,
}

impl Beat {
    pub fn tc_out(&self) -> f64 {
        self.tc_in + self.duration
    }

    /// Phonemes in absolute timeline seconds, in transcript order.
    pub fn absolute_phonemes(&self) -> impl Iterator<Item = Phoneme> + '_ {
        self.words.iter().flat_map(move |w| {
            let local: Vec<Phoneme> = if w.phonemes.is_empty() {
                vec![Phoneme {
                    symbol: WORD_FALLBACK_PHONEME.to_string(),
                    start: w.start,
                    end: w.end,
                }]
            } else {
                w.phonemes.clone()
            };
            local.into_iter().map(move |p| Phoneme {
                symbol: p.symbol,
                start: self.tc_in + p.start,
                end: self.tc_in + p.end,
            })
        })
    }
}

/// Which side of a time to search for a beat boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Nearest boundary at or before the time.
    Before,
    /// Nearest boundary at or after the time.
    After,
}

/// Validated, immutable director timeline.
#[derive(Clone, Debug)]
pub struct Timeline {
    fps: Fps,
    render: RenderConfig,
    timing: TimingConfig,
    beats: Vec<Beat>,
    markers: Vec<AnchoredMarker>,
}

impl Timeline {
    /// Load and validate a director document; relative audio paths resolve
    /// against the document's directory.
    #[tracing::instrument(skip(characters))]
    pub fn load(path: &Path, characters: &CharacterMap) -> VisemixResult<Self> {
        let doc = DirectorDoc::from_path(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_document(&doc, base_dir, characters)
    }

    /// Load for compositing-only runs that never pose characters, so speaker
    /// mappings are not checked. Everything else is validated as in [`Timeline::load`].
    #[tracing::instrument]
    pub fn load_for_media(path: &Path) -> VisemixResult<Self> {
        let doc = DirectorDoc::from_path(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::build(&doc, base_dir, None)
    }

    pub fn from_document(
        doc: &DirectorDoc,
        base_dir: &Path,
        characters: &CharacterMap,
    ) -> VisemixResult<Self> {
        Self::build(doc, base_dir, Some(characters))
    }

    fn build(
        doc: &DirectorDoc,
        base_dir: &Path,
        characters: Option<&CharacterMap>,
    ) -> VisemixResult<Self> {
        let fps = Fps::from_int(doc.fps)?;
        if !(0.0..=1.0).contains(&doc.timing.smooth_factor) {
            return Err(VisemixError::validation(format!(
                "smooth_factor must be within [0, 1], got {}",
                doc.timing.smooth_factor
            )));
        }
        if doc.timing.ramp_fraction <= 0.0 {
            return Err(VisemixError::timing("ramp_fraction must be > 0"));
        }

        let mut beats = Vec::with_capacity(doc.beats.len());
        for (idx, b) in doc.beats.iter().enumerate() {
            beats.push(resolve_beat(idx, b, base_dir, characters)?);
        }
        for pair in beats.windows(2) {
            if pair[1].tc_in < pair[0].tc_in {
                return Err(VisemixError::ordering(format!(
                    "beat '{}' starts at {:.3}s before preceding beat '{}' at {:.3}s",
                    pair[1].id, pair[1].tc_in, pair[0].id, pair[0].tc_in
                )));
            }
        }

        let timeline = Self {
            fps,
            render: doc.render.clone(),
            timing: doc.timing.clone(),
            beats,
            markers: Vec::new(),
        };
        info!(
            beats = timeline.beats.len(),
            duration_sec = timeline.total_duration(),
            fps = fps.as_f64(),
            "timeline loaded"
        );
        Ok(timeline)
    }

    /// Build directly from already-resolved beats (used by tools that synthesize timelines).
    pub fn from_beats(fps: Fps, beats: Vec<Beat>) -> VisemixResult<Self> {
        for b in &beats {
            if !b.duration.is_finite() || b.duration <= 0.0 {
                return Err(VisemixError::timing(format!(
                    "beat '{}' has non-positive duration {}",
                    b.id, b.duration
                )));
            }
        }
        for pair in beats.windows(2) {
            if pair[1].tc_in < pair[0].tc_in {
                return Err(VisemixError::ordering(format!(
                    "beat '{}' starts before beat '{}'",
                    pair[1].id, pair[0].id
                )));
            }
        }
        Ok(Self {
            fps,
            render: RenderConfig::default(),
            timing: TimingConfig::default(),
            beats,
            markers: Vec::new(),
        })
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_markers(mut self, markers: Vec<AnchoredMarker>) -> Self {
        self.markers = markers;
        self
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn markers(&self) -> &[AnchoredMarker] {
        &self.markers
    }

    /// Distinct speakers in first-appearance order.
    pub fn speakers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for s in self.beats.iter().filter_map(|b| b.speaker.as_deref()) {
            if !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }

    pub fn total_duration(&self) -> f64 {
        self.beats.iter().map(Beat::tc_out).fold(0.0, f64::max)
    }

    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_ceil(self.total_duration())
    }

    /// The latest-starting beat whose `[tc_in, tc_out)` span contains `time`.
    pub fn beat_containing(&self, time: f64) -> Option<&Beat> {
        self.beats
            .iter()
            .rev()
            .find(|b| b.tc_in <= time && time < b.tc_out())
    }

    /// Nearest beat start/end at or before (or at or after) `time`.
    pub fn boundary_near(&self, time: f64, direction: Direction) -> Option<f64> {
        let boundaries = self.beats.iter().flat_map(|b| [b.tc_in, b.tc_out()]);
        match direction {
            Direction::Before => boundaries.filter(|&t| t <= time).reduce(f64::max),
            Direction::After => boundaries.filter(|&t| t >= time).reduce(f64::min),
        }
    }
}

fn resolve_beat(
    idx: usize,
    doc: &BeatDoc,
    base_dir: &Path,
    characters: Option<&CharacterMap>,
) -> VisemixResult<Beat> {
    let id = doc.id.clone().unwrap_or_else(|| format!("beat-{idx}"));
    let tc_in = doc.tc_in.to_secs()?;

    if doc.is_pause() {
        let duration = doc.duration.unwrap_or(1.0);
        if !duration.is_finite() || duration <= 0.0 {
            return Err(VisemixError::timing(format!(
                "pause beat '{id}' has non-positive duration {duration}"
            )));
        }
        return Ok(Beat {
            id,
            kind: BeatKind::Pause,
            speaker: None,
            words: Vec::new(),
            audio: None,
            tc_in,
            duration,
        });
    }

    let speaker = doc
        .speaker
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VisemixError::unresolved(format!("speech beat '{id}' has no speaker")))?;
    if let Some(characters) = characters {
        characters.get(speaker)?;
    }

    let audio = match doc.audio.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => {
            let p = Path::new(a);
            let resolved = if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            };
            if !resolved.is_file() {
                return Err(VisemixError::unresolved(format!(
                    "beat '{id}' audio clip '{}' does not exist",
                    resolved.display()
                )));
            }
            Some(resolved)
        }
        _ => None,
    };

    let duration = match (doc.duration, audio.as_deref()) {
        (Some(d), _) => d,
        (None, Some(path)) => probe_duration_secs(path)?,
        (None, None) => {
            return Err(VisemixError::unresolved(format!(
                "beat '{id}' has neither an audio clip nor an explicit duration"
            )));
        }
    };
    if !duration.is_finite() || duration <= 0.0 {
        return Err(VisemixError::timing(format!(
            "beat '{id}' has non-positive duration {duration}"
        )));
    }

    let mut words = Vec::with_capacity(doc.words.len() + doc.visemes.len());
    for w in &doc.words {
        if w.end < w.start {
            return Err(VisemixError::ordering(format!(
                "word '{}' in beat '{id}' ends before it starts",
                w.text
            )));
        }
        let mut phonemes = Vec::with_capacity(w.phonemes.len());
        for p in &w.phonemes {
            if p.end < p.start {
                return Err(VisemixError::ordering(format!(
                    "phoneme '{}' in beat '{id}' ends before it starts",
                    p.symbol
                )));
            }
            phonemes.push(Phoneme {
                symbol: p.symbol.clone(),
                start: p.start,
                end: p.end,
            });
        }
        words.push(Word {
            text: w.text.clone(),
            start: w.start,
            end: w.end,
            phonemes,
        });
    }
    for ev in &doc.visemes {
        let local = (ev.t - tc_in).max(0.0);
        words.push(Word {
            text: String::new(),
            start: local,
            end: local,
            phonemes: vec![Phoneme {
                symbol: ev.p.clone(),
                start: local,
                end: local,
            }],
        });
    }
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    debug!(beat = %id, speaker, tc_in, duration, words = words.len(), "beat resolved");

    Ok(Beat {
        id,
        kind: BeatKind::Speech,
        speaker: Some(speaker.to_string()),
        words,
        audio,
        tc_in,
        duration,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
