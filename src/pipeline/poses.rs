//! `validate` and `poses`: load-time checks and pose export for the renderer.

use std::path::Path;

use tracing::info;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::pose::export::PoseExport;
use crate::pose::synth::PoseSynthesizer;
use crate::timeline::characters::CharacterMap;
use crate::timeline::document::{RenderConfig, TimingConfig};
use crate::timeline::model::{BeatKind, Timeline};
use crate::viseme::table::VisemeTable;

/// Command-line corrections applied over the director's `timing` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingOverrides {
    pub lead_frames: Option<i64>,
    pub time_offset_sec: Option<f64>,
    pub smooth_factor: Option<f64>,
    pub no_blink: bool,
}

impl TimingOverrides {
    pub fn apply(&self, base: &TimingConfig) -> VisemixResult<TimingConfig> {
        let mut t = base.clone();
        if let Some(v) = self.lead_frames {
            t.lead_frames = v;
        }
        if let Some(v) = self.time_offset_sec {
            t.time_offset_sec = v;
        }
        if let Some(v) = self.smooth_factor {
            if !(0.0..=1.0).contains(&v) {
                return Err(VisemixError::validation(format!(
                    "smooth_factor must be within [0, 1], got {v}"
                )));
            }
            t.smooth_factor = v;
        }
        if self.no_blink {
            t.blink.enabled = false;
        }
        Ok(t)
    }
}

/// Command-line replacements for the director's `render` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOverrides {
    pub resolution: Option<[u32; 2]>,
    pub engine: Option<String>,
    pub quality: Option<String>,
}

impl RenderOverrides {
    pub fn apply(&self, base: &RenderConfig) -> VisemixResult<RenderConfig> {
        let mut r = base.clone();
        if let Some([w, h]) = self.resolution {
            if w == 0 || h == 0 {
                return Err(VisemixError::validation(format!(
                    "resolution must be non-zero, got {w}x{h}"
                )));
            }
            r.resolution = [w, h];
        }
        if let Some(engine) = &self.engine {
            let engine = engine.trim();
            if engine.is_empty() {
                return Err(VisemixError::validation("engine name must not be empty"));
            }
            r.engine = engine.to_string();
        }
        if let Some(q) = &self.quality {
            r.quality = Some(q.clone());
        }
        Ok(r)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidateReport {
    pub fps: f64,
    pub speech_beats: usize,
    pub pause_beats: usize,
    pub speakers: Vec<String>,
    pub characters: usize,
    pub duration: f64,
    pub frame_count: u64,
}

/// Load both documents with every load-time check, without synthesizing anything.
#[tracing::instrument]
pub fn validate(director: &Path, characters: &Path) -> VisemixResult<ValidateReport> {
    let chars = CharacterMap::from_path(characters)?;
    let timeline = Timeline::load(director, &chars)?;
    let count = |k: BeatKind| timeline.beats().iter().filter(|b| b.kind == k).count();
    let report = ValidateReport {
        fps: timeline.fps().as_f64(),
        speech_beats: count(BeatKind::Speech),
        pause_beats: count(BeatKind::Pause),
        speakers: timeline.speakers().into_iter().map(str::to_string).collect(),
        characters: chars.len(),
        duration: timeline.total_duration(),
        frame_count: timeline.frame_count(),
    };
    info!(
        beats = report.speech_beats + report.pause_beats,
        duration = report.duration,
        frames = report.frame_count,
        "director is valid"
    );
    Ok(report)
}

/// Synthesize every character's pose track and write it, with the render
/// settings, as JSON.
#[tracing::instrument(skip(timing, render))]
pub fn export_poses(
    director: &Path,
    characters: &Path,
    timing: &TimingOverrides,
    render: &RenderOverrides,
    out: &Path,
) -> VisemixResult<PoseExport> {
    let chars = CharacterMap::from_path(characters)?;
    let timeline = Timeline::load(director, &chars)?;
    let timing = timing.apply(timeline.timing())?;
    let render = render.apply(timeline.render())?;
    let timeline = timeline.with_timing(timing).with_render(render);

    let synth = PoseSynthesizer::new(&timeline, &chars, &VisemeTable::default())?;
    let export = PoseExport::from_synthesizer(&synth, timeline.render())?;
    export.write_json(out)?;
    info!(
        out = %out.display(),
        characters = export.characters.len(),
        frames = export.frame_count,
        engine = %export.render.engine,
        "poses written"
    );
    Ok(export)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/poses.rs"]
mod tests;
