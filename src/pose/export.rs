//! Pose tracks as JSON for the external renderer.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::pose::synth::PoseSynthesizer;
use crate::timeline::characters::CharacterTarget;
use crate::timeline::document::RenderConfig;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CharacterPoses {
    pub target: CharacterTarget,
    /// One channel map per output frame, frame 0 first.
    pub frames: Vec<BTreeMap<String, f64>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PoseExport {
    /// Resolution, engine and transparency the renderer should use.
    pub render: RenderConfig,
    pub fps: f64,
    pub frame_count: u64,
    pub characters: BTreeMap<String, CharacterPoses>,
}

impl PoseExport {
    pub fn from_synthesizer(synth: &PoseSynthesizer, render: &RenderConfig) -> VisemixResult<Self> {
        let mut characters = BTreeMap::new();
        for (name, poses) in synth.materialize() {
            let target = synth.target(&name)?.clone();
            let frames = poses
                .into_iter()
                .map(|p| {
                    p.weights
                        .into_iter()
                        .map(|(c, w)| (c, (w * 10_000.0).round() / 10_000.0))
                        .collect()
                })
                .collect();
            characters.insert(name, CharacterPoses { target, frames });
        }
        Ok(Self {
            render: render.clone(),
            fps: synth.fps().as_f64(),
            frame_count: synth.frame_count(),
            characters,
        })
    }

    pub fn to_json_string(&self) -> VisemixResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VisemixError::serde(format!("pose export: {e}")))
    }

    pub fn write_json(&self, path: &Path) -> VisemixResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let json = self.to_json_string()?;
        std::fs::write(path, json)
            .with_context(|| format!("write pose export '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pose/export.rs"]
mod tests;
