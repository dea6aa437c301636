use std::collections::BTreeMap;
use std::sync::OnceLock;

use rayon::prelude::*;
use tracing::info;

use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::pose::blink::{BLINK_CHANNELS, BlinkTrack};
use crate::pose::smoothing::SmoothingState;
use crate::timeline::characters::{CharacterMap, CharacterTarget};
use crate::timeline::model::Timeline;
use crate::viseme::envelope::{CharacterCurves, build_curves};
use crate::viseme::table::VisemeTable;

/// Channel weights for one character at one output frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    pub frame: u64,
    pub character: String,
    pub weights: BTreeMap<String, f64>,
}

impl Pose {
    pub fn weight(&self, channel: &str) -> f64 {
        self.weights.get(channel).copied().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug)]
struct CharacterTrack {
    target: CharacterTarget,
    curves: CharacterCurves,
    blink: Option<BlinkTrack>,
    /// Smoothed viseme weights per frame, filled on the first random-access query.
    smoothed: OnceLock<Vec<Vec<f64>>>,
}

/// Frame-indexed pose queries over an immutable timeline.
#[derive(Clone, Debug)]
pub struct PoseSynthesizer {
    fps: Fps,
    frame_count: u64,
    lead_frames: i64,
    time_offset_sec: f64,
    smooth_factor: f64,
    viseme_channels: Vec<String>,
    tracks: BTreeMap<String, CharacterTrack>,
}

impl PoseSynthesizer {
    /// Build curves and blink schedules for every mapped character. A speaker
    /// without a mapping fails here instead of being skipped.
    #[tracing::instrument(skip_all)]
    pub fn new(
        timeline: &Timeline,
        characters: &CharacterMap,
        table: &VisemeTable,
    ) -> VisemixResult<Self> {
        let timing = timeline.timing();
        let fps = timeline.fps();
        let duration = timeline.total_duration();

        let mut curves: BTreeMap<String, CharacterCurves> = build_curves(timeline, characters, table)?
            .into_iter()
            .map(|c| (c.character.clone(), c))
            .collect();

        let mut tracks = BTreeMap::new();
        for ch in characters.iter() {
            let blink = if timing.blink.enabled {
                Some(BlinkTrack::schedule(&ch.name, &timing.blink, fps, duration)?)
            } else {
                None
            };
            let track = CharacterTrack {
                target: ch.target.clone(),
                curves: curves.remove(&ch.name).unwrap_or_else(|| CharacterCurves {
                    character: ch.name.clone(),
                    curves: BTreeMap::new(),
                }),
                blink,
                smoothed: OnceLock::new(),
            };
            tracks.insert(ch.name.clone(), track);
        }

        let synth = Self {
            fps,
            frame_count: timeline.frame_count(),
            lead_frames: timing.lead_frames,
            time_offset_sec: timing.time_offset_sec,
            smooth_factor: timing.smooth_factor,
            viseme_channels: table.channels().iter().map(|c| (*c).to_string()).collect(),
            tracks,
        };
        info!(
            characters = synth.tracks.len(),
            frames = synth.frame_count,
            lead_frames = synth.lead_frames,
            smooth_factor = synth.smooth_factor,
            "pose synthesizer ready"
        );
        Ok(synth)
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn characters(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }

    pub fn target(&self, character: &str) -> VisemixResult<&CharacterTarget> {
        Ok(&self.track(character)?.target)
    }

    /// Timeline seconds sampled for output frame `frame`. Lead frames pull the
    /// mouth earlier; a positive time offset shows transcript content later.
    pub fn sample_time(&self, frame: u64) -> f64 {
        (frame as f64 + self.lead_frames as f64) / self.fps.as_f64() - self.time_offset_sec
    }

    /// Output frame at which timeline time `time` is shown (inverse of [`Self::sample_time`]).
    pub fn frame_of(&self, time: f64) -> i64 {
        ((time + self.time_offset_sec) * self.fps.as_f64() - self.lead_frames as f64).round() as i64
    }

    /// Pose for one frame. With smoothing enabled the first query for a
    /// character walks its whole track once; later queries read the cache.
    pub fn pose(&self, frame: u64, character: &str) -> VisemixResult<Pose> {
        if frame >= self.frame_count {
            return Err(VisemixError::validation(format!(
                "frame {frame} is outside the pose sequence of {} frames",
                self.frame_count
            )));
        }
        let track = self.track(character)?;
        if self.smooth_factor <= 0.0 {
            let targets = self.raw_weights(track, frame);
            return Ok(self.assemble(character, track, frame, &targets));
        }
        let smoothed = track.smoothed.get_or_init(|| self.smoothed_track(track));
        let visemes = smoothed
            .get(frame as usize)
            .ok_or_else(|| VisemixError::validation(format!("frame {frame} not produced")))?;
        Ok(self.assemble(character, track, frame, visemes))
    }

    fn smoothed_track(&self, track: &CharacterTrack) -> Vec<Vec<f64>> {
        let mut state = SmoothingState::new(self.viseme_channels.len());
        (0..self.frame_count)
            .map(|f| {
                let targets = self.raw_weights(track, f);
                state.step(&targets, self.smooth_factor).to_vec()
            })
            .collect()
    }

    /// Lazy, restartable walk over every frame for one character.
    pub fn poses<'a>(&'a self, character: &'a str) -> VisemixResult<PoseIter<'a>> {
        let track = self.track(character)?;
        Ok(PoseIter {
            synth: self,
            character,
            track,
            state: SmoothingState::new(self.viseme_channels.len()),
            next: 0,
        })
    }

    /// Full pose track per character. Characters run in parallel; frames stay sequential.
    pub fn materialize(&self) -> BTreeMap<String, Vec<Pose>> {
        self.tracks
            .par_iter()
            .map(|(name, track)| {
                let iter = PoseIter {
                    synth: self,
                    character: name,
                    track,
                    state: SmoothingState::new(self.viseme_channels.len()),
                    next: 0,
                };
                (name.clone(), iter.collect())
            })
            .collect()
    }

    fn track(&self, character: &str) -> VisemixResult<&CharacterTrack> {
        self.tracks.get(character).ok_or_else(|| {
            VisemixError::unresolved(format!("character '{character}' has no mesh/part mapping"))
        })
    }

    fn raw_weights(&self, track: &CharacterTrack, frame: u64) -> Vec<f64> {
        let t = self.sample_time(frame);
        self.viseme_channels
            .iter()
            .map(|c| track.curves.weight_at(c, t))
            .collect()
    }

    fn assemble(&self, character: &str, track: &CharacterTrack, frame: u64, visemes: &[f64]) -> Pose {
        let mut weights: BTreeMap<String, f64> = self
            .viseme_channels
            .iter()
            .cloned()
            .zip(visemes.iter().copied())
            .collect();
        if let Some(blink) = &track.blink {
            let w = blink.weight(frame);
            for c in BLINK_CHANNELS {
                weights.insert(c.to_string(), w);
            }
        }
        Pose {
            frame,
            character: character.to_string(),
            weights,
        }
    }
}

pub struct PoseIter<'a> {
    synth: &'a PoseSynthesizer,
    character: &'a str,
    track: &'a CharacterTrack,
    state: SmoothingState,
    next: u64,
}

impl Iterator for PoseIter<'_> {
    type Item = Pose;

    fn next(&mut self) -> Option<Pose> {
        if self.next >= self.synth.frame_count {
            return None;
        }
        let frame = self.next;
        self.next += 1;
        let targets = self.synth.raw_weights(self.track, frame);
        let visemes = if self.synth.smooth_factor <= 0.0 {
            targets
        } else {
            self.state.step(&targets, self.synth.smooth_factor).to_vec()
        };
        Some(self.synth.assemble(self.character, self.track, frame, &visemes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.synth.frame_count.saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for PoseIter<'_> {}

#[cfg(test)]
#[path = "../../tests/unit/pose/synth.rs"]
mod tests;
