use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::audio::clip::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, decode_wav};
use crate::foundation::core::Fps;
use crate::foundation::error::VisemixResult;
use crate::timeline::model::Timeline;

/// How overlapping clips are combined once summed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MixPolicy {
    /// Plain sum, hard-clamped to [-1, 1]; inputs are expected to be pre-normalized.
    #[default]
    Sum,
    /// Sum, then scale the whole track down so the peak does not exceed 1.
    PeakNormalize,
}

#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub timeline_start_sample: u64,
    pub volume: f32,
    pub source_sample_rate: u32,
    pub source_channels: u16,
    pub source_interleaved_f32: Arc<Vec<f32>>,
}

#[derive(Clone, Debug)]
pub struct AudioManifest {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_samples: u64,
    pub segments: Vec<AudioSegment>,
}

/// Decoded clip for one beat, keyed by beat index.
#[derive(Clone, Debug)]
pub struct BeatClip {
    pub beat_index: usize,
    pub tc_in: f64,
    pub pcm: Arc<AudioPcm>,
}

/// Decode every beat's audio clip (in parallel), keeping timeline order.
#[tracing::instrument(skip(timeline))]
pub fn load_beat_clips(timeline: &Timeline) -> VisemixResult<Vec<BeatClip>> {
    timeline
        .beats()
        .par_iter()
        .enumerate()
        .filter_map(|(i, b)| b.audio.as_ref().map(|p| (i, b.tc_in, p)))
        .map(|(beat_index, tc_in, path)| {
            let pcm = decode_wav(path)?;
            debug!(beat_index, path = %path.display(), secs = pcm.duration_secs(), "clip decoded");
            Ok(BeatClip {
                beat_index,
                tc_in,
                pcm: Arc::new(pcm),
            })
        })
        .collect()
}

/// Place each clip at its `tc_in` on a track `total_samples` long.
pub fn build_audio_manifest(clips: &[BeatClip], total_samples: u64) -> AudioManifest {
    let segments = clips
        .iter()
        .map(|c| AudioSegment {
            timeline_start_sample: secs_to_sample(c.tc_in, MIX_SAMPLE_RATE),
            volume: 1.0,
            source_sample_rate: c.pcm.sample_rate,
            source_channels: c.pcm.channels,
            source_interleaved_f32: Arc::new(c.pcm.interleaved_f32.clone()),
        })
        .collect();
    AudioManifest {
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        total_samples,
        segments,
    }
}

pub fn mix_manifest(manifest: &AudioManifest, policy: MixPolicy) -> Vec<f32> {
    let frames = manifest.total_samples as usize;
    let out_channels = usize::from(manifest.channels);
    let mut out = vec![0.0f32; frames * out_channels];

    for seg in &manifest.segments {
        if seg.source_channels == 0 || seg.source_sample_rate == 0 {
            continue;
        }
        let src = seg.source_interleaved_f32.as_ref();
        let src_ch = usize::from(seg.source_channels);
        let src_frames = src.len() / src_ch;
        if src_frames == 0 {
            continue;
        }
        let step = f64::from(seg.source_sample_rate) / f64::from(manifest.sample_rate);

        for dst_sample in seg.timeline_start_sample..manifest.total_samples {
            let rel = (dst_sample - seg.timeline_start_sample) as f64;
            let src_pos = rel * step;
            let src_frame0 = src_pos.floor() as usize;
            if src_frame0 >= src_frames {
                break;
            }
            let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
            let frac = (src_pos - src_frame0 as f64) as f32;

            let dst_idx = dst_sample as usize * out_channels;
            let (l, r) = if src_ch == 1 {
                let v0 = src[src_frame0];
                let v1 = src[src_frame1];
                let v = v0 + ((v1 - v0) * frac);
                (v, v)
            } else {
                let i0 = src_frame0 * src_ch;
                let i1 = src_frame1 * src_ch;
                (
                    src[i0] + ((src[i1] - src[i0]) * frac),
                    src[i0 + 1] + ((src[i1 + 1] - src[i0 + 1]) * frac),
                )
            };

            out[dst_idx] += l * seg.volume;
            if out_channels > 1 {
                out[dst_idx + 1] += r * seg.volume;
            }
        }
    }

    apply_policy(&mut out, policy);
    out
}

fn apply_policy(samples: &mut [f32], policy: MixPolicy) {
    match policy {
        MixPolicy::Sum => {
            for s in samples.iter_mut() {
                *s = s.clamp(-1.0, 1.0);
            }
        }
        MixPolicy::PeakNormalize => {
            let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            if peak > 1.0 {
                let g = 1.0 / peak;
                for s in samples.iter_mut() {
                    *s *= g;
                }
            }
        }
    }
}

/// Nearest sample index for a time in seconds.
pub fn secs_to_sample(secs: f64, sample_rate: u32) -> u64 {
    (secs.max(0.0) * f64::from(sample_rate)).round() as u64
}

/// Exact rational frame -> sample conversion.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
