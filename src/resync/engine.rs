//! Output frame/audio layout after freeze inserts.
//!
//! Every insert splits the source at its capture frame `k`: source frames before
//! `k` are copied, then `round(duration * fps)` output frames hold frame `k`,
//! then copying resumes at `k`. Audio is spliced at the same frame boundaries
//! through the exact rational frame -> sample mapping, so everything after an
//! insert moves by exactly the inserted frame count.

use tracing::{debug, info};

use crate::audio::mix::frame_to_sample;
use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::schedule::ops::FreezeInsert;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Copy {
        output_start: u64,
        source_start: u64,
        len: u64,
    },
    Freeze {
        output_start: u64,
        source_frame: u64,
        /// Index into the plan's freeze list.
        freeze: usize,
        len: u64,
    },
}

impl Segment {
    pub fn output_start(&self) -> u64 {
        match *self {
            Self::Copy { output_start, .. } | Self::Freeze { output_start, .. } => output_start,
        }
    }

    pub fn len(&self) -> u64 {
        match *self {
            Self::Copy { len, .. } | Self::Freeze { len, .. } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where an output frame's pixels come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSource {
    Copy {
        source: u64,
    },
    Freeze {
        source: u64,
        freeze: usize,
        /// Frame offset inside the insert.
        offset: u64,
        len: u64,
    },
}

impl FrameSource {
    pub fn source_frame(&self) -> u64 {
        match *self {
            Self::Copy { source } | Self::Freeze { source, .. } => source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResyncPlan {
    fps: Fps,
    source_frames: u64,
    output_frames: u64,
    segments: Vec<Segment>,
    freezes: Vec<FreezeInsert>,
    /// (capture frame, inserted frames), ascending.
    inserts: Vec<(u64, u64)>,
}

impl ResyncPlan {
    /// Plan the output for `source_frames` input frames and freezes in application order.
    #[tracing::instrument(skip(freezes), fields(freezes = freezes.len()))]
    pub fn new(source_frames: u64, fps: Fps, freezes: &[FreezeInsert]) -> VisemixResult<Self> {
        let mut inserts = Vec::with_capacity(freezes.len());
        for (i, f) in freezes.iter().enumerate() {
            if f.duration.is_nan() || f.duration <= 0.0 {
                return Err(VisemixError::timing(format!(
                    "freeze {i} has non-positive duration {}",
                    f.duration
                )));
            }
            let len = fps.secs_to_frames_round(f.duration);
            if len == 0 {
                return Err(VisemixError::timing(format!(
                    "freeze {i} of {:.4}s is shorter than one frame",
                    f.duration
                )));
            }
            if source_frames == 0 {
                return Err(VisemixError::validation(
                    "cannot freeze a frame of an empty sequence",
                ));
            }
            let k = f.source_frame.min(source_frames - 1);
            if let Some(&(prev, _)) = inserts.last()
                && k < prev
            {
                return Err(VisemixError::ordering(format!(
                    "freeze {i} captures frame {k} before the previous freeze at frame {prev}"
                )));
            }
            inserts.push((k, len));
        }

        let mut segments = Vec::with_capacity(inserts.len() * 2 + 1);
        let mut src = 0u64;
        let mut out = 0u64;
        for (i, &(k, len)) in inserts.iter().enumerate() {
            if k > src {
                segments.push(Segment::Copy {
                    output_start: out,
                    source_start: src,
                    len: k - src,
                });
                out += k - src;
                src = k;
            }
            segments.push(Segment::Freeze {
                output_start: out,
                source_frame: k,
                freeze: i,
                len,
            });
            out += len;
        }
        if source_frames > src {
            segments.push(Segment::Copy {
                output_start: out,
                source_start: src,
                len: source_frames - src,
            });
            out += source_frames - src;
        }

        info!(source_frames, output_frames = out, segments = segments.len(), "resync planned");
        Ok(Self {
            fps,
            source_frames,
            output_frames: out,
            segments,
            freezes: freezes.to_vec(),
            inserts,
        })
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn source_frames(&self) -> u64 {
        self.source_frames
    }

    pub fn output_frames(&self) -> u64 {
        self.output_frames
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn freeze(&self, idx: usize) -> Option<&FreezeInsert> {
        self.freezes.get(idx)
    }

    pub fn frame_source(&self, output_frame: u64) -> Option<FrameSource> {
        if output_frame >= self.output_frames {
            return None;
        }
        let i = self
            .segments
            .partition_point(|s| s.output_start() <= output_frame)
            .checked_sub(1)?;
        let offset = output_frame - self.segments[i].output_start();
        Some(match self.segments[i] {
            Segment::Copy { source_start, .. } => FrameSource::Copy {
                source: source_start + offset,
            },
            Segment::Freeze {
                source_frame,
                freeze,
                len,
                ..
            } => FrameSource::Freeze {
                source: source_frame,
                freeze,
                offset,
                len,
            },
        })
    }

    /// Frames inserted before source frame `frame` is shown.
    fn inserted_before(&self, frame: u64) -> u64 {
        self.inserts
            .iter()
            .filter(|(k, _)| *k <= frame)
            .map(|(_, len)| len)
            .sum()
    }

    /// Output frame showing source frame `frame` as copied content.
    pub fn source_to_output_frame(&self, frame: u64) -> u64 {
        frame + self.inserted_before(frame)
    }

    /// Output time of source time `t`. Inserts at or before `t` push it later.
    pub fn shift_time(&self, t: f64) -> f64 {
        let fps = self.fps.as_f64();
        let shift: u64 = self
            .inserts
            .iter()
            .filter(|(k, _)| (*k as f64) / fps <= t + 1e-9)
            .map(|(_, len)| len)
            .sum();
        t + self.fps.frames_to_secs(shift)
    }

    /// Source time the picture at `output_frame` shows; held constant through an insert.
    pub fn source_time_of(&self, output_frame: u64) -> f64 {
        match self.frame_source(output_frame) {
            Some(src) => self.fps.frames_to_secs(src.source_frame()),
            None => self.fps.frames_to_secs(self.source_frames),
        }
    }

    /// Splice silence into a source-timeline mix at every insert.
    ///
    /// `source_mix` is interleaved and starts at source time 0. The result is
    /// exactly `frame_to_sample(output_frames)` frames long.
    pub fn resync_audio(&self, source_mix: &[f32], sample_rate: u32, channels: u16) -> Vec<f32> {
        let ch = usize::from(channels.max(1));
        let at = |frame: u64| frame_to_sample(frame, self.fps, sample_rate) as usize;
        let mut out = vec![0.0f32; at(self.output_frames) * ch];

        for seg in &self.segments {
            if let Segment::Copy {
                output_start,
                source_start,
                len,
            } = *seg
            {
                // Source length follows the destination so seams never leave a gap.
                let dst = at(output_start)..at(output_start + len);
                let src_start = at(source_start);
                let src_lo = (src_start * ch).min(source_mix.len());
                let src_hi = ((src_start + dst.len()) * ch).min(source_mix.len());
                let dst_lo = dst.start * ch;
                out[dst_lo..dst_lo + (src_hi - src_lo)].copy_from_slice(&source_mix[src_lo..src_hi]);
            }
        }
        debug!(
            in_samples = source_mix.len() / ch,
            out_samples = out.len() / ch,
            "audio resynced"
        );
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resync/engine.rs"]
mod tests;
