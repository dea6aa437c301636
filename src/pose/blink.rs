//! Procedural eye blinks, deterministic per character.

use xxhash_rust::xxh3::xxh3_64;

use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::foundation::math::SplitMix64;
use crate::timeline::document::BlinkConfig;

pub const BLINK_CHANNELS: [&str; 2] = ["eyeBlinkLeft", "eyeBlinkRight"];

/// Blink centers in frames; each blink closes over `half_frames` and reopens over `half_frames`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlinkTrack {
    centers: Vec<u64>,
    half_frames: u32,
}

impl BlinkTrack {
    /// Intervals are drawn uniformly from `[min_interval_sec, max_interval_sec]`,
    /// the first blink lands one interval in, and no blink starts within the
    /// minimum interval of the end.
    pub fn schedule(
        character: &str,
        cfg: &BlinkConfig,
        fps: Fps,
        duration_sec: f64,
    ) -> VisemixResult<Self> {
        if cfg.min_interval_sec.is_nan() || cfg.min_interval_sec <= 0.0 {
            return Err(VisemixError::timing(format!(
                "blink min_interval_sec must be > 0, got {}",
                cfg.min_interval_sec
            )));
        }
        if cfg.max_interval_sec < cfg.min_interval_sec {
            return Err(VisemixError::validation(format!(
                "blink max_interval_sec {} is below min_interval_sec {}",
                cfg.max_interval_sec, cfg.min_interval_sec
            )));
        }
        if cfg.half_frames == 0 {
            return Err(VisemixError::timing("blink half_frames must be > 0"));
        }

        let mut rng = SplitMix64::new(xxh3_64(character.as_bytes()) ^ cfg.seed);
        let mut centers = Vec::new();
        let span = cfg.max_interval_sec - cfg.min_interval_sec;
        let last = duration_sec - cfg.min_interval_sec;
        let mut t = cfg.min_interval_sec + span * rng.next_f64();
        while t < last {
            centers.push(fps.secs_to_frames_round(t));
            t += cfg.min_interval_sec + span * rng.next_f64();
        }
        Ok(Self {
            centers,
            half_frames: cfg.half_frames,
        })
    }

    pub fn centers(&self) -> &[u64] {
        &self.centers
    }

    /// Closure weight at an output frame: 1 at a blink center, linear to 0 at +/- `half_frames`.
    pub fn weight(&self, frame: u64) -> f64 {
        let half = u64::from(self.half_frames);
        let lo = self.centers.partition_point(|&c| c + half <= frame);
        self.centers[lo..]
            .iter()
            .take_while(|&&c| c < frame + half)
            .map(|&c| 1.0 - (c.abs_diff(frame) as f64) / (half as f64))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pose/blink.rs"]
mod tests;
