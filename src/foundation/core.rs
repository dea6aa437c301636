use crate::foundation::error::{VisemixError, VisemixResult};

pub use kurbo::Point;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> VisemixResult<Self> {
        if den == 0 {
            return Err(VisemixError::timing("fps den must be > 0"));
        }
        if num == 0 {
            return Err(VisemixError::timing("fps must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number rate as stored in director documents.
    pub fn from_int(fps: i64) -> VisemixResult<Self> {
        if fps <= 0 {
            return Err(VisemixError::timing(format!("fps must be > 0, got {fps}")));
        }
        let num = u32::try_from(fps)
            .map_err(|_| VisemixError::validation(format!("fps {fps} is out of range")))?;
        Self::new(num, 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }

    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        let v = secs * self.as_f64();
        let r = v.round();
        if (v - r).abs() < 1e-9 {
            return r.max(0.0) as u64;
        }
        v.floor().max(0.0) as u64
    }

    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }

    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        // Guard against 47.00000000001 style float noise pushing a whole count up by one.
        let v = secs * self.as_f64();
        let r = v.round();
        if (v - r).abs() < 1e-9 {
            return r.max(0.0) as u64;
        }
        v.ceil().max(0.0) as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Parse `HH:MM:SS.sss` (or `MM:SS.sss`, or bare seconds) into seconds.
pub fn parse_timecode(tc: &str) -> VisemixResult<f64> {
    let tc = tc.trim();
    if tc.is_empty() {
        return Ok(0.0);
    }
    let mut secs = 0.0f64;
    for part in tc.split(':') {
        let v: f64 = part
            .trim()
            .parse()
            .map_err(|_| VisemixError::validation(format!("invalid timecode '{tc}'")))?;
        secs = secs * 60.0 + v;
    }
    if !secs.is_finite() || secs < 0.0 {
        return Err(VisemixError::validation(format!("invalid timecode '{tc}'")));
    }
    Ok(secs)
}

/// Format seconds as `HH:MM:SS.sss`.
pub fn format_timecode(secs: f64) -> String {
    let ms_total = (secs.max(0.0) * 1000.0).round() as u64;
    let h = ms_total / 3_600_000;
    let m = (ms_total / 60_000) % 60;
    let s = (ms_total / 1000) % 60;
    let ms = ms_total % 1000;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
