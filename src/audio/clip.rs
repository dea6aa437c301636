use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{VisemixError, VisemixResult};

/// Internal audio mixing sample rate used across decode/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// The mixed track is always stereo.
pub const MIX_CHANNELS: u16 = 2;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Length of a WAV clip in seconds, read from its header only.
pub fn probe_duration_secs(path: &Path) -> VisemixResult<f64> {
    let reader = hound::WavReader::open(path).map_err(|e| {
        VisemixError::unresolved(format!("cannot open audio clip '{}': {e}", path.display()))
    })?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(VisemixError::timing(format!(
            "audio clip '{}' reports a zero sample rate",
            path.display()
        )));
    }
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

/// Decode a WAV clip (integer or float samples) to interleaved `f32`.
pub fn decode_wav(path: &Path) -> VisemixResult<AudioPcm> {
    let mut reader = hound::WavReader::open(path).map_err(|e| {
        VisemixError::unresolved(format!("cannot open audio clip '{}': {e}", path.display()))
    })?;
    let spec = reader.spec();
    let interleaved_f32: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("decode float wav '{}'", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("decode pcm wav '{}'", path.display()))?
        }
    };
    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    })
}

/// Write PCM as a 32-bit float WAV.
pub fn write_wav_f32(path: &Path, pcm: &AudioPcm) -> VisemixResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let spec = hound::WavSpec {
        channels: pcm.channels,
        sample_rate: pcm.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("create wav '{}'", path.display()))?;
    for &s in &pcm.interleaved_f32 {
        writer
            .write_sample(s)
            .with_context(|| format!("write wav '{}'", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalize wav '{}'", path.display()))?;
    Ok(())
}

/// Write raw little-endian `f32` samples (ffmpeg `-f f32le` input).
pub fn write_f32le(path: &Path, samples_interleaved: &[f32]) -> VisemixResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("write mixed audio file '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/clip.rs"]
mod tests;
