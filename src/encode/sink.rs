use std::path::PathBuf;

use crate::compose::pixels::Frame;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::VisemixResult;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Mixed soundtrack to mux alongside the frames, if any.
    pub audio: Option<AudioInputConfig>,
}

/// Interleaved `f32le` PCM on disk.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Consumer of composited output frames.
///
/// `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> VisemixResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> VisemixResult<()>;
    fn end(&mut self) -> VisemixResult<()>;
}

/// Keeps every frame in memory; for tests and small previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Frame)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VisemixResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> VisemixResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> VisemixResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Forwards every call to each inner sink in order.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Box<dyn FrameSink>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FrameSink for MultiSink {
    fn begin(&mut self, cfg: SinkConfig) -> VisemixResult<()> {
        for s in &mut self.sinks {
            s.begin(cfg.clone())?;
        }
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> VisemixResult<()> {
        for s in &mut self.sinks {
            s.push_frame(idx, frame)?;
        }
        Ok(())
    }

    fn end(&mut self) -> VisemixResult<()> {
        for s in &mut self.sinks {
            s.end()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
