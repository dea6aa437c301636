use std::path::PathBuf;

use tracing::info;

use crate::compose::pixels::Frame;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::media::frames::{FramePattern, write_png};

/// Writes every frame as a numbered straight-alpha PNG.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    pattern: FramePattern,
    start_number: u64,
    cfg: Option<SinkConfig>,
    written: u64,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, pattern: &str, start_number: u64) -> VisemixResult<Self> {
        Ok(Self {
            dir: dir.into(),
            pattern: FramePattern::parse(pattern)?,
            start_number,
            cfg: None,
            written: 0,
        })
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> VisemixResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            VisemixError::validation(format!(
                "cannot create frame directory '{}': {e}",
                self.dir.display()
            ))
        })?;
        self.cfg = Some(cfg);
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> VisemixResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VisemixError::validation("png sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(VisemixError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let path = self
            .dir
            .join(self.pattern.file_name(self.start_number + idx.0));
        write_png(&path, frame)?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> VisemixResult<()> {
        info!(dir = %self.dir.display(), frames = self.written, "frame sequence written");
        self.cfg = None;
        Ok(())
    }
}
