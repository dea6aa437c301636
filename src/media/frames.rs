//! Numbered PNG frame sequences on disk.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use regex::Regex;
use tracing::debug;

use crate::compose::pixels::Frame;
use crate::foundation::core::Canvas;
use crate::foundation::error::{VisemixError, VisemixResult};

pub const DEFAULT_PATTERN: &str = "frame_%04d.png";
/// Renderers number their first frame 1.
pub const DEFAULT_START_NUMBER: u64 = 1;

/// A printf-style file name pattern with one `%d` / `%0Nd` slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePattern {
    prefix: String,
    pad: usize,
    suffix: String,
}

impl FramePattern {
    pub fn parse(pattern: &str) -> VisemixResult<Self> {
        let re = Regex::new(r"%(0?)(\d*)d").context("compile frame pattern regex")?;
        let mut found = re.captures_iter(pattern);
        let caps = found.next().ok_or_else(|| {
            VisemixError::validation(format!("frame pattern '{pattern}' has no %d slot"))
        })?;
        if found.next().is_some() {
            return Err(VisemixError::validation(format!(
                "frame pattern '{pattern}' has more than one %d slot"
            )));
        }
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let zero = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let width = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let pad = if width.is_empty() {
            0
        } else {
            width.parse::<usize>().map_err(|e| {
                VisemixError::validation(format!("frame pattern '{pattern}': {e}"))
            })?
        };
        if pad > 0 && !zero {
            return Err(VisemixError::validation(format!(
                "frame pattern '{pattern}': only zero padding is supported"
            )));
        }
        Ok(Self {
            prefix: pattern[..whole.start].to_string(),
            pad,
            suffix: pattern[whole.end..].to_string(),
        })
    }

    pub fn file_name(&self, number: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = self.pad
        )
    }
}

/// A gapless run of numbered frames in one directory.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    dir: PathBuf,
    pattern: FramePattern,
    start_number: u64,
    len: u64,
    canvas: Canvas,
}

impl FrameSequence {
    /// Count frames from `start_number` until the first missing file.
    #[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn open(dir: &Path, pattern: &str, start_number: u64) -> VisemixResult<Self> {
        let pattern = FramePattern::parse(pattern)?;
        let mut len = 0u64;
        while dir.join(pattern.file_name(start_number + len)).is_file() {
            len += 1;
        }
        if len == 0 {
            return Err(VisemixError::unresolved(format!(
                "no frames found in '{}' (first expected '{}')",
                dir.display(),
                pattern.file_name(start_number)
            )));
        }
        let first = dir.join(pattern.file_name(start_number));
        let (width, height) = image::image_dimensions(&first)
            .with_context(|| format!("read dimensions of '{}'", first.display()))?;
        debug!(frames = len, width, height, "frame sequence opened");
        Ok(Self {
            dir: dir.to_path_buf(),
            pattern,
            start_number,
            len,
            canvas: Canvas { width, height },
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the first frame; every frame must match it.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn path_of(&self, index: u64) -> PathBuf {
        self.dir
            .join(self.pattern.file_name(self.start_number + index))
    }

    /// Decode frame `index` (0-based) into premultiplied RGBA8.
    pub fn read(&self, index: u64) -> VisemixResult<Frame> {
        if index >= self.len {
            return Err(VisemixError::validation(format!(
                "frame {index} out of range (sequence has {})",
                self.len
            )));
        }
        let frame = load_image(&self.path_of(index))?;
        if frame.width != self.canvas.width || frame.height != self.canvas.height {
            return Err(VisemixError::validation(format!(
                "frame {index} is {}x{}, sequence is {}x{}",
                frame.width, frame.height, self.canvas.width, self.canvas.height
            )));
        }
        Ok(frame)
    }
}

/// Decode any still image into a premultiplied [`Frame`].
pub fn load_image(path: &Path) -> VisemixResult<Frame> {
    let bytes = std::fs::read(path).map_err(|e| {
        VisemixError::unresolved(format!("cannot read image '{}': {e}", path.display()))
    })?;
    let rgba = image::load_from_memory(&bytes)
        .with_context(|| format!("decode image '{}'", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Frame::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Write a frame as a straight-alpha PNG.
pub fn write_png(path: &Path, frame: &Frame) -> VisemixResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_straight_rgba8())
        .ok_or_else(|| VisemixError::validation("frame buffer does not match its size"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/frames.rs"]
mod tests;
