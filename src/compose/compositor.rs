//! Per-frame layer stack: background, foreground, icon, slate.

use std::sync::Arc;

use crate::compose::pixels::{Frame, scaled_height};
use crate::foundation::core::Canvas;
use crate::foundation::error::VisemixResult;
use crate::schedule::icon::IconTrack;

/// Where a scaled foreground lands on the background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
    /// Rows cut from the top of the scaled foreground. Nothing is cut from the bottom.
    pub crop_top: u32,
}

/// Scale to `target_width` (aspect kept), center horizontally, bottom-align,
/// crop overflow from the top.
pub fn place_foreground(canvas: Canvas, fg_width: u32, fg_height: u32, target_width: u32) -> Placement {
    let height = scaled_height(fg_width, fg_height, target_width);
    let x = (i64::from(canvas.width) - i64::from(target_width)) / 2;
    let crop_top = height.saturating_sub(canvas.height);
    let y = i64::from(canvas.height) - i64::from(height) + i64::from(crop_top);
    Placement {
        width: target_width,
        height,
        x,
        y,
        crop_top,
    }
}

/// Slate opacity at `offset` frames into an insert of `len` frames.
///
/// Ramps are stepped per frame: the first frame of the fade-in and the last
/// frame of the fade-out are fully transparent.
pub fn fade_alpha(offset: u64, len: u64, fade_in_frames: u64, fade_out_frames: u64, cap: f64) -> f64 {
    let cap = cap.clamp(0.0, 1.0);
    if offset >= len {
        return 0.0;
    }
    let rise = if fade_in_frames == 0 {
        1.0
    } else {
        (offset as f64 / fade_in_frames as f64).min(1.0)
    };
    let remaining = len - 1 - offset;
    let fall = if fade_out_frames == 0 {
        1.0
    } else {
        (remaining as f64 / fade_out_frames as f64).min(1.0)
    };
    cap * rise.min(fall)
}

#[derive(Clone, Debug)]
pub struct IconLayer {
    pub image: Arc<Frame>,
    pub track: IconTrack,
    pub alpha: f64,
}

#[derive(Clone, Debug)]
pub struct Compositor {
    canvas: Canvas,
    background: Option<Arc<Frame>>,
    fg_width: u32,
    icon: Option<IconLayer>,
}

impl Compositor {
    /// Output size is the background's when there is one, otherwise the source frames'.
    pub fn new(
        source_canvas: Canvas,
        background: Option<Arc<Frame>>,
        fg_width: u32,
        icon: Option<IconLayer>,
    ) -> Self {
        let canvas = background.as_ref().map_or(source_canvas, |bg| Canvas {
            width: bg.width,
            height: bg.height,
        });
        Self {
            canvas,
            background,
            fg_width,
            icon,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Background plus placed foreground, before any overlay.
    pub fn base(&self, fg: &Frame) -> VisemixResult<Frame> {
        let Some(bg) = &self.background else {
            if fg.width == self.canvas.width && fg.height == self.canvas.height {
                return Ok(fg.clone());
            }
            return fg.resized(self.canvas.width, self.canvas.height);
        };
        let mut out = bg.as_ref().clone();
        let p = place_foreground(self.canvas, fg.width, fg.height, self.fg_width);
        let scaled = fg.resized(p.width, p.height)?;
        out.draw_over(&scaled, p.x, p.y - i64::from(p.crop_top), 1.0);
        Ok(out)
    }

    /// Full stack for one output frame. `source_time` drives the icon, so it
    /// holds still while a freeze is on screen.
    pub fn compose(
        &self,
        fg: &Frame,
        source_time: f64,
        slate: Option<(&Frame, f64)>,
    ) -> VisemixResult<Frame> {
        let mut out = self.base(fg)?;
        if let Some(icon) = &self.icon {
            let pos = icon.track.position_at(source_time);
            out.draw_over(
                &icon.image,
                pos.x.round() as i64,
                pos.y.round() as i64,
                icon.alpha as f32,
            );
        }
        if let Some((image, alpha)) = slate
            && alpha > 0.0
        {
            out.draw_over(image, 0, 0, alpha as f32);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
