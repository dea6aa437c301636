//! Premultiplied RGBA8 buffers and the blend ops on them.

use image::imageops::FilterType;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::foundation::math::{mul_div255_u8, mul_div255_u16};

pub type PremulRgba8 = [u8; 4];

/// Premultiplied RGBA8 image, row-major, no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn filled(width: u32, height: u32, px: PremulRgba8) -> Self {
        let n = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(n * 4);
        for _ in 0..n {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Wrap straight-alpha RGBA8 (as decoded from PNG), premultiplying it.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> VisemixResult<Self> {
        check_len(width, height, data.len())?;
        premultiply_rgba8_in_place(&mut data);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> PremulRgba8 {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Straight-alpha copy of the pixel data, for PNG output.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Resample to `width` x `height`. Premultiplied data filters without fringes.
    pub fn resized(&self, width: u32, height: u32) -> VisemixResult<Self> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        if width == 0 || height == 0 {
            return Err(VisemixError::validation(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        let src = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| VisemixError::validation("frame buffer does not match its size"))?;
        let out = image::imageops::resize(&src, width, height, FilterType::Triangle);
        Ok(Self {
            width,
            height,
            data: out.into_raw(),
        })
    }

    /// Scale to `width`, keeping aspect ratio.
    pub fn resized_to_width(&self, width: u32) -> VisemixResult<Self> {
        let height = scaled_height(self.width, self.height, width);
        self.resized(width, height)
    }

    /// Composite `src` over this frame with its top-left at (`x`, `y`), clipped to bounds.
    pub fn draw_over(&mut self, src: &Frame, x: i64, y: i64, opacity: f32) {
        if opacity <= 0.0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (y + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let dw = self.width as usize;
        let sw = src.width as usize;
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            for dx in x0..x1 {
                let sx = (dx - x) as usize;
                let di = ((dy as usize) * dw + dx as usize) * 4;
                let si = (sy * sw + sx) * 4;
                let d = [
                    self.data[di],
                    self.data[di + 1],
                    self.data[di + 2],
                    self.data[di + 3],
                ];
                let s = [
                    src.data[si],
                    src.data[si + 1],
                    src.data[si + 2],
                    src.data[si + 3],
                ];
                self.data[di..di + 4].copy_from_slice(&over(d, s, opacity));
            }
        }
    }
}

pub fn scaled_height(src_w: u32, src_h: u32, target_w: u32) -> u32 {
    if src_w == 0 {
        return 0;
    }
    ((f64::from(src_h) * f64::from(target_w) / f64::from(src_w)).round() as u32).max(1)
}

fn check_len(width: u32, height: u32, len: usize) -> VisemixResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| VisemixError::validation("frame buffer size overflow"))?;
    if expected != len {
        return Err(VisemixError::validation(format!(
            "expected {expected} bytes for {width}x{height} rgba8, got {len}"
        )));
    }
    Ok(())
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

/// Porter-Duff source-over on premultiplied pixels, `src` scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Flatten premultiplied RGBA8 onto an opaque background color for encoding.
pub fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgb: [u8; 3]) -> VisemixResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(VisemixError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - a;
        for i in 0..3 {
            d[i] = (u16::from(s[i]) + mul_div255_u16(u16::from(bg_rgb[i]), inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compose/pixels.rs"]
mod tests;
