//! Texture buffers and sampling (spec.md §4.9).
//!
//! Grounded in `pixelformat.rs`'s `to_comp` conversion (a texture buffer is
//! just bytes plus a `PixelFormat`, sampled through the same conversion the
//! compositor uses for surfaces) and `color.rs`'s lazy-materialized-copy
//! idiom for the color-managed working-format cache.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use crate::color::Rgba8;
use crate::matrix::Transform;
use crate::pixelformat::PixelFormat;

/// A caller-owned pixel buffer plus its identity and format (spec.md §4.9:
/// "`(data*, width, height, stride, format_info*, eid, ...)`"). Ownership
/// and lifetime management (`free_func`, frame-based eviction) live on the
/// texture table that owns `Buffer` values, not on the buffer itself, since
/// Rust expresses that with normal drop semantics instead of a callback.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub eid: String,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// Lazily materialized RGBA8 copy in the working format, built on first
    /// sample if `format` isn't already `Rgba8` (spec.md §4.9: "a lazy
    /// color-managed copy in the working format is materialized on first
    /// use").
    working: Option<Vec<u8>>,
}

impl Buffer {
    pub fn new(eid: String, width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Buffer {
        let stride = format.stride(width as usize);
        Buffer { eid, width, height, stride, format, data, working: None }
    }

    fn ensure_working(&mut self) {
        if self.working.is_some() || matches!(self.format, PixelFormat::Rgba8) {
            return;
        }
        let mut out = vec![0u8; self.width as usize * self.height as usize * 4];
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let src_off = y * self.stride + x * (self.format.info().bpp as usize / 8).max(1);
                let color = self.format.to_comp(&self.data, src_off).unwrap_or(Rgba8::TRANSPARENT);
                let dst_off = (y * self.width as usize + x) * 4;
                out[dst_off] = color.r;
                out[dst_off + 1] = color.g;
                out[dst_off + 2] = color.b;
                out[dst_off + 3] = color.a;
            }
        }
        self.working = Some(out);
    }

    fn texel(&mut self, x: i64, y: i64) -> Rgba8 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return Rgba8::TRANSPARENT;
        }
        self.ensure_working();
        match &self.working {
            Some(buf) => {
                let off = (y as usize * self.width as usize + x as usize) * 4;
                Rgba8::new(buf[off], buf[off + 1], buf[off + 2], buf[off + 3])
            }
            None => {
                let off = y as usize * self.stride + x as usize * (self.format.info().bpp as usize / 8).max(1);
                self.format.to_comp(&self.data, off).unwrap_or(Rgba8::TRANSPARENT)
            }
        }
    }
}

/// Sampling mode, chosen by transform scale and the image-smoothing flag
/// (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Nearest,
    Box { half_extent: i32 },
    Bilinear,
}

/// Picks a sampling mode for one axis-uniform `scale` factor, matching
/// spec.md §4.9's three bands. `image_smoothing = false` always forces
/// nearest, matching a canvas API's "pixelated" escape hatch.
pub fn sample_mode_for(scale: f32, image_smoothing: bool) -> SampleMode {
    if !image_smoothing {
        return SampleMode::Nearest;
    }
    if (0.99..=1.01).contains(&scale) {
        SampleMode::Nearest
    } else if scale < 0.5 {
        let half_extent = ((1.0 / scale.max(1e-6)) / 2.0).floor() as i32;
        SampleMode::Box { half_extent: half_extent.max(1) }
    } else {
        SampleMode::Bilinear
    }
}

/// Source-space texture fragment: a buffer sampled through the paint's
/// inverse transform (spec.md §4.9: "Texture coordinates are computed by
/// applying the source's inverse transform").
pub struct TextureSource<'a> {
    pub buffer: &'a mut Buffer,
    pub inverse: Transform,
    pub mode: SampleMode,
}

impl<'a> TextureSource<'a> {
    /// Samples the texture at device point `(dx, dy)`, returning transparent
    /// black out of bounds.
    pub fn sample(&mut self, dx: f32, dy: f32) -> Rgba8 {
        let (sx, sy) = self.inverse.apply_to_point(dx, dy);
        match self.mode {
            SampleMode::Nearest => self.buffer.texel(sx.floor() as i64, sy.floor() as i64),
            SampleMode::Bilinear => self.sample_bilinear(sx, sy),
            SampleMode::Box { half_extent } => self.sample_box(sx, sy, half_extent),
        }
    }

    fn sample_bilinear(&mut self, sx: f32, sy: f32) -> Rgba8 {
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = self.buffer.texel(x0, y0);
        let c10 = self.buffer.texel(x0 + 1, y0);
        let c01 = self.buffer.texel(x0, y0 + 1);
        let c11 = self.buffer.texel(x0 + 1, y0 + 1);
        lerp_rgba(lerp_rgba(c00, c10, fx), lerp_rgba(c01, c11, fx), fy)
    }

    fn sample_box(&mut self, sx: f32, sy: f32, half_extent: i32) -> Rgba8 {
        let cx = sx.floor() as i64;
        let cy = sy.floor() as i64;
        let mut sum = [0u32; 4];
        let mut n = 0u32;
        for oy in -half_extent..=half_extent {
            for ox in -half_extent..=half_extent {
                let c = self.buffer.texel(cx + ox as i64, cy + oy as i64);
                sum[0] += c.r as u32;
                sum[1] += c.g as u32;
                sum[2] += c.b as u32;
                sum[3] += c.a as u32;
                n += 1;
            }
        }
        let n = n.max(1);
        Rgba8::new((sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8, (sum[3] / n) as u8)
    }
}

fn lerp_rgba(a: Rgba8, b: Rgba8, t: f32) -> Rgba8 {
    let l = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Rgba8::new(l(a.r, b.r), l(a.g, b.g), l(a.b, b.b), l(a.a, b.a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_buffer(color: Rgba8, w: u32, h: u32) -> Buffer {
        let mut data = Vec::with_capacity(w as usize * h as usize * 4);
        for _ in 0..(w * h) {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Buffer::new("test".into(), w, h, PixelFormat::Rgba8, data)
    }

    #[test]
    fn out_of_bounds_is_transparent() {
        let mut buf = solid_buffer(Rgba8::new(255, 0, 0, 255), 4, 4);
        assert_eq!(buf.texel(-1, 0), Rgba8::TRANSPARENT);
        assert_eq!(buf.texel(4, 4), Rgba8::TRANSPARENT);
    }

    #[test]
    fn nearest_sample_reads_solid_fill() {
        let mut buf = solid_buffer(Rgba8::new(10, 20, 30, 255), 4, 4);
        let mut src = TextureSource { buffer: &mut buf, inverse: Transform::Identity, mode: SampleMode::Nearest };
        let c = src.sample(1.0, 1.0);
        assert_eq!(c, Rgba8::new(10, 20, 30, 255));
    }

    #[test]
    fn scale_near_one_picks_nearest() {
        assert_eq!(sample_mode_for(1.0, true), SampleMode::Nearest);
    }

    #[test]
    fn small_scale_picks_box_filter() {
        assert!(matches!(sample_mode_for(0.2, true), SampleMode::Box { .. }));
    }

    #[test]
    fn smoothing_disabled_forces_nearest() {
        assert_eq!(sample_mode_for(2.0, false), SampleMode::Nearest);
    }

    #[test]
    fn non_rgba8_buffer_materializes_working_copy() {
        let mut buf = Buffer::new("gray".into(), 2, 1, PixelFormat::Gray8, vec![0, 255]);
        assert_eq!(buf.texel(0, 0), Rgba8::new(0, 0, 0, 255));
        assert_eq!(buf.texel(1, 0), Rgba8::new(255, 255, 255, 255));
    }
}
