//! Color storage and color-space slots (spec.md §4.11).
//!
//! A `Color` can hold Gray/RGB/CMYK/Lab/Lch with or without alpha; it
//! tracks which representation is canonical (the one actually set) and
//! which lanes are cached conversions via a `valid` bitmask, populating a
//! lane lazily the first time it's asked for.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Bitmask of which color lanes currently hold up-to-date data.
pub mod lane {
    pub const GRAY: u8 = 1 << 0;
    pub const RGB: u8 = 1 << 1;
    pub const CMYK: u8 = 1 << 2;
    pub const LAB: u8 = 1 << 3;
    pub const LCH: u8 = 1 << 4;
}

/// 8-bit-per-channel RGBA, the working format most compositor paths
/// convert through.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba8 { r, g, b, a }
    }
}

/// A color, lazily convertible between representations. The field that was
/// last explicitly set is always valid; everything else is computed and
/// cached on first read.
#[derive(Debug, Clone)]
pub struct Color {
    valid: u8,
    alpha: f32,
    gray: f32,
    rgb: [f32; 3],
    cmyk: [f32; 4],
    lab: [f32; 3],
    lch: [f32; 3],
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.rgba() == other.rgba()
    }
}

impl Color {
    pub fn from_gray(g: f32, a: f32) -> Self {
        Color { valid: lane::GRAY, alpha: a, gray: g, rgb: [0.0; 3], cmyk: [0.0; 4], lab: [0.0; 3], lch: [0.0; 3] }
    }

    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { valid: lane::RGB, alpha: a, gray: 0.0, rgb: [r, g, b], cmyk: [0.0; 4], lab: [0.0; 3], lch: [0.0; 3] }
    }

    pub fn from_cmyka(c: f32, m: f32, y: f32, k: f32, a: f32) -> Self {
        Color { valid: lane::CMYK, alpha: a, gray: 0.0, rgb: [0.0; 3], cmyk: [c, m, y, k], lab: [0.0; 3], lch: [0.0; 3] }
    }

    pub fn from_lab(l: f32, a_star: f32, b_star: f32, alpha: f32) -> Self {
        Color {
            valid: lane::LAB,
            alpha,
            gray: 0.0,
            rgb: [0.0; 3],
            cmyk: [0.0; 4],
            lab: [l, a_star, b_star],
            lch: [0.0; 3],
        }
    }

    pub fn from_lch(l: f32, c: f32, h: f32, alpha: f32) -> Self {
        Color {
            valid: lane::LCH,
            alpha,
            gray: 0.0,
            rgb: [0.0; 3],
            cmyk: [0.0; 4],
            lab: [0.0; 3],
            lch: [l, c, h],
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Returns (r, g, b) in `[0, 1]`, converting and caching if RGB isn't
    /// already the canonical or a previously-cached lane.
    pub fn rgb(&self) -> [f32; 3] {
        if self.valid & lane::RGB != 0 {
            return self.rgb;
        }
        if self.valid & lane::GRAY != 0 {
            return [self.gray; 3];
        }
        if self.valid & lane::CMYK != 0 {
            return cmyk_to_rgb(self.cmyk);
        }
        if self.valid & lane::LAB != 0 {
            return lab_to_rgb(self.lab);
        }
        if self.valid & lane::LCH != 0 {
            return lab_to_rgb(lch_to_lab(self.lch));
        }
        [0.0; 3]
    }

    pub fn rgba(&self) -> (f32, f32, f32, f32) {
        let [r, g, b] = self.rgb();
        (r, g, b, self.alpha)
    }

    pub fn to_rgba8(&self) -> Rgba8 {
        let (r, g, b, a) = self.rgba();
        Rgba8::new(to_u8(r), to_u8(g), to_u8(b), to_u8(a))
    }

    pub fn gray(&self) -> f32 {
        if self.valid & lane::GRAY != 0 {
            return self.gray;
        }
        let [r, g, b] = self.rgb();
        // spec.md §4.8: "a luminance L = 0.3R + 0.59G + 0.11B"
        0.3 * r + 0.59 * g + 0.11 * b
    }

    pub fn cmyk(&self) -> [f32; 4] {
        if self.valid & lane::CMYK != 0 {
            return self.cmyk;
        }
        rgb_to_cmyk(self.rgb())
    }
}

/// Naive analytic CMYK→RGB, used when no external color-management system
/// is bound to the color space (spec.md §4.11).
fn cmyk_to_rgb(cmyk: [f32; 4]) -> [f32; 3] {
    let [c, m, y, k] = cmyk;
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

fn rgb_to_cmyk(rgb: [f32; 3]) -> [f32; 4] {
    let [r, g, b] = rgb;
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let c = (1.0 - r - k) / (1.0 - k);
    let m = (1.0 - g - k) / (1.0 - k);
    let y = (1.0 - b - k) / (1.0 - k);
    [c, m, y, k]
}

/// D65-referenced sRGB↔CIELAB, the analytic fallback for Lab/Lch when no
/// CMS is bound (spec.md §4.11).
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

// D65 white point.
const WHITE: [f32; 3] = [0.95047, 1.0, 1.08883];

fn lab_to_rgb(lab: [f32; 3]) -> [f32; 3] {
    let [l, a, b] = lab;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let x = WHITE[0] * lab_f_inv(fx);
    let y = WHITE[1] * lab_f_inv(fy);
    let z = WHITE[2] * lab_f_inv(fz);

    let r = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let g = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let bl = 0.0557 * x - 0.2040 * y + 1.0570 * z;
    [
        linear_to_srgb(r).clamp(0.0, 1.0),
        linear_to_srgb(g).clamp(0.0, 1.0),
        linear_to_srgb(bl).clamp(0.0, 1.0),
    ]
}

#[allow(dead_code)]
fn rgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = (0.4124 * r + 0.3576 * g + 0.1805 * b) / WHITE[0];
    let y = (0.2126 * r + 0.7152 * g + 0.0722 * b) / WHITE[1];
    let z = (0.0193 * r + 0.1192 * g + 0.9505 * b) / WHITE[2];
    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn lch_to_lab(lch: [f32; 3]) -> [f32; 3] {
    let [l, c, h] = lch;
    [l, c * h.cos(), c * h.sin()]
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Numbered color-space slots a `GState` can bind (spec.md §4.11): device-
/// vs. user-space RGB/CMYK, plus a slot for texture sampling color
/// management.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorSpaceSlot {
    DeviceRgb,
    UserRgb,
    DeviceCmyk,
    UserCmyk,
    Texture,
}

/// What a color-space slot is bound to: nothing (use the naive analytic
/// conversions above), a well-known name, or an opaque ICC profile blob
/// handed to an external CMS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColorSpaceBinding {
    None,
    Named(String),
    IccProfile(Vec<u8>),
}

/// A trait seam for an external color-management system. When bound, it
/// supersedes the naive analytic conversions for device↔user and
/// texture↔device (spec.md §4.11: "If an external CMS is available,
/// device→user and texture→device... functions are built").
pub trait ColorManagementSystem {
    fn convert(&self, from: &ColorSpaceBinding, to: &ColorSpaceBinding, color: [f32; 4]) -> [f32; 4];
}

#[derive(Default, Clone)]
pub struct ColorSpaceTable {
    device_rgb: ColorSpaceBinding,
    user_rgb: ColorSpaceBinding,
    device_cmyk: ColorSpaceBinding,
    user_cmyk: ColorSpaceBinding,
    texture: ColorSpaceBinding,
}

impl Default for ColorSpaceBinding {
    fn default() -> Self {
        ColorSpaceBinding::None
    }
}

impl ColorSpaceTable {
    pub fn bind(&mut self, slot: ColorSpaceSlot, binding: ColorSpaceBinding) {
        *self.slot_mut(slot) = binding;
    }

    pub fn get(&self, slot: ColorSpaceSlot) -> &ColorSpaceBinding {
        match slot {
            ColorSpaceSlot::DeviceRgb => &self.device_rgb,
            ColorSpaceSlot::UserRgb => &self.user_rgb,
            ColorSpaceSlot::DeviceCmyk => &self.device_cmyk,
            ColorSpaceSlot::UserCmyk => &self.user_cmyk,
            ColorSpaceSlot::Texture => &self.texture,
        }
    }

    fn slot_mut(&mut self, slot: ColorSpaceSlot) -> &mut ColorSpaceBinding {
        match slot {
            ColorSpaceSlot::DeviceRgb => &mut self.device_rgb,
            ColorSpaceSlot::UserRgb => &mut self.user_rgb,
            ColorSpaceSlot::DeviceCmyk => &mut self.device_cmyk,
            ColorSpaceSlot::UserCmyk => &mut self.user_cmyk,
            ColorSpaceSlot::Texture => &mut self.texture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_cache_lane_matches_luminance_formula() {
        let c = Color::from_rgba(0.2, 0.4, 0.6, 1.0);
        let expected = 0.3 * 0.2 + 0.59 * 0.4 + 0.11 * 0.6;
        assert!((c.gray() - expected).abs() < 1e-6);
    }

    #[test]
    fn cmyk_black_round_trips_to_black_rgb() {
        let c = Color::from_cmyka(0.0, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(c.rgb(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn lab_black_and_white_round_trip() {
        let black = Color::from_lab(0.0, 0.0, 0.0, 1.0);
        let white = Color::from_lab(100.0, 0.0, 0.0, 1.0);
        let [r, g, b] = black.rgb();
        assert!(r < 0.01 && g < 0.01 && b < 0.01);
        let [r, g, b] = white.rgb();
        assert!(r > 0.98 && g > 0.98 && b > 0.98);
    }

    #[test]
    fn to_rgba8_clamps_and_scales() {
        let c = Color::from_rgba(1.0, 0.0, 0.0, 1.0);
        assert_eq!(c.to_rgba8(), Rgba8::new(255, 0, 0, 255));
    }
}
