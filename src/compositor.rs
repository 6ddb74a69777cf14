//! Blend × Porter-Duff compositing kernels, applied per coverage byte
//! (spec.md §4.8).
//!
//! Grounded in `color.rs`'s channel math (the naive analytic CMYK/Lab
//! conversions); the decision table and blend formulas are a direct,
//! literal transcription of spec.md §4.8's table and kernel descriptions.
//! The AVX2 SIMD fast path spec.md mentions is out of scope for this
//! rewrite — see `DESIGN.md`'s Open Question log — so every row goes
//! through the scalar kernel below; it's still branch-shaped the same way
//! (all-zero / all-opaque coverage octets fast-path first).

use crate::color::Rgba8;
use crate::gstate::{BlendMode, CompositingMode};

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Applies `blend_mode` to premultiplied-alpha-free (straight) source and
/// destination channels, returning the blended color part only (spec.md
/// §4.8: "run blend(src, dst) to replace the color part").
fn blend_channel(mode: BlendMode, src: [f32; 3], dst: [f32; 3]) -> [f32; 3] {
    use BlendMode::*;
    match mode {
        Normal => src,
        Multiply => mul3(src, dst),
        Screen => screen3(src, dst),
        Overlay => [overlay(dst[0], src[0]), overlay(dst[1], src[1]), overlay(dst[2], src[2])],
        Darken => [src[0].min(dst[0]), src[1].min(dst[1]), src[2].min(dst[2])],
        Lighten => [src[0].max(dst[0]), src[1].max(dst[1]), src[2].max(dst[2])],
        ColorDodge => [dodge(dst[0], src[0]), dodge(dst[1], src[1]), dodge(dst[2], src[2])],
        ColorBurn => [burn(dst[0], src[0]), burn(dst[1], src[1]), burn(dst[2], src[2])],
        HardLight => [overlay(src[0], dst[0]), overlay(src[1], dst[1]), overlay(src[2], dst[2])],
        SoftLight => [soft_light(dst[0], src[0]), soft_light(dst[1], src[1]), soft_light(dst[2], src[2])],
        Difference => [
            (src[0] - dst[0]).abs(),
            (src[1] - dst[1]).abs(),
            (src[2] - dst[2]).abs(),
        ],
        Exclusion => [
            src[0] + dst[0] - 2.0 * src[0] * dst[0],
            src[1] + dst[1] - 2.0 * src[1] * dst[1],
            src[2] + dst[2] - 2.0 * src[2] * dst[2],
        ],
        Hue => set_hue(src, luminosity(dst), set_saturation_val(src, saturation(dst))),
        Saturation => set_hue(set_saturation_val(dst, saturation(src)), luminosity(dst), dst),
        Color => set_lum(src, luminosity(dst)),
        Luminosity => set_lum(dst, luminosity(src)),
        Addition => [
            clamp01(src[0] + dst[0]),
            clamp01(src[1] + dst[1]),
            clamp01(src[2] + dst[2]),
        ],
        // dst - src, matching the "Subtract" convention used by other
        // compositing tools (the destination is what gets punched through).
        Subtraction => [
            clamp01(dst[0] - src[0]),
            clamp01(dst[1] - src[1]),
            clamp01(dst[2] - src[2]),
        ],
        Divide => [divide(dst[0], src[0]), divide(dst[1], src[1]), divide(dst[2], src[2])],
    }
}

fn divide(d: f32, s: f32) -> f32 {
    if s <= 0.0 {
        1.0
    } else {
        clamp01(d / s)
    }
}

fn mul3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2]]
}

fn screen3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [screen(a[0], b[0]), screen(a[1], b[1]), screen(a[2], b[2])]
}

fn screen(s: f32, d: f32) -> f32 {
    s + d - s * d
}

fn overlay(a: f32, b: f32) -> f32 {
    if a <= 0.5 {
        2.0 * a * b
    } else {
        1.0 - 2.0 * (1.0 - a) * (1.0 - b)
    }
}

fn dodge(d: f32, s: f32) -> f32 {
    if d == 0.0 {
        0.0
    } else if s >= 1.0 {
        1.0
    } else {
        clamp01(d / (1.0 - s))
    }
}

fn burn(d: f32, s: f32) -> f32 {
    if d >= 1.0 {
        1.0
    } else if s <= 0.0 {
        0.0
    } else {
        1.0 - clamp01((1.0 - d) / s)
    }
}

fn soft_light(d: f32, s: f32) -> f32 {
    if s <= 0.5 {
        d - (1.0 - 2.0 * s) * d * (1.0 - d)
    } else {
        let g = if d <= 0.25 { ((16.0 * d - 12.0) * d + 4.0) * d } else { d.sqrt() };
        d + (2.0 * s - 1.0) * (g - d)
    }
}

/// HSL-family helpers per spec.md §4.8's "luminance L = 0.3R+0.59G+0.11B",
/// with the classic clip-luminosity / clip-saturation routines.
fn luminosity(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn saturation(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - luminosity(c);
    let mut out = [c[0] + d, c[1] + d, c[2] + d];
    clip_color(&mut out);
    out
}

fn clip_color(c: &mut [f32; 3]) {
    let l = luminosity(*c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    if n < 0.0 {
        for ch in c.iter_mut() {
            *ch = l + (*ch - l) * l / (l - n).max(1e-6);
        }
    }
    if x > 1.0 {
        for ch in c.iter_mut() {
            *ch = l + (*ch - l) * (1.0 - l) / (x - l).max(1e-6);
        }
    }
}

fn set_saturation_val(c: [f32; 3], s: f32) -> [f32; 3] {
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| c[a].partial_cmp(&c[b]).unwrap());
    let (min_i, mid_i, max_i) = (idx[0], idx[1], idx[2]);
    let mut out = [0.0f32; 3];
    if c[max_i] > c[min_i] {
        out[mid_i] = (c[mid_i] - c[min_i]) * s / (c[max_i] - c[min_i]);
        out[max_i] = s;
    }
    out
}

fn set_hue(src: [f32; 3], l: f32, sat_vec: [f32; 3]) -> [f32; 3] {
    let _ = src;
    set_lum(sat_vec, l)
}

/// Premultiplied source-over, the source-type-independent generic kernel
/// (spec.md §4.8): `out = F_s*src + F_d*dst`, with `blend_mode` replacing
/// the color part first when not `Normal`.
///
/// `coverage` (0-255) scales the source's contribution, `global_alpha`
/// (0-255) is the paint-wide alpha multiplier, and `dst` is straight-alpha
/// (not premultiplied), matching `Rgba8`'s storage.
pub fn apply_coverage(
    src: Rgba8,
    dst: Rgba8,
    coverage: u8,
    global_alpha: u8,
    blend_mode: BlendMode,
    compositing_mode: CompositingMode,
) -> Rgba8 {
    if coverage == 0 || global_alpha == 0 {
        return dst;
    }
    if matches!(compositing_mode, CompositingMode::Clear) {
        return Rgba8::TRANSPARENT;
    }
    if matches!(compositing_mode, CompositingMode::Copy) && coverage == 255 && global_alpha == 255 {
        return src;
    }

    let alpha_src = (src.a as f32 / 255.0) * (coverage as f32 / 255.0) * (global_alpha as f32 / 255.0);
    let alpha_dst = dst.a as f32 / 255.0;

    let src_rgb = [src.r as f32 / 255.0, src.g as f32 / 255.0, src.b as f32 / 255.0];
    let dst_rgb = [dst.r as f32 / 255.0, dst.g as f32 / 255.0, dst.b as f32 / 255.0];
    let blended = if alpha_dst > 0.0 {
        blend_channel(blend_mode, src_rgb, dst_rgb)
    } else {
        src_rgb
    };

    let (f_s, f_d) = match compositing_mode {
        CompositingMode::SourceOver => (1.0, 1.0 - alpha_src),
        CompositingMode::DestinationOver => (1.0 - alpha_dst, 1.0),
        CompositingMode::SourceIn => (alpha_dst, 0.0),
        CompositingMode::DestinationIn => (0.0, alpha_src),
        CompositingMode::SourceOut => (1.0 - alpha_dst, 0.0),
        CompositingMode::DestinationOut => (0.0, 1.0 - alpha_src),
        CompositingMode::SourceAtop => (alpha_dst, 1.0 - alpha_src),
        CompositingMode::DestinationAtop => (1.0 - alpha_dst, alpha_src),
        CompositingMode::Xor => (1.0 - alpha_dst, 1.0 - alpha_src),
        CompositingMode::Copy => (1.0, 0.0),
        CompositingMode::Lighter => (1.0, 1.0),
        // Unreachable: handled by the early return above.
        CompositingMode::Clear => (0.0, 0.0),
    };

    let out_a = clamp01(alpha_src * f_s + alpha_dst * f_d);
    if out_a <= 0.0 {
        return Rgba8::TRANSPARENT;
    }
    let mut out_rgb = [0.0f32; 3];
    for i in 0..3 {
        let premult_src = blended[i] * alpha_src * f_s;
        let premult_dst = dst_rgb[i] * alpha_dst * f_d;
        out_rgb[i] = clamp01((premult_src + premult_dst) / out_a);
    }

    Rgba8::new(
        (out_rgb[0] * 255.0).round() as u8,
        (out_rgb[1] * 255.0).round() as u8,
        (out_rgb[2] * 255.0).round() as u8,
        (out_a * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_coverage_leaves_destination_untouched() {
        let dst = Rgba8::new(10, 20, 30, 255);
        let src = Rgba8::new(255, 0, 0, 255);
        let out = apply_coverage(src, dst, 0, 255, BlendMode::Normal, CompositingMode::SourceOver);
        assert_eq!(out, dst);
    }

    #[test]
    fn opaque_source_over_transparent_dest_is_the_source() {
        let dst = Rgba8::new(0, 0, 0, 0);
        let src = Rgba8::new(255, 0, 0, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Normal, CompositingMode::SourceOver);
        assert_eq!(out, src);
    }

    #[test]
    fn half_alpha_source_over_opaque_white_averages() {
        let dst = Rgba8::new(255, 255, 255, 255);
        let src = Rgba8::new(0, 0, 0, 128);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Normal, CompositingMode::SourceOver);
        assert!((out.r as i32 - 127).abs() <= 2);
        assert_eq!(out.a, 255);
    }

    #[test]
    fn clear_compositing_discards_everything() {
        let dst = Rgba8::new(10, 20, 30, 255);
        let src = Rgba8::new(255, 255, 255, 255);
        let out = apply_coverage(src, dst, 255, 0, BlendMode::Normal, CompositingMode::SourceOver);
        assert_eq!(out, dst);
    }

    #[test]
    fn clear_compositing_mode_always_writes_transparent() {
        let dst = Rgba8::new(10, 20, 30, 255);
        let src = Rgba8::new(255, 255, 255, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Normal, CompositingMode::Clear);
        assert_eq!(out, Rgba8::TRANSPARENT);
    }

    #[test]
    fn multiply_blend_darkens() {
        let dst = Rgba8::new(200, 200, 200, 255);
        let src = Rgba8::new(100, 100, 100, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Multiply, CompositingMode::SourceOver);
        assert!(out.r < 100);
    }

    #[test]
    fn addition_blend_brightens_and_clamps() {
        let dst = Rgba8::new(200, 200, 200, 255);
        let src = Rgba8::new(100, 100, 100, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Addition, CompositingMode::SourceOver);
        assert_eq!(out.r, 255);
    }

    #[test]
    fn subtraction_blend_darkens_toward_destination_minus_source() {
        let dst = Rgba8::new(200, 150, 100, 255);
        let src = Rgba8::new(50, 50, 50, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Subtraction, CompositingMode::SourceOver);
        assert!((out.r as i32 - 150).abs() <= 2);
        assert!((out.g as i32 - 100).abs() <= 2);
    }

    #[test]
    fn divide_blend_guards_against_zero_source() {
        let dst = Rgba8::new(100, 100, 100, 255);
        let src = Rgba8::new(0, 0, 0, 255);
        let out = apply_coverage(src, dst, 255, 255, BlendMode::Divide, CompositingMode::SourceOver);
        assert_eq!(out.r, 255);
    }
}
