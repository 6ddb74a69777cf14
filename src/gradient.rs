//! Gradient stops, LUT priming, and linear/radial sampling (spec.md §4.9).
//!
//! Grounded in `color.rs`'s lazy-cache-with-`valid`-bitmask shape: the LUT
//! is primed once and re-used until a stop changes, the same pattern
//! `Color`'s per-representation caching uses at a smaller scale.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::color::Color;
use crate::constants::{GRADIENT_LUT_LEN, MAX_GRADIENT_STOPS};
use smallvec::SmallVec;

/// One color stop at parameter `offset` in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Linear gradient geometry, precomputed at source setup (spec.md §4.9:
/// "Precompute `(dx, dy, length, start, rdelta)`").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGeometry {
    pub dx: f32,
    pub dy: f32,
    pub length: f32,
    pub start: f32,
    pub rdelta: f32,
}

impl LinearGeometry {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> LinearGeometry {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let length = (dx * dx + dy * dy).sqrt().max(1e-6);
        let start = (dx * x0 + dy * y0) / length;
        let end = (dx * x1 + dy * y1) / length;
        let rdelta = if (end - start).abs() < 1e-6 { 0.0 } else { 1.0 / (end - start) };
        LinearGeometry { dx, dy, length, start, rdelta }
    }

    /// Gradient parameter `t` at device point `(x, y)`, unclamped (spec.md
    /// §4.9: `t = ((dx·x + dy·y)/length − start)·rdelta`).
    pub fn t_at(&self, x: f32, y: f32) -> f32 {
        ((self.dx * x + self.dy * y) / self.length - self.start) * self.rdelta
    }
}

/// Radial gradient geometry: two concentric circles `(x0,y0,r0)` and
/// `(x1,y1,r1)`, narrowed here to the common case of a single moving
/// center (spec.md describes "two circles plus `rdelta`"; this crate
/// samples distance from the inner circle's center, matching the literal
/// formula in §4.9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialGeometry {
    pub x0: f32,
    pub y0: f32,
    pub r0: f32,
    pub rdelta: f32,
}

impl RadialGeometry {
    pub fn new(x0: f32, y0: f32, r0: f32, r1: f32) -> RadialGeometry {
        let rdelta = if (r1 - r0).abs() < 1e-6 { 0.0 } else { 1.0 / (r1 - r0) };
        RadialGeometry { x0, y0, r0, rdelta }
    }

    /// Gradient parameter `t` at device point `(x, y)` (spec.md §4.9:
    /// `t = (hypot(x−x0, y−y0) − r0)·rdelta`).
    pub fn t_at(&self, x: f32, y: f32) -> f32 {
        let dx = x - self.x0;
        let dy = y - self.y0;
        (dx.hypot(dy) - self.r0) * self.rdelta
    }
}

/// A gradient's stop array plus its primed LUTs. `valid` tracks whether the
/// LUTs still reflect `stops` (spec.md §4.9: "dirty flag cleared whenever
/// stops change, re-primed lazily").
#[derive(Debug, Clone)]
pub struct Gradient {
    pub stops: SmallVec<[GradientStop; MAX_GRADIENT_STOPS]>,
    straight: Vec<Color>,
    premultiplied: Vec<Color>,
    valid: bool,
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient {
            stops: SmallVec::new(),
            straight: Vec::new(),
            premultiplied: Vec::new(),
            valid: false,
        }
    }
}

impl Gradient {
    pub fn new() -> Gradient {
        Gradient::default()
    }

    /// Appends a stop and marks the LUT dirty. Stops past
    /// [`MAX_GRADIENT_STOPS`] are dropped silently (spec.md §9: the stop
    /// array is a fixed-capacity slot table, not a growable list).
    pub fn add_stop(&mut self, offset: f32, color: Color) {
        if self.stops.len() >= MAX_GRADIENT_STOPS {
            return;
        }
        self.stops.push(GradientStop { offset: offset.clamp(0.0, 1.0), color });
        self.valid = false;
    }

    fn ensure_primed(&mut self) {
        if self.valid {
            return;
        }
        self.straight.clear();
        self.premultiplied.clear();
        self.straight.reserve(GRADIENT_LUT_LEN);
        self.premultiplied.reserve(GRADIENT_LUT_LEN);

        let mut sorted: SmallVec<[GradientStop; MAX_GRADIENT_STOPS]> = self.stops.clone();
        sorted.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap());

        for i in 0..GRADIENT_LUT_LEN {
            let v = i as f32 / (GRADIENT_LUT_LEN - 1) as f32;
            let c = sample_stops(&sorted, v);
            let (r, g, b, a) = c.rgba();
            self.straight.push(c);
            self.premultiplied.push(Color::from_rgba(r * a, g * a, b * a, a));
        }
        self.valid = true;
    }

    /// Looks up `t` (clamped to `[0,1]`) in the straight-alpha LUT, priming
    /// it first if dirty.
    pub fn sample(&mut self, t: f32) -> Color {
        self.ensure_primed();
        let idx = lut_index(t);
        self.straight[idx].clone()
    }

    /// Looks up `t` in the alpha-premultiplied LUT (used by the compositor
    /// when accumulating coverage without re-dividing per pixel).
    pub fn sample_premultiplied(&mut self, t: f32) -> Color {
        self.ensure_primed();
        let idx = lut_index(t);
        self.premultiplied[idx].clone()
    }
}

fn lut_index(t: f32) -> usize {
    let clamped = t.clamp(0.0, 1.0);
    ((clamped * (GRADIENT_LUT_LEN - 1) as f32).round() as usize).min(GRADIENT_LUT_LEN - 1)
}

/// Interpolates `stops` (must be offset-sorted) at parameter `v`. Fewer
/// than two stops degenerates to the single stop's color, or transparent
/// black if there are none (spec.md §8: "sampling `G` at `t=0` equals the
/// first stop's color and at `t=1` the last stop's color").
fn sample_stops(stops: &[GradientStop], v: f32) -> Color {
    match stops.len() {
        0 => Color::from_rgba(0.0, 0.0, 0.0, 0.0),
        1 => stops[0].color.clone(),
        _ => {
            if v <= stops[0].offset {
                return stops[0].color.clone();
            }
            let last = stops.len() - 1;
            if v >= stops[last].offset {
                return stops[last].color.clone();
            }
            for w in stops.windows(2) {
                let (a, b) = (&w[0], &w[1]);
                if v >= a.offset && v <= b.offset {
                    let span = (b.offset - a.offset).max(1e-6);
                    let t = (v - a.offset) / span;
                    let (ar, ag, ab, aa) = a.color.rgba();
                    let (br, bg, bb, ba) = b.color.rgba();
                    return Color::from_rgba(
                        ar + (br - ar) * t,
                        ag + (bg - ag) * t,
                        ab + (bb - ab) * t,
                        aa + (ba - aa) * t,
                    );
                }
            }
            stops[last].color.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_first_and_last_stop() {
        let mut g = Gradient::new();
        g.add_stop(0.0, Color::from_rgba(1.0, 0.0, 0.0, 1.0));
        g.add_stop(1.0, Color::from_rgba(0.0, 0.0, 1.0, 1.0));
        assert_eq!(g.sample(0.0).rgba(), (1.0, 0.0, 0.0, 1.0));
        assert_eq!(g.sample(1.0).rgba(), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn midpoint_interpolates() {
        let mut g = Gradient::new();
        g.add_stop(0.0, Color::from_rgba(0.0, 0.0, 0.0, 1.0));
        g.add_stop(1.0, Color::from_rgba(1.0, 1.0, 1.0, 1.0));
        let (r, _, _, _) = g.sample(0.5).rgba();
        assert!((r - 0.5).abs() < 0.05);
    }

    #[test]
    fn linear_geometry_axis_aligned() {
        let geo = LinearGeometry::new(0.0, 0.0, 10.0, 0.0);
        assert!((geo.t_at(0.0, 0.0) - 0.0).abs() < 1e-4);
        assert!((geo.t_at(10.0, 0.0) - 1.0).abs() < 1e-4);
        assert!((geo.t_at(5.0, 0.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn radial_geometry_samples_by_distance() {
        let geo = RadialGeometry::new(0.0, 0.0, 0.0, 10.0);
        assert!((geo.t_at(0.0, 0.0) - 0.0).abs() < 1e-4);
        assert!((geo.t_at(10.0, 0.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn stop_beyond_capacity_is_dropped() {
        let mut g = Gradient::new();
        for i in 0..(MAX_GRADIENT_STOPS + 4) {
            g.add_stop(i as f32 / (MAX_GRADIENT_STOPS + 3) as f32, Color::from_rgba(0.0, 0.0, 0.0, 1.0));
        }
        assert_eq!(g.stops.len(), MAX_GRADIENT_STOPS);
    }
}
