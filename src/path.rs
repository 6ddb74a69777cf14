//! Path construction: subpath building, relative-to-absolute expansion,
//! Bézier elevation/flattening, and arc approximation (spec.md §4.5).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::constants::{ARC_ANGLE_CLAMP, ARC_MAX_SEGMENTS, BEZIER_MAX_DEPTH, FULL_AA, SUBDIV};
use crate::matrix::Transform;

/// A path vertex in fixed-point subpixel units: `x` scaled by `SUBDIV`,
/// `y` scaled by `FULL_AA` (spec.md §4.5: "every path vertex is pushed
/// through `add_point(x_subdiv, y_aa)`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Subpath {
    pub vertices: Vec<Vertex>,
    pub closed: bool,
}

/// The bounding box of a finished shape, in the same fixed-point units as
/// `Vertex`, used to skip fully off-blit shapes (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub scan_min: i32,
    pub scan_max: i32,
    pub col_min: i32,
    pub col_max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pt {
    x: f32,
    y: f32,
}

fn mid(a: Pt, b: Pt) -> Pt {
    Pt { x: (a.x + b.x) / 2.0, y: (a.y + b.y) / 2.0 }
}

/// Accumulates subpaths for one shape. Relative operations are expanded
/// against the pen position; curves and arcs are flattened to line
/// segments as they're added. Every vertex passes through the builder's
/// transform on its way into fixed-point device units, so the caller always
/// feeds it user-space coordinates (spec.md §4.4's `user_to_device`).
#[derive(Clone)]
pub struct PathBuilder {
    scale_x: f32,
    scale_y: f32,
    transform: Transform,
    pen: Pt,
    subpath_start: Pt,
    subpaths: Vec<Subpath>,
    current: Subpath,
    scan_min: i32,
    scan_max: i32,
    col_min: i32,
    col_max: i32,
}

impl PathBuilder {
    /// `scale_x`/`scale_y` are the current transform's linear scale
    /// factors, used by the flatness tolerance in `flatten_cubic`. Equivalent
    /// to `with_transform(Transform::Scale(scale_x, scale_y))`.
    pub fn new(scale_x: f32, scale_y: f32) -> Self {
        Self::with_transform(Transform::Scale(scale_x, scale_y))
    }

    /// Builds a path in device space by applying `transform` to every
    /// incoming user-space point (spec.md §4.4: `user_to_device`).
    pub fn with_transform(transform: Transform) -> Self {
        let (sx, sy) = transform.apply_to_distance(1.0, 1.0);
        PathBuilder {
            scale_x: sx.abs().max(1e-6),
            scale_y: sy.abs().max(1e-6),
            transform,
            pen: Pt { x: 0.0, y: 0.0 },
            subpath_start: Pt { x: 0.0, y: 0.0 },
            subpaths: Vec::new(),
            current: Subpath::default(),
            scan_min: i32::MAX,
            scan_max: i32::MIN,
            col_min: i32::MAX,
            col_max: i32::MIN,
        }
    }

    /// Rebakes the transform applied to every point added from here on,
    /// without touching any vertices already pushed. Callers set this
    /// before each path op so the CTM in effect at that point in time is
    /// the one that transforms it, rather than whatever was current when
    /// the builder was constructed.
    pub fn set_transform(&mut self, transform: Transform) {
        let (sx, sy) = transform.apply_to_distance(1.0, 1.0);
        self.scale_x = sx.abs().max(1e-6);
        self.scale_y = sy.abs().max(1e-6);
        self.transform = transform;
    }

    pub fn begin_path(&mut self) {
        self.flush_current();
        self.subpaths.clear();
        self.scan_min = i32::MAX;
        self.scan_max = i32::MIN;
        self.col_min = i32::MAX;
        self.col_max = i32::MIN;
    }

    fn flush_current(&mut self) {
        if !self.current.vertices.is_empty() {
            self.subpaths.push(core::mem::take(&mut self.current));
        }
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.flush_current();
        self.pen = Pt { x, y };
        self.subpath_start = self.pen;
        self.add_point(x, y);
    }

    pub fn rel_move_to(&mut self, dx: f32, dy: f32) {
        self.move_to(self.pen.x + dx, self.pen.y + dy);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.add_point(x, y);
        self.pen = Pt { x, y };
    }

    pub fn rel_line_to(&mut self, dx: f32, dy: f32) {
        self.line_to(self.pen.x + dx, self.pen.y + dy);
    }

    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        let p0 = self.pen;
        self.flatten_cubic(p0, Pt { x: x1, y: y1 }, Pt { x: x2, y: y2 }, Pt { x: x3, y: y3 }, 0);
        self.pen = Pt { x: x3, y: y3 };
    }

    pub fn rel_curve_to(&mut self, dx1: f32, dy1: f32, dx2: f32, dy2: f32, dx3: f32, dy3: f32) {
        let p0 = self.pen;
        self.curve_to(p0.x + dx1, p0.y + dy1, p0.x + dx2, p0.y + dy2, p0.x + dx3, p0.y + dy3);
    }

    /// Elevates the quadratic to a cubic before flattening (spec.md §4.5).
    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let p0 = self.pen;
        let c = Pt { x: cx, y: cy };
        let p1 = Pt { x, y };
        let cp1 = Pt { x: p0.x + 2.0 / 3.0 * (c.x - p0.x), y: p0.y + 2.0 / 3.0 * (c.y - p0.y) };
        let cp2 = Pt { x: p1.x + 2.0 / 3.0 * (c.x - p1.x), y: p1.y + 2.0 / 3.0 * (c.y - p1.y) };
        self.flatten_cubic(p0, cp1, cp2, p1, 0);
        self.pen = p1;
    }

    pub fn rel_quad_to(&mut self, dcx: f32, dcy: f32, dx: f32, dy: f32) {
        let p0 = self.pen;
        self.quad_to(p0.x + dcx, p0.y + dcy, p0.x + dx, p0.y + dy);
    }

    /// Adaptive midpoint-flatness subdivision, hard-capped at
    /// `BEZIER_MAX_DEPTH` (spec.md §4.5).
    fn flatten_cubic(&mut self, p0: Pt, p1: Pt, p2: Pt, p3: Pt, depth: u32) {
        if depth >= BEZIER_MAX_DEPTH as u32 {
            self.add_point(p3.x, p3.y);
            return;
        }
        let p01 = mid(p0, p1);
        let p12 = mid(p1, p2);
        let p23 = mid(p2, p3);
        let p012 = mid(p01, p12);
        let p123 = mid(p12, p23);
        let p0123 = mid(p012, p123);

        let chord_mid = mid(p0, p3);
        let dx = p0123.x - chord_mid.x;
        let dy = p0123.y - chord_mid.y;
        let err = dx * dx + dy * dy;
        let tolerance = 2.0 / (self.scale_x * self.scale_x + self.scale_y * self.scale_y);

        if err > tolerance {
            self.flatten_cubic(p0, p01, p012, p0123, depth + 1);
            self.flatten_cubic(p0123, p123, p23, p3, depth + 1);
        } else {
            self.add_point(p3.x, p3.y);
        }
    }

    /// Approximates an arc with line segments from the current pen
    /// position. `start_angle`/`sweep_angle` are in radians.
    pub fn arc(&mut self, cx: f32, cy: f32, r: f32, start_angle: f32, sweep_angle: f32) {
        let by_radius = (r * 2.0 * core::f32::consts::PI).round().max(1.0) as i32;
        let angle_clamp_rad = ARC_ANGLE_CLAMP.to_radians();
        let by_angle = (sweep_angle.abs() / angle_clamp_rad).ceil().max(1.0) as i32;
        let segments = by_radius.max(by_angle).min(ARC_MAX_SEGMENTS);

        for i in 0..=segments {
            let t = i as f32 / segments as f32;
            let a = start_angle + sweep_angle * t;
            self.line_to(cx + r * a.cos(), cy + r * a.sin());
        }
    }

    /// Computes the tangent circle to the two legs `pen -> (x1,y1)` and
    /// `(x1,y1) -> (x2,y2)` and calls `arc` with the derived center and
    /// sweep. Degenerate inputs (collinear legs, tiny radius) fall
    /// through to a straight `line_to(x1, y1)` (spec.md §4.5).
    pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, r: f32) {
        let p0 = self.pen;
        let p1 = Pt { x: x1, y: y1 };
        let p2 = Pt { x: x2, y: y2 };

        let d1 = Pt { x: p0.x - p1.x, y: p0.y - p1.y };
        let d2 = Pt { x: p2.x - p1.x, y: p2.y - p1.y };
        let len1 = (d1.x * d1.x + d1.y * d1.y).sqrt();
        let len2 = (d2.x * d2.x + d2.y * d2.y).sqrt();

        if len1 < 1e-6 || len2 < 1e-6 || r < 1e-6 {
            self.line_to(x1, y1);
            return;
        }

        let v1 = Pt { x: d1.x / len1, y: d1.y / len1 };
        let v2 = Pt { x: d2.x / len2, y: d2.y / len2 };
        let cross = v1.x * v2.y - v1.y * v2.x;
        let dot = (v1.x * v2.x + v1.y * v2.y).clamp(-1.0, 1.0);
        let angle = dot.acos();

        if angle < 1e-4 || (core::f32::consts::PI - angle).abs() < 1e-4 {
            self.line_to(x1, y1);
            return;
        }

        let half = angle / 2.0;
        let dist = r / half.tan();
        let t1 = Pt { x: p1.x + v1.x * dist, y: p1.y + v1.y * dist };
        let t2 = Pt { x: p1.x + v2.x * dist, y: p1.y + v2.y * dist };

        let bisector = Pt { x: v1.x + v2.x, y: v1.y + v2.y };
        let bisector_len = (bisector.x * bisector.x + bisector.y * bisector.y).sqrt();
        if bisector_len < 1e-6 {
            self.line_to(x1, y1);
            return;
        }
        let bisector_n = Pt { x: bisector.x / bisector_len, y: bisector.y / bisector_len };
        let center_dist = r / half.sin();
        let center = Pt { x: p1.x + bisector_n.x * center_dist, y: p1.y + bisector_n.y * center_dist };

        let start_angle = (t1.y - center.y).atan2(t1.x - center.x);
        let end_angle = (t2.y - center.y).atan2(t2.x - center.x);
        let mut sweep = end_angle - start_angle;
        if cross > 0.0 && sweep < 0.0 {
            sweep += core::f32::consts::TAU;
        } else if cross < 0.0 && sweep > 0.0 {
            sweep -= core::f32::consts::TAU;
        }

        self.line_to(t1.x, t1.y);
        self.arc(center.x, center.y, r, start_angle, sweep);
    }

    /// Emits five segments (including a back-to-start) to close cleanly
    /// (spec.md §4.5).
    pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.line_to(x, y);
    }

    /// Composes four arcs and four lines; the corner radius is clamped to
    /// `min(w,h)/2` (spec.md §4.5).
    pub fn round_rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        let r = radius.min(w.min(h) / 2.0).max(0.0);
        let half_pi = core::f32::consts::FRAC_PI_2;

        self.move_to(x + r, y);
        self.line_to(x + w - r, y);
        self.arc(x + w - r, y + r, r, -half_pi, half_pi);
        self.line_to(x + w, y + h - r);
        self.arc(x + w - r, y + h - r, r, 0.0, half_pi);
        self.line_to(x + r, y + h);
        self.arc(x + r, y + h - r, r, half_pi, half_pi);
        self.line_to(x, y + r);
        self.arc(x + r, y + r, r, core::f32::consts::PI, half_pi);
    }

    pub fn close_path(&mut self) {
        self.current.closed = true;
        self.line_to(self.subpath_start.x, self.subpath_start.y);
    }

    fn add_point(&mut self, x: f32, y: f32) {
        let (dx, dy) = self.transform.apply_to_point(x, y);
        let x_subdiv = (dx * SUBDIV as f32).round() as i32;
        let y_aa = (dy * FULL_AA as f32).round() as i32;
        self.col_min = self.col_min.min(x_subdiv);
        self.col_max = self.col_max.max(x_subdiv);
        self.scan_min = self.scan_min.min(y_aa);
        self.scan_max = self.scan_max.max(y_aa);
        self.current.vertices.push(Vertex { x: x_subdiv, y: y_aa });
    }

    pub fn finish_shape(mut self) -> (Vec<Subpath>, Bounds) {
        self.flush_current();
        let bounds = if self.subpaths.is_empty() {
            Bounds { scan_min: 0, scan_max: 0, col_min: 0, col_max: 0 }
        } else {
            Bounds { scan_min: self.scan_min, scan_max: self.scan_max, col_min: self.col_min, col_max: self.col_max }
        };
        (self.subpaths, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_emits_five_vertices_closing_back_to_start() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.rectangle(0.0, 0.0, 10.0, 20.0);
        let (subpaths, _) = b.finish_shape();
        assert_eq!(subpaths.len(), 1);
        assert_eq!(subpaths[0].vertices.len(), 5);
        assert_eq!(subpaths[0].vertices.first(), subpaths[0].vertices.last());
    }

    #[test]
    fn round_rectangle_clamps_radius_to_half_min_dimension() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.round_rectangle(0.0, 0.0, 10.0, 4.0, 100.0);
        let (subpaths, bounds) = b.finish_shape();
        assert_eq!(subpaths.len(), 1);
        assert!(bounds.col_max - bounds.col_min <= (10.0 * SUBDIV as f32) as i32 + 1);
    }

    #[test]
    fn straight_line_flattens_to_two_points() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.curve_to(3.0, 0.0, 7.0, 0.0, 10.0, 0.0);
        let (subpaths, _) = b.finish_shape();
        assert_eq!(subpaths[0].vertices.len(), 2);
    }

    #[test]
    fn sharp_curve_subdivides_past_two_points() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.curve_to(0.0, 50.0, 50.0, 50.0, 50.0, 0.0);
        let (subpaths, _) = b.finish_shape();
        assert!(subpaths[0].vertices.len() > 2);
    }

    #[test]
    fn degenerate_arc_to_falls_through_to_line_to() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.arc_to(5.0, 0.0, 10.0, 0.0, 3.0);
        let (subpaths, _) = b.finish_shape();
        assert_eq!(subpaths[0].vertices.len(), 2);
        assert_eq!(subpaths[0].vertices[1], Vertex { x: (5.0 * SUBDIV as f32) as i32, y: 0 });
    }

    #[test]
    fn bounds_track_min_max_across_subpaths() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(-5.0, -2.0);
        b.line_to(5.0, 2.0);
        let (_, bounds) = b.finish_shape();
        assert_eq!(bounds.col_min, (-5.0 * SUBDIV as f32) as i32);
        assert_eq!(bounds.col_max, (5.0 * SUBDIV as f32) as i32);
    }
}
