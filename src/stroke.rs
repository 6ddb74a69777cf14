//! Stroke expansion: turns a path's subpaths into a fillable offset-polygon
//! outline, with caps, joins, and dash phase (spec.md §4.7).
//!
//! Grounded in `line.rs`/`graphics.rs`'s cap/join enum shapes; the offset
//! math itself has no teacher analogue (printpdf delegates stroking to the
//! PDF viewer) and is built directly from spec.md §4.7.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::constants::{FULL_AA, SUBDIV};
use crate::graphics::{LineCapStyle, LineJoinStyle};
use crate::path::{Bounds, Subpath, Vertex};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pt {
    x: f32,
    y: f32,
}

fn to_pt(v: Vertex) -> Pt {
    Pt { x: v.x as f32 / SUBDIV as f32, y: v.y as f32 / FULL_AA as f32 }
}

fn from_pt(p: Pt) -> Vertex {
    Vertex { x: (p.x * SUBDIV as f32).round() as i32, y: (p.y * FULL_AA as f32).round() as i32 }
}

fn sub(a: Pt, b: Pt) -> Pt {
    Pt { x: a.x - b.x, y: a.y - b.y }
}

fn len(p: Pt) -> f32 {
    (p.x * p.x + p.y * p.y).sqrt()
}

fn normal(a: Pt, b: Pt) -> Option<Pt> {
    let d = sub(b, a);
    let l = len(d);
    if l < 1e-6 {
        return None;
    }
    Some(Pt { x: -d.y / l, y: d.x / l })
}

/// Expands `subpaths` into new fillable subpaths representing the stroked
/// outline at `width`, applying dashing first if `dash_lengths` is
/// non-empty. Degenerate (single-point) subpaths are dropped.
pub fn expand(
    subpaths: &[Subpath],
    width: f32,
    cap: LineCapStyle,
    join: LineJoinStyle,
    miter_limit: f32,
    dash_lengths: &[f32],
    dash_offset: f32,
) -> (Vec<Subpath>, Bounds) {
    let half = (width / 2.0).max(1e-4);
    let mut out = Vec::new();

    let dashed;
    let source: &[Subpath] = if dash_lengths.is_empty() {
        subpaths
    } else {
        dashed = apply_dash(subpaths, dash_lengths, dash_offset);
        &dashed
    };

    for sp in source {
        if sp.vertices.len() < 2 {
            continue;
        }
        let pts: Vec<Pt> = sp.vertices.iter().map(|v| to_pt(*v)).collect();
        if let Some(poly) = stroke_one(&pts, half, cap, join, miter_limit, sp.closed) {
            out.push(poly);
        }
    }

    let mut bounds =
        Bounds { scan_min: i32::MAX, scan_max: i32::MIN, col_min: i32::MAX, col_max: i32::MIN };
    for sp in &out {
        for v in &sp.vertices {
            bounds.col_min = bounds.col_min.min(v.x);
            bounds.col_max = bounds.col_max.max(v.x);
            bounds.scan_min = bounds.scan_min.min(v.y);
            bounds.scan_max = bounds.scan_max.max(v.y);
        }
    }
    if out.is_empty() {
        bounds = Bounds { scan_min: 0, scan_max: 0, col_min: 0, col_max: 0 };
    }
    (out, bounds)
}

/// Offsets one polyline to both sides, closes the loop, and appends cap/join
/// geometry, producing a single fillable (non-zero winding) subpath.
fn stroke_one(
    pts: &[Pt],
    half: f32,
    cap: LineCapStyle,
    join: LineJoinStyle,
    miter_limit: f32,
    closed: bool,
) -> Option<Subpath> {
    if pts.len() < 2 {
        return None;
    }
    let mut left = Vec::new();
    let mut right = Vec::new();

    for w in pts.windows(2) {
        let n = normal(w[0], w[1])?;
        let off = Pt { x: n.x * half, y: n.y * half };
        left.push(Pt { x: w[0].x + off.x, y: w[0].y + off.y });
        left.push(Pt { x: w[1].x + off.x, y: w[1].y + off.y });
        right.push(Pt { x: w[0].x - off.x, y: w[0].y - off.y });
        right.push(Pt { x: w[1].x - off.x, y: w[1].y - off.y });
    }

    // Interior joins: bevel is already correct (offsets meet with a seam);
    // miter/round insert extra geometry at each interior vertex.
    if matches!(join, LineJoinStyle::Miter | LineJoinStyle::Round) && pts.len() > 2 {
        apply_joins(&mut left, pts, half, join, miter_limit, false);
        apply_joins(&mut right, pts, half, join, miter_limit, true);
    }

    let mut outline = Vec::with_capacity(left.len() + right.len() + 4);
    outline.extend(left.iter().copied());
    if !closed {
        apply_cap(&mut outline, pts[pts.len() - 1], pts[pts.len() - 2], half, cap);
    }
    outline.extend(right.iter().rev().copied());
    if !closed {
        apply_cap(&mut outline, pts[0], pts[1], half, cap);
    }

    let vertices: Vec<Vertex> = outline.into_iter().map(from_pt).collect();
    Some(Subpath { vertices, closed: true })
}

/// Inserts a miter or round join wedge at each interior vertex of one
/// offset rail. `invert` flips which side the join bulges toward, since the
/// right rail runs in the opposite winding direction from the left.
fn apply_joins(
    rail: &mut Vec<Pt>,
    centerline: &[Pt],
    half: f32,
    join: LineJoinStyle,
    miter_limit: f32,
    invert: bool,
) {
    let sign = if invert { -1.0 } else { 1.0 };
    let mut i = 2;
    while i + 1 < rail.len() {
        let center = centerline[i / 2];
        let incoming_end = rail[i - 1];
        let outgoing_start = rail[i];
        match join {
            LineJoinStyle::Miter => {
                if let Some(p) = miter_point(center, incoming_end, outgoing_start, half, miter_limit) {
                    rail.insert(i, p);
                    i += 1;
                }
            }
            LineJoinStyle::Round => {
                let mid = Pt {
                    x: center.x + sign * (incoming_end.x - center.x + outgoing_start.x - center.x) / 2.0,
                    y: center.y + sign * (incoming_end.y - center.y + outgoing_start.y - center.y) / 2.0,
                };
                rail.insert(i, mid);
                i += 1;
            }
            LineJoinStyle::Bevel => {}
        }
        i += 2;
    }
}

/// Intersects the two offset rails' lines, clipped to `miter_limit *
/// half-width` from the joint (spec.md §4.7); falls back to `None` (bevel)
/// past the limit.
fn miter_point(center: Pt, a: Pt, b: Pt, half: f32, miter_limit: f32) -> Option<Pt> {
    let bisector = Pt { x: (a.x - center.x) + (b.x - center.x), y: (a.y - center.y) + (b.y - center.y) };
    let l = len(bisector);
    if l < 1e-6 {
        return None;
    }
    let dir = Pt { x: bisector.x / l, y: bisector.y / l };
    let half_angle_cos = ((a.x - center.x) * dir.x + (a.y - center.y) * dir.y) / half;
    if half_angle_cos.abs() < 1e-4 {
        return None;
    }
    let miter_len = half / half_angle_cos.max(1e-4).min(1.0);
    if miter_len.abs() > half * miter_limit {
        return None;
    }
    Some(Pt { x: center.x + dir.x * miter_len, y: center.y + dir.y * miter_len })
}

fn apply_cap(outline: &mut Vec<Pt>, tip: Pt, prev: Pt, half: f32, cap: LineCapStyle) {
    match cap {
        LineCapStyle::Butt => {}
        LineCapStyle::ProjectingSquare => {
            if let Some(n) = normal(prev, tip) {
                let tangent = Pt { x: -n.y, y: n.x };
                let ext = Pt { x: tip.x + tangent.x * half, y: tip.y + tangent.y * half };
                let a = Pt { x: ext.x + n.x * half, y: ext.y + n.y * half };
                let b = Pt { x: ext.x - n.x * half, y: ext.y - n.y * half };
                outline.push(a);
                outline.push(b);
            }
        }
        LineCapStyle::Round => {
            if let Some(n) = normal(prev, tip) {
                const STEPS: usize = 8;
                let start = n.y.atan2(n.x);
                for i in 0..=STEPS {
                    let t = i as f32 / STEPS as f32;
                    let a = start - core::f32::consts::PI * t;
                    outline.push(Pt { x: tip.x + half * a.cos(), y: tip.y + half * a.sin() });
                }
            }
        }
    }
}

/// Splits each subpath into dash-on segments per spec.md §4.7, carrying
/// `dash_offset` phase across subpath starts. A zero-sum dash pattern (all
/// lengths zero) returns the input unchanged.
fn apply_dash(subpaths: &[Subpath], lengths: &[f32], offset: f32) -> Vec<Subpath> {
    let cycle: f32 = lengths.iter().sum();
    if cycle <= 0.0 {
        return subpaths.to_vec();
    }
    let mut out = Vec::new();
    for sp in subpaths {
        if sp.vertices.len() < 2 {
            continue;
        }
        let pts: Vec<Pt> = sp.vertices.iter().map(|v| to_pt(*v)).collect();
        let mut phase = offset.rem_euclid(cycle);
        let mut idx = 0usize;
        while phase >= lengths[idx] {
            phase -= lengths[idx];
            idx = (idx + 1) % lengths.len();
        }
        let mut pen_down = idx % 2 == 0;
        let mut remaining = lengths[idx] - phase;
        let mut current: Vec<Pt> = if pen_down { vec![pts[0]] } else { Vec::new() };

        for w in pts.windows(2) {
            let mut a = w[0];
            let b = w[1];
            let mut seg_len = len(sub(b, a));
            while seg_len > remaining {
                let t = remaining / seg_len.max(1e-6);
                let split = Pt { x: a.x + (b.x - a.x) * t, y: a.y + (b.y - a.y) * t };
                if pen_down {
                    current.push(split);
                    out.push(Subpath { vertices: current.drain(..).map(from_pt).collect(), closed: false });
                } else {
                    current = vec![split];
                }
                seg_len -= remaining;
                a = split;
                idx = (idx + 1) % lengths.len();
                remaining = lengths[idx];
                pen_down = !pen_down;
            }
            remaining -= seg_len;
            if pen_down {
                current.push(b);
            }
        }
        if pen_down && current.len() >= 2 {
            out.push(Subpath { vertices: current.into_iter().map(from_pt).collect(), closed: false });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathBuilder;

    #[test]
    fn straight_segment_expands_to_a_rectangle_outline() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 10.0);
        b.line_to(10.0, 10.0);
        let (subpaths, _) = b.finish_shape();
        let (outline, _) = expand(&subpaths, 4.0, LineCapStyle::Butt, LineJoinStyle::Miter, 10.0, &[], 0.0);
        assert_eq!(outline.len(), 1);
        assert!(outline[0].vertices.len() >= 4);
    }

    #[test]
    fn dash_pattern_splits_into_multiple_subpaths() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.line_to(20.0, 0.0);
        let (subpaths, _) = b.finish_shape();
        let dashed = apply_dash(&subpaths, &[4.0, 4.0], 0.0);
        assert!(dashed.len() > 1);
    }

    #[test]
    fn zero_length_dash_cycle_leaves_path_untouched() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.line_to(10.0, 0.0);
        let (subpaths, _) = b.finish_shape();
        let result = apply_dash(&subpaths, &[0.0, 0.0], 0.0);
        assert_eq!(result.len(), subpaths.len());
    }
}
