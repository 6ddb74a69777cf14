//! The edge list: packed sub-pixel edges built from a finished path's
//! subpaths, sorted by `(y0, x0)` ready for the scanline engine (spec.md
//! §4.6).
//!
//! Grounded in `graphics.rs`'s `Rect`/geometry shape: an edge is a tiny
//! plain-old-data struct, built by a free function rather than a method on
//! some larger "renderer" object.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::path::{Bounds, Subpath, Vertex};

/// One edge between two path vertices, already sub-pixel scaled (x in
/// `SUBDIV` units, y in `FULL_AA` units per spec.md §3). `flipped` records
/// whether the edge was y-reversed to keep `y0 <= y1`, so winding-rule
/// parity can still credit the original direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub flipped: bool,
}

impl Edge {
    /// Winding contribution of this edge: `-1` if flipped, `+1` otherwise
    /// (spec.md §4.6: "non-zero winding counts `+1`/`-1` by flip flag").
    pub fn winding(&self) -> i32 {
        if self.flipped {
            -1
        } else {
            1
        }
    }

    fn from_segment(a: Vertex, b: Vertex) -> Option<Edge> {
        if a.y == b.y {
            return None; // horizontal edges never cross a scanline
        }
        if a.y < b.y {
            Some(Edge { x0: a.x, y0: a.y, x1: b.x, y1: b.y, flipped: false })
        } else {
            Some(Edge { x0: b.x, y0: b.y, x1: a.x, y1: a.y, flipped: true })
        }
    }
}

/// A sorted, ready-to-rasterize edge list plus the shape's bounding box.
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    pub edges: Vec<Edge>,
    pub bounds: Bounds,
}

impl EdgeList {
    /// Builds edges from every subpath, closing each one back to its start
    /// vertex if the builder hadn't already (fill always treats a subpath
    /// as closed; stroke decides separately in `stroke.rs`).
    pub fn build(subpaths: &[Subpath], bounds: Bounds) -> EdgeList {
        let mut edges = Vec::new();
        for sp in subpaths {
            if sp.vertices.len() < 2 {
                continue;
            }
            for pair in sp.vertices.windows(2) {
                if let Some(e) = Edge::from_segment(pair[0], pair[1]) {
                    edges.push(e);
                }
            }
            let first = sp.vertices[0];
            let last = *sp.vertices.last().expect("checked len >= 2 above");
            if first != last {
                if let Some(e) = Edge::from_segment(last, first) {
                    edges.push(e);
                }
            }
        }
        edges.sort_by_key(|e| (e.y0, e.x0));
        EdgeList { edges, bounds }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathBuilder;

    #[test]
    fn closed_rectangle_yields_four_edges() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.rectangle(0.0, 0.0, 10.0, 10.0);
        let (subpaths, bounds) = b.finish_shape();
        let edges = EdgeList::build(&subpaths, bounds);
        // rectangle() already closes back to start; the top and bottom
        // edges are horizontal and dropped, leaving the two verticals plus
        // whatever the explicit closing segment contributes.
        assert!(edges.edges.len() >= 2);
        assert!(edges.edges.iter().all(|e| e.y0 <= e.y1));
    }

    #[test]
    fn edges_sorted_by_y_then_x() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 10.0);
        b.line_to(10.0, 0.0);
        b.line_to(20.0, 10.0);
        let (subpaths, bounds) = b.finish_shape();
        let edges = EdgeList::build(&subpaths, bounds);
        for pair in edges.edges.windows(2) {
            assert!((pair[0].y0, pair[0].x0) <= (pair[1].y0, pair[1].x0));
        }
    }

    #[test]
    fn horizontal_edge_is_dropped() {
        let mut b = PathBuilder::new(1.0, 1.0);
        b.move_to(0.0, 0.0);
        b.line_to(10.0, 0.0);
        let (subpaths, bounds) = b.finish_shape();
        let edges = EdgeList::build(&subpaths, bounds);
        assert!(edges.is_empty());
    }
}
