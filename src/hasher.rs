//! Tile-fingerprint damage tracking: a no-paint back end that reuses the
//! rasterizer's path/edge pipeline to answer "which regions changed"
//! instead of "what do they look like" (spec.md §4.10).
//!
//! Grounded in `edge.rs`'s free-function shape (`EdgeList::build` is a
//! plain associated function, not a method on some larger "renderer"
//! object) and `compositor.rs`'s small-scalar-kernel texture: `TileHasher`
//! is data plus a handful of associated functions, not a back end behind a
//! trait.

use sha1::{Digest, Sha1};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::color::Color;
use crate::constants::{HASH_COLS, HASH_ROWS};
use crate::edge::EdgeList;
use crate::graphics::FillRule;
use crate::gstate::Source;
use crate::matrix::Transform;

/// A tile's accumulated fingerprint: the XOR of every shape fingerprint
/// that intersected it this frame (spec.md §4.10). Truncated to the
/// digest's first 8 bytes -- the hash only needs to disambiguate "did
/// anything in this tile change", not resist a deliberate collision.
pub type TileHash = u64;

/// Divides a surface into a fixed `HASH_ROWS x HASH_COLS` grid and
/// accumulates a per-tile XOR fingerprint of every `fill`/`stroke`/`text`
/// shape that touches it. Two `TileHasher`s built from consecutive frames'
/// draw lists can be diffed with [`TileHasher::dirty_tiles`] to find the
/// tiles a tiled scheduler needs to re-render.
#[derive(Debug, Clone)]
pub struct TileHasher {
    width: u32,
    height: u32,
    tiles: [[TileHash; HASH_COLS]; HASH_ROWS],
}

impl TileHasher {
    pub fn new(width: u32, height: u32) -> TileHasher {
        TileHasher { width: width.max(1), height: height.max(1), tiles: [[0; HASH_COLS]; HASH_ROWS] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tile width/height in device pixels, rounded up so the grid always
    /// covers the full surface even when `HASH_ROWS`/`HASH_COLS` don't
    /// divide it evenly.
    fn tile_size(&self) -> (u32, u32) {
        let tw = (self.width as usize).div_ceil(HASH_COLS).max(1) as u32;
        let th = (self.height as usize).div_ceil(HASH_ROWS).max(1) as u32;
        (tw, th)
    }

    /// Folds one shape's fingerprint into every tile its device-pixel
    /// bounding box overlaps (spec.md §4.10: "each tile accumulates the
    /// XOR of fingerprints of shapes that intersect it").
    ///
    /// `bounds` is `(x0, y0, x1, y1)` in device pixels; `edges` is the
    /// flattened edge list the rasterizer would otherwise feed to the
    /// scanline engine for this same shape.
    pub fn record_shape(
        &mut self,
        bounds: (i32, i32, i32, i32),
        fill_rule: FillRule,
        source: &Source,
        transform: &Transform,
        edges: &EdgeList,
    ) {
        let fingerprint = fingerprint_shape(bounds, fill_rule, source, transform, edges);
        let (tw, th) = self.tile_size();
        let (x0, y0, x1, y1) = bounds;
        let max_col = HASH_COLS - 1;
        let max_row = HASH_ROWS - 1;
        let col0 = ((x0.max(0) as u32) / tw).min(max_col as u32) as usize;
        let col1 = ((x1.max(0) as u32) / tw).min(max_col as u32) as usize;
        let row0 = ((y0.max(0) as u32) / th).min(max_row as u32) as usize;
        let row1 = ((y1.max(0) as u32) / th).min(max_row as u32) as usize;
        for row in row0..=row1 {
            for col in col0..=col1 {
                self.tiles[row][col] ^= fingerprint;
            }
        }
    }

    pub fn tile_hash(&self, row: usize, col: usize) -> TileHash {
        self.tiles[row][col]
    }

    /// Tiles whose hash differs between this frame and `previous`, in
    /// row-major order (spec.md §4.10, §5: "downstream schedulers compare
    /// per-tile hashes across frames to identify dirty tiles").
    pub fn dirty_tiles(&self, previous: &TileHasher) -> Vec<(usize, usize)> {
        let mut dirty = Vec::new();
        for row in 0..HASH_ROWS {
            for col in 0..HASH_COLS {
                if self.tiles[row][col] != previous.tiles[row][col] {
                    dirty.push((row, col));
                }
            }
        }
        dirty
    }

    /// Zeroes every tile hash, e.g. before re-hashing a draw list from
    /// scratch against a `TileHasher` that's about to become "previous".
    pub fn clear(&mut self) {
        self.tiles = [[0; HASH_COLS]; HASH_ROWS];
    }
}

fn fingerprint_shape(
    bounds: (i32, i32, i32, i32),
    fill_rule: FillRule,
    source: &Source,
    transform: &Transform,
    edges: &EdgeList,
) -> TileHash {
    let mut hasher = Sha1::new();
    hasher.update(bounds.0.to_le_bytes());
    hasher.update(bounds.1.to_le_bytes());
    hasher.update(bounds.2.to_le_bytes());
    hasher.update(bounds.3.to_le_bytes());
    hasher.update([matches!(fill_rule, FillRule::EvenOdd) as u8]);
    hash_source(&mut hasher, source);
    for component in transform.as_array() {
        hasher.update(component.to_le_bytes());
    }
    for edge in &edges.edges {
        hasher.update(edge.x0.to_le_bytes());
        hasher.update(edge.y0.to_le_bytes());
        hasher.update(edge.x1.to_le_bytes());
        hasher.update(edge.y1.to_le_bytes());
        hasher.update([edge.flipped as u8]);
    }
    let digest = hasher.finalize();
    let mut truncated = [0u8; 8];
    truncated.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(truncated)
}

fn hash_source(hasher: &mut Sha1, source: &Source) {
    match source {
        Source::Solid(color) => {
            hasher.update([0u8]);
            hash_color(hasher, color);
        }
        Source::Gradient(id) => {
            hasher.update([1u8]);
            hasher.update((id.0 as u64).to_le_bytes());
        }
        Source::Texture(id) => {
            hasher.update([2u8]);
            hasher.update((id.0 as u64).to_le_bytes());
        }
    }
}

fn hash_color(hasher: &mut Sha1, color: &Color) {
    let rgba = color.to_rgba8();
    hasher.update([rgba.r, rgba.g, rgba.b, rgba.a]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;

    fn sample_edges() -> EdgeList {
        EdgeList { edges: vec![Edge { x0: 0, y0: 0, x1: 0, y1: 100, flipped: false }], bounds: Default::default() }
    }

    #[test]
    fn identical_shapes_fold_to_identical_tile_hashes() {
        let edges = sample_edges();
        let source = Source::Solid(Color::from_rgba(1.0, 0.0, 0.0, 1.0));
        let transform = Transform::Identity;

        let mut a = TileHasher::new(800, 600);
        a.record_shape((10, 10, 20, 20), FillRule::NonZero, &source, &transform, &edges);

        let mut b = TileHasher::new(800, 600);
        b.record_shape((10, 10, 20, 20), FillRule::NonZero, &source, &transform, &edges);

        assert!(a.dirty_tiles(&b).is_empty());
    }

    #[test]
    fn moving_a_shape_dirties_a_different_tile_set() {
        let edges = sample_edges();
        let source = Source::Solid(Color::from_rgba(1.0, 0.0, 0.0, 1.0));
        let transform = Transform::Identity;

        let mut base = TileHasher::new(800, 600);
        base.record_shape((10, 10, 20, 20), FillRule::NonZero, &source, &transform, &edges);

        let mut moved = TileHasher::new(800, 600);
        moved.record_shape((700, 500, 720, 520), FillRule::NonZero, &source, &transform, &edges);

        assert!(!base.dirty_tiles(&moved).is_empty());
    }

    #[test]
    fn folding_the_same_shape_in_twice_cancels_back_to_zero() {
        let edges = sample_edges();
        let source = Source::Solid(Color::from_rgba(0.2, 0.3, 0.4, 1.0));
        let transform = Transform::Identity;

        let mut hasher = TileHasher::new(800, 600);
        hasher.record_shape((0, 0, 10, 10), FillRule::NonZero, &source, &transform, &edges);
        hasher.record_shape((0, 0, 10, 10), FillRule::NonZero, &source, &transform, &edges);

        assert_eq!(hasher.tile_hash(0, 0), 0);
    }

    #[test]
    fn different_fill_rules_yield_different_fingerprints() {
        let edges = sample_edges();
        let source = Source::Solid(Color::from_rgba(0.2, 0.3, 0.4, 1.0));
        let transform = Transform::Identity;

        let mut a = TileHasher::new(800, 600);
        a.record_shape((0, 0, 10, 10), FillRule::NonZero, &source, &transform, &edges);

        let mut b = TileHasher::new(800, 600);
        b.record_shape((0, 0, 10, 10), FillRule::EvenOdd, &source, &transform, &edges);

        assert_ne!(a.tile_hash(0, 0), b.tile_hash(0, 0));
    }

    #[test]
    fn clear_resets_every_tile_to_zero() {
        let edges = sample_edges();
        let source = Source::Solid(Color::from_rgba(1.0, 1.0, 1.0, 1.0));
        let mut hasher = TileHasher::new(800, 600);
        hasher.record_shape((0, 0, 10, 10), FillRule::NonZero, &source, &Transform::Identity, &edges);
        hasher.clear();
        for row in 0..HASH_ROWS {
            for col in 0..HASH_COLS {
                assert_eq!(hasher.tile_hash(row, col), 0);
            }
        }
    }
}
