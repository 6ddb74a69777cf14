//! ID newtypes. These are internal handles, not raw offsets — use the
//! `Context` methods that hand them out rather than constructing one.

/// Handle for a texture/buffer registered via `define_texture`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Handle for a font registered via the `GlyphSource` seam.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Handle for a gradient's stop array, shared across `GState` copies that
/// reference the same gradient (spec.md §3: "index a shared gradient-stop
/// array").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GradientId(pub(crate) usize);

/// Handle for a saved extended-graphics-state snapshot, analogous to a PDF
/// ExtGState dictionary reference but holding this engine's own `GState`
/// fields.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExtGStateId(pub(crate) usize);

/// Handle for a rasterized non-rectangular clip mask, referenced from a
/// `GState`'s keydb rather than stored inline (spec.md §4.6, §4.7: "clip-
/// blob indices").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ClipBlobId(pub(crate) usize);
