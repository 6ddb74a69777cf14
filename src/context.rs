//! The public `Context`: owns the framebuffer, the graphics-state stack, the
//! path under construction, and every per-context resource table (textures,
//! gradients, clip masks, ext-gstates). Every Path/Paint/State/Style/Text/
//! Transform operation named in spec.md §6 lives here as a method on this
//! type.
//!
//! Grounded in `pdf_layer.rs`'s builder-method surface (`PdfLayerReference`:
//! one method per content-stream operator, each both mutating local state
//! and appending to an operation stream) -- re-derived rather than copied,
//! since drawing commands replay into raster coverage here instead of into
//! PDF operators. The per-call "log the command, then act on it" shape is
//! the one thing kept verbatim from that file.

use smallvec::SmallVec;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, vec, vec::Vec};

use crate::color::{Color, ColorSpaceBinding, ColorSpaceSlot, Rgba8};
use crate::compositor::apply_coverage;
use crate::constants::{FULL_AA, SUBDIV};
use crate::drawlist::DrawList;
use crate::edge::EdgeList;
use crate::entry::Command;
use crate::errors::IndexError;
use crate::config::EngineConfig;
use crate::graphics::{FillRule, LineCapStyle, LineJoinStyle, Rect, TextAlign, TextBaseline, TextDirection};
use crate::gradient::{Gradient, LinearGeometry, RadialGeometry};
use crate::gstate::{
    BlendMode, CompositingMode, GStateStack, Source, KEYDB_KEY_CLIP_BLOB, KEYDB_KEY_LINE_SPACING,
    KEYDB_KEY_TEXT_ALIGN, KEYDB_KEY_TEXT_BASELINE,
};
use crate::indices::{ClipBlobId, ExtGStateId, FontId, GradientId, TextureId};
use crate::matrix::Transform;
use crate::path::{Bounds, PathBuilder, Subpath};
use crate::pixelformat::PixelFormat;
use crate::stroke;
use crate::texture::{sample_mode_for, Buffer, TextureSource};

/// Whether a style-setting call targets the fill or the stroke paint
/// (spec.md §6: "bit 9 / +512 marks the stroke source"; exposed here as an
/// explicit parameter rather than a hidden "current target" field, since a
/// caller switching between fill and stroke colors mid-path is common and a
/// hidden mode would be easy to get out of sync with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintTarget {
    Fill,
    Stroke,
}

/// Seam for glyph outlines and metrics. TTF/STB font engine internals are
/// out of scope (spec.md §1); a caller that wants `text`/`stroke_text` to
/// actually paint registers one of these. With none registered, text
/// operations still append their draw-list command but paint nothing --
/// missing pixels, not a panic (spec.md §7).
pub trait GlyphSource {
    /// Horizontal advance for `glyph` at `size`, in device units.
    fn advance(&self, glyph: u32, size: f32) -> f32;
    /// The glyph's outline as already-flattened closed contours in a
    /// unit-em box (y-up, origin at the baseline), one `Vec<(f32, f32)>`
    /// per contour. Plain float pairs rather than this crate's internal
    /// fixed-point `Subpath` -- a font backend shouldn't need to know this
    /// engine's sub-pixel encoding to implement the seam.
    fn outline(&self, glyph: u32) -> Vec<Vec<(f32, f32)>>;
}

struct TextureSlot {
    buffer: Buffer,
    last_used_frame: u64,
}

enum GradientGeometry {
    Linear(LinearGeometry),
    Radial(RadialGeometry),
}

struct GradientSlot {
    gradient: Gradient,
    geometry: GradientGeometry,
}

/// A rasterized non-rectangular clip mask: an 8-bit coverage bitmap over its
/// own bounding rectangle, intersected with whatever clip preceded it
/// (spec.md §4.6, §4.7: "non-rectangular via a full-framebuffer mask buffer
/// ANDed with the previous clip").
struct ClipMask {
    bounds: Rect,
    mask: Vec<u8>,
}

impl ClipMask {
    fn coverage_at(&self, x: i32, y: i32) -> u8 {
        let bx = self.bounds.x as i32;
        let by = self.bounds.y as i32;
        let bw = self.bounds.width as i32;
        let bh = self.bounds.height as i32;
        if x < bx || y < by || x >= bx + bw || y >= by + bh {
            return 0;
        }
        let row = (y - by) as usize;
        let col = (x - bx) as usize;
        self.mask[row * bw as usize + col]
    }
}

/// The 2D vector graphics context: a caller-owned RGBA-ish framebuffer plus
/// every piece of state a draw-list replay needs (spec.md §3, §6).
pub struct Context {
    width: u32,
    height: u32,
    format: PixelFormat,
    framebuffer: Vec<u8>,

    stack: GStateStack,
    path: PathBuilder,
    preserve_next: bool,

    draw_list: DrawList,

    textures: Vec<TextureSlot>,
    gradients: Vec<GradientSlot>,
    ext_gstates: Vec<crate::gstate::GState>,
    clip_blobs: Vec<ClipMask>,

    current_texture: Option<TextureId>,
    current_gradient: Option<GradientId>,

    glyph_source: Option<Box<dyn GlyphSource>>,

    /// Offscreen buffers pushed by `start_group`, popped and composited back
    /// onto their parent by `end_group` (spec.md §6: isolated compositing
    /// groups).
    group_stack: Vec<Vec<u8>>,

    config: EngineConfig,
    frame: u64,
    antialias: bool,
}

impl Context {
    /// Builds a context over a fresh, zeroed framebuffer of `width *
    /// height` pixels in `format`. Returns [`IndexError::InvalidBufferGeometry`]
    /// if `width`/`height` don't describe a valid surface (spec.md §7: this
    /// is one of the few seams where loud failure is appropriate).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Context, IndexError> {
        if width == 0 || height == 0 {
            return Err(IndexError::InvalidBufferGeometry);
        }
        let stride = format.stride(width as usize);
        let len = stride.checked_mul(height as usize).ok_or(IndexError::InvalidBufferGeometry)?;
        Ok(Context {
            width,
            height,
            format,
            framebuffer: vec![0u8; len],
            stack: GStateStack::with_capacity_hint(),
            path: PathBuilder::with_transform(Transform::Identity),
            preserve_next: false,
            draw_list: DrawList::new(),
            textures: Vec::new(),
            gradients: Vec::new(),
            ext_gstates: Vec::new(),
            clip_blobs: Vec::new(),
            current_texture: None,
            current_gradient: None,
            glyph_source: None,
            group_stack: Vec::new(),
            config: EngineConfig::from_env(),
            frame: 0,
            antialias: true,
        })
    }

    pub fn with_config(width: u32, height: u32, format: PixelFormat, config: EngineConfig) -> Result<Context, IndexError> {
        let mut ctx = Self::new(width, height, format)?;
        ctx.config = config;
        Ok(ctx)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The raw framebuffer in `self.format()`'s encoding.
    pub fn buffer(&self) -> &[u8] {
        active_buffer(&self.framebuffer, &self.group_stack)
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        active_buffer_mut(&mut self.framebuffer, &mut self.group_stack)
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn set_glyph_source(&mut self, source: Box<dyn GlyphSource>) {
        self.glyph_source = Some(source);
    }

    pub fn set_antialiasing(&mut self, enabled: bool) {
        self.antialias = enabled;
    }

    /// Advances the frame counter and evicts any texture not sampled within
    /// the last two frames (spec.md §3: "Texture EID database... entries not
    /// referenced within two frames are evicted").
    pub fn flush_frame(&mut self) {
        self.frame += 1;
        let frame = self.frame;
        self.textures.retain(|slot| frame.saturating_sub(slot.last_used_frame) <= 2);
    }

    fn log(&mut self, cmd: Command) {
        self.draw_list.add_entry(&cmd);
        self.draw_list.bitpack();
    }

    fn gstate(&self) -> &crate::gstate::GState {
        self.stack.current()
    }

    // ---------------------------------------------------------------
    // Path construction
    // ---------------------------------------------------------------

    fn sync_path_transform(&mut self) {
        let transform = self.gstate().transform;
        self.path.set_transform(transform);
    }

    pub fn begin_path(&mut self) {
        self.log(Command::BeginPath);
        self.path.begin_path();
    }

    pub fn close_path(&mut self) {
        self.log(Command::ClosePath);
        self.path.close_path();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.log(Command::MoveTo { x, y });
        self.sync_path_transform();
        self.path.move_to(x, y);
    }

    pub fn rel_move_to(&mut self, dx: f32, dy: f32) {
        self.log(Command::RelMoveTo { dx, dy });
        self.sync_path_transform();
        self.path.rel_move_to(dx, dy);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.log(Command::LineTo { x, y });
        self.sync_path_transform();
        self.path.line_to(x, y);
    }

    pub fn rel_line_to(&mut self, dx: f32, dy: f32) {
        self.log(Command::RelLineTo { dx, dy });
        self.sync_path_transform();
        self.path.rel_line_to(dx, dy);
    }

    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.log(Command::CurveTo { x1, y1, x2, y2, x, y });
        self.sync_path_transform();
        self.path.curve_to(x1, y1, x2, y2, x, y);
    }

    pub fn rel_curve_to(&mut self, dx1: f32, dy1: f32, dx2: f32, dy2: f32, dx: f32, dy: f32) {
        self.log(Command::RelCurveTo { dx1, dy1, dx2, dy2, dx, dy });
        self.sync_path_transform();
        self.path.rel_curve_to(dx1, dy1, dx2, dy2, dx, dy);
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.log(Command::QuadTo { cx, cy, x, y });
        self.sync_path_transform();
        self.path.quad_to(cx, cy, x, y);
    }

    pub fn rel_quad_to(&mut self, dcx: f32, dcy: f32, dx: f32, dy: f32) {
        self.log(Command::RelQuadTo { dcx, dcy, dx, dy });
        self.sync_path_transform();
        self.path.rel_quad_to(dcx, dcy, dx, dy);
    }

    pub fn arc(&mut self, x: f32, y: f32, radius: f32, angle1: f32, angle2: f32) {
        self.log(Command::Arc { x, y, radius, angle1, angle2 });
        self.sync_path_transform();
        self.path.arc(x, y, radius, angle1, angle2);
    }

    pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
        self.log(Command::ArcTo { x1, y1, x2, y2, radius });
        self.sync_path_transform();
        self.path.arc_to(x1, y1, x2, y2, radius);
    }

    pub fn rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.log(Command::Rectangle { x, y, width, height });
        self.sync_path_transform();
        self.path.rectangle(x, y, width, height);
    }

    pub fn round_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32) {
        self.log(Command::RoundRectangle { x, y, width, height, radius });
        self.sync_path_transform();
        self.path.round_rectangle(x, y, width, height, radius);
    }

    // ---------------------------------------------------------------
    // Paint
    // ---------------------------------------------------------------

    /// The next `fill`/`stroke`/`clip` call keeps the current path active
    /// afterward instead of implicitly starting a new one (cairo's
    /// `*_preserve` family, folded here into a one-shot flag so the wire
    /// opcode stays a single zero-payload `PreservePath` entry).
    pub fn preserve(&mut self) {
        self.log(Command::PreservePath);
        self.preserve_next = true;
    }

    fn take_path_for_paint(&mut self) -> PathBuilder {
        let keep = core::mem::replace(&mut self.preserve_next, false);
        if keep {
            self.path.clone()
        } else {
            let transform = self.gstate().transform;
            core::mem::replace(&mut self.path, PathBuilder::with_transform(transform))
        }
    }

    pub fn fill(&mut self) {
        self.log(Command::Fill);
        let builder = self.take_path_for_paint();
        let (subpaths, bounds) = builder.finish_shape();
        if subpaths.is_empty() {
            return;
        }
        let edges = EdgeList::build(&subpaths, bounds);
        let fill_rule = self.gstate().fill_rule;
        self.paint_source_target(&edges, fill_rule, PaintTarget::Fill);
    }

    pub fn stroke(&mut self) {
        self.log(Command::Stroke);
        let builder = self.take_path_for_paint();
        let (subpaths, _) = builder.finish_shape();
        if subpaths.is_empty() {
            return;
        }
        let gstate = self.gstate();
        let (outline, bounds) = stroke::expand(
            &subpaths,
            gstate.line_width,
            gstate.line_cap,
            gstate.line_join,
            gstate.miter_limit,
            &gstate.line_dash,
            gstate.line_dash_offset,
        );
        if outline.is_empty() {
            return;
        }
        let edges = EdgeList::build(&outline, bounds);
        self.paint_source_target(&edges, FillRule::NonZero, PaintTarget::Stroke);
    }

    /// Intersects the current clip with the path's coverage. A single
    /// closed axis-aligned rectangle subpath stays on the cheap rectangular
    /// fast path (just `Rect::intersect`); anything else rasterizes a mask
    /// and ANDs it against whatever clip mask was already active (spec.md
    /// §4.6, §4.7).
    pub fn clip(&mut self) {
        self.log(Command::Clip);
        let builder = self.take_path_for_paint();
        let (subpaths, bounds) = builder.finish_shape();
        if subpaths.is_empty() {
            self.stack.current_mut().clip = Rect::new(0.0, 0.0, 0.0, 0.0);
            self.stack.current_mut().clipped = true;
            return;
        }
        let bbox = bounds_to_rect(bounds);

        if let Some(rect) = axis_aligned_rect_subpath(&subpaths) {
            let gstate = self.stack.current_mut();
            gstate.clip = if gstate.clipped { gstate.clip.intersect(&rect) } else { rect };
            gstate.clipped = true;
            return;
        }

        let edges = EdgeList::build(&subpaths, bounds);
        let clip_rect = {
            let gstate = self.gstate();
            if gstate.clipped { gstate.clip.intersect(&bbox) } else { bbox }
        };
        let mask = self.rasterize_mask(&edges, FillRule::NonZero, &clip_rect);
        let blob_id = ClipBlobId(self.clip_blobs.len());
        self.clip_blobs.push(ClipMask { bounds: clip_rect, mask });

        let gstate = self.stack.current_mut();
        gstate.clip = clip_rect;
        gstate.clipped = true;
        gstate.clip_blob = Some(blob_id);
        gstate.keydb.set_float(KEYDB_KEY_CLIP_BLOB, blob_id.0 as f64);
        self.stack.note_clip_blob(blob_id);
    }

    // ---------------------------------------------------------------
    // State
    // ---------------------------------------------------------------

    pub fn save(&mut self) {
        self.log(Command::Save);
        self.stack.save();
    }

    pub fn restore(&mut self) {
        self.log(Command::Restore);
        self.stack.restore();
    }

    pub fn reset(&mut self) {
        self.log(Command::Reset);
        self.stack = GStateStack::with_capacity_hint();
        self.path = PathBuilder::with_transform(Transform::Identity);
        self.preserve_next = false;
    }

    /// Pushes an isolated offscreen buffer, matching the current
    /// framebuffer's size; subsequent paint operations target it until the
    /// matching `end_group`.
    pub fn start_group(&mut self) {
        self.log(Command::StartGroup);
        self.group_stack.push(vec![0u8; self.framebuffer.len()]);
    }

    /// Pops the offscreen buffer and composites it onto its parent using
    /// the current compositing/blend mode and global alpha, pixel by pixel.
    pub fn end_group(&mut self) {
        self.log(Command::EndGroup);
        let Some(group) = self.group_stack.pop() else { return };
        let gstate = self.gstate();
        let (blend_mode, compositing_mode, global_alpha) =
            (gstate.blend_mode, gstate.compositing_mode, gstate.global_alpha_u8);
        let bpp = (self.format.info().bpp as usize / 8).max(1);
        let dst = active_buffer_mut(&mut self.framebuffer, &mut self.group_stack);
        for px in 0..(dst.len() / bpp) {
            let off = px * bpp;
            let Some(src_c) = self.format.to_comp(&group, off) else { continue };
            if src_c.a == 0 {
                continue;
            }
            let Some(dst_c) = self.format.to_comp(dst, off) else { continue };
            let blended = apply_coverage(src_c, dst_c, 255, global_alpha, blend_mode, compositing_mode);
            self.format.from_comp(blended, dst, off);
        }
    }

    // ---------------------------------------------------------------
    // Style: solid color, gradients, textures
    // ---------------------------------------------------------------

    /// Sets a solid color, minimizing to the `Gray` wire opcode when the
    /// color is achromatic and opaque (see `DESIGN.md`'s color-form
    /// minimization resolution -- this happens here, not in the formatter,
    /// so `parse(format(L)) == L` keeps holding for whatever `Command` the
    /// formatter is actually given).
    pub fn rgba(&mut self, target: PaintTarget, r: f32, g: f32, b: f32, a: f32) {
        if r == g && g == b && a >= 1.0 {
            self.log(Command::Gray { g: r, a });
        } else {
            self.log(Command::Rgba { r, g, b, a });
        }
        self.set_source(target, Source::Solid(Color::from_rgba(r, g, b, a)));
    }

    pub fn gray(&mut self, target: PaintTarget, g: f32, a: f32) {
        self.log(Command::Gray { g, a });
        self.set_source(target, Source::Solid(Color::from_gray(g, a)));
    }

    pub fn cmyka(&mut self, target: PaintTarget, c: f32, m: f32, y: f32, k: f32, a: f32) {
        self.log(Command::Cmyka { c, m, y, k, a });
        self.set_source(target, Source::Solid(Color::from_cmyka(c, m, y, k, a)));
    }

    fn set_source(&mut self, target: PaintTarget, source: Source) {
        let gstate = self.stack.current_mut();
        match target {
            PaintTarget::Fill => gstate.fill_source = source,
            PaintTarget::Stroke => gstate.stroke_source = source,
        }
    }

    /// Starts a new linear gradient and makes it the named target's active
    /// source; subsequent `gradient_add_stop` calls populate it.
    pub fn linear_gradient(&mut self, target: PaintTarget, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.log(Command::LinearGradient { x0, y0, x1, y1 });
        let id = GradientId(self.gradients.len());
        self.gradients.push(GradientSlot {
            gradient: Gradient::new(),
            geometry: GradientGeometry::Linear(LinearGeometry::new(x0, y0, x1, y1)),
        });
        self.current_gradient = Some(id);
        self.set_source(target, Source::Gradient(id));
    }

    pub fn radial_gradient(
        &mut self,
        target: PaintTarget,
        x0: f32,
        y0: f32,
        r0: f32,
        x1: f32,
        y1: f32,
        r1: f32,
    ) {
        self.log(Command::RadialGradient { x0, y0, r0, x1, y1, r1 });
        let id = GradientId(self.gradients.len());
        self.gradients.push(GradientSlot {
            gradient: Gradient::new(),
            geometry: GradientGeometry::Radial(RadialGeometry::new(x0, y0, r0, r1)),
        });
        self.current_gradient = Some(id);
        self.set_source(target, Source::Gradient(id));
    }

    pub fn gradient_add_stop(&mut self, pos: f32, r: f32, g: f32, b: f32, a: f32) {
        self.log(Command::GradientAddStop { pos, r, g, b, a });
        if let Some(GradientId(idx)) = self.current_gradient {
            if let Some(slot) = self.gradients.get_mut(idx) {
                slot.gradient.add_stop(pos, Color::from_rgba(r, g, b, a));
            }
        }
    }

    /// Registers a new texture buffer and returns its handle. Not itself a
    /// wire opcode carrying pixel data (spec.md keeps bulk pixel payloads
    /// out of the textual format) -- `define_texture` below logs the
    /// matching `DefineTexture{width,height,format}` entry for replay
    /// metadata while this call supplies the actual bytes.
    pub fn define_texture(&mut self, width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> TextureId {
        self.log(Command::DefineTexture { width, height, format: format_to_wire(format) });
        let id = TextureId(self.textures.len());
        self.textures.push(TextureSlot {
            buffer: Buffer::new(format!("tex{}", id.0), width, height, format, data),
            last_used_frame: self.frame,
        });
        self.current_texture = Some(id);
        id
    }

    /// Places the current texture at device offset `(x, y)` and makes it
    /// the named target's source.
    pub fn texture(&mut self, target: PaintTarget, x: f32, y: f32) {
        self.log(Command::Texture { x, y });
        if let Some(id) = self.current_texture {
            self.set_source(target, Source::Texture(id));
        }
    }

    // ---------------------------------------------------------------
    // Style: paint parameters
    // ---------------------------------------------------------------

    pub fn line_width(&mut self, width: f32) {
        self.log(Command::LineWidth(width));
        self.stack.current_mut().line_width = width;
    }

    pub fn line_cap(&mut self, style: LineCapStyle) {
        self.log(Command::LineCap(line_cap_to_wire(style)));
        self.stack.current_mut().line_cap = style;
    }

    pub fn line_join(&mut self, style: LineJoinStyle) {
        self.log(Command::LineJoin(line_join_to_wire(style)));
        self.stack.current_mut().line_join = style;
    }

    pub fn miter_limit(&mut self, limit: f32) {
        self.log(Command::MiterLimit(limit));
        self.stack.current_mut().miter_limit = limit;
    }

    pub fn line_dash(&mut self, offset: f32, lengths: &[f32]) {
        self.log(Command::LineDash { offset, lengths: SmallVec::from_slice(lengths) });
        let gstate = self.stack.current_mut();
        gstate.line_dash = SmallVec::from_slice(lengths);
        gstate.line_dash_offset = offset;
    }

    pub fn line_dash_offset(&mut self, offset: f32) {
        self.log(Command::LineDashOffset(offset));
        self.stack.current_mut().line_dash_offset = offset;
    }

    pub fn global_alpha(&mut self, alpha: f32) {
        self.log(Command::GlobalAlpha(alpha));
        self.stack.current_mut().set_global_alpha(alpha);
    }

    pub fn compositing_mode(&mut self, mode: CompositingMode) {
        self.log(Command::CompositingMode(compositing_mode_to_wire(mode)));
        self.stack.current_mut().compositing_mode = mode;
    }

    pub fn blend_mode(&mut self, mode: BlendMode) {
        self.log(Command::BlendMode(blend_mode_to_wire(mode)));
        self.stack.current_mut().blend_mode = mode;
    }

    pub fn fill_rule(&mut self, rule: FillRule) {
        self.log(Command::FillRule(if rule == FillRule::EvenOdd { 1 } else { 0 }));
        self.stack.current_mut().fill_rule = rule;
    }

    pub fn shadow_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.log(Command::ShadowColor { r, g, b, a });
        self.stack.current_mut().shadow.color = Color::from_rgba(r, g, b, a);
    }

    pub fn shadow_blur(&mut self, blur: f32) {
        self.log(Command::ShadowBlur(blur));
        self.stack.current_mut().shadow.blur = blur;
    }

    pub fn shadow_offset(&mut self, dx: f32, dy: f32) {
        self.log(Command::ShadowOffset { dx, dy });
        self.stack.current_mut().shadow.offset = (dx, dy);
    }

    pub fn image_smoothing(&mut self, enabled: bool) {
        self.log(Command::ImageSmoothing(enabled));
        self.stack.current_mut().image_smoothing = enabled;
    }

    pub fn colorspace(&mut self, slot: ColorSpaceSlot, binding: ColorSpaceBinding) {
        self.log(Command::Colorspace(colorspace_slot_to_wire(slot)));
        self.stack.current_mut().colorspaces.bind(slot, binding);
    }

    /// Saves the current `GState` into the ext-gstate table, returning a
    /// handle a later call can restore by reassigning `ext_gstate` (spec.md
    /// §9: an arena of named states, analogous to a PDF ExtGState
    /// dictionary but holding this engine's own fields).
    pub fn save_ext_gstate(&mut self) -> ExtGStateId {
        let id = ExtGStateId(self.ext_gstates.len());
        self.ext_gstates.push(self.gstate().clone());
        self.stack.current_mut().ext_gstate = Some(id);
        id
    }

    pub fn apply_ext_gstate(&mut self, id: ExtGStateId) -> Result<(), IndexError> {
        let saved = self.ext_gstates.get(id.0).ok_or(IndexError::ExtGStateNotFound)?.clone();
        *self.stack.current_mut() = saved;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------

    pub fn font(&mut self, id: FontId) {
        self.log(Command::Font(id.0 as u32));
        self.stack.current_mut().font = Some(id);
    }

    pub fn font_size(&mut self, size: f32) {
        self.log(Command::FontSize(size));
        self.stack.current_mut().font_size = size;
    }

    /// Paints `s` as filled glyph outlines at `(x, y)` if a [`GlyphSource`]
    /// is registered; otherwise just logs the placement (spec.md §7: a
    /// missing collaborator degrades silently).
    pub fn text(&mut self, x: f32, y: f32, s: &str) {
        self.log(Command::Text { x, y });
        self.paint_text(x, y, s, PaintTarget::Fill);
    }

    pub fn stroke_text(&mut self, x: f32, y: f32, s: &str) {
        self.log(Command::StrokeText { x, y });
        self.paint_text(x, y, s, PaintTarget::Stroke);
    }

    fn paint_text(&mut self, x: f32, y: f32, s: &str, target: PaintTarget) {
        if self.glyph_source.is_none() {
            return;
        }
        let font_size = self.gstate().font_size;
        let mut pen_x = x;
        let chars: Vec<u32> = s.chars().map(|c| c as u32).collect();
        for ch in chars {
            self.glyph(ch, pen_x, y);
            let advance = {
                let source = self.glyph_source.as_ref().expect("checked above");
                source.advance(ch, font_size)
            };
            pen_x += advance;
            let _ = target;
        }
    }

    /// Paints a single glyph's outline at `(x, y)`, scaled by the current
    /// font size over a notional unit-em box.
    pub fn glyph(&mut self, index: u32, x: f32, y: f32) {
        self.log(Command::Glyph { index, x, y });
        let Some(source) = self.glyph_source.as_ref() else { return };
        let font_size = self.gstate().font_size;
        let outline = source.outline(index);
        if outline.is_empty() {
            return;
        }
        let base = self.gstate().transform;
        let local = base.apply_transform(&Transform::Raw([font_size, 0.0, 0.0, -font_size, x, y]));
        let mut builder = PathBuilder::with_transform(local);
        for contour in &outline {
            let mut points = contour.iter();
            let Some(&(fx, fy)) = points.next() else { continue };
            builder.move_to(fx, fy);
            for &(px, py) in points {
                builder.line_to(px, py);
            }
            builder.close_path();
        }
        let (subpaths, bounds) = builder.finish_shape();
        if subpaths.is_empty() {
            return;
        }
        let edges = EdgeList::build(&subpaths, bounds);
        self.paint_source_target(&edges, FillRule::NonZero, PaintTarget::Fill);
    }

    pub fn text_align(&mut self, align: TextAlign) {
        let wire = text_align_to_wire(align);
        self.log(Command::TextAlign(wire));
        self.stack.current_mut().keydb.set_float(KEYDB_KEY_TEXT_ALIGN, wire as f64);
    }

    pub fn text_baseline(&mut self, baseline: TextBaseline) {
        let wire = text_baseline_to_wire(baseline);
        self.log(Command::TextBaseline(wire));
        self.stack.current_mut().keydb.set_float(KEYDB_KEY_TEXT_BASELINE, wire as f64);
    }

    pub fn text_direction(&mut self, direction: TextDirection) {
        self.log(Command::TextDirection(text_direction_to_wire(direction)));
        let _ = direction;
    }

    /// Line spacing has no dedicated wire opcode or `GState` field; it lives
    /// purely in the keydb, as spec.md §3 lists it alongside text-align and
    /// text-baseline.
    pub fn line_spacing(&mut self, spacing: f32) {
        self.stack.current_mut().keydb.set_float(KEYDB_KEY_LINE_SPACING, spacing as f64);
    }

    /// Reads back the current text-align setting, decoded from the keydb.
    /// Falls back to `TextAlign::Left` if nothing has been set yet.
    pub fn current_text_align(&self) -> TextAlign {
        match self.gstate().keydb.get_float(KEYDB_KEY_TEXT_ALIGN) {
            Some(v) if v as u32 == 1 => TextAlign::Center,
            Some(v) if v as u32 == 2 => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }

    /// Reads back the current text-baseline setting, decoded from the keydb.
    /// Falls back to `TextBaseline::Alphabetic` if nothing has been set yet.
    pub fn current_text_baseline(&self) -> TextBaseline {
        match self.gstate().keydb.get_float(KEYDB_KEY_TEXT_BASELINE) {
            Some(v) if v as u32 == 1 => TextBaseline::Top,
            Some(v) if v as u32 == 2 => TextBaseline::Middle,
            Some(v) if v as u32 == 3 => TextBaseline::Bottom,
            _ => TextBaseline::Alphabetic,
        }
    }

    /// Reads back the current line spacing, decoded from the keydb. Falls
    /// back to `None` if it was never set for this state.
    pub fn current_line_spacing(&self) -> Option<f32> {
        self.gstate().keydb.get_float(KEYDB_KEY_LINE_SPACING).map(|v| v as f32)
    }

    // ---------------------------------------------------------------
    // Transform
    // ---------------------------------------------------------------

    pub fn identity(&mut self) {
        self.log(Command::Identity);
        self.stack.current_mut().transform = Transform::Identity;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.log(Command::Translate { dx, dy });
        let gstate = self.stack.current_mut();
        gstate.transform = gstate.transform.apply_transform(&Transform::Translate(dx, dy));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.log(Command::Scale { sx, sy });
        let gstate = self.stack.current_mut();
        gstate.transform = gstate.transform.apply_transform(&Transform::Scale(sx, sy));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.log(Command::Rotate { angle });
        let gstate = self.stack.current_mut();
        gstate.transform = gstate.transform.apply_transform(&Transform::Rotate(angle));
    }

    pub fn apply_transform(&mut self, m: [f32; 6]) {
        self.log(Command::ApplyTransform { m });
        let gstate = self.stack.current_mut();
        gstate.transform = gstate.transform.apply_transform(&Transform::Raw(m));
    }

    pub fn set_transform(&mut self, m: [f32; 6]) {
        self.log(Command::SetTransform { m });
        self.stack.current_mut().transform = Transform::Raw(m);
    }

    // ---------------------------------------------------------------
    // Rasterization pipeline
    // ---------------------------------------------------------------

    /// Full fill/stroke paint pipeline for `target`'s source: optional
    /// shadow pass first, then the main coverage pass, each going through
    /// clip-buffer multiply and (if antialiasing is disabled) 1-bit
    /// thresholding before compositing (spec.md §4.6: "three post-processes
    /// run in order: shadow-blur convolution, clip-buffer multiply,
    /// optional 1-bit thresholding").
    fn paint_source_target(&mut self, edges: &EdgeList, fill_rule: FillRule, target: PaintTarget) {
        let gstate = self.gstate();
        let shadow_active = gstate.shadow.color.alpha() > 0.0 && (gstate.shadow.blur > 0.0 || gstate.shadow.offset != (0.0, 0.0));
        if shadow_active {
            self.paint_shadow(edges, fill_rule);
        }
        let source = match target {
            PaintTarget::Fill => self.gstate().fill_source.clone(),
            PaintTarget::Stroke => self.gstate().stroke_source.clone(),
        };
        self.paint_coverage(edges, fill_rule, &source, false);
    }

    /// Builds a coverage bitmap over the shape's bounds, offsets it by the
    /// shadow's device-space offset, box-blurs it (two passes, radius =
    /// `shadow.blur`), then composites it with the shadow color underneath
    /// the main paint.
    fn paint_shadow(&mut self, edges: &EdgeList, fill_rule: FillRule) {
        let gstate = self.gstate().clone();
        let (px0, py0, px1, py1) = match pixel_bounds(edges.bounds, self.width, self.height) {
            Some(b) => b,
            None => return,
        };
        let w = (px1 - px0) as usize;
        let h = (py1 - py0) as usize;
        if w == 0 || h == 0 {
            return;
        }
        let mut coverage = vec![0u8; w * h];
        let mut row = vec![0u8; w];
        for py in py0..py1 {
            crate::scanline::rasterize_row(edges, fill_rule, py, px0, &mut row);
            coverage[(py - py0) as usize * w..(py - py0) as usize * w + w].copy_from_slice(&row);
        }
        let radius = gstate.shadow.blur.max(0.0).round() as usize;
        if radius > 0 {
            coverage = box_blur(&coverage, w, h, radius);
        }
        let (ox, oy) = gstate.shadow.offset;
        let shadow_color = gstate.shadow.color.to_rgba8();
        let (blend_mode, compositing_mode, global_alpha) = (gstate.blend_mode, gstate.compositing_mode, gstate.global_alpha_u8);
        let clip = if gstate.clipped { Some(gstate.clip) } else { None };
        let clip_blob = gstate.clip_blob.and_then(|ClipBlobId(i)| self.clip_blobs.get(i));

        for y in 0..h {
            let device_y = py0 + y as i32 + oy.round() as i32;
            if device_y < 0 || device_y >= self.height as i32 {
                continue;
            }
            for x in 0..w {
                let mut c = coverage[y * w + x];
                if c == 0 {
                    continue;
                }
                let device_x = px0 + x as i32 + ox.round() as i32;
                if device_x < 0 || device_x >= self.width as i32 {
                    continue;
                }
                if let Some(rect) = clip {
                    if !point_in_rect(device_x, device_y, rect) {
                        continue;
                    }
                }
                if let Some(blob) = clip_blob {
                    c = ((c as u32 * blob.coverage_at(device_x, device_y) as u32) / 255) as u8;
                    if c == 0 {
                        continue;
                    }
                }
                self.composite_pixel(device_x, device_y, shadow_color, c, global_alpha, blend_mode, compositing_mode);
            }
        }
    }

    /// Streams per-row coverage from `scanline::rasterize_row`, applying
    /// clip-buffer multiply and optional 1-bit thresholding before handing
    /// each pixel to the compositor.
    fn paint_coverage(&mut self, edges: &EdgeList, fill_rule: FillRule, source: &Source, is_shadow: bool) {
        let _ = is_shadow;
        let gstate = self.gstate().clone();
        let (px0, py0, px1, py1) = match pixel_bounds(edges.bounds, self.width, self.height) {
            Some(b) => b,
            None => return,
        };
        let width = (px1 - px0) as usize;
        if width == 0 {
            return;
        }
        let mut row = vec![0u8; width];
        let clip = if gstate.clipped { Some(gstate.clip) } else { None };
        let clip_blob_id = gstate.clip_blob;
        let (blend_mode, compositing_mode, global_alpha) = (gstate.blend_mode, gstate.compositing_mode, gstate.global_alpha_u8);
        let antialias = self.antialias;

        let mut texture_sample: Option<(TextureId, Transform, crate::texture::SampleMode)> = None;
        if let Source::Texture(id) = source {
            if let Some(slot) = self.textures.get(id.0) {
                let inverse = gstate.transform.invert();
                let (sx, _) = gstate.transform.apply_to_distance(1.0, 0.0);
                let mode = sample_mode_for(sx.abs(), gstate.image_smoothing);
                texture_sample = Some((*id, inverse, mode));
                let _ = &slot.buffer;
            }
        }

        for py in py0..py1 {
            crate::scanline::rasterize_row(edges, fill_rule, py, px0, &mut row);
            for (dx, &raw_c) in row.iter().enumerate() {
                if raw_c == 0 {
                    continue;
                }
                let device_x = px0 + dx as i32;
                let device_y = py;
                if let Some(rect) = clip {
                    if !point_in_rect(device_x, device_y, rect) {
                        continue;
                    }
                }
                let mut c = raw_c;
                if let Some(ClipBlobId(i)) = clip_blob_id {
                    if let Some(blob) = self.clip_blobs.get(i) {
                        c = ((c as u32 * blob.coverage_at(device_x, device_y) as u32) / 255) as u8;
                    }
                }
                if !antialias {
                    c = if c >= 128 { 255 } else { 0 };
                }
                if c == 0 {
                    continue;
                }
                let color = match source {
                    Source::Solid(col) => col.to_rgba8(),
                    Source::Gradient(id) => self.sample_gradient(*id, device_x as f32, device_y as f32),
                    Source::Texture(id) => {
                        let Some((_, inverse, mode)) = texture_sample else { continue };
                        let Some(slot) = self.textures.get_mut(id.0) else { continue };
                        slot.last_used_frame = self.frame;
                        let mut src = TextureSource { buffer: &mut slot.buffer, inverse, mode };
                        src.sample(device_x as f32 + 0.5, device_y as f32 + 0.5)
                    }
                };
                self.composite_pixel(device_x, device_y, color, c, global_alpha, blend_mode, compositing_mode);
            }
        }
    }

    fn sample_gradient(&mut self, id: GradientId, x: f32, y: f32) -> Rgba8 {
        let Some(slot) = self.gradients.get_mut(id.0) else { return Rgba8::TRANSPARENT };
        let t = match &slot.geometry {
            GradientGeometry::Linear(geo) => geo.t_at(x, y),
            GradientGeometry::Radial(geo) => geo.t_at(x, y),
        };
        slot.gradient.sample(t).to_rgba8()
    }

    fn composite_pixel(
        &mut self,
        x: i32,
        y: i32,
        src: Rgba8,
        coverage: u8,
        global_alpha: u8,
        blend_mode: BlendMode,
        compositing_mode: CompositingMode,
    ) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let bpp = (self.format.info().bpp as usize / 8).max(1);
        let stride = self.format.stride(self.width as usize);
        let off = y as usize * stride + x as usize * bpp;
        let buf = active_buffer_mut(&mut self.framebuffer, &mut self.group_stack);
        let Some(dst) = self.format.to_comp(buf, off) else { return };
        let blended = apply_coverage(src, dst, coverage, global_alpha, blend_mode, compositing_mode);
        self.format.from_comp(blended, buf, off);
    }

    /// Rasterizes `edges` into a standalone 8-bit coverage bitmap over
    /// `bounds` (device pixels), used for non-rectangular clip masks.
    fn rasterize_mask(&self, edges: &EdgeList, fill_rule: FillRule, bounds: &Rect) -> Vec<u8> {
        let w = bounds.width.round().max(0.0) as usize;
        let h = bounds.height.round().max(0.0) as usize;
        let mut mask = vec![0u8; w * h];
        if w == 0 || h == 0 {
            return mask;
        }
        let px0 = bounds.x.round() as i32;
        let py0 = bounds.y.round() as i32;
        let mut row = vec![0u8; w];
        for py in py0..py0 + h as i32 {
            crate::scanline::rasterize_row(edges, fill_rule, py, px0, &mut row);
            let dst_row = (py - py0) as usize;
            mask[dst_row * w..dst_row * w + w].copy_from_slice(&row);
        }
        mask
    }
}

fn active_buffer<'a>(framebuffer: &'a [u8], groups: &'a [Vec<u8>]) -> &'a [u8] {
    groups.last().unwrap_or(framebuffer)
}

fn active_buffer_mut<'a>(framebuffer: &'a mut Vec<u8>, groups: &'a mut [Vec<u8>]) -> &'a mut [u8] {
    if let Some(last) = groups.last_mut() {
        last
    } else {
        framebuffer
    }
}

fn bounds_to_rect(bounds: Bounds) -> Rect {
    let x0 = bounds.col_min as f32 / SUBDIV as f32;
    let x1 = bounds.col_max as f32 / SUBDIV as f32;
    let y0 = bounds.scan_min as f32 / FULL_AA as f32;
    let y1 = bounds.scan_max as f32 / FULL_AA as f32;
    Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
}

/// Converts a shape's sub-pixel bounds into an inclusive device-pixel row
/// range, clamped to the framebuffer. Returns `None` for a fully off-blit
/// shape (spec.md §8's "clip-outside blit is a pure no-op" boundary case).
fn pixel_bounds(bounds: Bounds, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
    let px0 = (bounds.col_min.div_euclid(SUBDIV)).max(0);
    let px1 = (bounds.col_max.div_euclid(SUBDIV) + 1).min(width as i32);
    let py0 = (bounds.scan_min.div_euclid(FULL_AA)).max(0);
    let py1 = (bounds.scan_max.div_euclid(FULL_AA) + 1).min(height as i32);
    if px1 <= px0 || py1 <= py0 {
        return None;
    }
    Some((px0, py0, px1, py1))
}

fn point_in_rect(x: i32, y: i32, rect: Rect) -> bool {
    let xf = x as f32 + 0.5;
    let yf = y as f32 + 0.5;
    xf >= rect.left() && xf < rect.right() && yf >= rect.top() && yf < rect.bottom()
}

/// Recognizes a single closed subpath shaped exactly like `rectangle()`'s
/// five-vertex output, so `clip()` can keep the cheap rectangular
/// representation instead of falling back to a rasterized mask for the
/// overwhelmingly common case (spec.md §4.4: "a clip is represented as an
/// axis-aligned bounding box" whenever the path actually is one).
fn axis_aligned_rect_subpath(subpaths: &[Subpath]) -> Option<Rect> {
    if subpaths.len() != 1 {
        return None;
    }
    let verts = &subpaths[0].vertices;
    if verts.len() != 5 || verts[0] != verts[4] {
        return None;
    }
    let xs: Vec<i32> = verts[..4].iter().map(|v| v.x).collect();
    let ys: Vec<i32> = verts[..4].iter().map(|v| v.y).collect();
    let (x_min, x_max) = (*xs.iter().min().unwrap(), *xs.iter().max().unwrap());
    let (y_min, y_max) = (*ys.iter().min().unwrap(), *ys.iter().max().unwrap());
    for v in &verts[..4] {
        if v.x != x_min && v.x != x_max {
            return None;
        }
        if v.y != y_min && v.y != y_max {
            return None;
        }
    }
    Some(Rect::new(
        x_min as f32 / SUBDIV as f32,
        y_min as f32 / FULL_AA as f32,
        (x_max - x_min) as f32 / SUBDIV as f32,
        (y_max - y_min) as f32 / FULL_AA as f32,
    ))
}

/// Two-pass separable box blur over an 8-bit coverage bitmap, used for
/// shadow softening (spec.md §4.6's shadow-blur convolution post-process).
fn box_blur(src: &[u8], w: usize, h: usize, radius: usize) -> Vec<u8> {
    if radius == 0 || w == 0 || h == 0 {
        return src.to_vec();
    }
    let mut horiz = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            let mut n = 0u32;
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(w - 1);
            for sx in lo..=hi {
                sum += src[y * w + sx] as u32;
                n += 1;
            }
            horiz[y * w + x] = (sum / n.max(1)) as u8;
        }
    }
    let mut out = vec![0u8; w * h];
    for x in 0..w {
        for y in 0..h {
            let mut sum = 0u32;
            let mut n = 0u32;
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(h - 1);
            for sy in lo..=hi {
                sum += horiz[sy * w + x] as u32;
                n += 1;
            }
            out[y * w + x] = (sum / n.max(1)) as u8;
        }
    }
    out
}

// ---------------------------------------------------------------------
// Wire-format enum <-> u32 conversions (spec.md §6's packed style fields).
// ---------------------------------------------------------------------

fn line_cap_to_wire(style: LineCapStyle) -> u32 {
    match style {
        LineCapStyle::Butt => 0,
        LineCapStyle::Round => 1,
        LineCapStyle::ProjectingSquare => 2,
    }
}

fn line_join_to_wire(style: LineJoinStyle) -> u32 {
    match style {
        LineJoinStyle::Miter => 0,
        LineJoinStyle::Round => 1,
        LineJoinStyle::Bevel => 2,
    }
}

fn compositing_mode_to_wire(mode: CompositingMode) -> u32 {
    use CompositingMode::*;
    match mode {
        Clear => 0,
        SourceOver => 1,
        DestinationOver => 2,
        SourceIn => 3,
        DestinationIn => 4,
        SourceOut => 5,
        DestinationOut => 6,
        SourceAtop => 7,
        DestinationAtop => 8,
        Xor => 9,
        Copy => 10,
        Lighter => 11,
    }
}

fn blend_mode_to_wire(mode: BlendMode) -> u32 {
    use BlendMode::*;
    match mode {
        Normal => 0,
        Multiply => 1,
        Screen => 2,
        Overlay => 3,
        Darken => 4,
        Lighten => 5,
        ColorDodge => 6,
        ColorBurn => 7,
        HardLight => 8,
        SoftLight => 9,
        Difference => 10,
        Exclusion => 11,
        Hue => 12,
        Saturation => 13,
        Color => 14,
        Luminosity => 15,
        Addition => 16,
        Subtraction => 17,
        Divide => 18,
    }
}

/// Inverse of [`blend_mode_to_wire`]; unknown codes fall back to `Normal`
/// the same way a wire reader treats any other out-of-range opcode field.
fn blend_mode_from_wire(code: u32) -> BlendMode {
    use BlendMode::*;
    match code {
        1 => Multiply,
        2 => Screen,
        3 => Overlay,
        4 => Darken,
        5 => Lighten,
        6 => ColorDodge,
        7 => ColorBurn,
        8 => HardLight,
        9 => SoftLight,
        10 => Difference,
        11 => Exclusion,
        12 => Hue,
        13 => Saturation,
        14 => Color,
        15 => Luminosity,
        16 => Addition,
        17 => Subtraction,
        18 => Divide,
        _ => Normal,
    }
}

fn colorspace_slot_to_wire(slot: ColorSpaceSlot) -> u32 {
    use ColorSpaceSlot::*;
    match slot {
        DeviceRgb => 0,
        UserRgb => 1,
        DeviceCmyk => 2,
        UserCmyk => 3,
        Texture => 4,
    }
}

fn text_align_to_wire(align: TextAlign) -> u32 {
    match align {
        TextAlign::Left => 0,
        TextAlign::Center => 1,
        TextAlign::Right => 2,
    }
}

fn text_baseline_to_wire(baseline: TextBaseline) -> u32 {
    match baseline {
        TextBaseline::Alphabetic => 0,
        TextBaseline::Top => 1,
        TextBaseline::Middle => 2,
        TextBaseline::Bottom => 3,
    }
}

fn text_direction_to_wire(direction: TextDirection) -> u32 {
    match direction {
        TextDirection::Ltr => 0,
        TextDirection::Rtl => 1,
    }
}

fn format_to_wire(format: PixelFormat) -> u32 {
    use PixelFormat::*;
    match format {
        Gray1 => 0,
        Gray2 => 1,
        Gray4 => 2,
        Gray8 => 3,
        GrayA8 => 4,
        Rgb8 => 5,
        Rgba8 => 6,
        Bgra8 => 7,
        Rgb565Le => 8,
        Rgb565Be => 9,
        Rgb332 => 10,
        RgbaF => 11,
        GrayF => 12,
        GrayAF => 13,
        Cmyk8 => 14,
        Cmyka8 => 15,
        CmykaF => 16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_at(ctx: &Context, x: u32, y: u32) -> Rgba8 {
        let stride = ctx.format().stride(ctx.width() as usize);
        let bpp = (ctx.format().info().bpp as usize / 8).max(1);
        let off = y as usize * stride + x as usize * bpp;
        ctx.format().to_comp(ctx.buffer(), off).unwrap()
    }

    fn white_canvas(w: u32, h: u32) -> Context {
        let mut ctx = Context::new(w, h, PixelFormat::Rgba8).unwrap();
        for px in ctx.buffer_mut().chunks_mut(4) {
            px.copy_from_slice(&[255, 255, 255, 255]);
        }
        ctx
    }

    #[test]
    fn opaque_red_square_paints_pure_red() {
        let mut ctx = white_canvas(20, 20);
        ctx.rgba(PaintTarget::Fill, 1.0, 0.0, 0.0, 1.0);
        ctx.rectangle(5.0, 5.0, 10.0, 10.0);
        ctx.fill();
        assert_eq!(pixel_at(&ctx, 10, 10), Rgba8::new(255, 0, 0, 255));
    }

    #[test]
    fn half_alpha_fill_over_white_averages_toward_source() {
        let mut ctx = white_canvas(20, 20);
        ctx.rgba(PaintTarget::Fill, 0.0, 0.0, 0.0, 0.5);
        ctx.rectangle(0.0, 0.0, 20.0, 20.0);
        ctx.fill();
        let c = pixel_at(&ctx, 10, 10);
        assert!((c.r as i32 - 127).abs() <= 2);
        assert_eq!(c.a, 255);
    }

    #[test]
    fn linear_gradient_interpolates_across_the_row() {
        let mut ctx = white_canvas(10, 1);
        ctx.linear_gradient(PaintTarget::Fill, 0.0, 0.0, 10.0, 0.0);
        ctx.gradient_add_stop(0.0, 0.0, 0.0, 0.0, 1.0);
        ctx.gradient_add_stop(1.0, 1.0, 1.0, 1.0, 1.0);
        ctx.rectangle(0.0, 0.0, 10.0, 1.0);
        ctx.fill();
        let left = pixel_at(&ctx, 0, 0);
        let right = pixel_at(&ctx, 9, 0);
        assert!(left.r < right.r);
    }

    #[test]
    fn clip_intersects_with_prior_clip_rect() {
        let mut ctx = white_canvas(20, 20);
        ctx.rectangle(0.0, 0.0, 10.0, 10.0);
        ctx.clip();
        ctx.rgba(PaintTarget::Fill, 0.0, 1.0, 0.0, 1.0);
        ctx.rectangle(5.0, 5.0, 10.0, 10.0);
        ctx.fill();
        assert_eq!(pixel_at(&ctx, 8, 8), Rgba8::new(0, 255, 0, 255));
        // outside the first clip rect entirely
        assert_eq!(pixel_at(&ctx, 12, 12), Rgba8::new(255, 255, 255, 255));
    }

    #[test]
    fn stroke_with_projecting_square_cap_extends_past_the_endpoint() {
        let mut ctx = white_canvas(20, 20);
        ctx.rgba(PaintTarget::Stroke, 0.0, 0.0, 0.0, 1.0);
        ctx.line_width(4.0);
        ctx.line_cap(LineCapStyle::ProjectingSquare);
        ctx.move_to(2.0, 10.0);
        ctx.line_to(10.0, 10.0);
        ctx.stroke();
        // half the line width beyond x=10 should still be painted
        assert_eq!(pixel_at(&ctx, 11, 10), Rgba8::new(0, 0, 0, 255));
    }

    #[test]
    fn save_restore_is_a_no_op_on_the_framebuffer() {
        let mut ctx = white_canvas(4, 4);
        ctx.save();
        ctx.translate(100.0, 100.0);
        ctx.restore();
        ctx.rgba(PaintTarget::Fill, 0.0, 0.0, 0.0, 1.0);
        ctx.rectangle(0.0, 0.0, 4.0, 4.0);
        ctx.fill();
        assert_eq!(pixel_at(&ctx, 0, 0), Rgba8::new(0, 0, 0, 255));
    }

    #[test]
    fn preserve_keeps_the_path_active_for_a_second_paint() {
        let mut ctx = white_canvas(10, 10);
        ctx.rectangle(0.0, 0.0, 10.0, 10.0);
        ctx.rgba(PaintTarget::Fill, 1.0, 0.0, 0.0, 1.0);
        ctx.preserve();
        ctx.fill();
        ctx.compositing_mode(CompositingMode::Clear);
        ctx.fill();
        assert_eq!(pixel_at(&ctx, 5, 5), Rgba8::TRANSPARENT);
    }

    #[test]
    fn invalid_buffer_geometry_is_rejected() {
        assert!(Context::new(0, 10, PixelFormat::Rgba8).is_err());
    }

    #[test]
    fn text_align_and_baseline_are_stored_in_the_keydb() {
        let mut ctx = white_canvas(4, 4);
        assert_eq!(ctx.current_text_align(), TextAlign::Left);
        ctx.text_align(TextAlign::Center);
        assert_eq!(ctx.current_text_align(), TextAlign::Center);
        ctx.text_baseline(TextBaseline::Middle);
        assert_eq!(ctx.current_text_baseline(), TextBaseline::Middle);
    }

    #[test]
    fn line_spacing_round_trips_through_the_keydb() {
        let mut ctx = white_canvas(4, 4);
        assert_eq!(ctx.current_line_spacing(), None);
        ctx.line_spacing(18.0);
        assert_eq!(ctx.current_line_spacing(), Some(18.0));
    }

    #[test]
    fn clipping_records_its_blob_index_in_the_keydb() {
        // A triangle, not an axis-aligned rectangle, so `clip` takes the
        // mask-rasterizing path that allocates a clip blob.
        let mut ctx = white_canvas(8, 8);
        ctx.begin_path();
        ctx.move_to(1.0, 1.0);
        ctx.line_to(6.0, 1.0);
        ctx.line_to(1.0, 6.0);
        ctx.close_path();
        ctx.clip();
        assert_eq!(ctx.gstate().keydb.get_float(crate::gstate::KEYDB_KEY_CLIP_BLOB), Some(0.0));
    }

    #[test]
    fn blend_mode_wire_codes_round_trip() {
        let modes = [
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Hue,
            BlendMode::Saturation,
            BlendMode::Color,
            BlendMode::Luminosity,
            BlendMode::Addition,
            BlendMode::Subtraction,
            BlendMode::Divide,
        ];
        for mode in modes {
            assert_eq!(blend_mode_from_wire(blend_mode_to_wire(mode)), mode);
        }
    }
}
