//! The 9-byte `Entry` record and the `Command` view over one or more
//! entries (spec.md §3, §4.1).

use smallvec::SmallVec;

use crate::opcode::{conts_for_entry, Opcode, CONT};

/// One atomic draw-list record: a leading opcode byte plus an 8-byte
/// payload viewable as 2×f32, 2×u32, 4×u16 or 8×u8. Exactly 9 bytes is a
/// hard invariant — the codec indexes entries by integer offset and the
/// bitpack pass rewrites groups of entries in place without changing the
/// stride, so this type must never grow a discriminant tag or padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub opcode: u8,
    pub payload: [u8; 8],
}

const _: () = assert!(core::mem::size_of::<Entry>() == 9);

impl Entry {
    pub const fn cont(payload: [u8; 8]) -> Entry {
        Entry { opcode: CONT, payload }
    }

    pub const fn leading(op: Opcode, payload: [u8; 8]) -> Entry {
        Entry { opcode: op.to_u8(), payload }
    }

    pub fn is_cont(&self) -> bool {
        self.opcode == CONT
    }

    // -- payload packing --------------------------------------------------
    //
    // The codec and gradient routines reinterpret `f32` as `u32` and back
    // via explicit `to_bits`/`from_bits` rather than a pointer cast: the
    // on-disk format depends on exact IEEE-754 bit representation, and a
    // cast would be UB-adjacent noise next to this call site anyway.

    pub fn pack_f32x2(a: f32, b: f32) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&a.to_bits().to_le_bytes());
        buf[4..8].copy_from_slice(&b.to_bits().to_le_bytes());
        buf
    }

    pub fn pack_f32(a: f32) -> [u8; 8] {
        Self::pack_f32x2(a, 0.0)
    }

    pub fn pack_u32x2(a: u32, b: u32) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&a.to_le_bytes());
        buf[4..8].copy_from_slice(&b.to_le_bytes());
        buf
    }

    pub fn pack_u32(a: u32) -> [u8; 8] {
        Self::pack_u32x2(a, 0)
    }

    pub fn pack_u32_f32(a: u32, b: f32) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&a.to_le_bytes());
        buf[4..8].copy_from_slice(&b.to_bits().to_le_bytes());
        buf
    }

    pub fn pack_i8x8(deltas: [i8; 8]) -> [u8; 8] {
        let mut buf = [0u8; 8];
        for (dst, src) in buf.iter_mut().zip(deltas) {
            *dst = src as u8;
        }
        buf
    }

    pub fn read_f32x2(&self) -> (f32, f32) {
        let a = u32::from_le_bytes(self.payload[0..4].try_into().unwrap());
        let b = u32::from_le_bytes(self.payload[4..8].try_into().unwrap());
        (f32::from_bits(a), f32::from_bits(b))
    }

    pub fn read_f32(&self) -> f32 {
        self.read_f32x2().0
    }

    pub fn read_u32x2(&self) -> (u32, u32) {
        let a = u32::from_le_bytes(self.payload[0..4].try_into().unwrap());
        let b = u32::from_le_bytes(self.payload[4..8].try_into().unwrap());
        (a, b)
    }

    pub fn read_u32(&self) -> u32 {
        self.read_u32x2().0
    }

    pub fn read_u32_f32(&self) -> (u32, f32) {
        let a = u32::from_le_bytes(self.payload[0..4].try_into().unwrap());
        let b = u32::from_le_bytes(self.payload[4..8].try_into().unwrap());
        (a, f32::from_bits(b))
    }

    pub fn read_u16x4(&self) -> [u16; 4] {
        let mut out = [0u16; 4];
        for (i, chunk) in self.payload.chunks_exact(2).enumerate() {
            out[i] = u16::from_le_bytes(chunk.try_into().unwrap());
        }
        out
    }

    pub fn read_i8x8(&self) -> [i8; 8] {
        let mut out = [0i8; 8];
        for (dst, src) in out.iter_mut().zip(self.payload) {
            *dst = src as i8;
        }
        out
    }
}

/// The richer, typed view of a command that the codec encodes to / decodes
/// from a run of entries. One variant per opcode in `opcode.rs`; this is
/// the shape callers of `Context` and the parser/formatter actually build
/// and match on, rather than raw entries.
#[derive(Debug, Clone)]
pub enum Command {
    MoveTo { x: f32, y: f32 },
    RelMoveTo { dx: f32, dy: f32 },
    LineTo { x: f32, y: f32 },
    RelLineTo { dx: f32, dy: f32 },
    CurveTo { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    RelCurveTo { dx1: f32, dy1: f32, dx2: f32, dy2: f32, dx: f32, dy: f32 },
    QuadTo { cx: f32, cy: f32, x: f32, y: f32 },
    RelQuadTo { dcx: f32, dcy: f32, dx: f32, dy: f32 },
    Arc { x: f32, y: f32, radius: f32, angle1: f32, angle2: f32 },
    ArcTo { x1: f32, y1: f32, x2: f32, y2: f32, radius: f32 },
    Rectangle { x: f32, y: f32, width: f32, height: f32 },
    RoundRectangle { x: f32, y: f32, width: f32, height: f32, radius: f32 },
    ClosePath,
    BeginPath,
    /// Four `RelLineTo`s with all magnitudes below `BITPACK_MAX_DELTA /
    /// SUBDIV`, coalesced by the bitpack pass (spec.md §3, §4.1).
    RelLineToX4 { deltas: [i8; 8] },
    /// A `RelCurveTo` whose tail control point coincides with the
    /// endpoint, followed by a `RelLineTo`, both packed into one entry.
    RelCurveToRelLineTo { deltas: [i8; 8] },

    Fill,
    Stroke,
    PreservePath,
    Clip,

    Save,
    Restore,
    StartGroup,
    EndGroup,
    Reset,
    Identity,
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    Rotate { angle: f32 },
    ApplyTransform { m: [f32; 6] },
    SetTransform { m: [f32; 6] },

    Rgba { r: f32, g: f32, b: f32, a: f32 },
    Gray { g: f32, a: f32 },
    Cmyka { c: f32, m: f32, y: f32, k: f32, a: f32 },
    ColorModel { model: f32, c0: f32, c1: f32, c2: f32, c3: f32 },
    LinearGradient { x0: f32, y0: f32, x1: f32, y1: f32 },
    RadialGradient { x0: f32, y0: f32, r0: f32, x1: f32, y1: f32, r1: f32 },
    GradientAddStop { pos: f32, r: f32, g: f32, b: f32, a: f32 },
    Texture { x: f32, y: f32 },
    DefineTexture { width: u32, height: u32, format: u32 },
    LineWidth(f32),
    LineCap(u32),
    LineJoin(u32),
    MiterLimit(f32),
    LineDash { offset: f32, lengths: SmallVec<[f32; 8]> },
    LineDashOffset(f32),
    GlobalAlpha(f32),
    CompositingMode(u32),
    BlendMode(u32),
    FillRule(u32),
    ShadowColor { r: f32, g: f32, b: f32, a: f32 },
    ShadowBlur(f32),
    ShadowOffset { dx: f32, dy: f32 },
    ImageSmoothing(bool),
    Colorspace(u32),

    Font(u32),
    FontSize(f32),
    Text { x: f32, y: f32 },
    StrokeText { x: f32, y: f32 },
    Glyph { index: u32, x: f32, y: f32 },
    TextAlign(u32),
    TextBaseline(u32),
    TextDirection(u32),
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        use Command::*;
        match (self, other) {
            (MoveTo { x: lx, y: ly }, MoveTo { x: rx, y: ry }) => lx == rx && ly == ry,
            (RelMoveTo { dx: lx, dy: ly }, RelMoveTo { dx: rx, dy: ry }) => lx == rx && ly == ry,
            (LineTo { x: lx, y: ly }, LineTo { x: rx, y: ry }) => lx == rx && ly == ry,
            (RelLineTo { dx: lx, dy: ly }, RelLineTo { dx: rx, dy: ry }) => lx == rx && ly == ry,
            (
                CurveTo { x1: a1, y1: b1, x2: c1, y2: d1, x: e1, y: f1 },
                CurveTo { x1: a2, y1: b2, x2: c2, y2: d2, x: e2, y: f2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2 && f1 == f2,
            (
                RelCurveTo { dx1: a1, dy1: b1, dx2: c1, dy2: d1, dx: e1, dy: f1 },
                RelCurveTo { dx1: a2, dy1: b2, dx2: c2, dy2: d2, dx: e2, dy: f2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2 && f1 == f2,
            (QuadTo { cx: a1, cy: b1, x: c1, y: d1 }, QuadTo { cx: a2, cy: b2, x: c2, y: d2 }) => {
                a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2
            }
            (
                RelQuadTo { dcx: a1, dcy: b1, dx: c1, dy: d1 },
                RelQuadTo { dcx: a2, dcy: b2, dx: c2, dy: d2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2,
            (
                Arc { x: a1, y: b1, radius: c1, angle1: d1, angle2: e1 },
                Arc { x: a2, y: b2, radius: c2, angle1: d2, angle2: e2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2,
            (
                ArcTo { x1: a1, y1: b1, x2: c1, y2: d1, radius: e1 },
                ArcTo { x1: a2, y1: b2, x2: c2, y2: d2, radius: e2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2,
            (
                Rectangle { x: a1, y: b1, width: c1, height: d1 },
                Rectangle { x: a2, y: b2, width: c2, height: d2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2,
            (
                RoundRectangle { x: a1, y: b1, width: c1, height: d1, radius: e1 },
                RoundRectangle { x: a2, y: b2, width: c2, height: d2, radius: e2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2,
            (RelLineToX4 { deltas: l }, RelLineToX4 { deltas: r }) => l == r,
            (RelCurveToRelLineTo { deltas: l }, RelCurveToRelLineTo { deltas: r }) => l == r,
            (Translate { dx: lx, dy: ly }, Translate { dx: rx, dy: ry }) => lx == rx && ly == ry,
            (Scale { sx: lx, sy: ly }, Scale { sx: rx, sy: ry }) => lx == rx && ly == ry,
            (Rotate { angle: l }, Rotate { angle: r }) => l == r,
            (ApplyTransform { m: l }, ApplyTransform { m: r }) => l == r,
            (SetTransform { m: l }, SetTransform { m: r }) => l == r,
            (Rgba { r: a1, g: b1, b: c1, a: d1 }, Rgba { r: a2, g: b2, b: c2, a: d2 }) => {
                a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2
            }
            (Gray { g: lx, a: ly }, Gray { g: rx, a: ry }) => lx == rx && ly == ry,
            (
                Cmyka { c: a1, m: b1, y: c1, k: d1, a: e1 },
                Cmyka { c: a2, m: b2, y: c2, k: d2, a: e2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2,
            (
                ColorModel { model: a1, c0: b1, c1: c1_, c2: d1, c3: e1 },
                ColorModel { model: a2, c0: b2, c1: c2_, c2: d2, c3: e2 },
            ) => a1 == a2 && b1 == b2 && c1_ == c2_ && d1 == d2 && e1 == e2,
            (
                LinearGradient { x0: a1, y0: b1, x1: c1, y1: d1 },
                LinearGradient { x0: a2, y0: b2, x1: c2, y1: d2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2,
            (
                RadialGradient { x0: a1, y0: b1, r0: c1, x1: d1, y1: e1, r1: f1 },
                RadialGradient { x0: a2, y0: b2, r0: c2, x1: d2, y1: e2, r1: f2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2 && f1 == f2,
            (
                GradientAddStop { pos: a1, r: b1, g: c1, b: d1, a: e1 },
                GradientAddStop { pos: a2, r: b2, g: c2, b: d2, a: e2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2 && e1 == e2,
            (Texture { x: lx, y: ly }, Texture { x: rx, y: ry }) => lx == rx && ly == ry,
            (
                DefineTexture { width: a1, height: b1, format: c1 },
                DefineTexture { width: a2, height: b2, format: c2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2,
            (LineWidth(l), LineWidth(r)) => l == r,
            (LineCap(l), LineCap(r)) => l == r,
            (LineJoin(l), LineJoin(r)) => l == r,
            (MiterLimit(l), MiterLimit(r)) => l == r,
            (LineDash { offset: lo, lengths: ll }, LineDash { offset: ro, lengths: rl }) => {
                lo == ro && ll == rl
            }
            (LineDashOffset(l), LineDashOffset(r)) => l == r,
            (GlobalAlpha(l), GlobalAlpha(r)) => l == r,
            (CompositingMode(l), CompositingMode(r)) => l == r,
            (BlendMode(l), BlendMode(r)) => l == r,
            (FillRule(l), FillRule(r)) => l == r,
            (
                ShadowColor { r: a1, g: b1, b: c1, a: d1 },
                ShadowColor { r: a2, g: b2, b: c2, a: d2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2 && d1 == d2,
            (ShadowBlur(l), ShadowBlur(r)) => l == r,
            (ShadowOffset { dx: lx, dy: ly }, ShadowOffset { dx: rx, dy: ry }) => {
                lx == rx && ly == ry
            }
            (ImageSmoothing(l), ImageSmoothing(r)) => l == r,
            (Colorspace(l), Colorspace(r)) => l == r,
            (Font(l), Font(r)) => l == r,
            (FontSize(l), FontSize(r)) => l == r,
            (Text { x: lx, y: ly }, Text { x: rx, y: ry }) => lx == rx && ly == ry,
            (StrokeText { x: lx, y: ly }, StrokeText { x: rx, y: ry }) => lx == rx && ly == ry,
            (
                Glyph { index: a1, x: b1, y: c1 },
                Glyph { index: a2, x: b2, y: c2 },
            ) => a1 == a2 && b1 == b2 && c1 == c2,
            (TextAlign(l), TextAlign(r)) => l == r,
            (TextBaseline(l), TextBaseline(r)) => l == r,
            (TextDirection(l), TextDirection(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        use Command::*;
        match self {
            MoveTo { .. } => Opcode::MoveTo,
            RelMoveTo { .. } => Opcode::RelMoveTo,
            LineTo { .. } => Opcode::LineTo,
            RelLineTo { .. } => Opcode::RelLineTo,
            CurveTo { .. } => Opcode::CurveTo,
            RelCurveTo { .. } => Opcode::RelCurveTo,
            QuadTo { .. } => Opcode::QuadTo,
            RelQuadTo { .. } => Opcode::RelQuadTo,
            Arc { .. } => Opcode::Arc,
            ArcTo { .. } => Opcode::ArcTo,
            Rectangle { .. } => Opcode::Rectangle,
            RoundRectangle { .. } => Opcode::RoundRectangle,
            ClosePath => Opcode::ClosePath,
            BeginPath => Opcode::BeginPath,
            RelLineToX4 { .. } => Opcode::RelLineToX4,
            RelCurveToRelLineTo { .. } => Opcode::RelCurveToRelLineTo,
            Fill => Opcode::Fill,
            Stroke => Opcode::Stroke,
            PreservePath => Opcode::PreservePath,
            Clip => Opcode::Clip,
            Save => Opcode::Save,
            Restore => Opcode::Restore,
            StartGroup => Opcode::StartGroup,
            EndGroup => Opcode::EndGroup,
            Reset => Opcode::Reset,
            Identity => Opcode::Identity,
            Translate { .. } => Opcode::Translate,
            Scale { .. } => Opcode::Scale,
            Rotate { .. } => Opcode::Rotate,
            ApplyTransform { .. } => Opcode::ApplyTransform,
            SetTransform { .. } => Opcode::SetTransform,
            Rgba { .. } => Opcode::Rgba,
            Gray { .. } => Opcode::Gray,
            Cmyka { .. } => Opcode::Cmyka,
            ColorModel { .. } => Opcode::ColorModel,
            LinearGradient { .. } => Opcode::LinearGradient,
            RadialGradient { .. } => Opcode::RadialGradient,
            GradientAddStop { .. } => Opcode::GradientAddStop,
            Texture { .. } => Opcode::Texture,
            DefineTexture { .. } => Opcode::DefineTexture,
            LineWidth(_) => Opcode::LineWidth,
            LineCap(_) => Opcode::LineCap,
            LineJoin(_) => Opcode::LineJoin,
            MiterLimit(_) => Opcode::MiterLimit,
            LineDash { .. } => Opcode::LineDash,
            LineDashOffset(_) => Opcode::LineDashOffset,
            GlobalAlpha(_) => Opcode::GlobalAlpha,
            CompositingMode(_) => Opcode::CompositingMode,
            BlendMode(_) => Opcode::BlendMode,
            FillRule(_) => Opcode::FillRule,
            ShadowColor { .. } => Opcode::ShadowColor,
            ShadowBlur(_) => Opcode::ShadowBlur,
            ShadowOffset { .. } => Opcode::ShadowOffset,
            ImageSmoothing(_) => Opcode::ImageSmoothing,
            Colorspace(_) => Opcode::Colorspace,
            Font(_) => Opcode::Font,
            FontSize(_) => Opcode::FontSize,
            Text { .. } => Opcode::Text,
            StrokeText { .. } => Opcode::StrokeText,
            Glyph { .. } => Opcode::Glyph,
            TextAlign(_) => Opcode::TextAlign,
            TextBaseline(_) => Opcode::TextBaseline,
            TextDirection(_) => Opcode::TextDirection,
        }
    }

    /// Auxiliary length passed to `conts_for_entry` for the few opcodes
    /// whose continuation count depends on their own payload rather than
    /// being fixed (currently only `LineDash`; `Data`/`DataRev` are decoded
    /// a level below `Command`, in `drawlist.rs`).
    fn aux(&self) -> u32 {
        match self {
            Command::LineDash { lengths, .. } => lengths.len() as u32,
            _ => 0,
        }
    }

    /// Encodes this command into its leading entry plus continuations.
    pub fn encode(&self) -> SmallVec<[Entry; 4]> {
        use Command::*;
        let op = self.opcode();
        let mut out: SmallVec<[Entry; 4]> = SmallVec::new();
        match *self {
            MoveTo { x, y } | LineTo { x, y } | Texture { x, y } | Text { x, y }
            | StrokeText { x, y } => out.push(Entry::leading(op, Entry::pack_f32x2(x, y))),
            RelMoveTo { dx, dy } | RelLineTo { dx, dy } | Translate { dx, dy }
            | ShadowOffset { dx, dy } => out.push(Entry::leading(op, Entry::pack_f32x2(dx, dy))),
            CurveTo { x1, y1, x2, y2, x, y } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x1, y1)));
                out.push(Entry::cont(Entry::pack_f32x2(x2, y2)));
                out.push(Entry::cont(Entry::pack_f32x2(x, y)));
            }
            RelCurveTo { dx1, dy1, dx2, dy2, dx, dy } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(dx1, dy1)));
                out.push(Entry::cont(Entry::pack_f32x2(dx2, dy2)));
                out.push(Entry::cont(Entry::pack_f32x2(dx, dy)));
            }
            QuadTo { cx, cy, x, y } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(cx, cy)));
                out.push(Entry::cont(Entry::pack_f32x2(x, y)));
            }
            RelQuadTo { dcx, dcy, dx, dy } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(dcx, dcy)));
                out.push(Entry::cont(Entry::pack_f32x2(dx, dy)));
            }
            Arc { x, y, radius, angle1, angle2 } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x, y)));
                out.push(Entry::cont(Entry::pack_f32x2(radius, angle1)));
                out.push(Entry::cont(Entry::pack_f32(angle2)));
            }
            ArcTo { x1, y1, x2, y2, radius } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x1, y1)));
                out.push(Entry::cont(Entry::pack_f32x2(x2, y2)));
                out.push(Entry::cont(Entry::pack_f32(radius)));
            }
            Rectangle { x, y, width, height } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x, y)));
                out.push(Entry::cont(Entry::pack_f32x2(width, height)));
            }
            RoundRectangle { x, y, width, height, radius } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x, y)));
                out.push(Entry::cont(Entry::pack_f32x2(width, height)));
                out.push(Entry::cont(Entry::pack_f32(radius)));
            }
            ClosePath | BeginPath | Fill | Stroke | PreservePath | Clip | Save | Restore
            | StartGroup | EndGroup | Reset | Identity => {
                out.push(Entry::leading(op, [0u8; 8]))
            }
            RelLineToX4 { deltas } | RelCurveToRelLineTo { deltas } => {
                out.push(Entry::leading(op, Entry::pack_i8x8(deltas)))
            }
            Scale { sx, sy } => out.push(Entry::leading(op, Entry::pack_f32x2(sx, sy))),
            Rotate { angle } => out.push(Entry::leading(op, Entry::pack_f32(angle))),
            ApplyTransform { m } | SetTransform { m } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(m[0], m[1])));
                out.push(Entry::cont(Entry::pack_f32x2(m[2], m[3])));
                out.push(Entry::cont(Entry::pack_f32x2(m[4], m[5])));
            }
            Rgba { r, g, b, a } | ShadowColor { r, g, b, a } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(r, g)));
                out.push(Entry::cont(Entry::pack_f32x2(b, a)));
            }
            Gray { g, a } => out.push(Entry::leading(op, Entry::pack_f32x2(g, a))),
            Cmyka { c, m, y, k, a } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(c, m)));
                out.push(Entry::cont(Entry::pack_f32x2(y, k)));
                out.push(Entry::cont(Entry::pack_f32(a)));
            }
            ColorModel { model, c0, c1, c2, c3 } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(model, c0)));
                out.push(Entry::cont(Entry::pack_f32x2(c1, c2)));
                out.push(Entry::cont(Entry::pack_f32(c3)));
            }
            LinearGradient { x0, y0, x1, y1 } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x0, y0)));
                out.push(Entry::cont(Entry::pack_f32x2(x1, y1)));
            }
            RadialGradient { x0, y0, r0, x1, y1, r1 } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(x0, y0)));
                out.push(Entry::cont(Entry::pack_f32x2(r0, x1)));
                out.push(Entry::cont(Entry::pack_f32x2(y1, r1)));
            }
            GradientAddStop { pos, r, g, b, a } => {
                out.push(Entry::leading(op, Entry::pack_f32x2(pos, r)));
                out.push(Entry::cont(Entry::pack_f32x2(g, b)));
                out.push(Entry::cont(Entry::pack_f32(a)));
            }
            DefineTexture { width, height, format } => {
                out.push(Entry::leading(op, Entry::pack_u32x2(width, height)));
                out.push(Entry::cont(Entry::pack_u32(format)));
            }
            LineWidth(v) | MiterLimit(v) | LineDashOffset(v) | GlobalAlpha(v) | ShadowBlur(v)
            | FontSize(v) => out.push(Entry::leading(op, Entry::pack_f32(v))),
            LineCap(v) | LineJoin(v) | CompositingMode(v) | BlendMode(v) | FillRule(v)
            | Colorspace(v) | Font(v) | TextAlign(v) | TextBaseline(v) | TextDirection(v) => {
                out.push(Entry::leading(op, Entry::pack_u32(v)))
            }
            ImageSmoothing(b) => out.push(Entry::leading(op, Entry::pack_u32(b as u32))),
            LineDash { offset, ref lengths } => {
                out.push(Entry::leading(op, Entry::pack_u32_f32(lengths.len() as u32, offset)));
                for pair in lengths.chunks(2) {
                    let a = pair[0];
                    let b = pair.get(1).copied().unwrap_or(0.0);
                    out.push(Entry::cont(Entry::pack_f32x2(a, b)));
                }
            }
            Glyph { index, x, y } => {
                let mut leading = [0u8; 8];
                leading[0..4].copy_from_slice(&index.to_le_bytes());
                leading[4..8].copy_from_slice(&x.to_bits().to_le_bytes());
                out.push(Entry::leading(op, leading));
                out.push(Entry::cont(Entry::pack_f32(y)));
            }
        }
        debug_assert_eq!(out.len(), 1 + conts_for_entry(op, self.aux()));
        out
    }

    /// Decodes the command starting at `entries[0]`, returning it and the
    /// number of entries consumed (1 + its continuations). Returns `None`
    /// if `entries[0]` isn't a recognized leading opcode or the buffer is
    /// too short for the continuations it claims.
    pub fn decode(entries: &[Entry]) -> Option<(Command, usize)> {
        let leading = entries.first()?;
        let op = Opcode::from_u8(leading.opcode)?;

        // LineDash's continuation count depends on its own leading payload.
        let aux = match op {
            Opcode::LineDash => leading.read_u32_f32().0,
            _ => 0,
        };
        let conts = conts_for_entry(op, aux);
        let total = 1 + conts;
        if entries.len() < total {
            return None;
        }
        let c = |i: usize| entries[i];

        let cmd = match op {
            Opcode::MoveTo => {
                let (x, y) = leading.read_f32x2();
                Command::MoveTo { x, y }
            }
            Opcode::RelMoveTo => {
                let (dx, dy) = leading.read_f32x2();
                Command::RelMoveTo { dx, dy }
            }
            Opcode::LineTo => {
                let (x, y) = leading.read_f32x2();
                Command::LineTo { x, y }
            }
            Opcode::RelLineTo => {
                let (dx, dy) = leading.read_f32x2();
                Command::RelLineTo { dx, dy }
            }
            Opcode::CurveTo => {
                let (x1, y1) = leading.read_f32x2();
                let (x2, y2) = c(1).read_f32x2();
                let (x, y) = c(2).read_f32x2();
                Command::CurveTo { x1, y1, x2, y2, x, y }
            }
            Opcode::RelCurveTo => {
                let (dx1, dy1) = leading.read_f32x2();
                let (dx2, dy2) = c(1).read_f32x2();
                let (dx, dy) = c(2).read_f32x2();
                Command::RelCurveTo { dx1, dy1, dx2, dy2, dx, dy }
            }
            Opcode::QuadTo => {
                let (cx, cy) = leading.read_f32x2();
                let (x, y) = c(1).read_f32x2();
                Command::QuadTo { cx, cy, x, y }
            }
            Opcode::RelQuadTo => {
                let (dcx, dcy) = leading.read_f32x2();
                let (dx, dy) = c(1).read_f32x2();
                Command::RelQuadTo { dcx, dcy, dx, dy }
            }
            Opcode::Arc => {
                let (x, y) = leading.read_f32x2();
                let (radius, angle1) = c(1).read_f32x2();
                let angle2 = c(2).read_f32();
                Command::Arc { x, y, radius, angle1, angle2 }
            }
            Opcode::ArcTo => {
                let (x1, y1) = leading.read_f32x2();
                let (x2, y2) = c(1).read_f32x2();
                let radius = c(2).read_f32();
                Command::ArcTo { x1, y1, x2, y2, radius }
            }
            Opcode::Rectangle => {
                let (x, y) = leading.read_f32x2();
                let (width, height) = c(1).read_f32x2();
                Command::Rectangle { x, y, width, height }
            }
            Opcode::RoundRectangle => {
                let (x, y) = leading.read_f32x2();
                let (width, height) = c(1).read_f32x2();
                let radius = c(2).read_f32();
                Command::RoundRectangle { x, y, width, height, radius }
            }
            Opcode::ClosePath => Command::ClosePath,
            Opcode::BeginPath => Command::BeginPath,
            Opcode::RelLineToX4 => Command::RelLineToX4 { deltas: leading.read_i8x8() },
            Opcode::RelCurveToRelLineTo => {
                Command::RelCurveToRelLineTo { deltas: leading.read_i8x8() }
            }
            Opcode::Fill => Command::Fill,
            Opcode::Stroke => Command::Stroke,
            Opcode::PreservePath => Command::PreservePath,
            Opcode::Clip => Command::Clip,
            Opcode::Save => Command::Save,
            Opcode::Restore => Command::Restore,
            Opcode::StartGroup => Command::StartGroup,
            Opcode::EndGroup => Command::EndGroup,
            Opcode::Reset => Command::Reset,
            Opcode::Identity => Command::Identity,
            Opcode::Translate => {
                let (dx, dy) = leading.read_f32x2();
                Command::Translate { dx, dy }
            }
            Opcode::Scale => {
                let (sx, sy) = leading.read_f32x2();
                Command::Scale { sx, sy }
            }
            Opcode::Rotate => Command::Rotate { angle: leading.read_f32() },
            Opcode::ApplyTransform | Opcode::SetTransform => {
                let (m0, m1) = leading.read_f32x2();
                let (m2, m3) = c(1).read_f32x2();
                let (m4, m5) = c(2).read_f32x2();
                let m = [m0, m1, m2, m3, m4, m5];
                if op == Opcode::ApplyTransform {
                    Command::ApplyTransform { m }
                } else {
                    Command::SetTransform { m }
                }
            }
            Opcode::Rgba => {
                let (r, g) = leading.read_f32x2();
                let (b, a) = c(1).read_f32x2();
                Command::Rgba { r, g, b, a }
            }
            Opcode::Gray => {
                let (g, a) = leading.read_f32x2();
                Command::Gray { g, a }
            }
            Opcode::Cmyka => {
                let (c0, m0) = leading.read_f32x2();
                let (y0, k0) = c(1).read_f32x2();
                let a0 = c(2).read_f32();
                Command::Cmyka { c: c0, m: m0, y: y0, k: k0, a: a0 }
            }
            Opcode::ColorModel => {
                let (model, c0) = leading.read_f32x2();
                let (c1, c2) = c(1).read_f32x2();
                let c3 = c(2).read_f32();
                Command::ColorModel { model, c0, c1, c2, c3 }
            }
            Opcode::LinearGradient => {
                let (x0, y0) = leading.read_f32x2();
                let (x1, y1) = c(1).read_f32x2();
                Command::LinearGradient { x0, y0, x1, y1 }
            }
            Opcode::RadialGradient => {
                let (x0, y0) = leading.read_f32x2();
                let (r0, x1) = c(1).read_f32x2();
                let (y1, r1) = c(2).read_f32x2();
                Command::RadialGradient { x0, y0, r0, x1, y1, r1 }
            }
            Opcode::GradientAddStop => {
                let (pos, r) = leading.read_f32x2();
                let (g, b) = c(1).read_f32x2();
                let a = c(2).read_f32();
                Command::GradientAddStop { pos, r, g, b, a }
            }
            Opcode::Texture => {
                let (x, y) = leading.read_f32x2();
                Command::Texture { x, y }
            }
            Opcode::DefineTexture => {
                let (width, height) = leading.read_u32x2();
                let format = c(1).read_u32();
                Command::DefineTexture { width, height, format }
            }
            Opcode::LineWidth => Command::LineWidth(leading.read_f32()),
            Opcode::LineCap => Command::LineCap(leading.read_u32()),
            Opcode::LineJoin => Command::LineJoin(leading.read_u32()),
            Opcode::MiterLimit => Command::MiterLimit(leading.read_f32()),
            Opcode::LineDash => {
                let (count, offset) = leading.read_u32_f32();
                let mut lengths = SmallVec::with_capacity(count as usize);
                'outer: for i in 0..conts {
                    let (a, b) = c(1 + i).read_f32x2();
                    lengths.push(a);
                    if lengths.len() as u32 == count {
                        break 'outer;
                    }
                    lengths.push(b);
                    if lengths.len() as u32 == count {
                        break 'outer;
                    }
                }
                lengths.truncate(count as usize);
                Command::LineDash { offset, lengths }
            }
            Opcode::LineDashOffset => Command::LineDashOffset(leading.read_f32()),
            Opcode::GlobalAlpha => Command::GlobalAlpha(leading.read_f32()),
            Opcode::CompositingMode => Command::CompositingMode(leading.read_u32()),
            Opcode::BlendMode => Command::BlendMode(leading.read_u32()),
            Opcode::FillRule => Command::FillRule(leading.read_u32()),
            Opcode::ShadowColor => {
                let (r, g) = leading.read_f32x2();
                let (b, a) = c(1).read_f32x2();
                Command::ShadowColor { r, g, b, a }
            }
            Opcode::ShadowBlur => Command::ShadowBlur(leading.read_f32()),
            Opcode::ShadowOffset => {
                let (dx, dy) = leading.read_f32x2();
                Command::ShadowOffset { dx, dy }
            }
            Opcode::ImageSmoothing => Command::ImageSmoothing(leading.read_u32() != 0),
            Opcode::Colorspace => Command::Colorspace(leading.read_u32()),
            Opcode::Font => Command::Font(leading.read_u32()),
            Opcode::FontSize => Command::FontSize(leading.read_f32()),
            Opcode::Text => {
                let (x, y) = leading.read_f32x2();
                Command::Text { x, y }
            }
            Opcode::StrokeText => {
                let (x, y) = leading.read_f32x2();
                Command::StrokeText { x, y }
            }
            Opcode::Glyph => {
                let index = leading.read_u32_f32().0;
                let x = f32::from_bits(u32::from_le_bytes(leading.payload[4..8].try_into().unwrap()));
                let y = c(1).read_f32();
                Command::Glyph { index, x, y }
            }
            Opcode::TextAlign => Command::TextAlign(leading.read_u32()),
            Opcode::TextBaseline => Command::TextBaseline(leading.read_u32()),
            Opcode::TextDirection => Command::TextDirection(leading.read_u32()),
            Opcode::Data | Opcode::DataRev | Opcode::Nop | Opcode::Flush => return None,
        };
        Some((cmd, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(cmd: Command) {
        let entries = cmd.encode();
        let (decoded, consumed) = Command::decode(&entries).expect("decode");
        assert_eq!(consumed, entries.len());
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn fixed_shape_commands_round_trip() {
        round_trip(Command::MoveTo { x: 1.0, y: 2.0 });
        round_trip(Command::CurveTo { x1: 1.0, y1: 2.0, x2: 3.0, y2: 4.0, x: 5.0, y: 6.0 });
        round_trip(Command::Rectangle { x: 0.0, y: 0.0, width: 5.0, height: 5.0 });
        round_trip(Command::Rgba { r: 1.0, g: 0.0, b: 0.0, a: 1.0 });
        round_trip(Command::ApplyTransform { m: [1.0, 0.0, 0.0, 1.0, 10.0, 20.0] });
        round_trip(Command::Glyph { index: 42, x: 1.5, y: -2.5 });
    }

    #[test]
    fn line_dash_round_trips_odd_and_even_lengths() {
        round_trip(Command::LineDash {
            offset: 1.0,
            lengths: SmallVec::from_slice(&[1.0, 2.0, 3.0]),
        });
        round_trip(Command::LineDash { offset: 0.0, lengths: SmallVec::from_slice(&[4.0, 5.0]) });
        round_trip(Command::LineDash { offset: 0.0, lengths: SmallVec::new() });
    }

    #[test]
    fn bitpacked_deltas_round_trip() {
        round_trip(Command::RelLineToX4 { deltas: [1, -2, 3, -4, 5, -6, 7, -8] });
    }
}
