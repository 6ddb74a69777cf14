//! The opcode table: every `Entry`'s leading byte, and
//! [`conts_for_entry`], the total deterministic function from an opcode (plus,
//! for a handful of variable-length ops, an auxiliary count read out of the
//! entry's own payload) to the number of `CONT` entries that follow it.
//!
//! Modeled as a `repr(u8)` enum rather than bare `pub const`s, per the
//! "tagged records vs. class hierarchy" design note: iteration consults a
//! `const fn` table keyed on this type instead of re-deriving continuation
//! counts ad hoc at each call site.

/// Marks a continuation entry: carries overflow payload for the entry that
/// precedes it and never appears as a command's leading opcode.
pub const CONT: u8 = 0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `(byte_length, block_length)`; followed by `block_length - 1` raw
    /// data entries, NUL-terminated (spec.md §3).
    Data = 1,
    /// Mirrors a `Data` block's lengths at its tail for reverse traversal.
    DataRev = 2,
    /// Bitpack placeholder, compacted away in a second pass; zero-width.
    Nop = 3,
    /// Bitpack may never rewrite across a `Flush`.
    Flush = 4,

    // -- Path construction --------------------------------------------
    MoveTo = 10,
    RelMoveTo = 11,
    LineTo = 12,
    RelLineTo = 13,
    CurveTo = 14,
    RelCurveTo = 15,
    QuadTo = 16,
    RelQuadTo = 17,
    Arc = 18,
    ArcTo = 19,
    Rectangle = 20,
    RoundRectangle = 21,
    ClosePath = 22,
    BeginPath = 23,

    /// Four `rel_line_to`s packed as eight signed 8-bit deltas (spec.md
    /// §3, §4.1).
    RelLineToX4 = 30,
    /// A `rel_curve_to` followed by a `rel_line_to`, packed the same way;
    /// the decoder's three-vs-four-entry ambiguity (spec.md §9) lives in
    /// `drawlist.rs`, not here.
    RelCurveToRelLineTo = 31,

    // -- Paint ----------------------------------------------------------
    Fill = 40,
    Stroke = 41,
    PreservePath = 42,
    Clip = 43,

    // -- State / transform ------------------------------------------------
    Save = 50,
    Restore = 51,
    StartGroup = 52,
    EndGroup = 53,
    Reset = 54,
    Identity = 55,
    Translate = 56,
    Scale = 57,
    Rotate = 58,
    ApplyTransform = 59,
    SetTransform = 60,

    // -- Style ------------------------------------------------------------
    Rgba = 70,
    Gray = 71,
    Cmyka = 72,
    ColorModel = 73,
    LinearGradient = 74,
    RadialGradient = 75,
    GradientAddStop = 76,
    Texture = 77,
    DefineTexture = 78,
    LineWidth = 79,
    LineCap = 80,
    LineJoin = 81,
    MiterLimit = 82,
    LineDash = 83,
    LineDashOffset = 84,
    GlobalAlpha = 85,
    CompositingMode = 86,
    BlendMode = 87,
    FillRule = 88,
    ShadowColor = 89,
    ShadowBlur = 90,
    ShadowOffset = 91,
    ImageSmoothing = 92,
    Colorspace = 93,

    // -- Text ---------------------------------------------------------------
    Font = 100,
    FontSize = 101,
    Text = 102,
    StrokeText = 103,
    Glyph = 104,
    TextAlign = 105,
    TextBaseline = 106,
    TextDirection = 107,
}

impl Opcode {
    /// Recovers an `Opcode` from its wire byte. `CONT` (0) is deliberately
    /// not representable here: callers check for it before calling this.
    pub const fn from_u8(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            1 => Data,
            2 => DataRev,
            3 => Nop,
            4 => Flush,
            10 => MoveTo,
            11 => RelMoveTo,
            12 => LineTo,
            13 => RelLineTo,
            14 => CurveTo,
            15 => RelCurveTo,
            16 => QuadTo,
            17 => RelQuadTo,
            18 => Arc,
            19 => ArcTo,
            20 => Rectangle,
            21 => RoundRectangle,
            22 => ClosePath,
            23 => BeginPath,
            30 => RelLineToX4,
            31 => RelCurveToRelLineTo,
            40 => Fill,
            41 => Stroke,
            42 => PreservePath,
            43 => Clip,
            50 => Save,
            51 => Restore,
            52 => StartGroup,
            53 => EndGroup,
            54 => Reset,
            55 => Identity,
            56 => Translate,
            57 => Scale,
            58 => Rotate,
            59 => ApplyTransform,
            60 => SetTransform,
            70 => Rgba,
            71 => Gray,
            72 => Cmyka,
            73 => ColorModel,
            74 => LinearGradient,
            75 => RadialGradient,
            76 => GradientAddStop,
            77 => Texture,
            78 => DefineTexture,
            79 => LineWidth,
            80 => LineCap,
            81 => LineJoin,
            82 => MiterLimit,
            83 => LineDash,
            84 => LineDashOffset,
            85 => GlobalAlpha,
            86 => CompositingMode,
            87 => BlendMode,
            88 => FillRule,
            89 => ShadowColor,
            90 => ShadowBlur,
            91 => ShadowOffset,
            92 => ImageSmoothing,
            93 => Colorspace,
            100 => Font,
            101 => FontSize,
            102 => Text,
            103 => StrokeText,
            104 => Glyph,
            105 => TextAlign,
            106 => TextBaseline,
            107 => TextDirection,
            _ => return None,
        })
    }

    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Number of `CONT` entries that follow a leading entry of opcode `op`.
///
/// Total and deterministic, as spec.md §4.1 and §8 require: for every
/// opcode other than `Data`/`DataRev`/`LineDash`, the answer depends only on
/// `op`. Those three read `aux` — a count already present in the leading
/// entry's own payload (`block_length` for `Data`/`DataRev`, dash-array
/// length for `LineDash`) — rather than looking ahead in the list.
pub const fn conts_for_entry(op: Opcode, aux: u32) -> usize {
    use Opcode::*;
    match op {
        Data | DataRev => aux.saturating_sub(1) as usize,
        Nop | Flush => 0,

        MoveTo | RelMoveTo | LineTo | RelLineTo => 0,
        CurveTo | RelCurveTo => 2,
        QuadTo | RelQuadTo => 1,
        Arc => 2,
        ArcTo => 2,
        Rectangle => 1,
        RoundRectangle => 2,
        ClosePath | BeginPath => 0,
        RelLineToX4 | RelCurveToRelLineTo => 0,

        Fill | Stroke | PreservePath | Clip => 0,

        Save | Restore | StartGroup | EndGroup | Reset | Identity => 0,
        Translate | Scale | Rotate => 0,
        ApplyTransform | SetTransform => 2,

        Rgba => 1,
        Gray => 0,
        Cmyka => 2,
        ColorModel => 2,
        LinearGradient => 1,
        RadialGradient => 2,
        GradientAddStop => 2,
        Texture => 0,
        DefineTexture => 1,
        LineWidth | LineCap | LineJoin | MiterLimit | LineDashOffset => 0,
        LineDash => (aux as usize).div_ceil(2),
        GlobalAlpha | CompositingMode | BlendMode | FillRule | ImageSmoothing | Colorspace => 0,
        ShadowColor => 1,
        ShadowBlur | ShadowOffset => 0,

        Font | FontSize => 0,
        Text | StrokeText => 0,
        Glyph => 1,
        TextAlign | TextBaseline | TextDirection => 0,
    }
}

/// The long-form (textual formatter/parser, spec.md §4.2/§4.3) name for
/// each opcode — also the word the parser's `strhash` table resolves.
/// Relative path variants keep the `rel_` prefix from spec.md §6's public
/// API surface.
pub const fn long_name(op: Opcode) -> &'static str {
    use Opcode::*;
    match op {
        Data => "data",
        DataRev => "data_rev",
        Nop => "nop",
        Flush => "flush",
        MoveTo => "move_to",
        RelMoveTo => "rel_move_to",
        LineTo => "line_to",
        RelLineTo => "rel_line_to",
        CurveTo => "curve_to",
        RelCurveTo => "rel_curve_to",
        QuadTo => "quad_to",
        RelQuadTo => "rel_quad_to",
        Arc => "arc",
        ArcTo => "arc_to",
        Rectangle => "rectangle",
        RoundRectangle => "round_rectangle",
        ClosePath => "close_path",
        BeginPath => "begin_path",
        RelLineToX4 => "rel_line_to_x4",
        RelCurveToRelLineTo => "rel_curve_to_rel_line_to",
        Fill => "fill",
        Stroke => "stroke",
        PreservePath => "preserve",
        Clip => "clip",
        Save => "save",
        Restore => "restore",
        StartGroup => "start_group",
        EndGroup => "end_group",
        Reset => "reset",
        Identity => "identity",
        Translate => "translate",
        Scale => "scale",
        Rotate => "rotate",
        ApplyTransform => "apply_transform",
        SetTransform => "set_transform",
        Rgba => "rgba",
        Gray => "gray",
        Cmyka => "cmyka",
        ColorModel => "color",
        LinearGradient => "linear_gradient",
        RadialGradient => "radial_gradient",
        GradientAddStop => "gradient_add_stop",
        Texture => "texture",
        DefineTexture => "define_texture",
        LineWidth => "line_width",
        LineCap => "line_cap",
        LineJoin => "line_join",
        MiterLimit => "miter_limit",
        LineDash => "line_dash",
        LineDashOffset => "line_dash_offset",
        GlobalAlpha => "global_alpha",
        CompositingMode => "compositing_mode",
        BlendMode => "blend_mode",
        FillRule => "fill_rule",
        ShadowColor => "shadow_color",
        ShadowBlur => "shadow_blur",
        ShadowOffset => "shadow_offset",
        ImageSmoothing => "image_smoothing",
        Colorspace => "colorspace",
        Font => "font",
        FontSize => "font_size",
        Text => "text",
        StrokeText => "stroke_text",
        Glyph => "glyph",
        TextAlign => "text_align",
        TextBaseline => "text_baseline",
        TextDirection => "text_direction",
    }
}

/// The short-form (single-letter where one exists) token for an opcode,
/// spec.md §4.2: "single-letter opcodes, whitespace separators, minimum
/// precision". Not every opcode has earned a letter — the formatter falls
/// back to [`long_name`] for the long tail of rarely-used property setters,
/// and the parser accepts both forms interchangeably in either mode.
pub const fn short_token(op: Opcode) -> &'static str {
    use Opcode::*;
    match op {
        MoveTo => "M",
        RelMoveTo => "m",
        LineTo => "L",
        RelLineTo => "l",
        CurveTo => "C",
        RelCurveTo => "c",
        QuadTo => "Q",
        RelQuadTo => "q",
        Arc => "A",
        ArcTo => "a",
        Rectangle => "R",
        RoundRectangle => "r",
        ClosePath => "Z",
        BeginPath => "B",
        Fill => "F",
        Stroke => "S",
        PreservePath => "P",
        Save => "[",
        Restore => "]",
        Translate => "T",
        Scale => "s",
        Rotate => "t",
        Rgba => "rgb",
        Gray => "g",
        Texture => "tx",
        LineWidth => "lw",
        GlobalAlpha => "ga",
        _ => long_name(op),
    }
}

/// Case-sensitive single-character short-form tokens (spec.md §4.2's short
/// formatter output, §4.3's "single characters that are themselves opcodes
/// fall through"). Checked before the case-insensitive long-word table so
/// that e.g. `M`/`m` disambiguate absolute vs. relative the way the rest of
/// the short form's letter pairs do.
fn opcode_from_single_char(word: &str) -> Option<Opcode> {
    use Opcode::*;
    Some(match word {
        "M" => MoveTo,
        "m" => RelMoveTo,
        "L" => LineTo,
        "l" => RelLineTo,
        "C" => CurveTo,
        "c" => RelCurveTo,
        "Q" => QuadTo,
        "q" => RelQuadTo,
        "A" => Arc,
        "a" => ArcTo,
        "R" => Rectangle,
        "r" => RoundRectangle,
        "Z" => ClosePath,
        "B" => BeginPath,
        "F" => Fill,
        "S" => Stroke,
        "P" => PreservePath,
        "T" => Translate,
        "s" => Scale,
        "t" => Rotate,
        "g" => Gray,
        "[" => Save,
        "]" => Restore,
        _ => return None,
    })
}

/// Case-insensitive long-form word table (spec.md §4.3: "Case-insensitive
/// names resolved by the `strhash` table"). `word` must already be
/// lowercased by the caller.
fn opcode_from_long_word(word: &str) -> Option<Opcode> {
    use Opcode::*;
    Some(match word {
        "data" => Data,
        "data_rev" => DataRev,
        "nop" => Nop,
        "flush" => Flush,
        "move_to" => MoveTo,
        "rel_move_to" => RelMoveTo,
        "line_to" => LineTo,
        "rel_line_to" => RelLineTo,
        "curve_to" => CurveTo,
        "rel_curve_to" => RelCurveTo,
        "quad_to" => QuadTo,
        "rel_quad_to" => RelQuadTo,
        "arc" => Arc,
        "arc_to" => ArcTo,
        "rectangle" | "rect" => Rectangle,
        "round_rectangle" | "round_rect" => RoundRectangle,
        "close_path" => ClosePath,
        "begin_path" => BeginPath,
        "rel_line_to_x4" => RelLineToX4,
        "rel_curve_to_rel_line_to" => RelCurveToRelLineTo,
        "fill" => Fill,
        "stroke" => Stroke,
        "preserve" => PreservePath,
        "clip" => Clip,
        "save" => Save,
        "restore" => Restore,
        "start_group" => StartGroup,
        "end_group" => EndGroup,
        "reset" => Reset,
        "identity" => Identity,
        "translate" => Translate,
        "scale" => Scale,
        "rotate" => Rotate,
        "apply_transform" => ApplyTransform,
        "set_transform" => SetTransform,
        "rgba" | "rgb" => Rgba,
        "gray" | "grey" => Gray,
        "cmyka" | "cmyk" => Cmyka,
        "color" => ColorModel,
        "linear_gradient" => LinearGradient,
        "radial_gradient" => RadialGradient,
        "gradient_add_stop" => GradientAddStop,
        "texture" | "tx" => Texture,
        "define_texture" => DefineTexture,
        "line_width" | "lw" => LineWidth,
        "line_cap" => LineCap,
        "line_join" => LineJoin,
        "miter_limit" => MiterLimit,
        "line_dash" => LineDash,
        "line_dash_offset" => LineDashOffset,
        "global_alpha" | "ga" => GlobalAlpha,
        "compositing_mode" => CompositingMode,
        "blend_mode" => BlendMode,
        "fill_rule" => FillRule,
        "shadow_color" => ShadowColor,
        "shadow_blur" => ShadowBlur,
        "shadow_offset" => ShadowOffset,
        "image_smoothing" => ImageSmoothing,
        "colorspace" => Colorspace,
        "font" => Font,
        "font_size" => FontSize,
        "text" => Text,
        "stroke_text" => StrokeText,
        "glyph" => Glyph,
        "text_align" => TextAlign,
        "text_baseline" => TextBaseline,
        "text_direction" => TextDirection,
        _ => return None,
    })
}

/// Resolves a just-finished parser word to the opcode it names. Single
/// characters are matched case-sensitively against the short-form table
/// first; everything else is lowercased and matched against the long-form
/// table (spec.md §4.3).
pub fn opcode_from_word(word: &str) -> Option<Opcode> {
    if word.chars().count() == 1 {
        if let Some(op) = opcode_from_single_char(word) {
            return Some(op);
        }
    }
    let lower = word.to_ascii_lowercase();
    opcode_from_long_word(&lower)
}

/// Order-sensitive fold of a word into a 52-bit hash over a 5-bit alphabet
/// (spec.md §4.3: "`strhash`, an order-sensitive 52-bit fold over a 5-bit
/// alphabet"). `a`-`z` map to 1..=26, `_` to 27; anything else folds to 0
/// (still order-sensitive, just not collision-free outside the alphabet).
/// Used by the parser to dispatch a finished word without a string
/// comparison chain; [`opcode_from_word`] remains the source of truth this
/// hash is checked against in tests.
pub const fn strhash(word: &str) -> u64 {
    const MASK: u64 = (1u64 << 52) - 1;
    let bytes = word.as_bytes();
    let mut hash: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let code: u64 = match b {
            b'a'..=b'z' => (b - b'a') as u64 + 1,
            b'A'..=b'Z' => (b - b'A') as u64 + 1,
            b'_' => 27,
            _ => 0,
        };
        hash = ((hash << 5) | code) & MASK;
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_its_byte() {
        let bytes = [
            1, 2, 3, 4, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 30, 31, 40, 41,
            42, 43, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 70, 71, 72, 73, 74, 75, 76, 77,
            78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92, 93, 100, 101, 102, 103,
            104, 105, 106, 107,
        ];
        for b in bytes {
            let op = Opcode::from_u8(b).unwrap();
            assert_eq!(op.to_u8(), b);
        }
    }

    #[test]
    fn cont_is_not_a_valid_opcode() {
        assert!(Opcode::from_u8(CONT).is_none());
    }

    #[test]
    fn fixed_shape_ops_ignore_aux() {
        assert_eq!(conts_for_entry(Opcode::CurveTo, 0), conts_for_entry(Opcode::CurveTo, 99));
    }

    #[test]
    fn data_conts_track_block_length() {
        assert_eq!(conts_for_entry(Opcode::Data, 1), 0);
        assert_eq!(conts_for_entry(Opcode::Data, 4), 3);
    }

    const ALL_OPS: &[Opcode] = &[
        Opcode::Data,
        Opcode::DataRev,
        Opcode::Nop,
        Opcode::Flush,
        Opcode::MoveTo,
        Opcode::RelMoveTo,
        Opcode::LineTo,
        Opcode::RelLineTo,
        Opcode::CurveTo,
        Opcode::RelCurveTo,
        Opcode::QuadTo,
        Opcode::RelQuadTo,
        Opcode::Arc,
        Opcode::ArcTo,
        Opcode::Rectangle,
        Opcode::RoundRectangle,
        Opcode::ClosePath,
        Opcode::BeginPath,
        Opcode::RelLineToX4,
        Opcode::RelCurveToRelLineTo,
        Opcode::Fill,
        Opcode::Stroke,
        Opcode::PreservePath,
        Opcode::Clip,
        Opcode::Save,
        Opcode::Restore,
        Opcode::StartGroup,
        Opcode::EndGroup,
        Opcode::Reset,
        Opcode::Identity,
        Opcode::Translate,
        Opcode::Scale,
        Opcode::Rotate,
        Opcode::ApplyTransform,
        Opcode::SetTransform,
        Opcode::Rgba,
        Opcode::Gray,
        Opcode::Cmyka,
        Opcode::ColorModel,
        Opcode::LinearGradient,
        Opcode::RadialGradient,
        Opcode::GradientAddStop,
        Opcode::Texture,
        Opcode::DefineTexture,
        Opcode::LineWidth,
        Opcode::LineCap,
        Opcode::LineJoin,
        Opcode::MiterLimit,
        Opcode::LineDash,
        Opcode::LineDashOffset,
        Opcode::GlobalAlpha,
        Opcode::CompositingMode,
        Opcode::BlendMode,
        Opcode::FillRule,
        Opcode::ShadowColor,
        Opcode::ShadowBlur,
        Opcode::ShadowOffset,
        Opcode::ImageSmoothing,
        Opcode::Colorspace,
        Opcode::Font,
        Opcode::FontSize,
        Opcode::Text,
        Opcode::StrokeText,
        Opcode::Glyph,
        Opcode::TextAlign,
        Opcode::TextBaseline,
        Opcode::TextDirection,
    ];

    #[test]
    fn long_name_round_trips_through_opcode_from_word() {
        for &op in ALL_OPS {
            assert_eq!(opcode_from_word(long_name(op)), Some(op), "long_name({op:?})");
        }
    }

    #[test]
    fn short_token_round_trips_through_opcode_from_word() {
        for &op in ALL_OPS {
            assert_eq!(opcode_from_word(short_token(op)), Some(op), "short_token({op:?})");
        }
    }

    #[test]
    fn uppercase_long_name_still_resolves() {
        assert_eq!(opcode_from_word("MOVE_TO"), Some(Opcode::MoveTo));
        assert_eq!(opcode_from_word("Rectangle"), Some(Opcode::Rectangle));
    }
}
