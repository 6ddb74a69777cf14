//! A byte-fed textual parser for the draw-list command syntax (spec.md
//! §4.3): tokenizes words, numbers (with the `@`/`%`/`^`/`~` scale
//! suffixes), and quoted strings, resolves words to opcodes via
//! [`crate::opcode::opcode_from_word`], and dispatches once a command's
//! expected argument count is reached.
//!
//! Grounded in `deserialize.rs`'s per-token dispatch + warning-collection
//! style: malformed input never aborts the parse, it just drops the
//! offending token and keeps going (spec.md §4.3, §7).

use smallvec::SmallVec;

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, string::ToString, vec, vec::Vec};

use crate::constants::PARSER_MAXLEN;
use crate::entry::Command;
use crate::instruction::Instruction;
use crate::opcode::{opcode_from_word, Opcode};

/// Scale basis for the `@`/`%`/`^`/`~` numeric suffixes (spec.md §4.3: "the
/// scale used depends on the command being filled and the argument index"
/// in the original; here, since every command in this crate's API takes
/// plain device-space numbers, a single basis per suffix is used instead
/// of a per-argument table — an open question resolved in `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserContext {
    /// `@` suffix: multiplies by this cell size.
    pub cell_size: f32,
    /// `%` suffix: multiplies by this (viewbox-diagonal-derived) percent basis.
    pub percent_basis: f32,
    /// `^` suffix: multiplies by viewbox height / 100.
    pub viewbox_height: f32,
    /// `~` suffix: multiplies by viewbox width / 100.
    pub viewbox_width: f32,
}

impl Default for ParserContext {
    fn default() -> Self {
        ParserContext { cell_size: 1.0, percent_basis: 1.0, viewbox_height: 100.0, viewbox_width: 100.0 }
    }
}

impl ParserContext {
    fn scale(&self, suffix: u8) -> f32 {
        match suffix {
            b'@' => self.cell_size,
            b'%' => self.percent_basis / 100.0,
            b'^' => self.viewbox_height / 100.0,
            b'~' => self.viewbox_width / 100.0,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f32),
    Str(String),
}

/// The byte-fed tokenizer. Holds the whole input for simplicity — a true
/// streaming `feed_byte` state machine (spec.md §9's "Cooperative control
/// flow" note) would buffer only the in-progress token, but a contiguous
/// draw-program string is the crate's actual use case, so this operates
/// over a borrowed `&str` instead while keeping the same state names.
struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    ctx: ParserContext,
    warnings: Vec<String>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str, ctx: ParserContext) -> Self {
        Lexer { bytes: text.as_bytes(), pos: 0, ctx, warnings: Vec::new() }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace_and_separators(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b',' | b'(' | b')' => self.pos += 1,
                b'#' => {
                    // comment state: runs to end of line.
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Neutral state: dispatches to number/word/string states per the
    /// leading byte, per spec.md §4.3.
    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_separators();
        let b = self.peek()?;
        match b {
            b'-' | b'.' | b'0'..=b'9' => Some(self.lex_number()),
            b'"' => Some(self.lex_string(b'"')),
            b'\'' => Some(self.lex_string(b'\'')),
            _ if b.is_ascii_alphabetic() || b == b'_' || b == b'[' || b == b']' => {
                Some(self.lex_word())
            }
            _ => {
                self.warnings.push(format!("unexpected byte 0x{b:02x}"));
                self.pos += 1;
                self.next_token()
            }
        }
    }

    /// `number` / `negative_number` states: accepts `.` once, then an
    /// optional scale suffix from `@%^~`.
    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = core::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("0");
        let value: f32 = text.parse().unwrap_or_else(|_| {
            self.warnings.push(format!("truncated number {text:?}"));
            0.0
        });
        let scale = match self.peek() {
            Some(s @ (b'@' | b'%' | b'^' | b'~')) => {
                self.pos += 1;
                self.ctx.scale(s)
            }
            _ => 1.0,
        };
        Token::Number(value * scale)
    }

    /// `word` state: a run of ASCII letters/digits/underscore, or a lone
    /// bracket (`[`/`]`, the short-form save/restore tokens).
    fn lex_word(&mut self) -> Token {
        if matches!(self.peek(), Some(b'[') | Some(b']')) {
            let b = self.bump().unwrap();
            return Token::Word((b as char).to_string());
        }
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::Word(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    /// `string_apos` / `string_quot` states, with the matching `*_escaped`
    /// states folded into the match on `\`.
    fn lex_string(&mut self, quote: u8) -> Token {
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    self.warnings.push("truncated string".to_string());
                    break;
                }
                Some(b) if b == quote => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push('\n'),
                    Some(b'r') => out.push('\r'),
                    Some(b't') => out.push('\t'),
                    Some(b'b') => out.push('\u{8}'),
                    Some(b'f') => out.push('\u{c}'),
                    Some(b'v') => out.push('\u{b}'),
                    Some(b'0') => out.push('\0'),
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(other) => out.push(other as char),
                    None => {
                        self.warnings.push("truncated string escape".to_string());
                        break;
                    }
                },
                Some(b) => out.push(b as char),
            }
            if out.len() > PARSER_MAXLEN {
                self.warnings.push("string exceeded PARSER_MAXLEN, clamped".to_string());
                break;
            }
        }
        Token::Str(out)
    }
}

/// How many numeric arguments a command expects, and whether a trailing
/// string argument follows them (spec.md §4.3's `STRING_OR_NUMBER`/
/// `NUMBER_OF_COMPONENTS` sentinels, narrowed here to the concrete shapes
/// this crate's `Command` enum actually has).
enum Arity {
    Fixed(usize),
    FixedThenText(usize),
    /// A fixed prefix, then dash lengths collected greedily until the next
    /// token isn't a number (spec.md §4.3's `COLLECT_NUMBERS`).
    FixedThenVariadic(usize),
}

fn arity(op: Opcode) -> Arity {
    use Opcode::*;
    match op {
        MoveTo | RelMoveTo | LineTo | RelLineTo | Texture | Translate | Scale | ShadowOffset => {
            Arity::Fixed(2)
        }
        CurveTo | RelCurveTo => Arity::Fixed(6),
        QuadTo | RelQuadTo => Arity::Fixed(4),
        Arc => Arity::Fixed(5),
        ArcTo => Arity::Fixed(5),
        Rectangle => Arity::Fixed(4),
        RoundRectangle => Arity::Fixed(5),
        ClosePath | BeginPath | Fill | Stroke | PreservePath | Clip | Save | Restore
        | StartGroup | EndGroup | Reset | Identity => Arity::Fixed(0),
        RelLineToX4 | RelCurveToRelLineTo => Arity::Fixed(8),
        Rotate => Arity::Fixed(1),
        ApplyTransform | SetTransform => Arity::Fixed(6),
        Rgba | ShadowColor => Arity::Fixed(4),
        Gray => Arity::Fixed(2),
        Cmyka => Arity::Fixed(5),
        ColorModel => Arity::Fixed(5),
        LinearGradient => Arity::Fixed(4),
        RadialGradient => Arity::Fixed(6),
        GradientAddStop => Arity::Fixed(5),
        DefineTexture => Arity::Fixed(3),
        LineWidth | MiterLimit | LineDashOffset | GlobalAlpha | ShadowBlur | FontSize => {
            Arity::Fixed(1)
        }
        LineCap | LineJoin | CompositingMode | BlendMode | FillRule | Colorspace | Font
        | TextAlign | TextBaseline | TextDirection | ImageSmoothing => Arity::Fixed(1),
        LineDash => Arity::FixedThenVariadic(1),
        Glyph => Arity::Fixed(3),
        Text | StrokeText => Arity::FixedThenText(2),
        Data | DataRev | Nop | Flush => Arity::Fixed(0),
    }
}

fn command_from_args(op: Opcode, nums: &[f32], text: Option<String>) -> Option<Command> {
    use Command as C;
    let n = |i: usize| -> f32 { nums.get(i).copied().unwrap_or(0.0) };
    let u = |i: usize| -> u32 { n(i) as i64 as u32 };
    Some(match op {
        Opcode::MoveTo => C::MoveTo { x: n(0), y: n(1) },
        Opcode::RelMoveTo => C::RelMoveTo { dx: n(0), dy: n(1) },
        Opcode::LineTo => C::LineTo { x: n(0), y: n(1) },
        Opcode::RelLineTo => C::RelLineTo { dx: n(0), dy: n(1) },
        Opcode::Texture => C::Texture { x: n(0), y: n(1) },
        Opcode::Translate => C::Translate { dx: n(0), dy: n(1) },
        Opcode::Scale => C::Scale { sx: n(0), sy: n(1) },
        Opcode::ShadowOffset => C::ShadowOffset { dx: n(0), dy: n(1) },
        Opcode::CurveTo => C::CurveTo { x1: n(0), y1: n(1), x2: n(2), y2: n(3), x: n(4), y: n(5) },
        Opcode::RelCurveTo => {
            C::RelCurveTo { dx1: n(0), dy1: n(1), dx2: n(2), dy2: n(3), dx: n(4), dy: n(5) }
        }
        Opcode::QuadTo => C::QuadTo { cx: n(0), cy: n(1), x: n(2), y: n(3) },
        Opcode::RelQuadTo => C::RelQuadTo { dcx: n(0), dcy: n(1), dx: n(2), dy: n(3) },
        Opcode::Arc => C::Arc { x: n(0), y: n(1), radius: n(2), angle1: n(3), angle2: n(4) },
        Opcode::ArcTo => C::ArcTo { x1: n(0), y1: n(1), x2: n(2), y2: n(3), radius: n(4) },
        Opcode::Rectangle => C::Rectangle { x: n(0), y: n(1), width: n(2), height: n(3) },
        Opcode::RoundRectangle => {
            C::RoundRectangle { x: n(0), y: n(1), width: n(2), height: n(3), radius: n(4) }
        }
        Opcode::ClosePath => C::ClosePath,
        Opcode::BeginPath => C::BeginPath,
        Opcode::Fill => C::Fill,
        Opcode::Stroke => C::Stroke,
        Opcode::PreservePath => C::PreservePath,
        Opcode::Clip => C::Clip,
        Opcode::Save => C::Save,
        Opcode::Restore => C::Restore,
        Opcode::StartGroup => C::StartGroup,
        Opcode::EndGroup => C::EndGroup,
        Opcode::Reset => C::Reset,
        Opcode::Identity => C::Identity,
        Opcode::RelLineToX4 => {
            let mut deltas = [0i8; 8];
            for (i, d) in deltas.iter_mut().enumerate() {
                *d = n(i) as i8;
            }
            C::RelLineToX4 { deltas }
        }
        Opcode::RelCurveToRelLineTo => {
            let mut deltas = [0i8; 8];
            for (i, d) in deltas.iter_mut().enumerate() {
                *d = n(i) as i8;
            }
            C::RelCurveToRelLineTo { deltas }
        }
        Opcode::Rotate => C::Rotate { angle: n(0) },
        Opcode::ApplyTransform => {
            C::ApplyTransform { m: [n(0), n(1), n(2), n(3), n(4), n(5)] }
        }
        Opcode::SetTransform => C::SetTransform { m: [n(0), n(1), n(2), n(3), n(4), n(5)] },
        Opcode::Rgba => C::Rgba { r: n(0), g: n(1), b: n(2), a: n(3) },
        Opcode::ShadowColor => C::ShadowColor { r: n(0), g: n(1), b: n(2), a: n(3) },
        Opcode::Gray => C::Gray { g: n(0), a: n(1) },
        Opcode::Cmyka => C::Cmyka { c: n(0), m: n(1), y: n(2), k: n(3), a: n(4) },
        Opcode::ColorModel => {
            C::ColorModel { model: n(0), c0: n(1), c1: n(2), c2: n(3), c3: n(4) }
        }
        Opcode::LinearGradient => C::LinearGradient { x0: n(0), y0: n(1), x1: n(2), y1: n(3) },
        Opcode::RadialGradient => {
            C::RadialGradient { x0: n(0), y0: n(1), r0: n(2), x1: n(3), y1: n(4), r1: n(5) }
        }
        Opcode::GradientAddStop => {
            C::GradientAddStop { pos: n(0), r: n(1), g: n(2), b: n(3), a: n(4) }
        }
        Opcode::DefineTexture => C::DefineTexture { width: u(0), height: u(1), format: u(2) },
        Opcode::LineWidth => C::LineWidth(n(0)),
        Opcode::MiterLimit => C::MiterLimit(n(0)),
        Opcode::LineDashOffset => C::LineDashOffset(n(0)),
        Opcode::GlobalAlpha => C::GlobalAlpha(n(0)),
        Opcode::ShadowBlur => C::ShadowBlur(n(0)),
        Opcode::FontSize => C::FontSize(n(0)),
        Opcode::LineCap => C::LineCap(u(0)),
        Opcode::LineJoin => C::LineJoin(u(0)),
        Opcode::CompositingMode => C::CompositingMode(u(0)),
        Opcode::BlendMode => C::BlendMode(u(0)),
        Opcode::FillRule => C::FillRule(u(0)),
        Opcode::Colorspace => C::Colorspace(u(0)),
        Opcode::Font => C::Font(u(0)),
        Opcode::TextAlign => C::TextAlign(u(0)),
        Opcode::TextBaseline => C::TextBaseline(u(0)),
        Opcode::TextDirection => C::TextDirection(u(0)),
        Opcode::ImageSmoothing => C::ImageSmoothing(n(0) != 0.0),
        Opcode::LineDash => {
            let offset = n(0);
            let lengths: SmallVec<[f32; 8]> = nums[1.min(nums.len())..].iter().copied().collect();
            C::LineDash { offset, lengths }
        }
        Opcode::Glyph => C::Glyph { index: u(0), x: n(1), y: n(2) },
        Opcode::Text => C::Text { x: n(0), y: n(1) },
        Opcode::StrokeText => C::StrokeText { x: n(0), y: n(1) },
        Opcode::Data | Opcode::DataRev | Opcode::Nop | Opcode::Flush => return None,
    })
}

/// Parses a full textual draw program (either long or short form — the two
/// differ only in punctuation, which the tokenizer treats as whitespace).
/// Unknown words are warned-and-skipped; commands with too few arguments at
/// end-of-input are dropped (spec.md §4.3, §7).
pub fn parse(text: &str, ctx: ParserContext) -> (Vec<Instruction>, Vec<String>) {
    let mut lexer = Lexer::new(text, ctx);
    let mut out = Vec::new();
    loop {
        let word = match lexer.next_token() {
            Some(Token::Word(w)) => w,
            Some(_) => {
                lexer.warnings.push("expected a command word".to_string());
                continue;
            }
            None => break,
        };
        let Some(op) = opcode_from_word(&word) else {
            lexer.warnings.push(format!("unknown word {word:?}"));
            continue;
        };
        let want = arity(op);
        let mut nums: Vec<f32> = Vec::new();
        let mut text_arg: Option<String> = None;
        match want {
            Arity::Fixed(n) => {
                for _ in 0..n {
                    match lexer.next_token() {
                        Some(Token::Number(v)) => nums.push(v),
                        Some(Token::Str(_)) | Some(Token::Word(_)) | None => {
                            lexer.warnings.push(format!("truncated arguments for {word:?}"));
                            break;
                        }
                    }
                }
            }
            Arity::FixedThenText(n) => {
                for _ in 0..n {
                    match lexer.next_token() {
                        Some(Token::Number(v)) => nums.push(v),
                        _ => {
                            lexer.warnings.push(format!("truncated arguments for {word:?}"));
                            break;
                        }
                    }
                }
                text_arg = match lexer.next_token() {
                    Some(Token::Str(s)) => Some(s),
                    _ => None,
                };
            }
            Arity::FixedThenVariadic(n) => {
                for _ in 0..n {
                    match lexer.next_token() {
                        Some(Token::Number(v)) => nums.push(v),
                        _ => {
                            lexer.warnings.push(format!("truncated arguments for {word:?}"));
                            break;
                        }
                    }
                }
                loop {
                    let save = lexer.pos;
                    match lexer.next_token() {
                        Some(Token::Number(v)) => nums.push(v),
                        _ => {
                            lexer.pos = save;
                            break;
                        }
                    }
                }
            }
        }
        if let Some(cmd) = command_from_args(op, &nums, text_arg.clone()) {
            out.push(if let Some(t) = text_arg {
                Instruction::with_text(cmd, t)
            } else {
                Instruction::new(cmd)
            });
        }
    }
    (out, lexer.warnings)
}

pub fn parse_long(text: &str) -> (Vec<Instruction>, Vec<String>) {
    parse(text, ParserContext::default())
}

pub fn parse_short(text: &str) -> (Vec<Instruction>, Vec<String>) {
    parse(text, ParserContext::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_form_path_and_fill() {
        let (instrs, warnings) = parse_short("M 1 2 L 3 4 F");
        assert!(warnings.is_empty());
        assert_eq!(
            instrs,
            vec![
                Instruction::new(Command::MoveTo { x: 1.0, y: 2.0 }),
                Instruction::new(Command::LineTo { x: 3.0, y: 4.0 }),
                Instruction::new(Command::Fill),
            ]
        );
    }

    #[test]
    fn parses_long_form_parenthesized_rectangle() {
        let (instrs, warnings) = parse_long("rectangle(0, 0, 5, 5)\nfill\n");
        assert!(warnings.is_empty());
        assert_eq!(
            instrs,
            vec![
                Instruction::new(Command::Rectangle { x: 0.0, y: 0.0, width: 5.0, height: 5.0 }),
                Instruction::new(Command::Fill),
            ]
        );
    }

    #[test]
    fn unknown_word_is_warned_and_skipped() {
        let (instrs, warnings) = parse_long("bogus_command(1, 2)\nfill\n");
        assert_eq!(instrs, vec![Instruction::new(Command::Fill)]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn text_command_captures_trailing_string() {
        let (instrs, warnings) = parse_long("text(0, 0, \"hello\\n\")\n");
        assert!(warnings.is_empty());
        assert_eq!(instrs, vec![Instruction::with_text(Command::Text { x: 0.0, y: 0.0 }, "hello\n")]);
    }

    #[test]
    fn line_dash_collects_variadic_tail() {
        let (instrs, warnings) = parse_long("line_dash(1, 2, 3, 4)\n");
        assert!(warnings.is_empty());
        match &instrs[0].command {
            Command::LineDash { offset, lengths } => {
                assert_eq!(*offset, 1.0);
                assert_eq!(lengths.as_slice(), &[2.0, 3.0, 4.0]);
            }
            other => panic!("expected LineDash, got {other:?}"),
        }
    }

    #[test]
    fn numeric_suffix_scales_by_cell_size() {
        let ctx = ParserContext { cell_size: 10.0, ..ParserContext::default() };
        let (instrs, _) = parse("line_width(2@)\n", ctx);
        assert_eq!(instrs, vec![Instruction::new(Command::LineWidth(20.0))]);
    }

    #[test]
    fn round_trips_through_long_formatter() {
        use crate::formatter::format_long;
        let original = vec![
            Instruction::new(Command::Save),
            Instruction::new(Command::Rgba { r: 1.0, g: 0.0, b: 0.0, a: 1.0 }),
            Instruction::new(Command::Rectangle { x: 10.0, y: 10.0, width: 5.0, height: 5.0 }),
            Instruction::new(Command::Fill),
            Instruction::new(Command::Restore),
        ];
        let text = format_long(&original);
        let (parsed, warnings) = parse_long(&text);
        assert!(warnings.is_empty());
        assert_eq!(parsed, original);
    }

    #[test]
    fn round_trips_through_short_formatter() {
        use crate::formatter::format_short;
        let original = vec![
            Instruction::new(Command::MoveTo { x: 1.0, y: 2.0 }),
            Instruction::new(Command::LineTo { x: 3.0, y: 4.0 }),
            Instruction::new(Command::Fill),
        ];
        let text = format_short(&original);
        let (parsed, warnings) = parse_short(&text);
        assert!(warnings.is_empty());
        assert_eq!(parsed, original);
    }
}
