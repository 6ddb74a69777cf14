//! Renders a draw list to text in two modes: *short* (single-letter
//! opcodes, whitespace separators, minimum precision) and *long* (named
//! commands, parenthesized argument lists, indentation tracking
//! save/restore), per spec.md §4.2.
//!
//! Grounded in `serialize.rs`'s serializer-as-free-function style: this
//! module exposes plain functions over a slice of [`Instruction`] rather
//! than a stateful writer object, matching how the teacher turns a document
//! model into bytes.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, string::ToString, vec, vec::Vec};

use crate::entry::Command;
use crate::instruction::Instruction;
use crate::opcode::{long_name, short_token};

/// Numbers print with up to three fractional digits, trailing zeros
/// trimmed (spec.md §4.2).
fn fmt_num(v: f32) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{v:.3}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

fn fmt_u32(v: u32) -> String {
    v.to_string()
}

fn fmt_bool(v: bool) -> String {
    if v { "1".to_string() } else { "0".to_string() }
}

/// Backslash-escapes a string per spec.md §4.2's `\n\r\t\b\f\v\0\"\\` set.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\0' => out.push_str("\\0"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

/// Flattens a command's fields into its textual argument list, in the same
/// order `parser::command_from_args` expects them back.  `None`/empty means
/// "no numeric/string arguments" (the zero-arity ops: `fill`, `save`,
/// `close_path`, ...).
fn args_of(cmd: &Command) -> Vec<String> {
    use Command::*;
    match *cmd {
        MoveTo { x, y } | LineTo { x, y } | Texture { x, y } | Text { x, y }
        | StrokeText { x, y } => vec![fmt_num(x), fmt_num(y)],
        RelMoveTo { dx, dy } | RelLineTo { dx, dy } | Translate { dx, dy }
        | ShadowOffset { dx, dy } => vec![fmt_num(dx), fmt_num(dy)],
        CurveTo { x1, y1, x2, y2, x, y } => {
            vec![fmt_num(x1), fmt_num(y1), fmt_num(x2), fmt_num(y2), fmt_num(x), fmt_num(y)]
        }
        RelCurveTo { dx1, dy1, dx2, dy2, dx, dy } => {
            vec![fmt_num(dx1), fmt_num(dy1), fmt_num(dx2), fmt_num(dy2), fmt_num(dx), fmt_num(dy)]
        }
        QuadTo { cx, cy, x, y } => vec![fmt_num(cx), fmt_num(cy), fmt_num(x), fmt_num(y)],
        RelQuadTo { dcx, dcy, dx, dy } => {
            vec![fmt_num(dcx), fmt_num(dcy), fmt_num(dx), fmt_num(dy)]
        }
        Arc { x, y, radius, angle1, angle2 } => {
            vec![fmt_num(x), fmt_num(y), fmt_num(radius), fmt_num(angle1), fmt_num(angle2)]
        }
        ArcTo { x1, y1, x2, y2, radius } => {
            vec![fmt_num(x1), fmt_num(y1), fmt_num(x2), fmt_num(y2), fmt_num(radius)]
        }
        Rectangle { x, y, width, height } => {
            vec![fmt_num(x), fmt_num(y), fmt_num(width), fmt_num(height)]
        }
        RoundRectangle { x, y, width, height, radius } => {
            vec![fmt_num(x), fmt_num(y), fmt_num(width), fmt_num(height), fmt_num(radius)]
        }
        ClosePath | BeginPath | Fill | Stroke | PreservePath | Clip | Save | Restore
        | StartGroup | EndGroup | Reset | Identity => vec![],
        RelLineToX4 { deltas } | RelCurveToRelLineTo { deltas } => {
            deltas.iter().map(|d| d.to_string()).collect()
        }
        Scale { sx, sy } => vec![fmt_num(sx), fmt_num(sy)],
        Rotate { angle } => vec![fmt_num(angle)],
        ApplyTransform { m } | SetTransform { m } => m.iter().map(|v| fmt_num(*v)).collect(),
        Rgba { r, g, b, a } | ShadowColor { r, g, b, a } => {
            vec![fmt_num(r), fmt_num(g), fmt_num(b), fmt_num(a)]
        }
        Gray { g, a } => vec![fmt_num(g), fmt_num(a)],
        Cmyka { c, m, y, k, a } => vec![fmt_num(c), fmt_num(m), fmt_num(y), fmt_num(k), fmt_num(a)],
        ColorModel { model, c0, c1, c2, c3 } => {
            vec![fmt_num(model), fmt_num(c0), fmt_num(c1), fmt_num(c2), fmt_num(c3)]
        }
        LinearGradient { x0, y0, x1, y1 } => {
            vec![fmt_num(x0), fmt_num(y0), fmt_num(x1), fmt_num(y1)]
        }
        RadialGradient { x0, y0, r0, x1, y1, r1 } => {
            vec![fmt_num(x0), fmt_num(y0), fmt_num(r0), fmt_num(x1), fmt_num(y1), fmt_num(r1)]
        }
        GradientAddStop { pos, r, g, b, a } => {
            vec![fmt_num(pos), fmt_num(r), fmt_num(g), fmt_num(b), fmt_num(a)]
        }
        DefineTexture { width, height, format } => {
            vec![fmt_u32(width), fmt_u32(height), fmt_u32(format)]
        }
        LineWidth(v) | MiterLimit(v) | LineDashOffset(v) | GlobalAlpha(v) | ShadowBlur(v)
        | FontSize(v) => vec![fmt_num(v)],
        LineCap(v) | LineJoin(v) | CompositingMode(v) | BlendMode(v) | FillRule(v)
        | Colorspace(v) | Font(v) | TextAlign(v) | TextBaseline(v) | TextDirection(v) => {
            vec![fmt_u32(v)]
        }
        ImageSmoothing(b) => vec![fmt_bool(b)],
        LineDash { offset, ref lengths } => {
            let mut out = vec![fmt_num(offset)];
            out.extend(lengths.iter().map(|v| fmt_num(*v)));
            out
        }
        Glyph { index, x, y } => vec![fmt_u32(index), fmt_num(x), fmt_num(y)],
    }
}

fn format_one(instr: &Instruction, short: bool, depth: usize) -> String {
    let op = instr.command.opcode();
    let word = if short { short_token(op) } else { long_name(op) };
    let mut args = args_of(&instr.command);
    if let Some(text) = &instr.text {
        args.push(format!("\"{}\"", escape_string(text)));
    }
    let indent = if short { String::new() } else { "  ".repeat(depth) };
    if args.is_empty() {
        format!("{indent}{word}")
    } else if short {
        format!("{indent}{word} {}", args.join(" "))
    } else {
        format!("{indent}{word}({})", args.join(", "))
    }
}

/// Long form: named commands, parenthesized argument lists, one command per
/// line, indentation tracking `save`/`restore` depth.
pub fn format_long(instrs: &[Instruction]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for instr in instrs {
        if matches!(instr.command, Command::Restore) {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&format_one(instr, false, depth));
        out.push('\n');
        if matches!(instr.command, Command::Save) {
            depth += 1;
        }
    }
    out
}

/// Short form: single-letter opcodes where one exists, whitespace
/// separators, no indentation.
pub fn format_short(instrs: &[Instruction]) -> String {
    let mut out = String::new();
    for (i, instr) in instrs.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format_one(instr, true, 0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_zeros() {
        assert_eq!(fmt_num(1.5), "1.5");
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(0.10), "0.1");
        assert_eq!(fmt_num(-0.0), "0");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_string("a\nb\"c"), "a\\nb\\\"c");
    }

    #[test]
    fn long_form_tracks_save_restore_indent() {
        let instrs = vec![
            Instruction::new(Command::Save),
            Instruction::new(Command::Fill),
            Instruction::new(Command::Restore),
        ];
        let text = format_long(&instrs);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "save");
        assert_eq!(lines[1], "  fill");
        assert_eq!(lines[2], "restore");
    }

    #[test]
    fn short_form_uses_single_letter_tokens() {
        let instrs = vec![
            Instruction::new(Command::MoveTo { x: 1.0, y: 2.0 }),
            Instruction::new(Command::LineTo { x: 3.0, y: 4.0 }),
            Instruction::new(Command::Fill),
        ];
        assert_eq!(format_short(&instrs), "M 1 2 L 3 4 F");
    }

    #[test]
    fn long_form_parenthesizes_arguments() {
        let instrs = vec![Instruction::new(Command::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        })];
        assert_eq!(format_long(&instrs), "rectangle(0, 0, 5, 5)\n");
    }

    #[test]
    fn text_payload_is_escaped_and_quoted() {
        let instrs = vec![Instruction::with_text(Command::Text { x: 0.0, y: 0.0 }, "hello\n")];
        assert_eq!(format_long(&instrs), "text(0, 0, \"hello\\n\")\n");
    }
}
