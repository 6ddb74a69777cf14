use vecdraw::context::PaintTarget;
use vecdraw::formatter::{format_long, format_short};
use vecdraw::parser::{parse_long, parse_short};
use vecdraw::pixelformat::PixelFormat;
use vecdraw::Context;

#[test]
fn filling_a_rectangle_paints_opaque_pixels_inside_and_leaves_the_border_clear() {
    let mut ctx = Context::new(32, 32, PixelFormat::Rgba8).unwrap();
    ctx.rgba(PaintTarget::Fill, 1.0, 0.0, 0.0, 1.0);
    ctx.begin_path();
    ctx.rectangle(4.0, 4.0, 24.0, 24.0);
    ctx.fill();
    ctx.flush_frame();

    let buf = ctx.buffer();
    let stride = ctx.width() as usize * 4;
    let center = 16 * stride + 16 * 4;
    assert_eq!(buf[center + 3], 255, "center pixel should be fully covered");
    assert_eq!(buf[center], 255);
    assert_eq!(buf[center + 2], 0);

    let corner = 0 * stride + 0 * 4;
    assert_eq!(buf[corner + 3], 0, "corner outside the rect should stay transparent");
}

#[test]
fn stroking_a_line_leaves_the_interior_of_the_loop_untouched() {
    let mut ctx = Context::new(20, 20, PixelFormat::Rgba8).unwrap();
    ctx.rgba(PaintTarget::Stroke, 0.0, 0.0, 1.0, 1.0);
    ctx.line_width(2.0);
    ctx.begin_path();
    ctx.rectangle(2.0, 2.0, 16.0, 16.0);
    ctx.stroke();
    ctx.flush_frame();

    let buf = ctx.buffer();
    let stride = ctx.width() as usize * 4;
    let center = 10 * stride + 10 * 4;
    assert_eq!(buf[center + 3], 0, "interior of a stroked-only rect should remain transparent");
}

#[test]
fn save_restore_reverts_paint_state_but_not_the_accumulated_path() {
    let mut ctx = Context::new(8, 8, PixelFormat::Rgba8).unwrap();
    ctx.rgba(PaintTarget::Fill, 1.0, 1.0, 1.0, 1.0);
    ctx.save();
    ctx.rgba(PaintTarget::Fill, 0.0, 1.0, 0.0, 1.0);
    ctx.restore();
    ctx.begin_path();
    ctx.rectangle(0.0, 0.0, 8.0, 8.0);
    ctx.fill();
    ctx.flush_frame();

    let buf = ctx.buffer();
    assert_eq!(buf[0], 255, "fill color should have reverted to white after restore");
    assert_eq!(buf[1], 255);
}

#[test]
fn linear_gradient_interpolates_between_its_stops() {
    let mut ctx = Context::new(40, 4, PixelFormat::Rgba8).unwrap();
    ctx.linear_gradient(PaintTarget::Fill, 0.0, 0.0, 40.0, 0.0);
    ctx.gradient_add_stop(0.0, 1.0, 0.0, 0.0, 1.0);
    ctx.gradient_add_stop(1.0, 0.0, 0.0, 1.0, 1.0);
    ctx.begin_path();
    ctx.rectangle(0.0, 0.0, 40.0, 4.0);
    ctx.fill();
    ctx.flush_frame();

    let buf = ctx.buffer();
    let stride = ctx.width() as usize * 4;
    let left = 2 * stride + 2 * 4;
    let right = 2 * stride + 37 * 4;
    assert!(buf[left] > buf[right], "left edge should lean red, right edge blue");
    assert!(buf[right + 2] > buf[left + 2]);
}

#[test]
fn defining_and_painting_a_texture_samples_its_pixels() {
    let mut ctx = Context::new(8, 8, PixelFormat::Rgba8).unwrap();
    let data = vec![0u8, 255, 0, 255].repeat(4 * 4);
    let tex = ctx.define_texture(4, 4, PixelFormat::Rgba8, data);
    ctx.texture(PaintTarget::Fill, 0.0, 0.0);
    let _ = tex;
    ctx.begin_path();
    ctx.rectangle(0.0, 0.0, 4.0, 4.0);
    ctx.fill();
    ctx.flush_frame();

    let buf = ctx.buffer();
    assert_eq!(buf[1], 255, "sampled green channel should come through");
}

#[test]
fn draw_list_short_and_long_formats_round_trip_through_the_parser() {
    let mut ctx = Context::new(10, 10, PixelFormat::Rgba8).unwrap();
    ctx.begin_path();
    ctx.move_to(1.0, 1.0);
    ctx.line_to(9.0, 1.0);
    ctx.line_to(9.0, 9.0);
    ctx.close_path();
    ctx.fill();

    let instrs: Vec<_> = ctx
        .draw_list()
        .iter(true)
        .map(|(_, cmd)| vecdraw::Instruction::new(cmd))
        .collect();

    let short_text = format_short(&instrs);
    let (reparsed_short, warnings_short) = parse_short(&short_text);
    assert!(warnings_short.is_empty());
    assert_eq!(reparsed_short.len(), instrs.len());

    let long_text = format_long(&instrs);
    let (reparsed_long, warnings_long) = parse_long(&long_text);
    assert!(warnings_long.is_empty());
    assert_eq!(reparsed_long.len(), instrs.len());
}
