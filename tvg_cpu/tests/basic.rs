// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fills, strokes and gradients drawn onto the main target.

use crate::util::{
    assert_close, draw, get_renderer, pixel, prepare, prepare_with, square, square_path, BLACK,
    BLUE, GREEN, RED,
};
use tvg_common::math::{Matrix, Point};
use tvg_common::path::RenderPath;
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderUpdateFlag};
use tvg_common::shape::{
    ColorStop, Fill, FillRule, RenderColor, RenderShape, RenderStroke, StrokeCap,
};

#[test]
fn solid_red_square() {
    let mut renderer = get_renderer(200, 200);
    let mut path = RenderPath::new();
    path.move_to(Point::new(10.0, 10.0));
    path.line_to(Point::new(110.0, 10.0));
    path.line_to(Point::new(110.0, 110.0));
    path.line_to(Point::new(10.0, 110.0));
    path.close();

    let id = prepare(&mut renderer, &RenderShape::new(path, RED));
    draw(&mut renderer, &[id]);

    for y in 0..200 {
        for x in 0..200 {
            let inside = (10..110).contains(&x) && (10..110).contains(&y);
            let expected = if inside { 0xff00_00ff } else { 0 };
            assert_eq!(pixel(&renderer, x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn linear_gradient_square() {
    let mut renderer = get_renderer(200, 200);
    let mut shape = square(10.0, 10.0, 100.0, RenderColor::default());
    shape.fill = Some(Fill::linear(
        Point::new(10.0, 10.0),
        Point::new(110.0, 110.0),
        vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, BLUE)],
    ));
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    assert_close(pixel(&renderer, 10, 10), 0xff00_00ff, 4);
    assert_close(pixel(&renderer, 109, 109), 0xffff_0000, 4);
    // Halfway along the diagonal red and blue are mixed evenly.
    assert_close(pixel(&renderer, 60, 60), 0xff80_0080, 4);
    assert_eq!(pixel(&renderer, 110, 110), 0);
}

#[test]
fn radial_gradient_is_symmetric() {
    let mut renderer = get_renderer(100, 100);
    let mut shape = square(0.0, 0.0, 100.0, RenderColor::default());
    shape.fill = Some(Fill::radial(
        Point::new(50.0, 50.0),
        50.0,
        vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, BLUE)],
    ));
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    assert_close(pixel(&renderer, 50, 50), 0xff00_00ff, 4);
    assert_eq!(pixel(&renderer, 20, 49), pixel(&renderer, 79, 49));
    assert_eq!(pixel(&renderer, 49, 20), pixel(&renderer, 49, 79));
    assert_eq!(pixel(&renderer, 0, 0), 0xffff_0000);
}

#[test]
fn round_caps_extend_open_line() {
    let mut renderer = get_renderer(200, 100);
    let mut path = RenderPath::new();
    path.move_to(Point::new(10.0, 50.0));
    path.line_to(Point::new(110.0, 50.0));

    let mut stroke = RenderStroke::new(20.0, GREEN);
    stroke.cap = StrokeCap::Round;
    let mut shape = RenderShape::new(path, RenderColor::default());
    shape.stroke = Some(stroke);

    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    // The stroker works on fixed-point angles, so the edges may leak a few levels.
    let green = 0xff00_ff00;
    for x in [10, 60, 109] {
        assert_close(pixel(&renderer, x, 40), green, 8);
        assert_close(pixel(&renderer, x, 59), green, 8);
        assert!(pixel(&renderer, x, 39) >> 24 < 8);
        assert!(pixel(&renderer, x, 60) >> 24 < 8);
    }
    // Semicircles of radius 10 around both ends.
    assert_eq!(pixel(&renderer, 3, 50), green);
    assert_eq!(pixel(&renderer, 116, 50), green);
    assert_eq!(pixel(&renderer, 1, 41), 0);
    assert_eq!(pixel(&renderer, 118, 41), 0);
    assert_eq!(pixel(&renderer, 121, 50), 0);

    let region = renderer.region(id);
    assert!(region.min.0 <= 1 && region.max.0 >= 119);
    assert!(region.min.1 <= 40 && region.max.1 >= 60);
}

#[test]
fn butt_caps_end_at_the_points() {
    let mut renderer = get_renderer(200, 100);
    let mut path = RenderPath::new();
    path.move_to(Point::new(10.0, 50.0));
    path.line_to(Point::new(110.0, 50.0));

    let mut stroke = RenderStroke::new(20.0, GREEN);
    stroke.cap = StrokeCap::Butt;
    let mut shape = RenderShape::new(path, RenderColor::default());
    shape.stroke = Some(stroke);

    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    assert_close(pixel(&renderer, 10, 50), 0xff00_ff00, 8);
    assert_eq!(pixel(&renderer, 5, 50), 0);
    assert_eq!(pixel(&renderer, 112, 50), 0);
}

#[test]
fn even_odd_leaves_a_hole() {
    let mut renderer = get_renderer(120, 120);
    let mut path = square_path(0.0, 0.0, 100.0);
    path.add_rect(25.0, 25.0, 50.0, 50.0);

    let mut shape = RenderShape::new(path, BLACK);
    shape.rule = FillRule::EvenOdd;
    let even_odd = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[even_odd]);

    let black = 0xff00_0000;
    assert_eq!(pixel(&renderer, 10, 10), black);
    assert_eq!(pixel(&renderer, 24, 50), black);
    assert_eq!(pixel(&renderer, 80, 80), black);
    assert_eq!(pixel(&renderer, 25, 50), 0);
    assert_eq!(pixel(&renderer, 50, 50), 0);
    assert_eq!(pixel(&renderer, 74, 74), 0);
    assert_eq!(pixel(&renderer, 110, 110), 0);
}

#[test]
fn non_zero_fills_the_hole() {
    let mut renderer = get_renderer(120, 120);
    let mut path = square_path(0.0, 0.0, 100.0);
    path.add_rect(25.0, 25.0, 50.0, 50.0);

    let id = prepare(&mut renderer, &RenderShape::new(path, BLACK));
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 50, 50), 0xff00_0000);
}

#[test]
fn opacity_scales_color() {
    let mut renderer = get_renderer(20, 20);
    let id = prepare_with(
        &mut renderer,
        &square(0.0, 0.0, 10.0, RED),
        &[],
        128,
        false,
    );
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 5, 5), 0x8000_0080);
    assert_eq!(pixel(&renderer, 15, 15), 0);
}

#[test]
fn later_shapes_draw_on_top() {
    let mut renderer = get_renderer(40, 40);
    let below = prepare(&mut renderer, &square(0.0, 0.0, 20.0, RED));
    let above = prepare(&mut renderer, &square(10.0, 10.0, 20.0, BLUE));
    draw(&mut renderer, &[below, above]);

    assert_eq!(pixel(&renderer, 5, 5), 0xff00_00ff);
    assert_eq!(pixel(&renderer, 15, 15), 0xffff_0000);
    assert_eq!(pixel(&renderer, 25, 25), 0xffff_0000);
}

#[test]
fn stroke_first_draws_below_fill() {
    let mut renderer = get_renderer(60, 60);
    let mut shape = square(10.0, 10.0, 40.0, RED);
    let mut stroke = RenderStroke::new(10.0, BLUE);
    stroke.stroke_first = true;
    shape.stroke = Some(stroke);

    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    // The inner half of the stroke is covered by the fill.
    assert_eq!(pixel(&renderer, 12, 30), 0xff00_00ff);
    assert_eq!(pixel(&renderer, 7, 30), 0xffff_0000);
}

#[test]
fn transformed_shapes_move() {
    let mut renderer = get_renderer(100, 100);
    let id = renderer
        .prepare_shape(
            &square(0.0, 0.0, 10.0, RED),
            None,
            &(Matrix::translate(50.0, 40.0) * Matrix::scale(2.0, 2.0)),
            &[],
            255,
            RenderUpdateFlag::ALL,
            false,
        )
        .unwrap();
    draw(&mut renderer, &[id]);

    assert_eq!(renderer.region(id).min, (50, 40));
    assert_eq!(renderer.region(id).max, (70, 60));
    assert_eq!(pixel(&renderer, 69, 59), 0xff00_00ff);
    assert_eq!(pixel(&renderer, 49, 45), 0);
}

#[test]
fn color_updates_keep_geometry() {
    let mut renderer = get_renderer(30, 30);
    let mut shape = square(5.0, 5.0, 10.0, RED);
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    shape.color = BLUE;
    let same = renderer
        .prepare_shape(
            &shape,
            Some(id),
            &Matrix::IDENTITY,
            &[],
            255,
            RenderUpdateFlag::COLOR,
            false,
        )
        .unwrap();
    assert_eq!(same, id);
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 10, 10), 0xffff_0000);
    assert_eq!(renderer.region(id).min, (5, 5));
}

#[test]
fn hit_testing_follows_coverage() {
    let mut renderer = get_renderer(100, 100);
    let mut path = RenderPath::new();
    path.add_circle(50.0, 50.0, 20.0, 20.0);
    let id = prepare(&mut renderer, &RenderShape::new(path, RED));
    renderer.sync();

    assert!(renderer.intersects_shape(id, &RenderRegion::new(45, 45, 55, 55)));
    // Inside the bounding box but outside the circle.
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(30, 30, 33, 33)));
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(80, 80, 90, 90)));

    renderer.dispose(id);
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(45, 45, 55, 55)));
}

#[test]
fn unchanged_shapes_keep_their_data() {
    let mut renderer = get_renderer(30, 30);
    let shape = square(5.0, 5.0, 10.0, RED);
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    // Nothing changed, so the prepared coverage is kept as is.
    let same = renderer
        .prepare_shape(
            &square(20.0, 20.0, 5.0, BLUE),
            Some(id),
            &Matrix::IDENTITY,
            &[],
            255,
            RenderUpdateFlag::NONE,
            false,
        )
        .unwrap();
    assert_eq!(same, id);
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 10, 10), 0xff00_00ff);
    assert_eq!(pixel(&renderer, 22, 22), 0);
    assert_eq!(renderer.region(id).min, (5, 5));
}
