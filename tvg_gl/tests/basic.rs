// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fills, strokes and blending drawn onto the main target.

use crate::util::{
    blits, draw, get_renderer, get_renderer_with, has_call, prepare, prepare_with, square,
    Renderer, GREEN, HOST_FBO, RED,
};
use tvg_common::blend::BlendMethod;
use tvg_common::math::{Matrix, Point};
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderUpdateFlag};
use tvg_common::shape::{ColorStop, Fill, RenderColor, RenderStroke};
use tvg_gl::gl::{self, GlCall};
use tvg_gl::GlConfig;

#[test]
fn solid_square_is_one_draw() {
    let mut renderer = get_renderer(64, 64);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    draw(&mut renderer, &[id]);

    assert_eq!(renderer.gl().draws(), 1);
    // Resolve of the frame target, then the copy into the host framebuffer.
    assert_eq!(blits(&renderer), 2);
    assert!(has_call(
        &renderer,
        &GlCall::BindFramebuffer(gl::DRAW_FRAMEBUFFER, HOST_FBO)
    ));
}

fn indices_drawn(renderer: &Renderer) -> Vec<i32> {
    renderer
        .gl()
        .calls
        .iter()
        .filter_map(|call| match call {
            GlCall::DrawElements { count, .. } => Some(*count),
            _ => None,
        })
        .collect()
}

#[test]
fn consecutive_solid_fills_share_one_draw() {
    let mut renderer = get_renderer(64, 64);
    let colors = [RED, GREEN, RED, GREEN];
    let ids: Vec<_> = colors
        .iter()
        .enumerate()
        .map(|(i, color)| prepare(&mut renderer, &square(i as f32 * 12.0, 4.0, 10.0, *color)))
        .collect();

    draw(&mut renderer, &ids[..1]);
    let single = indices_drawn(&renderer);
    assert_eq!(single.len(), 1);

    draw(&mut renderer, &ids);
    assert_eq!(indices_drawn(&renderer), [single[0] * 4]);
    // Position then color, interleaved.
    let colors = renderer.gl().count(|call| {
        matches!(
            call,
            GlCall::VertexAttribPointer {
                index: 1,
                size: 4,
                stride: 24,
                ..
            }
        )
    });
    assert_eq!(colors, 1);
    assert!(has_call(&renderer, &GlCall::DepthMask(false)));
}

#[test]
fn stroke_splits_the_solid_batch() {
    let mut renderer = get_renderer(64, 64);
    let first = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    let mut stroked = square(20.0, 0.0, 10.0, GREEN);
    stroked.stroke = Some(RenderStroke::new(2.0, RED));
    let stroked = prepare(&mut renderer, &stroked);
    let last = prepare(&mut renderer, &square(40.0, 0.0, 10.0, GREEN));
    draw(&mut renderer, &[first, stroked, last]);

    // Both leading fills, stencil and cover of the stroke, then the last fill.
    assert_eq!(renderer.gl().draws(), 4);
}

#[test]
fn blending_keeps_solid_fills_apart() {
    let mut renderer = get_renderer(64, 64);
    let a = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    let b = prepare(&mut renderer, &square(20.0, 0.0, 10.0, GREEN));
    assert!(renderer.blend(BlendMethod::Add));
    draw(&mut renderer, &[a, b]);
    assert_eq!(renderer.gl().draws(), 2);
}

#[test]
fn transparent_shape_is_skipped() {
    let mut renderer = get_renderer(64, 64);
    let id = prepare_with(&mut renderer, &square(10.0, 10.0, 20.0, RED), &[], 0, false);
    draw(&mut renderer, &[id]);
    assert_eq!(renderer.gl().draws(), 0);
    assert_eq!(renderer.region(id), RenderRegion::default());
}

#[test]
fn stroke_is_stenciled_then_covered() {
    let mut renderer = get_renderer(64, 64);
    let mut shape = square(10.0, 10.0, 20.0, RED);
    shape.stroke = Some(RenderStroke::new(4.0, GREEN));
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);
    assert_eq!(renderer.gl().draws(), 3);
}

#[test]
fn stroke_only_shape_skips_the_fill() {
    let mut renderer = get_renderer(64, 64);
    let mut shape = square(10.0, 10.0, 20.0, RenderColor::new(0, 0, 0, 0));
    shape.stroke = Some(RenderStroke::new(4.0, GREEN));
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);
    assert_eq!(renderer.gl().draws(), 2);
}

#[test]
fn gradient_binds_its_block() {
    let mut renderer = get_renderer(64, 64);
    let mut shape = square(0.0, 0.0, 64.0, RED);
    shape.fill = Some(Fill::linear(
        Point::new(0.0, 0.0),
        Point::new(64.0, 0.0),
        vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, GREEN)],
    ));
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    assert_eq!(renderer.gl().draws(), 1);
    let gradient_blocks = renderer
        .gl()
        .count(|call| matches!(call, GlCall::BindBufferRange { size: 368, .. }));
    assert_eq!(gradient_blocks, 1);
}

#[test]
fn viewport_limits_the_scissor() {
    let mut renderer = get_renderer(64, 64);
    assert!(renderer.set_viewport(RenderRegion::new(0, 0, 16, 16)));
    let id = prepare(&mut renderer, &square(0.0, 0.0, 64.0, RED));
    draw(&mut renderer, &[id]);
    // GL counts rows from the bottom.
    assert!(has_call(&renderer, &GlCall::Scissor([0, 48, 16, 16])));
}

#[test]
fn complex_blend_copies_the_destination() {
    let mut renderer = get_renderer(64, 64);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    assert!(renderer.blend(BlendMethod::Multiply));
    draw(&mut renderer, &[id]);
    assert_eq!(renderer.gl().draws(), 1);
    assert_eq!(blits(&renderer), 3);
}

#[test]
fn additive_blend_uses_fixed_function() {
    let mut renderer = get_renderer(64, 64);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    assert!(renderer.blend(BlendMethod::Add));
    draw(&mut renderer, &[id]);
    assert!(has_call(&renderer, &GlCall::BlendFunc(gl::ONE, gl::ONE)));
    assert_eq!(blits(&renderer), 2);
}

#[test]
fn link_failure_skips_the_draw() {
    let mut renderer = get_renderer(64, 64);
    renderer.gl_mut().fail_link = true;
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    draw(&mut renderer, &[id]);
    assert_eq!(renderer.gl().draws(), 0);
}

#[test]
fn clear_color_is_applied_on_request() {
    let config = GlConfig {
        clear_color: [0.0, 0.0, 0.0, 1.0],
        ..GlConfig::default()
    };
    let mut renderer = get_renderer_with(64, 64, config);
    let black = GlCall::ClearColor([0.0, 0.0, 0.0, 1.0]);

    // A new frame target starts cleared.
    draw(&mut renderer, &[]);
    assert!(has_call(&renderer, &black));

    draw(&mut renderer, &[]);
    assert!(!has_call(&renderer, &black));

    assert!(renderer.clear());
    draw(&mut renderer, &[]);
    assert!(has_call(&renderer, &black));
}

#[test]
fn region_bounds_and_hit_testing() {
    let mut renderer = get_renderer(64, 64);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    assert_eq!(renderer.region(id), RenderRegion::new(10, 10, 30, 30));

    let corners = renderer.bounds(id, &Matrix::translate(5.0, 0.0)).unwrap();
    assert!(corners[0].approx_eq(Point::new(15.0, 10.0)));
    assert!(corners[2].approx_eq(Point::new(35.0, 30.0)));

    assert!(renderer.intersects_shape(id, &RenderRegion::new(25, 25, 40, 40)));
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(40, 40, 50, 50)));
}

#[test]
fn transform_update_moves_the_region() {
    let mut renderer = get_renderer(64, 64);
    let shape = square(10.0, 10.0, 20.0, RED);
    let id = prepare(&mut renderer, &shape);
    let moved = renderer
        .prepare_shape(
            &shape,
            Some(id),
            &Matrix::translate(10.0, 0.0),
            &[],
            255,
            RenderUpdateFlag::TRANSFORM,
            false,
        )
        .unwrap();
    assert_eq!(moved, id);
    assert_eq!(renderer.region(id), RenderRegion::new(20, 10, 40, 30));
}

#[test]
fn disposed_slots_are_reused() {
    let mut renderer = get_renderer(64, 64);
    let first = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    renderer.dispose(first);
    assert_eq!(renderer.region(first), RenderRegion::default());
    let second = prepare(&mut renderer, &square(0.0, 0.0, 5.0, GREEN));
    assert_eq!(first, second);
}
