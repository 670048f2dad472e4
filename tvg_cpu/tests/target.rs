// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render targets, partial redraws and data handling.

use std::sync::Arc;

use crate::util::{
    draw, get_renderer, get_renderer_with, pixel, prepare, prepare_with, square, GREEN, RED,
};
use tvg_common::blend::ColorSpace;
use tvg_common::math::{Matrix, Point};
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderSurface, RenderUpdateFlag};
use tvg_cpu::{Pixels, RenderSettings, SoftwareRenderer, TargetError};

#[test]
fn straight_alpha_targets_are_unpremultiplied() {
    let mut renderer = get_renderer_with(20, 20, ColorSpace::Abgr8888S, RenderSettings::default());
    let id = prepare_with(
        &mut renderer,
        &square(0.0, 0.0, 10.0, RED),
        &[],
        128,
        false,
    );
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 5, 5), 0x8000_00ff);
}

#[test]
fn argb_targets_swap_channels() {
    let mut renderer = get_renderer_with(20, 20, ColorSpace::Argb8888, RenderSettings::default());
    let id = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 5, 5), 0xffff_0000);
}

#[test]
fn grayscale_targets_store_coverage() {
    let mut renderer = get_renderer_with(20, 20, ColorSpace::Grayscale8, RenderSettings::default());
    let id = prepare(&mut renderer, &square(0.0, 0.0, 10.0, GREEN));
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 5, 5), 255);
    assert_eq!(pixel(&renderer, 15, 15), 0);
}

#[test]
fn invalid_targets_are_rejected() {
    let mut renderer = SoftwareRenderer::new(RenderSettings::default());
    assert_eq!(
        renderer.set_target(Pixels::Rgba(vec![0; 100]), 5, 10, 10, ColorSpace::Abgr8888),
        Err(TargetError::StrideTooSmall {
            stride: 5,
            width: 10
        })
    );
    assert_eq!(
        renderer.set_target(Pixels::Rgba(vec![0; 50]), 10, 10, 10, ColorSpace::Abgr8888),
        Err(TargetError::BufferTooShort {
            len: 50,
            needed: 100
        })
    );
    assert_eq!(
        renderer.set_target(Pixels::Gray(vec![0; 100]), 10, 10, 10, ColorSpace::Abgr8888),
        Err(TargetError::ColorSpace(ColorSpace::Abgr8888))
    );
    assert!(renderer.surface().is_none());
    assert!(!renderer.pre_render());
}

#[test]
fn wide_strides_leave_padding_alone() {
    let mut renderer = SoftwareRenderer::new(RenderSettings::default());
    let pixels = Pixels::Rgba(vec![0; 16 * 10]);
    renderer
        .set_target(pixels, 16, 10, 10, ColorSpace::Abgr8888)
        .unwrap();
    let id = prepare(&mut renderer, &square(0.0, 0.0, 20.0, RED));
    draw(&mut renderer, &[id]);

    let Some(Pixels::Rgba(px)) = renderer.take_target().map(|sfc| sfc.into_pixels()) else {
        panic!("expected a 32-bit target");
    };
    assert_eq!(px[9], 0xff00_00ff);
    assert_eq!(px[10], 0);
    assert_eq!(px[15], 0);
    assert_eq!(px[16], 0xff00_00ff);
}

#[test]
fn clear_wipes_the_target() {
    let mut renderer = get_renderer(20, 20);
    let id = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    draw(&mut renderer, &[id]);
    assert!(renderer.clear());
    assert_eq!(pixel(&renderer, 5, 5), 0);
}

#[test]
fn partial_redraw_clears_the_damage_only() {
    let settings = RenderSettings {
        partial: true,
        ..RenderSettings::default()
    };
    let mut renderer = get_renderer_with(100, 100, ColorSpace::Abgr8888, settings);
    let shape = square(10.0, 10.0, 20.0, RED);
    let a = prepare_with(&mut renderer, &shape, &[], 128, false);
    let b = prepare(&mut renderer, &square(60.0, 60.0, 20.0, GREEN));
    draw(&mut renderer, &[a, b]);
    assert_eq!(pixel(&renderer, 20, 20), 0x8000_0080);

    // Only the translucent square changed, so only it is redrawn.
    let a = renderer
        .prepare_shape(
            &shape,
            Some(a),
            &Matrix::IDENTITY,
            &[],
            128,
            RenderUpdateFlag::COLOR,
            false,
        )
        .unwrap();
    draw(&mut renderer, &[a]);

    assert_eq!(pixel(&renderer, 20, 20), 0x8000_0080);
    assert_eq!(pixel(&renderer, 70, 70), 0xff00_ff00);
}

#[test]
fn moved_shapes_damage_both_positions() {
    let settings = RenderSettings {
        partial: true,
        ..RenderSettings::default()
    };
    let mut renderer = get_renderer_with(100, 100, ColorSpace::Abgr8888, settings);
    let shape = square(0.0, 0.0, 20.0, RED);
    let id = prepare(&mut renderer, &shape);
    draw(&mut renderer, &[id]);

    let id = renderer
        .prepare_shape(
            &shape,
            Some(id),
            &Matrix::translate(50.0, 50.0),
            &[],
            255,
            RenderUpdateFlag::TRANSFORM,
            false,
        )
        .unwrap();
    draw(&mut renderer, &[id]);

    assert_eq!(pixel(&renderer, 10, 10), 0);
    assert_eq!(pixel(&renderer, 60, 60), 0xff00_00ff);
}

#[test]
fn partial_can_be_switched_off() {
    let mut renderer = get_renderer(10, 10);
    assert!(!renderer.partial(false));
    assert!(renderer.partial(true));
}

#[test]
fn disposed_ids_are_reused() {
    let mut renderer = get_renderer(20, 20);
    let first = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    renderer.dispose(first);
    assert!(!renderer.render_shape(first));
    let second = prepare(&mut renderer, &square(0.0, 0.0, 10.0, RED));
    assert_eq!(first, second);
}

#[test]
fn bounds_include_transform() {
    let mut renderer = get_renderer(100, 100);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    let pts = renderer.bounds(id, &Matrix::translate(5.0, 0.0)).unwrap();
    assert_eq!(
        pts,
        [
            Point::new(15.0, 10.0),
            Point::new(35.0, 10.0),
            Point::new(35.0, 30.0),
            Point::new(15.0, 30.0),
        ]
    );
    assert_eq!(renderer.region(id), RenderRegion::new(10, 10, 30, 30));
}

#[test]
fn images_are_hit_tested_by_their_area() {
    let mut renderer = get_renderer(100, 100);
    let image = Arc::new(
        RenderSurface::new(vec![0xff00_00ff; 64 * 64], 64, 64, ColorSpace::Abgr8888).unwrap(),
    );
    let id = renderer
        .prepare_image(
            &image,
            None,
            &Matrix::translate(10.0, 10.0),
            &[],
            255,
            RenderUpdateFlag::ALL,
        )
        .unwrap();

    assert_eq!(renderer.region(id), RenderRegion::new(10, 10, 74, 74));
    assert!(!renderer.intersects_image(id, &RenderRegion::new(0, 0, 5, 5)));
    assert!(renderer.intersects_image(id, &RenderRegion::new(70, 70, 80, 80)));

    assert!(renderer.pre_render());
    assert!(renderer.render_image(id));
    assert!(renderer.post_render());
    assert_eq!(pixel(&renderer, 10, 10), 0xff00_00ff);
    assert_eq!(pixel(&renderer, 9, 9), 0);
}

#[test]
fn transparent_shapes_are_skipped() {
    let mut renderer = get_renderer(20, 20);
    let id = prepare_with(
        &mut renderer,
        &square(0.0, 0.0, 10.0, RED),
        &[],
        0,
        false,
    );
    draw(&mut renderer, &[id]);
    assert_eq!(pixel(&renderer, 5, 5), 0);
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(0, 0, 20, 20)));
}
