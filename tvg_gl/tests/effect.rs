// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene effects applied to compositors.

use crate::util::{get_renderer, prepare, square, Renderer, RED};
use tvg_common::blend::{ColorSpace, CompositionFlag, MaskMethod};
use tvg_common::effect::{
    BlurBorder, BlurDirection, DropShadow, GaussianBlur, RenderEffect, SceneEffect, Tint,
};
use tvg_common::math::Matrix;
use tvg_common::render::RenderMethod;
use tvg_common::shape::RenderColor;

/// Draw a square into a compositor, apply `effect` and compose it back.
fn draw_with_effect(renderer: &mut Renderer, effect: SceneEffect, direct: bool) {
    let id = prepare(renderer, &square(10.0, 10.0, 20.0, RED));
    let mut effect = RenderEffect::new(effect);
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);
    renderer.gl_mut().clear_log();

    assert!(renderer.pre_render());
    let region = renderer.effect_region(&effect, &renderer.viewport());
    let (cs, flags) = (ColorSpace::Abgr8888, CompositionFlag::POST_PROCESSING);
    let cmp = renderer.target(&region, cs, flags).unwrap();
    assert!(renderer.begin_composite(cmp, MaskMethod::None, 255));
    assert!(renderer.render_shape(id));
    assert!(renderer.render_effect(cmp, &effect, direct));
    assert!(renderer.end_composite(cmp));
    assert!(renderer.post_render());
    assert!(renderer.sync());
}

fn blur(sigma: f32) -> SceneEffect {
    SceneEffect::GaussianBlur(GaussianBlur::new(
        sigma,
        BlurDirection::Both,
        BlurBorder::Duplicate,
        100,
    ))
}

#[test]
fn blur_takes_two_passes() {
    let mut renderer = get_renderer(64, 64);
    draw_with_effect(&mut renderer, blur(3.0), false);
    // Shape, horizontal and vertical blur, composition.
    assert_eq!(renderer.gl().draws(), 4);
}

#[test]
fn direct_effect_composes_immediately() {
    let mut renderer = get_renderer(64, 64);
    draw_with_effect(&mut renderer, blur(3.0), true);
    assert_eq!(renderer.gl().draws(), 4);
}

#[test]
fn zero_blur_is_skipped() {
    let mut renderer = get_renderer(64, 64);
    draw_with_effect(&mut renderer, blur(0.0), false);
    assert_eq!(renderer.gl().draws(), 2);
}

#[test]
fn drop_shadow_blurs_then_composites() {
    let mut renderer = get_renderer(64, 64);
    let shadow = DropShadow::new(RenderColor::new(0, 0, 0, 128), 45.0, 4.0, 2.0, 100);
    draw_with_effect(&mut renderer, SceneEffect::DropShadow(shadow), false);
    assert_eq!(renderer.gl().draws(), 4);
}

#[test]
fn tint_is_a_single_pass() {
    let mut renderer = get_renderer(64, 64);
    let tint = Tint {
        black: [0, 0, 0],
        white: [255, 128, 0],
        intensity: 200,
    };
    draw_with_effect(&mut renderer, SceneEffect::Tint(tint), false);
    assert_eq!(renderer.gl().draws(), 3);
}
