// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post effects applied through compositors.

use crate::util::{get_renderer, pixel, prepare, square, BLUE, RED};
use tvg_common::blend::{ColorSpace, CompositionFlag, MaskMethod};
use tvg_common::effect::{BlurBorder, BlurDirection, GaussianBlur, RenderEffect, SceneEffect};
use tvg_common::math::Matrix;
use tvg_common::region::RenderRegion;
use tvg_common::render::RenderMethod;
use tvg_cpu::{DataId, SoftwareRenderer};

fn blur(sigma: f32) -> RenderEffect {
    RenderEffect::new(SceneEffect::GaussianBlur(GaussianBlur::new(
        sigma,
        BlurDirection::Both,
        BlurBorder::Duplicate,
        0,
    )))
}

/// Draw `id` into a post-processing compositor over `region` and apply `effect`.
fn draw_with_effect(
    renderer: &mut SoftwareRenderer,
    id: DataId,
    region: &RenderRegion,
    effect: &RenderEffect,
    direct: bool,
) -> bool {
    assert!(renderer.pre_render());
    let (cs, flags) = (ColorSpace::Abgr8888, CompositionFlag::POST_PROCESSING);
    let cmp = renderer.target(region, cs, flags).unwrap();
    assert!(renderer.begin_composite(cmp, MaskMethod::None, 255));
    assert!(renderer.render_shape(id));
    let applied = renderer.render_effect(cmp, effect, direct);
    assert!(renderer.end_composite(cmp));
    assert!(renderer.post_render());
    applied
}

#[test]
fn blur_region_grows_by_twice_sigma() {
    let mut renderer = get_renderer(200, 200);
    let mut effect = blur(4.0);
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);
    assert!(effect.valid);

    let region = renderer.effect_region(&effect, &RenderRegion::new(50, 50, 150, 150));
    assert_eq!(region, RenderRegion::new(42, 42, 158, 158));
}

#[test]
fn blur_softens_square_edges() {
    let mut renderer = get_renderer(200, 200);
    let id = prepare(&mut renderer, &square(50.0, 50.0, 100.0, RED));
    let mut effect = blur(4.0);
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);
    let bounds = renderer.region(id);
    assert_eq!(bounds, RenderRegion::new(50, 50, 150, 150));
    let region = renderer.effect_region(&effect, &bounds);

    assert!(draw_with_effect(&mut renderer, id, &region, &effect, false));

    let a = |x| pixel(&renderer, x, 100) >> 24;
    assert_eq!(a(100), 255);
    assert!(a(49) > 0 && a(49) < 255);
    assert!(a(45) < a(47));
    assert!(a(47) < a(49));
    assert!(a(49) < a(51));
    assert!(a(51) < 255);
    // Nothing leaks past the grown region.
    assert_eq!(pixel(&renderer, 40, 100), 0);
    assert_eq!(pixel(&renderer, 100, 40), 0);
}

#[test]
fn scaled_blur_spreads_further() {
    let mut renderer = get_renderer(100, 100);
    let mut effect = blur(2.0);
    renderer.prepare_effect(&mut effect, &Matrix::scale(2.0, 2.0));
    assert_eq!(effect.radius(), 8);
}

#[test]
fn direct_fill_recolors_the_target() {
    let mut renderer = get_renderer(40, 40);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    let mut effect = RenderEffect::new(SceneEffect::Fill(BLUE));
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);

    let region = RenderRegion::new(0, 0, 40, 40);
    assert!(draw_with_effect(&mut renderer, id, &region, &effect, true));

    assert_eq!(pixel(&renderer, 20, 20), 0xffff_0000);
    assert_eq!(pixel(&renderer, 5, 5), 0);
}

#[test]
fn invalid_effects_are_skipped() {
    let mut renderer = get_renderer(40, 40);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    let mut effect = blur(0.0);
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);
    assert!(!effect.valid);

    let region = RenderRegion::new(0, 0, 40, 40);
    assert!(draw_with_effect(&mut renderer, id, &region, &effect, false));
    assert_eq!(pixel(&renderer, 20, 20), 0xff00_00ff);
}

#[test]
fn grayscale_compositors_reject_effects() {
    let mut renderer = get_renderer(40, 40);
    let id = prepare(&mut renderer, &square(10.0, 10.0, 20.0, RED));
    let mut effect = RenderEffect::new(SceneEffect::Fill(BLUE));
    renderer.prepare_effect(&mut effect, &Matrix::IDENTITY);

    assert!(renderer.pre_render());
    let region = RenderRegion::new(0, 0, 40, 40);
    let (cs, flags) = (ColorSpace::Grayscale8, CompositionFlag::POST_PROCESSING);
    let cmp = renderer.target(&region, cs, flags).unwrap();
    assert!(renderer.begin_composite(cmp, MaskMethod::None, 255));
    assert!(renderer.render_shape(id));
    assert!(!renderer.render_effect(cmp, &effect, false));
    assert!(renderer.end_composite(cmp));
    assert!(renderer.post_render());
}
