// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image upload, drawing and disposal.

use std::sync::Arc;

use crate::util::{get_renderer, Renderer};
use tvg_common::blend::ColorSpace;
use tvg_common::math::Matrix;
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderSurface, RenderUpdateFlag};
use tvg_gl::gl::GlCall;
use tvg_gl::DataId;

fn image(cs: ColorSpace) -> Arc<RenderSurface> {
    Arc::new(RenderSurface::new(vec![0x8000_ff00; 16], 4, 4, cs).unwrap())
}

fn prepare(renderer: &mut Renderer, source: &Arc<RenderSurface>, data: Option<DataId>) -> DataId {
    renderer
        .prepare_image(
            source,
            data,
            &Matrix::translate(8.0, 8.0),
            &[],
            255,
            RenderUpdateFlag::ALL,
        )
        .unwrap()
}

fn uploads(renderer: &Renderer) -> usize {
    renderer.gl().count(|call| {
        matches!(
            call,
            GlCall::TexImage2d {
                width: 4,
                height: 4,
                len: 64
            }
        )
    })
}

fn deleted_textures(renderer: &Renderer) -> usize {
    renderer
        .gl()
        .count(|call| matches!(call, GlCall::DeleteTexture(_)))
}

#[test]
fn image_is_uploaded_once() {
    let mut renderer = get_renderer(32, 32);
    let source = image(ColorSpace::Argb8888S);
    let id = prepare(&mut renderer, &source, None);
    assert_eq!(prepare(&mut renderer, &source, Some(id)), id);
    assert_eq!(uploads(&renderer), 1);

    renderer.gl_mut().clear_log();
    assert!(renderer.pre_render());
    assert!(renderer.render_image(id));
    assert!(renderer.post_render());
    assert!(renderer.sync());
    assert_eq!(renderer.gl().draws(), 1);
}

#[test]
fn replaced_image_is_deleted_after_the_frame() {
    let mut renderer = get_renderer(32, 32);
    let id = prepare(&mut renderer, &image(ColorSpace::Abgr8888), None);
    renderer.gl_mut().clear_log();

    assert!(renderer.pre_render());
    let same = prepare(&mut renderer, &image(ColorSpace::Abgr8888), Some(id));
    assert_eq!(same, id);
    assert_eq!(uploads(&renderer), 1);
    assert_eq!(deleted_textures(&renderer), 0);
    assert!(renderer.render_image(id));
    assert!(renderer.sync());
    assert_eq!(deleted_textures(&renderer), 1);
}

#[test]
fn disposed_image_is_deleted_at_sync() {
    let mut renderer = get_renderer(32, 32);
    let id = prepare(&mut renderer, &image(ColorSpace::Abgr8888), None);
    renderer.gl_mut().clear_log();
    renderer.dispose(id);
    assert_eq!(deleted_textures(&renderer), 0);
    assert!(renderer.sync());
    assert_eq!(deleted_textures(&renderer), 1);
}

#[test]
fn image_region_and_hit_testing() {
    let mut renderer = get_renderer(32, 32);
    let id = prepare(&mut renderer, &image(ColorSpace::Abgr8888), None);
    assert_eq!(renderer.region(id), RenderRegion::new(8, 8, 12, 12));
    assert!(renderer.intersects_image(id, &RenderRegion::new(10, 10, 20, 20)));
    assert!(!renderer.intersects_image(id, &RenderRegion::new(0, 0, 8, 8)));
    assert!(!renderer.intersects_shape(id, &RenderRegion::new(10, 10, 20, 20)));
}

#[test]
fn transparent_image_is_skipped() {
    let mut renderer = get_renderer(32, 32);
    let source = image(ColorSpace::Abgr8888);
    let (transform, flags) = (Matrix::IDENTITY, RenderUpdateFlag::ALL);
    let id = renderer.prepare_image(&source, None, &transform, &[], 0, flags).unwrap();
    renderer.gl_mut().clear_log();
    assert!(renderer.pre_render());
    assert!(renderer.render_image(id));
    assert!(renderer.sync());
    assert_eq!(renderer.gl().draws(), 0);
}
