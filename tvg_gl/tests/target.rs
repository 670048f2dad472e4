// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render target handling.

use crate::util::{draw, get_renderer, HOST_FBO};
use tvg_common::blend::ColorSpace;
use tvg_common::region::RenderRegion;
use tvg_common::render::RenderMethod;
use tvg_gl::gl::{GlCall, RecordingGl};
use tvg_gl::{GlConfig, GpuRenderer, TargetError};

fn deleted_framebuffers(renderer: &GpuRenderer<RecordingGl>) -> usize {
    renderer
        .gl()
        .count(|call| matches!(call, GlCall::DeleteFramebuffer(_)))
}

#[test]
fn rejects_unusable_targets() {
    let mut renderer = GpuRenderer::new(RecordingGl::new(), GlConfig::default());
    assert!(!renderer.pre_render());
    assert_eq!(
        renderer.set_target(HOST_FBO, 16, 0, ColorSpace::Abgr8888),
        Err(TargetError::Empty {
            width: 16,
            height: 0
        })
    );
    assert_eq!(
        renderer.set_target(HOST_FBO, 16, 16, ColorSpace::Unknown),
        Err(TargetError::ColorSpace(ColorSpace::Unknown))
    );
    assert!(!renderer.clear());
}

#[test]
fn target_sets_the_viewport() {
    let mut renderer = get_renderer(40, 30);
    assert_eq!(renderer.viewport(), RenderRegion::new(0, 0, 40, 30));
    assert_eq!(renderer.color_space(), ColorSpace::Abgr8888);
}

#[test]
fn resizing_recreates_the_frame_target() {
    let mut renderer = get_renderer(64, 64);
    draw(&mut renderer, &[]);

    renderer.gl_mut().clear_log();
    renderer
        .set_target(HOST_FBO + 1, 64, 64, ColorSpace::Argb8888)
        .unwrap();
    assert_eq!(deleted_framebuffers(&renderer), 0);

    renderer
        .set_target(HOST_FBO, 32, 32, ColorSpace::Abgr8888)
        .unwrap();
    // The multisampled framebuffer and its resolve framebuffer.
    assert_eq!(deleted_framebuffers(&renderer), 2);
    assert_eq!(renderer.viewport(), RenderRegion::new(0, 0, 32, 32));
}

#[test]
fn engine_init_is_idempotent() {
    assert!(tvg_gl::init());
    assert!(tvg_gl::init());
}
