// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared across different tests.

use tvg_common::blend::ColorSpace;
use tvg_common::math::Matrix;
use tvg_common::path::RenderPath;
use tvg_common::render::{RenderMethod, RenderUpdateFlag};
use tvg_common::shape::{RenderColor, RenderShape};
use tvg_gl::gl::{GlCall, RecordingGl};
use tvg_gl::{DataId, GlConfig, GpuRenderer};

pub(crate) const RED: RenderColor = RenderColor::new(255, 0, 0, 255);
pub(crate) const GREEN: RenderColor = RenderColor::new(0, 255, 0, 255);

/// Framebuffer name the host hands to the renderer.
pub(crate) const HOST_FBO: u32 = 1000;

pub(crate) type Renderer = GpuRenderer<RecordingGl>;

pub(crate) fn get_renderer(width: u32, height: u32) -> Renderer {
    get_renderer_with(width, height, GlConfig::default())
}

pub(crate) fn get_renderer_with(width: u32, height: u32, config: GlConfig) -> Renderer {
    let mut renderer = GpuRenderer::new(RecordingGl::new(), config);
    renderer
        .set_target(HOST_FBO, width, height, ColorSpace::Abgr8888)
        .unwrap();
    renderer
}

pub(crate) fn square_path(x: f32, y: f32, size: f32) -> RenderPath {
    let mut path = RenderPath::new();
    path.add_rect(x, y, size, size);
    path
}

pub(crate) fn square(x: f32, y: f32, size: f32, color: RenderColor) -> RenderShape {
    RenderShape::new(square_path(x, y, size), color)
}

pub(crate) fn prepare(renderer: &mut Renderer, shape: &RenderShape) -> DataId {
    prepare_with(renderer, shape, &[], 255, false)
}

pub(crate) fn prepare_with(
    renderer: &mut Renderer,
    shape: &RenderShape,
    clips: &[DataId],
    opacity: u8,
    clipper: bool,
) -> DataId {
    renderer
        .prepare_shape(
            shape,
            None,
            &Matrix::IDENTITY,
            clips,
            opacity,
            RenderUpdateFlag::ALL,
            clipper,
        )
        .unwrap()
}

/// Render one frame drawing `shapes` in order, starting from an empty call log.
pub(crate) fn draw(renderer: &mut Renderer, shapes: &[DataId]) {
    renderer.gl_mut().clear_log();
    assert!(renderer.pre_render());
    for id in shapes {
        assert!(renderer.render_shape(*id));
    }
    assert!(renderer.post_render());
    assert!(renderer.sync());
}

/// Number of framebuffer blits in the call log.
pub(crate) fn blits(renderer: &Renderer) -> usize {
    renderer
        .gl()
        .count(|call| matches!(call, GlCall::BlitFramebuffer { .. }))
}

pub(crate) fn has_call(renderer: &Renderer, call: &GlCall) -> bool {
    renderer.gl().calls.contains(call)
}
