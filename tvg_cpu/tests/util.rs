// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared across different tests.

use tvg_common::blend::ColorSpace;
use tvg_common::math::Matrix;
use tvg_common::path::RenderPath;
use tvg_common::render::{RenderMethod, RenderUpdateFlag};
use tvg_common::shape::{RenderColor, RenderShape};
use tvg_cpu::{DataId, Pixels, RenderSettings, SoftwareRenderer};

pub(crate) const RED: RenderColor = RenderColor::new(255, 0, 0, 255);
pub(crate) const GREEN: RenderColor = RenderColor::new(0, 255, 0, 255);
pub(crate) const BLUE: RenderColor = RenderColor::new(0, 0, 255, 255);
pub(crate) const BLACK: RenderColor = RenderColor::new(0, 0, 0, 255);

pub(crate) fn get_renderer(width: u32, height: u32) -> SoftwareRenderer {
    let settings = RenderSettings::default();
    get_renderer_with(width, height, ColorSpace::Abgr8888, settings)
}

pub(crate) fn get_renderer_with(
    width: u32,
    height: u32,
    cs: ColorSpace,
    settings: RenderSettings,
) -> SoftwareRenderer {
    let len = (width * height) as usize;
    let pixels = if cs == ColorSpace::Grayscale8 {
        Pixels::Gray(vec![0; len])
    } else {
        Pixels::Rgba(vec![0; len])
    };
    let mut renderer = SoftwareRenderer::new(settings);
    renderer.set_target(pixels, width, width, height, cs).unwrap();
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

pub(crate) fn pixel(renderer: &SoftwareRenderer, x: u32, y: u32) -> u32 {
    renderer.surface().unwrap().pixel(x, y)
}

pub(crate) fn prepare(renderer: &mut SoftwareRenderer, shape: &RenderShape) -> DataId {
    prepare_with(renderer, shape, &[], 255, false)
}

pub(crate) fn prepare_with(
    renderer: &mut SoftwareRenderer,
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

/// Render one frame drawing `shapes` in order.
pub(crate) fn draw(renderer: &mut SoftwareRenderer, shapes: &[DataId]) {
    assert!(renderer.pre_render());
    for id in shapes {
        assert!(renderer.render_shape(*id));
    }
    assert!(renderer.post_render());
    assert!(renderer.sync());
}

/// Assert that every channel of `actual` is within `tolerance` of `expected`.
pub(crate) fn assert_close(actual: u32, expected: u32, tolerance: u8) {
    let close = actual
        .to_le_bytes()
        .iter()
        .zip(expected.to_le_bytes())
        .all(|(a, e)| a.abs_diff(e) <= tolerance);
    assert!(
        close,
        "{actual:#010x} differs from {expected:#010x} by more than {tolerance}"
    );
}
