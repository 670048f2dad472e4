// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paints and the uniform blocks they upload.
//!
//! Every block mirrors a `std140` block of the shader bank.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use tvg_common::blend::BlendMethod;
use tvg_common::math::Matrix;
use tvg_common::shape::{ColorStop, Fill, FillSpread, GradientKind, RenderColor};

use crate::shader::{BlendSource, ProgramKey};

/// Stops a gradient block holds.
pub(crate) const MAX_STOPS: usize = 16;

/// `Matrix` and `InvMatrix`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct MatrixBlock {
    pub(crate) m: [f32; 16],
}

impl MatrixBlock {
    pub(crate) fn new(m: &Matrix) -> Self {
        Self { m: m.to_mat4() }
    }
}

/// `ColorInfo` of the solid programs: a straight color with opacity applied.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SolidBlock {
    pub(crate) color: [f32; 4],
}

/// `ColorInfo` of the programs sampling a texture.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct TextureBlock {
    /// 0 for RGBA texels, 1 for BGRA.
    pub(crate) format: i32,
    pub(crate) flip_y: i32,
    /// 0 to 255.
    pub(crate) opacity: i32,
    dummy: i32,
}

impl TextureBlock {
    pub(crate) fn new(format: i32, opacity: u8) -> Self {
        Self {
            format,
            flip_y: 0,
            opacity: i32::from(opacity),
            dummy: 0,
        }
    }
}

/// `GradientInfo`, shared by linear and radial programs.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct GradientBlock {
    /// Stop count, dither noise, spread, opacity.
    pub(crate) n_stops: [f32; 4],
    /// `x1, y1, x2, y2` for linear gradients, `cx, cy, r, fr` for radial ones.
    pub(crate) shape: [f32; 4],
    /// `fx, fy` of radial gradients.
    pub(crate) focal: [f32; 4],
    pub(crate) stop_points: [[f32; 4]; MAX_STOPS / 4],
    pub(crate) stop_colors: [[f32; 4]; MAX_STOPS],
}

const_assert_eq!(size_of::<MatrixBlock>(), 64);
const_assert_eq!(size_of::<TextureBlock>(), 16);
const_assert_eq!(size_of::<GradientBlock>(), 368);

fn unit(c: u8) -> f32 {
    f32::from(c) / 255.0
}

pub(crate) fn color4(c: RenderColor) -> [f32; 4] {
    [unit(c.r), unit(c.g), unit(c.b), unit(c.a)]
}

/// At most [`MAX_STOPS`], keeping both ends.
fn pick_stops(stops: &[ColorStop]) -> Vec<ColorStop> {
    if stops.len() <= MAX_STOPS {
        return stops.to_vec();
    }
    log::debug!("gradient with {} stops cut to {MAX_STOPS}", stops.len());
    let mut picked = stops[..MAX_STOPS - 1].to_vec();
    picked.extend(stops.last().copied());
    picked
}

impl GradientBlock {
    fn new(fill: &Fill, opacity: u8) -> Option<Self> {
        let stops = pick_stops(&fill.stops);
        if stops.is_empty() {
            return None;
        }
        let mut block = Self::zeroed();
        let spread = match fill.spread {
            FillSpread::Pad => 0.0,
            FillSpread::Reflect => 1.0,
            FillSpread::Repeat => 2.0,
        };
        block.n_stops = [stops.len() as f32, 1.0, spread, unit(opacity)];

        let mut last = 0.0_f32;
        for (i, stop) in stops.iter().enumerate() {
            // Offsets never go backwards.
            last = stop.offset.clamp(last, 1.0);
            block.stop_points[i / 4][i % 4] = last;
            block.stop_colors[i] = color4(stop.color);
        }

        match &fill.kind {
            GradientKind::Linear(linear) => {
                block.shape = [linear.p1.x, linear.p1.y, linear.p2.x, linear.p2.y];
            }
            GradientKind::Radial(radial) => {
                block.shape = [
                    radial.center.x,
                    radial.center.y,
                    radial.radius.max(0.0),
                    radial.focal_radius.max(0.0),
                ];
                block.focal = [radial.focal.x, radial.focal.y, 0.0, 0.0];
            }
        }
        Some(block)
    }
}

/// How a fill or a stroke is colored.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Paint {
    Solid(SolidBlock),
    Linear {
        block: GradientBlock,
        /// Shape space to gradient space.
        inverse: Matrix,
    },
    Radial {
        block: GradientBlock,
        inverse: Matrix,
    },
}

impl Paint {
    /// The paint of `fill`, or of `color` without one. `None` when nothing would show.
    pub(crate) fn new(fill: Option<&Fill>, color: RenderColor, opacity: u8) -> Option<Self> {
        if opacity == 0 {
            return None;
        }
        let Some(fill) = fill else {
            if color.a == 0 {
                return None;
            }
            let mut rgba = color4(color);
            rgba[3] *= unit(opacity);
            return Some(Self::Solid(SolidBlock { color: rgba }));
        };

        let Some(inverse) = fill.transform.inverse() else {
            log::warn!("gradient transform is not invertible");
            return None;
        };
        let block = GradientBlock::new(fill, opacity)?;
        Some(match fill.kind {
            GradientKind::Linear(_) => Self::Linear { block, inverse },
            GradientKind::Radial(_) => Self::Radial { block, inverse },
        })
    }

    /// The program drawing this paint, with `blend` when it needs a shader.
    pub(crate) fn program(&self, blend: Option<BlendMethod>) -> ProgramKey {
        match (self, blend) {
            (Self::Solid(_), None) => ProgramKey::Color,
            (Self::Linear { .. }, None) => ProgramKey::Linear,
            (Self::Radial { .. }, None) => ProgramKey::Radial,
            (Self::Solid(_), Some(m)) => ProgramKey::Blend(m, BlendSource::Solid),
            (Self::Linear { .. }, Some(m)) => ProgramKey::Blend(m, BlendSource::Linear),
            (Self::Radial { .. }, Some(m)) => ProgramKey::Blend(m, BlendSource::Radial),
        }
    }
}
