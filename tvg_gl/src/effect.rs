// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene effects as one or two full-region passes.

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;
use static_assertions::const_assert_eq;
use tvg_common::effect::{RenderEffect, SceneEffect};

use crate::paint::color4;
use crate::shader::{Block, EffectProgram, Sampler};

/// `Gaussian`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct GaussianBlock {
    pub(crate) sigma: f32,
    pub(crate) scale: f32,
    /// Kernel extent in device pixels.
    pub(crate) extend: f32,
    dummy: f32,
}

/// `DropShadow`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DropShadowBlock {
    pub(crate) sigma: f32,
    pub(crate) scale: f32,
    pub(crate) extend: f32,
    dummy: f32,
    /// Premultiplied.
    pub(crate) color: [f32; 4],
    /// Device pixels.
    pub(crate) offset: [f32; 2],
    pad: [f32; 2],
}

/// `Params`: up to three colors of a color transfer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ParamsBlock {
    pub(crate) params: [[f32; 4]; 3],
}

const_assert_eq!(size_of::<GaussianBlock>(), 16);
const_assert_eq!(size_of::<DropShadowBlock>(), 48);
const_assert_eq!(size_of::<ParamsBlock>(), 48);

/// The uniform block of one effect step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum EffectBlock {
    Gaussian(GaussianBlock),
    DropShadow(DropShadowBlock),
    Params(ParamsBlock),
}

impl EffectBlock {
    pub(crate) fn block(&self) -> Block {
        match self {
            Self::Gaussian(_) => Block::Gaussian,
            Self::DropShadow(_) => Block::DropShadow,
            Self::Params(_) => Block::Params,
        }
    }
}

/// Where a step samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EffectInput {
    /// The resolved copy of the pass.
    Copy,
    /// The output of the first step.
    Scratch,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EffectStep {
    pub(crate) program: EffectProgram,
    pub(crate) block: EffectBlock,
    pub(crate) inputs: SmallVec<[(Sampler, EffectInput); 2]>,
}

impl EffectStep {
    fn new(program: EffectProgram, block: EffectBlock, inputs: &[(Sampler, EffectInput)]) -> Self {
        Self {
            program,
            block,
            inputs: inputs.iter().copied().collect(),
        }
    }
}

/// The steps of one effect. `first` renders into the scratch target, `last` back into
/// the pass.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EffectPlan {
    pub(crate) first: Option<EffectStep>,
    pub(crate) last: EffectStep,
}

fn rgb(c: [u8; 3]) -> [f32; 4] {
    [
        f32::from(c[0]) / 255.0,
        f32::from(c[1]) / 255.0,
        f32::from(c[2]) / 255.0,
        1.0,
    ]
}

/// Plan `effect`, already updated for the current transform. `None` when it changes
/// nothing.
pub(crate) fn plan(effect: &RenderEffect) -> Option<EffectPlan> {
    if !effect.valid {
        return None;
    }
    const FROM_COPY: &[(Sampler, EffectInput)] = &[(Sampler::Src, EffectInput::Copy)];
    const FROM_SCRATCH: &[(Sampler, EffectInput)] = &[(Sampler::Src, EffectInput::Scratch)];

    let plan = match effect.effect {
        SceneEffect::GaussianBlur(blur) => {
            let block = EffectBlock::Gaussian(GaussianBlock {
                sigma: blur.sigma,
                scale: effect.scale,
                extend: effect.extent,
                dummy: 0.0,
            });
            let h = EffectStep::new(EffectProgram::GaussianH, block, FROM_COPY);
            match (blur.direction.horizontal(), blur.direction.vertical()) {
                (true, true) => EffectPlan {
                    first: Some(h),
                    last: EffectStep::new(EffectProgram::GaussianV, block, FROM_SCRATCH),
                },
                (true, false) => EffectPlan {
                    first: None,
                    last: h,
                },
                _ => EffectPlan {
                    first: None,
                    last: EffectStep::new(EffectProgram::GaussianV, block, FROM_COPY),
                },
            }
        }
        SceneEffect::DropShadow(shadow) => {
            let c = color4(shadow.color);
            let gaussian = EffectBlock::Gaussian(GaussianBlock {
                sigma: shadow.sigma,
                scale: effect.scale,
                extend: effect.extent,
                dummy: 0.0,
            });
            let block = EffectBlock::DropShadow(DropShadowBlock {
                sigma: shadow.sigma,
                scale: effect.scale,
                extend: effect.extent,
                dummy: 0.0,
                color: [c[0] * c[3], c[1] * c[3], c[2] * c[3], c[3]],
                offset: [effect.offset.x, effect.offset.y],
                pad: [0.0; 2],
            });
            EffectPlan {
                first: Some(EffectStep::new(EffectProgram::GaussianH, gaussian, FROM_COPY)),
                last: EffectStep::new(
                    EffectProgram::DropShadow,
                    block,
                    &[
                        (Sampler::Src, EffectInput::Copy),
                        (Sampler::Blur, EffectInput::Scratch),
                    ],
                ),
            }
        }
        SceneEffect::Fill(color) => {
            let mut params = ParamsBlock::zeroed();
            params.params[0] = color4(color);
            EffectPlan {
                first: None,
                last: EffectStep::new(EffectProgram::Fill, EffectBlock::Params(params), FROM_COPY),
            }
        }
        SceneEffect::Tint(tint) => {
            let intensity = f32::from(tint.intensity) / 255.0;
            let params = ParamsBlock {
                params: [rgb(tint.black), rgb(tint.white), [intensity, 0.0, 0.0, 0.0]],
            };
            EffectPlan {
                first: None,
                last: EffectStep::new(EffectProgram::Tint, EffectBlock::Params(params), FROM_COPY),
            }
        }
        SceneEffect::Tritone(tritone) => {
            let mut highlight = rgb(tritone.highlight);
            highlight[3] = f32::from(tritone.blender) / 255.0;
            let params = ParamsBlock {
                params: [rgb(tritone.shadow), rgb(tritone.midtone), highlight],
            };
            EffectPlan {
                first: None,
                last: EffectStep::new(
                    EffectProgram::Tritone,
                    EffectBlock::Params(params),
                    FROM_COPY,
                ),
            }
        }
    };
    Some(plan)
}
