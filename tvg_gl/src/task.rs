// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded GPU work.
//!
//! Tasks are recorded while the frame is drawn and replayed at [`sync`], once every
//! vertex and uniform is uploaded. Between tasks the pipeline is in the state set by
//! [`reset_state`]: depth test `GREATER` with writes on, stencil test `ALWAYS`, and
//! premultiplied source-over blending.
//!
//! [`sync`]: tvg_common::render::RenderMethod::sync

use smallvec::{smallvec, SmallVec};
use tvg_common::math::Matrix;
use tvg_common::region::RenderRegion;
use tvg_common::shape::FillRule;

use crate::buffer::StageBuffer;
use crate::gl::{self, Gl};
use crate::pass::RenderPass;
use crate::program::Program;
use crate::shader::{Block, EffectProgram, Sampler};
use crate::target::RenderTarget;
use crate::tessellator::Mesh;

/// A float attribute read from the shared data buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VertexLayout {
    pub(crate) index: u32,
    pub(crate) size: i32,
    pub(crate) stride: i32,
    pub(crate) offset: usize,
}

/// A resource attached to a draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    Uniform {
        block: Block,
        buffer: u32,
        offset: usize,
        size: usize,
    },
    Texture {
        sampler: Sampler,
        texture: u32,
    },
}

/// How the fragment output lands in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum BlendState {
    /// Premultiplied source over.
    #[default]
    SrcOver,
    /// Channels are added.
    Additive,
    /// The output replaces the target. Used when the program blends by itself.
    Replace,
}

/// One indexed draw.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DrawCall {
    pub(crate) program: Program,
    pub(crate) bindings: SmallVec<[Binding; 4]>,
    pub(crate) layouts: SmallVec<[VertexLayout; 2]>,
    /// Byte offset into the index buffer.
    pub(crate) index_offset: usize,
    pub(crate) index_count: i32,
    /// Device pixels the draw may touch.
    pub(crate) scissor: RenderRegion,
    /// Position in the pass, from 1 upwards. Larger draws on top.
    pub(crate) depth: u32,
    pub(crate) blend: BlendState,
}

impl DrawCall {
    pub(crate) fn draw<G: Gl>(&self, gl: &mut G, target: &RenderTarget, depth_scale: f32) {
        let s = &self.scissor;
        gl.scissor(s.min.0, target.height as i32 - s.max.1, s.w(), s.h());
        self.program.bind(gl, self.depth as f32 * depth_scale);
        for binding in &self.bindings {
            match *binding {
                Binding::Uniform {
                    block,
                    buffer,
                    offset,
                    size,
                } => {
                    gl.bind_buffer_range(gl::UNIFORM_BUFFER, block.binding(), buffer, offset, size)
                }
                Binding::Texture { sampler, texture } => {
                    gl.active_texture(gl::TEXTURE0 + sampler.unit());
                    gl.bind_texture(gl::TEXTURE_2D, texture);
                }
            }
        }
        for layout in &self.layouts {
            gl.enable_vertex_attrib_array(layout.index);
            gl.vertex_attrib_pointer(layout.index, layout.size, layout.stride, layout.offset);
        }

        match self.blend {
            BlendState::SrcOver => {}
            BlendState::Additive => gl.blend_func(gl::ONE, gl::ONE),
            BlendState::Replace => gl.disable(gl::BLEND),
        }
        let (count, offset) = (self.index_count, self.index_offset);
        gl.draw_elements(gl::TRIANGLES, count, gl::UNSIGNED_INT, offset);
        match self.blend {
            BlendState::SrcOver => {}
            BlendState::Additive => gl.blend_func(gl::ONE, gl::ONE_MINUS_SRC_ALPHA),
            BlendState::Replace => gl.enable(gl::BLEND),
        }

        for layout in &self.layouts {
            gl.disable_vertex_attrib_array(layout.index);
        }
    }
}

/// Consecutive solid fills drawn with one call.
///
/// Vertices are kept on the CPU until the frame is staged, so later fills can still be
/// appended. Positions are in device space and every vertex carries its straight color.
#[derive(Debug)]
pub(crate) struct SolidBatch {
    pub(crate) vertices: Vec<[f32; 6]>,
    pub(crate) indices: Vec<u32>,
    /// Layouts and index range are set by [`stage`](Self::stage).
    pub(crate) draw: DrawCall,
    /// Number of fills merged into the batch.
    pub(crate) fills: usize,
}

impl SolidBatch {
    /// A batch of one fill: `mesh` moved to device space by `transform`, painted `color`.
    ///
    /// `mvp` binds the projection from device space.
    pub(crate) fn new(
        program: Program,
        mvp: Binding,
        mesh: &Mesh,
        transform: &Matrix,
        color: [f32; 4],
        scissor: RenderRegion,
        depth: u32,
    ) -> Self {
        let [r, g, b, a] = color;
        let vertices = mesh
            .vertices
            .iter()
            .map(|p| {
                let p = p.transform(transform);
                [p.x, p.y, r, g, b, a]
            })
            .collect();
        Self {
            vertices,
            indices: mesh.indices.clone(),
            draw: DrawCall {
                program,
                bindings: smallvec![mvp],
                layouts: SmallVec::new(),
                index_offset: 0,
                index_count: 0,
                scissor,
                depth,
                blend: BlendState::SrcOver,
            },
            fills: 1,
        }
    }

    /// Whether `next` may be drawn within this batch.
    ///
    /// The projection of every batch in a pass is the same, so its binding is not compared.
    pub(crate) fn accepts(&self, next: &Self) -> bool {
        self.draw.program == next.draw.program
            && self.draw.blend == next.draw.blend
            && self.draw.scissor == next.draw.scissor
    }

    /// Append `next`, which lands on top of everything already in the batch.
    pub(crate) fn merge(&mut self, next: Self) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&next.vertices);
        self.indices.extend(next.indices.iter().map(|i| i + base));
        self.draw.depth = self.draw.depth.max(next.draw.depth);
        self.fills += next.fills;
    }

    fn stage(&mut self, stage: &mut StageBuffer) {
        let offset = stage.push(&self.vertices);
        self.draw.layouts = smallvec![
            VertexLayout {
                index: 0,
                size: 2,
                stride: 24,
                offset,
            },
            VertexLayout {
                index: 1,
                size: 4,
                stride: 24,
                offset: offset + 8,
            },
        ];
        self.draw.index_offset = stage.push_indices(&self.indices);
        self.draw.index_count = self.indices.len() as i32;
    }
}

/// Composition of finished passes back into the pass that owns this task.
#[derive(Debug)]
pub(crate) struct ComposeTask {
    /// Passes drawn before the quad, such as the content and the mask.
    pub(crate) passes: Vec<RenderPass>,
    pub(crate) draw: DrawCall,
}

/// A post effect on the contents of a pass.
///
/// The pass is copied into `copy`. `first`, if any, renders from there into `scratch`,
/// and `last` writes the result back into the pass within `region`.
#[derive(Debug)]
pub(crate) struct EffectTask {
    pub(crate) kind: EffectProgram,
    pub(crate) region: RenderRegion,
    pub(crate) copy: RenderTarget,
    pub(crate) scratch: RenderTarget,
    pub(crate) first: Option<DrawCall>,
    pub(crate) last: DrawCall,
}

#[derive(Debug)]
pub(crate) enum RenderTask {
    /// Non-overlapping triangles.
    Draw(DrawCall),
    /// Solid fills sharing one draw.
    SolidBatch(SolidBatch),
    /// Overlapping fans counted into the stencil buffer, then covered where the count
    /// passes the fill rule.
    StencilFill {
        stencil: DrawCall,
        cover: DrawCall,
        rule: FillRule,
    },
    /// Overlapping stroke triangles, covered once per pixel.
    Stroke { stencil: DrawCall, cover: DrawCall },
    /// Writes `cover`'s depth everywhere outside the clip geometry so that the clipped
    /// draw, one step below, fails there.
    ///
    /// The clip is kept in the depth buffer, not the stencil buffer. Stencil only finds the
    /// outside and is zeroed again by the cover, so a clipped stencil fill or stroke still
    /// starts from a clean count.
    Clip {
        stencil: DrawCall,
        cover: DrawCall,
        rule: FillRule,
    },
    Compose(ComposeTask),
    /// Copies the pass so that the programs of `task` can read the destination.
    ComplexBlend {
        copy: RenderTarget,
        task: Box<RenderTask>,
    },
    Effect(EffectTask),
}

/// The stencil mask that makes a count pass the fill rule.
fn rule_mask(rule: FillRule) -> u32 {
    match rule {
        FillRule::NonZero => 0xff,
        FillRule::EvenOdd => 0x1,
    }
}

/// Put the pipeline in the state tasks start from.
pub(crate) fn reset_state<G: Gl>(gl: &mut G) {
    gl.enable(gl::DEPTH_TEST);
    gl.depth_func(gl::GREATER);
    gl.depth_mask(true);
    gl.enable(gl::STENCIL_TEST);
    gl.stencil_func(gl::ALWAYS, 0, 0xff);
    gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::KEEP, gl::KEEP, gl::KEEP);
    gl.enable(gl::BLEND);
    gl.blend_func(gl::ONE, gl::ONE_MINUS_SRC_ALPHA);
    gl.color_mask(true, true, true, true);
    gl.enable(gl::SCISSOR_TEST);
}

fn count_winding<G: Gl>(gl: &mut G) {
    gl.stencil_func(gl::ALWAYS, 0, 0xff);
    gl.stencil_op_separate(gl::FRONT, gl::KEEP, gl::KEEP, gl::INCR_WRAP);
    gl.stencil_op_separate(gl::BACK, gl::KEEP, gl::KEEP, gl::DECR_WRAP);
}

fn restore_stencil<G: Gl>(gl: &mut G) {
    gl.stencil_func(gl::ALWAYS, 0, 0xff);
    gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::KEEP, gl::KEEP, gl::KEEP);
    gl.color_mask(true, true, true, true);
    gl.depth_mask(true);
}

impl RenderTask {
    pub(crate) fn run<G: Gl>(&self, gl: &mut G, target: &RenderTarget, depth_scale: f32) {
        match self {
            Self::Draw(draw) => draw.draw(gl, target, depth_scale),
            Self::SolidBatch(batch) => {
                // Every fill of the batch sits at one depth, so none may occlude another.
                gl.depth_mask(false);
                batch.draw.draw(gl, target, depth_scale);
                gl.depth_mask(true);
            }
            Self::StencilFill {
                stencil,
                cover,
                rule,
            } => {
                gl.color_mask(false, false, false, false);
                gl.depth_mask(false);
                count_winding(gl);
                stencil.draw(gl, target, depth_scale);

                gl.color_mask(true, true, true, true);
                gl.depth_mask(true);
                gl.stencil_func(gl::NOTEQUAL, 0, rule_mask(*rule));
                gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::ZERO, gl::ZERO, gl::ZERO);
                cover.draw(gl, target, depth_scale);
                restore_stencil(gl);
            }
            Self::Stroke { stencil, cover } => {
                gl.color_mask(false, false, false, false);
                gl.depth_mask(false);
                gl.stencil_func(gl::ALWAYS, 1, 0xff);
                gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::KEEP, gl::KEEP, gl::REPLACE);
                stencil.draw(gl, target, depth_scale);

                gl.color_mask(true, true, true, true);
                gl.depth_mask(true);
                gl.stencil_func(gl::EQUAL, 1, 0xff);
                gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::ZERO, gl::ZERO, gl::ZERO);
                cover.draw(gl, target, depth_scale);
                restore_stencil(gl);
            }
            Self::Clip {
                stencil,
                cover,
                rule,
            } => {
                gl.color_mask(false, false, false, false);
                gl.depth_mask(false);
                gl.depth_func(gl::ALWAYS);
                count_winding(gl);
                stencil.draw(gl, target, depth_scale);

                gl.depth_mask(true);
                gl.stencil_func(gl::EQUAL, 0, rule_mask(*rule));
                gl.stencil_op_separate(gl::FRONT_AND_BACK, gl::ZERO, gl::ZERO, gl::ZERO);
                cover.draw(gl, target, depth_scale);
                gl.depth_func(gl::GREATER);
                restore_stencil(gl);
            }
            Self::Compose(compose) => {
                for pass in &compose.passes {
                    pass.run(gl);
                }
                gl.bind_framebuffer(gl::FRAMEBUFFER, target.fbo);
                compose.draw.draw(gl, target, depth_scale);
            }
            Self::ComplexBlend { copy, task } => {
                target.copy_into(gl, copy);
                gl.bind_framebuffer(gl::FRAMEBUFFER, target.fbo);
                task.run(gl, target, depth_scale);
            }
            Self::Effect(effect) => effect.run(gl, target),
        }
    }

    /// Number of draw calls, nested passes included.
    pub(crate) fn draws(&self) -> usize {
        match self {
            Self::Draw(_) | Self::SolidBatch(_) => 1,
            Self::StencilFill { .. } | Self::Stroke { .. } | Self::Clip { .. } => 2,
            Self::Compose(compose) => {
                1 + compose.passes.iter().map(RenderPass::draws).sum::<usize>()
            }
            Self::ComplexBlend { task, .. } => task.draws(),
            Self::Effect(effect) => 1 + usize::from(effect.first.is_some()),
        }
    }

    /// Upload the vertices of every batch, nested passes included.
    pub(crate) fn stage(&mut self, stage: &mut StageBuffer) {
        match self {
            Self::SolidBatch(batch) => batch.stage(stage),
            Self::Compose(compose) => {
                for pass in &mut compose.passes {
                    pass.stage(stage);
                }
            }
            Self::ComplexBlend { task, .. } => task.stage(stage),
            _ => {}
        }
    }

    /// Hand every target owned for this frame to `out`.
    pub(crate) fn frame_targets(&self, out: &mut Vec<RenderTarget>) {
        match self {
            Self::Compose(compose) => {
                for pass in &compose.passes {
                    out.push(pass.target);
                    pass.frame_targets(out);
                }
            }
            Self::ComplexBlend { copy, task } => {
                out.push(*copy);
                task.frame_targets(out);
            }
            _ => {}
        }
    }
}

impl EffectTask {
    fn run<G: Gl>(&self, gl: &mut G, target: &RenderTarget) {
        log::trace!("effect {:?} over {:?}", self.kind, self.region);
        target.copy_into(gl, &self.copy);
        gl.disable(gl::DEPTH_TEST);
        gl.disable(gl::STENCIL_TEST);
        gl.disable(gl::BLEND);

        if let Some(first) = &self.first {
            gl.bind_framebuffer(gl::FRAMEBUFFER, self.scratch.fbo);
            gl.disable(gl::SCISSOR_TEST);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(gl::COLOR_BUFFER_BIT);
            gl.enable(gl::SCISSOR_TEST);
            first.draw(gl, &self.scratch, 0.0);
            self.scratch.resolve(gl);
        }

        gl.bind_framebuffer(gl::FRAMEBUFFER, target.fbo);
        self.last.draw(gl, target, 0.0);
        reset_state(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};
    use crate::program::ProgramCache;
    use crate::shader::ProgramKey;

    fn draw_call(gl: &mut RecordingGl, depth: u32) -> DrawCall {
        let program = ProgramCache::new(false)
            .get(gl, ProgramKey::Color)
            .unwrap();
        DrawCall {
            program,
            bindings: smallvec![Binding::Uniform {
                block: Block::ColorInfo,
                buffer: 7,
                offset: 256,
                size: 16,
            }],
            layouts: smallvec![VertexLayout {
                index: 0,
                size: 2,
                stride: 8,
                offset: 0,
            }],
            index_offset: 12,
            index_count: 6,
            scissor: RenderRegion::new(10, 20, 30, 60),
            depth,
            blend: BlendState::SrcOver,
        }
    }

    fn target(gl: &mut RecordingGl) -> RenderTarget {
        RenderTarget::new(gl, 100, 100, 4)
    }

    #[test]
    fn draw_binds_and_flips_the_scissor() {
        let mut gl = RecordingGl::new();
        let target = target(&mut gl);
        let draw = draw_call(&mut gl, 3);
        gl.clear_log();
        draw.draw(&mut gl, &target, 0.25);

        assert_eq!(gl.calls[0], GlCall::Scissor([10, 40, 20, 40]));
        assert!(gl.calls.contains(&GlCall::BindBufferRange {
            index: Block::ColorInfo.binding(),
            buffer: 7,
            offset: 256,
            size: 16,
        }));
        assert!(gl
            .calls
            .iter()
            .any(|c| matches!(c, GlCall::Uniform1f(_, d) if (*d - 0.75).abs() < 1e-6)));
        assert!(gl.calls.contains(&GlCall::DrawElements {
            count: 6,
            offset: 12
        }));
        assert_eq!(gl.count(|c| matches!(c, GlCall::BlendFunc(..))), 0);
    }

    #[test]
    fn stencil_fill_counts_then_covers() {
        let mut gl = RecordingGl::new();
        let target = target(&mut gl);
        let task = RenderTask::StencilFill {
            stencil: draw_call(&mut gl, 1),
            cover: draw_call(&mut gl, 1),
            rule: FillRule::EvenOdd,
        };
        gl.clear_log();
        task.run(&mut gl, &target, 0.5);

        assert_eq!(gl.draws(), 2);
        let first_draw = gl
            .calls
            .iter()
            .position(|c| matches!(c, GlCall::DrawElements { .. }))
            .unwrap();
        assert!(gl.calls[..first_draw].contains(&GlCall::StencilOp {
            face: gl::BACK,
            dppass: gl::DECR_WRAP,
        }));
        assert!(gl.calls[..first_draw].contains(&GlCall::ColorMask(false)));
        assert!(gl.calls[first_draw..].contains(&GlCall::StencilFunc {
            func: gl::NOTEQUAL,
            reference: 0,
            mask: 1,
        }));
        assert_eq!(gl.calls.last(), Some(&GlCall::DepthMask(true)));
    }

    #[test]
    fn stroke_covers_each_pixel_once() {
        let mut gl = RecordingGl::new();
        let target = target(&mut gl);
        let task = RenderTask::Stroke {
            stencil: draw_call(&mut gl, 2),
            cover: draw_call(&mut gl, 2),
        };
        gl.clear_log();
        task.run(&mut gl, &target, 0.5);
        assert!(gl.calls.contains(&GlCall::StencilFunc {
            func: gl::EQUAL,
            reference: 1,
            mask: 0xff,
        }));
        assert!(gl.calls.contains(&GlCall::StencilOp {
            face: gl::FRONT_AND_BACK,
            dppass: gl::REPLACE,
        }));
    }

    #[test]
    fn clip_writes_depth_outside() {
        let mut gl = RecordingGl::new();
        let target = target(&mut gl);
        let task = RenderTask::Clip {
            stencil: draw_call(&mut gl, 4),
            cover: draw_call(&mut gl, 4),
            rule: FillRule::NonZero,
        };
        gl.clear_log();
        task.run(&mut gl, &target, 0.1);
        let always = gl
            .calls
            .iter()
            .position(|c| *c == GlCall::DepthFunc(gl::ALWAYS))
            .unwrap();
        let greater = gl
            .calls
            .iter()
            .position(|c| *c == GlCall::DepthFunc(gl::GREATER))
            .unwrap();
        assert!(always < greater);
        assert_eq!(
            gl.calls[always..greater]
                .iter()
                .filter(|c| matches!(c, GlCall::DrawElements { .. }))
                .count(),
            2
        );
        assert!(gl.calls.contains(&GlCall::StencilFunc {
            func: gl::EQUAL,
            reference: 0,
            mask: 0xff,
        }));
    }

    #[test]
    fn additive_blend_is_restored() {
        let mut gl = RecordingGl::new();
        let target = target(&mut gl);
        let mut draw = draw_call(&mut gl, 1);
        draw.blend = BlendState::Additive;
        gl.clear_log();
        draw.draw(&mut gl, &target, 1.0);
        assert_eq!(
            gl.count(|c| matches!(c, GlCall::BlendFunc(gl::ONE, gl::ONE))),
            1
        );
        assert_eq!(
            gl.count(|c| matches!(c, GlCall::BlendFunc(gl::ONE, gl::ONE_MINUS_SRC_ALPHA))),
            1
        );
    }
}
