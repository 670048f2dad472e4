// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render passes: the tasks drawn into one target.

use crate::buffer::StageBuffer;
use crate::gl::{self, Gl};
use crate::target::RenderTarget;
use crate::task::{reset_state, RenderTask};

/// Tasks recorded for one target, in scene order.
///
/// Draw depths are handed out in increasing order and normalized when the pass runs, so
/// every fragment lands in `[0, 1)` and later draws win the `GREATER` depth test.
#[derive(Debug)]
pub(crate) struct RenderPass {
    pub(crate) target: RenderTarget,
    tasks: Vec<RenderTask>,
    depth: u32,
    /// Color the pass starts from. `None` keeps what the target holds.
    clear: Option<[f32; 4]>,
}

impl RenderPass {
    pub(crate) fn new(target: RenderTarget, clear: Option<[f32; 4]>) -> Self {
        Self {
            target,
            tasks: Vec::new(),
            depth: 0,
            clear,
        }
    }

    /// Reserve the next draw depth.
    pub(crate) fn next_depth(&mut self) -> u32 {
        self.depth += 1;
        self.depth
    }

    /// Record `task`. A solid batch directly after a compatible one joins it.
    pub(crate) fn push(&mut self, task: RenderTask) {
        match task {
            RenderTask::SolidBatch(next) => match self.tasks.last_mut() {
                Some(RenderTask::SolidBatch(batch)) if batch.accepts(&next) => batch.merge(next),
                _ => self.tasks.push(RenderTask::SolidBatch(next)),
            },
            task => self.tasks.push(task),
        }
    }

    /// Upload the vertices held by batches, ahead of the stage flush.
    pub(crate) fn stage(&mut self, stage: &mut StageBuffer) {
        for task in &mut self.tasks {
            task.stage(stage);
        }
    }

    /// Start from `color` instead of what the target holds.
    pub(crate) fn set_clear(&mut self, color: [f32; 4]) {
        self.clear = Some(color);
    }

    fn depth_scale(&self) -> f32 {
        1.0 / (self.depth + 1) as f32
    }

    /// Draw every task into the target and resolve it for sampling.
    pub(crate) fn run<G: Gl>(&self, gl: &mut G) {
        let target = &self.target;
        gl.bind_framebuffer(gl::FRAMEBUFFER, target.fbo);
        gl.viewport(0, 0, target.width as i32, target.height as i32);
        reset_state(gl);

        gl.disable(gl::SCISSOR_TEST);
        let mut mask = gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT;
        if let Some([r, g, b, a]) = self.clear {
            gl.clear_color(r, g, b, a);
            mask |= gl::COLOR_BUFFER_BIT;
        }
        gl.clear_depth(0.0);
        gl.clear_stencil(0);
        gl.clear(mask);
        gl.enable(gl::SCISSOR_TEST);

        let scale = self.depth_scale();
        for task in &self.tasks {
            task.run(gl, target, scale);
        }
        target.resolve(gl);
    }

    /// Number of draw calls, nested passes included.
    pub(crate) fn draws(&self) -> usize {
        self.tasks.iter().map(RenderTask::draws).sum()
    }

    /// Targets owned by nested passes and blend copies, excluding this pass's own.
    pub(crate) fn frame_targets(&self, out: &mut Vec<RenderTarget>) {
        for task in &self.tasks {
            task.frame_targets(out);
        }
    }
}
