// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen framebuffers.
//!
//! Every target is multisampled for drawing and resolves into a plain texture for
//! sampling. Targets have the size of the surface, so a device pixel has the same
//! coordinates in all of them.

use crate::gl::{self, Gl};

/// A multisampled framebuffer with a depth-stencil buffer and a resolve texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RenderTarget {
    pub(crate) fbo: u32,
    color: u32,
    depth_stencil: u32,
    resolve_fbo: u32,
    /// The resolved color, sampled by compose and effect programs.
    pub(crate) texture: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl RenderTarget {
    pub(crate) fn new<G: Gl>(gl: &mut G, width: u32, height: u32, samples: u8) -> Self {
        let (w, h) = (width as i32, height as i32);

        let fbo = gl.create_framebuffer();
        gl.bind_framebuffer(gl::FRAMEBUFFER, fbo);
        let color = gl.create_renderbuffer();
        gl.bind_renderbuffer(color);
        gl.renderbuffer_storage_multisample(i32::from(samples), gl::RGBA8, w, h);
        gl.framebuffer_renderbuffer(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, color);
        let depth_stencil = gl.create_renderbuffer();
        gl.bind_renderbuffer(depth_stencil);
        gl.renderbuffer_storage_multisample(i32::from(samples), gl::DEPTH24_STENCIL8, w, h);
        gl.framebuffer_renderbuffer(gl::FRAMEBUFFER, gl::DEPTH_STENCIL_ATTACHMENT, depth_stencil);
        gl.bind_renderbuffer(0);

        let texture = gl.create_texture();
        gl.bind_texture(gl::TEXTURE_2D, texture);
        gl.tex_image_2d(
            gl::TEXTURE_2D,
            gl::RGBA8,
            w,
            h,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            None,
        );
        set_sampling(gl);
        gl.bind_texture(gl::TEXTURE_2D, 0);

        let resolve_fbo = gl.create_framebuffer();
        gl.bind_framebuffer(gl::FRAMEBUFFER, resolve_fbo);
        gl.framebuffer_texture_2d(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, texture);
        gl.bind_framebuffer(gl::FRAMEBUFFER, 0);

        log::debug!("created {width}x{height} target with {samples} samples");
        Self {
            fbo,
            color,
            depth_stencil,
            resolve_fbo,
            texture,
            width,
            height,
        }
    }

    fn full(&self) -> [i32; 4] {
        [0, 0, self.width as i32, self.height as i32]
    }

    /// Copy the multisampled color into [`texture`](Self::texture).
    pub(crate) fn resolve<G: Gl>(&self, gl: &mut G) {
        self.copy_to(gl, self.resolve_fbo);
    }

    /// Resolve the color of this target into the texture of `other`.
    pub(crate) fn copy_into<G: Gl>(&self, gl: &mut G, other: &Self) {
        self.copy_to(gl, other.resolve_fbo);
    }

    /// Resolve into a framebuffer owned by someone else, such as the host's.
    pub(crate) fn copy_to<G: Gl>(&self, gl: &mut G, fbo: u32) {
        gl.bind_framebuffer(gl::READ_FRAMEBUFFER, self.fbo);
        gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, fbo);
        gl.blit_framebuffer(self.full(), self.full(), gl::COLOR_BUFFER_BIT, gl::NEAREST);
        gl.bind_framebuffer(gl::READ_FRAMEBUFFER, 0);
        gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, 0);
    }

    pub(crate) fn delete<G: Gl>(&self, gl: &mut G) {
        gl.delete_framebuffer(self.fbo);
        gl.delete_framebuffer(self.resolve_fbo);
        gl.delete_renderbuffer(self.color);
        gl.delete_renderbuffer(self.depth_stencil);
        gl.delete_texture(self.texture);
    }
}

/// Clamped, linearly filtered sampling for the currently bound texture.
pub(crate) fn set_sampling<G: Gl>(gl: &mut G) {
    gl.tex_parameter(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE);
    gl.tex_parameter(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE);
    gl.tex_parameter(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR);
    gl.tex_parameter(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR);
}

/// Targets created so far, handed out again once released.
#[derive(Debug)]
pub(crate) struct TargetPool {
    free: Vec<RenderTarget>,
    in_use: usize,
    samples: u8,
}

impl TargetPool {
    pub(crate) fn new(samples: u8) -> Self {
        Self {
            free: Vec::new(),
            in_use: 0,
            samples,
        }
    }

    pub(crate) fn acquire<G: Gl>(&mut self, gl: &mut G, width: u32, height: u32) -> RenderTarget {
        self.in_use += 1;
        match self
            .free
            .iter()
            .position(|t| t.width == width && t.height == height)
        {
            Some(idx) => self.free.swap_remove(idx),
            None => RenderTarget::new(gl, width, height, self.samples),
        }
    }

    pub(crate) fn release(&mut self, target: RenderTarget) {
        debug_assert!(!self.free.contains(&target), "target released twice");
        self.in_use = self.in_use.saturating_sub(1);
        self.free.push(target);
    }

    /// Targets currently handed out.
    pub(crate) fn in_use(&self) -> usize {
        self.in_use
    }

    /// Delete the free targets that do not match `width` by `height`.
    pub(crate) fn trim<G: Gl>(&mut self, gl: &mut G, width: u32, height: u32) {
        self.free.retain(|t| {
            let keep = t.width == width && t.height == height;
            if !keep {
                t.delete(gl);
            }
            keep
        });
    }

    /// Delete every free target.
    pub(crate) fn delete<G: Gl>(&mut self, gl: &mut G) {
        for target in self.free.drain(..) {
            target.delete(gl);
        }
    }
}
