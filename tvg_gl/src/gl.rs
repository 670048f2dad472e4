// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The OpenGL entry points the renderer issues.
//!
//! The renderer never loads GL itself. The host hands it an implementation of [`Gl`]
//! bound to the context it owns, so the same code drives a desktop GL 3.3 context, a
//! GLES 3.0 context, or a WebGL2 context. [`RecordingGl`] implements the trait without a
//! driver and keeps a log of every call.

use std::collections::HashMap;

#[allow(missing_docs, reason = "the names are the GL enumerants")]
mod consts {
    pub const TRIANGLES: u32 = 0x0004;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const UNSIGNED_INT: u32 = 0x1405;

    pub const ARRAY_BUFFER: u32 = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
    pub const UNIFORM_BUFFER: u32 = 0x8A11;
    pub const STATIC_DRAW: u32 = 0x88E4;
    pub const DYNAMIC_DRAW: u32 = 0x88E8;

    pub const TEXTURE_2D: u32 = 0x0DE1;
    pub const TEXTURE0: u32 = 0x84C0;
    pub const RGBA: u32 = 0x1908;
    pub const RGBA8: u32 = 0x8058;
    pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
    pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
    pub const TEXTURE_WRAP_S: u32 = 0x2802;
    pub const TEXTURE_WRAP_T: u32 = 0x2803;
    pub const CLAMP_TO_EDGE: u32 = 0x812F;
    pub const NEAREST: u32 = 0x2600;
    pub const LINEAR: u32 = 0x2601;

    pub const FRAMEBUFFER: u32 = 0x8D40;
    pub const READ_FRAMEBUFFER: u32 = 0x8CA8;
    pub const DRAW_FRAMEBUFFER: u32 = 0x8CA9;
    pub const RENDERBUFFER: u32 = 0x8D41;
    pub const COLOR_ATTACHMENT0: u32 = 0x8CE0;
    pub const DEPTH_STENCIL_ATTACHMENT: u32 = 0x821A;
    pub const DEPTH24_STENCIL8: u32 = 0x88F0;

    pub const DEPTH_BUFFER_BIT: u32 = 0x0100;
    pub const STENCIL_BUFFER_BIT: u32 = 0x0400;
    pub const COLOR_BUFFER_BIT: u32 = 0x4000;

    pub const FRAGMENT_SHADER: u32 = 0x8B30;
    pub const VERTEX_SHADER: u32 = 0x8B31;

    pub const BLEND: u32 = 0x0BE2;
    pub const DEPTH_TEST: u32 = 0x0B71;
    pub const STENCIL_TEST: u32 = 0x0B90;
    pub const SCISSOR_TEST: u32 = 0x0C11;

    pub const ZERO: u32 = 0;
    pub const ONE: u32 = 1;
    pub const ONE_MINUS_SRC_ALPHA: u32 = 0x0303;

    pub const LESS: u32 = 0x0201;
    pub const EQUAL: u32 = 0x0202;
    pub const GREATER: u32 = 0x0204;
    pub const NOTEQUAL: u32 = 0x0205;
    pub const ALWAYS: u32 = 0x0207;

    pub const KEEP: u32 = 0x1E00;
    pub const REPLACE: u32 = 0x1E01;
    pub const INCR_WRAP: u32 = 0x8507;
    pub const DECR_WRAP: u32 = 0x8508;

    pub const FRONT: u32 = 0x0404;
    pub const BACK: u32 = 0x0405;
    pub const FRONT_AND_BACK: u32 = 0x0408;
}

pub use consts::*;

/// The subset of OpenGL 3.3 / OpenGL ES 3.0 used by the renderer.
///
/// Object names are plain `u32`s, with `0` standing for "no object" as in GL.
/// Implementations are expected to be bound to a current context.
#[allow(missing_docs, reason = "each method is the GL function of the same name")]
pub trait Gl {
    /// Make the context current on the calling thread.
    ///
    /// Called before every batch of GL work. Contexts that cannot be switched, such as
    /// WebGL, keep the default.
    fn make_current(&mut self) -> bool {
        true
    }

    fn create_buffer(&mut self) -> u32;
    fn delete_buffer(&mut self, buffer: u32);
    fn bind_buffer(&mut self, target: u32, buffer: u32);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn bind_buffer_range(
        &mut self,
        target: u32,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    );

    fn create_vertex_array(&mut self) -> u32;
    fn delete_vertex_array(&mut self, vao: u32);
    fn bind_vertex_array(&mut self, vao: u32);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// Float attributes, never normalized.
    fn vertex_attrib_pointer(&mut self, index: u32, size: i32, stride: i32, offset: usize);

    fn create_texture(&mut self) -> u32;
    fn delete_texture(&mut self, texture: u32);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: u32, texture: u32);
    #[expect(clippy::too_many_arguments, reason = "mirrors glTexImage2D")]
    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    fn tex_parameter(&mut self, target: u32, pname: u32, param: u32);

    fn create_framebuffer(&mut self) -> u32;
    fn delete_framebuffer(&mut self, fbo: u32);
    fn bind_framebuffer(&mut self, target: u32, fbo: u32);
    fn framebuffer_texture_2d(&mut self, target: u32, attachment: u32, texture: u32);
    fn create_renderbuffer(&mut self) -> u32;
    fn delete_renderbuffer(&mut self, rbo: u32);
    fn bind_renderbuffer(&mut self, rbo: u32);
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    fn framebuffer_renderbuffer(&mut self, target: u32, attachment: u32, rbo: u32);
    /// Rectangles are `[x0, y0, x1, y1]`.
    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32);

    fn create_shader(&mut self, kind: u32) -> u32;
    fn shader_source(&mut self, shader: u32, source: &str);
    fn compile_shader(&mut self, shader: u32);
    fn shader_compile_status(&mut self, shader: u32) -> bool;
    fn shader_info_log(&mut self, shader: u32) -> String;
    fn delete_shader(&mut self, shader: u32);
    fn create_program(&mut self) -> u32;
    fn attach_shader(&mut self, program: u32, shader: u32);
    fn link_program(&mut self, program: u32);
    fn program_link_status(&mut self, program: u32) -> bool;
    fn program_info_log(&mut self, program: u32) -> String;
    fn delete_program(&mut self, program: u32);
    fn use_program(&mut self, program: u32);
    fn uniform_block_index(&mut self, program: u32, name: &str) -> Option<u32>;
    fn uniform_block_binding(&mut self, program: u32, index: u32, binding: u32);
    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32>;
    fn uniform_1i(&mut self, location: i32, value: i32);
    fn uniform_1f(&mut self, location: i32, value: f32);

    fn viewport(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn scissor(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn blend_func(&mut self, src: u32, dst: u32);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, write: bool);
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32);
    fn stencil_op_separate(&mut self, face: u32, sfail: u32, dpfail: u32, dppass: u32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, s: i32);
    fn clear(&mut self, mask: u32);
    /// `offset` is in bytes into the bound element buffer.
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: usize);
}

/// A GL call captured by [`RecordingGl`].
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs, reason = "variants mirror the trait methods")]
pub enum GlCall {
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(u32, u32),
    BufferData { target: u32, len: usize },
    BindBufferRange { index: u32, buffer: u32, offset: usize, size: usize },
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(u32),
    EnableVertexAttrib(u32),
    DisableVertexAttrib(u32),
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: usize },
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture(u32),
    TexImage2d { width: i32, height: i32, len: usize },
    TexParameter(u32, u32),
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer(u32, u32),
    FramebufferTexture2d(u32),
    CreateRenderbuffer(u32),
    DeleteRenderbuffer(u32),
    BindRenderbuffer(u32),
    RenderbufferStorage { samples: i32, format: u32, width: i32, height: i32 },
    FramebufferRenderbuffer(u32, u32),
    BlitFramebuffer { src: [i32; 4], dst: [i32; 4], mask: u32 },
    CreateShader(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(u32),
    UniformBlockBinding { program: u32, index: u32, binding: u32 },
    Uniform1i(i32, i32),
    Uniform1f(i32, f32),
    Viewport([i32; 4]),
    Scissor([i32; 4]),
    Enable(u32),
    Disable(u32),
    BlendFunc(u32, u32),
    ColorMask(bool),
    DepthFunc(u32),
    DepthMask(bool),
    StencilFunc { func: u32, reference: i32, mask: u32 },
    StencilOp { face: u32, dppass: u32 },
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    DrawElements { count: i32, offset: usize },
}

/// A [`Gl`] implementation that records calls instead of issuing them.
///
/// Object names are handed out from a counter, shaders compile unless their source
/// contains [`fail_compile`](Self::fail_compile), and programs link unless
/// [`fail_link`](Self::fail_link) is set.
#[derive(Debug, Default)]
pub struct RecordingGl {
    /// Every call so far, in order.
    pub calls: Vec<GlCall>,
    /// Shaders whose source contains this text fail to compile.
    pub fail_compile: Option<String>,
    /// Programs fail to link.
    pub fail_link: bool,
    next_name: u32,
    sources: HashMap<u32, String>,
    locations: HashMap<(u32, String), u32>,
}

impl RecordingGl {
    /// A recorder with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn location(&mut self, program: u32, name: &str) -> u32 {
        let next = self.locations.len() as u32;
        *self
            .locations
            .entry((program, name.to_owned()))
            .or_insert(next)
    }

    /// Number of recorded calls matching `f`.
    pub fn count(&self, f: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|call| f(call)).count()
    }

    /// Number of recorded draw calls.
    pub fn draws(&self) -> usize {
        self.count(|call| matches!(call, GlCall::DrawElements { .. }))
    }

    /// Forget every recorded call.
    pub fn clear_log(&mut self) {
        self.calls.clear();
    }
}

impl Gl for RecordingGl {
    fn create_buffer(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateBuffer(name));
        name
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: u32, buffer: u32) {
        self.calls.push(GlCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], _usage: u32) {
        self.calls.push(GlCall::BufferData {
            target,
            len: data.len(),
        });
    }

    fn bind_buffer_range(
        &mut self,
        _target: u32,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    ) {
        self.calls.push(GlCall::BindBufferRange {
            index,
            buffer,
            offset,
            size,
        });
    }

    fn create_vertex_array(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateVertexArray(name));
        name
    }

    fn delete_vertex_array(&mut self, vao: u32) {
        self.calls.push(GlCall::DeleteVertexArray(vao));
    }

    fn bind_vertex_array(&mut self, vao: u32) {
        self.calls.push(GlCall::BindVertexArray(vao));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(GlCall::EnableVertexAttrib(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(GlCall::DisableVertexAttrib(index));
    }

    fn vertex_attrib_pointer(&mut self, index: u32, size: i32, stride: i32, offset: usize) {
        self.calls.push(GlCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn create_texture(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateTexture(name));
        name
    }

    fn delete_texture(&mut self, texture: u32) {
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, _target: u32, texture: u32) {
        self.calls.push(GlCall::BindTexture(texture));
    }

    fn tex_image_2d(
        &mut self,
        _target: u32,
        _internal_format: u32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.calls.push(GlCall::TexImage2d {
            width,
            height,
            len: pixels.map_or(0, <[u8]>::len),
        });
    }

    fn tex_parameter(&mut self, _target: u32, pname: u32, param: u32) {
        self.calls.push(GlCall::TexParameter(pname, param));
    }

    fn create_framebuffer(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateFramebuffer(name));
        name
    }

    fn delete_framebuffer(&mut self, fbo: u32) {
        self.calls.push(GlCall::DeleteFramebuffer(fbo));
    }

    fn bind_framebuffer(&mut self, target: u32, fbo: u32) {
        self.calls.push(GlCall::BindFramebuffer(target, fbo));
    }

    fn framebuffer_texture_2d(&mut self, _target: u32, _attachment: u32, texture: u32) {
        self.calls.push(GlCall::FramebufferTexture2d(texture));
    }

    fn create_renderbuffer(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateRenderbuffer(name));
        name
    }

    fn delete_renderbuffer(&mut self, rbo: u32) {
        self.calls.push(GlCall::DeleteRenderbuffer(rbo));
    }

    fn bind_renderbuffer(&mut self, rbo: u32) {
        self.calls.push(GlCall::BindRenderbuffer(rbo));
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.calls.push(GlCall::RenderbufferStorage {
            samples,
            format: internal_format,
            width,
            height,
        });
    }

    fn framebuffer_renderbuffer(&mut self, _target: u32, attachment: u32, rbo: u32) {
        self.calls.push(GlCall::FramebufferRenderbuffer(attachment, rbo));
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, _filter: u32) {
        self.calls.push(GlCall::BlitFramebuffer { src, dst, mask });
    }

    fn create_shader(&mut self, _kind: u32) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateShader(name));
        name
    }

    fn shader_source(&mut self, shader: u32, source: &str) {
        self.sources.insert(shader, source.to_owned());
    }

    fn compile_shader(&mut self, shader: u32) {
        self.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&mut self, shader: u32) -> bool {
        match (&self.fail_compile, self.sources.get(&shader)) {
            (Some(needle), Some(source)) => !source.contains(needle.as_str()),
            _ => true,
        }
    }

    fn shader_info_log(&mut self, shader: u32) -> String {
        format!("shader {shader} rejected by the recorder")
    }

    fn delete_shader(&mut self, shader: u32) {
        self.sources.remove(&shader);
        self.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> u32 {
        let name = self.name();
        self.calls.push(GlCall::CreateProgram(name));
        name
    }

    fn attach_shader(&mut self, _program: u32, _shader: u32) {}

    fn link_program(&mut self, program: u32) {
        self.calls.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&mut self, _program: u32) -> bool {
        !self.fail_link
    }

    fn program_info_log(&mut self, program: u32) -> String {
        format!("program {program} rejected by the recorder")
    }

    fn delete_program(&mut self, program: u32) {
        self.calls.push(GlCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: u32) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn uniform_block_index(&mut self, program: u32, name: &str) -> Option<u32> {
        Some(self.location(program, name))
    }

    fn uniform_block_binding(&mut self, program: u32, index: u32, binding: u32) {
        self.calls.push(GlCall::UniformBlockBinding {
            program,
            index,
            binding,
        });
    }

    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
        Some(self.location(program, name) as i32)
    }

    fn uniform_1i(&mut self, location: i32, value: i32) {
        self.calls.push(GlCall::Uniform1i(location, value));
    }

    fn uniform_1f(&mut self, location: i32, value: f32) {
        self.calls.push(GlCall::Uniform1f(location, value));
    }

    fn viewport(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.calls.push(GlCall::Viewport([x, y, w, h]));
    }

    fn scissor(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.calls.push(GlCall::Scissor([x, y, w, h]));
    }

    fn enable(&mut self, cap: u32) {
        self.calls.push(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: u32) {
        self.calls.push(GlCall::Disable(cap));
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.calls.push(GlCall::BlendFunc(src, dst));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.calls.push(GlCall::ColorMask(r && g && b && a));
    }

    fn depth_func(&mut self, func: u32) {
        self.calls.push(GlCall::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.calls.push(GlCall::DepthMask(write));
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.calls.push(GlCall::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn stencil_op_separate(&mut self, face: u32, _sfail: u32, _dpfail: u32, dppass: u32) {
        self.calls.push(GlCall::StencilOp { face, dppass });
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.calls.push(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.calls.push(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, s: i32) {
        self.calls.push(GlCall::ClearStencil(s));
    }

    fn clear(&mut self, mask: u32) {
        self.calls.push(GlCall::Clear(mask));
    }

    fn draw_elements(&mut self, _mode: u32, count: i32, _ty: u32, offset: usize) {
        self.calls.push(GlCall::DrawElements { count, offset });
    }
}
