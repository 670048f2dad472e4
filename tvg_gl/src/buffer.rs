// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame staging of vertex, index and uniform data.

use bytemuck::Pod;

use crate::gl::{self, Gl};

/// Bytes collected on the CPU during a frame and uploaded once before drawing.
///
/// Vertices and uniform blocks share one buffer, indices live in a second one so the
/// layout also works on WebGL, which forbids binding one buffer to both targets.
#[derive(Debug)]
pub(crate) struct StageBuffer {
    data: Vec<u8>,
    indices: Vec<u8>,
    /// Alignment of uniform block offsets, `GL_UNIFORM_BUFFER_OFFSET_ALIGNMENT`.
    uniform_alignment: usize,
    vao: u32,
    data_buffer: u32,
    index_buffer: u32,
}

impl StageBuffer {
    pub(crate) fn new(uniform_alignment: usize) -> Self {
        Self {
            data: Vec::new(),
            indices: Vec::new(),
            uniform_alignment: uniform_alignment.max(4),
            vao: 0,
            data_buffer: 0,
            index_buffer: 0,
        }
    }

    /// Append vertex data, returning its byte offset.
    pub(crate) fn push<T: Pod>(&mut self, data: &[T]) -> usize {
        self.push_aligned(bytemuck::cast_slice(data), 4)
    }

    /// Append a uniform block, returning its byte offset.
    pub(crate) fn push_uniform<T: Pod>(&mut self, block: &T) -> usize {
        let alignment = self.uniform_alignment;
        self.push_aligned(bytemuck::bytes_of(block), alignment)
    }

    /// Append indices, returning the byte offset of the first one.
    pub(crate) fn push_indices(&mut self, indices: &[u32]) -> usize {
        let offset = self.indices.len();
        self.indices.extend_from_slice(bytemuck::cast_slice(indices));
        offset
    }

    fn push_aligned(&mut self, bytes: &[u8], alignment: usize) -> usize {
        let offset = self.data.len().next_multiple_of(alignment);
        self.data.resize(offset, 0);
        self.data.extend_from_slice(bytes);
        offset
    }

    /// GL name of the buffer uniform blocks are pushed to. Zero before the first flush.
    pub(crate) fn buffer_id(&self) -> u32 {
        self.data_buffer
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty() && self.indices.is_empty()
    }

    /// Create the GL objects if needed. Names are stable afterwards, so tasks may record
    /// them before the data is uploaded.
    pub(crate) fn ensure<G: Gl>(&mut self, gl: &mut G) {
        if self.data_buffer == 0 {
            self.data_buffer = gl.create_buffer();
            self.index_buffer = gl.create_buffer();
            self.vao = gl.create_vertex_array();
        }
    }

    /// Upload everything staged so far.
    pub(crate) fn flush<G: Gl>(&mut self, gl: &mut G) {
        if self.is_empty() {
            return;
        }
        self.ensure(gl);
        gl.bind_buffer(gl::ARRAY_BUFFER, self.data_buffer);
        gl.buffer_data(gl::ARRAY_BUFFER, &self.data, gl::DYNAMIC_DRAW);
        gl.bind_buffer(gl::ARRAY_BUFFER, 0);
        gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, self.index_buffer);
        gl.buffer_data(gl::ELEMENT_ARRAY_BUFFER, &self.indices, gl::DYNAMIC_DRAW);
        gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
        log::trace!(
            "uploaded {} data and {} index bytes",
            self.data.len(),
            self.indices.len()
        );
    }

    pub(crate) fn bind<G: Gl>(&self, gl: &mut G) {
        gl.bind_vertex_array(self.vao);
        gl.bind_buffer(gl::ARRAY_BUFFER, self.data_buffer);
        gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, self.index_buffer);
    }

    pub(crate) fn unbind<G: Gl>(&self, gl: &mut G) {
        gl.bind_vertex_array(0);
        gl.bind_buffer(gl::ARRAY_BUFFER, 0);
        gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
    }

    /// Drop the staged bytes, keeping the allocations and GL objects.
    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.indices.clear();
    }

    pub(crate) fn delete<G: Gl>(&mut self, gl: &mut G) {
        if self.data_buffer != 0 {
            gl.delete_buffer(self.data_buffer);
            gl.delete_buffer(self.index_buffer);
            gl.delete_vertex_array(self.vao);
            self.data_buffer = 0;
            self.index_buffer = 0;
            self.vao = 0;
        }
    }
}
