// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ThorVG GPU back-end.
//!
//! [`GpuRenderer`] implements [`RenderMethod`](tvg_common::render::RenderMethod) by
//! tessellating shapes into triangle meshes and drawing them through OpenGL 3.3 or
//! OpenGL ES 3.0 / WebGL2. The host owns the context: the renderer reaches GL only
//! through the [`Gl`](gl::Gl) trait, and draws into a framebuffer handed over with
//! [`GpuRenderer::set_target`].
//!
//! Fills without self-intersections are swept into non-overlapping triangles. Anything
//! the sweep rejects is fanned and resolved with the stencil buffer. Strokes are
//! expanded on the CPU. Clips, masks, complex blending and scene effects all go
//! through offscreen targets that share the size of the surface.
//!
//! [`gl::RecordingGl`] records calls instead of issuing them, for tests and for hosts
//! that want to inspect a frame.
// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    reason = "Surface sizes and buffer offsets fit the 32-bit GL types."
)]

mod buffer;
mod effect;
mod engine;
mod geometry;
pub mod gl;
mod paint;
mod pass;
mod program;
mod renderer;
mod shader;
mod stroker;
mod target;
mod task;
mod tessellator;

pub use engine::{init, term};
pub use program::ProgramError;
pub use renderer::{CompositorId, DataId, GlConfig, GpuRenderer, TargetError};
pub use shader::{BlendSource, EffectProgram, ProgramKey};
pub use tessellator::{fan, is_convex, tessellate, Mesh, TessellationError};
pub use tvg_common;
