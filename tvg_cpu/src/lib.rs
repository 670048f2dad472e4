// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ThorVG software back-end.
//!
//! [`SoftwareRenderer`] implements [`RenderMethod`](tvg_common::render::RenderMethod) on
//! top of the scanline coverage from [`tvg_common`]. It draws into a caller-owned pixel
//! buffer in any of the supported color spaces, including 8-bit grayscale.
//!
//! Shapes and images are prepared on a pool of worker threads, each with its own
//! [`MemPool`](tvg_common::mempool::MemPool). The pool is process-wide: it is started by
//! [`init`] or by the first renderer and lives until [`term`] is called with no renderer
//! alive.
//!
//! # Features
//!
//! - `multithreading` (enabled by default): prepare shapes on worker threads. Without it,
//!   everything runs on the calling thread.
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
    reason = "Pixel channels are packed into u8 after clamping; coordinates fit in i32."
)]

mod blend;
mod dispatch;
mod effect;
mod engine;
mod fill;
mod image;
mod mask;
mod pixel;
mod raster;
mod renderer;
mod surface;
mod task;

pub use engine::{init, term};
pub use renderer::{CompositorId, DataId, RenderSettings, SoftwareRenderer};
pub use surface::{Pixels, Surface, TargetError};
pub use tvg_common;
