// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate includes the path processing shared by the ThorVG software rasterizer
//! ([`tvg_cpu`][tvg_cpu]) and the GPU rasterizer ([`tvg_gl`][tvg_gl]).
//!
//! # Usage
//!
//! This crate should not be used on its own, and you should instead use one of the
//! renderers which use it.
//!
//! # Contents
//!
//! - Geometry primitives: [`Point`][math::Point], [`Matrix`][math::Matrix],
//!   [`Bezier`][math::Bezier].
//! - 26.6 fixed-point coordinates and 16.16 fixed-point angles ([`fixed`]).
//! - Path descriptors consumed by the renderers ([`path`], [`shape`]).
//! - Path rewriting ahead of stroking: [`trim`] and [`dash`].
//! - Fixed-point outlines, the border stroker, and anti-aliased scanline coverage ([`rle`]).
//! - The per-thread [`mempool`] that keeps those buffers alive across shapes.
//! - The [`RenderMethod`][render::RenderMethod] contract both back-ends implement.
//!
//! [tvg_cpu]: https://crates.io/crates/tvg_cpu
//! [tvg_gl]: https://crates.io/crates/tvg_gl
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
    reason = "Fixed-point conversions intentionally truncate; coordinates are clamped beforehand."
)]

pub mod blend;
pub mod dash;
pub mod effect;
pub mod fixed;
pub mod math;
pub mod mempool;
pub mod outline;
pub mod path;
pub mod region;
pub mod render;
pub mod rle;
pub mod shape;
pub mod stroker;
pub mod trim;
