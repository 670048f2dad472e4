// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract every back-end renderer implements, and the types it exchanges.

use core::fmt::Debug;
use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::blend::{BlendMethod, ColorSpace, CompositionFlag, MaskMethod};
use crate::effect::RenderEffect;
use crate::math::{Matrix, Point};
use crate::region::RenderRegion;
use crate::shape::RenderShape;
use std::sync::Arc;

/// Which parts of a paint changed since it was last prepared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderUpdateFlag(u16);

impl RenderUpdateFlag {
    /// Nothing changed.
    pub const NONE: Self = Self(0);
    /// The geometry.
    pub const PATH: Self = Self(1);
    /// The solid fill color or opacity.
    pub const COLOR: Self = Self(2);
    /// The fill gradient.
    pub const GRADIENT: Self = Self(4);
    /// The stroke parameters.
    pub const STROKE: Self = Self(8);
    /// The transform.
    pub const TRANSFORM: Self = Self(16);
    /// The image pixels.
    pub const IMAGE: Self = Self(32);
    /// The stroke gradient.
    pub const GRADIENT_STROKE: Self = Self(64);
    /// The blend method.
    pub const BLEND: Self = Self(128);
    /// The clippers.
    pub const CLIP: Self = Self(256);
    /// Everything.
    pub const ALL: Self = Self(0xffff);

    /// Whether any bit of `other` is set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bit is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RenderUpdateFlag {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderUpdateFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RenderUpdateFlag {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A 32-bit pixel buffer, used for images handed to the renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderSurface {
    /// Pixels, `stride` per row.
    pub data: Vec<u32>,
    /// Pixels per row in `data`, at least `w`.
    pub stride: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Channel order and alpha mode of `data`.
    pub cs: ColorSpace,
    /// Whether `data` currently holds premultiplied colors.
    pub premultiplied: bool,
}

impl RenderSurface {
    /// Wrap `data` as a tightly packed `w` by `h` surface.
    ///
    /// Returns `None` when `data` is too short.
    pub fn new(data: Vec<u32>, w: u32, h: u32, cs: ColorSpace) -> Option<Self> {
        if w == 0 || h == 0 || data.len() < (w as usize) * (h as usize) {
            return None;
        }
        Some(Self {
            data,
            stride: w,
            w,
            h,
            premultiplied: !cs.is_straight(),
            cs,
        })
    }

    /// The pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.stride + x) as usize]
    }

    /// Premultiply every pixel, if not already done.
    pub fn premultiply(&mut self) {
        if self.premultiplied {
            return;
        }
        for y in 0..self.h {
            let row = (y * self.stride) as usize;
            for px in &mut self.data[row..row + self.w as usize] {
                *px = premultiply(*px);
            }
        }
        self.premultiplied = true;
    }

    /// Undo [`premultiply`](Self::premultiply).
    pub fn unpremultiply(&mut self) {
        if !self.premultiplied {
            return;
        }
        for y in 0..self.h {
            let row = (y * self.stride) as usize;
            for px in &mut self.data[row..row + self.w as usize] {
                *px = unpremultiply(*px);
            }
        }
        self.premultiplied = false;
    }

    /// Reorder channels to `cs` and premultiply or unpremultiply to match it.
    pub fn convert(&mut self, cs: ColorSpace) -> bool {
        if cs == self.cs {
            return true;
        }
        if self.cs.channel_size() != 4 || cs.channel_size() != 4 {
            return false;
        }
        if self.cs.is_abgr() != cs.is_abgr() {
            for y in 0..self.h {
                let row = (y * self.stride) as usize;
                swap_rb(&mut self.data[row..row + self.w as usize]);
            }
        }
        self.cs = cs;
        if cs.is_straight() {
            self.unpremultiply();
        } else {
            self.premultiply();
        }
        true
    }
}

/// Alpha of a packed pixel. The alpha byte is the top byte in both orders.
#[inline]
pub fn alpha(px: u32) -> u8 {
    (px >> 24) as u8
}

/// Multiply the color channels of `px` by its alpha.
#[inline]
pub fn premultiply(px: u32) -> u32 {
    let a = px >> 24;
    let c0 = ((px & 0xff) * a + 0xff) >> 8;
    let c1 = (((px >> 8) & 0xff) * a + 0xff) >> 8;
    let c2 = (((px >> 16) & 0xff) * a + 0xff) >> 8;
    (a << 24) | (c2 << 16) | (c1 << 8) | c0
}

/// Divide the color channels of `px` by its alpha.
#[inline]
pub fn unpremultiply(px: u32) -> u32 {
    let a = px >> 24;
    if a == 255 {
        return px;
    }
    if a == 0 {
        return 0;
    }
    let div = |c: u32| (c * 255 / a).min(255);
    let c0 = div(px & 0xff);
    let c1 = div((px >> 8) & 0xff);
    let c2 = div((px >> 16) & 0xff);
    (a << 24) | (c2 << 16) | (c1 << 8) | c0
}

/// Swap the red and blue channels of every pixel, turning ABGR into ARGB and back.
pub fn swap_rb(pixels: &mut [u32]) {
    for px in pixels {
        *px = (*px & 0xff00_ff00) | ((*px >> 16) & 0xff) | ((*px & 0xff) << 16);
    }
}

/// A back-end renderer.
///
/// Per frame, callers go through `set_viewport`, `pre_update`, the `prepare_*` calls,
/// `post_update`, `pre_render`, the `render_*` and composition calls, `post_render`,
/// and finally `sync`.
///
/// Render data and compositors are opaque handles owned by the renderer. A handle stays
/// valid until it is passed to [`dispose`](Self::dispose) or, for compositors, to
/// [`end_composite`](Self::end_composite).
pub trait RenderMethod {
    /// Handle to prepared shape or image data.
    type Data: Copy + Eq + Debug;
    /// Handle to an offscreen composition target.
    type Compositor: Copy + Debug;

    /// Create or update the render data for `shape`. The work may finish asynchronously.
    ///
    /// `clips` are previously prepared clipper shapes and `clipper` marks a shape that
    /// is itself used as a clip.
    #[expect(clippy::too_many_arguments, reason = "mirrors the scene traversal state")]
    fn prepare_shape(
        &mut self,
        shape: &RenderShape,
        data: Option<Self::Data>,
        transform: &Matrix,
        clips: &[Self::Data],
        opacity: u8,
        flags: RenderUpdateFlag,
        clipper: bool,
    ) -> Option<Self::Data>;

    /// Create or update the render data for an image.
    fn prepare_image(
        &mut self,
        image: &Arc<RenderSurface>,
        data: Option<Self::Data>,
        transform: &Matrix,
        clips: &[Self::Data],
        opacity: u8,
        flags: RenderUpdateFlag,
    ) -> Option<Self::Data>;

    /// Recompute the device-space parameters of `effect`.
    fn prepare_effect(&mut self, effect: &mut RenderEffect, transform: &Matrix) {
        effect.update(transform);
    }

    /// Called before the first prepare of a frame.
    fn pre_update(&mut self) -> bool {
        true
    }

    /// Called after the last prepare of a frame.
    fn post_update(&mut self) -> bool {
        true
    }

    /// Called before the first draw of a frame.
    fn pre_render(&mut self) -> bool;

    /// Draw a prepared shape.
    fn render_shape(&mut self, data: Self::Data) -> bool;

    /// Draw a prepared image.
    fn render_image(&mut self, data: Self::Data) -> bool;

    /// Called after the last draw of a frame.
    fn post_render(&mut self) -> bool;

    /// Release render data.
    fn dispose(&mut self, data: Self::Data);

    /// Device-space pixel bounds of the data, strokes included.
    fn region(&mut self, data: Self::Data) -> RenderRegion;

    /// `region` grown by what `effect` draws outside of it.
    fn effect_region(&self, effect: &RenderEffect, region: &RenderRegion) -> RenderRegion {
        effect.region(region)
    }

    /// Corners of the data's bounds under `transform`.
    fn bounds(&mut self, data: Self::Data, transform: &Matrix) -> Option<[Point; 4]>;

    /// The area of the target that is drawn to.
    fn viewport(&self) -> RenderRegion;

    /// Restrict drawing to `vp`.
    fn set_viewport(&mut self, vp: RenderRegion) -> bool;

    /// Blend subsequent draws with `method`.
    fn blend(&mut self, method: BlendMethod) -> bool;

    /// Color space of the main target.
    fn color_space(&self) -> ColorSpace;

    /// Clear the target before the next frame.
    fn clear(&mut self) -> bool;

    /// Finish all outstanding work and flush the frame.
    fn sync(&mut self) -> bool;

    /// Acquire an offscreen target covering `region`.
    fn target(
        &mut self,
        region: &RenderRegion,
        cs: ColorSpace,
        flags: CompositionFlag,
    ) -> Option<Self::Compositor>;

    /// Redirect drawing into `cmp`.
    fn begin_composite(&mut self, cmp: Self::Compositor, method: MaskMethod, opacity: u8)
        -> bool;

    /// Stop drawing into `cmp` and compose it back.
    fn end_composite(&mut self, cmp: Self::Compositor) -> bool;

    /// Apply `effect` to the contents of `cmp`. `direct` composes straight onto the
    /// surface below.
    fn render_effect(&mut self, cmp: Self::Compositor, effect: &RenderEffect, direct: bool) -> bool;

    /// Whether the shape covers any pixel of `region`.
    fn intersects_shape(&mut self, data: Self::Data, region: &RenderRegion) -> bool;

    /// Whether the image covers any pixel of `region`.
    fn intersects_image(&mut self, data: Self::Data, region: &RenderRegion) -> bool;

    /// Mark the previous area of `data` as needing a redraw.
    fn damage(&mut self, _data: Self::Data, _region: &RenderRegion) {}

    /// Toggle partial rendering. Returns the previous state.
    fn partial(&mut self, _disable: bool) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_flags_combine() {
        let flags = RenderUpdateFlag::PATH | RenderUpdateFlag::STROKE;
        assert!(flags.intersects(RenderUpdateFlag::STROKE));
        assert!(!flags.intersects(RenderUpdateFlag::GRADIENT));
        assert!((flags & RenderUpdateFlag::COLOR).is_empty());
        assert!(RenderUpdateFlag::ALL.intersects(RenderUpdateFlag::CLIP));
    }

    #[test]
    fn premultiply_is_idempotent_on_opaque_and_scales_translucent() {
        assert_eq!(premultiply(0xff12_3456), 0xff12_3456);
        let half = premultiply(0x80ff_0000);
        assert_eq!(alpha(half), 0x80);
        assert_eq!((half >> 16) & 0xff, 0x80);
        assert_eq!(premultiply(0), 0);
    }

    #[test]
    fn unpremultiply_restores_channels() {
        let px = unpremultiply(0x8080_0000);
        assert_eq!((px >> 16) & 0xff, 0xff);
        assert_eq!(unpremultiply(0x00ff_ffff), 0);
    }

    #[test]
    fn convert_swaps_and_premultiplies() {
        let mut sfc = RenderSurface::new(vec![0x80ff_0000], 1, 1, ColorSpace::Argb8888S).unwrap();
        assert!(!sfc.premultiplied);
        assert!(sfc.convert(ColorSpace::Abgr8888));
        assert!(sfc.premultiplied);
        assert_eq!(sfc.pixel(0, 0), 0x8000_0080);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(RenderSurface::new(vec![0; 3], 2, 2, ColorSpace::Abgr8888).is_none());
    }
}
