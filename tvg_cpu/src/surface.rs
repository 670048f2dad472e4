// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel storage for render targets and compositors.

use thiserror::Error;
use tvg_common::blend::ColorSpace;
use tvg_common::region::RenderRegion;
use tvg_common::render::{premultiply, swap_rb, unpremultiply};

/// Pixel data of a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pixels {
    /// Packed 32-bit pixels. The channel order is given by the color space.
    Rgba(Vec<u32>),
    /// One byte per pixel.
    Gray(Vec<u8>),
}

impl Pixels {
    fn len(&self) -> usize {
        match self {
            Self::Rgba(px) => px.len(),
            Self::Gray(px) => px.len(),
        }
    }
}

/// Why a buffer was rejected as render target.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// The buffer holds no pixels.
    #[error("the target buffer is empty")]
    NoData,
    /// Width, height or stride is zero.
    #[error("the target has a zero dimension")]
    ZeroSize,
    /// The stride is smaller than the width.
    #[error("stride {stride} is smaller than width {width}")]
    StrideTooSmall {
        /// Pixels per row.
        stride: u32,
        /// Width in pixels.
        width: u32,
    },
    /// The buffer cannot hold `stride * height` pixels.
    #[error("the target buffer holds {len} pixels, {needed} are needed")]
    BufferTooShort {
        /// Pixels in the buffer.
        len: usize,
        /// Pixels required.
        needed: usize,
    },
    /// The pixel format does not match the color space.
    #[error("{0:?} does not match the pixel format")]
    ColorSpace(ColorSpace),
}

/// A pixel buffer with its layout.
#[derive(Clone, Debug)]
pub struct Surface {
    pub(crate) pixels: Pixels,
    pub(crate) stride: u32,
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) cs: ColorSpace,
    pub(crate) premultiplied: bool,
}

impl Surface {
    /// Validate and wrap a target buffer.
    pub fn new(
        pixels: Pixels,
        stride: u32,
        w: u32,
        h: u32,
        cs: ColorSpace,
    ) -> Result<Self, TargetError> {
        if pixels.len() == 0 {
            return Err(TargetError::NoData);
        }
        if stride == 0 || w == 0 || h == 0 {
            return Err(TargetError::ZeroSize);
        }
        if w > stride {
            return Err(TargetError::StrideTooSmall { stride, width: w });
        }
        let needed = stride as usize * h as usize;
        if pixels.len() < needed {
            return Err(TargetError::BufferTooShort {
                len: pixels.len(),
                needed,
            });
        }
        let gray = matches!(pixels, Pixels::Gray(_));
        if gray != (cs == ColorSpace::Grayscale8) || cs == ColorSpace::Unknown {
            return Err(TargetError::ColorSpace(cs));
        }
        Ok(Self {
            pixels,
            stride,
            w,
            h,
            cs,
            premultiplied: !cs.is_straight(),
        })
    }

    /// A cleared offscreen surface.
    pub(crate) fn offscreen(w: u32, h: u32, cs: ColorSpace) -> Self {
        let len = w as usize * h as usize;
        let pixels = if cs == ColorSpace::Grayscale8 {
            Pixels::Gray(vec![0; len])
        } else {
            Pixels::Rgba(vec![0; len])
        };
        Self {
            pixels,
            stride: w,
            w,
            h,
            cs: cs.premultiplied(),
            premultiplied: true,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.w
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Pixels per row.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Color space.
    pub fn color_space(&self) -> ColorSpace {
        self.cs
    }

    /// The pixel data.
    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    /// Give back the pixel data.
    pub fn into_pixels(self) -> Pixels {
        self.pixels
    }

    /// The raw bytes, in memory order.
    pub fn data_as_u8_slice(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Rgba(px) => bytemuck::cast_slice(px),
            Pixels::Gray(px) => px,
        }
    }

    /// The pixel at `(x, y)`. For grayscale surfaces the value is in the low byte.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        let idx = self.index(x, y);
        match &self.pixels {
            Pixels::Rgba(px) => px[idx],
            Pixels::Gray(px) => u32::from(px[idx]),
        }
    }

    /// The whole surface as a region.
    pub fn region(&self) -> RenderRegion {
        RenderRegion::new(0, 0, self.w as i32, self.h as i32)
    }

    #[inline]
    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride as usize + x as usize
    }

    pub(crate) fn channel_size(&self) -> usize {
        self.cs.channel_size()
    }

    pub(crate) fn is_gray(&self) -> bool {
        matches!(self.pixels, Pixels::Gray(_))
    }

    pub(crate) fn abgr(&self) -> bool {
        self.cs.is_abgr()
    }

    /// Zero the pixels of `region`, clipped to the surface.
    pub(crate) fn clear(&mut self, region: &RenderRegion) {
        let region = region.intersection(&self.region());
        if region.invalid() {
            return;
        }
        let (x0, x1) = (region.min.0 as usize, region.max.0 as usize);
        let stride = self.stride as usize;
        for y in region.min.1 as usize..region.max.1 as usize {
            let row = y * stride;
            match &mut self.pixels {
                Pixels::Rgba(px) => px[row + x0..row + x1].fill(0),
                Pixels::Gray(px) => px[row + x0..row + x1].fill(0),
            }
        }
    }

    /// Rows of 32-bit pixels, each `w` wide.
    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u32]> {
        let (w, stride) = (self.w as usize, self.stride as usize);
        let rows: &mut [u32] = match &mut self.pixels {
            Pixels::Rgba(px) => px.as_mut_slice(),
            Pixels::Gray(_) => &mut [],
        };
        rows.chunks_mut(stride).map(move |row| &mut row[..w])
    }

    pub(crate) fn premultiply(&mut self) {
        if self.premultiplied {
            return;
        }
        for row in self.rows_mut() {
            for px in row {
                *px = premultiply(*px);
            }
        }
        self.premultiplied = true;
    }

    pub(crate) fn unpremultiply(&mut self) {
        if !self.premultiplied || !self.cs.is_straight() {
            return;
        }
        for row in self.rows_mut() {
            for px in row {
                *px = unpremultiply(*px);
            }
        }
        self.premultiplied = false;
    }

    /// Reorder the channels in place to `cs`, keeping the alpha mode.
    pub(crate) fn swap_order(&mut self, cs: ColorSpace) -> bool {
        if self.channel_size() != 4 || cs.channel_size() != 4 {
            return false;
        }
        if self.cs.is_abgr() != cs.is_abgr() {
            for row in self.rows_mut() {
                swap_rb(row);
            }
        }
        self.cs = cs;
        true
    }
}
