// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image preparation and sampling.

use std::sync::Arc;

use tvg_common::blend::ColorSpace;
use tvg_common::math::{Matrix, Point};
use tvg_common::mempool::MemPool;
use tvg_common::path::RenderPath;
use tvg_common::region::RenderRegion;
use tvg_common::render::RenderSurface;
use tvg_common::rle::{self, Rle};
use tvg_common::shape::FillRule;

use crate::pixel::{alpha_blend, interpolate};
use crate::raster::{Canvas, Coverage};

/// How an image maps onto the device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ImageMode {
    /// Whole-pixel translation.
    Direct { ox: i32, oy: i32 },
    /// Axis-aligned scaling, sampled bilinearly.
    Scaled,
    /// Any other affine transform, with anti-aliased edges.
    Transformed,
}

/// An image prepared for rasterization.
#[derive(Clone, Debug)]
pub(crate) struct SwImage {
    pub(crate) source: Arc<RenderSurface>,
    pub(crate) mode: ImageMode,
    /// Device to image space.
    inv: Matrix,
    /// Coverage of the image, if clipped or transformed.
    pub(crate) rle: Option<Rle>,
}

/// The image in `cs`, premultiplied. Shares `source` when it already matches.
pub(crate) fn convert(source: &Arc<RenderSurface>, cs: ColorSpace) -> Arc<RenderSurface> {
    let target = cs.premultiplied();
    if source.cs == target && source.premultiplied {
        return Arc::clone(source);
    }
    let mut converted = RenderSurface::clone(source);
    if converted.cs.is_abgr() != target.is_abgr() {
        tvg_common::render::swap_rb(&mut converted.data);
    }
    converted.cs = target;
    converted.premultiply();
    Arc::new(converted)
}

/// Choose how to draw `source` under `transform`.
pub(crate) fn mode(transform: &Matrix) -> ImageMode {
    if transform.is_translation() {
        let (ox, oy) = (transform.e13.round(), transform.e23.round());
        if (ox - transform.e13).abs() < 1e-3 && (oy - transform.e23).abs() < 1e-3 {
            return ImageMode::Direct {
                ox: ox as i32,
                oy: oy as i32,
            };
        }
    }
    let scale = transform.scaling_2d();
    let axis_aligned = transform.e12.abs() < 1e-6 && transform.e21.abs() < 1e-6;
    if axis_aligned && (scale.x - scale.y).abs() <= 0.01 {
        return ImageMode::Scaled;
    }
    ImageMode::Transformed
}

/// The four device-space corners of a `w` by `h` image.
pub(crate) fn corners(w: u32, h: u32, transform: &Matrix) -> [Point; 4] {
    let (w, h) = (w as f32, h as f32);
    [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ]
    .map(|p| p.transform(transform))
}

impl SwImage {
    /// Prepare `source` for drawing under `transform`, within `clip`.
    ///
    /// Returns the image and its device bounds, or `None` if nothing is visible.
    pub(crate) fn prepare(
        source: Arc<RenderSurface>,
        transform: &Matrix,
        clip: &RenderRegion,
        needs_rle: bool,
        pool: &mut MemPool,
    ) -> Option<(Self, RenderRegion)> {
        let inv = transform.inverse()?;
        let mode = mode(transform);
        let pts = corners(source.w, source.h, transform);

        let (mut min, mut max) = (pts[0], pts[0]);
        for p in &pts[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        let mut bbox = RenderRegion::new(
            min.x.floor() as i32,
            min.y.floor() as i32,
            max.x.ceil() as i32,
            max.y.ceil() as i32,
        );
        if mode != ImageMode::Transformed {
            bbox = RenderRegion::new(
                min.x.round() as i32,
                min.y.round() as i32,
                max.x.round() as i32,
                max.y.round() as i32,
            );
        }
        bbox.intersect(clip);
        if bbox.invalid() {
            return None;
        }

        let rle = if mode == ImageMode::Transformed {
            let mut path = RenderPath::new();
            path.add_rect(0.0, 0.0, source.w as f32, source.h as f32);
            let rle = pool.with_outline(|outline, cells| {
                outline.build(&path, transform, FillRule::NonZero);
                rle::render(outline, &bbox, true, cells)
            });
            match rle {
                Ok(rle) => Some(rle),
                Err(err) => {
                    log::warn!("image outline dropped: {err}");
                    return None;
                }
            }
        } else if needs_rle {
            Some(Rle::from_rect(&bbox))
        } else {
            None
        };

        Some((
            Self {
                source,
                mode,
                inv,
                rle,
            },
            bbox,
        ))
    }

    /// The premultiplied color of device pixel `(x, y)`.
    #[inline]
    fn sample(&self, x: i32, y: i32) -> u32 {
        let src = &*self.source;
        match self.mode {
            ImageMode::Direct { ox, oy } => {
                let (sx, sy) = (x - ox, y - oy);
                if sx < 0 || sy < 0 || sx >= src.w as i32 || sy >= src.h as i32 {
                    return 0;
                }
                src.pixel(sx as u32, sy as u32)
            }
            ImageMode::Scaled | ImageMode::Transformed => {
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5).transform(&self.inv);
                bilinear(src, p.x, p.y)
            }
        }
    }

    /// Draw the image within `bbox` with `opacity`.
    pub(crate) fn draw(&self, canvas: &mut Canvas<'_>, bbox: &RenderRegion, opacity: u8) {
        let coverage = match &self.rle {
            Some(rle) => Coverage::Rle(rle),
            None => Coverage::Rect(*bbox),
        };
        let mut runs = Vec::new();
        canvas.spans(&coverage, |y, x0, x1, c| runs.push((y, x0, x1, c)));

        for (y, x0, x1, c) in runs {
            for x in x0..x1 {
                let px = self.sample(x, y);
                if px == 0 {
                    continue;
                }
                let px = if opacity < 255 {
                    alpha_blend(px, opacity)
                } else {
                    px
                };
                canvas.put(x, y, px, c);
            }
        }
    }
}

/// Sample `src` at image-space `(u, v)` with bilinear filtering.
fn bilinear(src: &RenderSurface, u: f32, v: f32) -> u32 {
    let (w, h) = (src.w as f32, src.h as f32);
    if u < -0.5 || v < -0.5 || u >= w + 0.5 || v >= h + 0.5 {
        return 0;
    }
    let (u, v) = (u - 0.5, v - 0.5);
    let (fx, fy) = (u.floor(), v.floor());
    let (ax, ay) = (((u - fx) * 255.0) as u8, ((v - fy) * 255.0) as u8);

    let clamp_x = |x: f32| x.clamp(0.0, w - 1.0) as u32;
    let clamp_y = |y: f32| y.clamp(0.0, h - 1.0) as u32;
    let (x0, x1) = (clamp_x(fx), clamp_x(fx + 1.0));
    let (y0, y1) = (clamp_y(fy), clamp_y(fy + 1.0));

    let top = interpolate(src.pixel(x1, y0), src.pixel(x0, y0), ax);
    let bottom = interpolate(src.pixel(x1, y1), src.pixel(x0, y1), ax);
    interpolate(bottom, top, ay)
}
