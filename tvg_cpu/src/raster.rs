// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Span rasterization onto a surface.

use tvg_common::blend::{BlendMethod, MaskMethod};
use tvg_common::region::RenderRegion;
use tvg_common::rle::Rle;

use crate::blend::{blend, blend8};
use crate::fill::SwFill;
use crate::mask::{combine, modulation, rescale};
use crate::pixel::{alpha, multiply, src_over};
use crate::surface::{Pixels, Surface};

/// The pixels a draw touches, with their coverage.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Coverage<'a> {
    /// Every pixel fully covered.
    Rect(RenderRegion),
    /// Anti-aliased spans.
    Rle(&'a Rle),
}

/// The color a draw paints with.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Source<'a> {
    /// A premultiplied color.
    Solid(u32),
    /// A prepared gradient.
    Gradient(&'a SwFill),
}

/// A mask modulating the draws, read at the same coordinates as the destination.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MaskRef<'a> {
    pub(crate) surface: &'a Surface,
    pub(crate) method: MaskMethod,
    /// Outside of this region the mask is empty.
    pub(crate) bbox: RenderRegion,
}

impl MaskRef<'_> {
    #[inline]
    fn value(&self, x: i32, y: i32) -> u8 {
        let inside = x >= self.bbox.min.0
            && x < self.bbox.max.0
            && y >= self.bbox.min.1
            && y < self.bbox.max.1;
        let px = if inside {
            self.surface.pixel(x as u32, y as u32)
        } else {
            0
        };
        modulation(self.method, px, self.surface.is_gray(), self.surface.abgr())
    }
}

/// A destination surface together with the state applied to every draw.
#[derive(Debug)]
pub(crate) struct Canvas<'a> {
    pub(crate) dst: &'a mut Surface,
    pub(crate) mask: Option<MaskRef<'a>>,
    pub(crate) blend: BlendMethod,
    /// Draws are restricted to this region.
    pub(crate) clip: RenderRegion,
}

impl<'a> Canvas<'a> {
    /// A canvas drawing anywhere on `dst` without mask or blending.
    pub(crate) fn new(dst: &'a mut Surface) -> Self {
        let clip = dst.region();
        Self {
            dst,
            mask: None,
            blend: BlendMethod::Normal,
            clip,
        }
    }

    /// Blend `src` onto the pixel at `(x, y)` with `coverage`.
    #[inline]
    pub(crate) fn put(&mut self, x: i32, y: i32, src: u32, coverage: u8) {
        let coverage = match &self.mask {
            Some(mask) => multiply(coverage, mask.value(x, y)),
            None => coverage,
        };
        if coverage == 0 {
            return;
        }
        let idx = self.dst.index(x as u32, y as u32);
        let abgr = self.dst.abgr();
        match &mut self.dst.pixels {
            Pixels::Rgba(px) => px[idx] = blend(self.blend, src, px[idx], coverage, abgr),
            Pixels::Gray(px) => px[idx] = blend8(multiply(alpha(src), coverage), px[idx]),
        }
    }

    /// Visit every covered run as `(y, x0, x1, coverage)`, clipped to the canvas.
    pub(crate) fn spans(&self, coverage: &Coverage<'_>, mut f: impl FnMut(i32, i32, i32, u8)) {
        let clip = self.clip.intersection(&self.dst.region());
        match coverage {
            Coverage::Rect(rect) => {
                let r = rect.intersection(&clip);
                if r.invalid() {
                    return;
                }
                for y in r.min.1..r.max.1 {
                    f(y, r.min.0, r.max.0, 255);
                }
            }
            Coverage::Rle(rle) => {
                for span in rle.fetch_region(&clip) {
                    let x0 = i32::from(span.x).max(clip.min.0);
                    let x1 = span.end().min(clip.max.0);
                    if x0 < x1 {
                        f(i32::from(span.y), x0, x1, span.coverage);
                    }
                }
            }
        }
    }

    /// Paint `coverage` with `source`.
    pub(crate) fn fill(&mut self, coverage: &Coverage<'_>, source: Source<'_>) {
        let mut runs = Vec::new();
        self.spans(coverage, |y, x0, x1, c| runs.push((y, x0, x1, c)));

        match source {
            Source::Solid(color) => {
                if color == 0 && self.blend != BlendMethod::Add {
                    return;
                }
                let direct = alpha(color) == 255
                    && self.mask.is_none()
                    && self.blend == BlendMethod::Normal
                    && !self.dst.is_gray();
                for (y, x0, x1, c) in runs {
                    if direct && c == 255 {
                        self.fill_row(y, x0, x1, color);
                        continue;
                    }
                    for x in x0..x1 {
                        self.put(x, y, color, c);
                    }
                }
            }
            Source::Gradient(fill) => {
                for (y, x0, x1, c) in runs {
                    for x in x0..x1 {
                        self.put(x, y, fill.fetch(x, y), c);
                    }
                }
            }
        }
    }

    fn fill_row(&mut self, y: i32, x0: i32, x1: i32, color: u32) {
        let start = self.dst.index(x0 as u32, y as u32);
        let end = start + (x1 - x0) as usize;
        if let Pixels::Rgba(px) = &mut self.dst.pixels {
            px[start..end].fill(color);
        }
    }

    /// Draw the pixels of `src` within `region` at the same coordinates, scaled by
    /// `opacity`.
    pub(crate) fn compose(&mut self, src: &Surface, region: &RenderRegion, opacity: u8) {
        let region = region.intersection(&src.region());
        let mut runs = Vec::new();
        let rect = Coverage::Rect(region);
        self.spans(&rect, |y, x0, x1, _| runs.push((y, x0, x1)));

        for (y, x0, x1) in runs {
            for x in x0..x1 {
                let px = src.pixel(x as u32, y as u32);
                let px = if src.is_gray() { (px & 0xff) << 24 } else { px };
                if px == 0 {
                    continue;
                }
                self.put(x, y, px, opacity);
            }
        }
    }
}

/// Merge a paint drawn into `src` with the matte in `mask`, over `region`.
///
/// The alpha of `src` is combined with the mask value through `method`. An 8-bit `dst`
/// takes the combined value. A 32-bit `dst` receives the paint at the combined alpha.
pub(crate) fn compose_masked(
    dst: &mut Surface,
    src: &Surface,
    mask: &Surface,
    method: MaskMethod,
    region: &RenderRegion,
) {
    let region = region
        .intersection(&dst.region())
        .intersection(&src.region())
        .intersection(&mask.region());
    let value = |sfc: &Surface, x: u32, y: u32| {
        let px = sfc.pixel(x, y);
        if sfc.is_gray() {
            px as u8
        } else {
            alpha(px)
        }
    };
    for y in region.min.1..region.max.1 {
        for x in region.min.0..region.max.0 {
            let (x, y) = (x as u32, y as u32);
            let s = src.pixel(x, y);
            let sa = value(src, x, y);
            let m = combine(method, sa, value(mask, x, y));
            let idx = dst.index(x, y);
            match &mut dst.pixels {
                Pixels::Gray(px) => px[idx] = m,
                Pixels::Rgba(px) => {
                    if sa > 0 && m > 0 {
                        px[idx] = src_over(rescale(s, m), px[idx]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvg_common::blend::ColorSpace;
    use tvg_common::rle::Span;

    fn surface(w: u32, h: u32) -> Surface {
        Surface::offscreen(w, h, ColorSpace::Abgr8888)
    }

    #[test]
    fn rect_fill_writes_exact_region() {
        let mut sfc = surface(8, 8);
        Canvas::new(&mut sfc).fill(
            &Coverage::Rect(RenderRegion::new(2, 2, 5, 4)),
            Source::Solid(0xff00_00ff),
        );
        assert_eq!(sfc.pixel(2, 2), 0xff00_00ff);
        assert_eq!(sfc.pixel(4, 3), 0xff00_00ff);
        assert_eq!(sfc.pixel(5, 3), 0);
        assert_eq!(sfc.pixel(2, 4), 0);
    }

    #[test]
    fn rle_spans_are_clipped() {
        let mut sfc = surface(8, 8);
        let rle = Rle {
            spans: vec![Span::new(4, 1, 10, 128)],
        };
        let mut canvas = Canvas::new(&mut sfc);
        canvas.clip = RenderRegion::new(0, 0, 6, 8);
        canvas.fill(&Coverage::Rle(&rle), Source::Solid(0xffff_ffff));
        assert_eq!(sfc.pixel(5, 1) >> 24, 0x7f);
        assert_eq!(sfc.pixel(6, 1), 0);
    }

    #[test]
    fn alpha_mask_gates_coverage() {
        let mut mask = Surface::offscreen(4, 1, ColorSpace::Grayscale8);
        if let Pixels::Gray(px) = &mut mask.pixels {
            px[1] = 255;
        }
        let mut sfc = surface(4, 1);
        let mut canvas = Canvas::new(&mut sfc);
        canvas.mask = Some(MaskRef {
            surface: &mask,
            method: MaskMethod::Alpha,
            bbox: RenderRegion::new(0, 0, 4, 1),
        });
        canvas.fill(
            &Coverage::Rect(RenderRegion::new(0, 0, 4, 1)),
            Source::Solid(0xff00_ff00),
        );
        assert_eq!(sfc.pixel(0, 0), 0);
        assert_eq!(sfc.pixel(1, 0), 0xff00_ff00);
    }

    #[test]
    fn grayscale_accumulates_alpha() {
        let mut sfc = Surface::offscreen(2, 1, ColorSpace::Grayscale8);
        Canvas::new(&mut sfc).fill(
            &Coverage::Rect(RenderRegion::new(0, 0, 1, 1)),
            Source::Solid(0xff12_3456),
        );
        assert_eq!(sfc.pixel(0, 0), 255);
        assert_eq!(sfc.pixel(1, 0), 0);
    }

    #[test]
    fn intersect_keeps_overlap_only() {
        let mut mask = Surface::offscreen(2, 1, ColorSpace::Grayscale8);
        if let Pixels::Gray(px) = &mut mask.pixels {
            px[0] = 255;
        }
        let mut paint = surface(2, 1);
        if let Pixels::Rgba(px) = &mut paint.pixels {
            px.fill(0xff00_00ff);
        }
        let mut dst = surface(2, 1);
        let region = dst.region();
        compose_masked(&mut dst, &paint, &mask, MaskMethod::Intersect, &region);
        assert_eq!(dst.pixel(0, 0), 0xff00_00ff);
        assert_eq!(dst.pixel(1, 0), 0);
    }
}
