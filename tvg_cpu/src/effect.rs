// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post effects on the contents of a compositor.
//!
//! Every effect works on a copy of the compositor region, a `Plane`, and writes the
//! result back. The blur is a separable convolution with a truncated Gaussian kernel.

use tvg_common::effect::{
    BlurBorder, BlurDirection, DropShadow, RenderEffect, SceneEffect, Tint, Tritone,
};
use tvg_common::region::RenderRegion;
use tvg_common::shape::RenderColor;

use crate::pixel::{alpha, alpha_blend, join, luma, multiply, premultiplied, split, src_over};
use crate::surface::{Pixels, Surface};

/// Why an effect could not be applied.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum EffectError {
    /// Effects need 32-bit pixels.
    #[error("effects are not supported on grayscale targets")]
    Grayscale,
    /// Nothing of the region lies on the surface.
    #[error("the effect region is empty")]
    EmptyRegion,
}

/// A rectangular copy of surface pixels.
#[derive(Clone, Debug, Default)]
struct Plane {
    px: Vec<u32>,
    w: usize,
    h: usize,
}

impl Plane {
    fn read(sfc: &Surface, region: &RenderRegion) -> Self {
        let (w, h) = (region.sw() as usize, region.sh() as usize);
        let mut px = Vec::with_capacity(w * h);
        for y in region.min.1..region.max.1 {
            for x in region.min.0..region.max.0 {
                px.push(sfc.pixel(x as u32, y as u32));
            }
        }
        Self { px, w, h }
    }

    fn write(&self, sfc: &mut Surface, region: &RenderRegion) {
        let stride = sfc.stride as usize;
        let (x0, y0) = (region.min.0 as usize, region.min.1 as usize);
        if let Pixels::Rgba(dst) = &mut sfc.pixels {
            for (row, src) in self.px.chunks(self.w).enumerate() {
                let start = (y0 + row) * stride + x0;
                dst[start..start + self.w].copy_from_slice(src);
            }
        }
    }

    #[inline]
    fn get(&self, x: usize, y: usize) -> u32 {
        self.px[y * self.w + x]
    }
}

/// A normalized Gaussian kernel of the given radius.
fn kernel(sigma: f32, radius: usize) -> Vec<f32> {
    let mut k: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = k.iter().sum();
    for w in &mut k {
        *w /= sum;
    }
    k
}

#[inline]
fn sample_index(i: isize, len: usize, border: BlurBorder) -> usize {
    match border {
        BlurBorder::Duplicate => i.clamp(0, len as isize - 1) as usize,
        BlurBorder::Wrap => i.rem_euclid(len as isize) as usize,
    }
}

/// Convolve along one axis.
fn convolve(plane: &Plane, k: &[f32], horizontal: bool, border: BlurBorder) -> Plane {
    let radius = (k.len() / 2) as isize;
    let mut out = Plane {
        px: vec![0; plane.px.len()],
        w: plane.w,
        h: plane.h,
    };
    let len = if horizontal { plane.w } else { plane.h };

    for y in 0..plane.h {
        for x in 0..plane.w {
            let pos = (if horizontal { x } else { y }) as isize;
            let mut acc = [0.0_f32; 4];
            for (j, w) in k.iter().enumerate() {
                let s = sample_index(pos + j as isize - radius, len, border);
                let px = if horizontal { plane.get(s, y) } else { plane.get(x, s) };
                for (a, c) in acc.iter_mut().zip(split(px)) {
                    *a += f32::from(c) * w;
                }
            }
            out.px[y * plane.w + x] = join(acc.map(|a| (a + 0.5).clamp(0.0, 255.0) as u8));
        }
    }
    out
}

fn blur_plane(plane: Plane, sigma: f32, direction: BlurDirection, border: BlurBorder) -> Plane {
    if sigma <= 0.0 || plane.px.is_empty() {
        return plane;
    }
    let radius = (2.0 * sigma).ceil() as usize;
    let k = kernel(sigma, radius);
    let mut plane = plane;
    if direction.horizontal() {
        plane = convolve(&plane, &k, true, border);
    }
    if direction.vertical() {
        plane = convolve(&plane, &k, false, border);
    }
    plane
}

/// Apply `effect` to `sfc` within `region`.
pub(crate) fn apply(
    sfc: &mut Surface,
    region: &RenderRegion,
    effect: &RenderEffect,
) -> Result<(), EffectError> {
    if sfc.is_gray() {
        return Err(EffectError::Grayscale);
    }
    let region = region.intersection(&sfc.region());
    if region.invalid() {
        return Err(EffectError::EmptyRegion);
    }
    if !effect.valid {
        return Ok(());
    }

    let plane = Plane::read(sfc, &region);
    let abgr = sfc.abgr();
    let out = match effect.effect {
        SceneEffect::GaussianBlur(blur) => {
            let sigma = blur.sigma * effect.scale;
            blur_plane(plane, sigma, blur.direction, blur.border)
        }
        SceneEffect::DropShadow(shadow) => drop_shadow(plane, &shadow, effect, abgr),
        SceneEffect::Fill(color) => map(plane, |px| fill(px, color, abgr)),
        SceneEffect::Tint(tint) => map(plane, |px| self::tint(px, &tint, abgr)),
        SceneEffect::Tritone(tritone) => map(plane, |px| self::tritone(px, &tritone, abgr)),
    };
    out.write(sfc, &region);
    Ok(())
}

fn map(mut plane: Plane, f: impl Fn(u32) -> u32) -> Plane {
    for px in &mut plane.px {
        *px = f(*px);
    }
    plane
}

fn drop_shadow(plane: Plane, shadow: &DropShadow, effect: &RenderEffect, abgr: bool) -> Plane {
    let color = premultiplied(shadow.color, abgr);
    let silhouette = Plane {
        px: plane
            .px
            .iter()
            .map(|px| match alpha(*px) {
                255 => color,
                a => alpha_blend(color, a),
            })
            .collect(),
        w: plane.w,
        h: plane.h,
    };
    let blurred = blur_plane(
        silhouette,
        shadow.sigma * effect.scale,
        BlurDirection::Both,
        BlurBorder::Duplicate,
    );

    let (ox, oy) = (
        effect.offset.x.round() as isize,
        effect.offset.y.round() as isize,
    );
    let mut out = plane.clone();
    for y in 0..plane.h {
        for x in 0..plane.w {
            let (sx, sy) = (x as isize - ox, y as isize - oy);
            let inside = sx >= 0 && sy >= 0 && (sx as usize) < plane.w && (sy as usize) < plane.h;
            let below = if inside {
                blurred.get(sx as usize, sy as usize)
            } else {
                0
            };
            out.px[y * plane.w + x] = src_over(plane.get(x, y), below);
        }
    }
    out
}

fn fill(px: u32, color: RenderColor, abgr: bool) -> u32 {
    let a = multiply(color.a, alpha(px));
    premultiplied(RenderColor { a, ..color }, abgr)
}

/// `(r, g, b)` of a straight-alpha reading of `px`.
fn straight_rgb(px: u32, abgr: bool) -> [u8; 3] {
    let [c0, c1, c2, a] = split(px);
    let un = |c: u8| {
        if a == 0 {
            0
        } else {
            ((u32::from(c) * 255 / u32::from(a)).min(255)) as u8
        }
    };
    if abgr {
        [un(c0), un(c1), un(c2)]
    } else {
        [un(c2), un(c1), un(c0)]
    }
}

fn lerp3(a: [u8; 3], b: [u8; 3], t: u8) -> [u8; 3] {
    let mix = |a: u8, b: u8| multiply(a, 255 - t).saturating_add(multiply(b, t));
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

fn repack(rgb: [u8; 3], a: u8, abgr: bool) -> u32 {
    premultiplied(RenderColor::new(rgb[0], rgb[1], rgb[2], a), abgr)
}

fn tint(px: u32, tint: &Tint, abgr: bool) -> u32 {
    let a = alpha(px);
    if a == 0 {
        return px;
    }
    let rgb = straight_rgb(px, abgr);
    let l = luma(repack(rgb, 255, abgr), abgr);
    let tinted = lerp3(tint.black, tint.white, l);
    repack(lerp3(rgb, tinted, tint.intensity), a, abgr)
}

fn tritone(px: u32, tritone: &Tritone, abgr: bool) -> u32 {
    let a = alpha(px);
    if a == 0 {
        return px;
    }
    let rgb = straight_rgb(px, abgr);
    let l = luma(repack(rgb, 255, abgr), abgr);
    let toned = if l < 128 {
        lerp3(tritone.shadow, tritone.midtone, l.saturating_mul(2))
    } else {
        let t = (l - 128).saturating_mul(2);
        lerp3(tritone.midtone, tritone.highlight, t)
    };
    repack(lerp3(toned, rgb, tritone.blender), a, abgr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvg_common::blend::ColorSpace;
    use tvg_common::effect::GaussianBlur;
    use tvg_common::math::Matrix;

    fn square(size: u32, from: u32, to: u32) -> Surface {
        let mut sfc = Surface::offscreen(size, size, ColorSpace::Abgr8888);
        if let Pixels::Rgba(px) = &mut sfc.pixels {
            for y in from..to {
                for x in from..to {
                    px[(y * size + x) as usize] = 0xff00_0000;
                }
            }
        }
        sfc
    }

    fn effect(e: SceneEffect) -> RenderEffect {
        let mut effect = RenderEffect::new(e);
        effect.update(&Matrix::IDENTITY);
        effect
    }

    #[test]
    fn kernel_is_normalized() {
        let k = kernel(3.0, 6);
        assert_eq!(k.len(), 13);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[6] > k[5] && k[5] > k[0]);
    }

    #[test]
    fn blur_softens_edges_and_keeps_interior() {
        let mut sfc = square(64, 16, 48);
        let blur = effect(SceneEffect::GaussianBlur(GaussianBlur::new(
            2.0,
            BlurDirection::Both,
            BlurBorder::Duplicate,
            100,
        )));
        let region = sfc.region();
        apply(&mut sfc, &region, &blur).unwrap();
        assert_eq!(sfc.pixel(32, 32) >> 24, 255);
        let outside = sfc.pixel(15, 32) >> 24;
        let further = sfc.pixel(13, 32) >> 24;
        assert!(outside > 0 && outside < 255);
        assert!(further < outside);
        assert_eq!(sfc.pixel(2, 2), 0);
    }

    #[test]
    fn horizontal_blur_leaves_columns() {
        let mut sfc = square(32, 8, 24);
        let blur = effect(SceneEffect::GaussianBlur(GaussianBlur::new(
            2.0,
            BlurDirection::Horizontal,
            BlurBorder::Duplicate,
            100,
        )));
        let region = sfc.region();
        apply(&mut sfc, &region, &blur).unwrap();
        assert!(sfc.pixel(7, 16) >> 24 > 0);
        assert_eq!(sfc.pixel(16, 7), 0);
    }

    #[test]
    fn border_mode_picks_samples_past_the_edge() {
        let blur = |border| {
            let mut sfc = square(16, 0, 4);
            let fx = effect(SceneEffect::GaussianBlur(GaussianBlur::new(
                1.0,
                BlurDirection::Horizontal,
                border,
                100,
            )));
            let region = sfc.region();
            apply(&mut sfc, &region, &fx).unwrap();
            sfc
        };
        let duplicated = blur(BlurBorder::Duplicate);
        assert_eq!(duplicated.pixel(0, 1) >> 24, 255);
        assert_eq!(duplicated.pixel(15, 1), 0);

        let wrapped = blur(BlurBorder::Wrap);
        assert!(wrapped.pixel(0, 1) >> 24 < 255);
        assert!(wrapped.pixel(15, 1) >> 24 > 0);
    }

    #[test]
    fn fill_keeps_alpha() {
        let px = fill(0x8000_0000, RenderColor::new(255, 0, 0, 255), true);
        assert_eq!(alpha(px), 0x80);
        assert_eq!(split(px)[0], 0x80);
    }

    #[test]
    fn full_tint_maps_black_and_white() {
        let t = Tint {
            black: [0, 0, 255],
            white: [255, 0, 0],
            intensity: 255,
        };
        assert_eq!(tint(0xff00_0000, &t, true), 0xffff_0000);
        assert_eq!(tint(0xffff_ffff, &t, true), 0xff00_00ff);
    }

    #[test]
    fn tritone_blender_keeps_original() {
        let t = Tritone {
            shadow: [255, 0, 0],
            midtone: [0, 255, 0],
            highlight: [0, 0, 255],
            blender: 255,
        };
        assert_eq!(tritone(0xff40_4040, &t, true), 0xff40_4040);
    }

    #[test]
    fn shadow_lands_below_offset() {
        let mut sfc = square(32, 4, 8);
        let shadow = DropShadow::new(RenderColor::new(0, 0, 255, 255), 180.0, 10.0, 0.0, 0);
        let fx = effect(SceneEffect::DropShadow(shadow));
        let region = sfc.region();
        apply(&mut sfc, &region, &fx).unwrap();
        assert_eq!(sfc.pixel(5, 5), 0xff00_0000);
        assert_eq!(sfc.pixel(5, 15), 0xffff_0000);
    }

    #[test]
    fn grayscale_is_rejected() {
        let mut sfc = Surface::offscreen(4, 4, ColorSpace::Grayscale8);
        let fx = effect(SceneEffect::Fill(RenderColor::new(0, 0, 0, 255)));
        assert_eq!(
            apply(&mut sfc, &RenderRegion::new(0, 0, 4, 4), &fx),
            Err(EffectError::Grayscale)
        );
    }
}
