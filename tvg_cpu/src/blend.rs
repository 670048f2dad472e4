// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blend modes on premultiplied pixels. See <https://www.w3.org/TR/compositing-1/#blending>
//! for the formulas.

use tvg_common::blend::BlendMethod;

use crate::pixel::{alpha, alpha_blend, join, multiply, split, src_over};

/// Blend the premultiplied `src` onto `dst` with `method`, scaled by `coverage`.
#[inline]
pub(crate) fn blend(method: BlendMethod, src: u32, dst: u32, coverage: u8, abgr: bool) -> u32 {
    let covered = if coverage == 255 {
        src
    } else {
        alpha_blend(src, coverage)
    };

    match method {
        BlendMethod::Normal => src_over(covered, dst),
        BlendMethod::Add => add(covered, dst),
        _ => {
            if dst >> 24 == 0 {
                return src_over(covered, dst);
            }
            let mixed = mix(method, src, dst, abgr);
            src_over(
                if coverage == 255 {
                    mixed
                } else {
                    alpha_blend(mixed, coverage)
                },
                dst,
            )
        }
    }
}

/// `min(s + d, 255)` on every channel.
#[inline]
fn add(s: u32, d: u32) -> u32 {
    let (s, d) = (split(s), split(d));
    join([
        s[0].saturating_add(d[0]),
        s[1].saturating_add(d[1]),
        s[2].saturating_add(d[2]),
        s[3].saturating_add(d[3]),
    ])
}

/// Mix `src` with `dst` and account for the destination alpha, returning a
/// premultiplied color with the source alpha.
fn mix(method: BlendMethod, src: u32, dst: u32, abgr: bool) -> u32 {
    let sa = alpha(src);
    if sa == 0 {
        return src;
    }
    let cs = unpremultiply(src);
    let cb = unpremultiply(dst);
    let ab = f32::from(alpha(dst)) / 255.0;

    let mut mixed = cs;
    match method {
        BlendMethod::Multiply => separable(&mut mixed, &cb, |s, b| s * b),
        BlendMethod::Screen => separable(&mut mixed, &cb, screen),
        BlendMethod::Overlay => separable(&mut mixed, &cb, |s, b| hard_light(b, s)),
        BlendMethod::Darken => separable(&mut mixed, &cb, f32::min),
        BlendMethod::Lighten => separable(&mut mixed, &cb, f32::max),
        BlendMethod::ColorDodge => separable(&mut mixed, &cb, |s, b| {
            if b == 0.0 {
                0.0
            } else if s >= 1.0 {
                1.0
            } else {
                (b / (1.0 - s)).min(1.0)
            }
        }),
        BlendMethod::ColorBurn => separable(&mut mixed, &cb, |s, b| {
            if b >= 1.0 {
                1.0
            } else if s == 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - b) / s).min(1.0)
            }
        }),
        BlendMethod::HardLight => separable(&mut mixed, &cb, hard_light),
        BlendMethod::SoftLight => separable(&mut mixed, &cb, |s, b| {
            let d = if b <= 0.25 {
                ((16.0 * b - 12.0) * b + 4.0) * b
            } else {
                b.sqrt()
            };
            if s <= 0.5 {
                b - (1.0 - 2.0 * s) * b * (1.0 - b)
            } else {
                b + (2.0 * s - 1.0) * (d - b)
            }
        }),
        BlendMethod::Difference => separable(&mut mixed, &cb, |s, b| (s - b).abs()),
        BlendMethod::Exclusion => separable(&mut mixed, &cb, |s, b| s + b - 2.0 * s * b),
        BlendMethod::Hue => {
            let (s, b) = (rgb(cs, abgr), rgb(cb, abgr));
            mixed = from_rgb(set_lum(set_sat(s, sat(b)), lum(b)), abgr);
        }
        BlendMethod::Saturation => {
            let (s, b) = (rgb(cs, abgr), rgb(cb, abgr));
            mixed = from_rgb(set_lum(set_sat(b, sat(s)), lum(b)), abgr);
        }
        BlendMethod::Color => {
            let (s, b) = (rgb(cs, abgr), rgb(cb, abgr));
            mixed = from_rgb(set_lum(s, lum(b)), abgr);
        }
        BlendMethod::Luminosity => {
            let (s, b) = (rgb(cs, abgr), rgb(cb, abgr));
            mixed = from_rgb(set_lum(b, lum(s)), abgr);
        }
        BlendMethod::Normal | BlendMethod::Add => {}
    }

    let sa_f = f32::from(sa) / 255.0;
    let mut out = [0_u8; 4];
    for i in 0..3 {
        let c = (1.0 - ab) * cs[i] + ab * mixed[i].clamp(0.0, 1.0);
        out[i] = (c * sa_f * 255.0 + 0.5) as u8;
    }
    out[3] = sa;
    join(out)
}

#[inline]
fn separable(src: &mut [f32; 3], bg: &[f32; 3], f: impl Fn(f32, f32) -> f32) {
    for (s, b) in src.iter_mut().zip(bg) {
        *s = f(*s, *b);
    }
}

#[inline]
fn screen(s: f32, b: f32) -> f32 {
    s + b - s * b
}

#[inline]
fn hard_light(s: f32, b: f32) -> f32 {
    if s <= 0.5 {
        b * 2.0 * s
    } else {
        screen(b, 2.0 * s - 1.0)
    }
}

fn unpremultiply(c: u32) -> [f32; 3] {
    let [c0, c1, c2, a] = split(c);
    if a == 0 {
        return [0.0; 3];
    }
    let a = f32::from(a);
    [
        (f32::from(c0) / a).min(1.0),
        (f32::from(c1) / a).min(1.0),
        (f32::from(c2) / a).min(1.0),
    ]
}

/// Reorder channels to `[r, g, b]`.
#[inline]
fn rgb(c: [f32; 3], abgr: bool) -> [f32; 3] {
    if abgr {
        c
    } else {
        [c[2], c[1], c[0]]
    }
}

/// Inverse of [`rgb`].
#[inline]
fn from_rgb(c: [f32; 3], abgr: bool) -> [f32; 3] {
    rgb(c, abgr)
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn clip_color(mut c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);

    for v in &mut c {
        if n < 0.0 {
            *v = l + (*v - l) * l / (l - n);
        }
        if x > 1.0 {
            *v = l + (*v - l) * (1.0 - l) / (x - l);
        }
    }
    c
}

fn set_lum(mut c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    for v in &mut c {
        *v += d;
    }
    clip_color(c)
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let mut idx = [0_usize, 1, 2];
    idx.sort_by(|a, b| c[*a].total_cmp(&c[*b]));
    let [min, mid, max] = idx;

    let mut out = [0.0; 3];
    if c[max] > c[min] {
        out[mid] = (c[mid] - c[min]) * s / (c[max] - c[min]);
        out[max] = s;
    }
    out
}

/// Blend a coverage value into a single-channel target.
#[inline]
pub(crate) fn blend8(src: u8, dst: u8) -> u8 {
    src.saturating_add(multiply(dst, 255 - src))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: u32 = 0xff80_8080;
    const RED: u32 = 0xff00_00ff;

    #[test]
    fn normal_over_transparent_keeps_source() {
        for method in BlendMethod::ALL {
            assert_eq!(blend(method, RED, 0, 255, true), RED, "{method:?}");
        }
    }

    #[test]
    fn multiply_with_white_is_identity() {
        let out = blend(BlendMethod::Multiply, GRAY, 0xffff_ffff, 255, true);
        assert_eq!(split(out)[0], 0x80);
    }

    #[test]
    fn screen_with_black_is_identity() {
        let out = blend(BlendMethod::Screen, GRAY, 0xff00_0000, 255, true);
        assert_eq!(split(out)[1], 0x80);
    }

    #[test]
    fn difference_of_equal_colors_is_black() {
        let out = blend(BlendMethod::Difference, GRAY, GRAY, 255, true);
        assert_eq!(out, 0xff00_0000);
    }

    #[test]
    fn add_saturates() {
        let out = blend(BlendMethod::Add, GRAY, GRAY, 255, true);
        assert_eq!(out, 0xffff_ffff);
    }

    #[test]
    fn luminosity_of_gray_over_red_keeps_gray_luma() {
        let out = blend(BlendMethod::Luminosity, GRAY, RED, 255, true);
        let [r, g, b, a] = split(out);
        assert_eq!(a, 255);
        let l = (0.3 * f32::from(r) + 0.59 * f32::from(g) + 0.11 * f32::from(b)) / 255.0;
        assert!((l - 128.0 / 255.0).abs() < 0.02);
    }

    #[test]
    fn coverage_scales_result() {
        let out = blend(BlendMethod::Multiply, RED, 0xffff_ffff, 0, true);
        assert_eq!(out, 0xffff_ffff);
    }

    #[test]
    fn blend8_accumulates() {
        assert_eq!(blend8(255, 10), 255);
        assert_eq!(blend8(0, 10), 10);
    }
}
