// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed 32-bit pixel arithmetic.
//!
//! Pixels keep alpha in the top byte. The three color channels are called `c0` (low
//! byte) to `c2`, since which of them is red depends on the color space.

use tvg_common::shape::RenderColor;

/// `c * a / 255`, rounded up.
#[inline]
pub(crate) fn multiply(c: u8, a: u8) -> u8 {
    ((u32::from(c) * u32::from(a) + 0xff) >> 8) as u8
}

/// Alpha of `c`.
#[inline]
pub(crate) fn alpha(c: u32) -> u8 {
    (c >> 24) as u8
}

/// `255 - alpha(c)`.
#[inline]
pub(crate) fn ialpha(c: u32) -> u8 {
    (!c >> 24) as u8
}

/// Scale all four channels of `c` by `a / 256`.
#[inline]
pub(crate) fn alpha_blend(c: u32, a: u8) -> u32 {
    let a = u32::from(a);
    ((((c >> 8) & 0x00ff_00ff) * a) & 0xff00_ff00) + ((((c & 0x00ff_00ff) * a) >> 8) & 0x00ff_00ff)
}

/// `s * a + d * (255 - a)` on all four channels.
#[inline]
pub(crate) fn interpolate(s: u32, d: u32, a: u8) -> u32 {
    let a = u32::from(a);
    let hi = ((((s >> 8) & 0xff_00ff)
        .wrapping_sub((d >> 8) & 0xff_00ff)
        .wrapping_mul(a))
    .wrapping_add(d & 0xff00_ff00))
        & 0xff00_ff00;
    let lo = (((((s & 0xff_00ff).wrapping_sub(d & 0xff_00ff)).wrapping_mul(a)) >> 8)
        .wrapping_add(d & 0xff_00ff))
        & 0xff_00ff;
    hi + lo
}

/// `s * a + d * (255 - a)` on one channel.
#[inline]
pub(crate) fn interpolate8(s: u8, d: u8, a: u8) -> u8 {
    multiply(s, a).saturating_add(multiply(d, !a))
}

/// Premultiplied source over destination.
#[inline]
pub(crate) fn src_over(s: u32, d: u32) -> u32 {
    match alpha(s) {
        255 => s,
        0 if s == 0 => d,
        _ => s + alpha_blend(d, ialpha(s)),
    }
}

/// The channel bytes of `c`, as `[c0, c1, c2, a]`.
#[inline]
pub(crate) fn split(c: u32) -> [u8; 4] {
    c.to_le_bytes()
}

/// Inverse of [`split`].
#[inline]
pub(crate) fn join(ch: [u8; 4]) -> u32 {
    u32::from_le_bytes(ch)
}

/// Pack a straight color in the given order and premultiply it.
#[inline]
pub(crate) fn premultiplied(c: RenderColor, abgr: bool) -> u32 {
    let (c0, c2) = if abgr { (c.r, c.b) } else { (c.b, c.r) };
    join([
        multiply(c0, c.a),
        multiply(c.g, c.a),
        multiply(c2, c.a),
        c.a,
    ])
}

/// Luminance of a premultiplied pixel.
#[inline]
pub(crate) fn luma(c: u32, abgr: bool) -> u8 {
    let [c0, c1, c2, _] = split(c);
    let (r, b) = if abgr { (c0, c2) } else { (c2, c0) };
    ((u32::from(r) * 54 + u32::from(c1) * 183 + u32::from(b) * 19) >> 8) as u8
}
