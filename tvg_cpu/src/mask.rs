// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mask methods.
//!
//! `Alpha`, `InvAlpha`, `Luma` and `InvLuma` modulate the source by a value read from the
//! mask surface as the source is drawn. The remaining methods combine the alpha of the
//! source with an 8-bit mask already in the compositor.

use tvg_common::blend::MaskMethod;

use crate::pixel::{alpha, luma, multiply};

/// The factor a source pixel is scaled by, given the mask pixel below it.
///
/// For 8-bit masks `mask` holds the value in its low byte.
#[inline]
pub(crate) fn modulation(method: MaskMethod, mask: u32, grayscale: bool, abgr: bool) -> u8 {
    let value = if grayscale { mask as u8 } else { alpha(mask) };
    match method {
        MaskMethod::Alpha => value,
        MaskMethod::InvAlpha => 255 - value,
        MaskMethod::Luma if grayscale => value,
        MaskMethod::Luma => luma(mask, abgr),
        MaskMethod::InvLuma if grayscale => 255 - value,
        MaskMethod::InvLuma => 255 - luma(mask, abgr),
        _ => 255,
    }
}

/// Combine source alpha `s` with the mask value `d`.
#[inline]
pub(crate) fn combine(method: MaskMethod, s: u8, d: u8) -> u8 {
    match method {
        MaskMethod::Add => s.saturating_add(multiply(d, 255 - s)),
        MaskMethod::Subtract => multiply(s, 255 - d),
        MaskMethod::Intersect => multiply(s, d),
        MaskMethod::Difference => multiply(s, 255 - d).saturating_add(multiply(d, 255 - s)),
        MaskMethod::Lighten => s.max(d),
        MaskMethod::Darken => s.min(d),
        _ => s,
    }
}

/// Rescale the premultiplied `px` so its alpha becomes `a`.
#[inline]
pub(crate) fn rescale(px: u32, a: u8) -> u32 {
    let pa = u32::from(alpha(px));
    if pa == 0 {
        return 0;
    }
    if pa == u32::from(a) {
        return px;
    }
    let scale = |c: u32| ((c & 0xff) * u32::from(a) / pa).min(u32::from(a));
    (u32::from(a) << 24) | (scale(px >> 16) << 16) | (scale(px >> 8) << 8) | scale(px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_and_inverse_are_complementary() {
        let mask = 0x40ff_ffff;
        let a = modulation(MaskMethod::Alpha, mask, false, true);
        let inv = modulation(MaskMethod::InvAlpha, mask, false, true);
        assert_eq!(u16::from(a) + u16::from(inv), 255);
    }

    #[test]
    fn luma_reads_color() {
        assert_eq!(modulation(MaskMethod::Luma, 0xff00_0000, false, true), 0);
        assert_eq!(modulation(MaskMethod::Luma, 0xffff_ffff, false, true), 255);
        assert_eq!(modulation(MaskMethod::InvLuma, 0xffff_ffff, false, true), 0);
    }

    #[test]
    fn grayscale_masks_use_low_byte() {
        assert_eq!(modulation(MaskMethod::Alpha, 0x7f, true, true), 0x7f);
        assert_eq!(modulation(MaskMethod::Luma, 0x7f, true, true), 0x7f);
    }

    #[test]
    fn compositing_ops() {
        assert_eq!(combine(MaskMethod::Add, 255, 0), 255);
        assert_eq!(combine(MaskMethod::Add, 0, 100), 100);
        assert_eq!(combine(MaskMethod::Subtract, 255, 255), 0);
        assert_eq!(combine(MaskMethod::Subtract, 255, 0), 255);
        assert_eq!(combine(MaskMethod::Intersect, 255, 0), 0);
        assert_eq!(combine(MaskMethod::Intersect, 255, 255), 255);
        assert_eq!(combine(MaskMethod::Difference, 255, 255), 0);
        assert_eq!(combine(MaskMethod::Lighten, 10, 20), 20);
        assert_eq!(combine(MaskMethod::Darken, 10, 20), 10);
    }

    #[test]
    fn rescale_keeps_hue() {
        assert_eq!(rescale(0x8080_0000, 0xff), 0xffff_0000);
        assert_eq!(rescale(0xffff_0000, 0x80), 0x8080_0000);
        assert_eq!(rescale(0, 0x80), 0);
    }
}
