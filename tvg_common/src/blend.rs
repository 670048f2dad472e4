// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blend modes, mask methods, color spaces, and composition flags.

use core::ops::{BitOr, BitOrAssign};

/// Layout of a 32-bit (or 8-bit) pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// `0xAABBGGRR`, premultiplied.
    #[default]
    Abgr8888,
    /// `0xAARRGGBB`, premultiplied.
    Argb8888,
    /// `0xAABBGGRR`, straight alpha.
    Abgr8888S,
    /// `0xAARRGGBB`, straight alpha.
    Argb8888S,
    /// One 8-bit channel.
    Grayscale8,
    /// Not determined yet.
    Unknown,
}

impl ColorSpace {
    /// Bytes per pixel.
    pub fn channel_size(self) -> usize {
        match self {
            Self::Grayscale8 => 1,
            Self::Unknown => 0,
            _ => 4,
        }
    }

    /// Whether pixels are stored with straight alpha.
    pub fn is_straight(self) -> bool {
        matches!(self, Self::Abgr8888S | Self::Argb8888S)
    }

    /// Whether the red channel occupies the low byte.
    pub fn is_abgr(self) -> bool {
        matches!(self, Self::Abgr8888 | Self::Abgr8888S)
    }

    /// The premultiplied space with the same byte order.
    pub fn premultiplied(self) -> Self {
        match self {
            Self::Abgr8888S => Self::Abgr8888,
            Self::Argb8888S => Self::Argb8888,
            other => other,
        }
    }
}

/// How a paint is combined with what lies below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMethod {
    /// Source over.
    #[default]
    Normal,
    /// `S * D`.
    Multiply,
    /// `S + D - S * D`.
    Screen,
    /// Multiply or screen depending on the destination.
    Overlay,
    /// `min(S, D)`.
    Darken,
    /// `max(S, D)`.
    Lighten,
    /// Brighten the destination by the source.
    ColorDodge,
    /// Darken the destination by the source.
    ColorBurn,
    /// Multiply or screen depending on the source.
    HardLight,
    /// A softer version of hard light.
    SoftLight,
    /// `|S - D|`.
    Difference,
    /// `S + D - 2 * S * D`.
    Exclusion,
    /// Hue of the source with saturation and luminosity of the destination.
    Hue,
    /// Saturation of the source with hue and luminosity of the destination.
    Saturation,
    /// Hue and saturation of the source with luminosity of the destination.
    Color,
    /// Luminosity of the source with hue and saturation of the destination.
    Luminosity,
    /// `S + D`.
    Add,
}

impl BlendMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Luminosity,
        Self::Add,
    ];

    /// Lowercase identifier used to name shader programs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::ColorDodge => "colordodge",
            Self::ColorBurn => "colorburn",
            Self::HardLight => "hardlight",
            Self::SoftLight => "softlight",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
            Self::Add => "add",
        }
    }

    /// Whether the method reads back the destination in a shader.
    ///
    /// Normal blending and `Add` map onto fixed-function blending.
    pub fn is_complex(self) -> bool {
        !matches!(self, Self::Normal | Self::Add)
    }
}

/// How a mask modulates its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaskMethod {
    /// No masking.
    #[default]
    None,
    /// Keep the target where the mask is opaque.
    Alpha,
    /// Keep the target where the mask is transparent.
    InvAlpha,
    /// Keep the target by the luminance of the mask.
    Luma,
    /// Keep the target by the inverse luminance of the mask.
    InvLuma,
    /// Sum of target and mask alpha.
    Add,
    /// Target alpha minus mask alpha.
    Subtract,
    /// Product of target and mask alpha.
    Intersect,
    /// Absolute difference of target and mask alpha.
    Difference,
    /// Maximum of target and mask alpha.
    Lighten,
    /// Minimum of target and mask alpha.
    Darken,
}

impl MaskMethod {
    /// Suffix used to name mask shader programs.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Alpha => "alpha",
            Self::InvAlpha => "inv_alpha",
            Self::Luma => "luma",
            Self::InvLuma => "inv_luma",
            Self::Add => "add",
            Self::Subtract => "sub",
            Self::Intersect => "intersect",
            Self::Difference => "diff",
            Self::Lighten => "lighten",
            Self::Darken => "darken",
        }
    }

    /// Whether the mask combines alpha channels with a target already drawn,
    /// as opposed to modulating the source while it is drawn.
    pub fn is_matting(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Subtract
                | Self::Intersect
                | Self::Difference
                | Self::Lighten
                | Self::Darken
        )
    }

    /// Whether the composed region is the union of target and mask rather than
    /// their intersection.
    pub fn merges_region(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Difference | Self::Lighten | Self::Darken
        )
    }
}

/// Purpose of an offscreen composition target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositionFlag(u8);

impl CompositionFlag {
    /// No special purpose.
    pub const INVALID: Self = Self(0);
    /// Scene opacity.
    pub const OPACITY: Self = Self(1);
    /// Blending with a non-normal method.
    pub const BLENDING: Self = Self(2);
    /// Masking.
    pub const MASKING: Self = Self(4);
    /// Post effects, which may process the target in place along either axis.
    pub const POST_PROCESSING: Self = Self(8);

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitOr for CompositionFlag {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompositionFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_merging_methods() {
        let merging: Vec<_> = [
            MaskMethod::Alpha,
            MaskMethod::InvAlpha,
            MaskMethod::Luma,
            MaskMethod::InvLuma,
            MaskMethod::Add,
            MaskMethod::Subtract,
            MaskMethod::Intersect,
            MaskMethod::Difference,
            MaskMethod::Lighten,
            MaskMethod::Darken,
        ]
        .into_iter()
        .filter(|m| m.merges_region())
        .collect();
        assert_eq!(
            merging,
            [
                MaskMethod::Add,
                MaskMethod::Difference,
                MaskMethod::Lighten,
                MaskMethod::Darken
            ]
        );
    }

    #[test]
    fn flags_combine() {
        let flags = CompositionFlag::MASKING | CompositionFlag::POST_PROCESSING;
        assert!(flags.contains(CompositionFlag::MASKING));
        assert!(!flags.contains(CompositionFlag::OPACITY));
        assert!(!flags.contains(CompositionFlag::INVALID));
    }

    #[test]
    fn straight_spaces_premultiply_to_same_order() {
        assert_eq!(ColorSpace::Argb8888S.premultiplied(), ColorSpace::Argb8888);
        assert_eq!(ColorSpace::Grayscale8.channel_size(), 1);
    }
}
