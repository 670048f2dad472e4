// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene post effects and their transform-dependent parameters.

use crate::math::{deg2rad, Matrix, Point};
use crate::region::RenderRegion;
use crate::shape::RenderColor;

/// Axes a blur runs along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlurDirection {
    /// Both axes.
    #[default]
    Both,
    /// Only along x.
    Horizontal,
    /// Only along y.
    Vertical,
}

impl BlurDirection {
    /// Whether the blur spreads along x.
    pub fn horizontal(self) -> bool {
        self != Self::Vertical
    }

    /// Whether the blur spreads along y.
    pub fn vertical(self) -> bool {
        self != Self::Horizontal
    }
}

/// How pixels beyond the image edge are sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlurBorder {
    /// Repeat the edge pixel.
    #[default]
    Duplicate,
    /// Wrap around to the opposite edge.
    Wrap,
}

/// A separable Gaussian blur.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianBlur {
    /// Standard deviation in user units, never negative.
    pub sigma: f32,
    /// Axes to blur.
    pub direction: BlurDirection,
    /// Edge handling.
    pub border: BlurBorder,
    /// Quality hint, 0 to 100.
    pub quality: u8,
}

impl GaussianBlur {
    /// Create a blur, clamping the parameters to their valid ranges.
    pub fn new(sigma: f32, direction: BlurDirection, border: BlurBorder, quality: u8) -> Self {
        Self {
            sigma: sigma.max(0.0),
            direction,
            border,
            quality: quality.min(100),
        }
    }
}

/// A blurred, offset, tinted copy of the content drawn below it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropShadow {
    /// Shadow color.
    pub color: RenderColor,
    /// Direction of the offset in degrees, clockwise from up.
    pub angle: f32,
    /// Length of the offset in user units.
    pub distance: f32,
    /// Blur standard deviation, never negative.
    pub sigma: f32,
    /// Quality hint, 0 to 100.
    pub quality: u8,
}

impl DropShadow {
    /// Create a shadow, clamping the parameters to their valid ranges.
    pub fn new(color: RenderColor, angle: f32, distance: f32, sigma: f32, quality: u8) -> Self {
        Self {
            color,
            angle,
            distance,
            sigma: sigma.max(0.0),
            quality: quality.min(100),
        }
    }
}

/// Luma mapped between two colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tint {
    /// Color for black.
    pub black: [u8; 3],
    /// Color for white.
    pub white: [u8; 3],
    /// Crossfade with the original, 255 is fully tinted.
    pub intensity: u8,
}

/// Luma mapped through shadow, midtone, and highlight colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tritone {
    /// Color for dark pixels.
    pub shadow: [u8; 3],
    /// Color for middle luma.
    pub midtone: [u8; 3],
    /// Color for bright pixels.
    pub highlight: [u8; 3],
    /// Crossfade with the original, 255 keeps the original.
    pub blender: u8,
}

/// A post effect applied to a composed scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneEffect {
    /// See [`GaussianBlur`].
    GaussianBlur(GaussianBlur),
    /// See [`DropShadow`].
    DropShadow(DropShadow),
    /// Replace every pixel with the color, keeping its alpha.
    Fill(RenderColor),
    /// See [`Tint`].
    Tint(Tint),
    /// See [`Tritone`].
    Tritone(Tritone),
}

/// An effect together with the parameters derived from the current transform.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderEffect {
    /// The effect.
    pub effect: SceneEffect,
    /// Growth of the dirty region on each side, as offsets from it.
    pub extend: RenderRegion,
    /// Whether the effect changes anything.
    pub valid: bool,
    /// Scale factor of the transform applied to sigma and distance.
    pub scale: f32,
    /// Kernel extent in device pixels.
    pub extent: f32,
    /// Device-space shadow offset.
    pub offset: Point,
}

impl RenderEffect {
    /// Wrap `effect`. Call [`update`](Self::update) before use.
    pub fn new(effect: SceneEffect) -> Self {
        Self {
            effect,
            extend: RenderRegion::default(),
            valid: false,
            scale: 1.0,
            extent: 0.0,
            offset: Point::ZERO,
        }
    }

    /// Recompute the device-space parameters for `transform`.
    pub fn update(&mut self, transform: &Matrix) {
        self.scale = (transform.e11 * transform.e11 + transform.e12 * transform.e12).sqrt();
        self.extend = RenderRegion::default();
        self.offset = Point::ZERO;

        match self.effect {
            SceneEffect::GaussianBlur(blur) => {
                self.extent = 2.0 * blur.sigma * self.scale;
                self.valid = self.extent > 0.0;
                let e = self.extent.ceil() as i32;
                if blur.direction.horizontal() {
                    self.extend.min.0 = -e;
                    self.extend.max.0 = e;
                }
                if blur.direction.vertical() {
                    self.extend.min.1 = -e;
                    self.extend.max.1 = e;
                }
            }
            SceneEffect::DropShadow(shadow) => {
                let radian = deg2rad(90.0 - shadow.angle);
                self.offset = Point::new(
                    -shadow.distance * radian.cos() * self.scale,
                    -shadow.distance * radian.sin() * self.scale,
                );
                self.extent = 2.0 * shadow.sigma * self.scale;
                self.valid = shadow.color.a > 0;

                // The shadow may be pushed past the content on one side only.
                let e = self.extent.ceil() as i32;
                let (ox, oy) = (self.offset.x.round() as i32, self.offset.y.round() as i32);
                self.extend = RenderRegion::new(
                    -e + ox.min(0),
                    -e + oy.min(0),
                    e + ox.max(0),
                    e + oy.max(0),
                );
            }
            SceneEffect::Fill(_) => {
                self.extent = 0.0;
                self.valid = true;
            }
            SceneEffect::Tint(tint) => {
                self.extent = 0.0;
                self.valid = tint.intensity > 0;
            }
            SceneEffect::Tritone(tritone) => {
                self.extent = 0.0;
                self.valid = tritone.blender < 255;
            }
        }
    }

    /// Grow `region` by the effect's extension.
    pub fn region(&self, region: &RenderRegion) -> RenderRegion {
        RenderRegion::new(
            region.min.0 + self.extend.min.0,
            region.min.1 + self.extend.min.1,
            region.max.0 + self.extend.max.0,
            region.max.1 + self.extend.max.1,
        )
    }

    /// The kernel radius in whole pixels.
    pub fn radius(&self) -> i32 {
        self.extent.ceil() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_extends_by_twice_sigma() {
        let blur = GaussianBlur::new(4.0, BlurDirection::Both, BlurBorder::Duplicate, 100);
        let mut effect = RenderEffect::new(SceneEffect::GaussianBlur(blur));
        effect.update(&Matrix::IDENTITY);
        assert!(effect.valid);
        let region = effect.region(&RenderRegion::new(50, 50, 150, 150));
        assert_eq!(region, RenderRegion::new(42, 42, 158, 158));
    }

    #[test]
    fn horizontal_blur_only_extends_x() {
        let blur = GaussianBlur::new(2.5, BlurDirection::Horizontal, BlurBorder::Wrap, 50);
        let mut effect = RenderEffect::new(SceneEffect::GaussianBlur(blur));
        effect.update(&Matrix::scale(2.0, 2.0));
        let region = effect.region(&RenderRegion::new(0, 0, 10, 10));
        assert_eq!(region, RenderRegion::new(-10, 0, 20, 10));
    }

    #[test]
    fn zero_sigma_is_invalid() {
        let blur = GaussianBlur::new(-1.0, BlurDirection::Both, BlurBorder::Duplicate, 200);
        assert_eq!(blur.sigma, 0.0);
        assert_eq!(blur.quality, 100);
        let mut effect = RenderEffect::new(SceneEffect::GaussianBlur(blur));
        effect.update(&Matrix::IDENTITY);
        assert!(!effect.valid);
    }

    #[test]
    fn shadow_offset_points_along_angle() {
        let shadow = DropShadow::new(RenderColor::new(0, 0, 0, 128), 180.0, 10.0, 0.0, 0);
        let mut effect = RenderEffect::new(SceneEffect::DropShadow(shadow));
        effect.update(&Matrix::IDENTITY);
        assert!(effect.offset.x.abs() < 1e-3);
        assert!((effect.offset.y - 10.0).abs() < 1e-3);
        assert_eq!(effect.extend, RenderRegion::new(0, 0, 0, 10));
    }
}
