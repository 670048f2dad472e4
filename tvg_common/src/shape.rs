// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape descriptors handed to the renderers: fills, strokes, and fill rules.

use crate::math::{Matrix, Point};
use crate::path::RenderPath;

/// A straight-alpha 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "channel names are self-describing")]
pub struct RenderColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RenderColor {
    /// Create a new color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Parity rule deciding whether a point lies inside a self-intersecting path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillRule {
    /// Inside when the winding number is non-zero.
    #[default]
    NonZero,
    /// Inside when the winding number is odd.
    EvenOdd,
}

/// Shape drawn at the open ends of a stroke.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeCap {
    /// The stroke ends flush with the end point.
    Butt,
    /// A half disc centered on the end point.
    Round,
    /// A half square extending past the end point.
    #[default]
    Square,
}

/// Shape drawn where two stroked segments meet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeJoin {
    /// The outer corners are connected by a straight line.
    #[default]
    Bevel,
    /// The outer corners are connected by an arc.
    Round,
    /// The outer edges are extended until they meet, up to the miter limit.
    Miter,
}

/// Behavior of a gradient outside of `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillSpread {
    /// Clamp to the edge colors.
    #[default]
    Pad,
    /// Mirror every other repetition.
    Reflect,
    /// Repeat the gradient.
    Repeat,
}

/// A gradient color stop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorStop {
    /// Position along the gradient, in `[0, 1]`.
    pub offset: f32,
    /// The straight-alpha color at this stop.
    pub color: RenderColor,
}

impl ColorStop {
    /// Create a new color stop.
    pub const fn new(offset: f32, color: RenderColor) -> Self {
        Self { offset, color }
    }
}

/// A linear gradient from `p1` to `p2`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// Where `t = 0`.
    pub p1: Point,
    /// Where `t = 1`.
    pub p2: Point,
}

/// A two-point conical gradient from the focal circle to the end circle.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    /// Center of the end circle.
    pub center: Point,
    /// Radius of the end circle.
    pub radius: f32,
    /// Center of the focal circle.
    pub focal: Point,
    /// Radius of the focal circle.
    pub focal_radius: f32,
}

/// The geometry of a gradient.
#[derive(Clone, Debug, PartialEq)]
pub enum GradientKind {
    /// See [`LinearGradient`].
    Linear(LinearGradient),
    /// See [`RadialGradient`].
    Radial(RadialGradient),
}

/// A gradient paint.
#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    /// The geometry.
    pub kind: GradientKind,
    /// Sorted color stops.
    pub stops: Vec<ColorStop>,
    /// Behavior outside `[0, 1]`.
    pub spread: FillSpread,
    /// Gradient-space to shape-space transform.
    pub transform: Matrix,
}

impl Fill {
    /// A linear gradient.
    pub fn linear(p1: Point, p2: Point, stops: Vec<ColorStop>) -> Self {
        Self {
            kind: GradientKind::Linear(LinearGradient { p1, p2 }),
            stops,
            spread: FillSpread::Pad,
            transform: Matrix::IDENTITY,
        }
    }

    /// A radial gradient whose focal point is the center.
    pub fn radial(center: Point, radius: f32, stops: Vec<ColorStop>) -> Self {
        Self::radial_focal(center, radius, center, 0.0, stops)
    }

    /// A radial gradient with an explicit focal circle.
    pub fn radial_focal(
        center: Point,
        radius: f32,
        focal: Point,
        focal_radius: f32,
        stops: Vec<ColorStop>,
    ) -> Self {
        Self {
            kind: GradientKind::Radial(RadialGradient {
                center,
                radius,
                focal,
                focal_radius,
            }),
            stops,
            spread: FillSpread::Pad,
            transform: Matrix::IDENTITY,
        }
    }

    /// Set the spread mode.
    pub fn with_spread(mut self, spread: FillSpread) -> Self {
        self.spread = spread;
        self
    }

    /// Set the gradient transform.
    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = transform;
        self
    }
}

/// A trim path range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trim {
    /// Start of the kept range, as a fraction of the length.
    pub begin: f32,
    /// End of the kept range, as a fraction of the length.
    pub end: f32,
    /// Whether each sub-path is trimmed individually.
    pub simultaneous: bool,
}

impl Default for Trim {
    fn default() -> Self {
        Self {
            begin: 0.0,
            end: 1.0,
            simultaneous: true,
        }
    }
}

/// A stroke descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStroke {
    /// Stroke width in user units.
    pub width: f32,
    /// Solid stroke color, used when `fill` is `None`.
    pub color: RenderColor,
    /// Gradient stroke paint.
    pub fill: Option<Fill>,
    /// Alternating dash and gap lengths.
    pub dash: Vec<f32>,
    /// Offset into the dash pattern.
    pub dash_offset: f32,
    /// Miter limit, at least 1.
    pub miterlimit: f32,
    /// Cap style.
    pub cap: StrokeCap,
    /// Join style.
    pub join: StrokeJoin,
    /// Draw the stroke below the fill.
    pub stroke_first: bool,
    /// Trim range.
    pub trim: Trim,
}

impl Default for RenderStroke {
    fn default() -> Self {
        Self {
            width: 0.0,
            color: RenderColor::default(),
            fill: None,
            dash: Vec::new(),
            dash_offset: 0.0,
            miterlimit: 4.0,
            cap: StrokeCap::Square,
            join: StrokeJoin::Bevel,
            stroke_first: false,
            trim: Trim::default(),
        }
    }
}

impl RenderStroke {
    /// A solid stroke of the given width and color.
    pub fn new(width: f32, color: RenderColor) -> Self {
        Self {
            width,
            color,
            ..Self::default()
        }
    }

    /// Whether the trim range removes anything.
    pub fn trimmed(&self) -> bool {
        let Trim { begin, end, .. } = self.trim;
        !(begin == 0.0 && end == 1.0) && (end - begin).abs() < 1.0
    }

    /// Whether a usable dash pattern is set.
    pub fn dashed(&self) -> bool {
        self.dash.len() >= 2 && self.dash.iter().sum::<f32>() > 0.0
    }
}

/// Everything needed to render one shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderShape {
    /// The geometry.
    pub path: RenderPath,
    /// Gradient fill, overriding `color`.
    pub fill: Option<Fill>,
    /// Solid fill color.
    pub color: RenderColor,
    /// The fill rule.
    pub rule: FillRule,
    /// Optional stroke.
    pub stroke: Option<RenderStroke>,
}

impl RenderShape {
    /// A shape with the given path, filled with a solid color.
    pub fn new(path: RenderPath, color: RenderColor) -> Self {
        Self {
            path,
            color,
            ..Self::default()
        }
    }

    /// Stroke width, or zero when not stroked.
    pub fn stroke_width(&self) -> f32 {
        self.stroke.as_ref().map_or(0.0, |s| s.width)
    }

    /// Whether the stroke is trimmed.
    pub fn trimmed(&self) -> bool {
        self.stroke.as_ref().is_some_and(RenderStroke::trimmed)
    }

    /// Whether the stroke is drawn below the fill.
    pub fn stroke_first(&self) -> bool {
        self.stroke.as_ref().is_some_and(|s| s.stroke_first)
    }

    /// The solid stroke color, or transparent when not stroked.
    pub fn stroke_color(&self) -> RenderColor {
        self.stroke.as_ref().map_or(RenderColor::default(), |s| s.color)
    }

    /// The stroke gradient, if any.
    pub fn stroke_fill(&self) -> Option<&Fill> {
        self.stroke.as_ref().and_then(|s| s.fill.as_ref())
    }

    /// The miter limit, or the default when not stroked.
    pub fn stroke_miterlimit(&self) -> f32 {
        self.stroke.as_ref().map_or(4.0, |s| s.miterlimit)
    }
}
