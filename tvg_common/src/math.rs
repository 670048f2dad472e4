// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Floating-point geometry: points, affine matrices, lines and cubic Béziers.

use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

/// Tolerance used by [`zero`] and [`equal`].
pub const FLOAT_EPSILON: f32 = 1.0e-06;

/// Control-point distance ratio for approximating a quarter circle with a cubic.
pub const PATH_KAPPA: f32 = 0.552_284;

/// Returns whether `a` is zero within [`FLOAT_EPSILON`].
#[inline]
pub fn zero(a: f32) -> bool {
    a.abs() <= FLOAT_EPSILON
}

/// Returns whether `a` and `b` are equal within [`FLOAT_EPSILON`].
#[inline]
pub fn equal(a: f32, b: f32) -> bool {
    zero(a - b)
}

/// Convert degrees to radians.
#[inline]
pub fn deg2rad(degree: f32) -> f32 {
    degree.to_radians()
}

/// A point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// The x coordinate of the point.
    pub x: f32,
    /// The y coordinate of the point.
    pub y: f32,
}

impl Point {
    /// The point `(0, 0)`.
    pub const ZERO: Self = Self::new(0., 0.);

    /// Create a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// The z component of the 3D cross product.
    #[inline]
    pub fn cross(self, rhs: Self) -> f32 {
        self.x * rhs.y - rhs.x * self.y
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f32 {
        self.length2().sqrt()
    }

    /// Squared euclidean length.
    #[inline]
    pub fn length2(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Scale to unit length. A zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }

    /// Whether both components are within [`FLOAT_EPSILON`] of zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        zero(self.x) && zero(self.y)
    }

    /// Tolerant equality.
    #[inline]
    pub fn approx_eq(self, rhs: Self) -> bool {
        equal(self.x, rhs.x) && equal(self.y, rhs.y)
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y))
    }

    /// Whether either coordinate is NaN.
    #[inline]
    pub fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    /// Apply `m` to this point.
    #[inline]
    pub fn transform(self, m: &Matrix) -> Self {
        Self::new(
            self.x * m.e11 + self.y * m.e12 + m.e13,
            self.x * m.e21 + self.y * m.e22 + m.e23,
        )
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Point> for f32 {
    type Output = Point;

    fn mul(self, rhs: Point) -> Point {
        rhs * self
    }
}

impl MulAssign<f32> for Point {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f32> for Point {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<&Matrix> for Point {
    type Output = Self;

    fn mul(self, rhs: &Matrix) -> Self {
        self.transform(rhs)
    }
}

/// Turn direction of three points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// The points are collinear.
    Linear,
    /// The turn is clockwise in a y-down coordinate system.
    Clockwise,
    /// The turn is counter-clockwise in a y-down coordinate system.
    CounterClockwise,
}

/// Compute the orientation of `p1 → p2 → p3`.
pub fn orientation(p1: Point, p2: Point, p3: Point) -> Orientation {
    let val = (p2 - p1).cross(p3 - p1);
    if zero(val) {
        Orientation::Linear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// A 3x3 affine matrix, row-major.
///
/// ```text
/// | e11 e12 e13 |
/// | e21 e22 e23 |
/// | e31 e32 e33 |
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs, reason = "element names are self-describing")]
pub struct Matrix {
    pub e11: f32,
    pub e12: f32,
    pub e13: f32,
    pub e21: f32,
    pub e22: f32,
    pub e23: f32,
    pub e31: f32,
    pub e32: f32,
    pub e33: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        e11: 1.0,
        e12: 0.0,
        e13: 0.0,
        e21: 0.0,
        e22: 1.0,
        e23: 0.0,
        e31: 0.0,
        e32: 0.0,
        e33: 1.0,
    };

    /// A translation.
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self {
            e13: tx,
            e23: ty,
            ..Self::IDENTITY
        }
    }

    /// A non-uniform scale.
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            e11: sx,
            e22: sy,
            ..Self::IDENTITY
        }
    }

    /// A rotation by `degree` degrees around the origin.
    pub fn rotate(degree: f32) -> Self {
        let (s, c) = deg2rad(degree).sin_cos();
        Self {
            e11: c,
            e12: -s,
            e21: s,
            e22: c,
            ..Self::IDENTITY
        }
    }

    /// Whether this is (exactly) the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The x scale factor, `sqrt(e11² + e21²)`.
    pub fn scaling(&self) -> f32 {
        (self.e11 * self.e11 + self.e21 * self.e21).sqrt()
    }

    /// The x and y scale factors.
    pub fn scaling_2d(&self) -> Point {
        Point::new(
            (self.e11 * self.e11 + self.e21 * self.e21).sqrt(),
            (self.e12 * self.e12 + self.e22 * self.e22).sqrt(),
        )
    }

    /// The rotation angle in radians, folded to `[0, π]`.
    pub fn radian(&self) -> f32 {
        self.e21.atan2(self.e11).abs()
    }

    /// Whether the rotation is a multiple of 90 degrees.
    pub fn right_angle(&self) -> bool {
        let radian = self.radian();
        zero(radian)
            || zero(radian - core::f32::consts::FRAC_PI_2)
            || zero(radian - core::f32::consts::PI)
    }

    /// Whether the matrix contains a skew component.
    pub fn skewed(&self) -> bool {
        !zero(self.e21 + self.e12)
    }

    /// Whether the matrix is a pure translation.
    pub fn is_translation(&self) -> bool {
        self.e11 == 1.0 && self.e22 == 1.0 && zero(self.e12) && zero(self.e21)
    }

    /// The inverse, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.e11 * (self.e22 * self.e33 - self.e32 * self.e23)
            - self.e12 * (self.e21 * self.e33 - self.e23 * self.e31)
            + self.e13 * (self.e21 * self.e32 - self.e22 * self.e31);

        if zero(det) {
            return None;
        }

        let inv = 1.0 / det;
        Some(Self {
            e11: (self.e22 * self.e33 - self.e32 * self.e23) * inv,
            e12: (self.e13 * self.e32 - self.e12 * self.e33) * inv,
            e13: (self.e12 * self.e23 - self.e13 * self.e22) * inv,
            e21: (self.e23 * self.e31 - self.e21 * self.e33) * inv,
            e22: (self.e11 * self.e33 - self.e13 * self.e31) * inv,
            e23: (self.e21 * self.e13 - self.e11 * self.e23) * inv,
            e31: (self.e21 * self.e32 - self.e31 * self.e22) * inv,
            e32: (self.e31 * self.e12 - self.e11 * self.e32) * inv,
            e33: (self.e11 * self.e22 - self.e21 * self.e12) * inv,
        })
    }

    /// Expand into a column-major 4x4 matrix for GPU uniform upload.
    pub fn to_mat4(&self) -> [f32; 16] {
        [
            self.e11, self.e21, 0.0, self.e31, //
            self.e12, self.e22, 0.0, self.e32, //
            0.0, 0.0, 1.0, 0.0, //
            self.e13, self.e23, 0.0, self.e33,
        ]
    }
}

impl Mul for Matrix {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            e11: self.e11 * rhs.e11 + self.e12 * rhs.e21 + self.e13 * rhs.e31,
            e12: self.e11 * rhs.e12 + self.e12 * rhs.e22 + self.e13 * rhs.e32,
            e13: self.e11 * rhs.e13 + self.e12 * rhs.e23 + self.e13 * rhs.e33,
            e21: self.e21 * rhs.e11 + self.e22 * rhs.e21 + self.e23 * rhs.e31,
            e22: self.e21 * rhs.e12 + self.e22 * rhs.e22 + self.e23 * rhs.e32,
            e23: self.e21 * rhs.e13 + self.e22 * rhs.e23 + self.e23 * rhs.e33,
            e31: self.e31 * rhs.e11 + self.e32 * rhs.e21 + self.e33 * rhs.e31,
            e32: self.e31 * rhs.e12 + self.e32 * rhs.e22 + self.e33 * rhs.e32,
            e33: self.e31 * rhs.e13 + self.e32 * rhs.e23 + self.e33 * rhs.e33,
        }
    }
}

/// A line segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    /// The start point of the line.
    pub pt1: Point,
    /// The end point of the line.
    pub pt2: Point,
}

impl Line {
    /// Create a new line.
    pub fn new(pt1: Point, pt2: Point) -> Self {
        Self { pt1, pt2 }
    }

    /// Euclidean length.
    pub fn length(&self) -> f32 {
        (self.pt2 - self.pt1).length()
    }

    /// Split at arc length `at` from `pt1`.
    pub fn split(&self, at: f32) -> (Self, Self) {
        let len = self.length();
        let t = if len > 0.0 { at / len } else { 0.0 };
        let mid = self.pt1 + (self.pt2 - self.pt1) * t;
        (Self::new(self.pt1, mid), Self::new(mid, self.pt2))
    }
}

/// Chord length approximation used to drive Bézier subdivision.
///
/// Alpha-max-plus-beta-min with alpha = 1 and beta = 3/8.
#[inline]
fn approx_length(a: Point, b: Point) -> f32 {
    let x = (b.x - a.x).abs();
    let y = (b.y - a.y).abs();
    if x > y {
        x + 0.375 * y
    } else {
        y + 0.375 * x
    }
}

/// A cubic Bézier curve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[allow(missing_docs, reason = "control point names are self-describing")]
pub struct Bezier {
    pub start: Point,
    pub ctrl1: Point,
    pub ctrl2: Point,
    pub end: Point,
}

impl Bezier {
    /// Create a new curve.
    pub fn new(start: Point, ctrl1: Point, ctrl2: Point, end: Point) -> Self {
        Self {
            start,
            ctrl1,
            ctrl2,
            end,
        }
    }

    /// Approximate a quarter-circle arc of `radius` between `start` and `end`.
    pub fn arc(start: Point, end: Point, radius: f32) -> Self {
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let c = radius * PATH_KAPPA;
        let (s, co) = angle.sin_cos();
        Self {
            start,
            ctrl1: Point::new(start.x + radius * co, start.y + radius * s),
            ctrl2: Point::new(end.x - c * co, end.y - c * s),
            end,
        }
    }

    /// Split in half.
    pub fn split(&self) -> (Self, Self) {
        let c = (self.ctrl1 + self.ctrl2) * 0.5;
        let l1 = (self.start + self.ctrl1) * 0.5;
        let r2 = (self.ctrl2 + self.end) * 0.5;
        let l2 = (l1 + c) * 0.5;
        let r1 = (r2 + c) * 0.5;
        let mid = (l2 + r1) * 0.5;
        (
            Self::new(self.start, l1, l2, mid),
            Self::new(mid, r1, r2, self.end),
        )
    }

    /// Split at parameter `t`.
    pub fn split_at_t(&self, t: f32) -> (Self, Self) {
        let p01 = self.start + (self.ctrl1 - self.start) * t;
        let p12 = self.ctrl1 + (self.ctrl2 - self.ctrl1) * t;
        let p23 = self.ctrl2 + (self.end - self.ctrl2) * t;
        let p012 = p01 + (p12 - p01) * t;
        let p123 = p12 + (p23 - p12) * t;
        let mid = p012 + (p123 - p012) * t;
        (
            Self::new(self.start, p01, p012, mid),
            Self::new(mid, p123, p23, self.end),
        )
    }

    /// Arc length, by subdividing until the control polygon matches the chord.
    pub fn length(&self) -> f32 {
        self.length_impl(0)
    }

    fn length_impl(&self, depth: u32) -> f32 {
        let len = approx_length(self.start, self.ctrl1)
            + approx_length(self.ctrl1, self.ctrl2)
            + approx_length(self.ctrl2, self.end);
        let chord = approx_length(self.start, self.end);

        if (len - chord).abs() > 1e-3 && depth < 16 {
            let (left, right) = self.split();
            return left.length_impl(depth + 1) + right.length_impl(depth + 1);
        }
        len
    }

    /// The parameter `t` at which the arc length from `start` equals `at`.
    pub fn t_at_length(&self, at: f32) -> f32 {
        let len = self.length();
        if at >= len {
            return 1.0;
        }
        if at <= 0.0 {
            return 0.0;
        }

        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        let mut t = at / len;
        for _ in 0..24 {
            let (left, _) = self.split_at_t(t);
            let l = left.length();
            if (l - at).abs() < 1e-3 {
                break;
            }
            if l < at {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }

    /// Split at arc length `at` from `start`.
    pub fn split_at_length(&self, at: f32) -> (Self, Self) {
        self.split_at_t(self.t_at_length(at))
    }

    /// Evaluate the curve at `t`.
    pub fn at(&self, t: f32) -> Point {
        let it = 1.0 - t;
        let a = it * it * it;
        let b = 3.0 * it * it * t;
        let c = 3.0 * it * t * t;
        let d = t * t * t;
        self.start * a + self.ctrl1 * b + self.ctrl2 * c + self.end * d
    }

    /// Number of flat segments needed to approximate the curve within half a unit.
    pub fn segment_count(&self) -> u32 {
        self.segment_count_impl(0)
    }

    fn segment_count_impl(&self, depth: u32) -> u32 {
        if self.is_flat() || depth >= 10 {
            return 1;
        }
        let (left, right) = self.split();
        left.segment_count_impl(depth + 1) + right.segment_count_impl(depth + 1)
    }

    fn is_flat(&self) -> bool {
        let d1 = self.ctrl1 * 3.0 - self.start * 2.0 - self.end;
        let d2 = self.ctrl2 * 3.0 - self.end * 2.0 - self.start;
        let dx = d1.x.abs().max(d2.x.abs());
        let dy = d1.y.abs().max(d2.y.abs());
        dx + dy <= 0.5
    }

    /// Apply `m` to every control point.
    pub fn transform(&self, m: &Matrix) -> Self {
        Self::new(
            self.start.transform(m),
            self.ctrl1.transform(m),
            self.ctrl2.transform(m),
            self.end.transform(m),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_inverse_roundtrip() {
        let m = Matrix::translate(10.0, -4.0) * Matrix::rotate(30.0) * Matrix::scale(2.0, 3.0);
        let inv = m.inverse().unwrap();
        let p = Point::new(7.0, 9.0);
        let q = p.transform(&m).transform(&inv);
        assert!((p.x - q.x).abs() < 1e-4 && (p.y - q.y).abs() < 1e-4);
    }

    #[test]
    fn composed_matrix_applies_right_first() {
        let outer = Matrix::translate(10.0, -4.0) * Matrix::rotate(30.0);
        let inner = Matrix::scale(2.0, 3.0) * Matrix::rotate(-75.0);
        let composed = outer * inner;

        let p = Point::new(7.0, 9.0);
        let once = p.transform(&composed);
        let twice = p.transform(&inner).transform(&outer);
        assert!((once.x - twice.x).abs() < 1e-3 && (once.y - twice.y).abs() < 1e-3);

        let bz = Bezier::new(
            Point::new(0.0, 0.0),
            Point::new(5.0, 10.0),
            Point::new(15.0, -10.0),
            Point::new(20.0, 0.0),
        );
        let once = bz.transform(&composed);
        let twice = bz.transform(&inner).transform(&outer);
        for (a, b) in [
            (once.start, twice.start),
            (once.ctrl1, twice.ctrl1),
            (once.ctrl2, twice.ctrl2),
            (once.end, twice.end),
        ] {
            assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3);
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Matrix::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn straight_cubic_length() {
        let bz = Bezier::new(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        );
        assert!((bz.length() - 30.0).abs() < 0.01);

        let (left, right) = bz.split_at_length(12.0);
        assert!((left.end.x - 12.0).abs() < 0.05);
        assert_eq!(right.end, bz.end);
    }

    #[test]
    fn line_split_at_length() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let (a, b) = line.split(4.0);
        assert_eq!(a.pt2, Point::new(0.0, 4.0));
        assert_eq!(b.pt1, Point::new(0.0, 4.0));
    }

    #[test]
    fn orientation_of_turns() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        assert_eq!(orientation(a, b, Point::new(2.0, 0.0)), Orientation::Linear);
        assert_eq!(
            orientation(a, b, Point::new(1.0, 1.0)),
            Orientation::Clockwise
        );
    }
}
