// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-point coordinates and angles.
//!
//! Device coordinates are stored in 26.6 format: the low 6 bits hold the sub-pixel
//! fraction. Angles are stored in 16.16 degrees, so a half turn is `180 << 16`.

use crate::math::Point;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A 26.6 fixed-point coordinate.
pub type Coord = i32;

/// A 16.16 fixed-point scalar (angles, cosines, scale factors).
pub type Fixed = i64;

/// Number of sub-pixel units per pixel in 26.6.
pub const ONE: Coord = 64;

/// Half a turn.
pub const ANGLE_PI: Fixed = 180 << 16;
/// A full turn.
pub const ANGLE_2PI: Fixed = ANGLE_PI << 1;
/// A quarter turn.
pub const ANGLE_PI2: Fixed = ANGLE_PI >> 1;

/// `1.0` in 16.16.
pub const FIXED_ONE: Fixed = 0x10000;

/// Convert a float device coordinate to 26.6.
#[inline]
pub fn to_fixed(v: f32) -> Coord {
    (v * 64.0).round() as Coord
}

/// Convert a 26.6 coordinate back to float.
#[inline]
pub fn from_fixed(v: Coord) -> f32 {
    v as f32 / 64.0
}

/// A point in 26.6 fixed-point coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    /// The x coordinate.
    pub x: Coord,
    /// The y coordinate.
    pub y: Coord,
}

impl FixedPoint {
    /// Create a new point.
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Convert a float point.
    pub fn from_point(pt: Point) -> Self {
        Self::new(to_fixed(pt.x), to_fixed(pt.y))
    }

    /// Convert back to float.
    pub fn to_point(self) -> Point {
        Point::new(from_fixed(self.x), from_fixed(self.y))
    }

    /// Whether both coordinates are zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Whether the vector is shorter than 2 units on both axes.
    #[inline]
    pub fn small(self) -> bool {
        self.x.abs() < 2 && self.y.abs() < 2
    }

    /// Round down to a whole pixel.
    #[inline]
    pub fn trunc(self) -> Self {
        Self::new(self.x >> 6, self.y >> 6)
    }
}

impl Add for FixedPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for FixedPoint {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for FixedPoint {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[inline]
fn angle_to_rad(angle: Fixed) -> f64 {
    (angle as f64 / 65536.0).to_radians()
}

/// `a * b / c`, rounded, computed in 64 bits.
pub fn mul_div(a: Fixed, b: Fixed, c: Fixed) -> Fixed {
    let sign = (a < 0) ^ (b < 0) ^ (c < 0);
    let (a, b, c) = (a.unsigned_abs(), b.unsigned_abs(), c.unsigned_abs());
    let d = if c > 0 { (a * b + (c >> 1)) / c } else { 0x7FFF_FFFF };
    let d = d as Fixed;
    if sign {
        -d
    } else {
        d
    }
}

/// Multiply by a 16.16 factor.
pub fn multiply(a: Fixed, b: Fixed) -> Fixed {
    let sign = (a < 0) ^ (b < 0);
    let c = ((a.unsigned_abs() * b.unsigned_abs() + 0x8000) >> 16) as Fixed;
    if sign {
        -c
    } else {
        c
    }
}

/// Divide producing a 16.16 factor.
pub fn divide(a: Fixed, b: Fixed) -> Fixed {
    let sign = (a < 0) ^ (b < 0);
    let b = b.unsigned_abs();
    let q = if b > 0 {
        (((a.unsigned_abs() << 16) + (b >> 1)) / b) as Fixed
    } else {
        0x7FFF_FFFF
    };
    if sign {
        -q
    } else {
        q
    }
}

/// Cosine of a fixed angle, in 16.16.
pub fn cos(angle: Fixed) -> Fixed {
    (angle_to_rad(angle).cos() * 65536.0).round() as Fixed
}

/// Sine of a fixed angle, in 16.16.
pub fn sin(angle: Fixed) -> Fixed {
    (angle_to_rad(angle).sin() * 65536.0).round() as Fixed
}

/// Tangent of a fixed angle, in 16.16.
pub fn tan(angle: Fixed) -> Fixed {
    (angle_to_rad(angle).tan() * 65536.0).round() as Fixed
}

/// Direction of a vector as a fixed angle in `(-π, π]`.
pub fn atan(pt: FixedPoint) -> Fixed {
    if pt.is_zero() {
        return 0;
    }
    let rad = (pt.y as f64).atan2(pt.x as f64);
    (rad.to_degrees() * 65536.0).round() as Fixed
}

/// Euclidean length of a vector.
pub fn length(pt: FixedPoint) -> Fixed {
    let x = pt.x as f64;
    let y = pt.y as f64;
    (x * x + y * y).sqrt().round() as Fixed
}

/// Rotate a vector by a fixed angle.
pub fn rotate(pt: FixedPoint, angle: Fixed) -> FixedPoint {
    if angle == 0 || pt.is_zero() {
        return pt;
    }
    let (s, c) = angle_to_rad(angle).sin_cos();
    let x = pt.x as f64;
    let y = pt.y as f64;
    let rx = (x * c - y * s).round() as Coord;
    let ry = (x * s + y * c).round() as Coord;
    FixedPoint::new(rx, ry)
}

/// A vector of the given `length` pointing along `angle`.
pub fn polar(length: Fixed, angle: Fixed) -> FixedPoint {
    let (s, c) = angle_to_rad(angle).sin_cos();
    let l = length as f64;
    FixedPoint::new((l * c).round() as Coord, (l * s).round() as Coord)
}

/// Signed difference `angle2 - angle1`, normalized to `(-π, π]`.
pub fn diff(angle1: Fixed, angle2: Fixed) -> Fixed {
    let mut delta = (angle2 - angle1) % ANGLE_2PI;
    if delta < 0 {
        delta += ANGLE_2PI;
    }
    if delta > ANGLE_PI {
        delta -= ANGLE_2PI;
    }
    delta
}

/// The angle halfway between two angles along the shorter arc.
pub fn mean(angle1: Fixed, angle2: Fixed) -> Fixed {
    angle1 + diff(angle1, angle2) / 2
}

/// Classification of a cubic arc by how sharply it turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcShape {
    /// Every control vector is negligible.
    Point,
    /// The arc turns less than π/8 between its tangents.
    Flat,
    /// The arc must be split before it can be stroked.
    Curved,
}

/// Compute the in/mid/out tangent angles of a cubic stored in reverse order
/// (`base[3]` is the start point, `base[0]` the end point).
///
/// A [`ArcShape::Point`] arc keeps `current` as every angle.
pub fn cubic_angle(base: &[FixedPoint], current: Fixed) -> (ArcShape, Fixed, Fixed, Fixed) {
    let d1 = base[2] - base[3];
    let d2 = base[1] - base[2];
    let d3 = base[0] - base[1];

    let (angle_in, angle_mid, angle_out) = if d1.small() {
        if d2.small() {
            if d3.small() {
                return (ArcShape::Point, current, current, current);
            }
            let a = atan(d3);
            (a, a, a)
        } else if d3.small() {
            let a = atan(d2);
            (a, a, a)
        } else {
            let a = atan(d2);
            (a, a, atan(d3))
        }
    } else if d2.small() {
        if d3.small() {
            let a = atan(d1);
            (a, a, a)
        } else {
            let ai = atan(d1);
            let ao = atan(d3);
            (ai, mean(ai, ao), ao)
        }
    } else if d3.small() {
        let am = atan(d2);
        (atan(d1), am, am)
    } else {
        (atan(d1), atan(d2), atan(d3))
    };

    let theta1 = diff(angle_in, angle_mid).abs();
    let theta2 = diff(angle_mid, angle_out).abs();
    let shape = if theta1 < ANGLE_PI / 8 && theta2 < ANGLE_PI / 8 {
        ArcShape::Flat
    } else {
        ArcShape::Curved
    };

    (shape, angle_in, angle_mid, angle_out)
}

/// De Casteljau split of the reversed cubic at `base[0..4]` into `base[0..7]`.
pub fn split_cubic(base: &mut [FixedPoint]) {
    base[6] = base[3];

    let c = base[1];
    let d = base[2];
    let a = half(base[0] + c);
    let b = half(base[3] + d);
    base[1] = a;
    base[5] = b;
    let c = half(c + d);
    let a = half(a + c);
    let b = half(b + c);
    base[2] = a;
    base[4] = b;
    base[3] = half(a + b);
}

/// Split the reversed line at `base[0..2]` in half into `base[0..3]`.
pub fn split_line(base: &mut [FixedPoint]) {
    base[2] = base[1];
    base[1] = half(base[0] + base[1]);
}

#[inline]
fn half(p: FixedPoint) -> FixedPoint {
    FixedPoint::new(p.x >> 1, p.y >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_conversion_rounds() {
        assert_eq!(to_fixed(1.0), 64);
        assert_eq!(to_fixed(0.51 / 64.0), 1);
        assert_eq!(from_fixed(96), 1.5);
    }

    #[test]
    fn angle_diff_wraps() {
        assert_eq!(diff(0, ANGLE_PI2), ANGLE_PI2);
        assert_eq!(diff(ANGLE_PI2, -ANGLE_PI2), ANGLE_PI);
        assert_eq!(diff(-ANGLE_PI + 10, ANGLE_PI - 10), -20);
    }

    #[test]
    fn atan_of_axes() {
        assert_eq!(atan(FixedPoint::new(64, 0)), 0);
        assert_eq!(atan(FixedPoint::new(0, 64)), ANGLE_PI2);
        assert_eq!(atan(FixedPoint::new(-64, 0)), ANGLE_PI);
    }

    #[test]
    fn rotate_quarter_turn() {
        let p = rotate(FixedPoint::new(640, 0), ANGLE_PI2);
        assert_eq!(p, FixedPoint::new(0, 640));
    }

    #[test]
    fn mul_div_rounds_and_keeps_sign() {
        assert_eq!(mul_div(10, 10, 3), 33);
        assert_eq!(mul_div(-10, 10, 4), -25);
    }

    #[test]
    fn straight_cubic_is_flat() {
        let base = [
            FixedPoint::new(300, 0),
            FixedPoint::new(200, 0),
            FixedPoint::new(100, 0),
            FixedPoint::new(0, 0),
        ];
        let (shape, a_in, _, a_out) = cubic_angle(&base, 0);
        assert_eq!(shape, ArcShape::Flat);
        assert_eq!(a_in, 0);
        assert_eq!(a_out, 0);
    }
}
