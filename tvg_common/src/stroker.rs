// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The border stroker.
//!
//! A stroke is expanded into two borders running on either side of the source
//! outline. Closed contours produce two closed borders; open contours join the
//! borders with caps. The result is exported as a single [`Outline`] filled with
//! the non-zero rule.

use crate::fixed::{
    self, cubic_angle, diff, mean, mul_div, multiply, polar, split_cubic, to_fixed, ArcShape,
    Fixed, FixedPoint, ANGLE_PI, ANGLE_PI2, FIXED_ONE,
};
use crate::math::Matrix;
use crate::outline::{CurveType, Outline};
use crate::shape::{FillRule, RenderStroke, StrokeCap, StrokeJoin};

/// An on-curve border point.
pub const TAG_POINT: u8 = 1;
/// A cubic control point.
pub const TAG_CUBIC: u8 = 2;
/// The first point of a border contour.
pub const TAG_BEGIN: u8 = 4;
/// The last point of a border contour.
pub const TAG_END: u8 = 8;

/// Stroking failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StrokeError {
    /// The outline is malformed.
    #[error("outline contour starts with a cubic control point")]
    CubicStart,
}

/// Rotation from the travel direction to the border on `side`.
#[inline]
fn side_to_rotate(side: usize) -> Fixed {
    ANGLE_PI2 - side as Fixed * ANGLE_PI
}

/// Non-uniform scale applied to offsets computed in stroke space.
#[derive(Clone, Copy, Debug)]
struct Scale {
    sx: f32,
    sy: f32,
}

impl Scale {
    #[inline]
    fn apply(self, pt: FixedPoint) -> FixedPoint {
        let x = pt.x as f32 * self.sx;
        let y = pt.y as f32 * self.sy;
        FixedPoint::new(x as i32, y as i32)
    }

    #[inline]
    fn revert(self, pt: FixedPoint) -> FixedPoint {
        let x = if self.sx > 0.0 { pt.x as f32 / self.sx } else { 0.0 };
        let y = if self.sy > 0.0 { pt.y as f32 / self.sy } else { 0.0 };
        FixedPoint::new(x as i32, y as i32)
    }

    /// A scaled vector of `length` along `angle`.
    #[inline]
    fn polar(self, length: Fixed, angle: Fixed) -> FixedPoint {
        self.apply(polar(length, angle))
    }
}

/// One side of an expanded stroke.
#[derive(Clone, Debug, Default)]
pub struct StrokeBorder {
    /// Border points.
    pub pts: Vec<FixedPoint>,
    /// A `TAG_*` bit set per point.
    pub tags: Vec<u8>,
    start: Option<usize>,
    movable: bool,
}

impl StrokeBorder {
    /// Forget all contours, keeping the allocations.
    pub fn reset(&mut self) {
        self.pts.clear();
        self.tags.clear();
        self.start = None;
        self.movable = false;
    }

    fn push(&mut self, pt: FixedPoint, tag: u8) {
        self.pts.push(pt);
        self.tags.push(tag);
    }

    fn close(&mut self, reverse: bool) {
        if let Some(start) = self.start {
            let count = self.pts.len();
            if count <= start + 1 {
                // Nothing but the starting point.
                self.pts.truncate(start);
                self.tags.truncate(start);
            } else {
                // The last point holds the adjusted start.
                let count = count - 1;
                self.pts[start] = self.pts[count];
                self.pts.truncate(count);
                self.tags.truncate(count);

                if reverse {
                    self.pts[start + 1..count].reverse();
                    self.tags[start + 1..count].reverse();
                }

                self.tags[start] |= TAG_BEGIN;
                self.tags[count - 1] |= TAG_END;
            }
        }
        self.start = None;
        self.movable = false;
    }

    fn cubic_to(&mut self, ctrl1: FixedPoint, ctrl2: FixedPoint, to: FixedPoint) {
        self.push(ctrl1, TAG_CUBIC);
        self.push(ctrl2, TAG_CUBIC);
        self.push(to, TAG_POINT);
        self.movable = false;
    }

    fn arc_to(
        &mut self,
        center: FixedPoint,
        radius: Fixed,
        angle_start: Fixed,
        angle_diff: Fixed,
        scale: Scale,
    ) {
        const ARC_CUBIC_ANGLE: Fixed = ANGLE_PI / 2;

        let mut a = scale.polar(radius, angle_start) + center;
        let mut total = angle_diff;
        let mut angle = angle_start;
        let rotate = if angle_diff >= 0 {
            ANGLE_PI2
        } else {
            -ANGLE_PI2
        };

        while total != 0 {
            let step = total.clamp(-ARC_CUBIC_ANGLE, ARC_CUBIC_ANGLE);
            let next = angle + step;
            let theta = step.abs() >> 1;

            let b = scale.polar(radius, next) + center;

            // Control point distance for a circular arc of `2 * theta`.
            let length = mul_div(
                radius,
                fixed::sin(theta) * 4,
                (FIXED_ONE + fixed::cos(theta)) * 3,
            );
            let a2 = scale.polar(length, angle + rotate) + a;
            let b2 = scale.polar(length, next - rotate) + b;

            self.cubic_to(a2, b2, b);

            a = b;
            total -= step;
            angle = next;
        }
    }

    fn line_to(&mut self, to: FixedPoint, movable: bool) {
        if self.movable {
            if let Some(last) = self.pts.last_mut() {
                *last = to;
            }
        } else {
            if self.pts.last().is_some_and(|&last| (last - to).small()) {
                return;
            }
            self.push(to, TAG_POINT);
        }
        self.movable = movable;
    }

    fn move_to(&mut self, to: FixedPoint) {
        if self.start.is_some() {
            self.close(false);
        }
        self.start = Some(self.pts.len());
        self.movable = false;
        self.line_to(to, false);
    }
}

/// Stroke state for one outline.
#[derive(Debug)]
pub struct Stroker<'a> {
    borders: &'a mut [StrokeBorder; 2],
    angle_in: Fixed,
    angle_out: Fixed,
    center: FixedPoint,
    line_length: Fixed,
    sub_path_angle: Fixed,
    pt_start_sub_path: FixedPoint,
    sub_path_line_length: Fixed,
    width: Fixed,
    miterlimit: Fixed,
    scale: Scale,
    cap: StrokeCap,
    join: StrokeJoin,
    join_saved: StrokeJoin,
    first_pt: bool,
    closed_sub_path: bool,
    handle_wide_strokes: bool,
}

impl<'a> Stroker<'a> {
    /// Set up a stroker for `stroke` drawn under `transform`, reusing `borders`.
    pub fn new(
        stroke: &RenderStroke,
        transform: &Matrix,
        borders: &'a mut [StrokeBorder; 2],
    ) -> Self {
        for border in borders.iter_mut() {
            border.reset();
        }
        let scale = transform.scaling_2d();
        Self {
            borders,
            angle_in: 0,
            angle_out: 0,
            center: FixedPoint::default(),
            line_length: 0,
            sub_path_angle: 0,
            pt_start_sub_path: FixedPoint::default(),
            sub_path_line_length: 0,
            width: Fixed::from(to_fixed(stroke.width * 0.5)),
            miterlimit: (stroke.miterlimit * 65536.0) as Fixed,
            scale: Scale {
                sx: scale.x,
                sy: scale.y,
            },
            cap: stroke.cap,
            join: stroke.join,
            join_saved: stroke.join,
            first_pt: false,
            closed_sub_path: false,
            handle_wide_strokes: false,
        }
    }

    fn arc(&mut self, side: usize) {
        let rotate = side_to_rotate(side);
        let mut total = diff(self.angle_in, self.angle_out);
        if total == ANGLE_PI {
            total = -rotate * 2;
        }
        let border = &mut self.borders[side];
        border.arc_to(
            self.center,
            self.width,
            self.angle_in + rotate,
            total,
            self.scale,
        );
        border.movable = false;
    }

    fn outside(&mut self, side: usize, line_length: Fixed) {
        if self.join == StrokeJoin::Round {
            self.arc(side);
            return;
        }

        let rotate = side_to_rotate(side);
        let mut bevel = self.join == StrokeJoin::Bevel;
        let mut phi = 0;
        let mut thcos = 0;

        if !bevel {
            let mut theta = diff(self.angle_in, self.angle_out);
            if theta == ANGLE_PI {
                theta = rotate;
                phi = self.angle_in;
            } else {
                theta /= 2;
                phi = self.angle_in + theta + rotate;
            }
            thcos = fixed::cos(theta);
            let sigma = multiply(self.miterlimit, thcos);
            if sigma < FIXED_ONE {
                bevel = true;
            }
        }

        let border = &mut self.borders[side];
        if bevel {
            let delta = self.scale.polar(self.width, self.angle_out + rotate) + self.center;
            border.movable = false;
            border.line_to(delta, false);
        } else {
            let length = fixed::divide(self.width, thcos);
            let delta = self.scale.polar(length, phi) + self.center;
            border.line_to(delta, false);

            // Curves have no line length and need the end point as well.
            if line_length == 0 {
                let delta = self.scale.polar(self.width, self.angle_out + rotate) + self.center;
                border.line_to(delta, false);
            }
        }
    }

    fn inside(&mut self, side: usize, line_length: Fixed) {
        let theta = diff(self.angle_in, self.angle_out) / 2;
        let rotate = side_to_rotate(side);
        let border = &mut self.borders[side];

        // Only intersect borders between two sufficiently long line segments.
        let mut intersect = false;
        if border.movable && line_length > 0 {
            let min_length = multiply(self.width, fixed::tan(theta)).abs();
            intersect = self.line_length >= min_length && line_length >= min_length;
        }

        let delta = if intersect {
            let phi = self.angle_in + theta;
            let length = fixed::divide(self.width, fixed::cos(theta));
            self.scale.polar(length, phi + rotate) + self.center
        } else {
            border.movable = false;
            self.scale.polar(self.width, self.angle_out + rotate) + self.center
        };

        border.line_to(delta, false);
    }

    fn process_corner(&mut self, line_length: Fixed) {
        let turn = diff(self.angle_in, self.angle_out);
        if turn == 0 {
            return;
        }
        // Turning right puts the inside on side 0.
        let inside = usize::from(turn < 0);
        self.inside(inside, line_length);
        self.outside(1 - inside, line_length);
    }

    fn first_sub_path(&mut self, start_angle: Fixed, line_length: Fixed) {
        let delta = self.scale.polar(self.width, start_angle + ANGLE_PI2);
        self.borders[0].move_to(self.center + delta);
        self.borders[1].move_to(self.center - delta);

        self.sub_path_angle = start_angle;
        self.first_pt = false;
        self.sub_path_line_length = line_length;
    }

    /// A degenerate contour is drawn as a dot when its caps have extent.
    fn dot(&mut self) {
        if self.first_pt && self.cap != StrokeCap::Butt {
            self.first_sub_path(0, 0);
            self.closed_sub_path = false;
        }
    }

    fn line_to(&mut self, to: FixedPoint) {
        let delta = to - self.center;
        if delta.is_zero() {
            self.dot();
            return;
        }

        // Line lengths are compared against the unscaled stroke width.
        let unscaled = self.scale.revert(delta);
        let line_length = fixed::length(unscaled);
        let angle = fixed::atan(unscaled);

        let mut delta = self.scale.polar(self.width, angle + ANGLE_PI2);

        if self.first_pt {
            self.first_sub_path(angle, line_length);
        } else {
            self.angle_out = angle;
            self.process_corner(line_length);
        }

        // The ends of line borders stay movable for the next corner.
        for border in self.borders.iter_mut() {
            border.line_to(to + delta, true);
            delta = -delta;
        }

        self.angle_in = angle;
        self.center = to;
        self.line_length = line_length;
    }

    fn cubic_to(&mut self, ctrl1: FixedPoint, ctrl2: FixedPoint, to: FixedPoint) {
        const STACK_LIMIT: usize = 32;

        let mut stack = [FixedPoint::default(); STACK_LIMIT + 5];
        stack[0] = to;
        stack[1] = ctrl2;
        stack[2] = ctrl1;
        stack[3] = self.center;
        let mut arc = 0;
        let mut first_arc = true;

        loop {
            let (shape, angle_in, angle_mid, angle_out) =
                cubic_angle(&stack[arc..arc + 4], self.angle_in);

            if shape == ArcShape::Curved && arc < STACK_LIMIT {
                if self.first_pt {
                    self.angle_in = angle_in;
                }
                split_cubic(&mut stack[arc..arc + 7]);
                arc += 3;
                continue;
            }

            if shape == ArcShape::Point && arc == 0 {
                self.center = to;
                self.dot();
                return;
            }

            if first_arc {
                first_arc = false;
                if self.first_pt {
                    self.first_sub_path(angle_in, 0);
                } else {
                    self.angle_out = angle_in;
                    self.process_corner(0);
                }
            } else if diff(self.angle_in, angle_in).abs() > ANGLE_PI / 8 / 4 {
                // Too large a deviation between arcs gets a round corner.
                self.center = stack[arc + 3];
                self.angle_out = angle_in;
                self.join = StrokeJoin::Round;
                self.process_corner(0);
                self.join = self.join_saved;
            }

            let theta1 = diff(angle_in, angle_mid) / 2;
            let theta2 = diff(angle_mid, angle_out) / 2;
            let phi1 = mean(angle_in, angle_mid);
            let phi2 = mean(angle_mid, angle_out);
            let length1 = fixed::divide(self.width, fixed::cos(theta1));
            let length2 = fixed::divide(self.width, fixed::cos(theta2));
            let alpha0 = if self.handle_wide_strokes {
                fixed::atan(stack[arc] - stack[arc + 3])
            } else {
                0
            };

            for side in 0..2 {
                let rotate = side_to_rotate(side);
                let c1 = self.scale.polar(length1, phi1 + rotate) + stack[arc + 2];
                let c2 = self.scale.polar(length2, phi2 + rotate) + stack[arc + 1];
                let end = self.scale.polar(self.width, angle_out + rotate) + stack[arc];
                let border = &mut self.borders[side];

                if self.handle_wide_strokes {
                    if let Some(&start) = border.pts.last() {
                        let alpha1 = fixed::atan(end - start);

                        // The border arc runs against the original arc when the border
                        // radius exceeds the radius of curvature.
                        if diff(alpha0, alpha1).abs() > ANGLE_PI / 2 {
                            let beta = fixed::atan(stack[arc + 3] - start);
                            let gamma = fixed::atan(stack[arc] - end);
                            let blen = fixed::length(end - start);
                            let sin_a = fixed::sin(alpha1 - gamma).abs();
                            let sin_b = fixed::sin(beta - gamma).abs();

                            if sin_b != 0 {
                                // Sine rule gives the intersection point.
                                let alen = mul_div(blen, sin_a, sin_b);
                                let delta = polar(alen, beta) + start;

                                // Circumnavigate the negative sector backwards.
                                border.movable = false;
                                border.line_to(delta, false);
                                border.line_to(end, false);
                                border.cubic_to(c2, c1, start);
                                border.line_to(end, false);
                                continue;
                            }
                        }
                    }
                }
                border.cubic_to(c1, c2, end);
            }

            self.angle_in = angle_out;
            if arc == 0 {
                break;
            }
            arc -= 3;
        }
        self.center = to;
    }

    fn add_cap(&mut self, angle: Fixed, side: usize) {
        let rotate = side_to_rotate(side);
        match self.cap {
            StrokeCap::Square => {
                let ahead = self.scale.polar(self.width, angle);
                let p1 = self.center + ahead + self.scale.polar(self.width, angle + rotate);
                let p2 = self.center + ahead + self.scale.polar(self.width, angle - rotate);
                let border = &mut self.borders[side];
                border.line_to(p1, false);
                border.line_to(p2, false);
            }
            StrokeCap::Round => {
                self.angle_in = angle;
                self.angle_out = angle + ANGLE_PI;
                self.arc(side);
            }
            StrokeCap::Butt => {
                let p1 = self.center + self.scale.polar(self.width, angle + rotate);
                let p2 = self.center + self.scale.polar(self.width, angle - rotate);
                let border = &mut self.borders[side];
                border.line_to(p1, false);
                border.line_to(p2, false);
            }
        }
    }

    /// Append the reversed left border to the right one.
    fn add_reverse_left(&mut self, opened: bool) {
        let [right, left] = &mut *self.borders;
        let Some(start) = left.start else {
            return;
        };
        if left.pts.len() <= start {
            return;
        }

        for i in (start..left.pts.len()).rev() {
            let mut tag = left.tags[i];
            if opened {
                tag &= !(TAG_BEGIN | TAG_END);
            } else {
                let ends = tag & (TAG_BEGIN | TAG_END);
                if ends == TAG_BEGIN || ends == TAG_END {
                    tag ^= TAG_BEGIN | TAG_END;
                }
            }
            right.push(left.pts[i], tag);
        }

        left.pts.truncate(start);
        left.tags.truncate(start);
        right.movable = false;
        left.movable = false;
    }

    fn begin_sub_path(&mut self, to: FixedPoint, closed: bool) {
        // The first point is processed in `end_sub_path` once its corner or cap is known.
        self.first_pt = true;
        self.center = to;
        self.closed_sub_path = closed;

        // Round joins and round or square caps already cover the negative sector of
        // wide strokes around tight curves.
        self.handle_wide_strokes =
            self.join != StrokeJoin::Round || (!closed && self.cap == StrokeCap::Butt);

        self.pt_start_sub_path = to;
        self.angle_in = 0;
    }

    fn end_sub_path(&mut self) {
        if self.closed_sub_path {
            if self.center != self.pt_start_sub_path {
                self.line_to(self.pt_start_sub_path);
            }

            self.angle_out = self.sub_path_angle;
            let turn = diff(self.angle_in, self.angle_out);
            if turn != 0 {
                let inside = usize::from(turn < 0);
                self.inside(inside, self.sub_path_line_length);
                self.outside(1 - inside, self.sub_path_line_length);
            }

            self.borders[0].close(false);
            self.borders[1].close(true);
        } else {
            // Cap, the reversed left border, then the closing cap.
            self.add_cap(self.angle_in, 0);
            self.add_reverse_left(true);
            self.center = self.pt_start_sub_path;
            self.add_cap(self.sub_path_angle + ANGLE_PI, 0);
            self.borders[0].close(false);
        }
    }

    /// Expand every contour of `outline` into the borders.
    pub fn parse(&mut self, outline: &Outline) -> Result<(), StrokeError> {
        let pts = &outline.pts;
        let types = &outline.types;
        let mut first = 0_usize;

        for (i, &last) in outline.cntrs.iter().enumerate() {
            let last = last as usize;
            if last <= first || last >= pts.len() {
                first = last + 1;
                continue;
            }

            let start = pts[first];
            if types[first] == CurveType::Cubic {
                return Err(StrokeError::CubicStart);
            }

            let closed = outline.closed.get(i).copied().unwrap_or(false);
            self.begin_sub_path(start, closed);

            let mut p = first;
            while p < last {
                if types[p + 1] == CurveType::Point {
                    p += 1;
                    self.line_to(pts[p]);
                } else {
                    p += 3;
                    if p <= last {
                        self.cubic_to(pts[p - 2], pts[p - 1], pts[p]);
                    } else if p - 1 == last {
                        self.cubic_to(pts[p - 2], pts[p - 1], start);
                    } else {
                        break;
                    }
                }
            }

            if !self.first_pt {
                self.end_sub_path();
            }
            first = last + 1;
        }
        Ok(())
    }

    /// Write both borders into `outline` as non-zero filled contours.
    pub fn export(&self, outline: &mut Outline) {
        outline.clear();
        outline.rule = FillRule::NonZero;

        for border in self.borders.iter() {
            let base = outline.pts.len();
            for (i, &tag) in border.tags.iter().enumerate() {
                outline.types.push(if tag & TAG_CUBIC != 0 {
                    CurveType::Cubic
                } else {
                    CurveType::Point
                });
                if tag & TAG_END != 0 {
                    outline.cntrs.push((base + i) as u32);
                    outline.closed.push(true);
                }
            }
            outline.pts.extend_from_slice(&border.pts);
        }
    }
}

/// Stroke `source` into `out`, using `borders` as scratch space.
pub fn stroke_outline(
    source: &Outline,
    stroke: &RenderStroke,
    transform: &Matrix,
    borders: &mut [StrokeBorder; 2],
    out: &mut Outline,
) -> Result<(), StrokeError> {
    let mut stroker = Stroker::new(stroke, transform, borders);
    stroker.parse(source)?;
    stroker.export(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;
    use crate::path::RenderPath;
    use crate::shape::RenderColor;

    fn stroked(path: &RenderPath, stroke: &RenderStroke) -> Outline {
        let mut source = Outline::new();
        source.build(path, &Matrix::IDENTITY, FillRule::NonZero);
        let mut borders = <[StrokeBorder; 2]>::default();
        let mut out = Outline::new();
        stroke_outline(&source, stroke, &Matrix::IDENTITY, &mut borders, &mut out).unwrap();
        out
    }

    fn bounds(outline: &Outline) -> (Point, Point) {
        let pts: Vec<Point> = outline.pts.iter().map(|p| p.to_point()).collect();
        let first = pts[0];
        pts.iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)))
    }

    #[test]
    fn butt_line_is_a_rectangle() {
        let mut path = RenderPath::new();
        path.move_to(Point::new(10.0, 50.0));
        path.line_to(Point::new(110.0, 50.0));
        let mut stroke = RenderStroke::new(20.0, RenderColor::new(0, 255, 0, 255));
        stroke.cap = StrokeCap::Butt;

        let out = stroked(&path, &stroke);
        let (lo, hi) = bounds(&out);
        assert!((lo.x - 10.0).abs() < 0.05 && (hi.x - 110.0).abs() < 0.05);
        assert!((lo.y - 40.0).abs() < 0.05 && (hi.y - 60.0).abs() < 0.05);
        assert_eq!(out.rule, FillRule::NonZero);
        assert_eq!(out.pts.len(), out.types.len());
    }

    #[test]
    fn square_cap_extends_by_half_width() {
        let mut path = RenderPath::new();
        path.move_to(Point::new(10.0, 50.0));
        path.line_to(Point::new(110.0, 50.0));
        let stroke = RenderStroke::new(20.0, RenderColor::new(0, 255, 0, 255));

        let (lo, hi) = bounds(&stroked(&path, &stroke));
        assert!((lo.x - 0.0).abs() < 0.05 && (hi.x - 120.0).abs() < 0.05);
    }

    #[test]
    fn closed_rect_produces_two_contours() {
        let mut path = RenderPath::new();
        path.add_rect(10.0, 10.0, 100.0, 100.0);
        let mut stroke = RenderStroke::new(4.0, RenderColor::new(0, 0, 0, 255));
        stroke.join = StrokeJoin::Miter;

        let out = stroked(&path, &stroke);
        assert_eq!(out.cntrs.len(), 2);
        let (lo, hi) = bounds(&out);
        assert!((lo.x - 8.0).abs() < 0.05 && (hi.x - 112.0).abs() < 0.05);
    }

    #[test]
    fn zero_length_round_cap_is_a_dot() {
        let mut path = RenderPath::new();
        path.move_to(Point::new(20.0, 20.0));
        path.close();
        let mut stroke = RenderStroke::new(10.0, RenderColor::new(0, 0, 0, 255));
        stroke.cap = StrokeCap::Round;

        let out = stroked(&path, &stroke);
        assert!(!out.pts.is_empty());
        let (lo, hi) = bounds(&out);
        assert!((hi.x - lo.x - 10.0).abs() < 0.1);
    }

    #[test]
    fn zero_length_butt_cap_is_empty() {
        let mut path = RenderPath::new();
        path.move_to(Point::new(20.0, 20.0));
        path.close();
        let mut stroke = RenderStroke::new(10.0, RenderColor::new(0, 0, 0, 255));
        stroke.cap = StrokeCap::Butt;

        assert!(stroked(&path, &stroke).pts.is_empty());
    }
}
