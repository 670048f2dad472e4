// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command/point path storage.

use crate::math::{Bezier, Line, Matrix, Point};

/// A path command.
///
/// Commands consume 0, 1, 1, and 3 points respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathCommand {
    /// Close the current contour, returning the pen to the last `MoveTo`.
    Close,
    /// Begin a new contour.
    MoveTo,
    /// A straight segment.
    LineTo,
    /// A cubic Bézier segment.
    CubicTo,
}

impl PathCommand {
    /// Number of points consumed by the command.
    pub const fn point_count(self) -> usize {
        match self {
            Self::Close => 0,
            Self::MoveTo | Self::LineTo => 1,
            Self::CubicTo => 3,
        }
    }
}

/// A sequence of commands against a pool of points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPath {
    /// The commands.
    pub cmds: Vec<PathCommand>,
    /// The points, consumed in command order.
    pub pts: Vec<Point>,
}

impl RenderPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every command and point, keeping the allocations.
    pub fn clear(&mut self) {
        self.cmds.clear();
        self.pts.clear();
    }

    /// Whether the path contains no commands.
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Begin a new contour at `pt`.
    pub fn move_to(&mut self, pt: Point) {
        self.cmds.push(PathCommand::MoveTo);
        self.pts.push(pt);
    }

    /// Add a straight segment to `pt`.
    pub fn line_to(&mut self, pt: Point) {
        self.cmds.push(PathCommand::LineTo);
        self.pts.push(pt);
    }

    /// Add a cubic segment.
    pub fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) {
        self.cmds.push(PathCommand::CubicTo);
        self.pts.extend_from_slice(&[c1, c2, end]);
    }

    /// Close the current contour.
    pub fn close(&mut self) {
        self.cmds.push(PathCommand::Close);
    }

    /// Append an axis-aligned rectangle as a closed contour.
    pub fn add_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(Point::new(x, y));
        self.line_to(Point::new(x + w, y));
        self.line_to(Point::new(x + w, y + h));
        self.line_to(Point::new(x, y + h));
        self.close();
    }

    /// Append a circle (four cubic arcs) as a closed contour.
    pub fn add_circle(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) {
        let kx = rx * crate::math::PATH_KAPPA;
        let ky = ry * crate::math::PATH_KAPPA;
        self.move_to(Point::new(cx + rx, cy));
        self.cubic_to(
            Point::new(cx + rx, cy + ky),
            Point::new(cx + kx, cy + ry),
            Point::new(cx, cy + ry),
        );
        self.cubic_to(
            Point::new(cx - kx, cy + ry),
            Point::new(cx - rx, cy + ky),
            Point::new(cx - rx, cy),
        );
        self.cubic_to(
            Point::new(cx - rx, cy - ky),
            Point::new(cx - kx, cy - ry),
            Point::new(cx, cy - ry),
        );
        self.cubic_to(
            Point::new(cx + kx, cy - ry),
            Point::new(cx + rx, cy - ky),
            Point::new(cx + rx, cy),
        );
        self.close();
    }

    /// Iterate over the path as segments with resolved start points.
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            path: self,
            cmd: 0,
            pt: 0,
            start: Point::ZERO,
            cur: Point::ZERO,
        }
    }

    /// Total arc length of every segment, including closing segments.
    pub fn length(&self) -> f32 {
        self.segments().map(|seg| seg.length()).sum()
    }

    /// Apply `m` to every point, returning the transformed path.
    pub fn transformed(&self, m: &Matrix) -> Self {
        Self {
            cmds: self.cmds.clone(),
            pts: self.pts.iter().map(|p| p.transform(m)).collect(),
        }
    }

    /// The bounding box of the points, or `None` for an empty path.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.pts.first()?;
        Some(
            self.pts
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }
}

/// A path segment produced by [`RenderPath::segments`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    /// A new contour starts at this point.
    Move(Point),
    /// A straight segment. A `Close` yields the closing line.
    Line(Point, Point),
    /// A cubic segment.
    Cubic(Bezier),
}

impl Segment {
    /// Arc length. A move has no length.
    pub fn length(&self) -> f32 {
        match self {
            Self::Move(_) => 0.0,
            Self::Line(a, b) => (*b - *a).length(),
            Self::Cubic(bz) => bz.length(),
        }
    }

    /// The point the segment starts at.
    pub fn start(&self) -> Point {
        match self {
            Self::Move(p) | Self::Line(p, _) => *p,
            Self::Cubic(bz) => bz.start,
        }
    }

    /// The point the segment ends at.
    pub fn end(&self) -> Point {
        match self {
            Self::Move(p) | Self::Line(_, p) => *p,
            Self::Cubic(bz) => bz.end,
        }
    }

    /// Split at arc length `at` from the start.
    pub fn split_at_length(&self, at: f32) -> (Self, Self) {
        match self {
            Self::Move(_) => (*self, *self),
            Self::Line(a, b) => {
                let (l, r) = Line::new(*a, *b).split(at);
                (Self::Line(l.pt1, l.pt2), Self::Line(r.pt1, r.pt2))
            }
            Self::Cubic(bz) => {
                let (l, r) = bz.split_at_length(at);
                (Self::Cubic(l), Self::Cubic(r))
            }
        }
    }

    /// The part of the segment between arc lengths `from` and `to`.
    pub fn sub(&self, from: f32, to: f32) -> Self {
        let right = if from > 0.0 {
            self.split_at_length(from).1
        } else {
            *self
        };
        right.split_at_length(to - from).0
    }

    /// Append the segment to `path`, assuming the pen is already at its start.
    pub fn append_to(&self, path: &mut RenderPath) {
        match self {
            Self::Move(p) => path.move_to(*p),
            Self::Line(_, p) => path.line_to(*p),
            Self::Cubic(bz) => path.cubic_to(bz.ctrl1, bz.ctrl2, bz.end),
        }
    }
}

/// Iterator over the segments of a [`RenderPath`].
#[derive(Debug)]
pub struct Segments<'a> {
    path: &'a RenderPath,
    cmd: usize,
    pt: usize,
    start: Point,
    cur: Point,
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            let cmd = *self.path.cmds.get(self.cmd)?;
            self.cmd += 1;

            let need = cmd.point_count();
            if self.pt + need > self.path.pts.len() {
                return None;
            }
            let pts = &self.path.pts[self.pt..self.pt + need];
            self.pt += need;

            match cmd {
                PathCommand::MoveTo => {
                    self.start = pts[0];
                    self.cur = pts[0];
                    return Some(Segment::Move(pts[0]));
                }
                PathCommand::LineTo => {
                    let from = self.cur;
                    self.cur = pts[0];
                    return Some(Segment::Line(from, pts[0]));
                }
                PathCommand::CubicTo => {
                    let bz = Bezier::new(self.cur, pts[0], pts[1], pts[2]);
                    self.cur = pts[2];
                    return Some(Segment::Cubic(bz));
                }
                PathCommand::Close => {
                    if self.cur == self.start {
                        continue;
                    }
                    let from = self.cur;
                    self.cur = self.start;
                    return Some(Segment::Line(from, self.start));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_length_includes_close() {
        let mut path = RenderPath::new();
        path.add_rect(0.0, 0.0, 10.0, 5.0);
        assert!((path.length() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn truncated_point_pool_stops_iteration() {
        let path = RenderPath {
            cmds: vec![PathCommand::MoveTo, PathCommand::CubicTo],
            pts: vec![Point::ZERO, Point::new(1.0, 1.0)],
        };
        assert_eq!(path.segments().count(), 1);
    }
}
