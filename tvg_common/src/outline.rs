// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-point outlines in device space.

use crate::fixed::FixedPoint;
use crate::math::Matrix;
use crate::path::{PathCommand, RenderPath};
use crate::region::RenderRegion;
use crate::shape::FillRule;

/// Whether an outline point is on the curve or a cubic control point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CurveType {
    /// An on-curve point.
    #[default]
    Point,
    /// A cubic control point. Always appears as `(Cubic, Cubic, Point)`.
    Cubic,
}

/// A device-space outline made of contours.
///
/// `pts` and `types` run in parallel. `cntrs` holds the index of the last point of
/// each contour and `closed` whether that contour was explicitly closed.
#[derive(Clone, Debug, Default)]
pub struct Outline {
    /// The points, in 26.6.
    pub pts: Vec<FixedPoint>,
    /// The curve type of each point.
    pub types: Vec<CurveType>,
    /// Index of the last point of each contour.
    pub cntrs: Vec<u32>,
    /// Whether each contour is closed.
    pub closed: Vec<bool>,
    /// The fill rule used when rasterizing.
    pub rule: FillRule,
}

impl Outline {
    /// Create an empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all contours, keeping the allocations.
    pub fn clear(&mut self) {
        self.pts.clear();
        self.types.clear();
        self.cntrs.clear();
        self.closed.clear();
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.pts.is_empty() || self.cntrs.is_empty()
    }

    fn last_index(&self) -> u32 {
        self.pts.len().saturating_sub(1) as u32
    }

    /// Start a new contour at the end point of the previous one.
    ///
    /// Used when a segment follows a close without a move.
    fn begin(&mut self) {
        let Some(&last) = self.pts.last() else {
            return;
        };
        self.cntrs.push(self.last_index());
        self.closed.push(false);
        self.pts.push(last);
        self.types.push(CurveType::Point);
    }

    /// Terminate the current open contour.
    fn end(&mut self) {
        if self.pts.is_empty() {
            return;
        }
        self.cntrs.push(self.last_index());
        self.closed.push(false);
    }

    /// Begin a new contour at `pt`. An open contour is ended first.
    pub fn move_to(&mut self, pt: FixedPoint, closed: bool) {
        if !closed {
            self.end();
        }
        self.pts.push(pt);
        self.types.push(CurveType::Point);
    }

    /// Add a straight segment.
    pub fn line_to(&mut self, pt: FixedPoint) {
        self.pts.push(pt);
        self.types.push(CurveType::Point);
    }

    /// Add a cubic segment.
    pub fn cubic_to(&mut self, ctrl1: FixedPoint, ctrl2: FixedPoint, to: FixedPoint) {
        self.pts.extend_from_slice(&[ctrl1, ctrl2, to]);
        self.types
            .extend_from_slice(&[CurveType::Cubic, CurveType::Cubic, CurveType::Point]);
    }

    /// Close the current contour. Returns `false` if it has no points.
    pub fn close(&mut self) -> bool {
        let first = self.cntrs.last().map_or(0, |&c| c as usize + 1);
        if self.pts.len() == first {
            return false;
        }
        self.pts.push(self.pts[first]);
        self.types.push(CurveType::Point);
        self.cntrs.push(self.last_index());
        self.closed.push(true);
        true
    }

    /// Rebuild the outline from `path` under `transform`.
    ///
    /// Returns `false` when the path has no geometry.
    pub fn build(&mut self, path: &RenderPath, transform: &Matrix, rule: FillRule) -> bool {
        self.clear();
        self.rule = rule;

        if path.cmds.is_empty() || path.pts.is_empty() {
            return false;
        }

        let to = |i: usize| FixedPoint::from_point(path.pts[i].transform(transform));
        let mut pt = 0;
        let mut closed = false;

        for &cmd in &path.cmds {
            if pt + cmd.point_count() > path.pts.len() {
                log::warn!("path has fewer points than its commands require");
                break;
            }
            match cmd {
                PathCommand::Close => {
                    if !closed {
                        closed = self.close();
                    }
                }
                PathCommand::MoveTo => {
                    self.move_to(to(pt), closed);
                    closed = false;
                }
                PathCommand::LineTo => {
                    if closed {
                        self.begin();
                        closed = false;
                    }
                    self.line_to(to(pt));
                }
                PathCommand::CubicTo => {
                    if closed {
                        self.begin();
                        closed = false;
                    }
                    self.cubic_to(to(pt), to(pt + 1), to(pt + 2));
                }
            }
            pt += cmd.point_count();
        }

        if !closed {
            self.end();
        }
        true
    }

    /// Whether the outline is exactly an axis-aligned rectangle.
    pub fn is_axis_aligned_rect(&self) -> bool {
        if self.pts.len() != 5 || self.types.iter().any(|t| *t == CurveType::Cubic) {
            return false;
        }
        let [p1, p2, p3, p4, _] = [
            self.pts[0],
            self.pts[1],
            self.pts[2],
            self.pts[3],
            self.pts[4],
        ];
        let a = FixedPoint::new(p1.x, p3.y);
        let b = FixedPoint::new(p3.x, p1.y);
        (p2 == a && p4 == b) || (p2 == b && p4 == a)
    }

    /// The device-space pixel bounds, clipped to `clip`.
    ///
    /// Fast-tracked rectangles round to the nearest pixel edge; everything else is
    /// expanded to whole pixels. Returns `None` when nothing remains visible.
    pub fn bbox(&self, clip: &RenderRegion, fast_track: bool) -> Option<RenderRegion> {
        if self.is_empty() {
            return None;
        }

        let first = self.pts[0];
        let (mut min, mut max) = (first, first);
        for p in &self.pts[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        let mut region = if fast_track {
            let round = |v: i32| (v as f32 / 64.0).round() as i32;
            RenderRegion::new(round(min.x), round(min.y), round(max.x), round(max.y))
        } else {
            RenderRegion::new(min.x >> 6, min.y >> 6, (max.x + 63) >> 6, (max.y + 63) >> 6)
        };
        region.intersect(clip);
        region.valid().then_some(region)
    }
}
