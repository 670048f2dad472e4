// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke expansion straight to triangles.
//!
//! Every segment becomes a quad, and joins and caps add their own triangles on top. The
//! pieces overlap, so strokes are drawn through the stencil buffer to cover each pixel
//! once.

use core::f32::consts::PI;

use tvg_common::math::Point;
use tvg_common::shape::{StrokeCap, StrokeJoin};

use crate::geometry::Polyline;
use crate::tessellator::Mesh;

/// Tolerance for round joins and caps, in device pixels.
const ROUND_TOLERANCE: f32 = 0.25;

/// Builds the stroke mesh of flattened contours.
#[derive(Debug)]
pub(crate) struct MeshStroker {
    radius: f32,
    cap: StrokeCap,
    join: StrokeJoin,
    miter_limit: f32,
    /// User-to-device scale, used to pick the number of arc steps.
    scale: f32,
    mesh: Mesh,
}

impl MeshStroker {
    pub(crate) fn new(
        width: f32,
        cap: StrokeCap,
        join: StrokeJoin,
        miter_limit: f32,
        scale: f32,
    ) -> Self {
        Self {
            radius: width * 0.5,
            cap,
            join,
            miter_limit: miter_limit.max(1.0),
            scale: scale.max(f32::EPSILON),
            mesh: Mesh::default(),
        }
    }

    pub(crate) fn stroke(mut self, lines: &[Polyline]) -> Mesh {
        if self.radius <= 0.0 {
            return self.mesh;
        }
        for line in lines {
            self.stroke_line(line);
        }
        self.mesh
    }

    fn stroke_line(&mut self, line: &Polyline) {
        let mut pts: Vec<Point> = Vec::with_capacity(line.pts.len());
        for p in &line.pts {
            if pts.last().map_or(true, |last| !last.approx_eq(*p)) {
                pts.push(*p);
            }
        }
        if line.closed && pts.len() > 2 && pts[0].approx_eq(pts[pts.len() - 1]) {
            pts.pop();
        }

        match pts.len() {
            0 => {}
            1 => self.dot(pts[0]),
            n => {
                let closed = line.closed && n > 2;
                let segments = if closed { n } else { n - 1 };
                let dir = |i: usize| (pts[(i + 1) % n] - pts[i]).normalize();

                for i in 0..segments {
                    self.quad(pts[i], pts[(i + 1) % n]);
                }
                for i in 1..segments {
                    self.join(dir(i - 1), dir(i), pts[i]);
                }
                if closed {
                    self.join(dir(n - 1), dir(0), pts[0]);
                } else {
                    self.cap(pts[0], dir(0), true);
                    self.cap(pts[n - 1], dir(n - 2), false);
                }
            }
        }
    }

    fn vertex(&mut self, p: Point) -> u32 {
        self.mesh.vertices.push(p);
        self.mesh.vertices.len() as u32 - 1
    }

    fn triangle(&mut self, a: Point, b: Point, c: Point) {
        let base = self.mesh.vertices.len() as u32;
        self.mesh.vertices.extend_from_slice(&[a, b, c]);
        self.mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    ///   a --------- c
    ///   |           |
    ///   b --------- d
    fn quad(&mut self, from: Point, to: Point) {
        let dir = (to - from).normalize();
        let n = normal(dir) * self.radius;
        let a = self.vertex(from + n);
        let b = self.vertex(from - n);
        let c = self.vertex(to + n);
        let d = self.vertex(to - n);
        self.mesh.indices.extend_from_slice(&[a, b, c, b, d, c]);
    }

    fn join(&mut self, prev: Point, dir: Point, at: Point) {
        let cross = prev.cross(dir);
        if cross.abs() <= 1e-6 {
            // Straight on, or a full turn back.
            if prev.dot(dir) < 0.0 && self.join == StrokeJoin::Round {
                self.arc(at, normal(prev) * self.radius, PI);
            }
            return;
        }
        // The outer side of a clockwise turn is opposite the normal.
        let side = if cross > 0.0 { -self.radius } else { self.radius };
        let prev_join = at + normal(prev) * side;
        let curr_join = at + normal(dir) * side;

        match self.join {
            StrokeJoin::Bevel => self.triangle(prev_join, curr_join, at),
            StrokeJoin::Miter => self.miter(prev_join, curr_join, at),
            StrokeJoin::Round => {
                let sweep = cross.signum() * prev.dot(dir).clamp(-1.0, 1.0).acos();
                self.arc(at, prev_join - at, sweep);
            }
        }
    }

    fn miter(&mut self, prev: Point, curr: Point, center: Point) {
        let out = (prev - center) + (curr - center);
        let len2 = out.length2();
        if len2 <= f32::EPSILON {
            self.triangle(prev, curr, center);
            return;
        }
        let tip = out * (2.0 * self.radius * self.radius / len2);
        if tip.length() > self.miter_limit * self.radius {
            self.triangle(prev, curr, center);
            return;
        }
        let tip = center + tip;
        self.triangle(center, prev, tip);
        self.triangle(tip, curr, center);
    }

    /// `dir` points along the stroke, away from the start and out of the end.
    fn cap(&mut self, at: Point, dir: Point, start: bool) {
        let n = normal(dir) * self.radius;
        let out = (if start { -dir } else { dir }) * self.radius;
        match self.cap {
            StrokeCap::Butt => {}
            StrokeCap::Square => {
                let a = self.vertex(at + n);
                let b = self.vertex(at - n);
                let c = self.vertex(at + n + out);
                let d = self.vertex(at - n + out);
                self.mesh.indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
            StrokeCap::Round => {
                let from = if start { n } else { -n };
                self.arc(at, from, PI);
            }
        }
    }

    /// A zero-length contour still gets its caps.
    fn dot(&mut self, at: Point) {
        let r = self.radius;
        match self.cap {
            StrokeCap::Butt => {}
            StrokeCap::Square => {
                let a = self.vertex(at + Point::new(-r, -r));
                let b = self.vertex(at + Point::new(r, -r));
                let c = self.vertex(at + Point::new(r, r));
                let d = self.vertex(at + Point::new(-r, r));
                self.mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
            StrokeCap::Round => self.arc(at, Point::new(r, 0.0), 2.0 * PI),
        }
    }

    /// A fan around `center`, starting at `center + from` and turning by `sweep` radians.
    fn arc(&mut self, center: Point, from: Point, sweep: f32) {
        let radius = self.radius * self.scale;
        let step = if radius <= ROUND_TOLERANCE {
            PI
        } else {
            2.0 * (1.0 - ROUND_TOLERANCE / radius).acos()
        };
        let count = (sweep.abs() / step.max(1e-3)).ceil().clamp(1.0, 128.0) as u32;

        let c = self.vertex(center);
        let mut prev = self.vertex(center + from);
        for i in 1..=count {
            let (sin, cos) = (sweep * i as f32 / count as f32).sin_cos();
            let p = Point::new(from.x * cos - from.y * sin, from.x * sin + from.y * cos);
            let next = self.vertex(center + p);
            self.mesh.indices.extend_from_slice(&[c, prev, next]);
            prev = next;
        }
    }
}

fn normal(dir: Point) -> Point {
    Point::new(-dir.y, dir.x)
}
