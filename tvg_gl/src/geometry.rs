// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shape and image geometry in user space.
//!
//! Meshes stay in user coordinates and the shape transform travels to the vertex shader,
//! so a transform-only update does not re-tessellate. Curve subdivision still looks at
//! the device-space size of each curve.

use tvg_common::dash::dash_path;
use tvg_common::math::{Matrix, Point};
use tvg_common::path::{PathCommand, RenderPath};
use tvg_common::region::RenderRegion;
use tvg_common::shape::{FillRule, RenderShape};
use tvg_common::trim::trim_path;

use crate::stroker::MeshStroker;
use crate::tessellator::{self, Mesh};

/// A flattened contour.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Polyline {
    pub(crate) pts: Vec<Point>,
    pub(crate) closed: bool,
}

/// Flatten `path`, subdividing curves by their size under `transform`.
pub(crate) fn flatten(path: &RenderPath, transform: &Matrix) -> Vec<Polyline> {
    let mut out = Vec::new();
    let mut line: Option<Polyline> = None;
    let mut pen = Point::ZERO;
    let mut start = Point::ZERO;
    let mut pts = path.pts.iter().copied();

    for cmd in &path.cmds {
        match cmd {
            PathCommand::MoveTo => {
                let Some(p) = pts.next() else {
                    break;
                };
                out.extend(line.take().filter(|l| !l.pts.is_empty()));
                line = Some(Polyline {
                    pts: vec![p],
                    closed: false,
                });
                pen = p;
                start = p;
            }
            PathCommand::LineTo => {
                let Some(p) = pts.next() else {
                    break;
                };
                line.get_or_insert_with(|| Polyline {
                    pts: vec![pen],
                    closed: false,
                })
                .pts
                .push(p);
                pen = p;
            }
            PathCommand::CubicTo => {
                let (Some(c1), Some(c2), Some(end)) = (pts.next(), pts.next(), pts.next()) else {
                    break;
                };
                let bz = tvg_common::math::Bezier::new(pen, c1, c2, end);
                let count = bz.transform(transform).segment_count().max(2);
                let current = line.get_or_insert_with(|| Polyline {
                    pts: vec![pen],
                    closed: false,
                });
                for i in 1..=count {
                    current.pts.push(bz.at(i as f32 / count as f32));
                }
                pen = end;
            }
            PathCommand::Close => {
                if let Some(mut l) = line.take() {
                    l.closed = true;
                    out.push(l);
                }
                pen = start;
            }
        }
    }
    out.extend(line.filter(|l| !l.pts.is_empty()));
    out
}

/// How the fill mesh must be drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum FillMode {
    /// Non-overlapping triangles, drawn as is.
    #[default]
    Direct,
    /// Overlapping fans, resolved through the stencil buffer with the given rule.
    Stencil(FillRule),
}

/// Render data geometry of one shape or image.
#[derive(Clone, Debug, Default)]
pub(crate) struct GlGeometry {
    pub(crate) fill: Mesh,
    pub(crate) fill_mode: FillMode,
    pub(crate) stroke: Mesh,
    /// `x, y, u, v` per image corner.
    pub(crate) image: Vec<[f32; 4]>,
    pub(crate) transform: Matrix,
    /// User-space bounds of the source path or image.
    bounds: Option<(Point, Point)>,
}

impl GlGeometry {
    /// Triangulate the fill of `shape`.
    ///
    /// Convex single contours use a fan. Anything else goes through the sweep, and
    /// when that fails the contours are fanned and the stencil buffer resolves the
    /// fill rule.
    pub(crate) fn tessellate_fill(&mut self, shape: &RenderShape, transform: &Matrix) {
        self.fill = Mesh::default();
        self.fill_mode = FillMode::Direct;
        self.bounds = shape.path.bounds();

        let contours: Vec<Vec<Point>> = flatten(&shape.path, transform)
            .into_iter()
            .map(|l| l.pts)
            .filter(|pts| pts.len() >= 3)
            .collect();
        if contours.is_empty() {
            return;
        }
        if contours.len() == 1 && tessellator::is_convex(&contours[0]) {
            self.fill = tessellator::fan(&contours[0]);
            return;
        }
        match tessellator::tessellate(&contours, shape.rule) {
            Ok(mesh) => self.fill = mesh,
            Err(err) => {
                log::debug!("falling back to stencil fill: {err}");
                for contour in &contours {
                    self.fill.append(&tessellator::fan(contour));
                }
                self.fill_mode = FillMode::Stencil(shape.rule);
            }
        }
    }

    /// Drop the fill of a shape whose fill never shows, keeping its bounds.
    pub(crate) fn clear_fill(&mut self, shape: &RenderShape) {
        self.fill = Mesh::default();
        self.fill_mode = FillMode::Direct;
        self.bounds = shape.path.bounds();
    }

    /// Expand the stroke of `shape`, applying its trim and dash first.
    pub(crate) fn stroke(&mut self, shape: &RenderShape, transform: &Matrix) {
        self.stroke = Mesh::default();
        let Some(stroke) = &shape.stroke else {
            return;
        };
        if stroke.width <= 0.0 {
            return;
        }
        let trimmed = if stroke.trimmed() {
            trim_path(&shape.path, &stroke.trim)
        } else {
            None
        };
        let base = trimmed.as_ref().unwrap_or(&shape.path);
        let dashed = dash_path(base, stroke);
        let path = dashed.as_ref().unwrap_or(base);

        let lines = flatten(path, transform);
        self.stroke = MeshStroker::new(
            stroke.width,
            stroke.cap,
            stroke.join,
            stroke.miterlimit,
            transform.scaling(),
        )
        .stroke(&lines);
    }

    /// A textured quad covering a `w` by `h` image.
    pub(crate) fn image(&mut self, w: u32, h: u32) {
        let (w, h) = (w as f32, h as f32);
        self.image = vec![
            [0.0, 0.0, 0.0, 0.0],
            [w, 0.0, 1.0, 0.0],
            [w, h, 1.0, 1.0],
            [0.0, h, 0.0, 1.0],
        ];
        self.fill = Mesh {
            vertices: self.image.iter().map(|v| Point::new(v[0], v[1])).collect(),
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        self.fill_mode = FillMode::Direct;
        self.bounds = Some((Point::ZERO, Point::new(w, h)));
    }

    /// Pixel bounds of everything drawn, under the current transform.
    pub(crate) fn region(&self) -> RenderRegion {
        let mut lo = Point::new(f32::MAX, f32::MAX);
        let mut hi = Point::new(f32::MIN, f32::MIN);
        for p in self.fill.vertices.iter().chain(&self.stroke.vertices) {
            let p = p.transform(&self.transform);
            lo = lo.min(p);
            hi = hi.max(p);
        }
        if lo.x > hi.x {
            return RenderRegion::default();
        }
        RenderRegion::new(
            lo.x.floor() as i32,
            lo.y.floor() as i32,
            hi.x.ceil() as i32,
            hi.y.ceil() as i32,
        )
    }

    /// Corners of the user-space bounds under `m`.
    pub(crate) fn corners(&self, m: &Matrix) -> Option<[Point; 4]> {
        let (lo, hi) = self.bounds?;
        Some(
            [lo, Point::new(hi.x, lo.y), hi, Point::new(lo.x, hi.y)].map(|p| p.transform(m)),
        )
    }

    /// Whether any drawn triangle covers part of `region`.
    pub(crate) fn intersects(&self, region: &RenderRegion) -> bool {
        if !region.valid() || !self.region().intersects(region) {
            return false;
        }
        let lo = Point::new(region.min.0 as f32, region.min.1 as f32);
        let hi = Point::new(region.max.0 as f32, region.max.1 as f32);
        [&self.fill, &self.stroke].into_iter().any(|mesh| {
            mesh.indices.chunks_exact(3).any(|t| {
                let tri = [t[0], t[1], t[2]]
                    .map(|i| mesh.vertices[i as usize].transform(&self.transform));
                triangle_hits_rect(tri, lo, hi)
            })
        })
    }
}

/// Separating-axis test between a triangle and the box `lo..hi`.
fn triangle_hits_rect(tri: [Point; 3], lo: Point, hi: Point) -> bool {
    let tmin = tri[0].min(tri[1]).min(tri[2]);
    let tmax = tri[0].max(tri[1]).max(tri[2]);
    if tmax.x <= lo.x || tmin.x >= hi.x || tmax.y <= lo.y || tmin.y >= hi.y {
        return false;
    }
    let corners = [lo, Point::new(hi.x, lo.y), hi, Point::new(lo.x, hi.y)];
    for i in 0..3 {
        let (a, b) = (tri[i], tri[(i + 1) % 3]);
        let axis = Point::new(a.y - b.y, b.x - a.x);
        let project = |pts: &[Point]| {
            pts.iter().fold((f32::MAX, f32::MIN), |(min, max), p| {
                let d = axis.dot(*p);
                (min.min(d), max.max(d))
            })
        };
        let (t0, t1) = project(&tri);
        let (r0, r1) = project(&corners);
        if t1 <= r0 || r1 <= t0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvg_common::shape::{RenderColor, RenderStroke, StrokeCap};

    fn square(x: f32, y: f32, size: f32) -> RenderPath {
        let mut path = RenderPath::new();
        path.add_rect(x, y, size, size);
        path
    }

    #[test]
    fn flatten_closes_and_splits_contours() {
        let mut path = square(0.0, 0.0, 10.0);
        path.move_to(Point::new(20.0, 0.0));
        path.line_to(Point::new(30.0, 0.0));
        let lines = flatten(&path, &Matrix::IDENTITY);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].closed);
        assert_eq!(lines[0].pts.len(), 4);
        assert!(!lines[1].closed);
        let tail = vec![Point::new(20.0, 0.0), Point::new(30.0, 0.0)];
        assert_eq!(lines[1].pts, tail);
    }

    #[test]
    fn curves_subdivide_with_scale() {
        let mut path = RenderPath::new();
        path.add_circle(0.0, 0.0, 10.0, 10.0);
        let small = flatten(&path, &Matrix::IDENTITY)[0].pts.len();
        let large = flatten(&path, &Matrix::scale(20.0, 20.0))[0].pts.len();
        assert!(large > small);
    }

    #[test]
    fn convex_fill_skips_the_sweep() {
        let shape = RenderShape::new(square(0.0, 0.0, 10.0), RenderColor::new(255, 0, 0, 255));
        let mut geometry = GlGeometry::default();
        geometry.tessellate_fill(&shape, &Matrix::IDENTITY);
        assert_eq!(geometry.fill_mode, FillMode::Direct);
        assert_eq!(geometry.fill.triangles(), 2);
    }

    #[test]
    fn region_follows_transform_and_stroke() {
        let mut shape = RenderShape::new(square(0.0, 0.0, 10.0), RenderColor::new(255, 0, 0, 255));
        shape.stroke = Some(RenderStroke {
            cap: StrokeCap::Butt,
            ..RenderStroke::new(2.0, RenderColor::new(0, 0, 0, 255))
        });
        let mut geometry = GlGeometry::default();
        geometry.tessellate_fill(&shape, &Matrix::IDENTITY);
        geometry.stroke(&shape, &Matrix::IDENTITY);
        geometry.transform = Matrix::translate(5.0, 5.0);
        assert_eq!(geometry.region(), RenderRegion::new(4, 4, 16, 16));
    }

    #[test]
    fn hit_testing() {
        let shape = RenderShape::new(square(0.0, 0.0, 10.0), RenderColor::new(255, 0, 0, 255));
        let mut geometry = GlGeometry::default();
        geometry.tessellate_fill(&shape, &Matrix::IDENTITY);
        assert!(geometry.intersects(&RenderRegion::new(5, 5, 6, 6)));
        assert!(!geometry.intersects(&RenderRegion::new(10, 0, 12, 2)));

        let mut triangle = RenderPath::new();
        triangle.move_to(Point::new(0.0, 0.0));
        triangle.line_to(Point::new(10.0, 0.0));
        triangle.line_to(Point::new(0.0, 10.0));
        triangle.close();
        let shape = RenderShape::new(triangle, RenderColor::default());
        geometry.tessellate_fill(&shape, &Matrix::IDENTITY);
        // Inside the bounding box, beyond the hypotenuse.
        assert!(!geometry.intersects(&RenderRegion::new(8, 8, 10, 10)));
        assert!(geometry.intersects(&RenderRegion::new(1, 1, 2, 2)));
    }

    #[test]
    fn image_quad() {
        let mut geometry = GlGeometry::default();
        geometry.image(4, 2);
        assert_eq!(geometry.image[2], [4.0, 2.0, 1.0, 1.0]);
        assert_eq!(geometry.region(), RenderRegion::new(0, 0, 4, 2));
        let corners = geometry.corners(&Matrix::scale(2.0, 2.0)).unwrap();
        assert_eq!(corners[2], Point::new(8.0, 4.0));
    }
}
