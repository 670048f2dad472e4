// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Triangulation of flattened paths.
//!
//! [`tessellate`] runs a Bentley–Ottmann style sweep: the contours become a mesh of
//! top-to-bottom edges, intersections are split into new vertices, and a second sweep
//! grows monotone polygons tagged with their winding number. Polygons passing the fill
//! rule are ear-clipped into triangles, so the output never overlaps itself and can be
//! drawn without the stencil buffer.
//!
//! Coordinates are scaled up by 1000 while sweeping and intersections are rounded to
//! that grid, which keeps the floating-point side tests consistent.
//!
//! Nodes live in arenas and refer to each other by index. Every edge is on up to five
//! intrusive lists at once (above its bottom vertex, below its top vertex, the active
//! edge list, and a left and a right monotone chain), so the links are stored per list
//! kind.

use std::collections::VecDeque;

use tvg_common::math::Point;
use tvg_common::shape::FillRule;

/// Coordinate scale applied while sweeping.
const UPSCALE: f32 = 1000.0;

/// Why a path could not be triangulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TessellationError {
    /// The active edge list lost its left-to-right order, usually through rounding in
    /// nearly collinear edges.
    #[error("the active edge list is out of order")]
    InvalidSweep,
    /// Intersection splitting kept finding new intersections.
    #[error("intersection splitting did not converge")]
    NoProgress,
    /// A coordinate is not finite.
    #[error("the path has non-finite coordinates")]
    NonFinite,
}

/// Indexed triangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point>,
    /// Three indices per triangle.
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Number of triangles.
    pub fn triangles(&self) -> usize {
        self.indices.len() / 3
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append `other`, rebasing its indices.
    pub(crate) fn append(&mut self, other: &Self) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Sum of the absolute triangle areas.
    pub fn area(&self) -> f32 {
        self.indices
            .chunks_exact(3)
            .map(|t| {
                let [a, b, c] = [t[0], t[1], t[2]].map(|i| self.vertices[i as usize]);
                ((b - a).cross(c - a) * 0.5).abs()
            })
            .sum()
    }
}

/// Triangulate closed `contours`, keeping the area inside per `rule`.
pub fn tessellate(contours: &[Vec<Point>], rule: FillRule) -> Result<Mesh, TessellationError> {
    let mut sweep = Sweep::default();
    sweep.build(contours)?;
    sweep.merge_vertices();
    sweep.simplify()?;
    sweep.tessellate();
    Ok(sweep.emit(rule))
}

/// Triangulate a single contour as a fan around its first point.
///
/// Exact for convex contours. For any other contour the triangles overlap and cover
/// the area with the right winding, which is what the stencil fill expects.
pub fn fan(contour: &[Point]) -> Mesh {
    let mut mesh = Mesh::default();
    if contour.len() < 3 {
        return mesh;
    }
    mesh.vertices.extend_from_slice(contour);
    for i in 1..contour.len() as u32 - 1 {
        mesh.indices.extend_from_slice(&[0, i, i + 1]);
    }
    mesh
}

/// Whether `contour` is convex, ignoring collinear points.
pub fn is_convex(contour: &[Point]) -> bool {
    let n = contour.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f32;
    for i in 0..n {
        let a = contour[i];
        let b = contour[(i + 1) % n];
        let c = contour[(i + 2) % n];
        let cross = (b - a).cross(c - b);
        if cross.abs() <= f32::EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

type VertexId = usize;
type EdgeId = usize;
type PolyId = usize;
type MonoId = usize;

/// Sweep order: top first, then left.
fn less(a: Point, b: Point) -> bool {
    a.y < b.y || (a.y == b.y && a.x < b.x)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct List {
    head: Option<EdgeId>,
    tail: Option<EdgeId>,
}

/// The lists an edge can be on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    /// Edges ending at a vertex.
    Above = 0,
    /// Edges starting at a vertex.
    Below = 1,
    /// The active edge list.
    Active = 2,
    LeftChain = 3,
    RightChain = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug)]
struct Vertex {
    pt: Point,
    prev: Option<VertexId>,
    next: Option<VertexId>,
    above: List,
    below: List,
    /// Enclosing edges found while sweeping.
    left: Option<EdgeId>,
    right: Option<EdgeId>,
    /// Index in the output mesh.
    index: Option<u32>,
}

impl Vertex {
    fn new(pt: Point) -> Self {
        Self {
            pt,
            prev: None,
            next: None,
            above: List::default(),
            below: List::default(),
            left: None,
            right: None,
            index: None,
        }
    }
}

/// `a * x + b * y + c`, positive on the right of the edge in y-down coordinates.
#[derive(Clone, Copy, Debug, Default)]
struct LineEq {
    a: f64,
    b: f64,
    c: f64,
}

impl LineEq {
    fn new(top: Point, bottom: Point) -> Self {
        Self {
            a: f64::from(bottom.y) - f64::from(top.y),
            b: f64::from(top.x) - f64::from(bottom.x),
            c: f64::from(top.y) * f64::from(bottom.x) - f64::from(top.x) * f64::from(bottom.y),
        }
    }

    fn dist(&self, p: Point) -> f64 {
        self.a * f64::from(p.x) + self.b * f64::from(p.y) + self.c
    }
}

#[derive(Debug)]
struct Edge {
    top: VertexId,
    bottom: VertexId,
    winding: i32,
    /// `[prev, next]` per [`Link`].
    links: [[Option<EdgeId>; 2]; 5],
    left_poly: Option<PolyId>,
    right_poly: Option<PolyId>,
    used_in_left: bool,
    used_in_right: bool,
    line: LineEq,
}

#[derive(Debug)]
struct Polygon {
    first: VertexId,
    winding: i32,
    count: u32,
    /// Polygon that will be joined to this one by a later edge.
    partner: Option<PolyId>,
    head: Option<MonoId>,
    tail: Option<MonoId>,
}

#[derive(Debug)]
struct Monotone {
    side: Side,
    first: Option<EdgeId>,
    last: Option<EdgeId>,
    next: Option<MonoId>,
}

#[derive(Debug, Default)]
struct Sweep {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    polys: Vec<Polygon>,
    monos: Vec<Monotone>,
    /// Head and tail of the sorted vertex list.
    mesh: (Option<VertexId>, Option<VertexId>),
    active: List,
    mesh_out: Mesh,
}

impl Sweep {
    fn pt(&self, v: VertexId) -> Point {
        self.vertices[v].pt
    }

    fn top_pt(&self, e: EdgeId) -> Point {
        self.pt(self.edges[e].top)
    }

    fn bottom_pt(&self, e: EdgeId) -> Point {
        self.pt(self.edges[e].bottom)
    }

    /// Whether edge `e` lies left of `p`.
    fn left_of(&self, e: EdgeId, p: Point) -> bool {
        self.edges[e].line.dist(p) > 0.0
    }

    /// Whether edge `e` lies right of `p`.
    fn right_of(&self, e: EdgeId, p: Point) -> bool {
        self.edges[e].line.dist(p) < 0.0
    }

    fn next(&self, link: Link, e: EdgeId) -> Option<EdgeId> {
        self.edges[e].links[link as usize][1]
    }

    fn prev(&self, link: Link, e: EdgeId) -> Option<EdgeId> {
        self.edges[e].links[link as usize][0]
    }

    fn walk(&self, link: Link, list: List) -> Vec<EdgeId> {
        let mut out = Vec::new();
        let mut cur = list.head;
        while let Some(e) = cur {
            out.push(e);
            cur = self.next(link, e);
        }
        out
    }

    fn insert(
        &mut self,
        link: Link,
        e: EdgeId,
        prev: Option<EdgeId>,
        next: Option<EdgeId>,
        mut list: List,
    ) -> List {
        let k = link as usize;
        self.edges[e].links[k] = [prev, next];
        match prev {
            Some(p) => self.edges[p].links[k][1] = Some(e),
            None => list.head = Some(e),
        }
        match next {
            Some(n) => self.edges[n].links[k][0] = Some(e),
            None => list.tail = Some(e),
        }
        list
    }

    fn remove(&mut self, link: Link, e: EdgeId, mut list: List) -> List {
        let k = link as usize;
        let [prev, next] = self.edges[e].links[k];
        if prev.is_none() && next.is_none() && list.head != Some(e) {
            return list;
        }
        match prev {
            Some(p) => self.edges[p].links[k][1] = next,
            None => list.head = next,
        }
        match next {
            Some(n) => self.edges[n].links[k][0] = prev,
            None => list.tail = prev,
        }
        self.edges[e].links[k] = [None, None];
        list
    }

    fn contains(&self, link: Link, e: EdgeId, list: List) -> bool {
        let mut cur = list.head;
        while let Some(c) = cur {
            if c == e {
                return true;
            }
            cur = self.next(link, c);
        }
        false
    }

    fn active_insert(&mut self, e: EdgeId, prev: Option<EdgeId>) {
        let next = match prev {
            Some(p) => self.next(Link::Active, p),
            None => self.active.head,
        };
        self.active = self.insert(Link::Active, e, prev, next, self.active);
    }

    fn active_remove(&mut self, e: EdgeId) {
        self.active = self.remove(Link::Active, e, self.active);
    }

    fn new_vertex(&mut self, pt: Point) -> VertexId {
        self.vertices.push(Vertex::new(pt));
        self.vertices.len() - 1
    }

    fn new_edge(&mut self, top: VertexId, bottom: VertexId, winding: i32) -> EdgeId {
        let line = LineEq::new(self.pt(top), self.pt(bottom));
        self.edges.push(Edge {
            top,
            bottom,
            winding,
            links: [[None; 2]; 5],
            left_poly: None,
            right_poly: None,
            used_in_left: false,
            used_in_right: false,
            line,
        });
        self.edges.len() - 1
    }

    /// A directed edge from `a` to `b`, oriented top to bottom.
    fn make_edge(&mut self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        if self.pt(a) == self.pt(b) {
            return None;
        }
        let (top, bottom, winding) = if less(self.pt(b), self.pt(a)) {
            (b, a, -1)
        } else {
            (a, b, 1)
        };
        Some(self.new_edge(top, bottom, winding))
    }

    fn insert_above(&mut self, v: VertexId, e: EdgeId) {
        let (top, bottom) = (self.top_pt(e), self.bottom_pt(e));
        if top == bottom || less(bottom, top) {
            return;
        }
        let list = self.vertices[v].above;
        if self.contains(Link::Above, e, list) {
            return;
        }
        let mut prev = None;
        let mut next = list.head;
        while let Some(n) = next {
            if self.right_of(n, top) {
                break;
            }
            prev = Some(n);
            next = self.next(Link::Above, n);
        }
        self.vertices[v].above = self.insert(Link::Above, e, prev, next, list);
    }

    fn insert_below(&mut self, v: VertexId, e: EdgeId) {
        let (top, bottom) = (self.top_pt(e), self.bottom_pt(e));
        if top == bottom || less(bottom, top) {
            return;
        }
        let list = self.vertices[v].below;
        if self.contains(Link::Below, e, list) {
            return;
        }
        let mut prev = None;
        let mut next = list.head;
        while let Some(n) = next {
            if self.right_of(n, bottom) {
                break;
            }
            prev = Some(n);
            next = self.next(Link::Below, n);
        }
        self.vertices[v].below = self.insert(Link::Below, e, prev, next, list);
    }

    fn remove_above(&mut self, e: EdgeId) {
        let v = self.edges[e].bottom;
        self.vertices[v].above = self.remove(Link::Above, e, self.vertices[v].above);
    }

    fn remove_below(&mut self, e: EdgeId) {
        let v = self.edges[e].top;
        self.vertices[v].below = self.remove(Link::Below, e, self.vertices[v].below);
    }

    /// Take `e` off every list once it has collapsed to a point.
    fn drop_if_degenerate(&mut self, e: EdgeId) {
        let (top, bottom) = (self.top_pt(e), self.bottom_pt(e));
        if top == bottom || less(bottom, top) {
            self.remove_above(e);
            self.remove_below(e);
            self.active_remove(e);
        }
    }

    fn set_bottom(&mut self, e: EdgeId, v: VertexId) {
        self.remove_above(e);
        self.edges[e].bottom = v;
        self.edges[e].line = LineEq::new(self.top_pt(e), self.bottom_pt(e));
        self.insert_above(v, e);
        self.drop_if_degenerate(e);
    }

    fn set_top(&mut self, e: EdgeId, v: VertexId) {
        self.remove_below(e);
        self.edges[e].top = v;
        self.edges[e].line = LineEq::new(self.top_pt(e), self.bottom_pt(e));
        self.insert_below(v, e);
        self.drop_if_degenerate(e);
    }

    fn connected(&self, v: VertexId) -> bool {
        self.vertices[v].above.head.is_some() || self.vertices[v].below.head.is_some()
    }

    fn mesh_insert(&mut self, v: VertexId, prev: Option<VertexId>, next: Option<VertexId>) {
        self.vertices[v].prev = prev;
        self.vertices[v].next = next;
        match prev {
            Some(p) => self.vertices[p].next = Some(v),
            None => self.mesh.0 = Some(v),
        }
        match next {
            Some(n) => self.vertices[n].prev = Some(v),
            None => self.mesh.1 = Some(v),
        }
    }

    fn mesh_remove(&mut self, v: VertexId) {
        let (prev, next) = (self.vertices[v].prev, self.vertices[v].next);
        match prev {
            Some(p) => self.vertices[p].next = next,
            None => self.mesh.0 = next,
        }
        match next {
            Some(n) => self.vertices[n].prev = prev,
            None => self.mesh.1 = prev,
        }
        self.vertices[v].prev = None;
        self.vertices[v].next = None;
    }

    fn build(&mut self, contours: &[Vec<Point>]) -> Result<(), TessellationError> {
        let mut sorted = Vec::new();
        for contour in contours {
            if contour.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(TessellationError::NonFinite);
            }
            let first = self.vertices.len();
            for p in contour {
                let up = Point::new(
                    (p.x * UPSCALE * 100.0).ceil() / 100.0,
                    (p.y * UPSCALE * 100.0).ceil() / 100.0,
                );
                let v = self.new_vertex(up);
                sorted.push(v);
            }
            let last = self.vertices.len();
            if last - first < 2 {
                continue;
            }
            let mut prev = last - 1;
            for v in first..last {
                if let Some(e) = self.make_edge(prev, v) {
                    let (top, bottom) = (self.edges[e].top, self.edges[e].bottom);
                    self.insert_above(bottom, e);
                    self.insert_below(top, e);
                }
                prev = v;
            }
        }

        sorted.sort_by(|a, b| {
            let (pa, pb) = (self.pt(*a), self.pt(*b));
            pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
        });
        let mut prev = None;
        for v in sorted {
            self.mesh_insert(v, prev, None);
            prev = Some(v);
        }
        Ok(())
    }

    /// Collapse vertices sharing a position.
    fn merge_vertices(&mut self) {
        let Some(head) = self.mesh.0 else {
            return;
        };
        let mut cur = self.vertices[head].next;
        while let Some(v) = cur {
            let next = self.vertices[v].next;
            let Some(prev) = self.vertices[v].prev else {
                cur = next;
                continue;
            };
            if less(self.pt(v), self.pt(prev)) {
                self.vertices[v].pt = self.pt(prev);
            }
            if self.pt(v) == self.pt(prev) {
                while let Some(e) = self.vertices[v].above.head {
                    self.set_bottom(e, prev);
                    // A degenerate edge is already gone from the list.
                    if self.vertices[v].above.head == Some(e) {
                        self.remove_above(e);
                    }
                }
                while let Some(e) = self.vertices[v].below.head {
                    self.set_top(e, prev);
                    if self.vertices[v].below.head == Some(e) {
                        self.remove_below(e);
                    }
                }
                self.mesh_remove(v);
            }
            cur = next;
        }
    }

    fn find_enclosing(&self, v: VertexId) -> (Option<EdgeId>, Option<EdgeId>) {
        let above = self.vertices[v].above;
        if let (Some(head), Some(tail)) = (above.head, above.tail) {
            return (self.prev(Link::Active, head), self.next(Link::Active, tail));
        }
        let p = self.pt(v);
        let mut next = None;
        let mut prev = self.active.tail;
        while let Some(e) = prev {
            if self.left_of(e, p) {
                break;
            }
            next = Some(e);
            prev = self.prev(Link::Active, e);
        }
        (prev, next)
    }

    fn valid_pair(&self, left: EdgeId, right: EdgeId) -> bool {
        let (l, r) = (&self.edges[left], &self.edges[right]);
        if l.top == r.top {
            if !self.left_of(left, self.bottom_pt(right))
                || !self.right_of(right, self.bottom_pt(left))
            {
                return false;
            }
        } else if less(self.top_pt(left), self.top_pt(right)) {
            if !self.left_of(left, self.top_pt(right)) {
                return false;
            }
        } else if !self.right_of(right, self.top_pt(left)) {
            return false;
        }

        if l.bottom == r.bottom {
            if !self.left_of(left, self.top_pt(right)) || !self.right_of(right, self.top_pt(left)) {
                return false;
            }
        } else if less(self.bottom_pt(right), self.bottom_pt(left)) {
            if !self.left_of(left, self.bottom_pt(right)) {
                return false;
            }
        } else if !self.right_of(right, self.bottom_pt(left)) {
            return false;
        }
        true
    }

    fn active_valid(&self) -> bool {
        let mut left = self.active.head;
        while let Some(l) = left {
            let right = self.next(Link::Active, l);
            if let Some(r) = right {
                if !self.valid_pair(l, r) {
                    return false;
                }
            }
            left = right;
        }
        true
    }

    /// Step the sweep back from `current` to `dst`, restoring the active edges.
    fn rewind(&mut self, current: &mut VertexId, mut dst: VertexId) {
        if *current == dst || less(self.pt(*current), self.pt(dst)) {
            return;
        }
        let mut v = *current;
        while v != dst {
            let Some(prev) = self.vertices[v].prev else {
                break;
            };
            v = prev;
            for e in self.walk(Link::Below, self.vertices[v].below) {
                self.active_remove(e);
            }
            let mut left = self.vertices[v].left;
            for e in self.walk(Link::Above, self.vertices[v].above) {
                self.active_insert(e, left);
                left = Some(e);

                let top = self.edges[e].top;
                let tp = self.pt(top);
                let bad_left = self.vertices[top].left.is_some_and(|l| !self.left_of(l, tp));
                let bad_right = self.vertices[top].right.is_some_and(|r| !self.right_of(r, tp));
                if less(tp, self.pt(dst)) && (bad_left || bad_right) {
                    dst = top;
                }
            }
        }
        *current = v;
    }

    /// The crossing point of two edges, away from their end points.
    fn intersect(&self, a: EdgeId, b: EdgeId) -> Option<Point> {
        let (ea, eb) = (&self.edges[a], &self.edges[b]);
        if ea.top == eb.top
            || ea.bottom == eb.bottom
            || ea.top == eb.bottom
            || ea.bottom == eb.top
        {
            return None;
        }
        let (at, ab) = (self.pt(ea.top), self.pt(ea.bottom));
        let (bt, bb) = (self.pt(eb.top), self.pt(eb.bottom));
        if at.x.min(ab.x) > bt.x.max(bb.x)
            || at.x.max(ab.x) < bt.x.min(bb.x)
            || at.y.min(ab.y) > bt.y.max(bb.y)
            || at.y.max(ab.y) < bt.y.min(bb.y)
        {
            return None;
        }

        let (la, lb) = (ea.line, eb.line);
        let denom = la.a * lb.b - la.b * lb.a;
        if denom == 0.0 {
            return None;
        }
        let dx = f64::from(bt.x) - f64::from(at.x);
        let dy = f64::from(bt.y) - f64::from(at.y);
        let s = dy * lb.b + dx * lb.a;
        let t = dy * la.b + dx * la.a;
        let outside = if denom > 0.0 {
            s < 0.0 || s > denom || t < 0.0 || t > denom
        } else {
            s > 0.0 || s < denom || t > 0.0 || t < denom
        };
        if outside {
            return None;
        }

        let scale = 1.0 / denom;
        let p = Point::new(
            (f64::from(at.x) - s * la.b * scale).round() as f32,
            (f64::from(at.y) + s * la.a * scale).round() as f32,
        );
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let near = |q: Point| (p.x - q.x).abs() < 1e-6 && (p.y - q.y).abs() < 1e-6;
        if near(at) || near(ab) || near(bt) || near(bb) {
            return None;
        }
        Some(p)
    }

    /// Find or insert the mesh vertex at `p`, searching back from `from`.
    fn vertex_at(&mut self, p: Point, from: Option<VertexId>) -> VertexId {
        let mut prev = from;
        while let Some(pv) = prev {
            if !less(p, self.pt(pv)) {
                break;
            }
            prev = self.vertices[pv].prev;
        }
        let mut next = match prev {
            Some(pv) => self.vertices[pv].next,
            None => self.mesh.0,
        };
        while let Some(nv) = next {
            if !less(self.pt(nv), p) {
                break;
            }
            prev = Some(nv);
            next = self.vertices[nv].next;
        }
        if let Some(pv) = prev.filter(|pv| self.pt(*pv) == p) {
            return pv;
        }
        if let Some(nv) = next.filter(|nv| self.pt(*nv) == p) {
            return nv;
        }
        let v = self.new_vertex(p);
        self.mesh_insert(v, prev, next);
        v
    }

    fn check_intersection(
        &mut self,
        left: Option<EdgeId>,
        right: Option<EdgeId>,
        current: &mut VertexId,
    ) -> bool {
        let (Some(left), Some(right)) = (left, right) else {
            return false;
        };
        let Some(p) = self.intersect(left, right) else {
            return self.intersect_pair(left, right, current);
        };

        let mut top = Some(*current);
        while let Some(t) = top {
            if !less(p, self.pt(t)) {
                break;
            }
            top = self.vertices[t].prev;
        }

        let (l, r) = (&self.edges[left], &self.edges[right]);
        let v = [l.top, l.bottom, r.top, r.bottom]
            .into_iter()
            .find(|v| self.pt(*v) == p)
            .unwrap_or_else(|| self.vertex_at(p, top));

        self.rewind(current, top.unwrap_or(v));
        self.split_edge(left, v, current);
        self.split_edge(right, v, current);
        true
    }

    fn split_edge(&mut self, e: EdgeId, v: VertexId, current: &mut VertexId) -> bool {
        let (top, bottom) = (self.edges[e].top, self.edges[e].bottom);
        if v == top || v == bottom {
            return false;
        }
        let mut winding = self.edges[e].winding;
        let (new_top, new_bottom) = if less(self.pt(v), self.pt(top)) {
            winding = -winding;
            self.set_top(e, v);
            (v, top)
        } else if less(self.pt(bottom), self.pt(v)) {
            winding = -winding;
            self.set_bottom(e, v);
            (bottom, v)
        } else {
            self.set_bottom(e, v);
            (v, bottom)
        };
        let split = self.new_edge(new_top, new_bottom, winding);
        self.insert_above(new_bottom, split);
        self.insert_below(new_top, split);
        // The sweep may have to revisit the vertex the new edge starts from.
        if less(self.pt(new_top), self.pt(*current)) {
            self.rewind(current, new_top);
        }
        true
    }

    /// Split edges that cross without a computable intersection, where one end point
    /// lies on the wrong side of the other edge.
    fn intersect_pair(&mut self, left: EdgeId, right: EdgeId, current: &mut VertexId) -> bool {
        let (l, r) = (&self.edges[left], &self.edges[right]);
        if l.top == r.top || l.bottom == r.bottom {
            return false;
        }
        let d1 = self.bottom_pt(left) - self.top_pt(left);
        let d2 = self.bottom_pt(right) - self.top_pt(right);
        if ((d2.x - d1.x) * (d1.y + d2.y)).abs() < 1e-4 {
            return false;
        }

        let mut split = None;
        if less(self.top_pt(left), self.top_pt(right)) {
            if !self.left_of(left, self.top_pt(right)) {
                split = Some((left, self.edges[right].top));
            }
        } else if !self.right_of(right, self.top_pt(left)) {
            split = Some((right, self.edges[left].top));
        }
        if less(self.bottom_pt(right), self.bottom_pt(left)) {
            if !self.left_of(left, self.bottom_pt(right)) {
                split = Some((left, self.edges[right].bottom));
            }
        } else if !self.right_of(right, self.bottom_pt(left)) {
            split = Some((right, self.edges[left].bottom));
        }

        let Some((edge, at)) = split else {
            return false;
        };
        let top = self.edges[edge].top;
        self.rewind(current, top);
        self.split_edge(edge, at, current)
    }

    /// First sweep: split every intersection so no two edges cross.
    fn simplify(&mut self) -> Result<(), TessellationError> {
        self.active = List::default();
        let budget = 64 * (self.edges.len() + self.vertices.len()) + 4096;
        let mut steps = 0;

        let mut cur = self.mesh.0;
        while let Some(mut v) = cur {
            if !self.connected(v) {
                cur = self.vertices[v].next;
                continue;
            }
            loop {
                steps += 1;
                if steps > budget {
                    return Err(TessellationError::NoProgress);
                }
                let (left, right) = self.find_enclosing(v);
                self.vertices[v].left = left;
                self.vertices[v].right = right;

                let below = self.walk(Link::Below, self.vertices[v].below);
                let intersected = if below.is_empty() {
                    self.check_intersection(left, right, &mut v)
                } else {
                    below.into_iter().any(|e| {
                        self.check_intersection(left, Some(e), &mut v)
                            || self.check_intersection(Some(e), right, &mut v)
                    })
                };
                if !intersected {
                    break;
                }
            }

            if !self.active_valid() {
                return Err(TessellationError::InvalidSweep);
            }
            for e in self.walk(Link::Above, self.vertices[v].above) {
                self.active_remove(e);
            }
            let mut left = self.vertices[v].left;
            for e in self.walk(Link::Below, self.vertices[v].below) {
                self.active_insert(e, left);
                left = Some(e);
            }
            cur = self.vertices[v].next;
        }
        Ok(())
    }

    fn make_poly(&mut self, first: VertexId, winding: i32) -> PolyId {
        self.polys.push(Polygon {
            first,
            winding,
            count: 0,
            partner: None,
            head: None,
            tail: None,
        });
        self.polys.len() - 1
    }

    fn make_mono(&mut self, e: EdgeId, side: Side) -> MonoId {
        self.monos.push(Monotone {
            side,
            first: None,
            last: None,
            next: None,
        });
        let m = self.monos.len() - 1;
        self.mono_add_edge(m, e);
        m
    }

    fn mono_add_edge(&mut self, m: MonoId, e: EdgeId) {
        let (link, list) = {
            let mono = &self.monos[m];
            let link = match mono.side {
                Side::Left => Link::LeftChain,
                Side::Right => Link::RightChain,
            };
            (link, List { head: mono.first, tail: mono.last })
        };
        let list = self.insert(link, e, list.tail, None, list);
        self.monos[m].first = list.head;
        self.monos[m].last = list.tail;
        match link {
            Link::LeftChain => self.edges[e].used_in_left = true,
            _ => self.edges[e].used_in_right = true,
        }
    }

    fn last_vertex(&self, poly: PolyId) -> VertexId {
        let p = &self.polys[poly];
        p.tail
            .and_then(|m| self.monos[m].last)
            .map_or(p.first, |e| self.edges[e].bottom)
    }

    /// Add `e` to `poly` on `side`, returning the polygon that continues below.
    fn poly_add_edge(&mut self, poly: PolyId, e: EdgeId, side: Side) -> PolyId {
        let used = match side {
            Side::Left => self.edges[e].used_in_left,
            Side::Right => self.edges[e].used_in_right,
        };
        if used {
            return poly;
        }
        let partner = self.polys[poly].partner;
        if let Some(p) = partner {
            self.polys[poly].partner = None;
            self.polys[p].partner = None;
        }

        let Some(tail) = self.polys[poly].tail else {
            let m = self.make_mono(e, side);
            let p = &mut self.polys[poly];
            p.head = Some(m);
            p.tail = Some(m);
            p.count += 2;
            return poly;
        };
        let Some(last) = self.monos[tail].last else {
            return poly;
        };
        let last_bottom = self.edges[last].bottom;
        if self.edges[e].bottom == last_bottom {
            return poly;
        }
        if side == self.monos[tail].side {
            self.mono_add_edge(tail, e);
            self.polys[poly].count += 1;
            return poly;
        }

        let bottom = self.edges[e].bottom;
        let join = self.new_edge(last_bottom, bottom, 1);
        self.mono_add_edge(tail, join);
        self.polys[poly].count += 1;
        if let Some(p) = partner {
            self.poly_add_edge(p, join, side);
            return p;
        }
        let m = self.make_mono(join, side);
        self.monos[tail].next = Some(m);
        self.polys[poly].tail = Some(m);
        poly
    }

    /// Second sweep: grow monotone polygons between active edges.
    fn tessellate(&mut self) {
        self.active = List::default();
        let mut cur = self.mesh.0;
        while let Some(v) = cur {
            cur = self.vertices[v].next;
            if !self.connected(v) {
                continue;
            }
            let (left_enclosing, right_enclosing) = self.find_enclosing(v);
            let above = self.vertices[v].above;
            let below = self.vertices[v].below;

            let (mut left_poly, mut right_poly) = match (above.head, above.tail) {
                (Some(head), Some(tail)) => {
                    (self.edges[head].left_poly, self.edges[tail].right_poly)
                }
                _ => (
                    left_enclosing.and_then(|e| self.edges[e].right_poly),
                    right_enclosing.and_then(|e| self.edges[e].left_poly),
                ),
            };

            if let (Some(head), Some(tail)) = (above.head, above.tail) {
                if let Some(p) = left_poly {
                    left_poly = Some(self.poly_add_edge(p, head, Side::Right));
                }
                if let Some(p) = right_poly {
                    right_poly = Some(self.poly_add_edge(p, tail, Side::Left));
                }
                let edges = self.walk(Link::Above, above);
                for pair in edges.windows(2) {
                    let (e, right_edge) = (pair[0], pair[1]);
                    self.active_remove(e);
                    let e_right = self.edges[e].right_poly;
                    if let Some(p) = e_right {
                        self.poly_add_edge(p, e, Side::Left);
                    }
                    let next_left = self.edges[right_edge].left_poly;
                    if let Some(p) = next_left.filter(|p| Some(*p) != e_right) {
                        self.poly_add_edge(p, e, Side::Right);
                    }
                }
                self.active_remove(tail);

                if below.head.is_none() {
                    if let (Some(l), Some(r)) = (left_poly, right_poly) {
                        if l != r {
                            self.polys[l].partner = Some(r);
                            self.polys[r].partner = Some(l);
                        }
                    }
                }
            }

            let Some(first_below) = below.head else {
                continue;
            };
            if above.head.is_none() {
                if let (Some(mut l), Some(mut r)) = (left_poly, right_poly) {
                    if l == r {
                        let tail_side = self.polys[l].tail.map(|m| self.monos[m].side);
                        if tail_side == Some(Side::Left) {
                            let winding = self.polys[l].winding;
                            l = self.make_poly(self.last_vertex(l), winding);
                            if let Some(e) = left_enclosing {
                                self.edges[e].right_poly = Some(l);
                            }
                        } else {
                            let winding = self.polys[r].winding;
                            r = self.make_poly(self.last_vertex(r), winding);
                            if let Some(e) = right_enclosing {
                                self.edges[e].left_poly = Some(r);
                            }
                        }
                    }
                    let join = self.new_edge(self.last_vertex(l), v, 1);
                    left_poly = Some(self.poly_add_edge(l, join, Side::Right));
                    right_poly = Some(self.poly_add_edge(r, join, Side::Left));
                }
            }

            let mut left_edge = first_below;
            self.edges[left_edge].left_poly = left_poly;
            self.active_insert(left_edge, left_enclosing);
            let mut next = self.next(Link::Below, left_edge);
            while let Some(right_edge) = next {
                self.active_insert(right_edge, Some(left_edge));
                let winding = self.edges[left_edge]
                    .left_poly
                    .map_or(0, |p| self.polys[p].winding)
                    + self.edges[left_edge].winding;
                if winding != 0 {
                    let poly = self.make_poly(v, winding);
                    self.edges[left_edge].right_poly = Some(poly);
                    self.edges[right_edge].left_poly = Some(poly);
                }
                left_edge = right_edge;
                next = self.next(Link::Below, right_edge);
            }
            if let Some(last) = self.vertices[v].below.tail {
                self.edges[last].right_poly = right_poly;
            }
        }
    }

    fn emit(mut self, rule: FillRule) -> Mesh {
        for poly in 0..self.polys.len() {
            let p = &self.polys[poly];
            let keep = match rule {
                FillRule::NonZero => p.winding != 0,
                FillRule::EvenOdd => p.winding & 1 != 0,
            };
            if !keep || p.count < 3 {
                continue;
            }
            let mut m = p.head;
            while let Some(mono) = m {
                self.emit_monotone(mono);
                m = self.monos[mono].next;
            }
        }
        std::mem::take(&mut self.mesh_out)
    }

    /// Ear-clip one monotone chain.
    fn emit_monotone(&mut self, m: MonoId) {
        let (side, first) = (self.monos[m].side, self.monos[m].first);
        let Some(first) = first else {
            return;
        };
        let link = match side {
            Side::Left => Link::LeftChain,
            Side::Right => Link::RightChain,
        };
        let mut chain = VecDeque::new();
        chain.push_back(self.edges[first].top);
        let mut e = Some(first);
        while let Some(edge) = e {
            match side {
                Side::Right => chain.push_back(self.edges[edge].bottom),
                Side::Left => chain.push_front(self.edges[edge].bottom),
            }
            e = self.next(link, edge);
        }
        if chain.len() < 3 {
            return;
        }

        let mut i = 1;
        while i + 1 < chain.len() {
            let (prev, curr, next) = (chain[i - 1], chain[i], chain[i + 1]);
            if chain.len() == 3 {
                self.emit_triangle(prev, curr, next);
                return;
            }
            let (p, c, n) = (self.pt(prev), self.pt(curr), self.pt(next));
            let ax = f64::from(c.x) - f64::from(p.x);
            let ay = f64::from(c.y) - f64::from(p.y);
            let bx = f64::from(n.x) - f64::from(c.x);
            let by = f64::from(n.y) - f64::from(c.y);
            if ax * by - ay * bx >= 0.0 {
                self.emit_triangle(prev, curr, next);
                chain.remove(i);
                if i > 1 {
                    i -= 1;
                }
            } else {
                i += 1;
            }
        }
    }

    fn emit_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId) {
        for v in [a, b, c] {
            let index = match self.vertices[v].index {
                Some(index) => index,
                None => {
                    let pt = self.vertices[v].pt;
                    let index = self.mesh_out.vertices.len() as u32;
                    self.mesh_out
                        .vertices
                        .push(Point::new(pt.x / UPSCALE, pt.y / UPSCALE));
                    self.vertices[v].index = Some(index);
                    index
                }
            };
            self.mesh_out.indices.push(index);
        }
    }
}
