// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rewriting a path into its dashes.

use smallvec::SmallVec;

use crate::math::{zero, Point};
use crate::path::{RenderPath, Segment};
use crate::shape::{RenderStroke, StrokeCap};

/// Segment lengths shorter than this do not advance the pattern.
const DASH_EPSILON: f32 = 0.0001;

/// Where a contour starts within the dash pattern.
#[derive(Clone, Copy, Debug)]
struct DashStart {
    idx: usize,
    offset: f32,
}

struct Dasher<'a> {
    pattern: &'a [f32],
    start: DashStart,
    dot_caps: bool,
    out: RenderPath,
    idx: usize,
    cur_len: f32,
    gap: bool,
    move_pending: bool,
    pen: Option<Point>,
}

impl Dasher<'_> {
    fn move_to(&mut self) {
        self.idx = self.start.idx % self.pattern.len();
        self.cur_len = self.pattern[self.idx] - self.start.offset;
        self.gap = self.start.idx % 2 == 1;
        self.move_pending = true;
        self.pen = None;
    }

    fn advance(&mut self) {
        self.idx = (self.idx + 1) % self.pattern.len();
        self.cur_len = self.pattern[self.idx];
        self.gap = !self.gap;
        self.move_pending = true;
    }

    fn emit(&mut self, seg: Segment) {
        let start = seg.start();
        if self.move_pending || self.pen != Some(start) {
            self.out.move_to(start);
            self.move_pending = false;
        }
        seg.append_to(&mut self.out);
        self.pen = Some(seg.end());
    }

    /// A zero-length dash still shows its caps.
    fn dot(&mut self, pt: Point) {
        if self.dot_caps {
            self.out.move_to(pt);
            self.out.line_to(pt);
            self.pen = Some(pt);
            self.move_pending = false;
        }
    }

    fn segment(&mut self, seg: Segment) {
        let mut cur = seg;
        let mut len = cur.length();

        if zero(len) {
            return;
        }

        if len <= self.cur_len {
            self.cur_len -= len;
            if !self.gap {
                self.emit(cur);
            }
        } else {
            while len - self.cur_len > DASH_EPSILON {
                if self.cur_len > 0.0 {
                    let (left, right) = cur.split_at_length(self.cur_len);
                    len -= self.cur_len;
                    if !self.gap {
                        self.emit(left);
                    }
                    cur = right;
                } else if !self.gap {
                    self.dot(cur.start());
                }
                self.advance();
            }
            self.cur_len -= len;
            if !self.gap {
                self.emit(cur);
            }
        }

        if self.cur_len < DASH_EPSILON {
            self.advance();
        }
    }
}

/// Compute where each contour begins in the pattern for a dash offset.
///
/// The offset wraps around the cycle, which is doubled for an odd number of entries
/// so dashes and gaps alternate consistently.
fn dash_start(pattern: &[f32], offset: f32) -> DashStart {
    let mut start = DashStart { idx: 0, offset: 0.0 };
    if zero(offset) {
        return start;
    }

    let odd = pattern.len() % 2 == 1;
    let mut length: f32 = pattern.iter().sum();
    if odd {
        length *= 2.0;
    }

    let mut offset = offset % length;
    if offset < 0.0 {
        offset += length;
    }

    let count = pattern.len() * if odd { 2 } else { 1 };
    for i in 0..count {
        let cur = pattern[i % pattern.len()];
        if offset < cur {
            break;
        }
        offset -= cur;
        start.idx += 1;
    }
    start.offset = offset;
    start
}

/// Split `path` into the dashes described by `stroke`.
///
/// Returns `None` when the stroke has no usable pattern or the path is empty.
pub fn dash_path(path: &RenderPath, stroke: &RenderStroke) -> Option<RenderPath> {
    if !stroke.dashed() || path.is_empty() {
        return None;
    }

    let pattern: SmallVec<[f32; 8]> = stroke.dash.iter().map(|d| d.max(0.0)).collect();
    let mut dasher = Dasher {
        pattern: &pattern,
        start: dash_start(&pattern, stroke.dash_offset),
        dot_caps: stroke.cap != StrokeCap::Butt,
        out: RenderPath::new(),
        idx: 0,
        cur_len: 0.0,
        gap: false,
        move_pending: true,
        pen: None,
    };
    dasher.move_to();

    for seg in path.segments() {
        match seg {
            Segment::Move(_) => dasher.move_to(),
            seg => dasher.segment(seg),
        }
    }

    Some(dasher.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCommand;

    fn dashed(dash: &[f32], offset: f32) -> RenderStroke {
        RenderStroke {
            width: 1.0,
            dash: dash.to_vec(),
            dash_offset: offset,
            cap: StrokeCap::Butt,
            ..RenderStroke::default()
        }
    }

    fn line(len: f32) -> RenderPath {
        let mut path = RenderPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(len, 0.0));
        path
    }

    fn dashes(path: &RenderPath) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        let mut from = 0.0;
        for seg in path.segments() {
            match seg {
                Segment::Move(p) => from = p.x,
                Segment::Line(_, b) => out.push((from, b.x)),
                Segment::Cubic(_) => {}
            }
        }
        out
    }

    #[test]
    fn splits_line_into_dashes() {
        let out = dash_path(&line(50.0), &dashed(&[10.0, 5.0], 0.0)).unwrap();
        let d = dashes(&out);
        assert_eq!(d.len(), 4);
        assert!((d[0].0 - 0.0).abs() < 1e-3 && (d[0].1 - 10.0).abs() < 1e-3);
        assert!((d[1].0 - 15.0).abs() < 1e-3 && (d[1].1 - 25.0).abs() < 1e-3);
        assert!((d[3].0 - 45.0).abs() < 1e-3 && (d[3].1 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn offset_shifts_pattern() {
        let out = dash_path(&line(20.0), &dashed(&[10.0, 10.0], 5.0)).unwrap();
        let d = dashes(&out);
        assert!((d[0].1 - 5.0).abs() < 1e-3);
        assert!((d[1].0 - 15.0).abs() < 1e-3);
    }

    #[test]
    fn offset_larger_than_cycle_wraps() {
        let a = dash_start(&[10.0, 10.0], 25.0);
        let b = dash_start(&[10.0, 10.0], 5.0);
        assert_eq!(a.idx, b.idx);
        assert!((a.offset - b.offset).abs() < 1e-4);

        let neg = dash_start(&[10.0, 10.0], -5.0);
        assert_eq!(neg.idx, 1);
        assert!((neg.offset - 5.0).abs() < 1e-4);
    }

    #[test]
    fn zero_dash_with_round_cap_emits_dots() {
        let mut stroke = dashed(&[0.0, 10.0], 0.0);
        stroke.cap = StrokeCap::Round;
        let out = dash_path(&line(30.0), &stroke).unwrap();
        assert!(out.cmds.iter().any(|c| *c == PathCommand::LineTo));
        for (a, b) in dashes(&out) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_pattern_is_not_dashed() {
        assert!(dash_path(&line(30.0), &dashed(&[0.0, 0.0], 0.0)).is_none());
    }
}
