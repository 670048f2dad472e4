// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trim paths: keep only an arc-length sub-range of a path.

use crate::math::{zero, Point};
use crate::path::{RenderPath, Segment};
use crate::shape::Trim;

/// Normalize a trim range into `[0, 1]`.
///
/// Returns `None` when the range covers the whole path. The returned `start` may be
/// greater than `end`, in which case the range wraps around the end of the path.
pub fn normalize(trim: &Trim) -> Option<(f32, f32)> {
    let (mut start, mut end) = (trim.begin, trim.end);

    if (end - start).abs() >= 1.0 {
        return None;
    }

    let in_unit = |v: f32| (0.0..=1.0).contains(&v);
    let looped = !((start > 1.0 && end > 1.0)
        || (start < 0.0 && end < 0.0)
        || (in_unit(start) && in_unit(end)));

    if start > 1.0 {
        start -= 1.0;
    }
    if start < 0.0 {
        start += 1.0;
    }
    if end > 1.0 {
        end -= 1.0;
    }
    if end < 0.0 {
        end += 1.0;
    }

    if (looped && start < end) || (!looped && start > end) {
        core::mem::swap(&mut start, &mut end);
    }

    Some((start, end))
}

/// Output builder tracking the pen so continuous pieces share one contour.
struct Emitter<'a> {
    out: &'a mut RenderPath,
    pen: Option<Point>,
}

impl Emitter<'_> {
    fn emit(&mut self, seg: Segment, continuous: bool) {
        let start = seg.start();
        if !continuous || self.pen != Some(start) {
            self.out.move_to(start);
        }
        seg.append_to(self.out);
        self.pen = Some(seg.end());
    }

    fn break_contour(&mut self) {
        self.pen = None;
    }
}

fn trim_segments(segs: &[Segment], trim_start: f32, trim_end: f32, emitter: &mut Emitter<'_>) {
    let mut len = 0.0;
    for seg in segs {
        let d_len = seg.length();

        if len + d_len < trim_start || len > trim_end {
            // Entirely outside.
        } else if len < trim_start {
            let to = if len + d_len > trim_end {
                trim_end - len
            } else {
                d_len
            };
            emitter.emit(seg.sub(trim_start - len, to), false);
        } else if len + d_len > trim_end {
            if trim_end > len {
                emitter.emit(seg.sub(0.0, trim_end - len), true);
            }
        } else {
            emitter.emit(*seg, true);
        }
        len += d_len;
    }
    emitter.break_contour();
}

fn trim_contours(contours: &[Vec<Segment>], start: f32, end: f32, emitter: &mut Emitter<'_>) {
    let segs: Vec<Segment> = contours.iter().flatten().copied().collect();
    let total: f32 = segs.iter().map(Segment::length).sum();
    let trim_start = start * total;
    let trim_end = end * total;

    if trim_start > trim_end {
        trim_segments(&segs, trim_start, total, emitter);
        trim_segments(&segs, 0.0, trim_end, emitter);
    } else {
        trim_segments(&segs, trim_start, trim_end, emitter);
    }
}

/// Split a path into contours of drawable segments. A close becomes a line back to the start.
fn contours(path: &RenderPath) -> Vec<Vec<Segment>> {
    let mut out: Vec<Vec<Segment>> = Vec::new();
    let mut cur = Vec::new();
    for seg in path.segments() {
        match seg {
            Segment::Move(_) => {
                if !cur.is_empty() {
                    out.push(core::mem::take(&mut cur));
                }
            }
            seg => cur.push(seg),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Trim `path` to the range described by `trim`.
///
/// Returns `None` when the trim keeps the whole path. The result is never closed;
/// a closing segment is emitted as a line.
pub fn trim_path(path: &RenderPath, trim: &Trim) -> Option<RenderPath> {
    let (start, end) = normalize(trim)?;
    let mut out = RenderPath::new();

    if path.is_empty() || zero(start - end) {
        return Some(out);
    }

    let contours = contours(path);
    let mut emitter = Emitter {
        out: &mut out,
        pen: None,
    };

    if trim.simultaneous {
        for contour in &contours {
            trim_contours(core::slice::from_ref(contour), start, end, &mut emitter);
        }
    } else {
        trim_contours(&contours, start, end, &mut emitter);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCommand;

    fn line(len: f32) -> RenderPath {
        let mut path = RenderPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(len, 0.0));
        path
    }

    #[test]
    fn full_range_is_untouched() {
        assert!(normalize(&Trim::default()).is_none());
        let trim = Trim {
            begin: -0.5,
            end: 0.5,
            simultaneous: true,
        };
        assert!(normalize(&trim).is_none());
    }

    #[test]
    fn out_of_range_values_wrap() {
        let trim = Trim {
            begin: 0.8,
            end: 1.2,
            simultaneous: true,
        };
        let (s, e) = normalize(&trim).unwrap();
        assert!((s - 0.8).abs() < 1e-6);
        assert!((e - 0.2).abs() < 1e-6);
    }

    #[test]
    fn trims_middle_of_line() {
        let trim = Trim {
            begin: 0.25,
            end: 0.75,
            simultaneous: true,
        };
        let out = trim_path(&line(100.0), &trim).unwrap();
        assert_eq!(out.cmds, vec![PathCommand::MoveTo, PathCommand::LineTo]);
        assert!((out.pts[0].x - 25.0).abs() < 1e-3);
        assert!((out.pts[1].x - 75.0).abs() < 1e-3);
    }

    #[test]
    fn wrapped_range_produces_two_pieces() {
        let trim = Trim {
            begin: 0.9,
            end: 1.1,
            simultaneous: true,
        };
        let out = trim_path(&line(100.0), &trim).unwrap();
        let moves = out
            .cmds
            .iter()
            .filter(|c| **c == PathCommand::MoveTo)
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let trim = Trim {
            begin: 0.9,
            end: 0.1,
            simultaneous: true,
        };
        let (s, e) = normalize(&trim).unwrap();
        assert!(s < e);
    }

    #[test]
    fn empty_range_is_empty() {
        let trim = Trim {
            begin: 0.3,
            end: 0.3,
            simultaneous: false,
        };
        assert!(trim_path(&line(10.0), &trim).unwrap().is_empty());
    }

    #[test]
    fn closed_rect_trims_through_corners() {
        let mut path = RenderPath::new();
        path.add_rect(0.0, 0.0, 10.0, 10.0);
        let trim = Trim {
            begin: 0.0,
            end: 0.5,
            simultaneous: true,
        };
        let out = trim_path(&path, &trim).unwrap();
        assert!((out.length() - 20.0).abs() < 1e-3);
        assert_eq!(out.cmds[0], PathCommand::MoveTo);
        assert_eq!(
            out.cmds.iter().filter(|c| **c == PathCommand::MoveTo).count(),
            1
        );
    }
}
