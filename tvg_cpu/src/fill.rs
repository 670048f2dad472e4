// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gradient color tables and per-pixel gradient evaluation.

use tvg_common::math::{zero, Matrix, Point};
use tvg_common::shape::{ColorStop, Fill, FillSpread, GradientKind, RenderColor};

use crate::pixel::{multiply, premultiplied};

/// Entries in a gradient color table.
pub(crate) const CTABLE_SIZE: usize = 1024;

/// Device-space linear gradient: `t = dx * x + dy * y + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Linear {
    dx: f32,
    dy: f32,
    offset: f32,
}

/// Two-point conical gradient, evaluated in gradient space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Radial {
    /// Device to gradient space.
    inv: Matrix,
    focal: Point,
    fr: f32,
    /// Center minus focal point.
    cd: Point,
    /// Radius minus focal radius.
    dr: f32,
    /// `cd · cd - dr²`.
    a: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
    Linear(Linear),
    Radial(Radial),
}

/// A gradient prepared for one transform and color space.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SwFill {
    kind: Kind,
    spread: FillSpread,
    ctable: Box<[u32; CTABLE_SIZE]>,
    /// Whether any entry is not opaque.
    pub(crate) translucent: bool,
    /// Whether every entry is the same.
    pub(crate) solid: bool,
}

impl SwFill {
    /// Prepare `fill` drawn under `transform`. Returns `None` for degenerate geometry or
    /// a gradient without stops.
    pub(crate) fn new(fill: &Fill, transform: &Matrix, opacity: u8, abgr: bool) -> Option<Self> {
        if fill.stops.is_empty() {
            return None;
        }
        let inv = (*transform * fill.transform).inverse()?;

        let kind = match &fill.kind {
            GradientKind::Linear(linear) => {
                let d = linear.p2 - linear.p1;
                let len2 = d.dot(d);
                if zero(len2) {
                    return None;
                }
                Kind::Linear(Linear {
                    dx: (inv.e11 * d.x + inv.e21 * d.y) / len2,
                    dy: (inv.e12 * d.x + inv.e22 * d.y) / len2,
                    offset: ((inv.e13 - linear.p1.x) * d.x + (inv.e23 - linear.p1.y) * d.y) / len2,
                })
            }
            GradientKind::Radial(radial) => {
                if radial.radius < 0.0 || (zero(radial.radius) && zero(radial.focal_radius)) {
                    return None;
                }
                let cd = radial.center - radial.focal;
                let dr = radial.radius - radial.focal_radius;
                Kind::Radial(Radial {
                    inv,
                    focal: radial.focal,
                    fr: radial.focal_radius,
                    cd,
                    dr,
                    a: cd.dot(cd) - dr * dr,
                })
            }
        };

        let (ctable, translucent, solid) = build_ctable(&fill.stops, opacity, abgr);
        Some(Self {
            kind,
            spread: fill.spread,
            ctable,
            translucent,
            solid,
        })
    }

    /// The premultiplied color at the center of pixel `(x, y)`, transparent where the
    /// gradient is undefined.
    #[inline]
    pub(crate) fn fetch(&self, x: i32, y: i32) -> u32 {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let t = match &self.kind {
            Kind::Linear(l) => l.dx * px + l.dy * py + l.offset,
            Kind::Radial(r) => match r.t(Point::new(px, py).transform(&r.inv)) {
                Some(t) => t,
                None => return 0,
            },
        };
        self.ctable[self.index(t)]
    }

    /// The table entry for a gradient position.
    #[inline]
    fn index(&self, t: f32) -> usize {
        let t = match self.spread {
            FillSpread::Pad => t.clamp(0.0, 1.0),
            FillSpread::Repeat => t - t.floor(),
            FillSpread::Reflect => {
                let m = t.rem_euclid(2.0);
                if m > 1.0 {
                    2.0 - m
                } else {
                    m
                }
            }
        };
        ((t * (CTABLE_SIZE - 1) as f32 + 0.5) as usize).min(CTABLE_SIZE - 1)
    }

    /// The first table entry.
    pub(crate) fn first(&self) -> u32 {
        self.ctable[0]
    }
}

impl Radial {
    /// The largest `t` for which `p` lies on the interpolated circle with a
    /// non-negative radius.
    fn t(&self, p: Point) -> Option<f32> {
        let pd = p - self.focal;
        let b = pd.dot(self.cd) + self.fr * self.dr;
        let c = pd.dot(pd) - self.fr * self.fr;

        if zero(self.a) {
            if zero(b) {
                return None;
            }
            let t = c / (2.0 * b);
            return (self.fr + t * self.dr >= 0.0).then_some(t);
        }

        let disc = b * b - self.a * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let (t1, t2) = ((b + sq) / self.a, (b - sq) / self.a);
        let (hi, lo) = if t1 > t2 { (t1, t2) } else { (t2, t1) };
        if self.fr + hi * self.dr >= 0.0 {
            Some(hi)
        } else if self.fr + lo * self.dr >= 0.0 {
            Some(lo)
        } else {
            None
        }
    }
}

/// Interpolate the stops into a premultiplied table.
fn build_ctable(
    stops: &[ColorStop],
    opacity: u8,
    abgr: bool,
) -> (Box<[u32; CTABLE_SIZE]>, bool, bool) {
    let mut sorted = stops.to_vec();
    sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    let mut table = Box::new([0_u32; CTABLE_SIZE]);
    let mut translucent = opacity < 255;
    let mut next = 0;

    for (i, entry) in table.iter_mut().enumerate() {
        let pos = i as f32 / (CTABLE_SIZE - 1) as f32;
        while next < sorted.len() && sorted[next].offset <= pos {
            next += 1;
        }
        let color = if next == 0 {
            sorted[0].color
        } else if next == sorted.len() {
            sorted[next - 1].color
        } else {
            let (lo, hi) = (&sorted[next - 1], &sorted[next]);
            let span = hi.offset - lo.offset;
            let frac = if span > 0.0 {
                (pos - lo.offset) / span
            } else {
                0.0
            };
            lerp(lo.color, hi.color, frac)
        };
        let color = RenderColor {
            a: multiply(color.a, opacity),
            ..color
        };
        translucent |= color.a < 255;
        *entry = premultiplied(color, abgr);
    }

    let solid = table.iter().all(|c| *c == table[0]);
    (table, translucent, solid)
}

fn lerp(a: RenderColor, b: RenderColor, t: f32) -> RenderColor {
    let dist = (256.0 * t) as u32;
    let mix = |a: u8, b: u8| ((u32::from(a) * (256 - dist) + u32::from(b) * dist) >> 8) as u8;
    RenderColor::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: RenderColor = RenderColor::new(255, 0, 0, 255);
    const BLUE: RenderColor = RenderColor::new(0, 0, 255, 255);

    fn stops() -> Vec<ColorStop> {
        vec![ColorStop::new(0.0, RED), ColorStop::new(1.0, BLUE)]
    }

    #[test]
    fn table_ends_match_stops() {
        let (table, translucent, solid) = build_ctable(&stops(), 255, true);
        assert_eq!(table[0], premultiplied(RED, true));
        assert_eq!(table[CTABLE_SIZE - 1], premultiplied(BLUE, true));
        assert!(!translucent);
        assert!(!solid);
    }

    #[test]
    fn opacity_scales_table() {
        let (table, translucent, _) = build_ctable(&stops(), 128, true);
        assert!(translucent);
        assert_eq!(table[0] >> 24, 128);
    }

    #[test]
    fn single_stop_is_solid() {
        let (_, _, solid) = build_ctable(&[ColorStop::new(0.3, RED)], 255, true);
        assert!(solid);
    }

    #[test]
    fn linear_runs_along_axis() {
        let fill = Fill::linear(Point::new(0.0, 0.0), Point::new(100.0, 0.0), stops());
        let sw = SwFill::new(&fill, &Matrix::IDENTITY, 255, true).unwrap();
        assert_eq!(sw.fetch(-10, 0), premultiplied(RED, true));
        assert_eq!(sw.fetch(200, 0), premultiplied(BLUE, true));
        let mid = sw.fetch(49, 7);
        assert!((i32::from(mid as u8) - 128).abs() <= 2);
    }

    #[test]
    fn spreads_fold_positions() {
        let base = Fill::linear(Point::new(0.0, 0.0), Point::new(1.0, 0.0), stops());
        let reflect = base.clone().with_spread(FillSpread::Reflect);
        let reflect = SwFill::new(&reflect, &Matrix::IDENTITY, 255, true).unwrap();
        assert_eq!(reflect.index(1.25), reflect.index(0.75));
        let repeat = base.with_spread(FillSpread::Repeat);
        let repeat = SwFill::new(&repeat, &Matrix::IDENTITY, 255, true).unwrap();
        assert_eq!(repeat.index(1.25), repeat.index(0.25));
        assert_eq!(repeat.index(-0.75), repeat.index(0.25));
    }

    #[test]
    fn radial_grows_from_center() {
        let fill = Fill::radial(Point::new(50.0, 50.0), 50.0, stops());
        let sw = SwFill::new(&fill, &Matrix::IDENTITY, 255, true).unwrap();
        let Kind::Radial(r) = sw.kind else {
            panic!("expected a radial gradient");
        };
        let t = r.t(Point::new(75.0, 50.0)).unwrap();
        assert!((t - 0.5).abs() < 1e-4);
        assert_eq!(sw.fetch(200, 200), premultiplied(BLUE, true));
    }

    #[test]
    fn degenerate_linear_is_rejected() {
        let fill = Fill::linear(Point::new(5.0, 5.0), Point::new(5.0, 5.0), stops());
        assert!(SwFill::new(&fill, &Matrix::IDENTITY, 255, true).is_none());
    }
}
