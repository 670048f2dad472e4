// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Anti-aliased scanline coverage.
//!
//! An [`Outline`] is decomposed into cells that accumulate the signed area and cover
//! of the edges crossing each pixel. Sweeping the cells of every row turns them into
//! horizontal [`Span`]s of constant coverage.
//!
//! The cells live in a fixed-budget [`CellPool`]. When a shape needs more cells than
//! the budget allows, the covered rows are processed in bands, and a band that
//! overflows is halved until it fits.

use smallvec::SmallVec;

use crate::fixed::{split_cubic, split_line, FixedPoint};
use crate::outline::{CurveType, Outline};
use crate::region::RenderRegion;
use crate::shape::FillRule;

/// Sub-pixel precision of the cell grid.
const PIXEL_BITS: i32 = 8;
const ONE_PIXEL: i32 = 1 << PIXEL_BITS;

/// Span coordinates are stored in 16 bits.
const COORD_LIMIT: i32 = i16::MAX as i32;

/// Byte sizes used to apportion the pool between row heads and cells.
const CELL_SIZE: usize = 24;
const HEAD_SIZE: usize = 8;

/// Default pool budget, in cells.
pub const DEFAULT_POOL_CELLS: usize = 16368 / CELL_SIZE;

const MAX_BANDS: usize = 40;

const NONE: u32 = u32::MAX;

/// A horizontal run of pixels with the same coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Leftmost pixel.
    pub x: u16,
    /// Row.
    pub y: u16,
    /// Number of pixels.
    pub len: u16,
    /// Coverage, 255 is fully covered.
    pub coverage: u8,
}

impl Span {
    /// Create a new span.
    pub const fn new(x: u16, y: u16, len: u16, coverage: u8) -> Self {
        Self {
            x,
            y,
            len,
            coverage,
        }
    }

    /// One past the rightmost pixel.
    #[inline]
    pub fn end(&self) -> i32 {
        i32::from(self.x) + i32::from(self.len)
    }

    /// The horizontal extent of the span within `bbox` as `(x, len)`.
    #[inline]
    pub fn fetch(&self, bbox: &RenderRegion) -> Option<(i32, i32)> {
        let x = i32::from(self.x).max(bbox.min.0);
        let len = self.end().min(bbox.max.0) - x;
        (len > 0).then_some((x, len))
    }
}

/// Scanline coverage, sorted by row then by x.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rle {
    /// The spans.
    pub spans: Vec<Span>,
}

/// Scan conversion failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RleError {
    /// A single scanline needs more cells than the pool holds.
    #[error("outline is too complex for a single scanline")]
    TooComplex,
}

impl Rle {
    /// An empty coverage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Remove every span, keeping the allocation.
    pub fn reset(&mut self) {
        self.spans.clear();
    }

    /// Full coverage of an axis-aligned rectangle.
    pub fn from_rect(bbox: &RenderRegion) -> Self {
        if bbox.invalid() {
            return Self::default();
        }
        let x = bbox.min.0 as u16;
        let len = bbox.w() as u16;
        let spans = (bbox.min.1..bbox.max.1)
            .map(|y| Span::new(x, y as u16, len, 255))
            .collect();
        Self { spans }
    }

    /// The spans on rows `min..=max`.
    pub fn fetch(&self, min: i32, max: i32) -> &[Span] {
        let begin = self.spans.partition_point(|s| i32::from(s.y) < min);
        let end = self.spans.partition_point(|s| i32::from(s.y) <= max);
        &self.spans[begin..end.max(begin)]
    }

    /// The spans on the rows of `region`.
    pub fn fetch_region(&self, region: &RenderRegion) -> &[Span] {
        self.fetch(region.min.1, region.max.1 - 1)
    }

    /// Intersect with another coverage, multiplying the coverage of overlapping spans.
    ///
    /// Returns `false` if either side was empty.
    pub fn clip_rle(&mut self, clip: &Rle) -> bool {
        let (Some(first), Some(last)) = (clip.spans.first(), clip.spans.last()) else {
            return false;
        };
        if self.spans.is_empty() {
            return false;
        }

        let spans = self.fetch(i32::from(first.y), i32::from(last.y));
        let (Some(s_first), Some(s_last)) = (spans.first(), spans.last()) else {
            self.spans.clear();
            return false;
        };
        let cspans = clip.fetch(i32::from(s_first.y), i32::from(s_last.y));

        let mut out = Vec::with_capacity(spans.len().max(cspans.len()));
        let (mut i, mut j) = (0, 0);
        while i < spans.len() && j < cspans.len() {
            let span = spans[i];
            let row = cspans[j].y;
            if row > span.y {
                i += 1;
                continue;
            }
            if span.y > row {
                j += 1;
                continue;
            }
            for c in cspans[j..].iter().take_while(|c| c.y == row) {
                let x = span.x.max(c.x);
                let len = span.end().min(c.end()) - i32::from(x);
                if len > 0 {
                    let coverage = (u32::from(span.coverage) * u32::from(c.coverage) + 0xff) >> 8;
                    out.push(Span::new(x, row, len as u16, coverage as u8));
                }
            }
            i += 1;
        }
        self.spans = out;
        true
    }

    /// Cut the coverage down to `clip`.
    ///
    /// Returns `false` if the coverage was empty or `clip` is invalid.
    pub fn clip_rect(&mut self, clip: &RenderRegion) -> bool {
        if self.spans.is_empty() || clip.invalid() {
            return false;
        }
        let (min, max) = (clip.min, clip.max);
        let out = self
            .fetch_region(clip)
            .iter()
            .filter(|s| i32::from(s.y) >= min.1)
            .filter_map(|s| {
                let (x, len) = s.fetch(clip)?;
                Some(Span::new(x as u16, s.y, len.min(max.0 - x) as u16, s.coverage))
            })
            .collect();
        self.spans = out;
        true
    }

    /// Whether any span touches `region`.
    pub fn intersects(&self, region: &RenderRegion) -> bool {
        self.fetch_region(region)
            .iter()
            .any(|s| i32::from(s.y) >= region.min.1 && s.fetch(region).is_some())
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    x: i32,
    cover: i32,
    area: i64,
    next: u32,
}

/// Reusable cell storage for [`render`].
#[derive(Clone, Debug)]
pub struct CellPool {
    cells: Vec<Cell>,
    rows: Vec<u32>,
    budget: usize,
}

impl Default for CellPool {
    fn default() -> Self {
        Self::with_budget(DEFAULT_POOL_CELLS)
    }
}

impl CellPool {
    /// A pool holding at most `budget` cells, row heads included.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            cells: Vec::new(),
            rows: Vec::new(),
            budget,
        }
    }

    /// The current budget, in cells.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Grow the budget for a shape of the given bounds.
    fn reserve(&mut self, bbox: &RenderRegion) {
        let req = (bbox.w().max(bbox.h()).max(0) as f32 * 0.75) as usize;
        if req > self.budget {
            self.budget = req + (req >> 2);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Band {
    min: i32,
    max: i32,
}

/// The cell pool ran out.
struct Overflow;

type CellResult = Result<(), Overflow>;

#[inline]
fn upscale(pt: FixedPoint) -> FixedPoint {
    FixedPoint::new(pt.x << (PIXEL_BITS - 6), pt.y << (PIXEL_BITS - 6))
}

#[inline]
fn trunc(pt: FixedPoint) -> FixedPoint {
    FixedPoint::new(pt.x >> PIXEL_BITS, pt.y >> PIXEL_BITS)
}

#[inline]
fn fract(pt: FixedPoint) -> FixedPoint {
    FixedPoint::new(pt.x & (ONE_PIXEL - 1), pt.y & (ONE_PIXEL - 1))
}

/// Approximate vector length, alpha max plus beta min with beta = 3/8.
#[inline]
fn hypot(pt: FixedPoint) -> i64 {
    let x = i64::from(pt.x).abs();
    let y = i64::from(pt.y).abs();
    if x > y {
        x + (3 * y >> 3)
    } else {
        y + (3 * x >> 3)
    }
}

/// [`hypot`] of the distance between two points, safe from overflow.
#[inline]
fn safe_hypot(a: FixedPoint, b: FixedPoint) -> i64 {
    let x = (i64::from(a.x) - i64::from(b.x)).abs();
    let y = (i64::from(a.y) - i64::from(b.y)).abs();
    if x > y {
        x + (3 * y >> 3)
    } else {
        y + (3 * x >> 3)
    }
}

#[inline]
fn udiv(a: i64, b: i64) -> i32 {
    ((a as u64).wrapping_mul(b as u64) >> 32) as i32
}

struct Worker<'a> {
    spans: &'a mut Vec<Span>,
    cells: &'a mut Vec<Cell>,
    rows: &'a mut Vec<u32>,
    max_cells: usize,

    cell_pos: FixedPoint,
    cell_min: FixedPoint,
    cell_max: FixedPoint,
    cell_x_cnt: i32,
    cell_y_cnt: i32,

    area: i64,
    cover: i32,
    pos: FixedPoint,

    rule: FillRule,
    anti_alias: bool,
    invalid: bool,
}

impl Worker<'_> {
    fn horiz_line(&mut self, x: i32, y: i32, area: i64, count: i32) {
        let mut x = x + self.cell_min.x;
        let y = y + self.cell_min.y;

        if y < self.cell_min.y || y >= self.cell_max.y {
            return;
        }

        // Area is scaled by `ONE_PIXEL * ONE_PIXEL * 2`.
        let mut coverage = (area >> (PIXEL_BITS * 2 + 1 - 8)).abs();
        if self.rule == FillRule::EvenOdd {
            coverage &= 511;
            if coverage > 255 {
                coverage = 511 - coverage;
            }
        } else {
            coverage = coverage.min(255);
        }

        if coverage == 0 {
            return;
        }

        if x >= COORD_LIMIT || y >= COORD_LIMIT {
            log::warn!("span coordinate overflow at ({x}, {y})");
            return;
        }

        if !self.anti_alias {
            coverage = 255;
        }
        let coverage = coverage as u8;

        let mut over = 0;
        if x + count >= self.cell_max.x {
            over -= x + count - self.cell_max.x;
        }

        if let Some(last) = self.spans.last_mut() {
            if last.coverage == coverage && i32::from(last.y) == y && last.end() == x {
                if x < self.cell_min.x {
                    over -= self.cell_min.x - x;
                }
                last.len = (i32::from(last.len) + count + over) as u16;
                return;
            }
        }

        if x < self.cell_min.x {
            over -= self.cell_min.x - x;
            x = self.cell_min.x;
        }

        if count + over <= 0 {
            return;
        }

        self.spans
            .push(Span::new(x as u16, y as u16, (count + over) as u16, coverage));
    }

    fn sweep(&mut self) {
        if self.cells.is_empty() {
            return;
        }

        for y in 0..self.rows.len() {
            let mut cover = 0;
            let mut x = 0;
            let mut idx = self.rows[y];
            let row = y as i32;

            while idx != NONE {
                let cell = self.cells[idx as usize];
                if cell.x > x && cover != 0 {
                    self.horiz_line(x, row, i64::from(cover * ONE_PIXEL * 2), cell.x - x);
                }
                cover += cell.cover;
                let area = i64::from(cover * ONE_PIXEL * 2) - cell.area;
                if area != 0 && cell.x >= 0 {
                    self.horiz_line(cell.x, row, area, 1);
                }
                x = cell.x + 1;
                idx = cell.next;
            }

            if cover != 0 {
                self.horiz_line(
                    x,
                    row,
                    i64::from(cover * ONE_PIXEL * 2),
                    self.cell_x_cnt - x,
                );
            }
        }
    }

    /// Find or insert the cell at the current position, keeping rows sorted by x.
    fn find_cell(&mut self) -> Result<usize, Overflow> {
        let x = self.cell_pos.x.min(self.cell_x_cnt);
        let row = self.cell_pos.y as usize;

        let mut prev = NONE;
        let mut idx = self.rows[row];
        while idx != NONE {
            let cell = &self.cells[idx as usize];
            if cell.x > x {
                break;
            }
            if cell.x == x {
                return Ok(idx as usize);
            }
            prev = idx;
            idx = cell.next;
        }

        if self.cells.len() >= self.max_cells {
            return Err(Overflow);
        }

        let new = self.cells.len() as u32;
        self.cells.push(Cell {
            x,
            cover: 0,
            area: 0,
            next: idx,
        });
        if prev == NONE {
            self.rows[row] = new;
        } else {
            self.cells[prev as usize].next = new;
        }
        Ok(new as usize)
    }

    fn record_cell(&mut self) -> CellResult {
        if self.area != 0 || self.cover != 0 {
            let idx = self.find_cell()?;
            let cell = &mut self.cells[idx];
            cell.area += self.area;
            cell.cover += self.cover;
        }
        Ok(())
    }

    /// Move to the cell containing `pos`, recording the current one.
    ///
    /// Cells left of the clip collapse onto column -1; cells outside the band or
    /// right of it are marked invalid and never recorded.
    fn set_cell(&mut self, pos: FixedPoint) -> CellResult {
        let mut pos = pos - self.cell_min;
        if pos.x < 0 {
            pos.x = -1;
        } else if pos.x > self.cell_max.x {
            pos.x = self.cell_max.x;
        }

        if pos != self.cell_pos {
            if !self.invalid {
                self.record_cell()?;
            }
            self.area = 0;
            self.cover = 0;
            self.cell_pos = pos;
        }
        self.invalid = pos.y as u32 >= self.cell_y_cnt as u32 || pos.x >= self.cell_x_cnt;
        Ok(())
    }

    fn start_cell(&mut self, mut pos: FixedPoint) -> CellResult {
        if pos.x > self.cell_max.x {
            pos.x = self.cell_max.x;
        }
        if pos.x < self.cell_min.x {
            pos.x = self.cell_min.x - 1;
        }

        self.area = 0;
        self.cover = 0;
        self.cell_pos = pos - self.cell_min;
        self.invalid = false;

        self.set_cell(pos)
    }

    fn move_to(&mut self, to: FixedPoint) -> CellResult {
        if !self.invalid {
            self.record_cell()?;
        }
        self.start_cell(trunc(to))?;
        self.pos = to;
        Ok(())
    }

    #[inline]
    fn accumulate(&mut self, f1: FixedPoint, f2: FixedPoint) {
        self.cover += f2.y - f1.y;
        self.area += i64::from(f2.y - f1.y) * i64::from(f1.x + f2.x);
    }

    fn line_to(&mut self, to: FixedPoint) -> CellResult {
        let e1 = trunc(self.pos);
        let e2 = trunc(to);

        // Entirely above or below the band.
        if (e1.y >= self.cell_max.y && e2.y >= self.cell_max.y)
            || (e1.y < self.cell_min.y && e2.y < self.cell_min.y)
        {
            self.pos = to;
            return Ok(());
        }

        // Reversed line stack: `stack[top]` is the end, `stack[top + 1]` the start.
        let mut stack = [FixedPoint::default(); 33];
        stack[0] = to;
        stack[1] = self.pos;
        let mut top = 0;

        loop {
            let (end, start) = (stack[top], stack[top + 1]);
            if safe_hypot(end, start) > i64::from(COORD_LIMIT) && top + 3 <= stack.len() {
                split_line(&mut stack[top..top + 3]);
                top += 1;
                continue;
            }

            let diff = end - start;
            let mut e1 = trunc(start);
            let e2 = trunc(end);
            let mut f1 = fract(start);

            if e1 == e2 {
                // Inside one cell.
            } else if diff.y == 0 {
                e1.x = e2.x;
                self.set_cell(e1)?;
            } else if diff.x == 0 {
                if diff.y > 0 {
                    loop {
                        let f2 = FixedPoint::new(f1.x, ONE_PIXEL);
                        self.cover += f2.y - f1.y;
                        self.area += i64::from(f2.y - f1.y) * i64::from(f1.x) * 2;
                        f1.y = 0;
                        e1.y += 1;
                        self.set_cell(e1)?;
                        if e1.y == e2.y {
                            break;
                        }
                    }
                } else {
                    loop {
                        let f2 = FixedPoint::new(f1.x, 0);
                        self.cover += f2.y - f1.y;
                        self.area += i64::from(f2.y - f1.y) * i64::from(f1.x) * 2;
                        f1.y = ONE_PIXEL;
                        e1.y -= 1;
                        self.set_cell(e1)?;
                        if e1.y == e2.y {
                            break;
                        }
                    }
                }
            } else {
                // `prod` tells which side of the current cell the line exits through.
                let dx = i64::from(diff.x);
                let dy = i64::from(diff.y);
                let mut prod = dx * i64::from(f1.y) - dy * i64::from(f1.x);
                let dxr = if e1.x != e2.x { 0xffff_ffff / dx } else { 0 };
                let dyr = if e1.y != e2.y { 0xffff_ffff / dy } else { 0 };
                let px = dx * i64::from(ONE_PIXEL);
                let py = dy * i64::from(ONE_PIXEL);

                loop {
                    if prod <= 0 && prod - px > 0 {
                        // Left.
                        let f2 = FixedPoint::new(0, udiv(-prod, -dxr));
                        prod -= py;
                        self.accumulate(f1, f2);
                        f1 = FixedPoint::new(ONE_PIXEL, f2.y);
                        e1.x -= 1;
                    } else if prod - px <= 0 && prod - px + py > 0 {
                        // Up.
                        prod -= px;
                        let f2 = FixedPoint::new(udiv(-prod, dyr), ONE_PIXEL);
                        self.accumulate(f1, f2);
                        f1 = FixedPoint::new(f2.x, 0);
                        e1.y += 1;
                    } else if prod - px + py <= 0 && prod + py >= 0 {
                        // Right.
                        prod += py;
                        let f2 = FixedPoint::new(ONE_PIXEL, udiv(prod, dxr));
                        self.accumulate(f1, f2);
                        f1 = FixedPoint::new(0, f2.y);
                        e1.x += 1;
                    } else {
                        // Down.
                        let f2 = FixedPoint::new(udiv(prod, -dyr), 0);
                        prod += px;
                        self.accumulate(f1, f2);
                        f1 = FixedPoint::new(f2.x, ONE_PIXEL);
                        e1.y -= 1;
                    }

                    self.set_cell(e1)?;
                    if e1 == e2 {
                        break;
                    }
                }
            }

            let f2 = fract(end);
            self.accumulate(f1, f2);
            self.pos = end;

            if top == 0 {
                return Ok(());
            }
            top -= 1;
        }
    }

    fn cubic_to(&mut self, ctrl1: FixedPoint, ctrl2: FixedPoint, to: FixedPoint) -> CellResult {
        let mut stack = [FixedPoint::default(); 32 * 3 + 1];
        stack[0] = to;
        stack[1] = ctrl2;
        stack[2] = ctrl1;
        stack[3] = self.pos;

        // Arcs outside the band are drawn as their chord.
        let (min, max) = stack[..4]
            .iter()
            .fold((to.y, to.y), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        if (min >> PIXEL_BITS) >= self.cell_max.y || (max >> PIXEL_BITS) < self.cell_min.y {
            return self.line_to(to);
        }

        let mut arc = 0;
        loop {
            if arc + 7 <= stack.len() && needs_split(&stack[arc..arc + 4]) {
                split_cubic(&mut stack[arc..arc + 7]);
                arc += 3;
                continue;
            }

            self.line_to(stack[arc])?;
            if arc == 0 {
                return Ok(());
            }
            arc -= 3;
        }
    }

    fn decompose(&mut self, outline: &Outline) -> CellResult {
        let pts = &outline.pts;
        let types = &outline.types;
        let mut first = 0_usize;

        for &last in &outline.cntrs {
            let last = last as usize;
            if first >= pts.len() || last >= pts.len() {
                break;
            }
            let start = upscale(pts[first]);
            self.move_to(start)?;

            let mut p = first;
            while p < last {
                if types[p + 1] == CurveType::Point {
                    p += 1;
                    self.line_to(upscale(pts[p]))?;
                } else {
                    p += 3;
                    if p <= last {
                        self.cubic_to(upscale(pts[p - 2]), upscale(pts[p - 1]), upscale(pts[p]))?;
                    } else if p - 1 == last {
                        self.cubic_to(upscale(pts[p - 2]), upscale(pts[p - 1]), start)?;
                    } else {
                        break;
                    }
                }
            }
            self.line_to(start)?;
            first = last + 1;
        }
        Ok(())
    }

    fn generate(&mut self, outline: &Outline) -> CellResult {
        self.decompose(outline)?;
        if !self.invalid {
            self.record_cell()?;
        }
        Ok(())
    }
}

/// Hain's rapid termination test for subdividing a reversed cubic.
fn needs_split(arc: &[FixedPoint]) -> bool {
    let diff = arc[3] - arc[0];
    let l = hypot(diff);
    if l > i64::from(COORD_LIMIT) {
        return true;
    }

    // Max deviation may be as much as `(s / L) * 3 / 4`.
    let s_limit = l * i64::from(ONE_PIXEL / 6);
    let (dx, dy) = (i64::from(diff.x), i64::from(diff.y));

    let d1 = arc[1] - arc[0];
    let (d1x, d1y) = (i64::from(d1.x), i64::from(d1.y));
    if (dy * d1x - dx * d1y).abs() > s_limit {
        return true;
    }

    let d2 = arc[2] - arc[0];
    let (d2x, d2y) = (i64::from(d2.x), i64::from(d2.y));
    if (dy * d2x - dx * d2y).abs() > s_limit {
        return true;
    }

    // Control points so far off the chord that the angles at them turn acute.
    d1x * (d1x - dx) + d1y * (d1y - dy) > 0 || d2x * (d2x - dx) + d2y * (d2y - dy) > 0
}

/// Scan convert `outline` within `bbox`.
///
/// The pool grows to suit the shape; rows are split into bands when the cells of the
/// whole shape would not fit.
pub fn render(
    outline: &Outline,
    bbox: &RenderRegion,
    anti_alias: bool,
    pool: &mut CellPool,
) -> Result<Rle, RleError> {
    let mut rle = Rle::new();
    if outline.is_empty() || bbox.invalid() {
        return Ok(rle);
    }

    pool.reserve(bbox);
    let budget = pool.budget;
    let band_size = (budget / 2).max(1) as i32;
    rle.spans.reserve(256);

    let mut worker = Worker {
        spans: &mut rle.spans,
        cells: &mut pool.cells,
        rows: &mut pool.rows,
        max_cells: 0,
        cell_pos: FixedPoint::default(),
        cell_min: FixedPoint::new(bbox.min.0, bbox.min.1),
        cell_max: FixedPoint::new(bbox.max.0, bbox.max.1),
        cell_x_cnt: bbox.w(),
        cell_y_cnt: bbox.h(),
        area: 0,
        cover: 0,
        pos: FixedPoint::default(),
        rule: outline.rule,
        anti_alias,
        invalid: true,
    };

    let y_max = bbox.max.1;
    let band_cnt = (bbox.h() / band_size).clamp(1, MAX_BANDS as i32 - 1);
    let mut min = bbox.min.1;

    for n in 0..band_cnt {
        let mut max = min + band_size;
        if n == band_cnt - 1 || max > y_max {
            max = y_max;
        }

        let mut bands: SmallVec<[Band; 32]> = SmallVec::new();
        bands.push(Band { min, max });

        while let Some(band) = bands.pop() {
            let rows = (band.max - band.min) as usize;
            let heads = (rows * HEAD_SIZE).div_ceil(CELL_SIZE);
            let max_cells = budget.saturating_sub(heads);

            if max_cells >= 2 {
                worker.rows.clear();
                worker.rows.resize(rows, NONE);
                worker.cells.clear();
                worker.max_cells = max_cells;
                worker.invalid = true;
                worker.cell_min.y = band.min;
                worker.cell_max.y = band.max;
                worker.cell_y_cnt = band.max - band.min;

                if worker.generate(outline).is_ok() {
                    worker.sweep();
                    continue;
                }
            }

            // Out of cells: halve the band.
            let middle = band.min + ((band.max - band.min) >> 1);
            if middle == band.min {
                log::warn!("cell pool exhausted on a single scanline");
                return Err(RleError::TooComplex);
            }
            bands.push(Band {
                min: middle,
                max: band.max,
            });
            bands.push(Band {
                min: band.min,
                max: middle,
            });
        }
        min = max;
    }

    Ok(rle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Matrix, Point};
    use crate::path::RenderPath;
    use crate::shape::{RenderColor, RenderStroke, StrokeJoin};
    use crate::stroker::{stroke_outline, StrokeBorder};

    fn outline(path: &RenderPath, rule: FillRule) -> Outline {
        let mut outline = Outline::new();
        outline.build(path, &Matrix::IDENTITY, rule);
        outline
    }

    fn rect_outline(x: f32, y: f32, w: f32, h: f32) -> Outline {
        let mut path = RenderPath::new();
        path.add_rect(x, y, w, h);
        outline(&path, FillRule::NonZero)
    }

    #[test]
    fn from_rect_covers_every_row() {
        let rle = Rle::from_rect(&RenderRegion::new(1, 2, 4, 4));
        assert_eq!(
            rle.spans,
            vec![Span::new(1, 2, 3, 255), Span::new(1, 3, 3, 255)]
        );
    }

    #[test]
    fn pixel_aligned_square_is_opaque() {
        let bbox = RenderRegion::new(10, 10, 30, 30);
        let rle = render(
            &rect_outline(10.0, 10.0, 20.0, 20.0),
            &bbox,
            true,
            &mut CellPool::default(),
        )
        .unwrap();
        assert_eq!(rle.spans.len(), 20);
        for (i, span) in rle.spans.iter().enumerate() {
            assert_eq!(*span, Span::new(10, 10 + i as u16, 20, 255));
        }
    }

    #[test]
    fn fractional_edges_are_partially_covered() {
        let bbox = RenderRegion::new(0, 0, 40, 40);
        let shape = rect_outline(10.5, 10.0, 10.0, 10.0);

        let aa = render(&shape, &bbox, true, &mut CellPool::default()).unwrap();
        assert!(aa.spans.iter().any(|s| s.coverage > 100 && s.coverage < 155));

        let aliased = render(&shape, &bbox, false, &mut CellPool::default()).unwrap();
        assert!(aliased.spans.iter().all(|s| s.coverage == 255));
    }

    #[test]
    fn even_odd_leaves_overlap_empty() {
        let mut path = RenderPath::new();
        path.add_rect(0.0, 0.0, 20.0, 10.0);
        path.add_rect(10.0, 0.0, 20.0, 10.0);
        let bbox = RenderRegion::new(0, 0, 30, 10);
        let mut pool = CellPool::default();

        let non_zero = render(&outline(&path, FillRule::NonZero), &bbox, true, &mut pool).unwrap();
        assert_eq!(non_zero.fetch(0, 0), &[Span::new(0, 0, 30, 255)]);

        let even_odd = render(&outline(&path, FillRule::EvenOdd), &bbox, true, &mut pool).unwrap();
        assert_eq!(
            even_odd.fetch(0, 0),
            &[Span::new(0, 0, 10, 255), Span::new(20, 0, 10, 255)]
        );
    }

    #[test]
    fn shape_is_clipped_to_bbox() {
        let bbox = RenderRegion::new(0, 0, 15, 15);
        let rle = render(
            &rect_outline(10.0, 10.0, 20.0, 20.0),
            &bbox,
            true,
            &mut CellPool::default(),
        )
        .unwrap();
        assert_eq!(rle.spans.len(), 5);
        assert!(rle.spans.iter().all(|s| s.x == 10 && s.len == 5));
    }

    #[test]
    fn banded_render_matches_single_band() {
        let mut path = RenderPath::new();
        path.add_circle(25.0, 25.0, 24.0, 24.0);
        let shape = outline(&path, FillRule::NonZero);
        let bbox = RenderRegion::new(0, 0, 50, 50);

        let whole = render(&shape, &bbox, true, &mut CellPool::with_budget(4096)).unwrap();
        let banded = render(&shape, &bbox, true, &mut CellPool::with_budget(120)).unwrap();
        assert!(!whole.is_empty());
        assert_eq!(whole, banded);
    }

    #[test]
    fn composed_transform_matches_nested() {
        let mut path = RenderPath::new();
        path.move_to(Point::new(2.25, 1.5));
        path.line_to(Point::new(20.75, 9.125));
        path.line_to(Point::new(6.5, 19.875));
        path.close();
        path.add_rect(4.0, 4.0, 6.0, 14.0);
        let outer = Matrix::translate(8.0, 4.0) * Matrix::scale(2.0, 2.0);
        let inner = Matrix::scale(1.5, 0.5) * Matrix::translate(2.0, 16.0);

        let mut composed = Outline::new();
        composed.build(&path, &(outer * inner), FillRule::NonZero);
        let mut nested = Outline::new();
        nested.build(&path.transformed(&inner), &outer, FillRule::NonZero);

        let bbox = RenderRegion::new(0, 0, 80, 80);
        let mut pool = CellPool::default();
        let composed = render(&composed, &bbox, true, &mut pool).unwrap();
        let nested = render(&nested, &bbox, true, &mut pool).unwrap();
        assert!(!composed.is_empty());
        assert_eq!(composed, nested);
    }

    #[test]
    fn clip_rle_multiplies_coverage() {
        let mut rle = Rle {
            spans: vec![Span::new(0, 0, 10, 255), Span::new(0, 1, 10, 128)],
        };
        let clip = Rle {
            spans: vec![Span::new(5, 1, 10, 128)],
        };
        assert!(rle.clip_rle(&clip));
        assert_eq!(rle.spans, vec![Span::new(5, 1, 5, 64)]);
    }

    #[test]
    fn clip_rect_trims_spans() {
        let mut rle = Rle::from_rect(&RenderRegion::new(0, 0, 10, 10));
        assert!(rle.clip_rect(&RenderRegion::new(2, 3, 5, 5)));
        assert_eq!(
            rle.spans,
            vec![Span::new(2, 3, 3, 255), Span::new(2, 4, 3, 255)]
        );
    }

    #[test]
    fn intersects_checks_rows_and_columns() {
        let rle = Rle {
            spans: vec![Span::new(10, 5, 4, 255)],
        };
        assert!(rle.intersects(&RenderRegion::new(12, 0, 20, 10)));
        assert!(!rle.intersects(&RenderRegion::new(14, 0, 20, 10)));
        assert!(!rle.intersects(&RenderRegion::new(0, 6, 20, 10)));
    }

    fn assert_well_formed(rle: &Rle, bbox: &RenderRegion) {
        for span in &rle.spans {
            assert!(span.len > 0 && span.coverage > 0, "{span:?}");
            assert!(i32::from(span.x) >= bbox.min.0 && i32::from(span.y) >= bbox.min.1);
            assert!(i32::from(span.x + span.len) <= bbox.max.0 && i32::from(span.y) < bbox.max.1);
        }
        for pair in rle.spans.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let ordered = a.y < b.y || (a.y == b.y && a.x + a.len <= b.x);
            assert!(ordered, "{a:?} then {b:?}");
        }
    }

    #[test]
    fn random_outlines_give_sorted_disjoint_spans() {
        let a: usize = 1103515245;
        let c: usize = 12345;
        let m: usize = usize::pow(2, 31);
        let mut seed: usize = 91;
        let mut rand = || {
            seed = (a.wrapping_mul(seed).wrapping_add(c)) % m;
            seed
        };

        let bbox = RenderRegion::new(0, 0, 200, 200);
        let mut borders = <[StrokeBorder; 2]>::default();
        for case in 0..300 {
            let mut coord = || {
                Point::new(
                    (rand() % 2400) as f32 / 10.0 - 20.0,
                    (rand() % 2400) as f32 / 10.0 - 20.0,
                )
            };
            let mut path = RenderPath::new();
            path.move_to(coord());
            for i in 0..3 + case % 6 {
                if i % 2 == 0 {
                    path.line_to(coord());
                } else {
                    path.cubic_to(coord(), coord(), coord());
                }
            }
            path.close();

            let rule = if case % 3 == 0 {
                FillRule::EvenOdd
            } else {
                FillRule::NonZero
            };
            let mut shape = outline(&path, rule);
            if case % 2 == 1 {
                let mut stroke =
                    RenderStroke::new(1.0 + (rand() % 30) as f32, RenderColor::default());
                stroke.join = [StrokeJoin::Bevel, StrokeJoin::Round, StrokeJoin::Miter][rand() % 3];
                let mut stroked = Outline::new();
                let identity = Matrix::IDENTITY;
                stroke_outline(&shape, &stroke, &identity, &mut borders, &mut stroked).unwrap();
                shape = stroked;
            }

            let anti_alias = rand() % 4 != 0;
            let whole =
                render(&shape, &bbox, anti_alias, &mut CellPool::with_budget(4096)).unwrap();
            assert_well_formed(&whole, &bbox);

            // A small budget splits the shape into many bands, or gives up on a scanline.
            match render(&shape, &bbox, anti_alias, &mut CellPool::with_budget(256)) {
                Ok(banded) => assert_well_formed(&banded, &bbox),
                Err(err) => assert_eq!(err, RleError::TooComplex),
            }
        }
    }
}
