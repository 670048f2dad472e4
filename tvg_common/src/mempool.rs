// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scratch buffers reused across shapes by one thread.
//!
//! A [`MemPool`] is owned by exactly one thread at a time. Buffers are lent out through
//! closures and reset, not freed, once the closure returns, so their allocations carry
//! over to the next shape prepared on the same thread.

use crate::outline::Outline;
use crate::rle::CellPool;
use crate::stroker::StrokeBorder;

/// The buffers lent to a stroking closure.
#[derive(Debug)]
pub struct StrokeScratch<'a> {
    /// The path to stroke, after trimming and dashing.
    pub source: &'a mut Outline,
    /// The stroke outline produced from `source`.
    pub outline: &'a mut Outline,
    /// Left and right stroker borders.
    pub borders: &'a mut [StrokeBorder; 2],
    /// Cells for scan converting `outline`.
    pub cells: &'a mut CellPool,
}

/// Per-thread outlines, stroker borders, and RLE cells.
#[derive(Debug, Default)]
pub struct MemPool {
    outline: Outline,
    stroke_outline: Outline,
    dash_outline: Outline,
    borders: [StrokeBorder; 2],
    cells: CellPool,
}

impl MemPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool whose cell buffer starts with room for `cells` cells.
    pub fn with_cell_budget(cells: usize) -> Self {
        Self {
            cells: CellPool::with_budget(cells),
            ..Self::default()
        }
    }

    /// Lend the fill outline and the cell pool to `f`.
    pub fn with_outline<R>(&mut self, f: impl FnOnce(&mut Outline, &mut CellPool) -> R) -> R {
        let result = f(&mut self.outline, &mut self.cells);
        self.outline.clear();
        result
    }

    /// Lend the stroking buffers to `f`.
    pub fn with_stroke<R>(&mut self, f: impl FnOnce(StrokeScratch<'_>) -> R) -> R {
        let result = f(StrokeScratch {
            source: &mut self.dash_outline,
            outline: &mut self.stroke_outline,
            borders: &mut self.borders,
            cells: &mut self.cells,
        });
        self.dash_outline.clear();
        self.stroke_outline.clear();
        for border in &mut self.borders {
            border.reset();
        }
        result
    }

    /// Number of cells the pool can currently hold.
    pub fn cell_budget(&self) -> usize {
        self.cells.budget()
    }
}
