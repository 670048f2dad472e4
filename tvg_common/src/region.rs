// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer device-space bounding boxes.

/// A half-open integer AABB: pixels `min.x..max.x` by `min.y..max.y`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderRegion {
    /// Top-left corner, inclusive.
    pub min: (i32, i32),
    /// Bottom-right corner, exclusive.
    pub max: (i32, i32),
}

impl RenderRegion {
    /// Create a region from its corners.
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min: (min_x, min_y),
            max: (max_x, max_y),
        }
    }

    /// Create a region from an origin and a size.
    pub const fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Left edge.
    #[inline]
    pub fn x(&self) -> i32 {
        self.min.0
    }

    /// Top edge.
    #[inline]
    pub fn y(&self) -> i32 {
        self.min.1
    }

    /// Width, possibly negative for an invalid region.
    #[inline]
    pub fn w(&self) -> i32 {
        self.max.0 - self.min.0
    }

    /// Height, possibly negative for an invalid region.
    #[inline]
    pub fn h(&self) -> i32 {
        self.max.1 - self.min.1
    }

    /// Width clamped to zero, as unsigned.
    #[inline]
    pub fn sw(&self) -> u32 {
        self.w().max(0) as u32
    }

    /// Height clamped to zero, as unsigned.
    #[inline]
    pub fn sh(&self) -> u32 {
        self.h().max(0) as u32
    }

    /// Whether the region has a positive area.
    #[inline]
    pub fn valid(&self) -> bool {
        self.max.0 > self.min.0 && self.max.1 > self.min.1
    }

    /// Whether the region is empty.
    #[inline]
    pub fn invalid(&self) -> bool {
        !self.valid()
    }

    /// Clip this region to `rhs`. The result may be invalid.
    pub fn intersect(&mut self, rhs: &Self) {
        self.min.0 = self.min.0.max(rhs.min.0);
        self.min.1 = self.min.1.max(rhs.min.1);
        self.max.0 = self.max.0.min(rhs.max.0);
        self.max.1 = self.max.1.min(rhs.max.1);

        // Collapse to a zero-sized region so width and height stay non-negative.
        if self.max.0 < self.min.0 {
            self.max.0 = self.min.0;
        }
        if self.max.1 < self.min.1 {
            self.max.1 = self.min.1;
        }
    }

    /// The intersection of two regions.
    pub fn intersection(&self, rhs: &Self) -> Self {
        let mut r = *self;
        r.intersect(rhs);
        r
    }

    /// Grow this region to include `rhs`.
    pub fn add(&mut self, rhs: &Self) {
        if rhs.invalid() {
            return;
        }
        if self.invalid() {
            *self = *rhs;
            return;
        }
        self.min.0 = self.min.0.min(rhs.min.0);
        self.min.1 = self.min.1.min(rhs.min.1);
        self.max.0 = self.max.0.max(rhs.max.0);
        self.max.1 = self.max.1.max(rhs.max.1);
    }

    /// Whether the two regions overlap.
    pub fn intersects(&self, rhs: &Self) -> bool {
        self.intersection(rhs).valid()
    }

    /// Whether `rhs` lies entirely within this region.
    pub fn contains(&self, rhs: &Self) -> bool {
        self.min.0 <= rhs.min.0
            && self.min.1 <= rhs.min.1
            && self.max.0 >= rhs.max.0
            && self.max.1 >= rhs.max.1
    }

    /// Reset to an empty region.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
