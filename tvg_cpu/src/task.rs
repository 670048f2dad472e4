// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preparation work for shapes and images.
//!
//! A task owns copies of everything it reads, so it can run on a worker thread while the
//! caller goes on preparing the next paint. Its results are read back on the render
//! thread once the task has been waited for.

use std::sync::Arc;

use tvg_common::blend::ColorSpace;
use tvg_common::dash::dash_path;
use tvg_common::math::{zero, Matrix};
use tvg_common::mempool::MemPool;
use tvg_common::path::RenderPath;
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderSurface, RenderUpdateFlag};
use tvg_common::rle::{self, Rle};
use tvg_common::shape::RenderShape;
use tvg_common::stroker::stroke_outline;
use tvg_common::trim::trim_path;

use crate::fill::SwFill;
use crate::image::{self, SwImage};

/// Coverage a clipper imposes on the shapes it clips.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ClipGeometry {
    /// A fast-tracked rectangle.
    Rect(RenderRegion),
    /// Anti-aliased coverage.
    Rle(Rle),
}

impl ClipGeometry {
    fn clip(&self, target: &mut Rle) -> bool {
        match self {
            Self::Rect(rect) => target.clip_rect(rect),
            Self::Rle(rle) => target.clip_rle(rle),
        }
    }
}

/// State shared by shape and image tasks.
#[derive(Clone, Debug, Default)]
pub(crate) struct TaskBase {
    pub(crate) transform: Matrix,
    pub(crate) opacity: u8,
    pub(crate) clips: Vec<ClipGeometry>,
    /// Where the paint may draw.
    pub(crate) clip_box: RenderRegion,
    /// Flags of this and of the last skipped update.
    pub(crate) flags: [RenderUpdateFlag; 2],
    /// Device bounds of the current result.
    pub(crate) cur_box: RenderRegion,
    /// Device bounds of the previous result.
    pub(crate) prv_box: RenderRegion,
    pub(crate) valid: bool,
    /// Color space of the target the results are drawn to.
    pub(crate) cs: ColorSpace,
}

impl TaskBase {
    /// Start an update with `flags`.
    pub(crate) fn update(&mut self, transform: &Matrix, opacity: u8, flags: RenderUpdateFlag) {
        self.transform = *transform;
        self.opacity = opacity;
        self.flags[0] = flags;
        self.prv_box = self.cur_box;
        self.valid = false;
    }

    /// Whether the update can be skipped because the paint is invisible. Flags of a
    /// skipped update carry over to the next one.
    fn ready(&mut self, invisible: bool) -> bool {
        if invisible {
            if self.flags[0].intersects(RenderUpdateFlag::COLOR) {
                self.cur_box.reset();
            }
            self.flags[1] |= self.flags[0];
            return true;
        }
        self.flags[0] |= self.flags[1];
        self.flags[1] = RenderUpdateFlag::NONE;
        false
    }
}

/// A shape and what was prepared from it.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShapeTask {
    pub(crate) base: TaskBase,
    pub(crate) shape: RenderShape,
    pub(crate) clipper: bool,
    pub(crate) rle: Option<Rle>,
    pub(crate) stroke_rle: Option<Rle>,
    pub(crate) fill: Option<SwFill>,
    pub(crate) stroke_fill: Option<SwFill>,
    /// The fill is an axis-aligned rectangle drawn without coverage.
    pub(crate) fast_track: bool,
    /// Bounds of the fill alone.
    pub(crate) fill_box: RenderRegion,
}

impl ShapeTask {
    /// Whether the stroke outline keeps anti-aliasing.
    fn antialiasing(&self, stroke_width: f32) -> bool {
        let Some(stroke) = &self.shape.stroke else {
            return true;
        };
        stroke_width < 2.0
            || stroke.dashed()
            || stroke.stroke_first
            || stroke.trimmed()
            || stroke.color.a < 255
    }

    /// The stroke width in device units, zero when nothing would be stroked.
    fn valid_stroke_width(&self) -> f32 {
        let Some(stroke) = &self.shape.stroke else {
            return 0.0;
        };
        if zero(stroke.width) {
            return 0.0;
        }
        if !self.clipper && stroke.fill.is_none() && stroke.color.a == 0 {
            return 0.0;
        }
        if zero(stroke.trim.begin - stroke.trim.end) {
            return 0.0;
        }
        let m = &self.base.transform;
        stroke.width * (m.e11 * m.e11 + m.e12 * m.e12).sqrt()
    }

    /// What this shape imposes on the shapes it clips.
    pub(crate) fn clip_geometry(&self) -> Option<ClipGeometry> {
        if let Some(rle) = &self.stroke_rle {
            return Some(ClipGeometry::Rle(rle.clone()));
        }
        if self.fast_track {
            return Some(ClipGeometry::Rect(self.base.cur_box));
        }
        self.rle.clone().map(ClipGeometry::Rle)
    }

    fn reset(&mut self) {
        self.rle = None;
        self.fast_track = false;
        self.fill_box.reset();
        self.base.cur_box.reset();
    }

    pub(crate) fn run(&mut self, pool: &mut MemPool) {
        if self.base.ready(self.base.opacity == 0 && !self.clipper) {
            return;
        }
        if !self.prepare(pool) {
            self.reset();
            self.stroke_rle = None;
            self.base.cur_box.reset();
            return;
        }
        self.base.valid = true;
    }

    fn prepare(&mut self, pool: &mut MemPool) -> bool {
        let flags = self.base.flags[0];
        let stroke_width = self.valid_stroke_width();
        let update_shape = flags.intersects(
            RenderUpdateFlag::PATH | RenderUpdateFlag::TRANSFORM | RenderUpdateFlag::CLIP,
        );
        let mut update_fill =
            flags.intersects(RenderUpdateFlag::COLOR | RenderUpdateFlag::GRADIENT);

        let trimmed = if self.shape.trimmed() {
            self.shape
                .stroke
                .as_ref()
                .and_then(|stroke| trim_path(&self.shape.path, &stroke.trim))
        } else {
            None
        };
        let path = trimmed.unwrap_or_else(|| self.shape.path.clone());
        let path = &path;

        if update_shape {
            self.reset();
            if self.shape.fill.is_some() || self.shape.color.a > 0 || self.clipper {
                match self.gen_fill_rle(path, stroke_width, pool) {
                    Ok(true) => {}
                    Ok(false) => update_fill = false,
                    Err(err) => {
                        log::warn!("shape fill dropped: {err}");
                        return false;
                    }
                }
            }
        }

        let abgr = self.base.cs.is_abgr();
        if update_fill {
            self.fill = match &self.shape.fill {
                Some(fill) => SwFill::new(fill, &self.base.transform, self.base.opacity, abgr),
                None => None,
            };
        }

        let stroke_flags = RenderUpdateFlag::STROKE | RenderUpdateFlag::GRADIENT_STROKE;
        if update_shape || flags.intersects(stroke_flags) {
            self.stroke_rle = None;
            self.stroke_fill = None;
            if stroke_width > 0.0 {
                if let Err(err) = self.gen_stroke_rle(path, pool) {
                    log::warn!("shape stroke dropped: {err}");
                    return false;
                }
                if let Some(fill) = self.shape.stroke_fill() {
                    self.stroke_fill =
                        SwFill::new(fill, &self.base.transform, self.base.opacity, abgr);
                }
            }
        }

        for clip in &self.base.clips {
            for rle in [self.rle.as_mut(), self.stroke_rle.as_mut()].into_iter().flatten() {
                if !clip.clip(rle) {
                    rle.reset();
                }
            }
        }
        true
    }

    /// Build the fill coverage. Returns `Ok(false)` when nothing is visible.
    fn gen_fill_rle(
        &mut self,
        path: &RenderPath,
        stroke_width: f32,
        pool: &mut MemPool,
    ) -> Result<bool, rle::RleError> {
        let (transform, clip_box) = (self.base.transform, self.base.clip_box);
        let has_clips = !self.base.clips.is_empty();
        let rule = self.shape.rule;
        let anti_alias = self.antialiasing(stroke_width);

        pool.with_outline(|outline, cells| {
            if !outline.build(path, &transform, rule) {
                return Ok(false);
            }
            let fast_track = !has_clips && outline.is_axis_aligned_rect();
            let Some(bbox) = outline.bbox(&clip_box, fast_track) else {
                return Ok(false);
            };
            self.fast_track = fast_track;
            self.fill_box = bbox;
            self.base.cur_box = bbox;
            if !fast_track {
                self.rle = Some(rle::render(outline, &bbox, anti_alias, cells)?);
            }
            Ok(true)
        })
    }

    fn gen_stroke_rle(
        &mut self,
        path: &RenderPath,
        pool: &mut MemPool,
    ) -> Result<(), StrokeRleError> {
        let Some(stroke) = &self.shape.stroke else {
            return Ok(());
        };
        let dashed = dash_path(path, stroke);
        let source = dashed.as_ref().unwrap_or(path);
        let (transform, clip_box, rule) =
            (self.base.transform, self.base.clip_box, self.shape.rule);

        let rle = pool.with_stroke(|scratch| -> Result<_, StrokeRleError> {
            if !scratch.source.build(source, &transform, rule) {
                return Ok(None);
            }
            stroke_outline(
                scratch.source,
                stroke,
                &transform,
                scratch.borders,
                scratch.outline,
            )?;
            let Some(bbox) = scratch.outline.bbox(&clip_box, false) else {
                return Ok(None);
            };
            Ok(Some((rle::render(scratch.outline, &bbox, true, scratch.cells)?, bbox)))
        })?;

        if let Some((rle, bbox)) = rle {
            self.base.cur_box.add(&bbox);
            self.stroke_rle = Some(rle);
        }
        Ok(())
    }
}

/// Failures while building the stroke coverage.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum StrokeRleError {
    /// See [`tvg_common::stroker::StrokeError`].
    #[error(transparent)]
    Stroke(#[from] tvg_common::stroker::StrokeError),
    /// See [`rle::RleError`].
    #[error(transparent)]
    Rle(#[from] rle::RleError),
}

/// An image and what was prepared from it.
#[derive(Clone, Debug)]
pub(crate) struct ImageTask {
    pub(crate) base: TaskBase,
    pub(crate) source: Arc<RenderSurface>,
    pub(crate) image: Option<SwImage>,
}

impl ImageTask {
    pub(crate) fn new(source: Arc<RenderSurface>) -> Self {
        Self {
            base: TaskBase::default(),
            source,
            image: None,
        }
    }

    pub(crate) fn run(&mut self, pool: &mut MemPool) {
        if self.base.ready(self.base.opacity == 0) {
            return;
        }
        let flags = self.base.flags[0];
        let update_image = flags.intersects(
            RenderUpdateFlag::IMAGE | RenderUpdateFlag::CLIP | RenderUpdateFlag::TRANSFORM,
        );
        let update_color = flags.intersects(RenderUpdateFlag::COLOR);
        if !update_image && !update_color {
            self.base.valid = self.image.is_some();
            return;
        }
        if update_image || self.image.is_none() {
            self.image = None;
            self.base.cur_box.reset();

            let source = image::convert(&self.source, self.base.cs);
            let needs_rle = !self.base.clips.is_empty();
            let (transform, clip_box) = (&self.base.transform, &self.base.clip_box);
            let prepared = SwImage::prepare(source, transform, clip_box, needs_rle, pool);
            let Some((mut img, bbox)) = prepared else {
                return;
            };
            if let Some(rle) = img.rle.as_mut() {
                for clip in &self.base.clips {
                    if !clip.clip(rle) {
                        return;
                    }
                }
            }
            self.base.cur_box = bbox;
            self.image = Some(img);
        }
        self.base.valid = true;
    }
}

/// A unit of preparation work.
#[derive(Clone, Debug)]
pub(crate) enum Task {
    Shape(Box<ShapeTask>),
    Image(Box<ImageTask>),
}

impl Task {
    pub(crate) fn run(&mut self, pool: &mut MemPool) {
        match self {
            Self::Shape(task) => task.run(pool),
            Self::Image(task) => task.run(pool),
        }
    }

    pub(crate) fn base(&self) -> &TaskBase {
        match self {
            Self::Shape(task) => &task.base,
            Self::Image(task) => &task.base,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut TaskBase {
        match self {
            Self::Shape(task) => &mut task.base,
            Self::Image(task) => &mut task.base,
        }
    }
}
