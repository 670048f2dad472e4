// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The software renderer.

use std::sync::Arc;

use tvg_common::blend::{BlendMethod, ColorSpace, CompositionFlag, MaskMethod};
use tvg_common::effect::RenderEffect;
use tvg_common::math::{Matrix, Point};
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderSurface, RenderUpdateFlag};
use tvg_common::shape::{RenderColor, RenderShape};

use crate::dispatch::{Scheduler, Slot};
use crate::engine;
use crate::pixel::{multiply, premultiplied};
use crate::raster::{compose_masked, Canvas, Coverage, MaskRef, Source};
use crate::surface::{Pixels, Surface, TargetError};
use crate::task::{ClipGeometry, ImageTask, ShapeTask, Task};
use crate::{effect, image};

/// Options of a [`SoftwareRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    /// Worker threads preparing shapes, if this renderer starts the engine. With zero,
    /// shapes are prepared on the calling thread.
    pub num_threads: u16,
    /// The color space reported before a target is set.
    pub color_space: ColorSpace,
    /// Redraw only what changed since the last frame.
    pub partial: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        #[cfg(feature = "multithreading")]
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).min(8) as u16)
            .unwrap_or(0);
        #[cfg(not(feature = "multithreading"))]
        let num_threads = 0;

        Self {
            num_threads,
            color_space: ColorSpace::Abgr8888,
            partial: false,
        }
    }
}

/// Handle to prepared shape or image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataId(u32);

/// Handle to an offscreen composition target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositorId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SurfaceId {
    Main,
    Compositor(usize),
}

/// An offscreen surface lent out for composition.
#[derive(Debug)]
struct Compositor {
    surface: Surface,
    /// The area drawn to.
    bbox: RenderRegion,
    method: MaskMethod,
    opacity: u8,
    busy: bool,
    /// The surface that was current when this one was acquired.
    recover_sfc: SurfaceId,
    /// The mask that was attached to `recover_sfc`.
    recover_cmp: Option<usize>,
    /// The mask attached to this surface.
    mask: Option<usize>,
}

/// A scanline rasterizer implementing [`RenderMethod`].
///
/// Draws go to a caller-provided pixel buffer set with [`set_target`](Self::set_target).
/// Shapes and images are prepared asynchronously on the engine's workers and waited for
/// on first use.
#[derive(Debug)]
pub struct SoftwareRenderer {
    settings: RenderSettings,
    scheduler: Arc<Scheduler>,
    surface: Option<Surface>,
    /// The mask attached to the main surface.
    main_mask: Option<usize>,
    current: SurfaceId,
    compositors: Vec<Compositor>,
    tasks: Vec<Option<Slot>>,
    free: Vec<u32>,
    blend: BlendMethod,
    viewport: RenderRegion,
    /// Target for paints drawn through a masking compositor.
    scratch: Option<Surface>,
    /// Data updated since the last frame.
    updated: Vec<DataId>,
    dirty: RenderRegion,
    /// The next frame redraws everything.
    fulldraw: bool,
}

impl SoftwareRenderer {
    /// Create a renderer, starting the engine if it is not running yet.
    pub fn new(settings: RenderSettings) -> Self {
        let scheduler = engine::acquire(usize::from(settings.num_threads));
        Self {
            settings,
            scheduler,
            surface: None,
            main_mask: None,
            current: SurfaceId::Main,
            compositors: Vec::new(),
            tasks: Vec::new(),
            free: Vec::new(),
            blend: BlendMethod::Normal,
            viewport: RenderRegion::default(),
            scratch: None,
            updated: Vec::new(),
            dirty: RenderRegion::default(),
            fulldraw: true,
        }
    }

    /// Draw into `pixels`, laid out as `h` rows of `stride` pixels of which the first `w`
    /// are visible.
    ///
    /// Straight-alpha buffers are premultiplied while a frame is drawn and converted back
    /// when it ends.
    pub fn set_target(
        &mut self,
        pixels: Pixels,
        stride: u32,
        w: u32,
        h: u32,
        cs: ColorSpace,
    ) -> Result<(), TargetError> {
        let surface = Surface::new(pixels, stride, w, h, cs).inspect_err(|err| {
            log::warn!("rejected render target: {err}");
        })?;
        self.sync();
        self.viewport = surface.region();
        self.surface = Some(surface);
        self.compositors.clear();
        self.scratch = None;
        self.main_mask = None;
        self.current = SurfaceId::Main;
        self.fulldraw = true;
        Ok(())
    }

    /// The current target.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Give back the current target, waiting for outstanding work first.
    pub fn take_target(&mut self) -> Option<Surface> {
        self.sync();
        self.compositors.clear();
        self.current = SurfaceId::Main;
        self.main_mask = None;
        self.surface.take()
    }

    /// Number of threads preparing shapes.
    pub fn threads(&self) -> usize {
        self.scheduler.threads()
    }

    fn slot(&mut self, id: DataId) -> Option<&mut Slot> {
        self.tasks.get_mut(id.0 as usize)?.as_mut()
    }

    fn task(&mut self, id: DataId) -> Option<&mut Task> {
        self.slot(id)?.wait()
    }

    fn alloc(&mut self) -> DataId {
        if let Some(id) = self.free.pop() {
            return DataId(id);
        }
        self.tasks.push(None);
        DataId((self.tasks.len() - 1) as u32)
    }

    /// Where paints may draw on the main surface.
    fn clip_box(&self) -> RenderRegion {
        match &self.surface {
            Some(sfc) => self.viewport.intersection(&sfc.region()),
            None => self.viewport,
        }
    }

    fn clip_geometry(&mut self, clips: &[DataId]) -> Vec<ClipGeometry> {
        clips
            .iter()
            .map(|clip| match self.task(*clip) {
                Some(Task::Shape(task)) if task.base.valid => task.clip_geometry(),
                _ => None,
            })
            // An invisible clipper hides everything.
            .map(|geom| geom.unwrap_or(ClipGeometry::Rect(RenderRegion::default())))
            .collect()
    }

    /// Hand `task` to the scheduler under `id`.
    fn submit(
        &mut self,
        id: DataId,
        mut task: Task,
        transform: &Matrix,
        clips: &[DataId],
        opacity: u8,
        flags: RenderUpdateFlag,
    ) -> DataId {
        let clips = self.clip_geometry(clips);
        let clip_box = self.clip_box();
        let cs = self
            .surface
            .as_ref()
            .map_or(self.settings.color_space, |sfc| sfc.cs)
            .premultiplied();

        let base = task.base_mut();
        base.clips = clips;
        base.clip_box = clip_box;
        base.cs = cs;
        base.update(transform, opacity, flags);

        let slot = self.scheduler.request(task);
        self.tasks[id.0 as usize] = Some(slot);
        if self.settings.partial {
            self.updated.push(id);
        }
        id
    }

    fn mask_slot(&mut self, target: SurfaceId) -> Option<&mut Option<usize>> {
        match target {
            SurfaceId::Main => Some(&mut self.main_mask),
            SurfaceId::Compositor(i) => self.compositors.get_mut(i).map(|c| &mut c.mask),
        }
    }

    fn surface_mut(&mut self, target: SurfaceId) -> Option<&mut Surface> {
        match target {
            SurfaceId::Main => self.surface.as_mut(),
            SurfaceId::Compositor(i) => self.compositors.get_mut(i).map(|c| &mut c.surface),
        }
    }

    /// The region draws to `target` are restricted to.
    fn draw_clip(&self, target: SurfaceId) -> RenderRegion {
        match target {
            SurfaceId::Main => {
                let clip = self.clip_box();
                if self.settings.partial && !self.fulldraw {
                    clip.intersection(&self.dirty)
                } else {
                    clip
                }
            }
            SurfaceId::Compositor(i) => self
                .compositors
                .get(i)
                .map_or(RenderRegion::default(), |c| c.bbox),
        }
    }

    /// Run `f` with a canvas drawing onto `target` through its mask, if any.
    fn draw_on(&mut self, target: SurfaceId, f: impl FnOnce(&mut Canvas<'_>)) -> bool {
        let clip = self.draw_clip(target);
        let blend = self.blend;
        let mask_id = self.mask_slot(target).and_then(|m| *m);

        // The mask is moved out so the target can be borrowed mutably next to it.
        let mask = mask_id.and_then(|i| {
            let cmp = self.compositors.get_mut(i)?;
            let placeholder = Surface::offscreen(0, 0, cmp.surface.cs);
            Some((
                i,
                cmp.method,
                cmp.bbox,
                std::mem::replace(&mut cmp.surface, placeholder),
            ))
        });

        let drawn = match &mask {
            Some((_, method, bbox, msfc)) if method.is_matting() => {
                self.draw_masking(target, clip.intersection(bbox), msfc, *method, f)
            }
            _ => match self.surface_mut(target) {
                Some(dst) => {
                    let mut canvas = Canvas::new(dst);
                    canvas.clip = clip;
                    canvas.blend = blend;
                    canvas.mask = mask.as_ref().map(|(_, method, bbox, msfc)| MaskRef {
                        surface: msfc,
                        method: *method,
                        bbox: *bbox,
                    });
                    f(&mut canvas);
                    true
                }
                None => false,
            },
        };

        if let Some((i, _, _, msfc)) = mask {
            if let Some(cmp) = self.compositors.get_mut(i) {
                cmp.surface = msfc;
            }
        }
        drawn
    }

    /// Draw through a masking method: the paint is drawn on its own, then merged with the
    /// mask onto `target`.
    fn draw_masking(
        &mut self,
        target: SurfaceId,
        region: RenderRegion,
        mask: &Surface,
        method: MaskMethod,
        f: impl FnOnce(&mut Canvas<'_>),
    ) -> bool {
        let blend = self.blend;
        let Some((w, h, cs)) = self
            .surface_mut(target)
            .map(|dst| (dst.w, dst.h, dst.cs.premultiplied()))
        else {
            return false;
        };
        let mut scratch = match self.scratch.take() {
            Some(sfc) if sfc.w == w && sfc.h == h && sfc.cs == cs => sfc,
            _ => Surface::offscreen(w, h, cs),
        };
        scratch.clear(&region);
        {
            let mut canvas = Canvas::new(&mut scratch);
            canvas.clip = region;
            canvas.blend = blend;
            f(&mut canvas);
        }
        if let Some(dst) = self.surface_mut(target) {
            compose_masked(dst, &scratch, mask, method, &region);
        }
        self.scratch = Some(scratch);
        true
    }

    /// Draw the compositor `cmp` onto `target`.
    fn compose(&mut self, target: SurfaceId, cmp: usize, opacity: u8) -> bool {
        let Some(c) = self.compositors.get_mut(cmp) else {
            return false;
        };
        let bbox = c.bbox;
        let placeholder = Surface::offscreen(0, 0, c.surface.cs);
        let src = std::mem::replace(&mut c.surface, placeholder);
        let drawn = self.draw_on(target, |canvas| canvas.compose(&src, &bbox, opacity));
        if let Some(c) = self.compositors.get_mut(cmp) {
            c.surface = src;
        }
        drawn
    }

    /// Take the task under `id` out for drawing, run `f`, and put it back.
    fn with_task(&mut self, id: DataId, f: impl FnOnce(&mut Self, &Task) -> bool) -> bool {
        let Some(mut slot) = self.tasks.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };
        let drawn = match slot.wait() {
            Some(task) => f(self, task),
            None => false,
        };
        self.tasks[id.0 as usize] = Some(slot);
        drawn
    }
}

impl Drop for SoftwareRenderer {
    fn drop(&mut self) {
        self.sync();
        engine::release();
    }
}

fn solid(color: RenderColor, opacity: u8, abgr: bool) -> Option<u32> {
    let a = multiply(color.a, opacity);
    (a > 0).then(|| premultiplied(RenderColor { a, ..color }, abgr))
}

fn draw_fill(task: &ShapeTask, canvas: &mut Canvas<'_>) {
    let coverage = if task.fast_track {
        Coverage::Rect(task.fill_box)
    } else {
        match &task.rle {
            Some(rle) => Coverage::Rle(rle),
            None => return,
        }
    };
    let source = match (&task.shape.fill, &task.fill) {
        (Some(_), Some(fill)) => Source::Gradient(fill),
        (Some(_), None) => return,
        (None, _) => match solid(task.shape.color, task.base.opacity, task.base.cs.is_abgr()) {
            Some(color) => Source::Solid(color),
            None => return,
        },
    };
    canvas.fill(&coverage, source);
}

fn draw_stroke(task: &ShapeTask, canvas: &mut Canvas<'_>) {
    let Some(rle) = &task.stroke_rle else {
        return;
    };
    let source = match (task.shape.stroke_fill(), &task.stroke_fill) {
        (Some(_), Some(fill)) => Source::Gradient(fill),
        (Some(_), None) => return,
        (None, _) => {
            let color = task.shape.stroke_color();
            match solid(color, task.base.opacity, task.base.cs.is_abgr()) {
                Some(color) => Source::Solid(color),
                None => return,
            }
        }
    };
    canvas.fill(&Coverage::Rle(rle), source);
}

/// Whether the convex quad `pts` overlaps `region`, by separating axes.
fn quad_intersects(pts: &[Point; 4], region: &RenderRegion) -> bool {
    let rect = [
        Point::new(region.min.0 as f32, region.min.1 as f32),
        Point::new(region.max.0 as f32, region.min.1 as f32),
        Point::new(region.max.0 as f32, region.max.1 as f32),
        Point::new(region.min.0 as f32, region.max.1 as f32),
    ];
    let project = |pts: &[Point; 4], axis: Point| {
        pts.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            let d = p.dot(axis);
            (lo.min(d), hi.max(d))
        })
    };
    let axes = [
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        {
            let e = pts[1] - pts[0];
            Point::new(-e.y, e.x)
        },
        {
            let e = pts[3] - pts[0];
            Point::new(-e.y, e.x)
        },
    ];
    axes.into_iter().all(|axis| {
        let (a0, a1) = project(pts, axis);
        let (b0, b1) = project(&rect, axis);
        a0 < b1 && b0 < a1
    })
}

impl RenderMethod for SoftwareRenderer {
    type Data = DataId;
    type Compositor = CompositorId;

    fn prepare_shape(
        &mut self,
        shape: &RenderShape,
        data: Option<DataId>,
        transform: &Matrix,
        clips: &[DataId],
        opacity: u8,
        flags: RenderUpdateFlag,
        clipper: bool,
    ) -> Option<DataId> {
        let previous = data.and_then(|id| self.slot(id)?.take());
        let previous = match (data, previous) {
            (Some(id), Some(task)) if flags.is_empty() => {
                self.tasks[id.0 as usize] = Some(Slot::Ready(task));
                return Some(id);
            }
            (_, previous) => previous,
        };
        let mut task = match previous {
            Some(Task::Shape(task)) => task,
            _ => Box::default(),
        };
        task.shape.clone_from(shape);
        task.clipper = clipper;

        let id = data.unwrap_or_else(|| self.alloc());
        Some(self.submit(id, Task::Shape(task), transform, clips, opacity, flags))
    }

    fn prepare_image(
        &mut self,
        image: &Arc<RenderSurface>,
        data: Option<DataId>,
        transform: &Matrix,
        clips: &[DataId],
        opacity: u8,
        flags: RenderUpdateFlag,
    ) -> Option<DataId> {
        let previous = data.and_then(|id| self.slot(id)?.take());
        let previous = match (data, previous) {
            (Some(id), Some(task)) if flags.is_empty() => {
                self.tasks[id.0 as usize] = Some(Slot::Ready(task));
                return Some(id);
            }
            (_, previous) => previous,
        };
        let task = match previous {
            Some(Task::Image(mut task)) => {
                if !Arc::ptr_eq(&task.source, image) {
                    task.source = Arc::clone(image);
                    task.image = None;
                }
                task
            }
            _ => Box::new(ImageTask::new(Arc::clone(image))),
        };

        let id = data.unwrap_or_else(|| self.alloc());
        Some(self.submit(id, Task::Image(task), transform, clips, opacity, flags))
    }

    fn pre_render(&mut self) -> bool {
        let Some(sfc) = self.surface.as_mut() else {
            return false;
        };
        sfc.premultiply();

        if self.settings.partial && !self.fulldraw {
            let updated = std::mem::take(&mut self.updated);
            for id in updated {
                if let Some(task) = self.task(id) {
                    let (prv, cur) = (task.base().prv_box, task.base().cur_box);
                    self.dirty.add(&prv);
                    self.dirty.add(&cur);
                }
            }
            let clip = self.clip_box();
            self.dirty.intersect(&clip);
            let dirty = self.dirty;
            if let Some(sfc) = self.surface.as_mut() {
                sfc.clear(&dirty);
            }
            log::trace!("partial redraw of {dirty:?}");
        }
        true
    }

    fn render_shape(&mut self, data: DataId) -> bool {
        let target = self.current;
        self.with_task(data, |this, task| {
            let Task::Shape(task) = task else {
                return false;
            };
            if !task.base.valid {
                return true;
            }
            this.draw_on(target, |canvas| {
                if task.shape.stroke_first() {
                    draw_stroke(task, canvas);
                    draw_fill(task, canvas);
                } else {
                    draw_fill(task, canvas);
                    draw_stroke(task, canvas);
                }
            })
        })
    }

    fn render_image(&mut self, data: DataId) -> bool {
        let target = self.current;
        self.with_task(data, |this, task| {
            let Task::Image(task) = task else {
                return false;
            };
            let Some(img) = task.image.as_ref().filter(|_| task.base.valid) else {
                return true;
            };
            let (bbox, opacity) = (task.base.cur_box, task.base.opacity);
            this.draw_on(target, |canvas| img.draw(canvas, &bbox, opacity))
        })
    }

    fn post_render(&mut self) -> bool {
        if let Some(sfc) = self.surface.as_mut() {
            sfc.unpremultiply();
        }
        self.fulldraw = false;
        self.dirty.reset();
        self.updated.clear();
        true
    }

    fn dispose(&mut self, data: DataId) {
        if let Some(entry) = self.tasks.get_mut(data.0 as usize) {
            if let Some(mut slot) = entry.take() {
                let _ = slot.take();
                self.free.push(data.0);
            }
        }
    }

    fn region(&mut self, data: DataId) -> RenderRegion {
        self.task(data)
            .map_or(RenderRegion::default(), |task| task.base().cur_box)
    }

    fn bounds(&mut self, data: DataId, transform: &Matrix) -> Option<[Point; 4]> {
        match self.task(data)? {
            Task::Shape(task) => {
                let (mut min, mut max) = task.shape.path.bounds()?;
                let half = task.shape.stroke_width() * 0.5;
                min = min - Point::new(half, half);
                max = max + Point::new(half, half);
                Some(
                    [
                        min,
                        Point::new(max.x, min.y),
                        max,
                        Point::new(min.x, max.y),
                    ]
                    .map(|p| p.transform(transform)),
                )
            }
            Task::Image(task) => Some(image::corners(task.source.w, task.source.h, transform)),
        }
    }

    fn viewport(&self) -> RenderRegion {
        self.viewport
    }

    fn set_viewport(&mut self, vp: RenderRegion) -> bool {
        self.viewport = vp;
        true
    }

    fn blend(&mut self, method: BlendMethod) -> bool {
        self.blend = method;
        true
    }

    fn color_space(&self) -> ColorSpace {
        self.surface
            .as_ref()
            .map_or(self.settings.color_space, |sfc| sfc.cs)
    }

    fn clear(&mut self) -> bool {
        self.sync();
        let Some(sfc) = self.surface.as_mut() else {
            return false;
        };
        let region = sfc.region();
        sfc.clear(&region);
        self.fulldraw = true;
        true
    }

    fn sync(&mut self) -> bool {
        for slot in self.tasks.iter_mut().flatten() {
            slot.wait();
        }
        true
    }

    fn target(
        &mut self,
        region: &RenderRegion,
        cs: ColorSpace,
        flags: CompositionFlag,
    ) -> Option<CompositorId> {
        let main = self.surface.as_ref()?;
        let bbox = region.intersection(&main.region());
        if bbox.invalid() {
            return None;
        }
        let (mut w, mut h) = (main.w, main.h);
        if flags.contains(CompositionFlag::POST_PROCESSING) {
            w = w.max(h);
            h = w;
        }
        let cs = if cs == ColorSpace::Grayscale8 {
            cs
        } else {
            main.cs.premultiplied()
        };

        let reuse = self
            .compositors
            .iter()
            .position(|c| !c.busy && c.surface.w == w && c.surface.h == h && c.surface.cs == cs);
        let idx = match reuse {
            Some(idx) => idx,
            None => {
                log::debug!("new {w}x{h} {cs:?} compositor");
                self.compositors.push(Compositor {
                    surface: Surface::offscreen(w, h, cs),
                    bbox,
                    method: MaskMethod::None,
                    opacity: 255,
                    busy: false,
                    recover_sfc: SurfaceId::Main,
                    recover_cmp: None,
                    mask: None,
                });
                self.compositors.len() - 1
            }
        };

        let recover_sfc = self.current;
        let recover_cmp = self.mask_slot(recover_sfc).and_then(|m| *m);
        let cmp = &mut self.compositors[idx];
        cmp.bbox = bbox;
        cmp.surface.clear(&bbox);
        cmp.method = MaskMethod::None;
        cmp.opacity = 255;
        cmp.busy = true;
        cmp.recover_sfc = recover_sfc;
        cmp.recover_cmp = recover_cmp;
        cmp.mask = None;

        self.current = SurfaceId::Compositor(idx);
        Some(CompositorId(idx))
    }

    fn begin_composite(&mut self, cmp: CompositorId, method: MaskMethod, opacity: u8) -> bool {
        let Some(c) = self.compositors.get_mut(cmp.0) else {
            return false;
        };
        c.method = method;
        c.opacity = opacity;
        if method != MaskMethod::None {
            let recover = c.recover_sfc;
            self.current = recover;
            if let Some(mask) = self.mask_slot(recover) {
                *mask = Some(cmp.0);
            }
        }
        true
    }

    fn end_composite(&mut self, cmp: CompositorId) -> bool {
        let Some(c) = self.compositors.get_mut(cmp.0) else {
            return false;
        };
        let (recover_sfc, recover_cmp) = (c.recover_sfc, c.recover_cmp);
        let (method, opacity) = (c.method, c.opacity);
        let busy = std::mem::replace(&mut c.busy, false);

        self.current = recover_sfc;
        if let Some(mask) = self.mask_slot(recover_sfc) {
            *mask = recover_cmp;
        }
        // Already drawn by a direct effect.
        if !busy {
            return true;
        }
        if method == MaskMethod::None {
            return self.compose(recover_sfc, cmp.0, opacity);
        }
        true
    }

    fn render_effect(&mut self, cmp: CompositorId, effect: &RenderEffect, direct: bool) -> bool {
        let Some(c) = self.compositors.get_mut(cmp.0) else {
            return false;
        };
        if !effect.valid {
            return true;
        }
        let region = c.bbox;
        if let Err(err) = effect::apply(&mut c.surface, &region, effect) {
            log::warn!("effect skipped: {err}");
            return false;
        }
        let (recover, opacity) = (c.recover_sfc, c.opacity);
        let direct = direct
            && self
                .surface_mut(recover)
                .is_some_and(|sfc| !sfc.is_gray());
        if direct {
            let drawn = self.compose(recover, cmp.0, opacity);
            if let Some(c) = self.compositors.get_mut(cmp.0) {
                c.busy = false;
            }
            return drawn;
        }
        true
    }

    fn intersects_shape(&mut self, data: DataId, region: &RenderRegion) -> bool {
        let Some(Task::Shape(task)) = self.task(data) else {
            return false;
        };
        if !task.base.valid {
            return false;
        }
        if task.fast_track && task.fill_box.intersects(region) {
            return true;
        }
        [&task.rle, &task.stroke_rle]
            .into_iter()
            .flatten()
            .any(|rle| rle.intersects(region))
    }

    fn intersects_image(&mut self, data: DataId, region: &RenderRegion) -> bool {
        let Some(Task::Image(task)) = self.task(data) else {
            return false;
        };
        if !task.base.valid || !task.base.cur_box.intersects(region) {
            return false;
        }
        let pts = image::corners(task.source.w, task.source.h, &task.base.transform);
        quad_intersects(&pts, region)
    }

    fn damage(&mut self, _data: DataId, region: &RenderRegion) {
        self.dirty.add(region);
    }

    fn partial(&mut self, disable: bool) -> bool {
        let previous = self.settings.partial;
        self.settings.partial = !disable;
        if previous != self.settings.partial {
            self.fulldraw = true;
        }
        previous
    }
}
