// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The GPU renderer.

use std::mem;
use std::sync::Arc;

use bytemuck::Pod;
use smallvec::{smallvec, SmallVec};
use thiserror::Error;
use tvg_common::blend::{BlendMethod, ColorSpace, CompositionFlag, MaskMethod};
use tvg_common::effect::RenderEffect;
use tvg_common::math::{equal, Matrix, Point};
use tvg_common::region::RenderRegion;
use tvg_common::render::{RenderMethod, RenderSurface, RenderUpdateFlag};
use tvg_common::shape::{FillRule, RenderShape};

use crate::buffer::StageBuffer;
use crate::effect::{self, EffectBlock, EffectInput, EffectStep};
use crate::engine;
use crate::geometry::{FillMode, GlGeometry};
use crate::gl::{self, Gl};
use crate::paint::{MatrixBlock, Paint, TextureBlock};
use crate::pass::RenderPass;
use crate::program::{Program, ProgramCache};
use crate::shader::{BlendSource, Block, ProgramKey, Sampler};
use crate::target::{set_sampling, RenderTarget, TargetPool};
use crate::task::{
    Binding, BlendState, ComposeTask, DrawCall, EffectTask, RenderTask, SolidBatch, VertexLayout,
};
use crate::tessellator::Mesh;

/// Options of a [`GpuRenderer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlConfig {
    /// MSAA samples of the offscreen targets. Zero disables multisampling.
    pub samples: u8,
    /// Emit GLSL ES 3.00 for WebGL2 and GLES contexts instead of GLSL 3.30.
    pub webgl: bool,
    /// Premultiplied color the target starts from after [`clear`](RenderMethod::clear).
    pub clear_color: [f32; 4],
    /// `GL_UNIFORM_BUFFER_OFFSET_ALIGNMENT` of the context.
    pub uniform_alignment: usize,
}

impl Default for GlConfig {
    fn default() -> Self {
        Self {
            samples: 4,
            webgl: false,
            clear_color: [0.0; 4],
            uniform_alignment: 256,
        }
    }
}

/// Reasons a framebuffer is rejected as a render target.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    /// Width or height is zero.
    #[error("target size {width}x{height} is empty")]
    Empty {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The framebuffer cannot hold this color space.
    #[error("color space {0:?} cannot be drawn by the GPU renderer")]
    ColorSpace(ColorSpace),
}

/// Handle to prepared shape or image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataId(u32);

/// Handle to an offscreen composition target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositorId(usize);

/// The framebuffer owned by the host.
#[derive(Clone, Copy, Debug)]
struct HostTarget {
    fbo: u32,
    width: u32,
    height: u32,
    cs: ColorSpace,
}

impl HostTarget {
    fn region(&self) -> RenderRegion {
        RenderRegion::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Device pixels to normalized device coordinates, with y pointing down.
    fn ortho(&self) -> Matrix {
        Matrix {
            e11: 2.0 / self.width as f32,
            e13: -1.0,
            e22: -2.0 / self.height as f32,
            e23: 1.0,
            ..Matrix::IDENTITY
        }
    }
}

#[derive(Debug)]
struct ShapeData {
    shape: RenderShape,
    fill: Option<Paint>,
    stroke: Option<Paint>,
    /// Transform scaling the meshes were built for.
    scale: f32,
}

#[derive(Debug)]
struct ImageData {
    source: Arc<RenderSurface>,
    texture: u32,
    /// Texel order, see [`TextureBlock`].
    format: i32,
}

#[derive(Debug)]
enum Content {
    Shape(Box<ShapeData>),
    Image(Box<ImageData>),
}

#[derive(Debug)]
struct RenderData {
    content: Content,
    geometry: GlGeometry,
    opacity: u8,
    clips: Vec<DataId>,
    clipper: bool,
    valid: bool,
}

/// An offscreen target lent out for composition.
#[derive(Debug)]
struct Compositor {
    /// The area drawn to, within the surface.
    region: RenderRegion,
    method: MaskMethod,
    opacity: u8,
    busy: bool,
    /// The pass drawn before a masking [`begin_composite`](RenderMethod::begin_composite).
    mask: Option<RenderPass>,
}

#[derive(Debug)]
struct PassEntry {
    pass: RenderPass,
    /// The compositor the pass draws for. `None` for the root pass.
    owner: Option<CompositorId>,
}

/// Vertices and indices staged for one draw.
#[derive(Clone, Debug)]
struct MeshRange {
    layouts: SmallVec<[VertexLayout; 2]>,
    index_offset: usize,
    index_count: i32,
}

impl MeshRange {
    fn draw(
        &self,
        program: Program,
        bindings: SmallVec<[Binding; 4]>,
        scissor: RenderRegion,
        depth: u32,
        blend: BlendState,
    ) -> DrawCall {
        DrawCall {
            program,
            bindings,
            layouts: self.layouts.clone(),
            index_offset: self.index_offset,
            index_count: self.index_count,
            scissor,
            depth,
            blend,
        }
    }

    /// Depth and stencil only, under the plain `mvp` transform.
    fn stencil(
        &self,
        program: Program,
        mvp: Binding,
        scissor: RenderRegion,
        depth: u32,
    ) -> DrawCall {
        self.draw(program, smallvec![mvp], scissor, depth, BlendState::SrcOver)
    }
}

/// The whole viewport in normalized device coordinates.
const FULL_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Every GL object of a renderer, apart from the recorded frame.
#[derive(Debug)]
struct Device<G: Gl> {
    gl: G,
    config: GlConfig,
    programs: ProgramCache,
    stage: StageBuffer,
    pool: TargetPool,
    /// Copy and scratch targets shared by the effects of a frame.
    effect_targets: Option<(RenderTarget, RenderTarget)>,
    /// Textures of disposed images, deleted once the frame using them is drawn.
    disposed: Vec<u32>,
}

impl<G: Gl> Device<G> {
    fn program(&mut self, key: ProgramKey) -> Option<Program> {
        // Failures are logged by the cache.
        self.programs.get(&mut self.gl, key).ok()
    }

    fn uniform<T: Pod>(&mut self, block: Block, value: &T) -> Binding {
        let offset = self.stage.push_uniform(value);
        Binding::Uniform {
            block,
            buffer: self.stage.buffer_id(),
            offset,
            size: size_of::<T>(),
        }
    }

    fn effect_uniform(&mut self, step: &EffectBlock) -> Binding {
        let block = step.block();
        match step {
            EffectBlock::Gaussian(b) => self.uniform(block, b),
            EffectBlock::DropShadow(b) => self.uniform(block, b),
            EffectBlock::Params(b) => self.uniform(block, b),
        }
    }

    fn positions(&mut self, vertices: &[[f32; 2]], indices: &[u32]) -> MeshRange {
        let offset = self.stage.push(vertices);
        MeshRange {
            layouts: smallvec![VertexLayout {
                index: 0,
                size: 2,
                stride: 8,
                offset,
            }],
            index_offset: self.stage.push_indices(indices),
            index_count: indices.len() as i32,
        }
    }

    fn mesh(&mut self, mesh: &Mesh) -> Option<MeshRange> {
        if mesh.indices.is_empty() {
            return None;
        }
        let vertices: Vec<[f32; 2]> = mesh.vertices.iter().map(|p| [p.x, p.y]).collect();
        Some(self.positions(&vertices, &mesh.indices))
    }

    /// A quad of `x, y, u, v` corners.
    fn textured(&mut self, corners: &[[f32; 4]]) -> MeshRange {
        let offset = self.stage.push(corners);
        MeshRange {
            layouts: smallvec![
                VertexLayout {
                    index: 0,
                    size: 2,
                    stride: 16,
                    offset,
                },
                VertexLayout {
                    index: 1,
                    size: 2,
                    stride: 16,
                    offset: offset + 8,
                },
            ],
            index_offset: self.stage.push_indices(&QUAD_INDICES),
            index_count: QUAD_INDICES.len() as i32,
        }
    }

    /// A quad covering `region` of the surface, sampling the same pixels of a target.
    fn region_quad(&mut self, region: &RenderRegion, surface: &HostTarget) -> MeshRange {
        let (w, h) = (surface.width as f32, surface.height as f32);
        let corner = |x: i32, y: i32| {
            let (x, y) = (x as f32, y as f32);
            [2.0 * x / w - 1.0, 1.0 - 2.0 * y / h, x / w, 1.0 - y / h]
        };
        let (lo, hi) = (region.min, region.max);
        self.textured(&[
            corner(lo.0, lo.1),
            corner(hi.0, lo.1),
            corner(hi.0, hi.1),
            corner(lo.0, hi.1),
        ])
    }

    fn acquire(&mut self, surface: &HostTarget) -> RenderTarget {
        self.pool.acquire(&mut self.gl, surface.width, surface.height)
    }

    /// How output lands under `blend`, acquiring a destination copy for complex methods.
    fn blend_state(
        &mut self,
        blend: BlendMethod,
        surface: &HostTarget,
    ) -> (BlendState, Option<RenderTarget>) {
        match blend {
            BlendMethod::Normal => (BlendState::SrcOver, None),
            BlendMethod::Add => (BlendState::Additive, None),
            _ => (BlendState::Replace, Some(self.acquire(surface))),
        }
    }

    /// Give back every target of a pass that will not be drawn.
    fn discard(&mut self, pass: &RenderPass) {
        let mut targets = vec![pass.target];
        pass.frame_targets(&mut targets);
        for target in targets {
            self.pool.release(target);
        }
    }

    fn effect_targets(&mut self, surface: &HostTarget) -> (RenderTarget, RenderTarget) {
        let samples = self.config.samples;
        *self.effect_targets.get_or_insert_with(|| {
            log::debug!("creating effect targets");
            (
                RenderTarget::new(&mut self.gl, surface.width, surface.height, samples),
                RenderTarget::new(&mut self.gl, surface.width, surface.height, samples),
            )
        })
    }

    /// Upload `image` premultiplied, returning the texture and its texel order.
    fn upload(&mut self, image: &RenderSurface) -> (u32, i32) {
        let mut pixels = image.clone();
        pixels.premultiply();
        let (w, h) = (pixels.w as usize, pixels.h as usize);
        let stride = pixels.stride as usize;
        let bytes: Vec<u8> = pixels
            .data
            .chunks(stride.max(1))
            .take(h)
            .flat_map(|row| row.iter().take(w).flat_map(|px| px.to_le_bytes()))
            .collect();

        let texture = self.gl.create_texture();
        self.gl.bind_texture(gl::TEXTURE_2D, texture);
        self.gl.tex_image_2d(
            gl::TEXTURE_2D,
            gl::RGBA8,
            w as i32,
            h as i32,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            Some(&bytes),
        );
        set_sampling(&mut self.gl);
        self.gl.bind_texture(gl::TEXTURE_2D, 0);
        log::debug!("uploaded {w}x{h} image as texture {texture}");
        (texture, i32::from(!pixels.cs.is_abgr()))
    }

    fn delete_disposed(&mut self) {
        for texture in self.disposed.drain(..) {
            self.gl.delete_texture(texture);
        }
    }

    fn delete_targets(&mut self) {
        if let Some((copy, scratch)) = self.effect_targets.take() {
            copy.delete(&mut self.gl);
            scratch.delete(&mut self.gl);
        }
    }
}

/// A tessellating OpenGL renderer implementing [`RenderMethod`].
///
/// Draws are recorded into render passes as the scene is traversed and replayed at
/// [`sync`](RenderMethod::sync), after all geometry and uniforms are uploaded in one go.
/// The frame is drawn into a multisampled offscreen target and then copied into the
/// host framebuffer set with [`set_target`](Self::set_target).
#[derive(Debug)]
pub struct GpuRenderer<G: Gl> {
    device: Device<G>,
    surface: Option<HostTarget>,
    /// Persistent frame contents, so undrawn areas keep the previous frame.
    root: Option<RenderTarget>,
    data: Vec<Option<RenderData>>,
    free: Vec<u32>,
    /// Passes of the frame being recorded, the root at the bottom.
    passes: Vec<PassEntry>,
    compositors: Vec<Compositor>,
    blend: BlendMethod,
    viewport: RenderRegion,
    clear_requested: bool,
}

impl<G: Gl> GpuRenderer<G> {
    /// Create a renderer drawing through `gl`, registering it with the engine.
    pub fn new(gl: G, config: GlConfig) -> Self {
        engine::acquire();
        Self {
            device: Device {
                gl,
                config,
                programs: ProgramCache::new(config.webgl),
                stage: StageBuffer::new(config.uniform_alignment),
                pool: TargetPool::new(config.samples),
                effect_targets: None,
                disposed: Vec::new(),
            },
            surface: None,
            root: None,
            data: Vec::new(),
            free: Vec::new(),
            passes: Vec::new(),
            compositors: Vec::new(),
            blend: BlendMethod::Normal,
            viewport: RenderRegion::default(),
            clear_requested: false,
        }
    }

    /// Draw into the host framebuffer `fbo` of `w` by `h` pixels.
    pub fn set_target(
        &mut self,
        fbo: u32,
        w: u32,
        h: u32,
        cs: ColorSpace,
    ) -> Result<(), TargetError> {
        let checked = if w == 0 || h == 0 {
            Err(TargetError::Empty {
                width: w,
                height: h,
            })
        } else if matches!(cs, ColorSpace::Grayscale8 | ColorSpace::Unknown) {
            Err(TargetError::ColorSpace(cs))
        } else {
            Ok(())
        };
        checked.inspect_err(|err| log::warn!("rejected render target: {err}"))?;

        self.sync();
        self.device.gl.make_current();
        let resized = self.surface.map_or(true, |s| s.width != w || s.height != h);
        if resized {
            if let Some(root) = self.root.take() {
                root.delete(&mut self.device.gl);
            }
            self.device.delete_targets();
            self.device.pool.trim(&mut self.device.gl, w, h);
        }
        self.surface = Some(HostTarget {
            fbo,
            width: w,
            height: h,
            cs,
        });
        self.viewport = RenderRegion::new(0, 0, w as i32, h as i32);
        Ok(())
    }

    /// The GL implementation the renderer draws with.
    pub fn gl(&self) -> &G {
        &self.device.gl
    }

    /// Mutable access to the GL implementation.
    pub fn gl_mut(&mut self) -> &mut G {
        &mut self.device.gl
    }

    fn alloc(&mut self) -> DataId {
        if let Some(id) = self.free.pop() {
            return DataId(id);
        }
        self.data.push(None);
        DataId((self.data.len() - 1) as u32)
    }

    /// The slot of `data`, allocating one when `data` is unset or stale.
    fn slot(&mut self, data: Option<DataId>) -> DataId {
        match data {
            Some(id) if self.data.get(id.0 as usize).is_some_and(Option::is_some) => id,
            _ => self.alloc(),
        }
    }

    fn retire(&mut self, data: RenderData) {
        if let Content::Image(image) = data.content {
            self.device.disposed.push(image.texture);
        }
    }

    /// The region draws into the current pass are restricted to.
    fn draw_clip(&self, surface: &HostTarget) -> RenderRegion {
        match self.passes.last().and_then(|e| e.owner) {
            Some(cmp) => self
                .compositors
                .get(cmp.0)
                .map_or(RenderRegion::default(), |c| c.region),
            None => self.viewport.intersection(&surface.region()),
        }
    }

    /// Record the paints of `id` into the current pass.
    fn draw_geometry(&mut self, id: DataId) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        if self.passes.is_empty() {
            log::warn!("draw outside of a frame");
            return false;
        }
        let scissor = self.draw_clip(&surface);
        if scissor.invalid() {
            return true;
        }
        let blend = self.blend.is_complex().then_some(self.blend);

        let Some(data) = self.data.get(id.0 as usize).and_then(Option::as_ref) else {
            return false;
        };
        if !data.valid {
            return true;
        }
        let Some(clips) = clip_geometries(&self.data, &data.clips) else {
            // An invisible clipper hides everything.
            return true;
        };
        let geometry = &data.geometry;
        let ortho = surface.ortho();

        let mut layers: SmallVec<[Layer<'_>; 2]> = SmallVec::new();
        match &data.content {
            Content::Shape(shape) => {
                let fill = shape.fill.as_ref().map(|p| Layer::Fill(p, geometry.fill_mode));
                let stroke = shape.stroke.as_ref().map(Layer::Stroke);
                let (first, second) = if shape.shape.stroke_first() {
                    (stroke, fill)
                } else {
                    (fill, stroke)
                };
                layers.extend(first);
                layers.extend(second);
            }
            Content::Image(image) => layers.push(Layer::Image(image, data.opacity)),
        }
        layers.retain(|layer| !layer.mesh(geometry).is_empty());
        if layers.is_empty() {
            return true;
        }

        let Some(entry) = self.passes.last_mut() else {
            return false;
        };
        let pass = &mut entry.pass;
        let depths: SmallVec<[u32; 2]> = layers.iter().map(|_| pass.next_depth()).collect();
        let clip_depth = pass.next_depth();
        let batching = clips.is_empty() && self.blend == BlendMethod::Normal;
        let device = &mut self.device;

        for (clip, rule) in clips {
            let Some(program) = device.program(ProgramKey::Stencil) else {
                return false;
            };
            let Some(range) = device.mesh(&clip.fill) else {
                return true;
            };
            let mvp = device.uniform(Block::Matrix, &MatrixBlock::new(&(ortho * clip.transform)));
            let stencil = range.stencil(program, mvp, scissor, clip_depth);
            let full = device.positions(&FULL_QUAD, &QUAD_INDICES);
            let identity = device.uniform(Block::Matrix, &MatrixBlock::new(&Matrix::IDENTITY));
            let cover = full.stencil(program, identity, scissor, clip_depth);
            pass.push(RenderTask::Clip {
                stencil,
                cover,
                rule,
            });
        }

        let model = ortho * geometry.transform;
        let mvp = device.uniform(Block::Matrix, &MatrixBlock::new(&model));
        for (layer, depth) in layers.iter().zip(depths) {
            if let (Layer::Fill(Paint::Solid(block), FillMode::Direct), true) = (layer, batching) {
                if let Some(program) = device.program(ProgramKey::SolidBatch) {
                    let projection = device.uniform(Block::Matrix, &MatrixBlock::new(&ortho));
                    pass.push(RenderTask::SolidBatch(SolidBatch::new(
                        program,
                        projection,
                        layer.mesh(geometry),
                        &geometry.transform,
                        block.color,
                        scissor,
                        depth,
                    )));
                    continue;
                }
            }
            let Some(program) = device.program(layer.program(blend)) else {
                continue;
            };
            let range = match layer {
                Layer::Image(..) => device.textured(&geometry.image),
                _ => match device.mesh(layer.mesh(geometry)) {
                    Some(range) => range,
                    None => continue,
                },
            };
            let mut bindings: SmallVec<[Binding; 4]> = smallvec![mvp];
            layer.bind(device, &mut bindings);

            let (state, copy) = device.blend_state(self.blend, &surface);
            if let Some(copy) = copy {
                bindings.push(Binding::Texture {
                    sampler: Sampler::Dst,
                    texture: copy.texture,
                });
            }
            let cover = range.draw(program, bindings, scissor, depth, state);

            let stencil_program = match layer {
                Layer::Stroke(_) | Layer::Fill(_, FillMode::Stencil(_)) => {
                    device.program(ProgramKey::Stencil)
                }
                _ => None,
            };
            let task = match (layer, stencil_program) {
                (Layer::Stroke(_), Some(stencil)) => RenderTask::Stroke {
                    stencil: range.stencil(stencil, mvp, scissor, depth),
                    cover,
                },
                (Layer::Fill(_, FillMode::Stencil(rule)), Some(stencil)) => {
                    RenderTask::StencilFill {
                        stencil: range.stencil(stencil, mvp, scissor, depth),
                        cover,
                        rule: *rule,
                    }
                }
                (Layer::Stroke(_) | Layer::Fill(_, FillMode::Stencil(_)), None) => {
                    if let Some(copy) = copy {
                        device.pool.release(copy);
                    }
                    continue;
                }
                _ => RenderTask::Draw(cover),
            };
            pass.push(match copy {
                Some(copy) => RenderTask::ComplexBlend {
                    copy,
                    task: Box::new(task),
                },
                None => task,
            });
        }
        true
    }

    /// Record the composition of `content` into the current pass.
    fn compose(
        &mut self,
        content: RenderPass,
        mask: Option<RenderPass>,
        cmp: CompositorId,
    ) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        let Some(c) = self.compositors.get(cmp.0) else {
            return false;
        };
        let (region, method, opacity) = (c.region, c.method, c.opacity);
        let scissor = region.intersection(&self.draw_clip(&surface));
        let discard = |device: &mut Device<G>, content: &RenderPass, mask: &Option<RenderPass>| {
            device.discard(content);
            if let Some(mask) = mask {
                device.discard(mask);
            }
        };
        if scissor.invalid() || self.passes.is_empty() {
            discard(&mut self.device, &content, &mask);
            return scissor.invalid();
        }

        let key = match (&mask, self.blend) {
            (Some(_), _) => ProgramKey::Mask(method),
            (None, blend) if blend.is_complex() => ProgramKey::Blend(blend, BlendSource::Scene),
            _ => ProgramKey::Blit,
        };
        let Some(program) = self.device.program(key) else {
            discard(&mut self.device, &content, &mask);
            return false;
        };
        let (state, copy) = if mask.is_some() {
            (BlendState::SrcOver, None)
        } else {
            self.device.blend_state(self.blend, &surface)
        };

        let device = &mut self.device;
        let quad = device.region_quad(&region, &surface);
        let mut bindings: SmallVec<[Binding; 4]> = smallvec![
            device.uniform(Block::ColorInfo, &TextureBlock::new(0, opacity)),
            Binding::Texture {
                sampler: Sampler::Src,
                texture: content.target.texture,
            },
        ];
        if let Some(mask) = &mask {
            bindings.push(Binding::Texture {
                sampler: Sampler::Mask,
                texture: mask.target.texture,
            });
        }
        if let Some(copy) = copy {
            bindings.push(Binding::Texture {
                sampler: Sampler::Dst,
                texture: copy.texture,
            });
        }

        let Some(parent) = self.passes.last_mut() else {
            return false;
        };
        let depth = parent.pass.next_depth();
        let mut passes: Vec<RenderPass> = mask.into_iter().collect();
        passes.push(content);
        let task = RenderTask::Compose(ComposeTask {
            passes,
            draw: quad.draw(program, bindings, scissor, depth, state),
        });
        parent.pass.push(match copy {
            Some(copy) => RenderTask::ComplexBlend {
                copy,
                task: Box::new(task),
            },
            None => task,
        });
        true
    }

    /// Pop the pass of `cmp`, which must be the current one.
    fn pop_pass(&mut self, cmp: CompositorId) -> Option<RenderPass> {
        if self.passes.last().and_then(|e| e.owner) != Some(cmp) {
            log::warn!("compositor {cmp:?} is not the current target");
            return None;
        }
        self.passes.pop().map(|e| e.pass)
    }

    fn effect_draw(
        &mut self,
        step: &EffectStep,
        region: RenderRegion,
        surface: &HostTarget,
        (copy, scratch): (RenderTarget, RenderTarget),
    ) -> Option<DrawCall> {
        let device = &mut self.device;
        let program = device.program(ProgramKey::Effect(step.program))?;
        let quad = device.region_quad(&region, surface);
        let mut bindings: SmallVec<[Binding; 4]> = smallvec![device.effect_uniform(&step.block)];
        for (sampler, input) in &step.inputs {
            let texture = match input {
                EffectInput::Copy => copy.texture,
                EffectInput::Scratch => scratch.texture,
            };
            bindings.push(Binding::Texture {
                sampler: *sampler,
                texture,
            });
        }
        Some(quad.draw(program, bindings, region, 0, BlendState::Replace))
    }
}

impl<G: Gl> Drop for GpuRenderer<G> {
    fn drop(&mut self) {
        self.sync();
        let device = &mut self.device;
        device.gl.make_current();
        for data in self.data.drain(..).flatten() {
            if let Content::Image(image) = data.content {
                device.disposed.push(image.texture);
            }
        }
        device.delete_disposed();
        if let Some(root) = self.root.take() {
            root.delete(&mut device.gl);
        }
        device.delete_targets();
        device.pool.delete(&mut device.gl);
        device.stage.delete(&mut device.gl);
        log::debug!("deleting {} programs", device.programs.len());
        device.programs.delete(&mut device.gl);
        engine::release();
    }
}

/// One paint of a shape or image, in drawing order.
#[derive(Debug)]
enum Layer<'a> {
    Fill(&'a Paint, FillMode),
    Stroke(&'a Paint),
    Image(&'a ImageData, u8),
}

impl Layer<'_> {
    fn mesh<'g>(&self, geometry: &'g GlGeometry) -> &'g Mesh {
        match self {
            Self::Fill(..) | Self::Image(..) => &geometry.fill,
            Self::Stroke(_) => &geometry.stroke,
        }
    }

    fn program(&self, blend: Option<BlendMethod>) -> ProgramKey {
        match (self, blend) {
            (Self::Fill(paint, _) | Self::Stroke(paint), _) => paint.program(blend),
            (Self::Image(..), None) => ProgramKey::Image,
            (Self::Image(..), Some(method)) => ProgramKey::Blend(method, BlendSource::Image),
        }
    }

    /// Push the paint uniforms and textures.
    fn bind<G: Gl>(&self, device: &mut Device<G>, bindings: &mut SmallVec<[Binding; 4]>) {
        match self {
            Self::Fill(paint, _) | Self::Stroke(paint) => match paint {
                Paint::Solid(block) => bindings.push(device.uniform(Block::ColorInfo, block)),
                Paint::Linear { block, inverse } | Paint::Radial { block, inverse } => {
                    bindings.push(device.uniform(Block::InvMatrix, &MatrixBlock::new(inverse)));
                    bindings.push(device.uniform(Block::GradientInfo, block));
                }
            },
            Self::Image(image, opacity) => {
                bindings.push(device.uniform(
                    Block::ColorInfo,
                    &TextureBlock::new(image.format, *opacity),
                ));
                bindings.push(Binding::Texture {
                    sampler: Sampler::Image,
                    texture: image.texture,
                });
            }
        }
    }
}

/// The fill geometry and rule of every clipper, or `None` if one of them hides
/// everything.
fn clip_geometries<'a>(
    data: &'a [Option<RenderData>],
    clips: &[DataId],
) -> Option<SmallVec<[(&'a GlGeometry, FillRule); 2]>> {
    clips
        .iter()
        .map(|id| {
            let clip = data.get(id.0 as usize)?.as_ref()?;
            if !clip.valid || clip.geometry.fill.is_empty() {
                return None;
            }
            let rule = match clip.geometry.fill_mode {
                FillMode::Stencil(rule) => rule,
                FillMode::Direct => FillRule::NonZero,
            };
            Some((&clip.geometry, rule))
        })
        .collect()
}

impl<G: Gl> RenderMethod for GpuRenderer<G> {
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
        let id = self.slot(data);
        let idx = id.0 as usize;
        let fresh = !matches!(
            self.data[idx],
            Some(RenderData {
                content: Content::Shape(_),
                ..
            })
        );
        if !fresh && flags.is_empty() {
            return Some(id);
        }
        if fresh {
            if let Some(old) = self.data[idx].take() {
                self.retire(old);
            }
            self.data[idx] = Some(RenderData {
                content: Content::Shape(Box::new(ShapeData {
                    shape: RenderShape::default(),
                    fill: None,
                    stroke: None,
                    scale: 0.0,
                })),
                geometry: GlGeometry::default(),
                opacity: 0,
                clips: Vec::new(),
                clipper,
                valid: false,
            });
        }
        let data = self.data[idx].as_mut()?;
        let Content::Shape(sd) = &mut data.content else {
            return None;
        };

        let scale = transform.scaling();
        let rescaled = !equal(sd.scale, scale);
        let outline_changed = flags.intersects(RenderUpdateFlag::PATH | RenderUpdateFlag::STROKE);
        if fresh || rescaled || outline_changed {
            let visible_fill = shape.fill.is_some() || shape.color.a > 0;
            if visible_fill || clipper {
                data.geometry.tessellate_fill(shape, transform);
            } else {
                data.geometry.clear_fill(shape);
            }
            data.geometry.stroke(shape, transform);
            sd.scale = scale;
        }
        data.geometry.transform = *transform;

        let paints = RenderUpdateFlag::COLOR
            | RenderUpdateFlag::GRADIENT
            | RenderUpdateFlag::GRADIENT_STROKE
            | RenderUpdateFlag::STROKE;
        if fresh || flags.intersects(paints) || data.opacity != opacity {
            sd.fill = Paint::new(shape.fill.as_ref(), shape.color, opacity);
            sd.stroke = shape
                .stroke
                .as_ref()
                .filter(|s| s.width > 0.0)
                .and_then(|s| Paint::new(s.fill.as_ref(), s.color, opacity));
        }
        sd.shape.clone_from(shape);

        data.opacity = opacity;
        data.clips = clips.to_vec();
        data.clipper = clipper;
        data.valid = opacity > 0 || clipper;
        Some(id)
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
        let id = self.slot(data);
        let idx = id.0 as usize;
        let current = match &self.data[idx] {
            Some(RenderData {
                content: Content::Image(img),
                ..
            }) => Arc::ptr_eq(&img.source, image),
            _ => false,
        };
        if current && flags.is_empty() {
            return Some(id);
        }
        if !current {
            if let Some(old) = self.data[idx].take() {
                self.retire(old);
            }
            self.device.gl.make_current();
            let (texture, format) = self.device.upload(image);
            let mut geometry = GlGeometry::default();
            geometry.image(image.w, image.h);
            self.data[idx] = Some(RenderData {
                content: Content::Image(Box::new(ImageData {
                    source: Arc::clone(image),
                    texture,
                    format,
                })),
                geometry,
                opacity,
                clips: Vec::new(),
                clipper: false,
                valid: false,
            });
        }

        let data = self.data[idx].as_mut()?;
        data.geometry.transform = *transform;
        data.opacity = opacity;
        data.clips = clips.to_vec();
        data.valid = opacity > 0;
        Some(id)
    }

    fn pre_render(&mut self) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        if !self.passes.is_empty() {
            log::warn!("previous frame was never synced, dropping it");
            for entry in mem::take(&mut self.passes) {
                self.device.discard(&entry.pass);
            }
        }
        let device = &mut self.device;
        device.gl.make_current();
        device.stage.clear();
        device.stage.ensure(&mut device.gl);

        let (root, fresh) = match self.root {
            Some(root) => (root, false),
            None => {
                let samples = device.config.samples;
                let root =
                    RenderTarget::new(&mut device.gl, surface.width, surface.height, samples);
                self.root = Some(root);
                (root, true)
            }
        };
        let clear = (fresh || self.clear_requested).then_some(device.config.clear_color);
        self.clear_requested = false;
        self.passes.push(PassEntry {
            pass: RenderPass::new(root, clear),
            owner: None,
        });
        true
    }

    fn render_shape(&mut self, data: DataId) -> bool {
        self.draw_geometry(data)
    }

    fn render_image(&mut self, data: DataId) -> bool {
        self.draw_geometry(data)
    }

    fn post_render(&mut self) -> bool {
        if self.passes.len() > 1 {
            log::warn!("{} compositions left open", self.passes.len() - 1);
        }
        true
    }

    fn dispose(&mut self, data: DataId) {
        if let Some(entry) = self.data.get_mut(data.0 as usize) {
            if let Some(old) = entry.take() {
                self.retire(old);
                self.free.push(data.0);
            }
        }
    }

    fn region(&mut self, data: DataId) -> RenderRegion {
        match self.data.get(data.0 as usize).and_then(Option::as_ref) {
            Some(data) if data.valid => data.geometry.region(),
            _ => RenderRegion::default(),
        }
    }

    fn bounds(&mut self, data: DataId, transform: &Matrix) -> Option<[Point; 4]> {
        let data = self.data.get(data.0 as usize)?.as_ref()?;
        match &data.content {
            Content::Shape(sd) => {
                let (mut min, mut max) = sd.shape.path.bounds()?;
                let half = sd.shape.stroke_width() * 0.5;
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
            Content::Image(_) => data.geometry.corners(transform),
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
        self.surface.map_or(ColorSpace::Abgr8888, |s| s.cs)
    }

    fn clear(&mut self) -> bool {
        if self.surface.is_none() {
            return false;
        }
        match self.passes.first_mut() {
            Some(root) => root.pass.set_clear(self.device.config.clear_color),
            None => self.clear_requested = true,
        }
        true
    }

    fn sync(&mut self) -> bool {
        let device = &mut self.device;
        device.gl.make_current();
        if !self.passes.is_empty() {
            let mut passes = mem::take(&mut self.passes).into_iter();
            let root = passes.next();
            for open in passes {
                log::warn!("composition {:?} never ended", open.owner);
                device.discard(&open.pass);
            }
            for c in &mut self.compositors {
                if let Some(mask) = c.mask.take() {
                    device.discard(&mask);
                }
            }
            self.compositors.clear();

            if let Some(mut root) = root {
                root.pass.stage(&mut device.stage);
                device.stage.flush(&mut device.gl);
                device.stage.bind(&mut device.gl);
                root.pass.run(&mut device.gl);
                device.stage.unbind(&mut device.gl);
                if let Some(surface) = self.surface {
                    root.pass.target.copy_to(&mut device.gl, surface.fbo);
                }
                log::trace!("frame issued {} draws", root.pass.draws());

                let mut targets = Vec::new();
                root.pass.frame_targets(&mut targets);
                for target in targets {
                    device.pool.release(target);
                }
                if device.pool.in_use() > 0 {
                    log::debug!("{} offscreen targets still lent out", device.pool.in_use());
                }
            }
        }
        device.delete_disposed();
        true
    }

    fn target(
        &mut self,
        region: &RenderRegion,
        _cs: ColorSpace,
        _flags: CompositionFlag,
    ) -> Option<CompositorId> {
        let surface = self.surface?;
        if self.passes.is_empty() {
            log::warn!("composition outside of a frame");
            return None;
        }
        let bbox = region.intersection(&surface.region());
        if bbox.invalid() {
            return None;
        }
        let target = self.device.acquire(&surface);
        let compositor = Compositor {
            region: bbox,
            method: MaskMethod::None,
            opacity: 255,
            busy: true,
            mask: None,
        };
        let idx = match self.compositors.iter().position(|c| !c.busy) {
            Some(idx) => {
                self.compositors[idx] = compositor;
                idx
            }
            None => {
                self.compositors.push(compositor);
                self.compositors.len() - 1
            }
        };
        self.passes.push(PassEntry {
            pass: RenderPass::new(target, Some([0.0; 4])),
            owner: Some(CompositorId(idx)),
        });
        Some(CompositorId(idx))
    }

    fn begin_composite(&mut self, cmp: CompositorId, method: MaskMethod, opacity: u8) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        let Some(c) = self.compositors.get_mut(cmp.0) else {
            return false;
        };
        c.method = method;
        c.opacity = opacity;
        if method == MaskMethod::None {
            return true;
        }
        // What was drawn so far is the mask; the content gets a pass of its own.
        let Some(mask) = self.pop_pass(cmp) else {
            return false;
        };
        let target = self.device.acquire(&surface);
        if let Some(c) = self.compositors.get_mut(cmp.0) {
            c.mask = Some(mask);
        }
        self.passes.push(PassEntry {
            pass: RenderPass::new(target, Some([0.0; 4])),
            owner: Some(cmp),
        });
        true
    }

    fn end_composite(&mut self, cmp: CompositorId) -> bool {
        let Some(c) = self.compositors.get_mut(cmp.0) else {
            return false;
        };
        let busy = mem::replace(&mut c.busy, false);
        let mask = c.mask.take();
        // Already drawn by a direct effect.
        if !busy {
            if let Some(mask) = mask {
                self.device.discard(&mask);
            }
            return true;
        }
        let Some(content) = self.pop_pass(cmp) else {
            if let Some(mask) = mask {
                self.device.discard(&mask);
            }
            return false;
        };
        self.compose(content, mask, cmp)
    }

    fn render_effect(&mut self, cmp: CompositorId, effect: &RenderEffect, direct: bool) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };
        let Some(region) = self.compositors.get(cmp.0).map(|c| c.region) else {
            return false;
        };
        let Some(plan) = effect::plan(effect) else {
            return true;
        };
        let targets = self.device.effect_targets(&surface);
        let first = match &plan.first {
            Some(step) => match self.effect_draw(step, region, &surface, targets) {
                Some(draw) => Some(draw),
                None => return false,
            },
            None => None,
        };
        let Some(last) = self.effect_draw(&plan.last, region, &surface, targets) else {
            return false;
        };
        let Some(entry) = self.passes.iter_mut().rev().find(|e| e.owner == Some(cmp)) else {
            log::warn!("effect on compositor {cmp:?} that has no pass");
            return false;
        };
        entry.pass.push(RenderTask::Effect(EffectTask {
            kind: plan.last.program,
            region,
            copy: targets.0,
            scratch: targets.1,
            first,
            last,
        }));

        if !direct {
            return true;
        }
        let Some(content) = self.pop_pass(cmp) else {
            return false;
        };
        let drawn = self.compose(content, None, cmp);
        if let Some(c) = self.compositors.get_mut(cmp.0) {
            c.busy = false;
        }
        drawn
    }

    fn intersects_shape(&mut self, data: DataId, region: &RenderRegion) -> bool {
        match self.data.get(data.0 as usize).and_then(Option::as_ref) {
            Some(d) if d.valid && matches!(d.content, Content::Shape(_)) => {
                d.geometry.intersects(region)
            }
            _ => false,
        }
    }

    fn intersects_image(&mut self, data: DataId, region: &RenderRegion) -> bool {
        match self.data.get(data.0 as usize).and_then(Option::as_ref) {
            Some(d) if d.valid && matches!(d.content, Content::Image(_)) => {
                d.geometry.intersects(region)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::RecordingGl;

    #[test]
    fn ortho_maps_the_surface_to_clip_space() {
        let surface = HostTarget {
            fbo: 0,
            width: 200,
            height: 100,
            cs: ColorSpace::Abgr8888,
        };
        let m = surface.ortho();
        let top_left = Point::ZERO.transform(&m);
        let bottom_right = Point::new(200.0, 100.0).transform(&m);
        assert!(top_left.approx_eq(Point::new(-1.0, 1.0)));
        assert!(bottom_right.approx_eq(Point::new(1.0, -1.0)));
    }

    #[test]
    fn empty_and_gray_targets_are_rejected() {
        let mut renderer = GpuRenderer::new(RecordingGl::new(), GlConfig::default());
        assert_eq!(
            renderer.set_target(0, 0, 10, ColorSpace::Abgr8888),
            Err(TargetError::Empty {
                width: 0,
                height: 10
            })
        );
        assert_eq!(
            renderer.set_target(0, 10, 10, ColorSpace::Grayscale8),
            Err(TargetError::ColorSpace(ColorSpace::Grayscale8))
        );
        assert!(renderer.set_target(0, 10, 10, ColorSpace::Argb8888).is_ok());
        assert_eq!(renderer.color_space(), ColorSpace::Argb8888);
    }

    #[test]
    fn default_config_is_multisampled_desktop_gl() {
        let config = GlConfig::default();
        assert_eq!(config.samples, 4);
        assert!(!config.webgl);
    }
}
