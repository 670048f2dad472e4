// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linked programs, created on first use and kept for the renderer's lifetime.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use thiserror::Error;

use crate::gl::{self, Gl};
use crate::shader::{self, Block, ProgramKey, Sampler, DEPTH_UNIFORM};

/// Errors from building a program of the shader bank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// A shader stage was rejected by the driver.
    #[error("a shader of program `{name}` failed to compile: {log}")]
    Compile {
        /// Program name.
        name: String,
        /// Driver info log.
        log: String,
    },
    /// The stages compiled but did not link.
    #[error("program `{name}` failed to link: {log}")]
    Link {
        /// Program name.
        name: String,
        /// Driver info log.
        log: String,
    },
}

/// A linked program.
///
/// Uniform blocks are attached to [`Block::binding`] and samplers to [`Sampler::unit`]
/// once at link time, so drawing only binds buffer ranges and textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Program {
    pub(crate) id: u32,
    depth: Option<i32>,
}

impl Program {
    fn link<G: Gl>(gl: &mut G, key: ProgramKey, webgl: bool) -> Result<Self, ProgramError> {
        let name = key.name();
        let source = shader::source(key, webgl);

        let vertex = compile(gl, gl::VERTEX_SHADER, &source.vertex, &name)?;
        let fragment = match compile(gl, gl::FRAGMENT_SHADER, &source.fragment, &name) {
            Ok(fragment) => fragment,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(e);
            }
        };

        let id = gl.create_program();
        gl.attach_shader(id, vertex);
        gl.attach_shader(id, fragment);
        gl.link_program(id);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        if !gl.program_link_status(id) {
            let log = gl.program_info_log(id);
            gl.delete_program(id);
            return Err(ProgramError::Link { name, log });
        }

        for block in Block::ALL {
            let decl = format!("uniform {} {{", block.name());
            if !source.vertex.contains(&decl) && !source.fragment.contains(&decl) {
                continue;
            }
            if let Some(index) = gl.uniform_block_index(id, block.name()) {
                gl.uniform_block_binding(id, index, block.binding());
            }
        }

        gl.use_program(id);
        for sampler in Sampler::ALL {
            let decl = format!("uniform sampler2D {};", sampler.name());
            if !source.fragment.contains(&decl) {
                continue;
            }
            if let Some(location) = gl.uniform_location(id, sampler.name()) {
                gl.uniform_1i(location, sampler.unit() as i32);
            }
        }
        gl.use_program(0);

        log::debug!("linked program `{name}` as {id}");
        Ok(Self {
            id,
            depth: gl.uniform_location(id, DEPTH_UNIFORM),
        })
    }

    /// Use the program and set its draw depth.
    pub(crate) fn bind<G: Gl>(&self, gl: &mut G, depth: f32) {
        gl.use_program(self.id);
        if let Some(location) = self.depth {
            gl.uniform_1f(location, depth);
        }
    }
}

fn compile<G: Gl>(gl: &mut G, kind: u32, source: &str, name: &str) -> Result<u32, ProgramError> {
    let shader = gl.create_shader(kind);
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if gl.shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = gl.shader_info_log(shader);
    gl.delete_shader(shader);
    Err(ProgramError::Compile {
        name: name.to_owned(),
        log,
    })
}

/// Every program linked so far, and every one that failed.
///
/// A failed program is not rebuilt; draws that need it are skipped.
#[derive(Debug, Default)]
pub(crate) struct ProgramCache {
    programs: HashMap<ProgramKey, Program>,
    failed: HashMap<ProgramKey, ProgramError>,
    webgl: bool,
}

impl ProgramCache {
    pub(crate) fn new(webgl: bool) -> Self {
        Self {
            webgl,
            ..Self::default()
        }
    }

    pub(crate) fn get<G: Gl>(
        &mut self,
        gl: &mut G,
        key: ProgramKey,
    ) -> Result<Program, ProgramError> {
        match self.programs.entry(key) {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(slot) => {
                if let Some(e) = self.failed.get(&key) {
                    return Err(e.clone());
                }
                match Program::link(gl, key, self.webgl) {
                    Ok(program) => Ok(*slot.insert(program)),
                    Err(e) => {
                        log::error!("{e}");
                        self.failed.insert(key, e.clone());
                        Err(e)
                    }
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.programs.len()
    }

    pub(crate) fn delete<G: Gl>(&mut self, gl: &mut G) {
        for (_, program) in self.programs.drain() {
            gl.delete_program(program.id);
        }
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};
    use crate::shader::{BlendSource, EffectProgram};
    use tvg_common::blend::{BlendMethod, MaskMethod};

    #[test]
    fn programs_link_once() {
        let mut gl = RecordingGl::new();
        let mut cache = ProgramCache::new(false);
        let first = cache.get(&mut gl, ProgramKey::Color).unwrap();
        let again = cache.get(&mut gl, ProgramKey::Color).unwrap();
        assert_eq!(first, again);
        assert_eq!(gl.count(|c| matches!(c, GlCall::LinkProgram(_))), 1);
        assert_eq!(cache.len(), 1);
        // Both stages are released once linked.
        assert_eq!(gl.count(|c| matches!(c, GlCall::DeleteShader(_))), 2);
    }

    #[test]
    fn blocks_and_samplers_are_bound_at_link() {
        let mut gl = RecordingGl::new();
        let mut cache = ProgramCache::new(false);
        let key = ProgramKey::Blend(BlendMethod::Screen, BlendSource::Linear);
        let program = cache.get(&mut gl, key).unwrap();
        let bindings: Vec<u32> = gl
            .calls
            .iter()
            .filter_map(|c| match c {
                GlCall::UniformBlockBinding { program: p, binding, .. } if *p == program.id => {
                    Some(*binding)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            bindings,
            vec![
                Block::Matrix.binding(),
                Block::InvMatrix.binding(),
                Block::GradientInfo.binding()
            ]
        );
        // Only the destination sampler is set.
        assert_eq!(gl.count(|c| matches!(c, GlCall::Uniform1i(_, _))), 1);
        let dst = Sampler::Dst.unit() as i32;
        assert!(gl
            .calls
            .iter()
            .any(|c| matches!(c, GlCall::Uniform1i(_, unit) if *unit == dst)));
    }

    #[test]
    fn drop_shadow_uses_two_samplers() {
        let mut gl = RecordingGl::new();
        let mut cache = ProgramCache::new(true);
        cache
            .get(&mut gl, ProgramKey::Effect(EffectProgram::DropShadow))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, GlCall::Uniform1i(_, _))), 2);
        let blocks = gl.count(|c| matches!(c, GlCall::UniformBlockBinding { .. }));
        assert_eq!(blocks, 1);
    }

    #[test]
    fn compile_failure_is_remembered() {
        let mut gl = RecordingGl::new();
        gl.fail_compile = Some("uMaskTexture".into());
        let mut cache = ProgramCache::new(false);
        let key = ProgramKey::Mask(MaskMethod::Luma);
        let err = cache.get(&mut gl, key).unwrap_err();
        assert!(matches!(err, ProgramError::Compile { ref name, .. } if name == "mask_luma"));
        let shaders = gl.count(|c| matches!(c, GlCall::CreateShader(_)));
        assert_eq!(cache.get(&mut gl, key), Err(err));
        assert_eq!(gl.count(|c| matches!(c, GlCall::CreateShader(_))), shaders);
        // Other programs are unaffected.
        assert!(cache.get(&mut gl, ProgramKey::Blit).is_ok());
    }

    #[test]
    fn link_failure_deletes_the_program() {
        let mut gl = RecordingGl::new();
        gl.fail_link = true;
        let mut cache = ProgramCache::new(false);
        let err = cache.get(&mut gl, ProgramKey::Stencil).unwrap_err();
        assert!(matches!(err, ProgramError::Link { .. }));
        assert_eq!(gl.count(|c| matches!(c, GlCall::DeleteProgram(_))), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn delete_releases_everything() {
        let mut gl = RecordingGl::new();
        let mut cache = ProgramCache::new(false);
        cache.get(&mut gl, ProgramKey::Color).unwrap();
        cache.get(&mut gl, ProgramKey::Image).unwrap();
        cache.delete(&mut gl);
        assert_eq!(gl.count(|c| matches!(c, GlCall::DeleteProgram(_))), 2);
        assert_eq!(cache.len(), 0);
    }
}
