// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A software [`GlContext`] with no rasterizer.
//!
//! `HeadlessGl` keeps real buffer contents, texture and program objects, the
//! sticky GL error flag and a log of every state-changing call. Its GLSL ES
//! 3.00 front end checks structure and reports errors in the usual
//! `ERROR: 0:LINE: ...` driver format, and derives the active attributes,
//! uniforms and std140 uniform blocks a real driver would report. Pixels are
//! never produced.

use super::gl::consts::*;
use super::gl::{GlActiveInfo, GlContext, GlName};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;

/// One recorded GL call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    BindBuffer { target: u32, buffer: GlName },
    BufferData { target: u32, size: i32 },
    BufferSubData { target: u32, offset: i32, len: usize },
    GetBufferSubData { target: u32, offset: i32, len: usize },
    BindBufferRange { target: u32, index: u32, buffer: GlName, offset: i32, size: i32 },
    CopyBufferSubData { read_offset: i32, write_offset: i32, size: i32 },
    ActiveTexture(u32),
    BindTexture { target: u32, texture: GlName },
    TexStorage { target: u32, levels: i32, internal_format: u32 },
    TexSubImage { target: u32, level: i32, width: i32, height: i32, depth: i32 },
    TexParameter { target: u32, pname: u32, value: i32 },
    BindSampler { unit: u32, sampler: GlName },
    CompileShader(GlName),
    BindAttribLocation { program: GlName, index: u32, name: String },
    LinkProgram(GlName),
    UseProgram(GlName),
    GetActiveAttributes(GlName),
    GetActiveUniforms(GlName),
    GetActiveUniformBlocks(GlName),
    UniformBlockBinding { program: GlName, index: u32, binding: u32 },
    Uniform1i { location: u32, value: i32 },
    BindVertexArray(GlName),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer { index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32, integer: bool },
    VertexAttribDivisor { index: u32, divisor: u32 },
    BindFramebuffer { target: u32, framebuffer: GlName },
    FramebufferTexture { attachment: u32, texture: GlName, level: i32, layer: Option<i32> },
    DrawBuffers(Vec<u32>),
    InvalidateFramebuffer(Vec<u32>),
    ClearBufferfv { draw_buffer: u32, value: [f32; 4] },
    ClearBufferiv { draw_buffer: u32, value: [i32; 4] },
    ClearBufferuiv { draw_buffer: u32, value: [u32; 4] },
    ClearBufferfi { depth: f32, stencil: i32 },
    Enable(u32),
    Disable(u32),
    CullFace(u32),
    FrontFace(u32),
    DepthFunc(u32),
    DepthMask(bool),
    DepthRange(f32, f32),
    StencilFuncSeparate { face: u32, func: u32, reference: i32, mask: u32 },
    StencilOpSeparate { face: u32, fail: u32, depth_fail: u32, pass: u32 },
    StencilMaskSeparate { face: u32, mask: u32 },
    PolygonOffset { factor: f32, units: f32 },
    BlendFuncSeparate { src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32 },
    BlendEquationSeparate { rgb: u32, alpha: u32 },
    BlendColor([f32; 4]),
    ColorMask([bool; 4]),
    Viewport([i32; 4]),
    Scissor([i32; 4]),
    DrawArrays { mode: u32, first: i32, count: i32, instances: i32 },
    DrawElements { mode: u32, count: i32, index_type: u32, offset: i32, instances: i32 },
    Flush,
    Finish,
}

impl GlCall {
    /// `true` for `DrawArrays` / `DrawElements`.
    pub fn is_draw(&self) -> bool {
        matches!(self, GlCall::DrawArrays { .. } | GlCall::DrawElements { .. })
    }
}

#[derive(Debug)]
struct TextureObject {
    target: u32,
    levels: i32,
    size: [i32; 3],
}

#[derive(Debug)]
struct ShaderObject {
    shader_type: u32,
    source: String,
    compiled: Option<glsl::Interface>,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<GlName>,
    attrib_bindings: HashMap<String, u32>,
    linked: Option<glsl::LinkedProgram>,
    log: String,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_name: u32,
    error: u32,
    lost: bool,
    lost_reported: bool,
    memory_budget: Option<usize>,
    allocated: usize,
    buffers: HashMap<GlName, Vec<u8>>,
    buffer_bindings: HashMap<u32, GlName>,
    textures: HashMap<GlName, Option<TextureObject>>,
    active_unit: u32,
    texture_bindings: HashMap<(u32, u32), GlName>,
    samplers: HashSet<GlName>,
    shaders: HashMap<GlName, ShaderObject>,
    programs: HashMap<GlName, ProgramObject>,
    current_program: GlName,
    vertex_arrays: HashSet<GlName>,
    framebuffers: HashMap<GlName, Vec<u32>>,
    draw_framebuffer: GlName,
    enabled: HashSet<u32>,
}

impl HeadlessState {
    fn alloc_name(&mut self) -> GlName {
        self.next_name += 1;
        self.next_name
    }

    fn set_error(&mut self, code: u32) {
        if self.error == NO_ERROR {
            self.error = code;
        }
    }

    fn bound_buffer(&mut self, target: u32) -> Option<GlName> {
        match self.buffer_bindings.get(&target).copied().unwrap_or(0) {
            0 => {
                self.set_error(INVALID_OPERATION);
                None
            }
            name => Some(name),
        }
    }

    fn range_ok(&mut self, buffer: GlName, offset: i32, len: usize) -> bool {
        let size = self.buffers.get(&buffer).map_or(0, Vec::len);
        let ok = offset >= 0 && (offset as usize).checked_add(len).is_some_and(|end| end <= size);
        if !ok {
            self.set_error(INVALID_VALUE);
        }
        ok
    }

    fn texture_target(target: u32) -> u32 {
        if (TEXTURE_CUBE_MAP_POSITIVE_X..TEXTURE_CUBE_MAP_POSITIVE_X + 6).contains(&target) {
            TEXTURE_CUBE_MAP
        } else {
            target
        }
    }

    fn bound_texture(&mut self, target: u32) -> Option<GlName> {
        let key = (self.active_unit, Self::texture_target(target));
        match self.texture_bindings.get(&key).copied().unwrap_or(0) {
            0 => {
                self.set_error(INVALID_OPERATION);
                None
            }
            name => Some(name),
        }
    }

    fn linked_program(&self, program: GlName) -> Option<&glsl::LinkedProgram> {
        self.programs.get(&program).and_then(|p| p.linked.as_ref())
    }
}

/// Software GL context for headless operation and tests.
#[derive(Debug)]
pub struct HeadlessGl {
    state: RefCell<HeadlessState>,
    calls: RefCell<Vec<GlCall>>,
    parameters: HashMap<u32, i32>,
    extensions: HashSet<String>,
}

impl Default for HeadlessGl {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessGl {
    /// A context reporting typical desktop WebGL2 limits.
    pub fn new() -> Self {
        let parameters = [
            (MAX_TEXTURE_SIZE, 8192),
            (MAX_3D_TEXTURE_SIZE, 2048),
            (MAX_ARRAY_TEXTURE_LAYERS, 256),
            (MAX_CUBE_MAP_TEXTURE_SIZE, 8192),
            (MAX_VERTEX_ATTRIBS, 16),
            (MAX_TEXTURE_IMAGE_UNITS, 16),
            (MAX_COMBINED_TEXTURE_IMAGE_UNITS, 64),
            (MAX_UNIFORM_BUFFER_BINDINGS, 72),
            (MAX_UNIFORM_BLOCK_SIZE, 65536),
            (MAX_VERTEX_UNIFORM_BLOCKS, 12),
            (MAX_FRAGMENT_UNIFORM_BLOCKS, 12),
            (MAX_COLOR_ATTACHMENTS, 8),
            (MAX_DRAW_BUFFERS, 8),
            (UNIFORM_BUFFER_OFFSET_ALIGNMENT, 256),
            (MAX_SAMPLES, 4),
        ]
        .into_iter()
        .collect();
        let extensions = ["EXT_color_buffer_float", "OES_texture_float_linear", "EXT_texture_filter_anisotropic"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self {
            state: RefCell::new(HeadlessState::default()),
            calls: RefCell::new(Vec::new()),
            parameters,
            extensions,
        }
    }

    /// Overrides an integer parameter.
    #[must_use]
    pub fn with_parameter(mut self, pname: u32, value: i32) -> Self {
        self.parameters.insert(pname, value);
        self
    }

    /// Removes an extension from the supported set.
    #[must_use]
    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions.remove(name);
        self
    }

    /// Caps the total buffer storage; larger allocations raise `OUT_OF_MEMORY`.
    #[must_use]
    pub fn with_memory_budget(self, bytes: usize) -> Self {
        self.state.borrow_mut().memory_budget = Some(bytes);
        self
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Raises a GL error as if the driver had.
    pub fn inject_error(&self, code: u32) {
        self.state.borrow_mut().set_error(code);
    }

    /// Simulates a lost context.
    pub fn lose_context(&self) {
        self.state.borrow_mut().lost = true;
    }

    /// Contents of a buffer object.
    pub fn buffer_contents(&self, buffer: GlName) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    /// `true` when `cap` is enabled.
    pub fn is_enabled(&self, cap: u32) -> bool {
        self.state.borrow().enabled.contains(&cap)
    }

    /// Number of live GL objects of every kind.
    pub fn live_objects(&self) -> usize {
        let s = self.state.borrow();
        s.buffers.len()
            + s.textures.len()
            + s.samplers.len()
            + s.shaders.len()
            + s.programs.len()
            + s.vertex_arrays.len()
            + s.framebuffers.len()
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl GlContext for HeadlessGl {
    fn get_error(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        if s.lost && !s.lost_reported {
            s.lost_reported = true;
            return CONTEXT_LOST_WEBGL;
        }
        std::mem::replace(&mut s.error, NO_ERROR)
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        match self.parameters.get(&pname) {
            Some(v) => *v,
            None => {
                self.state.borrow_mut().set_error(INVALID_ENUM);
                0
            }
        }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        match pname {
            VENDOR => "Easel".to_owned(),
            RENDERER => "Easel Headless GL".to_owned(),
            VERSION => "WebGL 2.0 (OpenGL ES 3.0 Headless)".to_owned(),
            SHADING_LANGUAGE_VERSION => "WebGL GLSL ES 3.00".to_owned(),
            _ => {
                self.state.borrow_mut().set_error(INVALID_ENUM);
                String::new()
            }
        }
    }

    fn is_context_lost(&self) -> bool {
        self.state.borrow().lost
    }

    fn supports_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn create_buffer(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.buffers.insert(name, Vec::new());
        Ok(name)
    }

    fn delete_buffer(&self, buffer: GlName) {
        let mut s = self.state.borrow_mut();
        if let Some(data) = s.buffers.remove(&buffer) {
            s.allocated -= data.len();
            s.buffer_bindings.retain(|_, b| *b != buffer);
        }
    }

    fn bind_buffer(&self, target: u32, buffer: GlName) {
        let mut s = self.state.borrow_mut();
        if buffer != 0 && !s.buffers.contains_key(&buffer) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        s.buffer_bindings.insert(target, buffer);
        drop(s);
        self.record(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data_size(&self, target: u32, size: i32, _usage: u32) {
        let mut s = self.state.borrow_mut();
        let Some(name) = s.bound_buffer(target) else { return };
        if size < 0 {
            s.set_error(INVALID_VALUE);
            return;
        }
        let old = s.buffers.get(&name).map_or(0, Vec::len);
        let total = s.allocated - old + size as usize;
        if s.memory_budget.is_some_and(|budget| total > budget) {
            s.set_error(OUT_OF_MEMORY);
            return;
        }
        s.allocated = total;
        s.buffers.insert(name, vec![0; size as usize]);
        drop(s);
        self.record(GlCall::BufferData { target, size });
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        let mut s = self.state.borrow_mut();
        let Some(name) = s.bound_buffer(target) else { return };
        if !s.range_ok(name, offset, data.len()) {
            return;
        }
        if let Some(store) = s.buffers.get_mut(&name) {
            let start = offset as usize;
            store[start..start + data.len()].copy_from_slice(data);
        }
        drop(s);
        self.record(GlCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]) {
        let mut s = self.state.borrow_mut();
        let Some(name) = s.bound_buffer(target) else { return };
        if !s.range_ok(name, offset, dst.len()) {
            return;
        }
        if let Some(store) = s.buffers.get(&name) {
            let start = offset as usize;
            dst.copy_from_slice(&store[start..start + dst.len()]);
        }
        drop(s);
        self.record(GlCall::GetBufferSubData {
            target,
            offset,
            len: dst.len(),
        });
    }

    fn bind_buffer_range(&self, target: u32, index: u32, buffer: GlName, offset: i32, size: i32) {
        let mut s = self.state.borrow_mut();
        if !s.buffers.contains_key(&buffer) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        if size <= 0 || !s.range_ok(buffer, offset, size as usize) {
            s.set_error(INVALID_VALUE);
            return;
        }
        s.buffer_bindings.insert(target, buffer);
        drop(s);
        self.record(GlCall::BindBufferRange {
            target,
            index,
            buffer,
            offset,
            size,
        });
    }

    fn copy_buffer_sub_data(&self, read_target: u32, write_target: u32, read_offset: i32, write_offset: i32, size: i32) {
        let mut s = self.state.borrow_mut();
        let (Some(src), Some(dst)) = (s.bound_buffer(read_target), s.bound_buffer(write_target)) else {
            return;
        };
        if size < 0 || !s.range_ok(src, read_offset, size as usize) || !s.range_ok(dst, write_offset, size as usize) {
            return;
        }
        let (r, w, n) = (read_offset as usize, write_offset as usize, size as usize);
        if src == dst {
            if r < w + n && w < r + n {
                s.set_error(INVALID_VALUE);
                return;
            }
            if let Some(store) = s.buffers.get_mut(&src) {
                store.copy_within(r..r + n, w);
            }
        } else {
            let bytes = s.buffers.get(&src).map(|b| b[r..r + n].to_vec()).unwrap_or_default();
            if let Some(store) = s.buffers.get_mut(&dst) {
                store[w..w + n].copy_from_slice(&bytes);
            }
        }
        drop(s);
        self.record(GlCall::CopyBufferSubData {
            read_offset,
            write_offset,
            size,
        });
    }

    fn create_texture(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.textures.insert(name, None);
        Ok(name)
    }

    fn delete_texture(&self, texture: GlName) {
        let mut s = self.state.borrow_mut();
        if s.textures.remove(&texture).is_some() {
            s.texture_bindings.retain(|_, t| *t != texture);
        }
    }

    fn active_texture(&self, unit: u32) {
        let mut s = self.state.borrow_mut();
        let combined = self.parameters.get(&MAX_COMBINED_TEXTURE_IMAGE_UNITS).copied().unwrap_or(0) as u32;
        if unit < TEXTURE0 || unit >= TEXTURE0 + combined {
            s.set_error(INVALID_ENUM);
            return;
        }
        s.active_unit = unit - TEXTURE0;
        drop(s);
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: GlName) {
        let mut s = self.state.borrow_mut();
        let valid = texture == 0
            || match s.textures.get(&texture) {
                None => false,
                Some(Some(obj)) => obj.target == target,
                Some(None) => true,
            };
        if !valid {
            s.set_error(INVALID_OPERATION);
            return;
        }
        let unit = s.active_unit;
        s.texture_bindings.insert((unit, target), texture);
        drop(s);
        self.record(GlCall::BindTexture { target, texture });
    }

    fn tex_storage_2d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32) {
        self.tex_storage_3d(target, levels, internal_format, width, height, 1);
    }

    fn tex_storage_3d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32) {
        let mut s = self.state.borrow_mut();
        let Some(name) = s.bound_texture(target) else { return };
        if levels < 1 || width < 1 || height < 1 || depth < 1 {
            s.set_error(INVALID_VALUE);
            return;
        }
        let largest = width.max(height).max(if target == TEXTURE_3D { depth } else { 1 });
        if levels > 32 - (largest as u32).leading_zeros() as i32 {
            s.set_error(INVALID_OPERATION);
            return;
        }
        match s.textures.get_mut(&name) {
            Some(slot @ None) => {
                *slot = Some(TextureObject {
                    target,
                    levels,
                    size: [width, height, depth],
                });
            }
            _ => {
                s.set_error(INVALID_OPERATION);
                return;
            }
        }
        drop(s);
        self.record(GlCall::TexStorage {
            target,
            levels,
            internal_format,
        });
    }

    fn tex_sub_image_2d(&self, target: u32, level: i32, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, data: &[u8]) {
        self.tex_sub_image_3d(target, level, x, y, 0, width, height, 1, format, ty, data);
    }

    fn tex_sub_image_3d(
        &self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        z: i32,
        width: i32,
        height: i32,
        depth: i32,
        _format: u32,
        _ty: u32,
        _data: &[u8],
    ) {
        let mut s = self.state.borrow_mut();
        let Some(name) = s.bound_texture(target) else { return };
        let in_bounds = match s.textures.get(&name) {
            Some(Some(obj)) => {
                let mip = |extent: i32| (extent >> level).max(1);
                let layers = if obj.target == TEXTURE_3D { mip(obj.size[2]) } else { obj.size[2] };
                level >= 0
                    && level < obj.levels
                    && x >= 0
                    && y >= 0
                    && z >= 0
                    && x + width <= mip(obj.size[0])
                    && y + height <= mip(obj.size[1])
                    && z + depth <= layers
            }
            _ => {
                s.set_error(INVALID_OPERATION);
                return;
            }
        };
        if !in_bounds {
            s.set_error(INVALID_VALUE);
            return;
        }
        drop(s);
        self.record(GlCall::TexSubImage {
            target,
            level,
            width,
            height,
            depth,
        });
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        if self.state.borrow_mut().bound_texture(target).is_none() {
            return;
        }
        self.record(GlCall::TexParameter { target, pname, value });
    }

    fn pixel_store_i32(&self, _pname: u32, _value: i32) {}

    fn create_sampler(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.samplers.insert(name);
        Ok(name)
    }

    fn delete_sampler(&self, sampler: GlName) {
        self.state.borrow_mut().samplers.remove(&sampler);
    }

    fn bind_sampler(&self, unit: u32, sampler: GlName) {
        let mut s = self.state.borrow_mut();
        if sampler != 0 && !s.samplers.contains(&sampler) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        drop(s);
        self.record(GlCall::BindSampler { unit, sampler });
    }

    fn sampler_parameter_i32(&self, sampler: GlName, _pname: u32, _value: i32) {
        let mut s = self.state.borrow_mut();
        if !s.samplers.contains(&sampler) {
            s.set_error(INVALID_OPERATION);
        }
    }

    fn sampler_parameter_f32(&self, sampler: GlName, _pname: u32, _value: f32) {
        let mut s = self.state.borrow_mut();
        if !s.samplers.contains(&sampler) {
            s.set_error(INVALID_OPERATION);
        }
    }

    fn create_shader(&self, shader_type: u32) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        if shader_type != VERTEX_SHADER && shader_type != FRAGMENT_SHADER {
            s.set_error(INVALID_ENUM);
            return Err(format!("unsupported shader type 0x{shader_type:04X}"));
        }
        let name = s.alloc_name();
        s.shaders.insert(
            name,
            ShaderObject {
                shader_type,
                source: String::new(),
                compiled: None,
                log: String::new(),
            },
        );
        Ok(name)
    }

    fn delete_shader(&self, shader: GlName) {
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn shader_source(&self, shader: GlName, source: &str) {
        let mut s = self.state.borrow_mut();
        match s.shaders.get_mut(&shader) {
            Some(obj) => obj.source = source.to_owned(),
            None => s.set_error(INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: GlName) {
        let mut s = self.state.borrow_mut();
        let Some(obj) = s.shaders.get_mut(&shader) else {
            s.set_error(INVALID_VALUE);
            return;
        };
        match glsl::compile(&obj.source) {
            Ok(interface) => {
                obj.compiled = Some(interface);
                obj.log.clear();
            }
            Err(log) => {
                obj.compiled = None;
                obj.log = log;
            }
        }
        drop(s);
        self.record(GlCall::CompileShader(shader));
    }

    fn get_shader_compile_status(&self, shader: GlName) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled.is_some())
    }

    fn get_shader_info_log(&self, shader: GlName) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.programs.insert(name, ProgramObject::default());
        Ok(name)
    }

    fn delete_program(&self, program: GlName) {
        let mut s = self.state.borrow_mut();
        s.programs.remove(&program);
        if s.current_program == program {
            s.current_program = 0;
        }
    }

    fn attach_shader(&self, program: GlName, shader: GlName) {
        let mut s = self.state.borrow_mut();
        if !s.shaders.contains_key(&shader) {
            s.set_error(INVALID_VALUE);
            return;
        }
        match s.programs.get_mut(&program) {
            Some(p) => p.shaders.push(shader),
            None => s.set_error(INVALID_VALUE),
        }
    }

    fn bind_attrib_location(&self, program: GlName, index: u32, name: &str) {
        let mut s = self.state.borrow_mut();
        match s.programs.get_mut(&program) {
            Some(p) => {
                p.attrib_bindings.insert(name.to_owned(), index);
            }
            None => {
                s.set_error(INVALID_VALUE);
                return;
            }
        }
        drop(s);
        self.record(GlCall::BindAttribLocation {
            program,
            index,
            name: name.to_owned(),
        });
    }

    fn link_program(&self, program: GlName) {
        let mut s = self.state.borrow_mut();
        let Some(p) = s.programs.get(&program) else {
            s.set_error(INVALID_VALUE);
            return;
        };
        let stage = |ty: u32| {
            p.shaders
                .iter()
                .filter_map(|name| s.shaders.get(name))
                .find(|obj| obj.shader_type == ty)
                .and_then(|obj| obj.compiled.clone())
        };
        let result = match (stage(VERTEX_SHADER), stage(FRAGMENT_SHADER)) {
            (Some(vs), Some(fs)) => glsl::link(&vs, &fs, &p.attrib_bindings),
            _ => Err("ERROR: Linking: a compiled vertex and fragment shader must be attached".to_owned()),
        };
        if let Some(p) = s.programs.get_mut(&program) {
            match result {
                Ok(linked) => {
                    p.linked = Some(linked);
                    p.log.clear();
                }
                Err(log) => {
                    p.linked = None;
                    p.log = log;
                }
            }
        }
        drop(s);
        self.record(GlCall::LinkProgram(program));
    }

    fn get_program_link_status(&self, program: GlName) -> bool {
        self.state.borrow().linked_program(program).is_some()
    }

    fn get_program_info_log(&self, program: GlName) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: GlName) {
        let mut s = self.state.borrow_mut();
        if program != 0 && s.linked_program(program).is_none() {
            s.set_error(INVALID_OPERATION);
            return;
        }
        s.current_program = program;
        drop(s);
        self.record(GlCall::UseProgram(program));
    }

    fn get_active_attributes(&self, program: GlName) -> u32 {
        self.record(GlCall::GetActiveAttributes(program));
        self.state
            .borrow()
            .linked_program(program)
            .map_or(0, |p| p.attributes.len() as u32)
    }

    fn get_active_attribute(&self, program: GlName, index: u32) -> Option<GlActiveInfo> {
        let s = self.state.borrow();
        let attr = s.linked_program(program)?.attributes.get(index as usize)?;
        Some(attr.active_info())
    }

    fn get_attrib_location(&self, program: GlName, name: &str) -> Option<u32> {
        let s = self.state.borrow();
        s.linked_program(program)?
            .attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.location)
    }

    fn get_active_uniforms(&self, program: GlName) -> u32 {
        self.record(GlCall::GetActiveUniforms(program));
        self.state
            .borrow()
            .linked_program(program)
            .map_or(0, |p| p.uniforms.len() as u32)
    }

    fn get_active_uniform(&self, program: GlName, index: u32) -> Option<GlActiveInfo> {
        let s = self.state.borrow();
        let uniform = s.linked_program(program)?.uniforms.get(index as usize)?;
        Some(uniform.variable.active_info())
    }

    fn get_active_uniform_block_index(&self, program: GlName, uniform: u32) -> i32 {
        let s = self.state.borrow();
        s.linked_program(program)
            .and_then(|p| p.uniforms.get(uniform as usize))
            .map_or(-1, |u| u.block_index)
    }

    fn get_uniform_location(&self, program: GlName, name: &str) -> Option<u32> {
        let s = self.state.borrow();
        let base = name.strip_suffix("[0]").unwrap_or(name);
        s.linked_program(program)?
            .uniforms
            .iter()
            .find(|u| u.block_index < 0 && u.variable.name == base)
            .and_then(|u| u.variable.location)
    }

    fn get_active_uniform_blocks(&self, program: GlName) -> u32 {
        self.record(GlCall::GetActiveUniformBlocks(program));
        self.state
            .borrow()
            .linked_program(program)
            .map_or(0, |p| p.blocks.len() as u32)
    }

    fn get_active_uniform_block_name(&self, program: GlName, index: u32) -> String {
        let s = self.state.borrow();
        s.linked_program(program)
            .and_then(|p| p.blocks.get(index as usize))
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }

    fn get_active_uniform_block_size(&self, program: GlName, index: u32) -> i32 {
        let s = self.state.borrow();
        s.linked_program(program)
            .and_then(|p| p.blocks.get(index as usize))
            .map_or(0, |b| b.data_size)
    }

    fn uniform_block_binding(&self, program: GlName, index: u32, binding: u32) {
        let mut s = self.state.borrow_mut();
        let max = self.parameters.get(&MAX_UNIFORM_BUFFER_BINDINGS).copied().unwrap_or(0) as u32;
        let known = s.linked_program(program).is_some_and(|p| (index as usize) < p.blocks.len());
        if !known || binding >= max {
            s.set_error(INVALID_VALUE);
            return;
        }
        drop(s);
        self.record(GlCall::UniformBlockBinding { program, index, binding });
    }

    fn uniform_1_i32(&self, location: u32, value: i32) {
        let mut s = self.state.borrow_mut();
        let current = s.current_program;
        let known = s
            .linked_program(current)
            .is_some_and(|p| p.uniforms.iter().any(|u| u.variable.location == Some(location)));
        if !known {
            s.set_error(INVALID_OPERATION);
            return;
        }
        drop(s);
        self.record(GlCall::Uniform1i { location, value });
    }

    fn create_vertex_array(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.vertex_arrays.insert(name);
        Ok(name)
    }

    fn delete_vertex_array(&self, vao: GlName) {
        self.state.borrow_mut().vertex_arrays.remove(&vao);
    }

    fn bind_vertex_array(&self, vao: GlName) {
        let mut s = self.state.borrow_mut();
        if vao != 0 && !s.vertex_arrays.contains(&vao) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        drop(s);
        self.record(GlCall::BindVertexArray(vao));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        if self.state.borrow_mut().bound_buffer(ARRAY_BUFFER).is_none() {
            return;
        }
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            ty,
            normalized,
            stride,
            offset,
            integer: false,
        });
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        if self.state.borrow_mut().bound_buffer(ARRAY_BUFFER).is_none() {
            return;
        }
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            ty,
            normalized: false,
            stride,
            offset,
            integer: true,
        });
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(GlCall::VertexAttribDivisor { index, divisor });
    }

    fn create_framebuffer(&self) -> Result<GlName, String> {
        let mut s = self.state.borrow_mut();
        if s.lost {
            return Err("context lost".to_owned());
        }
        let name = s.alloc_name();
        s.framebuffers.insert(name, Vec::new());
        Ok(name)
    }

    fn delete_framebuffer(&self, framebuffer: GlName) {
        let mut s = self.state.borrow_mut();
        s.framebuffers.remove(&framebuffer);
        if s.draw_framebuffer == framebuffer {
            s.draw_framebuffer = 0;
        }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: GlName) {
        let mut s = self.state.borrow_mut();
        if framebuffer != 0 && !s.framebuffers.contains_key(&framebuffer) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        if target == FRAMEBUFFER || target == DRAW_FRAMEBUFFER {
            s.draw_framebuffer = framebuffer;
        }
        drop(s);
        self.record(GlCall::BindFramebuffer { target, framebuffer });
    }

    fn framebuffer_texture_2d(&self, _target: u32, attachment: u32, _tex_target: u32, texture: GlName, level: i32) {
        self.attach(attachment, texture, level, None);
    }

    fn framebuffer_texture_layer(&self, _target: u32, attachment: u32, texture: GlName, level: i32, layer: i32) {
        self.attach(attachment, texture, level, Some(layer));
    }

    fn check_framebuffer_status(&self, _target: u32) -> u32 {
        let s = self.state.borrow();
        match s.framebuffers.get(&s.draw_framebuffer) {
            Some(attachments) if attachments.is_empty() => FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
            _ => FRAMEBUFFER_COMPLETE,
        }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        self.record(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn invalidate_framebuffer(&self, _target: u32, attachments: &[u32]) {
        self.record(GlCall::InvalidateFramebuffer(attachments.to_vec()));
    }

    fn clear_buffer_f32_slice(&self, buffer: u32, draw_buffer: u32, values: &[f32; 4]) {
        if buffer == DEPTH {
            self.record(GlCall::ClearBufferfi {
                depth: values[0],
                stencil: 0,
            });
        } else {
            self.record(GlCall::ClearBufferfv {
                draw_buffer,
                value: *values,
            });
        }
    }

    fn clear_buffer_i32_slice(&self, _buffer: u32, draw_buffer: u32, values: &[i32; 4]) {
        self.record(GlCall::ClearBufferiv {
            draw_buffer,
            value: *values,
        });
    }

    fn clear_buffer_u32_slice(&self, _buffer: u32, draw_buffer: u32, values: &[u32; 4]) {
        self.record(GlCall::ClearBufferuiv {
            draw_buffer,
            value: *values,
        });
    }

    fn clear_buffer_depth_stencil(&self, _buffer: u32, _draw_buffer: u32, depth: f32, stencil: i32) {
        self.record(GlCall::ClearBufferfi { depth, stencil });
    }

    fn enable(&self, cap: u32) {
        self.state.borrow_mut().enabled.insert(cap);
        self.record(GlCall::Enable(cap));
    }

    fn disable(&self, cap: u32) {
        self.state.borrow_mut().enabled.remove(&cap);
        self.record(GlCall::Disable(cap));
    }

    fn cull_face(&self, mode: u32) {
        self.record(GlCall::CullFace(mode));
    }

    fn front_face(&self, mode: u32) {
        self.record(GlCall::FrontFace(mode));
    }

    fn depth_func(&self, func: u32) {
        self.record(GlCall::DepthFunc(func));
    }

    fn depth_mask(&self, write: bool) {
        self.record(GlCall::DepthMask(write));
    }

    fn depth_range_f32(&self, near: f32, far: f32) {
        self.record(GlCall::DepthRange(near, far));
    }

    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32) {
        self.record(GlCall::StencilFuncSeparate {
            face,
            func,
            reference,
            mask,
        });
    }

    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        self.record(GlCall::StencilOpSeparate {
            face,
            fail,
            depth_fail,
            pass,
        });
    }

    fn stencil_mask_separate(&self, face: u32, mask: u32) {
        self.record(GlCall::StencilMaskSeparate { face, mask });
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        self.record(GlCall::PolygonOffset { factor, units });
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(GlCall::BlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        });
    }

    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32) {
        self.record(GlCall::BlendEquationSeparate {
            rgb: mode_rgb,
            alpha: mode_alpha,
        });
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::BlendColor([r, g, b, a]));
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.record(GlCall::ColorMask([r, g, b, a]));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport([x, y, width, height]));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Scissor([x, y, width, height]));
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        let mut s = self.state.borrow_mut();
        if s.current_program == 0 {
            s.set_error(INVALID_OPERATION);
            return;
        }
        drop(s);
        self.record(GlCall::DrawArrays {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32) {
        let mut s = self.state.borrow_mut();
        if s.current_program == 0 {
            s.set_error(INVALID_OPERATION);
            return;
        }
        if s.bound_buffer(ELEMENT_ARRAY_BUFFER).is_none() {
            return;
        }
        drop(s);
        self.record(GlCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
            instances,
        });
    }

    fn flush(&self) {
        self.record(GlCall::Flush);
    }

    fn finish(&self) {
        self.record(GlCall::Finish);
    }
}

impl HeadlessGl {
    fn attach(&self, attachment: u32, texture: GlName, level: i32, layer: Option<i32>) {
        let mut s = self.state.borrow_mut();
        let fb = s.draw_framebuffer;
        if texture != 0 && !s.textures.contains_key(&texture) {
            s.set_error(INVALID_OPERATION);
            return;
        }
        match s.framebuffers.get_mut(&fb) {
            Some(attachments) if texture == 0 => attachments.retain(|a| *a != attachment),
            Some(attachments) => {
                if !attachments.contains(&attachment) {
                    attachments.push(attachment);
                }
            }
            None => {
                s.set_error(INVALID_OPERATION);
                return;
            }
        }
        drop(s);
        self.record(GlCall::FramebufferTexture {
            attachment,
            texture,
            level,
            layer,
        });
    }
}

/// A minimal GLSL ES 3.00 front end: structural checks and interface scanning.
mod glsl {
    use super::super::gl::consts::*;
    use super::GlActiveInfo;
    use std::collections::{HashMap, HashSet};

    const QUALIFIERS: &[&str] = &[
        "highp", "mediump", "lowp", "flat", "smooth", "centroid", "invariant", "const",
    ];

    const LEADING_WORDS: &[&str] = &[
        "in", "out", "uniform", "layout", "precision", "const", "struct", "flat", "smooth", "centroid",
        "invariant", "highp", "mediump", "lowp", "void",
    ];

    #[derive(Debug, Clone, PartialEq)]
    pub(super) struct Variable {
        pub name: String,
        pub utype: u32,
        pub size: i32,
        pub location: Option<u32>,
    }

    impl Variable {
        pub fn active_info(&self) -> GlActiveInfo {
            GlActiveInfo {
                name: if self.size > 1 {
                    format!("{}[0]", self.name)
                } else {
                    self.name.clone()
                },
                size: self.size,
                utype: self.utype,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(super) struct Block {
        pub name: String,
        pub data_size: i32,
        pub members: Vec<Variable>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub(super) struct Interface {
        pub inputs: Vec<Variable>,
        pub outputs: Vec<Variable>,
        pub uniforms: Vec<Variable>,
        pub blocks: Vec<Block>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(super) struct ActiveUniform {
        pub variable: Variable,
        pub block_index: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(super) struct LinkedProgram {
        pub attributes: Vec<Variable>,
        pub uniforms: Vec<ActiveUniform>,
        pub blocks: Vec<Block>,
    }

    pub(super) fn compile(source: &str) -> Result<Interface, String> {
        let mut errors = Vec::new();
        let lines: Vec<&str> = source.lines().collect();
        match lines.iter().position(|l| !l.trim().is_empty()) {
            Some(i) if lines[i].split_whitespace().eq(["#version", "300", "es"]) => {}
            Some(i) => errors.push(format!(
                "ERROR: 0:{}: '' : only '#version 300 es' shaders are accepted",
                i + 1
            )),
            None => errors.push("ERROR: 0:1: '' : empty shader source".to_owned()),
        }
        for (i, line) in lines.iter().enumerate() {
            if let Some(rest) = line.trim_start().strip_prefix("#error") {
                errors.push(format!("ERROR: 0:{}: '#error' : {}", i + 1, rest.trim()));
            }
        }
        let code = blank_preprocessor(&strip_comments(source));
        if errors.is_empty() {
            check_structure(&code, &mut errors);
        }
        if errors.is_empty() {
            check_statements(&code, &mut errors);
        }
        if errors.is_empty() && !has_main(&code) {
            errors.push(format!("ERROR: 0:{}: '' : missing main()", lines.len().max(1)));
        }
        if errors.is_empty() {
            Ok(scan_interface(&code))
        } else {
            Err(errors.join("\n"))
        }
    }

    pub(super) fn link(
        vs: &Interface,
        fs: &Interface,
        bindings: &HashMap<String, u32>,
    ) -> Result<LinkedProgram, String> {
        for input in &fs.inputs {
            if !vs.outputs.iter().any(|o| o.name == input.name) {
                return Err(format!(
                    "ERROR: Linking: fragment input '{}' is not written by the vertex shader",
                    input.name
                ));
            }
        }

        let mut used = HashSet::new();
        let mut attributes = Vec::new();
        for input in &vs.inputs {
            let location = input.location.or_else(|| bindings.get(&input.name).copied());
            if let Some(loc) = location {
                if !used.insert(loc) {
                    return Err(format!(
                        "ERROR: Linking: attribute '{}' aliases location {loc}",
                        input.name
                    ));
                }
            }
            attributes.push(Variable {
                location,
                ..input.clone()
            });
        }
        let mut next = 0;
        for attr in attributes.iter_mut().filter(|a| a.location.is_none()) {
            while used.contains(&next) {
                next += 1;
            }
            attr.location = Some(next);
            used.insert(next);
        }

        let mut blocks: Vec<Block> = Vec::new();
        for block in vs.blocks.iter().chain(&fs.blocks) {
            match blocks.iter().find(|b| b.name == block.name) {
                Some(existing) if existing.data_size != block.data_size => {
                    return Err(format!(
                        "ERROR: Linking: uniform block '{}' differs between stages",
                        block.name
                    ));
                }
                Some(_) => {}
                None => blocks.push(block.clone()),
            }
        }

        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        let mut next_location = 0;
        for uniform in vs.uniforms.iter().chain(&fs.uniforms) {
            if uniforms.iter().any(|u| u.variable.name == uniform.name) {
                continue;
            }
            uniforms.push(ActiveUniform {
                variable: Variable {
                    location: Some(next_location),
                    ..uniform.clone()
                },
                block_index: -1,
            });
            next_location += uniform.size.max(1) as u32;
        }
        for (index, block) in blocks.iter().enumerate() {
            for member in &block.members {
                uniforms.push(ActiveUniform {
                    variable: Variable {
                        location: None,
                        ..member.clone()
                    },
                    block_index: index as i32,
                });
            }
        }

        Ok(LinkedProgram {
            attributes,
            uniforms,
            blocks,
        })
    }

    /// Replaces comments with spaces, keeping line breaks.
    fn strip_comments(source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, chars.peek()) {
                ('/', Some('/')) => {
                    while let Some(&n) = chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut prev = ' ';
                    for n in chars.by_ref() {
                        if n == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && n == '/' {
                            break;
                        }
                        prev = n;
                    }
                    out.push(' ');
                }
                _ => out.push(c),
            }
        }
        out
    }

    fn blank_preprocessor(code: &str) -> String {
        code.lines()
            .map(|l| if l.trim_start().starts_with('#') { "" } else { l })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn check_structure(code: &str, errors: &mut Vec<String>) {
        let mut stack: Vec<char> = Vec::new();
        let mut line = 1;
        for c in code.chars() {
            match c {
                '\n' => line += 1,
                '(' | '{' | '[' => stack.push(c),
                ')' | '}' | ']' => {
                    let open = match c {
                        ')' => '(',
                        '}' => '{',
                        _ => '[',
                    };
                    if stack.pop() != Some(open) {
                        errors.push(format!("ERROR: 0:{line}: '{c}' : syntax error"));
                        return;
                    }
                }
                '@' | '$' | '`' | '"' | '\'' | '\\' => {
                    errors.push(format!("ERROR: 0:{line}: '{c}' : invalid character"));
                    return;
                }
                _ => {}
            }
        }
        if !stack.is_empty() {
            errors.push(format!("ERROR: 0:{line}: '' : syntax error, unexpected end of file"));
        }
    }

    /// Every top-level declaration must open with a qualifier or a type.
    fn check_statements(code: &str, errors: &mut Vec<String>) {
        for (stmt, line) in top_level_statements(code) {
            let Some(first) = stmt.split(|c: char| !c.is_alphanumeric() && c != '_').find(|w| !w.is_empty()) else {
                continue;
            };
            if !LEADING_WORDS.contains(&first) && type_enum(first).is_none() {
                errors.push(format!("ERROR: 0:{line}: '{first}' : syntax error"));
                return;
            }
        }
    }

    fn has_main(code: &str) -> bool {
        let words: Vec<&str> = code
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .collect();
        words.windows(2).any(|w| w == ["void", "main"])
    }

    /// Splits into top-level statements, each with its starting line.
    fn top_level_statements(code: &str) -> Vec<(String, usize)> {
        let mut statements = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        let mut line = 1;
        let mut start_line = 1;
        for c in code.chars() {
            if current.trim().is_empty() {
                start_line = line;
            }
            if c == '\n' {
                line += 1;
            }
            match c {
                '{' => {
                    depth += 1;
                    current.push(c);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                    let is_block = strip_layout(current.trim()).1.trim_start().starts_with("uniform");
                    if depth == 0 && !is_block {
                        statements.push((std::mem::take(&mut current), start_line));
                    }
                }
                ';' if depth == 0 => statements.push((std::mem::take(&mut current), start_line)),
                _ => current.push(c),
            }
        }
        statements.retain(|(s, _)| !s.trim().is_empty());
        statements
    }

    /// Splits off a leading `layout(...)`, returning its `location`, if any.
    fn strip_layout(stmt: &str) -> (Option<u32>, &str) {
        let Some(rest) = stmt.strip_prefix("layout") else {
            return (None, stmt);
        };
        let Some(open) = rest.find('(') else {
            return (None, stmt);
        };
        let Some(close) = rest.find(')') else {
            return (None, stmt);
        };
        let inner = &rest[open + 1..close];
        let location = inner.split(',').find_map(|part| {
            let (key, value) = part.split_once('=')?;
            (key.trim() == "location").then(|| value.trim().parse().ok())?
        });
        (location, &rest[close + 1..])
    }

    fn scan_interface(code: &str) -> Interface {
        let mut interface = Interface::default();
        for (stmt, _) in top_level_statements(code) {
            let (location, rest) = strip_layout(stmt.trim());
            let words: Vec<&str> = rest
                .split_whitespace()
                .filter(|w| !QUALIFIERS.contains(w))
                .collect();
            match words.first() {
                Some(&"in") => interface.inputs.extend(parse_variable(&words[1..], location)),
                Some(&"out") => interface.outputs.extend(parse_variable(&words[1..], location)),
                Some(&"uniform") if rest.contains('{') => interface.blocks.extend(parse_block(rest)),
                Some(&"uniform") => interface.uniforms.extend(parse_variable(&words[1..], None)),
                _ => {}
            }
        }
        interface
    }

    fn parse_variable(words: &[&str], location: Option<u32>) -> Option<Variable> {
        let utype = type_enum(words.first()?)?;
        let raw = words.get(1)?.trim_end_matches(',');
        let (name, size) = match raw.split_once('[') {
            Some((name, len)) => (name, len.trim_end_matches(']').parse().ok()?),
            None => (raw, 1),
        };
        Some(Variable {
            name: name.to_owned(),
            utype,
            size,
            location,
        })
    }

    fn parse_block(decl: &str) -> Option<Block> {
        let open = decl.find('{')?;
        let close = decl.rfind('}')?;
        let name = decl[..open].trim().strip_prefix("uniform")?.trim().to_owned();
        let members: Vec<Variable> = decl[open + 1..close]
            .split(';')
            .filter_map(|m| {
                let words: Vec<&str> = m.split_whitespace().filter(|w| !QUALIFIERS.contains(w)).collect();
                parse_variable(&words, None)
            })
            .collect();
        let mut offset = 0;
        for member in &members {
            let (size, align) = std140(member.utype);
            if member.size > 1 {
                let stride = round_up(size, 16);
                offset = round_up(offset, 16) + stride * member.size;
            } else {
                offset = round_up(offset, align) + size;
            }
        }
        Some(Block {
            name,
            data_size: round_up(offset, 16),
            members,
        })
    }

    fn round_up(value: i32, align: i32) -> i32 {
        (value + align - 1) / align * align
    }

    fn std140(utype: u32) -> (i32, i32) {
        match utype {
            FLOAT | INT | UNSIGNED_INT | BOOL => (4, 4),
            FLOAT_VEC2 | INT_VEC2 | UNSIGNED_INT_VEC2 => (8, 8),
            FLOAT_VEC3 | INT_VEC3 | UNSIGNED_INT_VEC3 => (12, 16),
            FLOAT_MAT2 => (32, 16),
            FLOAT_MAT3 => (48, 16),
            FLOAT_MAT4 => (64, 16),
            _ => (16, 16),
        }
    }

    fn type_enum(name: &str) -> Option<u32> {
        Some(match name {
            "float" => FLOAT,
            "vec2" => FLOAT_VEC2,
            "vec3" => FLOAT_VEC3,
            "vec4" => FLOAT_VEC4,
            "int" => INT,
            "ivec2" => INT_VEC2,
            "ivec3" => INT_VEC3,
            "ivec4" => INT_VEC4,
            "uint" => UNSIGNED_INT,
            "uvec2" => UNSIGNED_INT_VEC2,
            "uvec3" => UNSIGNED_INT_VEC3,
            "uvec4" => UNSIGNED_INT_VEC4,
            "bool" => BOOL,
            "mat2" => FLOAT_MAT2,
            "mat3" => FLOAT_MAT3,
            "mat4" => FLOAT_MAT4,
            "sampler2D" => SAMPLER_2D,
            "sampler3D" => SAMPLER_3D,
            "samplerCube" => SAMPLER_CUBE,
            "sampler2DShadow" => SAMPLER_2D_SHADOW,
            "sampler2DArray" => SAMPLER_2D_ARRAY,
            "sampler2DArrayShadow" => SAMPLER_2D_ARRAY_SHADOW,
            "samplerCubeShadow" => SAMPLER_CUBE_SHADOW,
            "isampler2D" => INT_SAMPLER_2D,
            "isampler3D" => INT_SAMPLER_3D,
            "isamplerCube" => INT_SAMPLER_CUBE,
            "isampler2DArray" => INT_SAMPLER_2D_ARRAY,
            "usampler2D" => UNSIGNED_INT_SAMPLER_2D,
            "usampler3D" => UNSIGNED_INT_SAMPLER_3D,
            "usamplerCube" => UNSIGNED_INT_SAMPLER_CUBE,
            "usampler2DArray" => UNSIGNED_INT_SAMPLER_2D_ARRAY,
            _ => return None,
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const VS: &str = "#version 300 es
layout(location = 0) in vec3 a_loc0;
in vec2 a_loc3;
out vec2 v_uv;
layout(std140) uniform group0_binding0 {
    mat4 u_mvp;
    vec3 u_tint;
    float u_weights[3];
};
void main() {
    v_uv = a_loc3;
    gl_Position = u_mvp * vec4(a_loc0, 1.0);
}
";

        const FS: &str = "#version 300 es
precision highp float;
in vec2 v_uv;
uniform sampler2D group0_binding1;
out vec4 o_color;
void main() { o_color = texture(group0_binding1, v_uv); }
";

        #[test]
        fn scans_attributes_blocks_and_samplers() {
            let vs = compile(VS).unwrap();
            assert_eq!(vs.inputs.len(), 2);
            assert_eq!(vs.inputs[0].location, Some(0));
            assert_eq!(vs.blocks[0].name, "group0_binding0");
            // mat4 (64) + vec3 (12, aligned 16) + float[3] (3 * 16, aligned 16)
            assert_eq!(vs.blocks[0].data_size, 64 + 16 + 48);

            let fs = compile(FS).unwrap();
            assert_eq!(fs.uniforms[0].utype, SAMPLER_2D);
            assert_eq!(fs.outputs[0].name, "o_color");
        }

        #[test]
        fn reports_line_of_unbalanced_brace() {
            let src = "#version 300 es\nvoid main() {\n  float x = 1.0;\n}\n}\n";
            let log = compile(src).unwrap_err();
            assert!(log.starts_with("ERROR: 0:5: '}'"), "{log}");
        }

        #[test]
        fn rejects_unknown_top_level_words() {
            let src = "#version 300 es\nprecision mediump float;\nthis is not glsl;\nvoid main() {}\n";
            let log = compile(src).unwrap_err();
            assert!(log.starts_with("ERROR: 0:3: 'this'"), "{log}");
        }

        #[test]
        fn link_assigns_bound_then_free_locations() {
            let vs = compile("#version 300 es\nin vec3 a_loc2;\nin vec2 extra;\nvoid main() {}\n").unwrap();
            let fs = compile("#version 300 es\nvoid main() {}\n").unwrap();
            let bindings = HashMap::from([("a_loc2".to_owned(), 2)]);
            let linked = link(&vs, &fs, &bindings).unwrap();
            assert_eq!(linked.attributes[0].location, Some(2));
            assert_eq!(linked.attributes[1].location, Some(0));
        }

        #[test]
        fn link_rejects_unwritten_varyings() {
            let vs = compile("#version 300 es\nvoid main() {}\n").unwrap();
            let fs = compile("#version 300 es\nin vec2 v_uv;\nvoid main() {}\n").unwrap();
            assert!(link(&vs, &fs, &HashMap::new()).unwrap_err().contains("v_uv"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_error_is_reported_once() {
        let gl = HeadlessGl::new();
        gl.bind_buffer(ARRAY_BUFFER, 42);
        gl.bind_buffer(ARRAY_BUFFER, 43);
        assert_eq!(gl.get_error(), INVALID_OPERATION);
        assert_eq!(gl.get_error(), NO_ERROR);
    }

    #[test]
    fn buffers_hold_their_bytes() {
        let gl = HeadlessGl::new();
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(COPY_WRITE_BUFFER, buffer);
        gl.buffer_data_size(COPY_WRITE_BUFFER, 8, DYNAMIC_DRAW);
        gl.buffer_sub_data(COPY_WRITE_BUFFER, 4, &[1, 2, 3, 4]);
        let mut out = [0u8; 4];
        gl.get_buffer_sub_data(COPY_WRITE_BUFFER, 4, &mut out);
        assert_eq!(out, [1, 2, 3, 4]);
        gl.buffer_sub_data(COPY_WRITE_BUFFER, 6, &[0; 4]);
        assert_eq!(gl.get_error(), INVALID_VALUE);
    }

    #[test]
    fn memory_budget_raises_out_of_memory() {
        let gl = HeadlessGl::new().with_memory_budget(16);
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(ARRAY_BUFFER, buffer);
        gl.buffer_data_size(ARRAY_BUFFER, 64, STATIC_DRAW);
        assert_eq!(gl.get_error(), OUT_OF_MEMORY);
        assert_eq!(gl.buffer_contents(buffer), Some(Vec::new()));
    }

    #[test]
    fn lost_context_reports_once() {
        let gl = HeadlessGl::new();
        gl.lose_context();
        assert!(gl.is_context_lost());
        assert_eq!(gl.get_error(), CONTEXT_LOST_WEBGL);
        assert_eq!(gl.get_error(), NO_ERROR);
        assert!(gl.create_buffer().is_err());
    }
}
