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

use super::bind_group::GlBindGroupEntry;
use super::command::{GlCommandBufferEntry, WebGl2CommandEncoder};
use super::gl::consts::{error_name, CONTEXT_LOST_WEBGL, NO_ERROR, OUT_OF_MEMORY};
use super::gl::{GlContext, GlName};
use super::pipeline::GlRenderPipelineEntry;
use super::program::GlShaderModuleEntry;
use super::queue::WebGl2Queue;
use super::resource::{GlBufferEntry, GlSamplerEntry, GlTextureEntry, GlTextureViewEntry};
use easel_core::gfx::api::*;
use easel_core::gfx::error::{ErrorFilter, ErrorScopeStack, GfxError, GfxResult, UncapturedErrorHandler};
use easel_core::gfx::future::GfxFuture;
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::{GfxCommandEncoder, GfxDevice, GfxQueue};
use easel_core::gfx::validation;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Native errors drained per poll; a broken context can report forever.
const MAX_NATIVE_ERRORS_PER_POLL: usize = 16;

/// Every object a WebGL2 device owns.
#[derive(Debug)]
pub(crate) struct DeviceState {
    pub buffers: Arena<kind::Buffer, GlBufferEntry>,
    pub textures: Arena<kind::Texture, GlTextureEntry>,
    pub texture_views: Arena<kind::TextureView, GlTextureViewEntry>,
    pub samplers: Arena<kind::Sampler, GlSamplerEntry>,
    pub shader_modules: Arena<kind::ShaderModule, GlShaderModuleEntry>,
    pub bind_group_layouts: Arena<kind::BindGroupLayout, BindGroupLayoutDescriptor>,
    pub bind_groups: Arena<kind::BindGroup, GlBindGroupEntry>,
    pub pipeline_layouts: Arena<kind::PipelineLayout, Vec<BindGroupLayoutId>>,
    pub render_pipelines: Arena<kind::RenderPipeline, GlRenderPipelineEntry>,
    /// Always empty; kept so foreign ids are still told apart.
    pub compute_pipelines: Arena<kind::ComputePipeline, ()>,
    pub command_buffers: Arena<kind::CommandBuffer, GlCommandBufferEntry>,
    pub vertex_array: GlName,
    /// Scratch framebuffer reattached by every offscreen pass.
    pub framebuffer: Option<GlName>,
    /// Bit `i` set when vertex attribute array `i` is enabled.
    pub enabled_attributes: u32,
    pub pass_active: bool,
    pub null_fragment: Option<GlName>,
}

impl DeviceState {
    fn new(vertex_array: GlName) -> Self {
        let serial = DeviceSerial::next();
        Self {
            buffers: Arena::new(serial),
            textures: Arena::new(serial),
            texture_views: Arena::new(serial),
            samplers: Arena::new(serial),
            shader_modules: Arena::new(serial),
            bind_group_layouts: Arena::new(serial),
            bind_groups: Arena::new(serial),
            pipeline_layouts: Arena::new(serial),
            render_pipelines: Arena::new(serial),
            compute_pipelines: Arena::new(serial),
            command_buffers: Arena::new(serial),
            vertex_array,
            framebuffer: None,
            enabled_attributes: 0,
            pass_active: false,
            null_fragment: None,
        }
    }

    /// Resolves every pending buffer map.
    pub fn complete_pending_maps(&mut self, gl: &dyn GlContext) {
        for buffer in self.buffers.values_mut() {
            buffer.complete_map(gl);
        }
    }

    /// Deletes every GL object and empties the arenas.
    fn release_all(&mut self, gl: &dyn GlContext) {
        for buffer in self.buffers.values_mut() {
            buffer.abort_map("device destroyed");
            gl.delete_buffer(buffer.name);
        }
        for (_, texture) in self.textures.iter() {
            if !texture.canvas {
                gl.delete_texture(texture.name);
            }
        }
        for (_, sampler) in self.samplers.iter() {
            gl.delete_sampler(sampler.name);
        }
        for (_, pipeline) in self.render_pipelines.iter() {
            pipeline.delete(gl);
        }
        for (_, module) in self.shader_modules.iter() {
            module.delete(gl);
        }
        if let Some(shader) = self.null_fragment.take() {
            gl.delete_shader(shader);
        }
        if let Some(framebuffer) = self.framebuffer.take() {
            gl.delete_framebuffer(framebuffer);
        }
        gl.delete_vertex_array(self.vertex_array);
        self.buffers.clear();
        self.textures.clear();
        self.texture_views.clear();
        self.samplers.clear();
        self.shader_modules.clear();
        self.bind_group_layouts.clear();
        self.bind_groups.clear();
        self.pipeline_layouts.clear();
        self.render_pipelines.clear();
        self.command_buffers.clear();
    }
}

/// State shared by the device, its queue, encoders and futures.
pub(crate) struct DeviceShared {
    pub gl: Rc<dyn GlContext>,
    pub info: AdapterInfo,
    pub capabilities: Capabilities,
    pub settings: GfxSettings,
    pub state: RefCell<DeviceState>,
    scopes: RefCell<ErrorScopeStack>,
    pub lost: DeviceLostSignal,
    destroyed: Cell<bool>,
}

impl fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceShared")
            .field("adapter", &self.info.name)
            .field("lost", &self.lost.is_lost())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl DeviceShared {
    /// Fails with `device-lost` once the device or its context is gone.
    pub fn check_alive(&self) -> GfxResult<()> {
        if !self.lost.is_lost() && self.gl.is_context_lost() {
            self.lost.resolve(DeviceLostReason::Unknown, "WebGL context lost");
        }
        match self.lost.info() {
            Some(info) => Err(GfxError::DeviceLost(info.message)),
            None => Ok(()),
        }
    }

    /// Routes an error to the scopes, draining native errors first.
    ///
    /// The uncaptured-error handler runs inside this call and must not call
    /// back into the device.
    pub fn report(&self, error: &GfxError) {
        if self.settings.poll_native_errors {
            self.drain_native_errors();
        }
        self.scopes.borrow_mut().report(error);
    }

    /// Turns pending `glGetError` codes into reported errors.
    pub fn drain_native_errors(&self) {
        for _ in 0..MAX_NATIVE_ERRORS_PER_POLL {
            match self.gl.get_error() {
                NO_ERROR => break,
                code => {
                    if let Some(error) = self.native_error(code) {
                        self.scopes.borrow_mut().report(&error);
                    }
                }
            }
        }
    }

    fn native_error(&self, code: u32) -> Option<GfxError> {
        match code {
            OUT_OF_MEMORY => Some(GfxError::OutOfMemory("GL_OUT_OF_MEMORY".to_owned())),
            CONTEXT_LOST_WEBGL => {
                self.lost.resolve(DeviceLostReason::Unknown, "WebGL context lost");
                None
            }
            code => Some(GfxError::internal(format!("GL error {} (0x{code:04X})", error_name(code)))),
        }
    }

    /// Fails with `out-of-memory` when the last allocation did.
    ///
    /// Other pending native errors are reported on the way.
    pub fn check_allocation(&self, what: &str) -> GfxResult<()> {
        let mut failure = None;
        for _ in 0..MAX_NATIVE_ERRORS_PER_POLL {
            match self.gl.get_error() {
                NO_ERROR => break,
                OUT_OF_MEMORY => failure = Some(GfxError::OutOfMemory(format!("{what}: GL_OUT_OF_MEMORY"))),
                code => {
                    if let Some(error) = self.native_error(code) {
                        self.scopes.borrow_mut().report(&error);
                    }
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Runs `f` on a live device, reporting any error it returns.
    pub fn guard<T>(
        &self,
        what: &str,
        f: impl FnOnce(&dyn GlContext, &mut DeviceState) -> GfxResult<T>,
    ) -> GfxResult<T> {
        if self.settings.trace_native_calls {
            log::trace!("webgl2: {what}");
        }
        let result = self.check_alive().and_then(|()| {
            let mut state = self.state.borrow_mut();
            f(&*self.gl, &mut state)
        });
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Like [`guard`](Self::guard) but also runs on a lost device.
    pub fn release<T>(
        &self,
        what: &str,
        f: impl FnOnce(&dyn GlContext, &mut DeviceState) -> GfxResult<T>,
    ) -> GfxResult<T> {
        if self.settings.trace_native_calls {
            log::trace!("webgl2: {what}");
        }
        let result = {
            let mut state = self.state.borrow_mut();
            f(&*self.gl, &mut state)
        };
        if let Err(e) = &result {
            self.scopes.borrow_mut().report(e);
        }
        result
    }

    /// Makes progress on asynchronous work: pending maps and context loss.
    pub fn poll(&self) {
        if self.check_alive().is_err() {
            return;
        }
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.complete_pending_maps(&*self.gl);
        }
    }
}

/// A WebGL2 device.
///
/// Work executes eagerly on the GL context; buffers map on the next poll of
/// the returned future, queue submission, or `on_submitted_work_done`.
#[derive(Debug)]
pub struct WebGl2Device {
    shared: Rc<DeviceShared>,
    queue: WebGl2Queue,
}

impl WebGl2Device {
    pub(crate) fn new(
        gl: Rc<dyn GlContext>,
        info: AdapterInfo,
        capabilities: Capabilities,
        settings: GfxSettings,
    ) -> GfxResult<Self> {
        let vertex_array = gl
            .create_vertex_array()
            .map_err(|e| GfxError::internal(format!("createVertexArray failed: {e}")))?;
        gl.bind_vertex_array(vertex_array);
        let scopes = ErrorScopeStack::new(settings.log_uncaptured_errors);
        let shared = Rc::new(DeviceShared {
            gl,
            info,
            capabilities,
            settings,
            state: RefCell::new(DeviceState::new(vertex_array)),
            scopes: RefCell::new(scopes),
            lost: DeviceLostSignal::new(),
            destroyed: Cell::new(false),
        });
        Ok(Self {
            queue: WebGl2Queue::new(shared.clone()),
            shared,
        })
    }

    /// Texture standing for the canvas's drawing buffer.
    ///
    /// It can only be used as the sole color attachment of a render pass.
    pub fn create_canvas_texture(&self, width: u32, height: u32, format: TextureFormat) -> GfxResult<TextureId> {
        self.shared.guard("canvas texture", |_, state| {
            let entry = GlTextureEntry::canvas(width, height, format)?;
            Ok(state.textures.insert(entry))
        })
    }

    /// Settings the device was created with.
    pub fn settings(&self) -> &GfxSettings {
        &self.shared.settings
    }

    fn query<T>(&self, f: impl FnOnce(&DeviceState) -> GfxResult<T>) -> GfxResult<T> {
        let result = f(&self.shared.state.borrow());
        if let Err(e) = &result {
            self.shared.report(e);
        }
        result
    }
}

impl GfxDevice for WebGl2Device {
    fn adapter_info(&self) -> &AdapterInfo {
        &self.shared.info
    }

    fn capabilities(&self) -> &Capabilities {
        &self.shared.capabilities
    }

    fn queue(&self) -> &dyn GfxQueue {
        &self.queue
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> GfxResult<BufferId> {
        self.shared.guard("createBuffer", |gl, state| {
            validation::buffer_descriptor(desc, &self.shared.capabilities.limits)?;
            let entry = GlBufferEntry::create(gl, desc)?;
            if let Err(e) = self.shared.check_allocation("create_buffer") {
                gl.delete_buffer(entry.name);
                return Err(e);
            }
            Ok(state.buffers.insert(entry))
        })
    }

    fn destroy_buffer(&self, id: BufferId) -> GfxResult<()> {
        self.shared.release("deleteBuffer", |gl, state| {
            if let Some(mut buffer) = state.buffers.remove(id)? {
                buffer.abort_map("buffer destroyed");
                gl.delete_buffer(buffer.name);
            }
            Ok(())
        })
    }

    fn buffer_descriptor(&self, id: BufferId) -> GfxResult<BufferDescriptor> {
        self.query(|state| Ok(state.buffers.get(id)?.desc.clone()))
    }

    fn buffer_map_state(&self, id: BufferId) -> GfxResult<MapState> {
        self.query(|state| Ok(state.buffers.get(id)?.map_state))
    }

    fn map_buffer_async(
        &self,
        id: BufferId,
        mode: MapMode,
        offset: u64,
        size: Option<u64>,
    ) -> GfxFuture<GfxResult<()>> {
        if let Err(e) = self.shared.check_alive() {
            return GfxFuture::ready(Err(e));
        }
        let (promise, future) = GfxFuture::pending();
        let outcome = {
            let mut state = self.shared.state.borrow_mut();
            match state.buffers.get_mut(id) {
                Ok(buffer) => buffer.begin_map(mode, offset, size, promise),
                Err(e) => Err((e, promise)),
            }
        };
        match outcome {
            Ok(()) => {
                let shared = self.shared.clone();
                future.with_driver(Box::new(move || shared.poll()))
            }
            Err((e, promise)) => {
                self.shared.report(&e);
                promise.resolve(Err(e));
                future
            }
        }
    }

    fn get_mapped_range(&self, id: BufferId, offset: u64, size: Option<u64>) -> GfxResult<Vec<u8>> {
        self.shared
            .guard("getMappedRange", |_, state| state.buffers.get(id)?.mapped_bytes(offset, size))
    }

    fn write_mapped_range(&self, id: BufferId, offset: u64, data: &[u8]) -> GfxResult<()> {
        self.shared
            .guard("writeMappedRange", |_, state| state.buffers.get_mut(id)?.write_mapped(offset, data))
    }

    fn unmap_buffer(&self, id: BufferId) -> GfxResult<()> {
        self.shared
            .guard("unmap", |gl, state| state.buffers.get_mut(id)?.unmap(gl))
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GfxResult<TextureId> {
        self.shared.guard("createTexture", |gl, state| {
            let entry = GlTextureEntry::create(gl, desc, &self.shared.capabilities.limits)?;
            if let Err(e) = self.shared.check_allocation("create_texture") {
                gl.delete_texture(entry.name);
                return Err(e);
            }
            Ok(state.textures.insert(entry))
        })
    }

    fn destroy_texture(&self, id: TextureId) -> GfxResult<()> {
        self.shared.release("deleteTexture", |gl, state| {
            if let Some(texture) = state.textures.remove(id)? {
                if !texture.canvas {
                    gl.delete_texture(texture.name);
                }
            }
            Ok(())
        })
    }

    fn texture_descriptor(&self, id: TextureId) -> GfxResult<TextureDescriptor> {
        self.query(|state| Ok(state.textures.get(id)?.desc.clone()))
    }

    fn create_texture_view(&self, texture: TextureId, desc: &TextureViewDescriptor) -> GfxResult<TextureViewId> {
        self.shared.guard("createView", |_, state| {
            let entry = GlTextureViewEntry::create(texture, state.textures.get(texture)?, desc)?;
            Ok(state.texture_views.insert(entry))
        })
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> GfxResult<()> {
        self.shared
            .release("destroyView", |_, state| state.texture_views.remove(id).map(drop))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GfxResult<SamplerId> {
        self.shared.guard("createSampler", |gl, state| {
            let entry = GlSamplerEntry::create(gl, desc)?;
            Ok(state.samplers.insert(entry))
        })
    }

    fn destroy_sampler(&self, id: SamplerId) -> GfxResult<()> {
        self.shared.release("deleteSampler", |gl, state| {
            if let Some(sampler) = state.samplers.remove(id)? {
                gl.delete_sampler(sampler.name);
            }
            Ok(())
        })
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GfxResult<ShaderModuleId> {
        self.shared.guard("createShaderModule", |_, state| {
            desc.validate()?;
            if !desc.sources.iter().any(|s| s.kind() == ShaderSourceKind::Native) {
                return Err(GfxError::unsupported(format!(
                    "shader module '{}': WebGL2 needs GLSL ES 3.00 sources",
                    desc.label.as_deref().unwrap_or("<unlabeled>")
                )));
            }
            Ok(state.shader_modules.insert(GlShaderModuleEntry::new(desc.clone())))
        })
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> GfxResult<()> {
        self.shared.release("deleteShaderModule", |gl, state| {
            if let Some(module) = state.shader_modules.remove(id)? {
                module.delete(gl);
            }
            Ok(())
        })
    }

    fn get_compilation_info(&self, id: ShaderModuleId) -> GfxResult<Vec<CompilationMessage>> {
        self.shared.guard("getCompilationInfo", |gl, state| {
            Ok(state.shader_modules.get_mut(id)?.compilation_info(gl))
        })
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GfxResult<BindGroupLayoutId> {
        self.shared.guard("createBindGroupLayout", |_, state| {
            validation::bind_group_layout(desc, &self.shared.capabilities.limits)?;
            for entry in &desc.entries {
                let storage = matches!(
                    entry.ty,
                    BindingType::Buffer {
                        ty: BufferBindingType::Storage { .. },
                        ..
                    } | BindingType::StorageTexture { .. }
                );
                if storage {
                    return Err(GfxError::unsupported(format!(
                        "bind group layout '{}' binding {}: storage bindings are not available on WebGL2",
                        desc.label.as_deref().unwrap_or("<unlabeled>"),
                        entry.binding
                    )));
                }
            }
            Ok(state.bind_group_layouts.insert(desc.clone()))
        })
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> GfxResult<()> {
        self.shared
            .release("destroyBindGroupLayout", |_, state| state.bind_group_layouts.remove(id).map(drop))
    }

    fn create_bind_group(&self, desc: &BindGroupDescriptor) -> GfxResult<BindGroupId> {
        self.shared.guard("createBindGroup", |_, state| {
            let entry = GlBindGroupEntry::create(state, &self.shared.capabilities, desc)?;
            Ok(state.bind_groups.insert(entry))
        })
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> GfxResult<()> {
        self.shared
            .release("destroyBindGroup", |_, state| state.bind_groups.remove(id).map(drop))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDescriptor) -> GfxResult<PipelineLayoutId> {
        self.shared.guard("createPipelineLayout", |_, state| {
            validation::pipeline_layout(desc, &self.shared.capabilities.limits)?;
            for layout in &desc.bind_group_layouts {
                state.bind_group_layouts.get(*layout)?;
            }
            Ok(state.pipeline_layouts.insert(desc.bind_group_layouts.clone()))
        })
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> GfxResult<()> {
        self.shared
            .release("destroyPipelineLayout", |_, state| state.pipeline_layouts.remove(id).map(drop))
    }

    fn create_render_pipeline(&self, desc: &RenderPipelineDescriptor) -> GfxResult<RenderPipelineId> {
        self.shared.guard("createRenderPipeline", |gl, state| {
            let entry = GlRenderPipelineEntry::create(gl, state, &self.shared.capabilities, desc)?;
            Ok(state.render_pipelines.insert(entry))
        })
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> GfxResult<()> {
        self.shared.release("deleteProgram", |gl, state| {
            if let Some(pipeline) = state.render_pipelines.remove(id)? {
                pipeline.delete(gl);
                for layout in &pipeline.auto_layouts {
                    state.bind_group_layouts.remove(*layout)?;
                }
            }
            Ok(())
        })
    }

    fn get_bind_group_layout(&self, pipeline: RenderPipelineId, index: u32) -> GfxResult<BindGroupLayoutId> {
        self.query(|state| state.render_pipelines.get(pipeline)?.bind_group_layout(index))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDescriptor) -> GfxResult<ComputePipelineId> {
        self.shared.guard("createComputePipeline", |_, _| {
            Err(GfxError::unsupported(format!(
                "compute pipeline '{}': compute is not available on WebGL2",
                desc.label.as_deref().unwrap_or("<unlabeled>")
            )))
        })
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> GfxResult<()> {
        self.shared
            .release("destroyComputePipeline", |_, state| state.compute_pipelines.remove(id).map(drop))
    }

    fn create_command_encoder(&self, desc: &CommandEncoderDescriptor) -> GfxResult<Box<dyn GfxCommandEncoder + '_>> {
        self.shared.guard("createCommandEncoder", |_, _| Ok(()))?;
        Ok(Box::new(WebGl2CommandEncoder::new(self.shared.clone(), desc)))
    }

    fn push_error_scope(&self, filter: ErrorFilter) {
        self.shared.scopes.borrow_mut().push(filter);
    }

    fn pop_error_scope(&self) -> GfxResult<Option<GfxError>> {
        if self.shared.settings.poll_native_errors {
            self.shared.drain_native_errors();
        }
        self.shared.scopes.borrow_mut().pop()
    }

    fn on_uncaptured_error(&self, handler: UncapturedErrorHandler) {
        self.shared.scopes.borrow_mut().set_uncaptured_handler(handler);
    }

    fn lost(&self) -> GfxFuture<DeviceLostInfo> {
        let shared = self.shared.clone();
        self.shared.lost.lost().with_driver(Box::new(move || {
            let _ = shared.check_alive();
        }))
    }

    fn destroy(&self) {
        if self.shared.destroyed.replace(true) {
            return;
        }
        self.shared.lost.resolve(DeviceLostReason::Destroyed, "device destroyed");
        self.shared.state.borrow_mut().release_all(&*self.shared.gl);
        log::info!("WebGL2 device on '{}' destroyed", self.shared.info.name);
    }
}
