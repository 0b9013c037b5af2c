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

//! The explicit device: `wgpu` objects behind the `Gfx*` arenas.
//!
//! Every native call that can fail runs inside a native error scope, so the
//! error is returned synchronously and nothing invalid reaches an arena.
//! Errors raised outside those captures arrive through the uncaptured-error
//! callback and are routed to the device's scopes on the next report, pop or
//! poll.

use super::command::WgpuCommandEncoder;
use super::conversions::{
    binding_type, color_target_state, compilation_message, depth_stencil_state, from_wgpu_error,
    require_texture_format, IntoWgpu,
};
use super::queue::WgpuQueue;
use super::resource::*;
use easel_core::gfx::api::*;
use easel_core::gfx::error::{ErrorFilter, ErrorScopeStack, GfxError, GfxResult, UncapturedErrorHandler};
use easel_core::gfx::future::GfxFuture;
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::{GfxCommandEncoder, GfxDevice, GfxQueue};
use easel_core::gfx::validation;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::num::NonZeroU64;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Every object a `wgpu` device owns.
#[derive(Debug)]
pub(crate) struct WgpuState {
    pub buffers: Arena<kind::Buffer, WgpuBufferEntry>,
    pub textures: Arena<kind::Texture, WgpuTextureEntry>,
    pub texture_views: Arena<kind::TextureView, WgpuTextureViewEntry>,
    pub samplers: Arena<kind::Sampler, WgpuSamplerEntry>,
    pub shader_modules: Arena<kind::ShaderModule, WgpuShaderModuleEntry>,
    pub bind_group_layouts: Arena<kind::BindGroupLayout, WgpuBindGroupLayoutEntry>,
    pub bind_groups: Arena<kind::BindGroup, WgpuBindGroupEntry>,
    pub pipeline_layouts: Arena<kind::PipelineLayout, WgpuPipelineLayoutEntry>,
    pub render_pipelines: Arena<kind::RenderPipeline, WgpuRenderPipelineEntry>,
    pub compute_pipelines: Arena<kind::ComputePipeline, WgpuComputePipelineEntry>,
    pub command_buffers: Arena<kind::CommandBuffer, WgpuCommandBufferEntry>,
    map_serial: u64,
}

impl WgpuState {
    fn new() -> Self {
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
            map_serial: 0,
        }
    }

    fn next_map_serial(&mut self) -> u64 {
        self.map_serial += 1;
        self.map_serial
    }

    /// Drops every native object and empties the arenas.
    fn release_all(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.abort_map("device destroyed");
        }
        self.buffers.clear();
        self.textures.clear();
        self.texture_views.clear();
        self.samplers.clear();
        self.shader_modules.clear();
        self.bind_group_layouts.clear();
        self.bind_groups.clear();
        self.pipeline_layouts.clear();
        self.render_pipelines.clear();
        self.compute_pipelines.clear();
        self.command_buffers.clear();
    }
}

/// State shared by the device, its queue, encoders and futures.
pub(crate) struct WgpuShared {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: AdapterInfo,
    pub capabilities: Capabilities,
    pub settings: GfxSettings,
    pub state: RefCell<WgpuState>,
    scopes: RefCell<ErrorScopeStack>,
    pub lost: DeviceLostSignal,
    destroyed: Cell<bool>,
    uncaptured: Arc<Mutex<Vec<GfxError>>>,
    pub completions: Arc<Mutex<Vec<MapCompletion>>>,
}

impl fmt::Debug for WgpuShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuShared")
            .field("adapter", &self.info.name)
            .field("lost", &self.lost.is_lost())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl WgpuShared {
    /// Fails with `device-lost` once the device is gone.
    pub fn check_alive(&self) -> GfxResult<()> {
        match self.lost.info() {
            Some(info) => Err(GfxError::DeviceLost(info.message)),
            None => Ok(()),
        }
    }

    /// Routes an error to the scopes, after any queued native errors.
    ///
    /// The uncaptured-error handler runs inside this call and must not call
    /// back into the device.
    pub fn report(&self, error: &GfxError) {
        self.drain_native_errors();
        self.scopes.borrow_mut().report(error);
    }

    /// Routes errors queued by the native uncaptured-error callback.
    pub fn drain_native_errors(&self) {
        let errors = std::mem::take(&mut *lock(&self.uncaptured));
        if errors.is_empty() {
            return;
        }
        let mut scopes = self.scopes.borrow_mut();
        for error in &errors {
            scopes.report(error);
        }
    }

    /// Runs `f` inside native scopes for every filter; returns the value and
    /// the first native error raised meanwhile.
    pub fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<GfxError>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Internal);
        let value = f();
        let mut first = None;
        for _ in 0..3 {
            if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
                first.get_or_insert_with(|| from_wgpu_error(&error));
            }
        }
        (value, first)
    }

    /// Like [`scoped`](Self::scoped), failing on a native error.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> GfxResult<T> {
        match self.scoped(f) {
            (value, None) => Ok(value),
            (_, Some(error)) => Err(error),
        }
    }

    /// Runs `f` on a live device, reporting any error it returns.
    pub fn guard<T>(&self, what: &str, f: impl FnOnce(&mut WgpuState) -> GfxResult<T>) -> GfxResult<T> {
        if self.settings.trace_native_calls {
            log::trace!("wgpu: {what}");
        }
        let result = self.check_alive().and_then(|()| {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        });
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Like [`guard`](Self::guard) but also runs on a lost device.
    pub fn release<T>(&self, what: &str, f: impl FnOnce(&mut WgpuState) -> GfxResult<T>) -> GfxResult<T> {
        if self.settings.trace_native_calls {
            log::trace!("wgpu: {what}");
        }
        let result = {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        };
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Polls the native device and lands finished buffer maps.
    pub fn poll(&self) {
        if self.check_alive().is_err() {
            return;
        }
        let _ = self.device.poll(wgpu::PollType::Poll);
        self.drain_native_errors();
        let completions = std::mem::take(&mut *lock(&self.completions));
        if completions.is_empty() {
            return;
        }
        match self.state.try_borrow_mut() {
            Ok(mut state) => {
                for completion in completions {
                    if let Ok(buffer) = state.buffers.get_mut(completion.buffer) {
                        buffer.complete_map(completion.serial, completion.result);
                    }
                }
            }
            Err(_) => lock(&self.completions).extend(completions),
        }
    }
}

fn pipeline_error(label: &Option<String>, error: GfxError) -> GfxError {
    match error {
        GfxError::OutOfMemory(_) => error,
        other => GfxError::PipelineCreation {
            label: label.clone(),
            message: other.message().to_owned(),
        },
    }
}

fn module_messages(module: &wgpu::ShaderModule) -> Vec<CompilationMessage> {
    pollster::block_on(module.get_compilation_info())
        .messages
        .iter()
        .map(|m| compilation_message(m, None))
        .collect()
}

/// A `wgpu` device.
#[derive(Debug)]
pub struct WgpuDevice {
    shared: Rc<WgpuShared>,
    queue: WgpuQueue,
}

impl WgpuDevice {
    pub(crate) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        info: AdapterInfo,
        capabilities: Capabilities,
        settings: GfxSettings,
    ) -> Self {
        let uncaptured = Arc::new(Mutex::new(Vec::new()));
        let sink = uncaptured.clone();
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            lock(&sink).push(from_wgpu_error(&error));
        }));

        let lost = DeviceLostSignal::new();
        let signal = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            let reason = match reason {
                wgpu::DeviceLostReason::Destroyed => DeviceLostReason::Destroyed,
                #[allow(unreachable_patterns)]
                _ => DeviceLostReason::Unknown,
            };
            signal.resolve(reason, message);
        });

        let scopes = ErrorScopeStack::new(settings.log_uncaptured_errors);
        let shared = Rc::new(WgpuShared {
            device,
            queue,
            info,
            capabilities,
            settings,
            state: RefCell::new(WgpuState::new()),
            scopes: RefCell::new(scopes),
            lost,
            destroyed: Cell::new(false),
            uncaptured,
            completions: Arc::new(Mutex::new(Vec::new())),
        });
        Self {
            queue: WgpuQueue::new(shared.clone()),
            shared,
        }
    }

    /// The native device, for surface configuration and interop.
    pub fn native(&self) -> &wgpu::Device {
        &self.shared.device
    }

    /// Settings the device was created with.
    pub fn settings(&self) -> &GfxSettings {
        &self.shared.settings
    }

    fn query<T>(&self, f: impl FnOnce(&WgpuState) -> GfxResult<T>) -> GfxResult<T> {
        let result = f(&self.shared.state.borrow());
        if let Err(e) = &result {
            self.shared.report(e);
        }
        result
    }

    fn limits(&self) -> &Limits {
        &self.shared.capabilities.limits
    }
}

impl GfxDevice for WgpuDevice {
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
        self.shared.guard("create_buffer", |state| {
            validation::buffer_descriptor(desc, self.limits())?;
            let buffer = self.shared.capture(|| {
                self.shared.device.create_buffer(&wgpu::BufferDescriptor {
                    label: desc.label.as_deref(),
                    size: desc.size,
                    usage: desc.usage.into_wgpu(),
                    mapped_at_creation: desc.mapped_at_creation,
                })
            })?;
            log::debug!("Created buffer '{}' ({} bytes)", label(&desc.label), desc.size);
            Ok(state.buffers.insert(WgpuBufferEntry::new(buffer, desc)))
        })
    }

    fn destroy_buffer(&self, id: BufferId) -> GfxResult<()> {
        self.shared.release("destroy_buffer", |state| {
            if let Some(mut buffer) = state.buffers.remove(id)? {
                buffer.abort_map("buffer destroyed");
                buffer.buffer.destroy();
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
        let started = {
            let mut state = self.shared.state.borrow_mut();
            let serial = state.next_map_serial();
            state.buffers.get_mut(id).and_then(|buffer| {
                let range = buffer.check_map(mode, offset, size)?;
                let sink = self.shared.completions.clone();
                self.shared.capture(|| {
                    buffer
                        .buffer
                        .slice(range.offset..range.offset + range.size)
                        .map_async(mode.into_wgpu(), move |result| {
                            lock(&sink).push(MapCompletion {
                                buffer: id,
                                serial,
                                result: result.map_err(|e| e.to_string()),
                            });
                        });
                })?;
                buffer.map_state = MapState::Pending;
                Ok((serial, range))
            })
        };
        match started {
            Ok((serial, range)) => {
                if let Ok(buffer) = self.shared.state.borrow_mut().buffers.get_mut(id) {
                    buffer.pending = Some(PendingMap {
                        serial,
                        mode,
                        range,
                        promise,
                    });
                }
                let shared = self.shared.clone();
                future.with_driver(Box::new(move || shared.poll()))
            }
            Err(e) => {
                self.shared.report(&e);
                promise.resolve(Err(e));
                future
            }
        }
    }

    fn get_mapped_range(&self, id: BufferId, offset: u64, size: Option<u64>) -> GfxResult<Vec<u8>> {
        self.shared
            .guard("get_mapped_range", |state| state.buffers.get(id)?.mapped_bytes(offset, size))
    }

    fn write_mapped_range(&self, id: BufferId, offset: u64, data: &[u8]) -> GfxResult<()> {
        self.shared
            .guard("write_mapped_range", |state| state.buffers.get_mut(id)?.write_mapped(offset, data))
    }

    fn unmap_buffer(&self, id: BufferId) -> GfxResult<()> {
        self.shared.guard("unmap_buffer", |state| {
            state.buffers.get_mut(id)?.unmap();
            Ok(())
        })
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GfxResult<TextureId> {
        self.shared.guard("create_texture", |state| {
            validation::texture_descriptor(desc, self.limits())?;
            let format = require_texture_format(desc.format)?;
            let view_formats = desc
                .view_formats
                .iter()
                .map(|&f| require_texture_format(f))
                .collect::<GfxResult<Vec<_>>>()?;
            let texture = self.shared.capture(|| {
                self.shared.device.create_texture(&wgpu::TextureDescriptor {
                    label: desc.label.as_deref(),
                    size: desc.size.into_wgpu(),
                    mip_level_count: desc.mip_level_count,
                    sample_count: desc.sample_count,
                    dimension: desc.dimension.into_wgpu(),
                    format,
                    usage: desc.usage.into_wgpu(),
                    view_formats: &view_formats,
                })
            })?;
            Ok(state.textures.insert(WgpuTextureEntry {
                texture,
                desc: desc.clone(),
            }))
        })
    }

    fn destroy_texture(&self, id: TextureId) -> GfxResult<()> {
        self.shared.release("destroy_texture", |state| {
            if let Some(texture) = state.textures.remove(id)? {
                texture.texture.destroy();
            }
            Ok(())
        })
    }

    fn texture_descriptor(&self, id: TextureId) -> GfxResult<TextureDescriptor> {
        self.query(|state| Ok(state.textures.get(id)?.desc.clone()))
    }

    fn create_texture_view(&self, texture: TextureId, desc: &TextureViewDescriptor) -> GfxResult<TextureViewId> {
        self.shared.guard("create_texture_view", |state| {
            let entry = state.textures.get(texture)?;
            let resolved = validation::texture_view(&entry.desc, desc)?;
            let format = require_texture_format(resolved.format)?;
            let view = self.shared.capture(|| {
                entry.texture.create_view(&wgpu::TextureViewDescriptor {
                    label: desc.label.as_deref(),
                    format: Some(format),
                    dimension: Some(resolved.dimension.into_wgpu()),
                    aspect: resolved.aspect.into_wgpu(),
                    base_mip_level: resolved.base_mip_level,
                    mip_level_count: Some(resolved.mip_level_count),
                    base_array_layer: resolved.base_array_layer,
                    array_layer_count: Some(resolved.array_layer_count),
                    ..Default::default()
                })
            })?;
            Ok(state.texture_views.insert(WgpuTextureViewEntry {
                view,
                texture,
                resolved,
            }))
        })
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> GfxResult<()> {
        self.shared
            .release("destroy_texture_view", |state| state.texture_views.remove(id).map(drop))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GfxResult<SamplerId> {
        self.shared.guard("create_sampler", |state| {
            validation::sampler_descriptor(desc)?;
            let sampler = self.shared.capture(|| {
                self.shared.device.create_sampler(&wgpu::SamplerDescriptor {
                    label: desc.label.as_deref(),
                    address_mode_u: desc.address_mode_u.into_wgpu(),
                    address_mode_v: desc.address_mode_v.into_wgpu(),
                    address_mode_w: desc.address_mode_w.into_wgpu(),
                    mag_filter: desc.mag_filter.into_wgpu(),
                    min_filter: desc.min_filter.into_wgpu(),
                    mipmap_filter: desc.mipmap_filter.into_wgpu(),
                    lod_min_clamp: desc.lod_min_clamp,
                    lod_max_clamp: desc.lod_max_clamp,
                    compare: desc.compare.map(IntoWgpu::into_wgpu),
                    anisotropy_clamp: desc.anisotropy_clamp,
                    border_color: None,
                })
            })?;
            Ok(state.samplers.insert(WgpuSamplerEntry { sampler }))
        })
    }

    fn destroy_sampler(&self, id: SamplerId) -> GfxResult<()> {
        self.shared
            .release("destroy_sampler", |state| state.samplers.remove(id).map(drop))
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GfxResult<ShaderModuleId> {
        self.shared.guard("create_shader_module", |state| {
            desc.validate()?;
            let name = label(&desc.label);
            let canonical = desc.sources.iter().find_map(|s| match s {
                ShaderSource::Canonical(code) => Some(wgpu::ShaderSource::Wgsl(Cow::Borrowed(code.as_str()))),
                _ => None,
            });
            let bytecode = desc.sources.iter().find_map(|s| match s {
                ShaderSource::Bytecode(words) => Some(wgpu::ShaderSource::SpirV(Cow::Borrowed(words.as_slice()))),
                _ => None,
            });
            let source = canonical.or(bytecode).ok_or_else(|| {
                GfxError::unsupported(format!(
                    "shader module '{name}': wgpu needs a WGSL or SPIR-V source"
                ))
            })?;
            let (module, error) = self.shared.scoped(|| {
                self.shared.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: desc.label.as_deref(),
                    source,
                })
            });
            if let Some(error) = error {
                return Err(GfxError::ShaderCompilation {
                    stage: None,
                    message: format!("shader module '{name}': {}", error.message()),
                    diagnostics: module_messages(&module),
                });
            }
            Ok(state.shader_modules.insert(WgpuShaderModuleEntry {
                module,
                label: desc.label.clone(),
                messages: None,
            }))
        })
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> GfxResult<()> {
        self.shared
            .release("destroy_shader_module", |state| state.shader_modules.remove(id).map(drop))
    }

    fn get_compilation_info(&self, id: ShaderModuleId) -> GfxResult<Vec<CompilationMessage>> {
        self.shared.guard("get_compilation_info", |state| {
            let entry = state.shader_modules.get_mut(id)?;
            let messages = entry.messages.get_or_insert_with(|| module_messages(&entry.module));
            Ok(messages.clone())
        })
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GfxResult<BindGroupLayoutId> {
        self.shared.guard("create_bind_group_layout", |state| {
            validation::bind_group_layout(desc, self.limits())?;
            let entries = desc
                .entries
                .iter()
                .map(|e| {
                    Ok(wgpu::BindGroupLayoutEntry {
                        binding: e.binding,
                        visibility: e.visibility.into_wgpu(),
                        ty: binding_type(e.ty)?,
                        count: None,
                    })
                })
                .collect::<GfxResult<Vec<_>>>()?;
            let layout = self.shared.capture(|| {
                self.shared
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: desc.label.as_deref(),
                        entries: &entries,
                    })
            })?;
            Ok(state.bind_group_layouts.insert(WgpuBindGroupLayoutEntry {
                layout,
                desc: Some(desc.clone()),
            }))
        })
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> GfxResult<()> {
        self.shared
            .release("destroy_bind_group_layout", |state| state.bind_group_layouts.remove(id).map(drop))
    }

    fn create_bind_group(&self, desc: &BindGroupDescriptor) -> GfxResult<BindGroupId> {
        self.shared.guard("create_bind_group", |state| {
            let group = {
                let layout = state.bind_group_layouts.get(desc.layout)?;
                if let Some(shape) = &layout.desc {
                    validation::bind_group_shape(shape, desc)?;
                }
                let mut entries = Vec::with_capacity(desc.entries.len());
                for entry in &desc.entries {
                    let resource = match entry.resource {
                        BindingResource::Buffer(binding) => {
                            let buffer = state.buffers.get(binding.buffer)?;
                            let size = binding.size.unwrap_or_else(|| buffer.size().saturating_sub(binding.offset));
                            validation::range_end(buffer.size(), binding.offset, size, "create_bind_group")?;
                            wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer: &buffer.buffer,
                                offset: binding.offset,
                                size: binding.size.and_then(NonZeroU64::new),
                            })
                        }
                        BindingResource::Sampler(id) => {
                            wgpu::BindingResource::Sampler(&state.samplers.get(id)?.sampler)
                        }
                        BindingResource::TextureView(id) => {
                            wgpu::BindingResource::TextureView(&state.texture_views.get(id)?.view)
                        }
                    };
                    entries.push(wgpu::BindGroupEntry {
                        binding: entry.binding,
                        resource,
                    });
                }
                self.shared.capture(|| {
                    self.shared.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: desc.label.as_deref(),
                        layout: &layout.layout,
                        entries: &entries,
                    })
                })?
            };
            Ok(state.bind_groups.insert(WgpuBindGroupEntry {
                group,
                layout: desc.layout,
            }))
        })
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> GfxResult<()> {
        self.shared
            .release("destroy_bind_group", |state| state.bind_groups.remove(id).map(drop))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDescriptor) -> GfxResult<PipelineLayoutId> {
        self.shared.guard("create_pipeline_layout", |state| {
            validation::pipeline_layout(desc, self.limits())?;
            let layout = {
                let groups = desc
                    .bind_group_layouts
                    .iter()
                    .map(|&id| state.bind_group_layouts.get(id).map(|e| &e.layout))
                    .collect::<GfxResult<Vec<_>>>()?;
                self.shared.capture(|| {
                    self.shared
                        .device
                        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                            label: desc.label.as_deref(),
                            bind_group_layouts: &groups,
                            push_constant_ranges: &[],
                        })
                })?
            };
            Ok(state.pipeline_layouts.insert(WgpuPipelineLayoutEntry {
                layout,
                bind_group_layouts: desc.bind_group_layouts.clone(),
            }))
        })
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> GfxResult<()> {
        self.shared
            .release("destroy_pipeline_layout", |state| state.pipeline_layouts.remove(id).map(drop))
    }

    fn create_render_pipeline(&self, desc: &RenderPipelineDescriptor) -> GfxResult<RenderPipelineId> {
        self.shared.guard("create_render_pipeline", |state| {
            validation::render_pipeline(desc, self.limits())?;
            let (pipeline, explicit) = {
                let (layout, explicit) = match desc.layout {
                    PipelineLayoutChoice::Auto => (None, None),
                    PipelineLayoutChoice::Explicit(id) => {
                        let entry = state.pipeline_layouts.get(id)?;
                        (Some(&entry.layout), Some(entry.bind_group_layouts.clone()))
                    }
                };
                let vertex_module = &state.shader_modules.get(desc.vertex.stage.module)?.module;
                let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
                    .vertex
                    .buffers
                    .iter()
                    .map(|b| b.attributes.iter().map(|&a| a.into_wgpu()).collect())
                    .collect();
                let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
                    .vertex
                    .buffers
                    .iter()
                    .zip(&attributes)
                    .map(|(b, attributes)| wgpu::VertexBufferLayout {
                        array_stride: b.array_stride,
                        step_mode: b.step_mode.into_wgpu(),
                        attributes,
                    })
                    .collect();
                let depth_stencil = desc.depth_stencil.map(depth_stencil_state).transpose()?;
                let fragment = match &desc.fragment {
                    Some(fragment) => {
                        let module = &state.shader_modules.get(fragment.stage.module)?.module;
                        let targets = fragment
                            .targets
                            .iter()
                            .map(|t| t.map(color_target_state).transpose())
                            .collect::<GfxResult<Vec<_>>>()?;
                        Some((module, fragment.stage.entry_point.as_deref(), targets))
                    }
                    None => None,
                };
                let (pipeline, error) = self.shared.scoped(|| {
                    self.shared
                        .device
                        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                            label: desc.label.as_deref(),
                            layout,
                            vertex: wgpu::VertexState {
                                module: vertex_module,
                                entry_point: desc.vertex.stage.entry_point.as_deref(),
                                compilation_options: Default::default(),
                                buffers: &buffers,
                            },
                            primitive: desc.primitive.into_wgpu(),
                            depth_stencil,
                            multisample: desc.multisample.into_wgpu(),
                            fragment: fragment.as_ref().map(|(module, entry_point, targets)| {
                                wgpu::FragmentState {
                                    module,
                                    entry_point: *entry_point,
                                    compilation_options: Default::default(),
                                    targets,
                                }
                            }),
                            multiview: None,
                            cache: None,
                        })
                });
                if let Some(error) = error {
                    return Err(pipeline_error(&desc.label, error));
                }
                (pipeline, explicit)
            };
            log::debug!("Created render pipeline '{}'", label(&desc.label));
            Ok(state.render_pipelines.insert(WgpuRenderPipelineEntry {
                pipeline,
                groups: PipelineGroups {
                    explicit,
                    ..Default::default()
                },
            }))
        })
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> GfxResult<()> {
        self.shared
            .release("destroy_render_pipeline", |state| state.render_pipelines.remove(id).map(drop))
    }

    fn get_bind_group_layout(&self, pipeline: RenderPipelineId, index: u32) -> GfxResult<BindGroupLayoutId> {
        self.shared.guard("get_bind_group_layout", |state| {
            let layout = {
                let entry = state.render_pipelines.get(pipeline)?;
                if let Some(explicit) = &entry.groups.explicit {
                    return explicit.get(index as usize).copied().ok_or_else(|| {
                        GfxError::validation(format!(
                            "get_bind_group_layout: pipeline layout has no bind group {index}"
                        ))
                    });
                }
                if let Some(&id) = entry.groups.derived.get(&index) {
                    return Ok(id);
                }
                self.shared.capture(|| entry.pipeline.get_bind_group_layout(index))?
            };
            let id = state
                .bind_group_layouts
                .insert(WgpuBindGroupLayoutEntry { layout, desc: None });
            state.render_pipelines.get_mut(pipeline)?.groups.derived.insert(index, id);
            Ok(id)
        })
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDescriptor) -> GfxResult<ComputePipelineId> {
        self.shared.guard("create_compute_pipeline", |state| {
            if !self.shared.capabilities.has_feature(features::COMPUTE) {
                return Err(GfxError::unsupported(format!(
                    "compute pipeline '{}': the adapter has no compute support",
                    label(&desc.label)
                )));
            }
            let (pipeline, explicit) = {
                let (layout, explicit) = match desc.layout {
                    PipelineLayoutChoice::Auto => (None, None),
                    PipelineLayoutChoice::Explicit(id) => {
                        let entry = state.pipeline_layouts.get(id)?;
                        (Some(&entry.layout), Some(entry.bind_group_layouts.clone()))
                    }
                };
                let module = &state.shader_modules.get(desc.stage.module)?.module;
                let (pipeline, error) = self.shared.scoped(|| {
                    self.shared
                        .device
                        .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                            label: desc.label.as_deref(),
                            layout,
                            module,
                            entry_point: desc.stage.entry_point.as_deref(),
                            compilation_options: Default::default(),
                            cache: None,
                        })
                });
                if let Some(error) = error {
                    return Err(pipeline_error(&desc.label, error));
                }
                (pipeline, explicit)
            };
            Ok(state.compute_pipelines.insert(WgpuComputePipelineEntry {
                pipeline,
                groups: PipelineGroups {
                    explicit,
                    ..Default::default()
                },
            }))
        })
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> GfxResult<()> {
        self.shared
            .release("destroy_compute_pipeline", |state| state.compute_pipelines.remove(id).map(drop))
    }

    fn create_command_encoder(&self, desc: &CommandEncoderDescriptor) -> GfxResult<Box<dyn GfxCommandEncoder + '_>> {
        let native = self.shared.guard("create_command_encoder", |_| {
            self.shared.capture(|| {
                self.shared
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: desc.label.as_deref(),
                    })
            })
        })?;
        Ok(Box::new(WgpuCommandEncoder::new(self.shared.clone(), native, desc)))
    }

    fn push_error_scope(&self, filter: ErrorFilter) {
        self.shared.scopes.borrow_mut().push(filter);
        self.shared.device.push_error_scope(filter.into_wgpu());
    }

    fn pop_error_scope(&self) -> GfxResult<Option<GfxError>> {
        self.shared.drain_native_errors();
        let ours = self.shared.scopes.borrow_mut().pop()?;
        let native = pollster::block_on(self.shared.device.pop_error_scope()).map(|e| from_wgpu_error(&e));
        Ok(ours.or(native))
    }

    fn on_uncaptured_error(&self, handler: UncapturedErrorHandler) {
        self.shared.scopes.borrow_mut().set_uncaptured_handler(handler);
    }

    fn lost(&self) -> GfxFuture<DeviceLostInfo> {
        let shared = self.shared.clone();
        self.shared.lost.lost().with_driver(Box::new(move || shared.poll()))
    }

    fn destroy(&self) {
        if self.shared.destroyed.replace(true) {
            return;
        }
        self.shared.lost.resolve(DeviceLostReason::Destroyed, "device destroyed");
        self.shared.state.borrow_mut().release_all();
        self.shared.device.destroy();
        log::info!("wgpu device on '{}' destroyed", self.shared.info.name);
    }
}
