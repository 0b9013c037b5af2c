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

//! The device trait: resource factory, error scopes and loss.

use crate::gfx::api::*;
use crate::gfx::error::{ErrorFilter, GfxError, GfxResult, UncapturedErrorHandler};
use crate::gfx::future::GfxFuture;
use crate::gfx::handle::*;
use crate::gfx::traits::{GfxCommandEncoder, GfxQueue};
use std::fmt::Debug;

/// A logical GPU device.
///
/// Every object is owned by the device and referenced through ids. Each
/// failing call returns its error and also reports it to the innermost
/// matching error scope, or to the uncaptured handler. After the device is
/// lost every call fails with `device-lost`.
///
/// Devices are single-threaded: implementations are not required to be
/// `Send` or `Sync`.
pub trait GfxDevice: Debug {
    /// Identity of the adapter the device came from.
    fn adapter_info(&self) -> &AdapterInfo;

    /// Features and limits of this device.
    fn capabilities(&self) -> &Capabilities;

    /// The device's queue.
    fn queue(&self) -> &dyn GfxQueue;

    // --- Buffers ---

    /// Creates a buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GfxResult<BufferId>;

    /// Destroys a buffer. Destroying twice is a no-op.
    fn destroy_buffer(&self, id: BufferId) -> GfxResult<()>;

    /// Descriptor the buffer was created with.
    fn buffer_descriptor(&self, id: BufferId) -> GfxResult<BufferDescriptor>;

    /// Current mapping state.
    fn buffer_map_state(&self, id: BufferId) -> GfxResult<MapState>;

    /// Starts mapping `offset..offset + size` (to the end when `size` is `None`).
    ///
    /// The buffer is `Pending` until the future resolves.
    fn map_buffer_async(
        &self,
        id: BufferId,
        mode: MapMode,
        offset: u64,
        size: Option<u64>,
    ) -> GfxFuture<GfxResult<()>>;

    /// Copies bytes out of a live mapping.
    fn get_mapped_range(&self, id: BufferId, offset: u64, size: Option<u64>) -> GfxResult<Vec<u8>>;

    /// Writes bytes into a live write mapping.
    fn write_mapped_range(&self, id: BufferId, offset: u64, data: &[u8]) -> GfxResult<()>;

    /// Ends a mapping, publishing written bytes to the GPU.
    fn unmap_buffer(&self, id: BufferId) -> GfxResult<()>;

    /// Creates a buffer holding `data`, through a mapped-at-creation upload.
    fn create_buffer_init(&self, label: Option<&str>, usage: BufferUsages, data: &[u8]) -> GfxResult<BufferId> {
        let size = (data.len() as u64).next_multiple_of(4).max(4);
        let id = self.create_buffer(&BufferDescriptor {
            label: label.map(str::to_owned),
            size,
            usage,
            mapped_at_creation: true,
        })?;
        self.write_mapped_range(id, 0, data)?;
        self.unmap_buffer(id)?;
        Ok(id)
    }

    // --- Textures and samplers ---

    /// Creates a texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> GfxResult<TextureId>;

    /// Destroys a texture. Destroying twice is a no-op.
    fn destroy_texture(&self, id: TextureId) -> GfxResult<()>;

    /// Descriptor the texture was created with.
    fn texture_descriptor(&self, id: TextureId) -> GfxResult<TextureDescriptor>;

    /// Creates a view over a texture.
    fn create_texture_view(&self, texture: TextureId, desc: &TextureViewDescriptor) -> GfxResult<TextureViewId>;

    /// Destroys a view.
    fn destroy_texture_view(&self, id: TextureViewId) -> GfxResult<()>;

    /// Creates a sampler.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> GfxResult<SamplerId>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> GfxResult<()>;

    // --- Shaders ---

    /// Creates a shader module from one or more source variants.
    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> GfxResult<ShaderModuleId>;

    /// Destroys a shader module.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> GfxResult<()>;

    /// Every diagnostic recorded for the module so far, including those
    /// produced while creating pipelines from it.
    fn get_compilation_info(&self, id: ShaderModuleId) -> GfxResult<Vec<CompilationMessage>>;

    // --- Binding model ---

    /// Creates a bind group layout.
    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GfxResult<BindGroupLayoutId>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> GfxResult<()>;

    /// Creates a bind group; resource kinds are checked against the layout.
    fn create_bind_group(&self, desc: &BindGroupDescriptor) -> GfxResult<BindGroupId>;

    /// Destroys a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> GfxResult<()>;

    /// Creates a pipeline layout.
    fn create_pipeline_layout(&self, desc: &PipelineLayoutDescriptor) -> GfxResult<PipelineLayoutId>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> GfxResult<()>;

    // --- Pipelines ---

    /// Creates a render pipeline.
    fn create_render_pipeline(&self, desc: &RenderPipelineDescriptor) -> GfxResult<RenderPipelineId>;

    /// Destroys a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> GfxResult<()>;

    /// Layout of group `index` of a render pipeline, derived when the
    /// pipeline was created with an automatic layout.
    fn get_bind_group_layout(&self, pipeline: RenderPipelineId, index: u32) -> GfxResult<BindGroupLayoutId>;

    /// Creates a compute pipeline.
    fn create_compute_pipeline(&self, desc: &ComputePipelineDescriptor) -> GfxResult<ComputePipelineId>;

    /// Destroys a compute pipeline.
    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> GfxResult<()>;

    // --- Commands ---

    /// Creates a single-use command encoder.
    fn create_command_encoder(&self, desc: &CommandEncoderDescriptor) -> GfxResult<Box<dyn GfxCommandEncoder + '_>>;

    // --- Errors and loss ---

    /// Opens an error scope.
    fn push_error_scope(&self, filter: ErrorFilter);

    /// Closes the innermost error scope; popping an empty stack is a
    /// `validation` error.
    fn pop_error_scope(&self) -> GfxResult<Option<GfxError>>;

    /// Installs the callback for errors no scope captures.
    fn on_uncaptured_error(&self, handler: UncapturedErrorHandler);

    /// Resolves once, when the device is lost or destroyed.
    fn lost(&self) -> GfxFuture<DeviceLostInfo>;

    /// Destroys the device and every object it owns. Idempotent.
    fn destroy(&self);
}
