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

//! Arena entries pairing `wgpu` objects with the descriptors they were built from.

use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::future::GfxPromise;
use easel_core::gfx::handle::{BindGroupLayoutId, BufferId, TextureId};
use easel_core::gfx::validation;
use std::collections::HashMap;

pub(crate) fn label(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("<unlabeled>")
}

/// Outcome of a native `map_async` callback, queued until the next poll.
#[derive(Debug)]
pub(crate) struct MapCompletion {
    pub buffer: BufferId,
    pub serial: u64,
    pub result: Result<(), String>,
}

#[derive(Debug)]
pub(crate) struct PendingMap {
    pub serial: u64,
    pub mode: MapMode,
    pub range: MappedRange,
    pub promise: GfxPromise<GfxResult<()>>,
}

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub buffer: wgpu::Buffer,
    pub desc: BufferDescriptor,
    pub map_state: MapState,
    pub mapping: Option<(MapMode, MappedRange)>,
    pub pending: Option<PendingMap>,
}

impl WgpuBufferEntry {
    pub fn new(buffer: wgpu::Buffer, desc: &BufferDescriptor) -> Self {
        let (map_state, mapping) = if desc.mapped_at_creation {
            let range = MappedRange {
                offset: 0,
                size: desc.size,
            };
            (MapState::MappedForWrite, Some((MapMode::Write, range)))
        } else {
            (MapState::Unmapped, None)
        };
        Self {
            buffer,
            desc: desc.clone(),
            map_state,
            mapping,
            pending: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.desc.size
    }

    /// Fails unless the buffer is unmapped with no pending map.
    pub fn ensure_unmapped(&self, what: &str) -> GfxResult<()> {
        if self.map_state == MapState::Unmapped {
            Ok(())
        } else {
            Err(GfxError::validation(format!(
                "{what}: buffer '{}' is {:?}",
                label(&self.desc.label),
                self.map_state
            )))
        }
    }

    /// Validates a map request and returns the range to map.
    ///
    /// `wgpu` cannot map an empty slice, so zero-sized maps are rejected.
    pub fn check_map(&self, mode: MapMode, offset: u64, size: Option<u64>) -> GfxResult<MappedRange> {
        if self.map_state != MapState::Unmapped {
            return Err(GfxError::validation(format!(
                "map_buffer_async: buffer '{}' is already {:?}",
                label(&self.desc.label),
                self.map_state
            )));
        }
        validation::require_buffer_usage(self.desc.usage, mode.required_usage(), "map_buffer_async")?;
        let size = size.unwrap_or_else(|| self.size().saturating_sub(offset));
        if offset % 8 != 0 {
            return Err(GfxError::validation(format!(
                "map_buffer_async: offset {offset} is not a multiple of 8"
            )));
        }
        validation::buffer_range(self.size(), offset, size, "map_buffer_async")?;
        if size == 0 {
            return Err(GfxError::validation("map_buffer_async: the mapped range is empty"));
        }
        Ok(MappedRange { offset, size })
    }

    /// Resolves the pending map issued with `serial`; stale callbacks are ignored.
    pub fn complete_map(&mut self, serial: u64, result: Result<(), String>) {
        if self.pending.as_ref().map(|p| p.serial) != Some(serial) {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };
        match result {
            Ok(()) => {
                self.map_state = match pending.mode {
                    MapMode::Read => MapState::MappedForRead,
                    MapMode::Write => MapState::MappedForWrite,
                };
                self.mapping = Some((pending.mode, pending.range));
                pending.promise.resolve(Ok(()));
            }
            Err(message) => {
                self.map_state = MapState::Unmapped;
                pending
                    .promise
                    .resolve(Err(GfxError::validation(format!("map_buffer_async: {message}"))));
            }
        }
    }

    /// Fails a pending map with `reason`.
    pub fn abort_map(&mut self, reason: &str) {
        if let Some(pending) = self.pending.take() {
            log::debug!("Mapping of buffer '{}' aborted: {reason}", label(&self.desc.label));
            pending.promise.resolve(Err(GfxError::validation(reason.to_owned())));
            self.map_state = MapState::Unmapped;
        }
    }

    fn live_range(&self, what: &str, offset: u64, size: u64) -> GfxResult<MapMode> {
        let (mode, range) = self.mapping.ok_or_else(|| {
            GfxError::validation(format!(
                "{what}: buffer '{}' is {:?}",
                label(&self.desc.label),
                self.map_state
            ))
        })?;
        if offset % 8 != 0 || size % 4 != 0 {
            return Err(GfxError::validation(format!(
                "{what}: offset {offset} must be a multiple of 8 and size {size} of 4"
            )));
        }
        if !range.covers(offset, size) {
            return Err(GfxError::validation(format!(
                "{what}: {offset}..{} lies outside the mapped {}..{}",
                offset.saturating_add(size),
                range.offset,
                range.offset + range.size
            )));
        }
        Ok(mode)
    }

    /// Copies bytes out of the live mapping.
    pub fn mapped_bytes(&self, offset: u64, size: Option<u64>) -> GfxResult<Vec<u8>> {
        let end = self.mapping.map_or(offset, |(_, r)| r.offset + r.size);
        let size = size.unwrap_or_else(|| end.saturating_sub(offset));
        self.live_range("get_mapped_range", offset, size)?;
        if size == 0 {
            return Ok(Vec::new());
        }
        Ok(self.buffer.slice(offset..offset + size).get_mapped_range().to_vec())
    }

    /// Writes bytes straight into the live write mapping.
    pub fn write_mapped(&mut self, offset: u64, data: &[u8]) -> GfxResult<()> {
        let size = data.len() as u64;
        if self.live_range("write_mapped_range", offset, size)? != MapMode::Write {
            return Err(GfxError::validation(format!(
                "write_mapped_range: buffer '{}' is not mapped for writing",
                label(&self.desc.label)
            )));
        }
        if size > 0 {
            self.buffer
                .slice(offset..offset + size)
                .get_mapped_range_mut()
                .copy_from_slice(data);
        }
        Ok(())
    }

    /// Ends the mapping; written bytes become visible to the GPU.
    pub fn unmap(&mut self) {
        let natively_mapped = self.map_state != MapState::Unmapped;
        self.abort_map("mapping aborted by unmap_buffer");
        self.mapping = None;
        if natively_mapped {
            self.buffer.unmap();
        }
        self.map_state = MapState::Unmapped;
    }
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub texture: wgpu::Texture,
    pub desc: TextureDescriptor,
}

#[derive(Debug)]
pub(crate) struct WgpuTextureViewEntry {
    pub view: wgpu::TextureView,
    pub texture: TextureId,
    pub resolved: ResolvedTextureView,
}

#[derive(Debug)]
pub(crate) struct WgpuSamplerEntry {
    pub sampler: wgpu::Sampler,
}

#[derive(Debug)]
pub(crate) struct WgpuShaderModuleEntry {
    pub module: wgpu::ShaderModule,
    pub label: Option<String>,
    /// Filled by the first `get_compilation_info`.
    pub messages: Option<Vec<CompilationMessage>>,
}

#[derive(Debug)]
pub(crate) struct WgpuBindGroupLayoutEntry {
    pub layout: wgpu::BindGroupLayout,
    /// `None` for layouts derived from a pipeline's shaders.
    pub desc: Option<BindGroupLayoutDescriptor>,
}

#[derive(Debug)]
pub(crate) struct WgpuBindGroupEntry {
    pub group: wgpu::BindGroup,
    pub layout: BindGroupLayoutId,
}

#[derive(Debug)]
pub(crate) struct WgpuPipelineLayoutEntry {
    pub layout: wgpu::PipelineLayout,
    pub bind_group_layouts: Vec<BindGroupLayoutId>,
}

/// Group layouts of a pipeline: the explicit ones, or those derived on demand.
#[derive(Debug, Default)]
pub(crate) struct PipelineGroups {
    pub explicit: Option<Vec<BindGroupLayoutId>>,
    pub derived: HashMap<u32, BindGroupLayoutId>,
}

#[derive(Debug)]
pub(crate) struct WgpuRenderPipelineEntry {
    pub pipeline: wgpu::RenderPipeline,
    pub groups: PipelineGroups,
}

#[derive(Debug)]
pub(crate) struct WgpuComputePipelineEntry {
    pub pipeline: wgpu::ComputePipeline,
    pub groups: PipelineGroups,
}

/// A finished command buffer; `None` once submitted.
#[derive(Debug)]
pub(crate) struct WgpuCommandBufferEntry {
    pub buffer: Option<wgpu::CommandBuffer>,
    pub label: Option<String>,
}
