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

use super::conversions::IntoWgpu;
use super::device::WgpuShared;
use super::resource::label;
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::future::GfxFuture;
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::GfxQueue;
use easel_core::gfx::validation;
use std::rc::Rc;

/// The queue of a [`WgpuDevice`](super::WgpuDevice).
#[derive(Debug)]
pub struct WgpuQueue {
    shared: Rc<WgpuShared>,
}

impl WgpuQueue {
    pub(crate) fn new(shared: Rc<WgpuShared>) -> Self {
        Self { shared }
    }
}

impl GfxQueue for WgpuQueue {
    fn submit(&self, command_buffers: &[CommandBufferId]) -> GfxResult<()> {
        self.shared.guard("submit", |state| {
            for (i, &id) in command_buffers.iter().enumerate() {
                let entry = state.command_buffers.get(id)?;
                if entry.buffer.is_none() || command_buffers[..i].contains(&id) {
                    return Err(GfxError::validation(format!(
                        "command buffer '{}' was already submitted",
                        label(&entry.label)
                    )));
                }
            }
            let mut native = Vec::with_capacity(command_buffers.len());
            for &id in command_buffers {
                if let Some(buffer) = state.command_buffers.get_mut(id)?.buffer.take() {
                    native.push(buffer);
                }
            }
            self.shared.capture(|| self.shared.queue.submit(native))?;
            Ok(())
        })
    }

    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> GfxResult<()> {
        self.shared.guard("write_buffer", |state| {
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::COPY_DST, "write_buffer")?;
            validation::buffer_range(entry.size(), offset, data.len() as u64, "write_buffer")?;
            entry.ensure_unmapped("write_buffer")?;
            if !data.is_empty() {
                self.shared
                    .capture(|| self.shared.queue.write_buffer(&entry.buffer, offset, data))?;
            }
            Ok(())
        })
    }

    fn write_texture(
        &self,
        destination: &TexelCopyTextureInfo,
        data: &[u8],
        layout: &TexelCopyBufferLayout,
        size: Extent3D,
    ) -> GfxResult<()> {
        self.shared.guard("write_texture", |state| {
            let entry = state.textures.get(destination.texture)?;
            validation::require_texture_usage(entry.desc.usage, TextureUsages::COPY_DST, "write_texture")?;
            if destination.mip_level >= entry.desc.mip_level_count {
                return Err(GfxError::validation(format!(
                    "write_texture: mip level {} does not exist",
                    destination.mip_level
                )));
            }
            self.shared.capture(|| {
                self.shared.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &entry.texture,
                        mip_level: destination.mip_level,
                        origin: destination.origin.into_wgpu(),
                        aspect: destination.aspect.into_wgpu(),
                    },
                    data,
                    wgpu::TexelCopyBufferLayout {
                        offset: layout.offset,
                        bytes_per_row: layout.bytes_per_row,
                        rows_per_image: layout.rows_per_image,
                    },
                    size.into_wgpu(),
                )
            })
        })
    }

    fn on_submitted_work_done(&self) -> GfxFuture<()> {
        if self.shared.check_alive().is_err() {
            return GfxFuture::ready(());
        }
        let (promise, future) = GfxFuture::pending();
        self.shared.queue.on_submitted_work_done(move || promise.resolve(()));
        let shared = self.shared.clone();
        future.with_driver(Box::new(move || shared.poll()))
    }
}
