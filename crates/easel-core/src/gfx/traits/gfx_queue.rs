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

//! Queue trait.

use crate::gfx::api::{Extent3D, TexelCopyBufferLayout, TexelCopyTextureInfo};
use crate::gfx::error::GfxResult;
use crate::gfx::future::GfxFuture;
use crate::gfx::handle::{BufferId, CommandBufferId};

/// The single submission queue of a device.
pub trait GfxQueue {
    /// Submits finished command buffers in order. Each buffer can be
    /// submitted once; resubmission is a `validation` error.
    fn submit(&self, command_buffers: &[CommandBufferId]) -> GfxResult<()>;

    /// Writes `data` into `buffer` at `offset`. The buffer needs `COPY_DST`
    /// and must be unmapped.
    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> GfxResult<()>;

    /// Writes texels into a texture region.
    fn write_texture(
        &self,
        destination: &TexelCopyTextureInfo,
        data: &[u8],
        layout: &TexelCopyBufferLayout,
        size: Extent3D,
    ) -> GfxResult<()>;

    /// Resolves once all work submitted so far has completed.
    fn on_submitted_work_done(&self) -> GfxFuture<()>;
}
