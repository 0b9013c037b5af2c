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

use super::device::DeviceShared;
use super::gl::consts::*;
use super::gl::GlContext;
use super::resource::GlTextureEntry;
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::future::GfxFuture;
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::GfxQueue;
use easel_core::gfx::validation;
use std::rc::Rc;

/// The queue of a [`WebGl2Device`](super::WebGl2Device).
///
/// Commands already ran on the context when they were encoded, so
/// submission only seals the command buffers and flushes.
#[derive(Debug)]
pub struct WebGl2Queue {
    shared: Rc<DeviceShared>,
}

impl WebGl2Queue {
    pub(crate) fn new(shared: Rc<DeviceShared>) -> Self {
        Self { shared }
    }
}

/// Byte layout of a texture upload after validation.
#[derive(Debug, Clone, Copy)]
struct UploadLayout {
    row_bytes: u64,
    bytes_per_row: u64,
    rows_per_image: u64,
}

fn upload_layout(
    entry: &GlTextureEntry,
    destination: &TexelCopyTextureInfo,
    data_len: usize,
    layout: &TexelCopyBufferLayout,
    size: Extent3D,
) -> GfxResult<UploadLayout> {
    let what = "write_texture";
    let desc = &entry.desc;
    if destination.mip_level >= desc.mip_level_count {
        return Err(GfxError::validation(format!(
            "{what}: mip level {} does not exist",
            destination.mip_level
        )));
    }
    let mip = desc.size.mip_level_size(destination.mip_level, desc.dimension);
    let origin = destination.origin;
    let fits = |o: u32, s: u32, m: u32| u64::from(o) + u64::from(s) <= u64::from(m);
    if !fits(origin.x, size.width, mip.width)
        || !fits(origin.y, size.height, mip.height)
        || !fits(origin.z, size.depth_or_array_layers, mip.depth_or_array_layers)
    {
        return Err(GfxError::validation(format!("{what}: region leaves mip {}", destination.mip_level)));
    }

    let block_size = u64::from(desc.format.info().block_size);
    let row_bytes = u64::from(size.width) * block_size;
    let bytes_per_row = match layout.bytes_per_row {
        Some(stride) if u64::from(stride) < row_bytes => {
            return Err(GfxError::validation(format!(
                "{what}: bytes_per_row {stride} is smaller than a row ({row_bytes} bytes)"
            )))
        }
        Some(stride) => u64::from(stride),
        None if size.height > 1 || size.depth_or_array_layers > 1 => {
            return Err(GfxError::validation(format!("{what}: bytes_per_row is required for multiple rows")))
        }
        None => row_bytes,
    };
    let rows_per_image = match layout.rows_per_image {
        Some(rows) if rows < size.height => {
            return Err(GfxError::validation(format!(
                "{what}: rows_per_image {rows} is smaller than the copy height"
            )))
        }
        Some(rows) => u64::from(rows),
        None if size.depth_or_array_layers > 1 => {
            return Err(GfxError::validation(format!(
                "{what}: rows_per_image is required for multiple images"
            )))
        }
        None => u64::from(size.height),
    };
    if bytes_per_row % block_size != 0 {
        return Err(GfxError::unsupported(format!(
            "{what}: bytes_per_row must be a multiple of the texel size on WebGL2"
        )));
    }

    let images = u64::from(size.depth_or_array_layers);
    let required = match images {
        0 => Some(0),
        n => (n - 1)
            .checked_mul(bytes_per_row)
            .and_then(|b| b.checked_mul(rows_per_image))
            .and_then(|b| b.checked_add(u64::from(size.height.saturating_sub(1)) * bytes_per_row))
            .and_then(|b| b.checked_add(row_bytes)),
    };
    match required.and_then(|r| r.checked_add(layout.offset)) {
        Some(end) if end <= data_len as u64 => {}
        _ => {
            return Err(GfxError::validation(format!(
                "{what}: data holds {data_len} bytes, the copy at offset {} does not fit",
                layout.offset
            )));
        }
    }
    Ok(UploadLayout {
        row_bytes,
        bytes_per_row,
        rows_per_image,
    })
}

impl GfxQueue for WebGl2Queue {
    fn submit(&self, command_buffers: &[CommandBufferId]) -> GfxResult<()> {
        self.shared.guard("submit", |gl, state| {
            for (i, &id) in command_buffers.iter().enumerate() {
                let entry = state.command_buffers.get(id)?;
                if entry.submitted || command_buffers[..i].contains(&id) {
                    return Err(GfxError::validation(format!(
                        "command buffer '{}' was already submitted",
                        entry.label.as_deref().unwrap_or("<unlabeled>")
                    )));
                }
            }
            for &id in command_buffers {
                state.command_buffers.get_mut(id)?.submitted = true;
            }
            gl.flush();
            state.complete_pending_maps(gl);
            Ok(())
        })
    }

    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> GfxResult<()> {
        self.shared.guard("write_buffer", |gl, state| {
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::COPY_DST, "write_buffer")?;
            if offset % 4 != 0 || data.len() % 4 != 0 {
                return Err(GfxError::validation(format!(
                    "write_buffer: offset {offset} and size {} must be multiples of 4",
                    data.len()
                )));
            }
            validation::buffer_range(entry.size(), offset, data.len() as u64, "write_buffer")?;
            entry.ensure_unmapped("write_buffer")?;
            if !data.is_empty() {
                entry.upload(gl, offset, data)?;
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
        self.shared.guard("write_texture", |gl, state| {
            let entry = state.textures.get(destination.texture)?;
            validation::require_texture_usage(entry.desc.usage, TextureUsages::COPY_DST, "write_texture")?;
            if entry.canvas {
                return Err(GfxError::validation("write_texture: the canvas cannot be written directly"));
            }
            if entry.desc.format.has_depth() {
                return Err(GfxError::validation(format!(
                    "write_texture: {:?} is a depth format",
                    entry.desc.format
                )));
            }
            let upload = upload_layout(entry, destination, data.len(), layout, size)?;
            if size.width == 0 || size.height == 0 || size.depth_or_array_layers == 0 {
                return Ok(());
            }
            write_texels(gl, entry, destination, data, layout.offset, upload, size);
            Ok(())
        })
    }

    fn on_submitted_work_done(&self) -> GfxFuture<()> {
        self.shared.poll();
        GfxFuture::ready(())
    }
}

fn write_texels(
    gl: &dyn GlContext,
    entry: &GlTextureEntry,
    destination: &TexelCopyTextureInfo,
    data: &[u8],
    offset: u64,
    upload: UploadLayout,
    size: Extent3D,
) {
    let block_size = u64::from(entry.desc.format.info().block_size);
    let origin = destination.origin;
    let level = destination.mip_level as i32;
    let fmt = entry.format;
    gl.bind_texture(entry.target, entry.name);
    gl.pixel_store_i32(UNPACK_ALIGNMENT, 1);
    gl.pixel_store_i32(UNPACK_ROW_LENGTH, (upload.bytes_per_row / block_size) as i32);
    gl.pixel_store_i32(UNPACK_IMAGE_HEIGHT, upload.rows_per_image as i32);
    let image_bytes = upload.bytes_per_row * upload.rows_per_image;
    if entry.is_layered() {
        let len = (u64::from(size.depth_or_array_layers) - 1) * image_bytes
            + u64::from(size.height - 1) * upload.bytes_per_row
            + upload.row_bytes;
        let bytes = &data[offset as usize..(offset + len) as usize];
        gl.tex_sub_image_3d(
            entry.target,
            level,
            origin.x as i32,
            origin.y as i32,
            origin.z as i32,
            size.width as i32,
            size.height as i32,
            size.depth_or_array_layers as i32,
            fmt.format,
            fmt.ty,
            bytes,
        );
    } else {
        let len = u64::from(size.height - 1) * upload.bytes_per_row + upload.row_bytes;
        for image in 0..size.depth_or_array_layers {
            let start = offset + u64::from(image) * image_bytes;
            let bytes = &data[start as usize..(start + len) as usize];
            gl.tex_sub_image_2d(
                entry.image_target(origin.z + image),
                level,
                origin.x as i32,
                origin.y as i32,
                size.width as i32,
                size.height as i32,
                fmt.format,
                fmt.ty,
                bytes,
            );
        }
    }
    gl.pixel_store_i32(UNPACK_ROW_LENGTH, 0);
    gl.pixel_store_i32(UNPACK_IMAGE_HEIGHT, 0);
    gl.pixel_store_i32(UNPACK_ALIGNMENT, 4);
    gl.bind_texture(entry.target, 0);
}
