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

//! Command encoding on `wgpu`.
//!
//! Commands are forwarded to a native encoder as they are recorded. The
//! checks the native side only reports when the encoder finishes (bounds,
//! usages, mapped buffers) are repeated here so the first failing call
//! invalidates the encoder, as it does on WebGL2.

use super::conversions::{operations, IntoWgpu};
use super::device::{WgpuShared, WgpuState};
use super::resource::{label, WgpuCommandBufferEntry};
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::{EncoderState, GfxCommandEncoder, GfxComputePass, GfxRenderPass};
use easel_core::gfx::validation;
use std::ops::Range;
use std::rc::Rc;

#[derive(Debug)]
pub struct WgpuCommandEncoder {
    shared: Rc<WgpuShared>,
    native: Option<wgpu::CommandEncoder>,
    state: EncoderState,
}

impl WgpuCommandEncoder {
    pub(crate) fn new(shared: Rc<WgpuShared>, native: wgpu::CommandEncoder, desc: &CommandEncoderDescriptor) -> Self {
        Self {
            shared,
            native: Some(native),
            state: EncoderState::new(desc),
        }
    }

    fn run(&mut self, what: &str, f: impl FnOnce(&mut wgpu::CommandEncoder, &WgpuState) -> GfxResult<()>) {
        if !self.state.check_open(what) || self.state.error().is_some() {
            return;
        }
        let Some(native) = self.native.as_mut() else {
            return;
        };
        let result = self.shared.check_alive().and_then(|()| {
            let state = self.shared.state.borrow();
            f(native, &state)
        });
        self.state.record_result(result);
    }
}

/// Byte range `offset..offset + size` of a buffer, rejecting empty ranges.
fn slice_range(total: u64, offset: u64, size: Option<u64>, what: &str) -> GfxResult<Range<u64>> {
    let size = size.unwrap_or_else(|| total.saturating_sub(offset));
    match offset.checked_add(size) {
        Some(end) if end <= total && size > 0 => Ok(offset..end),
        _ => Err(GfxError::validation(format!(
            "{what}: range of {size} bytes at {offset} does not fit a buffer of {total} bytes"
        ))),
    }
}

/// Native ops for one depth-stencil aspect; `None` when the aspect is read-only or absent.
fn aspect_ops<V: Copy>(
    load: Option<LoadOp>,
    store: Option<StoreOp>,
    read_only: bool,
    clear: V,
) -> Option<wgpu::Operations<V>> {
    if read_only {
        return None;
    }
    match (load, store) {
        (Some(load), Some(store)) => Some(operations(load, clear, store)),
        _ => None,
    }
}

fn attachment_view<'s>(state: &'s WgpuState, id: TextureViewId, what: &str) -> GfxResult<&'s wgpu::TextureView> {
    let view = state.texture_views.get(id)?;
    let texture = state.textures.get(view.texture)?;
    validation::require_texture_usage(texture.desc.usage, TextureUsages::RENDER_ATTACHMENT, what)?;
    Ok(&view.view)
}

impl GfxCommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        desc: &RenderPassDescriptor,
    ) -> Box<dyn GfxRenderPass + 'encoder> {
        let live = self.state.begin_pass("begin_render_pass");
        let native = if live && self.state.error().is_none() {
            match self.begin_native_render_pass(desc) {
                Ok(pass) => Some(pass),
                Err(e) => {
                    self.state.record(e);
                    None
                }
            }
        } else {
            None
        };
        Box::new(WgpuRenderPass {
            encoder: &mut self.state,
            shared: self.shared.clone(),
            native,
            live,
            ended: false,
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        desc: &ComputePassDescriptor,
    ) -> Box<dyn GfxComputePass + 'encoder> {
        let live = self.state.begin_pass("begin_compute_pass");
        let mut native = None;
        if live && self.state.error().is_none() {
            if !self.shared.capabilities.has_feature(features::COMPUTE) {
                self.state
                    .record(GfxError::unsupported("compute passes need an adapter with compute support"));
            } else if let Err(e) = self.shared.check_alive() {
                self.state.record(e);
            } else if let Some(encoder) = self.native.as_mut() {
                let pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: desc.label.as_deref(),
                    timestamp_writes: None,
                });
                native = Some(pass.forget_lifetime());
            }
        }
        Box::new(WgpuComputePass {
            encoder: &mut self.state,
            shared: self.shared.clone(),
            native,
            live,
            ended: false,
        })
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        self.run("copy_buffer_to_buffer", |native, state| {
            let what = "copy_buffer_to_buffer";
            let src = state.buffers.get(source)?;
            let dst = state.buffers.get(destination)?;
            validation::require_buffer_usage(src.desc.usage, BufferUsages::COPY_SRC, what)?;
            validation::require_buffer_usage(dst.desc.usage, BufferUsages::COPY_DST, what)?;
            validation::buffer_range(src.size(), source_offset, size, what)?;
            validation::buffer_range(dst.size(), destination_offset, size, what)?;
            src.ensure_unmapped(what)?;
            dst.ensure_unmapped(what)?;
            if source == destination {
                return Err(GfxError::validation(format!("{what}: source and destination are the same buffer")));
            }
            if size > 0 {
                native.copy_buffer_to_buffer(&src.buffer, source_offset, &dst.buffer, destination_offset, size);
            }
            Ok(())
        });
    }

    fn clear_buffer(&mut self, buffer: BufferId, offset: u64, size: Option<u64>) {
        self.run("clear_buffer", |native, state| {
            let entry = state.buffers.get(buffer)?;
            let size = size.unwrap_or_else(|| entry.size().saturating_sub(offset));
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::COPY_DST, "clear_buffer")?;
            validation::buffer_range(entry.size(), offset, size, "clear_buffer")?;
            entry.ensure_unmapped("clear_buffer")?;
            if size > 0 {
                native.clear_buffer(&entry.buffer, offset, Some(size));
            }
            Ok(())
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.state.push_debug_group();
        if let Some(native) = self.native.as_mut() {
            native.push_debug_group(label);
        }
    }

    fn pop_debug_group(&mut self) {
        if self.state.pop_debug_group() {
            if let Some(native) = self.native.as_mut() {
                native.pop_debug_group();
            }
        }
    }

    fn insert_debug_marker(&mut self, label: &str) {
        if let Some(native) = self.native.as_mut() {
            native.insert_debug_marker(label);
        }
    }

    fn finish(&mut self) -> GfxResult<CommandBufferId> {
        let result = self
            .shared
            .check_alive()
            .and_then(|()| self.state.finish())
            .and_then(|()| {
                let native = self
                    .native
                    .take()
                    .ok_or_else(|| GfxError::internal("command encoder lost its native encoder"))?;
                self.shared.capture(|| native.finish())
            })
            .map(|buffer| {
                let entry = WgpuCommandBufferEntry {
                    buffer: Some(buffer),
                    label: self.state.label().map(str::to_owned),
                };
                self.shared.state.borrow_mut().command_buffers.insert(entry)
            });
        if let Err(e) = &result {
            self.shared.report(e);
        }
        result
    }
}

impl WgpuCommandEncoder {
    fn begin_native_render_pass(&mut self, desc: &RenderPassDescriptor) -> GfxResult<wgpu::RenderPass<'static>> {
        self.shared.check_alive()?;
        validation::render_pass_shape(desc, &self.shared.capabilities.limits)?;
        let what = format!("render pass '{}'", label(&desc.label));
        let state = self.shared.state.borrow();

        let view = |id: TextureViewId| attachment_view(&state, id, &what);

        let mut color_attachments = Vec::with_capacity(desc.color_attachments.len());
        for attachment in &desc.color_attachments {
            let Some(attachment) = attachment else {
                color_attachments.push(None);
                continue;
            };
            let resolve_target = attachment.resolve_target.map(view).transpose()?;
            let clear = attachment.clear_value.unwrap_or_default().into_wgpu();
            color_attachments.push(Some(wgpu::RenderPassColorAttachment {
                view: view(attachment.view)?,
                depth_slice: None,
                resolve_target,
                ops: operations(attachment.load_op, clear, attachment.store_op),
            }));
        }

        let depth_stencil_attachment = match &desc.depth_stencil_attachment {
            Some(ds) => Some(wgpu::RenderPassDepthStencilAttachment {
                view: view(ds.view)?,
                depth_ops: aspect_ops(ds.depth_load_op, ds.depth_store_op, ds.depth_read_only, ds.depth_clear_value),
                stencil_ops: aspect_ops(
                    ds.stencil_load_op,
                    ds.stencil_store_op,
                    ds.stencil_read_only,
                    ds.stencil_clear_value,
                ),
            }),
            None => None,
        };

        let encoder = self
            .native
            .as_mut()
            .ok_or_else(|| GfxError::internal("command encoder lost its native encoder"))?;
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: desc.label.as_deref(),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        Ok(pass.forget_lifetime())
    }
}

pub struct WgpuRenderPass<'e> {
    encoder: &'e mut EncoderState,
    shared: Rc<WgpuShared>,
    /// `None` when the pass failed to begin; commands are then dropped.
    native: Option<wgpu::RenderPass<'static>>,
    live: bool,
    ended: bool,
}

impl WgpuRenderPass<'_> {
    fn exec(&mut self, f: impl FnOnce(&mut wgpu::RenderPass<'static>, &WgpuState) -> GfxResult<()>) {
        if self.encoder.error().is_some() {
            return;
        }
        let Some(native) = self.native.as_mut() else {
            return;
        };
        let result = self.shared.check_alive().and_then(|()| {
            let state = self.shared.state.borrow();
            f(native, &state)
        });
        self.encoder.record_result(result);
    }

    fn indirect<'s>(state: &'s WgpuState, buffer: BufferId, offset: u64, size: u64, what: &str) -> GfxResult<&'s wgpu::Buffer> {
        let entry = state.buffers.get(buffer)?;
        validation::require_buffer_usage(entry.desc.usage, BufferUsages::INDIRECT, what)?;
        validation::buffer_range(entry.size(), offset, size, what)?;
        entry.ensure_unmapped(what)?;
        Ok(&entry.buffer)
    }
}

impl GfxRenderPass for WgpuRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.exec(|pass, state| {
            pass.set_pipeline(&state.render_pipelines.get(pipeline)?.pipeline);
            Ok(())
        });
    }

    fn set_bind_group(&mut self, index: u32, group: Option<BindGroupId>, dynamic_offsets: &[u32]) {
        let max = self.shared.capabilities.limits.max_bind_groups;
        self.exec(|pass, state| {
            if index >= max {
                return Err(GfxError::validation(format!("set_bind_group: index {index} exceeds max_bind_groups")));
            }
            let group = group.map(|id| state.bind_groups.get(id).map(|e| &e.group)).transpose()?;
            pass.set_bind_group(index, group, dynamic_offsets);
            Ok(())
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64, size: Option<u64>) {
        let max = self.shared.capabilities.limits.max_vertex_buffers;
        self.exec(|pass, state| {
            if slot >= max {
                return Err(GfxError::validation(format!(
                    "set_vertex_buffer: slot {slot} exceeds max_vertex_buffers"
                )));
            }
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::VERTEX, "set_vertex_buffer")?;
            entry.ensure_unmapped("set_vertex_buffer")?;
            let range = slice_range(entry.size(), offset, size, "set_vertex_buffer")?;
            pass.set_vertex_buffer(slot, entry.buffer.slice(range));
            Ok(())
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferId, format: IndexFormat, offset: u64, size: Option<u64>) {
        self.exec(|pass, state| {
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::INDEX, "set_index_buffer")?;
            entry.ensure_unmapped("set_index_buffer")?;
            if offset % format.byte_size() != 0 {
                return Err(GfxError::validation(format!(
                    "set_index_buffer: offset {offset} is not aligned to {format:?}"
                )));
            }
            let range = slice_range(entry.size(), offset, size, "set_index_buffer")?;
            pass.set_index_buffer(entry.buffer.slice(range), format.into_wgpu());
            Ok(())
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.exec(|pass, _| {
            pass.draw(vertices, instances);
            Ok(())
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.exec(|pass, _| {
            pass.draw_indexed(indices, base_vertex, instances);
            Ok(())
        });
    }

    fn draw_indirect(&mut self, buffer: BufferId, offset: u64) {
        self.exec(|pass, state| {
            let size = std::mem::size_of::<DrawIndirectArgs>() as u64;
            let native = Self::indirect(state, buffer, offset, size, "draw_indirect")?;
            pass.draw_indirect(native, offset);
            Ok(())
        });
    }

    fn draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64) {
        self.exec(|pass, state| {
            let size = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;
            let native = Self::indirect(state, buffer, offset, size, "draw_indexed_indirect")?;
            pass.draw_indexed_indirect(native, offset);
            Ok(())
        });
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        self.exec(|pass, _| {
            let depth_ok = (0.0..=1.0).contains(&min_depth) && (0.0..=1.0).contains(&max_depth) && min_depth <= max_depth;
            if width < 0.0 || height < 0.0 || !depth_ok {
                return Err(GfxError::validation(format!(
                    "set_viewport: invalid viewport {width}x{height} with depth {min_depth}..{max_depth}"
                )));
            }
            pass.set_viewport(x, y, width, height, min_depth, max_depth);
            Ok(())
        });
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.exec(|pass, _| {
            pass.set_scissor_rect(x, y, width, height);
            Ok(())
        });
    }

    fn set_blend_constant(&mut self, color: Color) {
        self.exec(|pass, _| {
            pass.set_blend_constant(color.into_wgpu());
            Ok(())
        });
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.exec(|pass, _| {
            pass.set_stencil_reference(reference);
            Ok(())
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.encoder.push_debug_group();
        if let Some(native) = self.native.as_mut() {
            native.push_debug_group(label);
        }
    }

    fn pop_debug_group(&mut self) {
        if self.encoder.pop_debug_group() {
            if let Some(native) = self.native.as_mut() {
                native.pop_debug_group();
            }
        }
    }

    fn insert_debug_marker(&mut self, label: &str) {
        if let Some(native) = self.native.as_mut() {
            native.insert_debug_marker(label);
        }
    }

    fn end(mut self: Box<Self>) -> GfxResult<()> {
        self.native = None;
        self.ended = true;
        if self.live {
            self.encoder.end_pass()
        } else {
            Err(self
                .encoder
                .error()
                .cloned()
                .unwrap_or_else(|| GfxError::validation("render pass was never opened")))
        }
    }
}

impl Drop for WgpuRenderPass<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.native = None;
        if self.live {
            self.encoder
                .record(GfxError::validation("render pass dropped without end()"));
            let _ = self.encoder.end_pass();
        }
    }
}

pub struct WgpuComputePass<'e> {
    encoder: &'e mut EncoderState,
    shared: Rc<WgpuShared>,
    native: Option<wgpu::ComputePass<'static>>,
    live: bool,
    ended: bool,
}

impl WgpuComputePass<'_> {
    fn exec(&mut self, f: impl FnOnce(&mut wgpu::ComputePass<'static>, &WgpuState) -> GfxResult<()>) {
        if self.encoder.error().is_some() {
            return;
        }
        let Some(native) = self.native.as_mut() else {
            return;
        };
        let result = self.shared.check_alive().and_then(|()| {
            let state = self.shared.state.borrow();
            f(native, &state)
        });
        self.encoder.record_result(result);
    }
}

impl GfxComputePass for WgpuComputePass<'_> {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId) {
        self.exec(|pass, state| {
            pass.set_pipeline(&state.compute_pipelines.get(pipeline)?.pipeline);
            Ok(())
        });
    }

    fn set_bind_group(&mut self, index: u32, group: Option<BindGroupId>, dynamic_offsets: &[u32]) {
        let max = self.shared.capabilities.limits.max_bind_groups;
        self.exec(|pass, state| {
            if index >= max {
                return Err(GfxError::validation(format!("set_bind_group: index {index} exceeds max_bind_groups")));
            }
            let group = group.map(|id| state.bind_groups.get(id).map(|e| &e.group)).transpose()?;
            pass.set_bind_group(index, group, dynamic_offsets);
            Ok(())
        });
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        let max = self.shared.capabilities.limits.max_compute_workgroups_per_dimension;
        self.exec(|pass, _| {
            if x > max || y > max || z > max {
                return Err(GfxError::validation(format!(
                    "dispatch_workgroups: ({x}, {y}, {z}) exceeds max_compute_workgroups_per_dimension {max}"
                )));
            }
            pass.dispatch_workgroups(x, y, z);
            Ok(())
        });
    }

    fn dispatch_workgroups_indirect(&mut self, buffer: BufferId, offset: u64) {
        self.exec(|pass, state| {
            let what = "dispatch_workgroups_indirect";
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::INDIRECT, what)?;
            validation::buffer_range(entry.size(), offset, 12, what)?;
            entry.ensure_unmapped(what)?;
            pass.dispatch_workgroups_indirect(&entry.buffer, offset);
            Ok(())
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.encoder.push_debug_group();
        if let Some(native) = self.native.as_mut() {
            native.push_debug_group(label);
        }
    }

    fn pop_debug_group(&mut self) {
        if self.encoder.pop_debug_group() {
            if let Some(native) = self.native.as_mut() {
                native.pop_debug_group();
            }
        }
    }

    fn end(mut self: Box<Self>) -> GfxResult<()> {
        self.native = None;
        self.ended = true;
        if self.live {
            self.encoder.end_pass()
        } else {
            Err(self
                .encoder
                .error()
                .cloned()
                .unwrap_or_else(|| GfxError::validation("compute pass was never opened")))
        }
    }
}

impl Drop for WgpuComputePass<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.native = None;
        if self.live {
            self.encoder
                .record(GfxError::validation("compute pass dropped without end()"));
            let _ = self.encoder.end_pass();
        }
    }
}
