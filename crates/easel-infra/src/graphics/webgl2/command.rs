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

//! Command encoding on WebGL2.
//!
//! GL has no command buffers, so commands execute on the context as they are
//! recorded. The encoder still enforces the WebGPU state machine: the first
//! error invalidates it, it seals once, and its command buffer submits once.

use super::conversions::{GlVertexAttrib, IntoGl};
use super::device::{DeviceShared, DeviceState};
use super::gl::consts::*;
use super::gl::{GlContext, GlName};
use super::resource::gl_size;
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::handle::*;
use easel_core::gfx::traits::{EncoderState, GfxCommandEncoder, GfxComputePass, GfxRenderPass};
use easel_core::gfx::validation;
use std::ops::Range;
use std::rc::Rc;

/// A sealed command buffer; the work already ran when it was recorded.
#[derive(Debug)]
pub(crate) struct GlCommandBufferEntry {
    pub label: Option<String>,
    pub submitted: bool,
}

#[derive(Debug)]
pub struct WebGl2CommandEncoder {
    shared: Rc<DeviceShared>,
    state: EncoderState,
}

impl WebGl2CommandEncoder {
    pub(crate) fn new(shared: Rc<DeviceShared>, desc: &CommandEncoderDescriptor) -> Self {
        Self {
            shared,
            state: EncoderState::new(desc),
        }
    }

    fn run(&mut self, what: &str, f: impl FnOnce(&dyn GlContext, &mut DeviceState) -> GfxResult<()>) {
        if !self.state.check_open(what) || self.state.error().is_some() {
            return;
        }
        let result = self.shared.check_alive().and_then(|()| {
            let mut state = self.shared.state.borrow_mut();
            f(&*self.shared.gl, &mut state)
        });
        self.state.record_result(result);
    }
}

impl GfxCommandEncoder for WebGl2CommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        desc: &RenderPassDescriptor,
    ) -> Box<dyn GfxRenderPass + 'encoder> {
        let live = self.state.begin_pass("begin_render_pass");
        let mut pass = WebGl2RenderPass {
            encoder: &mut self.state,
            shared: self.shared.clone(),
            live,
            active: false,
            ended: false,
            bindings: PassBindings::default(),
        };
        if live && pass.encoder.error().is_none() {
            match pass.begin(desc) {
                Ok(()) => pass.active = true,
                Err(e) => pass.encoder.record(e),
            }
        }
        Box::new(pass)
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        _desc: &ComputePassDescriptor,
    ) -> Box<dyn GfxComputePass + 'encoder> {
        let live = self.state.begin_pass("begin_compute_pass");
        if live {
            self.state
                .record(GfxError::unsupported("compute passes are not available on WebGL2"));
        }
        Box::new(WebGl2ComputePass {
            encoder: &mut self.state,
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
        self.run("copy_buffer_to_buffer", |gl, state| {
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
            if src.desc.usage.contains(BufferUsages::INDEX) || dst.desc.usage.contains(BufferUsages::INDEX) {
                return Err(GfxError::unsupported(format!(
                    "{what}: WebGL2 cannot copy to or from an index buffer"
                )));
            }
            if size == 0 {
                return Ok(());
            }
            gl.bind_buffer(COPY_READ_BUFFER, src.name);
            gl.bind_buffer(COPY_WRITE_BUFFER, dst.name);
            gl.copy_buffer_sub_data(
                COPY_READ_BUFFER,
                COPY_WRITE_BUFFER,
                gl_size(source_offset, "copy source offset")?,
                gl_size(destination_offset, "copy destination offset")?,
                gl_size(size, "copy size")?,
            );
            gl.bind_buffer(COPY_READ_BUFFER, 0);
            gl.bind_buffer(COPY_WRITE_BUFFER, 0);
            Ok(())
        });
    }

    fn clear_buffer(&mut self, buffer: BufferId, offset: u64, size: Option<u64>) {
        self.run("clear_buffer", |gl, state| {
            let entry = state.buffers.get(buffer)?;
            let size = size.unwrap_or_else(|| entry.size().saturating_sub(offset));
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::COPY_DST, "clear_buffer")?;
            validation::buffer_range(entry.size(), offset, size, "clear_buffer")?;
            entry.ensure_unmapped("clear_buffer")?;
            if size > 0 {
                entry.upload(gl, offset, &vec![0; size as usize])?;
            }
            Ok(())
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        log::trace!("debug group '{label}'");
        self.state.push_debug_group();
    }

    fn pop_debug_group(&mut self) {
        self.state.pop_debug_group();
    }

    fn insert_debug_marker(&mut self, label: &str) {
        log::trace!("debug marker '{label}'");
    }

    fn finish(&mut self) -> GfxResult<CommandBufferId> {
        let result = self.shared.check_alive().and_then(|()| self.state.finish()).map(|()| {
            let entry = GlCommandBufferEntry {
                label: self.state.label().map(str::to_owned),
                submitted: false,
            };
            self.shared.state.borrow_mut().command_buffers.insert(entry)
        });
        if let Err(e) = &result {
            self.shared.report(e);
        }
        result
    }
}

#[derive(Debug, Clone, Copy)]
struct VertexBinding {
    buffer: BufferId,
    offset: u64,
    size: u64,
}

#[derive(Debug, Clone, Copy)]
struct IndexBinding {
    buffer: BufferId,
    format: IndexFormat,
    offset: u64,
    size: u64,
}

/// Everything a pass tracks between draws.
#[derive(Debug, Default)]
struct PassBindings {
    width: u32,
    height: u32,
    color_formats: Vec<Option<TextureFormat>>,
    depth_format: Option<TextureFormat>,
    depth_read_only: bool,
    stencil_read_only: bool,
    discard: Vec<u32>,
    pipeline: Option<RenderPipelineId>,
    bind_groups: Vec<Option<(BindGroupId, Vec<u32>)>>,
    vertex_buffers: Vec<Option<VertexBinding>>,
    index_buffer: Option<IndexBinding>,
    stencil_reference: u32,
}

/// How far the bound vertex buffers reach.
#[derive(Debug, Clone, Copy)]
struct DrawBounds {
    topology: PrimitiveTopology,
    strip_index_format: Option<IndexFormat>,
    vertices: u64,
    instances: u64,
}

/// A color or depth-stencil target resolved from its view.
#[derive(Debug, Clone, Copy)]
struct Attachment {
    texture: GlName,
    target: u32,
    layered: bool,
    canvas: bool,
    mip: u32,
    layer: u32,
    format: TextureFormat,
    width: u32,
    height: u32,
}

impl Attachment {
    fn resolve(state: &DeviceState, view: TextureViewId, what: &str) -> GfxResult<Self> {
        let view = state.texture_views.get(view)?;
        let texture = state.textures.get(view.texture)?;
        validation::require_texture_usage(texture.desc.usage, TextureUsages::RENDER_ATTACHMENT, what)?;
        if view.view.mip_level_count != 1 || view.view.array_layer_count != 1 {
            return Err(GfxError::validation(format!(
                "{what}: attachment views must cover exactly one mip level and one layer"
            )));
        }
        let size = texture
            .desc
            .size
            .mip_level_size(view.view.base_mip_level, texture.desc.dimension);
        Ok(Self {
            texture: texture.name,
            target: texture.image_target(view.view.base_array_layer),
            layered: texture.is_layered(),
            canvas: texture.canvas,
            mip: view.view.base_mip_level,
            layer: view.view.base_array_layer,
            format: view.view.format,
            width: size.width,
            height: size.height,
        })
    }

    fn attach(&self, gl: &dyn GlContext, point: u32) {
        if self.layered {
            gl.framebuffer_texture_layer(FRAMEBUFFER, point, self.texture, self.mip as i32, self.layer as i32);
        } else {
            gl.framebuffer_texture_2d(FRAMEBUFFER, point, self.target, self.texture, self.mip as i32);
        }
    }
}

fn detach(gl: &dyn GlContext, point: u32) {
    gl.framebuffer_texture_2d(FRAMEBUFFER, point, TEXTURE_2D, 0, 0);
}

fn clear_color(gl: &dyn GlContext, draw_buffer: u32, format: TextureFormat, color: Color) {
    match format.info().sample_type {
        TextureSampleType::Sint => gl.clear_buffer_i32_slice(
            COLOR,
            draw_buffer,
            &[color.r as i32, color.g as i32, color.b as i32, color.a as i32],
        ),
        TextureSampleType::Uint => gl.clear_buffer_u32_slice(
            COLOR,
            draw_buffer,
            &[color.r as u32, color.g as u32, color.b as u32, color.a as u32],
        ),
        _ => gl.clear_buffer_f32_slice(
            COLOR,
            draw_buffer,
            &[color.r as f32, color.g as f32, color.b as f32, color.a as f32],
        ),
    }
}

pub struct WebGl2RenderPass<'e> {
    encoder: &'e mut EncoderState,
    shared: Rc<DeviceShared>,
    /// The encoder accepted the pass and expects `end_pass`.
    live: bool,
    /// The pass holds the device's framebuffer and executes commands.
    active: bool,
    ended: bool,
    bindings: PassBindings,
}

impl WebGl2RenderPass<'_> {
    fn begin(&mut self, desc: &RenderPassDescriptor) -> GfxResult<()> {
        self.shared.check_alive()?;
        let limits = &self.shared.capabilities.limits;
        validation::render_pass_shape(desc, limits)?;
        let name = desc.label.as_deref().unwrap_or("<unlabeled>");
        let what = format!("render pass '{name}'");
        let gl = &*self.shared.gl;
        let mut state = self.shared.state.borrow_mut();
        if state.pass_active {
            return Err(GfxError::validation(format!(
                "{what}: another render pass is still open on this device"
            )));
        }

        let mut colors = Vec::with_capacity(desc.color_attachments.len());
        for attachment in &desc.color_attachments {
            let Some(attachment) = attachment else {
                colors.push(None);
                continue;
            };
            if attachment.resolve_target.is_some() {
                return Err(GfxError::unsupported(format!("{what}: resolve targets are not available on WebGL2")));
            }
            let resolved = Attachment::resolve(&state, attachment.view, &what)?;
            if resolved.format.is_depth_stencil() || !resolved.format.info().renderable {
                return Err(GfxError::validation(format!(
                    "{what}: {:?} is not a color-renderable format",
                    resolved.format
                )));
            }
            colors.push(Some((resolved, attachment)));
        }
        let depth = match &desc.depth_stencil_attachment {
            Some(ds) => {
                let resolved = Attachment::resolve(&state, ds.view, &what)?;
                if !resolved.format.is_depth_stencil() {
                    return Err(GfxError::validation(format!(
                        "{what}: {:?} is not a depth-stencil format",
                        resolved.format
                    )));
                }
                Some((resolved, ds))
            }
            None => None,
        };

        let mut sizes = colors
            .iter()
            .flatten()
            .map(|(a, _)| a)
            .chain(depth.iter().map(|(a, _)| a))
            .map(|a| (a.width, a.height));
        let (width, height) = sizes.next().unwrap_or((0, 0));
        if sizes.any(|s| s != (width, height)) {
            return Err(GfxError::validation(format!("{what}: attachments differ in size")));
        }

        let canvas = colors.iter().flatten().any(|(a, _)| a.canvas);
        if canvas {
            if colors.len() != 1 || depth.is_some() {
                return Err(GfxError::validation(format!(
                    "{what}: the canvas must be the only attachment of its pass"
                )));
            }
            gl.bind_framebuffer(FRAMEBUFFER, 0);
            gl.draw_buffers(&[BACK]);
        } else {
            let framebuffer = match state.framebuffer {
                Some(fb) => fb,
                None => {
                    let fb = gl
                        .create_framebuffer()
                        .map_err(|e| GfxError::internal(format!("createFramebuffer failed: {e}")))?;
                    state.framebuffer = Some(fb);
                    fb
                }
            };
            gl.bind_framebuffer(FRAMEBUFFER, framebuffer);
            for index in 0..limits.max_color_attachments {
                let point = COLOR_ATTACHMENT0 + index;
                match colors.get(index as usize) {
                    Some(Some((attachment, _))) => attachment.attach(gl, point),
                    _ => detach(gl, point),
                }
            }
            let depth_point = depth.as_ref().map(|(a, _)| match (a.format.has_depth(), a.format.has_stencil()) {
                (true, true) => DEPTH_STENCIL_ATTACHMENT,
                (false, true) => STENCIL_ATTACHMENT,
                _ => DEPTH_ATTACHMENT,
            });
            for point in [DEPTH_ATTACHMENT, STENCIL_ATTACHMENT, DEPTH_STENCIL_ATTACHMENT] {
                if Some(point) != depth_point {
                    detach(gl, point);
                }
            }
            if let (Some((attachment, _)), Some(point)) = (&depth, depth_point) {
                attachment.attach(gl, point);
            }
            let draw_buffers: Vec<u32> = colors
                .iter()
                .enumerate()
                .map(|(i, c)| if c.is_some() { COLOR_ATTACHMENT0 + i as u32 } else { NONE })
                .collect();
            gl.draw_buffers(&draw_buffers);
            let status = gl.check_framebuffer_status(FRAMEBUFFER);
            if status != FRAMEBUFFER_COMPLETE {
                return Err(GfxError::unsupported(format!(
                    "{what}: attachment combination is incomplete on this context (0x{status:04X})"
                )));
            }
        }

        gl.viewport(0, 0, width as i32, height as i32);
        gl.depth_range_f32(0.0, 1.0);
        gl.disable(SCISSOR_TEST);
        gl.blend_color(0.0, 0.0, 0.0, 0.0);

        let mut discard = Vec::new();
        for (index, (attachment, ops)) in colors.iter().enumerate().filter_map(|(i, c)| c.as_ref().map(|c| (i, c))) {
            if ops.load_op == LoadOp::Clear {
                gl.color_mask(true, true, true, true);
                clear_color(gl, index as u32, attachment.format, ops.clear_value.unwrap_or(Color::TRANSPARENT));
            }
            if ops.store_op == StoreOp::Discard {
                discard.push(if canvas { COLOR } else { COLOR_ATTACHMENT0 + index as u32 });
            }
        }
        if let Some((attachment, ops)) = &depth {
            let clear_depth = attachment.format.has_depth() && ops.depth_load_op == Some(LoadOp::Clear);
            let clear_stencil = attachment.format.has_stencil() && ops.stencil_load_op == Some(LoadOp::Clear);
            if clear_depth {
                gl.depth_mask(true);
            }
            if clear_stencil {
                gl.stencil_mask_separate(FRONT_AND_BACK, 0xFF);
            }
            match (clear_depth, clear_stencil) {
                (true, true) => {
                    gl.clear_buffer_depth_stencil(DEPTH_STENCIL, 0, ops.depth_clear_value, ops.stencil_clear_value as i32)
                }
                (true, false) => gl.clear_buffer_f32_slice(DEPTH, 0, &[ops.depth_clear_value, 0.0, 0.0, 0.0]),
                (false, true) => gl.clear_buffer_i32_slice(STENCIL, 0, &[ops.stencil_clear_value as i32, 0, 0, 0]),
                (false, false) => {}
            }
            if ops.depth_store_op == Some(StoreOp::Discard) {
                discard.push(DEPTH_ATTACHMENT);
            }
            if ops.stencil_store_op == Some(StoreOp::Discard) {
                discard.push(STENCIL_ATTACHMENT);
            }
        }

        state.pass_active = true;
        self.bindings = PassBindings {
            width,
            height,
            color_formats: colors.iter().map(|c| c.as_ref().map(|(a, _)| a.format)).collect(),
            depth_format: depth.as_ref().map(|(a, _)| a.format),
            depth_read_only: depth.as_ref().is_some_and(|(_, ops)| ops.depth_read_only),
            stencil_read_only: depth.as_ref().is_some_and(|(_, ops)| ops.stencil_read_only),
            discard,
            bind_groups: vec![None; limits.max_bind_groups as usize],
            vertex_buffers: vec![None; limits.max_vertex_buffers as usize],
            ..Default::default()
        };
        log::trace!("{what} begun at {width}x{height}");
        Ok(())
    }

    fn exec(&mut self, f: impl FnOnce(&mut PassBindings, &dyn GlContext, &mut DeviceState) -> GfxResult<()>) {
        if !self.active || self.encoder.error().is_some() {
            return;
        }
        let result = self.shared.check_alive().and_then(|()| {
            let mut state = self.shared.state.borrow_mut();
            f(&mut self.bindings, &*self.shared.gl, &mut state)
        });
        self.encoder.record_result(result);
    }

    /// Gives the device framebuffer back, discarding what the pass asked to.
    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if !self.bindings.discard.is_empty() && !self.shared.lost.is_lost() {
            self.shared.gl.invalidate_framebuffer(FRAMEBUFFER, &self.bindings.discard);
        }
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            state.pass_active = false;
        }
    }
}

impl PassBindings {
    /// Applies pipeline, bind groups and vertex inputs before a draw.
    fn prepare(&self, gl: &dyn GlContext, state: &mut DeviceState, limits: &Limits) -> GfxResult<DrawBounds> {
        let id = self
            .pipeline
            .ok_or_else(|| GfxError::validation("draw issued before set_pipeline"))?;
        let (bounds, mask) = {
            let state: &DeviceState = state;
            let pipeline = state.render_pipelines.get(id)?;
            if let Some(ds) = &pipeline.depth_stencil {
                if self.depth_read_only && ds.depth_write_enabled {
                    return Err(GfxError::validation("pipeline writes depth into a read-only depth attachment"));
                }
                if self.stencil_read_only && ds.stencil.is_enabled() && ds.stencil.write_mask != 0 {
                    return Err(GfxError::validation("pipeline writes stencil into a read-only stencil attachment"));
                }
            }
            pipeline.apply(gl, self.stencil_reference);

            for (index, (layout_id, layout)) in pipeline.group_layouts.iter().enumerate() {
                let Some((group_id, offsets)) = self.bind_groups.get(index).and_then(Option::as_ref) else {
                    if layout.entries.is_empty() {
                        continue;
                    }
                    return Err(GfxError::validation(format!("draw: bind group {index} is not set")));
                };
                let group = state.bind_groups.get(*group_id)?;
                if group.layout != *layout_id && group.layout_desc != *layout {
                    return Err(GfxError::validation(format!(
                        "draw: bind group {index} does not match the pipeline's layout"
                    )));
                }
                group.apply(gl, state, index as u32, offsets, &pipeline.sampler_pairs)?;
            }

            let mut mask = 0u32;
            let mut vertices = u64::MAX;
            let mut instances = u64::MAX;
            for (slot, layout) in pipeline.vertex_buffers.iter().enumerate() {
                if layout.attributes.is_empty() {
                    continue;
                }
                let binding = self
                    .vertex_buffers
                    .get(slot)
                    .copied()
                    .flatten()
                    .ok_or_else(|| GfxError::validation(format!("draw: vertex buffer slot {slot} is not set")))?;
                let buffer = state.buffers.get(binding.buffer)?;
                buffer.ensure_unmapped("draw")?;
                gl.bind_buffer(ARRAY_BUFFER, buffer.name);
                let stride = gl_size(layout.array_stride, "vertex stride")?;
                for attribute in &layout.attributes {
                    let attrib: GlVertexAttrib = attribute.format.into_gl();
                    let offset = gl_size(binding.offset + attribute.offset, "vertex attribute offset")?;
                    let location = attribute.shader_location;
                    if attrib.integer {
                        gl.vertex_attrib_pointer_i32(location, attrib.size, attrib.ty, stride, offset);
                    } else {
                        gl.vertex_attrib_pointer_f32(location, attrib.size, attrib.ty, attrib.normalized, stride, offset);
                    }
                    let divisor = u32::from(layout.step_mode == VertexStepMode::Instance);
                    gl.vertex_attrib_divisor(location, divisor);
                    mask |= 1 << location;
                }
                let end = layout.attributes_end();
                let reach = match (layout.array_stride, binding.size >= end) {
                    (_, false) => 0,
                    (0, true) => u64::MAX,
                    (stride, true) => (binding.size - end) / stride + 1,
                };
                match layout.step_mode {
                    VertexStepMode::Vertex => vertices = vertices.min(reach),
                    VertexStepMode::Instance => instances = instances.min(reach),
                }
            }
            gl.bind_buffer(ARRAY_BUFFER, 0);
            let bounds = DrawBounds {
                topology: pipeline.primitive.topology,
                strip_index_format: pipeline.primitive.strip_index_format,
                vertices,
                instances,
            };
            (bounds, mask)
        };

        let previous = state.enabled_attributes;
        for location in 0..limits.max_vertex_attributes.min(32) {
            let bit = 1u32 << location;
            match (previous & bit != 0, mask & bit != 0) {
                (false, true) => gl.enable_vertex_attrib_array(location),
                (true, false) => gl.disable_vertex_attrib_array(location),
                _ => {}
            }
        }
        state.enabled_attributes = mask;
        Ok(bounds)
    }

    fn draw_arrays(
        &self,
        gl: &dyn GlContext,
        state: &mut DeviceState,
        limits: &Limits,
        vertices: Range<u32>,
        instances: Range<u32>,
    ) -> GfxResult<()> {
        if instances.start != 0 {
            return Err(GfxError::unsupported("draw: first_instance must be 0 on WebGL2"));
        }
        let bounds = self.prepare(gl, state, limits)?;
        if u64::from(vertices.end) > bounds.vertices {
            return Err(GfxError::validation(format!(
                "draw: vertex {} is past the end of the bound vertex buffers ({} vertices)",
                vertices.end, bounds.vertices
            )));
        }
        if u64::from(instances.end) > bounds.instances {
            return Err(GfxError::validation(format!(
                "draw: instance {} is past the end of the bound instance buffers",
                instances.end
            )));
        }
        if vertices.is_empty() || instances.is_empty() {
            return Ok(());
        }
        gl.draw_arrays_instanced(
            bounds.topology.into_gl(),
            vertices.start as i32,
            vertices.len() as i32,
            instances.len() as i32,
        );
        Ok(())
    }

    fn draw_elements(
        &self,
        gl: &dyn GlContext,
        state: &mut DeviceState,
        limits: &Limits,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) -> GfxResult<()> {
        if base_vertex != 0 {
            return Err(GfxError::unsupported("draw_indexed: base_vertex must be 0 on WebGL2"));
        }
        if instances.start != 0 {
            return Err(GfxError::unsupported("draw_indexed: first_instance must be 0 on WebGL2"));
        }
        let index = self
            .index_buffer
            .ok_or_else(|| GfxError::validation("draw_indexed issued before set_index_buffer"))?;
        let bounds = self.prepare(gl, state, limits)?;
        if let Some(strip) = bounds.strip_index_format {
            if strip != index.format {
                return Err(GfxError::validation(format!(
                    "draw_indexed: pipeline strips with {strip:?} indices, {:?} are bound",
                    index.format
                )));
            }
        }
        let stride = index.format.byte_size();
        if u64::from(indices.end) * stride > index.size {
            return Err(GfxError::validation(format!(
                "draw_indexed: index {} is past the end of the bound index range",
                indices.end
            )));
        }
        if u64::from(instances.end) > bounds.instances {
            return Err(GfxError::validation(format!(
                "draw_indexed: instance {} is past the end of the bound instance buffers",
                instances.end
            )));
        }
        let buffer = state.buffers.get(index.buffer)?;
        buffer.ensure_unmapped("draw_indexed")?;
        if indices.is_empty() || instances.is_empty() {
            return Ok(());
        }
        gl.bind_buffer(ELEMENT_ARRAY_BUFFER, buffer.name);
        gl.draw_elements_instanced(
            bounds.topology.into_gl(),
            indices.len() as i32,
            index.format.into_gl(),
            gl_size(index.offset + u64::from(indices.start) * stride, "index offset")?,
            instances.len() as i32,
        );
        Ok(())
    }
}

/// Reads an indirect argument block.
fn read_indirect<T: bytemuck::Pod>(state: &DeviceState, gl: &dyn GlContext, buffer: BufferId, offset: u64) -> GfxResult<T> {
    let entry = state.buffers.get(buffer)?;
    validation::require_buffer_usage(entry.desc.usage, BufferUsages::INDIRECT, "indirect draw")?;
    let size = std::mem::size_of::<T>() as u64;
    validation::buffer_range(entry.size(), offset, size, "indirect draw")?;
    entry.ensure_unmapped("indirect draw")?;
    let bytes = entry.read_back(gl, offset, size)?;
    Ok(bytemuck::pod_read_unaligned(&bytes))
}

impl GfxRenderPass for WebGl2RenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.exec(|b, _, state| {
            let entry = state.render_pipelines.get(pipeline)?;
            let targets: Vec<Option<TextureFormat>> = entry.targets.iter().map(|t| t.map(|t| t.format)).collect();
            let matches_colors = targets.len() == b.color_formats.len()
                && targets
                    .iter()
                    .zip(&b.color_formats)
                    .all(|(t, c)| t.is_none() || t == c);
            if !matches_colors || entry.depth_stencil.map(|d| d.format) != b.depth_format {
                return Err(GfxError::validation(format!(
                    "set_pipeline: pipeline '{}' targets do not match the pass attachments",
                    entry.label.as_deref().unwrap_or("<unlabeled>")
                )));
            }
            b.pipeline = Some(pipeline);
            Ok(())
        });
    }

    fn set_bind_group(&mut self, index: u32, group: Option<BindGroupId>, dynamic_offsets: &[u32]) {
        let limits = self.shared.capabilities.limits;
        self.exec(|b, _, state| {
            let slot = b
                .bind_groups
                .get_mut(index as usize)
                .ok_or_else(|| GfxError::validation(format!("set_bind_group: index {index} exceeds max_bind_groups")))?;
            match group {
                Some(id) => {
                    state.bind_groups.get(id)?.check_dynamic_offsets(state, dynamic_offsets, &limits)?;
                    *slot = Some((id, dynamic_offsets.to_vec()));
                }
                None => *slot = None,
            }
            Ok(())
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64, size: Option<u64>) {
        self.exec(|b, _, state| {
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::VERTEX, "set_vertex_buffer")?;
            let size = size.unwrap_or_else(|| entry.size().saturating_sub(offset));
            validation::buffer_range(entry.size(), offset, size, "set_vertex_buffer")?;
            let target = b.vertex_buffers.get_mut(slot as usize).ok_or_else(|| {
                GfxError::validation(format!("set_vertex_buffer: slot {slot} exceeds max_vertex_buffers"))
            })?;
            *target = Some(VertexBinding { buffer, offset, size });
            Ok(())
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferId, format: IndexFormat, offset: u64, size: Option<u64>) {
        self.exec(|b, _, state| {
            let entry = state.buffers.get(buffer)?;
            validation::require_buffer_usage(entry.desc.usage, BufferUsages::INDEX, "set_index_buffer")?;
            if offset % format.byte_size() != 0 {
                return Err(GfxError::validation(format!(
                    "set_index_buffer: offset {offset} is not aligned to {format:?}"
                )));
            }
            let size = size.unwrap_or_else(|| entry.size().saturating_sub(offset));
            validation::range_end(entry.size(), offset, size, "set_index_buffer")?;
            b.index_buffer = Some(IndexBinding {
                buffer,
                format,
                offset,
                size,
            });
            Ok(())
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        let limits = self.shared.capabilities.limits;
        self.exec(|b, gl, state| b.draw_arrays(gl, state, &limits, vertices, instances));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        let limits = self.shared.capabilities.limits;
        self.exec(|b, gl, state| b.draw_elements(gl, state, &limits, indices, base_vertex, instances));
    }

    fn draw_indirect(&mut self, buffer: BufferId, offset: u64) {
        let limits = self.shared.capabilities.limits;
        self.exec(|b, gl, state| {
            let args: DrawIndirectArgs = read_indirect(state, gl, buffer, offset)?;
            let first_instance = args.first_instance;
            b.draw_arrays(
                gl,
                state,
                &limits,
                args.first_vertex..args.first_vertex.saturating_add(args.vertex_count),
                first_instance..first_instance.saturating_add(args.instance_count),
            )
        });
    }

    fn draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64) {
        let limits = self.shared.capabilities.limits;
        self.exec(|b, gl, state| {
            let args: DrawIndexedIndirectArgs = read_indirect(state, gl, buffer, offset)?;
            b.draw_elements(
                gl,
                state,
                &limits,
                args.first_index..args.first_index.saturating_add(args.index_count),
                args.base_vertex,
                args.first_instance..args.first_instance.saturating_add(args.instance_count),
            )
        });
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        self.exec(|b, gl, _| {
            let depth_ok = (0.0..=1.0).contains(&min_depth) && (0.0..=1.0).contains(&max_depth) && min_depth <= max_depth;
            if width < 0.0 || height < 0.0 || !depth_ok {
                return Err(GfxError::validation(format!(
                    "set_viewport: invalid viewport {width}x{height} with depth {min_depth}..{max_depth}"
                )));
            }
            if x + width > b.width as f32 || y + height > b.height as f32 || x < 0.0 || y < 0.0 {
                return Err(GfxError::validation("set_viewport: viewport leaves the attachments"));
            }
            gl.viewport(x as i32, y as i32, width as i32, height as i32);
            gl.depth_range_f32(min_depth, max_depth);
            Ok(())
        });
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.exec(|b, gl, _| {
            if u64::from(x) + u64::from(width) > u64::from(b.width) || u64::from(y) + u64::from(height) > u64::from(b.height) {
                return Err(GfxError::validation("set_scissor_rect: rectangle leaves the attachments"));
            }
            gl.enable(SCISSOR_TEST);
            gl.scissor(x as i32, y as i32, width as i32, height as i32);
            Ok(())
        });
    }

    fn set_blend_constant(&mut self, color: Color) {
        self.exec(|_, gl, _| {
            gl.blend_color(color.r as f32, color.g as f32, color.b as f32, color.a as f32);
            Ok(())
        });
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.exec(|b, _, _| {
            b.stencil_reference = reference;
            Ok(())
        });
    }

    fn push_debug_group(&mut self, label: &str) {
        log::trace!("debug group '{label}'");
        self.encoder.push_debug_group();
    }

    fn pop_debug_group(&mut self) {
        self.encoder.pop_debug_group();
    }

    fn insert_debug_marker(&mut self, label: &str) {
        log::trace!("debug marker '{label}'");
    }

    fn end(mut self: Box<Self>) -> GfxResult<()> {
        self.release();
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

impl Drop for WebGl2RenderPass<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.release();
        if self.live {
            self.encoder
                .record(GfxError::validation("render pass dropped without end()"));
            let _ = self.encoder.end_pass();
        }
    }
}

/// Compute is absent on WebGL2; the pass only carries the encoder error.
pub struct WebGl2ComputePass<'e> {
    encoder: &'e mut EncoderState,
    live: bool,
    ended: bool,
}

impl GfxComputePass for WebGl2ComputePass<'_> {
    fn set_pipeline(&mut self, _pipeline: ComputePipelineId) {}

    fn set_bind_group(&mut self, _index: u32, _group: Option<BindGroupId>, _dynamic_offsets: &[u32]) {}

    fn dispatch_workgroups(&mut self, _x: u32, _y: u32, _z: u32) {}

    fn dispatch_workgroups_indirect(&mut self, _buffer: BufferId, _offset: u64) {}

    fn push_debug_group(&mut self, _label: &str) {
        self.encoder.push_debug_group();
    }

    fn pop_debug_group(&mut self) {
        self.encoder.pop_debug_group();
    }

    fn end(mut self: Box<Self>) -> GfxResult<()> {
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

impl Drop for WebGl2ComputePass<'_> {
    fn drop(&mut self) {
        if !self.ended && self.live {
            let _ = self.encoder.end_pass();
        }
    }
}
