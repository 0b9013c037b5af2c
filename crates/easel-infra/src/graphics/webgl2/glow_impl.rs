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

//! [`GlContext`] over a native `glow` context.

use super::gl::{GlActiveInfo, GlContext, GlName};
use glow::HasContext;
use std::num::NonZeroU32;

macro_rules! native {
    ($ty:ident, $name:expr) => {
        NonZeroU32::new($name).map(glow::$ty)
    };
}

/// A desktop/ES GL context driven through `glow`.
pub struct GlowContext {
    gl: glow::Context,
}

impl std::fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowContext").finish_non_exhaustive()
    }
}

impl GlowContext {
    /// Wraps a context that is current on this thread.
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }
}

// SAFETY (all blocks below): the wrapped context is current on the calling
// thread and every object name passed in was created by this context.
impl GlContext for GlowContext {
    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(pname) }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        unsafe { self.gl.get_parameter_string(pname) }
    }

    fn is_context_lost(&self) -> bool {
        false
    }

    fn supports_extension(&self, name: &str) -> bool {
        self.gl.supported_extensions().contains(name)
    }

    fn create_buffer(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_buffer().map(|b| b.0.get()) }
    }

    fn delete_buffer(&self, buffer: GlName) {
        if let Some(b) = native!(NativeBuffer, buffer) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn bind_buffer(&self, target: u32, buffer: GlName) {
        unsafe { self.gl.bind_buffer(target, native!(NativeBuffer, buffer)) }
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size, usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]) {
        unsafe { self.gl.get_buffer_sub_data(target, offset, dst) }
    }

    fn bind_buffer_range(&self, target: u32, index: u32, buffer: GlName, offset: i32, size: i32) {
        unsafe {
            self.gl
                .bind_buffer_range(target, index, native!(NativeBuffer, buffer), offset, size)
        }
    }

    fn copy_buffer_sub_data(&self, read_target: u32, write_target: u32, read_offset: i32, write_offset: i32, size: i32) {
        unsafe {
            self.gl
                .copy_buffer_sub_data(read_target, write_target, read_offset, write_offset, size)
        }
    }

    fn create_texture(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_texture().map(|t| t.0.get()) }
    }

    fn delete_texture(&self, texture: GlName) {
        if let Some(t) = native!(NativeTexture, texture) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, target: u32, texture: GlName) {
        unsafe { self.gl.bind_texture(target, native!(NativeTexture, texture)) }
    }

    fn tex_storage_2d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32) {
        unsafe { self.gl.tex_storage_2d(target, levels, internal_format, width, height) }
    }

    fn tex_storage_3d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32) {
        unsafe {
            self.gl
                .tex_storage_3d(target, levels, internal_format, width, height, depth)
        }
    }

    fn tex_sub_image_2d(&self, target: u32, level: i32, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, data: &[u8]) {
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(data)),
            )
        }
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
        format: u32,
        ty: u32,
        data: &[u8],
    ) {
        unsafe {
            self.gl.tex_sub_image_3d(
                target,
                level,
                x,
                y,
                z,
                width,
                height,
                depth,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(data)),
            )
        }
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(pname, value) }
    }

    fn create_sampler(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_sampler().map(|s| s.0.get()) }
    }

    fn delete_sampler(&self, sampler: GlName) {
        if let Some(s) = native!(NativeSampler, sampler) {
            unsafe { self.gl.delete_sampler(s) }
        }
    }

    fn bind_sampler(&self, unit: u32, sampler: GlName) {
        unsafe { self.gl.bind_sampler(unit, native!(NativeSampler, sampler)) }
    }

    fn sampler_parameter_i32(&self, sampler: GlName, pname: u32, value: i32) {
        if let Some(s) = native!(NativeSampler, sampler) {
            unsafe { self.gl.sampler_parameter_i32(s, pname, value) }
        }
    }

    fn sampler_parameter_f32(&self, sampler: GlName, pname: u32, value: f32) {
        if let Some(s) = native!(NativeSampler, sampler) {
            unsafe { self.gl.sampler_parameter_f32(s, pname, value) }
        }
    }

    fn create_shader(&self, shader_type: u32) -> Result<GlName, String> {
        unsafe { self.gl.create_shader(shader_type).map(|s| s.0.get()) }
    }

    fn delete_shader(&self, shader: GlName) {
        if let Some(s) = native!(NativeShader, shader) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn shader_source(&self, shader: GlName, source: &str) {
        if let Some(s) = native!(NativeShader, shader) {
            unsafe { self.gl.shader_source(s, source) }
        }
    }

    fn compile_shader(&self, shader: GlName) {
        if let Some(s) = native!(NativeShader, shader) {
            unsafe { self.gl.compile_shader(s) }
        }
    }

    fn get_shader_compile_status(&self, shader: GlName) -> bool {
        native!(NativeShader, shader).is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn get_shader_info_log(&self, shader: GlName) -> String {
        native!(NativeShader, shader)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_program().map(|p| p.0.get()) }
    }

    fn delete_program(&self, program: GlName) {
        if let Some(p) = native!(NativeProgram, program) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn attach_shader(&self, program: GlName, shader: GlName) {
        if let (Some(p), Some(s)) = (native!(NativeProgram, program), native!(NativeShader, shader)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn bind_attrib_location(&self, program: GlName, index: u32, name: &str) {
        if let Some(p) = native!(NativeProgram, program) {
            unsafe { self.gl.bind_attrib_location(p, index, name) }
        }
    }

    fn link_program(&self, program: GlName) {
        if let Some(p) = native!(NativeProgram, program) {
            unsafe { self.gl.link_program(p) }
        }
    }

    fn get_program_link_status(&self, program: GlName) -> bool {
        native!(NativeProgram, program).is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn get_program_info_log(&self, program: GlName) -> String {
        native!(NativeProgram, program)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn use_program(&self, program: GlName) {
        unsafe { self.gl.use_program(native!(NativeProgram, program)) }
    }

    fn get_active_attributes(&self, program: GlName) -> u32 {
        native!(NativeProgram, program).map_or(0, |p| unsafe { self.gl.get_active_attributes(p) })
    }

    fn get_active_attribute(&self, program: GlName, index: u32) -> Option<GlActiveInfo> {
        let p = native!(NativeProgram, program)?;
        let attr = unsafe { self.gl.get_active_attribute(p, index) }?;
        Some(GlActiveInfo {
            name: attr.name,
            size: attr.size,
            utype: attr.atype,
        })
    }

    fn get_attrib_location(&self, program: GlName, name: &str) -> Option<u32> {
        let p = native!(NativeProgram, program)?;
        unsafe { self.gl.get_attrib_location(p, name) }
    }

    fn get_active_uniforms(&self, program: GlName) -> u32 {
        native!(NativeProgram, program).map_or(0, |p| unsafe { self.gl.get_active_uniforms(p) })
    }

    fn get_active_uniform(&self, program: GlName, index: u32) -> Option<GlActiveInfo> {
        let p = native!(NativeProgram, program)?;
        let uniform = unsafe { self.gl.get_active_uniform(p, index) }?;
        Some(GlActiveInfo {
            name: uniform.name,
            size: uniform.size,
            utype: uniform.utype,
        })
    }

    fn get_active_uniform_block_index(&self, program: GlName, uniform: u32) -> i32 {
        native!(NativeProgram, program)
            .and_then(|p| {
                let values = unsafe {
                    self.gl
                        .get_active_uniforms_parameter(p, &[uniform], super::gl::consts::UNIFORM_BLOCK_INDEX)
                };
                values.first().copied()
            })
            .unwrap_or(-1)
    }

    fn get_uniform_location(&self, program: GlName, name: &str) -> Option<u32> {
        let p = native!(NativeProgram, program)?;
        unsafe { self.gl.get_uniform_location(p, name) }.map(|l| l.0)
    }

    fn get_active_uniform_blocks(&self, program: GlName) -> u32 {
        native!(NativeProgram, program).map_or(0, |p| unsafe { self.gl.get_active_uniform_blocks(p) })
    }

    fn get_active_uniform_block_name(&self, program: GlName, index: u32) -> String {
        native!(NativeProgram, program)
            .map(|p| unsafe { self.gl.get_active_uniform_block_name(p, index) })
            .unwrap_or_default()
    }

    fn get_active_uniform_block_size(&self, program: GlName, index: u32) -> i32 {
        native!(NativeProgram, program).map_or(0, |p| unsafe {
            self.gl
                .get_active_uniform_block_parameter_i32(p, index, super::gl::consts::UNIFORM_BLOCK_DATA_SIZE)
        })
    }

    fn uniform_block_binding(&self, program: GlName, index: u32, binding: u32) {
        if let Some(p) = native!(NativeProgram, program) {
            unsafe { self.gl.uniform_block_binding(p, index, binding) }
        }
    }

    fn uniform_1_i32(&self, location: u32, value: i32) {
        let location = glow::NativeUniformLocation(location);
        unsafe { self.gl.uniform_1_i32(Some(&location), value) }
    }

    fn create_vertex_array(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_vertex_array().map(|v| v.0.get()) }
    }

    fn delete_vertex_array(&self, vao: GlName) {
        if let Some(v) = native!(NativeVertexArray, vao) {
            unsafe { self.gl.delete_vertex_array(v) }
        }
    }

    fn bind_vertex_array(&self, vao: GlName) {
        unsafe { self.gl.bind_vertex_array(native!(NativeVertexArray, vao)) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, ty, normalized, stride, offset)
        }
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_i32(index, size, ty, stride, offset) }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) }
    }

    fn create_framebuffer(&self) -> Result<GlName, String> {
        unsafe { self.gl.create_framebuffer().map(|f| f.0.get()) }
    }

    fn delete_framebuffer(&self, framebuffer: GlName) {
        if let Some(f) = native!(NativeFramebuffer, framebuffer) {
            unsafe { self.gl.delete_framebuffer(f) }
        }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: GlName) {
        unsafe {
            self.gl
                .bind_framebuffer(target, native!(NativeFramebuffer, framebuffer))
        }
    }

    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, tex_target: u32, texture: GlName, level: i32) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                target,
                attachment,
                tex_target,
                native!(NativeTexture, texture),
                level,
            )
        }
    }

    fn framebuffer_texture_layer(&self, target: u32, attachment: u32, texture: GlName, level: i32, layer: i32) {
        unsafe {
            self.gl
                .framebuffer_texture_layer(target, attachment, native!(NativeTexture, texture), level, layer)
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        unsafe { self.gl.draw_buffers(buffers) }
    }

    fn invalidate_framebuffer(&self, target: u32, attachments: &[u32]) {
        unsafe { self.gl.invalidate_framebuffer(target, attachments) }
    }

    fn clear_buffer_f32_slice(&self, buffer: u32, draw_buffer: u32, values: &[f32; 4]) {
        unsafe { self.gl.clear_buffer_f32_slice(buffer, draw_buffer, values) }
    }

    fn clear_buffer_i32_slice(&self, buffer: u32, draw_buffer: u32, values: &[i32; 4]) {
        unsafe { self.gl.clear_buffer_i32_slice(buffer, draw_buffer, values) }
    }

    fn clear_buffer_u32_slice(&self, buffer: u32, draw_buffer: u32, values: &[u32; 4]) {
        unsafe { self.gl.clear_buffer_u32_slice(buffer, draw_buffer, values) }
    }

    fn clear_buffer_depth_stencil(&self, buffer: u32, draw_buffer: u32, depth: f32, stencil: i32) {
        unsafe { self.gl.clear_buffer_depth_stencil(buffer, draw_buffer, depth, stencil) }
    }

    fn enable(&self, cap: u32) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { self.gl.disable(cap) }
    }

    fn cull_face(&self, mode: u32) {
        unsafe { self.gl.cull_face(mode) }
    }

    fn front_face(&self, mode: u32) {
        unsafe { self.gl.front_face(mode) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn depth_mask(&self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_range_f32(&self, near: f32, far: f32) {
        unsafe { self.gl.depth_range_f32(near, far) }
    }

    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func_separate(face, func, reference, mask) }
    }

    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.gl.stencil_op_separate(face, fail, depth_fail, pass) }
    }

    fn stencil_mask_separate(&self, face: u32, mask: u32) {
        unsafe { self.gl.stencil_mask_separate(face, mask) }
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe { self.gl.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha) }
    }

    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32) {
        unsafe { self.gl.blend_equation_separate(mode_rgb, mode_alpha) }
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.blend_color(r, g, b, a) }
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.gl.color_mask(r, g, b, a) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32) {
        unsafe {
            self.gl
                .draw_elements_instanced(mode, count, index_type, offset, instances)
        }
    }

    fn flush(&self) {
        unsafe { self.gl.flush() }
    }

    fn finish(&self) {
        unsafe { self.gl.finish() }
    }
}
