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

//! The GL surface the WebGL2 backend is written against.
//!
//! [`GlContext`] mirrors the subset of the WebGL2 API the backend needs, with
//! plain integer object names. It is implemented for `glow::Context` (feature
//! `native-gl`) and by the software [`HeadlessGl`](super::headless::HeadlessGl).

use std::fmt::Debug;

/// A GL object name; `0` means "none".
pub type GlName = u32;

/// Result of `getActiveAttrib` / `getActiveUniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlActiveInfo {
    /// Declared name (`[0]` suffix for arrays).
    pub name: String,
    /// Array length, 1 for scalars.
    pub size: i32,
    /// GL type enum (`FLOAT_VEC3`, `SAMPLER_2D`, ...).
    pub utype: u32,
}

/// The WebGL2 calls the backend issues.
///
/// Methods take `&self`; implementations use interior mutability, like the
/// underlying GL context does.
#[allow(missing_docs)]
pub trait GlContext: Debug {
    // State queries
    fn get_error(&self) -> u32;
    fn get_parameter_i32(&self, pname: u32) -> i32;
    fn get_parameter_string(&self, pname: u32) -> String;
    fn is_context_lost(&self) -> bool;
    fn supports_extension(&self, name: &str) -> bool;

    // Buffers
    fn create_buffer(&self) -> Result<GlName, String>;
    fn delete_buffer(&self, buffer: GlName);
    fn bind_buffer(&self, target: u32, buffer: GlName);
    fn buffer_data_size(&self, target: u32, size: i32, usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]);
    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]);
    fn bind_buffer_range(&self, target: u32, index: u32, buffer: GlName, offset: i32, size: i32);
    fn copy_buffer_sub_data(&self, read_target: u32, write_target: u32, read_offset: i32, write_offset: i32, size: i32);

    // Textures
    fn create_texture(&self) -> Result<GlName, String>;
    fn delete_texture(&self, texture: GlName);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: GlName);
    fn tex_storage_2d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32);
    fn tex_storage_3d(&self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32, depth: i32);
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(&self, target: u32, level: i32, x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32, data: &[u8]);
    #[allow(clippy::too_many_arguments)]
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
    );
    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32);
    fn pixel_store_i32(&self, pname: u32, value: i32);

    // Samplers
    fn create_sampler(&self) -> Result<GlName, String>;
    fn delete_sampler(&self, sampler: GlName);
    fn bind_sampler(&self, unit: u32, sampler: GlName);
    fn sampler_parameter_i32(&self, sampler: GlName, pname: u32, value: i32);
    fn sampler_parameter_f32(&self, sampler: GlName, pname: u32, value: f32);

    // Shaders and programs
    fn create_shader(&self, shader_type: u32) -> Result<GlName, String>;
    fn delete_shader(&self, shader: GlName);
    fn shader_source(&self, shader: GlName, source: &str);
    fn compile_shader(&self, shader: GlName);
    fn get_shader_compile_status(&self, shader: GlName) -> bool;
    fn get_shader_info_log(&self, shader: GlName) -> String;
    fn create_program(&self) -> Result<GlName, String>;
    fn delete_program(&self, program: GlName);
    fn attach_shader(&self, program: GlName, shader: GlName);
    fn bind_attrib_location(&self, program: GlName, index: u32, name: &str);
    fn link_program(&self, program: GlName);
    fn get_program_link_status(&self, program: GlName) -> bool;
    fn get_program_info_log(&self, program: GlName) -> String;
    fn use_program(&self, program: GlName);

    // Introspection
    fn get_active_attributes(&self, program: GlName) -> u32;
    fn get_active_attribute(&self, program: GlName, index: u32) -> Option<GlActiveInfo>;
    fn get_attrib_location(&self, program: GlName, name: &str) -> Option<u32>;
    fn get_active_uniforms(&self, program: GlName) -> u32;
    fn get_active_uniform(&self, program: GlName, index: u32) -> Option<GlActiveInfo>;
    /// Block index of an active uniform, `-1` for free uniforms.
    fn get_active_uniform_block_index(&self, program: GlName, uniform: u32) -> i32;
    fn get_uniform_location(&self, program: GlName, name: &str) -> Option<u32>;
    fn get_active_uniform_blocks(&self, program: GlName) -> u32;
    fn get_active_uniform_block_name(&self, program: GlName, index: u32) -> String;
    fn get_active_uniform_block_size(&self, program: GlName, index: u32) -> i32;
    fn uniform_block_binding(&self, program: GlName, index: u32, binding: u32);
    fn uniform_1_i32(&self, location: u32, value: i32);

    // Vertex input
    fn create_vertex_array(&self) -> Result<GlName, String>;
    fn delete_vertex_array(&self, vao: GlName);
    fn bind_vertex_array(&self, vao: GlName);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);
    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    // Framebuffers
    fn create_framebuffer(&self) -> Result<GlName, String>;
    fn delete_framebuffer(&self, framebuffer: GlName);
    fn bind_framebuffer(&self, target: u32, framebuffer: GlName);
    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, tex_target: u32, texture: GlName, level: i32);
    fn framebuffer_texture_layer(&self, target: u32, attachment: u32, texture: GlName, level: i32, layer: i32);
    fn check_framebuffer_status(&self, target: u32) -> u32;
    fn draw_buffers(&self, buffers: &[u32]);
    fn invalidate_framebuffer(&self, target: u32, attachments: &[u32]);
    fn clear_buffer_f32_slice(&self, buffer: u32, draw_buffer: u32, values: &[f32; 4]);
    fn clear_buffer_i32_slice(&self, buffer: u32, draw_buffer: u32, values: &[i32; 4]);
    fn clear_buffer_u32_slice(&self, buffer: u32, draw_buffer: u32, values: &[u32; 4]);
    fn clear_buffer_depth_stencil(&self, buffer: u32, draw_buffer: u32, depth: f32, stencil: i32);

    // Fixed-function state
    fn enable(&self, cap: u32);
    fn disable(&self, cap: u32);
    fn cull_face(&self, mode: u32);
    fn front_face(&self, mode: u32);
    fn depth_func(&self, func: u32);
    fn depth_mask(&self, write: bool);
    fn depth_range_f32(&self, near: f32, far: f32);
    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32);
    fn stencil_mask_separate(&self, face: u32, mask: u32);
    fn polygon_offset(&self, factor: f32, units: f32);
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32);
    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);

    // Drawing
    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(&self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32);
    fn flush(&self);
    fn finish(&self);
}

/// GL enum values used by the backend.
#[allow(missing_docs)]
pub mod consts {
    pub const NONE: u32 = 0;
    pub const NO_ERROR: u32 = 0;
    pub const INVALID_ENUM: u32 = 0x0500;
    pub const INVALID_VALUE: u32 = 0x0501;
    pub const INVALID_OPERATION: u32 = 0x0502;
    pub const OUT_OF_MEMORY: u32 = 0x0505;
    pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;
    pub const CONTEXT_LOST_WEBGL: u32 = 0x9242;

    pub const ARRAY_BUFFER: u32 = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
    pub const UNIFORM_BUFFER: u32 = 0x8A11;
    pub const COPY_READ_BUFFER: u32 = 0x8F36;
    pub const COPY_WRITE_BUFFER: u32 = 0x8F37;
    pub const STATIC_DRAW: u32 = 0x88E4;
    pub const DYNAMIC_DRAW: u32 = 0x88E8;
    pub const DYNAMIC_READ: u32 = 0x88E9;
    pub const DYNAMIC_COPY: u32 = 0x88EA;

    pub const TEXTURE_2D: u32 = 0x0DE1;
    pub const TEXTURE_3D: u32 = 0x806F;
    pub const TEXTURE_2D_ARRAY: u32 = 0x8C1A;
    pub const TEXTURE_CUBE_MAP: u32 = 0x8513;
    pub const TEXTURE_CUBE_MAP_POSITIVE_X: u32 = 0x8515;
    pub const TEXTURE0: u32 = 0x84C0;
    pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
    pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
    pub const TEXTURE_WRAP_S: u32 = 0x2802;
    pub const TEXTURE_WRAP_T: u32 = 0x2803;
    pub const TEXTURE_WRAP_R: u32 = 0x8072;
    pub const TEXTURE_MIN_LOD: u32 = 0x813A;
    pub const TEXTURE_MAX_LOD: u32 = 0x813B;
    pub const TEXTURE_BASE_LEVEL: u32 = 0x813C;
    pub const TEXTURE_MAX_LEVEL: u32 = 0x813D;
    pub const TEXTURE_COMPARE_MODE: u32 = 0x884C;
    pub const TEXTURE_COMPARE_FUNC: u32 = 0x884D;
    pub const COMPARE_REF_TO_TEXTURE: u32 = 0x884E;
    pub const TEXTURE_MAX_ANISOTROPY_EXT: u32 = 0x84FE;
    pub const NEAREST: u32 = 0x2600;
    pub const LINEAR: u32 = 0x2601;
    pub const NEAREST_MIPMAP_NEAREST: u32 = 0x2700;
    pub const LINEAR_MIPMAP_NEAREST: u32 = 0x2701;
    pub const NEAREST_MIPMAP_LINEAR: u32 = 0x2702;
    pub const LINEAR_MIPMAP_LINEAR: u32 = 0x2703;
    pub const REPEAT: u32 = 0x2901;
    pub const CLAMP_TO_EDGE: u32 = 0x812F;
    pub const MIRRORED_REPEAT: u32 = 0x8370;
    pub const UNPACK_ALIGNMENT: u32 = 0x0CF5;
    pub const UNPACK_ROW_LENGTH: u32 = 0x0CF2;
    pub const UNPACK_IMAGE_HEIGHT: u32 = 0x806E;

    pub const NEVER: u32 = 0x0200;
    pub const LESS: u32 = 0x0201;
    pub const EQUAL: u32 = 0x0202;
    pub const LEQUAL: u32 = 0x0203;
    pub const GREATER: u32 = 0x0204;
    pub const NOTEQUAL: u32 = 0x0205;
    pub const GEQUAL: u32 = 0x0206;
    pub const ALWAYS: u32 = 0x0207;

    pub const KEEP: u32 = 0x1E00;
    pub const REPLACE: u32 = 0x1E01;
    pub const INCR: u32 = 0x1E02;
    pub const DECR: u32 = 0x1E03;
    pub const INVERT: u32 = 0x150A;
    pub const INCR_WRAP: u32 = 0x8507;
    pub const DECR_WRAP: u32 = 0x8508;

    pub const ZERO: u32 = 0;
    pub const ONE: u32 = 1;
    pub const SRC_COLOR: u32 = 0x0300;
    pub const ONE_MINUS_SRC_COLOR: u32 = 0x0301;
    pub const SRC_ALPHA: u32 = 0x0302;
    pub const ONE_MINUS_SRC_ALPHA: u32 = 0x0303;
    pub const DST_ALPHA: u32 = 0x0304;
    pub const ONE_MINUS_DST_ALPHA: u32 = 0x0305;
    pub const DST_COLOR: u32 = 0x0306;
    pub const ONE_MINUS_DST_COLOR: u32 = 0x0307;
    pub const SRC_ALPHA_SATURATE: u32 = 0x0308;
    pub const CONSTANT_COLOR: u32 = 0x8001;
    pub const ONE_MINUS_CONSTANT_COLOR: u32 = 0x8002;
    pub const FUNC_ADD: u32 = 0x8006;
    pub const MIN: u32 = 0x8007;
    pub const MAX: u32 = 0x8008;
    pub const FUNC_SUBTRACT: u32 = 0x800A;
    pub const FUNC_REVERSE_SUBTRACT: u32 = 0x800B;

    pub const BLEND: u32 = 0x0BE2;
    pub const CULL_FACE: u32 = 0x0B44;
    pub const DEPTH_TEST: u32 = 0x0B71;
    pub const STENCIL_TEST: u32 = 0x0B90;
    pub const SCISSOR_TEST: u32 = 0x0C11;
    pub const POLYGON_OFFSET_FILL: u32 = 0x8037;
    pub const SAMPLE_ALPHA_TO_COVERAGE: u32 = 0x809E;
    pub const PRIMITIVE_RESTART_FIXED_INDEX: u32 = 0x8D69;
    pub const FRONT: u32 = 0x0404;
    pub const BACK: u32 = 0x0405;
    pub const FRONT_AND_BACK: u32 = 0x0408;
    pub const CW: u32 = 0x0900;
    pub const CCW: u32 = 0x0901;

    pub const POINTS: u32 = 0x0000;
    pub const LINES: u32 = 0x0001;
    pub const LINE_STRIP: u32 = 0x0003;
    pub const TRIANGLES: u32 = 0x0004;
    pub const TRIANGLE_STRIP: u32 = 0x0005;

    pub const BYTE: u32 = 0x1400;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const SHORT: u32 = 0x1402;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const INT: u32 = 0x1404;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;
    pub const HALF_FLOAT: u32 = 0x140B;
    pub const UNSIGNED_INT_2_10_10_10_REV: u32 = 0x8368;
    pub const UNSIGNED_INT_10F_11F_11F_REV: u32 = 0x8C3B;
    pub const UNSIGNED_INT_24_8: u32 = 0x84FA;
    pub const FLOAT_32_UNSIGNED_INT_24_8_REV: u32 = 0x8DAD;

    pub const RED: u32 = 0x1903;
    pub const RG: u32 = 0x8227;
    pub const RGB: u32 = 0x1907;
    pub const RGBA: u32 = 0x1908;
    pub const RED_INTEGER: u32 = 0x8D94;
    pub const RG_INTEGER: u32 = 0x8228;
    pub const RGBA_INTEGER: u32 = 0x8D99;
    pub const DEPTH_COMPONENT: u32 = 0x1902;
    pub const DEPTH_STENCIL: u32 = 0x84F9;
    pub const STENCIL_INDEX8: u32 = 0x8D48;

    pub const R8: u32 = 0x8229;
    pub const R8_SNORM: u32 = 0x8F94;
    pub const R8I: u32 = 0x8231;
    pub const R8UI: u32 = 0x8232;
    pub const R16I: u32 = 0x8233;
    pub const R16UI: u32 = 0x8234;
    pub const R16F: u32 = 0x822D;
    pub const RG8: u32 = 0x822B;
    pub const RG8_SNORM: u32 = 0x8F95;
    pub const RG8I: u32 = 0x8237;
    pub const RG8UI: u32 = 0x8238;
    pub const R32I: u32 = 0x8235;
    pub const R32UI: u32 = 0x8236;
    pub const R32F: u32 = 0x822E;
    pub const RG16I: u32 = 0x8239;
    pub const RG16UI: u32 = 0x823A;
    pub const RG16F: u32 = 0x822F;
    pub const RGBA8: u32 = 0x8058;
    pub const SRGB8_ALPHA8: u32 = 0x8C43;
    pub const RGBA8_SNORM: u32 = 0x8F97;
    pub const RGBA8I: u32 = 0x8D8E;
    pub const RGBA8UI: u32 = 0x8D7C;
    pub const RGB10_A2: u32 = 0x8059;
    pub const R11F_G11F_B10F: u32 = 0x8C3A;
    pub const RG32I: u32 = 0x823B;
    pub const RG32UI: u32 = 0x823C;
    pub const RG32F: u32 = 0x8230;
    pub const RGBA16I: u32 = 0x8D88;
    pub const RGBA16UI: u32 = 0x8D76;
    pub const RGBA16F: u32 = 0x881A;
    pub const RGBA32I: u32 = 0x8D82;
    pub const RGBA32UI: u32 = 0x8D70;
    pub const RGBA32F: u32 = 0x8814;
    pub const DEPTH_COMPONENT16: u32 = 0x81A5;
    pub const DEPTH_COMPONENT24: u32 = 0x81A6;
    pub const DEPTH24_STENCIL8: u32 = 0x88F0;
    pub const DEPTH_COMPONENT32F: u32 = 0x8CAC;
    pub const DEPTH32F_STENCIL8: u32 = 0x8CAD;

    pub const FRAMEBUFFER: u32 = 0x8D40;
    pub const READ_FRAMEBUFFER: u32 = 0x8CA8;
    pub const DRAW_FRAMEBUFFER: u32 = 0x8CA9;
    pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
    pub const COLOR_ATTACHMENT0: u32 = 0x8CE0;
    pub const DEPTH_ATTACHMENT: u32 = 0x8D00;
    pub const STENCIL_ATTACHMENT: u32 = 0x8D20;
    pub const DEPTH_STENCIL_ATTACHMENT: u32 = 0x821A;
    pub const COLOR: u32 = 0x1800;
    pub const DEPTH: u32 = 0x1801;
    pub const STENCIL: u32 = 0x1802;

    pub const VERTEX_SHADER: u32 = 0x8B31;
    pub const FRAGMENT_SHADER: u32 = 0x8B30;

    pub const VENDOR: u32 = 0x1F00;
    pub const RENDERER: u32 = 0x1F01;
    pub const VERSION: u32 = 0x1F02;
    pub const SHADING_LANGUAGE_VERSION: u32 = 0x8B8C;
    pub const MAX_TEXTURE_SIZE: u32 = 0x0D33;
    pub const MAX_3D_TEXTURE_SIZE: u32 = 0x8073;
    pub const MAX_ARRAY_TEXTURE_LAYERS: u32 = 0x88FF;
    pub const MAX_CUBE_MAP_TEXTURE_SIZE: u32 = 0x851C;
    pub const MAX_VERTEX_ATTRIBS: u32 = 0x8869;
    pub const MAX_TEXTURE_IMAGE_UNITS: u32 = 0x8872;
    pub const MAX_COMBINED_TEXTURE_IMAGE_UNITS: u32 = 0x8B4D;
    pub const MAX_UNIFORM_BUFFER_BINDINGS: u32 = 0x8A2F;
    pub const MAX_UNIFORM_BLOCK_SIZE: u32 = 0x8A30;
    pub const MAX_VERTEX_UNIFORM_BLOCKS: u32 = 0x8A2B;
    pub const MAX_FRAGMENT_UNIFORM_BLOCKS: u32 = 0x8A2D;
    pub const MAX_COLOR_ATTACHMENTS: u32 = 0x8CDF;
    pub const MAX_DRAW_BUFFERS: u32 = 0x8824;
    pub const UNIFORM_BUFFER_OFFSET_ALIGNMENT: u32 = 0x8A34;
    pub const MAX_SAMPLES: u32 = 0x8D57;
    pub const UNIFORM_BLOCK_INDEX: u32 = 0x8A3A;
    pub const UNIFORM_BLOCK_DATA_SIZE: u32 = 0x8A40;

    pub const FLOAT_VEC2: u32 = 0x8B50;
    pub const FLOAT_VEC3: u32 = 0x8B51;
    pub const FLOAT_VEC4: u32 = 0x8B52;
    pub const INT_VEC2: u32 = 0x8B53;
    pub const INT_VEC3: u32 = 0x8B54;
    pub const INT_VEC4: u32 = 0x8B55;
    pub const BOOL: u32 = 0x8B56;
    pub const FLOAT_MAT2: u32 = 0x8B5A;
    pub const FLOAT_MAT3: u32 = 0x8B5B;
    pub const FLOAT_MAT4: u32 = 0x8B5C;
    pub const SAMPLER_2D: u32 = 0x8B5E;
    pub const SAMPLER_3D: u32 = 0x8B5F;
    pub const SAMPLER_CUBE: u32 = 0x8B60;
    pub const SAMPLER_2D_SHADOW: u32 = 0x8B62;
    pub const SAMPLER_2D_ARRAY: u32 = 0x8DC1;
    pub const SAMPLER_2D_ARRAY_SHADOW: u32 = 0x8DC4;
    pub const SAMPLER_CUBE_SHADOW: u32 = 0x8DC5;
    pub const UNSIGNED_INT_VEC2: u32 = 0x8DC6;
    pub const UNSIGNED_INT_VEC3: u32 = 0x8DC7;
    pub const UNSIGNED_INT_VEC4: u32 = 0x8DC8;
    pub const INT_SAMPLER_2D: u32 = 0x8DCA;
    pub const INT_SAMPLER_3D: u32 = 0x8DCB;
    pub const INT_SAMPLER_CUBE: u32 = 0x8DCC;
    pub const INT_SAMPLER_2D_ARRAY: u32 = 0x8DCF;
    pub const UNSIGNED_INT_SAMPLER_2D: u32 = 0x8DD2;
    pub const UNSIGNED_INT_SAMPLER_3D: u32 = 0x8DD3;
    pub const UNSIGNED_INT_SAMPLER_CUBE: u32 = 0x8DD4;
    pub const UNSIGNED_INT_SAMPLER_2D_ARRAY: u32 = 0x8DD7;

    /// `true` for sampler uniform types.
    pub fn is_sampler_type(utype: u32) -> bool {
        matches!(
            utype,
            SAMPLER_2D
                | SAMPLER_3D
                | SAMPLER_CUBE
                | SAMPLER_2D_SHADOW
                | SAMPLER_2D_ARRAY
                | SAMPLER_2D_ARRAY_SHADOW
                | SAMPLER_CUBE_SHADOW
                | INT_SAMPLER_2D
                | INT_SAMPLER_3D
                | INT_SAMPLER_CUBE
                | INT_SAMPLER_2D_ARRAY
                | UNSIGNED_INT_SAMPLER_2D
                | UNSIGNED_INT_SAMPLER_3D
                | UNSIGNED_INT_SAMPLER_CUBE
                | UNSIGNED_INT_SAMPLER_2D_ARRAY
        )
    }

    /// Name of a GL error code, for messages.
    pub fn error_name(code: u32) -> &'static str {
        match code {
            NO_ERROR => "NO_ERROR",
            INVALID_ENUM => "INVALID_ENUM",
            INVALID_VALUE => "INVALID_VALUE",
            INVALID_OPERATION => "INVALID_OPERATION",
            OUT_OF_MEMORY => "OUT_OF_MEMORY",
            INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
            CONTEXT_LOST_WEBGL => "CONTEXT_LOST_WEBGL",
            _ => "UNKNOWN_GL_ERROR",
        }
    }
}
