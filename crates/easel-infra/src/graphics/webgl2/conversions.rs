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

//! Canonical-to-GL tables.

use super::gl::consts::*;
use easel_core::gfx::api::*;

/// Local conversion trait into GL enums, mirroring `IntoWgpu`.
pub trait IntoGl<T> {
    /// Converts into the GL representation.
    fn into_gl(self) -> T;
}

/// Storage and upload enums of a texture format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlTextureFormat {
    /// Sized internal format for `texStorage*`.
    pub internal: u32,
    /// Pixel format for uploads.
    pub format: u32,
    /// Component type for uploads.
    pub ty: u32,
}

const fn fmt(internal: u32, format: u32, ty: u32) -> Option<GlTextureFormat> {
    Some(GlTextureFormat { internal, format, ty })
}

/// GL storage of a canonical format; `None` when WebGL2 has no texture
/// equivalent (BGRA ordering, stencil-only, block compression).
pub fn gl_texture_format(format: TextureFormat) -> Option<GlTextureFormat> {
    use TextureFormat as F;
    match format {
        F::R8Unorm => fmt(R8, RED, UNSIGNED_BYTE),
        F::R8Snorm => fmt(R8_SNORM, RED, BYTE),
        F::R8Uint => fmt(R8UI, RED_INTEGER, UNSIGNED_BYTE),
        F::R8Sint => fmt(R8I, RED_INTEGER, BYTE),
        F::R16Uint => fmt(R16UI, RED_INTEGER, UNSIGNED_SHORT),
        F::R16Sint => fmt(R16I, RED_INTEGER, SHORT),
        F::R16Float => fmt(R16F, RED, HALF_FLOAT),
        F::Rg8Unorm => fmt(RG8, RG, UNSIGNED_BYTE),
        F::Rg8Snorm => fmt(RG8_SNORM, RG, BYTE),
        F::Rg8Uint => fmt(RG8UI, RG_INTEGER, UNSIGNED_BYTE),
        F::Rg8Sint => fmt(RG8I, RG_INTEGER, BYTE),
        F::R32Uint => fmt(R32UI, RED_INTEGER, UNSIGNED_INT),
        F::R32Sint => fmt(R32I, RED_INTEGER, INT),
        F::R32Float => fmt(R32F, RED, FLOAT),
        F::Rg16Uint => fmt(RG16UI, RG_INTEGER, UNSIGNED_SHORT),
        F::Rg16Sint => fmt(RG16I, RG_INTEGER, SHORT),
        F::Rg16Float => fmt(RG16F, RG, HALF_FLOAT),
        F::Rgba8Unorm => fmt(RGBA8, RGBA, UNSIGNED_BYTE),
        F::Rgba8UnormSrgb => fmt(SRGB8_ALPHA8, RGBA, UNSIGNED_BYTE),
        F::Rgba8Snorm => fmt(RGBA8_SNORM, RGBA, BYTE),
        F::Rgba8Uint => fmt(RGBA8UI, RGBA_INTEGER, UNSIGNED_BYTE),
        F::Rgba8Sint => fmt(RGBA8I, RGBA_INTEGER, BYTE),
        F::Rgb10a2Unorm => fmt(RGB10_A2, RGBA, UNSIGNED_INT_2_10_10_10_REV),
        F::Rg11b10Ufloat => fmt(R11F_G11F_B10F, RGB, UNSIGNED_INT_10F_11F_11F_REV),
        F::Rg32Uint => fmt(RG32UI, RG_INTEGER, UNSIGNED_INT),
        F::Rg32Sint => fmt(RG32I, RG_INTEGER, INT),
        F::Rg32Float => fmt(RG32F, RG, FLOAT),
        F::Rgba16Uint => fmt(RGBA16UI, RGBA_INTEGER, UNSIGNED_SHORT),
        F::Rgba16Sint => fmt(RGBA16I, RGBA_INTEGER, SHORT),
        F::Rgba16Float => fmt(RGBA16F, RGBA, HALF_FLOAT),
        F::Rgba32Uint => fmt(RGBA32UI, RGBA_INTEGER, UNSIGNED_INT),
        F::Rgba32Sint => fmt(RGBA32I, RGBA_INTEGER, INT),
        F::Rgba32Float => fmt(RGBA32F, RGBA, FLOAT),
        F::Depth16Unorm => fmt(DEPTH_COMPONENT16, DEPTH_COMPONENT, UNSIGNED_SHORT),
        F::Depth24Plus => fmt(DEPTH_COMPONENT24, DEPTH_COMPONENT, UNSIGNED_INT),
        F::Depth24PlusStencil8 => fmt(DEPTH24_STENCIL8, DEPTH_STENCIL, UNSIGNED_INT_24_8),
        F::Depth32Float => fmt(DEPTH_COMPONENT32F, DEPTH_COMPONENT, FLOAT),
        F::Depth32FloatStencil8 => fmt(DEPTH32F_STENCIL8, DEPTH_STENCIL, FLOAT_32_UNSIGNED_INT_24_8_REV),
        F::Bgra8Unorm
        | F::Bgra8UnormSrgb
        | F::Stencil8
        | F::Bc1RgbaUnorm
        | F::Bc1RgbaUnormSrgb
        | F::Bc3RgbaUnorm
        | F::Bc3RgbaUnormSrgb
        | F::Bc7RgbaUnorm
        | F::Bc7RgbaUnormSrgb => None,
    }
}

/// How a vertex format is fed to `vertexAttrib*Pointer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlVertexAttrib {
    /// Component count.
    pub size: i32,
    /// Component type.
    pub ty: u32,
    /// Fixed-point normalization.
    pub normalized: bool,
    /// Use `vertexAttribIPointer`.
    pub integer: bool,
}

impl IntoGl<GlVertexAttrib> for VertexFormat {
    fn into_gl(self) -> GlVertexAttrib {
        let info = self.info();
        let ty = match info.component_type {
            VertexComponentType::Uint8 => UNSIGNED_BYTE,
            VertexComponentType::Sint8 => BYTE,
            VertexComponentType::Uint16 => UNSIGNED_SHORT,
            VertexComponentType::Sint16 => SHORT,
            VertexComponentType::Float16 => HALF_FLOAT,
            VertexComponentType::Float32 => FLOAT,
            VertexComponentType::Uint32 => UNSIGNED_INT,
            VertexComponentType::Sint32 => INT,
        };
        GlVertexAttrib {
            size: info.components as i32,
            ty,
            normalized: info.normalized,
            integer: info.component_type.is_integer() && !info.normalized,
        }
    }
}

impl IntoGl<u32> for CompareFunction {
    fn into_gl(self) -> u32 {
        match self {
            CompareFunction::Never => NEVER,
            CompareFunction::Less => LESS,
            CompareFunction::Equal => EQUAL,
            CompareFunction::LessEqual => LEQUAL,
            CompareFunction::Greater => GREATER,
            CompareFunction::NotEqual => NOTEQUAL,
            CompareFunction::GreaterEqual => GEQUAL,
            CompareFunction::Always => ALWAYS,
        }
    }
}

impl IntoGl<u32> for StencilOperation {
    fn into_gl(self) -> u32 {
        match self {
            StencilOperation::Keep => KEEP,
            StencilOperation::Zero => ZERO,
            StencilOperation::Replace => REPLACE,
            StencilOperation::Invert => INVERT,
            StencilOperation::IncrementClamp => INCR,
            StencilOperation::DecrementClamp => DECR,
            StencilOperation::IncrementWrap => INCR_WRAP,
            StencilOperation::DecrementWrap => DECR_WRAP,
        }
    }
}

impl IntoGl<u32> for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => ZERO,
            BlendFactor::One => ONE,
            BlendFactor::Src => SRC_COLOR,
            BlendFactor::OneMinusSrc => ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => ONE_MINUS_SRC_ALPHA,
            BlendFactor::Dst => DST_COLOR,
            BlendFactor::OneMinusDst => ONE_MINUS_DST_COLOR,
            BlendFactor::DstAlpha => DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => ONE_MINUS_DST_ALPHA,
            BlendFactor::SrcAlphaSaturated => SRC_ALPHA_SATURATE,
            BlendFactor::Constant => CONSTANT_COLOR,
            BlendFactor::OneMinusConstant => ONE_MINUS_CONSTANT_COLOR,
        }
    }
}

impl IntoGl<u32> for BlendOperation {
    fn into_gl(self) -> u32 {
        match self {
            BlendOperation::Add => FUNC_ADD,
            BlendOperation::Subtract => FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => FUNC_REVERSE_SUBTRACT,
            BlendOperation::Min => MIN,
            BlendOperation::Max => MAX,
        }
    }
}

/// `None` means culling is disabled.
impl IntoGl<Option<u32>> for CullMode {
    fn into_gl(self) -> Option<u32> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(FRONT),
            CullMode::Back => Some(BACK),
        }
    }
}

impl IntoGl<u32> for FrontFace {
    fn into_gl(self) -> u32 {
        match self {
            FrontFace::Ccw => CCW,
            FrontFace::Cw => CW,
        }
    }
}

impl IntoGl<u32> for PrimitiveTopology {
    fn into_gl(self) -> u32 {
        match self {
            PrimitiveTopology::PointList => POINTS,
            PrimitiveTopology::LineList => LINES,
            PrimitiveTopology::LineStrip => LINE_STRIP,
            PrimitiveTopology::TriangleList => TRIANGLES,
            PrimitiveTopology::TriangleStrip => TRIANGLE_STRIP,
        }
    }
}

impl IntoGl<u32> for IndexFormat {
    fn into_gl(self) -> u32 {
        match self {
            IndexFormat::Uint16 => UNSIGNED_SHORT,
            IndexFormat::Uint32 => UNSIGNED_INT,
        }
    }
}

impl IntoGl<u32> for AddressMode {
    fn into_gl(self) -> u32 {
        match self {
            AddressMode::ClampToEdge => CLAMP_TO_EDGE,
            AddressMode::Repeat => REPEAT,
            AddressMode::MirrorRepeat => MIRRORED_REPEAT,
        }
    }
}

impl IntoGl<u32> for FilterMode {
    fn into_gl(self) -> u32 {
        match self {
            FilterMode::Nearest => NEAREST,
            FilterMode::Linear => LINEAR,
        }
    }
}

/// Minification filter combining texel and mip filtering.
pub fn min_filter(min: FilterMode, mipmap: MipmapFilterMode) -> u32 {
    match (min, mipmap) {
        (FilterMode::Nearest, MipmapFilterMode::Nearest) => NEAREST_MIPMAP_NEAREST,
        (FilterMode::Linear, MipmapFilterMode::Nearest) => LINEAR_MIPMAP_NEAREST,
        (FilterMode::Nearest, MipmapFilterMode::Linear) => NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, MipmapFilterMode::Linear) => LINEAR_MIPMAP_LINEAR,
    }
}

/// GL texture target for a texture's storage.
///
/// 1D textures are stored as 2D with height 1; square six-layer 2D textures
/// become cube maps; other multi-layer 2D textures become 2D arrays.
pub fn texture_target(desc: &TextureDescriptor) -> u32 {
    match desc.dimension {
        TextureDimension::D1 => TEXTURE_2D,
        TextureDimension::D2 => match desc.size.depth_or_array_layers {
            1 => TEXTURE_2D,
            6 if desc.size.width == desc.size.height => TEXTURE_CUBE_MAP,
            _ => TEXTURE_2D_ARRAY,
        },
        TextureDimension::D3 => TEXTURE_3D,
    }
}

/// View dimension a GL texture target can be sampled as.
pub fn view_dimension_for_target(target: u32) -> TextureViewDimension {
    match target {
        TEXTURE_CUBE_MAP => TextureViewDimension::Cube,
        TEXTURE_2D_ARRAY => TextureViewDimension::D2Array,
        TEXTURE_3D => TextureViewDimension::D3,
        _ => TextureViewDimension::D2,
    }
}

/// Buffer usage hint for `bufferData`.
pub fn buffer_usage_hint(usage: BufferUsages) -> u32 {
    if usage.contains(BufferUsages::MAP_READ) {
        DYNAMIC_READ
    } else if usage.intersects(BufferUsages::COPY_DST | BufferUsages::UNIFORM | BufferUsages::STORAGE) {
        DYNAMIC_DRAW
    } else {
        STATIC_DRAW
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unsupported_formats_are_absent() {
        for format in [
            TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Stencil8,
            TextureFormat::Bc7RgbaUnorm,
        ] {
            assert_eq!(gl_texture_format(format), None, "{format:?}");
        }
    }

    #[test]
    fn internal_formats_are_injective() {
        let mut seen = HashSet::new();
        for format in TextureFormat::ALL {
            if let Some(gl) = gl_texture_format(*format) {
                assert!(seen.insert(gl.internal), "{format:?} shares an internal format");
                assert_eq!(gl_texture_format(*format), Some(gl));
            }
        }
        assert_eq!(seen.len(), 38);
    }

    #[test]
    fn depth_formats_upload_as_depth() {
        for format in TextureFormat::ALL.iter().filter(|f| f.has_depth()) {
            let gl = gl_texture_format(*format).unwrap();
            assert!(gl.format == DEPTH_COMPONENT || gl.format == DEPTH_STENCIL);
        }
    }

    #[test]
    fn vertex_formats_pick_the_right_pointer_call() {
        let position = VertexFormat::Float32x3.into_gl();
        assert_eq!((position.size, position.ty, position.integer), (3, FLOAT, false));
        let color = VertexFormat::Unorm8x4.into_gl();
        assert!(color.normalized && !color.integer);
        let joints = VertexFormat::Uint16x4.into_gl();
        assert!(joints.integer);
    }

    #[test]
    fn layered_textures_pick_targets() {
        let mut desc = TextureDescriptor::default();
        assert_eq!(texture_target(&desc), TEXTURE_2D);
        desc.size.depth_or_array_layers = 6;
        assert_eq!(texture_target(&desc), TEXTURE_CUBE_MAP);
        desc.size.depth_or_array_layers = 4;
        assert_eq!(texture_target(&desc), TEXTURE_2D_ARRAY);
        desc.size = Extent3D {
            width: 8,
            height: 4,
            depth_or_array_layers: 6,
        };
        assert_eq!(texture_target(&desc), TEXTURE_2D_ARRAY);
    }
}
