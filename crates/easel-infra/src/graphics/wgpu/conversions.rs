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

//! Conversions from the `Gfx*` descriptors to their `wgpu` counterparts.

use easel_core::gfx::api::*;
use easel_core::gfx::error::{ErrorFilter, GfxError};

/// A local extension trait to convert the engine's types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Dimensions and Origins ---

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

impl IntoWgpu<wgpu::Origin3d> for Origin3D {
    fn into_wgpu(self) -> wgpu::Origin3d {
        wgpu::Origin3d {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

// --- Texture related Enums ---

impl IntoWgpu<wgpu::TextureDimension> for TextureDimension {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            TextureDimension::D1 => wgpu::TextureDimension::D1,
            TextureDimension::D2 => wgpu::TextureDimension::D2,
            TextureDimension::D3 => wgpu::TextureDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureViewDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureViewDimension::D1 => wgpu::TextureViewDimension::D1,
            TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
            TextureViewDimension::Cube => wgpu::TextureViewDimension::Cube,
            TextureViewDimension::CubeArray => wgpu::TextureViewDimension::CubeArray,
            TextureViewDimension::D3 => wgpu::TextureViewDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureAspect> for TextureAspect {
    fn into_wgpu(self) -> wgpu::TextureAspect {
        match self {
            TextureAspect::All => wgpu::TextureAspect::All,
            TextureAspect::StencilOnly => wgpu::TextureAspect::StencilOnly,
            TextureAspect::DepthOnly => wgpu::TextureAspect::DepthOnly,
        }
    }
}

impl IntoWgpu<wgpu::TextureSampleType> for TextureSampleType {
    fn into_wgpu(self) -> wgpu::TextureSampleType {
        match self {
            TextureSampleType::Float { filterable } => wgpu::TextureSampleType::Float { filterable },
            TextureSampleType::Depth => wgpu::TextureSampleType::Depth,
            TextureSampleType::Uint => wgpu::TextureSampleType::Uint,
            TextureSampleType::Sint => wgpu::TextureSampleType::Sint,
        }
    }
}

/// Native counterpart of a canonical texture format; `None` when `wgpu`
/// has no equivalent.
pub fn wgpu_texture_format(format: TextureFormat) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as W;
    Some(match format {
        TextureFormat::R8Unorm => W::R8Unorm,
        TextureFormat::R8Snorm => W::R8Snorm,
        TextureFormat::R8Uint => W::R8Uint,
        TextureFormat::R8Sint => W::R8Sint,
        TextureFormat::R16Uint => W::R16Uint,
        TextureFormat::R16Sint => W::R16Sint,
        TextureFormat::R16Float => W::R16Float,
        TextureFormat::Rg8Unorm => W::Rg8Unorm,
        TextureFormat::Rg8Snorm => W::Rg8Snorm,
        TextureFormat::Rg8Uint => W::Rg8Uint,
        TextureFormat::Rg8Sint => W::Rg8Sint,
        TextureFormat::R32Uint => W::R32Uint,
        TextureFormat::R32Sint => W::R32Sint,
        TextureFormat::R32Float => W::R32Float,
        TextureFormat::Rg16Uint => W::Rg16Uint,
        TextureFormat::Rg16Sint => W::Rg16Sint,
        TextureFormat::Rg16Float => W::Rg16Float,
        TextureFormat::Rgba8Unorm => W::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => W::Rgba8UnormSrgb,
        TextureFormat::Rgba8Snorm => W::Rgba8Snorm,
        TextureFormat::Rgba8Uint => W::Rgba8Uint,
        TextureFormat::Rgba8Sint => W::Rgba8Sint,
        TextureFormat::Bgra8Unorm => W::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => W::Bgra8UnormSrgb,
        TextureFormat::Rgb10a2Unorm => W::Rgb10a2Unorm,
        TextureFormat::Rg11b10Ufloat => W::Rg11b10Ufloat,
        TextureFormat::Rg32Uint => W::Rg32Uint,
        TextureFormat::Rg32Sint => W::Rg32Sint,
        TextureFormat::Rg32Float => W::Rg32Float,
        TextureFormat::Rgba16Uint => W::Rgba16Uint,
        TextureFormat::Rgba16Sint => W::Rgba16Sint,
        TextureFormat::Rgba16Float => W::Rgba16Float,
        TextureFormat::Rgba32Uint => W::Rgba32Uint,
        TextureFormat::Rgba32Sint => W::Rgba32Sint,
        TextureFormat::Rgba32Float => W::Rgba32Float,
        TextureFormat::Stencil8 => W::Stencil8,
        TextureFormat::Depth16Unorm => W::Depth16Unorm,
        TextureFormat::Depth24Plus => W::Depth24Plus,
        TextureFormat::Depth24PlusStencil8 => W::Depth24PlusStencil8,
        TextureFormat::Depth32Float => W::Depth32Float,
        TextureFormat::Depth32FloatStencil8 => W::Depth32FloatStencil8,
        TextureFormat::Bc1RgbaUnorm => W::Bc1RgbaUnorm,
        TextureFormat::Bc1RgbaUnormSrgb => W::Bc1RgbaUnormSrgb,
        TextureFormat::Bc3RgbaUnorm => W::Bc3RgbaUnorm,
        TextureFormat::Bc3RgbaUnormSrgb => W::Bc3RgbaUnormSrgb,
        TextureFormat::Bc7RgbaUnorm => W::Bc7RgbaUnorm,
        TextureFormat::Bc7RgbaUnormSrgb => W::Bc7RgbaUnormSrgb,
    })
}

/// Like [`wgpu_texture_format`], failing with `unsupported`.
pub fn require_texture_format(format: TextureFormat) -> Result<wgpu::TextureFormat, GfxError> {
    wgpu_texture_format(format)
        .ok_or_else(|| GfxError::unsupported(format!("texture format {format:?} is not available on wgpu")))
}

// --- Flags ---

impl IntoWgpu<wgpu::BufferUsages> for BufferUsages {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        // Bit values follow the WebGPU constants on both sides.
        wgpu::BufferUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsages {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        wgpu::TextureUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStageFlags {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.contains(ShaderStageFlags::VERTEX) {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.contains(ShaderStageFlags::FRAGMENT) {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        if self.contains(ShaderStageFlags::COMPUTE) {
            stages |= wgpu::ShaderStages::COMPUTE;
        }
        stages
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWrites {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        wgpu::ColorWrites::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::MapMode> for MapMode {
    fn into_wgpu(self) -> wgpu::MapMode {
        match self {
            MapMode::Read => wgpu::MapMode::Read,
            MapMode::Write => wgpu::MapMode::Write,
        }
    }
}

// --- Sampler ---

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for MipmapFilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            MipmapFilterMode::Nearest => wgpu::FilterMode::Nearest,
            MipmapFilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

// --- Bindings ---

impl IntoWgpu<wgpu::SamplerBindingType> for SamplerBindingType {
    fn into_wgpu(self) -> wgpu::SamplerBindingType {
        match self {
            SamplerBindingType::Filtering => wgpu::SamplerBindingType::Filtering,
            SamplerBindingType::NonFiltering => wgpu::SamplerBindingType::NonFiltering,
            SamplerBindingType::Comparison => wgpu::SamplerBindingType::Comparison,
        }
    }
}

impl IntoWgpu<wgpu::StorageTextureAccess> for StorageTextureAccess {
    fn into_wgpu(self) -> wgpu::StorageTextureAccess {
        match self {
            StorageTextureAccess::WriteOnly => wgpu::StorageTextureAccess::WriteOnly,
            StorageTextureAccess::ReadOnly => wgpu::StorageTextureAccess::ReadOnly,
            StorageTextureAccess::ReadWrite => wgpu::StorageTextureAccess::ReadWrite,
        }
    }
}

impl IntoWgpu<wgpu::BufferBindingType> for BufferBindingType {
    fn into_wgpu(self) -> wgpu::BufferBindingType {
        match self {
            BufferBindingType::Uniform => wgpu::BufferBindingType::Uniform,
            BufferBindingType::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
        }
    }
}

/// Converts a layout binding; fails only for formats `wgpu` lacks.
pub fn binding_type(ty: BindingType) -> Result<wgpu::BindingType, GfxError> {
    Ok(match ty {
        BindingType::Buffer {
            ty,
            has_dynamic_offset,
            min_binding_size,
        } => wgpu::BindingType::Buffer {
            ty: ty.into_wgpu(),
            has_dynamic_offset,
            min_binding_size: min_binding_size.and_then(std::num::NonZeroU64::new),
        },
        BindingType::Sampler(kind) => wgpu::BindingType::Sampler(kind.into_wgpu()),
        BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled,
        } => wgpu::BindingType::Texture {
            sample_type: sample_type.into_wgpu(),
            view_dimension: view_dimension.into_wgpu(),
            multisampled,
        },
        BindingType::StorageTexture {
            access,
            format,
            view_dimension,
        } => wgpu::BindingType::StorageTexture {
            access: access.into_wgpu(),
            format: require_texture_format(format)?,
            view_dimension: view_dimension.into_wgpu(),
        },
    })
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Uint8x2 => wgpu::VertexFormat::Uint8x2,
            VertexFormat::Uint8x4 => wgpu::VertexFormat::Uint8x4,
            VertexFormat::Sint8x2 => wgpu::VertexFormat::Sint8x2,
            VertexFormat::Sint8x4 => wgpu::VertexFormat::Sint8x4,
            VertexFormat::Unorm8x2 => wgpu::VertexFormat::Unorm8x2,
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
            VertexFormat::Snorm8x2 => wgpu::VertexFormat::Snorm8x2,
            VertexFormat::Snorm8x4 => wgpu::VertexFormat::Snorm8x4,
            VertexFormat::Uint16x2 => wgpu::VertexFormat::Uint16x2,
            VertexFormat::Uint16x4 => wgpu::VertexFormat::Uint16x4,
            VertexFormat::Sint16x2 => wgpu::VertexFormat::Sint16x2,
            VertexFormat::Sint16x4 => wgpu::VertexFormat::Sint16x4,
            VertexFormat::Unorm16x2 => wgpu::VertexFormat::Unorm16x2,
            VertexFormat::Unorm16x4 => wgpu::VertexFormat::Unorm16x4,
            VertexFormat::Snorm16x2 => wgpu::VertexFormat::Snorm16x2,
            VertexFormat::Snorm16x4 => wgpu::VertexFormat::Snorm16x4,
            VertexFormat::Float16x2 => wgpu::VertexFormat::Float16x2,
            VertexFormat::Float16x4 => wgpu::VertexFormat::Float16x4,
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
            VertexFormat::Uint32x2 => wgpu::VertexFormat::Uint32x2,
            VertexFormat::Uint32x3 => wgpu::VertexFormat::Uint32x3,
            VertexFormat::Uint32x4 => wgpu::VertexFormat::Uint32x4,
            VertexFormat::Sint32 => wgpu::VertexFormat::Sint32,
            VertexFormat::Sint32x2 => wgpu::VertexFormat::Sint32x2,
            VertexFormat::Sint32x3 => wgpu::VertexFormat::Sint32x3,
            VertexFormat::Sint32x4 => wgpu::VertexFormat::Sint32x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexStepMode {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexStepMode::Vertex => wgpu::VertexStepMode::Vertex,
            VertexStepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::VertexAttribute> for VertexAttribute {
    fn into_wgpu(self) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: self.format.into_wgpu(),
            offset: self.offset,
            shader_location: self.shader_location,
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::Ccw => wgpu::FrontFace::Ccw,
            FrontFace::Cw => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveState> for PrimitiveState {
    fn into_wgpu(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: self.topology.into_wgpu(),
            strip_index_format: self.strip_index_format.map(IntoWgpu::into_wgpu),
            front_face: self.front_face.into_wgpu(),
            cull_mode: self.cull_mode.into_wgpu(),
            unclipped_depth: self.unclipped_depth,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        }
    }
}

impl IntoWgpu<wgpu::StencilOperation> for StencilOperation {
    fn into_wgpu(self) -> wgpu::StencilOperation {
        match self {
            StencilOperation::Keep => wgpu::StencilOperation::Keep,
            StencilOperation::Zero => wgpu::StencilOperation::Zero,
            StencilOperation::Replace => wgpu::StencilOperation::Replace,
            StencilOperation::Invert => wgpu::StencilOperation::Invert,
            StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
            StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
            StencilOperation::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
            StencilOperation::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
        }
    }
}

impl IntoWgpu<wgpu::StencilFaceState> for StencilFaceState {
    fn into_wgpu(self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.compare.into_wgpu(),
            fail_op: self.fail_op.into_wgpu(),
            depth_fail_op: self.depth_fail_op.into_wgpu(),
            pass_op: self.pass_op.into_wgpu(),
        }
    }
}

/// Converts depth-stencil state; fails for formats `wgpu` lacks.
pub fn depth_stencil_state(state: DepthStencilState) -> Result<wgpu::DepthStencilState, GfxError> {
    Ok(wgpu::DepthStencilState {
        format: require_texture_format(state.format)?,
        depth_write_enabled: state.depth_write_enabled,
        depth_compare: state.depth_compare.into_wgpu(),
        stencil: wgpu::StencilState {
            front: state.stencil.front.into_wgpu(),
            back: state.stencil.back.into_wgpu(),
            read_mask: state.stencil.read_mask,
            write_mask: state.stencil.write_mask,
        },
        bias: wgpu::DepthBiasState {
            constant: state.bias.constant,
            slope_scale: state.bias.slope_scale,
            clamp: state.bias.clamp,
        },
    })
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::Src => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrc => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::Dst => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDst => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
            BlendFactor::SrcAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
            BlendFactor::Constant => wgpu::BlendFactor::Constant,
            BlendFactor::OneMinusConstant => wgpu::BlendFactor::OneMinusConstant,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl IntoWgpu<wgpu::BlendComponent> for BlendComponent {
    fn into_wgpu(self) -> wgpu::BlendComponent {
        wgpu::BlendComponent {
            src_factor: self.src_factor.into_wgpu(),
            dst_factor: self.dst_factor.into_wgpu(),
            operation: self.operation.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendState {
    fn into_wgpu(self) -> wgpu::BlendState {
        wgpu::BlendState {
            color: self.color.into_wgpu(),
            alpha: self.alpha.into_wgpu(),
        }
    }
}

/// Converts a color target; fails for formats `wgpu` lacks.
pub fn color_target_state(target: ColorTargetState) -> Result<wgpu::ColorTargetState, GfxError> {
    Ok(wgpu::ColorTargetState {
        format: require_texture_format(target.format)?,
        blend: target.blend.map(IntoWgpu::into_wgpu),
        write_mask: target.write_mask.into_wgpu(),
    })
}

impl IntoWgpu<wgpu::MultisampleState> for MultisampleState {
    fn into_wgpu(self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.count,
            mask: self.mask,
            alpha_to_coverage_enabled: self.alpha_to_coverage_enabled,
        }
    }
}

// --- Passes ---

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

impl IntoWgpu<wgpu::StoreOp> for StoreOp {
    fn into_wgpu(self) -> wgpu::StoreOp {
        match self {
            StoreOp::Store => wgpu::StoreOp::Store,
            StoreOp::Discard => wgpu::StoreOp::Discard,
        }
    }
}

/// Load/store operations of one attachment aspect.
pub fn operations<V: Copy>(load: LoadOp, clear: V, store: StoreOp) -> wgpu::Operations<V> {
    wgpu::Operations {
        load: match load {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear => wgpu::LoadOp::Clear(clear),
        },
        store: store.into_wgpu(),
    }
}

// --- Adapter information ---

impl IntoWgpu<wgpu::PowerPreference> for PowerPreference {
    fn into_wgpu(self) -> wgpu::PowerPreference {
        match self {
            PowerPreference::None => wgpu::PowerPreference::None,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Backend kind of a native backend.
pub fn backend_kind(backend: wgpu::Backend) -> Option<BackendKind> {
    match backend {
        wgpu::Backend::Vulkan => Some(BackendKind::Vulkan),
        wgpu::Backend::Metal => Some(BackendKind::Metal),
        wgpu::Backend::Dx12 => Some(BackendKind::Dx12),
        wgpu::Backend::Gl => Some(BackendKind::Gl),
        wgpu::Backend::BrowserWebGpu => Some(BackendKind::WebGpu),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Native backend bit for a backend kind; empty for the emulated backend.
pub fn backends_for(kind: BackendKind) -> wgpu::Backends {
    match kind {
        BackendKind::Vulkan => wgpu::Backends::VULKAN,
        BackendKind::Metal => wgpu::Backends::METAL,
        BackendKind::Dx12 => wgpu::Backends::DX12,
        BackendKind::Gl => wgpu::Backends::GL,
        BackendKind::WebGpu => wgpu::Backends::BROWSER_WEBGPU,
        BackendKind::WebGl2 => wgpu::Backends::empty(),
    }
}

/// Converts the native device type.
pub fn device_type(device_type: wgpu::DeviceType) -> DeviceType {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => DeviceType::IntegratedGpu,
        wgpu::DeviceType::DiscreteGpu => DeviceType::DiscreteGpu,
        wgpu::DeviceType::VirtualGpu => DeviceType::VirtualGpu,
        wgpu::DeviceType::Cpu => DeviceType::Cpu,
        _ => DeviceType::Other,
    }
}

/// Native limits mapped onto the capability model.
pub fn limits(native: &wgpu::Limits) -> Limits {
    Limits {
        max_texture_dimension_1d: native.max_texture_dimension_1d,
        max_texture_dimension_2d: native.max_texture_dimension_2d,
        max_texture_dimension_3d: native.max_texture_dimension_3d,
        max_texture_array_layers: native.max_texture_array_layers,
        max_bind_groups: native.max_bind_groups,
        max_bindings_per_bind_group: native.max_bindings_per_bind_group,
        max_dynamic_uniform_buffers_per_pipeline_layout: native.max_dynamic_uniform_buffers_per_pipeline_layout,
        max_sampled_textures_per_shader_stage: native.max_sampled_textures_per_shader_stage,
        max_samplers_per_shader_stage: native.max_samplers_per_shader_stage,
        max_storage_buffers_per_shader_stage: native.max_storage_buffers_per_shader_stage,
        max_uniform_buffers_per_shader_stage: native.max_uniform_buffers_per_shader_stage,
        max_uniform_buffer_binding_size: u64::from(native.max_uniform_buffer_binding_size),
        max_storage_buffer_binding_size: u64::from(native.max_storage_buffer_binding_size),
        max_buffer_size: native.max_buffer_size,
        max_vertex_buffers: native.max_vertex_buffers,
        max_vertex_attributes: native.max_vertex_attributes,
        max_vertex_buffer_array_stride: native.max_vertex_buffer_array_stride,
        max_color_attachments: native.max_color_attachments,
        min_uniform_buffer_offset_alignment: native.min_uniform_buffer_offset_alignment,
        max_compute_workgroup_storage_size: native.max_compute_workgroup_storage_size,
        max_compute_invocations_per_workgroup: native.max_compute_invocations_per_workgroup,
        max_compute_workgroup_size_x: native.max_compute_workgroup_size_x,
        max_compute_workgroup_size_y: native.max_compute_workgroup_size_y,
        max_compute_workgroup_size_z: native.max_compute_workgroup_size_z,
        max_compute_workgroups_per_dimension: native.max_compute_workgroups_per_dimension,
    }
}

/// Capability limits back to native limits, for device requests.
pub fn native_limits(limits: &Limits, base: wgpu::Limits) -> wgpu::Limits {
    let clamp_u32 = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
    wgpu::Limits {
        max_texture_dimension_1d: limits.max_texture_dimension_1d,
        max_texture_dimension_2d: limits.max_texture_dimension_2d,
        max_texture_dimension_3d: limits.max_texture_dimension_3d,
        max_texture_array_layers: limits.max_texture_array_layers,
        max_bind_groups: limits.max_bind_groups,
        max_bindings_per_bind_group: limits.max_bindings_per_bind_group,
        max_dynamic_uniform_buffers_per_pipeline_layout: limits.max_dynamic_uniform_buffers_per_pipeline_layout,
        max_sampled_textures_per_shader_stage: limits.max_sampled_textures_per_shader_stage,
        max_samplers_per_shader_stage: limits.max_samplers_per_shader_stage,
        max_storage_buffers_per_shader_stage: limits.max_storage_buffers_per_shader_stage,
        max_uniform_buffers_per_shader_stage: limits.max_uniform_buffers_per_shader_stage,
        max_uniform_buffer_binding_size: clamp_u32(limits.max_uniform_buffer_binding_size),
        max_storage_buffer_binding_size: clamp_u32(limits.max_storage_buffer_binding_size),
        max_buffer_size: limits.max_buffer_size,
        max_vertex_buffers: limits.max_vertex_buffers,
        max_vertex_attributes: limits.max_vertex_attributes,
        max_vertex_buffer_array_stride: limits.max_vertex_buffer_array_stride,
        max_color_attachments: limits.max_color_attachments,
        min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
        max_compute_workgroup_storage_size: limits.max_compute_workgroup_storage_size,
        max_compute_invocations_per_workgroup: limits.max_compute_invocations_per_workgroup,
        max_compute_workgroup_size_x: limits.max_compute_workgroup_size_x,
        max_compute_workgroup_size_y: limits.max_compute_workgroup_size_y,
        max_compute_workgroup_size_z: limits.max_compute_workgroup_size_z,
        max_compute_workgroups_per_dimension: limits.max_compute_workgroups_per_dimension,
        ..base
    }
}

/// Feature tags paired with their native flags.
const FEATURE_TABLE: &[(&str, wgpu::Features)] = &[
    (features::TIMESTAMP_QUERY, wgpu::Features::TIMESTAMP_QUERY),
    (features::TEXTURE_COMPRESSION_BC, wgpu::Features::TEXTURE_COMPRESSION_BC),
    (features::DEPTH32FLOAT_STENCIL8, wgpu::Features::DEPTH32FLOAT_STENCIL8),
    (features::DEPTH_CLIP_CONTROL, wgpu::Features::DEPTH_CLIP_CONTROL),
    (features::INDIRECT_FIRST_INSTANCE, wgpu::Features::INDIRECT_FIRST_INSTANCE),
    (features::SHADER_F16, wgpu::Features::SHADER_F16),
    (features::FLOAT32_FILTERABLE, wgpu::Features::FLOAT32_FILTERABLE),
    (features::RG11B10UFLOAT_RENDERABLE, wgpu::Features::RG11B10UFLOAT_RENDERABLE),
];

/// Feature tags for a native feature set and downlevel flags.
///
/// `compute`, `storage`, `multisample` and `base-vertex` are core on every
/// explicit adapter that is WebGPU compliant; on downlevel adapters they
/// follow the reported downlevel flags.
pub fn feature_tags(native: wgpu::Features, downlevel: &wgpu::DownlevelCapabilities) -> Vec<String> {
    let mut tags: Vec<String> = FEATURE_TABLE
        .iter()
        .filter(|(_, flag)| native.contains(*flag))
        .map(|(tag, _)| (*tag).to_owned())
        .collect();
    let flags = downlevel.flags;
    if flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        tags.push(features::COMPUTE.to_owned());
        tags.push(features::STORAGE.to_owned());
    }
    if flags.contains(wgpu::DownlevelFlags::BASE_VERTEX) {
        tags.push(features::BASE_VERTEX.to_owned());
    }
    if flags.contains(wgpu::DownlevelFlags::MULTISAMPLED_SHADING) || downlevel.is_webgpu_compliant() {
        tags.push(features::MULTISAMPLE.to_owned());
    }
    tags
}

/// Native flags for requested feature tags; tags without a native flag map
/// to nothing.
pub fn native_features(tags: &[String]) -> wgpu::Features {
    FEATURE_TABLE
        .iter()
        .filter(|(tag, _)| tags.iter().any(|t| t == tag))
        .fold(wgpu::Features::empty(), |acc, (_, flag)| acc | *flag)
}

// --- Errors ---

impl IntoWgpu<wgpu::ErrorFilter> for ErrorFilter {
    fn into_wgpu(self) -> wgpu::ErrorFilter {
        match self {
            ErrorFilter::Validation => wgpu::ErrorFilter::Validation,
            ErrorFilter::OutOfMemory => wgpu::ErrorFilter::OutOfMemory,
            ErrorFilter::Internal => wgpu::ErrorFilter::Internal,
        }
    }
}

/// Converts a native error raised by `wgpu`.
pub fn from_wgpu_error(error: &wgpu::Error) -> GfxError {
    match error {
        wgpu::Error::OutOfMemory { .. } => GfxError::OutOfMemory(error.to_string()),
        wgpu::Error::Validation { description, .. } => GfxError::validation(description.clone()),
        #[allow(unreachable_patterns)]
        _ => GfxError::internal(error.to_string()),
    }
}

/// Converts a native compilation message.
pub fn compilation_message(message: &wgpu::CompilationMessage, stage: Option<ShaderStage>) -> CompilationMessage {
    CompilationMessage {
        message: message.message.clone(),
        severity: match message.message_type {
            wgpu::CompilationMessageType::Error => CompilationMessageType::Error,
            wgpu::CompilationMessageType::Warning => CompilationMessageType::Warning,
            wgpu::CompilationMessageType::Info => CompilationMessageType::Info,
        },
        stage,
        line: message.location.map(|l| l.line_number),
        column: message.location.map(|l| l.line_position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn texture_format_table_is_injective() {
        let mapped: HashSet<_> = TextureFormat::ALL
            .iter()
            .filter_map(|&f| wgpu_texture_format(f))
            .collect();
        assert_eq!(mapped.len(), TextureFormat::ALL.len());
        assert_eq!(
            wgpu_texture_format(TextureFormat::Depth24PlusStencil8),
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        );
    }

    #[test]
    fn usage_bits_line_up() {
        let usage = BufferUsages::VERTEX.with(BufferUsages::COPY_DST).with(BufferUsages::MAP_READ);
        assert_eq!(
            usage.into_wgpu(),
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ
        );
        let texture = TextureUsages::TEXTURE_BINDING.with(TextureUsages::RENDER_ATTACHMENT);
        assert_eq!(
            texture.into_wgpu(),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT
        );
        assert_eq!(ColorWrites::COLOR.into_wgpu(), wgpu::ColorWrites::COLOR);
        assert_eq!(ShaderStageFlags::VERTEX_FRAGMENT.into_wgpu(), wgpu::ShaderStages::VERTEX_FRAGMENT);
    }

    #[test]
    fn cull_none_disables_culling() {
        let cull: Option<wgpu::Face> = CullMode::None.into_wgpu();
        assert_eq!(cull, None);
        let cull: Option<wgpu::Face> = CullMode::Back.into_wgpu();
        assert_eq!(cull, Some(wgpu::Face::Back));
    }

    #[test]
    fn feature_tags_round_trip_through_native_flags() {
        let tags = vec![features::TIMESTAMP_QUERY.to_owned(), features::COMPUTE.to_owned()];
        assert_eq!(native_features(&tags), wgpu::Features::TIMESTAMP_QUERY);
    }

    #[test]
    fn limits_survive_the_native_round_trip() {
        let native = wgpu::Limits::downlevel_webgl2_defaults();
        let ours = limits(&native);
        assert_eq!(ours.max_storage_buffer_binding_size, 0);
        let back = native_limits(&ours, wgpu::Limits::default());
        assert_eq!(back.max_texture_dimension_2d, native.max_texture_dimension_2d);
        assert_eq!(back.max_uniform_buffer_binding_size, native.max_uniform_buffer_binding_size);
        assert_eq!(back.max_compute_workgroups_per_dimension, 0);
    }
}
