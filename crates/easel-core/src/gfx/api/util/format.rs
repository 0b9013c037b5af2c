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

//! Backend-agnostic format tables.
//!
//! These are the single source of truth for byte sizes and format traits.
//! Backends own their own canonical-to-native tables and consult these when
//! validating strides, copies and attachments.

use super::enums::{TextureFormat, TextureSampleType};
use super::flags::FormatAspects;

/// Scalar type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexComponentType {
    /// `u8`
    Uint8,
    /// `i8`
    Sint8,
    /// `u16`
    Uint16,
    /// `i16`
    Sint16,
    /// IEEE half float.
    Float16,
    /// `f32`
    Float32,
    /// `u32`
    Uint32,
    /// `i32`
    Sint32,
}

impl VertexComponentType {
    /// Size of one component in bytes.
    pub const fn byte_size(self) -> u32 {
        match self {
            VertexComponentType::Uint8 | VertexComponentType::Sint8 => 1,
            VertexComponentType::Uint16
            | VertexComponentType::Sint16
            | VertexComponentType::Float16 => 2,
            VertexComponentType::Float32
            | VertexComponentType::Uint32
            | VertexComponentType::Sint32 => 4,
        }
    }

    /// `true` for types the shader reads as integers when not normalized.
    pub const fn is_integer(self) -> bool {
        !matches!(
            self,
            VertexComponentType::Float16 | VertexComponentType::Float32
        )
    }
}

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum VertexFormat {
    Uint8x2,
    Uint8x4,
    Sint8x2,
    Sint8x4,
    Unorm8x2,
    Unorm8x4,
    Snorm8x2,
    Snorm8x4,
    Uint16x2,
    Uint16x4,
    Sint16x2,
    Sint16x4,
    Unorm16x2,
    Unorm16x4,
    Snorm16x2,
    Snorm16x4,
    Float16x2,
    Float16x4,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

/// Layout facts about a [`VertexFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormatInfo {
    /// Number of components (1 to 4).
    pub components: u32,
    /// Total size in bytes.
    pub byte_size: u32,
    /// Scalar type of each component.
    pub component_type: VertexComponentType,
    /// Integer data mapped to `[0, 1]` or `[-1, 1]`.
    pub normalized: bool,
}

impl VertexFormat {
    /// Every vertex format, in declaration order.
    pub const ALL: &'static [VertexFormat] = &[
        VertexFormat::Uint8x2,
        VertexFormat::Uint8x4,
        VertexFormat::Sint8x2,
        VertexFormat::Sint8x4,
        VertexFormat::Unorm8x2,
        VertexFormat::Unorm8x4,
        VertexFormat::Snorm8x2,
        VertexFormat::Snorm8x4,
        VertexFormat::Uint16x2,
        VertexFormat::Uint16x4,
        VertexFormat::Sint16x2,
        VertexFormat::Sint16x4,
        VertexFormat::Unorm16x2,
        VertexFormat::Unorm16x4,
        VertexFormat::Snorm16x2,
        VertexFormat::Snorm16x4,
        VertexFormat::Float16x2,
        VertexFormat::Float16x4,
        VertexFormat::Float32,
        VertexFormat::Float32x2,
        VertexFormat::Float32x3,
        VertexFormat::Float32x4,
        VertexFormat::Uint32,
        VertexFormat::Uint32x2,
        VertexFormat::Uint32x3,
        VertexFormat::Uint32x4,
        VertexFormat::Sint32,
        VertexFormat::Sint32x2,
        VertexFormat::Sint32x3,
        VertexFormat::Sint32x4,
    ];

    /// Table lookup.
    pub const fn info(self) -> VertexFormatInfo {
        use VertexComponentType as C;
        let (components, component_type, normalized) = match self {
            VertexFormat::Uint8x2 => (2, C::Uint8, false),
            VertexFormat::Uint8x4 => (4, C::Uint8, false),
            VertexFormat::Sint8x2 => (2, C::Sint8, false),
            VertexFormat::Sint8x4 => (4, C::Sint8, false),
            VertexFormat::Unorm8x2 => (2, C::Uint8, true),
            VertexFormat::Unorm8x4 => (4, C::Uint8, true),
            VertexFormat::Snorm8x2 => (2, C::Sint8, true),
            VertexFormat::Snorm8x4 => (4, C::Sint8, true),
            VertexFormat::Uint16x2 => (2, C::Uint16, false),
            VertexFormat::Uint16x4 => (4, C::Uint16, false),
            VertexFormat::Sint16x2 => (2, C::Sint16, false),
            VertexFormat::Sint16x4 => (4, C::Sint16, false),
            VertexFormat::Unorm16x2 => (2, C::Uint16, true),
            VertexFormat::Unorm16x4 => (4, C::Uint16, true),
            VertexFormat::Snorm16x2 => (2, C::Sint16, true),
            VertexFormat::Snorm16x4 => (4, C::Sint16, true),
            VertexFormat::Float16x2 => (2, C::Float16, false),
            VertexFormat::Float16x4 => (4, C::Float16, false),
            VertexFormat::Float32 => (1, C::Float32, false),
            VertexFormat::Float32x2 => (2, C::Float32, false),
            VertexFormat::Float32x3 => (3, C::Float32, false),
            VertexFormat::Float32x4 => (4, C::Float32, false),
            VertexFormat::Uint32 => (1, C::Uint32, false),
            VertexFormat::Uint32x2 => (2, C::Uint32, false),
            VertexFormat::Uint32x3 => (3, C::Uint32, false),
            VertexFormat::Uint32x4 => (4, C::Uint32, false),
            VertexFormat::Sint32 => (1, C::Sint32, false),
            VertexFormat::Sint32x2 => (2, C::Sint32, false),
            VertexFormat::Sint32x3 => (3, C::Sint32, false),
            VertexFormat::Sint32x4 => (4, C::Sint32, false),
        };
        VertexFormatInfo {
            components,
            byte_size: components * component_type.byte_size(),
            component_type,
            normalized,
        }
    }

    /// Size in bytes.
    pub const fn byte_size(self) -> u32 {
        self.info().byte_size
    }
}

/// Traits of a [`TextureFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormatInfo {
    /// Bytes per texel, or per block for compressed formats.
    pub block_size: u32,
    /// Block width and height in texels (1x1 when uncompressed).
    pub block_dimensions: (u32, u32),
    /// Aspects carried by the format.
    pub aspects: FormatAspects,
    /// How shaders sample it.
    pub sample_type: TextureSampleType,
    /// Usable as a render attachment.
    pub renderable: bool,
    /// Uses sRGB encoding.
    pub srgb: bool,
}

impl TextureFormatInfo {
    /// `true` when linear filtering is allowed.
    pub fn filterable(&self) -> bool {
        matches!(self.sample_type, TextureSampleType::Float { filterable: true })
    }

    /// `true` for block-compressed formats.
    pub fn compressed(&self) -> bool {
        self.block_dimensions != (1, 1)
    }

    /// Bytes per row for `width` texels.
    pub fn bytes_per_row(&self, width: u32) -> u32 {
        width.div_ceil(self.block_dimensions.0) * self.block_size
    }
}

impl TextureFormat {
    /// Table lookup.
    pub fn info(self) -> TextureFormatInfo {
        use TextureFormat as F;
        use TextureSampleType as S;
        const FLOAT: S = S::Float { filterable: true };
        const UNFILTERABLE: S = S::Float { filterable: false };

        let color = |block_size, sample_type, renderable| TextureFormatInfo {
            block_size,
            block_dimensions: (1, 1),
            aspects: FormatAspects::COLOR,
            sample_type,
            renderable,
            srgb: false,
        };
        let depth = |block_size, aspects| TextureFormatInfo {
            block_size,
            block_dimensions: (1, 1),
            aspects,
            sample_type: if aspects == FormatAspects::STENCIL {
                S::Uint
            } else {
                S::Depth
            },
            renderable: true,
            srgb: false,
        };
        let bc = |block_size| TextureFormatInfo {
            block_size,
            block_dimensions: (4, 4),
            aspects: FormatAspects::COLOR,
            sample_type: FLOAT,
            renderable: false,
            srgb: false,
        };
        let srgb = |info: TextureFormatInfo| TextureFormatInfo { srgb: true, ..info };
        let d = FormatAspects::DEPTH;
        let ds = FormatAspects::DEPTH | FormatAspects::STENCIL;

        match self {
            F::R8Unorm => color(1, FLOAT, true),
            F::R8Snorm => color(1, FLOAT, false),
            F::R8Uint => color(1, S::Uint, true),
            F::R8Sint => color(1, S::Sint, true),
            F::R16Uint => color(2, S::Uint, true),
            F::R16Sint => color(2, S::Sint, true),
            F::R16Float => color(2, FLOAT, true),
            F::Rg8Unorm => color(2, FLOAT, true),
            F::Rg8Snorm => color(2, FLOAT, false),
            F::Rg8Uint => color(2, S::Uint, true),
            F::Rg8Sint => color(2, S::Sint, true),
            F::R32Uint => color(4, S::Uint, true),
            F::R32Sint => color(4, S::Sint, true),
            F::R32Float => color(4, UNFILTERABLE, true),
            F::Rg16Uint => color(4, S::Uint, true),
            F::Rg16Sint => color(4, S::Sint, true),
            F::Rg16Float => color(4, FLOAT, true),
            F::Rgba8Unorm => color(4, FLOAT, true),
            F::Rgba8UnormSrgb => srgb(color(4, FLOAT, true)),
            F::Rgba8Snorm => color(4, FLOAT, false),
            F::Rgba8Uint => color(4, S::Uint, true),
            F::Rgba8Sint => color(4, S::Sint, true),
            F::Bgra8Unorm => color(4, FLOAT, true),
            F::Bgra8UnormSrgb => srgb(color(4, FLOAT, true)),
            F::Rgb10a2Unorm => color(4, FLOAT, true),
            F::Rg11b10Ufloat => color(4, FLOAT, false),
            F::Rg32Uint => color(8, S::Uint, true),
            F::Rg32Sint => color(8, S::Sint, true),
            F::Rg32Float => color(8, UNFILTERABLE, true),
            F::Rgba16Uint => color(8, S::Uint, true),
            F::Rgba16Sint => color(8, S::Sint, true),
            F::Rgba16Float => color(8, FLOAT, true),
            F::Rgba32Uint => color(16, S::Uint, true),
            F::Rgba32Sint => color(16, S::Sint, true),
            F::Rgba32Float => color(16, UNFILTERABLE, true),
            F::Stencil8 => depth(1, FormatAspects::STENCIL),
            F::Depth16Unorm => depth(2, d),
            F::Depth24Plus => depth(4, d),
            F::Depth24PlusStencil8 => depth(4, ds),
            F::Depth32Float => depth(4, d),
            F::Depth32FloatStencil8 => depth(8, ds),
            F::Bc1RgbaUnorm => bc(8),
            F::Bc1RgbaUnormSrgb => srgb(bc(8)),
            F::Bc3RgbaUnorm => bc(16),
            F::Bc3RgbaUnormSrgb => srgb(bc(16)),
            F::Bc7RgbaUnorm => bc(16),
            F::Bc7RgbaUnormSrgb => srgb(bc(16)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_sizes_follow_component_counts() {
        assert_eq!(VertexFormat::Float32x3.byte_size(), 12);
        assert_eq!(VertexFormat::Unorm8x4.byte_size(), 4);
        assert_eq!(VertexFormat::Float16x2.byte_size(), 4);
        assert!(VertexFormat::Snorm16x2.info().normalized);
        for format in VertexFormat::ALL {
            let info = format.info();
            assert!((1..=4).contains(&info.components));
            assert!(info.byte_size % 4 == 0 || info.byte_size == 2, "{format:?}");
        }
    }

    #[test]
    fn every_texture_format_has_consistent_traits() {
        for format in TextureFormat::ALL {
            let info = format.info();
            assert!(info.block_size > 0, "{format:?}");
            if format.is_depth_stencil() {
                assert!(!info.aspects.contains(FormatAspects::COLOR));
                assert!(info.renderable);
            }
            if info.compressed() {
                assert!(!info.renderable);
            }
        }
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Rgba8UnormSrgb.info().srgb);
    }

    #[test]
    fn bytes_per_row_accounts_for_blocks() {
        assert_eq!(TextureFormat::Rgba8Unorm.info().bytes_per_row(3), 12);
        assert_eq!(TextureFormat::Bc1RgbaUnorm.info().bytes_per_row(6), 16);
    }
}
