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

//! Texture and texture-view descriptors.

use crate::easel_bitflags;
use crate::gfx::api::util::{TextureAspect, TextureDimension, TextureFormat, TextureViewDimension};

easel_bitflags! {
    /// Allowed usages of a texture.
    ///
    /// The bit values match the WebGPU `GPUTextureUsage` constants.
    pub struct TextureUsages: u32 {
        /// Source of copies.
        const COPY_SRC = 0x01;
        /// Destination of copies and queue writes.
        const COPY_DST = 0x02;
        /// Sampled from shaders.
        const TEXTURE_BINDING = 0x04;
        /// Bound as a storage texture.
        const STORAGE_BINDING = 0x08;
        /// Color or depth-stencil attachment.
        const RENDER_ATTACHMENT = 0x10;
    }
}

/// Width, height and depth (or array layers) of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, layer count otherwise.
    pub depth_or_array_layers: u32,
}

impl Default for Extent3D {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        }
    }
}

impl Extent3D {
    /// A single-layer 2D extent.
    pub const fn d2(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    /// Extent of mip `level` for the given dimension; never below 1.
    pub fn mip_level_size(&self, level: u32, dimension: TextureDimension) -> Extent3D {
        let shrink = |v: u32| (v >> level).max(1);
        Extent3D {
            width: shrink(self.width),
            height: match dimension {
                TextureDimension::D1 => 1,
                _ => shrink(self.height),
            },
            depth_or_array_layers: match dimension {
                TextureDimension::D3 => shrink(self.depth_or_array_layers),
                _ => self.depth_or_array_layers,
            },
        }
    }

    /// Number of mips in a full chain for this extent.
    pub fn max_mips(&self, dimension: TextureDimension) -> u32 {
        let largest = match dimension {
            TextureDimension::D1 => self.width,
            TextureDimension::D2 => self.width.max(self.height),
            TextureDimension::D3 => self.width.max(self.height).max(self.depth_or_array_layers),
        };
        32 - largest.max(1).leading_zeros()
    }
}

/// Texel origin of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// X coordinate.
    pub x: u32,
    /// Y coordinate.
    pub y: u32,
    /// Z coordinate or array layer.
    pub z: u32,
}

/// Describes a texture to create.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Size of mip 0.
    pub size: Extent3D,
    /// Number of mip levels, at least 1.
    pub mip_level_count: u32,
    /// Samples per texel, 1 or 4.
    pub sample_count: u32,
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsages,
    /// Additional formats views may reinterpret the texture as.
    pub view_formats: Vec<TextureFormat>,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3D::default(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::EMPTY,
            view_formats: Vec::new(),
        }
    }
}

/// Describes a view over a texture. Unset fields inherit from the texture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureViewDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Reinterpretation format; must be the texture format or one of its view formats.
    pub format: Option<TextureFormat>,
    /// View dimension.
    pub dimension: Option<TextureViewDimension>,
    /// Aspect to expose.
    pub aspect: TextureAspect,
    /// First visible mip.
    pub base_mip_level: u32,
    /// Number of visible mips; `None` means the rest of the chain.
    pub mip_level_count: Option<u32>,
    /// First visible layer.
    pub base_array_layer: u32,
    /// Number of visible layers; `None` means the remaining layers.
    pub array_layer_count: Option<u32>,
}

/// A view descriptor with every field resolved against its texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTextureView {
    /// Effective format.
    pub format: TextureFormat,
    /// Effective dimension.
    pub dimension: TextureViewDimension,
    /// Aspect.
    pub aspect: TextureAspect,
    /// First mip.
    pub base_mip_level: u32,
    /// Mip count.
    pub mip_level_count: u32,
    /// First layer.
    pub base_array_layer: u32,
    /// Layer count.
    pub array_layer_count: u32,
}

/// Destination of a texture upload or copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelCopyTextureInfo {
    /// Texture written.
    pub texture: crate::gfx::handle::TextureId,
    /// Mip level written.
    pub mip_level: u32,
    /// Texel origin.
    pub origin: Origin3D,
    /// Aspect written.
    pub aspect: TextureAspect,
}

/// Layout of linear texel data in a CPU slice or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexelCopyBufferLayout {
    /// Offset of the first texel.
    pub offset: u64,
    /// Stride between rows; required when copying more than one row.
    pub bytes_per_row: Option<u32>,
    /// Rows per image; required when copying more than one image.
    pub rows_per_image: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(Extent3D::d2(256, 64).max_mips(TextureDimension::D2), 9);
        assert_eq!(Extent3D::d2(1, 1).max_mips(TextureDimension::D2), 1);
        let mip = Extent3D::d2(256, 64).mip_level_size(7, TextureDimension::D2);
        assert_eq!((mip.width, mip.height), (2, 1));
    }
}
