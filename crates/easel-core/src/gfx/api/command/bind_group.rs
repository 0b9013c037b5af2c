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

//! Bind group layouts and bind groups.

use crate::gfx::api::util::{ShaderStageFlags, TextureFormat, TextureSampleType, TextureViewDimension};
use crate::gfx::handle::{BindGroupLayoutId, BufferId, SamplerId, TextureViewId};

/// How a shader accesses a buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferBindingType {
    /// Uniform block.
    Uniform,
    /// Storage buffer.
    Storage {
        /// Shader cannot write.
        read_only: bool,
    },
}

/// Kind of sampler a binding expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerBindingType {
    /// May filter linearly.
    Filtering,
    /// Nearest only.
    NonFiltering,
    /// Depth comparison.
    Comparison,
}

/// Storage texture access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StorageTextureAccess {
    WriteOnly,
    ReadOnly,
    ReadWrite,
}

/// Resource expected by a layout slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A buffer range.
    Buffer {
        /// Uniform or storage.
        ty: BufferBindingType,
        /// Offset supplied at `set_bind_group` time.
        has_dynamic_offset: bool,
        /// Smallest allowed bound size.
        min_binding_size: Option<u64>,
    },
    /// A sampler.
    Sampler(SamplerBindingType),
    /// A sampled texture view.
    Texture {
        /// Sample type.
        sample_type: TextureSampleType,
        /// View dimension.
        view_dimension: TextureViewDimension,
        /// Multisampled texture.
        multisampled: bool,
    },
    /// A storage texture view.
    StorageTexture {
        /// Access.
        access: StorageTextureAccess,
        /// Texel format.
        format: TextureFormat,
        /// View dimension.
        view_dimension: TextureViewDimension,
    },
}

/// Resource category, used to check entries against their layout slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    /// Buffer range.
    Buffer,
    /// Sampler.
    Sampler,
    /// Sampled texture.
    Texture,
    /// Storage texture.
    StorageTexture,
}

impl BindingType {
    /// Category the slot accepts.
    pub fn category(&self) -> ResourceCategory {
        match self {
            BindingType::Buffer { .. } => ResourceCategory::Buffer,
            BindingType::Sampler(_) => ResourceCategory::Sampler,
            BindingType::Texture { .. } => ResourceCategory::Texture,
            BindingType::StorageTexture { .. } => ResourceCategory::StorageTexture,
        }
    }
}

/// One slot of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    /// Binding number within the group.
    pub binding: u32,
    /// Stages that see the binding.
    pub visibility: ShaderStageFlags,
    /// Expected resource.
    pub ty: BindingType,
}

/// Describes a bind group layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindGroupLayoutDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Slots, unique by binding number.
    pub entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutDescriptor {
    /// Slot with binding number `binding`.
    pub fn entry(&self, binding: u32) -> Option<&BindGroupLayoutEntry> {
        self.entries.iter().find(|e| e.binding == binding)
    }
}

/// A buffer range bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    /// Buffer.
    pub buffer: BufferId,
    /// Start of the range.
    pub offset: u64,
    /// Length; `None` binds to the end of the buffer.
    pub size: Option<u64>,
}

/// Resource bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingResource {
    /// Buffer range.
    Buffer(BufferBinding),
    /// Sampler.
    Sampler(SamplerId),
    /// Texture view, for sampled or storage texture slots.
    TextureView(TextureViewId),
}

impl BindingResource {
    /// `true` when this resource may fill a slot of `category`.
    pub fn fits(&self, category: ResourceCategory) -> bool {
        matches!(
            (self, category),
            (BindingResource::Buffer(_), ResourceCategory::Buffer)
                | (BindingResource::Sampler(_), ResourceCategory::Sampler)
                | (BindingResource::TextureView(_), ResourceCategory::Texture)
                | (BindingResource::TextureView(_), ResourceCategory::StorageTexture)
        )
    }

    /// Short name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            BindingResource::Buffer(_) => "buffer",
            BindingResource::Sampler(_) => "sampler",
            BindingResource::TextureView(_) => "texture view",
        }
    }
}

/// One resolved slot of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupEntry {
    /// Binding number; must exist in the layout.
    pub binding: u32,
    /// Bound resource.
    pub resource: BindingResource,
}

/// Describes a bind group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// One entry per layout slot.
    pub entries: Vec<BindGroupEntry>,
}
