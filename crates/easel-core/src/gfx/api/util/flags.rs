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

//! Bit sets shared across the API.

use super::enums::ShaderStage;
use crate::easel_bitflags;

easel_bitflags! {
    /// Stages that can see a binding.
    pub struct ShaderStageFlags: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
        /// Vertex and fragment stages.
        const VERTEX_FRAGMENT = (1 << 0) | (1 << 1);
    }
}

impl ShaderStageFlags {
    /// Flag for a single stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Compute => Self::COMPUTE,
        }
    }
}

easel_bitflags! {
    /// Color channels written by a color target.
    pub struct ColorWrites: u32 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// Red, green and blue.
        const COLOR = 0b0111;
    }
}

easel_bitflags! {
    /// Aspects present in a texture format.
    pub struct FormatAspects: u8 {
        /// Color data.
        const COLOR = 1 << 0;
        /// Depth data.
        const DEPTH = 1 << 1;
        /// Stencil data.
        const STENCIL = 1 << 2;
    }
}
