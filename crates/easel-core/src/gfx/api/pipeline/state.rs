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

//! Pipeline state blocks.

use super::enums::*;
use crate::gfx::api::util::{ColorWrites, IndexFormat, TextureFormat, VertexFormat};

/// One attribute read from a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Data format.
    pub format: VertexFormat,
    /// Byte offset inside one element.
    pub offset: u64,
    /// Shader input location.
    pub shader_location: u32,
}

/// Memory layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferLayout {
    /// Bytes between consecutive elements.
    pub array_stride: u64,
    /// Per-vertex or per-instance.
    pub step_mode: VertexStepMode,
    /// Attributes read from each element.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexBufferLayout {
    /// Byte just past the furthest attribute.
    pub fn attributes_end(&self) -> u64 {
        self.attributes
            .iter()
            .map(|a| a.offset + u64::from(a.format.byte_size()))
            .max()
            .unwrap_or(0)
    }
}

/// Primitive assembly and rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveState {
    /// Topology.
    pub topology: PrimitiveTopology,
    /// Index format required for strip topologies with primitive restart.
    pub strip_index_format: Option<IndexFormat>,
    /// Front-face winding.
    pub front_face: FrontFace,
    /// Culling.
    pub cull_mode: CullMode,
    /// Disable depth clipping.
    pub unclipped_depth: bool,
}

/// Stencil state for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// Comparison against the reference.
    pub compare: CompareFunction,
    /// Op when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Op when stencil passes and depth fails.
    pub depth_fail_op: StencilOperation,
    /// Op when both pass.
    pub pass_op: StencilOperation,
}

impl StencilFaceState {
    /// Always passes and never writes.
    pub const IGNORE: Self = Self {
        compare: CompareFunction::Always,
        fail_op: StencilOperation::Keep,
        depth_fail_op: StencilOperation::Keep,
        pass_op: StencilOperation::Keep,
    };
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self::IGNORE
    }
}

/// Stencil test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// Front faces.
    pub front: StencilFaceState,
    /// Back faces.
    pub back: StencilFaceState,
    /// Bits read.
    pub read_mask: u32,
    /// Bits written.
    pub write_mask: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            front: StencilFaceState::IGNORE,
            back: StencilFaceState::IGNORE,
            read_mask: 0xFF,
            write_mask: 0xFF,
        }
    }
}

impl StencilState {
    /// `true` when the stencil test can affect anything.
    pub fn is_enabled(&self) -> bool {
        (self.front != StencilFaceState::IGNORE || self.back != StencilFaceState::IGNORE)
            && (self.read_mask != 0 || self.write_mask != 0)
    }
}

/// Polygon depth offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBiasState {
    /// Constant bias.
    pub constant: i32,
    /// Slope-scaled bias.
    pub slope_scale: f32,
    /// Maximum bias.
    pub clamp: f32,
}

impl DepthBiasState {
    /// `true` when any bias is applied.
    pub fn is_enabled(&self) -> bool {
        self.constant != 0 || self.slope_scale != 0.0
    }
}

/// Depth and stencil configuration of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    /// Attachment format.
    pub format: TextureFormat,
    /// Write depth.
    pub depth_write_enabled: bool,
    /// Depth comparison.
    pub depth_compare: CompareFunction,
    /// Stencil test.
    pub stencil: StencilState,
    /// Depth bias.
    pub bias: DepthBiasState,
}

/// One blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Source factor.
    pub src_factor: BlendFactor,
    /// Destination factor.
    pub dst_factor: BlendFactor,
    /// Operator.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// Source replaces destination.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };
    /// Standard alpha-over.
    pub const OVER: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
}

/// Color and alpha blend equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Color channels.
    pub color: BlendComponent,
    /// Alpha channel.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// Premultiplied alpha blending.
    pub const PREMULTIPLIED_ALPHA_BLENDING: Self = Self {
        color: BlendComponent::OVER,
        alpha: BlendComponent::OVER,
    };
    /// Straight alpha blending.
    pub const ALPHA_BLENDING: Self = Self {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent::OVER,
    };
}

/// Output configuration of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// Attachment format.
    pub format: TextureFormat,
    /// Blending; `None` disables it.
    pub blend: Option<BlendState>,
    /// Channels written.
    pub write_mask: ColorWrites,
}

impl ColorTargetState {
    /// Unblended target writing every channel.
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }
    }
}

/// Multisampling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleState {
    /// Samples per pixel.
    pub count: u32,
    /// Sample mask.
    pub mask: u64,
    /// Derive coverage from fragment alpha.
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}
