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

//! Render and compute pass descriptors.

use crate::gfx::handle::TextureViewId;
use bytemuck::{Pod, Zeroable};

/// RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Color {
    /// All zero.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Builds a color.
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// What happens to an attachment when the pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// Keep existing contents.
    #[default]
    Load,
    /// Clear to the attachment's clear value.
    Clear,
}

/// What happens to an attachment when the pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Keep the rendered contents.
    #[default]
    Store,
    /// Contents become undefined.
    Discard,
}

/// One color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassColorAttachment {
    /// View rendered into.
    pub view: TextureViewId,
    /// Single-sample view receiving the resolved result.
    pub resolve_target: Option<TextureViewId>,
    /// Clear value used when `load_op` is `Clear`; transparent when absent.
    pub clear_value: Option<Color>,
    /// Load op.
    pub load_op: LoadOp,
    /// Store op.
    pub store_op: StoreOp,
}

impl RenderPassColorAttachment {
    /// Clears to `color` and stores.
    pub fn clear(view: TextureViewId, color: Color) -> Self {
        Self {
            view,
            resolve_target: None,
            clear_value: Some(color),
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
        }
    }

    /// Loads and stores.
    pub fn load(view: TextureViewId) -> Self {
        Self {
            view,
            resolve_target: None,
            clear_value: None,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }
}

/// Depth and stencil attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    /// View rendered into.
    pub view: TextureViewId,
    /// Depth clear value.
    pub depth_clear_value: f32,
    /// Depth load op; `None` when the format has no depth or it is read-only.
    pub depth_load_op: Option<LoadOp>,
    /// Depth store op.
    pub depth_store_op: Option<StoreOp>,
    /// Depth is not written.
    pub depth_read_only: bool,
    /// Stencil clear value.
    pub stencil_clear_value: u32,
    /// Stencil load op.
    pub stencil_load_op: Option<LoadOp>,
    /// Stencil store op.
    pub stencil_store_op: Option<StoreOp>,
    /// Stencil is not written.
    pub stencil_read_only: bool,
}

impl RenderPassDepthStencilAttachment {
    /// Clears depth to `depth` and stores it; stencil untouched.
    pub fn clear_depth(view: TextureViewId, depth: f32) -> Self {
        Self {
            view,
            depth_clear_value: depth,
            depth_load_op: Some(LoadOp::Clear),
            depth_store_op: Some(StoreOp::Store),
            depth_read_only: false,
            stencil_clear_value: 0,
            stencil_load_op: None,
            stencil_store_op: None,
            stencil_read_only: false,
        }
    }
}

/// Describes a render pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Color attachments; `None` keeps index alignment with fragment outputs.
    pub color_attachments: Vec<Option<RenderPassColorAttachment>>,
    /// Depth-stencil attachment.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

/// Describes a compute pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputePassDescriptor {
    /// Debug label.
    pub label: Option<String>,
}

/// Describes a command encoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandEncoderDescriptor {
    /// Debug label.
    pub label: Option<String>,
}

/// Argument block read by `draw_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    /// Vertices per instance.
    pub vertex_count: u32,
    /// Instances.
    pub instance_count: u32,
    /// First vertex.
    pub first_vertex: u32,
    /// First instance.
    pub first_instance: u32,
}

/// Argument block read by `draw_indexed_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    /// Indices per instance.
    pub index_count: u32,
    /// Instances.
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Added to each index.
    pub base_vertex: i32,
    /// First instance.
    pub first_instance: u32,
}

/// Argument block read by `dispatch_workgroups_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
    /// Workgroups along X.
    pub x: u32,
    /// Workgroups along Y.
    pub y: u32,
    /// Workgroups along Z.
    pub z: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_blocks_have_webgpu_sizes() {
        assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 16);
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
        assert_eq!(std::mem::size_of::<DispatchIndirectArgs>(), 12);
    }
}
