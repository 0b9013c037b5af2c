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

//! Render and compute pipeline descriptors.

use super::layout::PipelineLayoutChoice;
use super::state::*;
use crate::gfx::handle::ShaderModuleId;

/// A shader module and the entry point a stage runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammableStage {
    /// Module holding the code.
    pub module: ShaderModuleId,
    /// Entry point; `None` selects the module's only entry for the stage.
    pub entry_point: Option<String>,
}

impl ProgrammableStage {
    /// Stage using the default entry point.
    pub fn new(module: ShaderModuleId) -> Self {
        Self {
            module,
            entry_point: None,
        }
    }
}

/// Vertex stage: code plus buffer layouts indexed by slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexState {
    /// Shader.
    pub stage: ProgrammableStage,
    /// Layout of vertex buffer slot `i` at index `i`.
    pub buffers: Vec<VertexBufferLayout>,
}

/// Fragment stage: code plus color targets. `None` targets keep index alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentState {
    /// Shader.
    pub stage: ProgrammableStage,
    /// Color target `i` at index `i`.
    pub targets: Vec<Option<ColorTargetState>>,
}

/// Describes a render pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPipelineDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Explicit layout or derive from shaders.
    pub layout: PipelineLayoutChoice,
    /// Vertex stage.
    pub vertex: VertexState,
    /// Primitive state.
    pub primitive: PrimitiveState,
    /// Depth-stencil state; `None` disables depth and stencil tests.
    pub depth_stencil: Option<DepthStencilState>,
    /// Multisampling.
    pub multisample: MultisampleState,
    /// Fragment stage; `None` for depth-only pipelines.
    pub fragment: Option<FragmentState>,
}

/// Describes a compute pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputePipelineDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Explicit layout or derive from shaders.
    pub layout: PipelineLayoutChoice,
    /// Compute stage.
    pub stage: ProgrammableStage,
}
