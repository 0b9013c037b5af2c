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

//! Pipeline layouts.

use crate::gfx::handle::{BindGroupLayoutId, PipelineLayoutId};

/// Describes a pipeline layout: bind group layouts indexed by group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineLayoutDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Layout of group `i` at index `i`.
    pub bind_group_layouts: Vec<BindGroupLayoutId>,
}

/// Layout a pipeline is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineLayoutChoice {
    /// Derive group layouts from the shaders.
    #[default]
    Auto,
    /// Use an explicit pipeline layout.
    Explicit(PipelineLayoutId),
}
