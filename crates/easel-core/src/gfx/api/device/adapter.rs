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

//! Adapter and device information.

use super::limits::Limits;
use serde::{Deserialize, Serialize};

/// Native API under a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Vulkan through the explicit backend.
    Vulkan,
    /// Metal through the explicit backend.
    Metal,
    /// DirectX 12 through the explicit backend.
    Dx12,
    /// OpenGL/GLES through the explicit backend.
    Gl,
    /// Browser WebGPU through the explicit backend.
    WebGpu,
    /// The WebGL2 emulation backend.
    WebGl2,
}

impl BackendKind {
    /// `true` for the eager, state-machine emulation backend.
    pub fn is_legacy(self) -> bool {
        self == BackendKind::WebGl2
    }
}

/// Physical type of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    /// GPU integrated into the CPU package.
    IntegratedGpu,
    /// Dedicated GPU.
    DiscreteGpu,
    /// Virtualized GPU.
    VirtualGpu,
    /// Software rasterizer.
    Cpu,
    /// Unknown.
    #[default]
    Other,
}

/// Backend-agnostic description of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Adapter name (e.g. renderer string).
    pub name: String,
    /// PCI vendor id, 0 when unknown.
    pub vendor: u32,
    /// PCI device id, 0 when unknown.
    pub device: u32,
    /// Physical type.
    pub device_type: DeviceType,
    /// Driver name or version string.
    pub driver: String,
    /// Native API.
    pub backend: BackendKind,
}

/// Requirements passed to `GfxAdapter::request_device`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Feature tags the device must expose.
    pub required_features: Vec<String>,
    /// Limits the device must meet; `None` accepts the adapter's.
    pub required_limits: Option<Limits>,
}
