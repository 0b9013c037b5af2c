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

//! The explicit backend: the `Gfx*` object model over `wgpu`.
//!
//! Objects map one-to-one onto native `wgpu` objects held in per-device
//! arenas. Native errors are captured synchronously with error scopes so
//! every call returns its own failure, matching the WebGL2 backend.

mod adapter;
mod backend;
mod command;
mod conversions;
mod device;
mod queue;
mod resource;

pub use adapter::WgpuAdapter;
pub use backend::{backend_name, WgpuBackendSelector};
pub use command::{WgpuCommandEncoder, WgpuComputePass, WgpuRenderPass};
pub use conversions::{wgpu_texture_format, IntoWgpu};
pub use device::WgpuDevice;
pub use queue::WgpuQueue;
