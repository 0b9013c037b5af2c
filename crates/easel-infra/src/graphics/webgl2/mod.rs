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

//! WebGL2 emulation of the `Gfx*` object model.
//!
//! WebGL2 is a global state machine with bind-at-draw-time semantics. This
//! backend keeps WebGPU's objects (bind groups, pipelines, encoders) as plain
//! Rust state and replays them onto the context right before each draw.
//! Everything runs eagerly against one [`GlContext`]; the `HeadlessGl`
//! implementation records calls for headless runs and tests, and
//! `GlowContext` drives a real context when the `native-gl` feature is on.

mod adapter;
mod bind_group;
mod command;
mod conversions;
mod device;
mod gl;
pub mod headless;
mod pipeline;
mod program;
mod queue;
mod resource;

#[cfg(all(feature = "native-gl", not(target_arch = "wasm32")))]
mod glow_impl;

pub use adapter::WebGl2Adapter;
pub use bind_group::{global_slot, MAX_BINDINGS_PER_GROUP};
pub use command::{WebGl2CommandEncoder, WebGl2ComputePass, WebGl2RenderPass};
pub use conversions::{gl_texture_format, GlTextureFormat};
pub use device::WebGl2Device;
pub use gl::{consts, GlActiveInfo, GlContext, GlName};
pub use headless::HeadlessGl;
pub use program::{attribute_name, VertexSemantic, ATTRIBUTE_PREFIX};
pub use queue::WebGl2Queue;

#[cfg(all(feature = "native-gl", not(target_arch = "wasm32")))]
pub use glow_impl::GlowContext;
