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

//! Backend-agnostic GPU contracts for the Easel canvas engine.
//!
//! `easel-core` defines the WebGPU-shaped `Gfx*` object model: descriptors,
//! resource ids, the format and capability tables, the error taxonomy with its
//! error-scope stack, and the traits every backend implements. It carries no
//! GPU dependency; concrete backends live in `easel-infra`.

#![warn(missing_docs)]

pub mod gfx;
pub mod utils;

pub use gfx::*;
