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

//! Behavior every backend provides.

pub mod command_recorder;
pub mod gfx_adapter;
pub mod gfx_device;
pub mod gfx_queue;

pub use self::command_recorder::*;
pub use self::gfx_adapter::*;
pub use self::gfx_device::*;
pub use self::gfx_queue::*;
