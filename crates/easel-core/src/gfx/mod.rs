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

//! The `Gfx*` object model shared by every backend.
//!
//! - [`api`]: plain-data descriptors, enums and tables.
//! - [`traits`]: the behavior a backend provides (`GfxAdapter`, `GfxDevice`, ...).
//! - [`error`]: the error taxonomy and the device error-scope stack.
//! - [`handle`]: typed, generation-checked resource ids.
//! - [`future`]: the runtime-agnostic future returned by asynchronous calls.

pub mod api;
pub mod error;
pub mod future;
pub mod handle;
pub mod traits;
pub mod validation;

pub use self::api::*;
pub use self::error::*;
pub use self::future::*;
pub use self::handle::*;
pub use self::traits::*;
