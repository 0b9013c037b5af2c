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

//! Adapter trait: capability discovery and device creation.

use crate::gfx::api::{AdapterInfo, Capabilities, DeviceDescriptor};
use crate::gfx::error::GfxResult;
use crate::gfx::traits::GfxDevice;
use async_trait::async_trait;
use std::fmt::Debug;

/// A physical (or emulated) GPU able to create devices.
#[async_trait(?Send)]
pub trait GfxAdapter: Debug {
    /// Identity of the adapter.
    fn info(&self) -> &AdapterInfo;

    /// Everything a device from this adapter can offer.
    fn capabilities(&self) -> &Capabilities;

    /// Creates a device meeting `desc`.
    ///
    /// Requesting a feature or limit the adapter lacks fails with `unsupported`.
    async fn request_device(&self, desc: &DeviceDescriptor) -> GfxResult<Box<dyn GfxDevice>>;
}
