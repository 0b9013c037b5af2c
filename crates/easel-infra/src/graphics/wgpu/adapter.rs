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

//! The explicit adapter: capability discovery from a `wgpu::Adapter`.

use super::conversions::{self, backend_kind, feature_tags, native_features, native_limits};
use super::device::WgpuDevice;
use async_trait::async_trait;
use easel_core::gfx::api::{features, AdapterInfo, BackendKind, Capabilities, DeviceDescriptor, GfxSettings};
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::traits::{GfxAdapter, GfxDevice};

/// A `wgpu` adapter with its capabilities resolved once.
#[derive(Debug)]
pub struct WgpuAdapter {
    adapter: wgpu::Adapter,
    native_info: wgpu::AdapterInfo,
    info: AdapterInfo,
    capabilities: Capabilities,
    settings: GfxSettings,
}

impl WgpuAdapter {
    /// Wraps `adapter`, querying its features and limits.
    pub fn new(adapter: wgpu::Adapter, settings: GfxSettings) -> Self {
        let native_info = adapter.get_info();
        let info = AdapterInfo {
            name: native_info.name.clone(),
            vendor: native_info.vendor,
            device: native_info.device,
            device_type: conversions::device_type(native_info.device_type),
            driver: format!("{} {}", native_info.driver, native_info.driver_info)
                .trim()
                .to_owned(),
            backend: backend_kind(native_info.backend).unwrap_or(BackendKind::Gl),
        };
        let tags = feature_tags(adapter.features(), &adapter.get_downlevel_capabilities());
        let mut limits = conversions::limits(&adapter.limits());
        if !tags.iter().any(|t| t == features::COMPUTE) {
            limits = limits.without_compute();
        }
        let capabilities = Capabilities::new(&info, tags, limits);
        log::debug!(
            "wgpu adapter '{}' exposes {} feature(s)",
            info.name,
            capabilities.features.len()
        );
        Self {
            adapter,
            native_info,
            info,
            capabilities,
            settings,
        }
    }

    /// The adapter as `wgpu` reports it.
    pub fn native_info(&self) -> &wgpu::AdapterInfo {
        &self.native_info
    }

    /// Settings handed to created devices.
    pub fn settings(&self) -> &GfxSettings {
        &self.settings
    }
}

#[async_trait(?Send)]
impl GfxAdapter for WgpuAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn request_device(&self, desc: &DeviceDescriptor) -> GfxResult<Box<dyn GfxDevice>> {
        self.capabilities.check_request(desc)?;
        let capabilities = self.capabilities.for_request(desc);
        let (device, queue) = self
            .adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: desc.label.as_deref(),
                required_features: native_features(&desc.required_features),
                required_limits: native_limits(&capabilities.limits, self.adapter.limits()),
                ..Default::default()
            })
            .await
            .map_err(|e| GfxError::unsupported(format!("wgpu device request failed: {e}")))?;
        log::info!(
            "Created wgpu device '{}' on '{}'",
            desc.label.as_deref().unwrap_or("<unlabeled>"),
            self.info.name
        );
        Ok(Box::new(WgpuDevice::new(
            device,
            queue,
            self.info.clone(),
            capabilities,
            self.settings.clone(),
        )))
    }
}
