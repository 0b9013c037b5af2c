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

//! Adapter selection with fallback support.
//!
//! Backends are tried in the order given by [`AdapterSelectionConfig`]; the
//! first that yields an adapter wins. The emulated WebGL2 backend is never
//! served from here, it wraps a GL context instead.

use super::adapter::WgpuAdapter;
use super::conversions::{backend_kind, backends_for, IntoWgpu};
use anyhow::{anyhow, Result};
use easel_core::gfx::api::{AdapterSelectionConfig, BackendKind, GfxSettings};
use std::time::Instant;
use wgpu::{Backend, Instance, InstanceDescriptor, RequestAdapterOptions};

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

/// Picks a `wgpu` adapter following an [`AdapterSelectionConfig`].
#[derive(Debug, Clone, Default)]
pub struct WgpuBackendSelector {
    settings: GfxSettings,
}

impl WgpuBackendSelector {
    /// Selector whose adapters create devices with `settings`.
    pub fn new(settings: GfxSettings) -> Self {
        Self { settings }
    }

    /// Instance restricted to a single backend.
    fn instance_for(kind: BackendKind) -> Option<Instance> {
        let backends = backends_for(kind);
        if backends.is_empty() {
            return None;
        }
        Some(Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        }))
    }

    /// Try to get an adapter for a specific backend.
    async fn try_backend(&self, kind: BackendKind, config: &AdapterSelectionConfig) -> Result<WgpuAdapter> {
        let instance =
            Self::instance_for(kind).ok_or_else(|| anyhow!("{kind:?} is not served by wgpu"))?;
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: config.power_preference.into_wgpu(),
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await
            .map_err(|e| anyhow!("Failed to find suitable adapter for {kind:?}: {e}"))?;

        let native = adapter.get_info();
        if backend_kind(native.backend) != Some(kind) {
            return Err(anyhow!(
                "Adapter returned wrong backend: requested {kind:?}, got {}",
                backend_name(native.backend)
            ));
        }
        log::info!(
            "{} backend succeeded with adapter: \"{}\"",
            backend_name(native.backend),
            native.name
        );
        Ok(WgpuAdapter::new(adapter, self.settings.clone()))
    }

    /// Returns the first adapter matching `config`.
    pub async fn select_adapter(&self, config: &AdapterSelectionConfig) -> Result<WgpuAdapter> {
        let start_time = Instant::now();
        let mut attempted = Vec::new();
        log::info!("Starting wgpu adapter selection...");

        for &kind in &config.preferred_backends {
            if kind == BackendKind::WebGl2 {
                log::debug!("Skipping WebGL2: served by the emulated backend");
                continue;
            }
            attempted.push(kind);
            log::info!("Attempting to initialize {kind:?} backend...");
            match self.try_backend(kind, config).await {
                Ok(adapter) => {
                    log::info!(
                        "Selected {kind:?} adapter \"{}\" ({:?}) in {} ms",
                        adapter.native_info().name,
                        adapter.native_info().device_type,
                        start_time.elapsed().as_millis()
                    );
                    return Ok(adapter);
                }
                Err(e) => {
                    log::warn!("Failed to initialize {kind:?} backend: {e}");
                }
            }
        }
        Err(anyhow!("All backend attempts failed. Attempted: {attempted:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_function() {
        assert_eq!(backend_name(Backend::Vulkan), "Vulkan");
        assert_eq!(backend_name(Backend::Metal), "Metal");
        assert_eq!(backend_name(Backend::Dx12), "DirectX 12");
        assert_eq!(backend_name(Backend::Gl), "OpenGL");
    }

    #[test]
    fn webgl2_has_no_wgpu_instance() {
        assert!(WgpuBackendSelector::instance_for(BackendKind::WebGl2).is_none());
    }

    #[test]
    fn an_empty_preference_list_fails() {
        let config = AdapterSelectionConfig {
            preferred_backends: vec![BackendKind::WebGl2],
            ..Default::default()
        };
        let selector = WgpuBackendSelector::default();
        let err = pollster::block_on(selector.select_adapter(&config)).unwrap_err();
        assert!(err.to_string().contains("All backend attempts failed"));
    }
}
