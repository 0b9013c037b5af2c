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

//! Concrete GPU backends for the Easel canvas engine.
//!
//! Two implementations of the `easel-core` contracts live here:
//! [`graphics::wgpu`] maps the object model one-to-one onto `wgpu`, and
//! [`graphics::webgl2`] emulates it on a WebGL2 (GLES 3.0) state machine.
//! [`select_adapter`] walks the configured backend preference list and
//! returns the first adapter that comes up.

pub mod graphics;

pub use graphics::webgl2::{HeadlessGl, WebGl2Adapter, WebGl2Device};
pub use graphics::wgpu::{WgpuAdapter, WgpuBackendSelector, WgpuDevice};

use easel_core::gfx::api::{AdapterSelectionConfig, BackendKind, GfxSettings};
use easel_core::gfx::traits::GfxAdapter;
use std::rc::Rc;

/// Selects an adapter following `config.preferred_backends`.
///
/// `wgpu` backends are tried through [`WgpuBackendSelector`]. A
/// [`BackendKind::WebGl2`] entry is satisfied by `gl` when one is supplied,
/// and skipped otherwise.
pub async fn select_adapter(
    config: &AdapterSelectionConfig,
    settings: &GfxSettings,
    gl: Option<Rc<dyn graphics::webgl2::GlContext>>,
) -> anyhow::Result<Box<dyn GfxAdapter>> {
    let selector = WgpuBackendSelector::new(settings.clone());
    for &kind in &config.preferred_backends {
        if kind == BackendKind::WebGl2 {
            match &gl {
                Some(context) => {
                    let adapter = WebGl2Adapter::with_settings(context.clone(), settings.clone())?;
                    log::info!("Using the WebGL2 emulation backend");
                    return Ok(Box::new(adapter));
                }
                None => {
                    log::debug!("No GL context supplied; skipping the WebGL2 backend");
                    continue;
                }
            }
        }
        let single = AdapterSelectionConfig {
            preferred_backends: vec![kind],
            ..config.clone()
        };
        match selector.select_adapter(&single).await {
            Ok(adapter) => return Ok(Box::new(adapter)),
            Err(e) => log::warn!("{kind:?} backend unavailable: {e}"),
        }
    }
    anyhow::bail!("No backend in {:?} produced an adapter", config.preferred_backends)
}
