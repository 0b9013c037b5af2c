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

//! Device and adapter-selection configuration.

use super::adapter::BackendKind;

/// Runtime switches of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxSettings {
    /// Drain native error state (`glGetError`) into error scopes when they
    /// are popped and after each reported error.
    pub poll_native_errors: bool,
    /// Log every native call at `trace` level.
    pub trace_native_calls: bool,
    /// Log uncaptured errors at `error` level.
    pub log_uncaptured_errors: bool,
}

impl Default for GfxSettings {
    fn default() -> Self {
        Self {
            poll_native_errors: true,
            trace_native_calls: false,
            log_uncaptured_errors: true,
        }
    }
}

/// Power profile hint for adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerPreference {
    /// No preference.
    #[default]
    None,
    /// Prefer integrated, low-power adapters.
    LowPower,
    /// Prefer discrete adapters.
    HighPerformance,
}

/// Which adapters to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSelectionConfig {
    /// Backends tried in order; the first that yields an adapter wins.
    pub preferred_backends: Vec<BackendKind>,
    /// Power profile hint.
    pub power_preference: PowerPreference,
    /// Accept a software fallback adapter.
    pub force_fallback_adapter: bool,
}

impl Default for AdapterSelectionConfig {
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        let preferred_backends = vec![BackendKind::Metal, BackendKind::Gl];
        #[cfg(target_os = "windows")]
        let preferred_backends = vec![BackendKind::Dx12, BackendKind::Vulkan, BackendKind::Gl];
        #[cfg(target_arch = "wasm32")]
        let preferred_backends = vec![BackendKind::WebGpu, BackendKind::WebGl2];
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_arch = "wasm32")))]
        let preferred_backends = vec![BackendKind::Vulkan, BackendKind::Gl];

        Self {
            preferred_backends,
            power_preference: PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}
