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

//! One-shot device loss notification.

use crate::gfx::future::{GfxFuture, GfxPromise};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Why a device was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceLostReason {
    /// `GfxDevice::destroy` was called.
    Destroyed,
    /// The native device or context went away.
    Unknown,
}

/// Value every `lost()` future resolves with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLostInfo {
    /// Cause.
    pub reason: DeviceLostReason,
    /// Driver or engine message.
    pub message: String,
}

#[derive(Default)]
struct LostState {
    info: Option<DeviceLostInfo>,
    waiters: Vec<GfxPromise<DeviceLostInfo>>,
}

/// Shared signal resolved at most once when the device is lost.
///
/// Cloning shares the signal, so native callbacks can hold a copy.
#[derive(Clone, Default)]
pub struct DeviceLostSignal {
    state: Arc<Mutex<LostState>>,
}

impl fmt::Debug for DeviceLostSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLostSignal")
            .field("lost", &self.info())
            .finish()
    }
}

impl DeviceLostSignal {
    /// Creates an unresolved signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Future resolving with the loss info; already resolved after loss.
    pub fn lost(&self) -> GfxFuture<DeviceLostInfo> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &state.info {
            Some(info) => GfxFuture::ready(info.clone()),
            None => {
                let (promise, future) = GfxFuture::pending();
                state.waiters.push(promise);
                future
            }
        }
    }

    /// Marks the device lost. Returns `false` if it already was.
    pub fn resolve(&self, reason: DeviceLostReason, message: impl Into<String>) -> bool {
        let (info, waiters) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.info.is_some() {
                return false;
            }
            let info = DeviceLostInfo {
                reason,
                message: message.into(),
            };
            state.info = Some(info.clone());
            (info, std::mem::take(&mut state.waiters))
        };
        log::warn!("GPU device lost ({:?}): {}", info.reason, info.message);
        for waiter in waiters {
            waiter.resolve(info.clone());
        }
        true
    }

    /// Loss info, if lost.
    pub fn info(&self) -> Option<DeviceLostInfo> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .info
            .clone()
    }

    /// `true` once lost.
    pub fn is_lost(&self) -> bool {
        self.info().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_waiter_exactly_once() {
        let signal = DeviceLostSignal::new();
        let early = signal.lost();
        assert!(!early.is_ready());

        assert!(signal.resolve(DeviceLostReason::Destroyed, "destroy() called"));
        assert!(!signal.resolve(DeviceLostReason::Unknown, "again"));

        let info = pollster::block_on(early);
        assert_eq!(info.reason, DeviceLostReason::Destroyed);
        let late = pollster::block_on(signal.lost());
        assert_eq!(late, info);
    }
}
