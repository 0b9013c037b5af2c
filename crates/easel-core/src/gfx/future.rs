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

//! Runtime-agnostic futures for the asynchronous `Gfx*` calls.
//!
//! A [`GfxPromise`] is the producing half, handed to a native callback or
//! resolved directly by an eager backend. The matching [`GfxFuture`] can be
//! awaited from any executor or driven with `pollster::block_on`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

struct SharedState<T> {
    value: Mutex<Option<T>>,
    waker: Mutex<Option<Waker>>,
}

fn lock<U>(m: &Mutex<U>) -> MutexGuard<'_, U> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producing half of a [`GfxFuture`].
pub struct GfxPromise<T> {
    state: Arc<SharedState<T>>,
}

impl<T> GfxPromise<T> {
    /// Stores the value and wakes the waiting task, if any.
    pub fn resolve(self, value: T) {
        *lock(&self.state.value) = Some(value);
        if let Some(waker) = lock(&self.state.waker).take() {
            waker.wake();
        }
    }
}

impl<T> fmt::Debug for GfxPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfxPromise").finish_non_exhaustive()
    }
}

/// Closure that makes progress on the native side (e.g. polls the device).
pub type FutureDriver = Box<dyn Fn()>;

/// Value that becomes available later.
///
/// When a driver is attached, every poll first runs it, and a pending poll
/// re-schedules itself, so a plain blocking executor keeps the native event
/// loop turning until the callback fires.
#[must_use = "futures do nothing unless awaited or polled"]
pub struct GfxFuture<T> {
    state: Arc<SharedState<T>>,
    driver: Option<FutureDriver>,
}

impl<T> GfxFuture<T> {
    /// Creates a connected promise/future pair.
    pub fn pending() -> (GfxPromise<T>, GfxFuture<T>) {
        let state = Arc::new(SharedState {
            value: Mutex::new(None),
            waker: Mutex::new(None),
        });
        (
            GfxPromise {
                state: state.clone(),
            },
            GfxFuture {
                state,
                driver: None,
            },
        )
    }

    /// Creates an already-resolved future.
    pub fn ready(value: T) -> Self {
        let (promise, future) = Self::pending();
        promise.resolve(value);
        future
    }

    /// Attaches a driver run on every poll.
    pub fn with_driver(mut self, driver: FutureDriver) -> Self {
        self.driver = Some(driver);
        self
    }

    /// `true` once the value is available and not yet taken.
    pub fn is_ready(&self) -> bool {
        lock(&self.state.value).is_some()
    }

    /// Takes the value without waiting.
    pub fn try_take(&mut self) -> Option<T> {
        lock(&self.state.value).take()
    }
}

impl<T> Future for GfxFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        if let Some(value) = this.try_take() {
            return Poll::Ready(value);
        }
        if let Some(driver) = &this.driver {
            driver();
            if let Some(value) = this.try_take() {
                return Poll::Ready(value);
            }
        }
        *lock(&this.state.waker) = Some(cx.waker().clone());
        // The value may have landed between the check and storing the waker.
        if let Some(value) = this.try_take() {
            return Poll::Ready(value);
        }
        if this.driver.is_some() {
            cx.waker().wake_by_ref();
        }
        Poll::Pending
    }
}

impl<T> fmt::Debug for GfxFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfxFuture")
            .field("ready", &self.is_ready())
            .field("driven", &self.driver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn ready_future_resolves_immediately() {
        assert_eq!(pollster::block_on(GfxFuture::ready(7)), 7);
    }

    #[test]
    fn promise_resolved_from_another_thread_wakes_the_future() {
        let (promise, future) = GfxFuture::<&'static str>::pending();
        let handle = std::thread::spawn(move || promise.resolve("done"));
        assert_eq!(pollster::block_on(future), "done");
        handle.join().unwrap();
    }

    #[test]
    fn driver_runs_until_the_value_arrives() {
        let (promise, future) = GfxFuture::pending();
        let promise = Rc::new(Cell::new(Some(promise)));
        let polls = Rc::new(Cell::new(0));
        let counter = polls.clone();
        let future = future.with_driver(Box::new(move || {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                if let Some(p) = promise.take() {
                    p.resolve(42u32);
                }
            }
        }));
        assert_eq!(pollster::block_on(future), 42);
        assert_eq!(polls.get(), 3);
    }
}
