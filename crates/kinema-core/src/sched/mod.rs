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

//! Frame-scheduling contracts.
//!
//! A [`FrameScheduler`] is the "request next frame / cancel pending frame"
//! primitive a [`Loop`](crate::Loop) runs on. By keeping the contract a
//! trait, the core stays decoupled from how frames are actually sourced:
//! a display callback, a timer thread, or the deterministic
//! [`ManualScheduler`] shipped here for tests and offline stepping.

mod manual;

pub use self::manual::ManualScheduler;

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A one-shot callback fired by a scheduler on a later frame.
pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque token identifying a pending frame request, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Builds a handle from a scheduler-assigned raw id.
    #[must_use]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The scheduler-assigned raw id.
    #[must_use]
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// The frame-scheduling primitive a [`Loop`](crate::Loop) runs on.
///
/// # Contract
///
/// Callbacks are one-shot: each [`request`](FrameScheduler::request) fires
/// its callback at most once, on the scheduler's next frame. A callback must
/// never be invoked synchronously from inside `request` itself; the loop
/// re-enters its own state there. Cancelling an unknown or already-fired
/// handle is a no-op.
pub trait FrameScheduler: Send + Sync {
    /// Requests `callback` to run on the next frame.
    fn request(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancels a pending request.
    fn cancel(&self, handle: FrameHandle);

    /// Requests `callback` after at least `delay`, off the frame cadence.
    ///
    /// Used for delayed loop engagement rather than per-frame scheduling.
    fn request_after(&self, delay: Duration, callback: FrameCallback) -> FrameHandle;
}

static DEFAULT_PROVIDER: Mutex<Option<Arc<dyn FrameScheduler>>> = Mutex::new(None);

/// Installs the process-wide fallback provider consulted by
/// [`Loop::new`](crate::Loop::new) when the configuration carries none.
///
/// Replaces any previously installed provider. Loops already constructed
/// keep the provider they resolved at construction; swapping a running
/// loop's provider goes through
/// [`Loop::set_scheduler`](crate::Loop::set_scheduler).
pub fn install_default_scheduler(provider: Arc<dyn FrameScheduler>) {
    let mut slot = DEFAULT_PROVIDER
        .lock()
        .expect("Default scheduler: mutex poisoned");
    log::debug!("Default frame scheduler installed.");
    *slot = Some(provider);
}

/// The installed process-wide fallback provider, if any.
#[must_use]
pub fn default_scheduler() -> Option<Arc<dyn FrameScheduler>> {
    DEFAULT_PROVIDER
        .lock()
        .expect("Default scheduler: mutex poisoned")
        .clone()
}
