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

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A monotonically nondecreasing time source.
///
/// Readings are measured from an arbitrary fixed origin; only differences
/// between readings are meaningful.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Time elapsed since the clock's origin, in fractional milliseconds.
    ///
    /// Computed from whole nanoseconds so readings on a millisecond
    /// boundary convert exactly.
    fn now_ms(&self) -> f64 {
        self.now().as_nanos() as f64 / 1_000_000.0
    }
}

/// The default clock, anchored to an [`Instant`] captured at construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A manually advanced clock for tests and offline stepping.
///
/// Clones share the same underlying reading, so a test can hold one handle
/// while a loop under test reads through another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Creates a clock whose reading starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the reading forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("ManualClock: mutex poisoned");
        *now += delta;
    }

    /// Sets the reading to an absolute value.
    ///
    /// Moving the reading backwards violates the [`Clock`] contract; callers
    /// are expected to only ever move it forward.
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock().expect("ManualClock: mutex poisoned");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().expect("ManualClock: mutex poisoned")
    }
}
