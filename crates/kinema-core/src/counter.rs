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

//! Shared bookkeeping of how many loop instances are currently running.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A shared, atomic count of running loop instances.
///
/// Every successful engagement increments the counter and every stop or
/// completion decrements it; the count can never go negative regardless of
/// call order. The counter is an explicit, clonable object so tests can
/// instantiate isolated counters instead of sharing the process-wide one.
#[derive(Debug, Clone, Default)]
pub struct RunningCounter {
    count: Arc<AtomicUsize>,
}

impl RunningCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide counter shared by loops constructed without an
    /// explicit one. Helpful to watch during development.
    #[must_use]
    pub fn global() -> RunningCounter {
        static GLOBAL: OnceLock<RunningCounter> = OnceLock::new();
        GLOBAL.get_or_init(RunningCounter::new).clone()
    }

    /// The number of instances currently running on this counter.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn decrement(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                Some(value.saturating_sub(1))
            })
            .unwrap_or(0);
        if previous == 0 {
            log::warn!("RunningCounter: decrement with no running instances recorded.");
        }
    }
}

/// Number of loops currently running on the process-wide default counter.
#[must_use]
pub fn running_instances() -> usize {
    RunningCounter::global().count()
}

static GLOBAL_FIXED_DELTA: AtomicBool = AtomicBool::new(false);

/// Forces fixed-delta behavior on every loop in the process.
///
/// When enabled, all instances synthesize deltas as if executing at exact
/// frame intervals, regardless of their own `fixed_delta` setting.
pub fn set_global_fixed_delta(enabled: bool) {
    GLOBAL_FIXED_DELTA.store(enabled, Ordering::SeqCst);
}

/// Whether the process-wide fixed-delta toggle is on.
#[must_use]
pub fn global_fixed_delta() -> bool {
    GLOBAL_FIXED_DELTA.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_zero() {
        let counter = RunningCounter::new();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn clones_share_the_same_count() {
        let counter = RunningCounter::new();
        let alias = counter.clone();

        counter.increment();
        counter.increment();
        assert_eq!(alias.count(), 2);

        alias.decrement();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn decrement_saturates_at_zero() {
        let counter = RunningCounter::new();
        counter.decrement();
        counter.decrement();
        assert_eq!(counter.count(), 0);

        counter.increment();
        counter.decrement();
        counter.decrement();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn global_counter_is_shared() {
        let a = RunningCounter::global();
        let b = RunningCounter::global();
        let before = a.count();
        a.increment();
        assert_eq!(b.count(), before + 1);
        a.decrement();
        assert_eq!(b.count(), before);
    }
}
