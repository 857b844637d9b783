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

//! Integration tests for the process-wide surfaces: the default scheduler
//! slot, the global fixed-delta toggle, and the global running counter.
//!
//! These live in their own test binary because they mutate process state;
//! the deterministic lifecycle tests must never observe them.

use kinema_core::{
    global_fixed_delta, install_default_scheduler, running_instances, set_global_fixed_delta,
    Loop, LoopConfig, ManualClock, ManualScheduler, RunningCounter,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_default_scheduler_backs_plain_construction() {
    let scheduler = ManualScheduler::new();
    install_default_scheduler(Arc::new(scheduler.clone()));

    // Isolated counter: the global-counter test observes the real one.
    let animation = Loop::new(LoopConfig {
        counter: Some(RunningCounter::new()),
        ..LoopConfig::default()
    })
    .expect("a loop with no explicit scheduler should resolve the default");
    animation.start();
    assert!(animation.is_running());
    assert_eq!(scheduler.pending_frames(), 1, "frame requested on the default");

    scheduler.fire_frame();
    assert_eq!(animation.frame_count(), 1);
    animation.stop();
}

#[test]
fn test_global_fixed_delta_applies_to_every_instance() {
    let scheduler = ManualScheduler::new();
    let clock = ManualClock::new();
    let animation = Loop::new(LoopConfig {
        fps: Some(30.0),
        scheduler: Some(Arc::new(scheduler)),
        clock: Some(Arc::new(clock.clone())),
        ..LoopConfig::default()
    })
    .expect("Loop construction should succeed");

    assert!(!global_fixed_delta());
    set_global_fixed_delta(true);
    assert!(global_fixed_delta());

    // The instance itself has `fixed_delta: false`; the process toggle wins.
    clock.advance(Duration::from_millis(480));
    animation.update();
    assert_eq!(animation.delta_time(), 1000.0 / 30.0);

    set_global_fixed_delta(false);
    clock.advance(Duration::from_millis(7));
    animation.update();
    assert_eq!(animation.delta_time(), 7.0, "measured deltas resume");
}

#[test]
fn test_global_running_counter_is_observable() {
    let scheduler = ManualScheduler::new();
    let animation = Loop::new(LoopConfig {
        scheduler: Some(Arc::new(scheduler)),
        ..LoopConfig::default()
    })
    .expect("Loop construction should succeed");

    let before = running_instances();
    animation.start();
    assert_eq!(running_instances(), before + 1);
    animation.complete();
    assert_eq!(running_instances(), before);
}
