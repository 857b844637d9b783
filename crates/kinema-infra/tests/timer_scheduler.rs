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

//! Real-time smoke tests for the timer-thread scheduler.
//!
//! These run against the wall clock, so they assert generous bounds rather
//! than exact timings.

use kinema_core::{FrameScheduler, Loop, LoopConfig, RunningCounter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Polls `predicate` until it holds or `deadline` passes.
fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

#[test]
fn test_frame_request_fires() {
    let scheduler = kinema_infra::TimerScheduler::with_rate(120.0).expect("scheduler should start");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    scheduler.request(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(
        wait_until(Duration::from_secs(1), || hits.load(Ordering::SeqCst) == 1),
        "the callback should fire within a generous deadline"
    );

    // One-shot: it must not fire again on later ticks.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_prevents_the_callback() {
    let scheduler = kinema_infra::TimerScheduler::with_rate(120.0).expect("scheduler should start");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let handle = scheduler.request(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    scheduler.cancel(handle);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 0, "cancelled request never fires");
}

#[test]
fn test_request_after_respects_the_delay() {
    let scheduler = kinema_infra::TimerScheduler::with_rate(120.0).expect("scheduler should start");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let requested = Instant::now();
    scheduler.request_after(
        Duration::from_millis(80),
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert!(
        wait_until(Duration::from_secs(1), || hits.load(Ordering::SeqCst) == 1),
        "the delayed callback should fire within a generous deadline"
    );
    assert!(
        requested.elapsed() >= Duration::from_millis(80),
        "fired after only {:?}",
        requested.elapsed()
    );
}

#[test]
fn test_drives_a_loop_end_to_end() {
    let scheduler =
        Arc::new(kinema_infra::TimerScheduler::with_rate(240.0).expect("scheduler should start"));
    let counter = RunningCounter::new();
    let animation = Loop::new(LoopConfig {
        scheduler: Some(scheduler),
        counter: Some(counter.clone()),
        ..LoopConfig::default()
    })
    .expect("Loop construction should succeed");

    animation.start();
    assert_eq!(counter.count(), 1);
    assert!(
        wait_until(Duration::from_secs(2), || animation.frame_count() >= 10),
        "the loop should tick at least 10 times, got {}",
        animation.frame_count()
    );

    animation.stop();
    assert_eq!(counter.count(), 0);
    let frozen = animation.frame_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(animation.frame_count(), frozen, "no stray ticks after stop");
}

#[test]
fn test_drop_joins_the_worker() {
    let scheduler = kinema_infra::TimerScheduler::new().expect("scheduler should start");
    scheduler.request(Box::new(|| {}));
    let dropped_at = Instant::now();
    drop(scheduler);
    assert!(
        dropped_at.elapsed() < Duration::from_secs(1),
        "shutdown should not hang"
    );
}
