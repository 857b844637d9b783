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

use super::{FrameCallback, FrameHandle, FrameScheduler};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A deterministic, manually stepped [`FrameScheduler`].
///
/// Frame requests queue until the owner fires a whole batch with
/// [`fire_frame`](ManualScheduler::fire_frame); delayed requests queue
/// separately and release through
/// [`release_delayed`](ManualScheduler::release_delayed). Clones share the
/// same queues, so a test can hold one handle while the loop under test
/// schedules through another.
///
/// Together with [`ManualClock`](crate::ManualClock) and fixed-delta mode
/// this also serves offline stepping, where frames are produced as fast as
/// they can be recorded rather than on a wall-clock cadence.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualInner>>,
}

#[derive(Default)]
struct ManualInner {
    next_id: u64,
    frames: Vec<(FrameHandle, FrameCallback)>,
    delayed: Vec<(FrameHandle, Duration, FrameCallback)>,
}

impl ManualScheduler {
    /// Creates a scheduler with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every frame callback queued before this call, as one host
    /// frame. Returns how many fired.
    ///
    /// Callbacks requested while the batch runs (the loop re-posting
    /// itself) land in the next batch, matching one-request-per-frame
    /// scheduler semantics.
    pub fn fire_frame(&self) -> usize {
        let batch = {
            let mut inner = self.lock();
            std::mem::take(&mut inner.frames)
        };
        let fired = batch.len();
        for (_, callback) in batch {
            callback();
        }
        fired
    }

    /// Fires every pending delayed callback, oldest first. Returns how many
    /// fired.
    pub fn release_delayed(&self) -> usize {
        let batch = {
            let mut inner = self.lock();
            std::mem::take(&mut inner.delayed)
        };
        let fired = batch.len();
        for (_, _, callback) in batch {
            callback();
        }
        fired
    }

    /// Number of frame callbacks waiting for the next
    /// [`fire_frame`](ManualScheduler::fire_frame).
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Number of delayed callbacks waiting for
    /// [`release_delayed`](ManualScheduler::release_delayed).
    #[must_use]
    pub fn pending_delayed(&self) -> usize {
        self.lock().delayed.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        self.inner.lock().expect("ManualScheduler: mutex poisoned")
    }

    fn mint(inner: &mut ManualInner) -> FrameHandle {
        let handle = FrameHandle::from_raw(inner.next_id);
        inner.next_id += 1;
        handle
    }
}

impl FrameScheduler for ManualScheduler {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let mut inner = self.lock();
        let handle = Self::mint(&mut inner);
        inner.frames.push((handle, callback));
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        let mut inner = self.lock();
        inner.frames.retain(|(pending, _)| *pending != handle);
        inner.delayed.retain(|(pending, _, _)| *pending != handle);
    }

    fn request_after(&self, delay: Duration, callback: FrameCallback) -> FrameHandle {
        let mut inner = self.lock();
        let handle = Self::mint(&mut inner);
        inner.delayed.push((handle, delay, callback));
        handle
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ManualScheduler")
            .field("pending_frames", &inner.frames.len())
            .field("pending_delayed", &inner.delayed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(hits: &Arc<AtomicUsize>) -> FrameCallback {
        let hits = Arc::clone(hits);
        Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn requests_queue_until_fired() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        scheduler.request(counting_callback(&hits));
        scheduler.request(counting_callback(&hits));
        assert_eq!(scheduler.pending_frames(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.fire_frame(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn cancel_removes_a_pending_request() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let keep = scheduler.request(counting_callback(&hits));
        let cancelled = scheduler.request(counting_callback(&hits));
        scheduler.cancel(cancelled);
        assert_ne!(keep, cancelled);

        assert_eq!(scheduler.fire_frame(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_requests_land_in_the_next_batch() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let reposting: FrameCallback = {
            let scheduler = scheduler.clone();
            let hits = Arc::clone(&hits);
            Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
                scheduler.request(Box::new(|| {}));
            })
        };
        scheduler.request(reposting);

        assert_eq!(scheduler.fire_frame(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_frames(), 1, "re-posted request queued");
    }

    #[test]
    fn delayed_requests_release_separately() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        scheduler.request_after(Duration::from_millis(100), counting_callback(&hits));
        assert_eq!(scheduler.pending_delayed(), 1);
        assert_eq!(scheduler.fire_frame(), 0, "frame batches skip delayed entries");

        assert_eq!(scheduler.release_delayed(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_removes_a_delayed_request() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.request_after(Duration::from_millis(5), counting_callback(&hits));
        scheduler.cancel(handle);
        assert_eq!(scheduler.release_delayed(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
