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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// A lifecycle event emitted by a [`Loop`](crate::Loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopEvent {
    /// The loop engaged and will begin scheduling frames.
    Start,
    /// One update tick ran.
    Update,
    /// The loop stopped without being marked complete.
    Stop,
    /// The loop stopped and was marked complete.
    Complete,
    /// Counters and timing state were zeroed.
    Reset,
}

impl LoopEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [LoopEvent; 5] = [
        LoopEvent::Start,
        LoopEvent::Update,
        LoopEvent::Stop,
        LoopEvent::Complete,
        LoopEvent::Reset,
    ];

    /// Stable lowercase name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LoopEvent::Start => "start",
            LoopEvent::Update => "update",
            LoopEvent::Stop => "stop",
            LoopEvent::Complete => "complete",
            LoopEvent::Reset => "reset",
        }
    }
}

impl fmt::Display for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing payload carried by every loop event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TickInfo {
    /// Milliseconds since the previous update; 0 on the first tick after a
    /// start.
    pub delta_time: f64,
    /// Cumulative milliseconds across updates since start or the last
    /// reset.
    pub elapsed_time: f64,
    /// Number of completed update ticks.
    pub frame_count: u64,
}

/// Identifies a registered listener so it can be detached later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type BoxedListener = Box<dyn FnMut(TickInfo) + Send + 'static>;

// Callbacks live one lock away from the registry, so the registry lock is
// never held while user code runs.
type ListenerSlot = Arc<Mutex<Option<BoxedListener>>>;

struct ListenerEntry {
    id: ListenerId,
    event: LoopEvent,
    once: bool,
    slot: ListenerSlot,
}

/// Synchronous publisher for loop lifecycle events.
///
/// Listeners run on the emitting thread, in registration order. A listener
/// may re-enter the owning loop: stopping it from inside an update listener
/// is the canonical case. Listeners detached while an emit is in flight may
/// still receive that in-flight event.
pub(crate) struct LoopEmitter {
    inner: Mutex<EmitterInner>,
}

#[derive(Default)]
struct EmitterInner {
    next_id: u64,
    closed: bool,
    entries: Vec<ListenerEntry>,
}

impl LoopEmitter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(EmitterInner::default()),
        }
    }

    /// Registers a listener. Registrations on a closed emitter are ignored;
    /// the returned id then refers to nothing.
    pub fn register(&self, event: LoopEvent, listener: BoxedListener, once: bool) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        if inner.closed {
            log::debug!("LoopEmitter: listener for '{event}' ignored, emitter is closed.");
            return id;
        }
        inner.entries.push(ListenerEntry {
            id,
            event,
            once,
            slot: Arc::new(Mutex::new(Some(listener))),
        });
        id
    }

    /// Detaches a listener. Returns whether it was still registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|entry| entry.id != id);
        inner.entries.len() != before
    }

    /// Detaches every listener, leaving the emitter usable.
    pub fn remove_all(&self) {
        self.lock().entries.clear();
    }

    /// Detaches every listener and refuses all further emits and
    /// registrations.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.entries.clear();
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: LoopEvent) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.event == event)
            .count()
    }

    /// Invokes every listener registered for `event`, synchronously.
    ///
    /// Once-listeners are unregistered before any callback runs, so they
    /// cannot fire twice even re-entrantly. A listener that is itself
    /// mid-invocation (a nested emit of the same event) is skipped.
    pub fn emit(&self, event: LoopEvent, info: TickInfo) {
        let batch: Vec<ListenerSlot> = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            let mut batch = Vec::new();
            inner.entries.retain(|entry| {
                if entry.event == event {
                    batch.push(Arc::clone(&entry.slot));
                    !entry.once
                } else {
                    true
                }
            });
            batch
        };

        for slot in batch {
            let taken = slot
                .lock()
                .expect("LoopEmitter: listener slot poisoned")
                .take();
            if let Some(mut listener) = taken {
                listener(info);
                *slot.lock().expect("LoopEmitter: listener slot poisoned") = Some(listener);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EmitterInner> {
        self.inner.lock().expect("LoopEmitter: registry poisoned")
    }
}
