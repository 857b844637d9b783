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

//! The loop state machine: lifecycle transitions, timing bookkeeping, and
//! the tail-scheduled frame continuation.
//!
//! A [`Loop`] owns four pieces of interacting state: the
//! running/completed lifecycle flags, the frame counter with delta/elapsed
//! time, the throttle gate, and the handle of the one frame request
//! currently in flight. Every transition emits exactly one event; only
//! [`update`](Loop::update) advances the counter and the elapsed time.

use crate::counter::{self, RunningCounter};
use crate::error::ConfigError;
use crate::event::{ListenerId, LoopEmitter, LoopEvent, TickInfo, TickStream};
use crate::gate::{UpdateGate, NATIVE_RATE_HZ};
use crate::sched::{self, FrameCallback, FrameHandle, FrameScheduler};
use crate::time::{Clock, MonotonicClock};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const STATE_POISONED: &str = "Loop: state mutex poisoned";
const SCHEDULER_POISONED: &str = "Loop: scheduler mutex poisoned";

/// Configuration for a [`Loop`]. All fields have workable defaults except
/// that *some* scheduler must be resolvable: either set
/// [`scheduler`](LoopConfig::scheduler) or install a process-wide default
/// via [`install_default_scheduler`](crate::install_default_scheduler).
#[derive(Default)]
pub struct LoopConfig {
    /// Requested ceiling on update frequency, in frames per second.
    /// `None` and non-positive values mean unbounded.
    pub fps: Option<f64>,
    /// Delay between `start()` and the actual loop engagement.
    pub delay: Duration,
    /// Synthesize fixed deltas instead of measuring wall-clock time.
    ///
    /// Useful when recording frames or doing something asynchronous while
    /// the animation interval must remain constant.
    pub fixed_delta: bool,
    /// Frame-scheduling provider. Falls back to the installed process
    /// default.
    pub scheduler: Option<Arc<dyn FrameScheduler>>,
    /// Time source. Defaults to a fresh [`MonotonicClock`].
    pub clock: Option<Arc<dyn Clock>>,
    /// Running-instance counter. Defaults to the process-wide counter.
    pub counter: Option<RunningCounter>,
}

impl fmt::Debug for LoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopConfig")
            .field("fps", &self.fps)
            .field("delay", &self.delay)
            .field("fixed_delta", &self.fixed_delta)
            .field("scheduler", &self.scheduler.is_some())
            .field("clock", &self.clock.is_some())
            .field("counter", &self.counter.is_some())
            .finish()
    }
}

/// A frame request currently in flight, kept so `stop()` can cancel it.
///
/// The provider it was issued on is captured alongside the handle: a
/// mid-loop scheduler swap must not redirect the cancellation.
struct PendingFrame {
    handle: FrameHandle,
    provider: Arc<dyn FrameScheduler>,
}

/// The scheduling provider behind a versioned reference. The version is
/// bumped on every swap so an in-flight frame can detect that it was
/// requested through a stale provider and re-engage through the new one.
struct SchedulerCell {
    provider: Arc<dyn FrameScheduler>,
    version: u64,
}

struct LoopState {
    running: bool,
    completed: bool,
    disposed: bool,
    frame_count: u64,
    delta_time: f64,
    elapsed_time: f64,
    fps_limit: f64,
    fixed_delta: bool,
    start_delay: Duration,
    last_tick_ms: Option<f64>,
    gate: UpdateGate,
    pending: Option<PendingFrame>,
}

struct LoopCore {
    state: Mutex<LoopState>,
    scheduler: Mutex<SchedulerCell>,
    emitter: LoopEmitter,
    clock: Arc<dyn Clock>,
    counter: RunningCounter,
}

/// An event-driven animation loop.
///
/// Wraps a [`FrameScheduler`] behind a start/stop/complete/reset lifecycle,
/// counts frames, tracks delta and elapsed time in milliseconds, and can
/// throttle updates below the host's native rate. `Loop` is a cheap
/// clonable handle over shared state, so listeners can hold one and drive
/// the loop they are observing.
///
/// # Example
///
/// ```rust
/// use kinema_core::{Loop, LoopConfig, ManualScheduler};
/// use std::sync::Arc;
///
/// let scheduler = ManualScheduler::new();
/// let animation = Loop::new(LoopConfig {
///     scheduler: Some(Arc::new(scheduler.clone())),
///     ..LoopConfig::default()
/// })
/// .unwrap();
///
/// animation.on_update(|tick| println!("frame {}", tick.frame_count));
/// animation.start();
/// scheduler.fire_frame();
/// assert_eq!(animation.frame_count(), 1);
/// ```
#[derive(Clone)]
pub struct Loop {
    core: Arc<LoopCore>,
}

impl Loop {
    /// Builds a loop from `config`.
    ///
    /// Fails fast when no scheduling provider is resolvable or the fps
    /// ceiling is not a number; a loop that could never tick is a
    /// configuration error, not a runtime surprise.
    pub fn new(config: LoopConfig) -> Result<Self, ConfigError> {
        let LoopConfig {
            fps,
            delay,
            fixed_delta,
            scheduler,
            clock,
            counter,
        } = config;

        if let Some(value) = fps {
            if value.is_nan() {
                return Err(ConfigError::InvalidFps { value });
            }
        }
        let provider = scheduler
            .or_else(sched::default_scheduler)
            .ok_or(ConfigError::MissingScheduler)?;
        let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()) as Arc<dyn Clock>);
        let counter = counter.unwrap_or_else(RunningCounter::global);

        let fps_limit = normalize_fps(fps.unwrap_or(f64::INFINITY));
        let now_ms = clock.now_ms();
        let state = LoopState {
            running: false,
            completed: false,
            disposed: false,
            frame_count: 0,
            delta_time: 0.0,
            elapsed_time: 0.0,
            fps_limit,
            fixed_delta,
            start_delay: delay,
            last_tick_ms: None,
            gate: UpdateGate::new(fps_limit, now_ms),
            pending: None,
        };

        Ok(Self {
            core: Arc::new(LoopCore {
                state: Mutex::new(state),
                scheduler: Mutex::new(SchedulerCell {
                    provider,
                    version: 0,
                }),
                emitter: LoopEmitter::new(),
                clock,
                counter,
            }),
        })
    }

    // --- Lifecycle -------------------------------------------------------

    /// Starts the loop.
    ///
    /// No-op while running, while completed (call [`reset`](Loop::reset)
    /// first), while disposed, or while an earlier delayed engagement is
    /// still pending. With a configured start delay the entire engagement
    /// (counter increment, `Start` event, frame scheduling) is deferred;
    /// the loop does not count as running until the deferred callback
    /// executes.
    pub fn start(&self) {
        let mut state = self.core.lock_state();
        if state.running {
            log::debug!("Loop: start() ignored, already running.");
            return;
        }
        if state.completed {
            log::debug!("Loop: start() ignored, completed until reset().");
            return;
        }
        if state.disposed {
            log::debug!("Loop: start() ignored, disposed.");
            return;
        }
        if state.pending.is_some() {
            log::debug!("Loop: start() ignored, engagement already pending.");
            return;
        }

        if state.start_delay.is_zero() {
            drop(state);
            LoopCore::engage(&self.core);
        } else {
            let (provider, _) = self.core.scheduler_snapshot();
            let weak = Arc::downgrade(&self.core);
            let callback: FrameCallback = Box::new(move || {
                let Some(core) = weak.upgrade() else { return };
                core.lock_state().pending = None;
                LoopCore::engage(&core);
            });
            let handle = provider.request_after(state.start_delay, callback);
            state.pending = Some(PendingFrame { handle, provider });
        }
    }

    /// Stops the loop without marking it complete.
    ///
    /// Decrements the running counter and cancels the in-flight frame
    /// request. While not running this never touches the counter, but it
    /// still cancels a pending delayed engagement.
    pub fn stop(&self) {
        LoopCore::stop(&self.core);
    }

    /// Stops the loop and marks it complete.
    ///
    /// The loop cannot be started again until [`reset`](Loop::reset).
    pub fn complete(&self) {
        LoopCore::stop(&self.core);
        let info = {
            let mut state = self.core.lock_state();
            state.completed = true;
            state.snapshot()
        };
        self.core.emitter.emit(LoopEvent::Complete, info);
    }

    /// Stops the loop and zeroes the frame counter, delta, elapsed time,
    /// and completion flag. Listeners stay attached.
    pub fn reset(&self) {
        LoopCore::stop(&self.core);
        {
            let mut state = self.core.lock_state();
            state.completed = false;
            state.frame_count = 0;
            state.delta_time = 0.0;
            state.elapsed_time = 0.0;
            state.last_tick_ms = None;
        }
        self.core.emitter.emit(LoopEvent::Reset, TickInfo::default());
    }

    /// Stops the loop and detaches every listener.
    ///
    /// Afterwards all emits and subscriptions are no-ops; the handle keeps
    /// its inspectable counters but can no longer be started.
    pub fn dispose(&self) {
        LoopCore::stop(&self.core);
        self.core.lock_state().disposed = true;
        self.core.emitter.close();
    }

    /// Runs exactly one update tick, outside the scheduled loop.
    ///
    /// Increments the frame counter, computes the delta (0 on the first
    /// tick after a start; synthesized in fixed-delta mode), advances the
    /// elapsed time, and emits `Update`. Does not check `running` and does
    /// not schedule anything.
    pub fn update(&self) {
        LoopCore::update(&self.core);
    }

    // --- Inspection ------------------------------------------------------

    /// Whether the loop is between a successful start and a stop.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.lock_state().running
    }

    /// Whether the loop was marked complete and not yet reset.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.core.lock_state().completed
    }

    /// Number of completed update ticks since creation or the last reset.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.core.lock_state().frame_count
    }

    /// Milliseconds between the last two updates.
    #[must_use]
    pub fn delta_time(&self) -> f64 {
        self.core.lock_state().delta_time
    }

    /// Cumulative milliseconds across updates since start or the last
    /// reset. Frozen while stopped.
    #[must_use]
    pub fn elapsed_time(&self) -> f64 {
        self.core.lock_state().elapsed_time
    }

    /// Measured frames per second, derived from the last delta. 0 before
    /// the first measured tick.
    #[must_use]
    pub fn fps(&self) -> f64 {
        let delta_time = self.core.lock_state().delta_time;
        if delta_time > 0.0 {
            1000.0 / delta_time
        } else {
            0.0
        }
    }

    /// The configured fps ceiling; [`f64::INFINITY`] when unbounded.
    #[must_use]
    pub fn fps_limit(&self) -> f64 {
        self.core.lock_state().fps_limit
    }

    /// Sets the fps ceiling and rebuilds the throttle gate.
    ///
    /// Non-positive and non-finite values mean unbounded; `NaN` is
    /// normalized with a warning.
    pub fn set_fps(&self, fps: f64) {
        if fps.is_nan() {
            log::warn!("Loop: set_fps(NaN) treated as unbounded.");
        }
        let now_ms = self.core.clock.now_ms();
        let mut state = self.core.lock_state();
        state.fps_limit = normalize_fps(fps);
        state.gate = UpdateGate::new(state.fps_limit, now_ms);
    }

    /// The current frame-scheduling provider.
    #[must_use]
    pub fn scheduler(&self) -> Arc<dyn FrameScheduler> {
        self.core.scheduler_snapshot().0
    }

    /// Swaps the frame-scheduling provider.
    ///
    /// Safe mid-loop: the in-flight frame request detects the swap when it
    /// fires and re-engages through the new provider before updating.
    pub fn set_scheduler(&self, provider: Arc<dyn FrameScheduler>) {
        let mut cell = self
            .core
            .scheduler
            .lock()
            .expect(SCHEDULER_POISONED);
        cell.provider = provider;
        cell.version += 1;
        log::debug!("Loop: scheduler swapped (version {}).", cell.version);
    }

    // --- Subscriptions ---------------------------------------------------

    /// Registers `listener` for every occurrence of `event`.
    pub fn on(
        &self,
        event: LoopEvent,
        listener: impl FnMut(TickInfo) + Send + 'static,
    ) -> ListenerId {
        self.core.emitter.register(event, Box::new(listener), false)
    }

    /// Registers `listener` for the next occurrence of `event` only.
    pub fn once(
        &self,
        event: LoopEvent,
        listener: impl FnMut(TickInfo) + Send + 'static,
    ) -> ListenerId {
        self.core.emitter.register(event, Box::new(listener), true)
    }

    /// Detaches a listener. Returns whether it was still registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.core.emitter.off(id)
    }

    /// Detaches every listener, keeping the loop usable.
    pub fn remove_all_listeners(&self) {
        self.core.emitter.remove_all();
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: LoopEvent) -> usize {
        self.core.emitter.listener_count(event)
    }

    /// Registers a listener for `Start` events.
    pub fn on_start(&self, listener: impl FnMut(TickInfo) + Send + 'static) -> ListenerId {
        self.on(LoopEvent::Start, listener)
    }

    /// Registers a listener for `Stop` events.
    pub fn on_stop(&self, listener: impl FnMut(TickInfo) + Send + 'static) -> ListenerId {
        self.on(LoopEvent::Stop, listener)
    }

    /// Registers a listener for `Complete` events.
    pub fn on_complete(&self, listener: impl FnMut(TickInfo) + Send + 'static) -> ListenerId {
        self.on(LoopEvent::Complete, listener)
    }

    /// Registers a listener for `Reset` events.
    pub fn on_reset(&self, listener: impl FnMut(TickInfo) + Send + 'static) -> ListenerId {
        self.on(LoopEvent::Reset, listener)
    }

    /// Registers a listener for `Update` events.
    pub fn on_update(&self, listener: impl FnMut(TickInfo) + Send + 'static) -> ListenerId {
        self.on(LoopEvent::Update, listener)
    }

    /// Opens a channel-backed subscription over every event of this loop.
    #[must_use]
    pub fn events(&self) -> TickStream {
        TickStream::attach(&self.core.emitter)
    }
}

impl fmt::Debug for Loop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.lock_state();
        f.debug_struct("Loop")
            .field("running", &state.running)
            .field("completed", &state.completed)
            .field("frame_count", &state.frame_count)
            .field("delta_time", &state.delta_time)
            .field("elapsed_time", &state.elapsed_time)
            .field("fps_limit", &state.fps_limit)
            .finish()
    }
}

impl LoopState {
    fn snapshot(&self) -> TickInfo {
        TickInfo {
            delta_time: self.delta_time,
            elapsed_time: self.elapsed_time,
            frame_count: self.frame_count,
        }
    }
}

impl LoopCore {
    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().expect(STATE_POISONED)
    }

    fn scheduler_snapshot(&self) -> (Arc<dyn FrameScheduler>, u64) {
        let cell = self.scheduler.lock().expect(SCHEDULER_POISONED);
        (Arc::clone(&cell.provider), cell.version)
    }

    /// Actually begins the loop: counter, `Start` event, first frame
    /// request. Runs synchronously from `start()` or from the deferred
    /// engagement callback.
    fn engage(core: &Arc<LoopCore>) {
        let (info, provider, version) = {
            let mut state = core.lock_state();
            if state.running || state.completed || state.disposed {
                return;
            }
            state.running = true;
            state.delta_time = 0.0;
            state.last_tick_ms = None;
            core.counter.increment();
            let (provider, version) = core.scheduler_snapshot();
            (
                TickInfo {
                    delta_time: 0.0,
                    elapsed_time: 0.0,
                    frame_count: state.frame_count,
                },
                provider,
                version,
            )
        };
        log::trace!("Loop: engaged.");
        core.emitter.emit(LoopEvent::Start, info);

        // A start listener may have stopped the loop synchronously, or
        // stopped and re-engaged it; in both cases the first frame is no
        // longer this call's to request.
        let mut state = core.lock_state();
        if !state.running || state.pending.is_some() {
            return;
        }
        let handle = provider.request(Self::frame_callback(core, version));
        state.pending = Some(PendingFrame { handle, provider });
    }

    fn frame_callback(core: &Arc<LoopCore>, version: u64) -> FrameCallback {
        let weak = Arc::downgrade(core);
        Box::new(move || {
            if let Some(core) = weak.upgrade() {
                LoopCore::draw_frame(&core, version);
            }
        })
    }

    /// One iteration of the tail-scheduled continuation: throttle, update,
    /// then either re-post or fall silent.
    fn draw_frame(core: &Arc<LoopCore>, engaged_version: u64) {
        let ready = {
            let mut state = core.lock_state();
            // A stray fire after stop() is a guaranteed no-op. The pending
            // slot is left alone: it may already belong to a new delayed
            // engagement.
            if !state.running {
                return;
            }
            // This fire consumes its own request; the slot now tracks
            // whatever gets scheduled next.
            state.pending = None;
            let (provider, version) = core.scheduler_snapshot();
            if version != engaged_version {
                // The provider was swapped since this frame was requested;
                // re-engage through the new one before updating, so the
                // update runs in the new provider's execution context.
                log::trace!("Loop: scheduler swap detected, re-requesting frame.");
                let handle = provider.request(Self::frame_callback(core, version));
                state.pending = Some(PendingFrame { handle, provider });
                return;
            }
            state.gate.ready(core.clock.now_ms())
        };

        if ready {
            Self::update(core);
        } else {
            log::trace!("Loop: frame skipped by throttle.");
        }

        // Re-post, unless an update listener stopped the loop synchronously
        // (then there is nothing to keep alive), or stopped and re-engaged
        // it (then the new engagement owns the next frame).
        let mut state = core.lock_state();
        if state.running && state.pending.is_none() {
            let (provider, version) = core.scheduler_snapshot();
            let handle = provider.request(Self::frame_callback(core, version));
            state.pending = Some(PendingFrame { handle, provider });
        }
    }

    fn update(core: &Arc<LoopCore>) {
        let info = {
            let mut state = core.lock_state();
            state.frame_count += 1;
            let now_ms = core.clock.now_ms();
            let fixed = state.fixed_delta || counter::global_fixed_delta();
            state.delta_time = if fixed {
                1000.0 / state.fps_limit.min(NATIVE_RATE_HZ)
            } else {
                match state.last_tick_ms {
                    Some(last_ms) => now_ms - last_ms,
                    None => 0.0,
                }
            };
            state.elapsed_time += state.delta_time;
            state.last_tick_ms = Some(now_ms);
            state.snapshot()
        };
        core.emitter.emit(LoopEvent::Update, info);
    }

    /// Shared stop transition; `complete()` and `reset()` run it first.
    fn stop(core: &Arc<LoopCore>) {
        let info = {
            let mut state = core.lock_state();
            if !state.running {
                if let Some(pending) = state.pending.take() {
                    pending.provider.cancel(pending.handle);
                    log::debug!("Loop: pending engagement cancelled before it fired.");
                }
                return;
            }
            state.running = false;
            core.counter.decrement();
            if let Some(pending) = state.pending.take() {
                pending.provider.cancel(pending.handle);
            }
            state.snapshot()
        };
        core.emitter.emit(LoopEvent::Stop, info);
    }
}

impl Drop for LoopCore {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pending) = state.pending.take() {
            pending.provider.cancel(pending.handle);
        }
        if state.running {
            state.running = false;
            self.counter.decrement();
        }
    }
}

/// Non-positive and non-finite ceilings mean unbounded.
fn normalize_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        f64::INFINITY
    }
}
