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

//! Timer-thread frame source.
//!
//! The [`TimerScheduler`] runs a background thread ticking at a fixed
//! cadence (60 Hz unless configured otherwise). Each tick fires, as one
//! batch, every frame callback requested before it — the same
//! one-request-per-frame semantics a display callback provides. Delayed
//! requests fire once their deadline passes, off the frame cadence.

use flume::{Receiver, RecvTimeoutError, Sender};
use kinema_core::{FrameCallback, FrameHandle, FrameScheduler};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default cadence, matching the conventional display refresh rate.
const DEFAULT_RATE_HZ: f64 = 60.0;

/// An error raised while constructing a [`TimerScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub enum TimerSchedulerError {
    /// The requested cadence is not a positive, finite frequency.
    InvalidRate {
        /// The rejected value, in Hz.
        rate: f64,
    },
    /// The worker thread could not be spawned.
    SpawnFailed {
        /// The underlying OS error.
        details: String,
    },
}

impl fmt::Display for TimerSchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerSchedulerError::InvalidRate { rate } => {
                write!(f, "Invalid timer rate: {rate} Hz is not a positive, finite frequency.")
            }
            TimerSchedulerError::SpawnFailed { details } => {
                write!(f, "Failed to spawn the timer worker thread: {details}")
            }
        }
    }
}

impl std::error::Error for TimerSchedulerError {}

enum Command {
    Request {
        handle: FrameHandle,
        callback: FrameCallback,
    },
    RequestAfter {
        handle: FrameHandle,
        due: Instant,
        callback: FrameCallback,
    },
    Cancel {
        handle: FrameHandle,
    },
    Shutdown,
}

/// A [`FrameScheduler`] backed by a dedicated timer thread.
///
/// Requests are forwarded to the worker over a channel; the worker owns the
/// pending queues and fires callbacks on its own thread. Dropping the
/// scheduler shuts the worker down and joins it.
pub struct TimerScheduler {
    commands: Sender<Command>,
    next_handle: AtomicU64,
    rate: f64,
    worker: Option<thread::JoinHandle<()>>,
}

impl TimerScheduler {
    /// Creates a scheduler ticking at the default 60 Hz cadence.
    pub fn new() -> Result<Self, TimerSchedulerError> {
        Self::with_rate(DEFAULT_RATE_HZ)
    }

    /// Creates a scheduler ticking at `rate` Hz.
    ///
    /// Fails fast on a non-positive or non-finite rate; a scheduler that
    /// could never tick is a configuration error.
    pub fn with_rate(rate: f64) -> Result<Self, TimerSchedulerError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TimerSchedulerError::InvalidRate { rate });
        }
        let interval = Duration::from_secs_f64(1.0 / rate);
        let (commands, inbox) = flume::unbounded();
        let worker = thread::Builder::new()
            .name("kinema-timer".into())
            .spawn(move || worker_loop(&inbox, interval))
            .map_err(|e| TimerSchedulerError::SpawnFailed {
                details: e.to_string(),
            })?;
        Ok(Self {
            commands,
            next_handle: AtomicU64::new(1),
            rate,
            worker: Some(worker),
        })
    }

    /// Builds a scheduler at the default cadence and installs it as the
    /// process-wide default provider.
    pub fn install_as_default() -> Result<std::sync::Arc<TimerScheduler>, TimerSchedulerError> {
        let scheduler = std::sync::Arc::new(Self::new()?);
        let provider: std::sync::Arc<dyn FrameScheduler> = scheduler.clone();
        kinema_core::install_default_scheduler(provider);
        Ok(scheduler)
    }

    /// The configured cadence, in Hz.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn mint(&self) -> FrameHandle {
        FrameHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::error!("TimerScheduler: worker gone, command dropped.");
        }
    }
}

impl FrameScheduler for TimerScheduler {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let handle = self.mint();
        self.send(Command::Request { handle, callback });
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        self.send(Command::Cancel { handle });
    }

    fn request_after(&self, delay: Duration, callback: FrameCallback) -> FrameHandle {
        let handle = self.mint();
        self.send(Command::RequestAfter {
            handle,
            due: Instant::now() + delay,
            callback,
        });
        handle
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("rate", &self.rate)
            .finish()
    }
}

struct WorkerQueues {
    frames: Vec<(FrameHandle, FrameCallback)>,
    delayed: Vec<(FrameHandle, Instant, FrameCallback)>,
}

impl WorkerQueues {
    /// Returns `true` when the worker should shut down.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Request { handle, callback } => {
                self.frames.push((handle, callback));
                false
            }
            Command::RequestAfter {
                handle,
                due,
                callback,
            } => {
                self.delayed.push((handle, due, callback));
                false
            }
            Command::Cancel { handle } => {
                self.frames.retain(|(pending, _)| *pending != handle);
                self.delayed.retain(|(pending, _, _)| *pending != handle);
                false
            }
            Command::Shutdown => true,
        }
    }
}

fn worker_loop(inbox: &Receiver<Command>, interval: Duration) {
    let mut queues = WorkerQueues {
        frames: Vec::new(),
        delayed: Vec::new(),
    };
    let mut next_tick = Instant::now() + interval;
    log::debug!("TimerScheduler: worker started, interval {interval:?}.");

    loop {
        // Sleep until the frame tick, the earliest delayed deadline, or the
        // next command, whichever comes first.
        let wake = queues
            .delayed
            .iter()
            .map(|(_, due, _)| *due)
            .min()
            .map_or(next_tick, |due| due.min(next_tick));
        let timeout = wake.saturating_duration_since(Instant::now());

        let mut shutdown = match inbox.recv_timeout(timeout) {
            Ok(command) => queues.apply(command),
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        };
        while !shutdown {
            match inbox.try_recv() {
                Ok(command) => shutdown = queues.apply(command),
                Err(_) => break,
            }
        }
        if shutdown {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            // One host frame: everything requested before this tick fires
            // as a single batch.
            let batch = std::mem::take(&mut queues.frames);
            for (_, callback) in batch {
                callback();
            }
            next_tick += interval;
            if next_tick < now {
                // The thread fell behind; skip missed ticks rather than
                // bursting to catch up.
                next_tick = now + interval;
            }
        }

        if !queues.delayed.is_empty() {
            let (due, rest): (Vec<_>, Vec<_>) = queues
                .delayed
                .drain(..)
                .partition(|(_, deadline, _)| *deadline <= now);
            queues.delayed = rest;
            for (_, _, callback) in due {
                callback();
            }
        }
    }
    log::debug!("TimerScheduler: worker stopped.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rates_are_rejected() {
        for rate in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let result = TimerScheduler::with_rate(rate);
            assert!(
                matches!(result, Err(TimerSchedulerError::InvalidRate { .. })),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn error_display() {
        let err = TimerSchedulerError::InvalidRate { rate: -1.0 };
        assert_eq!(
            format!("{err}"),
            "Invalid timer rate: -1 Hz is not a positive, finite frequency."
        );
    }

    #[test]
    fn handles_are_unique() {
        let scheduler = TimerScheduler::new().expect("scheduler should start");
        let a = scheduler.request(Box::new(|| {}));
        let b = scheduler.request(Box::new(|| {}));
        assert_ne!(a, b);
    }
}
