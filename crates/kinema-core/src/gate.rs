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

//! Frame-rate throttling below the host's native cadence.
//!
//! The gate never forces extra ticks; it only skips scheduled frames that
//! arrive too early, so the loop's cadence keeps tracking the host
//! scheduler's natural rhythm.

/// Native cadence the gate assumes, in Hz.
pub const NATIVE_RATE_HZ: f64 = 60.0;

/// Half of one native frame interval: `ceil(1000 / 60) / 2`, in
/// milliseconds.
///
/// A frame landing within this window of the target interval counts as on
/// time. Without the tolerance, scheduler jitter would make frames that
/// arrive marginally early miss their slot forever.
pub const HALF_NATIVE_FRAME_MS: f64 = 8.5;

/// Decides, per scheduled frame, whether enough time has passed to run an
/// update.
///
/// Rebuilt whenever the fps limit changes. Unbounded, non-positive, and
/// non-finite limits accept every frame.
#[derive(Debug, Clone)]
pub struct UpdateGate {
    min_interval_ms: Option<f64>,
    last_accept_ms: f64,
}

impl UpdateGate {
    /// Builds a gate for `fps`, with `now_ms` as the acceptance baseline.
    #[must_use]
    pub fn new(fps: f64, now_ms: f64) -> Self {
        let min_interval_ms = if fps.is_finite() && fps > 0.0 {
            Some(1000.0 / fps)
        } else {
            None
        };
        Self {
            min_interval_ms,
            last_accept_ms: now_ms,
        }
    }

    /// Whether the gate imposes any limit at all.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.min_interval_ms.is_some()
    }

    /// Accepts or skips a frame arriving at `now_ms`.
    ///
    /// On acceptance the frame becomes the new baseline for the next
    /// interval.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        let Some(interval) = self.min_interval_ms else {
            return true;
        };
        if now_ms - self.last_accept_ms < interval - HALF_NATIVE_FRAME_MS {
            return false;
        }
        self.last_accept_ms = now_ms;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_gate_accepts_everything() {
        for fps in [f64::INFINITY, 0.0, -5.0, f64::NAN] {
            let mut gate = UpdateGate::new(fps, 0.0);
            assert!(!gate.is_bounded());
            for frame in 0..10 {
                assert!(gate.ready(frame as f64), "fps {fps} frame {frame}");
            }
        }
    }

    #[test]
    fn bounded_gate_skips_early_frames() {
        // 30 fps -> 33.33ms interval, acceptance threshold 24.83ms.
        let mut gate = UpdateGate::new(30.0, 0.0);
        assert!(gate.is_bounded());

        assert!(!gate.ready(16.67), "one native frame in is too early");
        assert!(gate.ready(33.33), "a full interval later is accepted");
        assert!(!gate.ready(50.0), "16.67ms after acceptance is too early");
        assert!(gate.ready(66.67));
    }

    #[test]
    fn tolerance_window_counts_as_on_time() {
        let mut gate = UpdateGate::new(30.0, 0.0);
        let threshold = 1000.0 / 30.0 - HALF_NATIVE_FRAME_MS;

        assert!(!gate.ready(threshold - 0.01));
        assert!(gate.ready(threshold), "exactly the threshold is on time");
    }

    #[test]
    fn acceptance_resets_the_baseline() {
        let mut gate = UpdateGate::new(10.0, 0.0);
        assert!(gate.ready(100.0));
        // 100ms interval: the next slot is measured from 100, not from 0.
        assert!(!gate.ready(150.0));
        assert!(gate.ready(200.0));
    }
}
