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

//! # Kinema Core
//!
//! Foundational crate for the kinema animation loop: the lifecycle state
//! machine, the frame-scheduling and clock contracts, event types, and the
//! shared running-instance counter.
//!
//! A [`Loop`] wraps a [`FrameScheduler`] behind a start/stop/complete/reset
//! lifecycle, counts frames, tracks delta and elapsed time, and can throttle
//! updates below the host's native frame rate. Concrete schedulers live in
//! higher-level crates; this crate only ships the deterministic
//! [`ManualScheduler`] used for tests and offline stepping.

#![warn(missing_docs)]

pub mod counter;
pub mod error;
pub mod event;
pub mod gate;
pub mod runner;
pub mod sched;
pub mod time;

pub use counter::{
    global_fixed_delta, running_instances, set_global_fixed_delta, RunningCounter,
};
pub use error::ConfigError;
pub use event::{ListenerId, LoopEvent, TickInfo, TickStream};
pub use runner::{Loop, LoopConfig};
pub use sched::{
    default_scheduler, install_default_scheduler, FrameCallback, FrameHandle, FrameScheduler,
    ManualScheduler,
};
pub use time::{Clock, ManualClock, MonotonicClock};
