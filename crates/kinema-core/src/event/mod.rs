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

//! Event types and subscription primitives for loop lifecycle notifications.
//!
//! Two complementary surfaces are provided. The synchronous listener
//! registry behind [`Loop::on`](crate::Loop::on) runs callbacks on the
//! emitting thread, in registration order, and is safe to re-enter (a
//! listener may stop or reconfigure the loop that is notifying it). The
//! channel-backed [`TickStream`] forwards every event into an unbounded
//! flume channel for consumers that poll instead of registering callbacks.

mod emitter;
mod stream;

pub use self::emitter::{ListenerId, LoopEvent, TickInfo};
pub use self::stream::TickStream;

pub(crate) use self::emitter::LoopEmitter;
