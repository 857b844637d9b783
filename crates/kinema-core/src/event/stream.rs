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

use super::emitter::{LoopEmitter, LoopEvent, TickInfo};

/// A channel-backed subscription over a loop's events.
///
/// Every emitted `(event, tick)` pair is forwarded into an unbounded flume
/// channel; the stream wraps the receiving end. This suits consumers that
/// poll or block on another thread instead of registering callbacks — the
/// emitting thread never blocks on a slow consumer.
///
/// Dropping the stream disconnects the channel; subsequent forwards are
/// discarded.
#[derive(Debug)]
pub struct TickStream {
    receiver: flume::Receiver<(LoopEvent, TickInfo)>,
}

impl TickStream {
    /// Forwards every event of `emitter` into a fresh channel.
    pub(crate) fn attach(emitter: &LoopEmitter) -> Self {
        let (sender, receiver) = flume::unbounded();
        for event in LoopEvent::ALL {
            let sender = sender.clone();
            emitter.register(
                event,
                Box::new(move |info| {
                    if sender.send((event, info)).is_err() {
                        log::trace!("TickStream: receiver dropped, '{event}' discarded.");
                    }
                }),
                false,
            );
        }
        Self { receiver }
    }

    /// Blocks until the next event arrives.
    ///
    /// Fails only when every forwarding listener is gone (the loop was
    /// disposed or its listeners removed) and the channel drained.
    pub fn recv(&self) -> Result<(LoopEvent, TickInfo), flume::RecvError> {
        self.receiver.recv()
    }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&self) -> Result<(LoopEvent, TickInfo), flume::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Blocking iterator over incoming events.
    pub fn iter(&self) -> flume::Iter<'_, (LoopEvent, TickInfo)> {
        self.receiver.iter()
    }

    /// The underlying receiver, for `select`-style composition.
    #[must_use]
    pub fn receiver(&self) -> &flume::Receiver<(LoopEvent, TickInfo)> {
        &self.receiver
    }

    /// Number of events queued and not yet received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
