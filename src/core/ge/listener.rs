// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! OS-side collaborator
//!
//! The command processor reports list milestones (signals, finishes,
//! completion), list faults and device loss through [`GeListener`]. The
//! HLE layer uses these to run guest callbacks and wake threads blocked on
//! list or draw sync.

use super::display_list::{ListId, SignalBehaviour};
use crate::core::error::ListFault;
use serde::Serialize;

/// Receiver of GE milestone notifications
///
/// Every method has an empty default.
pub trait GeListener {
    /// SIGNAL+END reached with a handler behaviour
    fn on_signal(&mut self, _list: ListId, _token: u16, _behaviour: SignalBehaviour) {}

    /// FINISH+END reached
    fn on_finish(&mut self, _list: ListId, _token: u16) {}

    /// A list reached `Completed`; threads waiting on it can wake
    fn on_list_complete(&mut self, _list: ListId) {}

    /// A list was ended by a fault
    fn on_list_fault(&mut self, _list: ListId, _fault: ListFault) {}

    /// The queue drained; draw-sync waiters can wake
    fn on_draw_complete(&mut self) {}

    /// The render device was lost and caches were dropped
    fn on_device_lost(&mut self) {}
}

/// Listener that ignores everything
#[derive(Debug, Default)]
pub struct NullListener;

impl GeListener for NullListener {}

/// A notification observed by [`RecordingListener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListenerEvent {
    Signal {
        list: ListId,
        token: u16,
        behaviour: SignalBehaviour,
    },
    Finish {
        list: ListId,
        token: u16,
    },
    ListComplete(ListId),
    ListFault {
        list: ListId,
        fault: ListFault,
    },
    DrawComplete,
    DeviceLost,
}

/// Listener that records every notification into a shared log
///
/// The log is shared so tests can keep a handle after the listener has been
/// boxed into the processor.
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    events: std::sync::Arc<std::sync::Mutex<Vec<ListenerEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far
    pub fn events(&self) -> Vec<ListenerEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, event: ListenerEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl GeListener for RecordingListener {
    fn on_signal(&mut self, list: ListId, token: u16, behaviour: SignalBehaviour) {
        self.push(ListenerEvent::Signal {
            list,
            token,
            behaviour,
        });
    }

    fn on_finish(&mut self, list: ListId, token: u16) {
        self.push(ListenerEvent::Finish { list, token });
    }

    fn on_list_complete(&mut self, list: ListId) {
        self.push(ListenerEvent::ListComplete(list));
    }

    fn on_list_fault(&mut self, list: ListId, fault: ListFault) {
        self.push(ListenerEvent::ListFault { list, fault });
    }

    fn on_draw_complete(&mut self) {
        self.push(ListenerEvent::DrawComplete);
    }

    fn on_device_lost(&mut self) {
        self.push(ListenerEvent::DeviceLost);
    }
}
