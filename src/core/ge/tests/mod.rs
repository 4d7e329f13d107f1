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

//! GE module tests
//!
//! Tests are organized into the following modules:
//! - `dispatch`: table construction and flag semantics
//! - `run_loop`: diff handling, flushing and fast/slow path equivalence
//! - `flow`: CALL/RET, jumps, signals, stall and FINISH
//! - `processor`: the display list queue API
//! - `draw`: PRIM, patches, bounding boxes, immediate vertices, palettes
//! - `engine`: matrices, block transfers, memory operations, device loss

mod processor;
mod run_loop;

use super::*;
use crate::core::config::GeConfig;
use crate::core::error::ListFault;
use crate::core::memory::GuestMemory;

/// Address lists are written to
pub(super) const LIST: u32 = 0x0880_0000;

pub(super) fn cmd(opcode: u8, payload: u32) -> u32 {
    CommandWord::new(opcode, payload).0
}

/// FINISH + END
pub(super) fn finish() -> [u32; 2] {
    [cmd(opcodes::FINISH, 0), cmd(opcodes::END, 0)]
}

/// Processor with a recording backend and listener
pub(super) struct Harness {
    pub ge: GeProcessor<RecordingBackend>,
    pub mem: GuestMemory,
    pub listener: RecordingListener,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(GeConfig::default(), RecordingBackend::new())
    }

    pub fn with_config(config: GeConfig) -> Self {
        Self::with(config, RecordingBackend::new())
    }

    pub fn with(config: GeConfig, backend: RecordingBackend) -> Self {
        let listener = RecordingListener::new();
        let ge = GeProcessor::new(config, backend, Box::new(listener.clone())).unwrap();
        Self {
            ge,
            mem: GuestMemory::new(),
            listener,
        }
    }

    pub fn load(&mut self, address: u32, words: &[u32]) {
        self.mem.write_words(address, words).unwrap();
    }

    /// Write `words` at [`LIST`], enqueue and run them to completion
    pub fn run_list(&mut self, words: &[u32]) -> ListId {
        self.load(LIST, words);
        let id = self.ge.enqueue(&self.mem, LIST, 0, false).unwrap();
        self.ge.run(&mut self.mem, 100_000);
        id
    }

    pub fn backend(&self) -> &RecordingBackend {
        self.ge.engine().backend()
    }

    pub fn state(&self, id: ListId) -> ListState {
        self.ge.list(id).unwrap().state
    }
}
