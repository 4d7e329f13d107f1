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

//! Custom assertions for GE testing

use gerx::core::ge::{GeProcessor, ListId, ListState, RenderBackend};
use gerx::core::memory::GuestMemory;

/// Assert a list has reached the expected state
#[allow(dead_code)]
pub fn assert_list_state<B: RenderBackend>(ge: &GeProcessor<B>, id: ListId, expected: ListState) {
    let actual = ge.list(id).expect("Invalid list id").state;
    assert_eq!(
        actual, expected,
        "List {} state mismatch: expected {:?}, got {:?}",
        id, expected, actual
    );
}

/// Assert the payload of a command slot
#[allow(dead_code)]
pub fn assert_payload<B: RenderBackend>(ge: &GeProcessor<B>, opcode: u8, expected: u32) {
    let actual = ge.engine().registers().payload(opcode);
    assert_eq!(
        actual, expected,
        "Slot 0x{:02X} mismatch: expected 0x{:06X}, got 0x{:06X}",
        opcode, expected, actual
    );
}

/// Assert memory contains expected value at address
#[allow(dead_code)]
pub fn assert_memory_word(mem: &GuestMemory, addr: u32, expected: u32) {
    let actual = mem.read_u32(addr).expect("Failed to read memory");
    assert_eq!(
        actual, expected,
        "Memory at 0x{:08X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        addr, expected, actual
    );
}
