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

//! Test fixtures for common test scenarios

use gerx::core::config::GeConfig;
use gerx::core::ge::{GeProcessor, ListId, RecordingBackend, RecordingListener};
use gerx::core::memory::GuestMemory;

/// Address test lists are written to
#[allow(dead_code)]
pub const LIST: u32 = 0x0880_0000;

/// Address vertex data is written to
#[allow(dead_code)]
pub const VERTICES: u32 = 0x0881_0000;

/// Processor with a recording backend, its listener and guest memory
#[allow(dead_code)]
pub fn create_processor() -> (GeProcessor<RecordingBackend>, RecordingListener, GuestMemory) {
    create_processor_with(GeConfig::default())
}

/// Same as [`create_processor`] with a specific configuration
#[allow(dead_code)]
pub fn create_processor_with(
    config: GeConfig,
) -> (GeProcessor<RecordingBackend>, RecordingListener, GuestMemory) {
    let listener = RecordingListener::new();
    let mem = GuestMemory::with_ram_size(config.ram_size);
    let ge = GeProcessor::new(config, RecordingBackend::new(), Box::new(listener.clone()))
        .expect("Failed to create processor");
    (ge, listener, mem)
}

/// Write `words` at `address`, enqueue them and run until the queue blocks
#[allow(dead_code)]
pub fn run_list_at(
    ge: &mut GeProcessor<RecordingBackend>,
    mem: &mut GuestMemory,
    address: u32,
    words: &[u32],
) -> ListId {
    mem.write_words(address, words)
        .expect("Failed to write display list");
    let id = ge
        .enqueue(mem, address, 0, false)
        .expect("Failed to enqueue display list");
    ge.run(mem, 1_000_000);
    id
}

/// Three float-position vertices forming one triangle
#[allow(dead_code)]
pub fn load_triangle(mem: &mut GuestMemory, address: u32) {
    let coords: [f32; 9] = [0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0];
    let words: Vec<u32> = coords.iter().map(|c| c.to_bits()).collect();
    mem.write_words(address, &words)
        .expect("Failed to write vertices");
}
