// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Helper functions for memory tests

use super::*;

/// Creates a small GuestMemory instance for testing
#[allow(dead_code)]
pub fn create_test_memory() -> GuestMemory {
    GuestMemory::with_ram_size(0x0010_0000)
}

/// Fills a range with an incrementing byte pattern
#[allow(dead_code)]
pub fn fill_pattern(mem: &mut GuestMemory, address: u32, len: u32) {
    let bytes = mem.slice_mut(address, len).unwrap();
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = i as u8;
    }
}
