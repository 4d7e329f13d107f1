// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Address translation and mirror tests

use super::*;

#[test]
fn test_segment_mirrors() {
    let mut mem = GuestMemory::new();

    mem.write_u32(0x08800000, 0x11223344).unwrap();

    // Uncached and kernel views alias the same RAM
    assert_eq!(mem.read_u32(0x48800000).unwrap(), 0x11223344);
    assert_eq!(mem.read_u32(0x88800000).unwrap(), 0x11223344);
    assert_eq!(mem.read_u32(0xC8800000).unwrap(), 0x11223344);
}

#[test]
fn test_vram_mirrors() {
    let mut mem = GuestMemory::new();

    mem.write_u32(0x04000040, 0xCAFEF00D).unwrap();

    assert_eq!(mem.read_u32(0x04200040).unwrap(), 0xCAFEF00D);
    assert_eq!(mem.read_u32(0x04600040).unwrap(), 0xCAFEF00D);
    assert!(mem.is_vram_address(0x047FFFFF));
    assert!(!mem.is_vram_address(0x04800000));
}

#[test]
fn test_vram_ranges_do_not_wrap_into_next_mirror() {
    let mem = GuestMemory::new();

    assert!(mem.is_valid_range(0x041FFFF0, 0x10));
    assert!(!mem.is_valid_range(0x041FFFF0, 0x20));
}
