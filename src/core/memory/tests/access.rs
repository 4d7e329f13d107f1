// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Read/write tests for guest memory

use super::helpers::*;
use crate::core::error::EmulatorError;

#[test]
fn test_word_access_is_little_endian() {
    let mut mem = create_test_memory();

    mem.write_u32(0x08000000, 0x12345678).unwrap();

    assert_eq!(mem.read_u8(0x08000000).unwrap(), 0x78);
    assert_eq!(mem.read_u8(0x08000003).unwrap(), 0x12);
    assert_eq!(mem.read_u16(0x08000000).unwrap(), 0x5678);
    assert_eq!(mem.read_u16(0x08000002).unwrap(), 0x1234);
}

#[test]
fn test_unaligned_reads_round_down() {
    let mut mem = create_test_memory();
    mem.write_u32(0x08000010, 0xAABBCCDD).unwrap();

    // Words round down to a 4-byte boundary
    assert_eq!(mem.read_u32(0x08000011).unwrap(), 0xAABBCCDD);
    assert_eq!(mem.read_u32(0x08000013).unwrap(), 0xAABBCCDD);

    // Halfwords round down to a 2-byte boundary
    assert_eq!(mem.read_u16(0x08000013).unwrap(), 0xAABB);
}

#[test]
fn test_read_past_end_of_region_fails() {
    let mem = create_test_memory();

    // Last full word is fine
    assert!(mem.read_u32(0x080FFFFC).is_ok());

    // Slices crossing the end of RAM are rejected
    let result = mem.slice(0x080FFFFE, 4);
    assert!(matches!(
        result,
        Err(EmulatorError::InvalidMemoryRange { address: 0x080FFFFE, size: 4 })
    ));
}

#[test]
fn test_valid_range_and_size() {
    let mem = create_test_memory();

    assert!(mem.is_valid_range(0x08000000, 0x0010_0000));
    assert!(!mem.is_valid_range(0x08000000, 0x0010_0001));
    assert!(mem.is_valid_range(0x08000000, 0));
    assert!(!mem.is_valid_range(0x00000000, 0));

    assert_eq!(mem.valid_size(0x080FFFF0, 0x100), 0x10);
    assert_eq!(mem.valid_size(0x00000000, 0x100), 0);
}

#[test]
fn test_write_words() {
    let mut mem = create_test_memory();

    mem.write_words(0x08000100, &[1, 2, 3]).unwrap();

    assert_eq!(mem.read_u32(0x08000100).unwrap(), 1);
    assert_eq!(mem.read_u32(0x08000104).unwrap(), 2);
    assert_eq!(mem.read_u32(0x08000108).unwrap(), 3);
}

#[test]
fn test_copy_within_region_overlapping() {
    let mut mem = create_test_memory();
    fill_pattern(&mut mem, 0x08000000, 16);

    // Overlapping forward copy behaves like memmove
    mem.copy(0x08000004, 0x08000000, 8).unwrap();

    assert_eq!(mem.slice(0x08000004, 8).unwrap(), &[0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_copy_across_regions() {
    let mut mem = create_test_memory();
    fill_pattern(&mut mem, 0x08000000, 32);

    mem.copy(0x04000000, 0x08000000, 32).unwrap();

    assert_eq!(
        mem.slice(0x04000000, 32).unwrap(),
        mem.slice(0x08000000, 32).unwrap()
    );
}

#[test]
fn test_copy_invalid_destination_writes_nothing() {
    let mut mem = create_test_memory();
    fill_pattern(&mut mem, 0x08000000, 16);

    assert!(mem.copy(0x0A000000, 0x08000000, 16).is_err());
    assert!(mem.copy(0x080FFFF8, 0x08000000, 16).is_err());

    // Tail of RAM untouched
    assert_eq!(mem.slice(0x080FFFF8, 8).unwrap(), &[0u8; 8]);
}

#[test]
fn test_fill() {
    let mut mem = create_test_memory();

    mem.fill(0x08000020, 0xAB, 6).unwrap();

    assert_eq!(mem.read_u8(0x0800001F).unwrap(), 0);
    assert_eq!(mem.slice(0x08000020, 6).unwrap(), &[0xAB; 6]);
    assert_eq!(mem.read_u8(0x08000026).unwrap(), 0);
}
