// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Memory-watch tests

use super::helpers::*;
use crate::core::memory::WatchKind;

#[test]
fn test_overlapping_write_records_hit() {
    let mut mem = create_test_memory();
    mem.watch_mut().add(0x08000100, 0x10, WatchKind::Write);

    mem.notify_access(0x080000F8, 0x10, true, "test");

    assert_eq!(mem.watch().checks()[0].hits, 1);
    assert_eq!(mem.watch().hits().len(), 1);
    assert_eq!(mem.watch().hits()[0].address, 0x080000F8);
}

#[test]
fn test_kind_filters_accesses() {
    let mut mem = create_test_memory();
    mem.watch_mut().add(0x08000100, 0x10, WatchKind::Write);

    // Reads do not trigger a write check
    mem.notify_access(0x08000100, 4, false, "test");
    assert_eq!(mem.watch().checks()[0].hits, 0);
}

#[test]
fn test_mirror_addresses_hit_same_check() {
    let mut mem = create_test_memory();
    mem.watch_mut().add(0x08000100, 0x10, WatchKind::ReadWrite);

    mem.notify_access(0x48000104, 4, false, "test");
    assert_eq!(mem.watch().checks()[0].hits, 1);
}

#[test]
fn test_disjoint_range_is_ignored() {
    let mut mem = create_test_memory();
    mem.watch_mut().add(0x08000100, 0x10, WatchKind::ReadWrite);

    mem.notify_access(0x08000110, 4, true, "test");
    assert!(mem.watch().hits().is_empty());

    mem.watch_mut().clear();
    assert!(!mem.watch().is_active());
}
