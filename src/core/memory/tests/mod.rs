// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Guest Memory Tests
//!
//! - `basic`: construction, reset and region identification
//! - `access`: bounds-checked reads/writes, rounding of unaligned accesses
//! - `regions`: segment mirrors and VRAM mirror windows
//! - `watch`: memory-watch checks
//! - `helpers`: Common test utilities

use super::*;
use crate::core::memory::MemoryRegion;

mod access;
mod helpers;
mod regions;
mod watch;
