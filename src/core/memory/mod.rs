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

//! Guest memory arena for the GE command processor
//!
//! `GuestMemory` owns every byte the GE can address and exposes it only
//! through bounds-checked accessors that return a `Result`. Display lists,
//! vertex data, palettes and block transfers all go through it.
//!
//! # Memory Map
//!
//! | Address Range           | Region     | Size        | Notes                   |
//! |-------------------------|------------|-------------|-------------------------|
//! | 0x00010000-0x00013FFF   | Scratchpad | 16KB        |                         |
//! | 0x04000000-0x041FFFFF   | VRAM       | 2MB         | mirrored up to 0x047FFFFF |
//! | 0x08000000-...          | RAM        | 32MB (default) | size is configurable |
//!
//! The top two address bits select cached/uncached/kernel views of the same
//! memory and are ignored.
//!
//! # Alignment
//!
//! Unaligned halfword and word accesses never fail: the address is rounded
//! down to the access size before the lookup.
//!
//! # Example
//!
//! ```
//! use gerx::core::memory::GuestMemory;
//!
//! let mut mem = GuestMemory::new();
//!
//! mem.write_u32(0x0880_0000, 0x1234_5678).unwrap();
//!
//! // Uncached mirror of the same address
//! assert_eq!(mem.read_u32(0x4880_0000).unwrap(), 0x1234_5678);
//!
//! // Unaligned reads round down
//! assert_eq!(mem.read_u32(0x0880_0002).unwrap(), 0x1234_5678);
//! ```

use crate::core::error::{EmulatorError, Result};
use std::fs::File;
use std::io::Read;

mod region;
mod watch;

pub use region::MemoryRegion;
pub use watch::{MemCheck, MemoryWatch, WatchHit, WatchKind};

/// Guest memory owned by the GE core
pub struct GuestMemory {
    /// Main RAM
    ram: Vec<u8>,

    /// Video RAM (2MB, mirrored)
    vram: Vec<u8>,

    /// Scratchpad (16KB)
    scratchpad: Vec<u8>,

    /// Configured memory-watch checks
    watch: MemoryWatch,
}

impl GuestMemory {
    /// Scratchpad start address
    pub const SCRATCHPAD_START: u32 = 0x0001_0000;
    /// Scratchpad size in bytes
    pub const SCRATCHPAD_SIZE: u32 = 0x4000;

    /// VRAM start address
    pub const VRAM_START: u32 = 0x0400_0000;
    /// VRAM size in bytes
    pub const VRAM_SIZE: u32 = 0x0020_0000;
    /// End (exclusive) of the VRAM mirror window
    pub const VRAM_MIRROR_END: u32 = 0x0480_0000;

    /// RAM start address
    pub const RAM_START: u32 = 0x0800_0000;
    /// Default RAM size (32MB)
    pub const DEFAULT_RAM_SIZE: u32 = 0x0200_0000;
    /// Largest RAM size supported (64MB)
    pub const MAX_RAM_SIZE: u32 = 0x0400_0000;

    /// Create guest memory with the default RAM size
    pub fn new() -> Self {
        Self::with_ram_size(Self::DEFAULT_RAM_SIZE)
    }

    /// Create guest memory with a specific RAM size
    ///
    /// The size is clamped to `MAX_RAM_SIZE`.
    ///
    /// # Arguments
    ///
    /// * `ram_size` - Size of main RAM in bytes
    pub fn with_ram_size(ram_size: u32) -> Self {
        let ram_size = ram_size.min(Self::MAX_RAM_SIZE);
        Self {
            ram: vec![0u8; ram_size as usize],
            vram: vec![0u8; Self::VRAM_SIZE as usize],
            scratchpad: vec![0u8; Self::SCRATCHPAD_SIZE as usize],
            watch: MemoryWatch::new(),
        }
    }

    /// Clear all memory contents
    ///
    /// Watch checks stay configured; their hit log is cleared.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.vram.fill(0);
        self.scratchpad.fill(0);
        self.watch.clear_hits();
    }

    /// Size of main RAM in bytes
    pub fn ram_size(&self) -> u32 {
        self.ram.len() as u32
    }

    /// Check whether a single byte address is mapped
    #[inline(always)]
    pub fn is_valid_address(&self, address: u32) -> bool {
        self.locate(address).is_some()
    }

    /// Check whether `size` bytes starting at `address` are mapped contiguously
    ///
    /// A zero-sized range is valid if its start address is.
    pub fn is_valid_range(&self, address: u32, size: u32) -> bool {
        match self.locate(address) {
            Some((_, _, remaining)) => size as usize <= remaining,
            None => false,
        }
    }

    /// Number of bytes from `address` (up to `requested`) that are mapped
    pub fn valid_size(&self, address: u32, requested: u32) -> u32 {
        match self.locate(address) {
            Some((_, _, remaining)) => requested.min(remaining as u32),
            None => 0,
        }
    }

    /// Check whether an address falls in VRAM (including mirrors)
    pub fn is_vram_address(&self, address: u32) -> bool {
        self.identify_region(address) == MemoryRegion::Vram
    }

    /// Read a byte
    pub fn read_u8(&self, address: u32) -> Result<u8> {
        Ok(self.slice(address, 1)?[0])
    }

    /// Read a little-endian halfword (address rounded down to 2 bytes)
    pub fn read_u16(&self, address: u32) -> Result<u16> {
        let bytes = self.slice(address & !1, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian word (address rounded down to 4 bytes)
    ///
    /// # Returns
    ///
    /// - `Ok(value)` if the word is mapped
    /// - `Err(EmulatorError::InvalidMemoryAccess)` otherwise
    #[inline(always)]
    pub fn read_u32(&self, address: u32) -> Result<u32> {
        let bytes = self.slice(address & !3, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write a byte
    pub fn write_u8(&mut self, address: u32, value: u8) -> Result<()> {
        self.slice_mut(address, 1)?[0] = value;
        Ok(())
    }

    /// Write a little-endian halfword (address rounded down to 2 bytes)
    pub fn write_u16(&mut self, address: u32, value: u16) -> Result<()> {
        self.slice_mut(address & !1, 2)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian word (address rounded down to 4 bytes)
    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<()> {
        self.slice_mut(address & !3, 4)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a sequence of little-endian words starting at `address`
    ///
    /// Used to place display lists and vertex data in guest memory.
    pub fn write_words(&mut self, address: u32, words: &[u32]) -> Result<()> {
        let len = (words.len() * 4) as u32;
        let dst = self.slice_mut(address & !3, len)?;
        for (chunk, word) in dst.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Borrow `len` bytes starting at `address`
    ///
    /// The whole range must lie inside a single mapped region.
    pub fn slice(&self, address: u32, len: u32) -> Result<&[u8]> {
        let (region, offset) = self.checked_offset(address, len)?;
        let end = offset + len as usize;
        Ok(match region {
            MemoryRegion::Ram => &self.ram[offset..end],
            MemoryRegion::Vram => &self.vram[offset..end],
            MemoryRegion::Scratchpad => &self.scratchpad[offset..end],
            MemoryRegion::Unmapped => return Err(EmulatorError::InvalidMemoryAccess { address }),
        })
    }

    /// Mutably borrow `len` bytes starting at `address`
    pub fn slice_mut(&mut self, address: u32, len: u32) -> Result<&mut [u8]> {
        let (region, offset) = self.checked_offset(address, len)?;
        let end = offset + len as usize;
        Ok(match region {
            MemoryRegion::Ram => &mut self.ram[offset..end],
            MemoryRegion::Vram => &mut self.vram[offset..end],
            MemoryRegion::Scratchpad => &mut self.scratchpad[offset..end],
            MemoryRegion::Unmapped => return Err(EmulatorError::InvalidMemoryAccess { address }),
        })
    }

    /// Copy `len` bytes from `src` to `dst` with memmove semantics
    ///
    /// Both ranges are validated before anything is written.
    pub fn copy(&mut self, dst: u32, src: u32, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let (src_region, src_offset) = self.checked_offset(src, len)?;
        let (dst_region, dst_offset) = self.checked_offset(dst, len)?;

        if src_region == dst_region {
            let buffer = self.region_mut(dst_region);
            buffer.copy_within(src_offset..src_offset + len as usize, dst_offset);
        } else {
            let bytes = self.slice(src, len)?.to_vec();
            self.slice_mut(dst, len)?.copy_from_slice(&bytes);
        }
        Ok(())
    }

    /// Fill `len` bytes at `address` with `value`
    pub fn fill(&mut self, address: u32, value: u8, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.slice_mut(address, len)?.fill(value);
        Ok(())
    }

    /// Load a file into guest memory
    ///
    /// # Arguments
    ///
    /// * `address` - Destination address
    /// * `path` - Path to the file
    ///
    /// # Returns
    ///
    /// Number of bytes loaded
    pub fn load_file(&mut self, address: u32, path: &str) -> Result<u32> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let len = buffer.len() as u32;
        self.slice_mut(address, len)?.copy_from_slice(&buffer);

        log::info!("Loaded {} bytes from {} at 0x{:08X}", len, path, address);
        Ok(len)
    }

    /// Configured memory-watch checks
    pub fn watch(&self) -> &MemoryWatch {
        &self.watch
    }

    /// Mutable access to memory-watch checks
    pub fn watch_mut(&mut self) -> &mut MemoryWatch {
        &mut self.watch
    }

    /// Forward an access to the memory-watch checks
    ///
    /// # Arguments
    ///
    /// * `address` - Start of the accessed range
    /// * `size` - Length of the range in bytes
    /// * `write` - Whether the access wrote memory
    /// * `tag` - Short description of who performed the access
    pub fn notify_access(&mut self, address: u32, size: u32, write: bool, tag: &'static str) {
        self.watch.notify(address, size, write, tag);
    }

    /// Resolve an address range to a region and byte offset
    fn checked_offset(&self, address: u32, len: u32) -> Result<(MemoryRegion, usize)> {
        let (region, offset, remaining) = self
            .locate(address)
            .ok_or(EmulatorError::InvalidMemoryAccess { address })?;

        if len as usize > remaining {
            return Err(EmulatorError::InvalidMemoryRange { address, size: len });
        }
        Ok((region, offset))
    }

    fn region_mut(&mut self, region: MemoryRegion) -> &mut [u8] {
        match region {
            MemoryRegion::Ram => &mut self.ram,
            MemoryRegion::Vram => &mut self.vram,
            MemoryRegion::Scratchpad => &mut self.scratchpad,
            MemoryRegion::Unmapped => &mut [],
        }
    }
}

impl Default for GuestMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
