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

//! Memory region identification and address translation
//!
//! Guest addresses carry segment bits in their top two bits (cached,
//! uncached and kernel views). All views alias the same physical memory.

use super::GuestMemory;

/// Memory region identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Main RAM
    Ram,
    /// Video RAM and its mirrors
    Vram,
    /// Scratchpad (16KB)
    Scratchpad,
    /// Unmapped region
    Unmapped,
}

impl GuestMemory {
    /// Strip segment bits from a guest address
    ///
    /// # Arguments
    ///
    /// * `address` - Guest virtual address
    ///
    /// # Returns
    ///
    /// Physical address with the upper two bits masked off
    #[inline(always)]
    pub(super) fn translate_address(&self, address: u32) -> u32 {
        address & 0x3FFF_FFFF
    }

    /// Identify the memory region containing an address
    ///
    /// # Example
    ///
    /// ```
    /// use gerx::core::memory::{GuestMemory, MemoryRegion};
    ///
    /// let mem = GuestMemory::new();
    ///
    /// assert_eq!(mem.identify_region(0x08000000), MemoryRegion::Ram);
    /// assert_eq!(mem.identify_region(0x44000000), MemoryRegion::Vram);
    /// assert_eq!(mem.identify_region(0x00010000), MemoryRegion::Scratchpad);
    /// assert_eq!(mem.identify_region(0x00000000), MemoryRegion::Unmapped);
    /// ```
    pub fn identify_region(&self, address: u32) -> MemoryRegion {
        let paddr = self.translate_address(address);

        if paddr >= Self::RAM_START && paddr - Self::RAM_START < self.ram_size() {
            MemoryRegion::Ram
        } else if (Self::VRAM_START..Self::VRAM_MIRROR_END).contains(&paddr) {
            MemoryRegion::Vram
        } else if paddr >= Self::SCRATCHPAD_START
            && paddr - Self::SCRATCHPAD_START < Self::SCRATCHPAD_SIZE
        {
            MemoryRegion::Scratchpad
        } else {
            MemoryRegion::Unmapped
        }
    }

    /// Locate an address inside its backing buffer
    ///
    /// # Returns
    ///
    /// `(region, offset, remaining)` where `remaining` is the number of bytes
    /// from `offset` to the end of the region (or VRAM mirror), or `None`
    /// for unmapped addresses.
    #[inline(always)]
    pub(super) fn locate(&self, address: u32) -> Option<(MemoryRegion, usize, usize)> {
        let paddr = self.translate_address(address);

        match self.identify_region(address) {
            MemoryRegion::Ram => {
                let offset = (paddr - Self::RAM_START) as usize;
                Some((MemoryRegion::Ram, offset, self.ram_size() as usize - offset))
            }
            MemoryRegion::Vram => {
                // Each mirror is a separate window; ranges never wrap into the next one
                let offset = ((paddr - Self::VRAM_START) % Self::VRAM_SIZE) as usize;
                Some((
                    MemoryRegion::Vram,
                    offset,
                    Self::VRAM_SIZE as usize - offset,
                ))
            }
            MemoryRegion::Scratchpad => {
                let offset = (paddr - Self::SCRATCHPAD_START) as usize;
                Some((
                    MemoryRegion::Scratchpad,
                    offset,
                    Self::SCRATCHPAD_SIZE as usize - offset,
                ))
            }
            MemoryRegion::Unmapped => None,
        }
    }
}
