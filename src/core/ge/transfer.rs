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

//! Block transfer engine
//!
//! TRANSFERSTART copies a rectangle of pixels between two buffers with
//! independent strides. Everything is validated before the first byte is
//! written, so a rejected transfer leaves memory untouched.
//!
//! # Copy strategy
//!
//! When `width == src_stride == dst_stride` the rows are adjacent in both
//! buffers and the whole rectangle moves with one contiguous copy. Any other
//! shape is copied row by row.

use super::registers::RegisterFile;
use crate::core::error::{Result, TransferError};
use crate::core::memory::GuestMemory;
use serde::{Deserialize, Serialize};

/// Cycle cost of a transfer as a ratio of bytes moved
///
/// The default of 16/10 cycles per byte is an empirical figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCost {
    pub numerator: u32,
    pub denominator: u32,
}

impl TransferCost {
    pub fn cycles(&self, bytes: u32) -> u64 {
        (bytes as u64 * self.numerator as u64) / self.denominator.max(1) as u64
    }
}

impl Default for TransferCost {
    fn default() -> Self {
        Self {
            numerator: 16,
            denominator: 10,
        }
    }
}

/// How the rectangle was copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyMode {
    Contiguous,
    RowByRow,
}

/// Result of a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub mode: CopyMode,
    /// Number of memory copies issued
    pub copies: u32,
    /// Pixel bytes moved
    pub bytes: u32,
    /// First source byte and the span read
    pub src_range: (u32, u32),
    /// First destination byte and the span written
    pub dst_range: (u32, u32),
    /// Range handed to cache invalidation
    pub invalidate_range: (u32, u32),
}

/// Parameters of one block transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockTransfer {
    pub src_base: u32,
    /// Source stride in pixels
    pub src_stride: u32,
    pub src_x: u32,
    pub src_y: u32,
    pub dst_base: u32,
    /// Destination stride in pixels
    pub dst_stride: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl BlockTransfer {
    /// Read transfer parameters from the TRANSFER* registers
    pub fn from_registers(regs: &RegisterFile) -> Self {
        let (src_x, src_y) = regs.transfer_src_position();
        let (dst_x, dst_y) = regs.transfer_dst_position();
        let (width, height) = regs.transfer_size();
        Self {
            src_base: regs.transfer_src_address(),
            src_stride: regs.transfer_src_stride(),
            src_x,
            src_y,
            dst_base: regs.transfer_dst_address(),
            dst_stride: regs.transfer_dst_stride(),
            dst_x,
            dst_y,
            width,
            height,
            bytes_per_pixel: regs.transfer_bytes_per_pixel(),
        }
    }

    fn row_address(base: u32, stride: u32, x: u32, y: u32, bpp: u32) -> u32 {
        base.wrapping_add((y.wrapping_mul(stride).wrapping_add(x)).wrapping_mul(bpp))
    }

    /// Address of the first source pixel of row `row`
    pub fn src_row(&self, row: u32) -> u32 {
        Self::row_address(
            self.src_base,
            self.src_stride,
            self.src_x,
            self.src_y + row,
            self.bytes_per_pixel,
        )
    }

    /// Address of the first destination pixel of row `row`
    pub fn dst_row(&self, row: u32) -> u32 {
        Self::row_address(
            self.dst_base,
            self.dst_stride,
            self.dst_x,
            self.dst_y + row,
            self.bytes_per_pixel,
        )
    }

    /// Address of the bottom-right source pixel
    pub fn src_last_address(&self) -> u32 {
        Self::row_address(
            self.src_base,
            self.src_stride,
            self.src_x + self.width.saturating_sub(1),
            self.src_y + self.height.saturating_sub(1),
            self.bytes_per_pixel,
        )
    }

    /// Address of the bottom-right destination pixel
    pub fn dst_last_address(&self) -> u32 {
        Self::row_address(
            self.dst_base,
            self.dst_stride,
            self.dst_x + self.width.saturating_sub(1),
            self.dst_y + self.height.saturating_sub(1),
            self.bytes_per_pixel,
        )
    }

    /// Bytes in one transferred row
    pub fn row_bytes(&self) -> u32 {
        self.width * self.bytes_per_pixel
    }

    /// Pixel bytes moved by the whole transfer
    pub fn total_bytes(&self) -> u32 {
        self.row_bytes() * self.height
    }

    pub fn is_contiguous(&self) -> bool {
        self.width == self.src_stride && self.width == self.dst_stride
    }

    /// Span read from the source, first row to the end of the last
    fn src_span(&self) -> u32 {
        self.height.saturating_sub(1) * self.src_stride * self.bytes_per_pixel + self.row_bytes()
    }

    fn dst_span(&self) -> u32 {
        self.height.saturating_sub(1) * self.dst_stride * self.bytes_per_pixel + self.row_bytes()
    }

    /// Check every address the transfer would touch
    ///
    /// Nothing is written. Bases and bottom-right corners are checked first
    /// so the error names the failing side; every row is then checked so
    /// that a range crossing a region boundary cannot fail halfway through.
    pub fn validate(&self, mem: &GuestMemory) -> std::result::Result<(), TransferError> {
        if !mem.is_valid_address(self.src_base) {
            return Err(TransferError::InvalidSource {
                address: self.src_base,
            });
        }
        if !mem.is_valid_address(self.dst_base) {
            return Err(TransferError::InvalidDestination {
                address: self.dst_base,
            });
        }

        let src_last = self.src_last_address();
        if !mem.is_valid_address(src_last) {
            return Err(TransferError::SourceOutOfBounds { end: src_last });
        }
        let dst_last = self.dst_last_address();
        if !mem.is_valid_address(dst_last) {
            return Err(TransferError::DestinationOutOfBounds { end: dst_last });
        }

        let row_bytes = self.row_bytes();
        if self.is_contiguous() {
            if !mem.is_valid_range(self.src_row(0), self.total_bytes()) {
                return Err(TransferError::SourceOutOfBounds { end: src_last });
            }
            if !mem.is_valid_range(self.dst_row(0), self.total_bytes()) {
                return Err(TransferError::DestinationOutOfBounds { end: dst_last });
            }
            return Ok(());
        }

        for row in 0..self.height {
            if !mem.is_valid_range(self.src_row(row), row_bytes) {
                return Err(TransferError::SourceOutOfBounds {
                    end: self.src_row(row).wrapping_add(row_bytes),
                });
            }
            if !mem.is_valid_range(self.dst_row(row), row_bytes) {
                return Err(TransferError::DestinationOutOfBounds {
                    end: self.dst_row(row).wrapping_add(row_bytes),
                });
            }
        }
        Ok(())
    }

    /// Validate, then copy
    ///
    /// Memory-watch checks are notified for both ranges on success.
    ///
    /// # Examples
    ///
    /// ```
    /// use gerx::core::ge::{BlockTransfer, CopyMode};
    /// use gerx::core::memory::GuestMemory;
    ///
    /// let mut mem = GuestMemory::new();
    /// mem.write_u32(0x0880_0000, 0xAABB_CCDD).unwrap();
    ///
    /// let transfer = BlockTransfer {
    ///     src_base: 0x0880_0000,
    ///     src_stride: 8,
    ///     dst_base: 0x0400_0000,
    ///     dst_stride: 8,
    ///     width: 8,
    ///     height: 2,
    ///     bytes_per_pixel: 4,
    ///     ..Default::default()
    /// };
    ///
    /// let report = transfer.execute(&mut mem).unwrap();
    /// assert_eq!(report.mode, CopyMode::Contiguous);
    /// assert_eq!(mem.read_u32(0x0400_0000).unwrap(), 0xAABB_CCDD);
    /// ```
    pub fn execute(&self, mem: &mut GuestMemory) -> Result<TransferReport> {
        if self.width == 0 || self.height == 0 {
            return Err(TransferError::SourceOutOfBounds { end: self.src_base }.into());
        }
        self.validate(mem)?;

        let (mode, copies) = if self.is_contiguous() {
            mem.copy(self.dst_row(0), self.src_row(0), self.total_bytes())?;
            (CopyMode::Contiguous, 1)
        } else {
            let row_bytes = self.row_bytes();
            for row in 0..self.height {
                mem.copy(self.dst_row(row), self.src_row(row), row_bytes)?;
            }
            (CopyMode::RowByRow, self.height)
        };

        let src_range = (self.src_row(0), self.src_span());
        let dst_range = (self.dst_row(0), self.dst_span());
        mem.notify_access(src_range.0, src_range.1, false, "GPUBlockTransfer");
        mem.notify_access(dst_range.0, dst_range.1, true, "GPUBlockTransfer");

        log::debug!(
            "Block transfer {:?}: {}x{} @ {} bpp, 0x{:08X} -> 0x{:08X}",
            mode,
            self.width,
            self.height,
            self.bytes_per_pixel,
            src_range.0,
            dst_range.0
        );

        Ok(TransferReport {
            mode,
            copies,
            bytes: self.total_bytes(),
            src_range,
            dst_range,
            invalidate_range: (
                dst_range.0,
                self.height * self.dst_stride * self.bytes_per_pixel,
            ),
        })
    }
}
