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

//! TRANSFERSTART
//!
//! The pending geometry has already been flushed by the dispatch table. A
//! rejected transfer writes nothing and is only logged.

use crate::core::ge::backend::RenderBackend;
use crate::core::ge::engine::CommandEngine;
use crate::core::ge::invalidation::InvalidationKind;
use crate::core::ge::transfer::BlockTransfer;
use crate::core::memory::GuestMemory;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_block_transfer(&mut self, mem: &mut GuestMemory) {
        let transfer = BlockTransfer::from_registers(&self.regs);

        let report = match transfer.execute(mem) {
            Ok(report) => report,
            Err(err) => {
                log::error!("Block transfer rejected: {}", err);
                return;
            }
        };

        let (address, size) = report.invalidate_range;
        self.caches.invalidate(address, size, InvalidationKind::Hint);

        self.stats.block_transfers += 1;
        self.stats.block_transfer_bytes += report.bytes as u64;
        self.stats.cycles += self.config.block_transfer_cost.cycles(report.bytes);

        log::trace!(
            "Block transfer {:?}: {} bytes 0x{:08X} -> 0x{:08X}",
            report.mode,
            report.bytes,
            report.src_range.0,
            report.dst_range.0
        );
    }
}
