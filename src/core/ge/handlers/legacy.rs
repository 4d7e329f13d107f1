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

//! Remaining commands
//!
//! Opcodes whose only side effect is a dirty mark share one match here.
//! Anything not named explicitly falls back to its table dirty mask.

use crate::core::ge::backend::RenderBackend;
use crate::core::ge::command::opcodes;
use crate::core::ge::dirty::DirtyFlags;
use crate::core::ge::display_list::DisplayList;
use crate::core::ge::engine::CommandEngine;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_legacy(&mut self, op: u32, diff: u32) {
        if diff == 0 {
            return;
        }
        let opcode = (op >> 24) as u8;
        match opcode {
            opcodes::TEXSCALEU | opcodes::TEXSCALEV | opcodes::TEXOFFSETU | opcodes::TEXOFFSETV => {
                self.mark_dirty(DirtyFlags::UVSCALEOFFSET);
            }
            opcodes::NOP | opcodes::NOP_FF | opcodes::TEXSYNC => {}
            _ => {
                let dirty = self.table.entry(opcode).dirty;
                self.mark_dirty(dirty);
            }
        }
    }

    pub(crate) fn execute_unknown(&mut self, list: &DisplayList, op: u32) {
        self.stats.unknown_commands += 1;
        if op & 0x00FF_FFFF != 0 {
            log::warn!(
                "Unknown GE command 0x{:08X} at 0x{:08X} in list {}",
                op,
                list.pc,
                list.id
            );
        }
    }
}
