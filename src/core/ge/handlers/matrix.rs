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

//! Matrix uploads
//!
//! A NUM command sets the element cursor of its matrix and each following
//! DATA command stores one element and advances the cursor. The NUM raw
//! slot mirrors the cursor and the DATA slot is reset to a zero payload
//! after every element, so repeated identical DATA words still register.
//!
//! On the fast path NUM loads the DATA words that follow it directly and
//! moves the PC past them. This is only done when every loaded word lies
//! inside the current run slice, so the stall address and the command
//! budget are never crossed.

use crate::core::ge::backend::RenderBackend;
use crate::core::ge::display_list::DisplayList;
use crate::core::ge::engine::CommandEngine;
use crate::core::ge::registers::MatrixKind;
use crate::core::ge::run_loop::COMMAND_CYCLES;
use crate::core::memory::GuestMemory;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_matrix_num(
        &mut self,
        mem: &GuestMemory,
        list: &mut DisplayList,
        kind: MatrixKind,
        op: u32,
    ) {
        let start = op & kind.index_mask();
        let mut loaded = 0u32;

        if self.config.fast_matrix_load && !self.uses_slow_path() {
            let room = (kind.len() as u32).saturating_sub(start);
            // Words after this NUM that still belong to the current slice
            let in_slice = (self.downcount - 1).max(0) as u32;
            let limit = room.min(in_slice);
            let data_opcode = kind.data_opcode();

            while loaded < limit {
                let address = list.pc.wrapping_add(4 * (loaded + 1));
                let Ok(word) = mem.read_u32(address) else {
                    break;
                };
                if (word >> 24) as u8 != data_opcode {
                    break;
                }
                self.store_matrix_element(kind, (start + loaded) as usize, word);
                loaded += 1;
            }

            if loaded > 0 {
                self.regs.restore_raw(data_opcode, (data_opcode as u32) << 24);
                list.pc = list.pc.wrapping_add(4 * loaded);
                self.downcount -= loaded as i64;
                self.stats.commands += loaded as u64;
                self.stats.cycles += loaded as u64 * COMMAND_CYCLES;
            }
        }

        self.set_matrix_cursor(kind, start + loaded);
    }

    pub(crate) fn execute_matrix_data(&mut self, kind: MatrixKind, op: u32) {
        let cursor = self.state.matrix_cursor(kind);
        self.store_matrix_element(kind, cursor as usize, op);
        self.regs.restore_raw(kind.data_opcode(), (kind.data_opcode() as u32) << 24);
        self.set_matrix_cursor(kind, cursor + 1);
    }

    fn set_matrix_cursor(&mut self, kind: MatrixKind, cursor: u32) {
        self.state.set_matrix_cursor(kind, cursor);
        let number = kind.number_opcode();
        self.regs
            .restore_raw(number, ((number as u32) << 24) | (cursor & 0x00FF_FFFF));
    }

    /// Store one element if it changed, flushing first
    ///
    /// With software skinning, bone matrix changes do not flush; their dirty
    /// flags are held back until a morphing vertex type needs them.
    fn store_matrix_element(&mut self, kind: MatrixKind, element: usize, word: u32) {
        if element >= kind.len() {
            return;
        }
        let value = word << 8;
        if self.regs.matrices.elements(kind)[element] == value {
            return;
        }

        let dirty = kind.dirty(element);
        if kind == MatrixKind::Bone && self.config.software_skinning {
            self.state.deferred_vertex_type_dirty |= dirty;
        } else {
            self.flush();
            self.mark_dirty(dirty);
        }
        self.regs.matrices.elements_mut(kind)[element] = value;
    }
}

#[cfg(test)]
mod tests {
    use crate::core::ge::registers::MatrixKind;

    #[test]
    fn test_number_and_data_opcodes_are_adjacent() {
        for kind in [
            MatrixKind::World,
            MatrixKind::View,
            MatrixKind::Projection,
            MatrixKind::TexGen,
            MatrixKind::Bone,
        ] {
            assert_eq!(kind.number_opcode() + 1, kind.data_opcode());
        }
    }
}
