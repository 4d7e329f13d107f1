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

//! Control flow commands
//!
//! OFFSETADDR, ORIGIN, JUMP, BJUMP, CALL, RET and END (with the SIGNAL and
//! FINISH pairing it completes). Branch targets are validated before the
//! PC moves; an invalid target, a full call stack or a RET with nothing to
//! return to ends the list with a fault and leaves the raw register slot as
//! it was before the command.

use crate::core::ge::backend::RenderBackend;
use crate::core::ge::command::{mnemonic, opcodes};
use crate::core::ge::display_list::{CallFrame, DisplayList, ListState, PauseReason, SignalBehaviour};
use crate::core::ge::engine::CommandEngine;
use crate::core::error::ListFault;
use crate::core::memory::GuestMemory;

/// Extra cycles charged for END
const END_CYCLES: u64 = 60;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_offset_addr(&mut self, op: u32) {
        self.state.offset_addr = (op & 0x00FF_FFFF) << 8;
    }

    pub(crate) fn execute_origin(&mut self, list: &DisplayList) {
        self.state.offset_addr = list.pc;
    }

    pub(crate) fn execute_jump(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32, diff: u32) {
        let target = self.state.relative_address(&self.regs, op & 0x00FF_FFFC);
        if !mem.is_valid_address(target) {
            let pc = list.pc;
            self.branch_fault(list, op, diff, ListFault::InvalidBranchTarget { pc, target });
            return;
        }
        list.pc = target.wrapping_sub(4);
    }

    /// Jump only if the last BOUNDINGBOX test failed
    pub(crate) fn execute_bjump(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32, diff: u32) {
        if !list.bbox_result {
            self.execute_jump(mem, list, op, diff);
        }
    }

    pub(crate) fn execute_call(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32, diff: u32) {
        let pc = list.pc;
        let target = self.state.relative_address(&self.regs, op & 0x00FF_FFFC);
        if !mem.is_valid_address(target) {
            self.branch_fault(list, op, diff, ListFault::InvalidBranchTarget { pc, target });
            return;
        }

        // BASE is not saved by a plain CALL
        let frame = CallFrame {
            return_pc: pc.wrapping_add(4),
            offset_addr: self.state.offset_addr,
            base: None,
        };
        if !list.stack.push(frame) {
            self.branch_fault(list, op, diff, ListFault::StackOverflow { pc });
            return;
        }
        list.pc = target.wrapping_sub(4);
    }

    pub(crate) fn execute_ret(&mut self, list: &mut DisplayList, op: u32, diff: u32) {
        let Some(frame) = list.stack.pop() else {
            let pc = list.pc;
            self.branch_fault(list, op, diff, ListFault::StackUnderflow { pc });
            return;
        };
        self.return_to(list, frame);
    }

    pub(crate) fn execute_end(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32, diff: u32) {
        if self.config.flush_on_end {
            self.flush();
        }
        self.stats.cycles += END_CYCLES;

        let prev = mem.read_u32(list.pc.wrapping_sub(4)).unwrap_or(0);
        match (prev >> 24) as u8 {
            opcodes::SIGNAL => self.end_signal(mem, list, op, diff, prev),
            opcodes::FINISH => self.end_finish(list, prev),
            other => log::debug!(
                "END at 0x{:08X} after {}: list not finished",
                list.pc,
                mnemonic(other)
            ),
        }
    }

    fn end_signal(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32, diff: u32, prev: u32) {
        let behaviour = SignalBehaviour::from_bits(((prev >> 16) & 0xFF) as u8);
        let token = (prev & 0xFFFF) as u16;
        let pc = list.pc;
        list.token = token;

        // Jump and call targets are split across SIGNAL and END
        let absolute = ((prev << 16) | (op & 0xFFFF)) & !3;

        match behaviour {
            SignalBehaviour::HandlerSuspend => {
                log::debug!("List {} signal {:04X}: suspend", list.id, token);
                list.signal = behaviour;
                list.state = ListState::Paused(PauseReason::Signal);
                self.listener.on_signal(list.id, token, behaviour);
            }
            SignalBehaviour::HandlerContinue => {
                log::debug!("List {} signal {:04X}: continue", list.id, token);
                list.signal = behaviour;
                self.listener.on_signal(list.id, token, behaviour);
            }
            SignalBehaviour::HandlerPause | SignalBehaviour::Sync => {
                list.signal = behaviour;
            }
            SignalBehaviour::Jump | SignalBehaviour::RelativeJump | SignalBehaviour::OriginJump => {
                list.signal = behaviour;
                let target = self.signal_target(behaviour, absolute, pc);
                if !mem.is_valid_address(target) {
                    self.branch_fault(list, op, diff, ListFault::InvalidBranchTarget { pc, target });
                    return;
                }
                list.pc = target.wrapping_sub(4);
            }
            SignalBehaviour::Call | SignalBehaviour::RelativeCall | SignalBehaviour::OriginCall => {
                list.signal = behaviour;
                let target = self.signal_target(behaviour, absolute, pc);
                if !mem.is_valid_address(target) {
                    self.branch_fault(list, op, diff, ListFault::InvalidBranchTarget { pc, target });
                    return;
                }
                let frame = CallFrame {
                    return_pc: pc.wrapping_add(4),
                    offset_addr: self.state.offset_addr,
                    base: Some(self.regs.raw(opcodes::BASE)),
                };
                if !list.stack.push(frame) {
                    self.branch_fault(list, op, diff, ListFault::StackOverflow { pc });
                    return;
                }
                list.pc = target.wrapping_sub(4);
            }
            SignalBehaviour::Ret => {
                list.signal = behaviour;
                let Some(frame) = list.stack.pop() else {
                    self.branch_fault(list, op, diff, ListFault::StackUnderflow { pc });
                    return;
                };
                self.return_to(list, frame);
            }
            SignalBehaviour::None | SignalBehaviour::Unknown(_) => {
                log::warn!(
                    "List {} unknown signal behaviour 0x{:02X} at 0x{:08X}",
                    list.id,
                    behaviour.to_bits(),
                    pc
                );
            }
        }
    }

    fn end_finish(&mut self, list: &mut DisplayList, prev: u32) {
        match list.signal {
            SignalBehaviour::HandlerPause => {
                list.state = ListState::Paused(PauseReason::Signal);
                self.listener.on_signal(list.id, list.token, SignalBehaviour::HandlerPause);
            }
            SignalBehaviour::Sync => {
                list.signal = SignalBehaviour::None;
            }
            _ => {
                if !list.stack.is_empty() {
                    log::warn!(
                        "Display list {} finished at 0x{:08X} with {} unreturned CALL(s)",
                        list.id,
                        list.pc,
                        list.stack.depth()
                    );
                }

                self.flush();
                list.token = (prev & 0xFFFF) as u16;
                list.complete(None);
                self.stats.lists_completed += 1;
                log::debug!("Display list {} finished (token {:04X})", list.id, list.token);
                self.listener.on_finish(list.id, list.token);
                self.listener.on_list_complete(list.id);
            }
        }
    }

    fn signal_target(&self, behaviour: SignalBehaviour, absolute: u32, pc: u32) -> u32 {
        match behaviour {
            SignalBehaviour::RelativeJump | SignalBehaviour::RelativeCall => {
                absolute.wrapping_add(pc.wrapping_sub(4)) & 0x0FFF_FFFF
            }
            SignalBehaviour::OriginJump | SignalBehaviour::OriginCall => {
                self.state.relative_address(&self.regs, absolute)
            }
            _ => absolute & 0x0FFF_FFFF,
        }
    }

    fn return_to(&mut self, list: &mut DisplayList, frame: CallFrame) {
        self.state.offset_addr = frame.offset_addr;
        if let Some(base) = frame.base {
            self.regs.restore_raw(opcodes::BASE, base);
        }
        list.pc = (frame.return_pc & 0x0FFF_FFFF).wrapping_sub(4);
    }

    /// End the list and undo the command's register write
    fn branch_fault(&mut self, list: &mut DisplayList, op: u32, diff: u32, fault: ListFault) {
        self.regs.restore_raw((op >> 24) as u8, op ^ diff);
        self.fault_list(list, fault);
    }
}
