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

//! Display list run loop
//!
//! Two interpreters share [`CommandEngine::apply_command`]:
//!
//! - the fast loop skips redundant writes (`diff == 0`) of commands that
//!   neither execute nor flush unconditionally, and may bulk-load matrix
//!   uploads
//! - the slow path runs every command through `pre_execute_op` /
//!   `execute_op` so a tracer or a stepping debugger sees each one
//!
//! Both leave the register file, derived state, dirty set and backend in
//! the same state for the same input.
//!
//! A run slice ends when its downcount reaches zero, when a command writes
//! the PC (the stall distance is recomputed), or when the list leaves the
//! `Running` state. Reaching the stall address pauses the list.

use super::backend::RenderBackend;
use super::dispatch::{CommandFlags, DispatchEntry};
use super::display_list::{DisplayList, ListState, PauseReason};
use super::debug::CommandTracer;
use super::engine::CommandEngine;
use crate::core::error::ListFault;
use crate::core::memory::GuestMemory;

/// Cycles charged per fetched command
pub(crate) const COMMAND_CYCLES: u64 = 2;

impl<B: RenderBackend> CommandEngine<B> {
    /// Force every command through the slow path
    pub fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
    }

    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Install or remove a command tracer, returning the previous one
    pub fn set_tracer(&mut self, tracer: Option<CommandTracer>) -> Option<CommandTracer> {
        std::mem::replace(&mut self.tracer, tracer)
    }

    pub fn tracer_mut(&mut self) -> Option<&mut CommandTracer> {
        self.tracer.as_mut()
    }

    /// Whether the instrumented interpreter is in use
    pub fn uses_slow_path(&self) -> bool {
        self.stepping || self.tracer.is_some()
    }

    /// Run a display list for at most `budget` commands
    ///
    /// # Arguments
    ///
    /// * `mem` - Guest memory holding the list and its data
    /// * `list` - List to run; must be `Queued` or `Running`
    /// * `budget` - Maximum number of commands to execute
    ///
    /// # Returns
    ///
    /// Number of commands executed. The list's state tells why execution
    /// stopped: still `Running` (budget exhausted or break requested),
    /// `Paused(Stall)`, `Paused(Signal)` or `Completed`.
    pub fn interpret_list(&mut self, mem: &mut GuestMemory, list: &mut DisplayList, budget: u32) -> u32 {
        if list.state.is_terminal() || list.state.is_paused() {
            return 0;
        }

        if !list.started {
            log::debug!("Display list {} starts at 0x{:08X}", list.id, list.pc);
        }
        list.started = true;
        list.state = ListState::Running;

        let mut remaining = budget;
        let mut executed = 0u32;

        while remaining > 0 && list.state == ListState::Running {
            if self.break_request.is_pending() {
                break;
            }

            let to_stall = list.words_to_stall();
            if to_stall == 0 {
                log::trace!("Display list {} stalled at 0x{:08X}", list.id, list.pc);
                list.state = ListState::Paused(PauseReason::Stall);
                break;
            }

            let slice = to_stall.min(remaining) as i64;
            self.downcount = slice;

            if self.uses_slow_path() {
                self.slow_run_loop(mem, list);
            } else {
                self.fast_run_loop(mem, list);
            }

            let ran = (slice - self.downcount).max(0) as u32;
            executed = executed.saturating_add(ran);
            remaining = remaining.saturating_sub(ran);
            self.downcount = 0;

            if ran == 0 {
                break;
            }
        }

        executed
    }

    fn fast_run_loop(&mut self, mem: &mut GuestMemory, list: &mut DisplayList) {
        const ALWAYS: CommandFlags = CommandFlags::EXECUTE.union(CommandFlags::FLUSH_BEFORE);

        while self.downcount > 0 {
            if self.break_request.is_pending() {
                break;
            }

            let Some(op) = self.fetch(mem, list) else {
                break;
            };
            let opcode = (op >> 24) as u8;
            let entry = *self.table.entry(opcode);
            let diff = self.regs.diff(opcode, op);

            if diff != 0 || entry.flags.intersects(ALWAYS) {
                self.apply_command(mem, list, op, entry, diff);
            }

            if self.retire(list, entry) {
                break;
            }
        }
    }

    fn slow_run_loop(&mut self, mem: &mut GuestMemory, list: &mut DisplayList) {
        while self.downcount > 0 {
            if self.break_request.is_pending() {
                break;
            }

            let Some(op) = self.fetch(mem, list) else {
                break;
            };
            let opcode = (op >> 24) as u8;
            let entry = *self.table.entry(opcode);
            let diff = self.regs.diff(opcode, op);

            self.pre_execute_op(list, op, diff);
            self.execute_op(mem, list, op, entry, diff);

            if self.retire(list, entry) {
                break;
            }
        }
    }

    #[inline(always)]
    fn fetch(&mut self, mem: &GuestMemory, list: &mut DisplayList) -> Option<u32> {
        match mem.read_u32(list.pc) {
            Ok(op) => Some(op),
            Err(_) => {
                let pc = list.pc;
                self.fault_list(list, ListFault::InvalidProgramCounter { pc });
                None
            }
        }
    }

    /// Advance past the current command
    ///
    /// Returns `true` when the slice must end.
    #[inline(always)]
    fn retire(&mut self, list: &mut DisplayList, entry: DispatchEntry) -> bool {
        self.stats.commands += 1;
        self.stats.cycles += COMMAND_CYCLES;
        list.pc = list.pc.wrapping_add(4);
        self.downcount -= 1;
        entry.writes_pc() || list.state != ListState::Running
    }

    /// Debugger hook run before each slow-path command
    fn pre_execute_op(&mut self, list: &DisplayList, op: u32, diff: u32) {
        log::trace!(
            "GE L{} 0x{:08X}: {:08X} (diff {:06X})",
            list.id,
            list.pc,
            op,
            diff & 0x00FF_FFFF
        );

        if let Some(tracer) = self.tracer.as_mut() {
            if let Err(err) = tracer.record(list.id, list.pc, op, diff) {
                log::warn!("Command trace write failed, tracing disabled: {}", err);
                self.tracer = None;
            }
        }
    }

    fn execute_op(
        &mut self,
        mem: &mut GuestMemory,
        list: &mut DisplayList,
        op: u32,
        entry: DispatchEntry,
        diff: u32,
    ) {
        self.apply_command(mem, list, op, entry, diff);
    }

    /// Apply one command word: flush, write, then execute or mark dirty
    #[inline(always)]
    pub(crate) fn apply_command(
        &mut self,
        mem: &mut GuestMemory,
        list: &mut DisplayList,
        op: u32,
        entry: DispatchEntry,
        diff: u32,
    ) {
        if entry.flushes_before(diff) {
            self.flush();
        }

        let opcode = (op >> 24) as u8;
        self.regs.set_register(opcode, op);

        if entry.executes(diff) {
            self.execute_handler(entry.handler, mem, list, op, diff);
        } else if diff != 0 {
            self.dirty |= entry.dirty;
        }
    }
}
