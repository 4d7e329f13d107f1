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

//! Display list queue
//!
//! `GeProcessor` is the API the OS layer talks to. It owns the list slots
//! and the run queue, and drives [`CommandEngine::interpret_list`] over the
//! list at the head of the queue.
//!
//! Only the head list ever runs. A list that stalls or pauses blocks the
//! lists behind it until its stall address moves or it is continued.
//!
//! # Example
//!
//! ```
//! use gerx::core::config::GeConfig;
//! use gerx::core::ge::{opcodes, CommandWord, GeProcessor, ListState, NullBackend, NullListener};
//! use gerx::core::memory::GuestMemory;
//!
//! let mut mem = GuestMemory::new();
//! mem.write_words(
//!     0x0880_0000,
//!     &[
//!         CommandWord::new(opcodes::FINISH, 0).0,
//!         CommandWord::new(opcodes::END, 0).0,
//!     ],
//! )
//! .unwrap();
//!
//! let mut ge = GeProcessor::new(GeConfig::default(), NullBackend::new(), Box::new(NullListener)).unwrap();
//! let id = ge.enqueue(&mem, 0x0880_0000, 0, false).unwrap();
//! ge.run(&mut mem, 1000);
//!
//! assert_eq!(ge.list(id).unwrap().state, ListState::Completed(None));
//! ```

use super::backend::RenderBackend;
use super::debug::{GeSnapshot, ListSnapshot};
use super::display_list::{DisplayList, ListId, ListState, PauseReason, SignalBehaviour};
use super::engine::{BreakHandle, BreakMode, CommandEngine, GeStats};
use super::listener::GeListener;
use crate::core::config::GeConfig;
use crate::core::error::{EmulatorError, GeError, ListFault, Result};
use crate::core::memory::GuestMemory;
use serde::Serialize;
use std::collections::VecDeque;

/// Status reported by a list sync query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListStatus {
    Completed,
    Queued,
    Drawing,
    Stalling,
    Paused,
}

/// Status reported by a draw sync query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawStatus {
    Completed,
    Drawing,
    Stalling,
}

/// GE command processor: list slots, run queue and execution engine
pub struct GeProcessor<B: RenderBackend> {
    pub(crate) engine: CommandEngine<B>,
    pub(crate) lists: Vec<DisplayList>,
    pub(crate) queue: VecDeque<ListId>,
    /// Slot searched first by the next enqueue
    pub(crate) next_list_id: ListId,
}

impl<B: RenderBackend> GeProcessor<B> {
    /// Create a processor with empty list slots
    pub fn new(config: GeConfig, backend: B, listener: Box<dyn GeListener + Send>) -> Result<Self> {
        let slots = config.max_display_lists as usize;
        let depth = config.call_stack_depth as usize;
        let engine = CommandEngine::new(config, backend, listener)?;

        Ok(Self {
            engine,
            lists: (0..slots).map(|id| DisplayList::empty(id, depth)).collect(),
            queue: VecDeque::with_capacity(slots),
            next_list_id: 0,
        })
    }

    /// Drop every list and return the engine to power-on state
    pub fn reset(&mut self) {
        let depth = self.engine.config.call_stack_depth as usize;
        for list in &mut self.lists {
            *list = DisplayList::empty(list.id, depth);
        }
        self.queue.clear();
        self.next_list_id = 0;
        self.engine.reset();
    }

    pub fn engine(&self) -> &CommandEngine<B> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CommandEngine<B> {
        &mut self.engine
    }

    pub fn list(&self, id: ListId) -> Option<&DisplayList> {
        self.lists.get(id)
    }

    pub fn lists(&self) -> &[DisplayList] {
        &self.lists
    }

    /// List ids in run order
    pub fn queue(&self) -> impl Iterator<Item = ListId> + '_ {
        self.queue.iter().copied()
    }

    /// List at the head of the queue
    pub fn current_list(&self) -> Option<&DisplayList> {
        self.queue.front().map(|&id| &self.lists[id])
    }

    pub fn stats(&self) -> GeStats {
        self.engine.stats
    }

    pub fn break_handle(&self) -> BreakHandle {
        self.engine.break_handle()
    }

    /// Add a display list to the queue
    ///
    /// # Arguments
    ///
    /// * `mem` - Guest memory, used to validate the list address
    /// * `pc` - Address of the first command
    /// * `stall` - Stall address, or zero for none
    /// * `head` - Insert in front of the current list, which must be paused
    ///
    /// # Returns
    ///
    /// - `Ok(id)` with the slot assigned to the list
    /// - `Err(GeError::InvalidListAddress)` for unaligned or unmapped addresses
    /// - `Err(GeError::ListAddressInUse)` if an active list already starts there
    /// - `Err(GeError::NoFreeListSlot)` if every slot is active
    /// - `Err(GeError::HeadInsertRejected)` if the current list is not paused
    pub fn enqueue(&mut self, mem: &GuestMemory, pc: u32, stall: u32, head: bool) -> Result<ListId> {
        if ((pc | stall) & 3) != 0 || !mem.is_valid_address(pc) {
            log::error!("Enqueue rejected: invalid list address 0x{:08X}", pc);
            return Err(GeError::InvalidListAddress { address: pc, stall }.into());
        }

        let masked = pc & 0x0FFF_FFFF;
        if let Some(busy) = self.lists.iter().find(|l| l.is_active() && l.pc == masked) {
            return Err(GeError::ListAddressInUse {
                address: pc,
                id: busy.id,
            }
            .into());
        }

        let slots = self.lists.len();
        let id = (0..slots)
            .map(|i| (i + self.next_list_id) % slots)
            .find(|&id| self.lists[id].state.is_terminal())
            .ok_or(GeError::NoFreeListSlot)?;

        if head {
            if let Some(&front) = self.queue.front() {
                let current = &mut self.lists[front];
                if !current.state.is_paused() {
                    return Err(GeError::HeadInsertRejected { id: front }.into());
                }
                current.state = ListState::Queued;
                // Otherwise it would pause again at its next FINISH
                current.signal = SignalBehaviour::None;
            }
        }

        self.next_list_id = (id + 1) % slots;
        let list = &mut self.lists[id];
        list.reset(pc, stall);

        if head {
            list.state = ListState::Paused(PauseReason::Inserted);
            self.queue.push_front(id);
        } else {
            self.queue.push_back(id);
        }

        log::debug!(
            "Enqueued display list {} at 0x{:08X} (stall 0x{:08X}{})",
            id,
            list.pc,
            list.stall,
            if head { ", head" } else { "" }
        );
        Ok(id)
    }

    /// Remove a list that has not started executing
    pub fn dequeue(&mut self, id: ListId) -> Result<()> {
        let list = self
            .lists
            .get_mut(id)
            .filter(|l| l.state != ListState::None)
            .ok_or(GeError::InvalidListId { id })?;
        if list.started && list.is_active() {
            return Err(GeError::ListBusy { id }.into());
        }

        list.state = ListState::None;
        self.queue.retain(|&queued| queued != id);
        log::debug!("Dequeued display list {}", id);

        self.engine.listener.on_list_complete(id);
        if self.queue.is_empty() {
            self.engine.listener.on_draw_complete();
        }
        Ok(())
    }

    /// Move a list's stall address
    ///
    /// A list paused at its old stall address becomes runnable again.
    pub fn update_stall(&mut self, id: ListId, stall: u32) -> Result<()> {
        let is_head = self.queue.front() == Some(&id);
        let list = self
            .lists
            .get_mut(id)
            .filter(|l| l.state != ListState::None)
            .ok_or(GeError::InvalidListId { id })?;
        if matches!(list.state, ListState::Completed(_)) {
            return Err(GeError::ListAlreadyCompleted { id }.into());
        }

        list.stall = stall & 0x0FFF_FFFF;
        if list.state == ListState::Paused(PauseReason::Stall) {
            list.state = if is_head {
                ListState::Running
            } else {
                ListState::Queued
            };
        }
        log::trace!("Display list {} stall -> 0x{:08X}", id, list.stall);
        Ok(())
    }

    /// Resume the paused list at the head of the queue
    pub fn continue_list(&mut self) -> Result<()> {
        let &id = self.queue.front().ok_or(GeError::NoCurrentList)?;
        let list = &mut self.lists[id];

        match list.state {
            ListState::Paused(reason) => {
                list.state = ListState::Running;
                if reason != PauseReason::Stall {
                    list.signal = SignalBehaviour::None;
                }
                log::debug!("Display list {} continued", id);
                Ok(())
            }
            ListState::Running => Err(GeError::ListBusy { id }.into()),
            _ => Err(GeError::NotPaused { id }.into()),
        }
    }

    /// Terminate the current list, or every list
    ///
    /// Lists end in `Completed(Some(ListFault::Break))`. From another thread
    /// use a [`BreakHandle`]; the request is then applied at the next
    /// command boundary.
    pub fn break_lists(&mut self, mode: BreakMode) -> Result<()> {
        match mode {
            BreakMode::Current => {
                let &id = self.queue.front().ok_or(GeError::NoCurrentList)?;
                self.lists[id].complete(Some(ListFault::Break));
                self.queue.pop_front();
                log::debug!("Display list {} broken", id);
                self.engine.listener.on_list_complete(id);
            }
            BreakMode::All => {
                for list in self.lists.iter_mut().filter(|l| l.is_active()) {
                    list.complete(Some(ListFault::Break));
                }
                let broken: Vec<ListId> = self.queue.drain(..).collect();
                log::debug!("Broke {} display list(s)", broken.len());
                for id in broken {
                    self.engine.listener.on_list_complete(id);
                }
            }
        }

        if self.queue.is_empty() {
            self.engine.listener.on_draw_complete();
        }
        Ok(())
    }

    /// The OS finished running a list's interrupt handler
    ///
    /// A list that completed while its handler ran leaves the queue here.
    pub fn interrupt_end(&mut self, id: ListId) -> Result<()> {
        let list = self.lists.get(id).ok_or(GeError::InvalidListId { id })?;
        if list.state.is_terminal() && self.queue.contains(&id) {
            self.queue.retain(|&queued| queued != id);
            self.engine.listener.on_list_complete(id);
            if self.queue.is_empty() {
                self.engine.listener.on_draw_complete();
            }
        }
        Ok(())
    }

    /// Run queued lists for at most `budget` commands
    ///
    /// Pending break requests are applied first. Lists run head first; each
    /// one that completes is removed and the next one starts within the same
    /// budget. Execution stops at the first list that stalls, pauses or runs
    /// out of budget.
    ///
    /// # Returns
    ///
    /// Number of commands executed.
    pub fn run(&mut self, mem: &mut GuestMemory, budget: u32) -> u32 {
        let was_busy = !self.queue.is_empty();
        let mut executed = 0u32;

        loop {
            if let Some(mode) = self.engine.break_request.take() {
                match self.break_lists(mode) {
                    Ok(()) => {}
                    // An empty queue has nothing to break
                    Err(EmulatorError::Ge(GeError::NoCurrentList)) => {
                        log::debug!("Break request with no current list ignored");
                    }
                    Err(e) => log::error!("Break request failed: {}", e),
                }
            }

            let Some(&id) = self.queue.front() else {
                break;
            };
            if executed >= budget {
                break;
            }

            let list = &mut self.lists[id];
            executed += self.engine.interpret_list(mem, list, budget - executed);

            match list.state {
                ListState::Completed(fault) => {
                    self.queue.pop_front();
                    // FINISH reports completion itself
                    if fault.is_some() {
                        self.engine.listener.on_list_complete(id);
                    }
                }
                ListState::Running if self.engine.break_request.is_pending() => continue,
                _ => break,
            }
        }

        if was_busy && self.queue.is_empty() {
            log::debug!("Display list queue drained");
            self.engine.listener.on_draw_complete();
        }
        executed
    }

    /// Execute exactly one command of the current list on the slow path
    pub fn step(&mut self, mem: &mut GuestMemory) -> u32 {
        let stepping = self.engine.stepping;
        self.engine.stepping = true;
        let executed = self.run(mem, 1);
        self.engine.stepping = stepping;
        executed
    }

    /// Status of one list
    pub fn list_sync(&self, id: ListId) -> Result<ListStatus> {
        let list = self.lists.get(id).ok_or(GeError::InvalidListId { id })?;
        Ok(match list.state {
            ListState::None => return Err(GeError::InvalidListId { id }.into()),
            ListState::Queued => ListStatus::Queued,
            ListState::Running if list.pc == list.stall => ListStatus::Stalling,
            ListState::Running => ListStatus::Drawing,
            ListState::Paused(PauseReason::Stall) => ListStatus::Stalling,
            ListState::Paused(_) => ListStatus::Paused,
            ListState::Completed(_) => ListStatus::Completed,
        })
    }

    /// Status of the queue as a whole
    pub fn draw_sync(&self) -> DrawStatus {
        let Some(top) = self
            .queue
            .iter()
            .map(|&id| &self.lists[id])
            .find(|l| l.is_active())
        else {
            return DrawStatus::Completed;
        };

        if top.pc == top.stall || top.state == ListState::Paused(PauseReason::Stall) {
            DrawStatus::Stalling
        } else {
            DrawStatus::Drawing
        }
    }

    pub fn perform_memory_copy(&mut self, mem: &mut GuestMemory, dst: u32, src: u32, size: u32) -> Result<()> {
        self.engine.perform_memory_copy(mem, dst, src, size)
    }

    pub fn perform_memory_set(&mut self, mem: &mut GuestMemory, dst: u32, value: u8, size: u32) -> Result<()> {
        self.engine.perform_memory_set(mem, dst, value, size)
    }

    pub fn invalidate_cache(&mut self, address: u32, size: u32) {
        self.engine.invalidate_cache(address, size);
    }

    pub fn framebuffer_dirty(&mut self) -> bool {
        self.engine.framebuffer_dirty()
    }

    pub fn device_lost(&mut self) {
        self.engine.device_lost();
    }

    pub fn device_restore(&mut self) -> Result<()> {
        self.engine.device_restore()
    }

    /// Read-only view of registers, lists and counters
    pub fn snapshot(&self) -> GeSnapshot {
        let engine = &self.engine;
        GeSnapshot {
            registers: engine.regs.raw_slots().to_vec(),
            matrices: engine.regs.matrices.clone(),
            pending_dirty: engine.dirty,
            vertex_addr: engine.state.vertex_addr,
            index_addr: engine.state.index_addr,
            offset_addr: engine.state.offset_addr,
            morph_weights: engine.state.morph_weights,
            device_lost: engine.device_lost,
            stats: engine.stats,
            invalidation: engine.caches.stats(),
            lists: self
                .lists
                .iter()
                .filter(|l| l.state != ListState::None)
                .map(|l| ListSnapshot {
                    id: l.id,
                    state: l.state,
                    start_pc: l.start_pc,
                    pc: l.pc,
                    stall: l.stall,
                    stack_depth: l.stack.depth(),
                    signal: l.signal,
                    token: l.token,
                })
                .collect(),
            queue: self.queue.iter().copied().collect(),
        }
    }
}
