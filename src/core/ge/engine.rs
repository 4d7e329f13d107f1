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

//! Command engine
//!
//! `CommandEngine` owns everything a display list mutates while it runs:
//! the register file, the derived state cache, the dispatch table, the
//! pending dirty set, the caches and the render backend. Display lists and
//! guest memory are passed in explicitly for every run, so handlers never
//! reach for an implicit "current list".
//!
//! The run loop lives in `run_loop.rs` and the per-command handlers in
//! `handlers/`.

use super::backend::{PrimitiveBatch, RenderBackend, VertexSource};
use super::debug::CommandTracer;
use super::dirty::DirtyFlags;
use super::dispatch::DispatchTable;
use super::display_list::DisplayList;
use super::invalidation::{CacheCoordinator, InvalidationKind};
use super::listener::GeListener;
use super::registers::RegisterFile;
use super::state::GeState;
use crate::core::config::GeConfig;
use crate::core::error::{BackendError, ListFault, Result};
use crate::core::memory::GuestMemory;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Execution counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeStats {
    pub commands: u64,
    pub flushes: u64,
    pub draws: u64,
    pub vertices: u64,
    pub patches: u64,
    pub block_transfers: u64,
    pub block_transfer_bytes: u64,
    pub cycles: u64,
    pub lists_completed: u64,
    pub list_faults: u64,
    pub unknown_commands: u64,
}

/// Which lists a break request applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakMode {
    /// Only the list at the head of the queue
    Current,
    /// Every list that has not completed
    All,
}

/// Shareable handle for requesting a break
///
/// The run loop checks the request between commands only, so no command is
/// ever partially applied.
#[derive(Debug, Clone, Default)]
pub struct BreakHandle(Arc<AtomicU8>);

impl BreakHandle {
    const NONE: u8 = 0;
    const CURRENT: u8 = 1;
    const ALL: u8 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, mode: BreakMode) {
        let value = match mode {
            BreakMode::Current => Self::CURRENT,
            BreakMode::All => Self::ALL,
        };
        // An "all" request is never downgraded
        self.0.fetch_max(value, Ordering::AcqRel);
    }

    #[inline(always)]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Relaxed) != Self::NONE
    }

    pub(crate) fn take(&self) -> Option<BreakMode> {
        match self.0.swap(Self::NONE, Ordering::AcqRel) {
            Self::CURRENT => Some(BreakMode::Current),
            Self::ALL => Some(BreakMode::All),
            _ => None,
        }
    }
}

/// Backend-agnostic GE execution core
pub struct CommandEngine<B: RenderBackend> {
    pub(crate) regs: RegisterFile,
    pub(crate) state: GeState,
    pub(crate) table: DispatchTable,
    pub(crate) backend: B,
    pub(crate) listener: Box<dyn GeListener + Send>,
    pub(crate) caches: CacheCoordinator,

    /// Dirty categories not yet handed to the backend
    pub(crate) dirty: DirtyFlags,

    pub(crate) config: GeConfig,
    pub(crate) stats: GeStats,

    /// Commands left in the current run slice
    pub(crate) downcount: i64,

    pub(crate) device_lost: bool,

    /// Force the instrumented slow path
    pub(crate) stepping: bool,
    pub(crate) tracer: Option<CommandTracer>,

    pub(crate) break_request: BreakHandle,
}

impl<B: RenderBackend> CommandEngine<B> {
    /// Create an engine and build its dispatch table
    ///
    /// # Returns
    ///
    /// - `Err(EmulatorError::Config)` if the configuration is invalid
    /// - `Err(EmulatorError::Dispatch)` if the backend overrides conflict
    pub fn new(config: GeConfig, backend: B, listener: Box<dyn GeListener + Send>) -> Result<Self> {
        config.validate()?;
        let table = DispatchTable::build(config.dispatch(), &backend.command_overrides())?;

        log::info!("GE command engine ready ({} backend)", backend.name());

        Ok(Self {
            regs: RegisterFile::new(),
            state: GeState::new(),
            table,
            backend,
            listener,
            caches: CacheCoordinator::new(),
            dirty: DirtyFlags::all(),
            config,
            stats: GeStats::default(),
            downcount: 0,
            device_lost: false,
            stepping: false,
            tracer: None,
            break_request: BreakHandle::new(),
        })
    }

    /// Return registers and derived state to power-on values
    pub fn reset(&mut self) {
        self.regs.reset();
        self.state.reset();
        self.dirty = DirtyFlags::all();
        self.caches.invalidate(0, 0, InvalidationKind::All);
        self.stats = GeStats::default();
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn state(&self) -> &GeState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn caches(&self) -> &CacheCoordinator {
        &self.caches
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn config(&self) -> &GeConfig {
        &self.config
    }

    pub fn stats(&self) -> GeStats {
        self.stats
    }

    /// Dirty categories waiting for the next flush
    pub fn pending_dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost
    }

    pub fn break_handle(&self) -> BreakHandle {
        self.break_request.clone()
    }

    pub fn set_listener(&mut self, listener: Box<dyn GeListener + Send>) {
        self.listener = listener;
    }

    #[inline(always)]
    pub(crate) fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    /// Toggle software skinning and rebuild the dispatch table
    pub fn set_software_skinning(&mut self, enabled: bool) -> Result<()> {
        if self.config.software_skinning == enabled {
            return Ok(());
        }
        self.flush();
        let mut config = self.config.clone();
        config.software_skinning = enabled;
        self.table = DispatchTable::build(config.dispatch(), &self.backend.command_overrides())?;
        self.config = config;
        self.mark_dirty(DirtyFlags::VERTEXSHADER_STATE | DirtyFlags::BONE_MATRICES);
        log::info!("Software skinning {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Submit buffered geometry and hand pending dirty state to the backend
    ///
    /// Refused while the render device is lost; pending dirty state is kept
    /// until the device is restored.
    pub fn flush(&mut self) {
        if self.device_lost {
            log::trace!("Flush skipped: render device lost");
            return;
        }

        self.submit_immediate();

        if !self.dirty.is_empty() {
            let dirty = std::mem::take(&mut self.dirty);
            self.backend.notify_dirty(dirty);
        }

        match self.backend.flush(&self.regs) {
            Ok(()) => self.stats.flushes += 1,
            Err(err) => self.handle_backend_error(err),
        }
    }

    /// Submit buffered immediate vertices as one batch
    pub(crate) fn submit_immediate(&mut self) {
        if self.state.immediate.is_empty() {
            return;
        }
        let Some(primitive) = self.state.immediate.primitive else {
            self.state.immediate.clear();
            return;
        };

        if !self.device_lost {
            let vertices = std::mem::take(&mut self.state.immediate.vertices);
            let batch = PrimitiveBatch {
                primitive,
                vertex_type: self.regs.vertex_type(),
                count: vertices.len() as u32,
                vertex_address: 0,
                index_address: None,
                source: VertexSource::Immediate(&vertices),
            };
            let result = self.backend.submit_primitives(&batch);
            self.stats.draws += 1;
            self.stats.vertices += vertices.len() as u64;
            if let Err(err) = result {
                self.handle_backend_error(err);
            }
        }
        self.state.immediate.clear();
    }

    pub(crate) fn handle_backend_error(&mut self, err: BackendError) {
        match err {
            BackendError::DeviceLost => self.device_lost(),
            other => log::error!("Render backend {} failed: {}", self.backend.name(), other),
        }
    }

    /// Enter the device-lost state
    ///
    /// All caches are dropped and flushes are refused until
    /// [`device_restore`](Self::device_restore) succeeds.
    pub fn device_lost(&mut self) {
        if self.device_lost {
            return;
        }
        log::error!("Render device lost ({} backend); dropping caches", self.backend.name());
        self.device_lost = true;
        self.state.immediate.clear();
        self.state.render_target = None;
        self.caches.invalidate(0, 0, InvalidationKind::All);
        self.listener.on_device_lost();
    }

    /// Rebuild backend resources after a device loss
    pub fn device_restore(&mut self) -> Result<()> {
        if !self.device_lost {
            return Ok(());
        }
        self.backend.restore()?;
        self.device_lost = false;
        self.state.render_target = None;
        self.caches.invalidate(0, 0, InvalidationKind::All);
        self.dirty = DirtyFlags::all();
        log::info!("Render device restored");
        Ok(())
    }

    /// Invalidate caches over a guest memory range
    pub fn invalidate(&mut self, address: u32, size: u32, kind: InvalidationKind) {
        self.caches.invalidate(address, size, kind);
    }

    /// Guest memcpy routed through the GE
    ///
    /// Pending geometry is flushed first if the destination overlaps a
    /// render target, since the copy may overwrite what is being drawn.
    pub fn perform_memory_copy(&mut self, mem: &mut GuestMemory, dst: u32, src: u32, size: u32) -> Result<()> {
        if self.caches.framebuffers.intersects(dst, size) || self.caches.framebuffers.intersects(src, size) {
            self.flush();
        }
        mem.copy(dst, src, size)?;
        mem.notify_access(src, size, false, "GPUMemcpy");
        mem.notify_access(dst, size, true, "GPUMemcpy");
        self.caches.invalidate(dst, size, InvalidationKind::Hint);
        Ok(())
    }

    /// Guest memset routed through the GE
    pub fn perform_memory_set(&mut self, mem: &mut GuestMemory, dst: u32, value: u8, size: u32) -> Result<()> {
        if self.caches.framebuffers.intersects(dst, size) {
            self.flush();
        }
        mem.fill(dst, value, size)?;
        mem.notify_access(dst, size, true, "GPUMemset");
        self.caches.invalidate(dst, size, InvalidationKind::Hint);
        Ok(())
    }

    /// Generic CPU write notification; the writer is unknown, so `Safe`
    pub fn invalidate_cache(&mut self, address: u32, size: u32) {
        self.caches.invalidate(address, size, InvalidationKind::Safe);
    }

    /// Whether the displayed framebuffer was drawn since the last query
    pub fn framebuffer_dirty(&mut self) -> bool {
        self.caches.framebuffers.take_dirty()
    }

    /// End a list with a fault
    pub(crate) fn fault_list(&mut self, list: &mut DisplayList, fault: ListFault) {
        log::error!("Display list {} terminated: {}", list.id, fault);
        list.complete(Some(fault));
        self.stats.list_faults += 1;
        self.listener.on_list_fault(list.id, fault);
    }
}
