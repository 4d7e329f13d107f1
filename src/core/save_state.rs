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

//! Save state serialization for the GE command processor
//!
//! A save state captures everything needed to resume display list
//! execution: the 256 raw command slots, decoded matrices, the derived
//! vertex/offset/morph state, every list slot with its call stack, and the
//! run queue. Guest memory can be included so a state restores on its own.
//!
//! # Save State Format
//!
//! States are encoded with bincode using little-endian, fixed-width
//! integers, so the blob layout does not depend on the host.
//!
//! # Restore
//!
//! Restoring writes the raw slots back without running any handler, then
//! drops every cache (`All` invalidation) and marks all derived state dirty,
//! since nothing the renderer holds can be trusted to match.
//!
//! # Example
//!
//! ```no_run
//! use gerx::core::config::GeConfig;
//! use gerx::core::ge::{GeProcessor, NullBackend, NullListener};
//! use gerx::core::memory::GuestMemory;
//! use gerx::core::save_state::SaveState;
//!
//! let mut mem = GuestMemory::new();
//! let mut ge = GeProcessor::new(GeConfig::default(), NullBackend::new(), Box::new(NullListener)).unwrap();
//! // ... enqueue and run lists ...
//!
//! let state = SaveState::from_processor(&ge, Some(&mem));
//! state.save_to_file("ge.state").unwrap();
//!
//! let loaded = SaveState::load_from_file("ge.state").unwrap();
//! loaded.apply_to(&mut ge, Some(&mut mem)).unwrap();
//! ```

use crate::core::error::{Result, SaveStateError};
use crate::core::ge::{
    CallFrame, DirtyFlags, DisplayList, GeProcessor, InvalidationKind, ListId, ListState,
    MatrixSet, PrimitiveType, RenderBackend, SignalBehaviour,
};
use crate::core::memory::GuestMemory;
use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Save state version for compatibility checking
///
/// Incremented whenever the encoded layout changes.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Magic bytes at the start of every encoded state
const MAGIC: [u8; 4] = *b"GESV";

/// Complete GE save state
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct SaveState {
    pub magic: [u8; 4],

    /// Version number for compatibility checking
    pub version: u32,

    pub metadata: SaveStateMetadata,

    pub registers: RegisterState,

    pub lists: ListQueueState,

    /// Guest memory, if it was captured
    pub memory: Option<MemoryState>,
}

/// Save state metadata
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SaveStateMetadata {
    /// When the state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Commands executed since power-on
    pub commands: u64,

    /// Estimated GE cycles since power-on
    pub cycles: u64,
}

/// Register file and derived command state
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct RegisterState {
    /// Raw word last written to each opcode slot
    pub raw: Vec<u32>,

    pub world: [u32; 12],
    pub view: [u32; 12],
    pub projection: [u32; 16],
    pub texgen: [u32; 12],
    pub bone: Vec<u32>,

    pub vertex_addr: u32,
    pub index_addr: u32,
    pub offset_addr: u32,
    pub morph_weights: [f32; 8],
    pub texture_width: u32,
    pub texture_height: u32,
    pub matrix_cursors: [u32; 5],
    pub deferred_vertex_type_dirty: u64,

    #[bincode(with_serde)]
    pub last_primitive: Option<PrimitiveType>,
}

/// One display list slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ListRecord {
    pub start_pc: u32,
    pub pc: u32,
    pub stall: u32,
    pub frames: Vec<CallFrame>,
    pub state: ListState,
    pub signal: SignalBehaviour,
    pub token: u16,
    pub started: bool,
    pub bbox_result: bool,
}

/// List slots and run queue
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct ListQueueState {
    pub slots: Vec<ListRecord>,
    /// Slot ids in run order
    pub queue: Vec<u32>,
    pub next_list_id: u32,
}

/// Guest memory contents
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct MemoryState {
    pub ram: Vec<u8>,
    pub vram: Vec<u8>,
    pub scratchpad: Vec<u8>,
}

impl ListRecord {
    fn capture(list: &DisplayList) -> Self {
        Self {
            start_pc: list.start_pc,
            pc: list.pc,
            stall: list.stall,
            frames: list.stack.frames().to_vec(),
            state: list.state,
            signal: list.signal,
            token: list.token,
            started: list.started,
            bbox_result: list.bbox_result,
        }
    }

    fn restore_into(&self, list: &mut DisplayList) {
        list.start_pc = self.start_pc;
        list.pc = self.pc;
        list.stall = self.stall;
        list.stack.clear();
        for frame in &self.frames {
            // Depth was checked against the stack limit before restoring
            list.stack.push(*frame);
        }
        list.state = self.state;
        list.signal = self.signal;
        list.token = self.token;
        list.started = self.started;
        list.bbox_result = self.bbox_result;
    }
}

impl MemoryState {
    fn capture(mem: &GuestMemory) -> Result<Self> {
        Ok(Self {
            ram: mem.slice(GuestMemory::RAM_START, mem.ram_size())?.to_vec(),
            vram: mem
                .slice(GuestMemory::VRAM_START, GuestMemory::VRAM_SIZE)?
                .to_vec(),
            scratchpad: mem
                .slice(GuestMemory::SCRATCHPAD_START, GuestMemory::SCRATCHPAD_SIZE)?
                .to_vec(),
        })
    }

    fn check(&self, mem: &GuestMemory) -> std::result::Result<(), SaveStateError> {
        if self.ram.len() != mem.ram_size() as usize
            || self.vram.len() != GuestMemory::VRAM_SIZE as usize
            || self.scratchpad.len() != GuestMemory::SCRATCHPAD_SIZE as usize
        {
            return Err(SaveStateError::Corrupt(format!(
                "memory size mismatch: state has {} bytes of RAM, target has {}",
                self.ram.len(),
                mem.ram_size()
            )));
        }
        Ok(())
    }

    fn restore_into(&self, mem: &mut GuestMemory) -> Result<()> {
        mem.slice_mut(GuestMemory::RAM_START, mem.ram_size())?
            .copy_from_slice(&self.ram);
        mem.slice_mut(GuestMemory::VRAM_START, GuestMemory::VRAM_SIZE)?
            .copy_from_slice(&self.vram);
        mem.slice_mut(GuestMemory::SCRATCHPAD_START, GuestMemory::SCRATCHPAD_SIZE)?
            .copy_from_slice(&self.scratchpad);
        Ok(())
    }
}

impl SaveState {
    /// Capture the state of a processor
    ///
    /// # Arguments
    ///
    /// * `ge` - Processor to capture
    /// * `mem` - Guest memory to include, if any
    ///
    /// # Returns
    ///
    /// SaveState containing the register file, derived state and lists.
    /// Memory that cannot be read is left out and logged.
    pub fn from_processor<B: RenderBackend>(ge: &GeProcessor<B>, mem: Option<&GuestMemory>) -> Self {
        let engine = &ge.engine;
        let regs = &engine.regs;
        let state = &engine.state;
        let matrices = &regs.matrices;

        let memory = mem.and_then(|mem| match MemoryState::capture(mem) {
            Ok(memory) => Some(memory),
            Err(e) => {
                log::error!("Failed to capture guest memory: {}", e);
                None
            }
        });

        Self {
            magic: MAGIC,
            version: SAVE_STATE_VERSION,
            metadata: SaveStateMetadata {
                timestamp: Utc::now(),
                commands: engine.stats.commands,
                cycles: engine.stats.cycles,
            },
            registers: RegisterState {
                raw: regs.raw_slots().to_vec(),
                world: matrices.world,
                view: matrices.view,
                projection: matrices.projection,
                texgen: matrices.texgen,
                bone: matrices.bone.clone(),
                vertex_addr: state.vertex_addr,
                index_addr: state.index_addr,
                offset_addr: state.offset_addr,
                morph_weights: state.morph_weights,
                texture_width: state.texture_width,
                texture_height: state.texture_height,
                matrix_cursors: state.matrix_cursors,
                deferred_vertex_type_dirty: state.deferred_vertex_type_dirty.bits(),
                last_primitive: state.last_primitive,
            },
            lists: ListQueueState {
                slots: ge.lists.iter().map(ListRecord::capture).collect(),
                queue: ge.queue.iter().map(|&id| id as u32).collect(),
                next_list_id: ge.next_list_id as u32,
            },
            memory,
        }
    }

    /// Restore this state into a processor
    ///
    /// Everything is validated before anything is written, so a rejected
    /// state leaves the processor and memory untouched. Pending immediate
    /// vertices are discarded and every cache is invalidated.
    ///
    /// # Arguments
    ///
    /// * `ge` - Processor to restore into; must have the same slot count
    /// * `mem` - Guest memory to overwrite when the state carries memory
    pub fn apply_to<B: RenderBackend>(&self, ge: &mut GeProcessor<B>, mem: Option<&mut GuestMemory>) -> Result<()> {
        self.validate(ge)?;
        if let (Some(memory), Some(mem)) = (&self.memory, mem.as_deref()) {
            memory.check(mem)?;
        }

        let mut raw = [0u32; 256];
        raw.copy_from_slice(&self.registers.raw);

        let engine = &mut ge.engine;
        engine.regs.load_raw_slots(&raw);
        engine.regs.matrices = MatrixSet {
            world: self.registers.world,
            view: self.registers.view,
            projection: self.registers.projection,
            texgen: self.registers.texgen,
            bone: self.registers.bone.clone(),
        };

        let state = &mut engine.state;
        state.reset();
        state.vertex_addr = self.registers.vertex_addr;
        state.index_addr = self.registers.index_addr;
        state.offset_addr = self.registers.offset_addr;
        state.morph_weights = self.registers.morph_weights;
        state.texture_width = self.registers.texture_width;
        state.texture_height = self.registers.texture_height;
        state.matrix_cursors = self.registers.matrix_cursors;
        state.deferred_vertex_type_dirty =
            DirtyFlags::from_bits_retain(self.registers.deferred_vertex_type_dirty);
        state.last_primitive = self.registers.last_primitive;

        engine.stats.commands = self.metadata.commands;
        engine.stats.cycles = self.metadata.cycles;

        for (list, record) in ge.lists.iter_mut().zip(&self.lists.slots) {
            record.restore_into(list);
        }
        ge.queue = self.lists.queue.iter().map(|&id| id as ListId).collect();
        ge.next_list_id = self.lists.next_list_id as ListId;

        if let (Some(memory), Some(mem)) = (&self.memory, mem) {
            memory.restore_into(mem)?;
        }

        ge.engine.invalidate(0, 0, InvalidationKind::All);
        ge.engine.dirty = DirtyFlags::all();

        log::info!(
            "Restored GE state from {} ({} lists queued)",
            self.metadata.timestamp.format("%Y-%m-%d %H:%M:%S"),
            ge.queue.len()
        );
        Ok(())
    }

    fn validate<B: RenderBackend>(&self, ge: &GeProcessor<B>) -> std::result::Result<(), SaveStateError> {
        if self.magic != MAGIC {
            return Err(SaveStateError::Corrupt("bad magic".to_string()));
        }
        if self.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: self.version,
            });
        }
        if self.registers.raw.len() != 256 {
            return Err(SaveStateError::Corrupt(format!(
                "{} register slots",
                self.registers.raw.len()
            )));
        }
        if self.registers.bone.len() != MatrixSet::new().bone.len() {
            return Err(SaveStateError::Corrupt(format!(
                "{} bone matrix elements",
                self.registers.bone.len()
            )));
        }

        let slots = &self.lists.slots;
        if slots.len() != ge.lists.len() {
            return Err(SaveStateError::Corrupt(format!(
                "state has {} list slots, processor has {}",
                slots.len(),
                ge.lists.len()
            )));
        }
        let limit = ge.engine.config.call_stack_depth as usize;
        if let Some(deep) = slots.iter().position(|s| s.frames.len() > limit) {
            return Err(SaveStateError::Corrupt(format!(
                "list {} call stack exceeds depth {}",
                deep, limit
            )));
        }

        let mut seen = vec![false; slots.len()];
        for &id in &self.lists.queue {
            let id = id as usize;
            let queued = slots.get(id).is_some_and(|s| !s.state.is_terminal());
            if !queued || std::mem::replace(&mut seen[id], true) {
                return Err(SaveStateError::Corrupt(format!("bad queue entry {}", id)));
            }
        }
        if self.lists.next_list_id as usize >= slots.len() {
            return Err(SaveStateError::Corrupt(format!(
                "next list id {} out of range",
                self.lists.next_list_id
            )));
        }
        Ok(())
    }

    /// Encode into a flat little-endian blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = bincode::encode_to_vec(self, Self::config()).map_err(SaveStateError::from)?;
        Ok(bytes)
    }

    /// Decode a blob produced by [`to_bytes`](Self::to_bytes)
    ///
    /// # Returns
    ///
    /// - `Ok(state)` if the blob decodes and its version matches
    /// - `Err(SaveStateError::VersionMismatch)` for states from another version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 || bytes[..4] != MAGIC {
            return Err(SaveStateError::Corrupt("bad magic".to_string()).into());
        }
        // Check the version before decoding the rest, whose layout may differ
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: version,
            }
            .into());
        }

        let (state, _): (SaveState, usize) =
            bincode::decode_from_slice(bytes, Self::config()).map_err(SaveStateError::from)?;
        Ok(state)
    }

    /// Save state to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(&encoded)?;
        log::info!(
            "Saved GE state ({} bytes) to {}",
            encoded.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load save state from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }

    fn config() -> impl config::Config {
        config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GeConfig;
    use crate::core::error::EmulatorError;
    use crate::core::ge::{
        opcodes, CommandWord, GeProcessor, NullListener, PauseReason, RecordingBackend,
    };

    const LIST: u32 = 0x0880_0000;
    const SUB: u32 = LIST + 0x100;

    fn cmd(opcode: u8, payload: u32) -> u32 {
        CommandWord::new(opcode, payload).0
    }

    fn processor() -> GeProcessor<RecordingBackend> {
        GeProcessor::new(GeConfig::default(), RecordingBackend::new(), Box::new(NullListener)).unwrap()
    }

    /// Run a list that stalls inside a CALL
    fn stalled_in_call() -> (GeProcessor<RecordingBackend>, GuestMemory, ListId) {
        let mut mem = GuestMemory::new();
        mem.write_words(
            LIST,
            &[
                cmd(opcodes::BASE, 0x08_0000),
                cmd(opcodes::VERTEXTYPE, 0x00_0180),
                cmd(opcodes::MORPHWEIGHT0, 0x3F_8000),
                cmd(opcodes::CALL, SUB & 0x00FF_FFFF),
                cmd(opcodes::FINISH, 0),
                cmd(opcodes::END, 0),
            ],
        )
        .unwrap();
        mem.write_words(
            SUB,
            &[
                cmd(opcodes::WORLDMATRIXNUMBER, 0),
                cmd(opcodes::WORLDMATRIXDATA, 0x3F_8000),
                cmd(opcodes::RET, 0),
            ],
        )
        .unwrap();

        let mut ge = processor();
        let id = ge.enqueue(&mem, LIST, SUB + 8, false).unwrap();
        ge.run(&mut mem, 1000);
        (ge, mem, id)
    }

    #[test]
    fn test_save_state_version() {
        assert_eq!(SAVE_STATE_VERSION, 1);
    }

    #[test]
    fn test_capture_mid_call() {
        let (ge, mem, id) = stalled_in_call();
        let state = SaveState::from_processor(&ge, Some(&mem));

        let record = &state.lists.slots[id];
        assert_eq!(record.state, ListState::Paused(PauseReason::Stall));
        assert_eq!(record.pc, SUB + 8);
        assert_eq!(record.frames.len(), 1);
        assert_eq!(record.frames[0].return_pc, LIST + 16);
        assert_eq!(state.lists.queue, vec![id as u32]);
        assert_eq!(state.registers.raw[opcodes::VERTEXTYPE as usize], cmd(opcodes::VERTEXTYPE, 0x00_0180));
        assert_eq!(state.registers.world[0], 0x3F80_0000);
        assert_eq!(state.registers.morph_weights[0], 1.0);
        assert_eq!(state.memory.as_ref().map(|m| m.ram.len()), Some(mem.ram_size() as usize));
    }

    #[test]
    fn test_restore_resumes_list() {
        let (ge, mem, id) = stalled_in_call();
        let bytes = SaveState::from_processor(&ge, Some(&mem)).to_bytes().unwrap();

        let mut restored = processor();
        let mut restored_mem = GuestMemory::new();
        SaveState::from_bytes(&bytes)
            .unwrap()
            .apply_to(&mut restored, Some(&mut restored_mem))
            .unwrap();

        assert_eq!(restored.engine().registers().raw_slots(), ge.engine().registers().raw_slots());
        assert_eq!(restored.engine().registers().matrices, ge.engine().registers().matrices);
        assert_eq!(restored.engine().state().vertex_addr, ge.engine().state().vertex_addr);
        assert_eq!(restored.list(id).unwrap().stack.depth(), 1);
        assert_eq!(restored.queue().collect::<Vec<_>>(), vec![id]);
        assert_eq!(restored_mem.read_u32(SUB).unwrap(), cmd(opcodes::WORLDMATRIXNUMBER, 0));

        // RET, FINISH, END
        restored.update_stall(id, 0).unwrap();
        restored.run(&mut restored_mem, 1000);
        assert_eq!(restored.list(id).unwrap().state, ListState::Completed(None));
    }

    #[test]
    fn test_restore_triggers_full_invalidation() {
        let (ge, _, _) = stalled_in_call();
        let state = SaveState::from_processor(&ge, None);

        let mut restored = processor();
        let before = restored.engine().caches().stats().all;
        state.apply_to(&mut restored, None).unwrap();

        assert_eq!(restored.engine().caches().stats().all, before + 1);
        assert_eq!(restored.engine().pending_dirty(), DirtyFlags::all());
        assert!(restored.engine().state().render_target.is_none());
    }

    #[test]
    fn test_encoding_is_little_endian() {
        let ge = processor();
        let bytes = SaveState::from_processor(&ge, None).to_bytes().unwrap();

        assert_eq!(&bytes[..4], b"GESV");
        assert_eq!(&bytes[4..8], &SAVE_STATE_VERSION.to_le_bytes());
    }

    #[test]
    fn test_version_check() {
        let ge = processor();
        let mut bytes = SaveState::from_processor(&ge, None).to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());

        match SaveState::from_bytes(&bytes) {
            Err(EmulatorError::SaveState(SaveStateError::VersionMismatch { expected, got })) => {
                assert_eq!(expected, SAVE_STATE_VERSION);
                assert_eq!(got, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_truncated_state_rejected() {
        let ge = processor();
        let bytes = SaveState::from_processor(&ge, None).to_bytes().unwrap();

        assert!(SaveState::from_bytes(&bytes[..bytes.len() / 2]).is_err());
        assert!(SaveState::from_bytes(b"nope").is_err());
    }

    #[test]
    fn test_slot_count_mismatch_leaves_target_untouched() {
        let (ge, _, _) = stalled_in_call();
        let state = SaveState::from_processor(&ge, None);

        let mut config = GeConfig::default();
        config.max_display_lists = 4;
        let mut other = GeProcessor::new(config, RecordingBackend::new(), Box::new(NullListener)).unwrap();

        assert!(state.apply_to(&mut other, None).is_err());
        assert_eq!(other.engine().registers().raw(opcodes::VERTEXTYPE), cmd(opcodes::VERTEXTYPE, 0));
    }

    #[test]
    fn test_bad_queue_rejected() {
        let ge = processor();
        let mut state = SaveState::from_processor(&ge, None);
        // Slot 0 is unused, so it cannot be queued
        state.lists.queue.push(0);

        let mut target = processor();
        assert!(state.apply_to(&mut target, None).is_err());
    }

    #[test]
    fn test_save_load_file() {
        let (ge, mem, id) = stalled_in_call();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ge.state");

        SaveState::from_processor(&ge, Some(&mem)).save_to_file(&path).unwrap();
        let loaded = SaveState::load_from_file(&path).unwrap();

        assert_eq!(loaded.lists.slots[id].pc, SUB + 8);
        assert_eq!(loaded.metadata.commands, ge.stats().commands);
    }
}
