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

//! Debugging aids
//!
//! [`CommandTracer`] writes one line per command executed on the slow path,
//! and [`GeSnapshot`] captures processor state as JSON for offline
//! inspection.

use super::command::CommandWord;
use super::dirty::DirtyFlags;
use super::display_list::{ListId, ListState, SignalBehaviour};
use super::engine::GeStats;
use super::invalidation::InvalidationStats;
use super::registers::MatrixSet;
use crate::core::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// In-memory trace sink that stays readable after the tracer is installed
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer(Arc<Mutex<Vec<u8>>>);

impl TraceBuffer {
    /// Everything written so far, as text
    pub fn contents(&self) -> String {
        let bytes = match self.0.lock() {
            Ok(bytes) => bytes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for TraceBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut bytes) => bytes.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Command execution tracer
///
/// Each line shows the list, the PC, the raw word, its disassembly and the
/// diff against the previous value of the register:
///
/// ```text
/// L0 PC=0x08800004 [0x12000180] VERTEXTYPE 0x000180       diff=0x000180
/// ```
///
/// Installing a tracer routes execution through the slow path.
///
/// # Example
///
/// ```
/// use gerx::core::ge::CommandTracer;
///
/// let (mut tracer, buffer) = CommandTracer::in_memory();
/// tracer.record(0, 0x0880_0000, 0x1200_0180, 0x180).unwrap();
/// assert!(buffer.contents().contains("VERTEXTYPE"));
/// ```
pub struct CommandTracer {
    enabled: bool,
    output: Box<dyn Write + Send>,
    lines: u64,
}

impl CommandTracer {
    /// Trace into an arbitrary writer
    pub fn new(output: Box<dyn Write + Send>) -> Self {
        Self {
            enabled: true,
            output,
            lines: 0,
        }
    }

    /// Trace into a file, truncating it if it exists
    ///
    /// # Returns
    ///
    /// - `Ok(CommandTracer)` if the file was created
    /// - `Err(EmulatorError::Io)` otherwise
    pub fn to_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Trace into a shared buffer
    pub fn in_memory() -> (Self, TraceBuffer) {
        let buffer = TraceBuffer::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of lines written
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Write one trace line
    pub fn record(&mut self, list: ListId, pc: u32, word: u32, diff: u32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        writeln!(
            self.output,
            "L{} PC=0x{:08X} [0x{:08X}] {:24} diff=0x{:06X}",
            list,
            pc,
            word,
            CommandWord(word).disassemble(),
            diff & 0x00FF_FFFF
        )?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for CommandTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTracer")
            .field("enabled", &self.enabled)
            .field("lines", &self.lines)
            .finish()
    }
}

/// One display list as seen by a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ListSnapshot {
    pub id: ListId,
    pub state: ListState,
    pub start_pc: u32,
    pub pc: u32,
    pub stall: u32,
    pub stack_depth: usize,
    pub signal: SignalBehaviour,
    pub token: u16,
}

/// Point-in-time view of the processor
#[derive(Debug, Clone, Serialize)]
pub struct GeSnapshot {
    pub registers: Vec<u32>,
    pub matrices: MatrixSet,
    pub pending_dirty: DirtyFlags,
    pub vertex_addr: u32,
    pub index_addr: u32,
    pub offset_addr: u32,
    pub morph_weights: [f32; 8],
    pub device_lost: bool,
    pub stats: GeStats,
    pub invalidation: InvalidationStats,
    pub lists: Vec<ListSnapshot>,
    pub queue: Vec<ListId>,
}

impl GeSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
