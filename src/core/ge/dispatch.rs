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

//! Dispatch table
//!
//! Every opcode maps to exactly one [`DispatchEntry`]: a set of
//! [`CommandFlags`], a dirty mask and a [`Handler`]. The table is built
//! once by [`DispatchTableBuilder`] from the shared command table plus any
//! overrides the render backend supplies, and rebuilt when a setting that
//! changes command behaviour (software skinning) is toggled.
//!
//! # Flag evaluation order
//!
//! For every fetched command:
//!
//! 1. `FLUSH_BEFORE` flushes unconditionally
//! 2. `FLUSH_BEFORE_ON_CHANGE` flushes if `diff != 0`
//! 3. the word is written to the register file
//! 4. `EXECUTE` always calls the handler
//! 5. `EXECUTE_ON_CHANGE` calls the handler if `diff != 0`; entries without
//!    either execute flag OR their dirty mask into the pending set instead
//! 6. `READS_PC` / `WRITES_PC` are informational for stepping tools

use super::command::{mnemonic, opcodes};
use super::dirty::DirtyFlags;
use super::registers::MatrixKind;
use super::table::common_commands;
use crate::core::error::DispatchError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-opcode execution flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CommandFlags: u8 {
        const FLUSH_BEFORE = 1 << 0;
        const FLUSH_BEFORE_ON_CHANGE = 1 << 1;
        const EXECUTE = 1 << 2;
        const EXECUTE_ON_CHANGE = 1 << 3;
        const READS_PC = 1 << 4;
        const WRITES_PC = 1 << 5;
    }
}

/// Closed set of command handlers
///
/// Opcodes without a dedicated handler use `Legacy`, which routes to a
/// single exhaustive match over the remaining side-effect-light opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handler {
    Legacy,
    Unknown,
    OffsetAddr,
    Origin,
    Jump,
    BJump,
    Call,
    Ret,
    End,
    Vaddr,
    Iaddr,
    BoundingBox,
    Prim,
    Bezier,
    Spline,
    VertexType,
    VertexTypeSkinning,
    LoadClut,
    TexSize0,
    TexLevel,
    TexFlush,
    MorphWeight,
    BlockTransferStart,
    ImmVertexAlphaPrim,
    MatrixNum(MatrixKind),
    MatrixData(MatrixKind),
}

/// Behaviour of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchEntry {
    pub flags: CommandFlags,
    pub dirty: DirtyFlags,
    pub handler: Handler,
}

impl DispatchEntry {
    /// Whether the handler is invoked for a given diff
    #[inline(always)]
    pub fn executes(&self, diff: u32) -> bool {
        self.flags.contains(CommandFlags::EXECUTE)
            || (diff != 0 && self.flags.contains(CommandFlags::EXECUTE_ON_CHANGE))
    }

    /// Whether a diff triggers a flush before the write
    #[inline(always)]
    pub fn flushes_before(&self, diff: u32) -> bool {
        self.flags.contains(CommandFlags::FLUSH_BEFORE)
            || (diff != 0 && self.flags.contains(CommandFlags::FLUSH_BEFORE_ON_CHANGE))
    }

    /// Whether the command can move the program counter
    pub fn writes_pc(&self) -> bool {
        self.flags.contains(CommandFlags::WRITES_PC)
    }
}

/// One row of a command table before it is merged into the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRegistration {
    pub opcode: u8,
    pub flags: CommandFlags,
    pub dirty: DirtyFlags,
    pub handler: Option<Handler>,
}

impl CommandRegistration {
    /// State register with no flags
    pub const fn plain(opcode: u8) -> Self {
        Self {
            opcode,
            flags: CommandFlags::empty(),
            dirty: DirtyFlags::empty(),
            handler: None,
        }
    }

    /// State register that flushes on change and dirties `dirty`
    pub const fn state(opcode: u8, dirty: DirtyFlags) -> Self {
        Self {
            opcode,
            flags: CommandFlags::FLUSH_BEFORE_ON_CHANGE,
            dirty,
            handler: None,
        }
    }

    /// Command with a dedicated handler
    pub const fn handled(opcode: u8, flags: CommandFlags, handler: Handler) -> Self {
        Self {
            opcode,
            flags,
            dirty: DirtyFlags::empty(),
            handler: Some(handler),
        }
    }

    fn entry(&self) -> DispatchEntry {
        DispatchEntry {
            flags: self.flags,
            dirty: self.dirty,
            handler: self.handler.unwrap_or(Handler::Legacy),
        }
    }
}

/// Settings that change dispatch behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Skin vertices on the CPU; vertex type changes that only touch the
    /// weight count no longer force a flush
    pub software_skinning: bool,
}

/// Validating builder for [`DispatchTable`]
///
/// # Examples
///
/// ```
/// use gerx::core::ge::{DispatchConfig, DispatchTableBuilder};
///
/// let table = DispatchTableBuilder::new(DispatchConfig::default())
///     .with_common_commands()
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(table.entries().len(), 256);
/// ```
pub struct DispatchTableBuilder {
    slots: [Option<DispatchEntry>; 256],
    config: DispatchConfig,
}

impl DispatchTableBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            slots: [None; 256],
            config,
        }
    }

    /// Register one command
    ///
    /// Registering the same opcode again with an identical entry is
    /// accepted; a conflicting entry fails the build.
    pub fn register(&mut self, registration: CommandRegistration) -> Result<(), DispatchError> {
        let entry = registration.entry();
        let slot = &mut self.slots[registration.opcode as usize];
        match slot {
            Some(existing) if *existing != entry => {
                log::error!(
                    "Conflicting dispatch entries for {} (0x{:02X}): {:?} vs {:?}",
                    mnemonic(registration.opcode),
                    registration.opcode,
                    existing,
                    entry
                );
                Err(DispatchError::DuplicateRegistration {
                    opcode: registration.opcode,
                })
            }
            Some(_) => Ok(()),
            None => {
                *slot = Some(entry);
                Ok(())
            }
        }
    }

    /// Register every row of a table
    pub fn register_all(
        mut self,
        registrations: &[CommandRegistration],
    ) -> Result<Self, DispatchError> {
        for registration in registrations {
            self.register(*registration)?;
        }
        Ok(self)
    }

    /// Register the shared command table
    pub fn with_common_commands(self) -> Result<Self, DispatchError> {
        self.register_all(&common_commands())
    }

    /// Replace entries with backend-specific overrides
    ///
    /// An override may replace a shared entry, but the override table itself
    /// must not name an opcode twice.
    pub fn with_overrides(
        mut self,
        overrides: &[CommandRegistration],
    ) -> Result<Self, DispatchError> {
        let mut seen = [false; 256];
        for registration in overrides {
            let index = registration.opcode as usize;
            if seen[index] {
                log::error!(
                    "Backend override table names {} (0x{:02X}) twice",
                    mnemonic(registration.opcode),
                    registration.opcode
                );
                return Err(DispatchError::DuplicateRegistration {
                    opcode: registration.opcode,
                });
            }
            seen[index] = true;
            self.slots[index] = Some(registration.entry());
        }
        Ok(self)
    }

    /// Finish the table
    ///
    /// # Returns
    ///
    /// `Err(DispatchError::MissingOpcode)` for the first opcode that was
    /// never registered.
    pub fn build(mut self) -> Result<DispatchTable, DispatchError> {
        self.apply_config();

        let mut entries = [DispatchEntry {
            flags: CommandFlags::empty(),
            dirty: DirtyFlags::empty(),
            handler: Handler::Legacy,
        }; 256];

        for (opcode, slot) in self.slots.iter().enumerate() {
            match slot {
                Some(entry) => entries[opcode] = *entry,
                None => {
                    log::error!("No dispatch entry for opcode 0x{:02X}", opcode);
                    return Err(DispatchError::MissingOpcode {
                        opcode: opcode as u8,
                    });
                }
            }
        }

        Ok(DispatchTable {
            entries,
            config: self.config,
        })
    }

    fn apply_config(&mut self) {
        if let Some(entry) = &mut self.slots[opcodes::VERTEXTYPE as usize] {
            if self.config.software_skinning {
                entry.flags.remove(CommandFlags::FLUSH_BEFORE_ON_CHANGE);
                entry.handler = Handler::VertexTypeSkinning;
            } else {
                entry.flags.insert(CommandFlags::FLUSH_BEFORE_ON_CHANGE);
                entry.handler = Handler::VertexType;
            }
        }
    }
}

/// 256-entry dispatch table, indexed by opcode
#[derive(Debug, Clone)]
pub struct DispatchTable {
    entries: [DispatchEntry; 256],
    config: DispatchConfig,
}

impl DispatchTable {
    /// Build the shared table with backend overrides applied
    pub fn build(
        config: DispatchConfig,
        overrides: &[CommandRegistration],
    ) -> Result<Self, DispatchError> {
        DispatchTableBuilder::new(config)
            .with_common_commands()?
            .with_overrides(overrides)?
            .build()
    }

    #[inline(always)]
    pub fn entry(&self, opcode: u8) -> &DispatchEntry {
        &self.entries[opcode as usize]
    }

    pub fn entries(&self) -> &[DispatchEntry; 256] {
        &self.entries
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }
}
