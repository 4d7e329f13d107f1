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

/// Emulator error types
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the GE core
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Invalid memory access at 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    #[error("Invalid memory range: {size} bytes at 0x{address:08X}")]
    InvalidMemoryRange { address: u32, size: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("GE error: {0}")]
    Ge(#[from] GeError),

    #[error("Dispatch table error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Block transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Save state error: {0}")]
    SaveState(#[from] SaveStateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the display list queue API
///
/// These mirror the failures the OS layer sees when it calls into the GE
/// (enqueue, dequeue, stall updates, continue, break). They are returned to
/// the caller and never affect lists that are already executing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeError {
    #[error("Invalid display list address 0x{address:08X} (stall 0x{stall:08X})")]
    InvalidListAddress { address: u32, stall: u32 },

    #[error("Display list address 0x{address:08X} already in use by list {id}")]
    ListAddressInUse { address: u32, id: usize },

    #[error("Invalid display list id: {id}")]
    InvalidListId { id: usize },

    #[error("No free display list slot")]
    NoFreeListSlot,

    #[error("Display list {id} has already started")]
    ListBusy { id: usize },

    #[error("Display list {id} has already completed")]
    ListAlreadyCompleted { id: usize },

    #[error("No display list is current")]
    NoCurrentList,

    #[error("Display list {id} is not paused")]
    NotPaused { id: usize },

    #[error("Cannot insert at head: current list {id} is not paused")]
    HeadInsertRejected { id: usize },

    #[error("GE worker thread is not running")]
    WorkerDisconnected,
}

/// Errors produced while building the dispatch table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Opcode 0x{opcode:02X} registered twice with conflicting entries")]
    DuplicateRegistration { opcode: u8 },

    #[error("Opcode 0x{opcode:02X} has no dispatch entry")]
    MissingOpcode { opcode: u8 },
}

/// Block transfer validation failures
///
/// A failed validation aborts the transfer before any byte is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Invalid block transfer source 0x{address:08X}")]
    InvalidSource { address: u32 },

    #[error("Invalid block transfer destination 0x{address:08X}")]
    InvalidDestination { address: u32 },

    #[error("Block transfer source range ends out of bounds at 0x{end:08X}")]
    SourceOutOfBounds { end: u32 },

    #[error("Block transfer destination range ends out of bounds at 0x{end:08X}")]
    DestinationOutOfBounds { end: u32 },
}

/// Render backend failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Render device lost")]
    DeviceLost,

    #[error("Render backend unavailable: {0}")]
    Unavailable(String),
}

/// Save state failures
#[derive(Error, Debug)]
pub enum SaveStateError {
    #[error("Incompatible save state version: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Corrupt save state: {0}")]
    Corrupt(String),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Reasons a single display list terminates abnormally
///
/// A fault only ever ends the list it occurred in. It is stored in the
/// list's `Completed` state rather than propagated to the caller.
#[derive(
    Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum ListFault {
    #[error("CALL at 0x{pc:08X} exceeded the call stack depth")]
    StackOverflow { pc: u32 },

    #[error("RET at 0x{pc:08X} with an empty call stack")]
    StackUnderflow { pc: u32 },

    #[error("Branch at 0x{pc:08X} to invalid address 0x{target:08X}")]
    InvalidBranchTarget { pc: u32, target: u32 },

    #[error("Command fetch from invalid address 0x{pc:08X}")]
    InvalidProgramCounter { pc: u32 },

    #[error("List interrupted by break request")]
    Break,
}
