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

//! GE (Graphics Engine) command processor
//!
//! The GE consumes display lists: arrays of 32-bit little-endian command
//! words in guest memory. Each word carries an 8-bit opcode and a 24-bit
//! payload. The processor keeps the last word written for every opcode,
//! compares each new word against it, and only does work (flushing pending
//! geometry, marking derived state dirty, running a handler) when the
//! dispatch table says the command needs it.
//!
//! # Structure
//!
//! - [`RegisterFile`] holds the 256 raw command slots and decoded matrices
//! - [`DispatchTable`] maps every opcode to flags, a dirty mask and a
//!   handler; it is built through [`DispatchTableBuilder`], which rejects
//!   conflicting registrations
//! - [`CommandEngine`] runs lists through a fast loop and a behaviour
//!   identical slow path used while tracing or stepping
//! - [`GeProcessor`] owns the list slots and the run queue
//! - [`CacheCoordinator`] routes invalidations to the texture, palette and
//!   framebuffer caches
//! - [`RenderBackend`] is the only way work reaches a renderer
//! - [`GeWorker`] runs a processor on its own thread
//!
//! # Command Word
//!
//! ```text
//!  31      24 23                       0
//! ┌──────────┬──────────────────────────┐
//! │  opcode  │         payload          │
//! └──────────┴──────────────────────────┘
//! ```

mod backend;
mod command;
mod debug;
mod dirty;
mod dispatch;
mod display_list;
mod engine;
mod handlers;
mod invalidation;
mod listener;
mod processor;
mod registers;
mod run_loop;
mod state;
mod table;
mod threaded;
mod transfer;
mod types;
mod vertex;

#[cfg(test)]
mod tests;

pub use backend::{
    BackendEvent, NullBackend, PatchBatch, PrimitiveBatch, RecordingBackend, RenderBackend,
    RenderTarget, VertexSource,
};
pub use command::{float24, mnemonic, opcodes, to_float24, CommandWord};
pub use debug::{CommandTracer, GeSnapshot, ListSnapshot, TraceBuffer};
pub use dirty::DirtyFlags;
pub use dispatch::{
    CommandFlags, CommandRegistration, DispatchConfig, DispatchEntry, DispatchTable,
    DispatchTableBuilder, Handler,
};
pub use display_list::{
    CallFrame, CallStack, DisplayList, ListId, ListState, PauseReason, SignalBehaviour,
};
pub use engine::{BreakHandle, BreakMode, CommandEngine, GeStats};
pub use invalidation::{
    CacheCoordinator, FramebufferCache, InvalidationKind, InvalidationStats, PaletteCache,
    TextureCache, TextureCacheStats, TextureEntry, TextureStatus, TrackedFramebuffer,
};
pub use listener::{GeListener, ListenerEvent, NullListener, RecordingListener};
pub use processor::{DrawStatus, GeProcessor, ListStatus};
pub use registers::{MatrixKind, MatrixSet, RegisterFile};
pub use state::{GeState, ImmediateBuffer, ImmediateVertex};
pub use table::common_commands;
pub use threaded::GeWorker;
pub use transfer::{BlockTransfer, CopyMode, TransferCost, TransferReport};
pub use types::{PatchKind, PatchPrimitive, PixelFormat, PrimitiveType, SplineEdge, TextureFormat};
pub use vertex::VertexType;
