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

//! Display list context
//!
//! Each enqueued list owns its program counter, stall address, bounded
//! call stack and lifecycle state:
//!
//! ```text
//! None -> Queued -> Running <-> Paused -> Completed(fault?)
//! ```
//!
//! Faults are stored in `Completed` and only ever end the list they
//! occurred in.

use crate::core::error::ListFault;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Slot index of a display list
pub type ListId = usize;

/// Why a list stopped without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum PauseReason {
    /// PC reached the stall address
    Stall,
    /// Paused by a SIGNAL behaviour or a pausing FINISH
    Signal,
    /// Inserted at the head of the queue; waits for `continue_list`
    Inserted,
}

/// Lifecycle state of a display list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum ListState {
    None,
    Queued,
    Running,
    Paused(PauseReason),
    Completed(Option<ListFault>),
}

impl ListState {
    /// Completed (with or without a fault) or never used
    pub fn is_terminal(self) -> bool {
        matches!(self, ListState::None | ListState::Completed(_))
    }

    pub fn is_paused(self) -> bool {
        matches!(self, ListState::Paused(_))
    }

    pub fn fault(self) -> Option<ListFault> {
        match self {
            ListState::Completed(fault) => fault,
            _ => None,
        }
    }
}

/// Behaviour selected by the SIGNAL command preceding an END
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum SignalBehaviour {
    None,
    /// Pause the list and call the handler
    HandlerSuspend,
    /// Call the handler and keep running
    HandlerContinue,
    /// Pause at the next FINISH instead of completing
    HandlerPause,
    /// Memory barrier; the next FINISH does not complete the list
    Sync,
    Jump,
    Call,
    Ret,
    RelativeJump,
    RelativeCall,
    OriginJump,
    OriginCall,
    Unknown(u8),
}

impl SignalBehaviour {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0x00 => SignalBehaviour::None,
            0x01 => SignalBehaviour::HandlerSuspend,
            0x02 => SignalBehaviour::HandlerContinue,
            0x03 => SignalBehaviour::HandlerPause,
            0x08 => SignalBehaviour::Sync,
            0x10 => SignalBehaviour::Jump,
            0x11 => SignalBehaviour::Call,
            0x12 => SignalBehaviour::Ret,
            0x13 => SignalBehaviour::RelativeJump,
            0x14 => SignalBehaviour::RelativeCall,
            0x15 => SignalBehaviour::OriginJump,
            0x16 => SignalBehaviour::OriginCall,
            other => SignalBehaviour::Unknown(other),
        }
    }

    pub fn to_bits(self) -> u8 {
        match self {
            SignalBehaviour::None => 0x00,
            SignalBehaviour::HandlerSuspend => 0x01,
            SignalBehaviour::HandlerContinue => 0x02,
            SignalBehaviour::HandlerPause => 0x03,
            SignalBehaviour::Sync => 0x08,
            SignalBehaviour::Jump => 0x10,
            SignalBehaviour::Call => 0x11,
            SignalBehaviour::Ret => 0x12,
            SignalBehaviour::RelativeJump => 0x13,
            SignalBehaviour::RelativeCall => 0x14,
            SignalBehaviour::OriginJump => 0x15,
            SignalBehaviour::OriginCall => 0x16,
            SignalBehaviour::Unknown(bits) => bits,
        }
    }
}

/// Saved context of a CALL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct CallFrame {
    /// Address of the command after the CALL
    pub return_pc: u32,
    pub offset_addr: u32,
    /// BASE register, saved only by signal calls
    pub base: Option<u32>,
}

/// Bounded LIFO of call frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    limit: usize,
}

impl CallStack {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Push a frame
    ///
    /// # Returns
    ///
    /// `false` if the stack is already at its limit.
    pub fn push(&mut self, frame: CallFrame) -> bool {
        if self.frames.len() >= self.limit {
            return false;
        }
        self.frames.push(frame);
        true
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// One display list slot
#[derive(Debug, Clone, Serialize)]
pub struct DisplayList {
    pub id: ListId,
    pub start_pc: u32,
    pub pc: u32,
    /// Zero means "no stall"
    pub stall: u32,
    pub stack: CallStack,
    pub state: ListState,
    pub signal: SignalBehaviour,
    /// Token from the last SIGNAL/FINISH payload
    pub token: u16,
    /// Set once the run loop has executed from this list
    pub started: bool,
    pub bbox_result: bool,
}

impl DisplayList {
    /// An unused slot
    pub fn empty(id: ListId, stack_limit: usize) -> Self {
        Self {
            id,
            start_pc: 0,
            pc: 0,
            stall: 0,
            stack: CallStack::new(stack_limit),
            state: ListState::None,
            signal: SignalBehaviour::None,
            token: 0,
            started: false,
            bbox_result: false,
        }
    }

    /// Reinitialise the slot for a new list
    pub fn reset(&mut self, pc: u32, stall: u32) {
        self.start_pc = pc & 0x0FFF_FFFF;
        self.pc = pc & 0x0FFF_FFFF;
        self.stall = stall & 0x0FFF_FFFF;
        self.stack.clear();
        self.state = ListState::Queued;
        self.signal = SignalBehaviour::None;
        self.token = 0;
        self.started = false;
        self.bbox_result = false;
    }

    /// Whether the list occupies its slot (not `None` and not `Completed`)
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Commands that can run before hitting the stall address
    ///
    /// Unbounded (`0x0FFFFFFF`) when no stall is set; zero only when the PC
    /// sits exactly on the stall address. A PC past the stall (a CALL or
    /// JUMP into code above it) wraps around and keeps running.
    pub fn words_to_stall(&self) -> u32 {
        if self.stall == 0 {
            return 0x0FFF_FFFF;
        }
        self.stall.wrapping_sub(self.pc) / 4
    }

    /// End the list, recording a fault if any
    pub fn complete(&mut self, fault: Option<ListFault>) {
        self.state = ListState::Completed(fault);
    }
}
