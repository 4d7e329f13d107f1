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

//! Core GE components
//!
//! - Guest memory arena
//! - GE command processor (register file, dispatch, display lists)
//! - Configuration
//! - Save states

pub mod config;
pub mod error;
pub mod ge;
pub mod memory;
pub mod save_state;

// Re-export commonly used types
pub use config::GeConfig;
pub use error::{EmulatorError, GeError, ListFault, Result};
pub use ge::{CommandEngine, GeProcessor, GeWorker, RenderBackend};
pub use memory::GuestMemory;
pub use save_state::SaveState;
