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

//! PSP Graphics Engine command processor library
//!
//! This library emulates the GE front end: it decodes display lists from
//! guest memory, tracks the 256-slot register file, runs display list
//! control flow and hands primitives and state changes to a pluggable
//! render backend.
//!
//! # Example
//!
//! ```
//! use gerx::core::config::GeConfig;
//! use gerx::core::ge::{opcodes, CommandWord, GeProcessor, NullBackend, NullListener};
//! use gerx::core::memory::GuestMemory;
//!
//! let mut mem = GuestMemory::new();
//! mem.write_words(
//!     0x0880_0000,
//!     &[
//!         CommandWord::new(opcodes::FOGCOLOR, 0x00FF_00FF).0,
//!         CommandWord::new(opcodes::FINISH, 0).0,
//!         CommandWord::new(opcodes::END, 0).0,
//!     ],
//! )
//! .unwrap();
//!
//! let mut ge = GeProcessor::new(GeConfig::default(), NullBackend::new(), Box::new(NullListener)).unwrap();
//! ge.enqueue(&mem, 0x0880_0000, 0, false).unwrap();
//! ge.run(&mut mem, 1000);
//!
//! assert_eq!(ge.engine().registers().payload(opcodes::FOGCOLOR), 0x00FF_00FF);
//! ```

pub mod core;
