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

//! Memory-watch checks
//!
//! A debugger configures address ranges to watch. GE operations that touch
//! guest memory in bulk (block transfers, memory copies and fills) report
//! their source and destination ranges here, and every overlapping check
//! records a hit.

use serde::Serialize;

/// Which accesses a check reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WatchKind {
    Read,
    Write,
    ReadWrite,
}

impl WatchKind {
    fn matches(self, write: bool) -> bool {
        match self {
            WatchKind::Read => !write,
            WatchKind::Write => write,
            WatchKind::ReadWrite => true,
        }
    }
}

/// A watched address range `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemCheck {
    pub start: u32,
    pub end: u32,
    pub kind: WatchKind,
    pub hits: u32,
}

/// One recorded access that matched a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchHit {
    pub address: u32,
    pub size: u32,
    pub write: bool,
    pub tag: &'static str,
}

/// Collection of memory-watch checks and their hit log
#[derive(Debug, Default)]
pub struct MemoryWatch {
    checks: Vec<MemCheck>,
    hits: Vec<WatchHit>,
}

impl MemoryWatch {
    /// Maximum number of hits kept before the oldest are dropped
    const MAX_HITS: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `size` bytes starting at `start`
    pub fn add(&mut self, start: u32, size: u32, kind: WatchKind) {
        self.checks.push(MemCheck {
            start,
            end: start.saturating_add(size),
            kind,
            hits: 0,
        });
    }

    /// Remove every check and hit
    pub fn clear(&mut self) {
        self.checks.clear();
        self.hits.clear();
    }

    pub fn clear_hits(&mut self) {
        self.hits.clear();
        for check in &mut self.checks {
            check.hits = 0;
        }
    }

    pub fn checks(&self) -> &[MemCheck] {
        &self.checks
    }

    pub fn hits(&self) -> &[WatchHit] {
        &self.hits
    }

    /// Whether any check is configured
    pub fn is_active(&self) -> bool {
        !self.checks.is_empty()
    }

    /// Record an access against every overlapping check
    pub fn notify(&mut self, address: u32, size: u32, write: bool, tag: &'static str) {
        if self.checks.is_empty() || size == 0 {
            return;
        }

        // Compare on physical addresses so mirrors hit the same checks
        let start = address & 0x3FFF_FFFF;
        let end = start.saturating_add(size);
        let mut matched = false;

        for check in &mut self.checks {
            let check_start = check.start & 0x3FFF_FFFF;
            let check_end = check_start.saturating_add(check.end - check.start);
            if start < check_end && check_start < end && check.kind.matches(write) {
                check.hits += 1;
                matched = true;
            }
        }

        if matched {
            log::debug!(
                "Memory watch hit: {} {} bytes at 0x{:08X} ({})",
                if write { "write" } else { "read" },
                size,
                address,
                tag
            );
            if self.hits.len() == Self::MAX_HITS {
                self.hits.remove(0);
            }
            self.hits.push(WatchHit {
                address,
                size,
                write,
                tag,
            });
        }
    }
}
