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

//! Small display lists used across tests

use gerx::core::ge::{opcodes, CommandWord};

/// Float positions, no other attributes
#[allow(dead_code)]
pub const FLOAT_POS: u32 = 3 << 7;

#[allow(dead_code)]
pub fn cmd(opcode: u8, payload: u32) -> u32 {
    CommandWord::new(opcode, payload).0
}

/// FINISH + END
#[allow(dead_code)]
pub fn finish(token: u32) -> [u32; 2] {
    [cmd(opcodes::FINISH, token), cmd(opcodes::END, 0)]
}

/// A few render state changes, no geometry
#[allow(dead_code)]
pub fn state_list() -> Vec<u32> {
    let mut words = vec![
        cmd(opcodes::FOGCOLOR, 0x00_80FF),
        cmd(opcodes::ZTESTENABLE, 1),
        cmd(opcodes::ALPHABLENDENABLE, 1),
        cmd(opcodes::TEXFUNC, 0x00_0103),
    ];
    words.extend(finish(0));
    words
}

/// Set up a float-position draw at `vertices` and draw one triangle
#[allow(dead_code)]
pub fn triangle_list(vertices: u32) -> Vec<u32> {
    let mut words = vec![
        cmd(opcodes::BASE, (vertices >> 8) & 0x0F_0000),
        cmd(opcodes::VERTEXTYPE, FLOAT_POS),
        cmd(opcodes::VADDR, vertices & 0xFF_FFFF),
        cmd(opcodes::PRIM, (3 << 16) | 3),
    ];
    words.extend(finish(0));
    words
}

/// A world matrix upload: NUM then `elements` DATA words
#[allow(dead_code)]
pub fn world_matrix_upload(elements: &[u32]) -> Vec<u32> {
    let mut words = vec![cmd(opcodes::WORLDMATRIXNUMBER, 0)];
    words.extend(elements.iter().map(|&e| cmd(opcodes::WORLDMATRIXDATA, e)));
    words
}
