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

//! Derived state cache
//!
//! Values the processor tracks next to the register file: resolved vertex
//! and index addresses, the ORIGIN/OFFSETADDR offset, morph weights, matrix
//! upload cursors, the current texture size and the immediate vertex
//! buffer. None of these are visible as raw register slots.

use super::backend::RenderTarget;
use super::dirty::DirtyFlags;
use super::registers::{MatrixKind, RegisterFile};
use super::types::PrimitiveType;
use super::vertex::VertexType;
use serde::Serialize;

/// A vertex assembled from the immediate vertex registers by VAP
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImmediateVertex {
    pub x: f32,
    pub y: f32,
    pub z: u16,
    pub u: f32,
    pub v: f32,
    pub q: f32,
    /// ABGR8888
    pub color: u32,
    pub fog: f32,
}

/// Immediate vertices waiting to be submitted as one batch
#[derive(Debug, Clone, Default)]
pub struct ImmediateBuffer {
    pub primitive: Option<PrimitiveType>,
    pub vertices: Vec<ImmediateVertex>,
}

impl ImmediateBuffer {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn clear(&mut self) {
        self.primitive = None;
        self.vertices.clear();
    }
}

/// State derived from command execution rather than stored in raw slots
#[derive(Debug, Clone)]
pub struct GeState {
    pub vertex_addr: u32,
    pub index_addr: u32,
    pub offset_addr: u32,

    pub morph_weights: [f32; 8],

    /// Level 0 texture size, possibly overridden by render-to-texture
    pub texture_width: u32,
    pub texture_height: u32,

    /// Next element written by each matrix DATA command
    pub matrix_cursors: [u32; 5],

    /// Bone matrix changes held back while software skinning
    pub deferred_vertex_type_dirty: DirtyFlags,

    /// Primitive type used by PRIM's "keep previous" encoding
    pub last_primitive: Option<PrimitiveType>,

    pub immediate: ImmediateBuffer,

    /// Render target derived at the last draw
    pub render_target: Option<RenderTarget>,
}

impl GeState {
    pub fn new() -> Self {
        Self {
            vertex_addr: 0,
            index_addr: 0,
            offset_addr: 0,
            morph_weights: [0.0; 8],
            texture_width: 1,
            texture_height: 1,
            matrix_cursors: [0; 5],
            deferred_vertex_type_dirty: DirtyFlags::empty(),
            last_primitive: None,
            immediate: ImmediateBuffer::default(),
            render_target: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Resolve a 24-bit address payload against BASE and the current offset
    ///
    /// ```text
    /// (offset + (((base & 0x000F0000) << 8) | data)) & 0x0FFFFFFF
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use gerx::core::ge::{opcodes, GeState, RegisterFile};
    ///
    /// let mut regs = RegisterFile::new();
    /// regs.set_register(opcodes::BASE, 0x1008_0000);
    ///
    /// let state = GeState::new();
    /// assert_eq!(state.relative_address(&regs, 0x12_3450), 0x0812_3450);
    /// ```
    pub fn relative_address(&self, regs: &RegisterFile, data: u32) -> u32 {
        let base_extended = regs.base_address() | (data & 0x00FF_FFFF);
        self.offset_addr.wrapping_add(base_extended) & 0x0FFF_FFFF
    }

    /// Move past `count` vertices (or indices) consumed by a draw
    pub fn advance_vertices(&mut self, vertex_type: VertexType, count: u32) {
        if vertex_type.is_indexed() {
            self.index_addr = self
                .index_addr
                .wrapping_add(count * vertex_type.index_size());
        } else {
            self.vertex_addr = self
                .vertex_addr
                .wrapping_add(count * vertex_type.vertex_size());
        }
    }

    pub fn matrix_cursor(&self, kind: MatrixKind) -> u32 {
        self.matrix_cursors[kind.index()]
    }

    pub fn set_matrix_cursor(&mut self, kind: MatrixKind, value: u32) {
        self.matrix_cursors[kind.index()] = value & 0x00FF_FFFF;
    }
}

impl Default for GeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ge::command::opcodes;

    #[test]
    fn test_relative_address_applies_offset() {
        let regs = RegisterFile::new();
        let mut state = GeState::new();
        state.offset_addr = 0x0880_0000;

        assert_eq!(state.relative_address(&regs, 0x100), 0x0880_0100);
    }

    #[test]
    fn test_relative_address_wraps_to_28_bits() {
        let mut regs = RegisterFile::new();
        regs.set_register(opcodes::BASE, 0x100F_0000);
        let mut state = GeState::new();
        state.offset_addr = 0x0100_0000;

        assert_eq!(state.relative_address(&regs, 0xFF_FFFC), 0x00FF_FFFC);
    }

    #[test]
    fn test_advance_non_indexed_moves_vertex_address() {
        let mut state = GeState::new();
        state.vertex_addr = 0x0880_0000;
        // 32-bit float positions only
        let vertex_type = VertexType(3 << 7);

        state.advance_vertices(vertex_type, 3);

        assert_eq!(state.vertex_addr, 0x0880_0000 + 3 * 12);
        assert_eq!(state.index_addr, 0);
    }

    #[test]
    fn test_advance_indexed_moves_index_address() {
        let mut state = GeState::new();
        state.index_addr = 0x0890_0000;
        // Float positions with 16-bit indices
        let vertex_type = VertexType((3 << 7) | (2 << 11));

        state.advance_vertices(vertex_type, 4);

        assert_eq!(state.index_addr, 0x0890_0008);
        assert_eq!(state.vertex_addr, 0);
    }
}
