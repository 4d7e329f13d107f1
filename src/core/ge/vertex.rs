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

//! Vertex format decoding
//!
//! The VERTEXTYPE register describes the layout of every vertex the GE
//! reads. The core needs the vertex and index sizes to advance the vertex
//! and index addresses after a draw; decoding the attributes themselves is
//! left to the render backend.
//!
//! | Bits  | Field        | Values                                   |
//! |-------|--------------|------------------------------------------|
//! | 0-1   | texcoord     | none, u8, u16, float (x2)                |
//! | 2-4   | color        | none, -, -, -, 565, 5551, 4444, 8888     |
//! | 5-6   | normal       | none, s8, s16, float (x3)                |
//! | 7-8   | position     | none, s8, s16, float (x3)                |
//! | 9-10  | weight       | none, u8, u16, float (x weight count)    |
//! | 11-12 | index        | none, u8, u16, u32                       |
//! | 14-16 | weight count | count - 1                                |
//! | 18-20 | morph count  | count - 1                                |
//! | 23    | through      | skip transform                           |

use serde::{Deserialize, Serialize};

/// Raw VERTEXTYPE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexType(pub u32);

impl VertexType {
    /// Mask of the through-mode bit
    pub const THROUGH_MASK: u32 = 1 << 23;
    /// Mask of the weight count field
    pub const WEIGHT_COUNT_MASK: u32 = 7 << 14;
    /// Mask of the index format field
    pub const INDEX_MASK: u32 = 3 << 11;
    /// Morph target count bits (18-20)
    pub const MORPH_COUNT_MASK: u32 = 7 << 18;

    pub fn texcoord_format(self) -> u32 {
        self.0 & 3
    }

    pub fn color_format(self) -> u32 {
        (self.0 >> 2) & 7
    }

    pub fn normal_format(self) -> u32 {
        (self.0 >> 5) & 3
    }

    pub fn position_format(self) -> u32 {
        (self.0 >> 7) & 3
    }

    pub fn weight_format(self) -> u32 {
        (self.0 >> 9) & 3
    }

    pub fn index_format(self) -> u32 {
        (self.0 >> 11) & 3
    }

    pub fn weight_count(self) -> u32 {
        ((self.0 >> 14) & 7) + 1
    }

    pub fn morph_count(self) -> u32 {
        ((self.0 >> 18) & 7) + 1
    }

    /// Whether more than one morph target is blended
    pub fn is_morphing(self) -> bool {
        self.0 & Self::MORPH_COUNT_MASK != 0
    }

    pub fn is_through(self) -> bool {
        self.0 & Self::THROUGH_MASK != 0
    }

    pub fn is_indexed(self) -> bool {
        self.index_format() != 0
    }

    pub fn has_weights(self) -> bool {
        self.weight_format() != 0
    }

    /// Size of one index in bytes (0 when not indexed)
    pub fn index_size(self) -> u32 {
        match self.index_format() {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        }
    }

    /// Size of one vertex in bytes, including all morph targets
    ///
    /// Components are laid out as weights, texcoord, color, normal and
    /// position. Each one is aligned to its own element size and the whole
    /// vertex is padded to the largest alignment seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use gerx::core::ge::VertexType;
    ///
    /// // float position only
    /// assert_eq!(VertexType(3 << 7).vertex_size(), 12);
    ///
    /// // u8 texcoord + s16 position: 2 bytes, then aligned to 2, + 6
    /// assert_eq!(VertexType(1 | (2 << 7)).vertex_size(), 8);
    /// ```
    pub fn vertex_size(self) -> u32 {
        let mut size = 0u32;
        let mut max_align = 1u32;

        let mut push = |count: u32, element: u32| {
            if count == 0 || element == 0 {
                return;
            }
            size = align_up(size, element);
            size += count * element;
            max_align = max_align.max(element);
        };

        push(self.weight_count(), scalar_size(self.weight_format()));
        push(2, scalar_size(self.texcoord_format()));
        match self.color_format() {
            4..=6 => push(1, 2),
            7 => push(1, 4),
            _ => {}
        }
        push(3, signed_size(self.normal_format()));
        push(3, signed_size(self.position_format()));

        align_up(size, max_align) * self.morph_count()
    }
}

/// Element size of an unsigned/float component format (u8, u16, float)
fn scalar_size(format: u32) -> u32 {
    match format {
        1 => 1,
        2 => 2,
        3 => 4,
        _ => 0,
    }
}

/// Element size of a signed/float component format (s8, s16, float)
fn signed_size(format: u32) -> u32 {
    scalar_size(format)
}

fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size_float_pos_color() {
        // 8888 color + float position: 4 + 12
        let vtype = VertexType((7 << 2) | (3 << 7));
        assert_eq!(vtype.vertex_size(), 16);
    }

    #[test]
    fn test_vertex_size_alignment_padding() {
        // u8 texcoord (2 bytes) + 565 color (aligned to 2) + s8 position (3 bytes) = 7, padded to 8
        let vtype = VertexType(1 | (4 << 2) | (1 << 7));
        assert_eq!(vtype.vertex_size(), 8);
    }

    #[test]
    fn test_vertex_size_weights_and_morph() {
        // 2 float weights + float position, 2 morph targets
        let vtype = VertexType((3 << 9) | (1 << 14) | (3 << 7) | (1 << 18));
        assert_eq!(vtype.weight_count(), 2);
        assert_eq!(vtype.morph_count(), 2);
        assert_eq!(vtype.vertex_size(), (8 + 12) * 2);
    }

    #[test]
    fn test_index_size() {
        assert_eq!(VertexType(0).index_size(), 0);
        assert_eq!(VertexType(1 << 11).index_size(), 1);
        assert_eq!(VertexType(2 << 11).index_size(), 2);
        assert_eq!(VertexType(3 << 11).index_size(), 4);
        assert!(VertexType(2 << 11).is_indexed());
    }

    #[test]
    fn test_through_flag() {
        assert!(VertexType(VertexType::THROUGH_MASK).is_through());
        assert!(!VertexType(0).is_through());
    }
}
