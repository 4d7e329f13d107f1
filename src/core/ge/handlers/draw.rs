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

//! Drawing commands
//!
//! VADDR/IADDR, vertex type changes, PRIM, BEZIER/SPLINE, BOUNDINGBOX,
//! morph weights and immediate vertices (VAP). Draws read their vertex and
//! index data as bounds-checked slices of guest memory; a draw whose data is
//! not fully mapped is skipped with a warning and does not advance the
//! vertex pointers.

use crate::core::ge::backend::{PatchBatch, PrimitiveBatch, RenderBackend, RenderTarget, VertexSource};
use crate::core::ge::command::{float24, opcodes};
use crate::core::ge::dirty::DirtyFlags;
use crate::core::ge::display_list::DisplayList;
use crate::core::ge::engine::CommandEngine;
use crate::core::ge::state::ImmediateVertex;
use crate::core::ge::types::{PatchKind, PrimitiveType, SplineEdge};
use crate::core::ge::vertex::VertexType;
use crate::core::memory::GuestMemory;

/// Immediate vertices buffered before further VAPs are dropped
const IMMEDIATE_BUFFER_SIZE: usize = 32;

/// Cycles per vertex tested by BOUNDINGBOX
const BOUNDING_BOX_CYCLES: u64 = 22;

/// TEXFUNC value for "replace"
const TEXFUNC_REPLACE: u32 = 3;

/// Everything that must be recomputed when through mode toggles
const THROUGH_DIRTY: DirtyFlags = DirtyFlags::RASTER_STATE
    .union(DirtyFlags::VIEWPORTSCISSOR_STATE)
    .union(DirtyFlags::FRAGMENTSHADER_STATE)
    .union(DirtyFlags::GEOMETRYSHADER_STATE)
    .union(DirtyFlags::CULLRANGE);

const PATCH_DIRTY: DirtyFlags = DirtyFlags::RASTER_STATE
    .union(DirtyFlags::VERTEXSHADER_STATE)
    .union(DirtyFlags::GEOMETRYSHADER_STATE)
    .union(DirtyFlags::UVSCALEOFFSET);

/// Largest index referenced by an index buffer
fn max_index(indices: &[u8], index_size: u32) -> u32 {
    match index_size {
        1 => indices.iter().copied().max().unwrap_or(0) as u32,
        2 => indices
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
            .max()
            .unwrap_or(0),
        4 => indices
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .max()
            .unwrap_or(0),
        _ => 0,
    }
}

/// Vertex and index bytes referenced by a draw of `count` elements
fn draw_data<'a>(
    mem: &'a GuestMemory,
    vertex_type: VertexType,
    vertex_addr: u32,
    index_addr: u32,
    count: u32,
) -> Option<(&'a [u8], Option<&'a [u8]>)> {
    let vertex_size = vertex_type.vertex_size();

    if vertex_type.is_indexed() {
        let indices = mem.slice(index_addr, count.checked_mul(vertex_type.index_size())?).ok()?;
        let referenced = max_index(indices, vertex_type.index_size()).checked_add(1)?;
        let vertices = mem.slice(vertex_addr, referenced.checked_mul(vertex_size)?).ok()?;
        Some((vertices, Some(indices)))
    } else {
        let vertices = mem.slice(vertex_addr, count.checked_mul(vertex_size)?).ok()?;
        Some((vertices, None))
    }
}

/// Immediate vertices after which a "keep previous" run is submitted
fn immediate_flush_count(primitive: PrimitiveType) -> usize {
    match primitive {
        PrimitiveType::Points => 1,
        PrimitiveType::Lines | PrimitiveType::Rectangles => 2,
        PrimitiveType::Triangles => 3,
        _ => 0,
    }
}

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_vaddr(&mut self, op: u32) {
        self.state.vertex_addr = self.state.relative_address(&self.regs, op & 0x00FF_FFFF);
    }

    pub(crate) fn execute_iaddr(&mut self, op: u32) {
        self.state.index_addr = self.state.relative_address(&self.regs, op & 0x00FF_FFFF);
    }

    pub(crate) fn execute_vertex_type(&mut self, diff: u32) {
        if diff == 0 {
            return;
        }
        self.mark_dirty(DirtyFlags::VERTEXSHADER_STATE);
        if diff & VertexType::THROUGH_MASK != 0 {
            self.mark_dirty(THROUGH_DIRTY);
        }
    }

    /// Vertex type change while skinning on the CPU
    ///
    /// A change to the weight count alone does not flush.
    pub(crate) fn execute_vertex_type_skinning(&mut self, op: u32, diff: u32) {
        if diff & !VertexType::WEIGHT_COUNT_MASK != 0 {
            // Flush with the previous vertex type in place
            self.regs.restore_raw(opcodes::VERTEXTYPE, op ^ diff);
            self.flush();
            self.regs.restore_raw(opcodes::VERTEXTYPE, op);

            if VertexType(op).is_morphing() {
                let deferred = std::mem::take(&mut self.state.deferred_vertex_type_dirty);
                self.mark_dirty(deferred);
            }
            self.mark_dirty(DirtyFlags::VERTEXSHADER_STATE);
        }
        if diff & VertexType::THROUGH_MASK != 0 {
            self.mark_dirty(THROUGH_DIRTY);
        }
    }

    pub(crate) fn execute_morph_weight(&mut self, op: u32) {
        let index = ((op >> 24) as u8).wrapping_sub(opcodes::MORPHWEIGHT0) as usize;
        if let Some(weight) = self.state.morph_weights.get_mut(index) {
            *weight = float24(op);
        }
    }

    pub(crate) fn execute_prim(&mut self, mem: &GuestMemory, op: u32) {
        self.submit_immediate();

        let count = op & 0xFFFF;
        let primitive = match PrimitiveType::from_bits(op >> 16) {
            PrimitiveType::KeepPrevious => match self.state.last_primitive {
                Some(previous) => previous,
                None => {
                    log::warn!("PRIM continues a primitive that was never started");
                    return;
                }
            },
            primitive => primitive,
        };
        self.state.last_primitive = Some(primitive);

        // Antialiased lines drawn with "replace" are skipped
        if self.regs.is_antialias_enabled()
            && primitive.is_line()
            && self.regs.texture_function() == TEXFUNC_REPLACE
        {
            return;
        }
        if count == 0 {
            return;
        }

        let vertex_type = self.regs.vertex_type();
        let vertex_addr = self.state.vertex_addr;
        let index_addr = self.state.index_addr;

        let Some((vertices, indices)) = draw_data(mem, vertex_type, vertex_addr, index_addr, count) else {
            log::warn!(
                "PRIM skipped: {} vertices at 0x{:08X} (indices 0x{:08X}) not mapped",
                count,
                vertex_addr,
                index_addr
            );
            return;
        };

        self.prepare_draw(mem);

        if !self.device_lost {
            let batch = PrimitiveBatch {
                primitive,
                vertex_type,
                count,
                vertex_address: vertex_addr,
                index_address: indices.map(|_| index_addr),
                source: VertexSource::Memory { vertices, indices },
            };
            if let Err(err) = self.backend.submit_primitives(&batch) {
                self.handle_backend_error(err);
            }
            self.stats.draws += 1;
            self.stats.vertices += count as u64;
        }

        self.state.advance_vertices(vertex_type, count);
    }

    pub(crate) fn execute_bezier(&mut self, mem: &GuestMemory, op: u32) {
        let count_u = op & 0xFF;
        let count_v = (op >> 8) & 0xFF;
        let valid = |n: u32| n >= 4 && (n - 1) % 3 == 0;
        if !valid(count_u) || !valid(count_v) {
            log::warn!("BEZIER with invalid control point grid {}x{}", count_u, count_v);
            return;
        }
        self.submit_patch(mem, PatchKind::Bezier, count_u, count_v);
    }

    pub(crate) fn execute_spline(&mut self, mem: &GuestMemory, op: u32) {
        let count_u = op & 0xFF;
        let count_v = (op >> 8) & 0xFF;
        if count_u < 4 || count_v < 4 {
            log::warn!("SPLINE with invalid control point grid {}x{}", count_u, count_v);
            return;
        }
        let kind = PatchKind::Spline {
            edge_u: SplineEdge::from_bits(op >> 16),
            edge_v: SplineEdge::from_bits(op >> 18),
        };
        self.submit_patch(mem, kind, count_u, count_v);
    }

    fn submit_patch(&mut self, mem: &GuestMemory, kind: PatchKind, count_u: u32, count_v: u32) {
        let points = count_u * count_v;
        let vertex_type = self.regs.vertex_type();
        let vertex_addr = self.state.vertex_addr;
        let index_addr = self.state.index_addr;

        let Some((control_points, indices)) = draw_data(mem, vertex_type, vertex_addr, index_addr, points)
        else {
            log::warn!("Patch skipped: control points at 0x{:08X} not mapped", vertex_addr);
            return;
        };

        if vertex_type.has_weights() || vertex_type.is_morphing() {
            log::debug!("Patch with skinned or morphed vertex type 0x{:06X}", vertex_type.0);
        }

        self.prepare_draw(mem);
        self.flush();

        if !self.device_lost {
            let patch = PatchBatch {
                kind,
                count_u,
                count_v,
                divisions: self.regs.patch_divisions(),
                primitive: self.regs.patch_primitive(),
                vertex_type,
                control_points,
                indices,
            };
            if let Err(err) = self.backend.submit_patch(&patch) {
                self.handle_backend_error(err);
            }
            self.stats.patches += 1;
        }

        self.mark_dirty(PATCH_DIRTY);
        self.state.advance_vertices(vertex_type, points);
    }

    pub(crate) fn execute_bounding_box(&mut self, mem: &GuestMemory, list: &mut DisplayList, op: u32) {
        let count = op & 0xFFFF;
        if count == 0 {
            list.bbox_result = false;
            return;
        }
        self.stats.cycles += count as u64 * BOUNDING_BOX_CYCLES;

        let vertex_type = self.regs.vertex_type();
        let Some((control_points, _)) =
            draw_data(mem, vertex_type, self.state.vertex_addr, self.state.index_addr, count)
        else {
            log::warn!("Bad bounding box data: {} vertices at 0x{:08X}", count, self.state.vertex_addr);
            // Unreadable data counts as visible
            list.bbox_result = true;
            return;
        };

        list.bbox_result = self.backend.test_bounding_box(control_points, count, vertex_type);
        self.state.advance_vertices(vertex_type, count);
    }

    /// Assemble one vertex from the immediate registers
    pub(crate) fn execute_imm_vertex(&mut self, op: u32) {
        if self.state.immediate.vertices.len() >= IMMEDIATE_BUFFER_SIZE {
            log::warn!(
                "Immediate vertex buffer full ({} vertices), VAP 0x{:06X} dropped",
                IMMEDIATE_BUFFER_SIZE,
                op & 0x00FF_FFFF
            );
            return;
        }

        let primitive = PrimitiveType::from_bits(op >> 8);
        let keep_previous = primitive == PrimitiveType::KeepPrevious;
        if !keep_previous {
            self.submit_immediate();
        }

        let (offset_x, offset_y) = if self.regs.vertex_type().is_through() {
            (0x8000, 0x8000)
        } else {
            (
                (self.regs.raw(opcodes::OFFSETX) & 0xFFFF) as i32,
                (self.regs.raw(opcodes::OFFSETY) & 0xFFFF) as i32,
            )
        };

        let vertex = ImmediateVertex {
            x: ((self.regs.raw(opcodes::VSCX) & 0xFFFF) as i32 - offset_x) as f32 / 16.0,
            y: ((self.regs.raw(opcodes::VSCY) & 0xFFFF) as i32 - offset_y) as f32 / 16.0,
            z: (self.regs.raw(opcodes::VSCZ) & 0xFFFF) as u16,
            u: self.regs.float(opcodes::VTCS),
            v: self.regs.float(opcodes::VTCT),
            q: self.regs.float(opcodes::VTCQ),
            color: (self.regs.raw(opcodes::VCV) & 0x00FF_FFFF) | ((op & 0xFF) << 24),
            fog: (self.regs.raw(opcodes::VFC) & 0xFF) as f32 / 255.0,
        };
        self.state.immediate.vertices.push(vertex);

        if !keep_previous {
            self.state.immediate.primitive = Some(primitive);
        } else if let Some(current) = self.state.immediate.primitive {
            if self.state.immediate.vertices.len() == immediate_flush_count(current) {
                self.submit_immediate();
            }
        } else {
            log::warn!("Immediate vertex continues a primitive that was never started");
        }
    }

    /// Bind the render target and register texture use before a draw
    ///
    /// The target is derived on every draw: the FRAMEBUF dirty bit is drained
    /// by any intervening flush, so it cannot be used to detect a change.
    fn prepare_draw(&mut self, mem: &GuestMemory) {
        let (x2, y2) = self.regs.region_end();
        let target = RenderTarget {
            address: self.regs.framebuffer_address(),
            stride: self.regs.framebuffer_stride(),
            format: self.regs.framebuffer_format(),
            width: x2 + 1,
            height: y2 + 1,
        };
        if self.state.render_target != Some(target) {
            if !self.device_lost {
                self.backend.set_render_target(&target);
            }
            self.state.render_target = Some(target);
            self.caches.framebuffers.bind(target);
        } else if self.caches.framebuffers.current().is_none() {
            self.caches.framebuffers.bind(target);
        }
        self.caches.framebuffers.mark_drawn();

        if self.regs.is_texture_map_enabled() && !self.regs.is_clear_mode() {
            let address = self.regs.texture_address(0);
            let bits = self.regs.texture_format().bits_per_texel();
            let size = self.regs.texture_stride(0) * self.state.texture_height * bits / 8;
            if self.caches.textures.use_texture(mem, address, size) {
                self.mark_dirty(DirtyFlags::TEXTURE_IMAGE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_index_widths() {
        assert_eq!(max_index(&[3, 9, 1], 1), 9);
        assert_eq!(max_index(&[0x00, 0x01, 0x05, 0x00], 2), 0x100);
        assert_eq!(max_index(&[7, 0, 0, 0, 2, 0, 0, 0], 4), 7);
        assert_eq!(max_index(&[], 2), 0);
    }

    #[test]
    fn test_immediate_flush_counts() {
        assert_eq!(immediate_flush_count(PrimitiveType::Points), 1);
        assert_eq!(immediate_flush_count(PrimitiveType::Triangles), 3);
        assert_eq!(immediate_flush_count(PrimitiveType::TriangleStrip), 0);
    }
}
