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

//! Command handlers
//!
//! Handlers are grouped by concern and all extend [`CommandEngine`]. They
//! run after the command word has been written to the register file and
//! receive the diff against the previous value.

use super::backend::RenderBackend;
use super::dispatch::Handler;
use super::display_list::DisplayList;
use super::engine::CommandEngine;
use crate::core::memory::GuestMemory;

mod draw;
mod flow;
mod legacy;
mod matrix;
mod texture;
mod transfer;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_handler(
        &mut self,
        handler: Handler,
        mem: &mut GuestMemory,
        list: &mut DisplayList,
        op: u32,
        diff: u32,
    ) {
        match handler {
            Handler::Legacy => self.execute_legacy(op, diff),
            Handler::Unknown => self.execute_unknown(list, op),
            Handler::OffsetAddr => self.execute_offset_addr(op),
            Handler::Origin => self.execute_origin(list),
            Handler::Jump => self.execute_jump(mem, list, op, diff),
            Handler::BJump => self.execute_bjump(mem, list, op, diff),
            Handler::Call => self.execute_call(mem, list, op, diff),
            Handler::Ret => self.execute_ret(list, op, diff),
            Handler::End => self.execute_end(mem, list, op, diff),
            Handler::Vaddr => self.execute_vaddr(op),
            Handler::Iaddr => self.execute_iaddr(op),
            Handler::BoundingBox => self.execute_bounding_box(mem, list, op),
            Handler::Prim => self.execute_prim(mem, op),
            Handler::Bezier => self.execute_bezier(mem, op),
            Handler::Spline => self.execute_spline(mem, op),
            Handler::VertexType => self.execute_vertex_type(diff),
            Handler::VertexTypeSkinning => self.execute_vertex_type_skinning(op, diff),
            Handler::LoadClut => self.execute_load_clut(mem),
            Handler::TexSize0 => self.execute_tex_size0(diff),
            Handler::TexLevel => self.execute_tex_level(op, diff),
            Handler::TexFlush => self.execute_tex_flush(),
            Handler::MorphWeight => self.execute_morph_weight(op),
            Handler::BlockTransferStart => self.execute_block_transfer(mem),
            Handler::ImmVertexAlphaPrim => self.execute_imm_vertex(op),
            Handler::MatrixNum(kind) => self.execute_matrix_num(mem, list, kind, op),
            Handler::MatrixData(kind) => self.execute_matrix_data(kind, op),
        }
    }
}
