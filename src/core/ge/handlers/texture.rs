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

//! Texture commands

use crate::core::ge::backend::RenderBackend;
use crate::core::ge::command::opcodes;
use crate::core::ge::dirty::DirtyFlags;
use crate::core::ge::engine::CommandEngine;
use crate::core::memory::GuestMemory;

impl<B: RenderBackend> CommandEngine<B> {
    pub(crate) fn execute_load_clut(&mut self, mem: &GuestMemory) {
        self.mark_dirty(DirtyFlags::TEXTURE_PARAMS);
        let address = self.regs.clut_address();
        let bytes = self.regs.clut_load_bytes();
        if self.caches.palette.load(mem, address, bytes) {
            self.mark_dirty(DirtyFlags::DEPAL);
        }
    }

    /// Level 0 size change
    ///
    /// Render-to-texture may have overridden the current size, so it is
    /// only reset when the size or the texture itself changed.
    pub(crate) fn execute_tex_size0(&mut self, diff: u32) {
        if diff != 0 || self.dirty.intersects(DirtyFlags::TEXTURE_IMAGE | DirtyFlags::TEXTURE_PARAMS) {
            self.state.texture_width = self.regs.texture_width(0);
            self.state.texture_height = self.regs.texture_height(0);
            self.mark_dirty(DirtyFlags::TEXTURE_PARAMS);
        }
    }

    pub(crate) fn execute_tex_level(&mut self, op: u32, diff: u32) {
        let old = op ^ diff;
        if diff & 0x00FF_0000 != 0 {
            self.mark_dirty(DirtyFlags::MIPBIAS);
        }

        // A fixed or sloped mip level with a bias baked into pending draws
        if old & 3 != 0 && old & 0x00FF_0000 != 0 {
            self.regs.restore_raw(opcodes::TEXLEVEL, old);
            self.flush();
            self.regs.restore_raw(opcodes::TEXLEVEL, op);
        }

        self.mark_dirty(DirtyFlags::TEXTURE_PARAMS | DirtyFlags::FRAGMENTSHADER_STATE);
    }

    /// Drawing must become visible to texturing
    pub(crate) fn execute_tex_flush(&mut self) {
        self.caches.framebuffers.discard_copy();
    }
}
