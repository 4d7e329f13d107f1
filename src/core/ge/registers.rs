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

//! Register file and diff engine
//!
//! The GE keeps the last raw word written for every opcode. All change
//! detection in the processor comes from comparing a freshly fetched word
//! against that slot:
//!
//! ```text
//! diff = old_raw ^ new_raw
//! ```
//!
//! A `diff` of zero means the command is a redundant write and every
//! "on change" behaviour is skipped. Raw slots only change through
//! [`RegisterFile::set_register`].
//!
//! Matrices are uploaded element by element through NUM/DATA command pairs
//! and live next to the raw slots as decoded 24-bit floats.

use super::command::{float24, opcodes};
use super::dirty::DirtyFlags;
use super::types::{PatchPrimitive, PixelFormat, TextureFormat};
use super::vertex::VertexType;
use serde::{Deserialize, Serialize};

/// Matrix targets of the NUM/DATA upload commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixKind {
    World,
    View,
    Projection,
    TexGen,
    Bone,
}

impl MatrixKind {
    /// Number of elements the upload cursor can address
    pub const fn len(self) -> usize {
        match self {
            MatrixKind::World | MatrixKind::View | MatrixKind::TexGen => 12,
            MatrixKind::Projection => 16,
            MatrixKind::Bone => 96,
        }
    }

    /// Mask applied to the NUM payload to get the starting element
    pub const fn index_mask(self) -> u32 {
        match self {
            MatrixKind::Bone => 0x7F,
            _ => 0xF,
        }
    }

    /// DATA opcode paired with this matrix
    pub const fn data_opcode(self) -> u8 {
        match self {
            MatrixKind::World => opcodes::WORLDMATRIXDATA,
            MatrixKind::View => opcodes::VIEWMATRIXDATA,
            MatrixKind::Projection => opcodes::PROJMATRIXDATA,
            MatrixKind::TexGen => opcodes::TGENMATRIXDATA,
            MatrixKind::Bone => opcodes::BONEMATRIXDATA,
        }
    }

    /// NUM opcode paired with this matrix
    pub const fn number_opcode(self) -> u8 {
        match self {
            MatrixKind::World => opcodes::WORLDMATRIXNUMBER,
            MatrixKind::View => opcodes::VIEWMATRIXNUMBER,
            MatrixKind::Projection => opcodes::PROJMATRIXNUMBER,
            MatrixKind::TexGen => opcodes::TGENMATRIXNUMBER,
            MatrixKind::Bone => opcodes::BONEMATRIXNUMBER,
        }
    }

    /// Dirty category raised when `element` changes
    pub fn dirty(self, element: usize) -> DirtyFlags {
        match self {
            MatrixKind::World => DirtyFlags::WORLDMATRIX,
            MatrixKind::View => DirtyFlags::VIEWMATRIX,
            MatrixKind::Projection => DirtyFlags::PROJMATRIX,
            MatrixKind::TexGen => DirtyFlags::TEXMATRIX,
            MatrixKind::Bone => DirtyFlags::bone_matrix(element / 12),
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            MatrixKind::World => 0,
            MatrixKind::View => 1,
            MatrixKind::Projection => 2,
            MatrixKind::TexGen => 3,
            MatrixKind::Bone => 4,
        }
    }
}

/// Decoded matrix elements, stored as `payload << 8` float bit patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSet {
    pub world: [u32; 12],
    pub view: [u32; 12],
    pub projection: [u32; 16],
    pub texgen: [u32; 12],
    pub bone: Vec<u32>,
}

impl MatrixSet {
    pub fn new() -> Self {
        Self {
            world: [0; 12],
            view: [0; 12],
            projection: [0; 16],
            texgen: [0; 12],
            bone: vec![0; 96],
        }
    }

    /// Element storage for a matrix kind
    pub fn elements(&self, kind: MatrixKind) -> &[u32] {
        match kind {
            MatrixKind::World => &self.world,
            MatrixKind::View => &self.view,
            MatrixKind::Projection => &self.projection,
            MatrixKind::TexGen => &self.texgen,
            MatrixKind::Bone => &self.bone,
        }
    }

    pub fn elements_mut(&mut self, kind: MatrixKind) -> &mut [u32] {
        match kind {
            MatrixKind::World => &mut self.world,
            MatrixKind::View => &mut self.view,
            MatrixKind::Projection => &mut self.projection,
            MatrixKind::TexGen => &mut self.texgen,
            MatrixKind::Bone => &mut self.bone,
        }
    }

    /// Element as `f32`
    pub fn get(&self, kind: MatrixKind, element: usize) -> f32 {
        self.elements(kind)
            .get(element)
            .map(|bits| f32::from_bits(*bits))
            .unwrap_or(0.0)
    }
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw command slots plus decoded matrices
///
/// # Examples
///
/// ```
/// use gerx::core::ge::{opcodes, RegisterFile};
///
/// let mut regs = RegisterFile::new();
///
/// let diff = regs.set_register(opcodes::FOGCOLOR, 0xCF00_FF00);
/// assert_eq!(diff, 0x0000_FF00);
///
/// // Writing the same value again is free
/// assert_eq!(regs.set_register(opcodes::FOGCOLOR, 0xCF00_FF00), 0);
/// ```
#[derive(Debug, Clone)]
pub struct RegisterFile {
    /// Last raw word written for each opcode (opcode byte included)
    raw: [u32; 256],

    /// Decoded matrix uploads
    pub matrices: MatrixSet,
}

impl RegisterFile {
    /// Create a register file in its power-on state
    ///
    /// Each slot holds `opcode << 24`, i.e. the command with a zero payload.
    pub fn new() -> Self {
        let mut raw = [0u32; 256];
        for (opcode, slot) in raw.iter_mut().enumerate() {
            *slot = (opcode as u32) << 24;
        }
        Self {
            raw,
            matrices: MatrixSet::new(),
        }
    }

    /// Return every slot to its power-on value
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Write a command word into its slot and report what changed
    ///
    /// # Arguments
    ///
    /// * `opcode` - Slot to write
    /// * `value` - Full command word (opcode byte included)
    ///
    /// # Returns
    ///
    /// `old ^ value`. Zero means the write was redundant.
    #[inline(always)]
    pub fn set_register(&mut self, opcode: u8, value: u32) -> u32 {
        let slot = &mut self.raw[opcode as usize];
        let diff = *slot ^ value;
        *slot = value;
        diff
    }

    /// Compute the diff a write would produce without storing it
    #[inline(always)]
    pub fn diff(&self, opcode: u8, value: u32) -> u32 {
        self.raw[opcode as usize] ^ value
    }

    /// Put back a slot's previous value after a list-fatal command
    pub(crate) fn restore_raw(&mut self, opcode: u8, value: u32) {
        self.raw[opcode as usize] = value;
    }

    /// Raw word last written for an opcode
    #[inline(always)]
    pub fn raw(&self, opcode: u8) -> u32 {
        self.raw[opcode as usize]
    }

    /// Payload (low 24 bits) of the last word written for an opcode
    #[inline(always)]
    pub fn payload(&self, opcode: u8) -> u32 {
        self.raw[opcode as usize] & 0x00FF_FFFF
    }

    /// All raw slots
    pub fn raw_slots(&self) -> &[u32; 256] {
        &self.raw
    }

    /// Replace every raw slot (used when restoring state)
    pub(crate) fn load_raw_slots(&mut self, slots: &[u32; 256]) {
        self.raw = *slots;
    }

    /// Decoded 24-bit float payload of an opcode
    pub fn float(&self, opcode: u8) -> f32 {
        float24(self.raw(opcode))
    }

    fn enabled(&self, opcode: u8) -> bool {
        self.raw(opcode) & 1 != 0
    }

    // Vertex and addressing state

    pub fn vertex_type(&self) -> VertexType {
        VertexType(self.payload(opcodes::VERTEXTYPE))
    }

    /// BASE register shifted into address position
    pub fn base_address(&self) -> u32 {
        (self.raw(opcodes::BASE) & 0x000F_0000) << 8
    }

    // Framebuffer state

    /// Framebuffer address in VRAM
    pub fn framebuffer_address(&self) -> u32 {
        0x0400_0000 | (self.raw(opcodes::FRAMEBUFPTR) & 0x001F_FFF0)
    }

    /// Framebuffer stride in pixels
    pub fn framebuffer_stride(&self) -> u32 {
        self.raw(opcodes::FRAMEBUFWIDTH) & 0x07FC
    }

    pub fn framebuffer_format(&self) -> PixelFormat {
        PixelFormat::from_bits(self.raw(opcodes::FRAMEBUFPIXFORMAT))
    }

    pub fn depth_buffer_address(&self) -> u32 {
        0x0400_0000 | (self.raw(opcodes::ZBUFPTR) & 0x001F_FFF0)
    }

    pub fn depth_buffer_stride(&self) -> u32 {
        self.raw(opcodes::ZBUFWIDTH) & 0x07FC
    }

    /// Scissor rectangle as inclusive `(x1, y1, x2, y2)`
    pub fn scissor(&self) -> (u32, u32, u32, u32) {
        let s1 = self.raw(opcodes::SCISSOR1);
        let s2 = self.raw(opcodes::SCISSOR2);
        (s1 & 0x3FF, (s1 >> 10) & 0x3FF, s2 & 0x3FF, (s2 >> 10) & 0x3FF)
    }

    /// Drawing region as inclusive `(x2, y2)`
    pub fn region_end(&self) -> (u32, u32) {
        let r2 = self.raw(opcodes::REGION2);
        (r2 & 0x3FF, (r2 >> 10) & 0x3FF)
    }

    pub fn is_clear_mode(&self) -> bool {
        self.enabled(opcodes::CLEARMODE)
    }

    pub fn is_antialias_enabled(&self) -> bool {
        self.enabled(opcodes::ANTIALIASENABLE)
    }

    // Texture state

    pub fn is_texture_map_enabled(&self) -> bool {
        self.enabled(opcodes::TEXTUREMAPENABLE)
    }

    /// Address of a texture mip level
    pub fn texture_address(&self, level: usize) -> u32 {
        let level = level.min(7) as u8;
        (self.raw(opcodes::TEXADDR0 + level) & 0x00FF_FFF0)
            | ((self.raw(opcodes::TEXBUFWIDTH0 + level) << 8) & 0x0F00_0000)
    }

    /// Texture buffer width (stride) in texels
    pub fn texture_stride(&self, level: usize) -> u32 {
        let level = level.min(7) as u8;
        self.raw(opcodes::TEXBUFWIDTH0 + level) & 0x07FF
    }

    pub fn texture_width(&self, level: usize) -> u32 {
        let level = level.min(7) as u8;
        1 << (self.raw(opcodes::TEXSIZE0 + level) & 0xF).min(9)
    }

    pub fn texture_height(&self, level: usize) -> u32 {
        let level = level.min(7) as u8;
        1 << ((self.raw(opcodes::TEXSIZE0 + level) >> 8) & 0xF).min(9)
    }

    pub fn texture_format(&self) -> TextureFormat {
        TextureFormat::from_bits(self.raw(opcodes::TEXFORMAT))
    }

    /// Texture function (TEXFUNC bits 0-2), 3 is "replace"
    pub fn texture_function(&self) -> u32 {
        self.raw(opcodes::TEXFUNC) & 7
    }

    /// Mip level selection mode (TEXLEVEL bits 0-1); 0 is automatic
    pub fn texture_level_mode(&self) -> u32 {
        self.raw(opcodes::TEXLEVEL) & 3
    }

    /// Signed mip bias in 1/16 steps (TEXLEVEL bits 16-23)
    pub fn texture_level_offset16(&self) -> i32 {
        ((self.raw(opcodes::TEXLEVEL) >> 16) & 0xFF) as u8 as i8 as i32
    }

    /// Palette (CLUT) address
    pub fn clut_address(&self) -> u32 {
        (self.raw(opcodes::CLUTADDR) & 0x00FF_FFF0)
            | ((self.raw(opcodes::CLUTADDRUPPER) << 8) & 0x0F00_0000)
    }

    /// Bytes loaded by LOADCLUT (32 bytes per block)
    ///
    /// The hardware documents 0x3F blocks, but 0x40 is accepted.
    pub fn clut_load_bytes(&self) -> u32 {
        (self.raw(opcodes::LOADCLUT) & 0x7F).min(0x40) * 32
    }

    // Patch state

    /// Tessellation divisions `(u, v)`
    pub fn patch_divisions(&self) -> (u32, u32) {
        let raw = self.raw(opcodes::PATCHDIVISION);
        (raw & 0x7F, (raw >> 8) & 0x7F)
    }

    pub fn patch_primitive(&self) -> PatchPrimitive {
        PatchPrimitive::from_bits(self.raw(opcodes::PATCHPRIMITIVE))
    }

    /// Front face winding used by culling (CULL bit 0)
    pub fn cull_clockwise(&self) -> bool {
        self.enabled(opcodes::CULL)
    }

    pub fn is_cull_enabled(&self) -> bool {
        self.enabled(opcodes::CULLFACEENABLE)
    }

    // Block transfer state

    pub fn transfer_src_address(&self) -> u32 {
        (self.raw(opcodes::TRANSFERSRC) & 0x00FF_FFF0)
            | ((self.raw(opcodes::TRANSFERSRCW) & 0x00FF_0000) << 8)
    }

    /// Source stride in pixels; strides above 1024 read as zero
    pub fn transfer_src_stride(&self) -> u32 {
        let stride = self.raw(opcodes::TRANSFERSRCW) & 0x07F8;
        if stride > 0x400 {
            0
        } else {
            stride
        }
    }

    pub fn transfer_dst_address(&self) -> u32 {
        (self.raw(opcodes::TRANSFERDST) & 0x00FF_FFF0)
            | ((self.raw(opcodes::TRANSFERDSTW) & 0x00FF_0000) << 8)
    }

    /// Destination stride in pixels; strides above 1024 read as zero
    pub fn transfer_dst_stride(&self) -> u32 {
        let stride = self.raw(opcodes::TRANSFERDSTW) & 0x07F8;
        if stride > 0x400 {
            0
        } else {
            stride
        }
    }

    pub fn transfer_src_position(&self) -> (u32, u32) {
        let raw = self.raw(opcodes::TRANSFERSRCPOS);
        (raw & 0x3FF, (raw >> 10) & 0x3FF)
    }

    pub fn transfer_dst_position(&self) -> (u32, u32) {
        let raw = self.raw(opcodes::TRANSFERDSTPOS);
        (raw & 0x3FF, (raw >> 10) & 0x3FF)
    }

    /// Transfer rectangle `(width, height)` in pixels
    pub fn transfer_size(&self) -> (u32, u32) {
        let raw = self.raw(opcodes::TRANSFERSIZE);
        ((raw & 0x3FF) + 1, ((raw >> 10) & 0x3FF) + 1)
    }

    /// Bytes per pixel selected by TRANSFERSTART bit 0
    pub fn transfer_bytes_per_pixel(&self) -> u32 {
        if self.raw(opcodes::TRANSFERSTART) & 1 != 0 {
            4
        } else {
            2
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
