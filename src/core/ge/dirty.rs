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

//! Dirty flag categories
//!
//! Handlers and the dispatch table mark derived state as dirty instead of
//! recomputing it immediately. The set is drained when the core flushes and
//! handed to the backend, which rebinds only what changed.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Categories of derived GPU state that need rebinding before the next draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DirtyFlags: u64 {
        const FRAMEBUF = 1 << 0;
        const TEXTURE_IMAGE = 1 << 1;
        const TEXTURE_PARAMS = 1 << 2;
        const DEPAL = 1 << 3;
        const BLEND_STATE = 1 << 4;
        const DEPTHSTENCIL_STATE = 1 << 5;
        const RASTER_STATE = 1 << 6;
        const VIEWPORTSCISSOR_STATE = 1 << 7;
        const CULLRANGE = 1 << 8;
        const CULL_PLANES = 1 << 9;
        const DEPTHRANGE = 1 << 10;
        const VERTEXSHADER_STATE = 1 << 11;
        const FRAGMENTSHADER_STATE = 1 << 12;
        const GEOMETRYSHADER_STATE = 1 << 13;
        const FOGCOLOR = 1 << 14;
        const FOGCOEF = 1 << 15;
        const TEX_ALPHA_MUL = 1 << 16;
        const ALPHACOLORREF = 1 << 17;
        const ALPHACOLORMASK = 1 << 18;
        const STENCILREPLACEVALUE = 1 << 19;
        const COLORWRITEMASK = 1 << 20;
        const TEXENV = 1 << 21;
        const AMBIENT = 1 << 22;
        const MATDIFFUSE = 1 << 23;
        const MATEMISSIVE = 1 << 24;
        const MATAMBIENTALPHA = 1 << 25;
        const MATSPECULAR = 1 << 26;
        const LIGHT0 = 1 << 27;
        const LIGHT1 = 1 << 28;
        const LIGHT2 = 1 << 29;
        const LIGHT3 = 1 << 30;
        const WORLDMATRIX = 1 << 31;
        const VIEWMATRIX = 1 << 32;
        const PROJMATRIX = 1 << 33;
        const PROJTHROUGHMATRIX = 1 << 34;
        const TEXMATRIX = 1 << 35;
        const BONEMATRIX0 = 1 << 36;
        const BONEMATRIX1 = 1 << 37;
        const BONEMATRIX2 = 1 << 38;
        const BONEMATRIX3 = 1 << 39;
        const BONEMATRIX4 = 1 << 40;
        const BONEMATRIX5 = 1 << 41;
        const BONEMATRIX6 = 1 << 42;
        const BONEMATRIX7 = 1 << 43;
        const UVSCALEOFFSET = 1 << 44;
        const MIPBIAS = 1 << 45;
        const BEZIERSPLINE = 1 << 46;

        const LIGHTS = Self::LIGHT0.bits() | Self::LIGHT1.bits() | Self::LIGHT2.bits() | Self::LIGHT3.bits();
        const BONE_MATRICES = Self::BONEMATRIX0.bits()
            | Self::BONEMATRIX1.bits()
            | Self::BONEMATRIX2.bits()
            | Self::BONEMATRIX3.bits()
            | Self::BONEMATRIX4.bits()
            | Self::BONEMATRIX5.bits()
            | Self::BONEMATRIX6.bits()
            | Self::BONEMATRIX7.bits();
        const SHADERS = Self::VERTEXSHADER_STATE.bits()
            | Self::FRAGMENTSHADER_STATE.bits()
            | Self::GEOMETRYSHADER_STATE.bits();
    }
}

impl DirtyFlags {
    /// Dirty flag for one of the eight bone matrices
    pub fn bone_matrix(index: usize) -> Self {
        Self::from_bits_truncate(Self::BONEMATRIX0.bits() << (index.min(7) as u32))
    }
}
