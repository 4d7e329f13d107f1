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

//! Shared command table
//!
//! One row per opcode describing flags, dirty categories and handler. Render
//! backends may replace rows through overrides; everything else about
//! command semantics is defined here once.

use super::command::{opcodes as op, UNKNOWN_OPCODES};
use super::dirty::DirtyFlags as D;
use super::dispatch::{CommandFlags as F, CommandRegistration as R, Handler};
use super::registers::MatrixKind;

/// Rows for every opcode the GE defines
pub fn common_commands() -> Vec<R> {
    let mut table = vec![
        // Addressing and control flow. No flushing, but always executed.
        R::handled(op::OFFSETADDR, F::EXECUTE, Handler::OffsetAddr),
        R::handled(op::ORIGIN, F::EXECUTE | F::READS_PC, Handler::Origin),
        R::handled(op::JUMP, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::Jump),
        R::handled(op::CALL, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::Call),
        R::handled(op::RET, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::Ret),
        R::handled(op::END, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::End),
        R::handled(op::VADDR, F::EXECUTE, Handler::Vaddr),
        R::handled(op::IADDR, F::EXECUTE, Handler::Iaddr),
        R::handled(op::BJUMP, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::BJump),
        R::handled(op::BOUNDINGBOX, F::EXECUTE, Handler::BoundingBox),

        // Drawing
        R::handled(op::PRIM, F::EXECUTE, Handler::Prim),
        R::handled(op::BEZIER, F::EXECUTE, Handler::Bezier),
        R::handled(op::SPLINE, F::EXECUTE, Handler::Spline),

        // Handler is swapped for the skinning variant by the builder
        R::handled(op::VERTEXTYPE, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::VertexType),
        R::handled(op::LOADCLUT, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE, Handler::LoadClut),

        // Consumed by END
        R::plain(op::SIGNAL),
        R::plain(op::FINISH),

        // Framebuffer
        R::state(op::FRAMEBUFPTR, D::FRAMEBUF | D::TEXTURE_PARAMS),
        R::state(op::FRAMEBUFWIDTH, D::FRAMEBUF | D::TEXTURE_PARAMS | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE),
        R::state(op::FRAMEBUFPIXFORMAT, D::FRAMEBUF | D::TEXTURE_PARAMS | D::BLEND_STATE | D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::ZBUFPTR, D::empty()),
        R::state(op::ZBUFWIDTH, D::empty()),

        // Fog
        R::state(op::FOGCOLOR, D::FOGCOLOR),
        R::state(op::FOG1, D::FOGCOEF),
        R::state(op::FOG2, D::FOGCOEF),

        // Fragment shader inputs
        R::state(op::CLEARMODE, D::BLEND_STATE | D::DEPTHSTENCIL_STATE | D::RASTER_STATE | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE | D::GEOMETRYSHADER_STATE),
        R::state(op::TEXTUREMAPENABLE, D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE | D::GEOMETRYSHADER_STATE),
        R::state(op::FOGENABLE, D::FRAGMENTSHADER_STATE),
        R::state(op::TEXMODE, D::TEXTURE_PARAMS | D::FRAGMENTSHADER_STATE),
        R::state(op::TEXSHADELS, D::VERTEXSHADER_STATE),
        R::state(op::SHADEMODE, D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE | D::RASTER_STATE),
        R::state(op::TEXFUNC, D::FRAGMENTSHADER_STATE | D::TEX_ALPHA_MUL),
        R::state(op::COLORTEST, D::FRAGMENTSHADER_STATE),
        R::state(op::ALPHATESTENABLE, D::FRAGMENTSHADER_STATE),
        R::state(op::COLORTESTENABLE, D::FRAGMENTSHADER_STATE),
        R::state(op::COLORTESTMASK, D::ALPHACOLORMASK | D::FRAGMENTSHADER_STATE),

        // Vertex shader inputs
        R::state(op::REVERSENORMAL, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTINGENABLE, D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE | D::GEOMETRYSHADER_STATE),
        R::state(op::LIGHTENABLE0, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTENABLE1, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTENABLE2, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTENABLE3, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTTYPE0, D::VERTEXSHADER_STATE | D::LIGHT0),
        R::state(op::LIGHTTYPE1, D::VERTEXSHADER_STATE | D::LIGHT1),
        R::state(op::LIGHTTYPE2, D::VERTEXSHADER_STATE | D::LIGHT2),
        R::state(op::LIGHTTYPE3, D::VERTEXSHADER_STATE | D::LIGHT3),
        R::state(op::MATERIALUPDATE, D::VERTEXSHADER_STATE),
        R::state(op::LIGHTMODE, D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE | D::GEOMETRYSHADER_STATE),
        R::state(op::TEXFILTER, D::TEXTURE_PARAMS),
        R::state(op::TEXWRAP, D::TEXTURE_PARAMS | D::FRAGMENTSHADER_STATE),

        // Uniforms
        R::state(op::ALPHATEST, D::ALPHACOLORREF | D::ALPHACOLORMASK | D::FRAGMENTSHADER_STATE),
        R::state(op::COLORREF, D::ALPHACOLORREF | D::FRAGMENTSHADER_STATE),
        R::state(op::TEXENVCOLOR, D::TEXENV),

        // Render state
        R::state(op::CULL, D::RASTER_STATE),
        R::state(op::CULLFACEENABLE, D::RASTER_STATE),
        R::state(op::DITHERENABLE, D::RASTER_STATE),
        R::state(op::STENCILOP, D::BLEND_STATE | D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::STENCILTEST, D::STENCILREPLACEVALUE | D::BLEND_STATE | D::DEPTHSTENCIL_STATE),
        R::state(op::STENCILTESTENABLE, D::BLEND_STATE | D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::ALPHABLENDENABLE, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::BLENDMODE, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::BLENDFIXEDA, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::BLENDFIXEDB, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::MASKRGB, D::BLEND_STATE | D::FRAGMENTSHADER_STATE | D::DEPTHSTENCIL_STATE | D::COLORWRITEMASK),
        R::state(op::MASKALPHA, D::BLEND_STATE | D::FRAGMENTSHADER_STATE | D::DEPTHSTENCIL_STATE | D::COLORWRITEMASK),
        R::state(op::ZTEST, D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::ZTESTENABLE, D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::ZWRITEDISABLE, D::DEPTHSTENCIL_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::LOGICOP, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::LOGICOPENABLE, D::BLEND_STATE | D::FRAGMENTSHADER_STATE),
        R::state(op::TEXMAPMODE, D::VERTEXSHADER_STATE | D::FRAGMENTSHADER_STATE),

        // Applied when vertices are decoded, so no flush
        R::handled(op::TEXSCALEU, F::EXECUTE_ON_CHANGE, Handler::Legacy),
        R::handled(op::TEXSCALEV, F::EXECUTE_ON_CHANGE, Handler::Legacy),
        R::handled(op::TEXOFFSETU, F::EXECUTE_ON_CHANGE, Handler::Legacy),
        R::handled(op::TEXOFFSETV, F::EXECUTE_ON_CHANGE, Handler::Legacy),

        // Texture
        R::handled(op::TEXSIZE0, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE, Handler::TexSize0),
        R::state(op::TEXSIZE1, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE2, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE3, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE4, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE5, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE6, D::TEXTURE_PARAMS),
        R::state(op::TEXSIZE7, D::TEXTURE_PARAMS),
        R::state(op::TEXFORMAT, D::TEXTURE_IMAGE),
        R {
            opcode: op::TEXLEVEL,
            flags: F::EXECUTE_ON_CHANGE,
            dirty: D::TEXTURE_PARAMS,
            handler: Some(Handler::TexLevel),
        },
        R::state(op::TEXLODSLOPE, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR0, D::TEXTURE_IMAGE),
        R::state(op::TEXADDR1, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR2, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR3, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR4, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR5, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR6, D::TEXTURE_PARAMS),
        R::state(op::TEXADDR7, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH0, D::TEXTURE_IMAGE),
        R::state(op::TEXBUFWIDTH1, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH2, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH3, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH4, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH5, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH6, D::TEXTURE_PARAMS),
        R::state(op::TEXBUFWIDTH7, D::TEXTURE_PARAMS),

        // Flush on change so LOADCLUT itself does not have to
        R::state(op::CLUTADDR, D::empty()),
        R::state(op::CLUTADDRUPPER, D::empty()),
        R::state(op::CLUTFORMAT, D::TEXTURE_PARAMS | D::DEPAL),

        // Morph weights
        R::handled(op::MORPHWEIGHT0, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT1, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT2, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT3, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT4, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT5, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT6, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),
        R::handled(op::MORPHWEIGHT7, F::FLUSH_BEFORE_ON_CHANGE | F::EXECUTE_ON_CHANGE, Handler::MorphWeight),

        // Patches
        R::state(op::PATCHDIVISION, D::BEZIERSPLINE),
        R::state(op::PATCHPRIMITIVE, D::empty()),
        R::state(op::PATCHFACING, D::VERTEXSHADER_STATE),
        R::state(op::PATCHCULLENABLE, D::empty()),
        R::state(op::ANTIALIASENABLE, D::empty()),

        // Viewport
        R::state(op::OFFSETX, D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),
        R::state(op::OFFSETY, D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),
        R::state(op::VIEWPORTXSCALE, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE | D::CULL_PLANES),
        R::state(op::VIEWPORTYSCALE, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE | D::CULL_PLANES),
        R::state(op::VIEWPORTXCENTER, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE | D::CULL_PLANES),
        R::state(op::VIEWPORTYCENTER, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE | D::CULL_PLANES),
        R::state(op::VIEWPORTZSCALE, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::DEPTHRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE),
        R::state(op::VIEWPORTZCENTER, D::FRAMEBUF | D::TEXTURE_PARAMS | D::CULLRANGE | D::DEPTHRANGE | D::PROJMATRIX | D::VIEWPORTSCISSOR_STATE),
        R::state(op::DEPTHCLAMPENABLE, D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::RASTER_STATE),
        R::state(op::MINZ, D::DEPTHRANGE | D::RASTER_STATE | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE),
        R::state(op::MAXZ, D::DEPTHRANGE | D::RASTER_STATE | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE),
        R::state(op::REGION1, D::FRAMEBUF | D::TEXTURE_PARAMS | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),
        R::state(op::REGION2, D::FRAMEBUF | D::TEXTURE_PARAMS | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),
        R::state(op::SCISSOR1, D::FRAMEBUF | D::TEXTURE_PARAMS | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),
        R::state(op::SCISSOR2, D::FRAMEBUF | D::TEXTURE_PARAMS | D::VIEWPORTSCISSOR_STATE | D::CULLRANGE | D::CULL_PLANES),

        // Lighting base colors
        R::state(op::AMBIENTCOLOR, D::AMBIENT),
        R::state(op::AMBIENTALPHA, D::AMBIENT),
        R::state(op::MATERIALDIFFUSE, D::MATDIFFUSE),
        R::state(op::MATERIALEMISSIVE, D::MATEMISSIVE),
        R::state(op::MATERIALAMBIENT, D::MATAMBIENTALPHA),
        R::state(op::MATERIALALPHA, D::MATAMBIENTALPHA),
        R::state(op::MATERIALSPECULAR, D::MATSPECULAR),
        R::state(op::MATERIALSPECULARCOEF, D::MATSPECULAR),

        // Light parameters
        R::state(op::LX0, D::LIGHT0),
        R::state(op::LY0, D::LIGHT0),
        R::state(op::LZ0, D::LIGHT0),
        R::state(op::LX1, D::LIGHT1),
        R::state(op::LY1, D::LIGHT1),
        R::state(op::LZ1, D::LIGHT1),
        R::state(op::LX2, D::LIGHT2),
        R::state(op::LY2, D::LIGHT2),
        R::state(op::LZ2, D::LIGHT2),
        R::state(op::LX3, D::LIGHT3),
        R::state(op::LY3, D::LIGHT3),
        R::state(op::LZ3, D::LIGHT3),
        R::state(op::LDX0, D::LIGHT0),
        R::state(op::LDY0, D::LIGHT0),
        R::state(op::LDZ0, D::LIGHT0),
        R::state(op::LDX1, D::LIGHT1),
        R::state(op::LDY1, D::LIGHT1),
        R::state(op::LDZ1, D::LIGHT1),
        R::state(op::LDX2, D::LIGHT2),
        R::state(op::LDY2, D::LIGHT2),
        R::state(op::LDZ2, D::LIGHT2),
        R::state(op::LDX3, D::LIGHT3),
        R::state(op::LDY3, D::LIGHT3),
        R::state(op::LDZ3, D::LIGHT3),
        R::state(op::LKA0, D::LIGHT0),
        R::state(op::LKB0, D::LIGHT0),
        R::state(op::LKC0, D::LIGHT0),
        R::state(op::LKA1, D::LIGHT1),
        R::state(op::LKB1, D::LIGHT1),
        R::state(op::LKC1, D::LIGHT1),
        R::state(op::LKA2, D::LIGHT2),
        R::state(op::LKB2, D::LIGHT2),
        R::state(op::LKC2, D::LIGHT2),
        R::state(op::LKA3, D::LIGHT3),
        R::state(op::LKB3, D::LIGHT3),
        R::state(op::LKC3, D::LIGHT3),
        R::state(op::LKS0, D::LIGHT0),
        R::state(op::LKS1, D::LIGHT1),
        R::state(op::LKS2, D::LIGHT2),
        R::state(op::LKS3, D::LIGHT3),
        R::state(op::LKO0, D::LIGHT0),
        R::state(op::LKO1, D::LIGHT1),
        R::state(op::LKO2, D::LIGHT2),
        R::state(op::LKO3, D::LIGHT3),
        R::state(op::LAC0, D::LIGHT0),
        R::state(op::LDC0, D::LIGHT0),
        R::state(op::LSC0, D::LIGHT0),
        R::state(op::LAC1, D::LIGHT1),
        R::state(op::LDC1, D::LIGHT1),
        R::state(op::LSC1, D::LIGHT1),
        R::state(op::LAC2, D::LIGHT2),
        R::state(op::LDC2, D::LIGHT2),
        R::state(op::LSC2, D::LIGHT2),
        R::state(op::LAC3, D::LIGHT3),
        R::state(op::LDC3, D::LIGHT3),
        R::state(op::LSC3, D::LIGHT3),

        // Cache sync commands stay no-ops apart from the framebuffer copy hint
        R::handled(op::TEXFLUSH, F::EXECUTE, Handler::TexFlush),
        R::plain(op::TEXSYNC),

        // Parameters consumed by other commands
        R::plain(op::NOP),
        R::plain(op::BASE),
        R::plain(op::TRANSFERSRC),
        R::plain(op::TRANSFERSRCW),
        R::plain(op::TRANSFERDST),
        R::plain(op::TRANSFERDSTW),
        R::plain(op::TRANSFERSRCPOS),
        R::plain(op::TRANSFERDSTPOS),
        R::plain(op::TRANSFERSIZE),
        R::handled(op::TRANSFERSTART, F::FLUSH_BEFORE | F::EXECUTE | F::READS_PC, Handler::BlockTransferStart),

        // Dither table is not used
        R::plain(op::DITH0),
        R::plain(op::DITH1),
        R::plain(op::DITH2),
        R::plain(op::DITH3),

        // Matrix uploads handle their own flushing
        R::handled(op::WORLDMATRIXNUMBER, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::MatrixNum(MatrixKind::World)),
        R::handled(op::WORLDMATRIXDATA, F::EXECUTE, Handler::MatrixData(MatrixKind::World)),
        R::handled(op::VIEWMATRIXNUMBER, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::MatrixNum(MatrixKind::View)),
        R::handled(op::VIEWMATRIXDATA, F::EXECUTE, Handler::MatrixData(MatrixKind::View)),
        R::handled(op::PROJMATRIXNUMBER, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::MatrixNum(MatrixKind::Projection)),
        R::handled(op::PROJMATRIXDATA, F::EXECUTE, Handler::MatrixData(MatrixKind::Projection)),
        R::handled(op::TGENMATRIXNUMBER, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::MatrixNum(MatrixKind::TexGen)),
        R::handled(op::TGENMATRIXDATA, F::EXECUTE, Handler::MatrixData(MatrixKind::TexGen)),
        R::handled(op::BONEMATRIXNUMBER, F::EXECUTE | F::READS_PC | F::WRITES_PC, Handler::MatrixNum(MatrixKind::Bone)),
        R::handled(op::BONEMATRIXDATA, F::EXECUTE, Handler::MatrixData(MatrixKind::Bone)),

        // Immediate vertex registers
        R::plain(op::VSCX),
        R::plain(op::VSCY),
        R::plain(op::VSCZ),
        R::plain(op::VTCS),
        R::plain(op::VTCT),
        R::plain(op::VTCQ),
        R::plain(op::VCV),
        R::handled(op::VAP, F::EXECUTE, Handler::ImmVertexAlphaPrim),
        R::plain(op::VFC),
        R::plain(op::VSCV),

        // Unused slot behaves like NOP
        R::plain(op::NOP_FF),
    ];

    // Gaps in the command map log their payload and otherwise do nothing
    table.extend(
        UNKNOWN_OPCODES
            .iter()
            .map(|&opcode| R::handled(opcode, F::EXECUTE, Handler::Unknown)),
    );

    table
}
