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

//! GE command words and opcodes
//!
//! Every display list entry is a 32-bit little-endian word. The top 8 bits
//! select one of 256 opcodes and the low 24 bits carry the payload.
//!
//! ```text
//!  31        24 23                                 0
//! +------------+------------------------------------+
//! |   opcode   |              payload               |
//! +------------+------------------------------------+
//! ```

use serde::Serialize;

/// Opcode constants for every GE command
///
/// Gaps in the hardware command map are named `UNKNOWN_xx`.
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const VADDR: u8 = 0x01;
    pub const IADDR: u8 = 0x02;
    pub const UNKNOWN_03: u8 = 0x03;
    pub const PRIM: u8 = 0x04;
    pub const BEZIER: u8 = 0x05;
    pub const SPLINE: u8 = 0x06;
    pub const BOUNDINGBOX: u8 = 0x07;
    pub const JUMP: u8 = 0x08;
    pub const BJUMP: u8 = 0x09;
    pub const CALL: u8 = 0x0A;
    pub const RET: u8 = 0x0B;
    pub const END: u8 = 0x0C;
    pub const UNKNOWN_0D: u8 = 0x0D;
    pub const SIGNAL: u8 = 0x0E;
    pub const FINISH: u8 = 0x0F;
    pub const BASE: u8 = 0x10;
    pub const UNKNOWN_11: u8 = 0x11;
    pub const VERTEXTYPE: u8 = 0x12;
    pub const OFFSETADDR: u8 = 0x13;
    pub const ORIGIN: u8 = 0x14;
    pub const REGION1: u8 = 0x15;
    pub const REGION2: u8 = 0x16;
    pub const LIGHTINGENABLE: u8 = 0x17;
    pub const LIGHTENABLE0: u8 = 0x18;
    pub const LIGHTENABLE1: u8 = 0x19;
    pub const LIGHTENABLE2: u8 = 0x1A;
    pub const LIGHTENABLE3: u8 = 0x1B;
    pub const DEPTHCLAMPENABLE: u8 = 0x1C;
    pub const CULLFACEENABLE: u8 = 0x1D;
    pub const TEXTUREMAPENABLE: u8 = 0x1E;
    pub const FOGENABLE: u8 = 0x1F;
    pub const DITHERENABLE: u8 = 0x20;
    pub const ALPHABLENDENABLE: u8 = 0x21;
    pub const ALPHATESTENABLE: u8 = 0x22;
    pub const ZTESTENABLE: u8 = 0x23;
    pub const STENCILTESTENABLE: u8 = 0x24;
    pub const ANTIALIASENABLE: u8 = 0x25;
    pub const PATCHCULLENABLE: u8 = 0x26;
    pub const COLORTESTENABLE: u8 = 0x27;
    pub const LOGICOPENABLE: u8 = 0x28;
    pub const UNKNOWN_29: u8 = 0x29;
    pub const BONEMATRIXNUMBER: u8 = 0x2A;
    pub const BONEMATRIXDATA: u8 = 0x2B;
    pub const MORPHWEIGHT0: u8 = 0x2C;
    pub const MORPHWEIGHT1: u8 = 0x2D;
    pub const MORPHWEIGHT2: u8 = 0x2E;
    pub const MORPHWEIGHT3: u8 = 0x2F;
    pub const MORPHWEIGHT4: u8 = 0x30;
    pub const MORPHWEIGHT5: u8 = 0x31;
    pub const MORPHWEIGHT6: u8 = 0x32;
    pub const MORPHWEIGHT7: u8 = 0x33;
    pub const UNKNOWN_34: u8 = 0x34;
    pub const UNKNOWN_35: u8 = 0x35;
    pub const PATCHDIVISION: u8 = 0x36;
    pub const PATCHPRIMITIVE: u8 = 0x37;
    pub const PATCHFACING: u8 = 0x38;
    pub const UNKNOWN_39: u8 = 0x39;
    pub const WORLDMATRIXNUMBER: u8 = 0x3A;
    pub const WORLDMATRIXDATA: u8 = 0x3B;
    pub const VIEWMATRIXNUMBER: u8 = 0x3C;
    pub const VIEWMATRIXDATA: u8 = 0x3D;
    pub const PROJMATRIXNUMBER: u8 = 0x3E;
    pub const PROJMATRIXDATA: u8 = 0x3F;
    pub const TGENMATRIXNUMBER: u8 = 0x40;
    pub const TGENMATRIXDATA: u8 = 0x41;
    pub const VIEWPORTXSCALE: u8 = 0x42;
    pub const VIEWPORTYSCALE: u8 = 0x43;
    pub const VIEWPORTZSCALE: u8 = 0x44;
    pub const VIEWPORTXCENTER: u8 = 0x45;
    pub const VIEWPORTYCENTER: u8 = 0x46;
    pub const VIEWPORTZCENTER: u8 = 0x47;
    pub const TEXSCALEU: u8 = 0x48;
    pub const TEXSCALEV: u8 = 0x49;
    pub const TEXOFFSETU: u8 = 0x4A;
    pub const TEXOFFSETV: u8 = 0x4B;
    pub const OFFSETX: u8 = 0x4C;
    pub const OFFSETY: u8 = 0x4D;
    pub const UNKNOWN_4E: u8 = 0x4E;
    pub const UNKNOWN_4F: u8 = 0x4F;
    pub const SHADEMODE: u8 = 0x50;
    pub const REVERSENORMAL: u8 = 0x51;
    pub const UNKNOWN_52: u8 = 0x52;
    pub const MATERIALUPDATE: u8 = 0x53;
    pub const MATERIALEMISSIVE: u8 = 0x54;
    pub const MATERIALAMBIENT: u8 = 0x55;
    pub const MATERIALDIFFUSE: u8 = 0x56;
    pub const MATERIALSPECULAR: u8 = 0x57;
    pub const MATERIALALPHA: u8 = 0x58;
    pub const UNKNOWN_59: u8 = 0x59;
    pub const UNKNOWN_5A: u8 = 0x5A;
    pub const MATERIALSPECULARCOEF: u8 = 0x5B;
    pub const AMBIENTCOLOR: u8 = 0x5C;
    pub const AMBIENTALPHA: u8 = 0x5D;
    pub const LIGHTMODE: u8 = 0x5E;
    pub const LIGHTTYPE0: u8 = 0x5F;
    pub const LIGHTTYPE1: u8 = 0x60;
    pub const LIGHTTYPE2: u8 = 0x61;
    pub const LIGHTTYPE3: u8 = 0x62;
    pub const LX0: u8 = 0x63;
    pub const LY0: u8 = 0x64;
    pub const LZ0: u8 = 0x65;
    pub const LX1: u8 = 0x66;
    pub const LY1: u8 = 0x67;
    pub const LZ1: u8 = 0x68;
    pub const LX2: u8 = 0x69;
    pub const LY2: u8 = 0x6A;
    pub const LZ2: u8 = 0x6B;
    pub const LX3: u8 = 0x6C;
    pub const LY3: u8 = 0x6D;
    pub const LZ3: u8 = 0x6E;
    pub const LDX0: u8 = 0x6F;
    pub const LDY0: u8 = 0x70;
    pub const LDZ0: u8 = 0x71;
    pub const LDX1: u8 = 0x72;
    pub const LDY1: u8 = 0x73;
    pub const LDZ1: u8 = 0x74;
    pub const LDX2: u8 = 0x75;
    pub const LDY2: u8 = 0x76;
    pub const LDZ2: u8 = 0x77;
    pub const LDX3: u8 = 0x78;
    pub const LDY3: u8 = 0x79;
    pub const LDZ3: u8 = 0x7A;
    pub const LKA0: u8 = 0x7B;
    pub const LKB0: u8 = 0x7C;
    pub const LKC0: u8 = 0x7D;
    pub const LKA1: u8 = 0x7E;
    pub const LKB1: u8 = 0x7F;
    pub const LKC1: u8 = 0x80;
    pub const LKA2: u8 = 0x81;
    pub const LKB2: u8 = 0x82;
    pub const LKC2: u8 = 0x83;
    pub const LKA3: u8 = 0x84;
    pub const LKB3: u8 = 0x85;
    pub const LKC3: u8 = 0x86;
    pub const LKS0: u8 = 0x87;
    pub const LKS1: u8 = 0x88;
    pub const LKS2: u8 = 0x89;
    pub const LKS3: u8 = 0x8A;
    pub const LKO0: u8 = 0x8B;
    pub const LKO1: u8 = 0x8C;
    pub const LKO2: u8 = 0x8D;
    pub const LKO3: u8 = 0x8E;
    pub const LAC0: u8 = 0x8F;
    pub const LDC0: u8 = 0x90;
    pub const LSC0: u8 = 0x91;
    pub const LAC1: u8 = 0x92;
    pub const LDC1: u8 = 0x93;
    pub const LSC1: u8 = 0x94;
    pub const LAC2: u8 = 0x95;
    pub const LDC2: u8 = 0x96;
    pub const LSC2: u8 = 0x97;
    pub const LAC3: u8 = 0x98;
    pub const LDC3: u8 = 0x99;
    pub const LSC3: u8 = 0x9A;
    pub const CULL: u8 = 0x9B;
    pub const FRAMEBUFPTR: u8 = 0x9C;
    pub const FRAMEBUFWIDTH: u8 = 0x9D;
    pub const ZBUFPTR: u8 = 0x9E;
    pub const ZBUFWIDTH: u8 = 0x9F;
    pub const TEXADDR0: u8 = 0xA0;
    pub const TEXADDR1: u8 = 0xA1;
    pub const TEXADDR2: u8 = 0xA2;
    pub const TEXADDR3: u8 = 0xA3;
    pub const TEXADDR4: u8 = 0xA4;
    pub const TEXADDR5: u8 = 0xA5;
    pub const TEXADDR6: u8 = 0xA6;
    pub const TEXADDR7: u8 = 0xA7;
    pub const TEXBUFWIDTH0: u8 = 0xA8;
    pub const TEXBUFWIDTH1: u8 = 0xA9;
    pub const TEXBUFWIDTH2: u8 = 0xAA;
    pub const TEXBUFWIDTH3: u8 = 0xAB;
    pub const TEXBUFWIDTH4: u8 = 0xAC;
    pub const TEXBUFWIDTH5: u8 = 0xAD;
    pub const TEXBUFWIDTH6: u8 = 0xAE;
    pub const TEXBUFWIDTH7: u8 = 0xAF;
    pub const CLUTADDR: u8 = 0xB0;
    pub const CLUTADDRUPPER: u8 = 0xB1;
    pub const TRANSFERSRC: u8 = 0xB2;
    pub const TRANSFERSRCW: u8 = 0xB3;
    pub const TRANSFERDST: u8 = 0xB4;
    pub const TRANSFERDSTW: u8 = 0xB5;
    pub const UNKNOWN_B6: u8 = 0xB6;
    pub const UNKNOWN_B7: u8 = 0xB7;
    pub const TEXSIZE0: u8 = 0xB8;
    pub const TEXSIZE1: u8 = 0xB9;
    pub const TEXSIZE2: u8 = 0xBA;
    pub const TEXSIZE3: u8 = 0xBB;
    pub const TEXSIZE4: u8 = 0xBC;
    pub const TEXSIZE5: u8 = 0xBD;
    pub const TEXSIZE6: u8 = 0xBE;
    pub const TEXSIZE7: u8 = 0xBF;
    pub const TEXMAPMODE: u8 = 0xC0;
    pub const TEXSHADELS: u8 = 0xC1;
    pub const TEXMODE: u8 = 0xC2;
    pub const TEXFORMAT: u8 = 0xC3;
    pub const LOADCLUT: u8 = 0xC4;
    pub const CLUTFORMAT: u8 = 0xC5;
    pub const TEXFILTER: u8 = 0xC6;
    pub const TEXWRAP: u8 = 0xC7;
    pub const TEXLEVEL: u8 = 0xC8;
    pub const TEXFUNC: u8 = 0xC9;
    pub const TEXENVCOLOR: u8 = 0xCA;
    pub const TEXFLUSH: u8 = 0xCB;
    pub const TEXSYNC: u8 = 0xCC;
    pub const FOG1: u8 = 0xCD;
    pub const FOG2: u8 = 0xCE;
    pub const FOGCOLOR: u8 = 0xCF;
    pub const TEXLODSLOPE: u8 = 0xD0;
    pub const UNKNOWN_D1: u8 = 0xD1;
    pub const FRAMEBUFPIXFORMAT: u8 = 0xD2;
    pub const CLEARMODE: u8 = 0xD3;
    pub const SCISSOR1: u8 = 0xD4;
    pub const SCISSOR2: u8 = 0xD5;
    pub const MINZ: u8 = 0xD6;
    pub const MAXZ: u8 = 0xD7;
    pub const COLORTEST: u8 = 0xD8;
    pub const COLORREF: u8 = 0xD9;
    pub const COLORTESTMASK: u8 = 0xDA;
    pub const ALPHATEST: u8 = 0xDB;
    pub const STENCILTEST: u8 = 0xDC;
    pub const STENCILOP: u8 = 0xDD;
    pub const ZTEST: u8 = 0xDE;
    pub const BLENDMODE: u8 = 0xDF;
    pub const BLENDFIXEDA: u8 = 0xE0;
    pub const BLENDFIXEDB: u8 = 0xE1;
    pub const DITH0: u8 = 0xE2;
    pub const DITH1: u8 = 0xE3;
    pub const DITH2: u8 = 0xE4;
    pub const DITH3: u8 = 0xE5;
    pub const LOGICOP: u8 = 0xE6;
    pub const ZWRITEDISABLE: u8 = 0xE7;
    pub const MASKRGB: u8 = 0xE8;
    pub const MASKALPHA: u8 = 0xE9;
    pub const TRANSFERSTART: u8 = 0xEA;
    pub const TRANSFERSRCPOS: u8 = 0xEB;
    pub const TRANSFERDSTPOS: u8 = 0xEC;
    pub const UNKNOWN_ED: u8 = 0xED;
    pub const TRANSFERSIZE: u8 = 0xEE;
    pub const UNKNOWN_EF: u8 = 0xEF;
    pub const VSCX: u8 = 0xF0;
    pub const VSCY: u8 = 0xF1;
    pub const VSCZ: u8 = 0xF2;
    pub const VTCS: u8 = 0xF3;
    pub const VTCT: u8 = 0xF4;
    pub const VTCQ: u8 = 0xF5;
    pub const VCV: u8 = 0xF6;
    pub const VAP: u8 = 0xF7;
    pub const VFC: u8 = 0xF8;
    pub const VSCV: u8 = 0xF9;
    pub const UNKNOWN_FA: u8 = 0xFA;
    pub const UNKNOWN_FB: u8 = 0xFB;
    pub const UNKNOWN_FC: u8 = 0xFC;
    pub const UNKNOWN_FD: u8 = 0xFD;
    pub const UNKNOWN_FE: u8 = 0xFE;
    pub const NOP_FF: u8 = 0xFF;
}

/// Opcodes with no documented hardware behaviour
pub const UNKNOWN_OPCODES: [u8; 22] = [
    0x03, 0x0D, 0x11, 0x29, 0x34, 0x35, 0x39, 0x4E, 0x4F, 0x52, 0x59, 0x5A, 0xB6, 0xB7, 0xD1,
    0xED, 0xEF, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE,
];

static MNEMONICS: [&str; 256] = [
    "NOP",
    "VADDR",
    "IADDR",
    "UNKNOWN_03",
    "PRIM",
    "BEZIER",
    "SPLINE",
    "BOUNDINGBOX",
    "JUMP",
    "BJUMP",
    "CALL",
    "RET",
    "END",
    "UNKNOWN_0D",
    "SIGNAL",
    "FINISH",
    "BASE",
    "UNKNOWN_11",
    "VERTEXTYPE",
    "OFFSETADDR",
    "ORIGIN",
    "REGION1",
    "REGION2",
    "LIGHTINGENABLE",
    "LIGHTENABLE0",
    "LIGHTENABLE1",
    "LIGHTENABLE2",
    "LIGHTENABLE3",
    "DEPTHCLAMPENABLE",
    "CULLFACEENABLE",
    "TEXTUREMAPENABLE",
    "FOGENABLE",
    "DITHERENABLE",
    "ALPHABLENDENABLE",
    "ALPHATESTENABLE",
    "ZTESTENABLE",
    "STENCILTESTENABLE",
    "ANTIALIASENABLE",
    "PATCHCULLENABLE",
    "COLORTESTENABLE",
    "LOGICOPENABLE",
    "UNKNOWN_29",
    "BONEMATRIXNUMBER",
    "BONEMATRIXDATA",
    "MORPHWEIGHT0",
    "MORPHWEIGHT1",
    "MORPHWEIGHT2",
    "MORPHWEIGHT3",
    "MORPHWEIGHT4",
    "MORPHWEIGHT5",
    "MORPHWEIGHT6",
    "MORPHWEIGHT7",
    "UNKNOWN_34",
    "UNKNOWN_35",
    "PATCHDIVISION",
    "PATCHPRIMITIVE",
    "PATCHFACING",
    "UNKNOWN_39",
    "WORLDMATRIXNUMBER",
    "WORLDMATRIXDATA",
    "VIEWMATRIXNUMBER",
    "VIEWMATRIXDATA",
    "PROJMATRIXNUMBER",
    "PROJMATRIXDATA",
    "TGENMATRIXNUMBER",
    "TGENMATRIXDATA",
    "VIEWPORTXSCALE",
    "VIEWPORTYSCALE",
    "VIEWPORTZSCALE",
    "VIEWPORTXCENTER",
    "VIEWPORTYCENTER",
    "VIEWPORTZCENTER",
    "TEXSCALEU",
    "TEXSCALEV",
    "TEXOFFSETU",
    "TEXOFFSETV",
    "OFFSETX",
    "OFFSETY",
    "UNKNOWN_4E",
    "UNKNOWN_4F",
    "SHADEMODE",
    "REVERSENORMAL",
    "UNKNOWN_52",
    "MATERIALUPDATE",
    "MATERIALEMISSIVE",
    "MATERIALAMBIENT",
    "MATERIALDIFFUSE",
    "MATERIALSPECULAR",
    "MATERIALALPHA",
    "UNKNOWN_59",
    "UNKNOWN_5A",
    "MATERIALSPECULARCOEF",
    "AMBIENTCOLOR",
    "AMBIENTALPHA",
    "LIGHTMODE",
    "LIGHTTYPE0",
    "LIGHTTYPE1",
    "LIGHTTYPE2",
    "LIGHTTYPE3",
    "LX0",
    "LY0",
    "LZ0",
    "LX1",
    "LY1",
    "LZ1",
    "LX2",
    "LY2",
    "LZ2",
    "LX3",
    "LY3",
    "LZ3",
    "LDX0",
    "LDY0",
    "LDZ0",
    "LDX1",
    "LDY1",
    "LDZ1",
    "LDX2",
    "LDY2",
    "LDZ2",
    "LDX3",
    "LDY3",
    "LDZ3",
    "LKA0",
    "LKB0",
    "LKC0",
    "LKA1",
    "LKB1",
    "LKC1",
    "LKA2",
    "LKB2",
    "LKC2",
    "LKA3",
    "LKB3",
    "LKC3",
    "LKS0",
    "LKS1",
    "LKS2",
    "LKS3",
    "LKO0",
    "LKO1",
    "LKO2",
    "LKO3",
    "LAC0",
    "LDC0",
    "LSC0",
    "LAC1",
    "LDC1",
    "LSC1",
    "LAC2",
    "LDC2",
    "LSC2",
    "LAC3",
    "LDC3",
    "LSC3",
    "CULL",
    "FRAMEBUFPTR",
    "FRAMEBUFWIDTH",
    "ZBUFPTR",
    "ZBUFWIDTH",
    "TEXADDR0",
    "TEXADDR1",
    "TEXADDR2",
    "TEXADDR3",
    "TEXADDR4",
    "TEXADDR5",
    "TEXADDR6",
    "TEXADDR7",
    "TEXBUFWIDTH0",
    "TEXBUFWIDTH1",
    "TEXBUFWIDTH2",
    "TEXBUFWIDTH3",
    "TEXBUFWIDTH4",
    "TEXBUFWIDTH5",
    "TEXBUFWIDTH6",
    "TEXBUFWIDTH7",
    "CLUTADDR",
    "CLUTADDRUPPER",
    "TRANSFERSRC",
    "TRANSFERSRCW",
    "TRANSFERDST",
    "TRANSFERDSTW",
    "UNKNOWN_B6",
    "UNKNOWN_B7",
    "TEXSIZE0",
    "TEXSIZE1",
    "TEXSIZE2",
    "TEXSIZE3",
    "TEXSIZE4",
    "TEXSIZE5",
    "TEXSIZE6",
    "TEXSIZE7",
    "TEXMAPMODE",
    "TEXSHADELS",
    "TEXMODE",
    "TEXFORMAT",
    "LOADCLUT",
    "CLUTFORMAT",
    "TEXFILTER",
    "TEXWRAP",
    "TEXLEVEL",
    "TEXFUNC",
    "TEXENVCOLOR",
    "TEXFLUSH",
    "TEXSYNC",
    "FOG1",
    "FOG2",
    "FOGCOLOR",
    "TEXLODSLOPE",
    "UNKNOWN_D1",
    "FRAMEBUFPIXFORMAT",
    "CLEARMODE",
    "SCISSOR1",
    "SCISSOR2",
    "MINZ",
    "MAXZ",
    "COLORTEST",
    "COLORREF",
    "COLORTESTMASK",
    "ALPHATEST",
    "STENCILTEST",
    "STENCILOP",
    "ZTEST",
    "BLENDMODE",
    "BLENDFIXEDA",
    "BLENDFIXEDB",
    "DITH0",
    "DITH1",
    "DITH2",
    "DITH3",
    "LOGICOP",
    "ZWRITEDISABLE",
    "MASKRGB",
    "MASKALPHA",
    "TRANSFERSTART",
    "TRANSFERSRCPOS",
    "TRANSFERDSTPOS",
    "UNKNOWN_ED",
    "TRANSFERSIZE",
    "UNKNOWN_EF",
    "VSCX",
    "VSCY",
    "VSCZ",
    "VTCS",
    "VTCT",
    "VTCQ",
    "VCV",
    "VAP",
    "VFC",
    "VSCV",
    "UNKNOWN_FA",
    "UNKNOWN_FB",
    "UNKNOWN_FC",
    "UNKNOWN_FD",
    "UNKNOWN_FE",
    "NOP_FF",
];

/// Mnemonic of an opcode, used by the tracer and debugger snapshots
pub fn mnemonic(opcode: u8) -> &'static str {
    MNEMONICS[opcode as usize]
}

/// A single fetched command word
///
/// # Examples
///
/// ```
/// use gerx::core::ge::CommandWord;
/// use gerx::core::ge::opcodes;
///
/// let cmd = CommandWord(0x0412_0003);
/// assert_eq!(cmd.opcode(), opcodes::PRIM);
/// assert_eq!(cmd.payload(), 0x12_0003);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandWord(pub u32);

impl CommandWord {
    /// Build a command word from an opcode and a 24-bit payload
    #[inline(always)]
    pub const fn new(opcode: u8, payload: u32) -> Self {
        Self(((opcode as u32) << 24) | (payload & 0x00FF_FFFF))
    }

    /// Opcode (top 8 bits)
    #[inline(always)]
    pub const fn opcode(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Payload (low 24 bits)
    #[inline(always)]
    pub const fn payload(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Payload interpreted as a 24-bit float
    pub fn float24(self) -> f32 {
        float24(self.0)
    }

    /// Human-readable form, e.g. `PRIM 0x030003`
    pub fn disassemble(self) -> String {
        format!("{} 0x{:06X}", mnemonic(self.opcode()), self.payload())
    }
}

/// Decode the 24-bit float stored in a command payload
///
/// The GE drops the low 8 mantissa bits of an IEEE single; shifting the
/// payload up restores a valid `f32` bit pattern.
#[inline(always)]
pub fn float24(value: u32) -> f32 {
    f32::from_bits(value << 8)
}

/// Encode a float as a 24-bit payload (truncating the low mantissa bits)
#[inline(always)]
pub fn to_float24(value: f32) -> u32 {
    value.to_bits() >> 8
}
