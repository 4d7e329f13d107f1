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

//! Shared GE type definitions
//!
//! Small enums decoded from register payloads: primitive types, buffer and
//! texture formats, patch kinds.

use serde::{Deserialize, Serialize};

/// Primitive type encoded in bits 16-18 of PRIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Rectangles,
    /// Continue the previous primitive type
    KeepPrevious,
}

impl PrimitiveType {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => PrimitiveType::Points,
            1 => PrimitiveType::Lines,
            2 => PrimitiveType::LineStrip,
            3 => PrimitiveType::Triangles,
            4 => PrimitiveType::TriangleStrip,
            5 => PrimitiveType::TriangleFan,
            6 => PrimitiveType::Rectangles,
            _ => PrimitiveType::KeepPrevious,
        }
    }

    pub fn is_line(self) -> bool {
        matches!(self, PrimitiveType::Lines | PrimitiveType::LineStrip)
    }

    pub fn is_triangle(self) -> bool {
        matches!(
            self,
            PrimitiveType::Triangles | PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan
        )
    }
}

/// Framebuffer pixel format (FRAMEBUFPIXFORMAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb565,
    Rgba5551,
    Rgba4444,
    Rgba8888,
}

impl PixelFormat {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => PixelFormat::Rgb565,
            1 => PixelFormat::Rgba5551,
            2 => PixelFormat::Rgba4444,
            _ => PixelFormat::Rgba8888,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8888 => 4,
            _ => 2,
        }
    }
}

/// Texture format (TEXFORMAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgb565,
    Rgba5551,
    Rgba4444,
    Rgba8888,
    Clut4,
    Clut8,
    Clut16,
    Clut32,
    Dxt1,
    Dxt3,
    Dxt5,
    Invalid(u8),
}

impl TextureFormat {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0 => TextureFormat::Rgb565,
            1 => TextureFormat::Rgba5551,
            2 => TextureFormat::Rgba4444,
            3 => TextureFormat::Rgba8888,
            4 => TextureFormat::Clut4,
            5 => TextureFormat::Clut8,
            6 => TextureFormat::Clut16,
            7 => TextureFormat::Clut32,
            8 => TextureFormat::Dxt1,
            9 => TextureFormat::Dxt3,
            10 => TextureFormat::Dxt5,
            other => TextureFormat::Invalid(other as u8),
        }
    }

    /// Storage cost in bits per texel
    pub fn bits_per_texel(self) -> u32 {
        match self {
            TextureFormat::Clut4 | TextureFormat::Dxt1 => 4,
            TextureFormat::Clut8 | TextureFormat::Dxt3 | TextureFormat::Dxt5 => 8,
            TextureFormat::Rgba8888 | TextureFormat::Clut32 => 32,
            TextureFormat::Invalid(_) => 0,
            _ => 16,
        }
    }

    pub fn is_clut(self) -> bool {
        matches!(
            self,
            TextureFormat::Clut4 | TextureFormat::Clut8 | TextureFormat::Clut16 | TextureFormat::Clut32
        )
    }
}

/// Patch primitive used to tessellate BEZIER/SPLINE surfaces (PATCHPRIMITIVE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchPrimitive {
    Triangles,
    Lines,
    Points,
}

impl PatchPrimitive {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => PatchPrimitive::Triangles,
            1 => PatchPrimitive::Lines,
            // 3 behaves like points on hardware
            _ => PatchPrimitive::Points,
        }
    }
}

/// Edge behaviour of a spline patch in one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineEdge {
    CloseClose,
    OpenClose,
    CloseOpen,
    OpenOpen,
}

impl SplineEdge {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => SplineEdge::CloseClose,
            1 => SplineEdge::OpenClose,
            2 => SplineEdge::CloseOpen,
            _ => SplineEdge::OpenOpen,
        }
    }
}

/// Kind of curved surface submitted through `submit_patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchKind {
    Bezier,
    Spline { edge_u: SplineEdge, edge_v: SplineEdge },
}
