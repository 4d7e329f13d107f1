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

//! Render backend interface
//!
//! The command processor never issues draw calls itself. It hands batched
//! geometry, patches and dirty-state notifications to a [`RenderBackend`],
//! and only flushes at points where buffered geometry would otherwise see
//! state it was not recorded with.
//!
//! Two backends ship with the crate: [`NullBackend`] discards everything and
//! [`RecordingBackend`] logs every call for tests and tooling.

use super::dirty::DirtyFlags;
use super::dispatch::CommandRegistration;
use super::registers::RegisterFile;
use super::state::ImmediateVertex;
use super::types::{PatchKind, PatchPrimitive, PixelFormat, PrimitiveType};
use super::vertex::VertexType;
use crate::core::error::BackendError;
use serde::Serialize;

/// Framebuffer the backend should draw into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderTarget {
    pub address: u32,
    /// Stride in pixels
    pub stride: u32,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    /// Bytes covered by the target in guest memory
    pub fn byte_size(&self) -> u32 {
        self.stride * self.height * self.format.bytes_per_pixel()
    }

    /// Whether `[address, address + size)` overlaps the target
    pub fn intersects(&self, address: u32, size: u32) -> bool {
        let start = self.address & 0x3FFF_FFFF;
        let end = start.saturating_add(self.byte_size().max(1));
        let other = address & 0x3FFF_FFFF;
        other < end && start < other.saturating_add(size.max(1))
    }
}

/// Where the vertices of a batch come from
#[derive(Debug, Clone, Copy)]
pub enum VertexSource<'a> {
    /// Vertex (and optional index) bytes read from guest memory
    Memory {
        vertices: &'a [u8],
        indices: Option<&'a [u8]>,
    },
    /// Vertices assembled from the immediate vertex registers
    Immediate(&'a [ImmediateVertex]),
}

/// One PRIM (or immediate vertex run) worth of geometry
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveBatch<'a> {
    pub primitive: PrimitiveType,
    pub vertex_type: VertexType,
    pub count: u32,
    pub vertex_address: u32,
    pub index_address: Option<u32>,
    pub source: VertexSource<'a>,
}

/// A BEZIER or SPLINE surface
#[derive(Debug, Clone, Copy)]
pub struct PatchBatch<'a> {
    pub kind: PatchKind,
    pub count_u: u32,
    pub count_v: u32,
    pub divisions: (u32, u32),
    pub primitive: PatchPrimitive,
    pub vertex_type: VertexType,
    pub control_points: &'a [u8],
    pub indices: Option<&'a [u8]>,
}

/// Capabilities the command processor needs from a renderer
///
/// Implementations hold any pending geometry themselves. After `flush`
/// returns `Ok`, nothing may remain pending.
pub trait RenderBackend {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Backend-specific replacements for shared command table rows
    fn command_overrides(&self) -> Vec<CommandRegistration> {
        Vec::new()
    }

    /// Draw everything pending using the current register state
    fn flush(&mut self, regs: &RegisterFile) -> Result<(), BackendError>;

    /// Queue a primitive batch
    fn submit_primitives(&mut self, batch: &PrimitiveBatch<'_>) -> Result<(), BackendError>;

    /// Queue a curved surface
    fn submit_patch(&mut self, patch: &PatchBatch<'_>) -> Result<(), BackendError>;

    fn set_render_target(&mut self, target: &RenderTarget);

    /// Derived state categories changed since the previous flush
    fn notify_dirty(&mut self, dirty: DirtyFlags);

    /// Whether unflushed geometry is buffered
    fn has_pending(&self) -> bool;

    /// Test control points against the view volume
    ///
    /// Returning `true` means "possibly visible"; a backend that cannot
    /// test keeps the default.
    fn test_bounding_box(&mut self, _control_points: &[u8], _count: u32, _vertex_type: VertexType) -> bool {
        true
    }

    /// Recreate device resources after a device loss
    fn restore(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Backend that accepts and discards all work
#[derive(Debug, Default)]
pub struct NullBackend {
    pending: u32,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn flush(&mut self, _regs: &RegisterFile) -> Result<(), BackendError> {
        self.pending = 0;
        Ok(())
    }

    fn submit_primitives(&mut self, batch: &PrimitiveBatch<'_>) -> Result<(), BackendError> {
        self.pending += batch.count;
        Ok(())
    }

    fn submit_patch(&mut self, patch: &PatchBatch<'_>) -> Result<(), BackendError> {
        self.pending += patch.count_u * patch.count_v;
        Ok(())
    }

    fn set_render_target(&mut self, _target: &RenderTarget) {}

    fn notify_dirty(&mut self, _dirty: DirtyFlags) {}

    fn has_pending(&self) -> bool {
        self.pending != 0
    }
}

/// A call observed by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BackendEvent {
    Flush {
        /// Batches drawn by this flush
        batches: u32,
    },
    Primitives {
        primitive: PrimitiveType,
        count: u32,
        vertex_address: u32,
        indexed: bool,
        immediate: bool,
    },
    Patch {
        kind: PatchKind,
        count_u: u32,
        count_v: u32,
    },
    RenderTarget(RenderTarget),
    Dirty(DirtyFlags),
}

/// Backend that records every call
///
/// Counts backend calls; used by tests and the command-line runner.
///
/// # Examples
///
/// ```
/// use gerx::core::ge::{RecordingBackend, RenderBackend, RegisterFile};
///
/// let mut backend = RecordingBackend::new();
/// backend.flush(&RegisterFile::new()).unwrap();
/// assert_eq!(backend.flush_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingBackend {
    events: Vec<BackendEvent>,
    pending_batches: u32,
    pending_vertices: u32,

    /// Register file captured at each flush
    flushed_registers: Vec<Box<[u32; 256]>>,
    capture_registers: bool,

    /// Error returned by the next flush or submission
    fail_next: Option<BackendError>,

    /// Result reported for bounding box tests
    pub bounding_box_visible: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            bounding_box_visible: true,
            ..Self::default()
        }
    }

    /// Also keep a copy of the register file at every flush
    pub fn capturing_registers() -> Self {
        Self {
            capture_registers: true,
            ..Self::new()
        }
    }

    /// Make the next flush or submission fail with `error`
    pub fn fail_next(&mut self, error: BackendError) {
        self.fail_next = Some(error);
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.flushed_registers.clear();
    }

    pub fn flush_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Flush { .. }))
            .count()
    }

    /// Primitive batches submitted, in order
    pub fn primitive_batches(&self) -> Vec<(PrimitiveType, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Primitives {
                    primitive, count, ..
                } => Some((*primitive, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn patch_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Patch { .. }))
            .count()
    }

    /// Union of every dirty notification received
    pub fn dirty_seen(&self) -> DirtyFlags {
        self.events.iter().fold(DirtyFlags::empty(), |acc, e| match e {
            BackendEvent::Dirty(flags) => acc | *flags,
            _ => acc,
        })
    }

    pub fn render_targets(&self) -> Vec<RenderTarget> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::RenderTarget(target) => Some(*target),
                _ => None,
            })
            .collect()
    }

    pub fn flushed_registers(&self) -> &[Box<[u32; 256]>] {
        &self.flushed_registers
    }

    /// Vertices submitted but not yet flushed
    pub fn pending_vertices(&self) -> u32 {
        self.pending_vertices
    }

    fn take_failure(&mut self) -> Result<(), BackendError> {
        match self.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn flush(&mut self, regs: &RegisterFile) -> Result<(), BackendError> {
        self.take_failure()?;
        self.events.push(BackendEvent::Flush {
            batches: self.pending_batches,
        });
        if self.capture_registers {
            self.flushed_registers.push(Box::new(*regs.raw_slots()));
        }
        self.pending_batches = 0;
        self.pending_vertices = 0;
        Ok(())
    }

    fn submit_primitives(&mut self, batch: &PrimitiveBatch<'_>) -> Result<(), BackendError> {
        self.take_failure()?;
        let (indexed, immediate) = match batch.source {
            VertexSource::Memory { indices, .. } => (indices.is_some(), false),
            VertexSource::Immediate(_) => (false, true),
        };
        self.events.push(BackendEvent::Primitives {
            primitive: batch.primitive,
            count: batch.count,
            vertex_address: batch.vertex_address,
            indexed,
            immediate,
        });
        self.pending_batches += 1;
        self.pending_vertices += batch.count;
        Ok(())
    }

    fn submit_patch(&mut self, patch: &PatchBatch<'_>) -> Result<(), BackendError> {
        self.take_failure()?;
        self.events.push(BackendEvent::Patch {
            kind: patch.kind,
            count_u: patch.count_u,
            count_v: patch.count_v,
        });
        self.pending_batches += 1;
        self.pending_vertices += patch.count_u * patch.count_v;
        Ok(())
    }

    fn set_render_target(&mut self, target: &RenderTarget) {
        self.events.push(BackendEvent::RenderTarget(*target));
    }

    fn notify_dirty(&mut self, dirty: DirtyFlags) {
        self.events.push(BackendEvent::Dirty(dirty));
    }

    fn has_pending(&self) -> bool {
        self.pending_batches != 0
    }

    fn test_bounding_box(&mut self, _control_points: &[u8], _count: u32, _vertex_type: VertexType) -> bool {
        self.bounding_box_visible
    }
}
