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

//! Cache tracking and invalidation
//!
//! The GE core keeps three caches coherent with guest memory:
//!
//! - [`TextureCache`]: texture ranges seen by draws, keyed by address
//! - [`PaletteCache`]: the last palette loaded by LOADCLUT
//! - [`FramebufferCache`]: render targets the backend has drawn into
//!
//! Every guest write that may alias GPU-visible memory goes through
//! [`CacheCoordinator::invalidate`] with one of three granularities:
//!
//! | Kind   | Used for                         | Texture cache        | Framebuffer cache          |
//! |--------|----------------------------------|----------------------|----------------------------|
//! | `Hint` | block transfers, GE memcpy/memset| mark overlaps suspect| only if a target overlaps  |
//! | `Safe` | generic CPU writes               | drop overlaps        | always rechecked           |
//! | `All`  | device loss, state restore       | clear                | clear                      |

use super::backend::RenderTarget;
use crate::core::memory::GuestMemory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hasher};

/// Invalidation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidationKind {
    /// Cheap; may under-invalidate
    Hint,
    /// Forces a precise recheck
    Safe,
    /// Drops every cache
    All,
}

/// Hash guest bytes for change detection
fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Validity of one cached texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextureStatus {
    Valid,
    /// Overlapped by a hinted write; rehash on next use
    Suspect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureEntry {
    pub address: u32,
    pub size: u32,
    pub hash: u64,
    pub status: TextureStatus,
}

impl TextureEntry {
    fn overlaps(&self, address: u32, size: u32) -> bool {
        address < self.address.saturating_add(self.size) && self.address < address.saturating_add(size)
    }
}

/// Texture cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextureCacheStats {
    pub loads: u64,
    pub rehashes: u64,
    pub hits: u64,
}

/// Texture ranges referenced by draws
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: BTreeMap<u32, TextureEntry>,
    stats: TextureCacheStats,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the texture at `address`, (re)loading it if needed
    ///
    /// # Returns
    ///
    /// `true` if the texture had to be (re)loaded.
    pub fn use_texture(&mut self, mem: &GuestMemory, address: u32, size: u32) -> bool {
        let address = address & 0x3FFF_FFFF;
        let size = mem.valid_size(address, size);
        let hash = match mem.slice(address, size) {
            Ok(bytes) => content_hash(bytes),
            Err(_) => {
                log::warn!("Texture at invalid address 0x{:08X}", address);
                return false;
            }
        };

        if let Some(entry) = self.entries.get_mut(&address) {
            if entry.size == size && entry.status == TextureStatus::Valid {
                self.stats.hits += 1;
                return false;
            }
            if entry.size == size && entry.hash == hash {
                // Hinted write did not touch this texture after all
                entry.status = TextureStatus::Valid;
                self.stats.rehashes += 1;
                return false;
            }
        }

        self.entries.insert(
            address,
            TextureEntry {
                address,
                size,
                hash,
                status: TextureStatus::Valid,
            },
        );
        self.stats.loads += 1;
        true
    }

    /// Invalidate textures overlapping a range
    pub fn invalidate(&mut self, address: u32, size: u32, kind: InvalidationKind) {
        let address = address & 0x3FFF_FFFF;
        match kind {
            InvalidationKind::Hint => {
                for entry in self.entries.values_mut() {
                    if entry.overlaps(address, size) {
                        entry.status = TextureStatus::Suspect;
                    }
                }
            }
            InvalidationKind::Safe => {
                self.entries.retain(|_, entry| !entry.overlaps(address, size));
            }
            InvalidationKind::All => self.entries.clear(),
        }
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, address: u32) -> Option<&TextureEntry> {
        self.entries.get(&(address & 0x3FFF_FFFF))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> TextureCacheStats {
        self.stats
    }
}

/// Last palette loaded by LOADCLUT
#[derive(Debug, Default)]
pub struct PaletteCache {
    /// `(address, bytes, hash)` of the resident palette
    current: Option<(u32, u32, u64)>,
    invalidations: u64,
}

impl PaletteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `bytes` of palette data from `address`
    ///
    /// # Returns
    ///
    /// `true` if the palette changed and dependent state must be rebuilt.
    /// Reloading identical content from the same address returns `false`.
    pub fn load(&mut self, mem: &GuestMemory, address: u32, bytes: u32) -> bool {
        let hash = match mem.slice(address, bytes) {
            Ok(data) => content_hash(data),
            Err(_) => {
                log::warn!(
                    "Palette load of {} bytes from invalid address 0x{:08X}",
                    bytes,
                    address
                );
                // Treated as an all-ones palette
                u64::MAX
            }
        };

        let key = (address, bytes, hash);
        if self.current == Some(key) {
            return false;
        }
        self.current = Some(key);
        self.invalidations += 1;
        true
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// `(address, bytes)` of the resident palette
    pub fn resident(&self) -> Option<(u32, u32)> {
        self.current.map(|(address, bytes, _)| (address, bytes))
    }

    /// Number of times the palette was (re)loaded
    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }
}

/// A render target tracked by the framebuffer cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedFramebuffer {
    pub target: RenderTarget,
    /// Drawn into since the display last looked at it
    pub dirty_after_display: bool,
    /// Guest memory changed underneath; contents must be re-uploaded
    pub needs_upload: bool,
}

/// Render targets known to the core
#[derive(Debug, Default)]
pub struct FramebufferCache {
    targets: Vec<TrackedFramebuffer>,
    current: Option<usize>,
    copy_discards: u64,
}

impl FramebufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` the current render target, tracking it if new
    pub fn bind(&mut self, target: RenderTarget) {
        let index = match self
            .targets
            .iter()
            .position(|t| t.target.address == target.address)
        {
            Some(index) => {
                self.targets[index].target = target;
                index
            }
            None => {
                log::debug!(
                    "Tracking render target 0x{:08X} ({}x{}, stride {})",
                    target.address,
                    target.width,
                    target.height,
                    target.stride
                );
                self.targets.push(TrackedFramebuffer {
                    target,
                    dirty_after_display: false,
                    needs_upload: false,
                });
                self.targets.len() - 1
            }
        };
        self.current = Some(index);
    }

    /// Record a draw into the current target
    pub fn mark_drawn(&mut self) {
        if let Some(tracked) = self.current.and_then(|i| self.targets.get_mut(i)) {
            tracked.dirty_after_display = true;
            tracked.needs_upload = false;
        }
    }

    /// Whether any tracked target overlaps the range
    pub fn intersects(&self, address: u32, size: u32) -> bool {
        self.targets
            .iter()
            .any(|t| t.target.intersects(address, size))
    }

    /// Hinted write: flag overlapping targets for upload
    ///
    /// # Returns
    ///
    /// Number of targets affected
    pub fn notify_memory(&mut self, address: u32, size: u32) -> usize {
        let mut hits = 0;
        for tracked in &mut self.targets {
            if tracked.target.intersects(address, size) {
                tracked.needs_upload = true;
                hits += 1;
            }
        }
        hits
    }

    /// Precise recheck after an ambiguous write
    pub fn update_from_memory(&mut self, address: u32, size: u32) -> usize {
        let hits = self.notify_memory(address, size);
        if hits > 0 {
            log::debug!(
                "Framebuffer update from memory: {} target(s) at 0x{:08X}+{}",
                hits,
                address,
                size
            );
        }
        hits
    }

    /// Drop any cached copy of the current framebuffer used as a texture
    pub fn discard_copy(&mut self) {
        self.copy_discards += 1;
    }

    pub fn copy_discards(&self) -> u64 {
        self.copy_discards
    }

    /// Whether the current target was drawn since the last query
    ///
    /// Clears the flag. Reports `true` when no target is known.
    pub fn take_dirty(&mut self) -> bool {
        match self.current.and_then(|i| self.targets.get_mut(i)) {
            Some(tracked) => std::mem::replace(&mut tracked.dirty_after_display, false),
            None => true,
        }
    }

    pub fn invalidate_all(&mut self) {
        self.targets.clear();
        self.current = None;
    }

    pub fn current(&self) -> Option<&TrackedFramebuffer> {
        self.current.and_then(|i| self.targets.get(i))
    }

    pub fn targets(&self) -> &[TrackedFramebuffer] {
        &self.targets
    }
}

/// Counts of invalidations by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationStats {
    pub hint: u64,
    pub safe: u64,
    pub all: u64,
    pub framebuffer_notifications: u64,
}

/// Owns the caches and routes invalidations to them
#[derive(Debug, Default)]
pub struct CacheCoordinator {
    pub textures: TextureCache,
    pub palette: PaletteCache,
    pub framebuffers: FramebufferCache,
    stats: InvalidationStats,
}

impl CacheCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate caches over `[address, address + size)`
    ///
    /// A `size` of zero invalidates the whole texture cache.
    ///
    /// # Examples
    ///
    /// ```
    /// use gerx::core::ge::{CacheCoordinator, InvalidationKind};
    ///
    /// let mut caches = CacheCoordinator::new();
    /// caches.invalidate(0x0880_0000, 0x100, InvalidationKind::Hint);
    /// assert_eq!(caches.stats().hint, 1);
    /// ```
    pub fn invalidate(&mut self, address: u32, size: u32, kind: InvalidationKind) {
        log::debug!(
            "Invalidate {:?}: 0x{:08X}+0x{:X}",
            kind,
            address,
            size
        );

        match kind {
            InvalidationKind::Hint => self.stats.hint += 1,
            InvalidationKind::Safe => self.stats.safe += 1,
            InvalidationKind::All => self.stats.all += 1,
        }

        if kind == InvalidationKind::All || size == 0 {
            self.textures.invalidate_all();
        } else {
            self.textures.invalidate(address, size, kind);
        }

        match kind {
            InvalidationKind::Hint => {
                if self.framebuffers.intersects(address, size) {
                    self.stats.framebuffer_notifications += 1;
                    self.framebuffers.notify_memory(address, size);
                }
            }
            InvalidationKind::Safe => {
                self.stats.framebuffer_notifications += 1;
                self.framebuffers.update_from_memory(address, size);
            }
            InvalidationKind::All => {
                self.palette.invalidate();
                self.framebuffers.invalidate_all();
            }
        }
    }

    pub fn stats(&self) -> InvalidationStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ge::types::PixelFormat;

    const TEX: u32 = 0x0880_0000;

    fn target() -> RenderTarget {
        RenderTarget {
            address: 0x0400_0000,
            stride: 512,
            format: PixelFormat::Rgba8888,
            width: 480,
            height: 272,
        }
    }

    #[test]
    fn test_texture_reused_until_invalidated() {
        let mem = GuestMemory::new();
        let mut cache = TextureCache::new();

        assert!(cache.use_texture(&mem, TEX, 0x100));
        assert!(!cache.use_texture(&mem, TEX, 0x100));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_hint_rehashes_unchanged_texture() {
        let mem = GuestMemory::new();
        let mut cache = TextureCache::new();
        cache.use_texture(&mem, TEX, 0x100);

        cache.invalidate(TEX + 0x10, 4, InvalidationKind::Hint);
        assert_eq!(cache.get(TEX).unwrap().status, TextureStatus::Suspect);

        // Content did not change, so no reload
        assert!(!cache.use_texture(&mem, TEX, 0x100));
        assert_eq!(cache.stats().rehashes, 1);
    }

    #[test]
    fn test_hint_reloads_changed_texture() {
        let mut mem = GuestMemory::new();
        let mut cache = TextureCache::new();
        cache.use_texture(&mem, TEX, 0x100);

        mem.write_u32(TEX + 0x10, 0xDEAD_BEEF).unwrap();
        cache.invalidate(TEX + 0x10, 4, InvalidationKind::Hint);

        assert!(cache.use_texture(&mem, TEX, 0x100));
        assert_eq!(cache.stats().loads, 2);
    }

    #[test]
    fn test_safe_drops_overlapping_only() {
        let mem = GuestMemory::new();
        let mut cache = TextureCache::new();
        cache.use_texture(&mem, TEX, 0x100);
        cache.use_texture(&mem, TEX + 0x1000, 0x100);

        cache.invalidate(TEX, 0x10, InvalidationKind::Safe);

        assert!(cache.get(TEX).is_none());
        assert!(cache.get(TEX + 0x1000).is_some());
    }

    #[test]
    fn test_palette_identical_reload_skipped() {
        let mut mem = GuestMemory::new();
        mem.write_u32(TEX, 0x1234_5678).unwrap();
        let mut palette = PaletteCache::new();

        assert!(palette.load(&mem, TEX, 64));
        assert!(!palette.load(&mem, TEX, 64));
        assert_eq!(palette.invalidations(), 1);

        mem.write_u32(TEX, 0).unwrap();
        assert!(palette.load(&mem, TEX, 64));
        assert_eq!(palette.invalidations(), 2);
    }

    #[test]
    fn test_hint_skips_framebuffer_without_overlap() {
        let mut caches = CacheCoordinator::new();
        caches.framebuffers.bind(target());

        caches.invalidate(TEX, 0x100, InvalidationKind::Hint);
        assert_eq!(caches.stats().framebuffer_notifications, 0);

        caches.invalidate(0x0400_1000, 0x100, InvalidationKind::Hint);
        assert_eq!(caches.stats().framebuffer_notifications, 1);
        assert!(caches.framebuffers.current().unwrap().needs_upload);
    }

    #[test]
    fn test_safe_always_checks_framebuffers() {
        let mut caches = CacheCoordinator::new();

        caches.invalidate(TEX, 0x100, InvalidationKind::Safe);

        assert_eq!(caches.stats().safe, 1);
        assert_eq!(caches.stats().framebuffer_notifications, 1);
    }

    #[test]
    fn test_all_clears_everything() {
        let mem = GuestMemory::new();
        let mut caches = CacheCoordinator::new();
        caches.textures.use_texture(&mem, TEX, 0x100);
        caches.palette.load(&mem, TEX, 32);
        caches.framebuffers.bind(target());

        caches.invalidate(0, 0, InvalidationKind::All);

        assert!(caches.textures.is_empty());
        assert!(caches.palette.resident().is_none());
        assert!(caches.framebuffers.targets().is_empty());
    }

    #[test]
    fn test_framebuffer_dirty_flag_is_consumed() {
        let mut cache = FramebufferCache::new();
        assert!(cache.take_dirty());

        cache.bind(target());
        assert!(!cache.take_dirty());

        cache.mark_drawn();
        assert!(cache.take_dirty());
        assert!(!cache.take_dirty());
    }
}
