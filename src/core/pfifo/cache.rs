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

//! CACHE0 and CACHE1 state
//!
//! Both caches hold `{method, subchannel, data}` entries between the pusher
//! (CPU writes or the DMA pusher) and the puller (PGRAPH).
//!
//! ```text
//!            push                         pull
//!  USER ──────────► [ ring of N entries ] ──────────► RAMHT ─► PGRAPH
//!  DMA pusher ─────►   put           get
//! ```
//!
//! CACHE0 has a single slot that the driver fills by hand to inject
//! notifies. CACHE1 is a ring of 32 (rev A/B) or 64 (rev C) entries; one
//! slot is always left free so that `put == get` means empty.

use super::gray::{gray_to_normal, normal_to_gray};
use serde::{Deserialize, Serialize};

/// One queued method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Method offset within the subchannel (dword aligned, 0..0x1FFC)
    pub method: u16,
    pub subchannel: u8,
    pub data: u32,
}

impl CacheEntry {
    pub fn new(method: u32, subchannel: u8, data: u32) -> Self {
        Self {
            method: (method & 0x1FFC) as u16,
            subchannel: subchannel & 7,
            data,
        }
    }

    /// Decode the `method | subchannel << 13` register form
    pub fn from_method_word(word: u32, data: u32) -> Self {
        Self::new(word, ((word >> 13) & 7) as u8, data)
    }

    /// `method | subchannel << 13`, as seen in the cache registers
    pub fn method_word(&self) -> u32 {
        self.method as u32 | ((self.subchannel as u32) << 13)
    }
}

/// `CACHEn_PULL0` / `CACHEn_PULL1` state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullControl {
    pub pull0: u32,
    pub pull1: u32,
}

impl PullControl {
    pub const ENABLED: u32 = 1 << 0;
    pub const HASH_FAILURE: u32 = 1 << 4;
    pub const SOFTWARE_METHOD: u32 = 1 << 8;

    /// PULL1: context changed since the driver last looked
    pub const CTX_DIRTY: u32 = 1 << 4;

    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.pull0 & Self::ENABLED != 0
    }

    /// Stop pulling and latch the reason
    pub fn fault(&mut self, reason: u32) {
        self.pull0 = (self.pull0 | reason) & !Self::ENABLED;
    }

    /// Register write: enable bit only, status bits are cleared
    pub fn write_pull0(&mut self, value: u32) {
        self.pull0 = value & Self::ENABLED;
    }
}

/// `CACHEn_STATUS` bits
pub mod status {
    /// Cache is empty (low water mark)
    pub const EMPTY: u32 = 1 << 4;
    /// Cache is full (high water mark)
    pub const FULL: u32 = 1 << 8;
}

/// Single-entry software injection cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cache0 {
    pub push0: u32,
    pub chid: u8,
    /// 0 or 4
    pub put: u32,
    /// 0 or 4
    pub get: u32,
    pub pull: PullControl,
    pub ctx: u32,
    pub entry: CacheEntry,
}

impl Cache0 {
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.put == self.get
    }

    pub fn status(&self) -> u32 {
        if self.is_empty() {
            status::EMPTY
        } else {
            status::FULL
        }
    }

    pub fn push_enabled(&self) -> bool {
        self.push0 & 1 != 0
    }

    /// Consume the slot
    pub fn advance_get(&mut self) {
        self.get ^= 4;
    }
}

/// The main command cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cache1 {
    /// Ring size in entries (power of two)
    size: u32,
    pub push0: u32,
    pub chid: u8,
    /// Plain ring index
    put: u32,
    /// Plain ring index
    get: u32,
    pub pull: PullControl,
    /// Cached object context per subchannel
    pub ctx: [u32; 8],
    entries: Vec<CacheEntry>,

    /// DMA0..3: length, address, control, target node
    pub dma: [u32; 4],
    pub dma_status: u32,
    pub tlb_pt_base: u32,
    pub tlb_pte: u32,
    pub tlb_tag: u32,
}

impl Cache1 {
    /// TLB tag value meaning "no translation cached"
    pub const TLB_TAG_INVALID: u32 = 0xFFFF_FFFF;

    /// Page table base bits kept: a dword offset inside the 4MB RAMIN window
    pub const TLB_PT_BASE_MASK: u32 = 0x003F_FFFC;

    pub fn new(size: u32) -> Self {
        Self {
            size,
            push0: 0,
            chid: 0,
            put: 0,
            get: 0,
            pull: PullControl::default(),
            ctx: [0; 8],
            entries: vec![CacheEntry::default(); size as usize],
            dma: [0; 4],
            dma_status: 0,
            tlb_pt_base: 0,
            tlb_pte: 0,
            tlb_tag: Self::TLB_TAG_INVALID,
        }
    }

    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline(always)]
    fn mask(&self) -> u32 {
        self.size - 1
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.put == self.get
    }

    /// Number of entries queued
    pub fn len(&self) -> u32 {
        self.put.wrapping_sub(self.get) & self.mask()
    }

    /// Free space in bytes, as reported through the USER aperture
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::pfifo::Cache1;
    ///
    /// let cache = Cache1::new(32);
    /// // One slot is always kept free
    /// assert_eq!(cache.free_count(), 31 << 2);
    /// ```
    pub fn free_count(&self) -> u32 {
        ((self.mask() + self.get).wrapping_sub(self.put) & self.mask()) << 2
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    pub fn status(&self) -> u32 {
        let mut value = 0;
        if self.is_empty() {
            value |= status::EMPTY;
        }
        if self.is_full() {
            value |= status::FULL;
        }
        value
    }

    pub fn push_enabled(&self) -> bool {
        self.push0 & 1 != 0
    }

    /// Append an entry
    ///
    /// # Returns
    ///
    /// `false` if the cache was full; nothing is overwritten.
    pub fn push(&mut self, entry: CacheEntry) -> bool {
        if self.is_full() {
            return false;
        }
        let slot = self.put as usize;
        self.entries[slot] = entry;
        self.put = (self.put + 1) & self.mask();
        true
    }

    /// Oldest queued entry
    pub fn front(&self) -> Option<CacheEntry> {
        if self.is_empty() {
            None
        } else {
            Some(self.entries[self.get as usize])
        }
    }

    pub fn advance_get(&mut self) {
        if !self.is_empty() {
            self.get = (self.get + 1) & self.mask();
        }
    }

    /// `CACHE1_PUT` register value
    pub fn put_register(&self) -> u32 {
        normal_to_gray(self.put) << 2
    }

    pub fn set_put_register(&mut self, value: u32) {
        self.put = gray_to_normal((value >> 2) & self.mask()) & self.mask();
    }

    /// `CACHE1_GET` register value
    pub fn get_register(&self) -> u32 {
        normal_to_gray(self.get) << 2
    }

    pub fn set_get_register(&mut self, value: u32) {
        self.get = gray_to_normal((value >> 2) & self.mask()) & self.mask();
    }

    /// Raw slot access for the 0x3300 register window
    pub fn slot(&self, index: u32) -> CacheEntry {
        self.entries[(index & self.mask()) as usize]
    }

    pub fn slot_mut(&mut self, index: u32) -> &mut CacheEntry {
        let mask = self.mask();
        &mut self.entries[(index & mask) as usize]
    }

    pub fn dma_running(&self) -> bool {
        self.dma_status & 1 != 0
    }

    pub fn invalidate_tlb(&mut self) {
        self.tlb_tag = Self::TLB_TAG_INVALID;
    }

    /// Point the DMA TLB at a new page table and drop the cached translation
    pub fn set_tlb_pt_base(&mut self, value: u32) {
        self.tlb_pt_base = value & Self::TLB_PT_BASE_MASK;
        self.invalidate_tlb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Entries
    // ============================================================================

    #[test]
    fn test_method_word() {
        let entry = CacheEntry::from_method_word(0x0000_6304 | 0xFFFF_0000, 7);
        assert_eq!(entry.subchannel, 3);
        assert_eq!(entry.method, 0x304);
        assert_eq!(entry.method_word(), 0x6304);
    }

    // ============================================================================
    // CACHE1 ring
    // ============================================================================

    #[test]
    fn test_fifo_order() {
        let mut cache = Cache1::new(32);
        for i in 0..10 {
            assert!(cache.push(CacheEntry::new(0x300, 0, i)));
        }
        assert_eq!(cache.len(), 10);
        for i in 0..10 {
            assert_eq!(cache.front().unwrap().data, i);
            cache.advance_get();
        }
        assert!(cache.is_empty());
        assert!(cache.front().is_none());
    }

    #[test]
    fn test_capacity_boundary() {
        for size in [32u32, 64] {
            let mut cache = Cache1::new(size);
            for i in 0..size - 1 {
                assert!(cache.push(CacheEntry::new(0x300, 0, i)));
            }
            assert!(cache.is_full());
            assert_eq!(cache.free_count(), 0);
            assert_ne!(cache.status() & status::FULL, 0);

            // The extra entry is refused and nothing is overwritten
            assert!(!cache.push(CacheEntry::new(0x300, 0, 0xDEAD)));
            assert_eq!(cache.front().unwrap().data, 0);
            assert_eq!(cache.len(), size - 1);
        }
    }

    #[test]
    fn test_free_count_wraps() {
        let mut cache = Cache1::new(32);
        for _ in 0..20 {
            cache.push(CacheEntry::default());
            cache.advance_get();
        }
        assert_eq!(cache.free_count(), 31 << 2);
        cache.push(CacheEntry::default());
        assert_eq!(cache.free_count(), 30 << 2);
    }

    #[test]
    fn test_put_get_registers_are_gray() {
        let mut cache = Cache1::new(64);
        for _ in 0..5 {
            cache.push(CacheEntry::default());
        }
        assert_eq!(cache.put_register(), 0b111 << 2);

        cache.set_get_register(0b111 << 2);
        assert!(cache.is_empty());

        cache.set_put_register(normal_to_gray(40) << 2);
        assert_eq!(cache.len(), 35);
    }

    #[test]
    fn test_status_bits() {
        let mut cache = Cache1::new(32);
        assert_eq!(cache.status(), status::EMPTY);
        cache.push(CacheEntry::default());
        assert_eq!(cache.status(), 0);
    }

    // ============================================================================
    // CACHE0 and pull control
    // ============================================================================

    #[test]
    fn test_cache0_toggle() {
        let mut cache = Cache0::default();
        assert!(cache.is_empty());
        cache.put = 4;
        assert!(!cache.is_empty());
        assert_eq!(cache.status(), status::FULL);
        cache.advance_get();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_pull_fault_disables() {
        let mut pull = PullControl::default();
        pull.write_pull0(0xFFFF_FFFF);
        assert!(pull.enabled());
        assert_eq!(pull.pull0, 1);

        pull.fault(PullControl::HASH_FAILURE);
        assert!(!pull.enabled());
        assert_eq!(pull.pull0, PullControl::HASH_FAILURE);

        pull.write_pull0(1);
        assert_eq!(pull.pull0, PullControl::ENABLED);
    }
}
