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

//! RAMHT: object name hash table
//!
//! RAMHT maps a 32-bit object name submitted on a channel to a
//! [`RaminContext`]. It lives in RAMIN and is configured through
//! `PFIFO_RAMHT` (0x002210):
//!
//! ```text
//! 17..16  size: 0=4KB 1=8KB 2=16KB 3=32KB
//! 15..12  base address in RAMIN (4KB aligned)
//! ```
//!
//! Each entry is 8 bytes: `{ name: u32, context: u32 }`. A slot whose
//! context is zero is free.
//!
//! ## Hash
//!
//! The name is folded into `bits = log2(entries)` bit chunks with xor, then
//! the channel is mixed in at bit `bits - 4`:
//!
//! ```text
//! hash = 0
//! while name != 0 { hash ^= name & mask; name >>= bits }
//! hash ^= channel << (bits - 4)
//! ```
//!
//! Collisions are resolved by linear probing, wrapping at the table end. A
//! lookup stops at the first free slot or after visiting every slot.

use super::context::RaminContext;
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::Vram;
use serde::{Deserialize, Serialize};

/// Size of one RAMHT entry in bytes
pub const RAMHT_ENTRY_SIZE: u32 = 8;

/// Table size selector from `PFIFO_RAMHT` bits 17..16
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RamhtSize {
    #[default]
    Size4K = 0,
    Size8K = 1,
    Size16K = 2,
    Size32K = 3,
}

impl RamhtSize {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => RamhtSize::Size4K,
            1 => RamhtSize::Size8K,
            2 => RamhtSize::Size16K,
            _ => RamhtSize::Size32K,
        }
    }

    /// Table size in bytes
    #[inline(always)]
    pub fn bytes(self) -> u32 {
        4096 << (self as u32)
    }

    #[inline(always)]
    pub fn entries(self) -> u32 {
        self.bytes() / RAMHT_ENTRY_SIZE
    }

    /// Width of a hash value in bits
    #[inline(always)]
    pub fn hash_bits(self) -> u32 {
        self.entries().trailing_zeros()
    }
}

/// Decoded `PFIFO_RAMHT` register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamhtConfig {
    /// Byte offset of the table inside RAMIN
    pub base: u32,
    pub size: RamhtSize,
}

impl RamhtConfig {
    /// Decode the register value
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::ramin::{RamhtConfig, RamhtSize};
    ///
    /// let cfg = RamhtConfig::from_register(0x0002_3000);
    /// assert_eq!(cfg.base, 0x3000);
    /// assert_eq!(cfg.size, RamhtSize::Size16K);
    /// assert_eq!(cfg.to_register(), 0x0002_3000);
    /// ```
    pub fn from_register(value: u32) -> Self {
        Self {
            base: value & 0xF000,
            size: RamhtSize::from_bits(value >> 16),
        }
    }

    pub fn to_register(&self) -> u32 {
        self.base | ((self.size as u32) << 16)
    }

    /// RAMIN offset of a slot
    #[inline(always)]
    pub fn slot_offset(&self, slot: u32) -> u32 {
        self.base + (slot & (self.size.entries() - 1)) * RAMHT_ENTRY_SIZE
    }

    /// Check whether a RAMIN offset falls inside the table
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset < self.base + self.size.bytes()
    }
}

/// Hash an object name and channel to a slot index
///
/// # Example
///
/// ```
/// use nv3rx::core::ramin::{ramht_hash, RamhtSize};
///
/// // 4KB table: 512 entries, 9-bit hash
/// assert_eq!(ramht_hash(0x0000_1234, 0, RamhtSize::Size4K), 0x1234 & 0x1FF ^ (0x1234 >> 9));
/// assert_eq!(ramht_hash(0x0000_1234, 2, RamhtSize::Size4K), 0x07D);
/// ```
pub fn ramht_hash(name: u32, channel: u8, size: RamhtSize) -> u32 {
    let bits = size.hash_bits();
    let mask = (1u32 << bits) - 1;

    let mut hash = 0u32;
    let mut folded = name;
    while folded != 0 {
        hash ^= folded & mask;
        folded >>= bits;
    }

    hash ^= ((channel & 0x7F) as u32) << (bits - 4);
    hash & mask
}

/// A populated RAMHT slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamhtEntry {
    pub slot: u32,
    pub name: u32,
    pub context: RaminContext,
}

/// Read-only view of the RAMHT region
pub struct Ramht<'a> {
    vram: &'a Vram,
    config: RamhtConfig,
}

impl<'a> Ramht<'a> {
    pub fn new(vram: &'a Vram, config: RamhtConfig) -> Self {
        Self { vram, config }
    }

    /// Read the raw `(name, context)` pair of a slot
    pub fn read_slot(&self, slot: u32) -> (u32, RaminContext) {
        let offset = self.config.slot_offset(slot);
        (
            self.vram.ramin_read32(offset),
            RaminContext(self.vram.ramin_read32(offset + 4)),
        )
    }

    /// Look up an object name on a channel
    ///
    /// Walks slots from `hash(name, channel)` until the name is found, a free slot
    /// is hit, or every slot has been visited.
    pub fn find(&self, name: u32, channel: u8) -> Option<RamhtEntry> {
        let entries = self.config.size.entries();
        let start = ramht_hash(name, channel, self.config.size);

        for step in 0..entries {
            let slot = (start + step) & (entries - 1);
            let (slot_name, context) = self.read_slot(slot);

            if context.is_empty() {
                return None;
            }
            if slot_name == name && context.channel() == channel {
                return Some(RamhtEntry {
                    slot,
                    name,
                    context,
                });
            }
        }

        None
    }

    /// Number of populated slots
    pub fn occupancy(&self) -> u32 {
        (0..self.config.size.entries())
            .filter(|&slot| !self.read_slot(slot).1.is_empty())
            .count() as u32
    }
}

/// Mutable view of the RAMHT region (driver-side table maintenance)
pub struct RamhtMut<'a> {
    vram: &'a mut Vram,
    config: RamhtConfig,
}

impl<'a> RamhtMut<'a> {
    pub fn new(vram: &'a mut Vram, config: RamhtConfig) -> Self {
        Self { vram, config }
    }

    fn view(&self) -> Ramht<'_> {
        Ramht::new(self.vram, self.config)
    }

    fn write_slot(&mut self, slot: u32, name: u32, context: RaminContext) {
        let offset = self.config.slot_offset(slot);
        self.vram.ramin_write32(offset, name);
        self.vram.ramin_write32(offset + 4, context.raw());
    }

    /// Insert or replace an object binding
    ///
    /// The channel recorded in `context` must match `channel`; it is
    /// overwritten if it does not.
    ///
    /// # Returns
    ///
    /// The slot the entry was written to.
    ///
    /// # Errors
    ///
    /// `EmulatorError::RamhtFull` if the walk visited every slot without
    /// finding a free one or the same name. No existing entry is touched.
    pub fn insert(&mut self, name: u32, channel: u8, context: RaminContext) -> Result<u32> {
        let context = RaminContext((context.raw() & !(0x7F << 24)) | ((channel as u32 & 0x7F) << 24));
        let entries = self.config.size.entries();
        let start = ramht_hash(name, channel, self.config.size);

        for step in 0..entries {
            let slot = (start + step) & (entries - 1);
            let (slot_name, slot_context) = self.view().read_slot(slot);

            let free = slot_context.is_empty();
            let same = slot_name == name && slot_context.channel() == channel;
            if free || same {
                self.write_slot(slot, name, context);
                log::debug!(
                    "RAMHT insert name=0x{:08X} ch={} ctx=0x{:08X} slot={}",
                    name,
                    channel,
                    context.raw(),
                    slot
                );
                return Ok(slot);
            }
        }

        log::warn!(
            "RAMHT full, rejected name=0x{:08X} ch={}",
            name,
            channel
        );
        Err(EmulatorError::RamhtFull { name, channel })
    }

    /// Remove an object binding
    ///
    /// The rest of the collision cluster is reinserted so later entries stay
    /// reachable.
    ///
    /// # Returns
    ///
    /// `true` if the name was bound on the channel
    pub fn remove(&mut self, name: u32, channel: u8) -> bool {
        let Some(entry) = self.view().find(name, channel) else {
            return false;
        };

        let entries = self.config.size.entries();
        self.write_slot(entry.slot, 0, RaminContext(0));

        let mut slot = (entry.slot + 1) & (entries - 1);
        while slot != entry.slot {
            let (moved_name, moved_context) = self.view().read_slot(slot);
            if moved_context.is_empty() {
                break;
            }
            self.write_slot(slot, 0, RaminContext(0));
            // A slot on this cluster was just freed
            let reinserted = self.insert(moved_name, moved_context.channel(), moved_context);
            debug_assert!(reinserted.is_ok(), "RAMHT: 0x{:08X} lost on reinsert", moved_name);
            if let Err(err) = reinserted {
                log::error!("RAMHT: dropped 0x{:08X} while compacting: {}", moved_name, err);
            }
            slot = (slot + 1) & (entries - 1);
        }

        true
    }

    /// Zero every slot
    pub fn clear(&mut self) {
        for slot in 0..self.config.size.entries() {
            self.write_slot(slot, 0, RaminContext(0));
        }
    }
}
