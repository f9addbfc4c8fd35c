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

//! RAMRO: runout log of rejected submissions
//!
//! Each entry is two dwords:
//!
//! ```text
//! word 0:  31..28 reason | 23 write | 22..2 USER aperture offset
//! word 1:  data that was written
//! ```
//!
//! The log is a ring indexed by `PFIFO_RUNOUT_PUT` / `PFIFO_RUNOUT_GET`.

use crate::core::memory::Vram;
use serde::{Deserialize, Serialize};

/// Why a submission was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunoutReason {
    IllegalAccess = 0,
    NoCacheAvailable = 1,
    CacheRanOut = 2,
    FreeCountOverrun = 3,
    CaughtLying = 4,
    ReservedAccess = 5,
}

impl RunoutReason {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(RunoutReason::IllegalAccess),
            1 => Some(RunoutReason::NoCacheAvailable),
            2 => Some(RunoutReason::CacheRanOut),
            3 => Some(RunoutReason::FreeCountOverrun),
            4 => Some(RunoutReason::CaughtLying),
            5 => Some(RunoutReason::ReservedAccess),
            _ => None,
        }
    }
}

/// One decoded RAMRO entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunoutEntry {
    /// Offset inside the USER aperture (channel, subchannel and method)
    pub address: u32,
    pub is_write: bool,
    /// Raw 4-bit reason field
    pub reason: u8,
    pub data: u32,
}

impl RunoutEntry {
    const WRITE: u32 = 1 << 23;

    pub fn new(address: u32, reason: RunoutReason, data: u32) -> Self {
        Self {
            address: address & 0x7F_FFFC,
            is_write: true,
            reason: reason as u8,
            data,
        }
    }

    /// Pack the first dword
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::ramin::{RunoutEntry, RunoutReason};
    ///
    /// let entry = RunoutEntry::new(0x82_2300, RunoutReason::FreeCountOverrun, 0xABCD);
    /// assert_eq!(entry.encode(), 0x3082_2300);
    /// ```
    pub fn encode(&self) -> u32 {
        let mut word = self.address & 0x7F_FFFC;
        if self.is_write {
            word |= Self::WRITE;
        }
        word | ((self.reason as u32 & 0xF) << 28)
    }

    pub fn decode(word: u32, data: u32) -> Self {
        Self {
            address: word & 0x7F_FFFC,
            is_write: word & Self::WRITE != 0,
            reason: ((word >> 28) & 0xF) as u8,
            data,
        }
    }

    pub fn reason_kind(&self) -> Option<RunoutReason> {
        RunoutReason::from_bits(self.reason as u32)
    }

    pub fn channel(&self) -> u8 {
        ((self.address >> 16) & 0x7F) as u8
    }

    pub fn subchannel(&self) -> u8 {
        ((self.address >> 13) & 7) as u8
    }

    pub fn method(&self) -> u32 {
        self.address & 0x1FFC
    }
}

/// Decoded `PFIFO_RAMRO` register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamroConfig {
    pub base: u32,
    /// 512 or 8192 bytes
    pub size: u32,
}

impl Default for RamroConfig {
    fn default() -> Self {
        Self {
            base: super::RAMRO_DEFAULT_BASE,
            size: 512,
        }
    }
}

impl RamroConfig {
    const SIZE_8K: u32 = 1 << 16;

    pub fn from_register(value: u32) -> Self {
        Self {
            base: value & 0xFE00,
            size: if value & Self::SIZE_8K != 0 { 8192 } else { 512 },
        }
    }

    pub fn to_register(&self) -> u32 {
        self.base | if self.size == 8192 { Self::SIZE_8K } else { 0 }
    }

    /// Mask applied to the put/get pointers
    pub fn pointer_mask(&self) -> u32 {
        if self.size == 8192 {
            0x1FF8
        } else {
            0x1F8
        }
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset < self.base + self.size
    }

    pub fn write_entry(&self, vram: &mut Vram, put: u32, entry: &RunoutEntry) {
        let offset = self.base + (put & self.pointer_mask());
        vram.ramin_write32(offset, entry.encode());
        vram.ramin_write32(offset + 4, entry.data);
    }

    pub fn read_entry(&self, vram: &Vram, pointer: u32) -> RunoutEntry {
        let offset = self.base + (pointer & self.pointer_mask());
        RunoutEntry::decode(vram.ramin_read32(offset), vram.ramin_read32(offset + 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_encode_decode() {
        let entry = RunoutEntry::new(0x0002_0104, RunoutReason::ReservedAccess, 0x1234);
        let word = entry.encode();
        assert_eq!(word, 0x5082_0104);

        let decoded = RunoutEntry::decode(word, 0x1234);
        assert_eq!(decoded, entry);
        assert_eq!(decoded.reason_kind(), Some(RunoutReason::ReservedAccess));
        assert_eq!(decoded.channel(), 2);
        assert_eq!(decoded.subchannel(), 0);
        assert_eq!(decoded.method(), 0x104);
    }

    #[test]
    fn test_unknown_reason() {
        let entry = RunoutEntry::decode(0xF000_0000, 0);
        assert_eq!(entry.reason, 0xF);
        assert_eq!(entry.reason_kind(), None);
        assert!(!entry.is_write);
    }

    #[test]
    fn test_config_sizes() {
        let small = RamroConfig::from_register(0x1E00);
        assert_eq!(small.size, 512);
        assert_eq!(small.pointer_mask(), 0x1F8);

        let large = RamroConfig::from_register(0x0001_1E00);
        assert_eq!(large.size, 8192);
        assert_eq!(large.pointer_mask(), 0x1FF8);
        assert_eq!(large.to_register(), 0x0001_1E00);
    }

    #[test]
    fn test_write_read_entry() {
        let mut vram = Vram::new(2 * 1024 * 1024);
        let cfg = RamroConfig::default();
        let entry = RunoutEntry::new(0x0003_2400, RunoutReason::CacheRanOut, 0xFEED);

        cfg.write_entry(&mut vram, 0x10, &entry);
        assert_eq!(cfg.read_entry(&vram, 0x10), entry);
        assert_eq!(vram.ramin_read32(0x1E10), entry.encode());
        assert_eq!(vram.ramin_read32(0x1E14), 0xFEED);
    }
}
