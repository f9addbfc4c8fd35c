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

//! RAMHT context descriptor
//!
//! ```text
//! 31    30..24    23         22..16     15..0
//! ┌────┬─────────┬──────────┬──────────┬──────────────┐
//! │ rsv│ channel │ hardware │ class id │ ramin offset │
//! └────┴─────────┴──────────┴──────────┴──────────────┘
//! ```
//!
//! The class id is 7 bits wide here but PGRAPH only decodes the low 5, so
//! e.g. 0x47 and 0x07 both select the rectangle class.

use serde::{Deserialize, Serialize};

/// Packed context word stored in the second dword of a RAMHT entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaminContext(pub u32);

impl RaminContext {
    /// Set when the object is executed by PGRAPH; clear for software objects
    pub const HARDWARE: u32 = 1 << 23;

    /// Mask of the part of the context that the FIFO caches keep
    pub const CACHED_MASK: u32 = 0x00FF_FFFF;

    /// Build a context word from its fields
    ///
    /// # Arguments
    ///
    /// * `ramin_offset` - Instance address in 16-byte units
    /// * `class_id` - 7-bit class id
    /// * `hardware` - `true` for PGRAPH objects, `false` for software objects
    /// * `channel` - Owning FIFO channel
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::ramin::RaminContext;
    ///
    /// let ctx = RaminContext::new(0x1234, 0x47, true, 2);
    /// assert_eq!(ctx.raw(), 0x02C7_1234);
    /// assert_eq!(ctx.class_id(), 0x47);
    /// assert_eq!(ctx.pgraph_class(), 0x07);
    /// ```
    pub fn new(ramin_offset: u16, class_id: u8, hardware: bool, channel: u8) -> Self {
        let mut value = ramin_offset as u32;
        value |= ((class_id & 0x7F) as u32) << 16;
        if hardware {
            value |= Self::HARDWARE;
        }
        value |= ((channel & 0x7F) as u32) << 24;
        Self(value)
    }

    #[inline(always)]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Instance address of the object in 16-byte units
    #[inline(always)]
    pub fn ramin_offset(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Byte offset of the object instance inside RAMIN
    #[inline(always)]
    pub fn instance_address(self) -> u32 {
        (self.ramin_offset() as u32) << 4
    }

    #[inline(always)]
    pub fn class_id(self) -> u8 {
        ((self.0 >> 16) & 0x7F) as u8
    }

    /// Class as decoded by PGRAPH (low 5 bits)
    #[inline(always)]
    pub fn pgraph_class(self) -> u8 {
        self.class_id() & 0x1F
    }

    #[inline(always)]
    pub fn is_hardware(self) -> bool {
        self.0 & Self::HARDWARE != 0
    }

    #[inline(always)]
    pub fn channel(self) -> u8 {
        ((self.0 >> 24) & 0x7F) as u8
    }

    #[inline(always)]
    pub fn reserved(self) -> bool {
        self.0 & (1 << 31) != 0
    }

    /// An all-zero context marks a free RAMHT slot
    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Context as stored in a cache's CTX register (channel dropped)
    #[inline(always)]
    pub fn cached(self) -> u32 {
        self.0 & Self::CACHED_MASK
    }
}
