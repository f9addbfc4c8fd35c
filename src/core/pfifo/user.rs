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

//! USER aperture: CPU-side method submission
//!
//! A write is checked in a fixed order and either queued in CACHE1 or
//! logged to RAMRO. The first failing check decides the runout reason:
//!
//! | # | Condition                                         | Reason             |
//! |---|---------------------------------------------------|--------------------|
//! | 1 | write to the free-count register (method 0x010)   | illegal access     |
//! | 2 | `CACHE1_PUSH0` disabled                           | no cache available |
//! | 3 | RAMRO already holds entries                       | cache ran out      |
//! | 4 | no free slot                                      | free count overrun |
//! | 5 | method 0x004..=0x0FC                              | reserved access    |
//! | 6 | other channel, switching not possible             | no cache available |
//!
//! A write for another channel with reassignment enabled and an empty cache
//! swaps channel state through RAMFC first.

use super::{CacheEntry, Pfifo};
use crate::core::memory::Vram;
use crate::core::ramin::{ChannelContext, RunoutReason};

/// Method offset of the free-count register
pub const USER_FREE_COUNT: u32 = 0x010;

/// Decoded USER aperture offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAddress {
    pub channel: u8,
    pub subchannel: u8,
    pub method: u32,
}

impl UserAddress {
    /// Decode an offset relative to the start of the aperture
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::pfifo::UserAddress;
    ///
    /// let addr = UserAddress::decode(0x0002_6304);
    /// assert_eq!(addr.channel, 2);
    /// assert_eq!(addr.subchannel, 3);
    /// assert_eq!(addr.method, 0x304);
    /// ```
    pub fn decode(offset: u32) -> Self {
        Self {
            channel: ((offset >> 16) & 0x7F) as u8,
            subchannel: ((offset >> 13) & 7) as u8,
            method: offset & 0x1FFC,
        }
    }

    pub fn encode(&self) -> u32 {
        ((self.channel as u32 & 0x7F) << 16) | ((self.subchannel as u32 & 7) << 13) | self.method
    }
}

impl Pfifo {
    /// Handle a CPU write into the USER aperture
    ///
    /// # Arguments
    ///
    /// * `vram` - RAMIN backing store (RAMRO and RAMFC live here)
    /// * `offset` - Offset from the start of the aperture
    /// * `value` - Method parameter
    ///
    /// # Returns
    ///
    /// `true` if the write was queued in CACHE1
    pub fn user_write(&mut self, vram: &mut Vram, offset: u32, value: u32) -> bool {
        let addr = UserAddress::decode(offset);
        let offset = addr.encode();

        let reason = if addr.method == USER_FREE_COUNT {
            Some(RunoutReason::IllegalAccess)
        } else if !self.cache1.push_enabled() {
            Some(RunoutReason::NoCacheAvailable)
        } else if self.runout_pending() {
            Some(RunoutReason::CacheRanOut)
        } else if self.cache1.is_full() {
            Some(RunoutReason::FreeCountOverrun)
        } else if (0x004..=0x0FC).contains(&addr.method) {
            Some(RunoutReason::ReservedAccess)
        } else if addr.channel != self.cache1.chid
            && (!self.reassignment_enabled() || !self.cache1.is_empty())
        {
            Some(RunoutReason::NoCacheAvailable)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.log_runout(vram, offset, value, reason, true);
            return false;
        }

        if addr.channel != self.cache1.chid {
            self.switch_channel(vram, addr.channel);
        }

        let pushed = self
            .cache1
            .push(CacheEntry::new(addr.method, addr.subchannel, value));
        log::trace!(
            "PFIFO push ch={} subch={} method=0x{:04X} data=0x{:08X}",
            addr.channel,
            addr.subchannel,
            addr.method,
            value
        );
        pushed
    }

    /// Handle a CPU read from the USER aperture
    ///
    /// Only the free-count register is readable; it reports the space the
    /// reading channel would see.
    pub fn user_read(&self, offset: u32) -> u32 {
        let addr = UserAddress::decode(offset);
        if addr.method != USER_FREE_COUNT {
            log::debug!("PFIFO: USER read of method 0x{:04X} returns 0", addr.method);
            return 0;
        }

        if addr.channel == self.cache1.chid {
            self.cache1.free_count()
        } else if self.reassignment_enabled() && self.cache1.is_empty() {
            (self.cache1.size() - 1) << 2
        } else {
            0
        }
    }

    /// Save the current CACHE1 channel to RAMFC and load another one
    pub fn switch_channel(&mut self, vram: &mut Vram, channel: u8) {
        let outgoing = self.cache1.chid;
        let saved = ChannelContext {
            subchannel_ctx: self.cache1.ctx,
            dma: self.cache1.dma,
            tlb_pt_base: self.cache1.tlb_pt_base,
        };
        self.ramfc.save(vram, outgoing, &saved);

        let loaded = self.ramfc.load(vram, channel);
        self.cache1.ctx = loaded.subchannel_ctx;
        self.cache1.dma = loaded.dma;
        self.cache1.dma[3] &= 3;
        self.cache1.set_tlb_pt_base(loaded.tlb_pt_base);
        self.cache1.chid = channel;

        log::debug!("PFIFO: CACHE1 channel switch {} -> {}", outgoing, channel);
    }
}
