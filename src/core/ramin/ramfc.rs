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

//! RAMFC: saved FIFO context of inactive channels
//!
//! When CACHE1 switches from one channel to another, the outgoing channel's
//! state is written here and the incoming channel's state is loaded.
//!
//! Per-channel layout (64 bytes, 8 channels = 512 bytes):
//!
//! | Offset    | Contents                         |
//! |-----------|----------------------------------|
//! | 0x00-0x1C | subchannel contexts 0..7         |
//! | 0x20-0x2C | CACHE1_DMA0..3                   |
//! | 0x30      | CACHE1_DMA_TLB_PT_BASE           |
//! | 0x34-0x3C | reserved                         |

use crate::core::memory::Vram;
use serde::{Deserialize, Serialize};

/// Bytes of RAMFC used by one channel
pub const RAMFC_CHANNEL_SIZE: u32 = 0x40;

/// Number of FIFO channels
pub const FIFO_CHANNELS: usize = 8;

/// Decoded `PFIFO_RAMFC` register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamfcConfig {
    pub base: u32,
}

impl Default for RamfcConfig {
    fn default() -> Self {
        Self {
            base: super::RAMFC_DEFAULT_BASE,
        }
    }
}

/// State of one channel as stored in RAMFC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContext {
    pub subchannel_ctx: [u32; 8],
    pub dma: [u32; 4],
    pub tlb_pt_base: u32,
}

impl RamfcConfig {
    pub fn from_register(value: u32) -> Self {
        Self {
            base: value & 0xFE00,
        }
    }

    pub fn to_register(&self) -> u32 {
        self.base
    }

    /// RAMIN offset of a channel's record
    pub fn channel_offset(&self, channel: u8) -> u32 {
        self.base + ((channel as u32) & 7) * RAMFC_CHANNEL_SIZE
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset < self.base + RAMFC_CHANNEL_SIZE * FIFO_CHANNELS as u32
    }

    /// Store a channel's context
    pub fn save(&self, vram: &mut Vram, channel: u8, context: &ChannelContext) {
        let base = self.channel_offset(channel);
        for (i, &ctx) in context.subchannel_ctx.iter().enumerate() {
            vram.ramin_write32(base + (i as u32) * 4, ctx);
        }
        for (i, &dma) in context.dma.iter().enumerate() {
            vram.ramin_write32(base + 0x20 + (i as u32) * 4, dma);
        }
        vram.ramin_write32(base + 0x30, context.tlb_pt_base);
        log::debug!("RAMFC: saved channel {} at 0x{:04X}", channel, base);
    }

    /// Load a channel's context
    pub fn load(&self, vram: &Vram, channel: u8) -> ChannelContext {
        let base = self.channel_offset(channel);
        let mut context = ChannelContext::default();
        for (i, ctx) in context.subchannel_ctx.iter_mut().enumerate() {
            *ctx = vram.ramin_read32(base + (i as u32) * 4);
        }
        for (i, dma) in context.dma.iter_mut().enumerate() {
            *dma = vram.ramin_read32(base + 0x20 + (i as u32) * 4);
        }
        context.tlb_pt_base = vram.ramin_read32(base + 0x30);
        log::debug!("RAMFC: loaded channel {} from 0x{:04X}", channel, base);
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_masks_base() {
        assert_eq!(RamfcConfig::from_register(0xFFFF_FFFF).base, 0xFE00);
        assert_eq!(RamfcConfig::default().base, 0x1C00);
    }

    #[test]
    fn test_channel_offsets() {
        let cfg = RamfcConfig::default();
        assert_eq!(cfg.channel_offset(0), 0x1C00);
        assert_eq!(cfg.channel_offset(7), 0x1DC0);
        assert!(cfg.contains(0x1DFF));
        assert!(!cfg.contains(0x1E00));
    }

    #[test]
    fn test_save_load_channels_are_independent() {
        let mut vram = Vram::new(2 * 1024 * 1024);
        let cfg = RamfcConfig::default();

        let mut a = ChannelContext::default();
        a.subchannel_ctx[3] = 0x0087_0010;
        a.dma = [0x100, 0x2000, 0, 0x3];
        a.tlb_pt_base = 0x4000;

        let mut b = ChannelContext::default();
        b.subchannel_ctx[0] = 0x0081_0020;

        cfg.save(&mut vram, 1, &a);
        cfg.save(&mut vram, 2, &b);

        assert_eq!(cfg.load(&vram, 1), a);
        assert_eq!(cfg.load(&vram, 2), b);
        assert_eq!(cfg.load(&vram, 3), ChannelContext::default());
    }
}
