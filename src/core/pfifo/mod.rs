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

//! PFIFO: command submission engine
//!
//! PFIFO turns CPU writes into the USER aperture (or command buffers fetched
//! by the DMA pusher) into `{channel, subchannel, method, data}` entries,
//! queues them in CACHE1, resolves object names through RAMHT and hands the
//! result to PGRAPH.
//!
//! ## USER aperture decode
//!
//! ```text
//! offset = addr - 0x800000
//!   22..16  channel
//!   15..13  subchannel
//!   12..2   method
//! ```
//!
//! ## Flow
//!
//! ```text
//! user_write ─► push checks ─┬─► CACHE1 ─► pull ─► RAMHT ─► PulledMethod
//!                            └─► RAMRO (runout log) + INTR_RUNOUT
//! ```
//!
//! Guest mistakes never produce `Err`: they set bits in `PFIFO_INTR`,
//! `CACHE_ERROR`, the pull status registers and RAMRO.
//!
//! ## References
//!
//! - envytools: NV3 PFIFO documentation
//! - xf86-video-nv `riva_hw.h` register names

mod cache;
mod dma_pusher;
mod gray;
mod puller;
mod runout;
mod user;

pub use cache::{status, Cache0, Cache1, CacheEntry, PullControl};
pub use gray::{gray_to_normal, normal_to_gray};
pub use runout::runout_status;
pub use user::{UserAddress, USER_FREE_COUNT};

use crate::core::config::{BusType, Nv3Config};
use crate::core::memory::{merge_lanes, MmioDevice};
use crate::core::ramin::{RamfcConfig, RamhtConfig, RaminContext, RamroConfig};
use serde::{Deserialize, Serialize};

pub const PFIFO_DELAY_0: u32 = 0x002040;
pub const PFIFO_CACHE_ERROR: u32 = 0x002080;
pub const PFIFO_INTR: u32 = 0x002100;
pub const PFIFO_INTR_EN: u32 = 0x002140;
pub const PFIFO_CONFIG_0: u32 = 0x002200;
pub const PFIFO_RAMHT: u32 = 0x002210;
pub const PFIFO_RAMFC: u32 = 0x002214;
pub const PFIFO_RAMRO: u32 = 0x002218;
pub const PFIFO_RUNOUT_STATUS: u32 = 0x002400;
pub const PFIFO_RUNOUT_PUT: u32 = 0x002410;
pub const PFIFO_RUNOUT_GET: u32 = 0x002420;
pub const PFIFO_CACHES: u32 = 0x002500;

pub const CACHE0_PUSH0: u32 = 0x003000;
pub const CACHE0_CHID: u32 = 0x003004;
pub const CACHE0_PUT: u32 = 0x003010;
pub const CACHE0_STATUS: u32 = 0x003014;
pub const CACHE0_PULL0: u32 = 0x003040;
pub const CACHE0_PULL1: u32 = 0x003050;
pub const CACHE0_GET: u32 = 0x003070;
pub const CACHE0_CTX: u32 = 0x003080;
pub const CACHE0_METHOD: u32 = 0x003100;
pub const CACHE0_DATA: u32 = 0x003104;

pub const CACHE1_PUSH0: u32 = 0x003200;
pub const CACHE1_CHID: u32 = 0x003204;
pub const CACHE1_PUT: u32 = 0x003210;
pub const CACHE1_STATUS: u32 = 0x003214;
pub const CACHE1_DMA0: u32 = 0x003220;
pub const CACHE1_DMA1: u32 = 0x003224;
pub const CACHE1_DMA2: u32 = 0x003228;
pub const CACHE1_DMA3: u32 = 0x00322C;
pub const CACHE1_DMA_STATUS: u32 = 0x003230;
pub const CACHE1_DMA_TLB_PT_BASE: u32 = 0x003234;
pub const CACHE1_DMA_TLB_PTE: u32 = 0x003238;
pub const CACHE1_DMA_TLB_TAG: u32 = 0x00323C;
pub const CACHE1_PULL0: u32 = 0x003240;
pub const CACHE1_PULL1: u32 = 0x003250;
pub const CACHE1_GET: u32 = 0x003270;
pub const CACHE1_CTX_START: u32 = 0x003280;
pub const CACHE1_CTX_END: u32 = 0x0032F0;
pub const CACHE1_ENTRIES_START: u32 = 0x003300;

/// `CACHE1_DMA3` target node values
pub mod dma_target {
    pub const VRAM: u32 = 0x00;
    pub const PCI: u32 = 0x02;
    pub const AGP: u32 = 0x03;
}

bitflags::bitflags! {
    /// `PFIFO_INTR` / `PFIFO_INTR_EN` bits
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PfifoIntr: u32 {
        const CACHE_ERROR = 1 << 0;
        const RUNOUT = 1 << 4;
        const RUNOUT_OVERFLOW = 1 << 8;
        const DMA_PUSHER = 1 << 12;
        const DMA_PTE = 1 << 16;
    }
}

/// `PFIFO_CACHE_ERROR` bits
pub mod cache_error {
    pub const CACHE0: u32 = 1 << 0;
    pub const CACHE1: u32 = 1 << 4;
}

/// Which cache an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheId {
    Cache0,
    Cache1,
}

/// A method resolved by the puller, ready for PGRAPH
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulledMethod {
    pub cache: CacheId,
    pub channel: u8,
    pub subchannel: u8,
    pub method: u32,
    pub data: u32,
    /// Object context with the channel field filled in
    pub context: RaminContext,
}

/// Command submission engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pfifo {
    delay_0: u32,
    cache_error: u32,
    intr: PfifoIntr,
    intr_en: PfifoIntr,
    config_0: u32,
    ramht: RamhtConfig,
    ramfc: RamfcConfig,
    ramro: RamroConfig,
    runout_put: u32,
    runout_get: u32,
    caches: u32,
    cache0: Cache0,
    cache1: Cache1,
    bus: BusType,
}

impl Pfifo {
    /// `CONFIG_0` bit selecting DMA fetch for CACHE1
    pub const CONFIG_0_DMA_FETCH: u32 = 1 << 0;

    /// `CACHES` reassignment enable
    pub const CACHES_REASSIGN: u32 = 1 << 0;

    pub fn new(config: &Nv3Config) -> Self {
        let mut pfifo = Self {
            delay_0: 0,
            cache_error: 0,
            intr: PfifoIntr::empty(),
            intr_en: PfifoIntr::empty(),
            config_0: 0,
            ramht: RamhtConfig::default(),
            ramfc: RamfcConfig::default(),
            ramro: RamroConfig::default(),
            runout_put: 0,
            runout_get: 0,
            caches: 0,
            cache0: Cache0::default(),
            cache1: Cache1::new(config.revision.cache1_entries()),
            bus: config.bus,
        };
        pfifo.reset();
        pfifo
    }

    pub fn reset(&mut self) {
        let size = self.cache1.size();
        self.delay_0 = 0;
        self.cache_error = 0;
        self.intr = PfifoIntr::empty();
        self.intr_en = PfifoIntr::empty();
        self.config_0 = 0;
        self.ramht = RamhtConfig::default();
        self.ramfc = RamfcConfig::default();
        self.ramro = RamroConfig::default();
        self.runout_put = 0;
        self.runout_get = 0;
        self.caches = 0;
        self.cache0 = Cache0::default();
        self.cache1 = Cache1::new(size);
        self.cache1.dma[3] = match self.bus {
            BusType::Pci => dma_target::PCI,
            BusType::Agp => dma_target::AGP,
        };
        log::info!("PFIFO reset (CACHE1 depth {})", size);
    }

    // ------------------------------------------------------------------------
    // Accessors used by the device and tests
    // ------------------------------------------------------------------------

    pub fn ramht_config(&self) -> RamhtConfig {
        self.ramht
    }

    pub fn ramfc_config(&self) -> RamfcConfig {
        self.ramfc
    }

    pub fn ramro_config(&self) -> RamroConfig {
        self.ramro
    }

    pub fn cache0(&self) -> &Cache0 {
        &self.cache0
    }

    pub fn cache1(&self) -> &Cache1 {
        &self.cache1
    }

    pub fn intr(&self) -> PfifoIntr {
        self.intr
    }

    pub fn cache_error(&self) -> u32 {
        self.cache_error
    }

    /// Whether an enabled interrupt is pending (PMC bit 8)
    pub fn interrupt_pending(&self) -> bool {
        self.intr.intersects(self.intr_en)
    }

    /// Clear the enabled pending bits after a `PMC_INTR` read
    pub fn acknowledge_pending(&mut self) {
        let pending = self.intr & self.intr_en;
        self.acknowledge(pending.bits());
    }

    fn raise(&mut self, bits: PfifoIntr) {
        self.intr |= bits;
        log::trace!("PFIFO intr 0x{:08X}", self.intr.bits());
    }

    fn acknowledge(&mut self, value: u32) {
        self.intr &= !PfifoIntr::from_bits_truncate(value);
        if self.intr.is_empty() {
            self.cache_error = 0;
        }
    }

    pub fn reassignment_enabled(&self) -> bool {
        self.caches & Self::CACHES_REASSIGN != 0
    }

    pub fn dma_fetch_enabled(&self) -> bool {
        self.config_0 & Self::CONFIG_0_DMA_FETCH != 0
    }

    fn cache1_entries_end(&self) -> u32 {
        CACHE1_ENTRIES_START + self.cache1.size() * 8 - 1
    }
}

impl MmioDevice for Pfifo {
    fn address_range(&self) -> (u32, u32) {
        (0x002000, 0x003FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PFIFO_DELAY_0 => self.delay_0,
            PFIFO_CACHE_ERROR => self.cache_error,
            PFIFO_INTR => self.intr.bits(),
            PFIFO_INTR_EN => self.intr_en.bits(),
            PFIFO_CONFIG_0 => self.config_0,
            PFIFO_RAMHT => self.ramht.to_register(),
            PFIFO_RAMFC => self.ramfc.to_register(),
            PFIFO_RAMRO => self.ramro.to_register(),
            PFIFO_RUNOUT_STATUS => self.runout_status(),
            PFIFO_RUNOUT_PUT => self.runout_put,
            PFIFO_RUNOUT_GET => self.runout_get,
            PFIFO_CACHES => self.caches,

            CACHE0_PUSH0 => self.cache0.push0,
            CACHE0_CHID => self.cache0.chid as u32,
            CACHE0_PUT => self.cache0.put,
            CACHE0_STATUS => self.cache0.status(),
            CACHE0_PULL0 => self.cache0.pull.pull0,
            CACHE0_PULL1 => self.cache0.pull.pull1,
            CACHE0_GET => self.cache0.get,
            CACHE0_CTX => self.cache0.ctx,
            CACHE0_METHOD => self.cache0.entry.method_word(),
            CACHE0_DATA => self.cache0.entry.data,

            CACHE1_PUSH0 => self.cache1.push0,
            CACHE1_CHID => self.cache1.chid as u32,
            CACHE1_PUT => self.cache1.put_register(),
            CACHE1_STATUS => self.cache1.status(),
            CACHE1_DMA0 => self.cache1.dma[0],
            CACHE1_DMA1 => self.cache1.dma[1],
            CACHE1_DMA2 => self.cache1.dma[2],
            CACHE1_DMA3 => self.cache1.dma[3],
            CACHE1_DMA_STATUS => self.cache1.dma_status,
            CACHE1_DMA_TLB_PT_BASE => self.cache1.tlb_pt_base,
            CACHE1_DMA_TLB_PTE => self.cache1.tlb_pte,
            CACHE1_DMA_TLB_TAG => self.cache1.tlb_tag,
            CACHE1_PULL0 => self.cache1.pull.pull0,
            CACHE1_PULL1 => self.cache1.pull.pull1,
            CACHE1_GET => self.cache1.get_register(),
            CACHE1_CTX_START..=CACHE1_CTX_END if addr & 0xF == 0 => {
                self.cache1.ctx[((addr - CACHE1_CTX_START) >> 4) as usize]
            }
            _ if (CACHE1_ENTRIES_START..=self.cache1_entries_end()).contains(&addr) => {
                let offset = addr - CACHE1_ENTRIES_START;
                let entry = self.cache1.slot(offset / 8);
                if offset & 4 != 0 {
                    entry.data
                } else {
                    entry.method_word()
                }
            }
            _ => {
                log::warn!("PFIFO: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        log::trace!("PFIFO: write 0x{:06X} = 0x{:08X}", addr, value);
        match addr {
            PFIFO_DELAY_0 => self.delay_0 = value & 0xFF,
            PFIFO_CACHE_ERROR => log::debug!("PFIFO: CACHE_ERROR is read-only"),
            PFIFO_INTR => self.acknowledge(value),
            PFIFO_INTR_EN => self.intr_en = PfifoIntr::from_bits_truncate(value),
            PFIFO_CONFIG_0 => {
                self.config_0 = value & Self::CONFIG_0_DMA_FETCH;
                log::debug!("PFIFO: DMA fetch {}", self.dma_fetch_enabled());
            }
            PFIFO_RAMHT => {
                self.ramht = RamhtConfig::from_register(value);
                log::debug!(
                    "PFIFO: RAMHT at 0x{:04X}, {} bytes",
                    self.ramht.base,
                    self.ramht.size.bytes()
                );
            }
            PFIFO_RAMFC => {
                self.ramfc = RamfcConfig::from_register(value);
                log::debug!("PFIFO: RAMFC at 0x{:04X}", self.ramfc.base);
            }
            PFIFO_RAMRO => {
                self.ramro = RamroConfig::from_register(value);
                self.runout_put &= self.ramro.pointer_mask();
                self.runout_get &= self.ramro.pointer_mask();
                log::debug!(
                    "PFIFO: RAMRO at 0x{:04X}, {} bytes",
                    self.ramro.base,
                    self.ramro.size
                );
            }
            PFIFO_RUNOUT_STATUS => log::debug!("PFIFO: RUNOUT_STATUS is read-only"),
            PFIFO_RUNOUT_PUT => self.runout_put = value & self.ramro.pointer_mask(),
            PFIFO_RUNOUT_GET => self.runout_get = value & self.ramro.pointer_mask(),
            PFIFO_CACHES => self.caches = value & Self::CACHES_REASSIGN,

            CACHE0_PUSH0 => self.cache0.push0 = value & 1,
            CACHE0_CHID => self.cache0.chid = (value & 0x7F) as u8,
            CACHE0_PUT => self.cache0.put = value & 4,
            CACHE0_STATUS => log::debug!("PFIFO: CACHE0_STATUS is read-only"),
            CACHE0_PULL0 => self.cache0.pull.write_pull0(value),
            CACHE0_PULL1 => self.cache0.pull.pull1 = value & PullControl::CTX_DIRTY,
            CACHE0_GET => self.cache0.get = value & 4,
            CACHE0_CTX => self.cache0.ctx = value & RaminContext::CACHED_MASK,
            CACHE0_METHOD => {
                let data = self.cache0.entry.data;
                self.cache0.entry = CacheEntry::from_method_word(value, data);
            }
            CACHE0_DATA => self.cache0.entry.data = value,

            CACHE1_PUSH0 => self.cache1.push0 = value & 1,
            CACHE1_CHID => self.cache1.chid = (value & 0x7F) as u8,
            CACHE1_PUT => self.cache1.set_put_register(value),
            CACHE1_STATUS => log::debug!("PFIFO: CACHE1_STATUS is read-only"),
            CACHE1_DMA0 => self.cache1.dma[0] = value,
            CACHE1_DMA1 => self.cache1.dma[1] = value,
            CACHE1_DMA2 => self.cache1.dma[2] = value,
            CACHE1_DMA3 => self.cache1.dma[3] = value & 3,
            CACHE1_DMA_STATUS => {
                self.cache1.dma_status = value & 1;
                if self.cache1.dma_running() {
                    log::debug!(
                        "PFIFO: DMA pusher start, 0x{:08X} bytes at 0x{:08X}",
                        self.cache1.dma[0],
                        self.cache1.dma[1]
                    );
                }
            }
            CACHE1_DMA_TLB_PT_BASE => self.cache1.set_tlb_pt_base(value),
            CACHE1_DMA_TLB_PTE => self.cache1.tlb_pte = value,
            CACHE1_DMA_TLB_TAG => self.cache1.tlb_tag = value,
            CACHE1_PULL0 => self.cache1.pull.write_pull0(value),
            CACHE1_PULL1 => self.cache1.pull.pull1 = value & PullControl::CTX_DIRTY,
            CACHE1_GET => self.cache1.set_get_register(value),
            CACHE1_CTX_START..=CACHE1_CTX_END if addr & 0xF == 0 => {
                self.cache1.ctx[((addr - CACHE1_CTX_START) >> 4) as usize] =
                    value & RaminContext::CACHED_MASK;
            }
            _ if (CACHE1_ENTRIES_START..=self.cache1_entries_end()).contains(&addr) => {
                let offset = addr - CACHE1_ENTRIES_START;
                let slot = self.cache1.slot_mut(offset / 8);
                if offset & 4 != 0 {
                    slot.data = value;
                } else {
                    *slot = CacheEntry::from_method_word(value, slot.data);
                }
            }
            _ => log::warn!(
                "PFIFO: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
        if addr == PFIFO_INTR {
            self.write32(addr, value & mask);
        } else {
            let current = self.peek32(addr);
            self.write32(addr, merge_lanes(current, value, mask));
        }
    }

    fn name(&self) -> &str {
        "PFIFO"
    }
}

impl Default for Pfifo {
    fn default() -> Self {
        Self::new(&Nv3Config::default())
    }
}
