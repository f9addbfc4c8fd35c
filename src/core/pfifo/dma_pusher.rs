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

//! CACHE1 DMA pusher
//!
//! With `CONFIG_0.DMA_FETCH` set and `CACHE1_DMA_STATUS` running, CACHE1 is
//! fed from a command buffer instead of USER writes. The buffer is a packed
//! array of `{method | subchannel << 13, data}` pairs at `DMA1` (address)
//! for `DMA0` (length) bytes, in the memory selected by `DMA3`.
//!
//! Addresses go through a single-entry TLB: the page table at
//! `TLB_PT_BASE` in RAMIN holds one PTE per 4KB page.
//!
//! ```text
//! PTE:  31..12 frame | 1 writable | 0 present
//! ```

use super::{dma_target, CacheEntry, Pfifo, PfifoIntr};
use crate::core::memory::{HostMemory, Vram};

const PTE_PRESENT: u32 = 1 << 0;

impl Pfifo {
    /// Fetch one command pair into CACHE1
    ///
    /// # Returns
    ///
    /// `true` if an entry was queued
    pub fn dma_step(&mut self, vram: &Vram, host: &mut dyn HostMemory) -> bool {
        if !self.dma_fetch_enabled() || !self.cache1.dma_running() {
            return false;
        }
        if !self.cache1.push_enabled() || self.cache1.is_full() {
            return false;
        }
        if self.cache1.dma[0] < 8 {
            self.stop_dma();
            return false;
        }

        let address = self.cache1.dma[1];
        let page = address & !0xFFF;
        if self.cache1.tlb_tag != page {
            let pte = vram.ramin_read32(self.cache1.tlb_pt_base.wrapping_add((address >> 12) * 4));
            self.cache1.tlb_pte = pte;
            self.cache1.tlb_tag = page;
            log::trace!("PFIFO: DMA TLB fill page 0x{:08X} pte 0x{:08X}", page, pte);
        }

        if self.cache1.tlb_pte & PTE_PRESENT == 0 {
            log::warn!("PFIFO: DMA pusher page 0x{:08X} not present", page);
            self.cache1.invalidate_tlb();
            self.raise(PfifoIntr::DMA_PTE);
            self.stop_dma();
            return false;
        }

        let physical = (self.cache1.tlb_pte & !0xFFF) | (address & 0xFFF);
        let words = match self.cache1.dma[3] {
            dma_target::VRAM => Some((
                vram.read32(physical),
                vram.read32(physical.wrapping_add(4)),
            )),
            _ => host
                .read32(physical)
                .zip(host.read32(physical.wrapping_add(4))),
        };

        let Some((method_word, data)) = words else {
            log::warn!("PFIFO: DMA pusher read fault at 0x{:08X}", physical);
            self.raise(PfifoIntr::DMA_PUSHER);
            self.stop_dma();
            return false;
        };

        self.cache1
            .push(CacheEntry::from_method_word(method_word, data));
        self.cache1.dma[1] = address.wrapping_add(8);
        self.cache1.dma[0] -= 8;
        if self.cache1.dma[0] < 8 {
            self.stop_dma();
        }
        true
    }

    fn stop_dma(&mut self) {
        if self.cache1.dma_running() {
            log::debug!("PFIFO: DMA pusher stopped at 0x{:08X}", self.cache1.dma[1]);
        }
        self.cache1.dma_status &= !1;
    }
}
