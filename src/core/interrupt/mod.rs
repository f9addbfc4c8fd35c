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

//! PMC: master control
//!
//! PMC identifies the chip, gates the engines on and off, and folds the
//! pending interrupts of every block into the single PCI interrupt line.
//!
//! ## Registers
//!
//! - **BOOT** (0x000000): chip id, `0x00030100 | revision << 4`
//! - **INTR** (0x000100): one bit per block, cleared by the read that returns it
//! - **INTR_EN** (0x000140): bit 0 hardware interrupts, bit 1 software interrupt
//! - **ENABLE** (0x000200): one bit per engine
//!
//! ## Interrupt sources
//!
//! ```text
//! Bit  | Source    | Cleared by
//! -----|-----------|------------------------------------
//! 0    | PAUDIO    | (rev A only, never raised)
//! 4    | PMEDIA    | -
//! 8    | PFIFO     | PFIFO_INTR (write 1 to clear)
//! 12   | PGRAPH0   | PGRAPH_INTR_0 / PGRAPH_DMA_INTR_0
//! 13   | PGRAPH1   | PGRAPH_INTR_1
//! 16   | PVIDEO    | -
//! 20   | PTIMER    | PTIMER_INTR
//! 24   | PFB       | -
//! 28   | PBUS      | PBUS_INTR
//! 31   | SOFTWARE  | PMC_INTR bit 31
//! ```
//!
//! The block bits are summaries of the blocks' own status registers. A read
//! of `INTR` clears the bits it returns: PMC drops its summary and software
//! latch here, and the device acknowledges the enabled status bits of every
//! block named in the value (see [`Pmc::take_acknowledged`]). `peek32` leaves
//! everything in place.

use crate::core::config::Revision;
use crate::core::memory::MmioDevice;
use serde::{Deserialize, Serialize};

pub const PMC_BOOT: u32 = 0x000000;
pub const PMC_INTR: u32 = 0x000100;
pub const PMC_INTR_EN: u32 = 0x000140;
pub const PMC_ENABLE: u32 = 0x000200;

bitflags::bitflags! {
    /// Pending interrupt summary bits in `PMC_INTR`
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PmcIntr: u32 {
        const PAUDIO = 1 << 0;
        const PMEDIA = 1 << 4;
        const PFIFO = 1 << 8;
        const PGRAPH0 = 1 << 12;
        const PGRAPH1 = 1 << 13;
        const PVIDEO = 1 << 16;
        const PTIMER = 1 << 20;
        const PFB = 1 << 24;
        const PBUS = 1 << 28;
        const SOFTWARE = 1 << 31;
    }
}

bitflags::bitflags! {
    /// `PMC_INTR_EN` gates
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PmcIntrEnable: u32 {
        const HARDWARE = 1 << 0;
        const SOFTWARE = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Engine enables in `PMC_ENABLE`
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PmcEnable: u32 {
        const PAUDIO = 1 << 0;
        const PMEDIA = 1 << 4;
        const PFIFO = 1 << 8;
        const PGRAPH = 1 << 12;
        const PPMI = 1 << 16;
        const PFB = 1 << 20;
        const PCRTC = 1 << 24;
        const PVIDEO = 1 << 28;
    }
}

/// Master control block
///
/// # Example
///
/// ```
/// use nv3rx::core::config::Revision;
/// use nv3rx::core::interrupt::{Pmc, PmcIntr, PmcIntrEnable};
///
/// let mut pmc = Pmc::new(Revision::C);
/// pmc.set_source(PmcIntr::PFIFO, true);
/// assert!(!pmc.irq_asserted());
///
/// pmc.set_intr_enable(PmcIntrEnable::HARDWARE);
/// assert!(pmc.irq_asserted());
///
/// pmc.set_source(PmcIntr::PFIFO, false);
/// assert!(!pmc.irq_asserted());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pmc {
    revision: Revision,

    /// Block summary bits, refreshed by the device after every access
    sources: PmcIntr,

    /// Software interrupt latch (bit 31)
    software: bool,

    /// Block bits returned by the last `INTR` read, not yet acknowledged at
    /// the blocks
    #[serde(skip)]
    acknowledged: PmcIntr,

    intr_en: PmcIntrEnable,

    enable: PmcEnable,
}

impl Pmc {
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            sources: PmcIntr::empty(),
            software: false,
            acknowledged: PmcIntr::empty(),
            intr_en: PmcIntrEnable::empty(),
            enable: PmcEnable::all(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.revision);
        log::info!("PMC reset (boot 0x{:08X})", self.boot());
    }

    /// Chip id reported in `PMC_BOOT`
    pub fn boot(&self) -> u32 {
        0x0003_0100 | (self.revision.boot_nibble() << 4)
    }

    /// Update one block summary bit
    ///
    /// # Arguments
    ///
    /// * `source` - Block bit(s) to update (not `SOFTWARE`)
    /// * `pending` - Whether the block has an enabled interrupt pending
    pub fn set_source(&mut self, source: PmcIntr, pending: bool) {
        let source = source - PmcIntr::SOFTWARE;
        let before = self.sources;
        self.sources.set(source, pending);
        if before != self.sources {
            log::trace!(
                "PMC sources 0x{:08X} -> 0x{:08X}",
                before.bits(),
                self.sources.bits()
            );
        }
    }

    /// Current value of `PMC_INTR`
    pub fn intr(&self) -> PmcIntr {
        let mut intr = self.sources;
        if self.software {
            intr |= PmcIntr::SOFTWARE;
        }
        intr
    }

    /// Take the block bits cleared by `INTR` reads since the last call
    ///
    /// The device uses this to acknowledge the matching status registers in
    /// PFIFO, PGRAPH, PTIMER and PBUS; otherwise the next summary refresh
    /// would raise the bits again.
    pub fn take_acknowledged(&mut self) -> PmcIntr {
        std::mem::take(&mut self.acknowledged)
    }

    pub fn intr_enable(&self) -> PmcIntrEnable {
        self.intr_en
    }

    pub fn set_intr_enable(&mut self, enable: PmcIntrEnable) {
        self.intr_en = enable;
    }

    /// Whether the PCI interrupt line is asserted
    ///
    /// Hardware sources reach the line only with `INTR_EN.HARDWARE`; the
    /// software bit only with `INTR_EN.SOFTWARE`.
    pub fn irq_asserted(&self) -> bool {
        let intr = self.intr();
        let hardware = !(intr - PmcIntr::SOFTWARE).is_empty()
            && self.intr_en.contains(PmcIntrEnable::HARDWARE);
        let software =
            intr.contains(PmcIntr::SOFTWARE) && self.intr_en.contains(PmcIntrEnable::SOFTWARE);
        hardware || software
    }

    pub fn enable(&self) -> PmcEnable {
        self.enable
    }

    /// Check whether an engine is switched on in `PMC_ENABLE`
    #[inline(always)]
    pub fn is_enabled(&self, engine: PmcEnable) -> bool {
        self.enable.contains(engine)
    }
}

impl Default for Pmc {
    fn default() -> Self {
        Self::new(Revision::default())
    }
}

impl MmioDevice for Pmc {
    fn address_range(&self) -> (u32, u32) {
        (0x000000, 0x000FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PMC_BOOT => self.boot(),
            PMC_INTR => self.intr().bits(),
            PMC_INTR_EN => self.intr_en.bits(),
            PMC_ENABLE => self.enable.bits(),
            _ => {
                log::warn!("PMC: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn read32(&mut self, addr: u32) -> u32 {
        if addr != PMC_INTR {
            return self.peek32(addr);
        }

        let intr = self.intr();
        self.software = false;
        self.sources.remove(intr);
        self.acknowledged |= intr - PmcIntr::SOFTWARE;
        if !intr.is_empty() {
            log::debug!("PMC: INTR 0x{:08X} read and cleared", intr.bits());
        }
        intr.bits()
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match addr {
            PMC_BOOT => log::debug!("PMC: write to read-only BOOT ignored"),
            PMC_INTR => {
                // Only the software bit is writable
                self.software = value & PmcIntr::SOFTWARE.bits() != 0;
                log::debug!("PMC: software interrupt {}", self.software);
            }
            PMC_INTR_EN => {
                self.intr_en = PmcIntrEnable::from_bits_truncate(value);
                log::debug!("PMC: INTR_EN = 0x{:08X}", self.intr_en.bits());
            }
            PMC_ENABLE => {
                self.enable = PmcEnable::from_bits_truncate(value);
                log::debug!("PMC: ENABLE = 0x{:08X}", self.enable.bits());
            }
            _ => log::warn!(
                "PMC: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn name(&self) -> &str {
        "PMC"
    }
}
