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

//! PBUS: bus interface
//!
//! Holds the bus error interrupt and a mirror of the card's PCI
//! configuration space at 0x1800-0x18FF. The mirror is how the driver sets
//! the subsystem id after reading it from the VBIOS.

use crate::core::config::{BusType, Revision};
use crate::core::memory::{merge_lanes, MmioDevice};
use serde::{Deserialize, Serialize};

pub const PBUS_INTR: u32 = 0x001100;
pub const PBUS_INTR_EN: u32 = 0x001140;
pub const PBUS_PCI_START: u32 = 0x001800;
pub const PBUS_PCI_END: u32 = 0x0018FF;

/// Vendor id of the NVIDIA/SGS-Thomson joint venture that sold the NV3
pub const PCI_VENDOR_NVIDIA_SGS: u16 = 0x12D2;

/// Bus interface block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pbus {
    intr: u32,
    intr_en: u32,
    /// PCI configuration space, one dword per register
    pci: Vec<u32>,
    revision: Revision,
    bus: BusType,
}

impl Pbus {
    const PCI_COMMAND: usize = 0x04 / 4;
    const PCI_SUBSYSTEM: usize = 0x2C / 4;
    const PCI_INTERRUPT: usize = 0x3C / 4;

    pub fn new(revision: Revision, bus: BusType) -> Self {
        let mut pbus = Self {
            intr: 0,
            intr_en: 0,
            pci: vec![0; 64],
            revision,
            bus,
        };
        pbus.reset();
        pbus
    }

    pub fn reset(&mut self) {
        self.intr = 0;
        self.intr_en = 0;
        self.pci.fill(0);
        self.pci[0] = ((self.revision.pci_device_id() as u32) << 16) | PCI_VENDOR_NVIDIA_SGS as u32;
        // Status: 66MHz capable on AGP, medium DEVSEL
        self.pci[1] = match self.bus {
            BusType::Agp => 0x0220_0000,
            BusType::Pci => 0x0200_0000,
        };
        // Class 0x030000 (VGA compatible), revision id in the low byte
        self.pci[2] = 0x0300_0000 | (self.revision.boot_nibble() << 4);
        // INTA#
        self.pci[Self::PCI_INTERRUPT] = 0x0000_0100;
    }

    /// Raise bus interrupt bits (bit 0: PCI bus error)
    pub fn raise(&mut self, bits: u32) {
        self.intr |= bits;
    }

    pub fn interrupt_pending(&self) -> bool {
        self.intr & self.intr_en != 0
    }

    pub fn acknowledge_pending(&mut self) {
        self.intr &= !self.intr_en;
    }

    /// PCI configuration dword at `offset`
    pub fn pci_config(&self, offset: u32) -> u32 {
        self.pci[((offset & 0xFC) / 4) as usize]
    }
}

impl MmioDevice for Pbus {
    fn address_range(&self) -> (u32, u32) {
        (0x001000, 0x001FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PBUS_INTR => self.intr,
            PBUS_INTR_EN => self.intr_en,
            PBUS_PCI_START..=PBUS_PCI_END => self.pci_config(addr - PBUS_PCI_START),
            _ => {
                log::warn!("PBUS: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match addr {
            PBUS_INTR => self.intr &= !value,
            PBUS_INTR_EN => self.intr_en = value & 1,
            PBUS_PCI_START..=PBUS_PCI_END => {
                let index = ((addr - PBUS_PCI_START) / 4) as usize;
                match index {
                    Self::PCI_COMMAND => {
                        self.pci[index] = (self.pci[index] & 0xFFFF_0000) | (value & 0x0147);
                    }
                    Self::PCI_SUBSYSTEM => {
                        self.pci[index] = value;
                        log::debug!("PBUS: PCI subsystem id = 0x{:08X}", value);
                    }
                    Self::PCI_INTERRUPT => {
                        self.pci[index] = (self.pci[index] & 0xFFFF_FF00) | (value & 0xFF);
                    }
                    _ => log::debug!(
                        "PBUS: write to read-only PCI register 0x{:02X} ignored",
                        index * 4
                    ),
                }
            }
            _ => log::warn!(
                "PBUS: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
        if addr == PBUS_INTR {
            self.write32(addr, value & mask);
        } else {
            let current = self.peek32(addr);
            self.write32(addr, merge_lanes(current, value, mask));
        }
    }

    fn name(&self) -> &str {
        "PBUS"
    }
}
