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

//! PEXTDEV: board straps
//!
//! The straps are resistor-configured at manufacture. Software can only
//! replace them by writing a value with the overwrite bit set.

use crate::core::config::{BusType, Crystal, Nv3Config};
use crate::core::memory::MmioDevice;
use serde::{Deserialize, Serialize};

pub const PEXTDEV_STRAPS: u32 = 0x101000;

/// Strap bits
pub mod straps {
    /// 66MHz bus
    pub const BUS_SPEED_66MHZ: u32 = 1 << 0;
    pub const BIOS_PRESENT: u32 = 1 << 1;
    /// 8Mbit RAM parts (16Mbit when clear)
    pub const RAM_TYPE_8MBIT: u32 = 1 << 2;
    pub const NEC_MODE: u32 = 1 << 3;
    pub const BUS_WIDTH_128: u32 = 1 << 4;
    pub const BUS_TYPE_AGP: u32 = 1 << 5;
    /// 14.318MHz crystal (13.5MHz when clear)
    pub const CRYSTAL_14318: u32 = 1 << 6;
    pub const TV_MODE_SHIFT: u32 = 7;
    pub const TV_MODE_NTSC: u32 = 1 << TV_MODE_SHIFT;
    /// Set when AGP 2x is *disabled*
    pub const AGP2X_DISABLED: u32 = 1 << 9;
    pub const OVERWRITE: u32 = 1 << 11;
}

/// External device / strap block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pextdev {
    straps: u32,
    reset_straps: u32,
}

impl Pextdev {
    pub fn new(config: &Nv3Config) -> Self {
        let mut value = straps::BUS_WIDTH_128 | straps::TV_MODE_NTSC;
        if config.vbios_present {
            value |= straps::BIOS_PRESENT;
        }
        match config.bus {
            BusType::Agp => value |= straps::BUS_TYPE_AGP | straps::BUS_SPEED_66MHZ,
            BusType::Pci => value |= straps::AGP2X_DISABLED,
        }
        if config.crystal == Crystal::Mhz14_318 {
            value |= straps::CRYSTAL_14318;
        }
        Self {
            straps: value,
            reset_straps: value,
        }
    }

    pub fn reset(&mut self) {
        self.straps = self.reset_straps;
    }

    pub fn straps(&self) -> u32 {
        self.straps
    }

    pub fn is_agp(&self) -> bool {
        self.straps & straps::BUS_TYPE_AGP != 0
    }
}

impl MmioDevice for Pextdev {
    fn address_range(&self) -> (u32, u32) {
        (0x101000, 0x101FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PEXTDEV_STRAPS => self.straps,
            _ => {
                log::warn!("PEXTDEV: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match addr {
            PEXTDEV_STRAPS if value & straps::OVERWRITE != 0 => {
                self.straps = value & 0xFFF;
                log::debug!("PEXTDEV: straps overwritten with 0x{:08X}", self.straps);
            }
            PEXTDEV_STRAPS => log::debug!("PEXTDEV: straps write without overwrite bit ignored"),
            _ => log::warn!(
                "PEXTDEV: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn name(&self) -> &str {
        "PEXTDEV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straps_from_config() {
        let agp = Pextdev::new(&Nv3Config {
            bus: BusType::Agp,
            ..Default::default()
        });
        assert!(agp.is_agp());
        assert_ne!(agp.straps() & straps::CRYSTAL_14318, 0);
        assert_ne!(agp.straps() & straps::BIOS_PRESENT, 0);

        let pci = Pextdev::new(&Nv3Config {
            crystal: Crystal::Mhz13_5,
            vbios_present: false,
            ..Default::default()
        });
        assert!(!pci.is_agp());
        assert_eq!(pci.straps() & straps::CRYSTAL_14318, 0);
        assert_eq!(pci.straps() & straps::BIOS_PRESENT, 0);
    }

    #[test]
    fn test_overwrite_bit_required() {
        let mut dev = Pextdev::new(&Nv3Config::default());
        let original = dev.straps();

        dev.write32(PEXTDEV_STRAPS, 0x20);
        assert_eq!(dev.read32(PEXTDEV_STRAPS), original);

        dev.write32(PEXTDEV_STRAPS, straps::OVERWRITE | straps::BUS_TYPE_AGP);
        assert!(dev.is_agp());

        dev.reset();
        assert_eq!(dev.straps(), original);
    }
}
