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

//! Device configuration
//!
//! Board-level choices that are fixed for the lifetime of a device: chip
//! revision, VRAM size, host bus and crystal. These feed the PMC boot id, the
//! CACHE1 depth, the PFB RAM straps and the PEXTDEV straps.
//!
//! Configurations are stored as TOML:
//!
//! ```toml
//! revision = "C"
//! vram_size = 4
//! bus = "agp"
//! crystal = "14.318mhz"
//! vbios_present = true
//! ptimer_numerator = 1
//! ptimer_denominator = 1
//! pgraph_fifo_access = true
//! ```

use crate::core::error::{EmulatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// NV3 silicon revision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Revision {
    /// NV3 stepping A0 (still has PAUDIO)
    A,
    B,
    /// RIVA 128 ZX
    #[default]
    C,
}

impl Revision {
    /// Value placed in PMC_BOOT bits 7..4
    pub fn boot_nibble(self) -> u32 {
        match self {
            Revision::A => 0,
            Revision::B => 1,
            Revision::C => 2,
        }
    }

    /// CACHE1 ring size in entries
    pub fn cache1_entries(self) -> u32 {
        match self {
            Revision::A | Revision::B => 32,
            Revision::C => 64,
        }
    }

    /// PCI device id
    pub fn pci_device_id(self) -> u16 {
        match self {
            Revision::A | Revision::B => 0x0018,
            Revision::C => 0x0019,
        }
    }
}

/// Host bus the card sits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Pci,
    Agp,
}

/// Reference crystal frequency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crystal {
    #[serde(rename = "13.5mhz")]
    Mhz13_5,
    #[default]
    #[serde(rename = "14.318mhz")]
    Mhz14_318,
}

/// Device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nv3Config {
    pub revision: Revision,
    /// VRAM size in MiB (2, 4 or 8)
    pub vram_size: u32,
    pub bus: BusType,
    pub crystal: Crystal,
    pub vbios_present: bool,
    /// Reset value of PTIMER_NUMERATOR
    pub ptimer_numerator: u32,
    /// Reset value of PTIMER_DENOMINATOR
    pub ptimer_denominator: u32,
    /// Reset value of PGRAPH_FIFO_ACCESS
    pub pgraph_fifo_access: bool,
}

impl Default for Nv3Config {
    fn default() -> Self {
        Self {
            revision: Revision::default(),
            vram_size: 4,
            bus: BusType::default(),
            crystal: Crystal::default(),
            vbios_present: true,
            ptimer_numerator: 1,
            ptimer_denominator: 1,
            pgraph_fifo_access: true,
        }
    }
}

impl Nv3Config {
    /// VRAM size in bytes
    pub fn vram_bytes(&self) -> u32 {
        self.vram_size * 1024 * 1024
    }

    /// Check that the configuration describes a board that existed
    ///
    /// # Errors
    ///
    /// `EmulatorError::InvalidConfig` for unsupported VRAM sizes or a zero
    /// PTIMER ratio term.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.vram_size, 2 | 4 | 8) {
            return Err(EmulatorError::InvalidConfig(format!(
                "vram_size must be 2, 4 or 8 MiB, got {}",
                self.vram_size
            )));
        }
        if self.ptimer_numerator == 0 || self.ptimer_denominator == 0 {
            return Err(EmulatorError::InvalidConfig(
                "PTIMER numerator and denominator must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| EmulatorError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        log::info!(
            "Loaded config from {}: rev {:?}, {} MiB, {:?}",
            path.as_ref().display(),
            config.revision,
            config.vram_size,
            config.bus
        );
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| EmulatorError::ConfigParse(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
