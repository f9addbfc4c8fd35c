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

//! PFB: framebuffer interface
//!
//! ```text
//! PFB_BOOT      1..0 RAM amount (0=8MB 1=2MB 2=4MB)
//!               2    RAM width (1 = 128-bit)
//!               3    banks (1 = 4 banks)
//! PFB_CONFIG_0  5..0 horizontal resolution / 32
//!               9..8 pixel depth (1=8bpp 2=16bpp 3=32bpp)
//!               12   always set
//! ```

use crate::core::memory::MmioDevice;
use serde::{Deserialize, Serialize};

pub const PFB_BOOT: u32 = 0x100000;
pub const PFB_CONFIG_0: u32 = 0x100200;
pub const PFB_CONFIG_1: u32 = 0x100204;

const CONFIG_0_WRITE_MASK: u32 = 0x33F;
const CONFIG_0_FIXED: u32 = 0x1000;

/// Framebuffer interface block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pfb {
    boot: u32,
    config_0: u32,
    config_1: u32,
}

impl Pfb {
    /// Create the block for a board with `vram_bytes` of memory
    pub fn new(vram_bytes: u32) -> Self {
        let amount = match vram_bytes >> 20 {
            2 => 1,
            4 => 2,
            _ => 0,
        };
        let banks = if vram_bytes >= 4 << 20 { 1 << 3 } else { 0 };
        Self {
            boot: amount | (1 << 2) | banks,
            // 640 wide, 16bpp
            config_0: 0x14 | (2 << 8) | CONFIG_0_FIXED,
            config_1: 0,
        }
    }

    pub fn reset(&mut self) {
        let boot = self.boot;
        *self = Self {
            boot,
            config_0: 0x14 | (2 << 8) | CONFIG_0_FIXED,
            config_1: 0,
        };
    }

    /// Horizontal resolution in pixels
    pub fn horizontal_resolution(&self) -> u32 {
        (self.config_0 & 0x3F) << 5
    }

    /// Framebuffer depth in bits per pixel
    ///
    /// Depth selector 0 is not a valid mode; it is treated as 8bpp.
    pub fn bpp(&self) -> u32 {
        match (self.config_0 >> 8) & 3 {
            2 => 16,
            3 => 32,
            _ => 8,
        }
    }

    /// Bytes per framebuffer pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        self.bpp() / 8
    }
}

impl MmioDevice for Pfb {
    fn address_range(&self) -> (u32, u32) {
        (0x100000, 0x100FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PFB_BOOT => self.boot,
            PFB_CONFIG_0 => self.config_0,
            PFB_CONFIG_1 => self.config_1,
            _ => {
                log::warn!("PFB: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match addr {
            PFB_BOOT => log::debug!("PFB: BOOT is read-only"),
            PFB_CONFIG_0 => {
                self.config_0 = (value & CONFIG_0_WRITE_MASK) | CONFIG_0_FIXED;
                log::debug!(
                    "PFB: CONFIG_0 = 0x{:08X} ({} wide, {}bpp)",
                    self.config_0,
                    self.horizontal_resolution(),
                    self.bpp()
                );
            }
            PFB_CONFIG_1 => self.config_1 = value,
            _ => log::warn!(
                "PFB: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn name(&self) -> &str {
        "PFB"
    }
}
