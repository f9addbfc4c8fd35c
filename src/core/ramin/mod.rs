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

//! RAMIN: instance memory
//!
//! RAMIN is the 4MB BAR0 window at `0x1C00000` that aliases the top of VRAM
//! in reversed 16-byte paragraphs. The FIFO and PGRAPH keep all of their
//! in-memory structures here.
//!
//! ## Default layout
//!
//! | Range           | Area   | Contents                              |
//! |-----------------|--------|---------------------------------------|
//! | 0x0000-0x0FFF   | RAMHT  | Object hash table (4KB by default)    |
//! | 0x1000-0x1BFF   | RAMAU  | Audio scratch (unused by the core)    |
//! | 0x1C00-0x1DFF   | RAMFC  | Saved FIFO contexts                   |
//! | 0x1E00-0x1FFF   | RAMRO  | Runout log                            |
//! | 0x2000-0x2FFF   | RAMRM  | Reserved                              |
//! | 0x3000-         | -      | Object instances                      |
//!
//! The RAMHT, RAMFC and RAMRO bases move with their PFIFO registers; RAMAU
//! and RAMRM do not.

mod context;
mod object;
mod ramfc;
mod ramht;
mod ramro;

pub use context::RaminContext;
pub use object::{DmaAddress, DmaFault, DmaObject, DmaTarget, GraphicsObject};
pub use ramfc::{ChannelContext, RamfcConfig, FIFO_CHANNELS, RAMFC_CHANNEL_SIZE};
pub use ramht::{ramht_hash, Ramht, RamhtConfig, RamhtEntry, RamhtMut, RamhtSize, RAMHT_ENTRY_SIZE};
pub use ramro::{RamroConfig, RunoutEntry, RunoutReason};

/// Size of the RAMIN BAR0 window
pub const RAMIN_WINDOW_SIZE: u32 = 0x40_0000;

pub const RAMHT_DEFAULT_BASE: u32 = 0x0000;
pub const RAMAU_START: u32 = 0x1000;
pub const RAMAU_END: u32 = 0x1BFF;
pub const RAMFC_DEFAULT_BASE: u32 = 0x1C00;
pub const RAMRO_DEFAULT_BASE: u32 = 0x1E00;
pub const RAMRM_START: u32 = 0x2000;
pub const RAMRM_END: u32 = 0x2FFF;

/// Structure a RAMIN offset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaminArea {
    Ramht,
    Ramau,
    Ramfc,
    Ramro,
    Ramrm,
    Instance,
}

/// Current placement of the relocatable RAMIN structures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaminLayout {
    pub ramht: RamhtConfig,
    pub ramfc: RamfcConfig,
    pub ramro: RamroConfig,
}

impl RaminLayout {
    /// Classify a RAMIN offset
    ///
    /// Relocatable structures take priority over the fixed areas, so a RAMHT
    /// grown to 32KB shadows RAMFC at its default base.
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::ramin::{RaminArea, RaminLayout};
    ///
    /// let layout = RaminLayout::default();
    /// assert_eq!(layout.identify(0x0010), RaminArea::Ramht);
    /// assert_eq!(layout.identify(0x1C40), RaminArea::Ramfc);
    /// assert_eq!(layout.identify(0x8000), RaminArea::Instance);
    /// ```
    pub fn identify(&self, offset: u32) -> RaminArea {
        if self.ramht.contains(offset) {
            RaminArea::Ramht
        } else if self.ramfc.contains(offset) {
            RaminArea::Ramfc
        } else if self.ramro.contains(offset) {
            RaminArea::Ramro
        } else if (RAMAU_START..=RAMAU_END).contains(&offset) {
            RaminArea::Ramau
        } else if (RAMRM_START..=RAMRM_END).contains(&offset) {
            RaminArea::Ramrm
        } else {
            RaminArea::Instance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = RaminLayout::default();
        assert_eq!(layout.identify(0x0000), RaminArea::Ramht);
        assert_eq!(layout.identify(0x0FFF), RaminArea::Ramht);
        assert_eq!(layout.identify(0x1000), RaminArea::Ramau);
        assert_eq!(layout.identify(0x1BFF), RaminArea::Ramau);
        assert_eq!(layout.identify(0x1DFF), RaminArea::Ramfc);
        assert_eq!(layout.identify(0x1E00), RaminArea::Ramro);
        assert_eq!(layout.identify(0x1FFF), RaminArea::Ramro);
        assert_eq!(layout.identify(0x2000), RaminArea::Ramrm);
        assert_eq!(layout.identify(0x3000), RaminArea::Instance);
    }

    #[test]
    fn test_relocated_ramro_8k() {
        let layout = RaminLayout {
            ramro: RamroConfig::from_register(0x0001_4000),
            ..Default::default()
        };
        assert_eq!(layout.identify(0x5FFF), RaminArea::Ramro);
        assert_eq!(layout.identify(0x1E00), RaminArea::Instance);
    }
}
