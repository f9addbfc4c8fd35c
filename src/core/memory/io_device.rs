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

//! MMIO device trait for NV3 register blocks
//!
//! Every register block behind BAR0 (PMC, PBUS, PFIFO, PTIMER, PFB, PEXTDEV,
//! PGRAPH) implements [`MmioDevice`]. The device context routes an access to
//! the block that owns the address and then calls one of the width-specific
//! methods below.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Nv3 (BAR0)                  │
//! ├─────────────────────────────────────────────┤
//! │  address map: sorted [start, end] -> block  │
//! │                                             │
//! │  read32(addr) {                             │
//! │    match identify(addr) {                   │
//! │      Pmc => pmc.read32(addr),               │
//! │      Pfifo => pfifo.read32(addr),           │
//! │      ...                                    │
//! │    }                                        │
//! │  }                                          │
//! └─────────────────────────────────────────────┘
//!           ▲                   ▲
//!           │                   │
//!    ┌──────┴──────┐    ┌──────┴──────┐
//!    │    PMC      │    │   PTIMER    │
//!    │ (MmioDevice)│    │ (MmioDevice)│
//!    └─────────────┘    └─────────────┘
//! ```
//!
//! # Byte lanes
//!
//! The chip accepts byte, word and dword accesses at every address. Sub-dword
//! writes are merged into the aligned dword through [`MmioDevice::write_masked`],
//! which by default performs a read-modify-write using the side-effect free
//! [`MmioDevice::peek32`]. Blocks with write-1-to-clear registers override
//! `write_masked` so that untouched lanes are written as zero instead of
//! being acknowledged by accident.
//!
//! # Example
//!
//! ```
//! use nv3rx::core::memory::MmioDevice;
//!
//! struct Scratch {
//!     value: u32,
//! }
//!
//! impl MmioDevice for Scratch {
//!     fn address_range(&self) -> (u32, u32) {
//!         (0x6000, 0x6003)
//!     }
//!
//!     fn peek32(&self, _addr: u32) -> u32 {
//!         self.value
//!     }
//!
//!     fn write32(&mut self, _addr: u32, value: u32) {
//!         self.value = value;
//!     }
//! }
//!
//! let mut dev = Scratch { value: 0x11223344 };
//! dev.write8(0x6001, 0xAB);
//! assert_eq!(dev.read32(0x6000), 0x1122AB44);
//! assert_eq!(dev.read16(0x6002), 0x1122);
//! ```

/// Merge `value` into `current` for the byte lanes selected by `mask`
///
/// # Example
///
/// ```
/// use nv3rx::core::memory::merge_lanes;
///
/// assert_eq!(merge_lanes(0xAABBCCDD, 0x0000_1100, 0x0000_FF00), 0xAABB11DD);
/// ```
#[inline(always)]
pub fn merge_lanes(current: u32, value: u32, mask: u32) -> u32 {
    (current & !mask) | (value & mask)
}

/// Trait for NV3 memory-mapped register blocks
///
/// Addresses passed to the methods are full BAR0 offsets (for example
/// `0x002100` for `PFIFO_INTR`), so register constants can be matched
/// directly without rebasing.
///
/// MMIO on this chip never faults: unknown registers read as zero and
/// ignore writes, so the methods are infallible.
pub trait MmioDevice {
    /// Get the BAR0 range this block decodes
    ///
    /// # Returns
    ///
    /// `(start, end)` - Start and end offsets (inclusive)
    fn address_range(&self) -> (u32, u32);

    /// Check if this block decodes the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - BAR0 offset to check
    ///
    /// # Returns
    ///
    /// `true` if the address is within this block's range
    fn contains(&self, addr: u32) -> bool {
        let (start, end) = self.address_range();
        addr >= start && addr <= end
    }

    /// Read a dword without side effects
    ///
    /// Used for sub-dword read-modify-write and for debugging. `addr` is
    /// dword aligned.
    fn peek32(&self, addr: u32) -> u32;

    /// Read a dword
    ///
    /// Blocks whose reads have side effects override this; the default
    /// forwards to [`MmioDevice::peek32`].
    fn read32(&mut self, addr: u32) -> u32 {
        self.peek32(addr)
    }

    /// Write a dword
    ///
    /// # Arguments
    ///
    /// * `addr` - Dword aligned BAR0 offset
    /// * `value` - 32-bit value to write
    fn write32(&mut self, addr: u32, value: u32);

    /// Write the byte lanes of `value` selected by `mask`
    ///
    /// The default merges with the current register contents. Blocks with
    /// write-1-to-clear registers override this.
    fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
        let current = self.peek32(addr);
        self.write32(addr, merge_lanes(current, value, mask));
    }

    /// Read a 16-bit value
    ///
    /// # Arguments
    ///
    /// * `addr` - BAR0 offset (2-byte aligned)
    fn read16(&mut self, addr: u32) -> u16 {
        let value = self.read32(addr & !0x03);
        let shift = (addr & 0x02) * 8;
        ((value >> shift) & 0xFFFF) as u16
    }

    /// Write a 16-bit value into the enclosing dword
    ///
    /// # Arguments
    ///
    /// * `addr` - BAR0 offset (2-byte aligned)
    /// * `value` - 16-bit value to write
    fn write16(&mut self, addr: u32, value: u16) {
        let shift = (addr & 0x02) * 8;
        self.write_masked(addr & !0x03, (value as u32) << shift, 0xFFFFu32 << shift);
    }

    /// Read an 8-bit value
    fn read8(&mut self, addr: u32) -> u8 {
        let value = self.read32(addr & !0x03);
        let shift = (addr & 0x03) * 8;
        ((value >> shift) & 0xFF) as u8
    }

    /// Write an 8-bit value into the enclosing dword
    fn write8(&mut self, addr: u32, value: u8) {
        let shift = (addr & 0x03) * 8;
        self.write_masked(addr & !0x03, (value as u32) << shift, 0xFFu32 << shift);
    }

    /// Block name for logging
    fn name(&self) -> &str {
        "Unknown Block"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock block with one plain register and one write-1-to-clear register
    struct MockBlock {
        plain: u32,
        status: u32,
    }

    const PLAIN: u32 = 0x100;
    const STATUS: u32 = 0x104;

    impl MockBlock {
        fn new() -> Self {
            Self {
                plain: 0,
                status: 0,
            }
        }
    }

    impl MmioDevice for MockBlock {
        fn address_range(&self) -> (u32, u32) {
            (0x100, 0x1FF)
        }

        fn peek32(&self, addr: u32) -> u32 {
            match addr {
                PLAIN => self.plain,
                STATUS => self.status,
                _ => 0,
            }
        }

        fn write32(&mut self, addr: u32, value: u32) {
            match addr {
                PLAIN => self.plain = value,
                STATUS => self.status &= !value,
                _ => {}
            }
        }

        fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
            if addr == STATUS {
                self.write32(addr, value & mask);
            } else {
                let current = self.peek32(addr);
                self.write32(addr, merge_lanes(current, value, mask));
            }
        }

        fn name(&self) -> &str {
            "MockBlock"
        }
    }

    #[test]
    fn test_address_range_and_contains() {
        let dev = MockBlock::new();
        assert_eq!(dev.address_range(), (0x100, 0x1FF));
        assert!(dev.contains(0x100));
        assert!(dev.contains(0x1FF));
        assert!(!dev.contains(0x0FF));
        assert!(!dev.contains(0x200));
    }

    #[test]
    fn test_write16_updates_only_its_half() {
        let mut dev = MockBlock::new();
        dev.write32(PLAIN, 0x12345678);

        dev.write16(PLAIN + 2, 0xABCD);
        assert_eq!(dev.read32(PLAIN), 0xABCD5678);

        dev.write16(PLAIN, 0x0000);
        assert_eq!(dev.read32(PLAIN), 0xABCD0000);
    }

    #[test]
    fn test_write8_each_lane() {
        let mut dev = MockBlock::new();
        for lane in 0..4u32 {
            dev.write8(PLAIN + lane, (0x10 + lane) as u8);
        }
        assert_eq!(dev.read32(PLAIN), 0x13121110);
        assert_eq!(dev.read8(PLAIN + 2), 0x12);
        assert_eq!(dev.read16(PLAIN + 2), 0x1312);
    }

    #[test]
    fn test_write8_to_w1c_register_only_clears_its_lane() {
        let mut dev = MockBlock::new();
        dev.status = 0x0101_0101;

        // Acknowledge lane 1 only
        dev.write8(STATUS + 1, 0x01);
        assert_eq!(dev.read32(STATUS), 0x0101_0001);
    }

    #[test]
    fn test_merge_lanes() {
        assert_eq!(merge_lanes(0xFFFF_FFFF, 0, 0x00FF_0000), 0xFF00_FFFF);
        assert_eq!(merge_lanes(0, 0xDEAD_BEEF, 0xFFFF_FFFF), 0xDEAD_BEEF);
    }

    #[test]
    fn test_device_name() {
        assert_eq!(MockBlock::new().name(), "MockBlock");
    }
}
