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

//! Video memory arena
//!
//! A single owned byte buffer backs both the PNVM (direct VRAM) window and the
//! RAMIN window. RAMIN is not a separate allocation: it is the top of VRAM,
//! addressed in reverse 16-byte paragraphs.
//!
//! ```text
//! RAMIN offset                 VRAM offset (4MB card)
//! 0x000000..0x00000F   ->      0x3FFFF0..0x3FFFFF
//! 0x000010..0x00001F   ->      0x3FFFE0..0x3FFFEF
//! ...
//! ```
//!
//! Writes through one window are visible through the other.

use serde::{Deserialize, Serialize};

/// VRAM backing store
#[derive(Clone, Serialize, Deserialize)]
pub struct Vram {
    data: Vec<u8>,

    /// `size - 1`, size is a power of two
    mask: u32,
}

impl Vram {
    /// Create a zeroed VRAM arena
    ///
    /// # Arguments
    ///
    /// * `size` - Size in bytes, must be a power of two
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::memory::Vram;
    ///
    /// let vram = Vram::new(4 * 1024 * 1024);
    /// assert_eq!(vram.size(), 0x400000);
    /// ```
    pub fn new(size: u32) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            data: vec![0; size as usize],
            mask: size - 1,
        }
    }

    /// Size in bytes
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.mask + 1
    }

    /// Clear the whole arena
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline(always)]
    fn index(&self, offset: u32) -> usize {
        (offset & self.mask) as usize
    }

    pub fn read8(&self, offset: u32) -> u8 {
        self.data[self.index(offset)]
    }

    pub fn read16(&self, offset: u32) -> u16 {
        let offset = offset & !1;
        u16::from_le_bytes([self.read8(offset), self.read8(offset + 1)])
    }

    pub fn read32(&self, offset: u32) -> u32 {
        let i = self.index(offset & !3);
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn write8(&mut self, offset: u32, value: u8) {
        let i = self.index(offset);
        self.data[i] = value;
    }

    pub fn write16(&mut self, offset: u32, value: u16) {
        let offset = offset & !1;
        let [lo, hi] = value.to_le_bytes();
        self.write8(offset, lo);
        self.write8(offset + 1, hi);
    }

    pub fn write32(&mut self, offset: u32, value: u32) {
        let i = self.index(offset & !3);
        self.data[i..i + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Translate a RAMIN offset to the VRAM offset that backs it
    ///
    /// # Example
    ///
    /// ```
    /// use nv3rx::core::memory::Vram;
    ///
    /// let vram = Vram::new(4 * 1024 * 1024);
    /// assert_eq!(vram.ramin_to_vram(0x0000), 0x3FFFF0);
    /// assert_eq!(vram.ramin_to_vram(0x0014), 0x3FFFE4);
    /// ```
    #[inline(always)]
    pub fn ramin_to_vram(&self, ramin_offset: u32) -> u32 {
        (ramin_offset ^ (self.mask & !0xF)) & self.mask
    }

    pub fn ramin_read8(&self, offset: u32) -> u8 {
        self.read8(self.ramin_to_vram(offset))
    }

    pub fn ramin_read16(&self, offset: u32) -> u16 {
        self.read16(self.ramin_to_vram(offset))
    }

    pub fn ramin_read32(&self, offset: u32) -> u32 {
        self.read32(self.ramin_to_vram(offset))
    }

    pub fn ramin_write8(&mut self, offset: u32, value: u8) {
        let addr = self.ramin_to_vram(offset);
        self.write8(addr, value);
    }

    pub fn ramin_write16(&mut self, offset: u32, value: u16) {
        let addr = self.ramin_to_vram(offset);
        self.write16(addr, value);
    }

    pub fn ramin_write32(&mut self, offset: u32, value: u32) {
        let addr = self.ramin_to_vram(offset);
        self.write32(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE_4MB: u32 = 4 * 1024 * 1024;

    #[test]
    fn test_little_endian_access() {
        let mut vram = Vram::new(SIZE_4MB);
        vram.write32(0x100, 0x11223344);
        assert_eq!(vram.read8(0x100), 0x44);
        assert_eq!(vram.read8(0x103), 0x11);
        assert_eq!(vram.read16(0x102), 0x1122);

        vram.write16(0x200, 0xBEEF);
        assert_eq!(vram.read32(0x200), 0x0000BEEF);
    }

    #[test]
    fn test_offsets_wrap_at_size() {
        let mut vram = Vram::new(2 * 1024 * 1024);
        vram.write32(0x200000, 0xCAFEBABE);
        assert_eq!(vram.read32(0), 0xCAFEBABE);
    }

    #[test]
    fn test_ramin_maps_to_top_of_vram() {
        let mut vram = Vram::new(SIZE_4MB);
        vram.ramin_write32(0x0, 0xDEADBEEF);
        assert_eq!(vram.read32(SIZE_4MB - 16), 0xDEADBEEF);

        vram.ramin_write32(0x1C04, 0x12345678);
        assert_eq!(vram.read32(vram.ramin_to_vram(0x1C04)), 0x12345678);
        assert_eq!(vram.ramin_read32(0x1C04), 0x12345678);
    }

    #[test]
    fn test_ramin_paragraph_is_contiguous() {
        let mut vram = Vram::new(SIZE_4MB);
        for i in 0..4 {
            vram.ramin_write32(0x40 + i * 4, i + 1);
        }
        let base = vram.ramin_to_vram(0x40);
        for i in 0..4 {
            assert_eq!(vram.read32(base + i * 4), i + 1);
        }
    }

    #[test]
    fn test_ramin_byte_and_word_lanes() {
        let mut vram = Vram::new(SIZE_4MB);
        vram.ramin_write32(0x20, 0xAABBCCDD);
        assert_eq!(vram.ramin_read8(0x21), 0xCC);
        assert_eq!(vram.ramin_read16(0x22), 0xAABB);

        vram.ramin_write8(0x23, 0x00);
        vram.ramin_write16(0x20, 0x1111);
        assert_eq!(vram.ramin_read32(0x20), 0x00BB1111);
    }

    #[test]
    fn test_clear() {
        let mut vram = Vram::new(SIZE_4MB);
        vram.write32(0x40, 1);
        vram.clear();
        assert_eq!(vram.read32(0x40), 0);
    }
}
