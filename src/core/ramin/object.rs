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

//! Object instances stored in RAMIN
//!
//! A RAMHT context points (in 16-byte units) at an instance record. PGRAPH
//! reads four dwords for graphics objects; DMA objects start with the same
//! header followed by a page table.
//!
//! ## Graphics object
//!
//! ```text
//! word 0:  2..0 colour format | 3 alpha enable | 20..16 class
//! word 1:  notifier DMA instance (0 = none)
//! word 2:  source / image DMA instance
//! word 3:  destination DMA instance
//! ```
//!
//! ## DMA object
//!
//! ```text
//! word 0:  17..16 target | 31..20 adjust
//! word 1:  limit (last valid byte offset)
//! word 2+: one PTE per 4KB page: 31..12 frame | 1 writable | 0 present
//! ```

use crate::core::memory::Vram;

/// Graphics object instance as read by PGRAPH
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsObject {
    pub words: [u32; 4],
}

impl GraphicsObject {
    /// Read the instance at a RAMIN byte offset
    pub fn read(vram: &Vram, instance_address: u32) -> Self {
        let mut words = [0u32; 4];
        for (i, word) in words.iter_mut().enumerate() {
            *word = vram.ramin_read32(instance_address + (i as u32) * 4);
        }
        Self { words }
    }

    pub fn write(&self, vram: &mut Vram, instance_address: u32) {
        for (i, &word) in self.words.iter().enumerate() {
            vram.ramin_write32(instance_address + (i as u32) * 4, word);
        }
    }

    #[inline(always)]
    pub fn color_format(&self) -> u32 {
        self.words[0] & 0x7
    }

    #[inline(always)]
    pub fn alpha_enabled(&self) -> bool {
        self.words[0] & 0x8 != 0
    }

    #[inline(always)]
    pub fn class(&self) -> u8 {
        ((self.words[0] >> 16) & 0x1F) as u8
    }

    /// Notifier DMA instance in 16-byte units
    #[inline(always)]
    pub fn notify_instance(&self) -> u16 {
        (self.words[1] & 0xFFFF) as u16
    }

    #[inline(always)]
    pub fn source_instance(&self) -> u16 {
        (self.words[2] & 0xFFFF) as u16
    }

    #[inline(always)]
    pub fn destination_instance(&self) -> u16 {
        (self.words[3] & 0xFFFF) as u16
    }
}

/// Memory a DMA object refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTarget {
    Vram = 0,
    Cartridge = 1,
    Pci = 2,
    Agp = 3,
}

impl DmaTarget {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => DmaTarget::Vram,
            1 => DmaTarget::Cartridge,
            2 => DmaTarget::Pci,
            _ => DmaTarget::Agp,
        }
    }
}

/// DMA fault classes, reported through `PGRAPH_DMA_INTR_0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaFault {
    /// Instance 0 or an instance outside RAMIN
    Instance,
    /// Page table entry without the present bit
    Present,
    /// Write through a read-only page
    Protection,
    /// Access beyond the object's limit
    Linear,
}

/// A translated DMA address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaAddress {
    pub target: DmaTarget,
    pub address: u32,
}

/// DMA object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaObject {
    pub instance: u16,
    pub target: DmaTarget,
    pub adjust: u32,
    pub limit: u32,
}

impl DmaObject {
    const PTE_PRESENT: u32 = 1 << 0;
    const PTE_WRITABLE: u32 = 1 << 1;

    /// Read a DMA object header
    ///
    /// # Errors
    ///
    /// `DmaFault::Instance` for instance 0.
    pub fn read(vram: &Vram, instance: u16) -> std::result::Result<Self, DmaFault> {
        if instance == 0 {
            return Err(DmaFault::Instance);
        }
        let base = (instance as u32) << 4;
        let word0 = vram.ramin_read32(base);
        Ok(Self {
            instance,
            target: DmaTarget::from_bits(word0 >> 16),
            adjust: word0 >> 20,
            limit: vram.ramin_read32(base + 4),
        })
    }

    /// Write a DMA object with a single contiguous range of pages
    ///
    /// Host-side helper used to build objects the way a driver does.
    pub fn write(
        vram: &mut Vram,
        instance: u16,
        target: DmaTarget,
        frame: u32,
        limit: u32,
        writable: bool,
    ) {
        let base = (instance as u32) << 4;
        let adjust = frame & 0xFFF;
        vram.ramin_write32(base, ((target as u32) << 16) | (adjust << 20));
        vram.ramin_write32(base + 4, limit);

        let pages = ((adjust as u64 + limit as u64) / 4096 + 1) as u32;
        for page in 0..pages {
            let mut pte = (frame & !0xFFF).wrapping_add(page.wrapping_mul(4096));
            pte |= Self::PTE_PRESENT;
            if writable {
                pte |= Self::PTE_WRITABLE;
            }
            vram.ramin_write32(base + 8 + page.wrapping_mul(4), pte);
        }
    }

    /// Translate a byte offset within the object
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset from the start of the object
    /// * `len` - Access length in bytes
    /// * `write` - `true` for writes (checks the writable bit)
    pub fn translate(
        &self,
        vram: &Vram,
        offset: u32,
        len: u32,
        write: bool,
    ) -> std::result::Result<DmaAddress, DmaFault> {
        let last = offset
            .checked_add(len.saturating_sub(1))
            .ok_or(DmaFault::Linear)?;
        if last > self.limit {
            return Err(DmaFault::Linear);
        }

        let linear = self.adjust.checked_add(offset).ok_or(DmaFault::Linear)?;
        let page = linear >> 12;
        let pte = vram.ramin_read32(((self.instance as u32) << 4) + 8 + page * 4);

        if pte & Self::PTE_PRESENT == 0 {
            return Err(DmaFault::Present);
        }
        if write && pte & Self::PTE_WRITABLE == 0 {
            return Err(DmaFault::Protection);
        }

        Ok(DmaAddress {
            target: self.target,
            address: (pte & !0xFFF) | (linear & 0xFFF),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vram() -> Vram {
        Vram::new(4 * 1024 * 1024)
    }

    #[test]
    fn test_graphics_object_fields() {
        let mut vram = vram();
        let obj = GraphicsObject {
            words: [0x0007_0009, 0x0000_0200, 0x0300, 0x0400],
        };
        obj.write(&mut vram, 0x1000);

        let read = GraphicsObject::read(&vram, 0x1000);
        assert_eq!(read, obj);
        assert_eq!(read.color_format(), 1);
        assert!(read.alpha_enabled());
        assert_eq!(read.class(), 0x07);
        assert_eq!(read.notify_instance(), 0x200);
        assert_eq!(read.source_instance(), 0x300);
        assert_eq!(read.destination_instance(), 0x400);
    }

    #[test]
    fn test_dma_instance_zero_faults() {
        let vram = vram();
        assert_eq!(DmaObject::read(&vram, 0), Err(DmaFault::Instance));
    }

    #[test]
    fn test_dma_translate_vram() {
        let mut vram = vram();
        DmaObject::write(&mut vram, 0x300, DmaTarget::Vram, 0x0010_0000, 0x0FFF, true);

        let dma = DmaObject::read(&vram, 0x300).unwrap();
        assert_eq!(dma.target, DmaTarget::Vram);
        assert_eq!(dma.limit, 0x0FFF);

        let addr = dma.translate(&vram, 0x10, 16, true).unwrap();
        assert_eq!(addr.address, 0x0010_0010);
        assert_eq!(addr.target, DmaTarget::Vram);
    }

    #[test]
    fn test_dma_adjust_and_second_page() {
        let mut vram = vram();
        DmaObject::write(&mut vram, 0x300, DmaTarget::Pci, 0x0020_0F00, 0x1FFF, false);

        let dma = DmaObject::read(&vram, 0x300).unwrap();
        assert_eq!(dma.adjust, 0xF00);
        let addr = dma.translate(&vram, 0x200, 4, false).unwrap();
        assert_eq!(addr.address, 0x0020_1100);
        assert_eq!(addr.target, DmaTarget::Pci);
    }

    #[test]
    fn test_dma_faults() {
        let mut vram = vram();
        DmaObject::write(&mut vram, 0x300, DmaTarget::Vram, 0x0010_0000, 0xFF, false);
        let dma = DmaObject::read(&vram, 0x300).unwrap();

        assert_eq!(dma.translate(&vram, 0xFC, 8, false), Err(DmaFault::Linear));
        assert_eq!(dma.translate(&vram, 0, 4, true), Err(DmaFault::Protection));

        // Clear the present bit
        let pte = vram.ramin_read32((0x300 << 4) + 8);
        vram.ramin_write32((0x300 << 4) + 8, pte & !1);
        assert_eq!(dma.translate(&vram, 0, 4, false), Err(DmaFault::Present));
    }

    #[test]
    fn test_dma_translate_past_address_space() {
        let mut vram = vram();
        let base = 0x300 << 4;
        vram.ramin_write32(base, ((DmaTarget::Pci as u32) << 16) | (0xF00 << 20));
        vram.ramin_write32(base + 4, 0xFFFF_FFFF);
        vram.ramin_write32(base + 8, 0x0010_0000 | 1);

        let dma = DmaObject::read(&vram, 0x300).unwrap();
        assert_eq!(dma.limit, 0xFFFF_FFFF);
        assert_eq!(dma.translate(&vram, 0xFFFF_F800, 4, false), Err(DmaFault::Linear));
        assert_eq!(dma.translate(&vram, 0x10, 4, false).unwrap().address, 0x0010_0F10);
    }
}
