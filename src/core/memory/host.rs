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

//! Host (system) memory as seen from the card
//!
//! DMA objects targeting PCI or AGP space, and the CACHE1 DMA pusher, reach
//! memory owned by the rest of the emulated machine. That memory is supplied
//! by the embedder through [`HostMemory`].

/// Bus-master access to system memory
///
/// A `None`/`false` result is a master abort and is reported to the guest
/// through the relevant DMA interrupt bit.
pub trait HostMemory {
    /// Read a dword from a physical system address
    fn read32(&mut self, address: u32) -> Option<u32>;

    /// Write a dword to a physical system address
    fn write32(&mut self, address: u32, value: u32) -> bool;
}

/// Host memory that answers nothing
///
/// Used when no system memory is attached; every access aborts.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBus;

impl HostMemory for OpenBus {
    fn read32(&mut self, address: u32) -> Option<u32> {
        log::warn!("Host read from 0x{:08X} with no system memory attached", address);
        None
    }

    fn write32(&mut self, address: u32, _value: u32) -> bool {
        log::warn!("Host write to 0x{:08X} with no system memory attached", address);
        false
    }
}

/// Flat system RAM starting at physical address 0
///
/// # Example
///
/// ```
/// use nv3rx::core::memory::{HostMemory, SystemRam};
///
/// let mut ram = SystemRam::new(0x1000);
/// assert!(ram.write32(0x10, 0xCAFEBABE));
/// assert_eq!(ram.read32(0x10), Some(0xCAFEBABE));
/// assert_eq!(ram.read32(0x1000), None);
/// ```
#[derive(Debug, Clone)]
pub struct SystemRam {
    data: Vec<u8>,
}

impl SystemRam {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Copy a byte slice into RAM (test and loader helper)
    ///
    /// Returns `false` if the slice does not fit.
    pub fn load(&mut self, address: u32, bytes: &[u8]) -> bool {
        let start = address as usize;
        match start.checked_add(bytes.len()) {
            Some(end) if end <= self.data.len() => {
                self.data[start..end].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    fn range(&self, address: u32) -> Option<std::ops::Range<usize>> {
        let start = (address & !3) as usize;
        let end = start.checked_add(4)?;
        (end <= self.data.len()).then_some(start..end)
    }
}

impl HostMemory for SystemRam {
    fn read32(&mut self, address: u32) -> Option<u32> {
        let range = self.range(address)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[range]);
        Some(u32::from_le_bytes(bytes))
    }

    fn write32(&mut self, address: u32, value: u32) -> bool {
        match self.range(address) {
            Some(range) => {
                self.data[range].copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_bus_aborts() {
        let mut bus = OpenBus;
        assert_eq!(bus.read32(0x1000), None);
        assert!(!bus.write32(0x1000, 1));
    }

    #[test]
    fn test_system_ram_bounds() {
        let mut ram = SystemRam::new(16);
        assert!(ram.write32(12, 0x01020304));
        assert_eq!(ram.read32(12), Some(0x01020304));
        assert!(!ram.write32(16, 0));
        assert_eq!(ram.read32(u32::MAX), None);
    }

    #[test]
    fn test_system_ram_load() {
        let mut ram = SystemRam::new(8);
        assert!(ram.load(4, &[0xEF, 0xBE, 0xAD, 0xDE]));
        assert_eq!(ram.read32(4), Some(0xDEADBEEF));
        assert!(!ram.load(6, &[0; 4]));
    }
}
