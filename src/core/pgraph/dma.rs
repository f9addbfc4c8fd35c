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

//! PGRAPH access through DMA objects
//!
//! Notifiers and memory-to-memory transfers address memory through DMA
//! objects in RAMIN. Translation faults are reported in `DMA_INTR_0`; a
//! fault on a notifier write additionally sets the NOTIFY bit.

use super::{GraphicsBus, Pgraph, PgraphDmaIntr};
use crate::core::ramin::{DmaAddress, DmaFault, DmaObject, DmaTarget};

impl From<DmaFault> for PgraphDmaIntr {
    fn from(fault: DmaFault) -> Self {
        match fault {
            DmaFault::Instance => PgraphDmaIntr::INSTANCE,
            DmaFault::Present => PgraphDmaIntr::PRESENT,
            DmaFault::Protection => PgraphDmaIntr::PROTECTION,
            DmaFault::Linear => PgraphDmaIntr::LINEAR,
        }
    }
}

/// Which PGRAPH port an access comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DmaPort {
    Notify,
    Transfer,
}

impl Pgraph {
    fn dma_translate(
        bus: &GraphicsBus,
        instance: u16,
        offset: u32,
        write: bool,
    ) -> Result<DmaAddress, DmaFault> {
        let object = DmaObject::read(bus.vram, instance)?;
        let address = object.translate(bus.vram, offset, 4, write)?;
        if address.target == DmaTarget::Cartridge {
            // No cartridge port on this board
            return Err(DmaFault::Instance);
        }
        Ok(address)
    }

    fn dma_fault(&mut self, port: DmaPort, instance: u16, offset: u32, fault: DmaFault) {
        let mut bits = PgraphDmaIntr::from(fault);
        if port == DmaPort::Notify {
            bits |= PgraphDmaIntr::NOTIFY;
        }
        log::warn!(
            "PGRAPH: DMA fault {:?} on instance 0x{:04X} offset 0x{:08X}",
            fault,
            instance,
            offset
        );
        self.raise_dma(bits);
    }

    /// Read a dword through a DMA object
    pub(crate) fn dma_read32(
        &mut self,
        bus: &mut GraphicsBus,
        port: DmaPort,
        instance: u16,
        offset: u32,
    ) -> Option<u32> {
        let result = Self::dma_translate(bus, instance, offset, false).and_then(|address| {
            match address.target {
                DmaTarget::Vram => Ok(bus.vram.read32(address.address)),
                _ => bus.host.read32(address.address).ok_or(DmaFault::Present),
            }
        });
        match result {
            Ok(value) => Some(value),
            Err(fault) => {
                self.dma_fault(port, instance, offset, fault);
                None
            }
        }
    }

    /// Write a dword through a DMA object; returns `false` on a fault
    pub(crate) fn dma_write32(
        &mut self,
        bus: &mut GraphicsBus,
        port: DmaPort,
        instance: u16,
        offset: u32,
        value: u32,
    ) -> bool {
        let result = Self::dma_translate(bus, instance, offset, true).and_then(|address| {
            match address.target {
                DmaTarget::Vram => {
                    bus.vram.write32(address.address, value);
                    Ok(())
                }
                _ => {
                    if bus.host.write32(address.address, value) {
                        Ok(())
                    } else {
                        Err(DmaFault::Present)
                    }
                }
            }
        });
        match result {
            Ok(()) => true,
            Err(fault) => {
                self.dma_fault(port, instance, offset, fault);
                false
            }
        }
    }
}
