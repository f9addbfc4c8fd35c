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

//! NV3 device context
//!
//! [`Nv3`] owns every block of the card and is the single entry point the
//! host uses: BAR0 reads and writes, the PTIMER clock, the vblank edge and the
//! interrupt line. It replaces a process-wide device global with a value that
//! is passed by reference, so any number of cards can exist side by side.
//!
//! # Access flow
//!
//! ```text
//! write32(addr) ──► identify_subsystem(addr)
//!                     │
//!                     ├─ PMC/PBUS/PTIMER/PFB/PEXTDEV ─► MmioDevice
//!                     ├─ PFIFO regs / USER ──────────► Pfifo ─┐
//!                     ├─ PGRAPH regs ────────────────► Pgraph │
//!                     ├─ class windows ──► execute_window_write│
//!                     ├─ PNVM / RAMIN ───────────────► Vram   │
//!                     └─ open bus / unmapped ─► log           │
//!                                                             ▼
//!                          process_fifo(): DMA pusher ─► puller ─► Pgraph::execute
//!                                                             │
//!                          update_interrupts(): block summaries ─► PMC_INTR
//! ```
//!
//! Reading `PMC_INTR` acknowledges the blocks it reports, so the value a
//! driver's interrupt handler reads is cleared at PFIFO, PGRAPH, PTIMER and
//! PBUS as well. [`Nv3::peek32`] observes without acknowledging.
//!
//! Every access runs to completion before it returns. A USER write that
//! queues a method has already been pulled and executed (if the puller is
//! enabled) by the time `write32` returns.
//!
//! # Example
//!
//! ```
//! use nv3rx::core::config::Nv3Config;
//! use nv3rx::core::system::Nv3;
//!
//! let mut nv3 = Nv3::new(Nv3Config::default())?;
//! assert_eq!(nv3.read32(0x000000), 0x0003_0120);
//!
//! nv3.write32(0x1C0_3000, 0xDEAD_BEEF);
//! assert_eq!(nv3.read_ramin32(0x3000)?, 0xDEAD_BEEF);
//! # Ok::<(), nv3rx::core::error::EmulatorError>(())
//! ```

mod trace;

pub use trace::{MmioTrace, ReplayReport, TraceMismatch, TraceOp};

use super::bus::{Pbus, Pextdev, Pfb};
use super::config::Nv3Config;
use super::error::{EmulatorError, Result};
use super::interrupt::{Pmc, PmcEnable, PmcIntr};
use super::memory::{
    identify_subsystem, merge_lanes, HostMemory, MmioDevice, OpenBus, Subsystem, Vram,
    PGRAPH_REGISTER_END, PNVM_START, RAMIN_START, USER_START,
};
use super::pfifo::Pfifo;
use super::pgraph::{GraphicsBus, Pgraph, RenderOp};
use super::ramin::{
    RaminContext, RamhtMut, RunoutEntry, FIFO_CHANNELS, RAMIN_WINDOW_SIZE,
};
use super::timer::Ptimer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Save state format revision
const SAVE_STATE_VERSION: u32 = 1;

/// Upper bound on FIFO work done by one `process_fifo` call
///
/// Each pull consumes an entry and each DMA fetch consumes pusher length, so
/// the loop terminates on its own; the bound only caps a guest that keeps a
/// huge DMA buffer streaming.
const MAX_FIFO_STEPS: usize = 1 << 20;

/// NV3 / RIVA 128 device
pub struct Nv3 {
    config: Nv3Config,
    vram: Vram,
    host: Box<dyn HostMemory>,
    pmc: Pmc,
    pbus: Pbus,
    pfifo: Pfifo,
    ptimer: Ptimer,
    pfb: Pfb,
    pextdev: Pextdev,
    pgraph: Pgraph,
}

#[derive(Serialize)]
struct SaveStateRef<'a> {
    version: u32,
    config: &'a Nv3Config,
    vram: &'a Vram,
    pmc: &'a Pmc,
    pbus: &'a Pbus,
    pfifo: &'a Pfifo,
    ptimer: &'a Ptimer,
    pfb: &'a Pfb,
    pextdev: &'a Pextdev,
    pgraph: &'a Pgraph,
}

#[derive(Deserialize)]
struct SaveState {
    version: u32,
    config: Nv3Config,
    vram: Vram,
    pmc: Pmc,
    pbus: Pbus,
    pfifo: Pfifo,
    ptimer: Ptimer,
    pfb: Pfb,
    pextdev: Pextdev,
    pgraph: Pgraph,
}

impl Nv3 {
    /// Create a card in its power-on state
    ///
    /// No system memory is attached; PCI/AGP DMA aborts until
    /// [`Nv3::attach_host`] is called.
    ///
    /// # Errors
    ///
    /// `EmulatorError::InvalidConfig` if the configuration fails validation.
    pub fn new(config: Nv3Config) -> Result<Self> {
        Self::with_host(config, Box::new(OpenBus))
    }

    /// Create a card with system memory attached
    pub fn with_host(config: Nv3Config, host: Box<dyn HostMemory>) -> Result<Self> {
        config.validate()?;

        let nv3 = Self {
            vram: Vram::new(config.vram_bytes()),
            host,
            pmc: Pmc::new(config.revision),
            pbus: Pbus::new(config.revision, config.bus),
            pfifo: Pfifo::new(&config),
            ptimer: Ptimer::new(config.ptimer_numerator, config.ptimer_denominator),
            pfb: Pfb::new(config.vram_bytes()),
            pextdev: Pextdev::new(&config),
            pgraph: Pgraph::new(config.pgraph_fifo_access),
            config,
        };

        log::info!(
            "NV3 rev {:?}: {} MiB VRAM, {:?} bus, CACHE1 {} entries",
            nv3.config.revision,
            nv3.config.vram_size,
            nv3.config.bus,
            nv3.config.revision.cache1_entries()
        );
        Ok(nv3)
    }

    /// Reset every block
    ///
    /// VRAM (and with it RAMIN) keeps its contents, as on a PCI reset.
    pub fn reset(&mut self) {
        self.pmc.reset();
        self.pbus.reset();
        self.pfifo.reset();
        self.ptimer.reset();
        self.pfb.reset();
        self.pextdev.reset();
        self.pgraph.reset();
        self.update_interrupts();
        log::info!("NV3 reset");
    }

    /// Replace the system memory reached by PCI/AGP DMA
    pub fn attach_host(&mut self, host: Box<dyn HostMemory>) {
        self.host = host;
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &Nv3Config {
        &self.config
    }

    pub fn vram(&self) -> &Vram {
        &self.vram
    }

    pub fn vram_mut(&mut self) -> &mut Vram {
        &mut self.vram
    }

    pub fn host_mut(&mut self) -> &mut dyn HostMemory {
        self.host.as_mut()
    }

    pub fn pmc(&self) -> &Pmc {
        &self.pmc
    }

    pub fn pfifo(&self) -> &Pfifo {
        &self.pfifo
    }

    pub fn pgraph(&self) -> &Pgraph {
        &self.pgraph
    }

    pub fn ptimer(&self) -> &Ptimer {
        &self.ptimer
    }

    /// Decoded RAMRO entries between RUNOUT_GET and RUNOUT_PUT
    pub fn runout_entries(&self) -> Vec<RunoutEntry> {
        self.pfifo.runout_entries(&self.vram)
    }

    /// Take the render operations recorded for an external rasterizer
    pub fn drain_render_ops(&mut self) -> Vec<RenderOp> {
        self.pgraph.drain_render_ops()
    }

    /// Whether the PCI interrupt line is asserted
    pub fn irq_asserted(&self) -> bool {
        self.pmc.irq_asserted()
    }

    // ------------------------------------------------------------------------
    // BAR0 reads
    // ------------------------------------------------------------------------

    pub fn read32(&mut self, addr: u32) -> u32 {
        let value = self.read_dword(addr & !0x3);
        log::trace!("BAR0 read32 0x{:06X} = 0x{:08X}", addr, value);
        value
    }

    pub fn read16(&mut self, addr: u32) -> u16 {
        let shift = (addr & 0x2) * 8;
        ((self.read_dword(addr & !0x3) >> shift) & 0xFFFF) as u16
    }

    pub fn read8(&mut self, addr: u32) -> u8 {
        let shift = (addr & 0x3) * 8;
        ((self.read_dword(addr & !0x3) >> shift) & 0xFF) as u8
    }

    /// Read a dword without side effects
    ///
    /// Used by debuggers and the replay tool to dump state.
    ///
    /// # Errors
    ///
    /// `EmulatorError::UnmappedAddress` if no block decodes `addr`.
    pub fn peek32(&self, addr: u32) -> Result<u32> {
        let addr = addr & !0x3;
        let value = match identify_subsystem(addr) {
            Subsystem::Pmc => self.pmc.peek32(addr),
            Subsystem::Pbus => self.pbus.peek32(addr),
            Subsystem::Pfifo => self.pfifo.peek32(addr),
            Subsystem::Ptimer => self.ptimer.peek32(addr),
            Subsystem::Pfb => self.pfb.peek32(addr),
            Subsystem::Pextdev => self.pextdev.peek32(addr),
            Subsystem::Pgraph if addr <= PGRAPH_REGISTER_END => self.pgraph.peek32(addr),
            Subsystem::Pgraph => 0,
            Subsystem::User => self.pfifo.user_read(addr - USER_START),
            Subsystem::Pnvm => self.vram.read32(self.pnvm_offset(addr)),
            Subsystem::Ramin => self.vram.ramin_read32(addr - RAMIN_START),
            Subsystem::OpenBus(_) => 0,
            Subsystem::Unmapped => return Err(EmulatorError::UnmappedAddress { address: addr }),
        };
        Ok(value)
    }

    fn read_dword(&mut self, addr: u32) -> u32 {
        match identify_subsystem(addr) {
            Subsystem::Pmc => {
                let value = self.pmc.read32(addr);
                self.acknowledge_sources();
                value
            }
            Subsystem::Pbus => self.pbus.read32(addr),
            Subsystem::Pfifo => {
                if self.pmc.is_enabled(PmcEnable::PFIFO) {
                    self.pfifo.read32(addr)
                } else {
                    log::debug!("PFIFO disabled, read 0x{:06X} returns 0", addr);
                    0
                }
            }
            Subsystem::Ptimer => self.ptimer.read32(addr),
            Subsystem::Pfb => self.pfb.read32(addr),
            Subsystem::Pextdev => self.pextdev.read32(addr),
            Subsystem::Pgraph => {
                if !self.pmc.is_enabled(PmcEnable::PGRAPH) {
                    log::debug!("PGRAPH disabled, read 0x{:06X} returns 0", addr);
                    0
                } else if addr <= PGRAPH_REGISTER_END {
                    self.pgraph.read32(addr)
                } else {
                    log::trace!("PGRAPH: read from class window 0x{:06X}", addr);
                    0
                }
            }
            Subsystem::User => self.pfifo.user_read(addr - USER_START),
            Subsystem::Pnvm => self.vram.read32(self.pnvm_offset(addr)),
            Subsystem::Ramin => self.vram.ramin_read32(addr - RAMIN_START),
            Subsystem::OpenBus(name) => {
                log::trace!("{}: open bus read 0x{:06X}", name, addr);
                0
            }
            Subsystem::Unmapped => {
                log::warn!("Read from unmapped BAR0 address 0x{:08X}", addr);
                0
            }
        }
    }

    // ------------------------------------------------------------------------
    // BAR0 writes
    // ------------------------------------------------------------------------

    pub fn write32(&mut self, addr: u32, value: u32) {
        log::trace!("BAR0 write32 0x{:06X} = 0x{:08X}", addr, value);
        self.write_lanes(addr & !0x3, value, 0xFFFF_FFFF);
    }

    pub fn write16(&mut self, addr: u32, value: u16) {
        let shift = (addr & 0x2) * 8;
        self.write_lanes(addr & !0x3, (value as u32) << shift, 0xFFFFu32 << shift);
    }

    pub fn write8(&mut self, addr: u32, value: u8) {
        let shift = (addr & 0x3) * 8;
        self.write_lanes(addr & !0x3, (value as u32) << shift, 0xFFu32 << shift);
    }

    fn write_lanes(&mut self, addr: u32, value: u32, mask: u32) {
        let subsystem = identify_subsystem(addr);
        match subsystem {
            Subsystem::Pmc => self.pmc.write_masked(addr, value, mask),
            Subsystem::Pbus => self.pbus.write_masked(addr, value, mask),
            Subsystem::Pfifo => {
                if self.pmc.is_enabled(PmcEnable::PFIFO) {
                    self.pfifo.write_masked(addr, value, mask);
                } else {
                    log::debug!("PFIFO disabled, write 0x{:06X} dropped", addr);
                }
            }
            Subsystem::Ptimer => self.ptimer.write_masked(addr, value, mask),
            Subsystem::Pfb => self.pfb.write_masked(addr, value, mask),
            Subsystem::Pextdev => self.pextdev.write_masked(addr, value, mask),
            Subsystem::Pgraph => {
                if !self.pmc.is_enabled(PmcEnable::PGRAPH) {
                    log::debug!("PGRAPH disabled, write 0x{:06X} dropped", addr);
                } else if addr <= PGRAPH_REGISTER_END {
                    self.pgraph.write_masked(addr, value, mask);
                } else {
                    let mut bus = GraphicsBus {
                        vram: &mut self.vram,
                        host: self.host.as_mut(),
                        ramht: self.pfifo.ramht_config(),
                        time: self.ptimer.time(),
                        bytes_per_pixel: self.pfb.bytes_per_pixel(),
                    };
                    self.pgraph.execute_window_write(&mut bus, addr, value & mask);
                }
            }
            Subsystem::User => {
                if self.pmc.is_enabled(PmcEnable::PFIFO) {
                    self.pfifo
                        .user_write(&mut self.vram, addr - USER_START, value & mask);
                } else {
                    log::debug!("PFIFO disabled, USER write 0x{:06X} dropped", addr);
                }
            }
            Subsystem::Pnvm => {
                let offset = self.pnvm_offset(addr);
                let merged = merge_lanes(self.vram.read32(offset), value, mask);
                self.vram.write32(offset, merged);
            }
            Subsystem::Ramin => {
                let offset = addr - RAMIN_START;
                let merged = merge_lanes(self.vram.ramin_read32(offset), value, mask);
                self.vram.ramin_write32(offset, merged);
            }
            Subsystem::OpenBus(name) => {
                log::debug!("{}: open bus write 0x{:06X} = 0x{:08X} dropped", name, addr, value);
            }
            Subsystem::Unmapped => {
                log::warn!(
                    "Write to unmapped BAR0 address 0x{:08X} = 0x{:08X}",
                    addr,
                    value
                );
            }
        }

        if matches!(
            subsystem,
            Subsystem::Pfifo | Subsystem::User | Subsystem::Pgraph
        ) {
            self.process_fifo();
        } else {
            self.update_interrupts();
        }
    }

    fn pnvm_offset(&self, addr: u32) -> u32 {
        (addr - PNVM_START) & (self.vram.size() - 1)
    }

    // ------------------------------------------------------------------------
    // FIFO, time and interrupts
    // ------------------------------------------------------------------------

    /// Run the DMA pusher and the puller until neither makes progress
    ///
    /// # Returns
    ///
    /// Number of methods executed by PGRAPH.
    pub fn process_fifo(&mut self) -> usize {
        let mut executed = 0;

        if self.pmc.is_enabled(PmcEnable::PFIFO) {
            for _ in 0..MAX_FIFO_STEPS {
                let fetched = self.pfifo.dma_step(&self.vram, self.host.as_mut());

                let pulled = if self.pmc.is_enabled(PmcEnable::PGRAPH) {
                    self.pfifo.pull(&mut self.vram, self.pgraph.fifo_access())
                } else {
                    None
                };

                match pulled {
                    Some(method) => {
                        let mut bus = GraphicsBus {
                            vram: &mut self.vram,
                            host: self.host.as_mut(),
                            ramht: self.pfifo.ramht_config(),
                            time: self.ptimer.time(),
                            bytes_per_pixel: self.pfb.bytes_per_pixel(),
                        };
                        self.pgraph.execute(&mut bus, &method);
                        executed += 1;
                    }
                    None if fetched => {}
                    None => break,
                }
            }
        }

        self.update_interrupts();
        executed
    }

    /// Advance PTIMER
    ///
    /// # Arguments
    ///
    /// * `ns` - Elapsed host time in nanoseconds
    pub fn tick(&mut self, ns: u64) {
        self.ptimer.tick(ns);
        self.process_fifo();
    }

    /// Start of a display frame
    pub fn vblank(&mut self) {
        self.pgraph.vblank();
        self.update_interrupts();
    }

    /// Refresh the PMC_INTR summary bits from every block
    fn update_interrupts(&mut self) {
        self.pmc
            .set_source(PmcIntr::PFIFO, self.pfifo.interrupt_pending());
        self.pmc
            .set_source(PmcIntr::PGRAPH0, self.pgraph.interrupt_pending_0());
        self.pmc
            .set_source(PmcIntr::PGRAPH1, self.pgraph.interrupt_pending_1());
        self.pmc
            .set_source(PmcIntr::PTIMER, self.ptimer.interrupt_pending());
        self.pmc.set_source(PmcIntr::PBUS, self.pbus.interrupt_pending());
    }

    /// Clear the status bits of every block whose PMC_INTR bit was read
    fn acknowledge_sources(&mut self) {
        let acknowledged = self.pmc.take_acknowledged();
        if acknowledged.is_empty() {
            return;
        }
        if acknowledged.contains(PmcIntr::PFIFO) {
            self.pfifo.acknowledge_pending();
        }
        if acknowledged.contains(PmcIntr::PGRAPH0) {
            self.pgraph.acknowledge_pending_0();
        }
        if acknowledged.contains(PmcIntr::PGRAPH1) {
            self.pgraph.acknowledge_pending_1();
        }
        if acknowledged.contains(PmcIntr::PTIMER) {
            self.ptimer.acknowledge_pending();
        }
        if acknowledged.contains(PmcIntr::PBUS) {
            self.pbus.acknowledge_pending();
        }
        self.update_interrupts();
    }

    // ------------------------------------------------------------------------
    // Host helpers
    // ------------------------------------------------------------------------

    /// Bind an object name in RAMHT, as the driver's resource manager does
    ///
    /// # Arguments
    ///
    /// * `name` - Handle the client will pass to SET_OBJECT
    /// * `channel` - Owning FIFO channel
    /// * `class_id` - Object class
    /// * `instance` - Instance address in 16-byte units
    /// * `hardware` - `false` for objects emulated by the driver
    ///
    /// # Returns
    ///
    /// The RAMHT slot written.
    ///
    /// # Errors
    ///
    /// `EmulatorError::InvalidChannel` for channels past 7,
    /// `EmulatorError::RamhtFull` if the table has no room.
    pub fn create_object(
        &mut self,
        name: u32,
        channel: u8,
        class_id: u8,
        instance: u16,
        hardware: bool,
    ) -> Result<u32> {
        if channel as usize >= FIFO_CHANNELS {
            return Err(EmulatorError::InvalidChannel { channel });
        }
        let context = RaminContext::new(instance, class_id, hardware, channel);
        RamhtMut::new(&mut self.vram, self.pfifo.ramht_config()).insert(name, channel, context)
    }

    /// Write a dword at a RAMIN offset
    ///
    /// # Errors
    ///
    /// `EmulatorError::UnalignedAccess` or `EmulatorError::InvalidMemoryAccess`
    /// for offsets outside the RAMIN window.
    pub fn write_ramin32(&mut self, offset: u32, value: u32) -> Result<()> {
        Self::check_ramin(offset)?;
        self.vram.ramin_write32(offset, value);
        Ok(())
    }

    /// Read a dword at a RAMIN offset
    pub fn read_ramin32(&self, offset: u32) -> Result<u32> {
        Self::check_ramin(offset)?;
        Ok(self.vram.ramin_read32(offset))
    }

    fn check_ramin(offset: u32) -> Result<()> {
        if offset & 0x3 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: RAMIN_START + offset,
                size: 4,
            });
        }
        if offset >= RAMIN_WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: RAMIN_START.wrapping_add(offset),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Save states
    // ------------------------------------------------------------------------

    /// Serialize the whole card (host memory excluded)
    ///
    /// # Errors
    ///
    /// `EmulatorError::SaveState` if encoding fails.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let state = SaveStateRef {
            version: SAVE_STATE_VERSION,
            config: &self.config,
            vram: &self.vram,
            pmc: &self.pmc,
            pbus: &self.pbus,
            pfifo: &self.pfifo,
            ptimer: &self.ptimer,
            pfb: &self.pfb,
            pextdev: &self.pextdev,
            pgraph: &self.pgraph,
        };
        let bytes = bincode::serde::encode_to_vec(&state, bincode::config::standard())
            .map_err(|e| EmulatorError::SaveState(e.to_string()))?;
        log::info!("Save state: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Restore a state produced by [`Nv3::save_state`]
    ///
    /// The attached host memory is kept. On error the device is unchanged.
    ///
    /// # Errors
    ///
    /// `EmulatorError::SaveState` for corrupt data, a different format
    /// revision or VRAM that does not match the saved configuration.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<()> {
        let (state, _): (SaveState, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| EmulatorError::SaveState(e.to_string()))?;

        if state.version != SAVE_STATE_VERSION {
            return Err(EmulatorError::SaveState(format!(
                "unsupported save state version {}",
                state.version
            )));
        }
        state.config.validate()?;
        if state.vram.size() != state.config.vram_bytes() {
            return Err(EmulatorError::SaveState(format!(
                "VRAM size 0x{:X} does not match configuration",
                state.vram.size()
            )));
        }

        self.config = state.config;
        self.vram = state.vram;
        self.pmc = state.pmc;
        self.pbus = state.pbus;
        self.pfifo = state.pfifo;
        self.ptimer = state.ptimer;
        self.pfb = state.pfb;
        self.pextdev = state.pextdev;
        self.pgraph = state.pgraph;
        self.update_interrupts();
        log::info!("Save state restored");
        Ok(())
    }

    /// Write a save state to a file
    pub fn save_state_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.save_state()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a save state from a file
    pub fn load_state_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_state(&bytes)
    }
}

#[cfg(test)]
mod tests;
