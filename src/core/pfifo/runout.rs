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

//! Runout log handling
//!
//! Rejected submissions are appended to RAMRO at `RUNOUT_PUT`; the driver
//! drains the log and moves `RUNOUT_GET`.

use super::{Pfifo, PfifoIntr};
use crate::core::memory::Vram;
use crate::core::ramin::{RunoutEntry, RunoutReason};

/// `PFIFO_RUNOUT_STATUS` bits
pub mod runout_status {
    pub const RANOUT: u32 = 1 << 0;
    pub const EMPTY: u32 = 1 << 4;
    pub const FULL: u32 = 1 << 8;
}

impl Pfifo {
    pub(super) fn runout_status(&self) -> u32 {
        let mut value = if self.runout_put != self.runout_get {
            runout_status::RANOUT
        } else {
            runout_status::EMPTY
        };
        if ((self.runout_put + 8) & (self.ramro.size - 1)) == self.runout_get {
            value |= runout_status::FULL;
        }
        value
    }

    /// Whether RAMRO holds entries the driver has not consumed
    pub fn runout_pending(&self) -> bool {
        self.runout_put != self.runout_get
    }

    /// Append an entry to RAMRO
    ///
    /// # Arguments
    ///
    /// * `offset` - USER aperture offset of the rejected access
    /// * `raise_runout` - Raise `INTR_RUNOUT` (hash failures are logged
    ///   without it)
    pub(super) fn log_runout(
        &mut self,
        vram: &mut Vram,
        offset: u32,
        data: u32,
        reason: RunoutReason,
        raise_runout: bool,
    ) {
        let entry = RunoutEntry::new(offset, reason, data);
        self.ramro.write_entry(vram, self.runout_put, &entry);
        self.runout_put = (self.runout_put + 8) & self.ramro.pointer_mask();

        log::warn!(
            "PFIFO runout: {:?} ch={} subch={} method=0x{:04X} data=0x{:08X}",
            reason,
            entry.channel(),
            entry.subchannel(),
            entry.method(),
            data
        );

        if raise_runout {
            self.raise(PfifoIntr::RUNOUT);
        }
        if self.runout_put == self.runout_get {
            log::warn!("PFIFO runout log overflow");
            self.raise(PfifoIntr::RUNOUT_OVERFLOW);
        }
    }

    /// Read RAMRO entries between GET and PUT without consuming them
    pub fn runout_entries(&self, vram: &Vram) -> Vec<RunoutEntry> {
        let mut entries = Vec::new();
        let mut pointer = self.runout_get;
        while pointer != self.runout_put {
            entries.push(self.ramro.read_entry(vram, pointer));
            pointer = (pointer + 8) & self.ramro.pointer_mask();
        }
        entries
    }
}
