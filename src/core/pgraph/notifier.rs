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

//! Notifiers
//!
//! A `NOTIFY` method arms a request on the object: PGRAPH writes an
//! "in progress" record through the object's notifier DMA object, and when
//! the next operation on that object completes it writes the final record
//! and raises an interrupt.
//!
//! Record layout (16 bytes):
//!
//! ```text
//! word 0-1: PTIMER nanoseconds
//! word 2:   info32
//! word 3:   15..0 info16 (completing method) | 31..16 status
//! ```
//!
//! Only one request may be pending per object; a second one raises
//! `DOUBLE_NOTIFY` and leaves the first in place.

use super::dma::DmaPort;
use super::{BoundObject, GraphicsBus, Pgraph, PgraphIntr0, PgraphIntr1, PgraphStatus};
use crate::core::ramin::Ramht;
use serde::{Deserialize, Serialize};

/// `PGRAPH_NOTIFY` bit set while a request is pending on the current object
pub const NOTIFY_PENDING: u32 = 1 << 16;
/// `PGRAPH_NOTIFY` bit set for software requests
pub const NOTIFY_SOFTWARE: u32 = 1 << 20;

/// Size of one notification record
pub const NOTIFICATION_SIZE: u32 = 16;

/// Which interrupt a completed request raises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    /// INTR_0 NOTIFY
    Hardware,
    /// INTR_0 SOFTWARE_NOTIFY
    Software,
}

impl NotifyKind {
    pub fn from_parameter(data: u32) -> Self {
        if data & 1 != 0 {
            NotifyKind::Software
        } else {
            NotifyKind::Hardware
        }
    }
}

/// An armed notify request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNotify {
    pub kind: NotifyKind,
    /// Notifier DMA object the record goes to
    pub dma_instance: u16,
    pub info32: u32,
}

/// One notification record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notification {
    pub nanoseconds: u64,
    pub info32: u32,
    pub info16: u16,
    pub status: u16,
}

impl Notification {
    pub const DONE_OK: u16 = 0x0000;
    pub const IN_PROGRESS: u16 = 0x00FF;
    pub const ERROR: u16 = 0x0100;

    pub fn words(&self) -> [u32; 4] {
        [
            self.nanoseconds as u32,
            (self.nanoseconds >> 32) as u32,
            self.info32,
            self.info16 as u32 | ((self.status as u32) << 16),
        ]
    }

    pub fn from_words(words: [u32; 4]) -> Self {
        Self {
            nanoseconds: words[0] as u64 | ((words[1] as u64) << 32),
            info32: words[2],
            info16: (words[3] & 0xFFFF) as u16,
            status: (words[3] >> 16) as u16,
        }
    }
}

impl Pgraph {
    fn write_notification(
        &mut self,
        bus: &mut GraphicsBus,
        dma_instance: u16,
        record: &Notification,
    ) -> bool {
        self.status.set(PgraphStatus::DMA_NOTIFY, true);
        let mut ok = true;
        for (i, word) in record.words().iter().enumerate() {
            ok = self.dma_write32(bus, DmaPort::Notify, dma_instance, i as u32 * 4, *word);
            if !ok {
                break;
            }
        }
        self.update_notify_status();
        ok
    }

    fn update_notify_status(&mut self) {
        let busy = !self.pending_notifies.is_empty();
        self.status.set(PgraphStatus::PORT_NOTIFY, busy);
        self.status.set(PgraphStatus::DMA_NOTIFY, busy);
    }

    /// `NOTIFY` method
    pub(crate) fn request_notify(&mut self, bus: &mut GraphicsBus, bound: &BoundObject, data: u32) {
        let instance = bound.instance();
        if self.pending_notifies.contains_key(&instance) {
            log::warn!(
                "PGRAPH: notify already pending on instance 0x{:04X}",
                instance
            );
            self.raise_1(PgraphIntr1::DOUBLE_NOTIFY);
            return;
        }

        let kind = NotifyKind::from_parameter(data);
        let dma_instance = bound.object.notify_instance();
        let record = Notification {
            nanoseconds: bus.time,
            info32: data,
            info16: 0,
            status: Notification::IN_PROGRESS,
        };

        self.pending_notifies.insert(
            instance,
            PendingNotify {
                kind,
                dma_instance,
                info32: data,
            },
        );
        self.notify = NOTIFY_PENDING
            | if kind == NotifyKind::Software {
                NOTIFY_SOFTWARE
            } else {
                0
            };

        if !self.write_notification(bus, dma_instance, &record) {
            self.pending_notifies.remove(&instance);
            self.notify = 0;
            self.update_notify_status();
            return;
        }
        log::debug!(
            "PGRAPH: {:?} notify armed on instance 0x{:04X} (DMA 0x{:04X})",
            kind,
            instance,
            dma_instance
        );
    }

    /// Finish the request pending on an object after an operation completed
    pub(crate) fn complete_notify(&mut self, bus: &mut GraphicsBus, bound: &BoundObject, method: u32) {
        let Some(pending) = self.pending_notifies.remove(&bound.instance()) else {
            return;
        };

        let record = Notification {
            nanoseconds: bus.time,
            info32: pending.info32,
            info16: method as u16,
            status: Notification::DONE_OK,
        };
        self.notify = 0;
        if self.write_notification(bus, pending.dma_instance, &record) {
            self.raise_0(match pending.kind {
                NotifyKind::Hardware => PgraphIntr0::NOTIFY,
                NotifyKind::Software => PgraphIntr0::SOFTWARE_NOTIFY,
            });
        }
        log::debug!(
            "PGRAPH: notify completed on instance 0x{:04X} by method 0x{:04X}",
            bound.instance(),
            method
        );
    }

    /// Drop a pending request without writing a record
    pub(crate) fn cancel_notify(&mut self, instance: u16) {
        if self.pending_notifies.remove(&instance).is_some() {
            log::debug!("PGRAPH: notify cancelled on instance 0x{:04X}", instance);
            self.update_notify_status();
        }
    }

    /// `SET_CONTEXT_DMA_NOTIFY`: bind a notifier by object name
    pub(crate) fn set_context_dma_notify(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        name: u32,
    ) {
        let mut object = bound.object;
        if name == 0 {
            object.words[1] = 0;
        } else {
            let found = Ramht::new(bus.vram, bus.ramht).find(name, bound.channel);
            match found {
                Some(entry) => object.words[1] = entry.context.ramin_offset() as u32,
                None => {
                    self.invalid_data(bound, "SET_CONTEXT_DMA_NOTIFY", name);
                    return;
                }
            }
        }
        object.write(bus.vram, bound.instance_address);
        log::debug!(
            "PGRAPH: instance 0x{:04X} notifier = 0x{:04X}",
            bound.instance(),
            object.words[1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_words() {
        let record = Notification {
            nanoseconds: 0x1_0000_0020,
            info32: 0xCAFE,
            info16: 0x0104,
            status: Notification::IN_PROGRESS,
        };
        let words = record.words();
        assert_eq!(words, [0x20, 1, 0xCAFE, 0x00FF_0104]);
        assert_eq!(Notification::from_words(words), record);
    }

    #[test]
    fn test_notify_kind() {
        assert_eq!(NotifyKind::from_parameter(0), NotifyKind::Hardware);
        assert_eq!(NotifyKind::from_parameter(1), NotifyKind::Software);
    }
}
