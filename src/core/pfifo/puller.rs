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

//! The puller: cache → RAMHT → PGRAPH
//!
//! Each step takes the oldest entry of a cache. Method 0 binds an object to
//! the subchannel: the parameter is an object name, looked up in RAMHT for
//! the cache's channel, and the resulting context is stored in the
//! subchannel's CTX register. Every other method runs against the context
//! already bound to its subchannel.
//!
//! A failed lookup or a context without the hardware bit stops the puller
//! with the entry still queued, so the driver can inspect it, handle it and
//! re-enable pulling.

use super::{cache_error, CacheEntry, CacheId, Pfifo, PfifoIntr, PullControl, PulledMethod};
use crate::core::memory::Vram;
use crate::core::ramin::{Ramht, RaminContext, RunoutReason};

impl Pfifo {
    /// Pull one method from CACHE0 or CACHE1
    ///
    /// CACHE0 is drained first. Nothing is pulled while PGRAPH has closed
    /// `FIFO_ACCESS`.
    ///
    /// # Returns
    ///
    /// The resolved method, or `None` if nothing was dispatched (both caches
    /// idle, pulling disabled or the entry faulted).
    pub fn pull(&mut self, vram: &mut Vram, fifo_access: bool) -> Option<PulledMethod> {
        if !fifo_access {
            return None;
        }
        if !self.cache0.is_empty() && self.cache0.pull.enabled() {
            return self.pull_from(vram, CacheId::Cache0);
        }
        self.pull_from(vram, CacheId::Cache1)
    }

    fn pull_from(&mut self, vram: &mut Vram, cache: CacheId) -> Option<PulledMethod> {
        let (enabled, channel, entry) = match cache {
            CacheId::Cache0 => (
                self.cache0.pull.enabled(),
                self.cache0.chid,
                (!self.cache0.is_empty()).then_some(self.cache0.entry),
            ),
            CacheId::Cache1 => (
                self.cache1.pull.enabled(),
                self.cache1.chid,
                self.cache1.front(),
            ),
        };
        let entry = entry?;
        if !enabled {
            return None;
        }

        let context = if entry.method == 0 {
            let lookup = Ramht::new(vram, self.ramht).find(entry.data, channel);
            match lookup {
                Some(found) => {
                    let cached = found.context.cached();
                    match cache {
                        CacheId::Cache0 => {
                            self.cache0.ctx = cached;
                            self.cache0.pull.pull1 |= PullControl::CTX_DIRTY;
                        }
                        CacheId::Cache1 => {
                            self.cache1.ctx[entry.subchannel as usize] = cached;
                            self.cache1.pull.pull1 |= PullControl::CTX_DIRTY;
                        }
                    }
                    log::debug!(
                        "PFIFO: bound name 0x{:08X} to ch={} subch={} ctx=0x{:08X}",
                        entry.data,
                        channel,
                        entry.subchannel,
                        found.context.raw()
                    );
                    cached
                }
                None => {
                    self.hash_failure(vram, cache, channel, entry);
                    return None;
                }
            }
        } else {
            match cache {
                CacheId::Cache0 => self.cache0.ctx,
                CacheId::Cache1 => self.cache1.ctx[entry.subchannel as usize],
            }
        };

        if context & RaminContext::HARDWARE == 0 {
            self.pull_fault(cache, PullControl::SOFTWARE_METHOD);
            log::debug!(
                "PFIFO: software method ch={} subch={} method=0x{:04X} data=0x{:08X}",
                channel,
                entry.subchannel,
                entry.method,
                entry.data
            );
            return None;
        }

        match cache {
            CacheId::Cache0 => self.cache0.advance_get(),
            CacheId::Cache1 => self.cache1.advance_get(),
        }

        Some(PulledMethod {
            cache,
            channel,
            subchannel: entry.subchannel,
            method: entry.method as u32,
            data: entry.data,
            context: RaminContext(context | ((channel as u32 & 0x7F) << 24)),
        })
    }

    fn pull_fault(&mut self, cache: CacheId, reason: u32) {
        match cache {
            CacheId::Cache0 => {
                self.cache0.pull.fault(reason);
                self.cache_error |= cache_error::CACHE0;
            }
            CacheId::Cache1 => {
                self.cache1.pull.fault(reason);
                self.cache_error |= cache_error::CACHE1;
            }
        }
        self.raise(PfifoIntr::CACHE_ERROR);
    }

    fn hash_failure(&mut self, vram: &mut Vram, cache: CacheId, channel: u8, entry: CacheEntry) {
        log::warn!(
            "PFIFO: RAMHT miss for name 0x{:08X} on ch={} ({:?})",
            entry.data,
            channel,
            cache
        );
        self.pull_fault(cache, PullControl::HASH_FAILURE);

        let offset = ((channel as u32 & 0x7F) << 16) | entry.method_word();
        self.log_runout(vram, offset, entry.data, RunoutReason::IllegalAccess, false);
    }
}
