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

//! PTIMER: nanosecond timebase and alarm
//!
//! PTIMER keeps a free-running 61-bit nanosecond counter and compares its
//! low word against a programmable alarm. PGRAPH stamps notification records
//! with this counter.
//!
//! ## Register Layout
//!
//! ```text
//! 0x009100  INTR         bit 0 ALARM (write 1 to clear)
//! 0x009140  INTR_EN      bit 0 ALARM
//! 0x009200  NUMERATOR    time ratio numerator (0 is treated as 1)
//! 0x009210  DENOMINATOR  time ratio denominator
//! 0x009400  TIME_0       counter bits 31..5 (bits 4..0 read as 0)
//! 0x009410  TIME_1       counter bits 60..32
//! 0x009420  ALARM_0      alarm compare value, bits 31..5
//! ```
//!
//! ## Rate
//!
//! Host time `ns` advances the counter by `ns * DENOMINATOR / NUMERATOR`.
//! The fractional part is carried between ticks so slow ratios do not lose
//! time.

use crate::core::memory::MmioDevice;
use serde::{Deserialize, Serialize};

pub const PTIMER_INTR: u32 = 0x009100;
pub const PTIMER_INTR_EN: u32 = 0x009140;
pub const PTIMER_NUMERATOR: u32 = 0x009200;
pub const PTIMER_DENOMINATOR: u32 = 0x009210;
pub const PTIMER_TIME_0: u32 = 0x009400;
pub const PTIMER_TIME_1: u32 = 0x009410;
pub const PTIMER_ALARM_0: u32 = 0x009420;

/// `PTIMER_INTR` alarm bit
pub const PTIMER_INTR_ALARM: u32 = 1 << 0;

const TIME_0_MASK: u32 = 0xFFFF_FFE0;
const TIME_1_MASK: u32 = 0x1FFF_FFFF;
const TIME_MASK: u64 = ((TIME_1_MASK as u64) << 32) | 0xFFFF_FFFF;

/// Timebase block
///
/// # Example
///
/// ```
/// use nv3rx::core::timer::Ptimer;
///
/// let mut timer = Ptimer::new(1, 1);
/// timer.set_alarm(1024);
/// timer.set_intr_enable(true);
///
/// timer.tick(1023);
/// assert!(!timer.interrupt_pending());
/// timer.tick(1);
/// assert!(timer.interrupt_pending());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ptimer {
    /// Counter in nanoseconds (61 bits)
    time: u64,

    /// Carry of `ns * denominator` not yet divided out
    remainder: u64,

    numerator: u32,
    denominator: u32,

    alarm: u32,
    intr: u32,
    intr_en: u32,

    reset_numerator: u32,
    reset_denominator: u32,
}

impl Ptimer {
    /// Create a timer with the given reset ratio
    ///
    /// # Arguments
    ///
    /// * `numerator` - Reset value of NUMERATOR (0 is treated as 1)
    /// * `denominator` - Reset value of DENOMINATOR
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            time: 0,
            remainder: 0,
            numerator: numerator.max(1),
            denominator,
            alarm: 0,
            intr: 0,
            intr_en: 0,
            reset_numerator: numerator.max(1),
            reset_denominator: denominator,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.reset_numerator, self.reset_denominator);
        log::info!("PTIMER reset");
    }

    /// Current counter value in nanoseconds
    #[inline(always)]
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time & TIME_MASK;
    }

    pub fn set_alarm(&mut self, alarm: u32) {
        self.alarm = alarm & TIME_0_MASK;
    }

    pub fn set_intr_enable(&mut self, enabled: bool) {
        self.intr_en = enabled as u32;
    }

    /// Advance the counter by host nanoseconds
    ///
    /// Raises `ALARM` when the low word passes through the alarm value.
    pub fn tick(&mut self, ns: u64) {
        let scaled = ns as u128 * self.denominator as u128 + self.remainder as u128;
        let delta = (scaled / self.numerator as u128) as u64;
        self.remainder = (scaled % self.numerator as u128) as u64;

        if delta == 0 {
            return;
        }

        let old = self.time;
        self.time = old.wrapping_add(delta) & TIME_MASK;

        let distance = self.alarm.wrapping_sub(old as u32) as u64;
        let crossed = delta > u32::MAX as u64 || (distance != 0 && distance <= delta);
        if crossed {
            self.intr |= PTIMER_INTR_ALARM;
            log::debug!(
                "PTIMER alarm 0x{:08X} at time 0x{:016X}",
                self.alarm,
                self.time
            );
        }
    }

    /// Whether an enabled interrupt is pending (PMC bit 20)
    pub fn interrupt_pending(&self) -> bool {
        self.intr & self.intr_en != 0
    }

    pub fn acknowledge_pending(&mut self) {
        self.intr &= !self.intr_en;
    }
}

impl Default for Ptimer {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl MmioDevice for Ptimer {
    fn address_range(&self) -> (u32, u32) {
        (0x009000, 0x009FFF)
    }

    fn peek32(&self, addr: u32) -> u32 {
        match addr {
            PTIMER_INTR => self.intr,
            PTIMER_INTR_EN => self.intr_en,
            PTIMER_NUMERATOR => self.numerator,
            PTIMER_DENOMINATOR => self.denominator,
            PTIMER_TIME_0 => (self.time as u32) & TIME_0_MASK,
            PTIMER_TIME_1 => ((self.time >> 32) as u32) & TIME_1_MASK,
            PTIMER_ALARM_0 => self.alarm,
            _ => {
                log::warn!("PTIMER: read from unknown register 0x{:06X}", addr);
                0
            }
        }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        match addr {
            PTIMER_INTR => self.intr &= !value,
            PTIMER_INTR_EN => self.intr_en = value & PTIMER_INTR_ALARM,
            PTIMER_NUMERATOR => {
                self.numerator = value.max(1);
                self.remainder = 0;
                log::debug!("PTIMER: NUMERATOR = {}", self.numerator);
            }
            PTIMER_DENOMINATOR => {
                self.denominator = value;
                self.remainder = 0;
                log::debug!("PTIMER: DENOMINATOR = {}", self.denominator);
            }
            PTIMER_TIME_0 => {
                self.time = (self.time & !0xFFFF_FFFF) | (value & TIME_0_MASK) as u64;
            }
            PTIMER_TIME_1 => {
                self.time = (self.time & 0xFFFF_FFFF) | (((value & TIME_1_MASK) as u64) << 32);
            }
            PTIMER_ALARM_0 => self.set_alarm(value),
            _ => log::warn!(
                "PTIMER: write to unknown register 0x{:06X} = 0x{:08X}",
                addr,
                value
            ),
        }
    }

    fn write_masked(&mut self, addr: u32, value: u32, mask: u32) {
        if addr == PTIMER_INTR {
            self.write32(addr, value & mask);
        } else {
            let current = self.peek32(addr);
            self.write32(addr, crate::core::memory::merge_lanes(current, value, mask));
        }
    }

    fn name(&self) -> &str {
        "PTIMER"
    }
}
