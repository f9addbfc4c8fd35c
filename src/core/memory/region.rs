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

//! BAR0 address map and subsystem identification
//!
//! The map is a sorted table of inclusive ranges. Lookup is a binary search,
//! so adding a block never requires touching dispatch code.
//!
//! | Range                   | Block                                   |
//! |-------------------------|-----------------------------------------|
//! | 0x000000 - 0x000FFF     | PMC                                     |
//! | 0x001000 - 0x001FFF     | PBUS (PCI mirror at 0x1800)             |
//! | 0x002000 - 0x003FFF     | PFIFO                                   |
//! | 0x004000 - 0x004FFF     | PRM                                     |
//! | 0x006000 - 0x007FFF     | PRAM / PRMIO                            |
//! | 0x009000 - 0x009FFF     | PTIMER                                  |
//! | 0x0A0000 - 0x0C7FFF     | VGA VRAM / registers                    |
//! | 0x100000 - 0x100FFF     | PFB                                     |
//! | 0x101000 - 0x101FFF     | PEXTDEV / PSTRAPS                       |
//! | 0x110000 - 0x12FFFF     | PROM / PALT                             |
//! | 0x200000 - 0x200FFF     | PME                                     |
//! | 0x400000 - 0x5C1FFF     | PGRAPH + class method windows           |
//! | 0x600000 - 0x601FFF     | PRMCIO                                  |
//! | 0x680000 - 0x680FFF     | PVIDEO / PRAMDAC                        |
//! | 0x800000 - 0xFFFFFF     | USER (object submission)                |
//! | 0x1000000 - 0x17FFFFF   | PNVM (VRAM)                             |
//! | 0x1C00000 - 0x1FFFFFF   | RAMIN                                   |

use std::cmp::Ordering;

/// Block that decodes a BAR0 address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Pmc,
    Pbus,
    Pfifo,
    Ptimer,
    Pfb,
    Pextdev,
    Pgraph,
    User,
    Pnvm,
    Ramin,
    /// A block this core does not model; reads return 0
    OpenBus(&'static str),
    Unmapped,
}

/// One entry of the address map
#[derive(Debug, Clone, Copy)]
pub struct AddressRange {
    pub start: u32,
    pub end: u32,
    pub subsystem: Subsystem,
}

impl AddressRange {
    const fn new(start: u32, end: u32, subsystem: Subsystem) -> Self {
        Self {
            start,
            end,
            subsystem,
        }
    }

    #[inline(always)]
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr <= self.end
    }
}

pub const PMC_START: u32 = 0x000000;
pub const PMC_END: u32 = 0x000FFF;
pub const PBUS_START: u32 = 0x001000;
pub const PBUS_END: u32 = 0x001FFF;
pub const PFIFO_START: u32 = 0x002000;
pub const PFIFO_END: u32 = 0x003FFF;
pub const PTIMER_START: u32 = 0x009000;
pub const PTIMER_END: u32 = 0x009FFF;
pub const PFB_START: u32 = 0x100000;
pub const PFB_END: u32 = 0x100FFF;
pub const PEXTDEV_START: u32 = 0x101000;
pub const PEXTDEV_END: u32 = 0x101FFF;
pub const PGRAPH_START: u32 = 0x400000;
/// Last address of the PGRAPH register file proper
pub const PGRAPH_REGISTER_END: u32 = 0x401FFF;
/// Last address of the highest class window
pub const PGRAPH_END: u32 = 0x5C1FFF;
pub const USER_START: u32 = 0x800000;
pub const USER_END: u32 = 0xFFFFFF;
pub const PNVM_START: u32 = 0x1000000;
pub const PNVM_END: u32 = 0x17FFFFF;
pub const RAMIN_START: u32 = 0x1C00000;
pub const RAMIN_END: u32 = 0x1FFFFFF;

/// Sorted, non-overlapping BAR0 map
pub static ADDRESS_MAP: &[AddressRange] = &[
    AddressRange::new(PMC_START, PMC_END, Subsystem::Pmc),
    AddressRange::new(PBUS_START, PBUS_END, Subsystem::Pbus),
    AddressRange::new(PFIFO_START, PFIFO_END, Subsystem::Pfifo),
    AddressRange::new(0x004000, 0x004FFF, Subsystem::OpenBus("PRM")),
    AddressRange::new(0x006000, 0x006FFF, Subsystem::OpenBus("PRAM")),
    AddressRange::new(0x007000, 0x007FFF, Subsystem::OpenBus("PRMIO")),
    AddressRange::new(PTIMER_START, PTIMER_END, Subsystem::Ptimer),
    AddressRange::new(0x0A0000, 0x0C7FFF, Subsystem::OpenBus("VGA")),
    AddressRange::new(PFB_START, PFB_END, Subsystem::Pfb),
    AddressRange::new(PEXTDEV_START, PEXTDEV_END, Subsystem::Pextdev),
    AddressRange::new(0x110000, 0x11FFFF, Subsystem::OpenBus("PROM")),
    AddressRange::new(0x120000, 0x12FFFF, Subsystem::OpenBus("PALT")),
    AddressRange::new(0x200000, 0x200FFF, Subsystem::OpenBus("PME")),
    AddressRange::new(PGRAPH_START, PGRAPH_END, Subsystem::Pgraph),
    AddressRange::new(0x600000, 0x601FFF, Subsystem::OpenBus("PRMCIO")),
    AddressRange::new(0x680000, 0x680FFF, Subsystem::OpenBus("PVIDEO")),
    AddressRange::new(USER_START, USER_END, Subsystem::User),
    AddressRange::new(PNVM_START, PNVM_END, Subsystem::Pnvm),
    AddressRange::new(RAMIN_START, RAMIN_END, Subsystem::Ramin),
];

/// Identify the block decoding a BAR0 address
///
/// # Example
///
/// ```
/// use nv3rx::core::memory::{identify_subsystem, Subsystem};
///
/// assert_eq!(identify_subsystem(0x000100), Subsystem::Pmc);
/// assert_eq!(identify_subsystem(0x470304), Subsystem::Pgraph);
/// assert_eq!(identify_subsystem(0x820000), Subsystem::User);
/// assert_eq!(identify_subsystem(0x1C00000), Subsystem::Ramin);
/// assert_eq!(identify_subsystem(0x300000), Subsystem::Unmapped);
/// ```
pub fn identify_subsystem(addr: u32) -> Subsystem {
    ADDRESS_MAP
        .binary_search_by(|range| {
            if addr < range.start {
                Ordering::Greater
            } else if addr > range.end {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        })
        .map(|index| ADDRESS_MAP[index].subsystem)
        .unwrap_or(Subsystem::Unmapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_is_sorted_and_disjoint() {
        for pair in ADDRESS_MAP.windows(2) {
            assert!(pair[0].start <= pair[0].end);
            assert!(
                pair[0].end < pair[1].start,
                "0x{:X} overlaps 0x{:X}",
                pair[0].end,
                pair[1].start
            );
        }
    }

    #[test]
    fn test_identify_boundaries() {
        for range in ADDRESS_MAP {
            assert_eq!(identify_subsystem(range.start), range.subsystem);
            assert_eq!(identify_subsystem(range.end), range.subsystem);
            assert!(range.contains(range.start));
        }
    }

    #[test]
    fn test_identify_pfifo_caches() {
        assert_eq!(identify_subsystem(0x3000), Subsystem::Pfifo);
        assert_eq!(identify_subsystem(0x33FC), Subsystem::Pfifo);
        assert_eq!(identify_subsystem(0x2400), Subsystem::Pfifo);
    }

    #[test]
    fn test_identify_gaps_are_unmapped() {
        assert_eq!(identify_subsystem(0x005000), Subsystem::Unmapped);
        assert_eq!(identify_subsystem(0x008FFF), Subsystem::Unmapped);
        assert_eq!(identify_subsystem(0x5C2000), Subsystem::Unmapped);
        assert_eq!(identify_subsystem(0x1800000), Subsystem::Unmapped);
        assert_eq!(identify_subsystem(0x2000000), Subsystem::Unmapped);
    }

    #[test]
    fn test_identify_open_bus_blocks() {
        assert_eq!(identify_subsystem(0x0A0000), Subsystem::OpenBus("VGA"));
        assert_eq!(identify_subsystem(0x680300), Subsystem::OpenBus("PVIDEO"));
    }
}
