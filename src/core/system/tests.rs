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

use super::*;
use crate::core::bus::PFB_CONFIG_0;
use crate::core::interrupt::{PMC_BOOT, PMC_ENABLE, PMC_INTR, PMC_INTR_EN};
use crate::core::memory::SystemRam;
use crate::core::pfifo::{
    CACHE1_PULL0, CACHE1_PUSH0, PFIFO_CACHES, PFIFO_INTR, PFIFO_INTR_EN, PFIFO_RAMFC,
    USER_FREE_COUNT,
};
use crate::core::pgraph::{
    class, class_window, Notification, PgraphIntr0, PGRAPH_FIFO_ACCESS, PGRAPH_INTR_0,
    PGRAPH_INTR_EN_0,
};
use crate::core::ramin::{DmaObject, DmaTarget, GraphicsObject, RunoutReason};
use crate::core::timer::{PTIMER_ALARM_0, PTIMER_INTR, PTIMER_INTR_EN};

const PITCH: u32 = 1024;
const NOTIFIER: u16 = 0x400;
const NOTIFIER_FRAME: u32 = 0x0020_0000;

fn setup() -> Nv3 {
    let mut nv3 = Nv3::with_host(Nv3Config::default(), Box::new(SystemRam::new(0x10000))).unwrap();
    // 32bpp framebuffer
    nv3.write32(PFB_CONFIG_0, (3 << 8) | 0x14);
    nv3.write32(CACHE1_PUSH0, 1);
    nv3.write32(CACHE1_PULL0, 1);
    nv3
}

fn user(channel: u32, subchannel: u32, method: u32) -> u32 {
    USER_START | (channel << 16) | (subchannel << 13) | method
}

fn object(nv3: &mut Nv3, instance: u16, class_id: u8, word0_low: u32, rest: [u32; 3]) {
    GraphicsObject {
        words: [((class_id as u32) << 16) | word0_low, rest[0], rest[1], rest[2]],
    }
    .write(nv3.vram_mut(), (instance as u32) << 4);
}

/// Bind an image-in-memory surface at VRAM 0 on subchannel 7
fn bind_surface(nv3: &mut Nv3, channel: u8) {
    object(nv3, 0x3F0, class::IMAGE_IN_MEMORY, 1, [0, 0, 0]);
    nv3.create_object(0x5000, channel, class::IMAGE_IN_MEMORY, 0x3F0, true)
        .unwrap();
    let ch = channel as u32;
    nv3.write32(user(ch, 7, 0), 0x5000);
    nv3.write32(user(ch, 7, 0x308), PITCH);
    nv3.write32(user(ch, 7, 0x30C), 0);
}

fn pixel(nv3: &mut Nv3, x: u32, y: u32) -> u32 {
    nv3.read32(PNVM_START + y * PITCH + x * 4)
}

// ============================================================================
// Address map
// ============================================================================

#[test]
fn test_boot_id() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    assert_eq!(nv3.read32(PMC_BOOT), 0x0003_0120);
    assert_eq!(nv3.read8(PMC_BOOT + 1), 0x01);
    assert_eq!(nv3.read16(PMC_BOOT + 2), 0x0003);
}

#[test]
fn test_invalid_config_rejected() {
    let config = Nv3Config {
        vram_size: 3,
        ..Default::default()
    };
    assert!(matches!(
        Nv3::new(config),
        Err(EmulatorError::InvalidConfig(_))
    ));
}

#[test]
fn test_peek_unmapped() {
    let nv3 = Nv3::new(Nv3Config::default()).unwrap();
    assert!(matches!(
        nv3.peek32(0x300000),
        Err(EmulatorError::UnmappedAddress { address: 0x300000 })
    ));
    assert_eq!(nv3.peek32(0x0A0000).unwrap(), 0);
}

#[test]
fn test_open_bus_and_unmapped_accesses_are_harmless() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(0x680300, 0xFFFF_FFFF);
    nv3.write32(0x300000, 0xFFFF_FFFF);
    assert_eq!(nv3.read32(0x680300), 0);
    assert_eq!(nv3.read32(0x300000), 0);
    assert!(!nv3.irq_asserted());
}

#[test]
fn test_pnvm_and_ramin_alias_vram() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();

    // RAMIN offset 0 is the last paragraph of 4MB VRAM
    nv3.write32(RAMIN_START, 0x1122_3344);
    assert_eq!(nv3.vram().read32(0x3F_FFF0), 0x1122_3344);
    assert_eq!(nv3.read32(PNVM_START + 0x3F_FFF0), 0x1122_3344);

    // PNVM wraps at the VRAM size
    nv3.write32(PNVM_START + 0x40_0004, 0xAABB_CCDD);
    assert_eq!(nv3.vram().read32(4), 0xAABB_CCDD);
}

#[test]
fn test_sub_dword_lanes() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PNVM_START, 0x1122_3344);
    nv3.write8(PNVM_START + 2, 0xAB);
    assert_eq!(nv3.read32(PNVM_START), 0x11AB_3344);
    nv3.write16(PNVM_START, 0xBEEF);
    assert_eq!(nv3.read32(PNVM_START), 0x11AB_BEEF);
    assert_eq!(nv3.read8(PNVM_START + 3), 0x11);
}

#[test]
fn test_pmc_enable_gates_pfifo() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    assert_eq!(nv3.read32(PFIFO_RAMFC), 0x1C00);

    nv3.write32(PMC_ENABLE, 0);
    assert_eq!(nv3.read32(PFIFO_RAMFC), 0);
    nv3.write32(PFIFO_RAMFC, 0x1A00);

    nv3.write32(PMC_ENABLE, 0xFFFF_FFFF);
    assert_eq!(nv3.read32(PFIFO_RAMFC), 0x1C00);
}

// ============================================================================
// Host helpers
// ============================================================================

#[test]
fn test_ramin_helpers() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write_ramin32(0x3000, 0xFEED_FACE).unwrap();
    assert_eq!(nv3.read_ramin32(0x3000).unwrap(), 0xFEED_FACE);
    assert_eq!(nv3.read32(RAMIN_START + 0x3000), 0xFEED_FACE);

    assert!(matches!(
        nv3.write_ramin32(0x3002, 0),
        Err(EmulatorError::UnalignedAccess { size: 4, .. })
    ));
    assert!(matches!(
        nv3.read_ramin32(RAMIN_WINDOW_SIZE),
        Err(EmulatorError::InvalidMemoryAccess { .. })
    ));
}

#[test]
fn test_create_object_checks_channel() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    assert!(matches!(
        nv3.create_object(0x1234, 8, class::RECTANGLE, 0x300, true),
        Err(EmulatorError::InvalidChannel { channel: 8 })
    ));

    let slot = nv3
        .create_object(0x1234, 2, class::RECTANGLE, 0x300, true)
        .unwrap();
    let context = RaminContext(nv3.read_ramin32(slot * 8 + 4).unwrap());
    assert_eq!(context.channel(), 2);
    assert_eq!(context.class_id(), class::RECTANGLE);
    assert!(context.is_hardware());
}

// ============================================================================
// Submission path
// ============================================================================

#[test]
fn test_rectangle_with_notify_end_to_end() {
    let mut nv3 = setup();
    nv3.write32(PFIFO_CACHES, 1);
    nv3.write32(PGRAPH_INTR_EN_0, PgraphIntr0::NOTIFY.bits());
    nv3.write32(PMC_INTR_EN, 1);
    nv3.tick(1000);

    DmaObject::write(
        nv3.vram_mut(),
        NOTIFIER,
        DmaTarget::Vram,
        NOTIFIER_FRAME,
        0xFFF,
        true,
    );
    object(&mut nv3, 0x300, class::RECTANGLE, 1, [NOTIFIER as u32, 0, 0]);
    nv3.create_object(0x0000_1234, 2, class::RECTANGLE, 0x300, true)
        .unwrap();
    bind_surface(&mut nv3, 2);

    nv3.write32(user(2, 1, 0), 0x0000_1234);
    assert_eq!(nv3.pgraph().subchannel_context(1).pgraph_class(), class::RECTANGLE);
    assert_eq!(nv3.pgraph().context_user().channel(), 2);

    nv3.write32(user(2, 1, 0x304), 0x0000_FF00);
    nv3.write32(user(2, 1, 0x104), 0);
    nv3.write32(user(2, 1, 0x400), 0x0003_0002);
    nv3.write32(user(2, 1, 0x404), 0x0002_0004);

    assert!(nv3.pfifo().cache1().is_empty());
    assert_eq!(pixel(&mut nv3, 2, 3), 0x0000_FF00);
    assert_eq!(pixel(&mut nv3, 5, 4), 0x0000_FF00);
    assert_eq!(pixel(&mut nv3, 6, 3), 0);

    let words = [0, 4, 8, 12].map(|offset| nv3.vram().read32(NOTIFIER_FRAME + offset));
    let record = Notification::from_words(words);
    assert_eq!(record.status, Notification::DONE_OK);
    assert_eq!(record.nanoseconds, 1000);
    assert_eq!(record.info16, 0x404);

    assert!(nv3.irq_asserted());
    assert_ne!(nv3.read32(PMC_INTR) & PmcIntr::PGRAPH0.bits(), 0);

    nv3.write32(PGRAPH_INTR_0, 0xFFFF_FFFF);
    assert_eq!(nv3.read32(PMC_INTR), 0);
    assert!(!nv3.irq_asserted());
}

#[test]
fn test_fifo_access_holds_methods() {
    let mut nv3 = setup();
    object(&mut nv3, 0x300, class::RECTANGLE, 1, [0, 0, 0]);
    nv3.create_object(0x1234, 0, class::RECTANGLE, 0x300, true)
        .unwrap();

    nv3.write32(PGRAPH_FIFO_ACCESS, 0);
    nv3.write32(user(0, 1, 0), 0x1234);
    assert_eq!(nv3.pfifo().cache1().len(), 1);

    nv3.write32(PGRAPH_FIFO_ACCESS, 1);
    assert!(nv3.pfifo().cache1().is_empty());
    assert_eq!(nv3.pgraph().subchannel_context(1).pgraph_class(), class::RECTANGLE);
}

#[test]
fn test_pgraph_disabled_stalls_puller() {
    let mut nv3 = setup();
    object(&mut nv3, 0x300, class::RECTANGLE, 1, [0, 0, 0]);
    nv3.create_object(0x1234, 0, class::RECTANGLE, 0x300, true)
        .unwrap();

    nv3.write32(PMC_ENABLE, PmcEnable::PFIFO.bits());
    nv3.write32(user(0, 1, 0), 0x1234);
    assert_eq!(nv3.pfifo().cache1().len(), 1);

    nv3.write32(PMC_ENABLE, 0xFFFF_FFFF);
    assert_eq!(nv3.process_fifo(), 1);
    assert!(nv3.pfifo().cache1().is_empty());
}

#[test]
fn test_class_window_write() {
    let mut nv3 = setup();
    bind_surface(&mut nv3, 0);
    object(&mut nv3, 0x300, class::RECTANGLE, 1, [0, 0, 0]);
    nv3.create_object(0x1234, 0, class::RECTANGLE, 0x300, true)
        .unwrap();
    nv3.write32(user(0, 1, 0), 0x1234);

    let base = class_window(class::RECTANGLE);
    nv3.write32(base + 0x304, 0x00FF_0000);
    nv3.write32(base + 0x400, 0x0001_0001);
    nv3.write32(base + 0x404, 0x0001_0001);
    assert_eq!(pixel(&mut nv3, 1, 1), 0x00FF_0000);
    assert_eq!(nv3.read32(base + 0x304), 0);
}

#[test]
fn test_runout_reaches_pmc() {
    let mut nv3 = setup();
    nv3.write32(PFIFO_INTR_EN, 0x11111);
    nv3.write32(PMC_INTR_EN, 1);

    nv3.write32(user(0, 0, USER_FREE_COUNT), 1);

    let log = nv3.runout_entries();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason_kind(), Some(RunoutReason::IllegalAccess));
    assert!(nv3.irq_asserted());

    nv3.write32(PFIFO_INTR, 0xFFFF_FFFF);
    assert!(!nv3.irq_asserted());
    assert_eq!(nv3.peek32(PMC_INTR).unwrap(), 0);
}

#[test]
fn test_pmc_intr_read_acknowledges_blocks() {
    let mut nv3 = setup();
    nv3.write32(PFIFO_INTR_EN, 0x11111);
    nv3.write32(PTIMER_INTR_EN, 1);
    nv3.write32(PTIMER_ALARM_0, 0x40);
    nv3.write32(PMC_INTR_EN, 1);

    nv3.write32(user(0, 0, USER_FREE_COUNT), 1);
    nv3.tick(0x40);
    assert_eq!(
        nv3.peek32(PMC_INTR).unwrap(),
        PmcIntr::PFIFO.bits() | PmcIntr::PTIMER.bits()
    );

    let first = nv3.read32(PMC_INTR);
    assert_eq!(first, PmcIntr::PFIFO.bits() | PmcIntr::PTIMER.bits());
    assert_eq!(nv3.read32(PMC_INTR) & first, 0);
    assert!(!nv3.irq_asserted());
    assert_eq!(nv3.peek32(PFIFO_INTR).unwrap(), 0);
    assert_eq!(nv3.peek32(PTIMER_INTR).unwrap(), 0);

    // The runout log itself is not consumed by the acknowledge
    assert_eq!(nv3.runout_entries().len(), 1);
}

#[test]
fn test_pmc_intr_read_keeps_disabled_status_bits() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PGRAPH_INTR_EN_0, PgraphIntr0::VBLANK.bits());
    nv3.vblank();

    // Raised but not enabled: visible in PGRAPH, absent from PMC
    nv3.write32(PGRAPH_INTR_EN_0, 0);
    nv3.vblank();
    assert_eq!(nv3.read32(PMC_INTR), 0);
    assert_ne!(nv3.read32(PGRAPH_INTR_0) & PgraphIntr0::VBLANK.bits(), 0);
}

#[test]
fn test_free_count_read_through_user() {
    let mut nv3 = setup();
    assert_eq!(nv3.read32(user(0, 0, USER_FREE_COUNT)), 63 << 2);
}

// ============================================================================
// Time and interrupts
// ============================================================================

#[test]
fn test_ptimer_alarm_reaches_pmc() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PTIMER_INTR_EN, 1);
    nv3.write32(PTIMER_ALARM_0, 0x100);
    nv3.write32(PMC_INTR_EN, 1);

    nv3.tick(0x80);
    assert!(!nv3.irq_asserted());
    nv3.tick(0x100);
    assert!(nv3.irq_asserted());
    assert_ne!(nv3.read32(PMC_INTR) & PmcIntr::PTIMER.bits(), 0);
}

#[test]
fn test_vblank_needs_enable() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.vblank();
    assert_eq!(nv3.read32(PGRAPH_INTR_0), 0);

    nv3.write32(PGRAPH_INTR_EN_0, PgraphIntr0::VBLANK.bits());
    nv3.vblank();
    assert_ne!(nv3.read32(PGRAPH_INTR_0) & PgraphIntr0::VBLANK.bits(), 0);
    assert_ne!(nv3.read32(PMC_INTR) & PmcIntr::PGRAPH0.bits(), 0);
}

#[test]
fn test_software_interrupt() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PMC_INTR, 1 << 31);
    assert!(!nv3.irq_asserted());
    nv3.write32(PMC_INTR_EN, 2);
    assert!(nv3.irq_asserted());
}

// ============================================================================
// Reset and save states
// ============================================================================

#[test]
fn test_reset_keeps_vram() {
    let mut nv3 = setup();
    nv3.write32(PNVM_START + 0x100, 0x1234_5678);
    nv3.write32(PFIFO_CACHES, 1);
    nv3.reset();
    assert_eq!(nv3.read32(PNVM_START + 0x100), 0x1234_5678);
    assert_eq!(nv3.read32(PFIFO_CACHES), 0);
}

#[test]
fn test_save_and_load_state() {
    let mut nv3 = setup();
    nv3.write32(PNVM_START + 0x40, 0xCAFE_BABE);
    nv3.write32(PFIFO_CACHES, 1);
    nv3.tick(5000);
    let saved = nv3.save_state().unwrap();

    nv3.write32(PNVM_START + 0x40, 0);
    nv3.write32(PFIFO_CACHES, 0);
    nv3.tick(5000);

    nv3.load_state(&saved).unwrap();
    assert_eq!(nv3.read32(PNVM_START + 0x40), 0xCAFE_BABE);
    assert_eq!(nv3.read32(PFIFO_CACHES), 1);
    assert_eq!(nv3.ptimer().time(), 5000);
}

#[test]
fn test_load_corrupt_state() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PNVM_START, 0x55);
    assert!(matches!(
        nv3.load_state(&[1, 2, 3]),
        Err(EmulatorError::SaveState(_))
    ));
    assert_eq!(nv3.read32(PNVM_START), 0x55);
}
