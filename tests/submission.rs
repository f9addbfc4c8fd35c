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

//! End-to-end submission tests through the BAR0 front door

use nv3rx::core::bus::PFB_CONFIG_0;
use nv3rx::core::config::Nv3Config;
use nv3rx::core::interrupt::{PmcIntr, PMC_INTR, PMC_INTR_EN};
use nv3rx::core::memory::{SystemRam, PNVM_START, USER_START};
use nv3rx::core::pfifo::{
    cache_error, status, PfifoIntr, PullControl, CACHE1_DMA0, CACHE1_DMA1, CACHE1_DMA3,
    CACHE1_DMA_STATUS, CACHE1_DMA_TLB_PT_BASE, CACHE1_PULL0, CACHE1_PUSH0, CACHE1_STATUS,
    PFIFO_CACHE_ERROR, PFIFO_CONFIG_0, PFIFO_INTR, PFIFO_INTR_EN,
};
use nv3rx::core::pgraph::{class, Notification};
use nv3rx::core::ramin::{DmaObject, DmaTarget, GraphicsObject, RunoutReason};
use nv3rx::core::system::Nv3;
use nv3rx::EmulatorError;

const PITCH: u32 = 1024;
const SURFACE: u32 = 0x5000;
const RECT: u32 = 0x1234;

fn device(host: SystemRam) -> Nv3 {
    let mut nv3 = Nv3::with_host(Nv3Config::default(), Box::new(host)).unwrap();
    nv3.write32(PFB_CONFIG_0, (3 << 8) | 0x14);
    nv3.write32(PFIFO_INTR_EN, 0x11111);
    nv3.write32(CACHE1_PUSH0, 1);
    nv3.write32(CACHE1_PULL0, 1);
    nv3
}

fn object(nv3: &mut Nv3, instance: u16, class_id: u8, rest: [u32; 3]) {
    GraphicsObject {
        words: [((class_id as u32) << 16) | 1, rest[0], rest[1], rest[2]],
    }
    .write(nv3.vram_mut(), (instance as u32) << 4);
}

/// Surface object on 0x3F0, rectangle on 0x300, both on channel 0
fn standard_objects(nv3: &mut Nv3, notifier: u16) {
    object(nv3, 0x3F0, class::IMAGE_IN_MEMORY, [0, 0, 0]);
    object(nv3, 0x300, class::RECTANGLE, [notifier as u32, 0, 0]);
    nv3.create_object(SURFACE, 0, class::IMAGE_IN_MEMORY, 0x3F0, true)
        .unwrap();
    nv3.create_object(RECT, 0, class::RECTANGLE, 0x300, true)
        .unwrap();
}

fn method(subchannel: u32, method: u32) -> u32 {
    (subchannel << 13) | method
}

fn user(subchannel: u32, offset: u32) -> u32 {
    USER_START | method(subchannel, offset)
}

fn pixel(nv3: &mut Nv3, x: u32, y: u32) -> u32 {
    nv3.read32(PNVM_START + y * PITCH + x * 4)
}

#[test]
fn test_pio_rectangle_with_host_notifier() {
    let mut nv3 = device(SystemRam::new(0x10000));
    DmaObject::write(nv3.vram_mut(), 0x400, DmaTarget::Pci, 0x8000, 0xFFF, true);
    standard_objects(&mut nv3, 0x400);
    nv3.tick(777);

    for (offset, data) in [
        (method(7, 0), SURFACE),
        (method(7, 0x308), PITCH),
        (method(7, 0x30C), 0),
        (method(1, 0), RECT),
        (method(1, 0x304), 0x0012_3456),
        (method(1, 0x104), 0),
        (method(1, 0x400), 0x0000_0000),
        (method(1, 0x404), 0x0001_0002),
    ] {
        nv3.write32(USER_START | offset, data);
    }

    assert_eq!(pixel(&mut nv3, 1, 0), 0x0012_3456);
    assert_eq!(pixel(&mut nv3, 2, 0), 0);

    let mut words = [0u32; 4];
    for (i, word) in words.iter_mut().enumerate() {
        *word = nv3.host_mut().read32(0x8000 + i as u32 * 4).unwrap();
    }
    let record = Notification::from_words(words);
    assert_eq!(record.status, Notification::DONE_OK);
    assert_eq!(record.nanoseconds, 777);
}

#[test]
fn test_dma_pusher_stream() {
    let stream = [
        (method(7, 0), SURFACE),
        (method(7, 0x308), PITCH),
        (method(7, 0x30C), 0),
        (method(1, 0), RECT),
        (method(1, 0x304), 0x0000_00FF),
        (method(1, 0x400), 0x0001_0001),
        (method(1, 0x404), 0x0002_0002),
    ];
    let mut bytes = Vec::new();
    for (word, data) in stream {
        bytes.extend_from_slice(&word.to_le_bytes());
        bytes.extend_from_slice(&data.to_le_bytes());
    }
    let mut ram = SystemRam::new(0x20_0000);
    assert!(ram.load(0x10_0000, &bytes));

    let mut nv3 = device(ram);
    standard_objects(&mut nv3, 0);

    // One-page table at RAMIN 0x4000 mapping linear 0 to host 0x100000
    nv3.write_ramin32(0x4000, 0x0010_0000 | 1).unwrap();
    nv3.write32(PFIFO_CONFIG_0, 1);
    nv3.write32(CACHE1_DMA_TLB_PT_BASE, 0x4000);
    nv3.write32(CACHE1_DMA0, bytes.len() as u32);
    nv3.write32(CACHE1_DMA1, 0);
    nv3.write32(CACHE1_DMA3, 2);
    nv3.write32(CACHE1_DMA_STATUS, 1);

    assert_eq!(nv3.read32(CACHE1_DMA_STATUS), 0);
    assert_eq!(nv3.read32(CACHE1_DMA0), 0);
    assert!(nv3.pfifo().cache1().is_empty());
    assert_eq!(pixel(&mut nv3, 1, 1), 0xFF);
    assert_eq!(pixel(&mut nv3, 2, 2), 0xFF);
    assert_eq!(pixel(&mut nv3, 3, 1), 0);
}

#[test]
fn test_dma_pusher_missing_page() {
    let mut nv3 = device(SystemRam::new(0x1000));
    nv3.write32(PFIFO_CONFIG_0, 1);
    nv3.write32(CACHE1_DMA_TLB_PT_BASE, 0x4000);
    nv3.write32(CACHE1_DMA0, 16);
    nv3.write32(CACHE1_DMA_STATUS, 1);

    assert_ne!(nv3.read32(PFIFO_INTR) & PfifoIntr::DMA_PTE.bits(), 0);
    assert_eq!(nv3.read32(CACHE1_DMA_STATUS), 0);
}

/// Point the pusher at an unmapped page and let it fault
fn raise_dma_pte(nv3: &mut Nv3) {
    nv3.write32(PMC_INTR_EN, 1);
    nv3.write32(PFIFO_CONFIG_0, 1);
    nv3.write32(CACHE1_DMA_TLB_PT_BASE, 0x4000);
    nv3.write32(CACHE1_DMA0, 16);
    nv3.write32(CACHE1_DMA1, 0x10000);
    nv3.write32(CACHE1_DMA_STATUS, 1);
}

#[test]
fn test_pmc_intr_read_acknowledges() {
    let mut nv3 = device(SystemRam::new(0x1000));
    raise_dma_pte(&mut nv3);
    assert!(nv3.irq_asserted());

    let first = nv3.read32(PMC_INTR);
    assert_ne!(first & PmcIntr::PFIFO.bits(), 0);
    let second = nv3.read32(PMC_INTR);
    assert_eq!(second & first, 0);

    assert!(!nv3.irq_asserted());
    assert_eq!(nv3.read32(PFIFO_INTR), 0);
}

#[test]
fn test_source_acknowledge_releases_irq() {
    let mut nv3 = device(SystemRam::new(0x1000));
    raise_dma_pte(&mut nv3);
    assert_ne!(nv3.peek32(PMC_INTR).unwrap() & PmcIntr::PFIFO.bits(), 0);
    assert!(nv3.irq_asserted());

    nv3.write32(PFIFO_INTR, PfifoIntr::DMA_PTE.bits());
    assert_eq!(nv3.peek32(PMC_INTR).unwrap() & PmcIntr::PFIFO.bits(), 0);
    assert!(!nv3.irq_asserted());

    // A fresh fault after the acknowledge raises the line again
    nv3.write32(CACHE1_DMA0, 16);
    nv3.write32(CACHE1_DMA_STATUS, 1);
    assert!(nv3.irq_asserted());
    assert_ne!(nv3.read32(PMC_INTR) & PmcIntr::PFIFO.bits(), 0);
    assert!(!nv3.irq_asserted());
}

#[test]
fn test_page_table_base_past_ramin() {
    let mut nv3 = device(SystemRam::new(0x1000));
    nv3.write32(PFIFO_CONFIG_0, 1);
    nv3.write32(CACHE1_DMA_TLB_PT_BASE, 0xFFFF_FFF0);
    nv3.write32(CACHE1_DMA0, 16);
    nv3.write32(CACHE1_DMA1, 0x10000);
    nv3.write32(CACHE1_DMA_STATUS, 1);

    assert_eq!(nv3.read32(CACHE1_DMA_TLB_PT_BASE), 0x003F_FFF0);
    assert_ne!(nv3.read32(PFIFO_INTR) & PfifoIntr::DMA_PTE.bits(), 0);
    assert_eq!(nv3.read32(CACHE1_DMA_STATUS), 0);
}

#[test]
fn test_hash_failure_then_recovery() {
    let mut nv3 = device(SystemRam::new(0x1000));
    object(&mut nv3, 0x300, class::RECTANGLE, [0, 0, 0]);

    nv3.write32(user(1, 0), 0xDEAD);
    assert_eq!(nv3.read32(CACHE1_PULL0), PullControl::HASH_FAILURE);
    assert_ne!(nv3.read32(PFIFO_INTR) & PfifoIntr::CACHE_ERROR.bits(), 0);
    assert_eq!(nv3.read32(PFIFO_CACHE_ERROR), cache_error::CACHE1);
    assert_eq!(nv3.pfifo().cache1().len(), 1);

    let log = nv3.runout_entries();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason_kind(), Some(RunoutReason::IllegalAccess));
    assert_eq!(log[0].subchannel(), 1);
    assert_eq!(log[0].data, 0xDEAD);

    // The driver binds the name and restarts the puller
    nv3.create_object(0xDEAD, 0, class::RECTANGLE, 0x300, true)
        .unwrap();
    nv3.write32(CACHE1_PULL0, 1);
    assert!(nv3.pfifo().cache1().is_empty());
    assert_eq!(
        nv3.pgraph().subchannel_context(1).pgraph_class(),
        class::RECTANGLE
    );
}

#[test]
fn test_software_object_stops_puller() {
    let mut nv3 = device(SystemRam::new(0x1000));
    nv3.create_object(0x7777, 0, 0x60, 0x300, false).unwrap();

    nv3.write32(user(2, 0), 0x7777);
    assert_eq!(nv3.read32(CACHE1_PULL0), PullControl::SOFTWARE_METHOD);
    assert_eq!(nv3.pfifo().cache1().len(), 1);
}

#[test]
fn test_cache1_capacity_boundary() {
    let mut nv3 = device(SystemRam::new(0x1000));
    nv3.write32(CACHE1_PULL0, 0);

    for i in 0..63 {
        nv3.write32(user(1, 0x304), i);
    }
    assert_eq!(nv3.read32(CACHE1_STATUS), status::FULL);
    assert!(nv3.runout_entries().is_empty());

    nv3.write32(user(1, 0x304), 0xBAD);
    let log = nv3.runout_entries();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason_kind(), Some(RunoutReason::FreeCountOverrun));
    assert_ne!(nv3.read32(PFIFO_INTR) & PfifoIntr::RUNOUT.bits(), 0);

    assert_eq!(nv3.pfifo().cache1().len(), 63);
    assert_eq!(nv3.pfifo().cache1().front().map(|e| e.data), Some(0));
}

#[test]
fn test_ramht_full_rejects_insert() {
    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();

    // Every name folds to the same 9-bit bucket
    let names: Vec<u32> = (0..512u32).map(|k| 0x1000_0000 | (k * 0x201)).collect();
    for (i, &name) in names.iter().enumerate() {
        nv3.create_object(name, 0, class::RECTANGLE, 0x300 + i as u16, true)
            .unwrap();
    }

    let err = nv3.create_object(0x2000_0000, 0, class::RECTANGLE, 0x1000, true);
    assert!(matches!(
        err,
        Err(EmulatorError::RamhtFull {
            name: 0x2000_0000,
            channel: 0
        })
    ));

    // Nothing was overwritten
    let table = nv3.pfifo().ramht_config();
    let ramht = nv3rx::core::ramin::Ramht::new(nv3.vram(), table);
    for (i, &name) in names.iter().enumerate() {
        let found = ramht.find(name, 0).unwrap();
        assert_eq!(found.context.ramin_offset(), 0x300 + i as u16);
    }
}
