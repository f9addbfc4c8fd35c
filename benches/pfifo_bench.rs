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

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use nv3rx::core::config::Nv3Config;
use nv3rx::core::memory::{MmioDevice, Vram};
use nv3rx::core::pfifo::{Pfifo, CACHE1_GET, CACHE1_PULL0, CACHE1_PUSH0, CACHE1_PUT};
use nv3rx::core::pgraph::class;
use nv3rx::core::ramin::{
    ramht_hash, GraphicsObject, Ramht, RamhtConfig, RamhtMut, RamhtSize, RaminContext,
};
use nv3rx::core::system::Nv3;

fn criterion_config() -> Criterion {
    match std::env::var("NV3RX_BENCH_PROFILE").as_deref() {
        Ok("ci") => Criterion::default()
            .warm_up_time(Duration::from_millis(150))
            .measurement_time(Duration::from_millis(400))
            .sample_size(20),
        _ => Criterion::default()
            .warm_up_time(Duration::from_secs(1))
            .measurement_time(Duration::from_secs(2))
            .sample_size(50),
    }
}

fn bench_ramht(c: &mut Criterion) {
    let mut vram = Vram::new(4 * 1024 * 1024);
    let config = RamhtConfig::default();
    {
        let mut table = RamhtMut::new(&mut vram, config);
        for name in 0..400u32 {
            let channel = (name & 7) as u8;
            let context = RaminContext::new(0x300 + name as u16, class::RECTANGLE, true, channel);
            let _ = table.insert(0x1000 + name * 17, channel, context);
        }
    }

    c.bench_function("ramht_hash", |b| {
        b.iter(|| ramht_hash(black_box(0xBEEF_0042), black_box(3), RamhtSize::Size4K))
    });

    c.bench_function("ramht_find", |b| {
        let table = Ramht::new(&vram, config);
        let mut name = 0u32;
        b.iter(|| {
            name = (name + 1) % 400;
            black_box(table.find(0x1000 + name * 17, (name & 7) as u8))
        })
    });
}

fn bench_cache1_push(c: &mut Criterion) {
    let mut vram = Vram::new(4 * 1024 * 1024);
    let mut pfifo = Pfifo::new(&Nv3Config::default());
    pfifo.write32(CACHE1_PUSH0, 1);

    c.bench_function("cache1_push_63", |b| {
        b.iter(|| {
            for i in 0..63u32 {
                pfifo.user_write(&mut vram, (1 << 13) | 0x304, black_box(i));
            }
            // Drop the queued entries
            let put = pfifo.read32(CACHE1_PUT);
            pfifo.write32(CACHE1_GET, put);
        })
    });
}

fn bench_push_pull_execute(c: &mut Criterion) {
    let mut nv3 = match Nv3::new(Nv3Config::default()) {
        Ok(nv3) => nv3,
        Err(e) => panic!("device creation failed: {}", e),
    };
    nv3.write32(CACHE1_PUSH0, 1);
    nv3.write32(CACHE1_PULL0, 1);

    GraphicsObject {
        words: [((class::RECTANGLE as u32) << 16) | 1, 0, 0, 0],
    }
    .write(nv3.vram_mut(), 0x300 << 4);
    if let Err(e) = nv3.create_object(0x1234, 0, class::RECTANGLE, 0x300, true) {
        panic!("RAMHT insert failed: {}", e);
    }
    nv3.write32(0x800000 | (1 << 13), 0x1234);

    c.bench_function("user_write_colour_method", |b| {
        let mut colour = 0u32;
        b.iter(|| {
            colour = colour.wrapping_add(1);
            nv3.write32(0x800000 | (1 << 13) | 0x304, black_box(colour));
        })
    });

    c.bench_function("user_write_rectangle_8x8", |b| {
        b.iter(|| {
            nv3.write32(0x800000 | (1 << 13) | 0x400, black_box(0x0010_0010));
            nv3.write32(0x800000 | (1 << 13) | 0x404, black_box(0x0008_0008));
        })
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_ramht, bench_cache1_push, bench_push_pull_execute
}
criterion_main!(benches);
