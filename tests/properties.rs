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

//! Property tests for the submission path

use nv3rx::core::config::Nv3Config;
use nv3rx::core::memory::{MmioDevice, Vram};
use nv3rx::core::pfifo::{gray_to_normal, normal_to_gray, Pfifo, CACHE1_PULL0, CACHE1_PUSH0};
use nv3rx::core::ramin::{ramht_hash, Ramht, RamhtConfig, RamhtMut, RamhtSize, RaminContext};
use proptest::prelude::*;

fn ramht_size() -> impl Strategy<Value = RamhtSize> {
    prop_oneof![
        Just(RamhtSize::Size4K),
        Just(RamhtSize::Size8K),
        Just(RamhtSize::Size16K),
        Just(RamhtSize::Size32K),
    ]
}

proptest! {
    #[test]
    fn hash_is_deterministic_and_in_range(
        name in any::<u32>(),
        channel in 0u8..8,
        size in ramht_size(),
    ) {
        let first = ramht_hash(name, channel, size);
        prop_assert_eq!(first, ramht_hash(name, channel, size));
        prop_assert!(first < size.entries());
    }

    #[test]
    fn ramht_insert_then_find(
        entries in prop::collection::vec((4097u32.., 0u8..8, 1u16.., 0u8..0x20), 1..64),
    ) {
        let mut vram = Vram::new(4 * 1024 * 1024);
        let config = RamhtConfig::default();

        let mut expected = Vec::new();
        {
            let mut table = RamhtMut::new(&mut vram, config);
            for &(name, channel, instance, class_id) in &entries {
                let context = RaminContext::new(instance, class_id, true, channel);
                table.insert(name, channel, context).unwrap();
                expected.retain(|&(n, c, _)| (n, c) != (name, channel));
                expected.push((name, channel, context));
            }
        }

        let table = Ramht::new(&vram, config);
        for (name, channel, context) in expected {
            let found = table.find(name, channel);
            prop_assert!(found.is_some());
            prop_assert_eq!(found.unwrap().context, context);
        }
    }

    #[test]
    fn cache1_preserves_push_order(data in prop::collection::vec(any::<u32>(), 1..62)) {
        let mut vram = Vram::new(4 * 1024 * 1024);
        let mut pfifo = Pfifo::new(&Nv3Config::default());
        pfifo.write32(CACHE1_PUSH0, 1);

        RamhtMut::new(&mut vram, pfifo.ramht_config())
            .insert(0x4242, 0, RaminContext::new(0x300, 0x07, true, 0))
            .unwrap();

        pfifo.user_write(&mut vram, 0, 0x4242);
        for &value in &data {
            prop_assert!(pfifo.user_write(&mut vram, 0x304, value));
        }

        pfifo.write32(CACHE1_PULL0, 1);
        let mut pulled = Vec::new();
        while let Some(method) = pfifo.pull(&mut vram, true) {
            if method.method != 0 {
                pulled.push(method.data);
            }
        }
        prop_assert_eq!(pulled, data);
    }

    #[test]
    fn gray_code_round_trip(value in 0u32..64, next in 0u32..63) {
        prop_assert_eq!(gray_to_normal(normal_to_gray(value)), value);
        let diff = normal_to_gray(next) ^ normal_to_gray(next + 1);
        prop_assert_eq!(diff.count_ones(), 1);
    }
}
