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

//! Gray code conversion for the CACHE1 put/get registers
//!
//! CACHE1_PUT and CACHE1_GET expose the ring index in reflected binary Gray
//! code, shifted left by two (one entry is one dword of method address).
//! Internally the caches keep plain indices and convert at the register
//! boundary.

/// Convert a binary index to Gray code
///
/// # Example
///
/// ```
/// use nv3rx::core::pfifo::{gray_to_normal, normal_to_gray};
///
/// assert_eq!(normal_to_gray(5), 0b111);
/// assert_eq!(gray_to_normal(0b111), 5);
/// ```
#[inline(always)]
pub fn normal_to_gray(value: u32) -> u32 {
    value ^ (value >> 1)
}

/// Convert a Gray code value back to a binary index
#[inline(always)]
pub fn gray_to_normal(gray: u32) -> u32 {
    let mut value = gray;
    value ^= value >> 16;
    value ^= value >> 8;
    value ^= value >> 4;
    value ^= value >> 2;
    value ^= value >> 1;
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sequence() {
        let expected = [0b000, 0b001, 0b011, 0b010, 0b110, 0b111, 0b101, 0b100];
        for (n, &g) in expected.iter().enumerate() {
            assert_eq!(normal_to_gray(n as u32), g);
            assert_eq!(gray_to_normal(g), n as u32);
        }
    }

    #[test]
    fn test_neighbours_differ_by_one_bit() {
        for n in 0..63u32 {
            let diff = normal_to_gray(n) ^ normal_to_gray(n + 1);
            assert_eq!(diff.count_ones(), 1);
        }
    }

    #[test]
    fn test_inverse_over_cache_range() {
        for n in 0..64u32 {
            assert_eq!(gray_to_normal(normal_to_gray(n)), n);
        }
        assert_eq!(gray_to_normal(normal_to_gray(0xDEAD_BEEF)), 0xDEAD_BEEF);
    }
}
