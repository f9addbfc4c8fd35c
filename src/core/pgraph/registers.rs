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

//! PGRAPH packed registers and shared render state
//!
//! `CTX_USER` and `STATUS` are kept as plain integers with explicit
//! accessors; the clip, surface and pattern registers are grouped into small
//! structs because every drawing class reads them together.

use super::primitives::Point;
use serde::{Deserialize, Serialize};

/// `PGRAPH_CTX_USER`: the object currently executing
///
/// ```text
/// 30..24  channel
/// 20..16  class
/// 15..13  subchannel
/// ```
///
/// # Examples
///
/// ```
/// use nv3rx::core::pgraph::ContextUser;
///
/// let user = ContextUser::new(2, 0x07, 5);
/// assert_eq!(user.raw(), 0x0207_A000);
/// assert_eq!(user.channel(), 2);
/// assert_eq!(user.class(), 0x07);
/// assert_eq!(user.subchannel(), 5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUser(pub u32);

impl ContextUser {
    pub const MASK: u32 = 0x7F1F_E000;

    pub fn new(channel: u8, class: u8, subchannel: u8) -> Self {
        Self(
            (((channel & 0x7F) as u32) << 24)
                | (((class & 0x1F) as u32) << 16)
                | (((subchannel & 7) as u32) << 13),
        )
    }

    #[inline(always)]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn channel(self) -> u8 {
        ((self.0 >> 24) & 0x7F) as u8
    }

    #[inline(always)]
    pub fn class(self) -> u8 {
        ((self.0 >> 16) & 0x1F) as u8
    }

    #[inline(always)]
    pub fn subchannel(self) -> u8 {
        ((self.0 >> 13) & 7) as u8
    }

    pub fn with_channel(self, channel: u8) -> Self {
        Self((self.0 & !(0x7F << 24)) | (((channel & 0x7F) as u32) << 24))
    }
}

/// `PGRAPH_STATUS` busy bits
///
/// Bit 0 is never stored; it is the OR of all other bits and is computed
/// when the register is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgraphStatus(u32);

impl PgraphStatus {
    pub const OVERALL: u32 = 1 << 0;
    pub const XY_LOGIC: u32 = 1 << 4;
    pub const PORT_NOTIFY: u32 = 1 << 8;
    pub const PORT_REGISTER: u32 = 1 << 12;
    pub const PORT_DMA: u32 = 1 << 16;
    pub const DMA_ENGINE: u32 = 1 << 20;
    pub const DMA_NOTIFY: u32 = 1 << 24;
    pub const ENGINE_3D: u32 = 1 << 28;
    pub const ENGINE_CACHE: u32 = 1 << 29;

    const UNITS: u32 = Self::XY_LOGIC
        | Self::PORT_NOTIFY
        | Self::PORT_REGISTER
        | Self::PORT_DMA
        | Self::DMA_ENGINE
        | Self::DMA_NOTIFY
        | Self::ENGINE_3D
        | Self::ENGINE_CACHE;

    pub fn set(&mut self, unit: u32, busy: bool) {
        if busy {
            self.0 |= unit & Self::UNITS;
        } else {
            self.0 &= !unit;
        }
    }

    pub fn is_busy(self, unit: u32) -> bool {
        self.0 & unit != 0
    }

    /// Register value with the overall bit folded in
    pub fn raw(self) -> u32 {
        if self.0 & Self::UNITS != 0 {
            self.0 | Self::OVERALL
        } else {
            self.0
        }
    }

    pub fn overall_busy(self) -> bool {
        self.raw() & Self::OVERALL != 0
    }
}

/// A clip rectangle with exclusive maxima
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl Default for ClipRect {
    fn default() -> Self {
        Self {
            x_min: 0,
            y_min: 0,
            x_max: Self::LIMIT,
            y_max: Self::LIMIT,
        }
    }
}

impl ClipRect {
    /// Largest coordinate the clip registers hold
    pub const LIMIT: i32 = 0x1FFFF;

    pub fn from_point_size(point: Point, width: u16, height: u16) -> Self {
        Self {
            x_min: point.x as i32,
            y_min: point.y as i32,
            x_max: point.x as i32 + width as i32,
            y_max: point.y as i32 + height as i32,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    /// Intersection, empty when the rectangles do not overlap
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect {
            x_min: self.x_min.max(other.x_min),
            y_min: self.y_min.max(other.y_min),
            x_max: self.x_max.min(other.x_max),
            y_max: self.y_max.min(other.y_max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }

    /// Register encoding of a clip bound (18-bit two's complement)
    pub fn encode(value: i32) -> u32 {
        (value as u32) & 0x3FFFF
    }

    pub fn decode(value: u32) -> i32 {
        let value = value & 0x3FFFF;
        if value & 0x20000 != 0 {
            (value | !0x3FFFF) as i32
        } else {
            value as i32
        }
    }
}

/// Destination surface of 2D operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    /// Byte offset in VRAM
    pub offset: u32,
    /// Bytes per line
    pub pitch: u32,
    /// Colour format set through the image-in-memory class
    pub format: u32,
}

impl Surface {
    pub const OFFSET_MASK: u32 = 0x003F_FFF0;
    pub const PITCH_MASK: u32 = 0x1FF0;

    pub fn address(&self, x: i32, y: i32, bytes_per_pixel: u32) -> u32 {
        self.offset
            .wrapping_add((y as u32).wrapping_mul(self.pitch))
            .wrapping_add((x as u32).wrapping_mul(bytes_per_pixel))
    }
}

/// Pattern shape selected by `PATTERN_SHAPE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternShape {
    #[default]
    Square8x8 = 0,
    Horizontal64x1 = 1,
    Vertical1x64 = 2,
}

/// Monochrome 2D pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Colours in A1R10G10B10
    pub color: [u32; 2],
    /// Raw colour parameters, used on palettized surfaces
    pub raw: [u32; 2],
    pub alpha: [u32; 2],
    pub bitmap: [u32; 2],
    pub shape: PatternShape,
}

impl Pattern {
    /// Index (0 or 1) of the pattern colour at a pixel
    pub fn select(&self, x: i32, y: i32) -> usize {
        let bit = match self.shape {
            PatternShape::Square8x8 => ((y & 7) * 8 + (x & 7)) as u32,
            PatternShape::Horizontal64x1 => (x & 63) as u32,
            PatternShape::Vertical1x64 => (y & 63) as u32,
        };
        let word = self.bitmap[(bit >> 5) as usize];
        ((word >> (bit & 31)) & 1) as usize
    }

    pub fn shape_register(&self) -> u32 {
        self.shape as u32
    }
}
