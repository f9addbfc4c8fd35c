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

//! Context-state classes
//!
//! These classes only load PGRAPH state registers; nothing is drawn.

use crate::core::pgraph::dispatch::class;
use crate::core::pgraph::primitives::{Color10, ColorFormat, Point, Size};
use crate::core::pgraph::registers::{ClipRect, PatternShape, Surface};
use crate::core::pgraph::{BoundObject, GraphicsBus, Pgraph};

/// Monochrome bit orders accepted by `SET_MONOCHROME_FORMAT`
pub mod mono_format {
    /// Leftmost pixel in bit 31 of each byte group
    pub const CGA6_M1: u32 = 1;
    /// Leftmost pixel in bit 0
    pub const LE_M1: u32 = 2;
}

impl Pgraph {
    /// Rewrite the colour format field of the object instance
    pub(crate) fn set_color_format(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        data: u32,
    ) -> bool {
        if ColorFormat::from_bits(data).is_none() || data > 7 {
            self.invalid_data(bound, "SET_COLOR_FORMAT", data);
            return false;
        }
        let mut object = bound.object;
        object.words[0] = (object.words[0] & !7) | (data & 7);
        object.write(bus.vram, bound.instance_address);

        if bound.class == class::IMAGE_IN_MEMORY {
            self.surface.format = data & 7;
        }
        true
    }

    pub(crate) fn set_color(&mut self, bound: &BoundObject, data: u32) -> bool {
        let color = bound.expand(data).to_a1r10g10b10();
        match bound.class {
            class::CHROMA => {
                self.chroma = color;
                self.chroma_raw = data;
            }
            class::PLANE_MASK => {
                self.plane_mask = color;
                self.plane_mask_raw = data;
            }
            _ => {
                self.classes.solid_color = color;
                self.classes.solid_raw = data;
            }
        }
        true
    }

    /// Beta is a 1.31 fraction; negative values clamp to 0
    pub(crate) fn set_beta(&mut self, bound: &BoundObject, data: u32) -> bool {
        if (data as i32) < 0 {
            log::debug!("PGRAPH: negative beta clamped (class 0x{:02X})", bound.class);
            self.beta = 0;
        } else {
            self.beta = data & 0x7F80_0000;
        }
        true
    }

    pub(crate) fn set_rop(&mut self, bound: &BoundObject, data: u32) -> bool {
        if data > 0xFF {
            self.invalid_data(bound, "SET_ROP", data);
            return false;
        }
        self.rop = data as u8;
        true
    }

    fn load_clip(clip: &mut ClipRect, index: u32, data: u32) -> bool {
        if index == 0 {
            let point = Point::from_u32(data);
            clip.x_min = point.x as i32;
            clip.y_min = point.y as i32;
            false
        } else {
            let size = Size::from_u32(data);
            clip.x_max = clip.x_min + size.width as i32;
            clip.y_max = clip.y_min + size.height as i32;
            true
        }
    }

    /// Clip class: point then size
    pub(crate) fn clip_rectangle(&mut self, index: u32, data: u32) -> bool {
        Self::load_clip(&mut self.user_clip, index, data)
    }

    /// Scaled image object clip
    pub(crate) fn object_clip(&mut self, index: u32, data: u32) -> bool {
        Self::load_clip(&mut self.object_clip, index, data)
    }

    pub(crate) fn set_mono_format(&mut self, bound: &BoundObject, data: u32) -> bool {
        if data != mono_format::CGA6_M1 && data != mono_format::LE_M1 {
            self.invalid_data(bound, "SET_MONOCHROME_FORMAT", data);
            return false;
        }
        self.classes.mono_format = data;
        true
    }

    pub(crate) fn set_pattern_shape(&mut self, bound: &BoundObject, data: u32) -> bool {
        self.pattern.shape = match data {
            0 => PatternShape::Square8x8,
            1 => PatternShape::Horizontal64x1,
            2 => PatternShape::Vertical1x64,
            _ => {
                self.invalid_data(bound, "SET_PATTERN_SHAPE", data);
                return false;
            }
        };
        true
    }

    pub(crate) fn pattern_color(&mut self, bound: &BoundObject, index: u32, data: u32) -> bool {
        let slot = (index & 1) as usize;
        let color: Color10 = bound.expand(data);
        self.pattern.color[slot] = color.to_a1r10g10b10();
        self.pattern.raw[slot] = data;
        self.pattern.alpha[slot] = if color.alpha { 0xFF } else { 0 };
        true
    }

    pub(crate) fn pattern_bitmap(&mut self, index: u32, data: u32) -> bool {
        self.pattern.bitmap[(index & 1) as usize] = data;
        true
    }

    /// Destination surface: pitch then offset
    pub(crate) fn image_in_memory(&mut self, index: u32, data: u32) -> bool {
        match index {
            0 => self.surface.pitch = data & Surface::PITCH_MASK,
            _ => self.surface.offset = data & Surface::OFFSET_MASK,
        }
        log::debug!(
            "PGRAPH: surface offset 0x{:06X} pitch {}",
            self.surface.offset,
            self.surface.pitch
        );
        true
    }
}
