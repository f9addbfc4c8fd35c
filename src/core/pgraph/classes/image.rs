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

//! Image classes
//!
//! Image and bitmap data is streamed one word per method. Rows are padded
//! to whole words; the word that completes the image draws it.

use super::state::mono_format;
use crate::core::pgraph::primitives::{Color10, Point, Size};
use crate::core::pgraph::registers::ClipRect;
use crate::core::pgraph::render::RenderOp;
use crate::core::pgraph::{BoundObject, GraphicsBus, Pgraph};

impl Pgraph {
    /// Point, size out, size in; loading the input size starts a new image
    pub(crate) fn image_parameter(&mut self, index: u32, data: u32) -> bool {
        self.classes.image[(index as usize).min(2)] = data;
        if index >= 2 {
            self.classes.image_data.clear();
        }
        false
    }

    pub(crate) fn image_color(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        data: u32,
    ) -> bool {
        let size_in = Size::from_u32(self.classes.image[2]);
        let format = bound.color_format();
        let per_word = format.pixels_per_word();
        let words_per_row = (size_in.width as u32).div_ceil(per_word);
        let total = words_per_row * size_in.height as u32;
        if total == 0 {
            return false;
        }

        self.classes.image_data.push(data);
        if (self.classes.image_data.len() as u32) < total {
            return false;
        }

        let point = Point::from_u32(self.classes.image[0]);
        let size_out = Size::from_u32(self.classes.image[1]);
        let data = std::mem::take(&mut self.classes.image_data);
        let bits = 32 / per_word;

        for row in 0..size_in.height.min(size_out.height) as u32 {
            for column in 0..size_in.width.min(size_out.width) as u32 {
                let word = data[(row * words_per_row + column / per_word) as usize];
                let shift = (column % per_word) * bits;
                let raw = if bits == 32 {
                    word
                } else {
                    (word >> shift) & ((1 << bits) - 1)
                };
                let color = Color10::expand(format, raw, bound.object.alpha_enabled());
                if !color.alpha {
                    continue;
                }
                let target = Point {
                    x: point.x.wrapping_add(column as i16),
                    y: point.y.wrapping_add(row as i16),
                };
                self.plot(
                    bus.vram,
                    target,
                    color.to_a1r10g10b10(),
                    raw,
                    bus.bytes_per_pixel,
                );
            }
        }
        log::trace!(
            "PGRAPH: image {}x{} at ({}, {})",
            size_in.width,
            size_in.height,
            point.x,
            point.y
        );
        true
    }

    /// Colour 0, colour 1, point, size out, size in
    pub(crate) fn bitmap_parameter(&mut self, bound: &BoundObject, index: u32, data: u32) -> bool {
        let slot = (index as usize).min(4);
        self.classes.bitmap[slot] = match slot {
            0 | 1 => bound.expand(data).to_a1r10g10b10(),
            _ => data,
        };
        if slot == 4 {
            self.classes.bitmap_data.clear();
        }
        false
    }

    /// Set bits draw colour 1, clear bits colour 0; a colour with its alpha
    /// bit clear is transparent
    pub(crate) fn bitmap_data(&mut self, bus: &mut GraphicsBus, data: u32) -> bool {
        let size_in = Size::from_u32(self.classes.bitmap[4]);
        let words_per_row = (size_in.width as u32).div_ceil(32);
        let total = words_per_row * size_in.height as u32;
        if total == 0 {
            return false;
        }

        self.classes.bitmap_data.push(data);
        if (self.classes.bitmap_data.len() as u32) < total {
            return false;
        }

        let colors = [self.classes.bitmap[0], self.classes.bitmap[1]];
        let point = Point::from_u32(self.classes.bitmap[2]);
        let size_out = Size::from_u32(self.classes.bitmap[3]);
        let data = std::mem::take(&mut self.classes.bitmap_data);
        let msb_first = self.classes.mono_format == mono_format::CGA6_M1;

        for row in 0..size_in.height.min(size_out.height) as u32 {
            for column in 0..size_in.width.min(size_out.width) as u32 {
                let word = data[(row * words_per_row + column / 32) as usize];
                let bit = column % 32;
                let set = if msb_first {
                    word & (0x8000_0000 >> bit) != 0
                } else {
                    word & (1 << bit) != 0
                };
                let color = colors[set as usize];
                if !Color10::from_a1r10g10b10(color).alpha {
                    continue;
                }
                let target = Point {
                    x: point.x.wrapping_add(column as i16),
                    y: point.y.wrapping_add(row as i16),
                };
                self.plot(bus.vram, target, color, color, bus.bytes_per_pixel);
            }
        }
        true
    }

    /// Size in, dx/ds, dy/dt, clip point, clip size, point (12.4)
    pub(crate) fn stretched_parameter(&mut self, index: u32, data: u32) -> bool {
        self.classes.stretched[(index as usize).min(5)] = data;
        if index >= 5 {
            self.classes.stretched_data.clear();
        }
        false
    }

    pub(crate) fn stretched_color(&mut self, data: u32) -> bool {
        let [size_in, delta_x, delta_y, clip_point, clip_size, point] = self.classes.stretched;
        let size_in = Size::from_u32(size_in);
        if size_in.area() == 0 {
            return false;
        }

        self.classes.stretched_data.push(data);
        if (self.classes.stretched_data.len() as u32) < size_in.area() {
            return false;
        }

        let clip_size = Size::from_u32(clip_size);
        let op = RenderOp::StretchedImage {
            point: Point {
                x: (point as u16 as i16) >> 4,
                y: ((point >> 16) as u16 as i16) >> 4,
            },
            size_in,
            delta_x,
            delta_y,
            clip: ClipRect::from_point_size(
                Point::from_u32(clip_point),
                clip_size.width,
                clip_size.height,
            ),
            data: std::mem::take(&mut self.classes.stretched_data),
        };
        self.record(op);
        true
    }

    /// Destination point, destination size, du/dx, dv/dy
    pub(crate) fn scaled_rect(&mut self, index: u32, data: u32) -> bool {
        self.classes.scaled_rect[(index as usize).min(3)] = data;
        false
    }

    /// Source size, pitch, offset, point; the point starts the operation
    pub(crate) fn scaled_source(&mut self, index: u32, data: u32) -> bool {
        self.classes.scaled_source[(index as usize).min(3)] = data;
        if index < 3 {
            return false;
        }
        let [point, size_out, delta_x, delta_y] = self.classes.scaled_rect;
        let [size_in, pitch, offset, source_point] = self.classes.scaled_source;
        self.record(RenderOp::ScaledImage {
            point: Point::from_u32(point),
            size_out: Size::from_u32(size_out),
            size_in: Size::from_u32(size_in),
            delta_x,
            delta_y,
            source_offset: offset,
            source_pitch: pitch & 0xFFFF,
            source_point,
        });
        true
    }
}
