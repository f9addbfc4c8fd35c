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

//! Copy classes: memory to memory, blit and image to memory

use crate::core::pgraph::dma::DmaPort;
use crate::core::pgraph::primitives::{Point, Size};
use crate::core::pgraph::registers::PgraphStatus;
use crate::core::pgraph::{BoundObject, GraphicsBus, Pgraph};

/// Memory to memory parameter slots
mod m2mf {
    pub const OFFSET_IN: usize = 0;
    pub const OFFSET_OUT: usize = 1;
    pub const PITCH_IN: usize = 2;
    pub const PITCH_OUT: usize = 3;
    pub const LINE_LENGTH: usize = 4;
    pub const LINE_COUNT: usize = 5;
    pub const FORMAT: usize = 6;
    pub const BUFFER_NOTIFY: u32 = 7;
}

impl Pgraph {
    /// Memory to memory format: input and output unit size (1, 2 or 4)
    fn m2mf_format_valid(format: u32) -> bool {
        matches!(format & 0xFF, 1 | 2 | 4) && matches!((format >> 8) & 0xFF, 1 | 2 | 4)
    }

    /// Memory to memory parameters; `BUFFER_NOTIFY` starts the transfer
    pub(crate) fn m2mf_parameter(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        index: u32,
        data: u32,
    ) -> bool {
        if index != m2mf::BUFFER_NOTIFY {
            self.classes.m2mf[index as usize & 7] = data;
            return false;
        }

        let params = self.classes.m2mf;
        if !Self::m2mf_format_valid(params[m2mf::FORMAT]) {
            self.invalid_data(bound, "M2MF format", params[m2mf::FORMAT]);
            return false;
        }

        let source = bound.object.source_instance();
        let destination = bound.object.destination_instance();
        let words = params[m2mf::LINE_LENGTH].div_ceil(4);

        log::debug!(
            "PGRAPH: M2MF {} lines x {} bytes, 0x{:04X}+0x{:08X} -> 0x{:04X}+0x{:08X}",
            params[m2mf::LINE_COUNT],
            params[m2mf::LINE_LENGTH],
            source,
            params[m2mf::OFFSET_IN],
            destination,
            params[m2mf::OFFSET_OUT]
        );

        self.status.set(PgraphStatus::DMA_ENGINE, true);
        let mut ok = true;
        'lines: for line in 0..params[m2mf::LINE_COUNT] {
            let line_in = params[m2mf::OFFSET_IN]
                .wrapping_add(line.wrapping_mul(params[m2mf::PITCH_IN]));
            let line_out = params[m2mf::OFFSET_OUT]
                .wrapping_add(line.wrapping_mul(params[m2mf::PITCH_OUT]));
            for word in 0..words {
                let offset_in = line_in.wrapping_add(word * 4);
                let offset_out = line_out.wrapping_add(word * 4);
                let Some(value) = self.dma_read32(bus, DmaPort::Transfer, source, offset_in) else {
                    ok = false;
                    break 'lines;
                };
                if !self.dma_write32(bus, DmaPort::Transfer, destination, offset_out, value) {
                    ok = false;
                    break 'lines;
                }
            }
        }
        self.status.set(PgraphStatus::DMA_ENGINE, false);
        ok
    }

    /// Point in, point out, size; the size starts the copy
    pub(crate) fn blit_parameter(&mut self, bus: &mut GraphicsBus, index: u32, data: u32) -> bool {
        self.classes.blit[(index as usize).min(2)] = data;
        if index < 2 {
            return false;
        }
        let source = Point::from_u32(self.classes.blit[0]);
        let dest = Point::from_u32(self.classes.blit[1]);
        let size = Size::from_u32(self.classes.blit[2]);
        self.blit(bus.vram, source, dest, size, bus.bytes_per_pixel);
        true
    }

    /// Point, size, pitch, offset; the offset starts the copy out of the
    /// surface into the destination DMA object
    pub(crate) fn image_to_memory_parameter(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        index: u32,
        data: u32,
    ) -> bool {
        self.classes.image_to_memory[(index as usize).min(3)] = data;
        if index < 3 {
            return false;
        }

        let [point, size, pitch, offset] = self.classes.image_to_memory;
        let point = Point::from_u32(point);
        let size = Size::from_u32(size);
        let bpp = bus.bytes_per_pixel;
        let words = (size.width as u32 * bpp).div_ceil(4);
        let destination = bound.object.destination_instance();

        self.status.set(PgraphStatus::DMA_ENGINE, true);
        let mut ok = true;
        'rows: for row in 0..size.height as u32 {
            let src = self
                .surface
                .address(point.x as i32, point.y as i32 + row as i32, bpp);
            for word in 0..words {
                let value = bus.vram.read32(src.wrapping_add(word * 4));
                let out = offset
                    .wrapping_add(row.wrapping_mul(pitch))
                    .wrapping_add(word * 4);
                if !self.dma_write32(bus, DmaPort::Transfer, destination, out, value) {
                    ok = false;
                    break 'rows;
                }
            }
        }
        self.status.set(PgraphStatus::DMA_ENGINE, false);
        ok
    }
}
