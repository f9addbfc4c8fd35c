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

//! Solid primitives: rectangles, points, lines, triangles, GDI text and
//! point/zeta
//!
//! Rectangles, points and GDI text are rasterized straight into the
//! surface. Lines, triangles and point/zeta pairs are recorded as render
//! operations.

use super::state::mono_format;
use crate::core::pgraph::dispatch::class;
use crate::core::pgraph::primitives::{Point, Size};
use crate::core::pgraph::registers::ClipRect;
use crate::core::pgraph::render::RenderOp;
use crate::core::pgraph::{BoundObject, GraphicsBus, Pgraph};

impl Pgraph {
    /// Even index: point; odd index: size, which draws
    pub(crate) fn rectangle_pair(&mut self, bus: &mut GraphicsBus, index: u32, data: u32) -> bool {
        if index & 1 == 0 {
            self.classes.rect_point = Point::from_u32(data);
            return false;
        }
        let size = Size::from_u32(data);
        let rect = ClipRect::from_point_size(self.classes.rect_point, size.width, size.height);
        let (color, raw) = (self.classes.solid_color, self.classes.solid_raw);
        self.fill_rect(bus.vram, rect, color, raw, bus.bytes_per_pixel);
        true
    }

    pub(crate) fn point_at(&mut self, bus: &mut GraphicsBus, data: u32) -> bool {
        let point = Point::from_u32(data);
        let (color, raw) = (self.classes.solid_color, self.classes.solid_raw);
        self.plot(bus.vram, point, color, raw, bus.bytes_per_pixel);
        true
    }

    pub(crate) fn line_pair(&mut self, bound: &BoundObject, index: u32, data: u32) -> bool {
        let point = Point::from_u32(data);
        if index & 1 == 0 {
            self.classes.line_start = point;
            return false;
        }
        self.record(RenderOp::Line {
            start: self.classes.line_start,
            end: point,
            color: self.classes.solid_color,
            lin: bound.class == class::LIN,
        });
        true
    }

    /// Each point continues the line from the previous one
    pub(crate) fn polyline(&mut self, bound: &BoundObject, data: u32) -> bool {
        let point = Point::from_u32(data);
        let Some(start) = self.classes.polyline_last.replace(point) else {
            return false;
        };
        self.record(RenderOp::Line {
            start,
            end: point,
            color: self.classes.solid_color,
            lin: bound.class == class::LIN,
        });
        true
    }

    pub(crate) fn triangle_point(&mut self, index: u32, data: u32) -> bool {
        let slot = (index as usize).min(2);
        self.classes.triangle[slot] = Point::from_u32(data);
        if slot < 2 {
            return false;
        }
        self.record(RenderOp::Triangle {
            points: self.classes.triangle,
            color: self.classes.solid_color,
        });
        self.classes.mesh = self.classes.triangle;
        self.classes.mesh_count = 3;
        true
    }

    /// Triangle strip: every point after the second draws a triangle with
    /// the two before it
    pub(crate) fn triangle_mesh(&mut self, data: u32) -> bool {
        let point = Point::from_u32(data);
        let mesh = &mut self.classes.mesh;
        if self.classes.mesh_count < 3 {
            mesh[self.classes.mesh_count as usize] = point;
            self.classes.mesh_count += 1;
        } else {
            mesh.rotate_left(1);
            mesh[2] = point;
        }
        if self.classes.mesh_count < 3 {
            return false;
        }
        self.record(RenderOp::Triangle {
            points: self.classes.mesh,
            color: self.classes.solid_color,
        });
        true
    }

    pub(crate) fn gdi_color_a(&mut self, bound: &BoundObject, data: u32) -> bool {
        self.classes.gdi_color_a = bound.expand(data).to_a1r10g10b10();
        self.classes.gdi_raw_a = data;
        true
    }

    /// GDI solid rectangles, same pairing as the rectangle class
    pub(crate) fn gdi_rect_a(&mut self, bus: &mut GraphicsBus, index: u32, data: u32) -> bool {
        if index & 1 == 0 {
            self.classes.gdi_rect_point = Point::from_u32(data);
            return false;
        }
        let size = Size::from_u32(data);
        let rect = ClipRect::from_point_size(self.classes.gdi_rect_point, size.width, size.height);
        let (color, raw) = (self.classes.gdi_color_a, self.classes.gdi_raw_a);
        self.fill_rect(bus.vram, rect, color, raw, bus.bytes_per_pixel);
        true
    }

    pub(crate) fn gdi_point_b(&mut self, data: u32) -> bool {
        self.classes.gdi_point_b = Point::from_u32(data);
        self.classes.gdi_mono_cursor = 0;
        false
    }

    pub(crate) fn gdi_size_b(&mut self, data: u32) -> bool {
        self.classes.gdi_size_b = Size::from_u32(data);
        self.classes.gdi_mono_cursor = 0;
        false
    }

    pub(crate) fn gdi_color_b(&mut self, bound: &BoundObject, data: u32) -> bool {
        self.classes.gdi_color_b = bound.expand(data).to_a1r10g10b10();
        self.classes.gdi_raw_b = data;
        false
    }

    /// 32 monochrome pixels of the GDI B rectangle
    ///
    /// Rows are padded to whole words. Set bits draw colour B; clear bits
    /// leave the surface untouched. Returns `true` with the word that
    /// finishes the rectangle.
    pub(crate) fn gdi_mono_b(&mut self, bus: &mut GraphicsBus, data: u32) -> bool {
        let size = self.classes.gdi_size_b;
        let width = size.width as u32;
        if width == 0 || size.height == 0 {
            return false;
        }
        let words_per_row = width.div_ceil(32);
        let word_index = self.classes.gdi_mono_cursor;
        let row = word_index / words_per_row;
        if row >= size.height as u32 {
            log::debug!("PGRAPH: GDI mono data past the end of the rectangle");
            return false;
        }
        let first_column = (word_index % words_per_row) * 32;

        let origin = self.classes.gdi_point_b;
        let (color, raw) = (self.classes.gdi_color_b, self.classes.gdi_raw_b);
        for bit in 0..32u32 {
            let column = first_column + bit;
            if column >= width {
                break;
            }
            let mask = if self.classes.mono_format == mono_format::CGA6_M1 {
                0x8000_0000 >> bit
            } else {
                1 << bit
            };
            if data & mask == 0 {
                continue;
            }
            let point = Point {
                x: origin.x.wrapping_add(column as i16),
                y: origin.y.wrapping_add(row as i16),
            };
            self.plot(bus.vram, point, color, raw, bus.bytes_per_pixel);
        }

        self.classes.gdi_mono_cursor += 1;
        self.classes.gdi_mono_cursor == words_per_row * size.height as u32
    }

    pub(crate) fn point_zeta_control(&mut self, data: u32) -> bool {
        self.classes.zeta_control = data;
        true
    }

    /// Even index: point; odd index: zeta value, which draws
    pub(crate) fn point_zeta_pair(&mut self, index: u32, data: u32) -> bool {
        if index & 1 == 0 {
            self.classes.zeta_point = Point::from_u32(data);
            return false;
        }
        self.record(RenderOp::PointZeta {
            point: self.classes.zeta_point,
            color: self.classes.solid_color,
            zeta: data,
        });
        true
    }
}
