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

//! Rasterization into the destination surface
//!
//! Rectangles, points, blits, images and bitmaps are written straight to
//! VRAM through the current surface, clip and raster operation. Primitives
//! without a rasterizer here (lines, triangles, scaled images, 3D) are
//! recorded as `RenderOp`s for a front end to consume.

use super::primitives::{rop3, Color10, Point, Size};
use super::registers::ClipRect;
use super::Pgraph;
use crate::core::memory::Vram;
use serde::{Deserialize, Serialize};

/// One vertex of a Direct3D triangle: eight dwords as written to the
/// vertex methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3dVertex {
    pub words: [u32; 8],
}

impl D3dVertex {
    pub fn specular(&self) -> u32 {
        self.words[0]
    }

    pub fn color(&self) -> u32 {
        self.words[1]
    }

    pub fn x(&self) -> f32 {
        f32::from_bits(self.words[2])
    }

    pub fn y(&self) -> f32 {
        f32::from_bits(self.words[3])
    }

    pub fn z(&self) -> f32 {
        f32::from_bits(self.words[4])
    }

    pub fn rhw(&self) -> f32 {
        f32::from_bits(self.words[5])
    }

    pub fn u(&self) -> f32 {
        f32::from_bits(self.words[6])
    }

    pub fn v(&self) -> f32 {
        f32::from_bits(self.words[7])
    }
}

/// Operations held between two drains of the queue
pub const MAX_RENDER_OPS: usize = 4096;

/// A drawing operation handed to the front end
///
/// Colours are A1R10G10B10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderOp {
    Line {
        start: Point,
        end: Point,
        color: u32,
        /// The last pixel is not drawn
        lin: bool,
    },
    Triangle {
        points: [Point; 3],
        color: u32,
    },
    StretchedImage {
        /// Integer part of the 12.4 destination point
        point: Point,
        size_in: Size,
        delta_x: u32,
        delta_y: u32,
        clip: ClipRect,
        data: Vec<u32>,
    },
    ScaledImage {
        point: Point,
        size_out: Size,
        size_in: Size,
        delta_x: u32,
        delta_y: u32,
        source_offset: u32,
        source_pitch: u32,
        source_point: u32,
    },
    D3dTriangle {
        texture_offset: u32,
        texture_format: u32,
        control: u32,
        vertices: [D3dVertex; 3],
    },
    PointZeta {
        point: Point,
        color: u32,
        zeta: u32,
    },
}

impl Pgraph {
    /// Framebuffer pixel for an internal colour, with the raw parameter for
    /// palettized surfaces
    pub(crate) fn pixel_of(color: u32, raw: u32, bytes_per_pixel: u32) -> u32 {
        Color10::from_a1r10g10b10(color).to_pixel(bytes_per_pixel, raw)
    }

    pub(crate) fn read_pixel(vram: &Vram, address: u32, bytes_per_pixel: u32) -> Option<u32> {
        if address.checked_add(bytes_per_pixel)? > vram.size() {
            return None;
        }
        Some(match bytes_per_pixel {
            1 => vram.read8(address) as u32,
            2 => vram.read16(address) as u32,
            _ => vram.read32(address),
        })
    }

    pub(crate) fn write_pixel(vram: &mut Vram, address: u32, bytes_per_pixel: u32, pixel: u32) {
        if address
            .checked_add(bytes_per_pixel)
            .map_or(true, |end| end > vram.size())
        {
            log::trace!("PGRAPH: pixel write outside VRAM at 0x{:08X}", address);
            return;
        }
        match bytes_per_pixel {
            1 => vram.write8(address, pixel as u8),
            2 => vram.write16(address, pixel as u16),
            _ => vram.write32(address, pixel),
        }
    }

    /// Visible area of the surface: user clip limited to the surface width
    pub(crate) fn draw_clip(&self, bytes_per_pixel: u32) -> ClipRect {
        let width = if self.surface.pitch == 0 {
            ClipRect::LIMIT
        } else {
            (self.surface.pitch / bytes_per_pixel.max(1)) as i32
        };
        self.user_clip.intersect(&ClipRect {
            x_min: 0,
            y_min: 0,
            x_max: width,
            y_max: ClipRect::LIMIT,
        })
    }

    /// Run one pixel through pattern, ROP and plane mask
    fn shade(&self, x: i32, y: i32, source: u32, dest: u32, bytes_per_pixel: u32) -> u32 {
        let select = self.pattern.select(x, y);
        let pattern = Self::pixel_of(
            self.pattern.color[select],
            self.pattern.raw[select],
            bytes_per_pixel,
        );
        let result = rop3(self.rop, pattern, source, dest);
        let mask = Self::pixel_of(self.plane_mask, self.plane_mask_raw, bytes_per_pixel);
        (result & mask) | (dest & !mask)
    }

    /// Fill a rectangle with a solid colour
    ///
    /// # Arguments
    ///
    /// * `rect` - Target rectangle, clipped against the surface
    /// * `color` - A1R10G10B10 colour
    /// * `raw` - Method parameter, used as the pixel on 8bpp surfaces
    pub(crate) fn fill_rect(
        &mut self,
        vram: &mut Vram,
        rect: ClipRect,
        color: u32,
        raw: u32,
        bytes_per_pixel: u32,
    ) {
        let area = rect.intersect(&self.draw_clip(bytes_per_pixel));
        if area.is_empty() {
            return;
        }
        let source = Self::pixel_of(color, raw, bytes_per_pixel);

        for y in area.y_min..area.y_max {
            for x in area.x_min..area.x_max {
                let address = self.surface.address(x, y, bytes_per_pixel);
                let Some(dest) = Self::read_pixel(vram, address, bytes_per_pixel) else {
                    continue;
                };
                let pixel = self.shade(x, y, source, dest, bytes_per_pixel);
                Self::write_pixel(vram, address, bytes_per_pixel, pixel);
            }
        }
    }

    /// Plot one pixel if it lies inside the clip
    pub(crate) fn plot(
        &mut self,
        vram: &mut Vram,
        point: Point,
        color: u32,
        raw: u32,
        bytes_per_pixel: u32,
    ) {
        let rect = ClipRect::from_point_size(point, 1, 1);
        self.fill_rect(vram, rect, color, raw, bytes_per_pixel);
    }

    /// Copy a rectangle within the surface
    ///
    /// The source is read in full before anything is written, so
    /// overlapping copies behave like a move.
    pub(crate) fn blit(
        &mut self,
        vram: &mut Vram,
        source: Point,
        dest: Point,
        size: Size,
        bytes_per_pixel: u32,
    ) {
        let width = size.width as i32;
        let height = size.height as i32;
        let mut buffer = Vec::with_capacity(size.area() as usize);
        for y in 0..height {
            for x in 0..width {
                let address = self.surface.address(
                    source.x as i32 + x,
                    source.y as i32 + y,
                    bytes_per_pixel,
                );
                buffer.push(Self::read_pixel(vram, address, bytes_per_pixel).unwrap_or(0));
            }
        }

        let clip = self.draw_clip(bytes_per_pixel);
        let chroma_enabled = Color10::from_a1r10g10b10(self.chroma).alpha;
        let chroma = Self::pixel_of(self.chroma, self.chroma_raw, bytes_per_pixel);

        for y in 0..height {
            for x in 0..width {
                let dx = dest.x as i32 + x;
                let dy = dest.y as i32 + y;
                if !clip.contains(dx, dy) {
                    continue;
                }
                let src = buffer[(y * width + x) as usize];
                if chroma_enabled && src == chroma {
                    continue;
                }
                let address = self.surface.address(dx, dy, bytes_per_pixel);
                let Some(current) = Self::read_pixel(vram, address, bytes_per_pixel) else {
                    continue;
                };
                let pixel = self.shade(dx, dy, src, current, bytes_per_pixel);
                Self::write_pixel(vram, address, bytes_per_pixel, pixel);
            }
        }

        log::trace!(
            "PGRAPH: blit ({}, {}) -> ({}, {}) {}x{}",
            source.x,
            source.y,
            dest.x,
            dest.y,
            size.width,
            size.height
        );
    }

    /// Queue an operation for the external rasterizer
    ///
    /// The queue holds at most [`MAX_RENDER_OPS`] entries until the caller
    /// drains it with `Nv3::drain_render_ops`; operations recorded past the
    /// cap are dropped.
    pub(crate) fn record(&mut self, op: RenderOp) {
        if self.render_ops.len() >= MAX_RENDER_OPS {
            if self.render_ops.len() == MAX_RENDER_OPS {
                log::warn!(
                    "PGRAPH: render op queue full ({} ops), dropping until drained",
                    MAX_RENDER_OPS
                );
            }
            return;
        }
        log::trace!("PGRAPH: render op {:?}", op);
        self.render_ops.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x: i16) -> RenderOp {
        RenderOp::Line {
            start: Point { x: 0, y: 0 },
            end: Point { x, y: 0 },
            color: 0,
            lin: false,
        }
    }

    #[test]
    fn test_render_ops_capped_until_drained() {
        let mut pgraph = Pgraph::new(true);
        for i in 0..MAX_RENDER_OPS + 10 {
            pgraph.record(line((i & 0x7FF) as i16));
        }
        assert_eq!(pgraph.render_ops().len(), MAX_RENDER_OPS);
        assert_eq!(pgraph.render_ops()[0], line(0));
        assert_eq!(pgraph.render_ops()[MAX_RENDER_OPS - 1], line(0x7FF));

        assert_eq!(pgraph.drain_render_ops().len(), MAX_RENDER_OPS);
        pgraph.record(line(1));
        assert_eq!(pgraph.render_ops().len(), 1);
    }

    #[test]
    fn test_d3d_vertex_floats() {
        let mut vertex = D3dVertex::default();
        vertex.words[2] = 1.5f32.to_bits();
        vertex.words[3] = (-2.0f32).to_bits();
        vertex.words[7] = 0.25f32.to_bits();
        assert_eq!(vertex.x(), 1.5);
        assert_eq!(vertex.y(), -2.0);
        assert_eq!(vertex.v(), 0.25);
    }

    #[test]
    fn test_pixel_access_bounds() {
        let mut vram = Vram::new(1024 * 1024);
        let end = vram.size();
        Pgraph::write_pixel(&mut vram, end - 2, 4, 0xFFFF_FFFF);
        assert_eq!(vram.read16(end - 2), 0);
        assert_eq!(Pgraph::read_pixel(&vram, end - 2, 4), None);

        Pgraph::write_pixel(&mut vram, 0x100, 2, 0x1234_5678);
        assert_eq!(Pgraph::read_pixel(&vram, 0x100, 2), Some(0x5678));
    }
}
