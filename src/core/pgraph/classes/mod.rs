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

//! Per-class method handlers
//!
//! Each handler returns `true` when the method completed an operation,
//! which is the point at which a pending notify fires. Methods that only
//! accumulate part of an operation (the point of a point/size pair, image
//! data before the last word) return `false`.
//!
//! | File        | Classes                                                         |
//! |-------------|-----------------------------------------------------------------|
//! | state.rs    | beta, ROP, chroma, plane mask, clip, pattern, image in memory   |
//! | solid.rs    | rectangle, point, line, lin, triangle, GDI text, point zeta     |
//! | transfer.rs | memory to memory, blit, image to memory                         |
//! | image.rs    | image, bitmap, stretched image, scaled image                    |
//! | d3d.rs      | D3D triangle                                                    |

mod d3d;
mod image;
mod solid;
mod state;
mod transfer;

use super::dispatch::ClassMethod;
use super::primitives::{Point, Size};
use super::render::D3dVertex;
use super::{BoundObject, GraphicsBus, Pgraph};
use serde::{Deserialize, Serialize};

/// Method parameters accumulated between calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassState {
    /// Solid colour, A1R10G10B10
    pub solid_color: u32,
    pub solid_raw: u32,
    pub mono_format: u32,

    pub rect_point: Point,
    pub line_start: Point,
    pub polyline_last: Option<Point>,
    pub triangle: [Point; 3],
    pub mesh: [Point; 3],
    pub mesh_count: u32,

    pub gdi_color_a: u32,
    pub gdi_raw_a: u32,
    pub gdi_rect_point: Point,
    pub gdi_color_b: u32,
    pub gdi_raw_b: u32,
    pub gdi_point_b: Point,
    pub gdi_size_b: Size,
    /// Mono pixels consumed so far in the current GDI B rectangle
    pub gdi_mono_cursor: u32,

    pub zeta_control: u32,
    pub zeta_point: Point,

    pub m2mf: [u32; 8],
    pub blit: [u32; 3],
    pub image_to_memory: [u32; 4],

    pub image: [u32; 3],
    pub image_data: Vec<u32>,
    pub bitmap: [u32; 5],
    pub bitmap_data: Vec<u32>,
    pub stretched: [u32; 6],
    pub stretched_data: Vec<u32>,
    pub scaled_rect: [u32; 4],
    pub scaled_source: [u32; 4],

    pub d3d: [u32; 7],
    pub d3d_vertices: [D3dVertex; 3],
    pub d3d_count: u32,
}

impl Pgraph {
    /// Run a class-specific method
    pub(super) fn execute_class_method(
        &mut self,
        bus: &mut GraphicsBus,
        bound: &BoundObject,
        method: ClassMethod,
        index: u32,
        data: u32,
    ) -> bool {
        match method {
            ClassMethod::SetColorFormat => self.set_color_format(bus, bound, data),
            ClassMethod::SetColor => self.set_color(bound, data),
            ClassMethod::SetBeta => self.set_beta(bound, data),
            ClassMethod::SetRop => self.set_rop(bound, data),
            ClassMethod::ClipRectangle => self.clip_rectangle(index, data),
            ClassMethod::SetMonochromeFormat => self.set_mono_format(bound, data),
            ClassMethod::SetPatternShape => self.set_pattern_shape(bound, data),
            ClassMethod::PatternColor => self.pattern_color(bound, index, data),
            ClassMethod::PatternBitmap => self.pattern_bitmap(index, data),
            ClassMethod::ImageInMemoryParameter => self.image_in_memory(index, data),

            ClassMethod::RectanglePair => self.rectangle_pair(bus, index, data),
            ClassMethod::PointAt => self.point_at(bus, data),
            ClassMethod::LinePair => self.line_pair(bound, index, data),
            ClassMethod::Polyline => self.polyline(bound, data),
            ClassMethod::TrianglePoint => self.triangle_point(index, data),
            ClassMethod::TriangleMesh => self.triangle_mesh(data),
            ClassMethod::GdiColorA => self.gdi_color_a(bound, data),
            ClassMethod::GdiRectA => self.gdi_rect_a(bus, index, data),
            ClassMethod::GdiPointB => self.gdi_point_b(data),
            ClassMethod::GdiSizeB => self.gdi_size_b(data),
            ClassMethod::GdiColorB => self.gdi_color_b(bound, data),
            ClassMethod::GdiMonoB => self.gdi_mono_b(bus, data),
            ClassMethod::PointZetaControl => self.point_zeta_control(data),
            ClassMethod::PointZetaPair => self.point_zeta_pair(index, data),

            ClassMethod::M2mfParameter => self.m2mf_parameter(bus, bound, index, data),
            ClassMethod::BlitParameter => self.blit_parameter(bus, index, data),
            ClassMethod::ImageToMemoryParameter => self.image_to_memory_parameter(bus, bound, index, data),

            ClassMethod::ImageParameter => self.image_parameter(index, data),
            ClassMethod::ImageColor => self.image_color(bus, bound, data),
            ClassMethod::BitmapParameter => self.bitmap_parameter(bound, index, data),
            ClassMethod::BitmapData => self.bitmap_data(bus, data),
            ClassMethod::StretchedParameter => self.stretched_parameter(index, data),
            ClassMethod::StretchedColor => self.stretched_color(data),
            ClassMethod::ObjectClip => self.object_clip(index, data),
            ClassMethod::ScaledRect => self.scaled_rect(index, data),
            ClassMethod::ScaledSource => self.scaled_source(index, data),

            ClassMethod::D3dParameter => self.d3d_parameter(index, data),
            ClassMethod::D3dVertex => self.d3d_vertex(index, data),
        }
    }
}
