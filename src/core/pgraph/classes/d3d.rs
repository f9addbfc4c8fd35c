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

//! D3D triangle class
//!
//! Vertices are eight words each, written through the 0x1000-0x1FFC
//! window. Every third complete vertex emits a triangle.

use crate::core::pgraph::render::RenderOp;
use crate::core::pgraph::Pgraph;

const WORDS_PER_VERTEX: u32 = 8;

impl Pgraph {
    /// Texture offset, format, filter, fog colour, control 0-2
    pub(crate) fn d3d_parameter(&mut self, index: u32, data: u32) -> bool {
        self.classes.d3d[(index as usize).min(6)] = data;
        true
    }

    pub(crate) fn d3d_vertex(&mut self, index: u32, data: u32) -> bool {
        let word = index % WORDS_PER_VERTEX;
        let slot = (self.classes.d3d_count % 3) as usize;
        self.classes.d3d_vertices[slot].words[word as usize] = data;
        if word != WORDS_PER_VERTEX - 1 {
            return false;
        }

        self.classes.d3d_count += 1;
        if self.classes.d3d_count % 3 != 0 {
            return false;
        }
        let [texture_offset, texture_format, _filter, _fog, control, _, _] = self.classes.d3d;
        self.record(RenderOp::D3dTriangle {
            texture_offset,
            texture_format,
            control,
            vertices: self.classes.d3d_vertices,
        });
        true
    }
}
