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

//! Method dispatch tables
//!
//! Every class owns a 0x2000-byte method window. A method offset resolves in
//! three steps:
//!
//! 1. the generic methods shared by all classes (`0x0000`, `0x0100`,
//!    `0x0104`, `0x0180`)
//! 2. the class table: sorted, non-overlapping `{start, end, method}`
//!    ranges searched with a binary search
//! 3. anything left is a software method for the driver to emulate
//!
//! Ranges hold consecutive 32-bit registers; the handler receives the
//! register index inside its range. Methods that come in pairs (a point
//! followed by a size, for instance) use one range, with even indices for
//! the first word and odd indices for the second.
//!
//! ## Class windows
//!
//! | Class | Window   | Object                       |
//! |-------|----------|------------------------------|
//! | 0x01  | 0x410000 | beta factor                  |
//! | 0x02  | 0x420000 | ROP                          |
//! | 0x03  | 0x430000 | chroma key                   |
//! | 0x04  | 0x440000 | plane mask                   |
//! | 0x05  | 0x450000 | clip rectangle               |
//! | 0x06  | 0x460000 | pattern                      |
//! | 0x07  | 0x470000 | rectangle                    |
//! | 0x08  | 0x480000 | point                        |
//! | 0x09  | 0x490000 | line                         |
//! | 0x0A  | 0x4A0000 | lin                          |
//! | 0x0B  | 0x4B0000 | triangle                     |
//! | 0x0C  | 0x4C0000 | GDI rectangle text           |
//! | 0x0D  | 0x4D0000 | memory to memory format      |
//! | 0x0E  | 0x4E0000 | scaled image from memory     |
//! | 0x10  | 0x500000 | blit                         |
//! | 0x11  | 0x510000 | image from CPU               |
//! | 0x12  | 0x520000 | bitmap from CPU              |
//! | 0x14  | 0x540000 | image to memory              |
//! | 0x15  | 0x550000 | stretched image from CPU     |
//! | 0x17  | 0x570000 | D3D5 textured triangle       |
//! | 0x18  | 0x580000 | point with zeta              |
//! | 0x1C  | 0x5C0000 | image in memory (surface)    |

/// Class ids as decoded by PGRAPH
pub mod class {
    pub const BETA: u8 = 0x01;
    pub const ROP: u8 = 0x02;
    pub const CHROMA: u8 = 0x03;
    pub const PLANE_MASK: u8 = 0x04;
    pub const CLIP: u8 = 0x05;
    pub const PATTERN: u8 = 0x06;
    pub const RECTANGLE: u8 = 0x07;
    pub const POINT: u8 = 0x08;
    pub const LINE: u8 = 0x09;
    pub const LIN: u8 = 0x0A;
    pub const TRIANGLE: u8 = 0x0B;
    pub const GDI_TEXT: u8 = 0x0C;
    pub const M2MF: u8 = 0x0D;
    pub const SCALED_IMAGE: u8 = 0x0E;
    pub const BLIT: u8 = 0x10;
    pub const IMAGE: u8 = 0x11;
    pub const BITMAP: u8 = 0x12;
    pub const IMAGE_TO_MEMORY: u8 = 0x14;
    pub const STRETCHED_IMAGE: u8 = 0x15;
    pub const D3D_TRIANGLE: u8 = 0x17;
    pub const POINT_ZETA: u8 = 0x18;
    pub const IMAGE_IN_MEMORY: u8 = 0x1C;

    /// Every class PGRAPH implements
    pub const ALL: [u8; 22] = [
        BETA,
        ROP,
        CHROMA,
        PLANE_MASK,
        CLIP,
        PATTERN,
        RECTANGLE,
        POINT,
        LINE,
        LIN,
        TRIANGLE,
        GDI_TEXT,
        M2MF,
        SCALED_IMAGE,
        BLIT,
        IMAGE,
        BITMAP,
        IMAGE_TO_MEMORY,
        STRETCHED_IMAGE,
        D3D_TRIANGLE,
        POINT_ZETA,
        IMAGE_IN_MEMORY,
    ];
}

/// First byte of the class method windows
pub const CLASS_WINDOW_BASE: u32 = 0x400000;

/// Bytes of method space per class
pub const CLASS_WINDOW_SIZE: u32 = 0x2000;

/// Start address of a class's method window
///
/// # Examples
///
/// ```
/// use nv3rx::core::pgraph::{class, class_window};
///
/// assert_eq!(class_window(class::RECTANGLE), 0x470000);
/// assert_eq!(class_window(class::IMAGE_IN_MEMORY), 0x5C0000);
/// ```
pub fn class_window(class: u8) -> u32 {
    CLASS_WINDOW_BASE + (((class & 0x1F) as u32) << 16)
}

/// Decode an MMIO address inside a class window into `(class, method)`
pub fn decode_class_window(addr: u32) -> Option<(u8, u32)> {
    if addr < CLASS_WINDOW_BASE + 0x10000 || addr > 0x5C1FFF {
        return None;
    }
    let offset = addr - CLASS_WINDOW_BASE;
    let method = offset & 0xFFFF;
    if method >= CLASS_WINDOW_SIZE {
        return None;
    }
    let class = (offset >> 16) as u8;
    is_valid_class(class).then_some((class, method & 0x1FFC))
}

pub fn is_valid_class(class: u8) -> bool {
    class::ALL.contains(&class)
}

/// Methods every class accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericMethod {
    SetObject,
    NoOperation,
    Notify,
    SetContextDmaNotify,
}

impl GenericMethod {
    pub fn from_method(method: u32) -> Option<Self> {
        match method {
            0x0000 => Some(GenericMethod::SetObject),
            0x0100 => Some(GenericMethod::NoOperation),
            0x0104 => Some(GenericMethod::Notify),
            0x0180 => Some(GenericMethod::SetContextDmaNotify),
            _ => None,
        }
    }
}

/// Class-specific method handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMethod {
    /// Colour format of the object instance
    SetColorFormat,
    /// Solid colour in the object's colour format
    SetColor,

    SetBeta,
    SetRop,
    /// Clip point (0) and size (1)
    ClipRectangle,

    SetMonochromeFormat,
    SetPatternShape,
    PatternColor,
    PatternBitmap,

    /// Rectangle point/size pairs
    RectanglePair,
    PointAt,
    /// Line start/end pairs
    LinePair,
    Polyline,
    TrianglePoint,
    TriangleMesh,

    GdiColorA,
    /// Solid rectangle point/size pairs
    GdiRectA,
    GdiPointB,
    GdiSizeB,
    GdiColorB,
    GdiMonoB,

    /// Offset in/out, pitch in/out, line length, line count, format,
    /// buffer notify (starts the transfer)
    M2mfParameter,

    /// Object clip point (0) and size (1)
    ObjectClip,
    /// Destination point, destination size, du/dx, dv/dy
    ScaledRect,
    /// Source size, pitch, offset, point (starts the operation)
    ScaledSource,

    /// Point in, point out, size (starts the copy)
    BlitParameter,

    /// Point, size out, size in
    ImageParameter,
    ImageColor,

    /// Colour 0, colour 1, point, size out, size in
    BitmapParameter,
    BitmapData,

    /// Point, size, pitch, offset (starts the copy)
    ImageToMemoryParameter,

    /// Size in, dx/ds, dy/dt, clip point, clip size, point (12.4)
    StretchedParameter,
    StretchedColor,

    /// Texture offset, format, filter, fog colour, control 0-2
    D3dParameter,
    /// Eight words per vertex
    D3dVertex,

    PointZetaControl,
    /// Point/zeta pairs
    PointZetaPair,

    /// Pitch, offset
    ImageInMemoryParameter,
}

/// A run of consecutive methods sharing a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRange {
    pub start: u32,
    /// Last method offset, inclusive
    pub end: u32,
    pub method: ClassMethod,
}

const fn range(start: u32, end: u32, method: ClassMethod) -> MethodRange {
    MethodRange { start, end, method }
}

const fn single(offset: u32, method: ClassMethod) -> MethodRange {
    MethodRange {
        start: offset,
        end: offset,
        method,
    }
}

use ClassMethod::*;

static BETA_METHODS: &[MethodRange] = &[single(0x300, SetBeta)];

static ROP_METHODS: &[MethodRange] = &[single(0x300, SetRop)];

static CHROMA_METHODS: &[MethodRange] = &[single(0x300, SetColorFormat), single(0x304, SetColor)];

static PLANE_MASK_METHODS: &[MethodRange] =
    &[single(0x300, SetColorFormat), single(0x304, SetColor)];

static CLIP_METHODS: &[MethodRange] = &[range(0x300, 0x304, ClipRectangle)];

static PATTERN_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetMonochromeFormat),
    single(0x308, SetPatternShape),
    range(0x310, 0x314, PatternColor),
    range(0x318, 0x31C, PatternBitmap),
];

static RECTANGLE_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetColor),
    range(0x400, 0x47C, RectanglePair),
];

static POINT_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetColor),
    range(0x400, 0x47C, PointAt),
];

static LINE_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetColor),
    range(0x400, 0x47C, LinePair),
    range(0x500, 0x57C, Polyline),
];

static TRIANGLE_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetColor),
    range(0x310, 0x318, TrianglePoint),
    range(0x400, 0x47C, TriangleMesh),
];

static GDI_TEXT_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetMonochromeFormat),
    single(0x3FC, GdiColorA),
    range(0x400, 0x5FC, GdiRectA),
    single(0x7F4, GdiPointB),
    single(0x7F8, GdiSizeB),
    single(0x7FC, GdiColorB),
    range(0x800, 0x9FC, GdiMonoB),
];

static M2MF_METHODS: &[MethodRange] = &[range(0x30C, 0x328, M2mfParameter)];

static SCALED_IMAGE_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    range(0x304, 0x308, ObjectClip),
    range(0x30C, 0x318, ScaledRect),
    range(0x400, 0x40C, ScaledSource),
];

static BLIT_METHODS: &[MethodRange] = &[range(0x300, 0x308, BlitParameter)];

static IMAGE_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    range(0x304, 0x30C, ImageParameter),
    range(0x400, 0x5FC, ImageColor),
];

static BITMAP_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    single(0x304, SetMonochromeFormat),
    range(0x308, 0x318, BitmapParameter),
    range(0x400, 0x5FC, BitmapData),
];

static IMAGE_TO_MEMORY_METHODS: &[MethodRange] = &[range(0x300, 0x30C, ImageToMemoryParameter)];

static STRETCHED_IMAGE_METHODS: &[MethodRange] = &[
    range(0x300, 0x314, StretchedParameter),
    single(0x318, SetColorFormat),
    range(0x400, 0x5FC, StretchedColor),
];

static D3D_TRIANGLE_METHODS: &[MethodRange] = &[
    range(0x304, 0x31C, D3dParameter),
    range(0x1000, 0x1FFC, D3dVertex),
];

static POINT_ZETA_METHODS: &[MethodRange] = &[
    single(0x300, PointZetaControl),
    single(0x304, SetColor),
    range(0x400, 0x7FC, PointZetaPair),
];

static IMAGE_IN_MEMORY_METHODS: &[MethodRange] = &[
    single(0x300, SetColorFormat),
    range(0x308, 0x30C, ImageInMemoryParameter),
];

/// Method table of a class, `None` for ids PGRAPH does not implement
pub fn methods(class_id: u8) -> Option<&'static [MethodRange]> {
    let table = match class_id {
        class::BETA => BETA_METHODS,
        class::ROP => ROP_METHODS,
        class::CHROMA => CHROMA_METHODS,
        class::PLANE_MASK => PLANE_MASK_METHODS,
        class::CLIP => CLIP_METHODS,
        class::PATTERN => PATTERN_METHODS,
        class::RECTANGLE => RECTANGLE_METHODS,
        class::POINT => POINT_METHODS,
        class::LINE | class::LIN => LINE_METHODS,
        class::TRIANGLE => TRIANGLE_METHODS,
        class::GDI_TEXT => GDI_TEXT_METHODS,
        class::M2MF => M2MF_METHODS,
        class::SCALED_IMAGE => SCALED_IMAGE_METHODS,
        class::BLIT => BLIT_METHODS,
        class::IMAGE => IMAGE_METHODS,
        class::BITMAP => BITMAP_METHODS,
        class::IMAGE_TO_MEMORY => IMAGE_TO_MEMORY_METHODS,
        class::STRETCHED_IMAGE => STRETCHED_IMAGE_METHODS,
        class::D3D_TRIANGLE => D3D_TRIANGLE_METHODS,
        class::POINT_ZETA => POINT_ZETA_METHODS,
        class::IMAGE_IN_MEMORY => IMAGE_IN_MEMORY_METHODS,
        _ => return None,
    };
    Some(table)
}

/// Outcome of looking a method up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Generic(GenericMethod),
    /// Class handler and the register index inside its range
    Class(ClassMethod, u32),
    /// No hardware handler: trapped for the driver
    Software,
    /// The object's class is not implemented by PGRAPH
    InvalidClass,
}

/// Resolve a method offset for a class
///
/// # Examples
///
/// ```
/// use nv3rx::core::pgraph::{class, resolve, ClassMethod, GenericMethod, Resolution};
///
/// assert_eq!(resolve(class::RECTANGLE, 0x104), Resolution::Generic(GenericMethod::Notify));
/// assert_eq!(resolve(class::RECTANGLE, 0x40C), Resolution::Class(ClassMethod::RectanglePair, 3));
/// assert_eq!(resolve(class::RECTANGLE, 0x600), Resolution::Software);
/// assert_eq!(resolve(0x13, 0x304), Resolution::InvalidClass);
/// ```
pub fn resolve(class_id: u8, method: u32) -> Resolution {
    let Some(table) = methods(class_id) else {
        return Resolution::InvalidClass;
    };
    let method = method & 0x1FFC;

    if let Some(generic) = GenericMethod::from_method(method) {
        return Resolution::Generic(generic);
    }

    let candidate = table.partition_point(|r| r.start <= method);
    if candidate == 0 {
        return Resolution::Software;
    }
    let entry = &table[candidate - 1];
    if method <= entry.end {
        Resolution::Class(entry.method, (method - entry.start) / 4)
    } else {
        Resolution::Software
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted_and_disjoint() {
        for &id in class::ALL.iter() {
            let table = methods(id).unwrap();
            for pair in table.windows(2) {
                assert!(pair[0].end < pair[1].start, "class 0x{:02X}", id);
            }
            for entry in table {
                assert!(entry.start <= entry.end);
                assert!(entry.end < CLASS_WINDOW_SIZE);
                assert_eq!(entry.start & 3, 0);
                assert!(GenericMethod::from_method(entry.start).is_none());
            }
        }
    }

    #[test]
    fn test_every_method_resolves() {
        for &id in class::ALL.iter() {
            for method in (0..CLASS_WINDOW_SIZE).step_by(4) {
                match resolve(id, method) {
                    Resolution::Generic(_) | Resolution::Class(..) | Resolution::Software => {}
                    Resolution::InvalidClass => panic!("class 0x{:02X} rejected", id),
                }
            }
        }
    }

    #[test]
    fn test_invalid_classes() {
        for id in 0u8..0x20 {
            let expected = class::ALL.contains(&id);
            assert_eq!(resolve(id, 0x300) != Resolution::InvalidClass, expected);
        }
    }

    #[test]
    fn test_generic_methods_for_every_class() {
        for &id in class::ALL.iter() {
            assert_eq!(resolve(id, 0), Resolution::Generic(GenericMethod::SetObject));
            assert_eq!(resolve(id, 0x100), Resolution::Generic(GenericMethod::NoOperation));
            assert_eq!(
                resolve(id, 0x180),
                Resolution::Generic(GenericMethod::SetContextDmaNotify)
            );
            assert_eq!(resolve(id, 0x108), Resolution::Software);
        }
    }

    #[test]
    fn test_range_indices() {
        assert_eq!(resolve(class::D3D_TRIANGLE, 0x1FFC), Resolution::Class(D3dVertex, 1023));
        assert_eq!(resolve(class::M2MF, 0x328), Resolution::Class(M2mfParameter, 7));
        assert_eq!(resolve(class::M2MF, 0x32C), Resolution::Software);
        assert_eq!(resolve(class::PATTERN, 0x30C), Resolution::Software);
        assert_eq!(resolve(class::BLIT, 0x2FC), Resolution::Software);
    }

    #[test]
    fn test_class_windows() {
        assert_eq!(decode_class_window(0x470304), Some((class::RECTANGLE, 0x304)));
        assert_eq!(decode_class_window(0x5C030C), Some((class::IMAGE_IN_MEMORY, 0x30C)));
        assert_eq!(decode_class_window(0x472000), None);
        assert_eq!(decode_class_window(0x4F0000), None);
        assert_eq!(decode_class_window(0x401100), None);
    }
}
