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

//! PGRAPH primitive types
//!
//! Colours, coordinates and the raster operation helper shared by every
//! class handler.
//!
//! # Colour pipeline
//!
//! Class methods take colours in the object's colour format. PGRAPH expands
//! them to an internal 10-bit-per-channel colour with a 1-bit alpha and keeps
//! them in registers as `A1R10G10B10`:
//!
//! ```text
//! 31   30      29..20   19..10   9..0
//! rsv  alpha   red      green    blue
//! ```
//!
//! Pixels are packed from the internal colour into the framebuffer depth
//! (8, 16 or 32 bits per pixel) only when they are written to VRAM.

use serde::{Deserialize, Serialize};

/// Colour formats selectable in a graphics object instance (word 0, bits 0-2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFormat {
    #[default]
    X16A1R5G5B5 = 0,
    A8R8G8B8 = 1,
    A2R10G10B10 = 2,
    X16A8Y8 = 3,
    A16Y16 = 4,
}

impl ColorFormat {
    /// Decode the 3-bit format field
    ///
    /// Values 5-7 are undefined on the hardware; they decode as `None`.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 7 {
            0 => Some(ColorFormat::X16A1R5G5B5),
            1 => Some(ColorFormat::A8R8G8B8),
            2 => Some(ColorFormat::A2R10G10B10),
            3 => Some(ColorFormat::X16A8Y8),
            4 => Some(ColorFormat::A16Y16),
            _ => None,
        }
    }

    /// Pixels carried by one 32-bit image data word
    pub fn pixels_per_word(self) -> u32 {
        match self {
            ColorFormat::X16A1R5G5B5 | ColorFormat::X16A8Y8 => 2,
            _ => 1,
        }
    }
}

/// Widen an n-bit channel to 10 bits by replicating its high bits
#[inline(always)]
fn widen(value: u32, bits: u32) -> u16 {
    let value = value & ((1 << bits) - 1);
    let wide = (value << (10 - bits)) | (value >> (2 * bits).saturating_sub(10));
    (wide & 0x3FF) as u16
}

/// Internal PGRAPH colour
///
/// # Examples
///
/// ```
/// use nv3rx::core::pgraph::{Color10, ColorFormat};
///
/// let white = Color10::expand(ColorFormat::A8R8G8B8, 0xFFFF_FFFF, true);
/// assert_eq!(white.to_a1r10g10b10(), 0x7FFF_FFFF);
///
/// let red = Color10::expand(ColorFormat::X16A1R5G5B5, 0x0000_FC00, true);
/// assert_eq!(red.r, 0x3FF);
/// assert_eq!(red.g, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color10 {
    pub alpha: bool,
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Color10 {
    const ALPHA: u32 = 1 << 30;

    /// Expand a method parameter to the internal colour
    ///
    /// # Arguments
    ///
    /// * `format` - Colour format of the object that received the method
    /// * `value` - Method parameter
    /// * `alpha_enabled` - Object alpha enable; when clear the colour is opaque
    pub fn expand(format: ColorFormat, value: u32, alpha_enabled: bool) -> Self {
        let (alpha, r, g, b) = match format {
            ColorFormat::X16A1R5G5B5 => (
                value & 0x8000 != 0,
                widen(value >> 10, 5),
                widen(value >> 5, 5),
                widen(value, 5),
            ),
            ColorFormat::A8R8G8B8 => (
                value >> 24 != 0,
                widen(value >> 16, 8),
                widen(value >> 8, 8),
                widen(value, 8),
            ),
            ColorFormat::A2R10G10B10 => (
                value >> 30 != 0,
                ((value >> 20) & 0x3FF) as u16,
                ((value >> 10) & 0x3FF) as u16,
                (value & 0x3FF) as u16,
            ),
            ColorFormat::X16A8Y8 => {
                let y = widen(value, 8);
                ((value >> 8) & 0xFF != 0, y, y, y)
            }
            ColorFormat::A16Y16 => {
                let y = ((value & 0xFFFF) >> 6) as u16;
                (value >> 16 != 0, y, y, y)
            }
        };

        Self {
            alpha: alpha || !alpha_enabled,
            r,
            g,
            b,
        }
    }

    pub fn to_a1r10g10b10(self) -> u32 {
        let mut value = ((self.r as u32) << 20) | ((self.g as u32) << 10) | self.b as u32;
        if self.alpha {
            value |= Self::ALPHA;
        }
        value
    }

    pub fn from_a1r10g10b10(value: u32) -> Self {
        Self {
            alpha: value & Self::ALPHA != 0,
            r: ((value >> 20) & 0x3FF) as u16,
            g: ((value >> 10) & 0x3FF) as u16,
            b: (value & 0x3FF) as u16,
        }
    }

    /// Pack into a framebuffer pixel
    ///
    /// 8bpp surfaces are palettized: the pixel is the low byte of the
    /// method parameter, passed as `raw`.
    pub fn to_pixel(self, bytes_per_pixel: u32, raw: u32) -> u32 {
        match bytes_per_pixel {
            1 => raw & 0xFF,
            2 => {
                let r = (self.r as u32) >> 5;
                let g = (self.g as u32) >> 5;
                let b = (self.b as u32) >> 5;
                (r << 10) | (g << 5) | b
            }
            _ => {
                let r = (self.r as u32) >> 2;
                let g = (self.g as u32) >> 2;
                let b = (self.b as u32) >> 2;
                (r << 16) | (g << 8) | b
            }
        }
    }
}

/// A point as passed to class methods: x in bits 0-15, y in bits 16-31,
/// both signed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    /// # Examples
    ///
    /// ```
    /// use nv3rx::core::pgraph::Point;
    ///
    /// let p = Point::from_u32(0xFFFF_0010);
    /// assert_eq!(p.x, 16);
    /// assert_eq!(p.y, -1);
    /// ```
    pub fn from_u32(value: u32) -> Self {
        Self {
            x: (value & 0xFFFF) as i16,
            y: ((value >> 16) & 0xFFFF) as i16,
        }
    }
}

/// A size: width in bits 0-15, height in bits 16-31
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub fn from_u32(value: u32) -> Self {
        Self {
            width: (value & 0xFFFF) as u16,
            height: ((value >> 16) & 0xFFFF) as u16,
        }
    }

    pub fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }
}

/// Evaluate a ternary raster operation bitwise
///
/// Bit `(p << 2) | (s << 1) | d` of `rop` gives the result for each
/// combination of pattern, source and destination bits.
///
/// # Examples
///
/// ```
/// use nv3rx::core::pgraph::rop3;
///
/// assert_eq!(rop3(0xCC, 0, 0x1234, 0xFFFF), 0x1234); // SRCCOPY
/// assert_eq!(rop3(0xF0, 0xAAAA, 0x1234, 0), 0xAAAA); // PATCOPY
/// assert_eq!(rop3(0x66, 0, 0x00FF, 0x0F0F), 0x0FF0); // SRCINVERT
/// ```
pub fn rop3(rop: u8, pattern: u32, source: u32, dest: u32) -> u32 {
    let mut result = 0;
    for index in 0..8 {
        if rop & (1 << index) == 0 {
            continue;
        }
        let p = if index & 4 != 0 { pattern } else { !pattern };
        let s = if index & 2 != 0 { source } else { !source };
        let d = if index & 1 != 0 { dest } else { !dest };
        result |= p & s & d;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_replicates_high_bits() {
        assert_eq!(widen(0x1F, 5), 0x3FF);
        assert_eq!(widen(0x10, 5), 0x210);
        assert_eq!(widen(0xFF, 8), 0x3FF);
        assert_eq!(widen(0x80, 8), 0x202);
        assert_eq!(widen(0, 8), 0);
    }

    #[test]
    fn test_expand_each_format() {
        let c = Color10::expand(ColorFormat::A2R10G10B10, 0x4010_0801, true);
        assert_eq!((c.alpha, c.r, c.g, c.b), (true, 1, 2, 1));

        let y = Color10::expand(ColorFormat::X16A8Y8, 0x0000_00FF, true);
        assert!(!y.alpha);
        assert_eq!((y.r, y.g, y.b), (0x3FF, 0x3FF, 0x3FF));

        let y16 = Color10::expand(ColorFormat::A16Y16, 0x0001_FFC0, true);
        assert!(y16.alpha);
        assert_eq!(y16.r, 0x3FF);
    }

    #[test]
    fn test_alpha_forced_when_disabled() {
        let c = Color10::expand(ColorFormat::A8R8G8B8, 0x0000_0000, false);
        assert!(c.alpha);
        let c = Color10::expand(ColorFormat::A8R8G8B8, 0x0000_0000, true);
        assert!(!c.alpha);
    }

    #[test]
    fn test_packed_register_form() {
        let c = Color10 {
            alpha: true,
            r: 0x3FF,
            g: 0x155,
            b: 0x0AA,
        };
        let packed = c.to_a1r10g10b10();
        assert_eq!(packed, 0x7FF5_54AA);
        assert_eq!(Color10::from_a1r10g10b10(packed), c);
    }

    #[test]
    fn test_to_pixel_depths() {
        let c = Color10::expand(ColorFormat::A8R8G8B8, 0xFF12_3456, true);
        assert_eq!(c.to_pixel(4, 0), 0x0012_3456);
        assert_eq!(c.to_pixel(2, 0), (0x02 << 10) | (0x06 << 5) | 0x0A);
        assert_eq!(c.to_pixel(1, 0xAB), 0xAB);
    }

    #[test]
    fn test_format_decode() {
        assert_eq!(ColorFormat::from_bits(1), Some(ColorFormat::A8R8G8B8));
        assert_eq!(ColorFormat::from_bits(5), None);
        assert_eq!(ColorFormat::X16A1R5G5B5.pixels_per_word(), 2);
        assert_eq!(ColorFormat::A8R8G8B8.pixels_per_word(), 1);
    }

    #[test]
    fn test_rop3_constants() {
        assert_eq!(rop3(0x00, 0x1234, 0x5678, 0x9ABC), 0);
        assert_eq!(rop3(0xFF, 0x1234, 0x5678, 0x9ABC), 0xFFFF_FFFF);
        assert_eq!(rop3(0xAA, 0x1234, 0x5678, 0x9ABC), 0x9ABC);
        assert_eq!(rop3(0x55, 0, 0, 0x0000_FFFF), 0xFFFF_0000);
    }
}
