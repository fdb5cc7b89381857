// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Pixel values shared by the CPU buffer and the accelerated mirror.
//!
//! Every pixel crossing the CPU/accelerated boundary is a [`Color`]: four 8-bit
//! normalized channels in RGBA order.  Shaders and mixers work in [`Float4`], which
//! maps 0-255 onto 0.0-1.0.
//!
//! # Examples
//!
//! ```
//! use accelerated_pixels::pixel_formats::{Color, Float4};
//!
//! let red = Color::rgba(255, 0, 0, 255);
//! let float: Float4 = red.into();
//! assert_eq!(float.r, 1.0);
//! assert_eq!(Color::from_floats(float), red);
//! ```

/// C-compatible RGBA pixel with 8-bit normalized unsigned values.
///
/// `Color` is immutable; build a new value instead of mutating channels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// Fully transparent black.  Returned for reads outside an image.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Opaque color from three channels.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Gray with the same value in r, g and b.
    #[inline]
    pub const fn gray(value: u8) -> Self {
        Color::rgb(value, value, value)
    }

    #[inline]
    pub const fn r(&self) -> u8 {
        self.r
    }
    #[inline]
    pub const fn g(&self) -> u8 {
        self.g
    }
    #[inline]
    pub const fn b(&self) -> u8 {
        self.b
    }
    #[inline]
    pub const fn a(&self) -> u8 {
        self.a
    }

    /// Convert from normalized float values (0.0-1.0) to 8-bit values (0-255).
    ///
    /// Values are clamped to the valid range and rounded to nearest integer.
    pub fn from_floats(float4: Float4) -> Self {
        Color {
            r: (float4.r * 255.0).round().clamp(0.0, 255.0) as u8,
            g: (float4.g * 255.0).round().clamp(0.0, 255.0) as u8,
            b: (float4.b * 255.0).round().clamp(0.0, 255.0) as u8,
            a: (float4.a * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

/// Four 32-bit float channels, the working type of shaders and mixers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Float4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Float4 {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Float4 { r, g, b, a }
    }
}

impl From<Color> for Float4 {
    fn from(c: Color) -> Self {
        Float4 {
            r: c.r as f32 / 255.0,
            g: c.g as f32 / 255.0,
            b: c.b as f32 / 255.0,
            a: c.a as f32 / 255.0,
        }
    }
}

impl From<Float4> for Color {
    fn from(f: Float4) -> Self {
        Color::from_floats(f)
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::from_floats(v.into())
    }
}

impl From<[f32; 4]> for Float4 {
    fn from(v: [f32; 4]) -> Self {
        Float4::new(v[0], v[1], v[2], v[3])
    }
}
