//! Image manipulation.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned 8-bit RGB image.
//! - [`Color`], the pixel type of [`Image`].
//! - A variety of [`draw`] functions for strokes, pointers and landmark overlays.
//! - [`composite`], which lays a canvas of strokes over a live frame.

mod composite;
pub mod draw;
mod resolution;


use std::fmt;

use anyhow::Context;
use embedded_graphics::{pixelcolor::raw::RawU24, prelude::PixelColor};
use image::{imageops::FilterType, ImageBuffer, Rgb, RgbImage};

pub use composite::*;
pub use resolution::*;

/// An 8-bit sRGB image without alpha channel.
///
/// Both camera frames and the drawing canvas use this type. A freshly created [`Image`] is
/// entirely black, which the canvas treats as "untouched".
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub(crate) buf: RgbImage,
}

impl Image {
    /// Creates an all-black image of a specified size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an all-black image with the given [`Resolution`].
    pub fn with_resolution(res: Resolution) -> Self {
        Self::new(res.width(), res.height())
    }

    /// Creates an image from tightly packed RGB8 pixel data.
    ///
    /// # Panics
    ///
    /// This will panic if `buf` does not contain exactly `3 * width * height` bytes.
    pub fn from_rgb8(res: Resolution, buf: &[u8]) -> Self {
        let expected_size = res.num_pixels() as usize * 3;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} image (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_vec(res.width(), res.height(), buf.to_vec())
                .expect("buffer size does not match image resolution"),
        }
    }

    /// Decodes a JFIF JPEG or Motion JPEG from a byte slice.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
            .context("failed to decode JPEG image")?
            .to_rgb8();
        Ok(Self { buf })
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgb(color.0);
    }

    /// Returns an iterator over all pixel colors, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Color> + '_ {
        self.buf.pixels().map(|pix| Color(pix.0))
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Returns a copy of this image scaled to `res`, ignoring aspect ratio.
    pub fn resize(&self, res: Resolution) -> Image {
        Image {
            buf: image::imageops::resize(&self.buf, res.width(), res.height(), FilterType::Triangle),
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// An 8-bit RGB color.
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);
    pub const MAGENTA: Self = Self([255, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Returns the luma of this color (ITU-R BT.601 weights).
    ///
    /// Computed in 14-bit fixed point and rounded to the nearest integer, so that the result is
    /// bit-exact with common RGB-to-grayscale conversions.
    #[inline]
    pub fn intensity(&self) -> u8 {
        const R: u32 = 4899;
        const G: u32 = 9617;
        const B: u32 = 1868;
        const SHIFT: u32 = 14;

        let sum = R * u32::from(self.r()) + G * u32::from(self.g()) + B * u32::from(self.b());
        ((sum + (1 << (SHIFT - 1))) >> SHIFT) as u8
    }

    /// Packs this color into the `0RGB` format used by window framebuffers.
    #[inline]
    pub fn to_0rgb(self) -> u32 {
        u32::from(self.r()) << 16 | u32::from(self.g()) << 8 | u32::from(self.b())
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

impl PixelColor for Color {
    type Raw = RawU24;
}
