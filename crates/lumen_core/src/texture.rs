//! Texture sampling for materials.
//!
//! Decoding image files is left to the caller: textures are built from
//! pixel buffers the `image` crate has already decoded, and are stored in
//! linear RGB for rendering.

use std::fmt::Debug;

use lumen_math::{Color, DVec3};
use thiserror::Error;

/// Errors that can occur when building a texture.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("texture has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("expected {expected} pixels for a {width}x{height} texture, got {actual}")]
    PixelCount {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A 2D color lookup addressed by surface UV coordinates.
///
/// UVs wrap in both directions, with (0, 0) at the bottom-left.
pub trait Texture: Send + Sync + Debug {
    /// Linear color at `(u, v)`.
    fn sample(&self, u: f64, v: f64) -> Color;

    /// Tangent-space normal encoded in the color channels (`c * 2 - 1`).
    fn normal_sample(&self, u: f64, v: f64) -> DVec3 {
        (self.sample(u, v) * 2.0 - DVec3::ONE).normalize()
    }

    /// Height gradient along u and v, read from the red channel.
    fn bump_sample(&self, u: f64, v: f64) -> DVec3 {
        let d = 1e-3;
        let cx = self.sample(u - d, v) - self.sample(u + d, v);
        let cy = self.sample(u, v - d) - self.sample(u, v + d);
        DVec3::new(cx.x, cy.x, 0.0)
    }
}

/// A texture backed by a grid of linear RGB pixels.
#[derive(Clone, Debug)]
pub struct ImageTexture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Row-major pixels, top row first
    pixels: Vec<Color>,
}

impl ImageTexture {
    /// Create a new texture from linear pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TextureError::PixelCount {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a solid color texture (1x1).
    pub fn solid(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    /// Convert a decoded 8-bit sRGB image to a linear texture.
    pub fn from_rgb8(img: &image::RgbImage) -> TextureResult<Self> {
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| {
                Color::new(
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                )
            })
            .collect();
        Self::new(width, height, pixels)
    }

    /// Convert any decoded image, dropping alpha.
    pub fn from_dynamic_image(img: &image::DynamicImage) -> TextureResult<Self> {
        Self::from_rgb8(&img.to_rgb8())
    }

    /// Get pixel at integer coordinates.
    fn pixel(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.pixels.get(idx).copied().unwrap_or(Color::ZERO)
    }

    /// Integer pixel coordinates for a wrapped UV.
    fn texel(&self, u: f64, v: f64) -> (u32, u32) {
        let u = u.rem_euclid(1.0);
        let v = 1.0 - v.rem_euclid(1.0);
        let x = ((u * self.width as f64) as u32).min(self.width - 1);
        let y = ((v * self.height as f64) as u32).min(self.height - 1);
        (x, y)
    }
}

impl Texture for ImageTexture {
    /// Bilinear lookup.
    fn sample(&self, u: f64, v: f64) -> Color {
        // Wrap UV coordinates
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        // Convert to pixel coordinates, flipping V for image rows
        let x = u * (self.width as f64 - 1.0);
        let y = (1.0 - v) * (self.height as f64 - 1.0);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.pixel(x0, y0) * (1.0 - fx) + self.pixel(x1, y0) * fx;
        let bottom = self.pixel(x0, y1) * (1.0 - fx) + self.pixel(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Central differences between neighbouring pixels.
    fn bump_sample(&self, u: f64, v: f64) -> DVec3 {
        let (x, y) = self.texel(u, v);
        let x1 = x.saturating_sub(1);
        let x2 = (x + 1).min(self.width - 1);
        let y1 = y.saturating_sub(1);
        let y2 = (y + 1).min(self.height - 1);
        let cx = self.pixel(x1, y) - self.pixel(x2, y);
        let cy = self.pixel(x, y1) - self.pixel(x, y2);
        DVec3::new(cx.x, cy.x, 0.0)
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f64 {
    let v = value as f64 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
