//! Per-pixel running statistics.

use image::{Rgb, RgbImage};
use lumen_math::Color;
use serde::{Deserialize, Serialize};

/// Running mean and variance of the samples of one pixel (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pixel {
    samples: u32,
    mean: Color,
    /// Sum of squared deviations from the mean, per channel
    m2: Color,
}

impl Pixel {
    pub fn add_sample(&mut self, sample: Color) {
        self.samples += 1;
        if self.samples == 1 {
            self.mean = sample;
            return;
        }
        let old_mean = self.mean;
        self.mean += (sample - old_mean) / self.samples as f64;
        self.m2 += (sample - old_mean) * (sample - self.mean);
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Mean of the samples so far.
    pub fn color(&self) -> Color {
        self.mean
    }

    /// Sample variance; zero with fewer than two samples.
    pub fn variance(&self) -> Color {
        if self.samples < 2 {
            return Color::ZERO;
        }
        self.m2 / (self.samples - 1) as f64
    }

    pub fn standard_deviation(&self) -> Color {
        let v = self.variance();
        Color::new(v.x.sqrt(), v.y.sqrt(), v.z.sqrt())
    }
}

/// What to read out of a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Mean color with 1/2.2 gamma applied
    Color,
    Variance,
    StandardDeviation,
    /// Sample count divided by the largest count in the buffer
    Samples,
}

/// Row-major grid of [`Pixel`] accumulators.
#[derive(Debug, Clone)]
pub struct Buffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Buffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> &Pixel {
        &self.pixels[self.index(x, y)]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Mutable row-major pixel slice, split between render workers.
    pub(crate) fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    pub fn add_sample(&mut self, x: u32, y: u32, sample: Color) {
        let i = self.index(x, y);
        self.pixels[i].add_sample(sample);
    }

    pub fn samples(&self, x: u32, y: u32) -> u32 {
        self.pixel(x, y).samples()
    }

    pub fn color(&self, x: u32, y: u32) -> Color {
        self.pixel(x, y).color()
    }

    pub fn variance(&self, x: u32, y: u32) -> Color {
        self.pixel(x, y).variance()
    }

    pub fn standard_deviation(&self, x: u32, y: u32) -> Color {
        self.pixel(x, y).standard_deviation()
    }

    pub fn max_samples(&self) -> u32 {
        self.pixels.iter().map(Pixel::samples).max().unwrap_or(0)
    }

    pub fn total_samples(&self) -> u64 {
        self.pixels.iter().map(|p| p.samples() as u64).sum()
    }

    /// One value per pixel, row-major.
    pub fn channel(&self, channel: Channel) -> Vec<Color> {
        let max_samples = self.max_samples().max(1) as f64;
        self.pixels
            .iter()
            .map(|p| match channel {
                Channel::Color => p.color().max(Color::ZERO).powf(1.0 / 2.2),
                Channel::Variance => p.variance(),
                Channel::StandardDeviation => p.standard_deviation(),
                Channel::Samples => Color::splat(p.samples() as f64 / max_samples),
            })
            .collect()
    }

    /// 8-bit image of a channel, clamped to [0, 1].
    pub fn to_rgb8(&self, channel: Channel) -> RgbImage {
        let values = self.channel(channel);
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let c = values[self.index(x, y)];
            Rgb([to_byte(c.x), to_byte(c.y), to_byte(c.z)])
        })
    }
}

fn to_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_sample_has_no_variance() {
        let mut pixel = Pixel::default();
        let c = Color::new(0.2, 0.4, 0.8);
        for _ in 0..10 {
            pixel.add_sample(c);
        }
        assert_eq!(pixel.samples(), 10);
        assert!((pixel.color() - c).length() < 1e-12);
        assert!(pixel.variance().length() < 1e-24);
    }

    #[test]
    fn test_matches_two_pass_statistics() {
        let samples = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let mut pixel = Pixel::default();
        for s in samples {
            pixel.add_sample(Color::new(s, 2.0 * s, 0.0));
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!((pixel.color().x - mean).abs() < 1e-12);
        assert!((pixel.variance().x - var).abs() < 1e-12);
        assert!((pixel.variance().y - 4.0 * var).abs() < 1e-12);
        assert!((pixel.standard_deviation().x - var.sqrt()).abs() < 1e-12);
        assert_eq!(pixel.variance().z, 0.0);
    }

    #[test]
    fn test_single_sample() {
        let mut pixel = Pixel::default();
        pixel.add_sample(Color::splat(3.0));
        assert_eq!(pixel.variance(), Color::ZERO);
        assert_eq!(pixel.color(), Color::splat(3.0));
    }

    #[test]
    fn test_channels() {
        let mut buffer = Buffer::new(2, 1);
        buffer.add_sample(0, 0, Color::splat(0.25));
        buffer.add_sample(1, 0, Color::ONE);
        buffer.add_sample(1, 0, Color::ZERO);

        let color = buffer.channel(Channel::Color);
        assert!((color[0].x - 0.25f64.powf(1.0 / 2.2)).abs() < 1e-12);

        let samples = buffer.channel(Channel::Samples);
        assert_eq!(samples[0], Color::splat(0.5));
        assert_eq!(samples[1], Color::ONE);

        let variance = buffer.channel(Channel::Variance);
        assert_eq!(variance[0], Color::ZERO);
        assert!((variance[1].x - 0.5).abs() < 1e-12);

        assert_eq!(buffer.max_samples(), 2);
        assert_eq!(buffer.total_samples(), 3);
    }

    #[test]
    fn test_to_rgb8() {
        let mut buffer = Buffer::new(3, 2);
        buffer.add_sample(2, 1, Color::new(1.0, 0.0, 4.0));
        let img = buffer.to_rgb8(Channel::Color);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1), &Rgb([255, 0, 255]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}
