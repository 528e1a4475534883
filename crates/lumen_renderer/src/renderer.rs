//! Render scheduler: base, adaptive and firefly passes over the buffer.

use std::time::{Duration, Instant};

use lumen_math::Color;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, Pixel};
use crate::camera::Camera;
use crate::error::{require_count, require_positive, ConfigError, RenderError};
use crate::sampler::Sampler;
use crate::scene::Scene;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Primary rays per pixel in the base pass
    pub samples_per_pixel: u32,
    /// Jitter inside a ceil(sqrt(spp)) square grid instead of purely at random
    pub stratified: bool,
    /// Extra samples for the noisiest pixels; 0 disables the adaptive pass
    pub adaptive_samples: u32,
    /// Standard deviation at which a pixel gets the full adaptive budget
    pub adaptive_threshold: f64,
    /// Shapes how the adaptive budget grows with noise
    pub adaptive_exponent: f64,
    /// Extra samples for outlier pixels; 0 disables the firefly pass
    pub firefly_samples: u32,
    /// Standard deviation above which a pixel is resampled
    pub firefly_threshold: f64,
    /// Worker threads; `None` uses every core
    pub workers: Option<usize>,
    pub seed: u64,
    /// Pixels per scheduling unit
    pub span: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            samples_per_pixel: 16,
            stratified: false,
            adaptive_samples: 0,
            adaptive_threshold: 1.0,
            adaptive_exponent: 1.0,
            firefly_samples: 0,
            firefly_threshold: 1.0,
            workers: None,
            seed: 0,
            span: 64,
        }
    }
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_samples(mut self, samples_per_pixel: u32, stratified: bool) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.stratified = stratified;
        self
    }

    pub fn with_adaptive(mut self, samples: u32, threshold: f64, exponent: f64) -> Self {
        self.adaptive_samples = samples;
        self.adaptive_threshold = threshold;
        self.adaptive_exponent = exponent;
        self
    }

    pub fn with_fireflies(mut self, samples: u32, threshold: f64) -> Self {
        self.firefly_samples = samples;
        self.firefly_threshold = threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        require_count("samples_per_pixel", self.samples_per_pixel as u64)?;
        require_positive("adaptive_threshold", self.adaptive_threshold)?;
        require_positive("adaptive_exponent", self.adaptive_exponent)?;
        require_positive("firefly_threshold", self.firefly_threshold)?;
        if let Some(workers) = self.workers {
            require_count("workers", workers as u64)?;
        }
        require_count("span", self.span as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Base,
    Adaptive,
    Firefly,
}

impl Pass {
    fn name(self) -> &'static str {
        match self {
            Pass::Base => "base",
            Pass::Adaptive => "adaptive",
            Pass::Firefly => "firefly",
        }
    }
}

/// Counters for one call to [`Renderer::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub base_samples: u64,
    pub adaptive_samples: u64,
    pub firefly_samples: u64,
    pub rays: u64,
    pub elapsed: Duration,
}

impl RenderStats {
    pub fn samples(&self) -> u64 {
        self.base_samples + self.adaptive_samples + self.firefly_samples
    }
}

/// Drives a [`Sampler`] over every pixel and accumulates into a [`Buffer`].
pub struct Renderer<S: Sampler> {
    scene: Scene,
    camera: Camera,
    sampler: S,
    config: RenderConfig,
    buffer: Buffer,
    pool: ThreadPool,
}

impl<S: Sampler> Renderer<S> {
    /// Validates `config`, compiles `scene` and starts the worker pool.
    pub fn new(
        mut scene: Scene,
        camera: Camera,
        sampler: S,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        scene.compile();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.unwrap_or(0))
            .build()?;
        log::info!(
            "{}x{} pixels, {} spp, {} worker(s)",
            config.width,
            config.height,
            config.samples_per_pixel,
            pool.current_num_threads()
        );
        Ok(Self {
            buffer: Buffer::new(config.width, config.height),
            scene,
            camera,
            sampler,
            config,
            pool,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    /// Run every enabled pass once, adding to the current buffer.
    pub fn render(&mut self) -> RenderStats {
        self.render_iteration(0)
    }

    /// Render `iterations` times into the same buffer, handing it to
    /// `on_iteration` after each one (1-based).
    pub fn iterative_render<F>(&mut self, iterations: usize, mut on_iteration: F) -> RenderStats
    where
        F: FnMut(usize, &Buffer),
    {
        let mut total = RenderStats::default();
        for i in 1..=iterations {
            log::info!("Iteration {} of {}", i, iterations);
            let stats = self.render_iteration(i as u64);
            total.base_samples += stats.base_samples;
            total.adaptive_samples += stats.adaptive_samples;
            total.firefly_samples += stats.firefly_samples;
            total.rays += stats.rays;
            total.elapsed += stats.elapsed;
            on_iteration(i, &self.buffer);
        }
        total
    }

    fn render_iteration(&mut self, iteration: u64) -> RenderStats {
        let start = Instant::now();
        let rays = self.scene.ray_count();
        let mut stats = RenderStats {
            base_samples: self.run_pass(iteration, Pass::Base),
            ..RenderStats::default()
        };
        if self.config.adaptive_samples > 0 {
            stats.adaptive_samples = self.run_pass(iteration, Pass::Adaptive);
        }
        if self.config.firefly_samples > 0 {
            stats.firefly_samples = self.run_pass(iteration, Pass::Firefly);
        }
        stats.rays = self.scene.ray_count() - rays;
        stats.elapsed = start.elapsed();
        stats
    }

    /// One parallel sweep. Workers own disjoint spans of pixels, so every
    /// accumulator has a single writer.
    fn run_pass(&mut self, iteration: u64, pass: Pass) -> u64 {
        let start = Instant::now();
        let rays = self.scene.ray_count();
        let config = &self.config;
        let scene = &self.scene;
        let camera = &self.camera;
        let sampler = &self.sampler;
        let width = config.width as usize;
        let span = config.span;
        let pixels = self.buffer.pixels_mut();
        let count = pixels.len();

        let samples: u64 = self.pool.install(|| {
            pixels
                .par_chunks_mut(span)
                .enumerate()
                .map(|(chunk, pixels)| {
                    let seed = stream_seed(config.seed, iteration, pass, chunk as u64);
                    let mut rng = StdRng::seed_from_u64(seed);
                    let mut cast = 0u64;
                    for (offset, pixel) in pixels.iter_mut().enumerate() {
                        let i = chunk * span + offset;
                        let job = PixelJob {
                            x: (i % width) as u32,
                            y: (i / width) as u32,
                            config,
                            scene,
                            camera,
                            sampler,
                        };
                        cast += job.run(pass, pixel, &mut rng);
                    }
                    cast
                })
                .sum()
        });

        log::info!(
            "{} pass: {} pixels, {} samples, {} rays in {:.2?}",
            pass.name(),
            count,
            samples,
            self.scene.ray_count() - rays,
            start.elapsed()
        );
        samples
    }
}

struct PixelJob<'a, S> {
    x: u32,
    y: u32,
    config: &'a RenderConfig,
    scene: &'a Scene,
    camera: &'a Camera,
    sampler: &'a S,
}

impl<S: Sampler> PixelJob<'_, S> {
    fn run(&self, pass: Pass, pixel: &mut Pixel, rng: &mut dyn RngCore) -> u64 {
        let config = self.config;
        match pass {
            Pass::Base if config.stratified => {
                // Cells of a ceil(sqrt(spp)) grid, row by row, until spp are cast
                let spp = config.samples_per_pixel;
                let n = (spp as f64).sqrt().ceil() as u32;
                for cell in 0..spp {
                    let (u, v) = (cell / n, cell % n);
                    let fu = (u as f64 + rng.gen::<f64>()) / n as f64;
                    let fv = (v as f64 + rng.gen::<f64>()) / n as f64;
                    pixel.add_sample(self.sample(fu, fv, rng));
                }
                spp as u64
            }
            Pass::Base => self.jittered(pixel, config.samples_per_pixel, rng),
            Pass::Adaptive => {
                let noise = pixel.standard_deviation().max_element();
                let v = (noise / config.adaptive_threshold)
                    .clamp(0.0, 1.0)
                    .powf(config.adaptive_exponent);
                let extra = (v * config.adaptive_samples as f64) as u32;
                self.jittered(pixel, extra, rng)
            }
            Pass::Firefly => {
                if pixel.standard_deviation().max_element() > config.firefly_threshold {
                    self.jittered(pixel, config.firefly_samples, rng)
                } else {
                    0
                }
            }
        }
    }

    fn jittered(&self, pixel: &mut Pixel, samples: u32, rng: &mut dyn RngCore) -> u64 {
        for _ in 0..samples {
            let fu = rng.gen::<f64>();
            let fv = rng.gen::<f64>();
            pixel.add_sample(self.sample(fu, fv, rng));
        }
        samples as u64
    }

    fn sample(&self, u: f64, v: f64, rng: &mut dyn RngCore) -> Color {
        let (w, h) = (self.config.width, self.config.height);
        let ray = self.camera.cast_ray(self.x, self.y, w, h, u, v, rng);
        self.sampler.sample(self.scene, &ray, rng)
    }
}

/// Independent stream per (seed, iteration, pass, span), so results do not
/// depend on how spans are scheduled across threads.
fn stream_seed(seed: u64, iteration: u64, pass: Pass, chunk: u64) -> u64 {
    let mut h = splitmix(seed);
    h = splitmix(h ^ iteration);
    h = splitmix(h ^ pass as u64);
    splitmix(h ^ chunk)
}

fn splitmix(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
