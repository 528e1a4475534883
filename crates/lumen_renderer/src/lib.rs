//! Lumen Renderer - CPU path tracing
//!
//! A Monte Carlo path tracer for offline rendering:
//!
//! - [`Tree`]: k-d tree over the scene's shapes for nearest-hit queries
//! - [`PathSampler`]: the light-transport integrator behind [`Sampler`]
//! - [`Buffer`]: per-pixel running mean and variance
//! - [`Renderer`]: parallel base, adaptive and firefly passes
//!
//! # Example
//!
//! ```
//! use lumen_core::Material;
//! use lumen_math::{Color, DVec3};
//! use lumen_renderer::{Camera, Channel, PathSampler, RenderConfig, Renderer, Scene, Sphere};
//!
//! let mut scene = Scene::new().with_background(Color::splat(0.2));
//! scene.add(Sphere::new(DVec3::ZERO, 1.0, Material::diffuse(Color::ONE)));
//!
//! let camera = Camera::look_at(DVec3::new(0.0, 0.0, 4.0), DVec3::ZERO, DVec3::Y, 40.0);
//! let config = RenderConfig::default().with_resolution(16, 16).with_samples(4, true);
//! let mut renderer = Renderer::new(scene, camera, PathSampler::default(), config)?;
//! renderer.render();
//!
//! let image = renderer.buffer().to_rgb8(Channel::Color);
//! assert_eq!(image.dimensions(), (16, 16));
//! # Ok::<(), lumen_renderer::RenderError>(())
//! ```

mod buffer;
mod camera;
mod error;
mod hit;
mod renderer;
mod sampler;
mod scene;
pub mod shapes;
mod tree;

pub use buffer::{Buffer, Channel, Pixel};
pub use camera::Camera;
pub use error::{ConfigError, RenderError, ShapeError};
pub use hit::{Hit, HitInfo, Primitive, Surface};
pub use renderer::{RenderConfig, RenderStats, Renderer};
pub use sampler::{
    LightMode, PathSampler, RussianRoulette, Sampler, SamplerConfig, SpecularMode,
    MIN_PROBABILITY,
};
pub use scene::Scene;
pub use shapes::{
    Cube, Cylinder, ImplicitSurface, Mesh, Plane, Sdf, Shape, Sphere, SphericalHarmonic,
    TransformedShape, Triangle,
};
pub use tree::{intersect_linear, Tree, TreeConfig};
