//! The world being rendered: shapes, lights, background and the index.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lumen_core::Texture;
use lumen_math::{Color, DVec3, Ray};

use crate::error::ConfigError;
use crate::hit::Hit;
use crate::shapes::Shape;
use crate::tree::{intersect_linear, Tree, TreeConfig};

/// Shapes plus everything a ray sees when it escapes them.
///
/// Built single-threaded with [`Scene::add`] and [`Scene::compile`], then
/// shared read-only between render workers.
#[derive(Debug, Default)]
pub struct Scene {
    /// Background color for rays that escape
    pub color: Color,
    /// Environment map sampled by direction, replaces `color` when set
    pub texture: Option<Arc<dyn Texture>>,
    /// Rotation of the environment map around the Y axis (radians)
    pub texture_angle: f64,
    shapes: Vec<Shape>,
    lights: Vec<usize>,
    tree: Option<Tree>,
    tree_config: TreeConfig,
    rays: AtomicU64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a solid background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set an environment map and its rotation.
    pub fn with_environment(mut self, texture: Arc<dyn Texture>, angle: f64) -> Self {
        self.texture = Some(texture);
        self.texture_angle = angle;
        self
    }

    /// Override the tree construction parameters. Only affects the next
    /// [`Scene::compile`].
    pub fn set_tree_config(&mut self, config: TreeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.tree_config = config;
        Ok(())
    }

    /// Add a shape. Shapes with an emissive material are also registered
    /// as lights.
    pub fn add(&mut self, shape: impl Into<Shape>) {
        let shape = shape.into();
        if self.tree.is_some() {
            log::warn!("Shape added to a compiled scene; it will not be indexed");
        }
        if shape.is_emissive() {
            self.lights.push(self.shapes.len());
        }
        self.shapes.push(shape);
    }

    /// Precompute every shape and build the spatial index. Calling this
    /// again does not rebuild an existing index.
    pub fn compile(&mut self) {
        let start = Instant::now();
        for shape in &mut self.shapes {
            shape.compile();
        }
        let reused = self.tree.is_some();
        if !reused {
            self.tree = Some(Tree::build(&self.shapes, self.tree_config));
        }
        log::info!(
            "Compiled scene: {} shapes, {} lights{} in {:.2?}",
            self.shapes.len(),
            self.lights.len(),
            if reused { " (index reused)" } else { "" },
            start.elapsed()
        );
    }

    pub fn is_compiled(&self) -> bool {
        self.tree.is_some()
    }

    /// Nearest hit along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        self.intersect_indexed(ray).map(|(_, hit)| hit)
    }

    /// Nearest hit along `ray` with the index of the shape that was hit.
    /// Falls back to a linear scan before [`Scene::compile`].
    pub fn intersect_indexed(&self, ray: &Ray) -> Option<(usize, Hit<'_>)> {
        self.rays.fetch_add(1, Ordering::Relaxed);
        match &self.tree {
            Some(tree) => tree.intersect_indexed(&self.shapes, ray),
            None => intersect_linear(&self.shapes, ray),
        }
    }

    /// Radiance arriving along a ray that hit nothing.
    pub fn background(&self, direction: DVec3) -> Color {
        let Some(texture) = &self.texture else {
            return self.color;
        };
        let d = direction;
        let u = d.z.atan2(d.x) + self.texture_angle;
        let v = d.y.atan2(DVec3::new(d.x, 0.0, d.z).length());
        let u = (u + PI) / (2.0 * PI);
        let v = (v + PI / 2.0) / PI;
        texture.sample(u, v)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Indices into [`Scene::shapes`] of every emissive shape.
    pub fn lights(&self) -> &[usize] {
        &self.lights
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Total intersection queries so far.
    pub fn ray_count(&self) -> u64 {
        self.rays.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Plane, Sphere};
    use lumen_core::{ImageTexture, Material};

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.add(Sphere::new(DVec3::ZERO, 1.0, Material::diffuse(Color::ONE)));
        scene.add(Sphere::new(
            DVec3::new(0.0, 5.0, 0.0),
            0.5,
            Material::light(Color::ONE, 3.0),
        ));
        scene.add(Plane::new(
            DVec3::new(0.0, -1.0, 0.0),
            DVec3::Y,
            Material::diffuse(Color::splat(0.5)),
        ));
        scene
    }

    #[test]
    fn test_add_registers_lights() {
        let scene = scene();
        assert_eq!(scene.shapes().len(), 3);
        assert_eq!(scene.lights(), &[1]);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut scene = scene();
        assert!(!scene.is_compiled());
        scene.compile();
        let nodes = scene.tree().map(Tree::node_count);
        scene.compile();
        assert_eq!(scene.tree().map(Tree::node_count), nodes);
        assert!(scene.is_compiled());
    }

    #[test]
    fn test_intersect_before_and_after_compile() {
        let mut scene = scene();
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);
        let before = scene.intersect(&ray).map(|h| h.t);
        scene.compile();
        let (index, hit) = scene.intersect_indexed(&ray).unwrap();
        assert_eq!(index, 0);
        assert_eq!(before, Some(hit.t));
        assert!((hit.t - 4.0).abs() < 1e-9);
        assert_eq!(scene.ray_count(), 2);
    }

    #[test]
    fn test_background() {
        let scene = Scene::new().with_background(Color::new(0.1, 0.2, 0.3));
        assert_eq!(scene.background(DVec3::Y), Color::new(0.1, 0.2, 0.3));

        let sky = ImageTexture::solid(Color::splat(0.7));
        let scene = Scene::new().with_environment(Arc::new(sky), 0.5);
        assert!((scene.background(DVec3::X) - Color::splat(0.7)).length() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_tree_config() {
        let mut scene = Scene::new();
        let config = TreeConfig {
            leaf_size: 0,
            ..TreeConfig::default()
        };
        assert!(scene.set_tree_config(config).is_err());
    }
}
