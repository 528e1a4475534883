//! Affine instancing of any other shape.

use lumen_math::{Aabb, DMat4, Mat4Ext, Ray};

use super::Shape;
use crate::error::ShapeError;
use crate::hit::{Hit, Primitive};

/// A shape placed in the world through an affine matrix.
#[derive(Debug, Clone)]
pub struct TransformedShape {
    shape: Box<Shape>,
    matrix: DMat4,
    inverse: DMat4,
    normal_matrix: DMat4,
}

impl TransformedShape {
    /// Wrap `shape`; fails if `matrix` cannot be inverted.
    pub fn new(shape: Shape, matrix: DMat4) -> Result<Self, ShapeError> {
        let inverse = matrix
            .checked_inverse()
            .ok_or(ShapeError::SingularTransform {
                determinant: matrix.determinant(),
            })?;
        Ok(Self {
            shape: Box::new(shape),
            matrix,
            inverse,
            normal_matrix: inverse.transpose(),
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    pub fn compile(&mut self) {
        self.shape.compile();
    }
}

impl Primitive for TransformedShape {
    fn bounding_box(&self) -> Aabb {
        self.matrix.mul_box(&self.shape.bounding_box())
    }

    /// Intersects in shape space. Only the world-space distance is computed
    /// here; the detail is mapped back when the hit is shaded.
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let local_ray = self.inverse.mul_ray(ray);
        let hit = self.shape.intersect(&local_ray)?;
        let position = self.matrix.mul_position(hit.position());
        let t = (position - ray.origin).length();
        Some(Hit::transformed(
            hit,
            t,
            *ray,
            &self.matrix,
            &self.normal_matrix,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Sphere;
    use lumen_core::{Material, Texture};
    use lumen_math::{Color, DVec3};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sphere() -> Shape {
        Sphere::new(DVec3::ZERO, 1.0, Material::diffuse(Color::ONE)).into()
    }

    #[test]
    fn test_translated_sphere() {
        let shape =
            TransformedShape::new(sphere(), DMat4::from_translation(DVec3::new(0.0, 0.0, -5.0)))
                .unwrap();
        let ray = Ray::new(DVec3::ZERO, -DVec3::Z);
        let hit = shape.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-9);
        let info = hit.info();
        assert!((info.position - DVec3::new(0.0, 0.0, -4.0)).length() < 1e-9);
        assert!((info.normal - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_scaled_sphere_uses_world_distance() {
        let shape = TransformedShape::new(
            sphere(),
            DMat4::from_scale(DVec3::new(2.0, 1.0, 1.0)),
        )
        .unwrap();
        let ray = Ray::new(DVec3::new(-10.0, 0.0, 0.0), DVec3::X);
        let hit = shape.intersect(&ray).unwrap();
        assert!((hit.t - 8.0).abs() < 1e-9);
        assert!((hit.info().normal + DVec3::X).length() < 1e-9);

        let bbox = shape.bounding_box();
        assert!((bbox.max - DVec3::new(2.0, 1.0, 1.0)).length() < 1e-12);
    }

    #[derive(Debug, Default)]
    struct CountingTexture {
        lookups: AtomicUsize,
    }

    impl Texture for CountingTexture {
        fn sample(&self, _u: f64, _v: f64) -> Color {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            Color::new(0.2, 0.4, 0.6)
        }
    }

    #[test]
    fn test_detail_resolved_only_when_shaded() {
        let texture = Arc::new(CountingTexture::default());
        let material = Material::diffuse(Color::ONE).with_texture(texture.clone());
        let shape = TransformedShape::new(
            Sphere::new(DVec3::ZERO, 1.0, material).into(),
            DMat4::from_translation(DVec3::new(3.0, 0.0, 0.0)),
        )
        .unwrap();

        let ray = Ray::new(DVec3::new(3.0, 0.0, 5.0), -DVec3::Z);
        let hit = shape.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-9);
        assert_eq!(texture.lookups.load(Ordering::Relaxed), 0);

        let info = hit.info();
        assert_eq!(texture.lookups.load(Ordering::Relaxed), 1);
        assert_eq!(info.material.color, Color::new(0.2, 0.4, 0.6));
        assert!((info.position - DVec3::new(3.0, 0.0, 1.0)).length() < 1e-9);
        assert!((info.normal - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let err = TransformedShape::new(sphere(), DMat4::from_scale(DVec3::new(1.0, 0.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, ShapeError::SingularTransform { .. }));
    }
}
