//! Sphere primitive.

use std::f64::consts::PI;

use lumen_core::Material;
use lumen_math::{Aabb, DVec2, DVec3, Ray, EPS};

use crate::hit::{Hit, Primitive, Surface};

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
    pub material: Material,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64, material: Material) -> Self {
        let radius = radius.max(0.0);
        let rvec = DVec3::splat(radius);
        Self {
            center,
            radius,
            material,
            bbox: Aabb::new(center - rvec, center + rvec),
        }
    }
}

impl Primitive for Sphere {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Smaller root first; falls back to the far root when the origin is
    /// inside the sphere. Assumes a unit direction.
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let to = ray.origin - self.center;
        let b = to.dot(ray.direction);
        let c = to.dot(to) - self.radius * self.radius;
        let d = b * b - c;
        if d <= 0.0 {
            return None;
        }
        let d = d.sqrt();
        let t1 = -b - d;
        if t1 > EPS {
            return Some(Hit::new(self, t1, *ray));
        }
        let t2 = -b + d;
        if t2 > EPS {
            return Some(Hit::new(self, t2, *ray));
        }
        None
    }
}

impl Surface for Sphere {
    fn normal_at(&self, p: DVec3) -> DVec3 {
        (p - self.center).normalize()
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    /// Longitude/latitude mapping.
    fn uv(&self, p: DVec3) -> DVec2 {
        let p = p - self.center;
        let u = p.z.atan2(p.x);
        let v = p.y.atan2(DVec2::new(p.x, p.z).length());
        DVec2::new(1.0 - (u + PI) / (2.0 * PI), (v + PI / 2.0) / PI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Color;

    fn unit_sphere() -> Sphere {
        Sphere::new(DVec3::ZERO, 1.0, Material::diffuse(Color::ONE))
    }

    #[test]
    fn test_unit_sphere_analytic_hit() {
        let sphere = unit_sphere();
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-12);

        let info = hit.info();
        assert!((info.position - DVec3::Z).length() < 1e-12);
        assert!((info.normal - DVec3::Z).length() < 1e-12);
        assert!(!info.inside);
    }

    #[test]
    fn test_sphere_from_inside() {
        let sphere = unit_sphere();
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-12);
        let info = hit.info();
        assert!(info.inside);
        assert!((info.normal + DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_sphere_miss_and_behind() {
        let sphere = unit_sphere();
        let miss = Ray::new(DVec3::new(0.0, 2.0, 5.0), -DVec3::Z);
        assert!(sphere.intersect(&miss).is_none());

        let behind = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::Z);
        assert!(sphere.intersect(&behind).is_none());
    }

    #[test]
    fn test_sphere_uv_range() {
        let sphere = unit_sphere();
        for p in [DVec3::X, DVec3::Y, -DVec3::Y, DVec3::Z, -DVec3::Z] {
            let uv = sphere.uv(p);
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
        assert!((sphere.uv(DVec3::Y).y - 1.0).abs() < 1e-12);
    }
}
