use lumen_core::Material;
use lumen_math::{Aabb, DVec2, DVec3, Ray, EPS, INF};

use crate::hit::{Hit, Primitive, Surface};

/// Infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
    pub material: Material,
}

impl Plane {
    pub fn new(point: DVec3, normal: DVec3, material: Material) -> Self {
        Self {
            point,
            normal: normal.normalize(),
            material,
        }
    }
}

impl Primitive for Plane {
    fn bounding_box(&self) -> Aabb {
        Aabb::new(DVec3::splat(-INF), DVec3::splat(INF))
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let d = self.normal.dot(ray.direction);
        if d.abs() < EPS {
            return None;
        }
        let t = (self.point - ray.origin).dot(self.normal) / d;
        if t < EPS {
            return None;
        }
        Some(Hit::new(self, t, *ray))
    }
}

impl Surface for Plane {
    fn normal_at(&self, _p: DVec3) -> DVec3 {
        self.normal
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    /// Coordinates in an orthonormal frame on the plane, one unit per
    /// texture repeat.
    fn uv(&self, p: DVec3) -> DVec2 {
        let (s, t) = self.normal.any_orthonormal_pair();
        let d = p - self.point;
        DVec2::new(d.dot(s), d.dot(t))
    }
}
