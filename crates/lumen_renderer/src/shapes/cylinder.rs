//! Open cylinder around the Z axis.

use std::f64::consts::PI;

use lumen_core::Material;
use lumen_math::{Aabb, DMat4, DVec2, DVec3, Ray, EPS};

use super::{Shape, TransformedShape};
use crate::error::ShapeError;
use crate::hit::{Hit, Primitive, Surface};

/// Cylinder of `radius` around the Z axis, spanning `z0 < z < z1`.
/// It has no caps.
#[derive(Debug, Clone)]
pub struct Cylinder {
    pub radius: f64,
    pub z0: f64,
    pub z1: f64,
    pub material: Material,
}

impl Cylinder {
    pub fn new(radius: f64, z0: f64, z1: f64, material: Material) -> Self {
        Self {
            radius,
            z0: z0.min(z1),
            z1: z0.max(z1),
            material,
        }
    }

    /// Cylinder joining the points `a` and `b`.
    pub fn between(
        a: DVec3,
        b: DVec3,
        radius: f64,
        material: Material,
    ) -> Result<TransformedShape, ShapeError> {
        let d = b - a;
        let length = d.length();
        let angle = (d / length).dot(DVec3::Z).clamp(-1.0, 1.0).acos();
        let mut matrix = DMat4::from_translation(a);
        if angle > EPS {
            let axis = DVec3::Z.cross(d);
            let axis = if axis.length_squared() > EPS {
                axis.normalize()
            } else {
                // Pointing straight down -Z
                DVec3::X
            };
            matrix *= DMat4::from_axis_angle(axis, angle);
        }
        let cylinder = Cylinder::new(radius, 0.0, length, material);
        TransformedShape::new(Shape::Cylinder(cylinder), matrix)
    }
}

impl Primitive for Cylinder {
    fn bounding_box(&self) -> Aabb {
        let r = self.radius;
        Aabb::new(DVec3::new(-r, -r, self.z0), DVec3::new(r, r, self.z1))
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let r = self.radius;
        let o = ray.origin;
        let d = ray.direction;
        let a = d.x * d.x + d.y * d.y;
        let b = 2.0 * o.x * d.x + 2.0 * o.y * d.y;
        let c = o.x * o.x + o.y * o.y - r * r;
        let q = b * b - 4.0 * a * c;
        if q < EPS {
            return None;
        }
        let s = q.sqrt();
        let mut t0 = (-b + s) / (2.0 * a);
        let mut t1 = (-b - s) / (2.0 * a);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        for t in [t0, t1] {
            let z = o.z + t * d.z;
            if t > EPS && self.z0 < z && z < self.z1 {
                return Some(Hit::new(self, t, *ray));
            }
        }
        None
    }
}

impl Surface for Cylinder {
    fn normal_at(&self, p: DVec3) -> DVec3 {
        DVec3::new(p.x, p.y, 0.0).normalize()
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    /// Angle around the axis and height along it.
    fn uv(&self, p: DVec3) -> DVec2 {
        let u = (p.y.atan2(p.x) + PI) / (2.0 * PI);
        let v = (p.z - self.z0) / (self.z1 - self.z0);
        DVec2::new(u, v)
    }
}
