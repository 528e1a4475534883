// Transform utilities for DMat4
//
// glam already provides composition (from_translation, from_scale,
// from_axis_angle) and the raw inverse; this adds the ray tracing side.

use glam::{DMat4, DVec3};

use crate::{Aabb, Ray, EPS};

/// Extension trait for DMat4 to transform scene geometry.
pub trait Mat4Ext {
    /// Transform a point (w = 1).
    fn mul_position(&self, position: DVec3) -> DVec3;

    /// Transform a direction (w = 0) and renormalize it.
    fn mul_direction(&self, direction: DVec3) -> DVec3;

    /// Transform both origin and direction of a ray.
    fn mul_ray(&self, ray: &Ray) -> Ray;

    /// Bounding box of the transformed box.
    ///
    /// Each basis vector is scaled by the box's min and max on its axis and
    /// the per-axis extremes are summed with the translation, which covers
    /// all 8 transformed corners without visiting them.
    fn mul_box(&self, aabb: &Aabb) -> Aabb;

    /// Inverse of the matrix, or `None` when it is (numerically) singular.
    fn checked_inverse(&self) -> Option<DMat4>;
}

impl Mat4Ext for DMat4 {
    fn mul_position(&self, position: DVec3) -> DVec3 {
        self.transform_point3(position)
    }

    fn mul_direction(&self, direction: DVec3) -> DVec3 {
        self.transform_vector3(direction).normalize()
    }

    fn mul_ray(&self, ray: &Ray) -> Ray {
        Ray::new(self.mul_position(ray.origin), self.mul_direction(ray.direction))
    }

    fn mul_box(&self, aabb: &Aabb) -> Aabb {
        let r = self.x_axis.truncate();
        let u = self.y_axis.truncate();
        let b = self.z_axis.truncate();
        let t = self.w_axis.truncate();

        let (xa, xb) = (r * aabb.min.x, r * aabb.max.x);
        let (ya, yb) = (u * aabb.min.y, u * aabb.max.y);
        let (za, zb) = (b * aabb.min.z, b * aabb.max.z);

        let min = xa.min(xb) + ya.min(yb) + za.min(zb) + t;
        let max = xa.max(xb) + ya.max(yb) + za.max(zb) + t;
        Aabb::new(min, max)
    }

    fn checked_inverse(&self) -> Option<DMat4> {
        if self.determinant().abs() < EPS {
            None
        } else {
            Some(self.inverse())
        }
    }
}
