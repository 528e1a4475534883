//! Geometry kernel for the lumen path tracer.
//!
//! Everything here is plain value arithmetic in `f64`: rays, boxes,
//! intervals, vector scattering helpers and 4x4 affine transforms.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod color;
mod interval;
mod ray;
mod transform;
mod vector;

pub use aabb::{Aabb, Axis};
pub use color::{hex_color, kelvin, mix, Color};
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;
pub use vector::{cone, random_in_unit_disk, random_unit_vector, VectorExt};

/// Tolerance used for self-intersection and degeneracy checks.
pub const EPS: f64 = 1e-9;

/// Stand-in for "infinite" extents, e.g. the bounding box of a plane.
pub const INF: f64 = 1e9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvec3_operations() {
        let a = DVec3::new(1.0, 2.0, 3.0);
        let b = DVec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, DVec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.cross(b), DVec3::new(-3.0, 6.0, -3.0));
    }

    #[test]
    fn test_epsilons_are_ordered() {
        assert!(EPS > 0.0);
        assert!(INF > 1.0 / EPS.sqrt());
    }
}
