use std::f64::consts::PI;

use crate::{cone, DVec3};

/// A ray in 3D space with an origin and a (conventionally unit) direction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Cosine-weighted scatter about this ray's direction, treated as a
    /// surface normal. `u` and `v` are uniform in `[0, 1)`; the unit disk
    /// sample `(sqrt(u), 2*pi*v)` is lifted onto the hemisphere.
    pub fn weighted_bounce(&self, u: f64, v: f64) -> Ray {
        let radius = u.sqrt();
        let theta = 2.0 * PI * v;
        let (s, t) = self.direction.any_orthonormal_pair();
        let d = s * (radius * theta.cos())
            + t * (radius * theta.sin())
            + self.direction * (1.0 - u).sqrt();
        Ray::new(self.origin, d)
    }

    /// Perturbs the direction within a cone of half-angle `theta`.
    pub fn cone_bounce(&self, theta: f64, u: f64, v: f64) -> Ray {
        Ray::new(self.origin, cone(self.direction, theta, u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X);

        assert_eq!(ray.at(0.0), DVec3::ZERO);
        assert_eq!(ray.at(2.0), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), DVec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_weighted_bounce_stays_in_hemisphere() {
        let mut rng = StdRng::seed_from_u64(42);
        let normal = Ray::new(DVec3::ONE, DVec3::new(0.3, -0.5, 0.8).normalize());
        for _ in 0..500 {
            let bounce = normal.weighted_bounce(rng.gen(), rng.gen());
            assert_eq!(bounce.origin, normal.origin);
            assert!(bounce.direction.dot(normal.direction) >= 0.0);
            assert!((bounce.direction.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cone_bounce_zero_gloss_is_identity() {
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);
        assert_eq!(ray.cone_bounce(0.0, 0.3, 0.7).direction, DVec3::Y);
    }
}
