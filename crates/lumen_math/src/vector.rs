//! Scattering helpers on top of `glam::DVec3`.

use std::f64::consts::PI;

use rand::{Rng, RngCore};

use crate::{DVec3, EPS};

/// Dielectric refraction of an incident direction about a surface normal.
///
/// Mirror reflection is glam's own `DVec3::reflect`.
pub trait VectorExt {
    /// Snell refraction going from index `n1` into index `n2`.
    ///
    /// Returns `None` on total internal reflection.
    fn refract_between(self, normal: DVec3, n1: f64, n2: f64) -> Option<DVec3>;

    /// Fresnel reflectance for an unpolarized dielectric interface: the
    /// average of the s and p terms, or `1.0` on total internal reflection.
    fn reflectance(self, normal: DVec3, n1: f64, n2: f64) -> f64;
}

impl VectorExt for DVec3 {
    fn refract_between(self, normal: DVec3, n1: f64, n2: f64) -> Option<DVec3> {
        let nr = n1 / n2;
        let cos_i = -normal.dot(self);
        let sin_t2 = nr * nr * (1.0 - cos_i * cos_i);
        if sin_t2 > 1.0 {
            return None;
        }
        let cos_t = (1.0 - sin_t2).sqrt();
        Some(self * nr + normal * (nr * cos_i - cos_t))
    }

    fn reflectance(self, normal: DVec3, n1: f64, n2: f64) -> f64 {
        let nr = n1 / n2;
        let cos_i = -normal.dot(self);
        let sin_t2 = nr * nr * (1.0 - cos_i * cos_i);
        if sin_t2 > 1.0 {
            return 1.0;
        }
        let cos_t = (1.0 - sin_t2).sqrt();
        let r_orth = (n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t);
        let r_par = (n2 * cos_i - n1 * cos_t) / (n2 * cos_i + n1 * cos_t);
        (r_orth * r_orth + r_par * r_par) / 2.0
    }
}

/// Random direction inside a cone of half-angle `theta` around `direction`.
///
/// Samples concentrate toward the axis; `theta < EPS` returns `direction`
/// unchanged so perfectly sharp materials stay sharp.
pub fn cone(direction: DVec3, theta: f64, u: f64, v: f64) -> DVec3 {
    if theta < EPS {
        return direction;
    }
    let theta = theta * (1.0 - 2.0 * u.acos() / PI);
    let m1 = theta.sin();
    let m2 = theta.cos();
    let a = v * 2.0 * PI;
    let (s, t) = direction.any_orthonormal_pair();
    (s * (m1 * a.cos()) + t * (m1 * a.sin()) + direction * m2).normalize()
}

/// Uniformly distributed unit vector.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> DVec3 {
    loop {
        let v = DVec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-12 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

/// Uniform point in the unit disk on the XY plane.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> DVec3 {
    loop {
        let p = DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
