//! Real spherical harmonics as closed surfaces.

use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DVec2, DVec3, Ray};

use super::implicit::gradient;
use super::tessellate::tessellate;
use super::Mesh;
use crate::error::ShapeError;
use crate::hit::{Hit, Primitive, Surface};

type Harmonic = fn(DVec3) -> f64;

/// The surface `r = |Y(l, m)(direction)|` for one real spherical harmonic
/// of degree at most 4. Lobes where the harmonic is positive use one
/// material and negative lobes the other.
#[derive(Debug, Clone)]
pub struct SphericalHarmonic {
    l: i32,
    m: i32,
    function: Harmonic,
    pub positive: Material,
    pub negative: Material,
    mesh: Mesh,
}

impl SphericalHarmonic {
    /// Tessellates the surface right away with cells of size `step`.
    pub fn new(
        l: i32,
        m: i32,
        positive: Material,
        negative: Material,
        step: f64,
    ) -> Result<Self, ShapeError> {
        let function = sh_function(l, m).ok_or(ShapeError::UnsupportedHarmonic { l, m })?;
        if step.is_nan() || step <= 0.0 {
            return Err(ShapeError::InvalidStep(step));
        }
        let bounds = Aabb::new(DVec3::splat(-1.0), DVec3::ONE);
        let mesh = tessellate(
            |p| distance(function, p),
            bounds,
            step,
            Arc::new(positive.clone()),
        );
        log::debug!(
            "harmonic l={} m={}: {} triangles",
            l,
            m,
            mesh.triangles().len()
        );
        Ok(Self {
            l,
            m,
            function,
            positive,
            negative,
            mesh,
        })
    }

    pub fn degree(&self) -> (i32, i32) {
        (self.l, self.m)
    }

    pub fn compile(&mut self) {
        self.mesh.compile();
    }

    /// Signed value of the harmonic in the direction of `p`.
    pub fn evaluate_harmonic(&self, p: DVec3) -> f64 {
        (self.function)(p.normalize_or_zero())
    }

    /// Distance-like field, negative inside the surface.
    pub fn evaluate(&self, p: DVec3) -> f64 {
        distance(self.function, p)
    }
}

fn distance(function: Harmonic, p: DVec3) -> f64 {
    p.length() - function(p.normalize_or_zero()).abs()
}

impl Primitive for SphericalHarmonic {
    fn bounding_box(&self) -> Aabb {
        Aabb::new(DVec3::splat(-1.0), DVec3::ONE)
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let hit = self.mesh.intersect(ray)?;
        Some(Hit::new(self, hit.t, *ray))
    }
}

impl Surface for SphericalHarmonic {
    fn normal_at(&self, p: DVec3) -> DVec3 {
        gradient(|q| self.evaluate(q), p)
    }

    fn material_at(&self, p: DVec3) -> &Material {
        if self.evaluate_harmonic(p) < 0.0 {
            &self.negative
        } else {
            &self.positive
        }
    }

    fn uv(&self, _p: DVec3) -> DVec2 {
        DVec2::ZERO
    }

    fn solid_interior(&self) -> bool {
        true
    }
}

/// Real spherical harmonic `Y(l, m)` on unit directions, for `l <= 4`.
pub fn sh_function(l: i32, m: i32) -> Option<Harmonic> {
    let f: Harmonic = match (l, m) {
        (0, 0) => |_: DVec3| 0.282095,
        (1, -1) => |d: DVec3| -0.488603 * d.y,
        (1, 0) => |d: DVec3| 0.488603 * d.z,
        (1, 1) => |d: DVec3| -0.488603 * d.x,
        (2, -2) => |d: DVec3| 1.092548 * d.x * d.y,
        (2, -1) => |d: DVec3| -1.092548 * d.y * d.z,
        (2, 0) => |d: DVec3| 0.315392 * (-d.x * d.x - d.y * d.y + 2.0 * d.z * d.z),
        (2, 1) => |d: DVec3| -1.092548 * d.x * d.z,
        (2, 2) => |d: DVec3| 0.546274 * (d.x * d.x - d.y * d.y),
        (3, -3) => |d: DVec3| -0.590044 * d.y * (3.0 * d.x * d.x - d.y * d.y),
        (3, -2) => |d: DVec3| 2.890611 * d.x * d.y * d.z,
        (3, -1) => |d: DVec3| -0.457046 * d.y * (4.0 * d.z * d.z - d.x * d.x - d.y * d.y),
        (3, 0) => |d: DVec3| 0.373176 * d.z * (2.0 * d.z * d.z - 3.0 * d.x * d.x - 3.0 * d.y * d.y),
        (3, 1) => |d: DVec3| -0.457046 * d.x * (4.0 * d.z * d.z - d.x * d.x - d.y * d.y),
        (3, 2) => |d: DVec3| 1.445306 * d.z * (d.x * d.x - d.y * d.y),
        (3, 3) => |d: DVec3| -0.590044 * d.x * (d.x * d.x - 3.0 * d.y * d.y),
        (4, -4) => |d: DVec3| 2.503343 * d.x * d.y * (d.x * d.x - d.y * d.y),
        (4, -3) => |d: DVec3| -1.770131 * d.y * d.z * (3.0 * d.x * d.x - d.y * d.y),
        (4, -2) => |d: DVec3| 0.946175 * d.x * d.y * (7.0 * d.z * d.z - 1.0),
        (4, -1) => |d: DVec3| -0.669047 * d.y * d.z * (7.0 * d.z * d.z - 3.0),
        (4, 0) => |d: DVec3| {
            let z2 = d.z * d.z;
            0.105786 * (35.0 * z2 * z2 - 30.0 * z2 + 3.0)
        },
        (4, 1) => |d: DVec3| -0.669047 * d.x * d.z * (7.0 * d.z * d.z - 3.0),
        (4, 2) => |d: DVec3| 0.473087 * (d.x * d.x - d.y * d.y) * (7.0 * d.z * d.z - 1.0),
        (4, 3) => |d: DVec3| -1.770131 * d.x * d.z * (d.x * d.x - 3.0 * d.y * d.y),
        (4, 4) => |d: DVec3| {
            let x2 = d.x * d.x;
            let y2 = d.y * d.y;
            0.625836 * (x2 * (x2 - 3.0 * y2) - y2 * (3.0 * x2 - y2))
        },
        _ => return None,
    };
    Some(f)
}
