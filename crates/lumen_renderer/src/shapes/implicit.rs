//! Surfaces defined by signed distance functions.

use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DMat4, DVec2, DVec3, Mat4Ext, Ray};

use super::tessellate::tessellate;
use super::Mesh;
use crate::error::ShapeError;
use crate::hit::{Hit, Primitive, Surface};

/// Signed distance field: negative inside, positive outside.
#[derive(Debug, Clone)]
pub enum Sdf {
    Sphere {
        radius: f64,
    },
    /// Box centered on the origin
    Cube {
        size: DVec3,
    },
    /// Capped cylinder along the Y axis, centered on the origin
    Cylinder {
        radius: f64,
        height: f64,
    },
    /// Segment `a`-`b` inflated by `radius`
    Capsule {
        a: DVec3,
        b: DVec3,
        radius: f64,
    },
    /// Ring in the XY plane
    Torus {
        major_radius: f64,
        minor_radius: f64,
    },
    Transform {
        sdf: Box<Sdf>,
        matrix: DMat4,
        inverse: DMat4,
    },
    Union(Vec<Sdf>),
    Intersection(Vec<Sdf>),
    /// First item minus all the others
    Difference(Vec<Sdf>),
}

impl Sdf {
    /// Place `sdf` with an affine matrix. Distances are only exact for
    /// rigid transforms.
    pub fn transform(sdf: Sdf, matrix: DMat4) -> Result<Sdf, ShapeError> {
        let inverse = matrix
            .checked_inverse()
            .ok_or(ShapeError::SingularTransform {
                determinant: matrix.determinant(),
            })?;
        Ok(Sdf::Transform {
            sdf: Box::new(sdf),
            matrix,
            inverse,
        })
    }

    pub fn evaluate(&self, p: DVec3) -> f64 {
        match self {
            Sdf::Sphere { radius } => p.length() - radius,
            Sdf::Cube { size } => {
                let q = p.abs() - *size / 2.0;
                q.max_element().min(0.0) + q.max(DVec3::ZERO).length()
            }
            Sdf::Cylinder { radius, height } => {
                let q = DVec2::new(
                    DVec2::new(p.x, p.z).length() - radius,
                    p.y.abs() - height / 2.0,
                );
                q.max_element().min(0.0) + q.max(DVec2::ZERO).length()
            }
            Sdf::Capsule { a, b, radius } => {
                let pa = p - *a;
                let ba = *b - *a;
                let h = (pa.dot(ba) / ba.dot(ba)).clamp(0.0, 1.0);
                (pa - ba * h).length() - radius
            }
            Sdf::Torus {
                major_radius,
                minor_radius,
            } => {
                let q = DVec2::new(DVec2::new(p.x, p.y).length() - major_radius, p.z);
                q.length() - minor_radius
            }
            Sdf::Transform { sdf, inverse, .. } => sdf.evaluate(inverse.mul_position(p)),
            Sdf::Union(items) => items
                .iter()
                .map(|s| s.evaluate(p))
                .fold(f64::INFINITY, f64::min),
            Sdf::Intersection(items) => items
                .iter()
                .map(|s| s.evaluate(p))
                .fold(f64::NEG_INFINITY, f64::max),
            Sdf::Difference(items) => {
                let mut iter = items.iter();
                let Some(first) = iter.next() else {
                    return f64::INFINITY;
                };
                iter.fold(first.evaluate(p), |acc, s| acc.max(-s.evaluate(p)))
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Sdf::Sphere { radius } => Aabb::new(DVec3::splat(-radius), DVec3::splat(*radius)),
            Sdf::Cube { size } => Aabb::new(-*size / 2.0, *size / 2.0),
            Sdf::Cylinder { radius, height } => Aabb::new(
                DVec3::new(-radius, -height / 2.0, -radius),
                DVec3::new(*radius, height / 2.0, *radius),
            ),
            Sdf::Capsule { a, b, radius } => {
                let r = DVec3::splat(*radius);
                Aabb::new(a.min(*b) - r, a.max(*b) + r)
            }
            Sdf::Torus {
                major_radius,
                minor_radius,
            } => {
                let a = *minor_radius;
                let b = minor_radius + major_radius;
                Aabb::new(DVec3::new(-b, -b, -a), DVec3::new(b, b, a))
            }
            Sdf::Transform { sdf, matrix, .. } => matrix.mul_box(&sdf.bounding_box()),
            Sdf::Union(items) => Aabb::for_boxes(items.iter().map(Sdf::bounding_box)),
            Sdf::Intersection(items) => {
                let mut iter = items.iter().map(Sdf::bounding_box);
                let Some(first) = iter.next() else {
                    return Aabb::EMPTY;
                };
                let b = iter.fold(first, |acc, b| Aabb::new(acc.min.max(b.min), acc.max.min(b.max)));
                Aabb::new(b.min, b.max.max(b.min))
            }
            Sdf::Difference(items) => items.first().map_or(Aabb::EMPTY, Sdf::bounding_box),
        }
    }

    /// Central-difference gradient, pointing outward.
    pub fn gradient(&self, p: DVec3) -> DVec3 {
        gradient(|q| self.evaluate(q), p)
    }
}

pub(crate) fn gradient(f: impl Fn(DVec3) -> f64, p: DVec3) -> DVec3 {
    const E: f64 = 1e-4;
    DVec3::new(
        f(p + DVec3::X * E) - f(p - DVec3::X * E),
        f(p + DVec3::Y * E) - f(p - DVec3::Y * E),
        f(p + DVec3::Z * E) - f(p - DVec3::Z * E),
    )
    .normalize_or_zero()
}

#[derive(Debug, Clone)]
enum Mode {
    /// Sphere tracing against the field on every query
    Marched,
    /// Triangle approximation built at compile time
    Tessellated { step: f64, mesh: Option<Mesh> },
}

/// A shape whose surface is the zero set of an [`Sdf`].
#[derive(Debug, Clone)]
pub struct ImplicitSurface {
    pub sdf: Sdf,
    pub material: Material,
    mode: Mode,
}

impl ImplicitSurface {
    /// Intersected by sphere tracing.
    pub fn new(sdf: Sdf, material: Material) -> Self {
        Self {
            sdf,
            material,
            mode: Mode::Marched,
        }
    }

    /// Intersected through a mesh sampled on a grid of cell size `step`.
    pub fn tessellated(sdf: Sdf, material: Material, step: f64) -> Result<Self, ShapeError> {
        if step.is_nan() || step <= 0.0 {
            return Err(ShapeError::InvalidStep(step));
        }
        Ok(Self {
            sdf,
            material,
            mode: Mode::Tessellated { step, mesh: None },
        })
    }

    /// Build the mesh for tessellated surfaces. Does nothing otherwise or
    /// when the mesh already exists.
    pub fn compile(&mut self) {
        if let Mode::Tessellated { step, mesh } = &mut self.mode {
            if mesh.is_none() {
                let material = Arc::new(self.material.clone());
                let sdf = &self.sdf;
                let mut m = tessellate(|p| sdf.evaluate(p), sdf.bounding_box(), *step, material);
                m.compile();
                *mesh = Some(m);
            }
        }
    }

    /// Sphere tracing inside the bounding box.
    fn march(&self, ray: &Ray) -> Option<f64> {
        const EPSILON: f64 = 1e-5;
        const START: f64 = 1e-4;
        const JUMP: f64 = 1e-3;
        const MAX_STEPS: usize = 1000;

        let range = self.sdf.bounding_box().intersect(ray);
        if range.max < range.min || range.max < 0.0 {
            return None;
        }
        let mut t = START.max(range.min);
        let mut jump = true;
        for _ in 0..MAX_STEPS {
            let mut d = self.sdf.evaluate(ray.at(t));
            // Starting inside: step back once so the surface is approached
            // from outside.
            if jump && d < 0.0 {
                t -= JUMP;
                jump = false;
                continue;
            }
            if d < EPSILON {
                return Some(t);
            }
            if jump && d < JUMP {
                d = JUMP;
            }
            t += d;
            if t > range.max {
                return None;
            }
        }
        None
    }
}

impl Primitive for ImplicitSurface {
    fn bounding_box(&self) -> Aabb {
        self.sdf.bounding_box()
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let t = match &self.mode {
            Mode::Tessellated {
                mesh: Some(mesh), ..
            } => mesh.intersect(ray)?.t,
            _ => self.march(ray)?,
        };
        Some(Hit::new(self, t, *ray))
    }
}

impl Surface for ImplicitSurface {
    fn normal_at(&self, p: DVec3) -> DVec3 {
        self.sdf.gradient(p)
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    fn uv(&self, _p: DVec3) -> DVec2 {
        DVec2::ZERO
    }

    fn solid_interior(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Color;

    fn material() -> Material {
        Material::diffuse(Color::ONE)
    }

    #[test]
    fn test_primitive_distances() {
        let sphere = Sdf::Sphere { radius: 1.0 };
        assert!((sphere.evaluate(DVec3::new(3.0, 0.0, 0.0)) - 2.0).abs() < 1e-12);

        let cube = Sdf::Cube {
            size: DVec3::splat(2.0),
        };
        assert!((cube.evaluate(DVec3::new(3.0, 0.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!((cube.evaluate(DVec3::ZERO) + 1.0).abs() < 1e-12);

        let cylinder = Sdf::Cylinder {
            radius: 1.0,
            height: 2.0,
        };
        assert!((cylinder.evaluate(DVec3::new(0.0, 3.0, 0.0)) - 2.0).abs() < 1e-12);

        let capsule = Sdf::Capsule {
            a: DVec3::ZERO,
            b: DVec3::Y,
            radius: 0.5,
        };
        assert!((capsule.evaluate(DVec3::new(1.0, 0.5, 0.0)) - 0.5).abs() < 1e-12);

        let torus = Sdf::Torus {
            major_radius: 2.0,
            minor_radius: 0.5,
        };
        assert!((torus.evaluate(DVec3::new(2.0, 0.0, 0.0)) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_csg() {
        let a = Sdf::Sphere { radius: 1.0 };
        let b = Sdf::transform(
            Sdf::Sphere { radius: 1.0 },
            DMat4::from_translation(DVec3::new(1.5, 0.0, 0.0)),
        )
        .unwrap();
        let p = DVec3::new(-0.5, 0.0, 0.0);
        let q = DVec3::new(1.2, 0.0, 0.0);

        let union = Sdf::Union(vec![a.clone(), b.clone()]);
        assert!(union.evaluate(p) < 0.0 && union.evaluate(q) < 0.0);

        let inter = Sdf::Intersection(vec![a.clone(), b.clone()]);
        assert!(inter.evaluate(p) > 0.0);
        assert!(inter.evaluate(DVec3::new(0.75, 0.0, 0.0)) < 0.0);

        let diff = Sdf::Difference(vec![a, b]);
        assert!(diff.evaluate(p) < 0.0);
        assert!(diff.evaluate(DVec3::new(0.75, 0.0, 0.0)) > 0.0);

        let bbox = union.bounding_box();
        assert!((bbox.max.x - 2.5).abs() < 1e-12);
        let ibox = inter.bounding_box();
        assert!((ibox.min.x - 0.5).abs() < 1e-12 && (ibox.max.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_marched_sphere() {
        let shape = ImplicitSurface::new(Sdf::Sphere { radius: 1.0 }, material());
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);
        let hit = shape.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        let info = hit.info();
        assert!((info.normal - DVec3::Z).length() < 1e-3);
        assert!(!info.inside);

        let miss = Ray::new(DVec3::new(0.0, 2.0, 5.0), -DVec3::Z);
        assert!(shape.intersect(&miss).is_none());
    }

    #[test]
    fn test_tessellated_torus() {
        let sdf = Sdf::Torus {
            major_radius: 1.0,
            minor_radius: 0.3,
        };
        let mut shape = ImplicitSurface::tessellated(sdf, material(), 0.05).unwrap();
        shape.compile();
        // Through the ring
        let ray = Ray::new(DVec3::new(0.01, 0.02, 5.0), -DVec3::Z);
        assert!(shape.intersect(&ray).is_none());
        // Onto the tube
        let ray = Ray::new(DVec3::new(1.01, 0.02, 5.0), -DVec3::Z);
        let hit = shape.intersect(&ray).unwrap();
        assert!((hit.t - 4.7).abs() < 0.02);
    }

    #[test]
    fn test_invalid_step() {
        let sdf = Sdf::Sphere { radius: 1.0 };
        assert!(ImplicitSurface::tessellated(sdf, material(), 0.0).is_err());
    }
}
