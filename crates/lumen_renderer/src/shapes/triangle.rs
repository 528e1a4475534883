//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection, with
//! per-vertex normals and texture coordinates for shading.

use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DMat3, DVec2, DVec3, Ray, EPS};

use crate::hit::{Hit, Primitive, Surface};

/// A triangle primitive. Meshes share one material between many triangles.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Vertices
    pub v1: DVec3,
    pub v2: DVec3,
    pub v3: DVec3,
    /// Vertex normals; zero means "use the face normal"
    pub n1: DVec3,
    pub n2: DVec3,
    pub n3: DVec3,
    /// Texture coordinates
    pub t1: DVec2,
    pub t2: DVec2,
    pub t3: DVec2,
    pub material: Arc<Material>,
}

impl Triangle {
    /// Flat-shaded triangle without texture coordinates.
    pub fn new(v1: DVec3, v2: DVec3, v3: DVec3, material: Arc<Material>) -> Self {
        let mut triangle = Self {
            v1,
            v2,
            v3,
            n1: DVec3::ZERO,
            n2: DVec3::ZERO,
            n3: DVec3::ZERO,
            t1: DVec2::ZERO,
            t2: DVec2::ZERO,
            t3: DVec2::ZERO,
            material,
        };
        triangle.fix_normals();
        triangle
    }

    /// Set vertex normals for smooth shading. Zero normals fall back to
    /// the face normal.
    pub fn with_normals(mut self, n1: DVec3, n2: DVec3, n3: DVec3) -> Self {
        self.n1 = n1;
        self.n2 = n2;
        self.n3 = n3;
        self.fix_normals();
        self
    }

    /// Set texture coordinates.
    pub fn with_uvs(mut self, t1: DVec2, t2: DVec2, t3: DVec2) -> Self {
        self.t1 = t1;
        self.t2 = t2;
        self.t3 = t3;
        self
    }

    /// Geometric normal from the winding order.
    pub fn face_normal(&self) -> DVec3 {
        (self.v2 - self.v1).cross(self.v3 - self.v1).normalize()
    }

    /// Replace missing vertex normals with the face normal.
    pub fn fix_normals(&mut self) {
        let n = self.face_normal();
        for vn in [&mut self.n1, &mut self.n2, &mut self.n3] {
            if *vn == DVec3::ZERO {
                *vn = n;
            }
        }
    }

    /// Barycentric weights `(u, v, w)` of `p` for `v1`, `v2`, `v3`.
    pub fn barycentric(&self, p: DVec3) -> (f64, f64, f64) {
        let e0 = self.v2 - self.v1;
        let e1 = self.v3 - self.v1;
        let e2 = p - self.v1;
        let d00 = e0.dot(e0);
        let d01 = e0.dot(e1);
        let d11 = e1.dot(e1);
        let d20 = e2.dot(e0);
        let d21 = e2.dot(e1);
        let d = d00 * d11 - d01 * d01;
        let v = (d11 * d20 - d01 * d21) / d;
        let w = (d00 * d21 - d01 * d20) / d;
        (1.0 - v - w, v, w)
    }

    /// Tangent and bitangent from the UV layout.
    fn tangent_frame(&self) -> (DVec3, DVec3) {
        let dv1 = self.v2 - self.v1;
        let dv2 = self.v3 - self.v1;
        let dt1 = self.t2 - self.t1;
        let dt2 = self.t3 - self.t1;
        let tangent = (dv1 * dt2.y - dv2 * dt1.y).normalize_or_zero();
        let bitangent = (dv2 * dt1.x - dv1 * dt2.x).normalize_or_zero();
        (tangent, bitangent)
    }
}

impl Primitive for Triangle {
    fn bounding_box(&self) -> Aabb {
        Aabb::new(
            self.v1.min(self.v2).min(self.v3),
            self.v1.max(self.v2).max(self.v3),
        )
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let e1 = self.v2 - self.v1;
        let e2 = self.v3 - self.v1;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);

        // Parallel ray or zero-area triangle
        if det > -EPS && det < EPS {
            return None;
        }
        let inv = 1.0 / det;
        let tvec = ray.origin - self.v1;
        let u = tvec.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = tvec.cross(e1);
        let v = ray.direction.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        if t < EPS {
            return None;
        }
        Some(Hit::new(self, t, *ray))
    }
}

impl Surface for Triangle {
    /// Interpolated normal, perturbed by the material's normal and bump maps.
    fn normal_at(&self, p: DVec3) -> DVec3 {
        let (u, v, w) = self.barycentric(p);
        let mut n = (self.n1 * u + self.n2 * v + self.n3 * w).normalize();

        let material = &*self.material;
        if material.normal_texture.is_some() || material.bump_texture.is_some() {
            let uv = self.t1 * u + self.t2 * v + self.t3 * w;
            let (tangent, bitangent) = self.tangent_frame();
            if let Some(texture) = &material.normal_texture {
                let ns = texture.normal_sample(uv.x, uv.y);
                let basis = DMat3::from_cols(tangent, bitangent, tangent.cross(bitangent));
                n = (basis * ns).normalize();
            }
            if let Some(texture) = &material.bump_texture {
                let bump = texture.bump_sample(uv.x, uv.y);
                n += tangent * (bump.x * material.bump_multiplier);
                n += bitangent * (bump.y * material.bump_multiplier);
            }
        }
        n.normalize()
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    fn uv(&self, p: DVec3) -> DVec2 {
        let (u, v, w) = self.barycentric(p);
        self.t1 * u + self.t2 * v + self.t3 * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::ImageTexture;
    use lumen_math::Color;

    fn material() -> Arc<Material> {
        Arc::new(Material::diffuse(Color::ONE))
    }

    fn unit_triangle() -> Triangle {
        Triangle::new(DVec3::ZERO, DVec3::X, DVec3::Y, material())
    }

    #[test]
    fn test_triangle_hit() {
        let tri = unit_triangle();
        let ray = Ray::new(DVec3::new(0.25, 0.25, 2.0), -DVec3::Z);
        let hit = tri.intersect(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-12);
        assert!((hit.info().normal - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_triangle_miss_outside_edges() {
        let tri = unit_triangle();
        let ray = Ray::new(DVec3::new(0.75, 0.75, 2.0), -DVec3::Z);
        assert!(tri.intersect(&ray).is_none());
        // Parallel to the plane
        let ray = Ray::new(DVec3::new(0.1, 0.1, 0.0), DVec3::X);
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let tri = Triangle::new(DVec3::ZERO, DVec3::ZERO, DVec3::Y, material());
        for origin in [DVec3::new(0.0, 0.5, 1.0), DVec3::new(0.001, 0.2, -3.0)] {
            for dir in [-DVec3::Z, DVec3::Z, DVec3::new(0.1, 0.2, -1.0).normalize()] {
                assert!(tri.intersect(&Ray::new(origin, dir)).is_none());
            }
        }
    }

    #[test]
    fn test_barycentric_and_uv() {
        let tri = unit_triangle().with_uvs(DVec2::ZERO, DVec2::X, DVec2::Y);
        let (u, v, w) = tri.barycentric(DVec3::new(0.2, 0.3, 0.0));
        assert!((u - 0.5).abs() < 1e-12);
        assert!((v - 0.2).abs() < 1e-12);
        assert!((w - 0.3).abs() < 1e-12);
        let uv = tri.uv(DVec3::new(0.2, 0.3, 0.0));
        assert!((uv - DVec2::new(0.2, 0.3)).length() < 1e-12);
    }

    #[test]
    fn test_smooth_normals_interpolate() {
        let tri = unit_triangle().with_normals(
            DVec3::new(-1.0, 0.0, 1.0).normalize(),
            DVec3::new(1.0, 0.0, 1.0).normalize(),
            DVec3::Z,
        );
        let n = tri.normal_at(DVec3::new(0.5, 0.0, 0.0));
        assert!((n - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_flat_normal_map_keeps_normal() {
        let flat = Arc::new(ImageTexture::solid(Color::new(0.5, 0.5, 1.0)));
        let material = Arc::new(Material::diffuse(Color::ONE).with_normal_texture(flat));
        let tri = Triangle::new(DVec3::ZERO, DVec3::X, DVec3::Y, material)
            .with_uvs(DVec2::ZERO, DVec2::X, DVec2::Y);
        let n = tri.normal_at(DVec3::new(0.2, 0.2, 0.0));
        assert!((n - DVec3::Z).length() < 1e-9);
    }
}
