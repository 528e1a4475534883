//! Axis-aligned box primitive.

use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DVec2, DVec3, Ray, EPS};

use super::{Mesh, Triangle};
use crate::hit::{Hit, Primitive, Surface};

#[derive(Debug, Clone)]
pub struct Cube {
    pub min: DVec3,
    pub max: DVec3,
    pub material: Material,
}

impl Cube {
    pub fn new(min: DVec3, max: DVec3, material: Material) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            material,
        }
    }

    /// Same box as 12 triangles.
    pub fn to_mesh(&self) -> Mesh {
        let (a, b) = (self.min, self.max);
        let v = |x: f64, y: f64, z: f64| DVec3::new(x, y, z);
        let corners = [
            v(a.x, a.y, a.z),
            v(a.x, a.y, b.z),
            v(a.x, b.y, a.z),
            v(a.x, b.y, b.z),
            v(b.x, a.y, a.z),
            v(b.x, a.y, b.z),
            v(b.x, b.y, a.z),
            v(b.x, b.y, b.z),
        ];
        // Each face as a quad wound counter-clockwise seen from outside.
        const FACES: [[usize; 4]; 6] = [
            [0, 1, 3, 2], // -x
            [4, 6, 7, 5], // +x
            [0, 4, 5, 1], // -y
            [2, 3, 7, 6], // +y
            [0, 2, 6, 4], // -z
            [1, 5, 7, 3], // +z
        ];
        let material = Arc::new(self.material.clone());
        let triangles = FACES
            .iter()
            .flat_map(|f| {
                [
                    Triangle::new(corners[f[0]], corners[f[1]], corners[f[2]], material.clone()),
                    Triangle::new(corners[f[0]], corners[f[2]], corners[f[3]], material.clone()),
                ]
            })
            .collect();
        Mesh::new(triangles)
    }
}

impl Primitive for Cube {
    fn bounding_box(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }

    /// Slab test; from inside the box the exit face is reported.
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        let n = (self.min - ray.origin) / ray.direction;
        let f = (self.max - ray.origin) / ray.direction;
        let (n, f) = (n.min(f), n.max(f));
        let t0 = n.max_element();
        let t1 = f.min_element();
        if t0 >= t1 {
            return None;
        }
        if t0 > EPS {
            Some(Hit::new(self, t0, *ray))
        } else if t1 > EPS {
            Some(Hit::new(self, t1, *ray))
        } else {
            None
        }
    }
}

impl Surface for Cube {
    fn normal_at(&self, p: DVec3) -> DVec3 {
        if p.x < self.min.x + EPS {
            -DVec3::X
        } else if p.x > self.max.x - EPS {
            DVec3::X
        } else if p.y < self.min.y + EPS {
            -DVec3::Y
        } else if p.y > self.max.y - EPS {
            DVec3::Y
        } else if p.z < self.min.z + EPS {
            -DVec3::Z
        } else if p.z > self.max.z - EPS {
            DVec3::Z
        } else {
            DVec3::Y
        }
    }

    fn material_at(&self, _p: DVec3) -> &Material {
        &self.material
    }

    fn uv(&self, p: DVec3) -> DVec2 {
        let p = (p - self.min) / (self.max - self.min);
        DVec2::new(p.x, p.z)
    }
}
