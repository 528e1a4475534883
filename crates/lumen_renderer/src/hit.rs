//! Intersection results and the contract every primitive implements.

use lumen_core::Material;
use lumen_math::{Aabb, DMat4, DVec2, DVec3, Mat4Ext, Ray};

/// Per-point surface queries, evaluated after the nearest hit is known.
pub trait Surface: Send + Sync {
    /// Outward unit normal at a point on the surface.
    fn normal_at(&self, p: DVec3) -> DVec3;

    /// Unresolved material at a point on the surface.
    fn material_at(&self, p: DVec3) -> &Material;

    /// Surface parameterization used for texture lookups.
    fn uv(&self, p: DVec3) -> DVec2;

    /// Implicit surfaces have no meaningful "inside" for refraction.
    fn solid_interior(&self) -> bool {
        false
    }
}

/// Something the spatial index can hold.
pub trait Primitive: Send + Sync {
    fn bounding_box(&self) -> Aabb;

    /// Nearest forward hit with `t > EPS`, or `None`.
    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>>;
}

/// Result of one intersection query.
///
/// Holds a non-owning reference to the surface that was hit and the ray
/// parameter. The position, normal and material are only worked out when
/// [`Hit::info`] is called, which is once per path vertex rather than once
/// per candidate primitive.
#[derive(Clone)]
pub struct Hit<'a> {
    pub surface: &'a dyn Surface,
    pub t: f64,
    ray: Ray,
    detail: Detail<'a>,
}

#[derive(Clone)]
enum Detail<'a> {
    /// Worked out from `surface` at the hit position.
    Surface,
    /// A hit found in shape space, carried into world space on demand.
    Transformed {
        local: Box<Hit<'a>>,
        matrix: &'a DMat4,
        normal_matrix: &'a DMat4,
    },
}

/// Surface detail at a hit point.
#[derive(Clone, Debug)]
pub struct HitInfo {
    pub position: DVec3,
    /// Unit normal facing against the incoming ray
    pub normal: DVec3,
    /// `(position, normal)`, the frame for bounce sampling
    pub ray: Ray,
    /// Material with textures resolved at this point
    pub material: Material,
    /// Whether the ray was travelling inside the surface
    pub inside: bool,
}

impl<'a> Hit<'a> {
    pub fn new(surface: &'a dyn Surface, t: f64, ray: Ray) -> Self {
        Self {
            surface,
            t,
            ray,
            detail: Detail::Surface,
        }
    }

    /// World-space hit for `local`, a hit found on a ray mapped into shape
    /// space. `normal_matrix` is the inverse transpose of `matrix`.
    pub fn transformed(
        local: Hit<'a>,
        t: f64,
        ray: Ray,
        matrix: &'a DMat4,
        normal_matrix: &'a DMat4,
    ) -> Self {
        Self {
            surface: local.surface,
            t,
            ray,
            detail: Detail::Transformed {
                local: Box::new(local),
                matrix,
                normal_matrix,
            },
        }
    }

    /// The ray this hit was found on.
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    pub fn position(&self) -> DVec3 {
        self.ray.at(self.t)
    }

    pub fn info(&self) -> HitInfo {
        if let Detail::Transformed {
            local,
            matrix,
            normal_matrix,
        } = &self.detail
        {
            let local = local.info();
            let position = matrix.mul_position(local.position);
            let normal = normal_matrix.mul_direction(local.normal);
            return HitInfo {
                position,
                normal,
                ray: Ray::new(position, normal),
                material: local.material,
                inside: local.inside,
            };
        }
        let surface = self.surface;
        let position = self.position();
        let mut normal = surface.normal_at(position);
        if !normal.is_finite() || normal == DVec3::ZERO {
            // Degenerate gradient: shade as if facing the ray.
            normal = -self.ray.direction;
        }
        let material = surface
            .material_at(position)
            .resolve(|| surface.uv(position));

        let mut inside = false;
        if normal.dot(self.ray.direction) > 0.0 {
            normal = -normal;
            inside = !surface.solid_interior();
        }
        HitInfo {
            position,
            normal,
            ray: Ray::new(position, normal),
            material,
            inside,
        }
    }
}

impl std::fmt::Debug for Hit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hit")
            .field("t", &self.t)
            .field("ray", &self.ray)
            .field(
                "transformed",
                &matches!(self.detail, Detail::Transformed { .. }),
            )
            .finish()
    }
}
