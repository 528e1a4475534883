//! Geometric primitives.
//!
//! Every kind of shape is a variant of the closed [`Shape`] enum, which the
//! scene stores and the tree indexes. Variants keep their own data and
//! dispatch through [`Primitive`].

mod cube;
mod cylinder;
mod harmonic;
mod implicit;
mod mesh;
mod plane;
mod sphere;
mod tessellate;
mod transformed;
mod triangle;

pub use cube::Cube;
pub use cylinder::Cylinder;
pub use harmonic::{sh_function, SphericalHarmonic};
pub use implicit::{ImplicitSurface, Sdf};
pub use mesh::Mesh;
pub use plane::Plane;
pub use sphere::Sphere;
pub use tessellate::tessellate;
pub use transformed::TransformedShape;
pub use triangle::Triangle;

use lumen_core::Material;
use lumen_math::{Aabb, Ray};

use crate::hit::{Hit, Primitive};

#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Cube(Cube),
    Cylinder(Cylinder),
    Plane(Plane),
    Triangle(Triangle),
    Mesh(Mesh),
    Implicit(ImplicitSurface),
    Harmonic(SphericalHarmonic),
    Transformed(TransformedShape),
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Shape {
                fn from(shape: $ty) -> Self {
                    Shape::$variant(shape)
                }
            }
        )*
    };
}

impl_from!(
    Sphere(Sphere),
    Cube(Cube),
    Cylinder(Cylinder),
    Plane(Plane),
    Triangle(Triangle),
    Mesh(Mesh),
    Implicit(ImplicitSurface),
    Harmonic(SphericalHarmonic),
    Transformed(TransformedShape),
);

impl Shape {
    /// One-time precompute before rendering: mesh trees, tessellation.
    pub fn compile(&mut self) {
        match self {
            Shape::Mesh(mesh) => mesh.compile(),
            Shape::Implicit(shape) => shape.compile(),
            Shape::Harmonic(shape) => shape.compile(),
            Shape::Transformed(shape) => shape.compile(),
            Shape::Sphere(_)
            | Shape::Cube(_)
            | Shape::Cylinder(_)
            | Shape::Plane(_)
            | Shape::Triangle(_) => {}
        }
    }

    /// Representative material, used to decide whether the shape is a light.
    /// Meshes report their first triangle's material.
    pub fn material(&self) -> Option<&Material> {
        match self {
            Shape::Sphere(s) => Some(&s.material),
            Shape::Cube(s) => Some(&s.material),
            Shape::Cylinder(s) => Some(&s.material),
            Shape::Plane(s) => Some(&s.material),
            Shape::Triangle(s) => Some(&s.material),
            Shape::Mesh(s) => s.triangles().first().map(|t| &*t.material),
            Shape::Implicit(s) => Some(&s.material),
            Shape::Harmonic(s) => Some(&s.positive),
            Shape::Transformed(s) => s.shape().material(),
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.material().is_some_and(Material::is_emissive)
    }
}

impl Primitive for Shape {
    fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.bounding_box(),
            Shape::Cube(s) => s.bounding_box(),
            Shape::Cylinder(s) => s.bounding_box(),
            Shape::Plane(s) => s.bounding_box(),
            Shape::Triangle(s) => s.bounding_box(),
            Shape::Mesh(s) => s.bounding_box(),
            Shape::Implicit(s) => s.bounding_box(),
            Shape::Harmonic(s) => s.bounding_box(),
            Shape::Transformed(s) => s.bounding_box(),
        }
    }

    fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        match self {
            Shape::Sphere(s) => s.intersect(ray),
            Shape::Cube(s) => s.intersect(ray),
            Shape::Cylinder(s) => s.intersect(ray),
            Shape::Plane(s) => s.intersect(ray),
            Shape::Triangle(s) => s.intersect(ray),
            Shape::Mesh(s) => s.intersect(ray),
            Shape::Implicit(s) => s.intersect(ray),
            Shape::Harmonic(s) => s.intersect(ray),
            Shape::Transformed(s) => s.intersect(ray),
        }
    }
}
