//! Pinhole and thin-lens camera.

use lumen_math::{random_in_unit_disk, DVec3, Ray};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Camera for generating primary rays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    eye: DVec3,
    // Orthonormal basis: u right-to-left, v up, w forward
    u: DVec3,
    v: DVec3,
    w: DVec3,
    /// Focal length for the vertical field of view
    m: f64,
    focal_distance: f64,
    aperture_radius: f64,
}

impl Camera {
    /// Camera at `eye` looking at `center`, with a vertical field of view
    /// of `fovy` degrees.
    pub fn look_at(eye: DVec3, center: DVec3, up: DVec3, fovy: f64) -> Self {
        let w = (center - eye).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u).normalize();
        Self {
            eye,
            u,
            v,
            w,
            m: 1.0 / (fovy * std::f64::consts::PI / 360.0).tan(),
            focal_distance: 0.0,
            aperture_radius: 0.0,
        }
    }

    /// Enable depth of field, in focus at `focal_point`.
    pub fn with_focus(mut self, focal_point: DVec3, aperture_radius: f64) -> Self {
        self.focal_distance = (focal_point - self.eye).length();
        self.aperture_radius = aperture_radius;
        self
    }

    pub fn eye(&self) -> DVec3 {
        self.eye
    }

    /// Ray through pixel `(x, y)` of a `w` x `h` image, offset by `(u, v)`
    /// within the pixel. Row 0 is the top of the image.
    pub fn cast_ray(
        &self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        u: f64,
        v: f64,
        rng: &mut dyn RngCore,
    ) -> Ray {
        let aspect = w as f64 / h as f64;
        let px = ((x as f64 + u - 0.5) / (w.max(2) - 1) as f64) * 2.0 - 1.0;
        let py = ((y as f64 + v - 0.5) / (h.max(2) - 1) as f64) * 2.0 - 1.0;
        let mut d = (self.u * (-px * aspect) + self.v * (-py) + self.w * self.m).normalize();
        let mut origin = self.eye;
        if self.aperture_radius > 0.0 {
            let focal_point = self.eye + d * self.focal_distance;
            let lens = random_in_unit_disk(rng) * self.aperture_radius;
            origin += self.u * lens.x + self.v * lens.y;
            d = (focal_point - origin).normalize();
        }
        Ray::new(origin, d)
    }
}
