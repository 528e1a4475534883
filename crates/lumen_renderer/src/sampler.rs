//! Light transport: turns a camera ray into a radiance estimate.

use lumen_math::{mix, random_unit_vector, Color, Ray, VectorExt, EPS};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{require_count, require_unit, ConfigError};
use crate::hit::{HitInfo, Primitive};
use crate::scene::Scene;
use crate::shapes::Shape;

/// Lower bound for any probability that ends up in a denominator.
pub const MIN_PROBABILITY: f64 = 1e-6;

/// Estimates the radiance arriving along a ray.
pub trait Sampler: Send + Sync {
    fn sample(&self, scene: &Scene, ray: &Ray, rng: &mut dyn RngCore) -> Color;
}

/// How lights are sampled at diffuse vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightMode {
    /// Every light, every time
    All,
    /// One light picked uniformly, scaled by the light count
    Random,
}

/// Which vertices split into separate diffuse and specular estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecularMode {
    /// Never: one stochastic choice per bounce
    Naive,
    /// Only the first hit
    First,
    /// Every hit
    All,
}

/// Probabilistic path termination after a given depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RussianRoulette {
    /// First bounce depth at which paths may be terminated
    pub start_depth: u32,
    /// Survival probability never drops below this
    pub min_probability: f64,
}

impl Default for RussianRoulette {
    fn default() -> Self {
        Self {
            start_depth: 3,
            min_probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Bounce samples taken at the first hit, rounded down to a square
    pub first_hit_samples: u32,
    /// Hard limit on path length
    pub max_bounces: u32,
    /// Sample lights explicitly at diffuse vertices
    pub direct_lighting: bool,
    /// Aim light samples across the light's extent instead of its center
    pub soft_shadows: bool,
    pub light_mode: LightMode,
    pub specular_mode: SpecularMode,
    pub russian_roulette: Option<RussianRoulette>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            first_hit_samples: 1,
            max_bounces: 4,
            direct_lighting: true,
            soft_shadows: true,
            light_mode: LightMode::Random,
            specular_mode: SpecularMode::Naive,
            russian_roulette: None,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_count("first_hit_samples", self.first_hit_samples as u64)?;
        if let Some(rr) = &self.russian_roulette {
            require_unit("min_probability", rr.min_probability)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BounceMode {
    Any,
    Diffuse,
    Specular,
}

/// A scattered ray and the probability of the lobe that produced it.
struct Bounce {
    ray: Ray,
    specular: bool,
    probability: f64,
}

/// Unidirectional path tracer with optional next-event estimation.
#[derive(Debug, Clone, Default)]
pub struct PathSampler {
    config: SamplerConfig,
}

impl PathSampler {
    pub fn new(config: SamplerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn trace(
        &self,
        scene: &Scene,
        ray: &Ray,
        emission: bool,
        samples: u32,
        depth: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        if depth > self.config.max_bounces {
            return Color::ZERO;
        }
        let Some(hit) = scene.intersect(ray) else {
            return scene.background(ray.direction);
        };
        let info = hit.info();
        let material = &info.material;

        let n = ((samples as f64).sqrt() as u32).max(1);
        let count = (n * n) as f64;

        let mut result = Color::ZERO;
        if material.is_emissive() {
            if self.config.direct_lighting && !emission {
                return Color::ZERO;
            }
            result += material.color * (material.emittance * count);
        }

        let mut weight = 1.0;
        if let Some(rr) = &self.config.russian_roulette {
            if depth >= rr.start_depth {
                let survival = material
                    .color
                    .max_element()
                    .clamp(rr.min_probability.max(MIN_PROBABILITY), 1.0);
                if rng.gen::<f64>() >= survival {
                    return result / count;
                }
                weight = 1.0 / survival;
            }
        }

        let split = match self.config.specular_mode {
            SpecularMode::All => true,
            SpecularMode::First => depth == 0,
            SpecularMode::Naive => false,
        };
        let modes: &[BounceMode] = if split {
            &[BounceMode::Diffuse, BounceMode::Specular]
        } else {
            &[BounceMode::Any]
        };

        for u in 0..n {
            for v in 0..n {
                for &mode in modes {
                    let fu = (u as f64 + rng.gen::<f64>()) / n as f64;
                    let fv = (v as f64 + rng.gen::<f64>()) / n as f64;
                    let bounce = bounce(ray, &info, fu, fv, mode, rng);
                    let p = if mode == BounceMode::Any {
                        1.0
                    } else {
                        bounce.probability
                    };
                    if p <= 0.0 {
                        continue;
                    }
                    let indirect =
                        self.trace(scene, &bounce.ray, bounce.specular, 1, depth + 1, rng);
                    if bounce.specular {
                        let tinted = mix(indirect, material.color * indirect, material.tint);
                        result += tinted * (p * weight);
                    } else {
                        let direct = if self.config.direct_lighting {
                            self.sample_lights(scene, &info.ray, rng)
                        } else {
                            Color::ZERO
                        };
                        result += material.color * (direct + indirect) * (p * weight);
                    }
                }
            }
        }
        result / count
    }

    /// Next-event estimate from the lights, seen from the surface frame
    /// `normal` (origin on the surface, direction along the normal).
    fn sample_lights(&self, scene: &Scene, normal: &Ray, rng: &mut dyn RngCore) -> Color {
        let lights = scene.lights();
        if lights.is_empty() {
            return Color::ZERO;
        }
        match self.config.light_mode {
            LightMode::All => lights
                .iter()
                .map(|&light| self.sample_light(scene, normal, light, rng))
                .sum(),
            LightMode::Random => {
                let light = lights[rng.gen_range(0..lights.len())];
                self.sample_light(scene, normal, light, rng) * lights.len() as f64
            }
        }
    }

    fn sample_light(
        &self,
        scene: &Scene,
        normal: &Ray,
        light: usize,
        rng: &mut dyn RngCore,
    ) -> Color {
        let Some(shape) = scene.shapes().get(light) else {
            return Color::ZERO;
        };
        let (center, radius) = match shape {
            Shape::Sphere(sphere) => (sphere.center, sphere.radius),
            other => {
                let bbox = other.bounding_box();
                (bbox.center(), bbox.outer_radius())
            }
        };

        let mut point = center;
        if self.config.soft_shadows {
            let l = (center - normal.origin).normalize_or_zero();
            let u = l.cross(random_unit_vector(rng)).normalize_or_zero();
            let v = l.cross(u);
            let (x, y) = loop {
                let x = rng.gen_range(-1.0..=1.0);
                let y = rng.gen_range(-1.0..=1.0);
                if x * x + y * y <= 1.0 {
                    break (x, y);
                }
            };
            point = center + u * (x * radius) + v * (y * radius);
        }

        let direction = (point - normal.origin).normalize_or_zero();
        let diffuse = direction.dot(normal.direction);
        if diffuse <= 0.0 {
            return Color::ZERO;
        }

        let ray = Ray::new(normal.origin, direction);
        let Some((index, hit)) = scene.intersect_indexed(&ray) else {
            return Color::ZERO;
        };
        if index != light {
            return Color::ZERO;
        }

        // Fraction of the hemisphere covered by the light's bounding sphere.
        // A point inside that sphere sees the light over the whole hemisphere.
        let hyp2 = (center - normal.origin).length_squared();
        let r2 = radius * radius;
        let coverage = if hyp2 - r2 <= EPS {
            1.0
        } else {
            (r2 / (hyp2 - r2)).min(1.0)
        };

        let material = hit.info().material;
        material.color * (material.emittance * diffuse * coverage)
    }
}

impl Sampler for PathSampler {
    fn sample(&self, scene: &Scene, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        self.trace(scene, ray, true, self.config.first_hit_samples, 0, rng)
    }
}

/// Scatter `incident` off the surface described by `info`.
fn bounce(
    incident: &Ray,
    info: &HitInfo,
    u: f64,
    v: f64,
    mode: BounceMode,
    rng: &mut dyn RngCore,
) -> Bounce {
    let material = &info.material;
    let (n1, n2) = if info.inside {
        (material.index, 1.0)
    } else {
        (1.0, material.index)
    };
    let p = if material.reflectivity >= 0.0 {
        material.reflectivity
    } else {
        incident.direction.reflectance(info.normal, n1, n2)
    };
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };

    let reflect = match mode {
        BounceMode::Any => rng.gen::<f64>() < p,
        BounceMode::Diffuse => false,
        BounceMode::Specular => true,
    };

    let mirror = || {
        let d = incident.direction.reflect(info.normal);
        Ray::new(info.position, d).cone_bounce(material.gloss, u, v)
    };

    if reflect {
        Bounce {
            ray: mirror(),
            specular: true,
            probability: p,
        }
    } else if material.transparent {
        let ray = match incident.direction.refract_between(info.normal, n1, n2) {
            Some(d) => {
                let d = d.normalize();
                Ray::new(info.position + d * 1e-4, d).cone_bounce(material.gloss, u, v)
            }
            None => mirror(),
        };
        Bounce {
            ray,
            specular: true,
            probability: 1.0 - p,
        }
    } else {
        Bounce {
            ray: info.ray.weighted_bounce(u, v),
            specular: false,
            probability: 1.0 - p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Cube, Plane, Sphere};
    use lumen_core::Material;
    use lumen_math::DVec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn furnace() -> Scene {
        // Closed white diffuse sphere around the origin, lit from a small
        // emitter inside.
        let mut scene = Scene::new();
        scene.add(Sphere::new(DVec3::ZERO, 10.0, Material::diffuse(Color::splat(0.5))));
        scene.add(Sphere::new(
            DVec3::new(0.0, 3.0, 0.0),
            1.0,
            Material::light(Color::ONE, 4.0),
        ));
        scene.add(Sphere::new(
            DVec3::new(-2.0, -1.0, 0.0),
            1.0,
            Material::clear(1.5, 0.0),
        ));
        scene.add(Sphere::new(
            DVec3::new(2.0, -1.0, 0.0),
            1.0,
            Material::metallic(Color::new(0.9, 0.6, 0.2), 0.2, 0.7),
        ));
        scene.compile();
        scene
    }

    #[test]
    fn test_miss_returns_background() {
        let scene = Scene::new().with_background(Color::new(0.2, 0.3, 0.4));
        let sampler = PathSampler::default();
        let mut rng = StdRng::seed_from_u64(1);
        let c = sampler.sample(&scene, &Ray::new(DVec3::ZERO, DVec3::Z), &mut rng);
        assert_eq!(c, Color::new(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_direct_view_of_light() {
        let mut scene = Scene::new();
        scene.add(Sphere::new(DVec3::ZERO, 1.0, Material::light(Color::ONE, 2.0)));
        scene.compile();
        let sampler = PathSampler::new(SamplerConfig {
            first_hit_samples: 9,
            max_bounces: 0,
            ..SamplerConfig::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);
        let c = sampler.sample(&scene, &ray, &mut rng);
        // Emission counted once regardless of first-hit samples
        assert!((c - Color::splat(2.0)).length() < 1e-9);
    }

    #[test]
    fn test_radiance_is_never_negative() {
        let scene = furnace();
        let configs = [
            SamplerConfig::default(),
            SamplerConfig {
                first_hit_samples: 4,
                specular_mode: SpecularMode::All,
                light_mode: LightMode::All,
                ..SamplerConfig::default()
            },
            SamplerConfig {
                direct_lighting: false,
                soft_shadows: false,
                specular_mode: SpecularMode::First,
                russian_roulette: Some(RussianRoulette::default()),
                max_bounces: 8,
                ..SamplerConfig::default()
            },
        ];
        let mut rng = StdRng::seed_from_u64(42);
        for config in configs {
            let sampler = PathSampler::new(config).unwrap();
            for _ in 0..200 {
                let ray = Ray::new(DVec3::new(0.0, 0.0, 8.0), random_unit_vector(&mut rng));
                let c = sampler.sample(&scene, &ray, &mut rng);
                assert!(c.min_element() >= 0.0, "negative radiance {:?}", c);
                assert!(c.is_finite());
            }
        }
    }

    #[test]
    fn test_direct_lighting_on_floor() {
        let mut scene = Scene::new();
        scene.add(Plane::new(DVec3::ZERO, DVec3::Y, Material::diffuse(Color::ONE)));
        scene.add(Sphere::new(
            DVec3::new(0.0, 4.0, 0.0),
            1.0,
            Material::light(Color::ONE, 1.0),
        ));
        scene.compile();
        let sampler = PathSampler::new(SamplerConfig {
            max_bounces: 0,
            soft_shadows: false,
            ..SamplerConfig::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let ray = Ray::new(DVec3::new(0.0, 2.0, 2.0), DVec3::new(0.0, -1.0, -1.0).normalize());
        let c = sampler.sample(&scene, &ray, &mut rng);
        // Straight below the light: cos = 1, coverage = 1 / (16 - 1)
        assert!((c.x - 1.0 / 15.0).abs() < 1e-6, "{:?}", c);
    }

    #[test]
    fn test_floor_under_panel_light() {
        let mut scene = Scene::new();
        scene.add(Plane::new(DVec3::ZERO, DVec3::Y, Material::diffuse(Color::ONE)));
        scene.add(Cube::new(
            DVec3::new(-2.0, 0.5, -2.0),
            DVec3::new(2.0, 0.6, 2.0),
            Material::light(Color::ONE, 1.0),
        ));
        scene.compile();
        let sampler = PathSampler::new(SamplerConfig {
            max_bounces: 0,
            soft_shadows: false,
            ..SamplerConfig::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        // Low grazing ray that reaches the floor at the origin, below the panel
        let ray = Ray::new(DVec3::new(0.0, 0.3, 3.0), DVec3::new(0.0, -0.3, -3.0).normalize());
        let c = sampler.sample(&scene, &ray, &mut rng);
        // The floor point sits inside the panel's bounding sphere: full coverage
        assert!((c - Color::ONE).length() < 1e-6, "{:?}", c);
    }

    #[test]
    fn test_occluded_light() {
        let mut scene = Scene::new();
        scene.add(Plane::new(DVec3::ZERO, DVec3::Y, Material::diffuse(Color::ONE)));
        scene.add(Sphere::new(
            DVec3::new(0.0, 4.0, 0.0),
            1.0,
            Material::light(Color::ONE, 1.0),
        ));
        scene.add(Sphere::new(
            DVec3::new(0.0, 2.0, 0.0),
            0.5,
            Material::diffuse(Color::ONE),
        ));
        scene.compile();
        let sampler = PathSampler::new(SamplerConfig {
            max_bounces: 0,
            soft_shadows: false,
            ..SamplerConfig::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let ray = Ray::new(DVec3::new(0.0, 2.0, 2.0), DVec3::new(0.0, -1.0, -1.0).normalize());
        assert_eq!(sampler.sample(&scene, &ray, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_total_internal_reflection_stays_finite() {
        let info = HitInfo {
            position: DVec3::ZERO,
            normal: DVec3::Y,
            ray: Ray::new(DVec3::ZERO, DVec3::Y),
            material: Material {
                reflectivity: 0.0,
                ..Material::clear(1.5, 0.0)
            },
            inside: true,
        };
        let incident = Ray::new(
            DVec3::new(-1.0, 0.2, 0.0),
            DVec3::new(1.0, -0.2, 0.0).normalize(),
        );
        let mut rng = StdRng::seed_from_u64(5);
        let b = bounce(&incident, &info, 0.3, 0.6, BounceMode::Any, &mut rng);
        assert!(b.specular);
        assert!(b.ray.direction.is_finite());
        assert!(b.ray.direction.y > 0.0);
    }

    #[test]
    fn test_config_validation() {
        let bad = SamplerConfig {
            first_hit_samples: 0,
            ..SamplerConfig::default()
        };
        assert!(PathSampler::new(bad).is_err());
        let bad = SamplerConfig {
            russian_roulette: Some(RussianRoulette {
                start_depth: 1,
                min_probability: 0.0,
            }),
            ..SamplerConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
