//! Surface materials.
//!
//! A [`Material`] is a plain value: shapes hand out references to theirs,
//! and a hit resolves a copy with its texture lookups applied.

use std::sync::Arc;

use lumen_math::{Color, DVec2};

use crate::texture::Texture;

/// Surface response parameters for the path tracer.
#[derive(Clone, Debug)]
pub struct Material {
    /// Base color (RGB, linear)
    pub color: Color,

    /// Replaces `color` when present
    pub texture: Option<Arc<dyn Texture>>,

    /// Tangent-space normal map
    pub normal_texture: Option<Arc<dyn Texture>>,

    /// Height map perturbing the shading normal
    pub bump_texture: Option<Arc<dyn Texture>>,

    /// Replaces `gloss` with the channel average when present
    pub gloss_texture: Option<Arc<dyn Texture>>,

    /// Strength of the bump map
    pub bump_multiplier: f64,

    /// Emitted radiance scale; anything above zero makes this a light
    pub emittance: f64,

    /// Refractive index
    pub index: f64,

    /// Cone half-angle (radians) for glossy reflection and refraction
    pub gloss: f64,

    /// How much specular bounces are tinted by `color` (0..1)
    pub tint: f64,

    /// Fixed reflection probability, or -1 to use Fresnel reflectance
    pub reflectivity: f64,

    /// Whether non-reflected light refracts through the surface
    pub transparent: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::ONE)
    }
}

impl Material {
    fn base(color: Color) -> Self {
        Self {
            color,
            texture: None,
            normal_texture: None,
            bump_texture: None,
            gloss_texture: None,
            bump_multiplier: 1.0,
            emittance: 0.0,
            index: 1.0,
            gloss: 0.0,
            tint: 0.0,
            reflectivity: -1.0,
            transparent: false,
        }
    }

    /// Lambertian surface.
    pub fn diffuse(color: Color) -> Self {
        Self::base(color)
    }

    /// Diffuse base under a sharp dielectric coat.
    pub fn specular(color: Color, index: f64) -> Self {
        Self {
            index,
            ..Self::base(color)
        }
    }

    /// Diffuse base under a blurry dielectric coat.
    pub fn glossy(color: Color, index: f64, gloss: f64) -> Self {
        Self {
            index,
            gloss,
            ..Self::base(color)
        }
    }

    /// Colorless glass.
    pub fn clear(index: f64, gloss: f64) -> Self {
        Self {
            index,
            gloss,
            transparent: true,
            ..Self::base(Color::ZERO)
        }
    }

    /// Colored glass.
    pub fn transparent(color: Color, index: f64, gloss: f64, tint: f64) -> Self {
        Self {
            index,
            gloss,
            tint,
            transparent: true,
            ..Self::base(color)
        }
    }

    /// Always reflects; `tint` colors the reflection.
    pub fn metallic(color: Color, gloss: f64, tint: f64) -> Self {
        Self {
            gloss,
            tint,
            reflectivity: 1.0,
            ..Self::base(color)
        }
    }

    /// Emitter.
    pub fn light(color: Color, emittance: f64) -> Self {
        Self {
            emittance,
            ..Self::base(color)
        }
    }

    pub fn with_texture(mut self, texture: Arc<dyn Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_normal_texture(mut self, texture: Arc<dyn Texture>) -> Self {
        self.normal_texture = Some(texture);
        self
    }

    pub fn with_bump_texture(mut self, texture: Arc<dyn Texture>, multiplier: f64) -> Self {
        self.bump_texture = Some(texture);
        self.bump_multiplier = multiplier;
        self
    }

    pub fn with_gloss_texture(mut self, texture: Arc<dyn Texture>) -> Self {
        self.gloss_texture = Some(texture);
        self
    }

    pub fn with_emittance(mut self, emittance: f64) -> Self {
        self.emittance = emittance;
        self
    }

    pub fn with_tint(mut self, tint: f64) -> Self {
        self.tint = tint;
        self
    }

    pub fn is_emissive(&self) -> bool {
        self.emittance > 0.0
    }

    /// Copy of this material with color and gloss textures applied at the
    /// surface coordinates produced by `uv`. `uv` is only evaluated when a
    /// texture needs it.
    pub fn resolve(&self, uv: impl FnOnce() -> DVec2) -> Material {
        let mut material = self.clone();
        if self.texture.is_none() && self.gloss_texture.is_none() {
            return material;
        }
        let uv = uv();
        if let Some(texture) = &self.texture {
            material.color = texture.sample(uv.x, uv.y);
        }
        if let Some(texture) = &self.gloss_texture {
            let c = texture.sample(uv.x, uv.y);
            material.gloss = (c.x + c.y + c.z) / 3.0;
        }
        material
    }
}
