//! Surface materials and the enumerated BRDF identifiers.

use std::fmt;
use std::str::FromStr;

use lumen_math::Color;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::texture::TextureId;

/// Which reflectance model a material uses.
///
/// The renderer maps each kind to one shared, stateless BRDF; per-surface
/// parameters (albedo, roughness, ior) come from the [`Material`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrdfKind {
    /// Ideal diffuse reflection
    #[default]
    Lambert,
    /// Normalized Phong lobe around the mirror direction
    Phong,
    /// Phong coat over a Lambertian base, mixed by dielectric Fresnel
    LayeredPhong,
    /// GGX microfacet reflection with dielectric Fresnel
    Gtr2,
    /// GGX coat over a Lambertian base
    LayeredGtr2,
}

impl BrdfKind {
    pub const ALL: [BrdfKind; 5] = [
        BrdfKind::Lambert,
        BrdfKind::Phong,
        BrdfKind::LayeredPhong,
        BrdfKind::Gtr2,
        BrdfKind::LayeredGtr2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BrdfKind::Lambert => "lambert",
            BrdfKind::Phong => "phong",
            BrdfKind::LayeredPhong => "layered-phong",
            BrdfKind::Gtr2 => "gtr2",
            BrdfKind::LayeredGtr2 => "layered-gtr2",
        }
    }
}

impl fmt::Display for BrdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrdfKind {
    type Err = SceneError;

    /// Parse a BRDF name; `default` is an alias for `lambert` and `ggx` for `gtr2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(BrdfKind::Lambert),
            "ggx" => Ok(BrdfKind::Gtr2),
            "layered-ggx" => Ok(BrdfKind::LayeredGtr2),
            _ => BrdfKind::ALL
                .into_iter()
                .find(|kind| kind.name() == s)
                .ok_or_else(|| SceneError::UnknownBrdf(s.to_string())),
        }
    }
}

/// A surface description shared by all triangles that reference it.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (diagnostics only)
    pub name: String,

    /// Diffuse/base reflectance (linear RGB, 0-1)
    pub albedo: Color,

    /// Emitted radiance; non-zero turns every triangle of the material into a light
    pub emissive: Color,

    /// Albedo texture, overrides `albedo` where present
    pub albedo_texture: Option<TextureId>,

    /// Index of refraction used by the Fresnel term of layered and microfacet models
    pub ior: f32,

    /// Roughness in (0, 1]
    pub roughness: f32,

    /// Reflectance model
    pub brdf: BrdfKind,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Color::splat(0.5),
            emissive: Color::ZERO,
            albedo_texture: None,
            ior: 1.3,
            roughness: 0.1,
            brdf: BrdfKind::Lambert,
        }
    }
}

impl Material {
    /// Create a new material with just a name and albedo.
    pub fn new(name: impl Into<String>, albedo: Color) -> Self {
        Self {
            name: name.into(),
            albedo,
            ..Default::default()
        }
    }

    /// Create a black emitter.
    pub fn emitter(name: impl Into<String>, emissive: Color) -> Self {
        Self::new(name, Color::ZERO).with_emissive(emissive)
    }

    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_brdf(mut self, brdf: BrdfKind) -> Self {
        self.brdf = brdf;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    pub fn with_albedo_texture(mut self, texture: TextureId) -> Self {
        self.albedo_texture = Some(texture);
        self
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emissive != Color::ZERO
    }
}
