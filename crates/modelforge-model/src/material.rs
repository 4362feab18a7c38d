//! Canonical surface material
//!
//! Both source formats map onto the same description: a lambertian
//! term, a glossy term, transmission, emission, and an optional bump
//! map. Materials are immutable once built and shared between meshes
//! through `Arc`, so material identity is pointer identity.

use modelforge_core::math::Vec3;
use modelforge_parsers::mtl::MtlMaterial;
use modelforge_parsers::tds::TdsMaterial;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the alpha channel should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlphaHint {
    /// Decide from the material's own values
    #[default]
    Detect,
    /// Alpha is known to be exactly 1
    One,
    /// Alpha is 0 or 1, never fractional
    Binary,
    /// Fractional alpha blending
    Blend,
}

/// Specular response shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Glossiness {
    /// Phong-style exponent lobe
    Exponent(f32),
    /// Perfect mirror
    Mirror,
}

/// Bump map reference with its height scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumpSpec {
    /// Height map path
    pub filename: String,
    /// Height bias
    pub bias: f32,
    /// Height scale
    pub scale: f32,
}

/// A color channel with an optional texture
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Channel {
    /// Constant factor
    pub color: Vec3,
    /// Texture path, if any
    pub texture: Option<String>,
}

impl Channel {
    fn constant(color: Vec3) -> Self {
        Self { color, texture: None }
    }

    /// True when the channel contributes nothing
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.color.is_zero() && self.texture.is_none()
    }
}

/// Canonical material description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Material name; unique within a model's material table
    pub name: String,
    /// Diffuse reflectance
    pub lambertian: Channel,
    /// Alpha for the lambertian term
    pub alpha: f32,
    /// Alpha map path, if any
    pub alpha_map: Option<String>,
    /// Specular reflectance
    pub glossy: Channel,
    /// Shape of the specular lobe
    pub glossiness: Glossiness,
    /// Transmitted light
    pub transmissive: Channel,
    /// Index of refraction for transmission
    pub eta: f32,
    /// Emitted light
    pub emissive: Channel,
    /// Bump map, if any
    pub bump: Option<BumpSpec>,
    /// Precomputed light map path, if any
    pub light_map: Option<String>,
    /// Alpha interpretation
    pub alpha_hint: AlphaHint,
}

static DEFAULT: Lazy<Arc<Material>> = Lazy::new(|| Arc::new(Material::gray("default")));

impl Material {
    /// The shared default material
    #[must_use]
    pub fn default_shared() -> Arc<Self> {
        DEFAULT.clone()
    }

    /// A neutral gray material
    #[must_use]
    pub fn gray(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lambertian: Channel::constant(Vec3::splat(0.7)),
            alpha: 1.0,
            alpha_map: None,
            glossy: Channel::constant(Vec3::splat(0.2)),
            glossiness: Glossiness::Exponent(100.0),
            transmissive: Channel::default(),
            eta: 1.0,
            emissive: Channel::default(),
            bump: None,
            light_map: None,
            alpha_hint: AlphaHint::One,
        }
    }

    /// Conservative opacity test used by the mesh merger: true only
    /// when no light can pass through any texel.
    #[must_use]
    pub fn is_fully_opaque(&self) -> bool {
        if self.transmissive.color.max_component() > 0.0 || self.transmissive.texture.is_some() {
            return false;
        }
        match self.alpha_hint {
            AlphaHint::One | AlphaHint::Binary => true,
            AlphaHint::Blend => false,
            AlphaHint::Detect => self.alpha >= 1.0 && self.alpha_map.is_none(),
        }
    }

    /// True when any term lets light through or below the surface
    #[must_use]
    pub fn has_partial_coverage(&self) -> bool {
        self.alpha < 1.0
            || self.alpha_map.is_some()
            || self.transmissive.color.max_component() > 0.0
            || self.transmissive.texture.is_some()
    }

    /// Build from a 3DS material definition. Transparency scales the
    /// reflected terms down and feeds the transmissive term.
    #[must_use]
    pub fn from_tds(m: &TdsMaterial) -> Self {
        let opacity = 1.0 - m.transparency;

        let lambertian = Channel {
            color: m.diffuse * m.texture1.pct * opacity,
            texture: m.texture1.filename.clone(),
        };

        let strength = (m.specular * m.shininess_strength).max(&Vec3::splat(m.reflection));
        let glossiness = if m.reflection > 0.05 {
            Glossiness::Mirror
        } else {
            Glossiness::Exponent(m.shininess * 1024.0)
        };

        let bump = m.bump_map.filename.as_ref().map(|filename| BumpSpec {
            filename: filename.clone(),
            bias: 0.0,
            scale: m.bump_map.pct,
        });

        Self {
            name: m.name.clone(),
            lambertian,
            alpha: 1.0,
            alpha_map: None,
            glossy: Channel::constant(strength * opacity),
            glossiness,
            transmissive: Channel::constant(Vec3::splat(m.transparency)),
            eta: 1.0,
            emissive: Channel::constant(Vec3::splat(m.emissive)),
            bump,
            light_map: None,
            alpha_hint: AlphaHint::Detect,
        }
    }

    /// Build from a Wavefront MTL material. The illumination model
    /// selects mirror vs. exponent gloss and whether transmission and
    /// refraction apply.
    #[must_use]
    pub fn from_mtl(m: &MtlMaterial) -> Self {
        let mirror = matches!(m.illum, 3..=7);
        let transmits = matches!(m.illum, 4 | 6 | 7 | 9);

        let glossiness = if mirror {
            Glossiness::Mirror
        } else {
            Glossiness::Exponent(m.ns * m.ns)
        };

        let transmissive = if transmits {
            Channel::constant(Vec3::ONE - m.tf)
        } else {
            Channel::default()
        };
        let eta = if transmits { m.ni } else { 1.0 };

        // A zero constant with a map present would mask the map out
        let emissive_color = if m.ke.map.is_some() && m.ke.constant.is_zero() {
            Vec3::ONE
        } else {
            m.ke.constant
        };

        let bump = m.bump.map.as_ref().map(|filename| BumpSpec {
            filename: filename.clone(),
            bias: m.bump.mm.x,
            scale: m.bump.mm.y * 0.001,
        });

        Self {
            name: m.name.clone(),
            lambertian: Channel {
                color: m.kd.constant,
                texture: m.kd.map.clone(),
            },
            alpha: m.d,
            alpha_map: m.map_d.clone(),
            glossy: Channel {
                color: m.ks.constant,
                texture: m.ks.map.clone(),
            },
            glossiness,
            transmissive,
            eta,
            emissive: Channel {
                color: emissive_color,
                texture: m.ke.map.clone(),
            },
            bump,
            light_map: m.light_map.clone(),
            alpha_hint: AlphaHint::Detect,
        }
    }
}
