//! Closed value lists for every parameter axis and the numeric presets
//! derived from them. Everything here is `'static` data; there is nothing to
//! initialise or tear down.

use serde::{Deserialize, Serialize};
use strum::Display;

pub const VIBES: &[&str] = &[
    "calm",
    "bold",
    "playful",
    "premium",
    "industrial",
    "minimal",
    "editorial",
];
pub const ERAS: &[&str] = &["modern", "y2k", "retro", "neo-brutalist", "swiss", "bauhaus"];
pub const DENSITY_PROFILES: &[&str] = &["compact", "comfortable", "airy"];
pub const ELEVATION_PROFILES: &[&str] = &["flat", "soft", "crisp", "dramatic"];
pub const RADIUS_PROFILES: &[&str] = &["sharp", "rounded", "pill"];
pub const COLOR_STRATEGIES: &[&str] = &[
    "monoAccent",
    "dualAccent",
    "pastel",
    "highContrast",
    "earthTone",
    "neon",
];

// ParamAxis: one of the six enumerated dimensions of a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ParamAxis {
    Vibe,
    Era,
    DensityProfile,
    ElevationProfile,
    RadiusProfile,
    ColorStrategy,
}

impl ParamAxis {
    /// Axes in signature order.
    pub const ALL: [ParamAxis; 6] = [
        ParamAxis::Vibe,
        ParamAxis::Era,
        ParamAxis::DensityProfile,
        ParamAxis::ElevationProfile,
        ParamAxis::RadiusProfile,
        ParamAxis::ColorStrategy,
    ];

    pub fn values(self) -> &'static [&'static str] {
        match self {
            Self::Vibe => VIBES,
            Self::Era => ERAS,
            Self::DensityProfile => DENSITY_PROFILES,
            Self::ElevationProfile => ELEVATION_PROFILES,
            Self::RadiusProfile => RADIUS_PROFILES,
            Self::ColorStrategy => COLOR_STRATEGIES,
        }
    }

    pub fn contains(self, value: &str) -> bool {
        self.values().contains(&value)
    }
}

/// Serializable view of the registry, in axis order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumCatalog {
    pub vibe: &'static [&'static str],
    pub era: &'static [&'static str],
    pub density_profile: &'static [&'static str],
    pub elevation_profile: &'static [&'static str],
    pub radius_profile: &'static [&'static str],
    pub color_strategy: &'static [&'static str],
}

pub const ENUM_CATALOG: EnumCatalog = EnumCatalog {
    vibe: VIBES,
    era: ERAS,
    density_profile: DENSITY_PROFILES,
    elevation_profile: ELEVATION_PROFILES,
    radius_profile: RADIUS_PROFILES,
    color_strategy: COLOR_STRATEGIES,
};

impl EnumCatalog {
    /// Compact form used in prompts: `"vibe: [calm, bold, ...]; era: [...]"`.
    pub fn describe(&self) -> String {
        ParamAxis::ALL
            .iter()
            .map(|axis| format!("{axis}: [{}]", axis.values().join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Presets ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityPreset {
    pub density: f64,
    pub spacing_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationPreset {
    pub shadow_depth: u32,
    pub shadow_opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPreset {
    pub radius_scale: f64,
    pub radius_base: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypePreset {
    pub type_scale: f64,
    pub weight_bias: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPreset {
    pub hue_shift: f64,
    pub saturation_scale: f64,
    pub lightness_bias: f64,
}

pub fn density_preset(value: &str) -> Option<DensityPreset> {
    let (density, spacing_scale) = match value {
        "compact" => (0.95, 0.88),
        "comfortable" => (0.82, 1.0),
        "airy" => (0.68, 1.12),
        _ => return None,
    };
    Some(DensityPreset {
        density,
        spacing_scale,
    })
}

pub fn elevation_preset(value: &str) -> Option<ElevationPreset> {
    let (shadow_depth, shadow_opacity) = match value {
        "flat" => (0, 0.0),
        "soft" => (2, 0.12),
        "crisp" => (3, 0.18),
        "dramatic" => (4, 0.24),
        _ => return None,
    };
    Some(ElevationPreset {
        shadow_depth,
        shadow_opacity,
    })
}

pub fn radius_preset(value: &str) -> Option<RadiusPreset> {
    let (radius_scale, radius_base) = match value {
        "sharp" => (0.75, 4),
        "rounded" => (1.0, 10),
        "pill" => (1.35, 16),
        _ => return None,
    };
    Some(RadiusPreset {
        radius_scale,
        radius_base,
    })
}

pub fn color_preset(value: &str) -> Option<ColorPreset> {
    let (hue_shift, saturation_scale, lightness_bias) = match value {
        "monoAccent" => (8.0, 1.0, 0.0),
        "dualAccent" => (20.0, 1.1, 0.0),
        "pastel" => (-8.0, 0.82, 0.08),
        "highContrast" => (0.0, 1.2, -0.04),
        "earthTone" => (-18.0, 0.9, -0.02),
        "neon" => (28.0, 1.28, 0.02),
        _ => return None,
    };
    Some(ColorPreset {
        hue_shift,
        saturation_scale,
        lightness_bias,
    })
}

// TypeProfile: typography family presets (not an axis of the parameter set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TypeProfile {
    NeoGrotesk,
    Humanist,
    Geometric,
    SerifEditorial,
    MonoAccent,
}

impl TypeProfile {
    pub fn preset(self) -> TypePreset {
        let (type_scale, weight_bias) = match self {
            Self::NeoGrotesk => (1.0, 40.0),
            Self::Humanist => (1.02, 0.0),
            Self::Geometric => (1.03, 20.0),
            Self::SerifEditorial => (1.05, -10.0),
            Self::MonoAccent => (0.98, 70.0),
        };
        TypePreset {
            type_scale,
            weight_bias,
        }
    }
}
