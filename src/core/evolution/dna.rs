use anyhow::{Context, Result};
use rand::Rng;

use super::registry::{
    TypeProfile, color_preset, density_preset, elevation_preset, radius_preset,
};
use super::rng::uniform;
use super::types::{
    DesignDna, Palette, ParamSet, ResolvedProfiles, Spacing, Surfaces, TokenPatch, Typography,
};

/// Type profile applied to every candidate. The parameter set has no
/// typography axis, so this is not derived from it.
pub const DEFAULT_TYPE_PROFILE: TypeProfile = TypeProfile::Humanist;

/// Map a validated parameter set to design DNA, jittering six coefficients
/// within their documented ranges.
pub fn build_design_dna<R: Rng + ?Sized>(params: &ParamSet, rng: &mut R) -> Result<DesignDna> {
    let density = density_preset(&params.density_profile)
        .with_context(|| format!("unknown densityProfile: {}", params.density_profile))?;
    let elevation = elevation_preset(&params.elevation_profile)
        .with_context(|| format!("unknown elevationProfile: {}", params.elevation_profile))?;
    let radius = radius_preset(&params.radius_profile)
        .with_context(|| format!("unknown radiusProfile: {}", params.radius_profile))?;
    let color = color_preset(&params.color_strategy)
        .with_context(|| format!("unknown colorStrategy: {}", params.color_strategy))?;
    let type_profile = DEFAULT_TYPE_PROFILE;
    let typography = type_profile.preset();

    let hue_shift = (color.hue_shift + uniform(rng, -3.0, 3.0)).clamp(-30.0, 30.0);
    let saturation_scale =
        (color.saturation_scale + uniform(rng, -0.05, 0.05)).clamp(0.75, 1.35);
    let lightness_bias = (color.lightness_bias + uniform(rng, -0.02, 0.02)).clamp(-0.12, 0.12);
    let type_scale = (typography.type_scale + uniform(rng, -0.03, 0.03)).clamp(0.85, 1.35);
    let spacing_scale = (density.spacing_scale + uniform(rng, -0.03, 0.03)).clamp(0.8, 1.35);
    let radius_scale = (radius.radius_scale + uniform(rng, -0.05, 0.05)).clamp(0.65, 1.7);

    Ok(DesignDna {
        params: params.clone(),
        resolved_profiles: ResolvedProfiles { type_profile },
        palette: Palette {
            hue_shift,
            saturation_scale,
            lightness_bias,
        },
        typography: Typography {
            scale: type_scale,
            weight_bias: typography.weight_bias,
        },
        surfaces: Surfaces {
            radius_scale,
            radius_base: radius.radius_base,
            shadow_depth: elevation.shadow_depth,
            shadow_opacity: elevation.shadow_opacity,
        },
        spacing: Spacing {
            scale: spacing_scale,
            density: density.density,
        },
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Flatten design DNA into CSS custom-property overrides.
pub fn token_patch(dna: &DesignDna) -> TokenPatch {
    [
        ("--hue-shift", round_to(dna.palette.hue_shift, 2)),
        ("--sat-scale", round_to(dna.palette.saturation_scale, 3)),
        ("--lightness-bias", round_to(dna.palette.lightness_bias, 3)),
        ("--type-scale", round_to(dna.typography.scale, 3)),
        ("--weight-bias", dna.typography.weight_bias.round()),
        ("--radius-scale", round_to(dna.surfaces.radius_scale, 3)),
        ("--radius-base", f64::from(dna.surfaces.radius_base)),
        ("--shadow-depth", f64::from(dna.surfaces.shadow_depth)),
        ("--shadow-opacity", round_to(dna.surfaces.shadow_opacity, 2)),
        ("--spacing-scale", round_to(dna.spacing.scale, 3)),
        ("--density", round_to(dna.spacing.density, 3)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}
