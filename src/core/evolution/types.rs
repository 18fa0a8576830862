use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::registry::{EnumCatalog, ParamAxis, TypeProfile};
use crate::config::ProviderInfo;

// ParamSet: one six-axis parameter set proposed for a candidate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSet {
    /// Mood axis.
    pub vibe: String,
    pub era: String,
    pub density_profile: String,
    pub elevation_profile: String,
    pub radius_profile: String,
    pub color_strategy: String,
}

impl ParamSet {
    pub fn get(&self, axis: ParamAxis) -> &str {
        match axis {
            ParamAxis::Vibe => &self.vibe,
            ParamAxis::Era => &self.era,
            ParamAxis::DensityProfile => &self.density_profile,
            ParamAxis::ElevationProfile => &self.elevation_profile,
            ParamAxis::RadiusProfile => &self.radius_profile,
            ParamAxis::ColorStrategy => &self.color_strategy,
        }
    }

    /// Dedup key: all six values in axis order.
    pub fn signature(&self) -> String {
        ParamAxis::ALL
            .iter()
            .map(|axis| self.get(*axis))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// `vibe/era`.
    pub fn visual_family_id(&self) -> String {
        format!("{}/{}", self.vibe, self.era)
    }
}

// EvolutionMode: explore the whole space or exploit focus families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EvolutionMode {
    #[default]
    Exploration,
    Exploitation,
}

/// Caller-supplied diversity knobs; unset fields fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityRuleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_min_each: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era_max_repeat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe_min_distinct: Option<u32>,
}

/// Fully resolved diversity rules for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityRules {
    pub density_min_each: u32,
    pub era_max_repeat: u32,
    pub vibe_min_distinct: u32,
}

impl Default for DiversityRules {
    fn default() -> Self {
        Self {
            density_min_each: 1,
            era_max_repeat: 2,
            vibe_min_distinct: 5,
        }
    }
}

impl DiversityRules {
    pub fn as_overrides(self) -> DiversityRuleOverrides {
        DiversityRuleOverrides {
            density_min_each: Some(self.density_min_each),
            era_max_repeat: Some(self.era_max_repeat),
            vibe_min_distinct: Some(self.vibe_min_distinct),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_set_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants_per_family: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<EvolutionMode>,
    #[serde(default)]
    pub focus_families: Vec<String>,
    #[serde(default)]
    pub diversity_rules: DiversityRuleOverrides,
    /// `"mock"` forces the local generator for this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(default, alias = "useLLMAesthetic")]
    pub use_llm_aesthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionJob {
    pub job_id: String,
    pub base_theme_id: String,
    pub target_ui_id: String,
    pub config: GenerationConfig,
}

// ── Design DNA ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProfiles {
    pub type_profile: TypeProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub hue_shift: f64,
    pub saturation_scale: f64,
    pub lightness_bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub scale: f64,
    pub weight_bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surfaces {
    pub radius_scale: f64,
    pub radius_base: u32,
    pub shadow_depth: u32,
    pub shadow_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    pub scale: f64,
    pub density: f64,
}

/// Continuous style coefficients derived from a [`ParamSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDna {
    pub params: ParamSet,
    pub resolved_profiles: ResolvedProfiles,
    pub palette: Palette,
    pub typography: Typography,
    pub surfaces: Surfaces,
    pub spacing: Spacing,
}

/// Flat `--token-name → value` overrides.
pub type TokenPatch = BTreeMap<String, f64>;

// ── Scores ───────────────────────────────────────────────────────

pub const READABILITY_WEIGHT: f64 = 0.25;
pub const LAYOUT_SAFETY_WEIGHT: f64 = 0.20;
pub const BRAND_CONSISTENCY_WEIGHT: f64 = 0.20;
pub const AESTHETICS_WEIGHT: f64 = 0.25;

/// Component scores plus the aggregate.
///
/// `score` is always re-derived from the components through
/// [`CandidateScores::aggregate`]; every stage returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScores {
    pub readability: f64,
    pub layout_safety: f64,
    pub brand_consistency: f64,
    pub aesthetics: f64,
    pub diversity_bonus: f64,
    /// Flat bonus for focus families in exploitation mode.
    #[serde(default)]
    pub focus_boost: f64,
    pub score: f64,
}

impl CandidateScores {
    pub fn from_components(
        readability: f64,
        layout_safety: f64,
        brand_consistency: f64,
        aesthetics: f64,
    ) -> Self {
        let mut scores = Self {
            readability,
            layout_safety,
            brand_consistency,
            aesthetics,
            diversity_bonus: 0.0,
            focus_boost: 0.0,
            score: 0.0,
        };
        scores.score = scores.aggregate();
        scores
    }

    /// Weighted sum of the four quality components.
    pub fn weighted(&self) -> f64 {
        self.readability * READABILITY_WEIGHT
            + self.layout_safety * LAYOUT_SAFETY_WEIGHT
            + self.brand_consistency * BRAND_CONSISTENCY_WEIGHT
            + self.aesthetics * AESTHETICS_WEIGHT
    }

    pub fn aggregate(&self) -> f64 {
        (self.weighted() + self.diversity_bonus + self.focus_boost).clamp(0.0, 1.0)
    }

    pub fn with_diversity_bonus(&self, diversity_bonus: f64) -> Self {
        let mut next = Self {
            diversity_bonus,
            ..self.clone()
        };
        next.score = next.aggregate();
        next
    }

    pub fn with_focus_boost(&self, focus_boost: f64) -> Self {
        let mut next = Self {
            focus_boost,
            ..self.clone()
        };
        next.score = next.aggregate();
        next
    }

    pub fn with_aesthetics(&self, aesthetics: f64) -> Self {
        let mut next = Self {
            aesthetics: aesthetics.clamp(0.0, 1.0),
            ..self.clone()
        };
        next.score = next.aggregate();
        next
    }
}

// ── Candidates ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: String,
    pub mood: String,
    pub domain: String,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPaths {
    pub screenshot: String,
    pub qa_report: String,
}

/// Judge annotation attached after re-scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AestheticAnnotation {
    pub provider: String,
    pub reason: Option<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub candidate_id: String,
    pub generation: u32,
    pub params: ParamSet,
    pub visual_family_id: String,
    pub genre: Genre,
    #[serde(rename = "designDNA")]
    pub design_dna: DesignDna,
    pub token_patch: TokenPatch,
    pub scores: CandidateScores,
    pub artifact_paths: ArtifactPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_aesthetic: Option<AestheticAnnotation>,
}

impl Candidate {
    pub fn with_scores(&self, scores: CandidateScores) -> Self {
        Self {
            scores,
            ..self.clone()
        }
    }

    pub fn with_rank(&self, rank: u32) -> Self {
        Self {
            rank: Some(rank),
            ..self.clone()
        }
    }
}

// ── Results ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamValidation {
    pub repaired: bool,
    pub attempts: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyBoardEntry {
    pub family_id: String,
    pub label: String,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamGeneration {
    pub count: usize,
    pub mode: EvolutionMode,
    pub enums: EnumCatalog,
    pub diversity_rules: DiversityRules,
    pub validation: ParamValidation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionResult {
    pub total_candidates: usize,
    pub top_candidates: Vec<Candidate>,
    pub all_candidates: Vec<Candidate>,
    pub genre_board: Vec<FamilyBoardEntry>,
    pub llm: ProviderInfo,
    pub param_generation: ParamGeneration,
}
