//! Turns a stream of user interaction events into a generation config.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::registry::{ERAS, VIBES};
use super::types::{DiversityRuleOverrides, DiversityRules, EvolutionMode, GenerationConfig};

pub const DEFAULT_VARIANTS_PER_FAMILY: u32 = 4;
const MAX_DERIVED_FAMILIES: usize = 8;
const MIN_DERIVED_FAMILIES: usize = 3;
const MIN_BROADEN_TARGET: usize = 6;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceEvent {
    /// `like`, `dislike`, `pin`, or anything else; `like` when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl PreferenceEvent {
    pub fn kind_or_default(&self) -> &str {
        self.kind.as_deref().unwrap_or("like")
    }

    fn is_pin(&self) -> bool {
        self.kind.as_deref() == Some("pin")
    }
}

/// `vibe/era` with both halves in the registry, lowercased; `None` otherwise.
pub fn normalize_family_id(raw: &str) -> Option<String> {
    let value = raw.trim().to_lowercase();
    let (vibe, era) = value.split_once('/')?;
    (VIBES.contains(&vibe) && ERAS.contains(&era)).then(|| format!("{vibe}/{era}"))
}

/// First vibe and first era (registry order) mentioned anywhere in `text`.
pub fn parse_family_from_text(text: &str) -> Option<String> {
    let normalized = text.to_lowercase();
    let vibe = VIBES.iter().find(|v| normalized.contains(*v))?;
    let era = ERAS.iter().find(|e| normalized.contains(*e))?;
    Some(format!("{vibe}/{era}"))
}

/// Family ids the events name explicitly, by text, or by pinning; deduplicated
/// in that order.
pub fn seed_families(events: &[PreferenceEvent]) -> Vec<String> {
    let explicit = events
        .iter()
        .filter_map(|e| e.family_id.as_deref().and_then(normalize_family_id));
    let textual = events
        .iter()
        .filter_map(|e| e.value.as_deref().and_then(parse_family_from_text));
    let pinned = events.iter().filter(|e| e.is_pin()).filter_map(|e| {
        e.family_id
            .as_deref()
            .or(e.value.as_deref())
            .and_then(normalize_family_id)
    });

    let mut seen = HashSet::new();
    explicit
        .chain(textual)
        .chain(pinned)
        .filter(|family| seen.insert(family.clone()))
        .collect()
}

/// Grow `seeds` to `target` families: same vibe across eras, then same era
/// across vibes, then a full vibe × era sweep.
pub fn broaden_families(seeds: &[String], target: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(target);
    let mut seen = HashSet::new();
    let mut add = |family: String, out: &mut Vec<String>| {
        if seen.insert(family.clone()) {
            out.push(family);
        }
    };

    for seed in seeds {
        add(seed.clone(), &mut out);
    }

    'seeds: for seed in seeds {
        let Some((vibe, era)) = seed.split_once('/') else {
            continue;
        };
        for near_era in ERAS {
            if out.len() >= target {
                break 'seeds;
            }
            add(format!("{vibe}/{near_era}"), &mut out);
        }
        for near_vibe in VIBES {
            if out.len() >= target {
                break 'seeds;
            }
            add(format!("{near_vibe}/{era}"), &mut out);
        }
    }

    'sweep: for vibe in VIBES {
        for era in ERAS {
            if out.len() >= target {
                break 'sweep;
            }
            add(format!("{vibe}/{era}"), &mut out);
        }
    }

    out.truncate(target);
    out
}

/// Result of translating a preference stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedConfig {
    pub seed_families: Vec<String>,
    pub config: GenerationConfig,
    /// Resolved rules as reported to stream consumers.
    pub diversity_rules: DiversityRules,
}

impl DerivedConfig {
    pub fn mode(&self) -> EvolutionMode {
        self.config.mode.unwrap_or_default()
    }

    pub fn param_set_count(&self) -> u32 {
        self.config.param_set_count.unwrap_or_default()
    }

    pub fn focus_families(&self) -> &[String] {
        &self.config.focus_families
    }
}

/// Merge caller config with what the events imply. Caller values win.
pub fn derive_generation_config(base: &GenerationConfig, events: &[PreferenceEvent]) -> DerivedConfig {
    let seeds = seed_families(events);
    let mut focus_families = if seeds.is_empty() {
        Vec::new()
    } else {
        broaden_families(&seeds, MIN_BROADEN_TARGET.max(seeds.len() * 3))
    };
    if focus_families.is_empty() {
        focus_families = base.focus_families.clone();
    }

    let mode = base.mode.unwrap_or(if focus_families.is_empty() {
        EvolutionMode::Exploration
    } else {
        EvolutionMode::Exploitation
    });

    let derived_families = if focus_families.is_empty() {
        4
    } else {
        focus_families.len()
    }
    .clamp(MIN_DERIVED_FAMILIES, MAX_DERIVED_FAMILIES);
    let family_count = base
        .family_count
        .unwrap_or(0)
        .max(u32::try_from(derived_families).unwrap_or(u32::MAX));
    let variants_per_family = base
        .variants_per_family
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_VARIANTS_PER_FAMILY);
    let throughput = family_count.saturating_mul(variants_per_family);

    let raw = base.diversity_rules;
    let diversity_rules = DiversityRules {
        density_min_each: raw.density_min_each.unwrap_or(1),
        era_max_repeat: raw
            .era_max_repeat
            .unwrap_or_else(|| throughput.div_ceil(6).max(2)),
        vibe_min_distinct: raw.vibe_min_distinct.unwrap_or(match mode {
            EvolutionMode::Exploration => 5,
            EvolutionMode::Exploitation => 3,
        }),
    };

    tracing::debug!(
        seeds = seeds.len(),
        focus = focus_families.len(),
        %mode,
        family_count,
        "derived generation config from preferences"
    );

    DerivedConfig {
        seed_families: seeds,
        config: GenerationConfig {
            param_set_count: Some(base.param_set_count.filter(|c| *c > 0).unwrap_or(throughput)),
            family_count: Some(family_count),
            variants_per_family: Some(variants_per_family),
            mode: Some(mode),
            focus_families,
            diversity_rules: DiversityRuleOverrides {
                density_min_each: Some(diversity_rules.density_min_each),
                era_max_repeat: Some(diversity_rules.era_max_repeat),
                vibe_min_distinct: Some(diversity_rules.vibe_min_distinct),
            },
            llm_provider: base.llm_provider.clone(),
            use_llm_aesthetic: base.use_llm_aesthetic,
        },
        diversity_rules,
    }
}
