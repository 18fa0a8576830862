//! Parameter-set generation: validation against the registry and diversity
//! rules, the bounded proposer repair loop, and the local generator used both
//! in mock mode and as backfill.

use std::collections::HashSet;

use rand::Rng;
use serde_json::Value;

use super::registry::{DENSITY_PROFILES, ENUM_CATALOG, ERAS, ParamAxis, VIBES};
use super::rng::{pick, shuffled};
use super::types::{
    DiversityRuleOverrides, DiversityRules, EvolutionJob, EvolutionMode, GenerationConfig,
    ParamSet, ParamValidation,
};
use crate::core::proposer::{ParamProposer, ProposalRequest, RepairRequest};

/// Initial proposal plus two repairs.
pub const MAX_PROPOSER_ATTEMPTS: u32 = 3;
pub const MIN_REQUESTED_COUNT: u32 = 5;
pub const MAX_REQUESTED_COUNT: u32 = 200;
/// Chance that an exploitation-mode proposal reuses a focus family.
pub const FOCUS_FAMILY_PROBABILITY: f64 = 0.72;

const EXPLORATION_VIBE_FLOOR: u32 = 5;
const EXPLOITATION_VIBE_FLOOR: u32 = 2;

// ── Request normalization ────────────────────────────────────────

/// `familyCount × variantsPerFamily` when both are set, else `paramSetCount`,
/// clamped to the supported range.
pub fn requested_count(config: &GenerationConfig, default_count: u32) -> usize {
    let by_board = config
        .family_count
        .unwrap_or(0)
        .saturating_mul(config.variants_per_family.unwrap_or(0));
    let count = if by_board > 0 {
        by_board
    } else {
        config.param_set_count.filter(|c| *c > 0).unwrap_or(default_count)
    };
    count.clamp(MIN_REQUESTED_COUNT, MAX_REQUESTED_COUNT) as usize
}

pub fn normalized_mode(config: &GenerationConfig) -> EvolutionMode {
    config.mode.unwrap_or_default()
}

/// Trimmed, lowercased, `/`-shaped, deduplicated in first-seen order.
pub fn normalize_focus_families(input: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .iter()
        .map(|family| family.trim().to_lowercase())
        .filter(|family| family.contains('/'))
        .filter(|family| seen.insert(family.clone()))
        .collect()
}

/// Resolve caller overrides into satisfiable rules for a batch of `count`.
/// Applying this to its own output returns the same rules.
pub fn normalize_diversity_rules(
    raw: &DiversityRuleOverrides,
    count: usize,
    mode: EvolutionMode,
) -> DiversityRules {
    let defaults = DiversityRules::default();
    let count_u32 = u32::try_from(count).unwrap_or(u32::MAX);

    let era_spread = count.div_ceil(ERAS.len()).max(2);
    let era_max_repeat = raw
        .era_max_repeat
        .filter(|v| *v > 0)
        .unwrap_or(defaults.era_max_repeat)
        .max(u32::try_from(era_spread).unwrap_or(u32::MAX));

    let density_min_each = if count >= DENSITY_PROFILES.len() {
        raw.density_min_each.unwrap_or(defaults.density_min_each)
    } else {
        0
    };

    let floor = match mode {
        EvolutionMode::Exploration => EXPLORATION_VIBE_FLOOR,
        EvolutionMode::Exploitation => EXPLOITATION_VIBE_FLOOR,
    };
    let cap = u32::try_from(VIBES.len()).unwrap_or(u32::MAX).min(count_u32);
    let vibe_min_distinct = raw
        .vibe_min_distinct
        .unwrap_or(defaults.vibe_min_distinct)
        .max(floor)
        .min(cap);

    DiversityRules {
        density_min_each,
        era_max_repeat,
        vibe_min_distinct,
    }
}

// ── Validation ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSetValidation {
    pub ok: bool,
    pub errors: Vec<String>,
    pub valid_candidates: Vec<ParamSet>,
}

fn coerce_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Accepts `{params: {...}}` or the flat object; `None` for non-objects.
fn normalize_candidate(raw: &Value) -> Option<ParamSet> {
    let record = raw.as_object()?;
    let fields = record
        .get("params")
        .and_then(Value::as_object)
        .unwrap_or(record);

    Some(ParamSet {
        vibe: coerce_field(fields.get("vibe")),
        era: coerce_field(fields.get("era")),
        density_profile: coerce_field(fields.get("densityProfile")),
        elevation_profile: coerce_field(fields.get("elevationProfile")),
        radius_profile: coerce_field(fields.get("radiusProfile")),
        color_strategy: coerce_field(fields.get("colorStrategy")),
    })
}

/// Check untrusted proposer output against the registry, uniqueness, and the
/// batch diversity rules. Every violation is reported; only structurally
/// valid, unique entries are kept.
pub fn validate_param_sets(
    raw: &Value,
    count: usize,
    rules: &DiversityRules,
) -> ParamSetValidation {
    let Some(items) = raw.as_array() else {
        return ParamSetValidation {
            ok: false,
            errors: vec!["candidates must be an array".to_string()],
            valid_candidates: Vec::new(),
        };
    };

    let mut errors = Vec::new();
    if items.len() != count {
        errors.push(format!(
            "candidates must contain exactly {count} items (got {})",
            items.len()
        ));
    }

    let mut valid_candidates = Vec::new();
    let mut signatures = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let Some(params) = normalize_candidate(item) else {
            errors.push(format!("candidate[{index}] must be an object"));
            continue;
        };

        let mut has_local_error = false;
        for axis in ParamAxis::ALL {
            let value = params.get(axis);
            if !axis.contains(value) {
                errors.push(format!("candidate[{index}].{axis} invalid: {value}"));
                has_local_error = true;
            }
        }

        if !signatures.insert(params.signature()) {
            errors.push(format!("candidate[{index}] duplicated params set"));
            has_local_error = true;
        }

        if !has_local_error {
            valid_candidates.push(params);
        }
    }

    if rules.density_min_each > 0 {
        for density in DENSITY_PROFILES {
            let hits = valid_candidates
                .iter()
                .filter(|p| p.density_profile == *density)
                .count();
            if hits < rules.density_min_each as usize {
                errors.push(format!(
                    "densityProfile={density} must appear at least {} times (got {hits})",
                    rules.density_min_each
                ));
            }
        }
    }

    let era_max_repeat = rules.era_max_repeat.max(1);
    for era in ERAS {
        let hits = valid_candidates.iter().filter(|p| p.era == *era).count();
        if hits > era_max_repeat as usize {
            errors.push(format!(
                "era={era} must appear at most {era_max_repeat} times (got {hits})"
            ));
        }
    }

    let vibe_min_distinct = rules.vibe_min_distinct.max(1);
    let distinct_vibes = valid_candidates
        .iter()
        .map(|p| p.vibe.as_str())
        .collect::<HashSet<_>>()
        .len();
    if distinct_vibes < vibe_min_distinct as usize {
        errors.push(format!(
            "vibe must contain at least {vibe_min_distinct} distinct values (got {distinct_vibes})"
        ));
    }

    ParamSetValidation {
        ok: errors.is_empty(),
        errors,
        valid_candidates,
    }
}

// ── Local generator ──────────────────────────────────────────────

fn parse_focus_family(family: &str) -> Option<(&'static str, &'static str)> {
    let (vibe, era) = family.split_once('/')?;
    let vibe = VIBES.iter().find(|v| **v == vibe)?;
    let era = ERAS.iter().find(|e| **e == era)?;
    Some((vibe, era))
}

/// Round-robin over shuffled vibe/era/density pools so coverage rules hold on
/// the first pass; the remaining axes are uniform. Gives up after
/// `count × 100` draws and returns whatever unique sets it found.
pub fn generate_local_param_sets<R: Rng + ?Sized>(
    count: usize,
    rules: &DiversityRules,
    mode: EvolutionMode,
    focus_families: &[String],
    rng: &mut R,
) -> Vec<ParamSet> {
    let density_pool = shuffled(DENSITY_PROFILES, rng);
    let era_pool = shuffled(ERAS, rng);
    let vibe_pool = shuffled(VIBES, rng);
    let family_pool: Vec<(&str, &str)> = focus_families
        .iter()
        .filter_map(|family| parse_focus_family(family))
        .collect();
    let density_rounds = density_pool.len() * (rules.density_min_each.max(1) as usize);

    let mut candidates = Vec::with_capacity(count);
    let mut signatures = HashSet::new();
    let mut attempts = 0;

    while candidates.len() < count && attempts < count * 100 {
        attempts += 1;
        let index = candidates.len();

        let use_focus = mode == EvolutionMode::Exploitation
            && !family_pool.is_empty()
            && rng.random_bool(FOCUS_FAMILY_PROBABILITY);
        let (vibe, era) = if use_focus {
            family_pool[rng.random_range(0..family_pool.len())]
        } else {
            (
                vibe_pool[index % vibe_pool.len()],
                era_pool[index % era_pool.len()],
            )
        };

        let density = if index < density_rounds {
            density_pool[index % density_pool.len()]
        } else {
            pick(DENSITY_PROFILES, rng)
        };

        let proposal = ParamSet {
            vibe: vibe.to_string(),
            era: era.to_string(),
            density_profile: density.to_string(),
            elevation_profile: pick(ParamAxis::ElevationProfile.values(), rng).to_string(),
            radius_profile: pick(ParamAxis::RadiusProfile.values(), rng).to_string(),
            color_strategy: pick(ParamAxis::ColorStrategy.values(), rng).to_string(),
        };

        if signatures.insert(proposal.signature()) {
            candidates.push(proposal);
        }
    }

    candidates
}

/// Every registry combination in axis order; the last-resort backfill source.
fn exhaustive_param_sets() -> impl Iterator<Item = ParamSet> {
    VIBES.iter().flat_map(|vibe| {
        ERAS.iter().flat_map(move |era| {
            DENSITY_PROFILES.iter().flat_map(move |density| {
                ParamAxis::ElevationProfile
                    .values()
                    .iter()
                    .flat_map(move |elevation| {
                        ParamAxis::RadiusProfile.values().iter().flat_map(move |radius| {
                            ParamAxis::ColorStrategy.values().iter().map(move |color| {
                                ParamSet {
                                    vibe: (*vibe).to_string(),
                                    era: (*era).to_string(),
                                    density_profile: (*density).to_string(),
                                    elevation_profile: (*elevation).to_string(),
                                    radius_profile: (*radius).to_string(),
                                    color_strategy: (*color).to_string(),
                                }
                            })
                        })
                    })
            })
        })
    })
}

/// Top `valid` up to exactly `count` unique sets without calling the proposer.
pub fn backfill_param_sets<R: Rng + ?Sized>(
    valid: Vec<ParamSet>,
    count: usize,
    rules: &DiversityRules,
    mode: EvolutionMode,
    focus_families: &[String],
    rng: &mut R,
) -> Vec<ParamSet> {
    let mut signatures = HashSet::new();
    let mut merged: Vec<ParamSet> = valid
        .into_iter()
        .filter(|params| signatures.insert(params.signature()))
        .take(count)
        .collect();

    let pool = generate_local_param_sets(count * 2, rules, mode, focus_families, rng);
    for params in pool.into_iter().chain(exhaustive_param_sets()) {
        if merged.len() >= count {
            break;
        }
        if signatures.insert(params.signature()) {
            merged.push(params);
        }
    }

    merged
}

// ── Generation loop ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ParamSetOutcome {
    pub params: Vec<ParamSet>,
    pub validation: ParamValidation,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub job: &'a EvolutionJob,
    pub count: usize,
    pub rules: DiversityRules,
    pub mode: EvolutionMode,
    pub focus_families: &'a [String],
}

impl GenerationRequest<'_> {
    fn proposal(&self) -> ProposalRequest {
        ProposalRequest {
            target_ui_id: self.job.target_ui_id.clone(),
            base_theme_id: self.job.base_theme_id.clone(),
            count: self.count,
            mode: self.mode,
            focus_families: self.focus_families.to_vec(),
            enums: ENUM_CATALOG,
            diversity_rules: self.rules,
        }
    }
}

/// Produce exactly `count` unique, registry-valid parameter sets.
///
/// With a proposer: one proposal and up to two repairs, each re-validated;
/// a failed call counts as empty output for that attempt. Without one (mock
/// mode) the local generator runs through the same validate/backfill path.
pub async fn generate_param_sets<R: Rng + ?Sized + Send>(
    request: &GenerationRequest<'_>,
    proposer: Option<&dyn ParamProposer>,
    rng: &mut R,
) -> ParamSetOutcome {
    let count = request.count;
    let rules = request.rules;

    let Some(proposer) = proposer else {
        let local = generate_local_param_sets(count, &rules, request.mode, request.focus_families, rng);
        let raw = serde_json::to_value(&local).unwrap_or(Value::Null);
        let validation = validate_param_sets(&raw, count, &rules);
        if validation.ok {
            return ParamSetOutcome {
                params: validation.valid_candidates,
                validation: ParamValidation {
                    repaired: false,
                    attempts: 1,
                    errors: Vec::new(),
                },
            };
        }

        tracing::debug!(
            errors = validation.errors.len(),
            "local generator missed diversity rules; backfilling"
        );
        let params = backfill_param_sets(
            validation.valid_candidates,
            count,
            &rules,
            request.mode,
            request.focus_families,
            rng,
        );
        return ParamSetOutcome {
            params,
            validation: ParamValidation {
                repaired: true,
                attempts: 1,
                errors: validation.errors,
            },
        };
    };

    let proposal = request.proposal();
    let mut carried: Vec<ParamSet> = Vec::new();
    let mut last_errors: Vec<String> = Vec::new();

    for attempt in 1..=MAX_PROPOSER_ATTEMPTS {
        let response = if attempt == 1 {
            proposer.propose(&proposal).await
        } else {
            let repair = RepairRequest {
                proposal: proposal.clone(),
                previous_candidates: carried.clone(),
                violations: last_errors.clone(),
            };
            proposer.repair(&repair).await
        };

        let raw = response.unwrap_or_else(|e| {
            tracing::warn!(attempt, "proposer call failed; treating as empty output: {e:#}");
            Value::Array(Vec::new())
        });

        let validation = validate_param_sets(&raw, count, &rules);
        if validation.ok {
            tracing::info!(attempt, count, "proposer output validated");
            return ParamSetOutcome {
                params: validation.valid_candidates,
                validation: ParamValidation {
                    repaired: attempt > 1,
                    attempts: attempt,
                    errors: Vec::new(),
                },
            };
        }

        tracing::debug!(
            attempt,
            errors = validation.errors.len(),
            valid = validation.valid_candidates.len(),
            "proposer output failed validation"
        );
        last_errors = validation.errors;
        if !validation.valid_candidates.is_empty() {
            carried = validation.valid_candidates;
        }
    }

    tracing::warn!(
        kept = carried.len(),
        count,
        "repair budget exhausted; backfilling locally"
    );
    let params = backfill_param_sets(
        carried,
        count,
        &rules,
        request.mode,
        request.focus_families,
        rng,
    );
    ParamSetOutcome {
        params,
        validation: ParamValidation {
            repaired: true,
            attempts: MAX_PROPOSER_ATTEMPTS,
            errors: last_errors,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evolution::rng::DeterministicRng;
    use serde_json::json;

    fn rules(density: u32, era: u32, vibe: u32) -> DiversityRules {
        DiversityRules {
            density_min_each: density,
            era_max_repeat: era,
            vibe_min_distinct: vibe,
        }
    }

    fn valid_entry(vibe: &str, era: &str, density: &str) -> Value {
        json!({
            "params": {
                "vibe": vibe,
                "era": era,
                "densityProfile": density,
                "elevationProfile": "soft",
                "radiusProfile": "rounded",
                "colorStrategy": "pastel"
            }
        })
    }

    #[test]
    fn requested_count_prefers_board_shape() {
        let cfg = GenerationConfig {
            param_set_count: Some(50),
            family_count: Some(3),
            variants_per_family: Some(4),
            ..GenerationConfig::default()
        };
        assert_eq!(requested_count(&cfg, 20), 12);
    }

    #[test]
    fn requested_count_clamps_and_defaults() {
        assert_eq!(requested_count(&GenerationConfig::default(), 20), 20);
        let tiny = GenerationConfig {
            param_set_count: Some(1),
            ..GenerationConfig::default()
        };
        assert_eq!(requested_count(&tiny, 20), 5);
        let huge = GenerationConfig {
            param_set_count: Some(10_000),
            ..GenerationConfig::default()
        };
        assert_eq!(requested_count(&huge, 20), 200);
    }

    #[test]
    fn oversized_board_shape_saturates_to_max() {
        let cfg = GenerationConfig {
            family_count: Some(70_000),
            variants_per_family: Some(70_000),
            ..GenerationConfig::default()
        };
        assert_eq!(requested_count(&cfg, 20), 200);
        let extreme = GenerationConfig {
            family_count: Some(u32::MAX),
            variants_per_family: Some(u32::MAX),
            ..GenerationConfig::default()
        };
        assert_eq!(requested_count(&extreme, 20), 200);
    }

    #[test]
    fn focus_families_are_normalized() {
        let input = vec![
            " Premium/Swiss ".to_string(),
            "premium/swiss".to_string(),
            "bold".to_string(),
            "calm/retro".to_string(),
        ];
        assert_eq!(
            normalize_focus_families(&input),
            vec!["premium/swiss".to_string(), "calm/retro".to_string()]
        );
    }

    #[test]
    fn rules_raise_era_cap_to_uniform_spread() {
        let r = normalize_diversity_rules(
            &DiversityRuleOverrides {
                era_max_repeat: Some(1),
                ..DiversityRuleOverrides::default()
            },
            20,
            EvolutionMode::Exploration,
        );
        assert_eq!(r.era_max_repeat, 4);
        assert_eq!(r.density_min_each, 1);
        assert_eq!(r.vibe_min_distinct, 5);
    }

    #[test]
    fn vibe_distinct_is_clamped_by_mode_and_count() {
        let exploit = normalize_diversity_rules(
            &DiversityRuleOverrides {
                vibe_min_distinct: Some(1),
                ..DiversityRuleOverrides::default()
            },
            20,
            EvolutionMode::Exploitation,
        );
        assert_eq!(exploit.vibe_min_distinct, 2);

        let explore = normalize_diversity_rules(
            &DiversityRuleOverrides {
                vibe_min_distinct: Some(40),
                ..DiversityRuleOverrides::default()
            },
            6,
            EvolutionMode::Exploration,
        );
        assert_eq!(explore.vibe_min_distinct, 6);
    }

    #[test]
    fn density_rule_dropped_when_coverage_is_infeasible() {
        let r = normalize_diversity_rules(&DiversityRuleOverrides::default(), 2, EvolutionMode::Exploitation);
        assert_eq!(r.density_min_each, 0);
    }

    #[test]
    fn normalization_is_idempotent() {
        for mode in [EvolutionMode::Exploration, EvolutionMode::Exploitation] {
            for count in [5, 7, 20, 33, 200] {
                let once = normalize_diversity_rules(&DiversityRuleOverrides::default(), count, mode);
                let twice = normalize_diversity_rules(&once.as_overrides(), count, mode);
                assert_eq!(once, twice, "mode={mode} count={count}");
            }
        }
    }

    #[test]
    fn non_array_input_is_a_distinct_error() {
        let v = validate_param_sets(&json!({"candidates": []}), 5, &rules(0, 5, 1));
        assert!(!v.ok);
        assert_eq!(v.errors, vec!["candidates must be an array".to_string()]);
    }

    #[test]
    fn invalid_fields_are_reported_by_index_and_axis() {
        let raw = json!([
            {"vibe": "calm", "era": "modern"},
            "not an object",
        ]);
        let v = validate_param_sets(&raw, 2, &rules(0, 5, 1));
        assert!(!v.ok);
        assert!(v.errors.iter().any(|e| e == "candidate[0].densityProfile invalid: "));
        assert!(v.errors.iter().any(|e| e == "candidate[1] must be an object"));
        assert!(v.valid_candidates.is_empty());
    }

    #[test]
    fn duplicates_are_excluded_and_reported() {
        let raw = json!([
            valid_entry("calm", "modern", "airy"),
            valid_entry("calm", "modern", "airy"),
        ]);
        let v = validate_param_sets(&raw, 2, &rules(0, 5, 1));
        assert!(!v.ok);
        assert_eq!(v.valid_candidates.len(), 1);
        assert!(v.errors.iter().any(|e| e == "candidate[1] duplicated params set"));
    }

    #[test]
    fn count_mismatch_is_non_fatal() {
        let raw = json!([valid_entry("calm", "modern", "airy")]);
        let v = validate_param_sets(&raw, 3, &rules(0, 5, 1));
        assert!(!v.ok);
        assert_eq!(v.valid_candidates.len(), 1);
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn coverage_rules_are_checked() {
        let raw = json!([
            valid_entry("calm", "modern", "airy"),
            valid_entry("bold", "modern", "airy"),
            valid_entry("calm", "modern", "compact"),
        ]);
        let v = validate_param_sets(&raw, 3, &rules(1, 2, 3));
        assert!(!v.ok);
        assert!(v
            .errors
            .iter()
            .any(|e| e == "densityProfile=comfortable must appear at least 1 times (got 0)"));
        assert!(v
            .errors
            .iter()
            .any(|e| e == "era=modern must appear at most 2 times (got 3)"));
        assert!(v
            .errors
            .iter()
            .any(|e| e == "vibe must contain at least 3 distinct values (got 2)"));
    }

    #[test]
    fn well_formed_batch_passes() {
        let raw = json!([
            valid_entry("calm", "modern", "airy"),
            valid_entry("bold", "y2k", "compact"),
            valid_entry("playful", "retro", "comfortable"),
        ]);
        let v = validate_param_sets(&raw, 3, &rules(1, 1, 3));
        assert!(v.ok, "{:?}", v.errors);
        assert_eq!(v.valid_candidates.len(), 3);
    }

    #[test]
    fn flat_objects_are_accepted() {
        let raw = json!([{
            "vibe": "minimal", "era": "swiss", "densityProfile": "airy",
            "elevationProfile": "flat", "radiusProfile": "sharp", "colorStrategy": "neon"
        }]);
        let v = validate_param_sets(&raw, 1, &rules(0, 1, 1));
        assert!(v.ok, "{:?}", v.errors);
    }

    #[test]
    fn local_generator_meets_exploration_rules() {
        let mut rng = DeterministicRng::new(17);
        let r = normalize_diversity_rules(&DiversityRuleOverrides::default(), 20, EvolutionMode::Exploration);
        let sets = generate_local_param_sets(20, &r, EvolutionMode::Exploration, &[], &mut rng);
        let raw = serde_json::to_value(&sets).unwrap();
        let v = validate_param_sets(&raw, 20, &r);
        assert!(v.ok, "{:?}", v.errors);
    }

    #[test]
    fn local_generator_biases_toward_focus_families() {
        let mut rng = DeterministicRng::new(23);
        let focus = vec!["premium/swiss".to_string()];
        let r = normalize_diversity_rules(&DiversityRuleOverrides::default(), 40, EvolutionMode::Exploitation);
        let sets = generate_local_param_sets(40, &r, EvolutionMode::Exploitation, &focus, &mut rng);
        let focused = sets
            .iter()
            .filter(|p| p.visual_family_id() == "premium/swiss")
            .count();
        assert!(focused >= 15, "only {focused} focus candidates");
    }

    #[test]
    fn backfill_always_reaches_count() {
        let mut rng = DeterministicRng::new(29);
        let r = rules(1, 200, 2);
        let focus = vec!["calm/modern".to_string()];
        for count in [5, 57, 200] {
            let out = backfill_param_sets(Vec::new(), count, &r, EvolutionMode::Exploitation, &focus, &mut rng);
            assert_eq!(out.len(), count);
            let unique: HashSet<_> = out.iter().map(ParamSet::signature).collect();
            assert_eq!(unique.len(), count);
        }
    }

    #[test]
    fn exhaustive_sweep_covers_the_whole_space() {
        assert_eq!(exhaustive_param_sets().count(), 7 * 6 * 3 * 4 * 3 * 6);
    }
}
