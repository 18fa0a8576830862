use std::collections::HashSet;

use rand::Rng;

use super::rng::uniform;
use super::types::{Candidate, CandidateScores, DesignDna, EvolutionMode};

pub const DIVERSITY_BONUS_SCALE: f64 = 0.15;
pub const DIVERSITY_BONUS_CAP: f64 = 0.1;
pub const FOCUS_FAMILY_BOOST: f64 = 0.06;

fn jittered<R: Rng + ?Sized>(base: f64, spread: f64, rng: &mut R) -> f64 {
    (base + uniform(rng, -spread, spread)).clamp(0.0, 1.0)
}

/// Heuristic component scores for one design, each jittered and clamped to `[0, 1]`.
pub fn score_design<R: Rng + ?Sized>(dna: &DesignDna, rng: &mut R) -> CandidateScores {
    let params = &dna.params;

    let readability_base = match params.color_strategy.as_str() {
        "highContrast" => 0.9,
        "neon" => 0.72,
        _ => 0.82,
    };
    let layout_base = if params.density_profile == "compact" {
        0.78
    } else {
        0.86
    };
    let brand_base = if matches!(params.vibe.as_str(), "minimal" | "premium") {
        0.88
    } else {
        0.8
    };
    let aesthetics_base = if matches!(params.era.as_str(), "y2k" | "neo-brutalist") {
        0.8
    } else {
        0.85
    };

    CandidateScores::from_components(
        jittered(readability_base, 0.08, rng),
        jittered(layout_base, 0.08, rng),
        jittered(brand_base, 0.09, rng),
        jittered(aesthetics_base, 0.09, rng),
    )
}

/// Mean normalized difference over five coefficients; hue is scaled by 1/30.
pub fn distance(a: &DesignDna, b: &DesignDna) -> f64 {
    let hue = (a.palette.hue_shift - b.palette.hue_shift).abs() / 30.0;
    let saturation = (a.palette.saturation_scale - b.palette.saturation_scale).abs();
    let type_scale = (a.typography.scale - b.typography.scale).abs();
    let radius = (a.surfaces.radius_scale - b.surfaces.radius_scale).abs();
    let spacing = (a.spacing.scale - b.spacing.scale).abs();
    (hue + saturation + type_scale + radius + spacing) / 5.0
}

/// Nearest-neighbor distance from `population[index]` to every other member,
/// scaled and capped. Zero for populations smaller than two.
pub fn diversity_bonus(index: usize, population: &[Candidate]) -> f64 {
    if population.len() < 2 {
        return 0.0;
    }
    let Some(own) = population.get(index) else {
        return 0.0;
    };

    let nearest = population
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .map(|(_, other)| distance(&own.design_dna, &other.design_dna))
        .fold(f64::INFINITY, f64::min);

    (nearest * DIVERSITY_BONUS_SCALE).clamp(0.0, DIVERSITY_BONUS_CAP)
}

/// New candidates carrying their population diversity bonus.
pub fn apply_diversity_bonus(population: &[Candidate]) -> Vec<Candidate> {
    population
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let bonus = diversity_bonus(index, population);
            candidate.with_scores(candidate.scores.with_diversity_bonus(bonus))
        })
        .collect()
}

/// Flat boost for focus-family members. Identity unless exploiting with a
/// non-empty focus set.
pub fn apply_exploitation_boost(
    candidates: &[Candidate],
    focus_families: &[String],
    mode: EvolutionMode,
) -> Vec<Candidate> {
    if mode != EvolutionMode::Exploitation || focus_families.is_empty() {
        return candidates.to_vec();
    }

    let focus: HashSet<&str> = focus_families.iter().map(String::as_str).collect();
    candidates
        .iter()
        .map(|candidate| {
            if focus.contains(candidate.visual_family_id.as_str()) {
                candidate.with_scores(candidate.scores.with_focus_boost(FOCUS_FAMILY_BOOST))
            } else {
                candidate.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evolution::candidate::build_candidate;
    use crate::core::evolution::rng::DeterministicRng;
    use crate::core::evolution::types::ParamSet;

    fn params(vibe: &str, era: &str, color: &str) -> ParamSet {
        ParamSet {
            vibe: vibe.into(),
            era: era.into(),
            density_profile: "comfortable".into(),
            elevation_profile: "soft".into(),
            radius_profile: "rounded".into(),
            color_strategy: color.into(),
        }
    }

    fn candidate(index: usize, p: &ParamSet, seed: u64) -> Candidate {
        build_candidate(index, p, "evo_test", "/artifacts", &mut DeterministicRng::new(seed)).unwrap()
    }

    #[test]
    fn component_scores_stay_near_bases() {
        let mut rng = DeterministicRng::new(7);
        for _ in 0..200 {
            let c = candidate(0, &params("premium", "y2k", "neon"), rng.random());
            let s = &c.scores;
            assert!((0.639..=0.801).contains(&s.readability), "{}", s.readability);
            assert!((0.789..=0.971).contains(&s.brand_consistency));
            assert!((0.709..=0.891).contains(&s.aesthetics));
            assert!((0.0..=1.0).contains(&s.score));
        }
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = candidate(0, &params("calm", "modern", "pastel"), 1);
        let b = candidate(1, &params("bold", "retro", "neon"), 2);
        assert!(distance(&a.design_dna, &a.design_dna).abs() < f64::EPSILON);
        assert!((distance(&a.design_dna, &b.design_dna) - distance(&b.design_dna, &a.design_dna)).abs() < 1e-12);
        assert!(distance(&a.design_dna, &b.design_dna) > 0.0);
    }

    #[test]
    fn bonus_is_zero_for_singletons_and_clones() {
        let a = candidate(0, &params("calm", "modern", "pastel"), 1);
        assert!(diversity_bonus(0, std::slice::from_ref(&a)).abs() < f64::EPSILON);

        let twins = vec![a.clone(), a];
        for c in apply_diversity_bonus(&twins) {
            assert!(c.scores.diversity_bonus.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn bonus_is_capped_and_leaves_input_untouched() {
        let population = vec![
            candidate(0, &params("calm", "modern", "pastel"), 1),
            candidate(1, &params("bold", "retro", "neon"), 2),
        ];
        let bonused = apply_diversity_bonus(&population);
        for (before, after) in population.iter().zip(&bonused) {
            assert!(before.scores.diversity_bonus.abs() < f64::EPSILON);
            assert!((0.0..=DIVERSITY_BONUS_CAP).contains(&after.scores.diversity_bonus));
            assert!((after.scores.score - after.scores.aggregate()).abs() < 1e-12);
        }
    }

    #[test]
    fn boost_only_applies_when_exploiting() {
        let population = vec![
            candidate(0, &params("premium", "swiss", "pastel"), 1),
            candidate(1, &params("bold", "retro", "neon"), 2),
        ];
        let focus = vec!["premium/swiss".to_string()];

        let explored = apply_exploitation_boost(&population, &focus, EvolutionMode::Exploration);
        assert_eq!(explored, population);

        let exploited = apply_exploitation_boost(&population, &focus, EvolutionMode::Exploitation);
        assert!((exploited[0].scores.focus_boost - FOCUS_FAMILY_BOOST).abs() < f64::EPSILON);
        assert!(exploited[1].scores.focus_boost.abs() < f64::EPSILON);
        assert!(exploited[0].scores.score <= 1.0);

        let unfocused = apply_exploitation_boost(&population, &[], EvolutionMode::Exploitation);
        assert_eq!(unfocused, population);
    }
}
