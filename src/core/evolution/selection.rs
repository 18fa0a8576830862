use std::cmp::Ordering;

use super::scoring::distance;
use super::types::{AestheticAnnotation, Candidate};
use crate::core::proposer::AestheticJudge;

/// Minimum DNA distance between shortlisted candidates after the first two.
pub const MIN_SEPARATION: f64 = 0.12;
/// Picks accepted regardless of separation.
const UNCONDITIONAL_PICKS: usize = 2;

fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.scores.score.total_cmp(&a.scores.score)
}

/// Highest-scoring first; ties keep input order.
pub fn sorted_by_score(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(by_score_desc);
    sorted
}

/// Diversity-constrained shortlist of exactly `min(k, len)` ranked candidates.
///
/// The separation floor is a preference: when too few candidates clear it,
/// the best remaining ones fill the shortlist anyway.
pub fn select_top_k(candidates: &[Candidate], k: usize) -> Vec<Candidate> {
    let sorted = sorted_by_score(candidates);
    let target = k.min(sorted.len());
    let mut taken = vec![false; sorted.len()];
    let mut selected: Vec<usize> = Vec::with_capacity(target);

    for (index, candidate) in sorted.iter().enumerate() {
        if selected.len() >= target {
            break;
        }
        let separated = selected.len() < UNCONDITIONAL_PICKS
            || selected
                .iter()
                .all(|&s| distance(&candidate.design_dna, &sorted[s].design_dna) >= MIN_SEPARATION);
        if separated {
            selected.push(index);
            taken[index] = true;
        }
    }

    if selected.len() < target {
        tracing::debug!(
            separated = selected.len(),
            target,
            "separation floor unmet; backfilling shortlist by score"
        );
        for index in 0..sorted.len() {
            if selected.len() >= target {
                break;
            }
            if !taken[index] {
                selected.push(index);
                taken[index] = true;
            }
        }
    }

    // Backfilled picks may outscore later separated picks; rank strictly by score.
    selected.sort_unstable();
    selected
        .into_iter()
        .zip(1_u32..)
        .map(|(index, rank)| sorted[index].with_rank(rank))
        .collect()
}

/// Ask the judge about each shortlisted candidate, then re-sort and re-rank.
/// A failed judgement leaves that candidate exactly as it was.
pub async fn rescore_with_judge(shortlist: &[Candidate], judge: &dyn AestheticJudge) -> Vec<Candidate> {
    let mut rescored = Vec::with_capacity(shortlist.len());

    for candidate in shortlist {
        match judge
            .judge_aesthetic(&candidate.candidate_id, &candidate.design_dna)
            .await
        {
            Ok(verdict) => {
                let mut next = candidate.with_scores(candidate.scores.with_aesthetics(verdict.score));
                next.llm_aesthetic = Some(AestheticAnnotation {
                    provider: judge.provider_name().to_string(),
                    reason: verdict.reason,
                    risk_flags: verdict.risk_flags,
                });
                rescored.push(next);
            }
            Err(e) => {
                tracing::warn!(
                    candidate_id = %candidate.candidate_id,
                    "aesthetic judge failed; keeping prior score: {e:#}"
                );
                rescored.push(candidate.clone());
            }
        }
    }

    sorted_by_score(&rescored)
        .into_iter()
        .zip(1_u32..)
        .map(|(candidate, rank)| candidate.with_rank(rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evolution::candidate::build_candidate;
    use crate::core::evolution::rng::DeterministicRng;
    use crate::core::evolution::types::{CandidateScores, DesignDna, ParamSet};
    use crate::core::proposer::AestheticVerdict;
    use async_trait::async_trait;
    use std::collections::HashSet;

    fn params(vibe: &str, color: &str, radius: &str) -> ParamSet {
        ParamSet {
            vibe: vibe.into(),
            era: "modern".into(),
            density_profile: "airy".into(),
            elevation_profile: "soft".into(),
            radius_profile: radius.into(),
            color_strategy: color.into(),
        }
    }

    fn with_score(mut c: Candidate, quality: f64) -> Candidate {
        c.scores = CandidateScores::from_components(quality, quality, quality, quality);
        c
    }

    fn population() -> Vec<Candidate> {
        let mut rng = DeterministicRng::new(99);
        let mut out = Vec::new();
        let combos = [
            ("calm", "pastel", "sharp"),
            ("bold", "neon", "pill"),
            ("minimal", "monoAccent", "rounded"),
            ("premium", "highContrast", "sharp"),
            ("playful", "dualAccent", "pill"),
            ("industrial", "earthTone", "rounded"),
        ];
        for (i, (vibe, color, radius)) in combos.iter().enumerate() {
            let c = build_candidate(i, &params(vibe, color, radius), "evo_t", "/a", &mut rng).unwrap();
            #[allow(clippy::cast_precision_loss)]
            out.push(with_score(c, 0.5 + i as f64 * 0.05));
        }
        out
    }

    #[test]
    fn small_population_is_fully_ranked() {
        let pop = population();
        let top = select_top_k(&pop[..3], 5);
        assert_eq!(top.len(), 3);
        let ranks: Vec<_> = top.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn returns_exactly_k_distinct_candidates() {
        let pop = population();
        let top = select_top_k(&pop, 4);
        assert_eq!(top.len(), 4);
        let ids: HashSet<_> = top.iter().map(|c| c.candidate_id.clone()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(top[0].candidate_id, pop[5].candidate_id);
        for pair in top.windows(2) {
            assert!(pair[0].scores.score >= pair[1].scores.score);
        }
    }

    #[test]
    fn identical_designs_still_fill_the_shortlist() {
        let base = population().remove(0);
        let clones: Vec<Candidate> = (0..6)
            .map(|i| {
                let mut c = base.clone();
                c.candidate_id = format!("cand_{i}");
                c
            })
            .collect();
        let top = select_top_k(&clones, 5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[4].rank, Some(5));
    }

    struct FlakyJudge;

    #[async_trait]
    impl AestheticJudge for FlakyJudge {
        async fn judge_aesthetic(
            &self,
            candidate_id: &str,
            _design_dna: &DesignDna,
        ) -> anyhow::Result<AestheticVerdict> {
            if candidate_id.starts_with("cand_0006") {
                anyhow::bail!("timeout");
            }
            Ok(AestheticVerdict {
                score: 1.0,
                reason: Some("clean".to_string()),
                risk_flags: vec![],
            })
        }

        fn provider_name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn rescore_isolates_failures_and_reranks() {
        let pop = population();
        let shortlist = select_top_k(&pop, 3);
        let failing = shortlist
            .iter()
            .find(|c| c.candidate_id.starts_with("cand_0006"))
            .cloned()
            .unwrap();

        let rescored = rescore_with_judge(&shortlist, &FlakyJudge).await;
        assert_eq!(rescored.len(), 3);

        let kept = rescored
            .iter()
            .find(|c| c.candidate_id == failing.candidate_id)
            .unwrap();
        assert_eq!(kept.scores, failing.scores);
        assert!(kept.llm_aesthetic.is_none());

        for c in rescored.iter().filter(|c| c.candidate_id != failing.candidate_id) {
            assert!((c.scores.aesthetics - 1.0).abs() < f64::EPSILON);
            assert_eq!(c.llm_aesthetic.as_ref().unwrap().provider, "flaky");
            assert!((0.0..=1.0).contains(&c.scores.score));
        }
        let ranks: Vec<_> = rescored.iter().map(|c| c.rank.unwrap()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }
}
