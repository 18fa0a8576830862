use anyhow::Result;
use rand::Rng;

use super::dna::{build_design_dna, token_patch};
use super::scoring::score_design;
use super::types::{ArtifactPaths, Candidate, Genre, ParamSet};

/// Every candidate produced by one run belongs to the first generation.
pub const GENERATION: u32 = 1;

/// `cand_0001_1a2b3c`: 1-based position plus a six-hex-digit suffix drawn
/// from the run's random source.
pub fn candidate_id<R: Rng + ?Sized>(index: usize, rng: &mut R) -> String {
    let suffix: u32 = rng.random_range(0..0x100_0000);
    format!("cand_{:04}_{suffix:06x}", index + 1)
}

/// Build, derive, and score one candidate from a validated parameter set.
pub fn build_candidate<R: Rng + ?Sized>(
    index: usize,
    params: &ParamSet,
    job_id: &str,
    artifact_root: &str,
    rng: &mut R,
) -> Result<Candidate> {
    let candidate_id = candidate_id(index, rng);
    let design_dna = build_design_dna(params, rng)?;
    let scores = score_design(&design_dna, rng);
    let visual_family_id = params.visual_family_id();
    let ordinal = index + 1;
    let artifact_dir = format!(
        "{}/{job_id}/{GENERATION}",
        artifact_root.trim_end_matches('/')
    );

    Ok(Candidate {
        candidate_id,
        generation: GENERATION,
        params: params.clone(),
        genre: Genre {
            id: visual_family_id.clone(),
            mood: params.vibe.clone(),
            domain: "generated".to_string(),
            density: design_dna.spacing.density,
        },
        visual_family_id,
        token_patch: token_patch(&design_dna),
        design_dna,
        scores,
        artifact_paths: ArtifactPaths {
            screenshot: format!("{artifact_dir}/{ordinal}.png"),
            qa_report: format!("{artifact_dir}/{ordinal}.qa.json"),
        },
        rank: None,
        llm_aesthetic: None,
    })
}
