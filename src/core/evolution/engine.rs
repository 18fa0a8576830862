use std::sync::Arc;

use anyhow::Result;
use rand::Rng;

use super::board::build_family_board;
use super::candidate::build_candidate;
use super::params::{
    GenerationRequest, generate_param_sets, normalize_diversity_rules, normalize_focus_families,
    normalized_mode, requested_count,
};
use super::registry::ENUM_CATALOG;
use super::rng::run_rng;
use super::scoring::{apply_diversity_bonus, apply_exploitation_boost};
use super::selection::{rescore_with_judge, select_top_k};
use super::types::{EvolutionJob, EvolutionResult, ParamGeneration};
use crate::config::{Config, EvolutionConfig, PROVIDER_MOCK, ProviderInfo};
use crate::core::proposer::{AestheticJudge, ParamProposer};
use crate::core::providers::create_llm_backend;
use crate::error::ConfigError;

/// Runs one generation: propose → validate/repair → build → score → select → board.
///
/// Holds no per-run state; one engine serves any number of concurrent jobs.
pub struct EvolutionEngine {
    options: EvolutionConfig,
    proposer: Option<Arc<dyn ParamProposer>>,
    judge: Option<Arc<dyn AestheticJudge>>,
    provider_info: ProviderInfo,
}

impl EvolutionEngine {
    pub fn new(
        options: EvolutionConfig,
        proposer: Option<Arc<dyn ParamProposer>>,
        judge: Option<Arc<dyn AestheticJudge>>,
        provider_info: ProviderInfo,
    ) -> Self {
        Self {
            options,
            proposer,
            judge,
            provider_info,
        }
    }

    /// Local generator only, no judge.
    pub fn mock(options: EvolutionConfig) -> Self {
        Self::new(options, None, None, ProviderInfo::mock())
    }

    /// Validate `config` and wire the configured provider.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let backend = create_llm_backend(&config.llm)?;
        let (proposer, judge) = match backend {
            Some(backend) => (Some(backend.proposer), Some(backend.judge)),
            None => (None, None),
        };
        Ok(Self::new(
            config.evolution.clone(),
            proposer,
            judge,
            config.provider_info(),
        ))
    }

    pub fn options(&self) -> &EvolutionConfig {
        &self.options
    }

    pub fn provider_info(&self) -> &ProviderInfo {
        &self.provider_info
    }

    /// Run with a fresh random source (seeded when `evolution.seed` is set).
    pub async fn run(&self, job: &EvolutionJob) -> Result<EvolutionResult> {
        let mut rng = run_rng(self.options.seed, &job.job_id);
        self.run_with_rng(job, &mut *rng).await
    }

    pub async fn run_with_rng<R: Rng + ?Sized + Send>(
        &self,
        job: &EvolutionJob,
        rng: &mut R,
    ) -> Result<EvolutionResult> {
        let config = &job.config;
        let count = requested_count(config, self.options.default_param_set_count);
        let mode = normalized_mode(config);
        let focus_families = normalize_focus_families(&config.focus_families);
        let diversity_rules = normalize_diversity_rules(&config.diversity_rules, count, mode);
        let requested_provider = config
            .llm_provider
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let forced_mock = requested_provider.is_some_and(|name| name.eq_ignore_ascii_case(PROVIDER_MOCK));
        if let Some(name) = requested_provider
            && !forced_mock
            && !name.eq_ignore_ascii_case(&self.provider_info.provider)
        {
            anyhow::bail!(
                "llm provider \"{name}\" is not configured (active: {})",
                self.provider_info.provider
            );
        }

        tracing::info!(
            job_id = %job.job_id,
            count,
            %mode,
            focus = focus_families.len(),
            "evolution run started"
        );

        let proposer = if forced_mock {
            None
        } else {
            self.proposer.as_deref()
        };
        let request = GenerationRequest {
            job,
            count,
            rules: diversity_rules,
            mode,
            focus_families: &focus_families,
        };
        let outcome = generate_param_sets(&request, proposer, rng).await;

        let candidates = outcome
            .params
            .iter()
            .enumerate()
            .map(|(index, params)| {
                build_candidate(index, params, &job.job_id, &self.options.artifact_root, rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let bonused = apply_diversity_bonus(&candidates);
        let boosted = apply_exploitation_boost(&bonused, &focus_families, mode);

        let mut top_candidates = select_top_k(&boosted, self.options.top_k);
        if config.use_llm_aesthetic
            && !forced_mock
            && let Some(judge) = self.judge.as_deref()
        {
            tracing::info!(shortlist = top_candidates.len(), "re-scoring shortlist with aesthetic judge");
            top_candidates = rescore_with_judge(&top_candidates, judge).await;
        }

        let variants = config
            .variants_per_family
            .filter(|v| *v > 0)
            .unwrap_or(self.options.default_variants_per_family);
        let genre_board = build_family_board(&boosted, variants as usize);

        tracing::info!(
            job_id = %job.job_id,
            total = boosted.len(),
            top = top_candidates.len(),
            families = genre_board.len(),
            repaired = outcome.validation.repaired,
            "evolution run completed"
        );

        Ok(EvolutionResult {
            total_candidates: boosted.len(),
            top_candidates,
            all_candidates: boosted,
            genre_board,
            llm: if forced_mock {
                ProviderInfo::mock()
            } else {
                self.provider_info.clone()
            },
            param_generation: ParamGeneration {
                count,
                mode,
                enums: ENUM_CATALOG,
                diversity_rules,
                validation: outcome.validation,
            },
        })
    }
}
