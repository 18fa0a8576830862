//! Capabilities the pipeline consumes from an external generative model.
//!
//! Output is untrusted: proposers hand back raw JSON that the generation
//! loop always re-validates, and judges may fail per call.

pub mod json;
pub mod llm;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::evolution::{DesignDna, DiversityRules, EnumCatalog, EvolutionMode, ParamSet};

pub use json::{JsonPayload, parse_json_payload};
pub use llm::LlmParamClient;

/// Context for a fresh batch of parameter sets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequest {
    pub target_ui_id: String,
    pub base_theme_id: String,
    pub count: usize,
    pub mode: EvolutionMode,
    pub focus_families: Vec<String>,
    pub enums: EnumCatalog,
    pub diversity_rules: DiversityRules,
}

/// Context for fixing a previous batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequest {
    #[serde(flatten)]
    pub proposal: ProposalRequest,
    /// Entries that already passed validation.
    pub previous_candidates: Vec<ParamSet>,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AestheticVerdict {
    /// In `[0, 1]`.
    pub score: f64,
    pub reason: Option<String>,
    pub risk_flags: Vec<String>,
}

/// Proposes parameter sets. The returned value is the raw `candidates`
/// payload, whatever shape the model produced.
#[async_trait]
pub trait ParamProposer: Send + Sync {
    async fn propose(&self, request: &ProposalRequest) -> anyhow::Result<serde_json::Value>;

    async fn repair(&self, request: &RepairRequest) -> anyhow::Result<serde_json::Value>;
}

#[async_trait]
pub trait AestheticJudge: Send + Sync {
    async fn judge_aesthetic(
        &self,
        candidate_id: &str,
        design_dna: &DesignDna,
    ) -> anyhow::Result<AestheticVerdict>;

    /// Name recorded on candidates this judge re-scored.
    fn provider_name(&self) -> &str;
}
