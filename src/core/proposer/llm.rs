use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::json::{JsonPayload, parse_json_payload};
use super::{AestheticJudge, AestheticVerdict, ParamProposer, ProposalRequest, RepairRequest};
use crate::core::evolution::{DesignDna, EvolutionMode};
use crate::core::providers::Provider;
use crate::error::LlmError;

const SYSTEM_PROMPT: &str = "Return JSON only. No markdown, no prose.";

const GENERATE_SCHEMA: &str = r#"Return JSON only with schema: {"count":number,"candidates":[{"params":{"vibe":"...","era":"...","densityProfile":"...","elevationProfile":"...","radiusProfile":"...","colorStrategy":"..."}}]}"#;
const REPAIR_SCHEMA: &str =
    r#"Keep response JSON-only with schema: {"count":number,"candidates":[{"params":{...}}]}"#;
const JUDGE_SCHEMA: &str =
    r#"Score aesthetics from 0..1. JSON schema: {"score":number,"reason":"string","riskFlags":["string"]}"#;

/// Proposer and aesthetic judge over any chat [`Provider`].
pub struct LlmParamClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
}

impl LlmParamClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    fn family_hint(request: &ProposalRequest, fallback: &str) -> String {
        if request.mode == EvolutionMode::Exploitation && !request.focus_families.is_empty() {
            format!(
                "Prefer these visual families: {}",
                request.focus_families.join(", ")
            )
        } else {
            fallback.to_string()
        }
    }

    fn rules_json(request: &ProposalRequest) -> String {
        serde_json::to_string(&request.diversity_rules).unwrap_or_default()
    }

    fn generate_instruction(request: &ProposalRequest) -> String {
        [
            "You are generating UI parameter sets.".to_string(),
            GENERATE_SCHEMA.to_string(),
            format!("Output exactly {} candidates.", request.count),
            "No prose. No markdown. No extra keys.".to_string(),
            format!("Generation mode: {}.", request.mode),
            Self::family_hint(request, "Prioritize broad visual family spread."),
            "All values must be chosen from enum lists only.".to_string(),
            "Do not return duplicate params sets.".to_string(),
            format!("Diversity rules: {}", Self::rules_json(request)),
            format!("Enums: {}", request.enums.describe()),
        ]
        .join(" ")
    }

    fn repair_instruction(request: &RepairRequest) -> String {
        let proposal = &request.proposal;
        [
            "Repair the previous JSON output.".to_string(),
            REPAIR_SCHEMA.to_string(),
            format!(
                "Output exactly {} candidates after fixing violations.",
                proposal.count
            ),
            format!("Generation mode: {}.", proposal.mode),
            Self::family_hint(proposal, "Keep visual families broadly diverse."),
            "Fix only violations. Preserve as many valid candidates as possible.".to_string(),
            "All values must be enum values only and no duplicate params sets.".to_string(),
            format!(
                "Violations: {}",
                serde_json::to_string(&request.violations).unwrap_or_default()
            ),
            format!("Diversity rules: {}", Self::rules_json(proposal)),
            format!("Enums: {}", proposal.enums.describe()),
        ]
        .join(" ")
    }

    async fn complete_json(&self, instruction: &str, input: &Value) -> anyhow::Result<Value> {
        let message = format!("{instruction}\nInput: {input}");
        let text = self
            .provider
            .chat_with_system(Some(SYSTEM_PROMPT), &message, &self.model, self.temperature)
            .await?;

        match parse_json_payload(&text) {
            JsonPayload::Direct(value) => Ok(value),
            JsonPayload::Extracted(value) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    "recovered JSON object from noisy model output"
                );
                Ok(value)
            }
            JsonPayload::Unparseable => Err(LlmError::Parse(truncate(&text, 200)).into()),
        }
    }
}

/// The `candidates` payload, or the value itself when the model returned a bare array.
fn candidates_payload(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove("candidates").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl ParamProposer for LlmParamClient {
    async fn propose(&self, request: &ProposalRequest) -> anyhow::Result<Value> {
        let input = json!({
            "targetUiId": request.target_ui_id,
            "baseThemeId": request.base_theme_id,
            "count": request.count,
            "mode": request.mode,
            "focusFamilies": request.focus_families,
            "diversityRules": request.diversity_rules,
        });
        let value = self
            .complete_json(&Self::generate_instruction(request), &input)
            .await?;
        Ok(candidates_payload(value))
    }

    async fn repair(&self, request: &RepairRequest) -> anyhow::Result<Value> {
        let proposal = &request.proposal;
        let input = json!({
            "targetUiId": proposal.target_ui_id,
            "baseThemeId": proposal.base_theme_id,
            "count": proposal.count,
            "mode": proposal.mode,
            "focusFamilies": proposal.focus_families,
            "previousCandidates": request
                .previous_candidates
                .iter()
                .map(|params| json!({ "params": params }))
                .collect::<Vec<_>>(),
        });
        let value = self
            .complete_json(&Self::repair_instruction(request), &input)
            .await?;
        Ok(candidates_payload(value))
    }
}

#[async_trait]
impl AestheticJudge for LlmParamClient {
    async fn judge_aesthetic(
        &self,
        candidate_id: &str,
        design_dna: &DesignDna,
    ) -> anyhow::Result<AestheticVerdict> {
        let input = json!({
            "candidateId": candidate_id,
            "genre": {
                "mood": design_dna.params.vibe,
                "era": design_dna.params.era,
            },
            "designDNA": design_dna,
        });
        let value = self.complete_json(JUDGE_SCHEMA, &input).await?;

        let score = value
            .get("score")
            .and_then(Value::as_f64)
            .filter(|s| s.is_finite())
            .ok_or_else(|| LlmError::Parse("judge response has no numeric score".to_string()))?;
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string);
        let risk_flags = value
            .get("riskFlags")
            .and_then(Value::as_array)
            .map(|flags| {
                flags
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AestheticVerdict {
            score: score.clamp(0.0, 1.0),
            reason,
            risk_flags,
        })
    }

    fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
