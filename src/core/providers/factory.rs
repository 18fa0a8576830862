use std::sync::Arc;

use super::gemini::GeminiProvider;
use super::traits::Provider;
use crate::config::{LlmConfig, PROVIDER_GEMINI, PROVIDER_MOCK};
use crate::core::proposer::{AestheticJudge, LlmParamClient, ParamProposer};
use crate::error::ConfigError;

/// Proposer and judge capabilities backed by one chat provider.
#[derive(Clone)]
pub struct LlmBackend {
    pub proposer: Arc<dyn ParamProposer>,
    pub judge: Arc<dyn AestheticJudge>,
}

/// Build the chat provider named by `config.provider`. `None` for mock.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Arc<dyn Provider>>, ConfigError> {
    match config.provider.as_str() {
        PROVIDER_MOCK => Ok(None),
        PROVIDER_GEMINI => {
            let api_key = config.gemini.resolve_api_key()?;
            let provider: Arc<dyn Provider> =
                Arc::new(GeminiProvider::new(api_key, config.max_output_tokens));
            Ok(Some(provider))
        }
        other => Err(ConfigError::Validation(format!(
            "unknown llm.provider \"{other}\""
        ))),
    }
}

/// Wire a chat provider into the pipeline's proposer and judge seams.
pub fn create_llm_backend(config: &LlmConfig) -> Result<Option<LlmBackend>, ConfigError> {
    let Some(provider) = create_provider(config)? else {
        return Ok(None);
    };

    tracing::info!(provider = provider.name(), model = %config.gemini.model, "LLM backend ready");
    let client = Arc::new(LlmParamClient::new(
        provider,
        config.gemini.model.clone(),
        config.temperature,
    ));
    Ok(Some(LlmBackend {
        proposer: client.clone(),
        judge: client,
    }))
}
