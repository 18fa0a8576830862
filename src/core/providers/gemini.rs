//! Google Gemini `generateContent` provider (API key auth).

use async_trait::async_trait;
use reqwest::Client;

use super::gemini_types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::http_client::build_provider_client;
use super::traits::Provider;
use crate::error::LlmError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    max_output_tokens: u32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens,
            client: build_provider_client(),
        }
    }

    /// Point the provider at another host (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, system_prompt: Option<&str>, message: &str, temperature: f64) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: message.to_string(),
                }],
            }],
            system_instruction: system_prompt.map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn extract_text(result: &GenerateContentResponse) -> Option<String> {
        let text = result
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.trim().is_empty()).then_some(text)
    }

    fn request_error(message: impl Into<String>) -> anyhow::Error {
        LlmError::Request {
            provider: "gemini".to_string(),
            message: message.into(),
        }
        .into()
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let url = format!(
            "{}/v1beta/{}:generateContent?key={}",
            self.base_url,
            Self::model_path(model),
            self.api_key
        );
        let request = self.build_request(system_prompt, message, temperature);

        tracing::debug!(model, "gemini generateContent");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::request_error(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::request_error(format!("{status} {error_text}")));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Self::request_error(format!("invalid response body: {e}")))?;

        if let Some(err) = result.error.as_ref() {
            return Err(Self::request_error(err.message.clone()));
        }

        Self::extract_text(&result).ok_or_else(|| {
            LlmError::EmptyResponse {
                provider: "gemini".to_string(),
            }
            .into()
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
