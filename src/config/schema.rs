use serde::{Deserialize, Serialize};

pub const PROVIDER_MOCK: &str = "mock";
pub const PROVIDER_GEMINI: &str = "gemini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `"mock"` (local generator, no judge) or `"gemini"`.
    pub provider: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub gemini: GeminiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: PROVIDER_MOCK.to_string(),
            temperature: 0.2,
            max_output_tokens: 800,
            gemini: GeminiConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn is_mock(&self) -> bool {
        self.provider == PROVIDER_MOCK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    /// Environment variable holding the API key. Takes precedence over `api_key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 43102,
        }
    }
}

/// Pipeline knobs handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub default_param_set_count: u32,
    pub default_variants_per_family: u32,
    pub top_k: usize,
    /// Prefix for screenshot and QA report placeholders.
    pub artifact_root: String,
    /// Fixed seed for reproducible runs; entropy when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            default_param_set_count: 20,
            default_variants_per_family: 4,
            top_k: 5,
            artifact_root: "/artifacts".to_string(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let llm = LlmConfig::default();
        assert!(llm.is_mock());
        assert!((llm.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(llm.max_output_tokens, 800);
        assert_eq!(GatewayConfig::default().port, 43102);

        let evo = EvolutionConfig::default();
        assert_eq!(evo.default_param_set_count, 20);
        assert_eq!(evo.top_k, 5);
        assert_eq!(evo.artifact_root, "/artifacts");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let evo: EvolutionConfig = toml::from_str("top_k = 8").unwrap();
        assert_eq!(evo.top_k, 8);
        assert_eq!(evo.default_variants_per_family, 4);
        assert!(evo.seed.is_none());
    }
}
