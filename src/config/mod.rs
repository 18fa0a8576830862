pub mod schema;
#[cfg(test)]
pub(crate) mod test_env;

use std::fs;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
pub use schema::{
    EvolutionConfig, GatewayConfig, GeminiConfig, LlmConfig, PROVIDER_GEMINI, PROVIDER_MOCK,
};

pub const CONFIG_PATH_ENV: &str = "FRONTSWATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub gateway: GatewayConfig,
    pub evolution: EvolutionConfig,
    /// Where this config was read from, if anywhere.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Public view of the selected provider. Never carries the secret itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub has_api_key: bool,
    /// `env:NAME`, `inline`, or `none`.
    pub secret_source: String,
}

impl ProviderInfo {
    pub fn mock() -> Self {
        Self {
            provider: PROVIDER_MOCK.to_string(),
            model: None,
            has_api_key: false,
            secret_source: "none".to_string(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().join(".frontswatch").join("config.toml"))
}

impl Config {
    /// Load from `path`, then `$FRONTSWATCH_CONFIG`, then
    /// `~/.frontswatch/config.toml`. Only the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Load(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("no config file found; using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) =
            std::env::var("FRONTSWATCH_LLM_PROVIDER").or_else(|_| std::env::var("LLM_PROVIDER"))
            && !provider.trim().is_empty()
        {
            self.llm.provider = provider.trim().to_lowercase();
        }

        if let Ok(model) = std::env::var("FRONTSWATCH_GEMINI_MODEL")
            && !model.is_empty()
        {
            self.llm.gemini.model = model;
        }

        if let Ok(host) = std::env::var("FRONTSWATCH_GATEWAY_HOST")
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(port_str) =
            std::env::var("FRONTSWATCH_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }
    }

    /// Reject configurations that would reach a provider half-configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.llm.provider.as_str() {
            PROVIDER_MOCK => {}
            PROVIDER_GEMINI => {
                if self.llm.gemini.model.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "llm.gemini.model must not be empty".to_string(),
                    ));
                }
                self.llm.gemini.resolve_api_key()?;
            }
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown llm.provider \"{other}\" (expected \"mock\" or \"gemini\")"
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be within 0..=2 (got {})",
                self.llm.temperature
            )));
        }
        if self.evolution.top_k == 0 {
            return Err(ConfigError::Validation(
                "evolution.top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider_info(&self) -> ProviderInfo {
        if self.llm.is_mock() {
            return ProviderInfo::mock();
        }
        let gemini = &self.llm.gemini;
        ProviderInfo {
            provider: self.llm.provider.clone(),
            model: Some(gemini.model.clone()),
            has_api_key: gemini.resolve_api_key().is_ok(),
            secret_source: gemini.secret_source(),
        }
    }
}

impl GeminiConfig {
    /// Env var named by `api_key_env` when set, else the inline key.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(env) = self.api_key_env.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            return std::env::var(env)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingSecret {
                    label: "llm.gemini.api_key_env".to_string(),
                    env: env.to_string(),
                });
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::Validation(
                    "llm.gemini requires api_key_env or api_key".to_string(),
                )
            })
    }

    pub fn secret_source(&self) -> String {
        match (self.api_key_env.as_deref(), self.api_key.as_deref()) {
            (Some(env), _) if !env.trim().is_empty() => format!("env:{}", env.trim()),
            (_, Some(key)) if !key.trim().is_empty() => "inline".to_string(),
            _ => "none".to_string(),
        }
    }
}
