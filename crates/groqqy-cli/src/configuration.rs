use config::{Config, Environment, File, FileFormat};
use groqqy::agent::DEFAULT_MAX_ITERATIONS;
use groqqy::providers::configs::{
    GroqProviderConfig, DEFAULT_HOST, DEFAULT_MODEL, GROQ_API_KEY_ENV,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing API key: set {env_var} or GROQQY_PROVIDER__API_KEY")]
    MissingApiKey { env_var: String },

    #[error("Invalid settings: {0}")]
    Other(#[from] config::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ProviderSettings {
    /// Convert to the groqqy provider config. The API key falls back to `GROQ_API_KEY`.
    pub fn into_config(
        self,
        system_instruction: Option<String>,
    ) -> Result<GroqProviderConfig, ConfigError> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(GROQ_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                env_var: GROQ_API_KEY_ENV.to_string(),
            })?;

        Ok(GroqProviderConfig {
            host: self.host,
            api_key,
            model: self.model,
            system_instruction,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl Settings {
    /// Defaults, then the config file when it exists, then `GROQQY_*` variables
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("agent.max_iterations", default_max_iterations() as u64)?
            .set_default("provider.host", default_host())?
            .set_default("provider.model", default_model())?;

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "Loading settings file");
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let config = builder
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("GROQQY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
