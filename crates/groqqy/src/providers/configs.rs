use crate::errors::ProviderError;

pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_HOST: &str = "https://api.groq.com/openai";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Settings for the Groq chat-completion endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct GroqProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    /// Prepended to every request as a system message
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl GroqProviderConfig {
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Default configuration keyed from `GROQ_API_KEY`
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var(GROQ_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(GROQ_API_KEY_ENV.to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_system_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        let instruction = instruction.into();
        self.system_instruction = (!instruction.is_empty()).then_some(instruction);
        self
    }
}
