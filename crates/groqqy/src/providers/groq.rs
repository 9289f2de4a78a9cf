use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Provider, ProviderResponse, Usage};
use super::configs::{GroqProviderConfig, GROQ_API_KEY_ENV};
use super::utils::{
    check_tool_use_failed, messages_to_openai_spec, openai_response_to_provider_response,
    recover_tool_calls, tools_to_openai_spec,
};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::ToolSchema;

/// Dollars per million (input, output) tokens
fn model_pricing(model: &str) -> Option<(f64, f64)> {
    match model {
        "llama-3.1-8b-instant" => Some((0.05, 0.08)),
        "llama-3.3-70b-versatile" => Some((0.59, 0.79)),
        "llama-4-scout" => Some((0.11, 0.34)),
        _ => None,
    }
}

fn token_cost(tokens: Option<i32>, cost_per_million: f64) -> f64 {
    f64::from(tokens.unwrap_or(0).max(0)) / 1_000_000.0 * cost_per_million
}

pub struct GroqProvider {
    client: Client,
    config: GroqProviderConfig,
}

impl GroqProvider {
    pub fn new(config: GroqProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey(GROQ_API_KEY_ENV.to_string()).into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_payload(&self, messages: &[Message], tools: Option<&[ToolSchema]>) -> Result<Value> {
        let messages_spec =
            messages_to_openai_spec(self.config.system_instruction.as_deref(), messages)?;

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(messages_spec));

        // Add optional parameters
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            payload.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }

        Ok(Value::Object(payload))
    }

    async fn post(&self, payload: &Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("error").cloned());

        if let Some(generation) = error.as_ref().and_then(check_tool_use_failed) {
            return Err(ProviderError::ToolUseFailed(generation));
        }

        let message = error
            .as_ref()
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(body);
        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Provider for GroqProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ProviderResponse> {
        let payload = self.build_payload(messages, tools)?;
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Sending chat request"
        );

        match self.post(&payload).await {
            Ok(response) => openai_response_to_provider_response(&response),
            Err(ProviderError::ToolUseFailed(generation)) => {
                let declared: Vec<&str> = tools
                    .unwrap_or_default()
                    .iter()
                    .filter_map(ToolSchema::name)
                    .collect();
                let calls = recover_tool_calls(&generation, &declared);
                if calls.is_empty() {
                    tracing::error!(generation = %generation, "Could not recover malformed tool call");
                    return Err(ProviderError::ToolUseFailed(generation).into());
                }
                tracing::warn!(recovered = calls.len(), "Recovered malformed tool calls");
                Ok(ProviderResponse::text("").with_tool_calls(calls))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_cost(&self, usage: Option<&Usage>) -> f64 {
        match (usage, model_pricing(&self.config.model)) {
            (Some(usage), Some((input_price, output_price))) => {
                token_cost(usage.input_tokens, input_price)
                    + token_cost(usage.output_tokens, output_price)
            }
            _ => 0.0,
        }
    }
}
