use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::{Message, ToolCallRequest};
use crate::models::tool::ToolSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// What a provider returns for one chat call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    /// Assistant text, empty when the model only requested tools
    pub text: String,
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Base trait for chat-completion providers (Groq, mocks, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the conversation so far, offering `tools` when given
    async fn chat(&self, messages: &[Message], tools: Option<&[ToolSchema]>)
        -> Result<ProviderResponse>;

    /// Dollar cost of a call; zero when usage is absent or the model has no known price
    fn get_cost(&self, usage: Option<&Usage>) -> f64;
}
