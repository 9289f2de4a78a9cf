use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that happen while resolving or running a tool call.
///
/// These never abort an agent run: the executor folds them into the text of
/// the tool result so the model can read them and react.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures at the provider boundary. These propagate out of a run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} environment variable required")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model produced a malformed tool call: {0}")]
    ToolUseFailed(String),
}
