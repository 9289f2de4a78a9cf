use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use crate::errors::AgentError;
use crate::models::message::ToolCallRequest;
use crate::registry::ToolRegistry;

const PREVIEW_ARGS: usize = 2;
const ARG_PREVIEW_CHARS: usize = 50;
const RESULT_PREVIEW_CHARS: usize = 100;

/// Runs tool calls against a registry.
///
/// Every outcome, including bad arguments, unknown tools and failing or
/// panicking tools, comes back as result text for the model to read.
pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute a single tool call and return its result text
    pub async fn execute(&self, call: &ToolCallRequest) -> String {
        let name = call.name();

        let arguments = match call.parse_arguments() {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Argument parsing failed");
                return format!("Error parsing arguments for {}: {}", name, e);
            }
        };

        let Some(tool) = self.registry.get(name) else {
            tracing::error!(tool = %name, "Tool not found");
            return format!("Error: {}", AgentError::ToolNotFound(name.to_string()));
        };

        tracing::info!(tool = %describe_call(name, &arguments), "Executing tool");
        tracing::debug!(tool = %name, args = %arguments, "Tool execution started");

        let start = Instant::now();
        let outcome = AssertUnwindSafe(async { tool.execute(arguments).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(AgentError::Internal(format!(
                    "tool panicked: {}",
                    panic_message(panic.as_ref())
                ))
                .into())
            });
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(value) => {
                let result = render(value);
                tracing::info!(
                    tool = %name,
                    duration_ms,
                    result_length = result.len(),
                    result_preview = %truncate(&result, RESULT_PREVIEW_CHARS),
                    "Tool execution succeeded"
                );
                result
            }
            Err(e) => {
                tracing::error!(
                    tool = %name,
                    duration_ms,
                    error = %e,
                    "Tool execution failed"
                );
                format!("Error executing {}: {}", name, e)
            }
        }
    }

    /// Execute calls one after the other, in order, pairing each result with its call id
    pub async fn execute_all(&self, calls: &[ToolCallRequest]) -> Vec<(String, String)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push((call.id.clone(), self.execute(call).await));
        }
        results
    }
}

/// Textual form of a tool's return value. Strings pass through as-is and a
/// tool that returns nothing yields empty text.
fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Human-readable preview of a call for the logs
pub fn describe_call(name: &str, arguments: &Value) -> String {
    if let Some(command) = arguments.get("command").and_then(Value::as_str) {
        if name == "run_command" {
            return format!("{}('{}')", name, command);
        }
    }

    let preview = arguments
        .as_object()
        .map(|args| {
            args.iter()
                .take(PREVIEW_ARGS)
                .map(|(key, value)| {
                    format!("{}={}", key, truncate(&value.to_string(), ARG_PREVIEW_CHARS))
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    format!("{}({})", name, preview)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
