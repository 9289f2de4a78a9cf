use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use super::base::{ProviderResponse, Usage};
use crate::errors::ProviderError;
use crate::models::message::{Message, ToolCallRequest};
use crate::models::tool::ToolSchema;

lazy_static! {
    // Matches both `<function=NAME>{..}</function>` and `<function=NAME{..}></function>`
    static ref FUNCTION_TAG: Regex =
        Regex::new(r"(?s)<function=([a-zA-Z0-9_-]+)>?\s*(\{.*?\})\s*>?\s*</function>")
            .expect("valid regex");
}

/// Convert the conversation to the chat-completions message list, with the
/// system instruction first when there is one
pub fn messages_to_openai_spec(system: Option<&str>, messages: &[Message]) -> Result<Vec<Value>> {
    let mut spec = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        spec.push(json!({"role": "system", "content": system}));
    }
    for message in messages {
        spec.push(serde_json::to_value(message)?);
    }
    Ok(spec)
}

/// Convert declared tools to the chat-completions tool list
pub fn tools_to_openai_spec(tools: &[ToolSchema]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::with_capacity(tools.len());

    for tool in tools {
        if let Some(name) = tool.name() {
            if !tool_names.insert(name) {
                return Err(anyhow!("Duplicate tool name: {}", name));
            }
        }
        result.push(serde_json::to_value(tool)?);
    }

    Ok(result)
}

pub fn get_usage(data: &Value) -> Option<Usage> {
    let usage = data.get("usage").filter(|u| u.is_object())?;

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Some(Usage::new(input_tokens, output_tokens, total_tokens))
}

/// Convert a chat-completions response body to a [`ProviderResponse`]
pub fn openai_response_to_provider_response(response: &Value) -> Result<ProviderResponse> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = match message.get("tool_calls").and_then(Value::as_array) {
        Some(calls) => Some(
            calls
                .iter()
                .enumerate()
                .map(|(position, call)| parse_tool_call(position, call))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    Ok(ProviderResponse {
        text,
        tool_calls,
        usage: get_usage(response),
    })
}

/// Calls the backend sent without an id get one derived from their position
fn parse_tool_call(position: usize, call: &Value) -> Result<ToolCallRequest, ProviderError> {
    let name = call["function"]["name"].as_str().ok_or_else(|| {
        ProviderError::InvalidResponse(format!("tool call {} has no function name", position))
    })?;
    let arguments = arguments_text(&call["function"]["arguments"]);
    let id = match call["id"].as_str().filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => tool_call_id(position, name, &arguments),
    };
    Ok(ToolCallRequest::new(id, name, arguments))
}

/// Argument payloads are JSON text on the wire, but some backends send an object
fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The rejected generation, if the error body reports a malformed tool call
pub fn check_tool_use_failed(error: &Value) -> Option<String> {
    let code = error.get("code")?.as_str()?;
    if code != "tool_use_failed" {
        return None;
    }
    let generation = error
        .get("failed_generation")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(generation.to_string())
}

/// Deterministic id for a synthesized call. The position keeps identical
/// calls in one response apart.
pub fn tool_call_id(position: usize, name: &str, arguments: &str) -> String {
    let digest = Sha256::digest(format!("{}{}{}", position, name, arguments).as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("call_{}", &hex[..16])
}

/// Best-effort recovery of tool calls from a generation the API rejected.
///
/// Only calls naming one of `declared` with an object argument payload
/// are kept.
pub fn recover_tool_calls(failed_generation: &str, declared: &[&str]) -> Vec<ToolCallRequest> {
    let mut candidates: Vec<(String, Value)> = FUNCTION_TAG
        .captures_iter(failed_generation)
        .filter_map(|captures| {
            let arguments = serde_json::from_str(&captures[2]).ok()?;
            Some((captures[1].to_string(), arguments))
        })
        .collect();

    if candidates.is_empty() {
        candidates = json_candidates(failed_generation);
    }

    candidates
        .into_iter()
        .filter(|(name, arguments)| {
            let accepted = declared.contains(&name.as_str()) && arguments.is_object();
            if !accepted {
                tracing::warn!(tool = %name, "Discarding unrecoverable tool call");
            }
            accepted
        })
        .enumerate()
        .map(|(position, (name, arguments))| {
            let arguments = arguments.to_string();
            ToolCallRequest::new(tool_call_id(position, &name, &arguments), name, arguments)
        })
        .collect()
}

/// `{"name": .., "arguments": ..}` objects, alone or in a list
fn json_candidates(text: &str) -> Vec<(String, Value)> {
    let (Some(start), Some(end)) = (text.find(['{', '[']), text.rfind(['}', ']'])) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    let Ok(parsed) = serde_json::from_str::<Value>(&text[start..=end]) else {
        return Vec::new();
    };

    let items = match parsed {
        Value::Array(items) => items,
        single => vec![single],
    };
    items
        .into_iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            let arguments = match item.get("arguments").or_else(|| item.get("parameters")) {
                Some(Value::String(text)) => serde_json::from_str(text).ok()?,
                Some(value) => value.clone(),
                None => json!({}),
            };
            Some((name, arguments))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "example_fn",
                        "arguments": "{\"param\": \"value\"}"
                    }
                }]
            }
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 25
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() -> Result<()> {
        let messages = vec![
            Message::user("Hello"),
            Message::assistant_with_tool_calls("", vec![ToolCallRequest::new("c1", "add", "{}")]),
            Message::tool_result("c1", "5"),
        ];
        let spec = messages_to_openai_spec(Some("Be helpful"), &messages)?;

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0], json!({"role": "system", "content": "Be helpful"}));
        assert_eq!(spec[1]["content"], "Hello");
        assert_eq!(spec[2]["tool_calls"][0]["function"]["name"], "add");
        assert_eq!(spec[3]["tool_call_id"], "c1");

        let spec = messages_to_openai_spec(None, &messages[..1])?;
        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let tools = vec![
            ToolSchema::function("test_tool", "A test tool", json!({"type": "object"})),
            ToolSchema::platform("browser_search"),
        ];
        let spec = tools_to_openai_spec(&tools)?;
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        assert_eq!(spec[1], json!({"type": "browser_search"}));
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let tool = ToolSchema::function("test_tool", "", json!({"type": "object"}));
        let result = tools_to_openai_spec(&[tool.clone(), tool]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_response_with_tool_calls() -> Result<()> {
        let response: Value = serde_json::from_str(TOOL_USE_RESPONSE)?;
        let parsed = openai_response_to_provider_response(&response)?;

        assert_eq!(parsed.text, "");
        assert_eq!(parsed.tool_calls().len(), 1);
        assert_eq!(parsed.tool_calls()[0].name(), "example_fn");
        assert_eq!(parsed.tool_calls()[0].arguments(), r#"{"param": "value"}"#);
        let usage = parsed.usage.expect("usage");
        assert_eq!(usage.total_tokens, Some(35));
        Ok(())
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let result = openai_response_to_provider_response(&json!({"choices": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_tool_use_failed() {
        let error = json!({
            "message": "Failed to call a function",
            "code": "tool_use_failed",
            "failed_generation": "<function=add>{\"a\": 1}</function>"
        });
        assert_eq!(
            check_tool_use_failed(&error).as_deref(),
            Some("<function=add>{\"a\": 1}</function>")
        );
        assert!(check_tool_use_failed(&json!({"code": "rate_limited"})).is_none());
    }

    #[test]
    fn test_tool_call_id_is_stable() {
        let id = tool_call_id(0, "add", r#"{"a":1}"#);
        assert!(id.starts_with("call_"));
        assert_eq!(id.len(), "call_".len() + 16);
        assert_eq!(id, tool_call_id(0, "add", r#"{"a":1}"#));
        assert_ne!(id, tool_call_id(0, "add", r#"{"a":2}"#));
        assert_ne!(id, tool_call_id(1, "add", r#"{"a":1}"#));
    }

    #[test]
    fn test_recovered_duplicate_calls_get_distinct_ids() {
        let generation = r#"<function=add>{"a": 1}</function><function=add>{"a": 1}</function>"#;
        let calls = recover_tool_calls(generation, &["add"]);

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments(), calls[1].arguments());
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn test_tool_calls_without_ids_get_distinct_ids() -> Result<()> {
        let response = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"type": "function", "function": {"name": "add", "arguments": "{}"}},
                    {"id": "", "type": "function", "function": {"name": "add", "arguments": "{}"}},
                    {"id": "call_kept", "type": "function", "function": {"name": "add", "arguments": "{}"}}
                ]
            }}]
        });
        let calls = openai_response_to_provider_response(&response)?
            .tool_calls
            .unwrap_or_default();

        assert_eq!(calls.len(), 3);
        assert!(calls[0].id.starts_with("call_"));
        assert!(calls[1].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(calls[2].id, "call_kept");
        Ok(())
    }

    #[test]
    fn test_recover_function_tags() {
        let generation = r#"<function=add>{"a": 2, "b": 3}</function> and <function=read_file{"file_path": "x"}></function>"#;
        let calls = recover_tool_calls(generation, &["add", "read_file"]);

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name(), "add");
        assert_eq!(calls[0].parse_arguments().unwrap(), json!({"a": 2, "b": 3}));
        assert_eq!(calls[1].name(), "read_file");
        assert!(calls[1].id.starts_with("call_"));
    }

    #[test]
    fn test_recover_json_form() {
        let generation = r#"Sure: {"name": "add", "arguments": {"a": 1, "b": 1}}"#;
        let calls = recover_tool_calls(generation, &["add"]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parse_arguments().unwrap(), json!({"a": 1, "b": 1}));

        let generation = r#"[{"name": "add", "arguments": "{\"a\": 4}"}]"#;
        let calls = recover_tool_calls(generation, &["add"]);
        assert_eq!(calls[0].parse_arguments().unwrap(), json!({"a": 4}));
    }

    #[test]
    fn test_recover_never_invents_undeclared_tools() {
        let generation = r#"<function=rm_rf>{"path": "/"}</function>"#;
        assert!(recover_tool_calls(generation, &["add"]).is_empty());
        assert!(recover_tool_calls("just some prose", &["add"]).is_empty());
        assert!(recover_tool_calls(r#"<function=add>{bad}</function>"#, &["add"]).is_empty());
    }
}
