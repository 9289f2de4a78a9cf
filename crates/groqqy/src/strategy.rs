use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::message::ToolCallRequest;
use crate::models::tool::ToolSchema;
use crate::providers::base::ProviderResponse;

/// Which execution model the declared tools call for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Tools run here and their results are fed back to the model
    Local,
    /// Tools run on the model's backend; results are already in the response text
    Platform,
    /// Both kinds were declared
    Hybrid,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Local => "local",
            StrategyKind::Platform => "platform",
            StrategyKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy's decision about a model response
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionVerdict {
    /// Execute these calls, feed the results back and ask the model again
    Continue(Vec<ToolCallRequest>),
    /// The interaction is complete with this final content
    Done(String),
}

impl ExecutionVerdict {
    pub fn needs_continuation(&self) -> bool {
        matches!(self, ExecutionVerdict::Continue(_))
    }

    /// Final content; empty while continuation is needed
    pub fn content(&self) -> &str {
        match self {
            ExecutionVerdict::Continue(_) => "",
            ExecutionVerdict::Done(content) => content,
        }
    }

    /// Calls to execute; empty once done
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            ExecutionVerdict::Continue(calls) => calls,
            ExecutionVerdict::Done(_) => &[],
        }
    }
}

/// Decides, per model response, whether local execution is still required
pub trait ExecutionStrategy: Send + Sync {
    fn handle_response(&self, response: &ProviderResponse, tools: &[ToolSchema])
        -> ExecutionVerdict;

    fn kind(&self) -> StrategyKind;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStrategy;

impl ExecutionStrategy for LocalStrategy {
    fn handle_response(&self, response: &ProviderResponse, _tools: &[ToolSchema]) -> ExecutionVerdict {
        match &response.tool_calls {
            Some(calls) if !calls.is_empty() => ExecutionVerdict::Continue(calls.clone()),
            _ => ExecutionVerdict::Done(response.text.clone()),
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformStrategy;

impl ExecutionStrategy for PlatformStrategy {
    fn handle_response(&self, response: &ProviderResponse, _tools: &[ToolSchema]) -> ExecutionVerdict {
        ExecutionVerdict::Done(response.text.clone())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Platform
    }
}

/// Local and platform tools side by side.
///
/// A response without tool calls cannot tell "a platform tool already ran"
/// apart from "nothing left to do"; both end the interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridStrategy {
    local: LocalStrategy,
}

impl ExecutionStrategy for HybridStrategy {
    fn handle_response(&self, response: &ProviderResponse, tools: &[ToolSchema]) -> ExecutionVerdict {
        let (local, platform): (Vec<ToolSchema>, Vec<ToolSchema>) =
            tools.iter().cloned().partition(ToolSchema::is_local);
        tracing::debug!(
            local_tools = local.len(),
            platform_tools = platform.len(),
            "Evaluating hybrid response"
        );

        if response.has_tool_calls() {
            return self.local.handle_response(response, &local);
        }
        ExecutionVerdict::Done(response.text.clone())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }
}

/// Pick the strategy for a set of declared tools
pub fn detect_strategy(tools: &[ToolSchema]) -> Box<dyn ExecutionStrategy> {
    let has_local = tools.iter().any(ToolSchema::is_local);
    let has_platform = tools.iter().any(ToolSchema::is_platform);

    match (has_local, has_platform) {
        (true, true) => Box::new(HybridStrategy::default()),
        (false, true) => Box::new(PlatformStrategy),
        _ => Box::new(LocalStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local(name: &str) -> ToolSchema {
        ToolSchema::function(name, "", json!({"type": "object"}))
    }

    fn response(text: &str, calls: Option<Vec<ToolCallRequest>>) -> ProviderResponse {
        ProviderResponse {
            text: text.to_string(),
            tool_calls: calls,
            usage: None,
        }
    }

    #[test]
    fn test_detect_strategy() {
        assert_eq!(detect_strategy(&[]).kind(), StrategyKind::Local);
        assert_eq!(
            detect_strategy(&[local("a"), local("b")]).kind(),
            StrategyKind::Local
        );
        assert_eq!(
            detect_strategy(&[ToolSchema::platform("browser_search")]).kind(),
            StrategyKind::Platform
        );
        assert_eq!(
            detect_strategy(&[local("a"), ToolSchema::platform("browser_search")]).kind(),
            StrategyKind::Hybrid
        );
    }

    #[test]
    fn test_local_continues_on_tool_calls() {
        let calls = vec![ToolCallRequest::new("1", "a", "{}")];
        let verdict = LocalStrategy.handle_response(&response("", Some(calls.clone())), &[]);
        assert!(verdict.needs_continuation());
        assert_eq!(verdict.tool_calls(), calls.as_slice());
        assert_eq!(verdict.content(), "");
    }

    #[test]
    fn test_local_done_without_tool_calls() {
        let verdict = LocalStrategy.handle_response(&response("done", None), &[]);
        assert_eq!(verdict, ExecutionVerdict::Done("done".to_string()));

        let verdict = LocalStrategy.handle_response(&response("still done", Some(vec![])), &[]);
        assert!(!verdict.needs_continuation());
        assert_eq!(verdict.content(), "still done");
    }

    #[test]
    fn test_platform_is_always_done() {
        let calls = vec![ToolCallRequest::new("1", "a", "{}")];
        let verdict =
            PlatformStrategy.handle_response(&response("searched the web", Some(calls)), &[]);
        assert_eq!(verdict, ExecutionVerdict::Done("searched the web".to_string()));
    }

    #[test]
    fn test_hybrid() {
        let tools = [local("a"), ToolSchema::platform("browser_search")];
        let strategy = HybridStrategy::default();

        let calls = vec![ToolCallRequest::new("1", "a", "{}")];
        let verdict = strategy.handle_response(&response("", Some(calls.clone())), &tools);
        assert_eq!(verdict, ExecutionVerdict::Continue(calls));

        let verdict = strategy.handle_response(&response("found it online", None), &tools);
        assert_eq!(verdict, ExecutionVerdict::Done("found it online".to_string()));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StrategyKind::Hybrid.to_string(), "hybrid");
    }
}
