use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::conversation::ConversationManager;
use crate::executor::ToolExecutor;
use crate::models::message::Message;
use crate::providers::base::Provider;
use crate::registry::ToolRegistry;
use crate::strategy::{detect_strategy, ExecutionStrategy, ExecutionVerdict, StrategyKind};
use crate::tracker::CostTracker;

/// Response text of a run that hit the iteration cap
pub const INCOMPLETE_RESPONSE: &str = "[Agent reached max iterations - task may be incomplete]";

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Outcome of one [`Agent::run`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRunResult {
    pub response: String,
    /// Model calls made during the run
    pub iterations: usize,
    /// Conversation cost so far, in dollars
    pub total_cost: f64,
    pub tool_calls_made: usize,
    pub conversation: Vec<Message>,
}

impl AgentRunResult {
    /// Whether the run stopped at the iteration cap instead of finishing
    pub fn is_incomplete(&self) -> bool {
        self.response == INCOMPLETE_RESPONSE
    }
}

/// Agent drives a model through repeated chat calls, executing the tools it
/// asks for until it produces a final answer or runs out of iterations
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: Option<ToolRegistry>,
    max_iterations: usize,
    strategy: Box<dyn ExecutionStrategy>,
    conversation: ConversationManager,
    tracker: CostTracker,
}

impl Agent {
    /// Create a new Agent. The execution strategy is chosen from the tools
    /// declared at this point.
    pub fn new(provider: Box<dyn Provider>, tools: Option<ToolRegistry>) -> Self {
        let schemas = tools
            .as_ref()
            .map(ToolRegistry::to_schemas)
            .unwrap_or_default();
        let strategy = detect_strategy(&schemas);
        tracing::debug!(strategy = %strategy.kind(), tools = schemas.len(), "Agent created");

        Self {
            provider,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            strategy,
            conversation: ConversationManager::new(),
            tracker: CostTracker::new(),
        }
    }

    /// Cap on model calls per run; zero is raised to one
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        if max_iterations == 0 {
            tracing::warn!("max_iterations must be positive, using 1");
        }
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Replace the detected execution strategy
    pub fn with_strategy(mut self, strategy: Box<dyn ExecutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Send a prompt and loop until the model is done or the iteration cap is hit.
    ///
    /// Tool failures are reported back to the model as tool results; only
    /// provider failures end the run with an error.
    pub async fn run(&mut self, prompt: &str) -> Result<AgentRunResult> {
        let empty = ToolRegistry::new();
        let registry = self.tools.as_ref().unwrap_or(&empty);
        let schemas = registry.to_schemas();
        let offered = (!schemas.is_empty()).then_some(schemas.as_slice());
        let executor = ToolExecutor::new(registry);

        tracing::info!(
            strategy = %self.strategy.kind(),
            max_iterations = self.max_iterations,
            "Agent run started"
        );
        self.conversation.add_user(prompt);

        let mut iterations = 0;
        let mut tool_calls_made = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let response = self
                .provider
                .chat(self.conversation.history(), offered)
                .await?;

            let cost = self.provider.get_cost(response.usage.as_ref());
            self.tracker
                .add(cost, json!({ "iteration": iterations }).as_object().cloned());
            tracing::debug!(
                iteration = iterations,
                cost,
                tool_calls = response.tool_calls().len(),
                "Model responded"
            );

            match self.strategy.handle_response(&response, &schemas) {
                ExecutionVerdict::Continue(calls) => {
                    self.conversation
                        .add_tool_calls(response.text.clone(), calls.clone());
                    for call in &calls {
                        let result = executor.execute(call).await;
                        self.conversation.add_tool_result(call.id.clone(), result);
                        tool_calls_made += 1;
                    }
                }
                ExecutionVerdict::Done(content) => {
                    let final_text = if content.is_empty() {
                        response.text
                    } else {
                        content
                    };
                    self.conversation.add_assistant(final_text.clone());
                    tracing::info!(
                        iterations,
                        tool_calls_made,
                        total_cost = self.tracker.total(),
                        "Agent run completed"
                    );
                    return Ok(self.result(final_text, iterations, tool_calls_made));
                }
            }
        }

        tracing::warn!(
            iterations,
            tool_calls_made,
            "Agent reached max iterations"
        );
        Ok(self.result(INCOMPLETE_RESPONSE.to_string(), iterations, tool_calls_made))
    }

    fn result(&self, response: String, iterations: usize, tool_calls_made: usize) -> AgentRunResult {
        AgentRunResult {
            response,
            iterations,
            total_cost: self.tracker.total(),
            tool_calls_made,
            conversation: self.conversation.history().to_vec(),
        }
    }

    /// Forget the conversation and its cost; tools, strategy and cap are kept
    pub fn reset(&mut self) {
        self.conversation.reset();
        self.tracker.reset();
    }

    pub fn conversation(&self) -> &[Message] {
        self.conversation.history()
    }

    pub fn total_cost(&self) -> f64 {
        self.tracker.total()
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.tracker
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tools(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref()
    }

    /// Registry for registering tools after construction. The strategy is not
    /// re-derived.
    pub fn tools_mut(&mut self) -> Option<&mut ToolRegistry> {
        self.tools.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ToolCallRequest;
    use crate::models::role::Role;
    use crate::providers::base::{ProviderResponse, Usage};
    use crate::providers::mock::MockProvider;
    use crate::strategy::PlatformStrategy;
    use crate::tool::{ParamType, ToolFunction};

    fn add_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_function(
            ToolFunction::from_fn("add", |args| {
                Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
            })
            .param("a", ParamType::Integer)
            .param("b", ParamType::Integer),
            Some("Add two integers"),
        );
        registry
    }

    fn usage() -> Usage {
        Usage::new(Some(100), Some(10), Some(110))
    }

    fn add_call(id: &str, arguments: &str) -> ProviderResponse {
        ProviderResponse::text("")
            .with_tool_calls(vec![ToolCallRequest::new(id, "add", arguments)])
            .with_usage(usage())
    }

    #[tokio::test]
    async fn test_add_scenario() -> Result<()> {
        let provider = MockProvider::new(vec![
            add_call("call_1", r#"{"a": 2, "b": 3}"#),
            ProviderResponse::text("The answer is 5").with_usage(usage()),
        ])
        .with_cost_per_call(0.5);
        let recorder = provider.clone();

        let mut agent = Agent::new(Box::new(provider), Some(add_registry()));
        let result = agent.run("add 2 and 3").await?;

        assert_eq!(result.response, "The answer is 5");
        assert_eq!(result.iterations, 2);
        assert_eq!(result.tool_calls_made, 1);
        assert_eq!(result.total_cost, 1.0);
        assert!(!result.is_incomplete());

        let roles: Vec<Role> = result.conversation.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(result.conversation[2].content, "5");
        assert_eq!(result.conversation[2].tool_call_id.as_deref(), Some("call_1"));

        let requests = recorder.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_at_max_iterations() -> Result<()> {
        let provider = MockProvider::repeating(add_call("loop", r#"{"a": 1, "b": 1}"#));
        let recorder = provider.clone();

        let mut agent =
            Agent::new(Box::new(provider), Some(add_registry())).with_max_iterations(3);
        let result = agent.run("never stop").await?;

        assert_eq!(result.response, INCOMPLETE_RESPONSE);
        assert!(result.is_incomplete());
        assert_eq!(result.iterations, 3);
        assert_eq!(result.tool_calls_made, 3);
        assert_eq!(recorder.requests().len(), 3);
        // user + 3 x (assistant call, tool result)
        assert_eq!(result.conversation.len(), 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_arguments_become_tool_result() -> Result<()> {
        let provider = MockProvider::new(vec![
            add_call("bad", "{bad"),
            ProviderResponse::text("Sorry, let me fix that"),
        ]);
        let recorder = provider.clone();

        let mut agent = Agent::new(Box::new(provider), Some(add_registry()));
        let result = agent.run("add things").await?;

        assert_eq!(result.iterations, 2);
        assert_eq!(result.response, "Sorry, let me fix that");
        let tool_result = &result.conversation[2];
        assert_eq!(tool_result.role, Role::Tool);
        assert!(tool_result.content.contains("Error"));
        // the follow-up request carried the error back to the model
        assert_eq!(recorder.requests()[1].messages[2].content, tool_result.content);
        Ok(())
    }

    #[tokio::test]
    async fn test_done_on_first_response_without_tools() -> Result<()> {
        let provider = MockProvider::new(vec![ProviderResponse::text("hello there")]);
        let recorder = provider.clone();

        let mut agent = Agent::new(Box::new(provider), None);
        assert_eq!(agent.strategy(), StrategyKind::Local);
        let result = agent.run("hi").await?;

        assert_eq!(result.iterations, 1);
        assert_eq!(result.tool_calls_made, 0);
        assert_eq!(result.response, "hello there");
        assert!(recorder.requests()[0].tools.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() -> Result<()> {
        let provider = MockProvider::new(vec![
            ProviderResponse::text("").with_tool_calls(vec![ToolCallRequest::new(
                "x",
                "launch_rockets",
                "{}",
            )]),
            ProviderResponse::text("I cannot do that"),
        ]);

        let mut agent = Agent::new(Box::new(provider), Some(add_registry()));
        let result = agent.run("launch").await?;
        assert_eq!(result.conversation[2].content, "Error: Tool 'launch_rockets' not found");
        assert_eq!(result.tool_calls_made, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut agent = Agent::new(
            Box::new(MockProvider::failing("connection refused")),
            Some(add_registry()),
        );
        let err = agent.run("hi").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_platform_strategy_ignores_tool_calls() -> Result<()> {
        let mut registry = ToolRegistry::new();
        registry.register_platform_tool("browser_search");

        let provider = MockProvider::new(vec![ProviderResponse::text("Rust 1.90 is out")
            .with_tool_calls(vec![ToolCallRequest::new("p", "browser_search", "{}")])]);
        let recorder = provider.clone();

        let mut agent = Agent::new(Box::new(provider), Some(registry));
        assert_eq!(agent.strategy(), StrategyKind::Platform);
        let result = agent.run("latest rust?").await?;

        assert_eq!(result.response, "Rust 1.90 is out");
        assert_eq!(result.tool_calls_made, 0);
        let tools = recorder.requests()[0].tools.clone().unwrap_or_default();
        assert_eq!(tools.len(), 1);
        assert!(tools[0].is_platform());
        Ok(())
    }

    #[tokio::test]
    async fn test_hybrid_strategy_detected() {
        let mut registry = add_registry();
        registry.register_platform_tool("browser_search");
        let agent = Agent::new(Box::new(MockProvider::new(vec![])), Some(registry));
        assert_eq!(agent.strategy(), StrategyKind::Hybrid);

        let agent = agent.with_strategy(Box::new(PlatformStrategy));
        assert_eq!(agent.strategy(), StrategyKind::Platform);
    }

    #[tokio::test]
    async fn test_reset_clears_conversation_and_cost() -> Result<()> {
        let provider = MockProvider::new(vec![
            ProviderResponse::text("one").with_usage(usage()),
            ProviderResponse::text("two").with_usage(usage()),
        ])
        .with_cost_per_call(0.25);

        let mut agent =
            Agent::new(Box::new(provider), Some(add_registry())).with_max_iterations(4);
        agent.run("first").await?;
        assert_eq!(agent.total_cost(), 0.25);
        assert_eq!(agent.conversation().len(), 2);

        agent.reset();
        assert_eq!(agent.total_cost(), 0.0);
        assert!(agent.conversation().is_empty());
        assert_eq!(agent.cost_tracker().call_count(), 0);
        assert_eq!(agent.max_iterations(), 4);
        assert_eq!(agent.strategy(), StrategyKind::Local);

        let result = agent.run("second").await?;
        assert_eq!(result.conversation.len(), 2);
        assert_eq!(result.total_cost, 0.25);
        Ok(())
    }

    #[tokio::test]
    async fn test_cost_accumulates_across_runs() -> Result<()> {
        let provider = MockProvider::new(vec![
            ProviderResponse::text("one").with_usage(usage()),
            ProviderResponse::text("two").with_usage(usage()),
        ])
        .with_cost_per_call(0.5);

        let mut agent = Agent::new(Box::new(provider), None);
        assert_eq!(agent.run("a").await?.total_cost, 0.5);
        assert_eq!(agent.run("b").await?.total_cost, 1.0);
        assert_eq!(agent.cost_tracker().history()[1].metadata["iteration"], 1);
        Ok(())
    }

    #[test]
    fn test_zero_max_iterations_is_clamped() {
        let agent = Agent::new(Box::new(MockProvider::new(vec![])), None).with_max_iterations(0);
        assert_eq!(agent.max_iterations(), 1);
    }
}
