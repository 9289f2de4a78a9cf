use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::models::tool::ToolSchema;
use crate::providers::base::{Provider, ProviderResponse, Usage};

/// What the mock saw on one call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolSchema>>,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, String>>>>,
    repeat_last: Option<ProviderResponse>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    cost_per_call: f64,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            repeat_last: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            cost_per_call: 0.0,
        }
    }

    /// A provider that answers every call with the same response
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            repeat_last: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// A provider whose next call fails
    pub fn failing<S: Into<String>>(message: S) -> Self {
        let provider = Self::new(Vec::new());
        provider
            .responses
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
        provider
    }

    pub fn with_cost_per_call(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }

    /// Requests received so far; clones share the log
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ProviderResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.map(<[ToolSchema]>::to_vec),
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            // Return empty response if no more pre-configured responses
            None => Ok(self
                .repeat_last
                .clone()
                .unwrap_or_else(|| ProviderResponse::text(""))),
        }
    }

    fn get_cost(&self, usage: Option<&Usage>) -> f64 {
        usage.map_or(0.0, |_| self.cost_per_call)
    }
}
