use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One recorded charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub amount: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

/// Running total of what a conversation has cost so far, in dollars
#[derive(Debug, Clone, Default)]
pub struct CostTracker {
    total: f64,
    entries: Vec<CostEntry>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, amount: f64, metadata: Option<Map<String, Value>>) {
        self.total += amount;
        self.entries.push(CostEntry {
            amount,
            metadata: metadata.unwrap_or_default(),
            timestamp: Utc::now(),
        });
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn history(&self) -> &[CostEntry] {
        &self.entries
    }

    pub fn call_count(&self) -> usize {
        self.entries.len()
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.entries.clear();
    }
}
