pub mod agent;
pub mod conversation;
pub mod developer;
pub mod errors;
pub mod executor;
pub mod exporter;
pub mod models;
pub mod providers;
pub mod registry;
pub mod strategy;
pub mod tool;
pub mod tracker;

pub use agent::{Agent, AgentRunResult};
pub use registry::ToolRegistry;
