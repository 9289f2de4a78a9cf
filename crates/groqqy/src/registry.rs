use std::collections::HashMap;
use std::fmt;

use crate::models::tool::ToolSchema;
use crate::tool::{Tool, ToolFunction};

/// Holds the local tools an agent may execute, plus the platform tools it
/// only declares to the model.
///
/// Local tools are keyed by name and keep their registration order; platform
/// tools are never addressable by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
    platform_tools: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name in place
    pub fn register(&mut self, tool: Tool) {
        match self.index.get(&tool.name) {
            Some(&position) => {
                tracing::debug!(tool = %tool.name, "Replacing registered tool");
                self.tools[position] = tool;
            }
            None => {
                tracing::debug!(tool = %tool.name, "Registered tool");
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Derive a tool from a function's declared signature and register it
    pub fn register_function(&mut self, function: ToolFunction, description: Option<&str>) {
        self.register(Tool::from_function(function, description));
    }

    /// Declare a tool that the model's backend executes, e.g. `browser_search`
    pub fn register_platform_tool<S: Into<String>>(&mut self, tool_type: S) {
        let tool_type = tool_type.into();
        tracing::debug!(tool_type = %tool_type, "Registered platform tool");
        self.platform_tools.push(tool_type);
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    pub fn list_all(&self) -> &[Tool] {
        &self.tools
    }

    pub fn platform_tools(&self) -> &[String] {
        &self.platform_tools
    }

    /// Number of local tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.platform_tools.is_empty()
    }

    /// All local tool schemas followed by the platform tool declarations.
    /// This is exactly what the model is offered.
    pub fn to_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(Tool::to_schema)
            .chain(self.platform_tools.iter().map(ToolSchema::platform))
            .collect()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ToolRegistry({} tools: {:?})",
            self.tools.len(),
            self.list_names()
        )
    }
}
