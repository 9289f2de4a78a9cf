use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function part of a local tool's schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionTag {
    #[default]
    Function,
}

/// A tool declaration as sent to the model.
///
/// `Function` tools run locally and come back as tool call requests.
/// `Platform` tools (e.g. `browser_search`) are run by the model's backend,
/// carry nothing but their type and never reach the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolSchema {
    Function {
        #[serde(rename = "type")]
        tag: FunctionTag,
        function: FunctionSchema,
    },
    Platform {
        #[serde(rename = "type")]
        tool_type: String,
    },
}

impl ToolSchema {
    pub fn function<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSchema::Function {
            tag: FunctionTag::Function,
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn platform<S: Into<String>>(tool_type: S) -> Self {
        ToolSchema::Platform {
            tool_type: tool_type.into(),
        }
    }

    /// The schema's `type` field
    pub fn schema_type(&self) -> &str {
        match self {
            ToolSchema::Function { .. } => "function",
            ToolSchema::Platform { tool_type } => tool_type,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ToolSchema::Function { .. })
    }

    pub fn is_platform(&self) -> bool {
        !self.is_local()
    }

    /// Name of a local tool; platform tools are not addressable by name
    pub fn name(&self) -> Option<&str> {
        match self {
            ToolSchema::Function { function, .. } => Some(&function.name),
            ToolSchema::Platform { .. } => None,
        }
    }
}
