//! Local tools the agent can invoke by name.

mod weather;

pub use weather::get_weather;

use crate::error::{ReactorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Text arguments passed to a tool.
pub type Arguments = BTreeMap<String, String>;

/// Signature every registered tool implements.
pub type ToolFn = Box<dyn Fn(&Arguments) -> Result<String> + Send + Sync>;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    pub arguments: Arguments,
}

impl ToolInvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

impl std::fmt::Display for ToolInvocationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self
            .arguments
            .iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.tool_name, args)
    }
}

/// Raw text produced by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub output: String,
}

struct Tool {
    description: String,
    handler: ToolFn,
}

/// Fixed mapping from tool name to callable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools.
    pub fn with_defaults() -> Self {
        Self::new().with_tool(
            "get_weather",
            "Get the current weather in a given location. Arguments: {\"location\": string}",
            get_weather,
        )
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn with_tool<F>(mut self, name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&Arguments) -> Result<String> + Send + Sync + 'static,
    {
        self.tools.insert(
            name.to_string(),
            Tool {
                description: description.to_string(),
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One `name: description` line per tool, for the system prompt.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|(name, tool)| format!("{}: {}", name, tool.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the requested tool.
    pub fn execute(&self, request: &ToolInvocationRequest) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(&request.tool_name)
            .ok_or_else(|| ReactorError::UnknownTool(request.tool_name.clone()))?;

        info!("Executing tool: {}", request);
        let output = (tool.handler)(&request.arguments)?;

        Ok(ToolResult {
            tool_name: request.tool_name.clone(),
            output,
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
