//! Tool Executor port
//!
//! Defines how the phase loop reaches tools: by name, through either the
//! full registry or a phase-scoped view of it.

use async_trait::async_trait;
use serde_json::Value;
use tradegate_domain::{ToolCall, ToolDescriptor, ToolResult};

/// Port for tool execution
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Descriptor of a visible tool
    fn descriptor(&self, name: &str) -> Option<&ToolDescriptor>;

    /// Names of all visible tools, sorted
    fn tool_names(&self) -> Vec<&str>;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }

    /// Catalogue in the shape the planning service expects, sorted by name
    fn descriptors(&self) -> Vec<Value> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| self.descriptor(name))
            .map(ToolDescriptor::to_planner_schema)
            .collect()
    }

    /// Validate and dispatch a call. Never panics and never returns a raw
    /// handler error: every outcome is a [`ToolResult`].
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
