//! Planner directives: the structured output of one planning step.

use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One tool call inside a `tool_batch` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// What the planner wants to do next.
///
/// Wire shape: `{"action": "tool_call" | "tool_batch" | "final", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannerDirective {
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        tool: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    ToolBatch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        calls: Vec<BatchCall>,
    },
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        output: Value,
    },
}

impl PlannerDirective {
    /// Parse a raw planner payload. Malformed payloads become error strings.
    pub fn parse(raw: &Value) -> Result<Self, Vec<String>> {
        let directive: PlannerDirective = serde_json::from_value(raw.clone())
            .map_err(|e| vec![format!("Malformed planner directive: {}", e)])?;
        if let PlannerDirective::ToolBatch { calls, .. } = &directive
            && calls.is_empty()
        {
            return Err(vec!["tool_batch directive has no calls".to_string()]);
        }
        Ok(directive)
    }

    pub fn thought(&self) -> Option<&str> {
        match self {
            PlannerDirective::ToolCall { thought, .. }
            | PlannerDirective::ToolBatch { thought, .. }
            | PlannerDirective::Final { thought, .. } => thought.as_deref(),
        }
    }

    pub fn action(&self) -> &str {
        match self {
            PlannerDirective::ToolCall { .. } => "tool_call",
            PlannerDirective::ToolBatch { .. } => "tool_batch",
            PlannerDirective::Final { .. } => "final",
        }
    }

    /// Requested calls in order (empty for `final`).
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        let reasoning = self.thought().map(str::to_string);
        let build = |tool: &str, arguments: &Map<String, Value>| ToolCall {
            tool_name: tool.to_string(),
            arguments: arguments.clone(),
            reasoning: reasoning.clone(),
        };
        match self {
            PlannerDirective::ToolCall { tool, arguments, .. } => vec![build(tool, arguments)],
            PlannerDirective::ToolBatch { calls, .. } => {
                calls.iter().map(|c| build(&c.tool, &c.arguments)).collect()
            }
            PlannerDirective::Final { .. } => Vec::new(),
        }
    }
}
