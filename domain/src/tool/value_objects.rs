//! Tool domain value objects: immutable result and error types
//!
//! Handlers report `{status: success|error, result|error}`; inside the crate
//! that is a [`ToolResult`] carrying either a JSON output or a [`ToolError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error that occurred while admitting or executing a tool call.
///
/// | Code | Raised by |
/// |------|-----------|
/// | `INVALID_ARGUMENT` | Input schema validation |
/// | `NOT_FOUND` | Unknown or non-allowlisted tool |
/// | `EXECUTION_FAILED` | Handler returned an error |
/// | `HANDLER_PANIC` | Handler panicked |
/// | `OUTPUT_SCHEMA` | Handler output violated its schema |
/// | `DEPENDENCY_FAILED` | Dependency enforcer |
/// | `SAFETY_VETO` | Safety gate |
/// | `RISK_MISMATCH` | Execution-phase risk binding |
/// | `ORDER_IN_FLIGHT` | Order mutual exclusion |
/// | `DUPLICATE_EXECUTION` | Trade already has an executed order |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    /// Individual violations, when there is more than one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn not_found(tool: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("Tool not found: {}", tool.into()))
    }

    pub fn invalid_argument(errors: Vec<String>) -> Self {
        Self::new("INVALID_ARGUMENT", errors.join("; ")).with_details(errors)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn handler_panic(tool: impl Into<String>) -> Self {
        Self::new(
            "HANDLER_PANIC",
            format!("Handler for '{}' panicked", tool.into()),
        )
    }

    pub fn output_schema(errors: Vec<String>) -> Self {
        Self::new("OUTPUT_SCHEMA", errors.join("; ")).with_details(errors)
    }

    pub fn dependency_failed(errors: Vec<String>) -> Self {
        Self::new("DEPENDENCY_FAILED", errors.join("; ")).with_details(errors)
    }

    pub fn safety_veto(reason: impl Into<String>, errors: Vec<String>) -> Self {
        Self::new("SAFETY_VETO", reason).with_details(errors)
    }

    pub fn risk_mismatch(errors: Vec<String>) -> Self {
        Self::new("RISK_MISMATCH", errors.join("; ")).with_details(errors)
    }

    pub fn order_in_flight(trade_id: impl Into<String>) -> Self {
        Self::new(
            "ORDER_IN_FLIGHT",
            format!("An order for trade '{}' is already in flight", trade_id.into()),
        )
    }

    pub fn duplicate_execution(trade_id: impl Into<String>) -> Self {
        Self::new(
            "DUPLICATE_EXECUTION",
            format!("Trade '{}' already has an executed order", trade_id.into()),
        )
    }

    /// Rejections raised before dispatch (the handler never ran).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.code.as_str(),
            "DEPENDENCY_FAILED"
                | "SAFETY_VETO"
                | "RISK_MISMATCH"
                | "ORDER_IN_FLIGHT"
                | "DUPLICATE_EXECUTION"
        )
    }

    /// The handler was invoked and came back (or crashed) with this error.
    ///
    /// For order tools the side effect may already have happened.
    pub fn handler_ran(&self) -> bool {
        matches!(
            self.code.as_str(),
            "EXECUTION_FAILED" | "HANDLER_PANIC" | "OUTPUT_SCHEMA"
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution, carrying output or error information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output),
            error: None,
            duration_ms: None,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    /// Keep the raw handler output on a failed result.
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// The handler returned normally, even if its output was then refused.
    pub fn handler_returned(&self) -> bool {
        self.success || self.error.as_ref().is_some_and(|e| e.code == "OUTPUT_SCHEMA")
    }

    /// Failed or rejected before dispatch.
    pub fn is_error_or_rejection(&self) -> bool {
        !self.success
    }

    /// Wire shape handlers and operators see.
    pub fn to_wire(&self) -> Value {
        match (&self.output, &self.error) {
            (Some(output), _) if self.success => {
                serde_json::json!({"status": "success", "result": output})
            }
            (output, Some(error)) => {
                let mut wire = serde_json::json!({
                    "status": "error",
                    "error": {"code": error.code, "message": error.message, "details": error.details},
                });
                if let (Some(output), Value::Object(map)) = (output, &mut wire) {
                    map.insert("output".to_string(), output.clone());
                }
                wire
            }
            _ => serde_json::json!({"status": "error", "error": {"code": "UNKNOWN", "message": ""}}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejection_codes() {
        assert!(ToolError::dependency_failed(vec!["x".into()]).is_rejection());
        assert!(ToolError::safety_veto("no stop", vec![]).is_rejection());
        assert!(!ToolError::execution_failed("boom").is_rejection());
        assert!(!ToolError::not_found("ghost").is_rejection());
    }

    #[test]
    fn test_invalid_argument_keeps_details() {
        let err = ToolError::invalid_argument(vec!["a".into(), "b".into()]);
        assert_eq!(err.code, "INVALID_ARGUMENT");
        assert_eq!(err.message, "a; b");
        assert_eq!(err.details.len(), 2);
    }

    #[test]
    fn test_wire_shape() {
        let ok = ToolResult::success("get_quote", json!({"ltp": 95.25}));
        assert_eq!(ok.to_wire(), json!({"status": "success", "result": {"ltp": 95.25}}));

        let failed = ToolResult::failure("get_quote", ToolError::execution_failed("timeout"));
        let wire = failed.to_wire();
        assert_eq!(wire["status"], "error");
        assert_eq!(wire["error"]["code"], "EXECUTION_FAILED");
        assert!(failed.is_error_or_rejection());
        assert!(wire.get("output").is_none());
    }

    #[test]
    fn test_refused_output_is_kept_on_the_wire() {
        let result = ToolResult::failure(
            "place_order",
            ToolError::output_schema(vec!["missing required field 'order_id'".into()]),
        )
        .with_output(json!({"id": "BRK-1"}));

        assert!(!result.is_success());
        assert!(result.handler_returned());
        assert!(result.error().unwrap().handler_ran());
        let wire = result.to_wire();
        assert_eq!(wire["status"], "error");
        assert_eq!(wire["error"]["code"], "OUTPUT_SCHEMA");
        assert_eq!(wire["output"]["id"], "BRK-1");
    }

    #[test]
    fn test_handler_ran_codes() {
        assert!(ToolError::execution_failed("broker down").handler_ran());
        assert!(ToolError::handler_panic("place_order").handler_ran());
        assert!(!ToolError::invalid_argument(vec![]).handler_ran());
        assert!(!ToolError::duplicate_execution("t-1").handler_ran());

        let failed = ToolResult::failure("place_order", ToolError::execution_failed("x"));
        assert!(!failed.handler_returned());
    }
}
