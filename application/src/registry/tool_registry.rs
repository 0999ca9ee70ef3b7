//! Tool Registry
//!
//! The [`ToolRegistry`] owns every descriptor and its handler and implements
//! [`ToolExecutorPort`]. It is filled once at wiring time and read-only
//! afterwards.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(quote_descriptor(), handler_fn(|args| async move {
//!     broker.quote(&args).await
//! }))?;
//!
//! let result = registry.call("get_quote", &args).await;
//! ```
//!
//! # Call pipeline
//!
//! 1. Look the tool up by name (`NOT_FOUND`)
//! 2. Validate arguments against the input schema (`INVALID_ARGUMENT`,
//!    handler never invoked)
//! 3. Invoke the handler, capturing panics (`HANDLER_PANIC`) and handler
//!    errors (`EXECUTION_FAILED`)
//! 4. Validate the output against the output schema (`OUTPUT_SCHEMA`, the
//!    refused output stays on the result)
//!
//! Nothing is retried here; side effects inside a handler are the handler's
//! responsibility.

use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::tool_handler::ToolHandler;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use tradegate_domain::{DomainError, ToolCall, ToolDescriptor, ToolError, ToolResult};

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Name-keyed tool registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second registration under the same name fails and
    /// leaves the registry unchanged.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), DomainError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(DomainError::DuplicateTool(descriptor.name));
        }
        debug!(tool = %descriptor.name, risk = %descriptor.risk_level, "Registered tool");
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(
        mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, DomainError> {
        self.register(descriptor, handler)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and dispatch one call.
    pub async fn call(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::failure(name, ToolError::not_found(name));
        };

        let errors = tool.descriptor.input_schema.validate(args);
        if !errors.is_empty() {
            debug!(tool = name, ?errors, "Rejected malformed arguments");
            return ToolResult::failure(name, ToolError::invalid_argument(errors));
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.handler.handle(args))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(output)) => {
                let errors = tool.descriptor.output_schema.validate_value(&output);
                if errors.is_empty() {
                    ToolResult::success(name, output)
                } else {
                    warn!(tool = name, ?errors, "Handler output violated its schema");
                    ToolResult::failure(name, ToolError::output_schema(errors)).with_output(output)
                }
            }
            Ok(Err(message)) => ToolResult::failure(name, ToolError::execution_failed(message)),
            Err(_) => {
                warn!(tool = name, "Tool handler panicked");
                ToolResult::failure(name, ToolError::handler_panic(name))
            }
        };
        result.with_duration(elapsed)
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|t| &t.descriptor)
    }

    fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.call(&call.tool_name, &call.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_handler::handler_fn;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tradegate_domain::{FieldSpec, FieldType, RiskLevel, Schema};

    fn quote_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("get_quote", "Last traded price", RiskLevel::Low)
            .with_input(
                Schema::new().field(
                    FieldSpec::new("symbol", FieldType::String)
                        .required()
                        .with_enum(["NIFTY", "BANKNIFTY"]),
                ),
            )
            .with_output(Schema::new().field(FieldSpec::new("ltp", FieldType::Number).required()))
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                quote_descriptor(),
                handler_fn(|_| async { Ok(json!({"ltp": 1.0})) }),
            )
            .unwrap();

        let err = registry
            .register(
                quote_descriptor(),
                handler_fn(|_| async { Ok(json!({"ltp": 2.0})) }),
            )
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateTool("get_quote".into()));
        assert_eq!(registry.len(), 1);

        let result = registry.call("get_quote", &args(json!({"symbol": "NIFTY"}))).await;
        assert_eq!(result.output(), Some(&json!({"ltp": 1.0})));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_handler() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        let registry = ToolRegistry::new()
            .with_tool(
                quote_descriptor(),
                handler_fn(move |_| {
                    flag.store(true, Ordering::SeqCst);
                    async { Ok(json!({"ltp": 1.0})) }
                }),
            )
            .unwrap();

        let result = registry.call("get_quote", &args(json!({"symbol": "SENSEX"}))).await;
        let error = result.error().unwrap();
        assert_eq!(error.code, "INVALID_ARGUMENT");

        let result = registry.call("get_quote", &Map::new()).await;
        assert!(result.error().unwrap().message.contains("symbol"));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_failures_become_results() {
        let registry = ToolRegistry::new()
            .with_tool(
                quote_descriptor(),
                handler_fn(|args| async move {
                    match args.get("symbol").and_then(Value::as_str) {
                        Some("NIFTY") => Err::<Value, String>("broker timeout".to_string()),
                        _ => panic!("feed crashed"),
                    }
                }),
            )
            .unwrap();

        let result = registry.call("get_quote", &args(json!({"symbol": "NIFTY"}))).await;
        assert_eq!(result.error().unwrap().code, "EXECUTION_FAILED");

        let result = registry.call("get_quote", &args(json!({"symbol": "BANKNIFTY"}))).await;
        assert_eq!(result.error().unwrap().code, "HANDLER_PANIC");
    }

    #[tokio::test]
    async fn test_output_schema_enforced() {
        let registry = ToolRegistry::new()
            .with_tool(
                quote_descriptor(),
                handler_fn(|_| async { Ok(json!({"price": 10})) }),
            )
            .unwrap();
        let result = registry.call("get_quote", &args(json!({"symbol": "NIFTY"}))).await;
        assert_eq!(result.error().unwrap().code, "OUTPUT_SCHEMA");
        assert!(!result.is_success());
        assert!(result.handler_returned());
        assert_eq!(result.output(), Some(&json!({"price": 10})));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_catalogue() {
        let registry = ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("place_order", "Place order", RiskLevel::Critical),
                handler_fn(|_| async { Ok(json!({})) }),
            )
            .unwrap()
            .with_tool(
                quote_descriptor(),
                handler_fn(|_| async { Ok(json!({"ltp": 1.0})) }),
            )
            .unwrap();

        let result = registry.execute(&ToolCall::new("get_weather")).await;
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");

        let catalogue = registry.descriptors();
        assert_eq!(catalogue[0]["name"], "get_quote");
        assert_eq!(catalogue[1]["name"], "place_order");
        assert_eq!(catalogue[0]["input_schema"]["required"], json!(["symbol"]));
    }
}
