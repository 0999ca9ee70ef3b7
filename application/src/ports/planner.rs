//! Planning service port
//!
//! The language-model planner is an external collaborator. It receives the
//! running context, the phase's tool catalogue and the schema a `final`
//! directive must satisfy, and returns one raw directive per call.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tradegate_domain::Phase;

/// Errors that can occur while asking the planner for the next step
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Everything the planner sees for one iteration.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningRequest {
    pub phase: Phase,
    pub iteration: usize,
    pub max_iterations: usize,
    /// [`ExecutionContext::to_planner_view`](tradegate_domain::ExecutionContext::to_planner_view)
    pub context: Value,
    /// Allowlisted tool catalogue for this phase.
    pub tools: Vec<Value>,
    /// JSON Schema of the phase's `final` output.
    pub output_schema: Value,
}

/// Port to the planning service.
///
/// The returned value is parsed as a
/// [`PlannerDirective`](tradegate_domain::PlannerDirective); numeric risk
/// fields in it are never trusted for order placement.
#[async_trait]
pub trait PlanningService: Send + Sync {
    async fn plan(&self, request: &PlanningRequest) -> Result<Value, PlannerError>;
}
