//! Execution parameters for phase loop control.
//!
//! [`ExecutionParams`] groups the static knobs of the bounded phase loop
//! that are not part of a phase's capability record. Per-phase iteration
//! and timeout budgets live in the domain
//! [`CapabilityTable`](tradegate_domain::CapabilityTable).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Concurrency for side-effect-free `tool_batch` calls; 1 = sequential.
    pub max_parallel_tools: usize,
    /// Most recent results included in the planner's context view.
    pub planner_view_results: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_parallel_tools: 1,
            planner_view_results: 10,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_parallel_tools(mut self, max: usize) -> Self {
        self.max_parallel_tools = max.max(1);
        self
    }

    pub fn with_planner_view_results(mut self, count: usize) -> Self {
        self.planner_view_results = count;
        self
    }
}
