//! Phase results and call traces.

use super::phase::Phase;
use crate::tool::entities::ToolCall;
use crate::tool::value_objects::ToolResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Terminal status of one phase run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    Approved,
    Rejected,
    Timeout,
    MaxIterations,
    VerificationFailed,
    Error,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PhaseStatus::Completed => "completed",
            PhaseStatus::Approved => "approved",
            PhaseStatus::Rejected => "rejected",
            PhaseStatus::Timeout => "timeout",
            PhaseStatus::MaxIterations => "max_iterations",
            PhaseStatus::VerificationFailed => "verification_failed",
            PhaseStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to the planner output of one trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Tool dispatched; see the result for success or failure.
    Executed,
    /// Refused before dispatch (dependency, safety, risk binding, in-flight order).
    Rejected,
    /// Planner declared the phase finished.
    Final,
    /// Planner output failed verification.
    Invalid,
}

/// One step of the call trace: {plan, tool_call, result, timestamp}.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub iteration: usize,
    /// Planner's stated reasoning, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    pub outcome: TraceOutcome,
    pub timestamp: DateTime<Utc>,
}

impl TraceEntry {
    pub fn new(iteration: usize, outcome: TraceOutcome) -> Self {
        Self {
            iteration,
            plan: None,
            tool_call: None,
            result: None,
            outcome,
            timestamp: Utc::now(),
        }
    }

    pub fn with_plan(mut self, plan: Option<String>) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }

    pub fn with_result(mut self, result: ToolResult) -> Self {
        self.result = Some(result);
        self
    }
}

/// Outcome of a phase: status, reason, budget use and the full trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub reason: String,
    pub iterations: usize,
    pub max_iterations: usize,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub trace: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
}

impl PhaseResult {
    pub fn new(phase: Phase, status: PhaseStatus, reason: impl Into<String>) -> Self {
        Self {
            phase,
            status,
            reason: reason.into(),
            iterations: 0,
            max_iterations: 0,
            duration_ms: 0,
            trace: Vec::new(),
            final_output: None,
        }
    }

    pub fn with_budget(mut self, iterations: usize, max_iterations: usize) -> Self {
        self.iterations = iterations;
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceEntry>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_final_output(mut self, output: Value) -> Self {
        self.final_output = Some(output);
        self
    }

    /// Override status and reason, keeping budget and trace.
    pub fn with_status(mut self, status: PhaseStatus, reason: impl Into<String>) -> Self {
        self.status = status;
        self.reason = reason.into();
        self
    }

    pub fn is(&self, status: PhaseStatus) -> bool {
        self.status == status
    }

    /// Successful results in trace order.
    pub fn successful_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.trace
            .iter()
            .filter_map(|e| e.result.as_ref())
            .filter(|r| r.is_success())
    }

    /// Scan the trace (newest first) for a successful result whose output
    /// carries `key`, or whose tool produced it as a whole.
    pub fn find_output(&self, key: &str) -> Option<&Value> {
        self.trace
            .iter()
            .rev()
            .filter_map(|e| e.result.as_ref())
            .filter(|r| r.is_success())
            .find_map(|r| r.output().and_then(|o| o.get(key)))
    }
}
