//! Type definitions for the RunTrade use case.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tradegate_domain::{
    DomainError, ExecutablePlan, KillTrigger, PhaseResult, TrackingEvent, TradePlan, Transition,
};

/// Errors that prevent a trade run from starting at all.
///
/// Everything that happens once the run has started ends up in
/// [`TradeRunResult::final_status`] instead.
#[derive(Error, Debug)]
pub enum RunTradeError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Terminal status of a whole trade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Completed,
    /// No actionable setup (cascade halt, bias mismatch, planner abort)
    NoTrade,
    AnalysisFailed,
    ValidationFailed,
    ExecutionFailed,
    /// A checklist or the risk converter refused the trade
    Rejected,
    /// A kill predicate tripped or a checklist demanded a system halt
    Halted,
    TrackingFailed,
}

impl FinalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FinalStatus::Completed => "completed",
            FinalStatus::NoTrade => "no_trade",
            FinalStatus::AnalysisFailed => "analysis_failed",
            FinalStatus::ValidationFailed => "validation_failed",
            FinalStatus::ExecutionFailed => "execution_failed",
            FinalStatus::Rejected => "rejected",
            FinalStatus::Halted => "halted",
            FinalStatus::TrackingFailed => "tracking_failed",
        }
    }
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for one trade run
#[derive(Debug, Clone)]
pub struct RunTradeInput {
    /// Mutual-exclusion and duplicate-execution key
    pub trade_id: String,
    pub instrument: String,
    /// Extra outputs published to the analysis context
    pub seed: Map<String, Value>,
}

impl RunTradeInput {
    pub fn new(trade_id: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            trade_id: trade_id.into(),
            instrument: instrument.into(),
            seed: Map::new(),
        }
    }

    pub fn with_seed(mut self, key: impl Into<String>, value: Value) -> Self {
        self.seed.insert(key.into(), value);
        self
    }
}

/// Process-facing result of a trade run.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRunResult {
    pub trade_id: String,
    pub final_status: FinalStatus,
    pub reason: String,
    pub final_output: Option<Value>,
    /// Keyed by phase name, in lifecycle order of the names' sort
    pub phases: BTreeMap<String, PhaseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_plan: Option<TradePlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_plan: Option<ExecutablePlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_receipt: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tracking_events: Vec<TrackingEvent>,
    pub transitions: Vec<Transition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_switch: Option<KillTrigger>,
}

impl TradeRunResult {
    pub fn is_completed(&self) -> bool {
        self.final_status == FinalStatus::Completed
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.get(name)
    }
}

/// How the lifecycle ended, before it is folded into a [`TradeRunResult`].
pub(super) struct Terminal {
    pub status: FinalStatus,
    pub reason: String,
}

impl Terminal {
    pub fn new(status: FinalStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}
