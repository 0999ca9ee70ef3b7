//! Type definitions for the RunPhase use case.

use serde_json::Value;
use thiserror::Error;
use tradegate_domain::{
    ExecutablePlan, ExecutionContext, KillTrigger, Phase, PhaseCapability, PhaseResult,
    PhaseStatus,
};

/// Conditions that leave the bounded loop early.
///
/// Only [`PlannerNotAllowed`](Self::PlannerNotAllowed) escapes
/// [`RunPhaseUseCase::execute`](super::RunPhaseUseCase::execute); the
/// other two are folded into the [`RunPhaseOutput`].
#[derive(Error, Debug)]
pub enum RunPhaseError {
    #[error("Planner is not permitted in phase '{0}'")]
    PlannerNotAllowed(Phase),

    #[error("{0}")]
    KillSwitch(KillTrigger),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunPhaseError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunPhaseError::Cancelled)
    }
}

/// Input for one bounded phase run
pub struct RunPhaseInput<'a> {
    pub capability: &'a PhaseCapability,
    /// Seed context (already carrying the phase name as its state)
    pub context: ExecutionContext,
    /// Execution phase only: numbers order-placing calls are bound to
    pub executable_plan: Option<&'a ExecutablePlan>,
}

impl<'a> RunPhaseInput<'a> {
    pub fn new(capability: &'a PhaseCapability, context: ExecutionContext) -> Self {
        Self {
            capability,
            context,
            executable_plan: None,
        }
    }

    pub fn with_executable_plan(mut self, plan: &'a ExecutablePlan) -> Self {
        self.executable_plan = Some(plan);
        self
    }
}

/// Output from one bounded phase run
#[derive(Debug, Clone)]
pub struct RunPhaseOutput {
    pub result: PhaseResult,
    /// Context after the last applied result
    pub context: ExecutionContext,
    /// Set when a kill predicate ended the phase; the run must halt
    pub kill: Option<KillTrigger>,
}

/// Terminal condition reached by the loop.
pub(super) struct Stop {
    pub status: PhaseStatus,
    pub reason: String,
    pub final_output: Option<Value>,
}

impl Stop {
    pub fn new(status: PhaseStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            final_output: None,
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.final_output = Some(output);
        self
    }
}
