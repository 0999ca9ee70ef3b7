//! Domain layer for tradegate
//!
//! This crate contains the core rules of the control layer that sits between
//! a language-model planner and real order placement. It has no I/O and no
//! dependencies on the application or infrastructure layers.
//!
//! # Core Concepts
//!
//! ## Admission pipeline
//!
//! Every planner-proposed tool call passes, in order:
//!
//! - **Schema**: arguments validated against the descriptor's input schema
//! - **Dependencies**: workflow preconditions ([`DependencyEnforcer`])
//! - **Safety**: risk-exposure vetoes ([`SafetyGate`])
//! - **Risk binding** (execution only): order numbers come from the
//!   [`ExecutablePlan`], never from the planner
//!
//! ## Phases
//!
//! analysis → validation → execution → post-execution tracking, guarded by
//! the [`StateMachine`], per-phase [`CapabilityTable`], checklists and the
//! [`KillSwitch`].

pub mod checklist;
pub mod context;
pub mod core;
pub mod dependency;
pub mod orchestration;
pub mod plan;
pub mod risk;
pub mod safety;
pub mod session;
pub mod tool;
pub mod tracking;

// Re-export commonly used types
pub use checklist::{
    CheckOutcome, CheckPredicate, CheckSpec, CheckStage, ChecklistDocument, ChecklistEvaluator,
    ChecklistReport, KillCondition, KillSwitch, KillTrigger, PhaseChecklist, RejectionAction,
};
pub use context::{ContextPath, EVENT_ORDER_PLACED, ExecutionContext};
pub use core::{
    error::DomainError,
    issue::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use dependency::{
    DayClock, DependencyCheck, DependencyEnforcer, FixedClock, LocalClock, TradingCalendar,
};
pub use orchestration::{
    BatchCall, CapabilityTable, Phase, PhaseCapability, PhaseResult, PhaseStatus,
    PlannerDirective, StateMachine, StopCondition, TraceEntry, TraceOutcome, Transition,
};
pub use plan::{
    Bias, CascadeHalt, CascadeOutcome, Direction, ExecutablePlan, ExecutionCandidate, ExitLogic,
    Tier, TierAssessment, TierCascade, TradePlan,
};
pub use risk::{
    Instrument, InstrumentTable, LotSizing, RiskConverter, RiskDecision, RiskParams,
    RiskRejection, RiskStage, StopFallback, TradeRiskInput,
};
pub use safety::{SafetyGate, SafetyPolicy, SafetyRule, SafetyVerdict};
pub use session::SessionState;
pub use tool::{
    CallerType, DateRangeMode, DateRangeRule, DeclaredSafetyRule, Dependencies, FieldSpec,
    FieldType, RiskLevel, Schema, SideEffects, ToolCall, ToolDescriptor, ToolError, ToolResult,
};
pub use tracking::{TrackedPosition, TrackingEvent};
