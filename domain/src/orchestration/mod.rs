//! Orchestration domain: phases, the state machine and per-phase capabilities.
//!
//! ```text
//! idle ─▶ analysis ─▶ validation ─▶ execution ─▶ post_execution_tracking ─▶ complete
//!            │            │             │
//!            └────────────┴─────────────┴──▶ rejected
//! ```
//!
//! The orchestrator (application layer) asks the [`CapabilityTable`] what a
//! phase may do, runs the phase, and records each transition on the
//! [`StateMachine`]. Out-of-graph transitions are errors, never no-ops.

pub mod capability;
pub mod directive;
pub mod phase;
pub mod phase_result;
pub mod state_machine;
pub mod stop_condition;

pub use capability::{
    CapabilityTable, PhaseCapability, execution_output_schema, validation_output_schema,
};
pub use directive::{BatchCall, PlannerDirective};
pub use phase::Phase;
pub use phase_result::{PhaseResult, PhaseStatus, TraceEntry, TraceOutcome};
pub use state_machine::{StateMachine, Transition};
pub use stop_condition::StopCondition;
