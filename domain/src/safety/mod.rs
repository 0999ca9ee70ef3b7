//! Safety gate.
//!
//! Admission control that can veto a tool call even when all of its
//! dependencies are satisfied. Dependencies answer "is the workflow in
//! order?"; safety answers "is the risk exposure acceptable?".

pub mod gate;
pub mod rules;

pub use gate::{SafetyGate, SafetyVerdict};
pub use rules::{MaxPositionSize, RequireDryRun, RequireStopLoss, SafetyPolicy, SafetyRule, trading_rules};
