//! Post-execution tracking rules (planner-free).

pub mod exit_rules;

pub use exit_rules::{TrackedPosition, TrackingEvent};
