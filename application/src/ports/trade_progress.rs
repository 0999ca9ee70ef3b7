//! Trade run progress port.
//!
//! [`TradeProgressNotifier`] is an **output port** an operator console or UI
//! implements to follow a run as it happens. Every callback has a no-op
//! default, so implementers only override what they display.
//!
//! # Example Implementation
//!
//! ```ignore
//! use tradegate_application::ports::trade_progress::TradeProgressNotifier;
//!
//! struct ConsoleProgress;
//!
//! impl TradeProgressNotifier for ConsoleProgress {
//!     fn on_phase_change(&self, phase: &Phase) {
//!         println!("-> {}", phase.display_name());
//!     }
//!
//!     fn on_kill_switch(&self, trigger: &KillTrigger) {
//!         eprintln!("HALT: {}", trigger);
//!     }
//! }
//! ```

use tradegate_domain::{
    KillTrigger, Phase, PhaseResult, ToolCall, ToolResult, TrackingEvent,
};

pub trait TradeProgressNotifier: Send + Sync {
    /// Called after every successful state machine transition
    fn on_phase_change(&self, _phase: &Phase) {}

    /// Called when a phase reaches its terminal status
    fn on_phase_finished(&self, _result: &PhaseResult) {}

    /// Called at the top of each bounded-loop iteration
    fn on_iteration(&self, _phase: &Phase, _iteration: usize, _max_iterations: usize) {}

    /// Called when an admitted tool call is dispatched
    fn on_tool_call(&self, _call: &ToolCall) {}

    /// Called when a dispatched tool returns
    fn on_tool_result(&self, _result: &ToolResult) {}

    /// Called when the dependency enforcer refuses a call
    fn on_dependency_rejected(&self, _tool_name: &str, _errors: &[String]) {}

    /// Called when the safety gate vetoes a call
    fn on_safety_veto(&self, _tool_name: &str, _reason: &str) {}

    /// Called when a kill predicate trips
    fn on_kill_switch(&self, _trigger: &KillTrigger) {}

    /// Called for each exit event from the position tracker
    fn on_tracking_event(&self, _event: &TrackingEvent) {}
}

/// No-op implementation for when progress is not displayed
pub struct NoTradeProgress;

impl TradeProgressNotifier for NoTradeProgress {}
