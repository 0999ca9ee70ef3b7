//! Application layer for tradegate
//!
//! This crate contains use cases, port definitions, the tool registry and
//! application configuration. It depends only on the domain layer.
//!
//! - [`RunTradeUseCase`]: one trade through analysis, validation, execution
//!   and tracking
//! - [`RunPhaseUseCase`]: the bounded planner loop for a single phase
//! - [`PositionTracker`]: planner-free exit tracking

pub mod config;
pub mod ports;
pub mod registry;
pub mod session;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{ExecutionParams, GateConfig};
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    checklist_source::{ChecklistSource, StaticChecklist},
    planner::{PlannerError, PlanningRequest, PlanningService},
    price_feed::PriceFeed,
    tier_signal::TierSignalProvider,
    tool_executor::ToolExecutorPort,
    tool_handler::{ToolHandler, handler_fn},
    trade_progress::{NoTradeProgress, TradeProgressNotifier},
};
pub use registry::{ScopedRegistry, ToolRegistry};
pub use session::{InFlightOrders, OrderPermit, SharedSession};
pub use use_cases::run_phase::{RunPhaseError, RunPhaseInput, RunPhaseOutput, RunPhaseUseCase};
pub use use_cases::run_trade::{
    FinalStatus, RunTradeError, RunTradeInput, RunTradeUseCase, TradeRunResult,
};
pub use use_cases::track_position::{PositionTracker, TrackerHandle};
