//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters and external
//! collaborators (planner, brokerage tools, signal providers, feeds) must
//! implement.

pub mod audit_logger;
pub mod checklist_source;
pub mod planner;
pub mod price_feed;
pub mod tier_signal;
pub mod tool_executor;
pub mod tool_handler;
pub mod trade_progress;
