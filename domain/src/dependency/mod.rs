//! Dependency enforcement.
//!
//! Dependency validity is about workflow correctness (was the expiry list
//! fetched before the option chain?). Risk exposure is a separate concern
//! handled by [`crate::safety`]; both must pass before dispatch.

pub mod calendar;
pub mod enforcer;

pub use calendar::{DayClock, FixedClock, LocalClock, TradingCalendar};
pub use enforcer::{DependencyCheck, DependencyEnforcer};
