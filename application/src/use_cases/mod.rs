//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod run_phase;
pub mod run_trade;
pub(crate) mod shared;
pub mod track_position;
