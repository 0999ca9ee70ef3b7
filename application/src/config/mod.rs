//! Application-level configuration.
//!
//! - [`ExecutionParams`]: phase loop control (batch concurrency, planner view)
//! - [`GateConfig`]: every rule set a trade run is wired with

pub mod execution_params;
pub mod gate_config;

pub use execution_params::ExecutionParams;
pub use gate_config::GateConfig;
