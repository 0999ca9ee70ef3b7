//! Execution context for a trade run.
//!
//! [`ExecutionContext`] is the single accumulator a phase run threads
//! through its iterations: logical state, per-tool call counts, prior
//! results, events, passed guards and the named outputs tools produce.
//! [`ContextPath`] resolves dotted/indexed lookups such as
//! `chain.strikes[2].ltp` against those outputs.

pub mod execution_context;
pub mod path;

pub use execution_context::{EVENT_ORDER_PLACED, ExecutionContext};
pub use path::{ContextPath, PathSegment};
