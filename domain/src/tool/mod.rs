//! Tool domain module
//!
//! Defines the contract side of the tool system: what a tool looks like
//! ([`ToolDescriptor`]), how it is invoked ([`ToolCall`]) and what comes back
//! ([`ToolResult`]).
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (registry)     │    │ (invocation) │    │ (output)     │
//! └───────┬────────┘    └──────────────┘    └──────────────┘
//!         │
//!         ├─ input/output Schema
//!         ├─ Dependencies (preconditions, derived inputs, produces)
//!         └─ DeclaredSafetyRule list
//! ```
//!
//! Descriptors are immutable once registered. Dispatch lives in the
//! application layer's `ToolRegistry`.

pub mod dependencies;
pub mod entities;
pub mod schema;
pub mod value_objects;

pub use dependencies::{CallerType, DateRangeMode, DateRangeRule, Dependencies};
pub use entities::{DeclaredSafetyRule, RiskLevel, SideEffects, ToolCall, ToolDescriptor};
pub use schema::{FieldSpec, FieldType, Schema};
pub use value_objects::{ToolError, ToolResult};
