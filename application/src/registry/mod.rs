//! Tool registry and phase-scoped views.

pub mod scoped;
pub mod tool_registry;

pub use scoped::ScopedRegistry;
pub use tool_registry::ToolRegistry;
