//! Infrastructure layer for tradegate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading, the
//! hot-reloading checklist file and the JSONL audit trail.

pub mod checklist;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use checklist::{ChecklistLoadError, FileChecklistSource, load_checklist};
pub use config::{ConfigLoadError, ConfigLoader, ConfigSource, FileConfig};
pub use logging::JsonlAuditLogger;
