//! Port for the structured audit trail.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics,
//! while [`AuditLogger`] records every admission decision, planner output
//! and transition in a machine-readable form (one JSON object per line in
//! the file-backed adapter) so an operator can reconstruct a run.

use serde_json::Value;

/// A structured audit event.
pub struct AuditEvent {
    /// Event type identifier (e.g., "tool_call", "safety_veto", "transition").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for writing audit events.
///
/// `log` is synchronous and infallible; a failing sink must not disturb the
/// run it is observing.
pub trait AuditLogger: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
