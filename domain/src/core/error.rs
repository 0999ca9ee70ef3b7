//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid context path: {0}")]
    InvalidPath(String),
}

impl DomainError {
    /// Whether this error must halt the whole run rather than a single phase.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, DomainError::InvalidTransition { .. })
    }
}
