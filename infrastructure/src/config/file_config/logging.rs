//! File locations from TOML (`[checklist]` and `[logging]` sections)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ```toml
/// [checklist]
/// path = "checklist.toml"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChecklistConfig {
    /// `.toml` or `.json`; reloaded when its modification time changes
    pub path: Option<PathBuf>,
}

/// ```toml
/// [logging]
/// dir = "logs"
/// audit_file = "audit.jsonl"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the rolling diagnostic log and the audit trail.
    /// Logging goes to stderr only while unset.
    pub dir: Option<PathBuf>,
    pub audit_file: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            audit_file: "audit.jsonl".to_string(),
        }
    }
}

impl FileLoggingConfig {
    /// Audit trail location, if a log directory is configured.
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(&self.audit_file))
    }
}
