//! Hot-reloading checklist file.
//!
//! The document is re-read whenever the file's modification time changes.
//! A reload that fails (unreadable, unparseable, duplicate ids) keeps the
//! last good document and logs a warning; a run is never left without a
//! checklist because an operator saved a half-edited file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{info, warn};
use tradegate_application::ChecklistSource;
use tradegate_domain::ChecklistDocument;

#[derive(Debug, Error)]
pub enum ChecklistLoadError {
    #[error("cannot read checklist {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML checklist: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON checklist: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported checklist format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("checklist rejected: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Read and validate a checklist document; the format follows the extension.
pub fn load_checklist(path: &Path) -> Result<ChecklistDocument, ChecklistLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ChecklistLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let document: ChecklistDocument = match extension.as_str() {
        "toml" => toml::from_str(&text)?,
        "json" => serde_json::from_str(&text)?,
        other => return Err(ChecklistLoadError::UnsupportedFormat(other.to_string())),
    };

    let errors = document.validate();
    if errors.is_empty() {
        Ok(document)
    } else {
        Err(ChecklistLoadError::Invalid(errors))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

struct Loaded {
    document: Arc<ChecklistDocument>,
    modified: Option<SystemTime>,
}

pub struct FileChecklistSource {
    path: PathBuf,
    state: Mutex<Loaded>,
}

impl FileChecklistSource {
    /// Load the initial document. Unlike later reloads, this must succeed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ChecklistLoadError> {
        let path = path.into();
        let stamp = modified(&path);
        let document = load_checklist(&path)?;
        info!(path = %path.display(), phases = document.phases.len(), "Checklist loaded");

        Ok(Self {
            path,
            state: Mutex::new(Loaded {
                document: Arc::new(document),
                modified: stamp,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file if its modification time moved.
    ///
    /// Returns true when a new document was installed.
    pub fn reload_if_changed(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stamp = modified(&self.path);
        if stamp == state.modified {
            return false;
        }
        // Remember the stamp either way so a broken file is not re-parsed
        // on every run.
        state.modified = stamp;

        match load_checklist(&self.path) {
            Ok(document) => {
                info!(path = %self.path.display(), "Checklist reloaded");
                state.document = Arc::new(document);
                true
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Checklist reload failed, keeping the previous document"
                );
                false
            }
        }
    }
}

impl ChecklistSource for FileChecklistSource {
    fn current(&self) -> Arc<ChecklistDocument> {
        self.reload_if_changed();
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .document
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;
    use tradegate_domain::{CheckPredicate, KillCondition, RejectionAction};

    const CHECKLIST: &str = r#"
[[phases.validation.post]]
id = "capital_known"
on_fail = "no_trade"
check = { kind = "key_present", key = "available_capital" }
"#;

    /// Write `contents` and push the mtime forward so coarse filesystem
    /// timestamps still register a change.
    fn write(path: &Path, contents: &str, bump: u64) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(bump))
            .unwrap();
    }

    #[test]
    fn test_open_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checklist.toml");
        write(&path, CHECKLIST, 0);

        let source = FileChecklistSource::open(&path).unwrap();
        let document = source.current();
        let checks = &document.phase("validation").unwrap().post;
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].on_fail, RejectionAction::NoTrade);
        assert!(matches!(checks[0].check, CheckPredicate::KeyPresent { .. }));
    }

    #[test]
    fn test_open_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checklist.json");
        write(
            &path,
            r#"{"kill_switch": ["daily_loss_cap"], "phases": {"analysis": {"post": [
                {"id": "aligned", "check": {"kind": "tier_alignment"}}
            ]}}}"#,
            0,
        );

        let document = FileChecklistSource::open(&path).unwrap().current();
        assert_eq!(document.kill_switch, Some(vec![KillCondition::DailyLossCap]));
        assert!(document.phase("analysis").unwrap().post[0].required);
    }

    #[test]
    fn test_reload_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checklist.toml");
        write(&path, CHECKLIST, 0);
        let source = FileChecklistSource::open(&path).unwrap();
        assert!(!source.reload_if_changed());

        write(
            &path,
            r#"
[[phases.execution.pre]]
id = "no_duplicate"
on_fail = "halt_system"
check = { kind = "event_absent", event = "order_placed" }
"#,
            10,
        );

        let document = source.current();
        assert!(document.phase("validation").is_none());
        assert_eq!(
            document.phase("execution").unwrap().pre[0].on_fail,
            RejectionAction::HaltSystem
        );
    }

    #[test]
    fn test_broken_reload_keeps_last_good_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checklist.toml");
        write(&path, CHECKLIST, 0);
        let source = FileChecklistSource::open(&path).unwrap();

        write(&path, "[[phases.validation.post]]\nid = ", 10);
        assert!(!source.reload_if_changed());
        assert_eq!(source.current().phase("validation").unwrap().post.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checklist.toml");
        write(&path, &format!("{}{}", CHECKLIST, CHECKLIST), 0);

        let err = FileChecklistSource::open(&path).err().unwrap();
        assert!(matches!(err, ChecklistLoadError::Invalid(_)));
        assert!(err.to_string().contains("capital_known"));
    }

    #[test]
    fn test_unknown_extension_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("checklist.yaml");
        write(&yaml, "phases: {}", 0);
        assert!(matches!(
            load_checklist(&yaml),
            Err(ChecklistLoadError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            load_checklist(&dir.path().join("absent.toml")),
            Err(ChecklistLoadError::Io { .. })
        ));
    }
}
