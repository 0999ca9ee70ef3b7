//! File-backed checklist documents.

mod file_source;

pub use file_source::{ChecklistLoadError, FileChecklistSource, load_checklist};
