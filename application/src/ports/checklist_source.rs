//! Checklist source port.
//!
//! The checklist document is external and hot-loadable; the orchestrator
//! asks for the current document at the start of every run.

use std::sync::Arc;
use tradegate_domain::ChecklistDocument;

pub trait ChecklistSource: Send + Sync {
    /// The most recent valid document.
    fn current(&self) -> Arc<ChecklistDocument>;
}

/// A fixed document, for tests and for runs without a checklist file.
pub struct StaticChecklist {
    document: Arc<ChecklistDocument>,
}

impl StaticChecklist {
    pub fn new(document: ChecklistDocument) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    pub fn empty() -> Self {
        Self::new(ChecklistDocument::default())
    }
}

impl ChecklistSource for StaticChecklist {
    fn current(&self) -> Arc<ChecklistDocument> {
        self.document.clone()
    }
}
