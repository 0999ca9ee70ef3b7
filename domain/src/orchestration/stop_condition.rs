//! Stop predicates evaluated after each tool execution.

use crate::context::ExecutionContext;
use serde::{Deserialize, Serialize};

/// A predicate over the latest results that ends a phase early with
/// status `completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopCondition {
    /// The last `window` results are all errors or rejections.
    AllFailed { window: usize },
    /// Every listed context path resolves.
    OutputsPresent { keys: Vec<String> },
}

impl StopCondition {
    pub fn holds(&self, context: &ExecutionContext) -> bool {
        match self {
            StopCondition::AllFailed { window } => {
                let results = context.results();
                let window = (*window).max(1);
                results.len() >= window
                    && results[results.len() - window..]
                        .iter()
                        .all(|r| r.is_error_or_rejection())
            }
            StopCondition::OutputsPresent { keys } => {
                !keys.is_empty() && keys.iter().all(|k| context.has(k))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            StopCondition::AllFailed { window } => {
                format!("last {} results were all errors or rejections", window)
            }
            StopCondition::OutputsPresent { keys } => {
                format!("outputs present: {}", keys.join(", "))
            }
        }
    }
}
