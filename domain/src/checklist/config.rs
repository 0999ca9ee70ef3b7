//! Declarative checklist document.
//!
//! ```toml
//! [[phases.validation.post]]
//! id = "capital_known"
//! description = "Available capital was fetched"
//! required = true
//! on_fail = "no_trade"
//! check = { kind = "key_present", key = "available_capital" }
//! ```

use super::kill_switch::KillCondition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a failed required check does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionAction {
    /// Halt the whole process (no further runs until an operator clears it).
    HaltSystem,
    /// End the run quietly with `no_trade`.
    NoTrade,
    /// Reject this trade.
    #[default]
    Reject,
    /// Stop this run and raise an operator alert.
    StopAndAlert,
}

impl RejectionAction {
    pub fn as_str(&self) -> &str {
        match self {
            RejectionAction::HaltSystem => "halt_system",
            RejectionAction::NoTrade => "no_trade",
            RejectionAction::Reject => "reject",
            RejectionAction::StopAndAlert => "stop_and_alert",
        }
    }

    /// Higher is more severe; used to pick one action from several failures.
    pub fn severity(&self) -> u8 {
        match self {
            RejectionAction::NoTrade => 0,
            RejectionAction::Reject => 1,
            RejectionAction::StopAndAlert => 2,
            RejectionAction::HaltSystem => 3,
        }
    }
}

fn default_regime_path() -> String {
    "cascade.regime".to_string()
}

fn default_blocked_regimes() -> Vec<String> {
    vec!["choppy".to_string(), "untradable".to_string(), "no_trade".to_string()]
}

/// Predicate a check runs against the execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckPredicate {
    /// A context path resolves.
    KeyPresent { key: String },
    /// The regime at `path` exists and is not in the blocked list.
    RegimeTradable {
        #[serde(default = "default_regime_path")]
        path: String,
        #[serde(default = "default_blocked_regimes")]
        blocked: Vec<String>,
    },
    /// The tier cascade finished aligned.
    TierAlignment,
    /// A numeric context value is at least `min`.
    MinValue { path: String, min: f64 },
    /// A numeric context value is at most `max`.
    MaxValue { path: String, max: f64 },
    GuardPassed { guard: String },
    EventAbsent { event: String },
}

fn default_required() -> bool {
    true
}

/// One checklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub on_fail: RejectionAction,
    pub check: CheckPredicate,
}

/// Checks run before a phase starts and after it finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseChecklist {
    pub pre: Vec<CheckSpec>,
    pub post: Vec<CheckSpec>,
}

/// Whole checklist document, keyed by phase name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistDocument {
    pub phases: BTreeMap<String, PhaseChecklist>,
    /// Overrides the configured kill-switch condition list when present.
    pub kill_switch: Option<Vec<KillCondition>>,
}

impl ChecklistDocument {
    pub fn phase(&self, phase: &str) -> Option<&PhaseChecklist> {
        self.phases.get(phase)
    }

    /// Every check id must be unique within its phase.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (phase, list) in &self.phases {
            let mut seen = std::collections::BTreeSet::new();
            for spec in list.pre.iter().chain(list.post.iter()) {
                if spec.id.trim().is_empty() {
                    errors.push(format!("Phase '{}' has a check with an empty id", phase));
                } else if !seen.insert(spec.id.as_str()) {
                    errors.push(format!("Phase '{}' repeats check id '{}'", phase, spec.id));
                }
            }
        }
        errors
    }
}
