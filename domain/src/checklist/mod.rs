//! Checklist and kill-switch layer.
//!
//! Checklists are declarative per-phase pre/post checks loaded from an
//! external document. The [`KillSwitch`] is a separate set of hard
//! predicates over the [`SessionState`](crate::session::SessionState) that
//! halt the process no matter which phase is active.

pub mod config;
pub mod evaluator;
pub mod kill_switch;

pub use config::{CheckPredicate, CheckSpec, ChecklistDocument, PhaseChecklist, RejectionAction};
pub use evaluator::{CheckOutcome, CheckStage, ChecklistEvaluator, ChecklistReport};
pub use kill_switch::{KillCondition, KillSwitch, KillTrigger};
