//! Authoritative phase state machine.

use super::phase::Phase;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
}

/// Current phase plus ordered transition history.
///
/// Transitions outside the declared adjacency fail with
/// [`DomainError::InvalidTransition`] and leave the machine unchanged; the
/// orchestrator treats that error as a kill condition.
#[derive(Debug, Clone, Serialize)]
pub struct StateMachine {
    current: Phase,
    history: Vec<Transition>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: Phase::Idle,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn transition(&mut self, to: Phase) -> Result<(), DomainError> {
        self.transition_at(to, Utc::now())
    }

    pub fn transition_at(&mut self, to: Phase, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.current.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.current.to_string(),
                to: to.to_string(),
            });
        }
        self.history.push(Transition {
            from: self.current,
            to,
            at,
        });
        self.current = to;
        Ok(())
    }

    /// Move to the rejected sink if the current phase allows it.
    pub fn reject(&mut self) -> Result<(), DomainError> {
        self.transition(Phase::Rejected)
    }

    /// True once a phase has been entered during this run.
    pub fn visited(&self, phase: Phase) -> bool {
        self.history.iter().any(|t| t.to == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = StateMachine::new();
        for phase in [
            Phase::Analysis,
            Phase::Validation,
            Phase::Execution,
            Phase::PostExecutionTracking,
            Phase::Complete,
        ] {
            sm.transition(phase).unwrap();
        }
        assert_eq!(sm.current(), Phase::Complete);
        assert_eq!(sm.history().len(), 5);
        assert_eq!(sm.history()[0].from, Phase::Idle);
    }

    #[test]
    fn test_invalid_transition_fails_loudly_and_keeps_state() {
        let mut sm = StateMachine::new();
        sm.transition(Phase::Analysis).unwrap();
        let err = sm.transition(Phase::Execution).unwrap_err();
        assert!(err.is_run_fatal());
        assert_eq!(sm.current(), Phase::Analysis);
        assert_eq!(sm.history().len(), 1);
        assert!(!sm.visited(Phase::Execution));
    }

    #[test]
    fn test_reject_from_idle_is_invalid() {
        let mut sm = StateMachine::new();
        assert!(sm.reject().is_err());
        sm.transition(Phase::Analysis).unwrap();
        assert!(sm.reject().is_ok());
        assert!(sm.current().is_terminal());
    }
}
