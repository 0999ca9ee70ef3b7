//! Trade lifecycle phases and their adjacency.

use serde::{Deserialize, Serialize};

/// Phase of a trade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Planner-driven analysis, including the tier cascade
    Analysis,
    /// Planner-driven checks plus risk conversion
    Validation,
    /// The only phase allowed to place orders
    Execution,
    /// Planner-free, feed-driven exit management
    PostExecutionTracking,
    Complete,
    /// Sink reachable from analysis, validation and execution
    Rejected,
}

impl Phase {
    /// Planner-driven phases in run order.
    pub const PLANNED: [Phase; 3] = [Phase::Analysis, Phase::Validation, Phase::Execution];

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Idle => "idle",
            Phase::Analysis => "analysis",
            Phase::Validation => "validation",
            Phase::Execution => "execution",
            Phase::PostExecutionTracking => "post_execution_tracking",
            Phase::Complete => "complete",
            Phase::Rejected => "rejected",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Phase::Idle => "Idle",
            Phase::Analysis => "Analysis",
            Phase::Validation => "Validation",
            Phase::Execution => "Execution",
            Phase::PostExecutionTracking => "Post-Execution Tracking",
            Phase::Complete => "Complete",
            Phase::Rejected => "Rejected",
        }
    }

    /// Declared adjacency: the only legal successors of this phase.
    pub fn successors(&self) -> &'static [Phase] {
        match self {
            Phase::Idle => &[Phase::Analysis],
            Phase::Analysis => &[Phase::Validation, Phase::Rejected],
            Phase::Validation => &[Phase::Execution, Phase::Rejected],
            Phase::Execution => &[Phase::PostExecutionTracking, Phase::Rejected],
            Phase::PostExecutionTracking => &[Phase::Complete],
            Phase::Complete | Phase::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: Phase) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "idle" => Ok(Phase::Idle),
            "analysis" => Ok(Phase::Analysis),
            "validation" => Ok(Phase::Validation),
            "execution" => Ok(Phase::Execution),
            "post_execution_tracking" | "tracking" => Ok(Phase::PostExecutionTracking),
            "complete" => Ok(Phase::Complete),
            "rejected" => Ok(Phase::Rejected),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency() {
        assert!(Phase::Idle.can_transition_to(Phase::Analysis));
        assert!(!Phase::Analysis.can_transition_to(Phase::Execution));
        assert!(Phase::Execution.can_transition_to(Phase::Rejected));
        assert!(!Phase::PostExecutionTracking.can_transition_to(Phase::Rejected));
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Rejected.is_terminal());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("tracking".parse::<Phase>(), Ok(Phase::PostExecutionTracking));
        assert_eq!("Post-Execution_Tracking".parse::<Phase>(), Ok(Phase::PostExecutionTracking));
        assert!("review".parse::<Phase>().is_err());
    }
}
