//! Hard, run-fatal kill predicates over the session state.
//!
//! Evaluated continuously (every loop iteration, after every tool call, at
//! every transition). Not debounced, not retried.

use crate::session::SessionState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillCondition {
    DailyLossCap,
    FeedDisconnectedWithPosition,
    DuplicateExecution,
    InvalidTransition,
    MalformedOutput,
}

impl KillCondition {
    pub const ALL: [KillCondition; 5] = [
        KillCondition::DailyLossCap,
        KillCondition::FeedDisconnectedWithPosition,
        KillCondition::DuplicateExecution,
        KillCondition::InvalidTransition,
        KillCondition::MalformedOutput,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            KillCondition::DailyLossCap => "daily_loss_cap",
            KillCondition::FeedDisconnectedWithPosition => "feed_disconnected_with_position",
            KillCondition::DuplicateExecution => "duplicate_execution",
            KillCondition::InvalidTransition => "invalid_transition",
            KillCondition::MalformedOutput => "malformed_output",
        }
    }
}

impl std::fmt::Display for KillCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for KillCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KillCondition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A tripped kill condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillTrigger {
    pub condition: KillCondition,
    pub reason: String,
}

impl std::fmt::Display for KillTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "kill switch '{}': {}", self.condition, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillSwitch {
    pub conditions: Vec<KillCondition>,
    pub daily_loss_cap: f64,
    /// Malformed planner outputs tolerated per trading day.
    pub malformed_output_limit: u32,
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self {
            conditions: KillCondition::ALL.to_vec(),
            daily_loss_cap: 5000.0,
            malformed_output_limit: 3,
        }
    }
}

impl KillSwitch {
    pub fn with_conditions(mut self, conditions: Vec<KillCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// First tripped condition in configured order, if any.
    pub fn evaluate(&self, session: &SessionState) -> Option<KillTrigger> {
        self.conditions
            .iter()
            .find_map(|condition| self.trip(*condition, session))
    }

    fn trip(&self, condition: KillCondition, session: &SessionState) -> Option<KillTrigger> {
        let reason = match condition {
            KillCondition::DailyLossCap if session.daily_loss() >= self.daily_loss_cap => format!(
                "daily loss {:.2} reached cap {:.2}",
                session.daily_loss(),
                self.daily_loss_cap
            ),
            KillCondition::FeedDisconnectedWithPosition
                if !session.feed_connected() && session.open_positions() > 0 =>
            {
                format!(
                    "live feed disconnected with {} open position(s)",
                    session.open_positions()
                )
            }
            KillCondition::DuplicateExecution if session.duplicate_execution() => {
                "duplicate order execution detected".to_string()
            }
            KillCondition::InvalidTransition if session.invalid_transition() => {
                "out-of-graph phase transition attempted".to_string()
            }
            KillCondition::MalformedOutput
                if session.malformed_outputs() >= self.malformed_output_limit =>
            {
                format!(
                    "{} malformed planner outputs (limit {})",
                    session.malformed_outputs(),
                    self.malformed_output_limit
                )
            }
            _ => return None,
        };
        Some(KillTrigger { condition, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session() -> SessionState {
        SessionState::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn test_healthy_session_passes() {
        assert_eq!(KillSwitch::default().evaluate(&session()), None);
    }

    #[test]
    fn test_daily_loss_cap() {
        let mut s = session();
        s.record_pnl(-5000.0);
        let trigger = KillSwitch::default().evaluate(&s).unwrap();
        assert_eq!(trigger.condition, KillCondition::DailyLossCap);
    }

    #[test]
    fn test_feed_loss_only_matters_with_open_position() {
        let mut s = session();
        s.set_feed_connected(false);
        assert_eq!(KillSwitch::default().evaluate(&s), None);
        s.open_position();
        assert_eq!(
            KillSwitch::default().evaluate(&s).unwrap().condition,
            KillCondition::FeedDisconnectedWithPosition
        );
    }

    #[test]
    fn test_malformed_output_limit() {
        let mut s = session();
        s.record_malformed_output();
        s.record_malformed_output();
        assert_eq!(KillSwitch::default().evaluate(&s), None);
        s.record_malformed_output();
        assert_eq!(
            KillSwitch::default().evaluate(&s).unwrap().condition,
            KillCondition::MalformedOutput
        );
    }

    #[test]
    fn test_disabled_condition_never_trips() {
        let mut s = session();
        s.flag_invalid_transition();
        let ks = KillSwitch::default().with_conditions(vec![KillCondition::DailyLossCap]);
        assert_eq!(ks.evaluate(&s), None);
        assert!(KillSwitch::default().evaluate(&s).is_some());
    }

    #[test]
    fn test_parse_condition() {
        assert_eq!(
            "duplicate_execution".parse::<KillCondition>(),
            Ok(KillCondition::DuplicateExecution)
        );
        assert!("meteor_strike".parse::<KillCondition>().is_err());
    }
}
