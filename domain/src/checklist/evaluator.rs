//! Checklist evaluation against an execution context.

use super::config::{CheckPredicate, CheckSpec, ChecklistDocument, RejectionAction};
use crate::context::ExecutionContext;
use serde::Serialize;
use serde_json::Value;

/// When in the phase a checklist runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStage {
    Pre,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub id: String,
    pub passed: bool,
    pub required: bool,
    pub action: RejectionAction,
    pub message: String,
}

/// Outcomes for one phase and stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistReport {
    pub phase: String,
    pub stage: CheckStage,
    pub outcomes: Vec<CheckOutcome>,
}

impl ChecklistReport {
    /// No required check failed.
    pub fn passed(&self) -> bool {
        self.required_failures().next().is_none()
    }

    pub fn required_failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| o.required && !o.passed)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.required && !o.passed)
    }

    /// Most severe action among failed required checks.
    pub fn action(&self) -> Option<RejectionAction> {
        self.required_failures()
            .map(|o| o.action)
            .max_by_key(|a| a.severity())
    }

    pub fn reason(&self) -> String {
        self.required_failures()
            .map(|o| format!("{}: {}", o.id, o.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Ids of passed checks, recorded as `checklist:<id>` guards.
    pub fn passed_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter(|o| o.passed).map(|o| o.id.as_str())
    }
}

/// Runs one phase's checklist.
pub struct ChecklistEvaluator;

impl ChecklistEvaluator {
    pub fn evaluate(
        document: &ChecklistDocument,
        phase: &str,
        stage: CheckStage,
        context: &ExecutionContext,
    ) -> ChecklistReport {
        let specs: &[CheckSpec] = match (document.phase(phase), stage) {
            (Some(list), CheckStage::Pre) => &list.pre,
            (Some(list), CheckStage::Post) => &list.post,
            (None, _) => &[],
        };
        ChecklistReport {
            phase: phase.to_string(),
            stage,
            outcomes: specs.iter().map(|s| Self::run(s, context)).collect(),
        }
    }

    fn run(spec: &CheckSpec, context: &ExecutionContext) -> CheckOutcome {
        let result = Self::check(&spec.check, context);
        CheckOutcome {
            id: spec.id.clone(),
            passed: result.is_ok(),
            required: spec.required,
            action: spec.on_fail,
            message: match result {
                Ok(()) => spec.description.clone(),
                Err(msg) => msg,
            },
        }
    }

    pub fn check(predicate: &CheckPredicate, context: &ExecutionContext) -> Result<(), String> {
        match predicate {
            CheckPredicate::KeyPresent { key } => {
                if context.has(key) {
                    Ok(())
                } else {
                    Err(format!("'{}' is missing from context", key))
                }
            }
            CheckPredicate::RegimeTradable { path, blocked } => match context.lookup(path) {
                Some(Value::String(regime)) => {
                    if blocked.iter().any(|b| b.eq_ignore_ascii_case(regime)) {
                        Err(format!("Regime '{}' is not tradable", regime))
                    } else {
                        Ok(())
                    }
                }
                Some(other) => Err(format!("Regime at '{}' is not a string: {}", path, other)),
                None => Err(format!("No regime at '{}'", path)),
            },
            CheckPredicate::TierAlignment => match context.lookup("cascade.aligned") {
                Some(Value::Bool(true)) => Ok(()),
                Some(_) => Err(
                    context
                        .lookup("cascade.reason")
                        .and_then(Value::as_str)
                        .map(|r| format!("Tiers are not aligned: {}", r))
                        .unwrap_or_else(|| "Tiers are not aligned".to_string()),
                ),
                None => Err("Tier cascade has not run".to_string()),
            },
            CheckPredicate::MinValue { path, min } => match context.lookup_f64(path) {
                Some(v) if v >= *min => Ok(()),
                Some(v) => Err(format!("'{}' = {} is below {}", path, v, min)),
                None => Err(format!("'{}' is not a number in context", path)),
            },
            CheckPredicate::MaxValue { path, max } => match context.lookup_f64(path) {
                Some(v) if v <= *max => Ok(()),
                Some(v) => Err(format!("'{}' = {} is above {}", path, v, max)),
                None => Err(format!("'{}' is not a number in context", path)),
            },
            CheckPredicate::GuardPassed { guard } => {
                if context.guard_passed(guard) {
                    Ok(())
                } else {
                    Err(format!("Guard '{}' has not passed", guard))
                }
            }
            CheckPredicate::EventAbsent { event } => {
                if context.has_event(event) {
                    Err(format!("Event '{}' already occurred", event))
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> ChecklistDocument {
        serde_json::from_value(json!({
            "phases": {"analysis": {"post": [
                {"id": "regime", "check": {"kind": "regime_tradable"}, "on_fail": "no_trade"},
                {"id": "aligned", "check": {"kind": "tier_alignment"}, "on_fail": "reject"},
                {"id": "snapshot", "required": false, "check": {"kind": "key_present", "key": "snapshot"}}
            ]}}
        }))
        .unwrap()
    }

    #[test]
    fn test_all_pass() {
        let ctx = ExecutionContext::new("t", "analysis")
            .with_output("cascade", json!({"aligned": true, "regime": "trending"}))
            .with_output("snapshot", json!({}));
        let report = ChecklistEvaluator::evaluate(&document(), "analysis", CheckStage::Post, &ctx);
        assert!(report.passed());
        assert_eq!(report.passed_ids().count(), 3);
        assert_eq!(report.action(), None);
    }

    #[test]
    fn test_required_failure_picks_most_severe_action() {
        let ctx = ExecutionContext::new("t", "analysis").with_output(
            "cascade",
            json!({"aligned": false, "regime": "choppy", "reason": "structural tier reports no opportunity"}),
        );
        let report = ChecklistEvaluator::evaluate(&document(), "analysis", CheckStage::Post, &ctx);
        assert!(!report.passed());
        assert_eq!(report.required_failures().count(), 2);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.action(), Some(RejectionAction::Reject));
        assert!(report.reason().contains("no opportunity"));
    }

    #[test]
    fn test_optional_failure_is_only_a_warning() {
        let ctx = ExecutionContext::new("t", "analysis")
            .with_output("cascade", json!({"aligned": true, "regime": "trending"}));
        let report = ChecklistEvaluator::evaluate(&document(), "analysis", CheckStage::Post, &ctx);
        assert!(report.passed());
        assert_eq!(report.warnings().next().unwrap().id, "snapshot");
    }

    #[test]
    fn test_unknown_phase_is_empty() {
        let ctx = ExecutionContext::new("t", "execution");
        let report = ChecklistEvaluator::evaluate(&document(), "execution", CheckStage::Pre, &ctx);
        assert!(report.outcomes.is_empty());
        assert!(report.passed());
    }

    #[test]
    fn test_numeric_predicates() {
        let ctx = ExecutionContext::new("t", "validation").with_output("available_capital", json!("25000"));
        assert!(
            ChecklistEvaluator::check(
                &CheckPredicate::MinValue { path: "available_capital".into(), min: 10000.0 },
                &ctx
            )
            .is_ok()
        );
        assert!(
            ChecklistEvaluator::check(
                &CheckPredicate::MaxValue { path: "available_capital".into(), max: 10000.0 },
                &ctx
            )
            .is_err()
        );
    }
}
