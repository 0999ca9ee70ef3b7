//! The safety gate: ordered rule evaluation with full veto collection.

use super::rules::{SafetyPolicy, SafetyRule, trading_rules};
use crate::context::ExecutionContext;
use crate::tool::entities::{DeclaredSafetyRule, ToolDescriptor};
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of [`SafetyGate::check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyVerdict {
    pub allowed: bool,
    /// Summary of every veto, empty when allowed.
    pub reason: String,
    pub errors: Vec<String>,
    /// Names of rules that admitted the call (recorded as guards).
    #[serde(skip)]
    pub passed: Vec<String>,
}

/// Evaluates pluggable rules, then descriptor-declared rules.
///
/// Any single veto fails the check; every veto reason is collected.
pub struct SafetyGate {
    rules: Vec<Box<dyn SafetyRule>>,
    dry_run: bool,
}

impl std::fmt::Debug for SafetyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyGate")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl SafetyGate {
    pub fn new(dry_run: bool) -> Self {
        Self {
            rules: Vec::new(),
            dry_run,
        }
    }

    /// Gate preloaded with the canonical trading rules.
    pub fn trading(policy: &SafetyPolicy) -> Self {
        Self {
            rules: trading_rules(policy),
            dry_run: policy.dry_run,
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn SafetyRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn check(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> SafetyVerdict {
        let mut errors = Vec::new();
        let mut passed = Vec::new();

        for rule in &self.rules {
            match rule.check(tool, args, context) {
                Ok(()) => passed.push(rule.name().to_string()),
                Err(reason) => errors.push(format!("[{}] {}", rule.name(), reason)),
            }
        }

        for declared in &tool.safety_rules {
            if let Err(reason) = self.check_declared(declared, tool, args, context) {
                errors.push(reason);
            }
        }

        SafetyVerdict {
            allowed: errors.is_empty(),
            reason: errors.join("; "),
            errors,
            passed,
        }
    }

    fn check_declared(
        &self,
        rule: &DeclaredSafetyRule,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<(), String> {
        match rule {
            DeclaredSafetyRule::RequireContextKey { key } => {
                if context.has(key) {
                    Ok(())
                } else {
                    Err(format!("[require_context_key] '{}' is not in context", key))
                }
            }
            DeclaredSafetyRule::MaxArgument { argument, max } => {
                match args.get(argument).and_then(Value::as_f64) {
                    Some(v) if v > *max => Err(format!(
                        "[max_argument] '{}' = {} exceeds {}",
                        argument, v, max
                    )),
                    _ => Ok(()),
                }
            }
            DeclaredSafetyRule::RequireDryRun => {
                let arg_flag = args.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
                if self.dry_run || arg_flag {
                    Ok(())
                } else {
                    Err(format!("[require_dry_run] '{}' only runs in dry-run mode", tool.name))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{RiskLevel, SideEffects};
    use serde_json::json;

    fn order_tool() -> ToolDescriptor {
        ToolDescriptor::new("place_order", "Place an order", RiskLevel::Critical)
            .with_side_effects(SideEffects::order())
    }

    #[test]
    fn test_collects_every_veto() {
        let gate = SafetyGate::trading(&SafetyPolicy {
            dry_run: false,
            max_position_size: 100.0,
        });
        let ctx = ExecutionContext::new("t", "execution");
        let args = json!({"quantity": 150}).as_object().cloned().unwrap();

        let verdict = gate.check(&order_tool(), &args, &ctx);
        assert!(!verdict.allowed);
        assert_eq!(verdict.errors.len(), 3);
        assert!(verdict.reason.contains("stop_loss_present"));
        assert!(verdict.reason.contains("dry_run"));
        assert!(verdict.passed.is_empty());
    }

    #[test]
    fn test_allowed_records_passed_rules() {
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let ctx = ExecutionContext::new("t", "execution").with_output("stop_loss", json!(85.0));
        let args = json!({"quantity": 75}).as_object().cloned().unwrap();

        let verdict = gate.check(&order_tool(), &args, &ctx);
        assert!(verdict.allowed, "{:?}", verdict.errors);
        assert!(verdict.reason.is_empty());
        assert_eq!(verdict.passed.len(), 3);
    }

    #[test]
    fn test_declared_rules_evaluated_after_pluggable() {
        let gate = SafetyGate::new(false);
        let tool = ToolDescriptor::new("modify_order", "Modify", RiskLevel::High)
            .with_safety_rule(DeclaredSafetyRule::RequireContextKey {
                key: "order_receipt".into(),
            })
            .with_safety_rule(DeclaredSafetyRule::MaxArgument {
                argument: "quantity".into(),
                max: 75.0,
            })
            .with_safety_rule(DeclaredSafetyRule::RequireDryRun);
        let ctx = ExecutionContext::new("t", "execution");
        let args = json!({"quantity": 150}).as_object().cloned().unwrap();

        let verdict = gate.check(&tool, &args, &ctx);
        assert_eq!(verdict.errors.len(), 3, "{:?}", verdict.errors);
        assert!(verdict.errors[0].starts_with("[require_context_key]"));
        assert!(verdict.errors[2].starts_with("[require_dry_run]"));
    }

    #[test]
    fn test_read_only_tool_passes_trading_rules() {
        let gate = SafetyGate::trading(&SafetyPolicy {
            dry_run: false,
            max_position_size: 0.0,
        });
        let tool = ToolDescriptor::new("get_quote", "Quote", RiskLevel::Low);
        let verdict = gate.check(&tool, &Map::new(), &ExecutionContext::new("t", "analysis"));
        assert!(verdict.allowed);
    }
}
