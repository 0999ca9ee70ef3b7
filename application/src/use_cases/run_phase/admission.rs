//! Per-call admission: derived inputs → dependencies → safety → risk binding.
//!
//! Every violated dependency is reported together. Safety vetoes are
//! terminal for the call only. Order-placing calls have the executable
//! plan's numbers spliced in; a planner value that disagrees is refused.

use crate::ports::tool_executor::ToolExecutorPort;
use serde_json::{Map, Value};
use tradegate_domain::{
    DependencyEnforcer, ExecutablePlan, ExecutionContext, SafetyGate, ToolCall, ToolError,
};

const PRICE_TOLERANCE: f64 = 1e-6;

pub(super) struct Admission<'a> {
    pub enforcer: &'a DependencyEnforcer,
    pub gate: &'a SafetyGate,
    pub plan: Option<&'a ExecutablePlan>,
}

impl Admission<'_> {
    /// Returns the call as it will be dispatched, or the refusal.
    ///
    /// Unknown tools pass through untouched so the registry reports
    /// `NOT_FOUND`. Safety rules that pass are marked as guards.
    pub fn admit(
        &self,
        tools: &dyn ToolExecutorPort,
        call: ToolCall,
        context: &mut ExecutionContext,
        batched: bool,
    ) -> Result<ToolCall, ToolError> {
        let Some(descriptor) = tools.descriptor(&call.tool_name) else {
            return Ok(call);
        };

        if batched && !descriptor.side_effects.is_side_effect_free() {
            return Err(ToolError::invalid_argument(vec![format!(
                "'{}' has side effects and cannot be part of a tool_batch",
                descriptor.name
            )]));
        }

        let mut arguments =
            self.enforcer
                .resolve_derived_inputs(descriptor, &call.arguments, context);

        let check = self.enforcer.validate(descriptor, &arguments, context);
        let mismatches = if descriptor.places_order() {
            self.bind_risk(&mut arguments)
        } else {
            Vec::new()
        };

        if !check.valid {
            return Err(ToolError::dependency_failed(check.errors));
        }

        let verdict = self.gate.check(descriptor, &arguments, context);
        if !verdict.allowed {
            return Err(ToolError::safety_veto(verdict.reason, verdict.errors));
        }

        if !mismatches.is_empty() {
            return Err(ToolError::risk_mismatch(mismatches));
        }

        for guard in verdict.passed {
            context.mark_guard(guard);
        }

        Ok(ToolCall { arguments, ..call })
    }

    /// Splice the plan's order bindings in; return every disagreement.
    fn bind_risk(&self, arguments: &mut Map<String, Value>) -> Vec<String> {
        let Some(plan) = self.plan else {
            return vec!["order-placing call without a risk-validated executable plan".to_string()];
        };

        let mut mismatches = Vec::new();
        for (key, bound) in plan.order_bindings() {
            if let Some(proposed) = arguments.get(key)
                && !proposed.is_null()
                && !agrees(proposed, &bound)
            {
                mismatches.push(format!(
                    "'{}' = {} disagrees with the validated plan ({})",
                    key, proposed, bound
                ));
            }
            arguments.insert(key.to_string(), bound);
        }
        mismatches
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn agrees(proposed: &Value, bound: &Value) -> bool {
    match (bound, as_number(proposed)) {
        (Value::Number(_), Some(p)) => {
            as_number(bound).is_some_and(|b| (p - b).abs() < PRICE_TOLERANCE)
        }
        (Value::String(b), _) => proposed
            .as_str()
            .is_some_and(|p| p.trim().eq_ignore_ascii_case(b)),
        _ => proposed == bound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_handler::handler_fn;
    use crate::registry::ToolRegistry;
    use chrono::NaiveDate;
    use serde_json::json;
    use tradegate_domain::{
        Dependencies, Instrument, RiskConverter, RiskDecision, RiskLevel, RiskParams,
        SafetyPolicy, SideEffects, ToolDescriptor, TradeRiskInput, TradingCalendar,
    };

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("get_quote", "Quote", RiskLevel::Low).with_dependencies(
                    Dependencies::new()
                        .requires_output("instrument")
                        .derive("symbol", "instrument"),
                ),
                handler_fn(|_| async { Ok(json!({"ltp": 95.25})) }),
            )
            .unwrap()
            .with_tool(
                ToolDescriptor::new("place_order", "Order", RiskLevel::Critical)
                    .with_side_effects(SideEffects::order())
                    .with_dependencies(Dependencies::new().requires_guard("risk_validated")),
                handler_fn(|_| async { Ok(json!({"order_id": "A1"})) }),
            )
            .unwrap()
    }

    fn enforcer() -> DependencyEnforcer {
        DependencyEnforcer::new(TradingCalendar::new(
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        ))
    }

    fn plan() -> ExecutablePlan {
        let converter = RiskConverter::new(RiskParams::default(), Instrument::nifty());
        match converter.validate_trade_plan(&TradeRiskInput {
            entry_price: 95.25,
            stop_loss_text: "85".into(),
            target_text: None,
            available_capital: None,
        }) {
            RiskDecision::Approved(plan) => plan,
            RiskDecision::Rejected(r) => panic!("unexpected rejection: {}", r),
        }
    }

    fn order_context() -> ExecutionContext {
        let mut ctx = ExecutionContext::new("t-1", "execution")
            .with_output("stop_loss", json!(85.0));
        ctx.mark_guard("risk_validated");
        ctx
    }

    #[test]
    fn test_derived_inputs_spliced() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: None,
        };
        let mut ctx = ExecutionContext::new("t-1", "validation").with_output("instrument", json!("NIFTY"));

        let call = admission
            .admit(&tools, ToolCall::new("get_quote"), &mut ctx, false)
            .unwrap();
        assert_eq!(call.get_string("symbol"), Some("NIFTY"));
    }

    #[test]
    fn test_dependency_failure_lists_missing_output() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: None,
        };
        let mut ctx = ExecutionContext::new("t-1", "validation");

        let err = admission
            .admit(&tools, ToolCall::new("get_quote"), &mut ctx, false)
            .unwrap_err();
        assert_eq!(err.code, "DEPENDENCY_FAILED");
        assert!(err.message.contains("instrument"));
    }

    #[test]
    fn test_order_bound_to_plan() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let plan = plan();
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: Some(&plan),
        };
        let mut ctx = order_context();

        let call = admission
            .admit(
                &tools,
                ToolCall::new("place_order").with_arg("quantity", "75"),
                &mut ctx,
                false,
            )
            .unwrap();
        assert_eq!(call.get_f64("quantity"), Some(75.0));
        assert_eq!(call.get_f64("stop_loss"), Some(85.0));
        assert_eq!(call.get_string("symbol"), Some("NIFTY"));
        assert!(ctx.guard_passed("stop_loss_present"));
    }

    #[test]
    fn test_disagreeing_quantity_refused() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let plan = plan();
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: Some(&plan),
        };
        let mut ctx = order_context();

        let err = admission
            .admit(
                &tools,
                ToolCall::new("place_order").with_arg("quantity", 150),
                &mut ctx,
                false,
            )
            .unwrap_err();
        assert_eq!(err.code, "RISK_MISMATCH");
        assert!(err.message.contains("quantity"));
    }

    #[test]
    fn test_order_without_plan_or_in_batch_refused() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: None,
        };
        let mut ctx = order_context();

        let err = admission
            .admit(&tools, ToolCall::new("place_order"), &mut ctx, false)
            .unwrap_err();
        assert_eq!(err.code, "RISK_MISMATCH");

        let err = admission
            .admit(&tools, ToolCall::new("place_order"), &mut ctx, true)
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");
    }

    #[test]
    fn test_safety_veto_without_stop_loss() {
        let tools = registry();
        let enforcer = enforcer();
        let gate = SafetyGate::trading(&SafetyPolicy::default());
        let plan = plan();
        let admission = Admission {
            enforcer: &enforcer,
            gate: &gate,
            plan: Some(&plan),
        };
        let mut ctx = ExecutionContext::new("t-1", "execution");
        ctx.mark_guard("risk_validated");

        let err = admission
            .admit(&tools, ToolCall::new("place_order"), &mut ctx, false)
            .unwrap_err();
        assert_eq!(err.code, "SAFETY_VETO");
        assert!(!ctx.guard_passed("stop_loss_present"));
    }
}
