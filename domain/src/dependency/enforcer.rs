//! Dependency enforcer: workflow-correctness checks for tool calls.

use super::calendar::{TradingCalendar, parse_date};
use crate::context::ExecutionContext;
use crate::tool::dependencies::{DateRangeMode, DateRangeRule};
use crate::tool::entities::ToolDescriptor;
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of [`DependencyEnforcer::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl DependencyCheck {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validates declarative preconditions and splices derived inputs.
///
/// Every dependency kind is checked independently; all violations are
/// reported together.
#[derive(Debug, Clone)]
pub struct DependencyEnforcer {
    calendar: TradingCalendar,
}

impl DependencyEnforcer {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    pub fn validate(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> DependencyCheck {
        let deps = &tool.dependencies;
        let mut errors = Vec::new();

        for path in &deps.requires_outputs {
            if !context.has(path) {
                errors.push(format!("Missing required output '{}'", path));
            }
        }

        if !deps.requires_state.is_empty() && !deps.requires_state.contains(&context.state) {
            errors.push(format!(
                "State '{}' is not one of the required states [{}]",
                context.state,
                deps.requires_state.join(", ")
            ));
        }

        if deps.forbidden_states.contains(&context.state) {
            errors.push(format!("Tool '{}' is forbidden in state '{}'", tool.name, context.state));
        }

        for guard in &deps.requires_guards {
            if !context.guard_passed(guard) {
                errors.push(format!("Safety guard '{}' has not passed", guard));
            }
        }

        for event in &deps.forbidden_after {
            if context.has_event(event) {
                errors.push(format!("Tool '{}' is forbidden after event '{}'", tool.name, event));
            }
        }

        if deps.forbidden_callers.contains(&context.caller) {
            errors.push(format!(
                "Caller '{}' may not invoke '{}'",
                context.caller, tool.name
            ));
        }

        if let Some(cap) = deps.max_calls_per_trade {
            let count = context.call_count(&tool.name);
            if count >= cap {
                errors.push(format!(
                    "Tool '{}' reached its per-trade cap ({} of {})",
                    tool.name, count, cap
                ));
            }
        }

        for required in &deps.requires_tools {
            if context.call_count(required) == 0 {
                errors.push(format!("Tool '{}' must be called before '{}'", required, tool.name));
            }
        }

        if let Some(rule) = &deps.date_range {
            errors.extend(self.check_date_range(rule, args));
        }

        DependencyCheck::from_errors(errors)
    }

    fn check_date_range(&self, rule: &DateRangeRule, args: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();
        let from = parse_date(args.get(&rule.from_arg), &rule.from_arg);
        let to = parse_date(args.get(&rule.to_arg), &rule.to_arg);

        let (from, to) = match (from, to) {
            (Ok(from), Ok(to)) => (from, to),
            (from, to) => {
                errors.extend(from.err());
                errors.extend(to.err());
                return errors;
            }
        };

        if from > to {
            errors.push(format!("Date range is reversed: {} > {}", from, to));
        }
        for (field, date) in [(&rule.from_arg, from), (&rule.to_arg, to)] {
            if !self.calendar.is_trading_day(date) {
                errors.push(format!("'{}' ({}) is not a trading day", field, date));
            }
        }
        if rule.mode == DateRangeMode::Live {
            let current = self.calendar.current_trading_day();
            if to != current {
                errors.push(format!(
                    "Live mode requires '{}' to be the current trading day {}, got {}",
                    rule.to_arg, current, to
                ));
            }
        }
        errors
    }

    /// Fill in derived arguments the caller did not supply explicitly.
    ///
    /// Explicit arguments are never overwritten, so applying this twice is a
    /// no-op. Paths that do not resolve are left for `validate` to report.
    pub fn resolve_derived_inputs(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Map<String, Value> {
        let mut resolved = args.clone();
        for (arg, path) in &tool.dependencies.derives {
            let explicit = resolved.get(arg).is_some_and(|v| !v.is_null());
            if explicit {
                continue;
            }
            if let Some(value) = context.lookup(path) {
                resolved.insert(arg.clone(), value.clone());
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::dependencies::{CallerType, Dependencies};
    use crate::tool::entities::RiskLevel;
    use crate::dependency::calendar::DayClock;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn enforcer() -> DependencyEnforcer {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(); // Friday
        DependencyEnforcer::new(
            TradingCalendar::new(today)
                .with_holidays([NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()]),
        )
    }

    fn tool(deps: Dependencies) -> ToolDescriptor {
        ToolDescriptor::new("get_option_chain", "Option chain", RiskLevel::Low)
            .with_dependencies(deps)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_outputs_named_including_nested_paths() {
        let ctx = ExecutionContext::new("t", "analysis")
            .with_output("instrument", json!({"symbol": "NIFTY"}))
            .with_output("expiry_list", json!([]));
        let deps = Dependencies::new()
            .requires_output("instrument.symbol")
            .requires_output("instrument.lot_size")
            .requires_output("expiry_list[0]")
            .requires_output("available_capital");

        let check = enforcer().validate(&tool(deps), &Map::new(), &ctx);
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 3);
        assert!(check.errors.iter().any(|e| e.contains("'instrument.lot_size'")));
        assert!(check.errors.iter().any(|e| e.contains("'expiry_list[0]'")));
        assert!(check.errors.iter().any(|e| e.contains("'available_capital'")));
    }

    #[test]
    fn test_all_kinds_reported_together() {
        let mut ctx = ExecutionContext::new("t", "execution").with_caller(CallerType::Tracker);
        ctx.record_event("order_placed");
        ctx.record_call("get_option_chain");

        let deps = Dependencies::new()
            .requires_state("analysis")
            .forbidden_state("execution")
            .requires_guard("stop_loss_present")
            .forbidden_after("order_placed")
            .forbid_caller(CallerType::Tracker)
            .max_calls(1)
            .requires_tool("get_expiry_list");

        let check = enforcer().validate(&tool(deps), &Map::new(), &ctx);
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 7, "{:?}", check.errors);
    }

    #[test]
    fn test_satisfied_dependencies_pass() {
        let mut ctx = ExecutionContext::new("t", "analysis")
            .with_output("instrument", json!({"symbol": "NIFTY"}));
        ctx.record_call("get_expiry_list");
        ctx.mark_guard("stop_loss_present");

        let deps = Dependencies::new()
            .requires_output("instrument")
            .requires_state("analysis")
            .requires_guard("stop_loss_present")
            .forbidden_after("order_placed")
            .max_calls(2)
            .requires_tool("get_expiry_list");

        let check = enforcer().validate(&tool(deps), &Map::new(), &ctx);
        assert!(check.valid, "{:?}", check.errors);
    }

    #[test]
    fn test_live_date_range() {
        let t = tool(Dependencies::new().with_date_range(DateRangeRule::live()));
        let ctx = ExecutionContext::new("t", "analysis");
        let e = enforcer();

        let ok = e.validate(&t, &args(json!({"from_date": "2026-10-12", "to_date": "2026-10-16"})), &ctx);
        assert!(ok.valid, "{:?}", ok.errors);

        let stale = e.validate(&t, &args(json!({"from_date": "2026-10-12", "to_date": "2026-10-15"})), &ctx);
        assert!(!stale.valid);
        assert!(stale.errors[0].contains("current trading day"));
    }

    #[derive(Debug)]
    struct NextDayClock(AtomicBool);

    impl DayClock for NextDayClock {
        fn today(&self) -> NaiveDate {
            let day = if self.0.load(Ordering::SeqCst) { 19 } else { 16 };
            NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
        }
    }

    #[test]
    fn test_live_date_range_follows_the_clock() {
        let clock = Arc::new(NextDayClock(AtomicBool::new(false)));
        let e = DependencyEnforcer::new(TradingCalendar::with_clock(clock.clone()));
        let t = tool(Dependencies::new().with_date_range(DateRangeRule::live()));
        let ctx = ExecutionContext::new("t", "analysis");
        let friday = args(json!({"from_date": "2026-10-12", "to_date": "2026-10-16"}));
        let monday = args(json!({"from_date": "2026-10-12", "to_date": "2026-10-19"}));

        assert!(e.validate(&t, &friday, &ctx).valid);
        assert!(!e.validate(&t, &monday, &ctx).valid);

        clock.0.store(true, Ordering::SeqCst);
        assert!(!e.validate(&t, &friday, &ctx).valid);
        assert!(e.validate(&t, &monday, &ctx).valid);
    }

    #[test]
    fn test_historical_date_range() {
        let t = tool(Dependencies::new().with_date_range(DateRangeRule::historical()));
        let ctx = ExecutionContext::new("t", "analysis");
        let e = enforcer();

        let ok = e.validate(&t, &args(json!({"from_date": "2026-10-05", "to_date": "2026-10-09"})), &ctx);
        assert!(ok.valid, "{:?}", ok.errors);

        let bad = e.validate(
            &t,
            &args(json!({"from_date": "2026-10-14", "to_date": "2026-10-11"})),
            &ctx,
        );
        // reversed, holiday, Sunday
        assert_eq!(bad.errors.len(), 3, "{:?}", bad.errors);
    }

    #[test]
    fn test_malformed_dates_fail_validation() {
        let t = tool(Dependencies::new().with_date_range(DateRangeRule::historical()));
        let ctx = ExecutionContext::new("t", "analysis");
        let check = enforcer().validate(&t, &args(json!({"from_date": "yesterday"})), &ctx);
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 2);
    }

    #[test]
    fn test_resolve_derived_inputs_is_idempotent() {
        let t = tool(
            Dependencies::new()
                .derive("symbol", "instrument.symbol")
                .derive("expiry", "expiry_list[0]")
                .derive("capital", "available_capital"),
        );
        let ctx = ExecutionContext::new("t", "analysis")
            .with_output("instrument", json!({"symbol": "NIFTY"}))
            .with_output("expiry_list", json!(["2026-10-20"]));
        let e = enforcer();

        let explicit = args(json!({"symbol": "BANKNIFTY"}));
        let once = e.resolve_derived_inputs(&t, &explicit, &ctx);
        let twice = e.resolve_derived_inputs(&t, &once, &ctx);

        assert_eq!(once, twice);
        assert_eq!(once["symbol"], "BANKNIFTY");
        assert_eq!(once["expiry"], "2026-10-20");
        assert!(!once.contains_key("capital"));
    }
}
