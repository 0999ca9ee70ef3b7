//! The mutable accumulator threaded through a phase run.

use super::path::ContextPath;
use crate::tool::dependencies::CallerType;
use crate::tool::value_objects::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Event recorded whenever an order-placing tool succeeds.
pub const EVENT_ORDER_PLACED: &str = "order_placed";

/// Execution context for one trade run.
///
/// All lookups use a single `String` key space. Once an output key is
/// written it is visible to every later dependency check and derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Identity of the trade (mutual exclusion key for order placement).
    pub trade_id: String,
    /// Current logical state (phase name).
    pub state: String,
    pub caller: CallerType,
    call_counts: BTreeMap<String, u32>,
    results: Vec<ToolResult>,
    events: BTreeSet<String>,
    guards_passed: BTreeSet<String>,
    outputs: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(trade_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            trade_id: trade_id.into(),
            state: state.into(),
            ..Default::default()
        }
    }

    pub fn with_caller(mut self, caller: CallerType) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(key.into(), value);
        self
    }

    /// Seed context for the next phase: everything carries over except the
    /// result list, which is per-phase.
    pub fn seed_next_phase(&self, state: impl Into<String>) -> Self {
        Self {
            trade_id: self.trade_id.clone(),
            state: state.into(),
            caller: self.caller,
            call_counts: self.call_counts.clone(),
            results: Vec::new(),
            events: self.events.clone(),
            guards_passed: self.guards_passed.clone(),
            outputs: self.outputs.clone(),
        }
    }

    // ==================== Lookups ====================

    /// Resolve a dotted/indexed path. Malformed paths resolve to `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        ContextPath::parse(path).ok()?.resolve(&self.outputs)
    }

    pub fn has(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn lookup_f64(&self, path: &str) -> Option<f64> {
        self.lookup(path).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    pub fn results(&self) -> &[ToolResult] {
        &self.results
    }

    pub fn call_count(&self, tool: &str) -> u32 {
        self.call_counts.get(tool).copied().unwrap_or(0)
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub fn guard_passed(&self, guard: &str) -> bool {
        self.guards_passed.contains(guard)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|s| s.as_str())
    }

    pub fn guards(&self) -> impl Iterator<Item = &str> {
        self.guards_passed.iter().map(|s| s.as_str())
    }

    // ==================== Mutation ====================

    pub fn insert_output(&mut self, key: impl Into<String>, value: Value) {
        self.outputs.insert(key.into(), value);
    }

    pub fn record_event(&mut self, event: impl Into<String>) {
        self.events.insert(event.into());
    }

    pub fn mark_guard(&mut self, guard: impl Into<String>) {
        self.guards_passed.insert(guard.into());
    }

    /// Count a dispatched call (successful or not).
    pub fn record_call(&mut self, tool: &str) {
        *self.call_counts.entry(tool.to_string()).or_insert(0) += 1;
    }

    /// Append a result and publish its declared outputs.
    ///
    /// For each `produces` key: if the output object contains that key its
    /// value is published; a single declared key with no match publishes the
    /// whole output.
    pub fn record_result(&mut self, result: ToolResult, produces: &[String]) {
        if result.is_success()
            && let Some(output) = result.output()
        {
            for key in produces {
                let value = match output {
                    Value::Object(map) if map.contains_key(key) => map.get(key).cloned(),
                    _ if produces.len() == 1 => Some(output.clone()),
                    _ => None,
                };
                if let Some(value) = value {
                    self.outputs.insert(key.clone(), value);
                }
            }
            self.events.insert(format!("{}:succeeded", result.tool_name));
        }
        self.results.push(result);
    }

    /// JSON view handed to the planning service.
    pub fn to_planner_view(&self, recent_results: usize) -> Value {
        let skip = self.results.len().saturating_sub(recent_results);
        let recent: Vec<Value> = self.results[skip..].iter().map(|r| {
            let mut wire = r.to_wire();
            if let Value::Object(map) = &mut wire {
                map.insert("tool".to_string(), Value::from(r.tool_name.clone()));
            }
            wire
        }).collect();

        serde_json::json!({
            "trade_id": self.trade_id,
            "state": self.state,
            "outputs": self.outputs,
            "events": self.events,
            "guards_passed": self.guards_passed,
            "call_counts": self.call_counts,
            "recent_results": recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;
    use serde_json::json;

    #[test]
    fn test_single_produce_key_takes_whole_output() {
        let mut ctx = ExecutionContext::new("t-1", "analysis");
        ctx.record_result(
            ToolResult::success("get_expiry_list", json!(["2026-10-20", "2026-10-27"])),
            &["expiry_list".to_string()],
        );

        assert_eq!(ctx.lookup("expiry_list[1]"), Some(&json!("2026-10-27")));
        assert!(ctx.has_event("get_expiry_list:succeeded"));
    }

    #[test]
    fn test_multiple_produce_keys_pick_fields() {
        let mut ctx = ExecutionContext::new("t-1", "validation");
        ctx.record_result(
            ToolResult::success(
                "get_account",
                json!({"available_capital": 50000.0, "position_size": 0, "noise": 1}),
            ),
            &["available_capital".to_string(), "position_size".to_string()],
        );

        assert_eq!(ctx.lookup_f64("available_capital"), Some(50000.0));
        assert_eq!(ctx.lookup_f64("position_size"), Some(0.0));
        assert!(!ctx.has("noise"));
    }

    #[test]
    fn test_failed_result_publishes_nothing() {
        let mut ctx = ExecutionContext::new("t-1", "analysis");
        ctx.record_result(
            ToolResult::failure("get_quote", ToolError::execution_failed("down")),
            &["quote".to_string()],
        );
        assert!(!ctx.has("quote"));
        assert_eq!(ctx.results().len(), 1);
    }

    #[test]
    fn test_seed_next_phase_keeps_outputs_drops_results() {
        let mut ctx = ExecutionContext::new("t-9", "analysis");
        ctx.record_call("get_quote");
        ctx.record_result(
            ToolResult::success("get_quote", json!({"ltp": 101.0})),
            &["quote".to_string()],
        );
        ctx.mark_guard("checklist:analysis");

        let next = ctx.seed_next_phase("validation");
        assert_eq!(next.state, "validation");
        assert_eq!(next.trade_id, "t-9");
        assert_eq!(next.lookup_f64("quote.ltp"), Some(101.0));
        assert_eq!(next.call_count("get_quote"), 1);
        assert!(next.guard_passed("checklist:analysis"));
        assert!(next.results().is_empty());
    }

    #[test]
    fn test_lookup_f64_parses_numeric_strings() {
        let ctx = ExecutionContext::new("t", "validation").with_output("entry", json!("105.50"));
        assert_eq!(ctx.lookup_f64("entry"), Some(105.5));
    }

    #[test]
    fn test_planner_view_limits_results() {
        let mut ctx = ExecutionContext::new("t", "analysis");
        for i in 0..5 {
            ctx.record_result(ToolResult::success("get_quote", json!(i)), &[]);
        }
        let view = ctx.to_planner_view(2);
        let recent = view["recent_results"].as_array().unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1]["result"], json!(4));
        assert_eq!(recent[1]["tool"], "get_quote");
    }
}
