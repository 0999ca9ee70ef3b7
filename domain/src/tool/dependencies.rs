//! Declarative tool preconditions.
//!
//! Every kind is optional and checked independently by the
//! [`DependencyEnforcer`](crate::dependency::DependencyEnforcer).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who issued a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerType {
    /// The language-model planning service (default).
    #[default]
    Planner,
    /// The orchestrator itself (seeding, artifact extraction).
    Orchestrator,
    /// A human operator.
    Operator,
    /// The post-execution position tracker.
    Tracker,
}

impl CallerType {
    pub fn as_str(&self) -> &str {
        match self {
            CallerType::Planner => "planner",
            CallerType::Orchestrator => "orchestrator",
            CallerType::Operator => "operator",
            CallerType::Tracker => "tracker",
        }
    }
}

impl std::fmt::Display for CallerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which date-range rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeMode {
    /// End date must be the current trading day.
    Live,
    /// Any ordered pair of trading days.
    Historical,
}

/// Date-range constraint over two argument fields (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeRule {
    pub mode: DateRangeMode,
    #[serde(default = "default_from_arg")]
    pub from_arg: String,
    #[serde(default = "default_to_arg")]
    pub to_arg: String,
}

fn default_from_arg() -> String {
    "from_date".to_string()
}

fn default_to_arg() -> String {
    "to_date".to_string()
}

impl DateRangeRule {
    pub fn live() -> Self {
        Self {
            mode: DateRangeMode::Live,
            from_arg: default_from_arg(),
            to_arg: default_to_arg(),
        }
    }

    pub fn historical() -> Self {
        Self {
            mode: DateRangeMode::Historical,
            from_arg: default_from_arg(),
            to_arg: default_to_arg(),
        }
    }
}

/// Preconditions a tool call must satisfy, plus its derived inputs and the
/// output keys it contributes to the execution context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    /// Context paths that must resolve (dotted/indexed, e.g. `expiry_list[0]`).
    pub requires_outputs: Vec<String>,
    /// Current logical state must be one of these (if non-empty).
    pub requires_state: Vec<String>,
    pub forbidden_states: Vec<String>,
    /// Safety guards that must already have passed.
    pub requires_guards: Vec<String>,
    /// Events that must not have occurred yet.
    pub forbidden_after: Vec<String>,
    pub forbidden_callers: Vec<CallerType>,
    /// Per-trade call-count cap.
    pub max_calls_per_trade: Option<u32>,
    /// Tools that must have been called at least once.
    pub requires_tools: Vec<String>,
    /// Argument name -> context path to splice in when the argument is absent.
    pub derives: BTreeMap<String, String>,
    /// Output keys this tool writes into the context.
    pub produces: Vec<String>,
    pub date_range: Option<DateRangeRule>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires_output(mut self, path: impl Into<String>) -> Self {
        self.requires_outputs.push(path.into());
        self
    }

    pub fn requires_state(mut self, state: impl Into<String>) -> Self {
        self.requires_state.push(state.into());
        self
    }

    pub fn forbidden_state(mut self, state: impl Into<String>) -> Self {
        self.forbidden_states.push(state.into());
        self
    }

    pub fn requires_guard(mut self, guard: impl Into<String>) -> Self {
        self.requires_guards.push(guard.into());
        self
    }

    pub fn forbidden_after(mut self, event: impl Into<String>) -> Self {
        self.forbidden_after.push(event.into());
        self
    }

    pub fn forbid_caller(mut self, caller: CallerType) -> Self {
        self.forbidden_callers.push(caller);
        self
    }

    pub fn max_calls(mut self, cap: u32) -> Self {
        self.max_calls_per_trade = Some(cap);
        self
    }

    pub fn requires_tool(mut self, tool: impl Into<String>) -> Self {
        self.requires_tools.push(tool.into());
        self
    }

    pub fn derive(mut self, arg: impl Into<String>, path: impl Into<String>) -> Self {
        self.derives.insert(arg.into(), path.into());
        self
    }

    pub fn produces(mut self, key: impl Into<String>) -> Self {
        self.produces.push(key.into());
        self
    }

    pub fn with_date_range(mut self, rule: DateRangeRule) -> Self {
        self.date_range = Some(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let deps = Dependencies::new()
            .requires_output("instrument")
            .requires_state("validation")
            .forbidden_after("order_placed")
            .max_calls(1)
            .derive("symbol", "instrument.symbol")
            .produces("quote");

        assert_eq!(deps.requires_outputs, vec!["instrument"]);
        assert_eq!(deps.max_calls_per_trade, Some(1));
        assert_eq!(deps.derives.get("symbol").unwrap(), "instrument.symbol");
        assert_eq!(deps.produces, vec!["quote"]);
    }

    #[test]
    fn test_deserialize_partial() {
        let deps: Dependencies = serde_json::from_value(serde_json::json!({
            "forbidden_callers": ["tracker"],
            "date_range": {"mode": "live"}
        }))
        .unwrap();

        assert_eq!(deps.forbidden_callers, vec![CallerType::Tracker]);
        let rule = deps.date_range.unwrap();
        assert_eq!(rule.mode, DateRangeMode::Live);
        assert_eq!(rule.from_arg, "from_date");
        assert_eq!(rule.to_arg, "to_date");
    }
}
