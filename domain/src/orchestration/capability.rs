//! Per-phase capability table.
//!
//! Answers "what is allowed in this phase": whether the planner may run at
//! all, the iteration/timeout budget, the tool allowlist, the output schema
//! a `final` directive must satisfy, and early-exit predicates.

use super::phase::Phase;
use super::phase_result::PhaseStatus;
use super::stop_condition::StopCondition;
use crate::plan::TradePlan;
use crate::tool::schema::{FieldSpec, FieldType, Schema};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCapability {
    pub phase: Phase,
    /// Post-execution tracking is planner-free.
    pub planner_allowed: bool,
    pub max_iterations: usize,
    pub timeout: Duration,
    pub tools: Vec<String>,
    pub output_schema: Schema,
    pub stop_conditions: Vec<StopCondition>,
}

impl PhaseCapability {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            planner_allowed: true,
            max_iterations: 5,
            timeout: Duration::from_secs(60),
            tools: Vec::new(),
            output_schema: Schema::new(),
            stop_conditions: Vec::new(),
        }
    }

    pub fn planner_free(phase: Phase) -> Self {
        Self {
            planner_allowed: false,
            max_iterations: 0,
            ..Self::new(phase)
        }
    }

    pub fn with_budget(mut self, max_iterations: usize, timeout: Duration) -> Self {
        self.max_iterations = max_iterations;
        self.timeout = timeout;
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_conditions.push(condition);
        self
    }

    pub fn allows_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    /// The status this phase must end in for the run to continue.
    pub fn success_status(&self) -> PhaseStatus {
        match self.phase {
            Phase::Validation => PhaseStatus::Approved,
            _ => PhaseStatus::Completed,
        }
    }
}

/// Output schema of the validation phase's `final` directive.
pub fn validation_output_schema() -> Schema {
    Schema::new()
        .field(
            FieldSpec::new("decision", FieldType::String)
                .required()
                .with_enum(["proceed", "abort"]),
        )
        .field(
            FieldSpec::new("entry_price", FieldType::Number)
                .with_min(0.0)
                .with_description("Observed entry premium; risk numbers are recomputed"),
        )
        .field(FieldSpec::new("notes", FieldType::String))
}

/// Output schema of the execution phase's `final` directive.
pub fn execution_output_schema() -> Schema {
    Schema::new()
        .field(FieldSpec::new("order_receipt", FieldType::Object))
        .field(FieldSpec::new("summary", FieldType::String))
}

/// Capabilities keyed by phase.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityTable {
    phases: BTreeMap<Phase, PhaseCapability>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let circuit_breaker = StopCondition::AllFailed { window: 3 };
        Self::new()
            .with(
                PhaseCapability::new(Phase::Analysis)
                    .with_budget(8, Duration::from_secs(120))
                    .with_tools(["get_market_snapshot", "get_expiry_list", "get_option_chain"])
                    .with_output_schema(TradePlan::output_schema())
                    .with_stop_condition(circuit_breaker.clone()),
            )
            .with(
                PhaseCapability::new(Phase::Validation)
                    .with_budget(6, Duration::from_secs(90))
                    .with_tools(["get_quote", "get_available_capital"])
                    .with_output_schema(validation_output_schema())
                    .with_stop_condition(circuit_breaker.clone()),
            )
            .with(
                PhaseCapability::new(Phase::Execution)
                    .with_budget(3, Duration::from_secs(30))
                    .with_tools(["place_order"])
                    .with_output_schema(execution_output_schema())
                    .with_stop_condition(StopCondition::OutputsPresent {
                        keys: vec!["order_receipt".to_string()],
                    })
                    .with_stop_condition(circuit_breaker),
            )
            .with(PhaseCapability::planner_free(Phase::PostExecutionTracking))
    }
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self {
            phases: BTreeMap::new(),
        }
    }

    pub fn with(mut self, capability: PhaseCapability) -> Self {
        self.insert(capability);
        self
    }

    pub fn insert(&mut self, capability: PhaseCapability) {
        self.phases.insert(capability.phase, capability);
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseCapability> {
        self.phases.get(&phase)
    }

    pub fn get_mut(&mut self, phase: Phase) -> Option<&mut PhaseCapability> {
        self.phases.get_mut(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseCapability> {
        self.phases.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = CapabilityTable::default();
        let tracking = table.get(Phase::PostExecutionTracking).unwrap();
        assert!(!tracking.planner_allowed);
        assert_eq!(tracking.max_iterations, 0);

        let execution = table.get(Phase::Execution).unwrap();
        assert!(execution.allows_tool("place_order"));
        assert!(!execution.allows_tool("get_quote"));

        assert_eq!(
            table.get(Phase::Validation).unwrap().success_status(),
            PhaseStatus::Approved
        );
    }
}
