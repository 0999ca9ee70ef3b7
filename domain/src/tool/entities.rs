//! Tool domain entities

use super::dependencies::Dependencies;
use super::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Risk level of a tool operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only lookups (quotes, option chains, calendars)
    Low,
    /// Reads account state (balances, positions)
    Medium,
    /// Mutates external state
    High,
    /// Places or modifies real orders
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side-effect flags of a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffects {
    /// The tool changes state outside this process.
    pub external_write: bool,
    /// The tool places (or modifies) an order.
    pub places_order: bool,
}

impl SideEffects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn order() -> Self {
        Self {
            external_write: true,
            places_order: true,
        }
    }

    pub fn is_side_effect_free(&self) -> bool {
        !self.external_write && !self.places_order
    }
}

/// A safety rule declared on the descriptor itself, evaluated by the
/// [`SafetyGate`](crate::safety::SafetyGate) after its pluggable rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DeclaredSafetyRule {
    /// A context key must be present.
    RequireContextKey { key: String },
    /// A numeric argument must not exceed `max`.
    MaxArgument { argument: String, max: f64 },
    /// The call is only admitted in dry-run mode.
    RequireDryRun,
}

/// Immutable description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "get_quote")
    pub name: String,
    /// Human-readable description
    pub description: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub side_effects: SideEffects,
    #[serde(default)]
    pub input_schema: Schema,
    #[serde(default)]
    pub output_schema: Schema,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub safety_rules: Vec<DeclaredSafetyRule>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            risk_level,
            side_effects: SideEffects::none(),
            input_schema: Schema::new(),
            output_schema: Schema::new(),
            dependencies: Dependencies::new(),
            safety_rules: Vec::new(),
        }
    }

    pub fn with_input(mut self, schema: Schema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output(mut self, schema: Schema) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_safety_rule(mut self, rule: DeclaredSafetyRule) -> Self {
        self.safety_rules.push(rule);
        self
    }

    pub fn places_order(&self) -> bool {
        self.side_effects.places_order
    }

    /// Catalogue entry in the shape the planning service consumes.
    pub fn to_planner_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "risk_level": self.risk_level.as_str(),
            "side_effects": {
                "external_write": self.side_effects.external_write,
                "places_order": self.side_effects.places_order,
            },
            "input_schema": self.input_schema.to_json_schema(),
        })
    }
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Optional reasoning for why this tool is being called
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
            reasoning: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.arguments.get(key).and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::schema::{FieldSpec, FieldType};

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_order_side_effects() {
        let place = ToolDescriptor::new("place_order", "Place an order", RiskLevel::Critical)
            .with_side_effects(SideEffects::order());
        assert!(place.places_order());
        assert!(!place.side_effects.is_side_effect_free());

        let quote = ToolDescriptor::new("get_quote", "Quote", RiskLevel::Low);
        assert!(quote.side_effects.is_side_effect_free());
    }

    #[test]
    fn test_planner_schema_export() {
        let tool = ToolDescriptor::new("get_quote", "Latest traded price", RiskLevel::Low)
            .with_input(Schema::new().field(FieldSpec::new("symbol", FieldType::String).required()));

        let schema = tool.to_planner_schema();
        assert_eq!(schema["name"], "get_quote");
        assert_eq!(schema["risk_level"], "low");
        assert_eq!(schema["side_effects"]["places_order"], false);
        assert_eq!(schema["input_schema"]["required"][0], "symbol");
    }

    #[test]
    fn test_declared_rule_serde() {
        let rule: DeclaredSafetyRule = serde_json::from_value(serde_json::json!({
            "rule": "max_argument",
            "argument": "quantity",
            "max": 450.0
        }))
        .unwrap();
        assert_eq!(
            rule,
            DeclaredSafetyRule::MaxArgument {
                argument: "quantity".into(),
                max: 450.0
            }
        );
    }

    #[test]
    fn test_tool_call_accessors() {
        let call = ToolCall::new("place_order")
            .with_arg("symbol", "NIFTY24500CE")
            .with_arg("price", 95.25)
            .with_reasoning("entry trigger hit");

        assert_eq!(call.get_string("symbol"), Some("NIFTY24500CE"));
        assert_eq!(call.get_f64("price"), Some(95.25));
        assert!(call.get_string("missing").is_none());
    }
}
