//! Pluggable safety rules and the canonical trading rule set.

use crate::context::ExecutionContext;
use crate::tool::entities::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An admission-control predicate over a tool call.
///
/// Returning `Err(reason)` vetoes the call. Rules must not mutate anything;
/// the gate may evaluate them any number of times.
pub trait SafetyRule: Send + Sync {
    /// Stable name, also recorded as a passed guard when the rule admits a call.
    fn name(&self) -> &str;

    fn check(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<(), String>;
}

/// Operator-controlled safety knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Order-placing calls are refused unless this is set.
    pub dry_run: bool,
    /// Cap on projected position size (current + requested quantity).
    pub max_position_size: f64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            dry_run: true,
            max_position_size: 450.0,
        }
    }
}

/// Refuse any order-placing call unless a stop-loss is present in context.
#[derive(Debug, Clone)]
pub struct RequireStopLoss {
    key: String,
}

impl RequireStopLoss {
    pub const NAME: &'static str = "stop_loss_present";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for RequireStopLoss {
    fn default() -> Self {
        Self::new("stop_loss")
    }
}

impl SafetyRule for RequireStopLoss {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check(
        &self,
        tool: &ToolDescriptor,
        _args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<(), String> {
        if !tool.places_order() {
            return Ok(());
        }
        match context.lookup_f64(&self.key) {
            Some(stop) if stop.is_finite() && stop > 0.0 => Ok(()),
            _ => Err(format!(
                "Order refused: no stop-loss '{}' in context",
                self.key
            )),
        }
    }
}

/// Refuse if current + requested quantity exceeds the configured cap.
#[derive(Debug, Clone)]
pub struct MaxPositionSize {
    max: f64,
    position_key: String,
    quantity_arg: String,
}

impl MaxPositionSize {
    pub const NAME: &'static str = "max_position_size";

    pub fn new(max: f64) -> Self {
        Self {
            max,
            position_key: "position_size".to_string(),
            quantity_arg: "quantity".to_string(),
        }
    }
}

impl SafetyRule for MaxPositionSize {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<(), String> {
        if !tool.places_order() {
            return Ok(());
        }
        let current = context.lookup_f64(&self.position_key).unwrap_or(0.0);
        let requested = args
            .get(&self.quantity_arg)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let projected = current + requested;
        if projected > self.max {
            Err(format!(
                "Projected position size {} (current {} + requested {}) exceeds cap {}",
                projected, current, requested, self.max
            ))
        } else {
            Ok(())
        }
    }
}

/// Refuse order-placing calls unless dry-run is explicitly on.
///
/// The flag comes from the operator policy; a `dry_run: true` argument on
/// the call itself also counts.
#[derive(Debug, Clone)]
pub struct RequireDryRun {
    dry_run: bool,
}

impl RequireDryRun {
    pub const NAME: &'static str = "dry_run";

    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl SafetyRule for RequireDryRun {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check(
        &self,
        tool: &ToolDescriptor,
        args: &Map<String, Value>,
        _context: &ExecutionContext,
    ) -> Result<(), String> {
        if !tool.places_order() {
            return Ok(());
        }
        let arg_flag = args.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
        if self.dry_run || arg_flag {
            Ok(())
        } else {
            Err(format!("Order '{}' refused: dry-run flag is not set", tool.name))
        }
    }
}

/// The three canonical trading rules, in evaluation order.
pub fn trading_rules(policy: &SafetyPolicy) -> Vec<Box<dyn SafetyRule>> {
    vec![
        Box::new(RequireStopLoss::default()),
        Box::new(MaxPositionSize::new(policy.max_position_size)),
        Box::new(RequireDryRun::new(policy.dry_run)),
    ]
}
