//! The validation phase's numeric, risk-validated output.

use serde::Serialize;
use serde_json::{Value, json};

/// Numeric entry/stop/targets plus a capital-bounded quantity.
///
/// Only the [`RiskConverter`](crate::risk::RiskConverter) can build one; it
/// deliberately has no public constructor and no `Deserialize` impl, so a
/// planner payload can never be turned into an executable plan directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutablePlan {
    instrument: String,
    entry_price: f64,
    stop_loss: f64,
    stop_loss_pct: f64,
    partial_target: f64,
    final_target: f64,
    lots: u32,
    lot_multiplier: u32,
    quantity: u32,
    risk_per_lot: f64,
    total_risk: f64,
    capital_required: f64,
}

pub(crate) struct ExecutablePlanParts {
    pub instrument: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub stop_loss_pct: f64,
    pub partial_target: f64,
    pub final_target: f64,
    pub lots: u32,
    pub lot_multiplier: u32,
    pub risk_per_lot: f64,
}

impl ExecutablePlan {
    pub(crate) fn from_parts(parts: ExecutablePlanParts) -> Self {
        let quantity = parts.lots * parts.lot_multiplier;
        Self {
            instrument: parts.instrument,
            entry_price: parts.entry_price,
            stop_loss: parts.stop_loss,
            stop_loss_pct: parts.stop_loss_pct,
            partial_target: parts.partial_target,
            final_target: parts.final_target,
            lots: parts.lots,
            lot_multiplier: parts.lot_multiplier,
            quantity,
            risk_per_lot: parts.risk_per_lot,
            total_risk: parts.risk_per_lot * f64::from(parts.lots),
            capital_required: parts.entry_price * f64::from(quantity),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    pub fn stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct
    }

    pub fn partial_target(&self) -> f64 {
        self.partial_target
    }

    pub fn final_target(&self) -> f64 {
        self.final_target
    }

    pub fn lots(&self) -> u32 {
        self.lots
    }

    pub fn lot_multiplier(&self) -> u32 {
        self.lot_multiplier
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn risk_per_lot(&self) -> f64 {
        self.risk_per_lot
    }

    pub fn total_risk(&self) -> f64 {
        self.total_risk
    }

    pub fn capital_required(&self) -> f64 {
        self.capital_required
    }

    /// Order arguments bound by this plan. The execution phase splices these
    /// into every order-placing call and refuses disagreeing planner values.
    pub fn order_bindings(&self) -> [(&'static str, Value); 5] {
        [
            ("quantity", json!(self.quantity)),
            ("price", json!(self.entry_price)),
            ("stop_loss", json!(self.stop_loss)),
            ("target", json!(self.final_target)),
            ("symbol", json!(self.instrument)),
        ]
    }

    pub fn to_value(&self) -> Value {
        json!({
            "instrument": self.instrument,
            "entry_price": self.entry_price,
            "stop_loss": self.stop_loss,
            "stop_loss_pct": self.stop_loss_pct,
            "partial_target": self.partial_target,
            "final_target": self.final_target,
            "lots": self.lots,
            "lot_multiplier": self.lot_multiplier,
            "quantity": self.quantity,
            "risk_per_lot": self.risk_per_lot,
            "total_risk": self.total_risk,
            "capital_required": self.capital_required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_fields() {
        let plan = ExecutablePlan::from_parts(ExecutablePlanParts {
            instrument: "NIFTY".into(),
            entry_price: 95.25,
            stop_loss: 85.0,
            stop_loss_pct: 10.76,
            partial_target: 107.55,
            final_target: 115.75,
            lots: 1,
            lot_multiplier: 75,
            risk_per_lot: 768.75,
        });
        assert_eq!(plan.quantity(), 75);
        assert_eq!(plan.total_risk(), 768.75);
        assert_eq!(plan.to_value()["quantity"], 75);
        assert_eq!(plan.order_bindings()[0].1, json!(75));
    }
}
