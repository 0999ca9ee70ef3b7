//! Deterministic conversion of qualitative exit guidance into numeric,
//! capital-bounded order parameters.
//!
//! Every function here is pure. Rejections are values ([`RiskRejection`]),
//! never panics or errors: a rejected plan is an expected outcome.

use super::instrument::{Instrument, RiskParams, StopFallback};
use super::parsing::{StopSpec, TextLevel, extract_levels, parse_stop};
use crate::plan::executable_plan::{ExecutablePlan, ExecutablePlanParts};
use serde::Serialize;

const EPSILON: f64 = 1e-9;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Which step of [`RiskConverter::validate_trade_plan`] rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStage {
    StopLoss,
    Target,
    LotSize,
    Funds,
}

impl RiskStage {
    pub fn as_str(&self) -> &str {
        match self {
            RiskStage::StopLoss => "stop_loss",
            RiskStage::Target => "target",
            RiskStage::LotSize => "lot_size",
            RiskStage::Funds => "funds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRejection {
    pub stage: RiskStage,
    pub reason: String,
}

impl RiskRejection {
    fn new(stage: RiskStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage.as_str(), self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    Percentage,
    Absolute,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopLoss {
    pub price: f64,
    /// Distance below entry, percent.
    pub pct: f64,
    pub source: StopSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Targets {
    pub partial: f64,
    pub final_target: f64,
    pub partial_rr: f64,
    pub final_rr: f64,
}

/// Result of [`RiskConverter::lot_size`]. `lots == 0` always carries a
/// rejection; `risk_per_lot` is never negative or NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotSizing {
    pub lots: u32,
    pub quantity: u32,
    pub risk_per_lot: f64,
    pub max_risk_amount: f64,
    pub rejection: Option<String>,
}

impl LotSizing {
    pub fn is_approved(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Inputs to [`RiskConverter::validate_trade_plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRiskInput {
    pub entry_price: f64,
    pub stop_loss_text: String,
    pub target_text: Option<String>,
    /// Capital available for this trade; defaults to the account balance.
    pub available_capital: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Approved(ExecutablePlan),
    Rejected(RiskRejection),
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved(_))
    }
}

/// Risk converter for one instrument under one set of account parameters.
#[derive(Debug, Clone)]
pub struct RiskConverter {
    params: RiskParams,
    instrument: Instrument,
}

impl RiskConverter {
    pub fn new(params: RiskParams, instrument: Instrument) -> Self {
        Self { params, instrument }
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Capital-bounded lot count for a long premium position.
    pub fn lot_size(&self, entry: f64, stop: f64) -> LotSizing {
        let max_risk_amount = self.params.max_risk_amount();
        let reject = |reason: String, risk_per_lot: f64| LotSizing {
            lots: 0,
            quantity: 0,
            risk_per_lot,
            max_risk_amount,
            rejection: Some(reason),
        };

        if !entry.is_finite() || !stop.is_finite() || entry <= 0.0 || stop < 0.0 {
            return reject(
                format!("Entry {} and stop {} must be finite, non-negative prices", entry, stop),
                0.0,
            );
        }
        if stop >= entry {
            return reject(
                format!("Stop-loss {} must be below entry {}", stop, entry),
                0.0,
            );
        }

        let risk_per_lot = round2((entry - stop) * f64::from(self.instrument.lot_multiplier));
        let cap = self.params.lot_cap();
        let raw_lots = (max_risk_amount / risk_per_lot + EPSILON).floor();

        if raw_lots < 1.0 {
            return reject(
                format!(
                    "Risk per lot {:.2} exceeds max risk {:.2} ({}% of {:.2}); lot cap {}",
                    risk_per_lot,
                    max_risk_amount,
                    self.params.max_risk_pct,
                    self.params.account_balance,
                    cap
                ),
                risk_per_lot,
            );
        }

        // raw_lots >= 1 and finite here; the cap bounds the cast
        let lots = if raw_lots >= f64::from(cap) {
            cap
        } else {
            raw_lots as u32
        };
        LotSizing {
            lots,
            quantity: lots * self.instrument.lot_multiplier,
            risk_per_lot,
            max_risk_amount,
            rejection: None,
        }
    }

    /// Convert stop-loss guidance into a price below `entry`.
    ///
    /// A stop wider than the instrument's cap is rejected, not clamped.
    pub fn convert_stop_loss(&self, text: &str, entry: f64) -> Result<StopLoss, RiskRejection> {
        if !entry.is_finite() || entry <= 0.0 {
            return Err(RiskRejection::new(
                RiskStage::StopLoss,
                format!("Entry price {} is not a positive number", entry),
            ));
        }

        let (price, pct, source) = match parse_stop(text) {
            Some(StopSpec::Percent(pct)) => {
                (round2(entry * (1.0 - pct / 100.0)), pct, StopSource::Percentage)
            }
            Some(StopSpec::Price(level)) => {
                if level >= entry {
                    return Err(RiskRejection::new(
                        RiskStage::StopLoss,
                        format!("Stop-loss level {} is not below entry {}", level, entry),
                    ));
                }
                (level, (entry - level) / entry * 100.0, StopSource::Absolute)
            }
            None => match self.params.stop_fallback {
                StopFallback::UseDefault => {
                    let pct = self.params.default_stop_pct;
                    (round2(entry * (1.0 - pct / 100.0)), pct, StopSource::Default)
                }
                StopFallback::Reject => {
                    return Err(RiskRejection::new(
                        RiskStage::StopLoss,
                        format!("No stop-loss level found in '{}'", text),
                    ));
                }
            },
        };

        if pct <= 0.0 {
            return Err(RiskRejection::new(
                RiskStage::StopLoss,
                format!("Stop-loss distance {:.2}% must be positive", pct),
            ));
        }

        let cap = self.instrument.max_stop_loss_pct;
        if pct > cap + EPSILON {
            return Err(RiskRejection::new(
                RiskStage::StopLoss,
                format!(
                    "Stop-loss {:.2}% exceeds {} cap of {}%",
                    pct, self.instrument.symbol, cap
                ),
            ));
        }

        Ok(StopLoss {
            price,
            pct: round2(pct.min(cap)),
            source,
        })
    }

    /// Partial and final targets relative to the converted stop.
    pub fn convert_targets(
        &self,
        text: Option<&str>,
        entry: f64,
        stop: f64,
    ) -> Result<Targets, RiskRejection> {
        let risk = entry - stop;
        if !risk.is_finite() || risk <= 0.0 {
            return Err(RiskRejection::new(
                RiskStage::Target,
                format!("Cannot size targets with entry {} and stop {}", entry, stop),
            ));
        }

        let mut levels: Vec<f64> = text
            .map(extract_levels)
            .unwrap_or_default()
            .into_iter()
            .map(|level| match level {
                TextLevel::Price(p) => p,
                TextLevel::Percent(p) => round2(entry * (1.0 + p / 100.0)),
                TextLevel::RiskMultiple(m) => round2(entry + m * risk),
            })
            .filter(|p| p.is_finite())
            .collect();
        levels.sort_by(f64::total_cmp);

        let at_rr = |rr: f64| round2(entry + rr * risk);
        let (partial, final_target) = match levels.as_slice() {
            [] => (at_rr(self.params.min_partial_rr), at_rr(self.params.min_final_rr)),
            [only] => (at_rr(self.params.min_partial_rr).min(*only), *only),
            [first, .., last] => (*first, *last),
        };

        let partial_rr = (partial - entry) / risk;
        let final_rr = (final_target - entry) / risk;

        if partial_rr + EPSILON < self.params.min_partial_rr {
            return Err(RiskRejection::new(
                RiskStage::Target,
                format!(
                    "Partial target {} is {:.2}R, below the {}R minimum",
                    partial, partial_rr, self.params.min_partial_rr
                ),
            ));
        }
        if final_rr + EPSILON < self.params.min_final_rr {
            return Err(RiskRejection::new(
                RiskStage::Target,
                format!(
                    "Final target {} is {:.2}R, below the {}R minimum",
                    final_target, final_rr, self.params.min_final_rr
                ),
            ));
        }

        Ok(Targets {
            partial,
            final_target,
            partial_rr: round2(partial_rr),
            final_rr: round2(final_rr),
        })
    }

    pub fn check_funds(&self, entry: f64, quantity: u32, available: f64) -> Result<(), RiskRejection> {
        let required = entry * f64::from(quantity);
        if required > available + EPSILON {
            Err(RiskRejection::new(
                RiskStage::Funds,
                format!(
                    "Insufficient funds: {:.2} required, {:.2} available",
                    required, available
                ),
            ))
        } else {
            Ok(())
        }
    }

    /// Stop → target → lot size → funds; first rejection wins.
    pub fn validate_trade_plan(&self, input: &TradeRiskInput) -> RiskDecision {
        let entry = input.entry_price;

        let stop = match self.convert_stop_loss(&input.stop_loss_text, entry) {
            Ok(stop) => stop,
            Err(rejection) => return RiskDecision::Rejected(rejection),
        };

        let targets = match self.convert_targets(input.target_text.as_deref(), entry, stop.price) {
            Ok(targets) => targets,
            Err(rejection) => return RiskDecision::Rejected(rejection),
        };

        let sizing = self.lot_size(entry, stop.price);
        if let Some(reason) = sizing.rejection {
            return RiskDecision::Rejected(RiskRejection::new(RiskStage::LotSize, reason));
        }

        let available = input.available_capital.unwrap_or(self.params.account_balance);
        if let Err(rejection) = self.check_funds(entry, sizing.quantity, available) {
            return RiskDecision::Rejected(rejection);
        }

        RiskDecision::Approved(ExecutablePlan::from_parts(ExecutablePlanParts {
            instrument: self.instrument.symbol.clone(),
            entry_price: entry,
            stop_loss: stop.price,
            stop_loss_pct: stop.pct,
            partial_target: targets.partial,
            final_target: targets.final_target,
            lots: sizing.lots,
            lot_multiplier: self.instrument.lot_multiplier,
            risk_per_lot: sizing.risk_per_lot,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> RiskConverter {
        RiskConverter::new(RiskParams::default(), Instrument::nifty())
    }

    fn input(entry: f64, stop: &str) -> TradeRiskInput {
        TradeRiskInput {
            entry_price: entry,
            stop_loss_text: stop.to_string(),
            target_text: None,
            available_capital: None,
        }
    }

    #[test]
    fn test_stop_at_or_above_entry_yields_zero_lots() {
        let c = converter();
        for (entry, stop) in [(100.0, 100.0), (100.0, 120.0), (f64::NAN, 90.0), (100.0, f64::INFINITY)] {
            let sizing = c.lot_size(entry, stop);
            assert_eq!(sizing.lots, 0);
            assert!(sizing.rejection.is_some());
            assert!(sizing.risk_per_lot >= 0.0 && !sizing.risk_per_lot.is_nan());
        }
    }

    #[test]
    fn test_lot_size_capped_at_hard_max() {
        let sizing = converter().lot_size(100.0, 99.0); // 75 per lot
        assert_eq!(sizing.lots, 6);
        assert_eq!(sizing.quantity, 450);
    }

    #[test]
    fn test_below_92_scenario_rejected_on_lot_size() {
        let c = converter();
        let stop = c.convert_stop_loss("below 92", 105.5).unwrap();
        assert_eq!(stop.price, 92.0);
        assert_eq!(stop.source, StopSource::Absolute);
        assert!(stop.pct <= 30.0);

        let sizing = c.lot_size(105.5, 92.0);
        assert_eq!(sizing.risk_per_lot, 1012.5);
        assert_eq!(sizing.lots, 0);

        match c.validate_trade_plan(&input(105.5, "below 92")) {
            RiskDecision::Rejected(r) => {
                assert_eq!(r.stage, RiskStage::LotSize);
                assert!(r.reason.contains("1012.50"));
                assert!(r.reason.contains("1000.00"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_85_stop_scenario_approved_one_lot() {
        match converter().validate_trade_plan(&input(95.25, "85")) {
            RiskDecision::Approved(plan) => {
                assert_eq!(plan.lots(), 1);
                assert_eq!(plan.quantity(), 75);
                assert_eq!(plan.risk_per_lot(), 768.75);
                assert_eq!(plan.total_risk(), 768.75);
                assert_eq!(plan.partial_target(), 107.55);
                assert_eq!(plan.final_target(), 115.75);
            }
            other => panic!("expected approval, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_beyond_cap_rejected_not_clamped() {
        let err = converter().convert_stop_loss("35% below entry", 100.0).unwrap_err();
        assert_eq!(err.stage, RiskStage::StopLoss);
        assert!(err.reason.contains("35.00%"));
    }

    #[test]
    fn test_unparseable_stop_uses_fallback_policy() {
        let stop = converter().convert_stop_loss("below the swing low", 100.0).unwrap();
        assert_eq!(stop.source, StopSource::Default);
        assert_eq!(stop.price, 80.0);

        let strict = RiskConverter::new(
            RiskParams {
                stop_fallback: StopFallback::Reject,
                ..Default::default()
            },
            Instrument::nifty(),
        );
        assert!(strict.convert_stop_loss("below the swing low", 100.0).is_err());
    }

    #[test]
    fn test_targets_below_minimum_rr_rejected() {
        let c = converter();
        let err = c.convert_targets(Some("105 then 112"), 100.0, 95.0).unwrap_err();
        assert_eq!(err.stage, RiskStage::Target);
        assert!(err.reason.contains("Partial"));

        let ok = c.convert_targets(Some("1.5R and 3R"), 100.0, 95.0).unwrap();
        assert_eq!(ok.partial, 107.5);
        assert_eq!(ok.final_target, 115.0);
    }

    #[test]
    fn test_funds_checked_last() {
        let decision = converter().validate_trade_plan(&TradeRiskInput {
            available_capital: Some(1000.0),
            ..input(95.25, "85")
        });
        match decision {
            RiskDecision::Rejected(r) => assert_eq!(r.stage, RiskStage::Funds),
            other => panic!("expected funds rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_rejection_short_circuits_targets() {
        let decision = converter().validate_trade_plan(&TradeRiskInput {
            target_text: Some("101".into()),
            ..input(100.0, "50%")
        });
        match decision {
            RiskDecision::Rejected(r) => assert_eq!(r.stage, RiskStage::StopLoss),
            other => panic!("expected stop rejection, got {:?}", other),
        }
    }
}
