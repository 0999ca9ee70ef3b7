//! Instruments and risk parameters.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard ceiling on lots per trade, regardless of configuration.
pub const HARD_MAX_LOTS: u32 = 6;

/// A tradeable instrument: lot multiplier and stop-loss ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub lot_multiplier: u32,
    /// Maximum stop-loss distance, in percent of entry.
    pub max_stop_loss_pct: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, lot_multiplier: u32, max_stop_loss_pct: f64) -> Self {
        Self {
            symbol: symbol.into(),
            lot_multiplier,
            max_stop_loss_pct,
        }
    }

    pub fn nifty() -> Self {
        Self::new("NIFTY", 75, 30.0)
    }

    pub fn banknifty() -> Self {
        Self::new("BANKNIFTY", 35, 30.0)
    }
}

/// Instruments keyed by upper-cased symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentTable {
    instruments: BTreeMap<String, Instrument>,
}

impl Default for InstrumentTable {
    fn default() -> Self {
        Self::new()
            .with(Instrument::nifty())
            .with(Instrument::banknifty())
    }
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self {
            instruments: BTreeMap::new(),
        }
    }

    pub fn with(mut self, instrument: Instrument) -> Self {
        self.insert(instrument);
        self
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments
            .insert(instrument.symbol.to_uppercase(), instrument);
    }

    pub fn get(&self, symbol: &str) -> Result<&Instrument, DomainError> {
        self.instruments
            .get(&symbol.to_uppercase())
            .ok_or_else(|| DomainError::UnknownInstrument(symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// What to do when stop-loss text has no usable number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopFallback {
    /// Use `default_stop_pct`.
    #[default]
    #[serde(rename = "default")]
    UseDefault,
    /// Reject the plan.
    Reject,
}

impl std::str::FromStr for StopFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(StopFallback::UseDefault),
            "reject" => Ok(StopFallback::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Account-level risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub account_balance: f64,
    /// Max risk per trade, percent of balance.
    pub max_risk_pct: f64,
    pub max_lots: u32,
    pub min_partial_rr: f64,
    pub min_final_rr: f64,
    pub default_stop_pct: f64,
    pub stop_fallback: StopFallback,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            account_balance: 100_000.0,
            max_risk_pct: 1.0,
            max_lots: HARD_MAX_LOTS,
            min_partial_rr: 1.2,
            min_final_rr: 2.0,
            default_stop_pct: 20.0,
            stop_fallback: StopFallback::UseDefault,
        }
    }
}

impl RiskParams {
    pub fn max_risk_amount(&self) -> f64 {
        self.account_balance * self.max_risk_pct / 100.0
    }

    /// Configured lot cap, never above [`HARD_MAX_LOTS`].
    pub fn lot_cap(&self) -> u32 {
        self.max_lots.min(HARD_MAX_LOTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let table = InstrumentTable::default();
        assert_eq!(table.get("nifty").unwrap().lot_multiplier, 75);
        assert!(matches!(
            table.get("SENSEX"),
            Err(DomainError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_lot_cap_never_exceeds_hard_max() {
        let params = RiskParams {
            max_lots: 20,
            ..Default::default()
        };
        assert_eq!(params.lot_cap(), HARD_MAX_LOTS);
        assert_eq!(RiskParams::default().max_risk_amount(), 1000.0);
    }

    #[test]
    fn test_stop_fallback_serde() {
        let f: StopFallback = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(f, StopFallback::UseDefault);
        assert_eq!("reject".parse::<StopFallback>(), Ok(StopFallback::Reject));
    }
}
