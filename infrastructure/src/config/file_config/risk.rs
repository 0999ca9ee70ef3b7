//! Risk configuration from TOML (`[risk]` and `[instruments.*]` sections)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tradegate_domain::risk::HARD_MAX_LOTS;
use tradegate_domain::{
    ConfigIssue, ConfigIssueCode, Instrument, InstrumentTable, RiskParams, StopFallback,
};

/// Raw risk configuration
///
/// # Example
///
/// ```toml
/// [risk]
/// account_balance = 100000.0
/// max_risk_pct = 1.0
/// max_lots = 6
/// min_partial_rr = 1.2
/// min_final_rr = 2.0
/// default_stop_pct = 20.0
/// stop_fallback = "default"        # or "reject"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRiskConfig {
    pub account_balance: f64,
    pub max_risk_pct: f64,
    pub max_lots: u32,
    pub min_partial_rr: f64,
    pub min_final_rr: f64,
    pub default_stop_pct: f64,
    /// "default" or "reject"
    pub stop_fallback: String,
}

impl Default for FileRiskConfig {
    fn default() -> Self {
        let params = RiskParams::default();
        Self {
            account_balance: params.account_balance,
            max_risk_pct: params.max_risk_pct,
            max_lots: params.max_lots,
            min_partial_rr: params.min_partial_rr,
            min_final_rr: params.min_final_rr,
            default_stop_pct: params.default_stop_pct,
            stop_fallback: "default".to_string(),
        }
    }
}

fn out_of_range(field: &str, message: String) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::OutOfRange {
            field: field.to_string(),
        },
        message,
    )
}

impl FileRiskConfig {
    /// Convert to domain `RiskParams`.
    ///
    /// Out-of-range values are errors and fall back to the built-in value
    /// for that field; `max_lots` above the hard cap is clamped with a
    /// warning.
    pub fn to_risk_params(&self) -> (RiskParams, Vec<ConfigIssue>) {
        let defaults = RiskParams::default();
        let mut params = defaults.clone();
        let mut issues = Vec::new();

        if self.account_balance > 0.0 {
            params.account_balance = self.account_balance;
        } else {
            issues.push(out_of_range(
                "risk.account_balance",
                format!("risk.account_balance: {} must be positive", self.account_balance),
            ));
        }

        if self.max_risk_pct > 0.0 && self.max_risk_pct <= 100.0 {
            params.max_risk_pct = self.max_risk_pct;
        } else {
            issues.push(out_of_range(
                "risk.max_risk_pct",
                format!("risk.max_risk_pct: {} must be in (0, 100]", self.max_risk_pct),
            ));
        }

        match self.max_lots {
            0 => issues.push(out_of_range(
                "risk.max_lots",
                "risk.max_lots: must be at least 1".to_string(),
            )),
            n if n > HARD_MAX_LOTS => {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::OutOfRange {
                        field: "risk.max_lots".to_string(),
                    },
                    format!(
                        "risk.max_lots: {} exceeds the hard cap, clamping to {}",
                        n, HARD_MAX_LOTS
                    ),
                ));
                params.max_lots = HARD_MAX_LOTS;
            }
            n => params.max_lots = n,
        }

        if self.min_partial_rr > 0.0 {
            params.min_partial_rr = self.min_partial_rr;
        } else {
            issues.push(out_of_range(
                "risk.min_partial_rr",
                format!("risk.min_partial_rr: {} must be positive", self.min_partial_rr),
            ));
        }

        if self.min_final_rr >= params.min_partial_rr {
            params.min_final_rr = self.min_final_rr;
        } else {
            issues.push(out_of_range(
                "risk.min_final_rr",
                format!(
                    "risk.min_final_rr: {} must not be below min_partial_rr {}",
                    self.min_final_rr, params.min_partial_rr
                ),
            ));
        }

        if self.default_stop_pct > 0.0 && self.default_stop_pct < 100.0 {
            params.default_stop_pct = self.default_stop_pct;
        } else {
            issues.push(out_of_range(
                "risk.default_stop_pct",
                format!(
                    "risk.default_stop_pct: {} must be in (0, 100)",
                    self.default_stop_pct
                ),
            ));
        }

        match self.stop_fallback.parse::<StopFallback>() {
            Ok(fallback) => params.stop_fallback = fallback,
            Err(value) => issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidEnumValue {
                    field: "risk.stop_fallback".to_string(),
                    value: value.clone(),
                    valid_values: vec!["default".to_string(), "reject".to_string()],
                },
                format!(
                    "risk.stop_fallback: unknown value '{}', falling back to 'default'",
                    value
                ),
            )),
        }

        (params, issues)
    }
}

/// Raw per-instrument configuration
///
/// # Example
///
/// ```toml
/// [instruments.NIFTY]
/// lot_multiplier = 75
/// max_stop_loss_pct = 30.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInstrumentConfig {
    pub lot_multiplier: u32,
    pub max_stop_loss_pct: f64,
}

/// Merge configured instruments over the built-in table.
///
/// Symbols are upper-cased so environment overrides (which figment
/// lower-cases) land on the same entry.
pub fn to_instrument_table(
    instruments: &BTreeMap<String, FileInstrumentConfig>,
) -> (InstrumentTable, Vec<ConfigIssue>) {
    let mut table = InstrumentTable::default();
    let mut issues = Vec::new();

    for (symbol, file) in instruments {
        let symbol = symbol.to_uppercase();
        if file.lot_multiplier == 0 {
            issues.push(out_of_range(
                &format!("instruments.{}.lot_multiplier", symbol),
                format!("instruments.{}: lot_multiplier must be at least 1", symbol),
            ));
            continue;
        }
        if !(file.max_stop_loss_pct > 0.0 && file.max_stop_loss_pct <= 100.0) {
            issues.push(out_of_range(
                &format!("instruments.{}.max_stop_loss_pct", symbol),
                format!(
                    "instruments.{}: max_stop_loss_pct {} must be in (0, 100]",
                    symbol, file.max_stop_loss_pct
                ),
            ));
            continue;
        }
        table.insert(Instrument::new(symbol, file.lot_multiplier, file.max_stop_loss_pct));
    }

    (table, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_to_domain_defaults() {
        let (params, issues) = FileRiskConfig::default().to_risk_params();
        assert!(issues.is_empty());
        assert_eq!(params, RiskParams::default());
    }

    #[test]
    fn test_reject_fallback_parses() {
        let config: super::super::FileConfig =
            toml::from_str("[risk]\nstop_fallback = \"reject\"\nmax_risk_pct = 0.5\n").unwrap();
        let (params, issues) = config.risk.to_risk_params();
        assert!(issues.is_empty());
        assert_eq!(params.stop_fallback, StopFallback::Reject);
        assert_eq!(params.max_risk_pct, 0.5);
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let config = FileRiskConfig {
            account_balance: -1.0,
            max_lots: 10,
            min_final_rr: 0.5,
            stop_fallback: "maybe".to_string(),
            ..Default::default()
        };
        let (params, issues) = config.to_risk_params();

        assert_eq!(params.account_balance, 100_000.0);
        assert_eq!(params.max_lots, HARD_MAX_LOTS);
        assert_eq!(params.min_final_rr, 2.0);
        assert_eq!(params.stop_fallback, StopFallback::UseDefault);
        assert_eq!(issues.len(), 4);
        assert!(ConfigIssue::has_errors(&issues));
    }

    #[test]
    fn test_instruments_merge_over_builtins() {
        let toml_str = r#"
[instruments.finnifty]
lot_multiplier = 65
max_stop_loss_pct = 25.0

[instruments.NIFTY]
lot_multiplier = 0
max_stop_loss_pct = 30.0
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (table, issues) = to_instrument_table(&config.instruments);

        assert_eq!(table.get("FINNIFTY").unwrap().lot_multiplier, 65);
        // The invalid override is dropped, the built-in stays
        assert_eq!(table.get("NIFTY").unwrap().lot_multiplier, 75);
        assert_eq!(issues.len(), 1);
    }
}
