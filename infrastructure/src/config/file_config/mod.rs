//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized leniently and converted into domain and
//! application types, with anything suspicious reported as a
//! [`ConfigIssue`].

mod calendar;
mod logging;
mod phases;
mod risk;
mod safety;

pub use calendar::FileCalendarConfig;
pub use logging::{FileChecklistConfig, FileLoggingConfig};
pub use phases::{FileLoopConfig, FilePhaseConfig, FilePhasesConfig};
pub use risk::{FileInstrumentConfig, FileRiskConfig};
pub use safety::{FileKillSwitchConfig, FileSafetyConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tradegate_application::GateConfig;
use tradegate_domain::{ConfigIssue, ConfigIssueCode};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Phase loop settings
    #[serde(rename = "loop")]
    pub phase_loop: FileLoopConfig,
    /// Per-phase budgets and tool allowlists
    pub phases: FilePhasesConfig,
    /// Account risk parameters
    pub risk: FileRiskConfig,
    /// Instrument overrides keyed by symbol
    pub instruments: BTreeMap<String, FileInstrumentConfig>,
    pub safety: FileSafetyConfig,
    pub kill_switch: FileKillSwitchConfig,
    pub checklist: FileChecklistConfig,
    pub calendar: FileCalendarConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Convert into the orchestrator's [`GateConfig`]; the calendar follows
    /// the local date.
    ///
    /// Every section falls back to its built-in value where the file is
    /// unusable, so the returned config is always complete; callers should
    /// refuse to trade when [`ConfigIssue::has_errors`] holds.
    pub fn to_gate_config(&self) -> (GateConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (execution, i) = self.phase_loop.to_execution_params();
        issues.extend(i);
        let (capabilities, i) = self.phases.to_capabilities();
        issues.extend(i);
        let (risk, i) = self.risk.to_risk_params();
        issues.extend(i);
        let (instruments, i) = risk::to_instrument_table(&self.instruments);
        issues.extend(i);
        let (safety, i) = self.safety.to_policy();
        issues.extend(i);
        let (kill_switch, i) = self.kill_switch.to_kill_switch();
        issues.extend(i);
        let (calendar, i) = self.calendar.to_calendar();
        issues.extend(i);

        let config = GateConfig {
            capabilities,
            risk,
            instruments,
            safety,
            kill_switch,
            calendar,
            execution,
        };
        (config, issues)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation: everything
    /// [`to_gate_config`](Self::to_gate_config) reports, plus references
    /// to files that do not exist.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let (_, mut issues) = self.to_gate_config();

        if let Some(path) = &self.checklist.path
            && !path.exists()
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingFile {
                    path: path.display().to_string(),
                },
                format!("checklist.path: {} does not exist", path.display()),
            ));
        }

        issues
    }

    /// Tool allowlist entries with no registered handler.
    pub fn validate_tools(&self, registered: &[String]) -> Vec<ConfigIssue> {
        let (capabilities, _) = self.phases.to_capabilities();
        FilePhasesConfig::unknown_tools(&capabilities, registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tradegate_domain::{KillCondition, Phase, StopFallback};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[loop]
max_parallel_tools = 2

[phases.validation]
max_iterations = 4
tools = ["get_quote"]

[risk]
account_balance = 200000.0
stop_fallback = "reject"

[instruments.NIFTY]
lot_multiplier = 75
max_stop_loss_pct = 25.0

[safety]
dry_run = true
max_position_size = 300

[kill_switch]
daily_loss_cap = 3000.0
conditions = ["daily_loss_cap", "feed_disconnected_with_position",
              "duplicate_execution", "invalid_transition", "malformed_output"]

[calendar]
holidays = ["2026-01-26"]

[logging]
dir = "logs"
audit_file = "trail.jsonl"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let (gate, issues) = config.to_gate_config();

        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(gate.execution.max_parallel_tools, 2);
        assert_eq!(gate.capabilities.get(Phase::Validation).unwrap().max_iterations, 4);
        assert_eq!(gate.risk.account_balance, 200_000.0);
        assert_eq!(gate.risk.stop_fallback, StopFallback::Reject);
        assert_eq!(gate.instruments.get("NIFTY").unwrap().max_stop_loss_pct, 25.0);
        assert_eq!(gate.safety.max_position_size, 300.0);
        assert_eq!(gate.kill_switch.daily_loss_cap, 3000.0);
        assert_eq!(gate.kill_switch.conditions, KillCondition::ALL.to_vec());
        assert!(!gate.calendar.is_trading_day(date("2026-01-26")));
        assert!(config.logging.audit_path().unwrap().ends_with("trail.jsonl"));
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.safety.dry_run);
        assert!(config.checklist.path.is_none());
        assert!(config.instruments.is_empty());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_missing_checklist_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = FileConfig::default();
        config.checklist.path = Some(dir.path().join("checklist.toml"));

        let issues = config.validate();
        assert!(ConfigIssue::has_errors(&issues));
        assert!(matches!(issues[0].code, ConfigIssueCode::MissingFile { .. }));
    }

    #[test]
    fn test_issues_from_every_section_are_collected() {
        let toml_str = r#"
[loop]
max_parallel_tools = 0

[risk]
max_risk_pct = 150.0

[safety]
max_position_size = -1

[calendar]
holidays = ["next tuesday"]
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 4);
        assert!(ConfigIssue::has_errors(&issues));
    }
}
