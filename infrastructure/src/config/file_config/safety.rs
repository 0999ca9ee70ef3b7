//! Safety configuration from TOML (`[safety]` and `[kill_switch]` sections)

use serde::{Deserialize, Serialize};
use tradegate_domain::{ConfigIssue, ConfigIssueCode, KillCondition, KillSwitch, SafetyPolicy};

/// Raw safety configuration
///
/// # Example
///
/// ```toml
/// [safety]
/// dry_run = true
/// max_position_size = 450
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSafetyConfig {
    /// Order-placing tools are refused while false
    pub dry_run: bool,
    pub max_position_size: f64,
}

impl Default for FileSafetyConfig {
    fn default() -> Self {
        let policy = SafetyPolicy::default();
        Self {
            dry_run: policy.dry_run,
            max_position_size: policy.max_position_size,
        }
    }
}

impl FileSafetyConfig {
    pub fn to_policy(&self) -> (SafetyPolicy, Vec<ConfigIssue>) {
        let mut policy = SafetyPolicy {
            dry_run: self.dry_run,
            ..SafetyPolicy::default()
        };
        let mut issues = Vec::new();

        if self.max_position_size > 0.0 {
            policy.max_position_size = self.max_position_size;
        } else {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "safety.max_position_size".to_string(),
                },
                format!(
                    "safety.max_position_size: {} must be positive, keeping {}",
                    self.max_position_size, policy.max_position_size
                ),
            ));
        }

        (policy, issues)
    }
}

/// Raw kill switch configuration
///
/// # Example
///
/// ```toml
/// [kill_switch]
/// daily_loss_cap = 5000.0
/// malformed_output_limit = 3
/// conditions = ["daily_loss_cap", "feed_disconnected_with_position",
///               "duplicate_execution", "invalid_transition", "malformed_output"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileKillSwitchConfig {
    pub daily_loss_cap: f64,
    pub malformed_output_limit: u32,
    pub conditions: Vec<String>,
}

impl Default for FileKillSwitchConfig {
    fn default() -> Self {
        let kill_switch = KillSwitch::default();
        Self {
            daily_loss_cap: kill_switch.daily_loss_cap,
            malformed_output_limit: kill_switch.malformed_output_limit,
            conditions: kill_switch
                .conditions
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
        }
    }
}

impl FileKillSwitchConfig {
    /// Convert to the domain `KillSwitch`.
    ///
    /// Unknown condition names are dropped with a warning. Disabling a
    /// condition is allowed but reported, since it removes a hard stop.
    pub fn to_kill_switch(&self) -> (KillSwitch, Vec<ConfigIssue>) {
        let defaults = KillSwitch::default();
        let mut issues = Vec::new();
        let mut conditions = Vec::new();

        for name in &self.conditions {
            match name.parse::<KillCondition>() {
                Ok(condition) if !conditions.contains(&condition) => conditions.push(condition),
                Ok(_) => {}
                Err(value) => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "kill_switch.conditions".to_string(),
                        value: value.clone(),
                        valid_values: KillCondition::ALL
                            .iter()
                            .map(|c| c.as_str().to_string())
                            .collect(),
                    },
                    format!("kill_switch.conditions: unknown condition '{}', ignored", value),
                )),
            }
        }

        for condition in KillCondition::ALL {
            if !conditions.contains(&condition) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "kill_switch.conditions".to_string(),
                        value: condition.as_str().to_string(),
                        valid_values: Vec::new(),
                    },
                    format!("kill_switch.conditions: '{}' is disabled", condition),
                ));
            }
        }

        let daily_loss_cap = if self.daily_loss_cap > 0.0 {
            self.daily_loss_cap
        } else {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "kill_switch.daily_loss_cap".to_string(),
                },
                format!(
                    "kill_switch.daily_loss_cap: {} must be positive",
                    self.daily_loss_cap
                ),
            ));
            defaults.daily_loss_cap
        };

        let malformed_output_limit = if self.malformed_output_limit > 0 {
            self.malformed_output_limit
        } else {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "kill_switch.malformed_output_limit".to_string(),
                },
                "kill_switch.malformed_output_limit: must be at least 1",
            ));
            defaults.malformed_output_limit
        };

        let kill_switch = KillSwitch {
            conditions,
            daily_loss_cap,
            malformed_output_limit,
        };
        (kill_switch, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_domain() {
        let (kill_switch, issues) = FileKillSwitchConfig::default().to_kill_switch();
        assert!(issues.is_empty());
        assert_eq!(kill_switch, KillSwitch::default());

        let (policy, issues) = FileSafetyConfig::default().to_policy();
        assert!(issues.is_empty());
        assert_eq!(policy, SafetyPolicy::default());
    }

    #[test]
    fn test_unknown_and_disabled_conditions_warn() {
        let config = FileKillSwitchConfig {
            conditions: vec![
                "daily_loss_cap".to_string(),
                "solar_flare".to_string(),
                "daily_loss_cap".to_string(),
            ],
            ..Default::default()
        };
        let (kill_switch, issues) = config.to_kill_switch();

        assert_eq!(kill_switch.conditions, vec![KillCondition::DailyLossCap]);
        // one unknown + four disabled
        assert_eq!(issues.len(), 5);
        assert!(!ConfigIssue::has_errors(&issues));
    }

    #[test]
    fn test_non_positive_cap_is_an_error() {
        let config: super::super::FileConfig =
            toml::from_str("[kill_switch]\ndaily_loss_cap = 0.0\n").unwrap();
        let (kill_switch, issues) = config.kill_switch.to_kill_switch();
        assert!(ConfigIssue::has_errors(&issues));
        assert_eq!(kill_switch.daily_loss_cap, 5000.0);
    }

    #[test]
    fn test_live_trading_toggle() {
        let config: super::super::FileConfig =
            toml::from_str("[safety]\ndry_run = false\nmax_position_size = 150\n").unwrap();
        let (policy, issues) = config.safety.to_policy();
        assert!(issues.is_empty());
        assert!(!policy.dry_run);
        assert_eq!(policy.max_position_size, 150.0);
    }
}
