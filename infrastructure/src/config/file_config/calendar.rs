//! Trading calendar configuration from TOML (`[calendar]` section)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tradegate_domain::{ConfigIssue, ConfigIssueCode, TradingCalendar};

/// Raw calendar configuration
///
/// ```toml
/// [calendar]
/// holidays = ["2026-01-26", "2026-03-04"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCalendarConfig {
    /// Exchange holidays, `YYYY-MM-DD`
    pub holidays: Vec<String>,
}

impl FileCalendarConfig {
    /// Build a calendar following the local date. Unparseable dates are
    /// skipped.
    pub fn to_calendar(&self) -> (TradingCalendar, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let holidays: Vec<NaiveDate> = self
            .holidays
            .iter()
            .filter_map(|raw| match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::InvalidValue {
                            field: "calendar.holidays".to_string(),
                            value: raw.clone(),
                        },
                        format!(
                            "calendar.holidays: '{}' is not a YYYY-MM-DD date, ignored",
                            raw
                        ),
                    ));
                    None
                }
            })
            .collect();

        (TradingCalendar::today_local().with_holidays(holidays), issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_holidays_are_not_trading_days() {
        let config = FileCalendarConfig {
            holidays: vec!["2026-10-20".to_string(), "20/10/2026".to_string()],
        };
        let (calendar, issues) = config.to_calendar();

        assert_eq!(issues.len(), 1);
        assert!(!calendar.is_trading_day(date("2026-10-20")));
        assert!(calendar.is_trading_day(date("2026-10-19")));
        assert_eq!(calendar.today(), chrono::Local::now().date_naive());
    }
}
