//! Trading-day calendar.

use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Source of "today" for a [`TradingCalendar`].
pub trait DayClock: Send + Sync + std::fmt::Debug {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock local date, read on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl DayClock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl DayClock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Weekends plus an explicit holiday list; "today" comes from a [`DayClock`].
///
/// Clones share the clock, so a calendar handed out at wiring time keeps
/// following the date in a long-running process.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    clock: Arc<dyn DayClock>,
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    /// Calendar pinned to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self::with_clock(Arc::new(FixedClock(today)))
    }

    /// Calendar following the local date.
    pub fn today_local() -> Self {
        Self::with_clock(Arc::new(LocalClock))
    }

    pub fn with_clock(clock: Arc<dyn DayClock>) -> Self {
        Self {
            clock,
            holidays: BTreeSet::new(),
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// The current trading day: today, or the most recent trading day before it.
    pub fn current_trading_day(&self) -> NaiveDate {
        let today = self.today();
        let mut day = today;
        // Bounded walk; a year of holidays back-to-back is not a real calendar
        for _ in 0..366 {
            if self.is_trading_day(day) {
                return day;
            }
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        today
    }
}

/// Parse a `YYYY-MM-DD` argument value.
pub fn parse_date(value: Option<&Value>, field: &str) -> Result<NaiveDate, String> {
    let raw = match value {
        Some(Value::String(s)) => s.trim(),
        Some(other) => return Err(format!("Date '{}' must be a string, got {}", field, other)),
        None => return Err(format!("Missing date argument '{}'", field)),
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("Malformed date '{}' for '{}' (expected YYYY-MM-DD)", raw, field))
}
