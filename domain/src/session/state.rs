//! Process-wide session state.
//!
//! Daily loss, open positions, feed health and the other counters the
//! kill switch reads. Owned by the orchestrator and injected into the
//! phases and the tracker; never ambient.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    trading_day: NaiveDate,
    /// Realised loss for the trading day (positive = money lost).
    daily_loss: f64,
    open_positions: u32,
    feed_connected: bool,
    executed_trades: BTreeSet<String>,
    duplicate_execution: bool,
    malformed_outputs: u32,
    invalid_transition: bool,
    halted: Option<String>,
}

impl SessionState {
    pub fn new(trading_day: NaiveDate) -> Self {
        Self {
            trading_day,
            daily_loss: 0.0,
            open_positions: 0,
            feed_connected: true,
            executed_trades: BTreeSet::new(),
            duplicate_execution: false,
            malformed_outputs: 0,
            invalid_transition: false,
            halted: None,
        }
    }

    /// Reset the per-day counters when the trading day changes.
    ///
    /// Returns true when a reset happened. A halt survives the day boundary;
    /// only an operator clears it.
    pub fn roll_to(&mut self, day: NaiveDate) -> bool {
        if day <= self.trading_day {
            return false;
        }
        self.trading_day = day;
        self.daily_loss = 0.0;
        self.malformed_outputs = 0;
        true
    }

    pub fn trading_day(&self) -> NaiveDate {
        self.trading_day
    }

    pub fn daily_loss(&self) -> f64 {
        self.daily_loss
    }

    /// Fold realised PnL into the daily loss. Gains offset earlier losses
    /// but never push the figure below zero.
    pub fn record_pnl(&mut self, pnl: f64) {
        if pnl.is_finite() {
            self.daily_loss = (self.daily_loss - pnl).max(0.0);
        }
    }

    pub fn open_positions(&self) -> u32 {
        self.open_positions
    }

    pub fn open_position(&mut self) {
        self.open_positions += 1;
    }

    pub fn close_position(&mut self) {
        self.open_positions = self.open_positions.saturating_sub(1);
    }

    pub fn feed_connected(&self) -> bool {
        self.feed_connected
    }

    pub fn set_feed_connected(&mut self, connected: bool) {
        self.feed_connected = connected;
    }

    pub fn has_executed(&self, trade_id: &str) -> bool {
        self.executed_trades.contains(trade_id)
    }

    /// Record that an order call ran for this trade, whatever it returned.
    /// A second record for the same trade flags duplicate execution and
    /// returns false.
    pub fn record_execution(&mut self, trade_id: &str) -> bool {
        if self.executed_trades.insert(trade_id.to_string()) {
            true
        } else {
            self.duplicate_execution = true;
            false
        }
    }

    pub fn flag_duplicate_execution(&mut self) {
        self.duplicate_execution = true;
    }

    pub fn duplicate_execution(&self) -> bool {
        self.duplicate_execution
    }

    pub fn record_malformed_output(&mut self) -> u32 {
        self.malformed_outputs += 1;
        self.malformed_outputs
    }

    pub fn malformed_outputs(&self) -> u32 {
        self.malformed_outputs
    }

    pub fn flag_invalid_transition(&mut self) {
        self.invalid_transition = true;
    }

    pub fn invalid_transition(&self) -> bool {
        self.invalid_transition
    }

    pub fn halt(&mut self, reason: impl Into<String>) {
        if self.halted.is_none() {
            self.halted = Some(reason.into());
        }
    }

    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Operator reset after a halt.
    pub fn clear_halt(&mut self) {
        self.halted = None;
        self.duplicate_execution = false;
        self.invalid_transition = false;
    }
}
