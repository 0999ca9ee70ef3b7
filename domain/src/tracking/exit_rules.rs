//! Deterministic exit rules for an open long-premium position.
//!
//! Stop hit closes everything. The partial target books half the lots and
//! trails the stop to entry. The final target closes the rest.

use crate::plan::ExecutablePlan;
use serde::Serialize;

/// Exit event emitted by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    PartialBooked {
        price: f64,
        quantity: u32,
        pnl: f64,
        new_stop: f64,
    },
    StopHit {
        price: f64,
        quantity: u32,
        pnl: f64,
    },
    TargetHit {
        price: f64,
        quantity: u32,
        pnl: f64,
    },
    /// The price feed ended while the position was still open.
    FeedLost { open_quantity: u32 },
}

impl TrackingEvent {
    /// Realised PnL carried by this event.
    pub fn pnl(&self) -> f64 {
        match self {
            TrackingEvent::PartialBooked { pnl, .. }
            | TrackingEvent::StopHit { pnl, .. }
            | TrackingEvent::TargetHit { pnl, .. } => *pnl,
            TrackingEvent::FeedLost { .. } => 0.0,
        }
    }

    /// The position is fully closed after this event.
    pub fn closes_position(&self) -> bool {
        matches!(
            self,
            TrackingEvent::StopHit { .. } | TrackingEvent::TargetHit { .. }
        )
    }

    pub fn name(&self) -> &str {
        match self {
            TrackingEvent::PartialBooked { .. } => "partial_booked",
            TrackingEvent::StopHit { .. } => "stop_hit",
            TrackingEvent::TargetHit { .. } => "target_hit",
            TrackingEvent::FeedLost { .. } => "feed_lost",
        }
    }
}

/// Live state of one tracked position.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPosition {
    entry: f64,
    stop: f64,
    partial_target: f64,
    final_target: f64,
    lot_multiplier: u32,
    lots_open: u32,
    partial_booked: bool,
    realised_pnl: f64,
}

impl TrackedPosition {
    pub fn from_plan(plan: &ExecutablePlan) -> Self {
        Self {
            entry: plan.entry_price(),
            stop: plan.stop_loss(),
            partial_target: plan.partial_target(),
            final_target: plan.final_target(),
            lot_multiplier: plan.lot_multiplier(),
            lots_open: plan.lots(),
            partial_booked: false,
            realised_pnl: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.lots_open > 0
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn open_quantity(&self) -> u32 {
        self.lots_open * self.lot_multiplier
    }

    pub fn realised_pnl(&self) -> f64 {
        self.realised_pnl
    }

    fn close(&mut self, lots: u32, price: f64) -> (u32, f64) {
        let quantity = lots * self.lot_multiplier;
        let pnl = (price - self.entry) * f64::from(quantity);
        self.lots_open -= lots;
        self.realised_pnl += pnl;
        (quantity, pnl)
    }

    /// Apply one price tick. Non-finite prices and ticks after close are ignored.
    pub fn on_price(&mut self, price: f64) -> Vec<TrackingEvent> {
        let mut events = Vec::new();
        if !self.is_open() || !price.is_finite() {
            return events;
        }

        if price <= self.stop {
            let (quantity, pnl) = self.close(self.lots_open, price);
            events.push(TrackingEvent::StopHit { price, quantity, pnl });
            return events;
        }

        if !self.partial_booked && price >= self.partial_target {
            self.partial_booked = true;
            self.stop = self.stop.max(self.entry);
            let half = self.lots_open / 2;
            let (quantity, pnl) = if half > 0 {
                self.close(half, price)
            } else {
                (0, 0.0)
            };
            events.push(TrackingEvent::PartialBooked {
                price,
                quantity,
                pnl,
                new_stop: self.stop,
            });
        }

        if price >= self.final_target && self.is_open() {
            let (quantity, pnl) = self.close(self.lots_open, price);
            events.push(TrackingEvent::TargetHit { price, quantity, pnl });
        }

        events
    }

    pub fn on_feed_lost(&self) -> Option<TrackingEvent> {
        self.is_open().then(|| TrackingEvent::FeedLost {
            open_quantity: self.open_quantity(),
        })
    }
}
