//! Shared process-wide session and order mutual exclusion.
//!
//! [`SharedSession`] wraps the domain [`SessionState`] for the orchestrator,
//! the phase loop (kill checks) and the position tracker. Access goes
//! through closures so no lock guard is ever held across an `.await`.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tradegate_domain::{KillSwitch, KillTrigger, SessionState};

#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedSession {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn for_day(day: NaiveDate) -> Self {
        Self::new(SessionState::new(day))
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read(SessionState::clone)
    }

    /// Evaluate kill predicates against the current state.
    pub fn kill_check(&self, kill_switch: &KillSwitch) -> Option<KillTrigger> {
        self.read(|s| kill_switch.evaluate(s))
    }
}

/// At most one order-placing call in flight per trade id.
#[derive(Clone, Default)]
pub struct InFlightOrders {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the order slot for `trade_id`; `None` if one is already held.
    pub fn try_acquire(&self, trade_id: &str) -> Option<OrderPermit> {
        let mut held = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(trade_id.to_string()) {
            return None;
        }
        Some(OrderPermit {
            orders: self.clone(),
            trade_id: trade_id.to_string(),
        })
    }

    pub fn is_in_flight(&self, trade_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(trade_id)
    }
}

/// Releases the trade's order slot on drop.
pub struct OrderPermit {
    orders: InFlightOrders,
    trade_id: String,
}

impl Drop for OrderPermit {
    fn drop(&mut self) {
        self.orders
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.trade_id);
    }
}
