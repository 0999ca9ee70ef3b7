//! Fakes shared by the use-case tests.

use crate::ports::planner::{PlannerError, PlanningRequest, PlanningService};
use crate::ports::price_feed::PriceFeed;
use crate::ports::tier_signal::TierSignalProvider;
use crate::ports::tool_handler::handler_fn;
use crate::registry::ToolRegistry;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tradegate_domain::{
    DayClock, Dependencies, ExecutionContext, Phase, RiskLevel, SideEffects, Tier,
    TierAssessment, ToolDescriptor,
};

/// Planner replaying per-phase scripts; an exhausted script is an error.
#[derive(Default)]
pub(crate) struct ScriptedPlanner {
    scripts: Mutex<BTreeMap<Phase, VecDeque<Value>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<PlanningRequest>>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, phase: Phase, steps: impl IntoIterator<Item = Value>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(phase)
            .or_default()
            .extend(steps);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PlanningRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PlanningService for ScriptedPlanner {
    async fn plan(&self, request: &PlanningRequest) -> Result<Value, PlannerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&request.phase)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| PlannerError::Other(format!("no scripted step for {}", request.phase)))
    }
}

pub(crate) fn tool_call(tool: &str, arguments: Value) -> Value {
    json!({"action": "tool_call", "tool": tool, "arguments": arguments})
}

pub(crate) fn final_output(output: Value) -> Value {
    json!({"action": "final", "output": output})
}

pub(crate) fn trade_plan_json() -> Value {
    json!({
        "bias": "bullish",
        "tiers": [
            {"tier": "structural", "regime": "trending", "direction": "long"},
            {"tier": "directional", "regime": "trending", "direction": "long"},
            {"tier": "tactical", "regime": "breakout", "direction": "long", "trigger": "ORB"}
        ],
        "candidates": [{"symbol": "NIFTY", "strike": 24500, "option_type": "CE", "expiry": "2026-10-20"}],
        "exit_logic": {"stop_loss": "85", "target": "2R"}
    })
}

/// Brokerage-shaped registry: market data, quote, capital and a dry-run
/// order tool. `orders` counts handler invocations of `place_order`.
pub(crate) fn market_registry(orders: Arc<AtomicUsize>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let tools = [
        (
            ToolDescriptor::new("get_market_snapshot", "Index snapshot", RiskLevel::Low)
                .with_dependencies(
                    Dependencies::new()
                        .requires_output("instrument")
                        .derive("symbol", "instrument")
                        .produces("market_snapshot"),
                ),
            handler_fn(|_| async { Ok(json!({"spot": 24480.5, "trend": "up"})) }),
        ),
        (
            ToolDescriptor::new("get_expiry_list", "Option expiries", RiskLevel::Low)
                .with_dependencies(
                    Dependencies::new()
                        .derive("symbol", "instrument")
                        .produces("expiry_list"),
                ),
            handler_fn(|_| async { Ok(json!(["2026-10-20", "2026-10-27"])) }),
        ),
        (
            ToolDescriptor::new("get_option_chain", "Option chain", RiskLevel::Low)
                .with_dependencies(
                    Dependencies::new()
                        .requires_output("expiry_list[0]")
                        .derive("expiry", "expiry_list[0]")
                        .derive("symbol", "instrument")
                        .produces("option_chain"),
                ),
            handler_fn(|args| async move {
                Ok(json!({"expiry": args.get("expiry").cloned(), "strikes": [24400, 24500, 24600]}))
            }),
        ),
        (
            ToolDescriptor::new("get_quote", "Option premium", RiskLevel::Low).with_dependencies(
                Dependencies::new()
                    .derive("symbol", "instrument")
                    .produces("quote"),
            ),
            handler_fn(|_| async { Ok(json!({"ltp": 95.25})) }),
        ),
        (
            ToolDescriptor::new("get_available_capital", "Free margin", RiskLevel::Low)
                .with_dependencies(Dependencies::new().produces("available_capital")),
            handler_fn(|_| async { Ok(json!(100_000.0)) }),
        ),
        (
            ToolDescriptor::new("place_order", "Place an option order", RiskLevel::Critical)
                .with_side_effects(SideEffects::order())
                .with_dependencies(
                    Dependencies::new()
                        .requires_state("execution")
                        .requires_guard("risk_validated")
                        .forbidden_after("order_placed")
                        .max_calls(1)
                        .produces("order_receipt"),
                ),
            {
                let orders = orders.clone();
                handler_fn(move |args| {
                    let n = orders.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        Ok(json!({
                            "order_id": format!("DRY-{}", n),
                            "status": "dry_run",
                            "quantity": args.get("quantity").cloned(),
                        }))
                    }
                })
            },
        ),
    ];
    for (descriptor, handler) in tools {
        if let Err(e) = registry.register(descriptor, handler) {
            panic!("fixture registration failed: {}", e);
        }
    }
    registry
}

/// Clock the test moves by hand.
#[derive(Debug)]
pub(crate) struct ManualClock(Mutex<NaiveDate>);

impl ManualClock {
    pub fn new(day: NaiveDate) -> Arc<Self> {
        Arc::new(Self(Mutex::new(day)))
    }

    pub fn set(&self, day: NaiveDate) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = day;
    }
}

impl DayClock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tier provider returning a fixed assessment and counting invocations.
pub(crate) struct FixedTier {
    assessment: TierAssessment,
    calls: Arc<AtomicUsize>,
}

impl FixedTier {
    pub fn new(assessment: TierAssessment) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Self {
            assessment,
            calls: calls.clone(),
        });
        (provider, calls)
    }
}

#[async_trait]
impl TierSignalProvider for FixedTier {
    fn tier(&self) -> Tier {
        self.assessment.tier
    }

    async fn assess(&self, _context: &ExecutionContext) -> Result<TierAssessment, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.assessment.clone())
    }
}

/// Price feed replaying a fixed tick sequence, then closing.
pub(crate) struct ReplayFeed {
    ticks: Vec<f64>,
}

impl ReplayFeed {
    pub fn new(ticks: impl Into<Vec<f64>>) -> Self {
        Self {
            ticks: ticks.into(),
        }
    }
}

#[async_trait]
impl PriceFeed for ReplayFeed {
    async fn subscribe(&self, _instrument: &str) -> Result<mpsc::Receiver<f64>, String> {
        let (tx, rx) = mpsc::channel(self.ticks.len().max(1));
        for tick in &self.ticks {
            tx.send(*tick).await.map_err(|e| e.to_string())?;
        }
        Ok(rx)
    }
}
