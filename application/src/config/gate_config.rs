//! Gate configuration container.
//!
//! [`GateConfig`] groups the rule sets the orchestrator needs for a trade
//! run. Each is produced once at wiring time (usually from the config file
//! via the infrastructure layer) and is read-only afterwards.
//!
//! | Part | Consumed by |
//! |------|-------------|
//! | `capabilities` | orchestrator, phase loop |
//! | `risk`, `instruments` | validation phase (risk converter) |
//! | `safety` | safety gate |
//! | `kill_switch` | phase loop, orchestrator, tracker |
//! | `calendar` | dependency enforcer, session day roll |
//! | `execution` | phase loop |

use crate::config::ExecutionParams;
use tradegate_domain::{
    CapabilityTable, DependencyEnforcer, InstrumentTable, KillSwitch, RiskParams, SafetyGate,
    SafetyPolicy, TradingCalendar,
};

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub capabilities: CapabilityTable,
    pub risk: RiskParams,
    pub instruments: InstrumentTable,
    pub safety: SafetyPolicy,
    pub kill_switch: KillSwitch,
    pub calendar: TradingCalendar,
    pub execution: ExecutionParams,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            capabilities: CapabilityTable::default(),
            risk: RiskParams::default(),
            instruments: InstrumentTable::default(),
            safety: SafetyPolicy::default(),
            kill_switch: KillSwitch::default(),
            calendar: TradingCalendar::today_local(),
            execution: ExecutionParams::default(),
        }
    }
}

impl GateConfig {
    pub fn with_calendar(mut self, calendar: TradingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_risk(mut self, risk: RiskParams) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_safety(mut self, safety: SafetyPolicy) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_kill_switch(mut self, kill_switch: KillSwitch) -> Self {
        self.kill_switch = kill_switch;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionParams) -> Self {
        self.execution = execution;
        self
    }

    // ==================== Factories ====================

    pub fn enforcer(&self) -> DependencyEnforcer {
        DependencyEnforcer::new(self.calendar.clone())
    }

    pub fn safety_gate(&self) -> SafetyGate {
        SafetyGate::trading(&self.safety)
    }
}
