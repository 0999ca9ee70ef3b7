//! Trade lifecycle orchestrator
//!
//! Owns the authoritative [`StateMachine`] for one trade run and drives
//! analysis → validation → execution → post-execution tracking. Planned
//! phases go through the bounded [`RunPhaseUseCase`] loop over a registry
//! scoped to the phase allowlist; tracking is planner-free.
//!
//! Every exit path is a [`FinalStatus`]: a phase that does not end in its
//! success status, a checklist action, a risk rejection or a kill trigger
//! each end the run with its own status and reason. The run never raises
//! once it has started.

mod cascade;
mod phases;
mod types;

pub use types::{FinalStatus, RunTradeError, RunTradeInput, TradeRunResult};

use types::Terminal;

use crate::config::GateConfig;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::checklist_source::{ChecklistSource, StaticChecklist};
use crate::ports::planner::PlanningService;
use crate::ports::price_feed::PriceFeed;
use crate::ports::tier_signal::TierSignalProvider;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::trade_progress::{NoTradeProgress, TradeProgressNotifier};
use crate::registry::ScopedRegistry;
use crate::session::{InFlightOrders, SharedSession};
use crate::use_cases::run_phase::{RunPhaseInput, RunPhaseUseCase};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tradegate_domain::{
    CallerType, CheckStage, ChecklistDocument, ChecklistEvaluator, DependencyEnforcer,
    ExecutablePlan, ExecutionContext, Instrument, KillCondition, KillSwitch, KillTrigger, Phase,
    PhaseResult, PhaseStatus, RejectionAction, SafetyGate, StateMachine, TrackingEvent,
    TradePlan,
};

/// `Err` carries the terminal condition that ends the run.
type Step<T> = Result<T, Terminal>;

/// Per-run state; dropped once folded into a [`TradeRunResult`].
struct TradeRun {
    trade_id: String,
    instrument: Instrument,
    machine: StateMachine,
    checklist: Arc<ChecklistDocument>,
    kill_switch: KillSwitch,
    phases: BTreeMap<String, PhaseResult>,
    trade_plan: Option<TradePlan>,
    executable_plan: Option<ExecutablePlan>,
    order_receipt: Option<Value>,
    tracking_events: Vec<TrackingEvent>,
    kill: Option<KillTrigger>,
    final_output: Option<Value>,
}

impl TradeRun {
    fn finish(self, terminal: Terminal) -> TradeRunResult {
        TradeRunResult {
            trade_id: self.trade_id,
            final_status: terminal.status,
            reason: terminal.reason,
            final_output: self.final_output,
            phases: self.phases,
            trade_plan: self.trade_plan,
            executable_plan: self.executable_plan,
            order_receipt: self.order_receipt,
            tracking_events: self.tracking_events,
            transitions: self.machine.history().to_vec(),
            kill_switch: self.kill,
        }
    }
}

/// Use case for running one trade end to end
pub struct RunTradeUseCase {
    planner: Arc<dyn PlanningService>,
    tools: Arc<dyn ToolExecutorPort>,
    session: SharedSession,
    config: GateConfig,
    enforcer: Arc<DependencyEnforcer>,
    gate: Arc<SafetyGate>,
    in_flight: InFlightOrders,
    checklist: Arc<dyn ChecklistSource>,
    tiers: Vec<Arc<dyn TierSignalProvider>>,
    price_feed: Option<Arc<dyn PriceFeed>>,
    progress: Arc<dyn TradeProgressNotifier>,
    audit: Arc<dyn AuditLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl RunTradeUseCase {
    pub fn new(
        planner: Arc<dyn PlanningService>,
        tools: Arc<dyn ToolExecutorPort>,
        session: SharedSession,
        config: GateConfig,
    ) -> Self {
        Self {
            planner,
            tools,
            session,
            enforcer: Arc::new(config.enforcer()),
            gate: Arc::new(config.safety_gate()),
            config,
            in_flight: InFlightOrders::new(),
            checklist: Arc::new(StaticChecklist::empty()),
            tiers: Vec::new(),
            price_feed: None,
            progress: Arc::new(NoTradeProgress),
            audit: Arc::new(NoAuditLogger),
            cancellation_token: None,
        }
    }

    pub fn with_checklist(mut self, checklist: Arc<dyn ChecklistSource>) -> Self {
        self.checklist = checklist;
        self
    }

    /// Add a tier provider. With none configured, the cascade is evaluated
    /// from the tiers the analysis planner reports in its trade plan.
    pub fn with_tier_signal(mut self, provider: Arc<dyn TierSignalProvider>) -> Self {
        self.tiers.push(provider);
        self
    }

    pub fn with_price_feed(mut self, feed: Arc<dyn PriceFeed>) -> Self {
        self.price_feed = Some(feed);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn TradeProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Share order slots across concurrent runs on the same account
    pub fn with_in_flight(mut self, in_flight: InFlightOrders) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Run one trade.
    ///
    /// Fails only when the instrument is unknown; every other outcome is
    /// reported through [`TradeRunResult::final_status`].
    pub async fn execute(&self, input: RunTradeInput) -> Result<TradeRunResult, RunTradeError> {
        let instrument = self.config.instruments.get(&input.instrument)?.clone();

        let day = self.config.calendar.current_trading_day();
        if self.session.write(|s| s.roll_to(day)) {
            info!(%day, "Session rolled to a new trading day");
        }

        let checklist = self.checklist.current();
        let kill_switch = match &checklist.kill_switch {
            Some(conditions) => self.config.kill_switch.clone().with_conditions(conditions.clone()),
            None => self.config.kill_switch.clone(),
        };

        let mut run = TradeRun {
            trade_id: input.trade_id.clone(),
            instrument,
            machine: StateMachine::new(),
            checklist,
            kill_switch,
            phases: BTreeMap::new(),
            trade_plan: None,
            executable_plan: None,
            order_receipt: None,
            tracking_events: Vec::new(),
            kill: None,
            final_output: None,
        };

        info!(
            trade_id = %run.trade_id,
            instrument = %run.instrument.symbol,
            "Starting trade run"
        );

        if let Some(reason) = self.session.read(|s| s.halted().map(str::to_string)) {
            warn!(trade_id = %run.trade_id, reason = %reason, "Session is halted; run refused");
            return Ok(run.finish(Terminal::new(
                FinalStatus::Halted,
                format!("session halted: {}", reason),
            )));
        }

        let mut context = ExecutionContext::new(&input.trade_id, Phase::Analysis.as_str())
            .with_caller(CallerType::Planner);
        for (key, value) in input.seed {
            context.insert_output(key, value);
        }
        context.insert_output("instrument", json!(run.instrument.symbol));

        let terminal = match self.run_lifecycle(&mut run, context).await {
            Ok(()) => Terminal::new(FinalStatus::Completed, "trade completed"),
            Err(terminal) => terminal,
        };

        info!(
            trade_id = %run.trade_id,
            status = %terminal.status,
            reason = %terminal.reason,
            "Trade run finished"
        );
        Ok(run.finish(terminal))
    }

    async fn run_lifecycle(&self, run: &mut TradeRun, context: ExecutionContext) -> Step<()> {
        let context = self.analysis(run, context).await?;
        let context = self.validation(run, context).await?;
        self.execution(run, context).await?;
        self.tracking(run).await?;
        self.advance(run, Phase::Complete)
    }

    // ==================== Transitions ====================

    /// Move the state machine forward; kill predicates are checked first.
    fn advance(&self, run: &mut TradeRun, to: Phase) -> Step<()> {
        if let Some(trigger) = self.session.kill_check(&run.kill_switch) {
            return Err(self.halt(run, trigger));
        }

        let from = run.machine.current();
        match run.machine.transition(to) {
            Ok(()) => {
                info!(trade_id = %run.trade_id, from = %from, to = %to, "Phase transition");
                self.audit_transition(run, from, to);
                self.progress.on_phase_change(&to);
                Ok(())
            }
            Err(e) => {
                error!(trade_id = %run.trade_id, error = %e, "Invalid phase transition");
                self.session.write(|s| s.flag_invalid_transition());
                let trigger = self
                    .session
                    .kill_check(&run.kill_switch)
                    .unwrap_or_else(|| KillTrigger {
                        condition: KillCondition::InvalidTransition,
                        reason: e.to_string(),
                    });
                Err(self.halt(run, trigger))
            }
        }
    }

    /// Halt the session and end the run.
    fn halt(&self, run: &mut TradeRun, trigger: KillTrigger) -> Terminal {
        error!(
            trade_id = %run.trade_id,
            condition = %trigger.condition,
            reason = %trigger.reason,
            "Kill switch tripped; halting"
        );
        self.session.write(|s| s.halt(trigger.to_string()));
        self.move_to_rejected(run);
        self.audit.log(AuditEvent::new(
            "kill_switch",
            json!({
                "trade_id": run.trade_id,
                "condition": trigger.condition,
                "reason": trigger.reason,
                "phase": run.machine.current(),
            }),
        ));
        self.progress.on_kill_switch(&trigger);

        let reason = trigger.to_string();
        run.kill = Some(trigger);
        Terminal::new(FinalStatus::Halted, reason)
    }

    /// End the run with `status`, unless a kill predicate has tripped.
    fn reject(&self, run: &mut TradeRun, status: FinalStatus, reason: impl Into<String>) -> Terminal {
        if let Some(trigger) = self.session.kill_check(&run.kill_switch) {
            return self.halt(run, trigger);
        }
        let reason = reason.into();
        self.move_to_rejected(run);
        info!(trade_id = %run.trade_id, status = %status, reason = %reason, "Trade run stopped");
        Terminal::new(status, reason)
    }

    /// Planned phases end in the rejected sink; tracking has no such edge.
    fn move_to_rejected(&self, run: &mut TradeRun) {
        let from = run.machine.current();
        if !Phase::PLANNED.contains(&from) {
            return;
        }
        match run.machine.reject() {
            Ok(()) => self.audit_transition(run, from, Phase::Rejected),
            Err(e) => warn!(trade_id = %run.trade_id, error = %e, "Could not record rejection"),
        }
    }

    fn audit_transition(&self, run: &TradeRun, from: Phase, to: Phase) {
        self.audit.log(AuditEvent::new(
            "transition",
            json!({"trade_id": run.trade_id, "from": from, "to": to}),
        ));
    }

    // ==================== Phase bookkeeping ====================

    fn record_phase(&self, run: &mut TradeRun, result: PhaseResult) {
        self.progress.on_phase_finished(&result);
        self.audit.log(AuditEvent::new(
            "phase_finished",
            json!({
                "trade_id": run.trade_id,
                "phase": result.phase,
                "status": result.status,
                "reason": result.reason,
                "iterations": result.iterations,
                "duration_ms": result.duration_ms,
            }),
        ));
        if let Some(output) = &result.final_output {
            run.final_output = Some(output.clone());
        }
        run.phases.insert(result.phase.as_str().to_string(), result);
    }

    /// Overwrite the status of a recorded phase, or record a bare one.
    fn mark_phase(&self, run: &mut TradeRun, phase: Phase, status: PhaseStatus, reason: impl Into<String>) {
        let key = phase.as_str().to_string();
        let result = match run.phases.remove(&key) {
            Some(result) => result.with_status(status, reason),
            None => PhaseResult::new(phase, status, reason),
        };
        run.phases.insert(key, result);
    }

    /// Run one checklist stage. Passed checks become `checklist:<id>`
    /// guards; a failed required check ends the run per its action.
    fn run_checklist(
        &self,
        run: &mut TradeRun,
        phase: Phase,
        stage: CheckStage,
        context: &mut ExecutionContext,
    ) -> Step<()> {
        let report = ChecklistEvaluator::evaluate(&run.checklist, phase.as_str(), stage, context);
        for id in report.passed_ids() {
            context.mark_guard(format!("checklist:{}", id));
        }
        for warning in report.warnings() {
            warn!(
                trade_id = %run.trade_id,
                phase = %phase,
                check = %warning.id,
                message = %warning.message,
                "Checklist warning"
            );
        }

        let Some(action) = report.action() else {
            return Ok(());
        };
        let stage_name = match stage {
            CheckStage::Pre => "pre",
            CheckStage::Post => "post",
        };
        let reason = format!("{} {}-checklist failed: {}", phase, stage_name, report.reason());
        self.mark_phase(run, phase, PhaseStatus::Rejected, reason.clone());

        Err(match action {
            RejectionAction::NoTrade => self.reject(run, FinalStatus::NoTrade, reason),
            RejectionAction::Reject => self.reject(run, FinalStatus::Rejected, reason),
            RejectionAction::StopAndAlert => {
                error!(trade_id = %run.trade_id, alert = true, reason = %reason, "Checklist stop");
                self.reject(run, FinalStatus::Halted, reason)
            }
            RejectionAction::HaltSystem => {
                error!(trade_id = %run.trade_id, reason = %reason, "Checklist demanded a system halt");
                self.session.write(|s| s.halt(reason.clone()));
                self.reject(run, FinalStatus::Halted, reason)
            }
        })
    }

    /// Run a planned phase's bounded loop and require `completed`.
    ///
    /// `failure` is the run status when the loop ends any other way.
    async fn run_planned(
        &self,
        run: &mut TradeRun,
        phase: Phase,
        mut context: ExecutionContext,
        failure: FinalStatus,
    ) -> Step<ExecutionContext> {
        let Some(capability) = self.config.capabilities.get(phase).cloned() else {
            let reason = format!("no capability configured for phase '{}'", phase);
            self.mark_phase(run, phase, PhaseStatus::Error, reason.clone());
            return Err(self.reject(run, failure, reason));
        };

        self.run_checklist(run, phase, CheckStage::Pre, &mut context)?;

        self.audit.log(AuditEvent::new(
            "phase_started",
            json!({
                "trade_id": run.trade_id,
                "phase": phase,
                "max_iterations": capability.max_iterations,
                "timeout_secs": capability.timeout.as_secs(),
                "tools": capability.tools,
            }),
        ));

        let tools = ScopedRegistry::new(self.tools.clone(), capability.tools.iter().cloned());
        let mut phase_loop = RunPhaseUseCase::new(self.planner.clone(), self.session.clone())
            .with_enforcer(self.enforcer.clone())
            .with_safety_gate(self.gate.clone())
            .with_in_flight(self.in_flight.clone())
            .with_kill_switch(run.kill_switch.clone())
            .with_params(self.config.execution.clone())
            .with_progress(self.progress.clone())
            .with_audit_logger(self.audit.clone());
        if let Some(token) = &self.cancellation_token {
            phase_loop = phase_loop.with_cancellation(token.clone());
        }

        let plan = run.executable_plan.clone();
        let mut input = RunPhaseInput::new(&capability, context);
        if let Some(plan) = &plan {
            input = input.with_executable_plan(plan);
        }

        let output = match phase_loop.execute(input, &tools).await {
            Ok(output) => output,
            Err(e) => {
                let reason = e.to_string();
                self.mark_phase(run, phase, PhaseStatus::Error, reason.clone());
                return Err(self.reject(run, failure, reason));
            }
        };

        let status = output.result.status;
        let reason = output.result.reason.clone();
        self.record_phase(run, output.result);

        if let Some(trigger) = output.kill {
            return Err(self.halt(run, trigger));
        }
        if status != PhaseStatus::Completed {
            return Err(self.reject(
                run,
                failure,
                format!("{} phase ended {}: {}", phase, status, reason),
            ));
        }
        Ok(output.context)
    }
}
