//! Bounded phase loop
//!
//! Drives one planned phase under hard limits. One iteration is exactly one
//! planner call plus the calls its directive requests:
//!
//! | Step | Outcome on failure |
//! |------|--------------------|
//! | cancellation / kill predicates | `error` (kill trigger returned) |
//! | wall-clock budget | `timeout` |
//! | planner call | `error` |
//! | directive parse / `final` output schema | `verification_failed` |
//! | admission (dependencies, safety, risk binding) | rejection result, loop continues |
//! | dispatch | error result, loop continues |
//! | stop predicates | `completed` |
//!
//! Running out of iterations ends with `max_iterations`. Failed calls are
//! never retried by the loop.

mod admission;
mod types;

pub use types::{RunPhaseError, RunPhaseInput, RunPhaseOutput};

use admission::Admission;
use types::Stop;

use crate::config::ExecutionParams;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::planner::{PlannerError, PlanningRequest, PlanningService};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::trade_progress::{NoTradeProgress, TradeProgressNotifier};
use crate::session::{InFlightOrders, SharedSession};
use crate::use_cases::shared::check_cancelled;
use futures::stream::{self, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tradegate_domain::{
    DependencyEnforcer, EVENT_ORDER_PLACED, ExecutablePlan, ExecutionContext, KillSwitch,
    PhaseCapability, PhaseResult, PhaseStatus, PlannerDirective, SafetyGate, SafetyPolicy,
    ToolCall, ToolError, ToolResult, TraceEntry, TraceOutcome, TradingCalendar,
};

/// Mutable state of one loop run; the loop is its only writer.
struct LoopState {
    context: ExecutionContext,
    trace: Vec<TraceEntry>,
    iterations: usize,
}

/// Use case for running one phase's bounded planner loop
pub struct RunPhaseUseCase {
    planner: Arc<dyn PlanningService>,
    enforcer: Arc<DependencyEnforcer>,
    gate: Arc<SafetyGate>,
    session: SharedSession,
    in_flight: InFlightOrders,
    kill_switch: KillSwitch,
    params: ExecutionParams,
    progress: Arc<dyn TradeProgressNotifier>,
    audit: Arc<dyn AuditLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl RunPhaseUseCase {
    pub fn new(planner: Arc<dyn PlanningService>, session: SharedSession) -> Self {
        Self {
            planner,
            enforcer: Arc::new(DependencyEnforcer::new(TradingCalendar::today_local())),
            gate: Arc::new(SafetyGate::trading(&SafetyPolicy::default())),
            session,
            in_flight: InFlightOrders::new(),
            kill_switch: KillSwitch::default(),
            params: ExecutionParams::default(),
            progress: Arc::new(NoTradeProgress),
            audit: Arc::new(NoAuditLogger),
            cancellation_token: None,
        }
    }

    pub fn with_enforcer(mut self, enforcer: Arc<DependencyEnforcer>) -> Self {
        self.enforcer = enforcer;
        self
    }

    pub fn with_safety_gate(mut self, gate: Arc<SafetyGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Share the order slots with other loops trading the same account
    pub fn with_in_flight(mut self, in_flight: InFlightOrders) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn with_kill_switch(mut self, kill_switch: KillSwitch) -> Self {
        self.kill_switch = kill_switch;
        self
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
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

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Run the loop for one phase.
    ///
    /// `tools` should already be scoped to the phase allowlist. Kill
    /// triggers and cancellation are folded into the output as status
    /// `error`; only a planner-free phase is refused outright.
    pub async fn execute(
        &self,
        input: RunPhaseInput<'_>,
        tools: &dyn ToolExecutorPort,
    ) -> Result<RunPhaseOutput, RunPhaseError> {
        let capability = input.capability;
        if !capability.planner_allowed {
            return Err(RunPhaseError::PlannerNotAllowed(capability.phase));
        }

        info!(
            phase = %capability.phase,
            max_iterations = capability.max_iterations,
            timeout_secs = capability.timeout.as_secs(),
            "Starting phase loop"
        );

        let started = Instant::now();
        let mut run = LoopState {
            context: input.context,
            trace: Vec::new(),
            iterations: 0,
        };

        let outcome = self
            .drive(capability, input.executable_plan, tools, &mut run, started)
            .await;

        let (mut stop, mut kill) = match outcome {
            Ok(stop) => (stop, None),
            Err(RunPhaseError::KillSwitch(trigger)) => {
                (Stop::new(PhaseStatus::Error, trigger.to_string()), Some(trigger))
            }
            Err(RunPhaseError::Cancelled) => (Stop::new(PhaseStatus::Error, "cancelled"), None),
            Err(e @ RunPhaseError::PlannerNotAllowed(_)) => return Err(e),
        };

        // Malformed output counted on the last iteration can trip a predicate.
        if kill.is_none()
            && let Some(trigger) = self.session.kill_check(&self.kill_switch)
        {
            stop = Stop::new(PhaseStatus::Error, trigger.to_string());
            kill = Some(trigger);
        }

        if let Some(trigger) = &kill {
            warn!(phase = %capability.phase, condition = %trigger.condition, "Kill switch ended phase");
        }

        let mut result = PhaseResult::new(capability.phase, stop.status, stop.reason)
            .with_budget(run.iterations, capability.max_iterations)
            .with_duration_ms(started.elapsed().as_millis() as u64)
            .with_trace(run.trace);
        if let Some(output) = stop.final_output {
            result = result.with_final_output(output);
        }

        info!(
            phase = %capability.phase,
            status = result.status.as_str(),
            iterations = result.iterations,
            "Phase loop finished"
        );

        Ok(RunPhaseOutput {
            result,
            context: run.context,
            kill,
        })
    }

    async fn drive(
        &self,
        capability: &PhaseCapability,
        plan: Option<&ExecutablePlan>,
        tools: &dyn ToolExecutorPort,
        run: &mut LoopState,
        started: Instant,
    ) -> Result<Stop, RunPhaseError> {
        let phase = capability.phase;
        let admission = Admission {
            enforcer: &self.enforcer,
            gate: &self.gate,
            plan,
        };
        let catalogue = tools.descriptors();
        let output_schema = capability.output_schema.to_json_schema();

        while run.iterations < capability.max_iterations {
            check_cancelled(self.cancellation_token.as_ref())?;
            self.check_kill()?;
            if started.elapsed() >= capability.timeout {
                return Ok(Stop::new(
                    PhaseStatus::Timeout,
                    format!(
                        "phase timeout of {}s exceeded after {} iteration(s)",
                        capability.timeout.as_secs(),
                        run.iterations
                    ),
                ));
            }

            run.iterations += 1;
            let iteration = run.iterations;
            self.progress
                .on_iteration(&phase, iteration, capability.max_iterations);

            let request = PlanningRequest {
                phase,
                iteration,
                max_iterations: capability.max_iterations,
                context: run.context.to_planner_view(self.params.planner_view_results),
                tools: catalogue.clone(),
                output_schema: output_schema.clone(),
            };

            let raw = match self.plan_with_cancellation(&request).await? {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(phase = %phase, iteration, error = %e, "Planning service failed");
                    return Ok(Stop::new(
                        PhaseStatus::Error,
                        format!("planning service error: {}", e),
                    ));
                }
            };
            self.audit.log(AuditEvent::new(
                "planner_output",
                json!({
                    "trade_id": run.context.trade_id,
                    "phase": phase,
                    "iteration": iteration,
                    "output": raw,
                }),
            ));

            let directive = match PlannerDirective::parse(&raw) {
                Ok(directive) => directive,
                Err(errors) => {
                    self.record_malformed(run, iteration, Some(raw.to_string()));
                    return Ok(Stop::new(PhaseStatus::VerificationFailed, errors.join("; ")));
                }
            };
            let thought = directive.thought().map(str::to_string);
            debug!(phase = %phase, iteration, action = directive.action(), "Planner directive");

            if let PlannerDirective::Final { output, .. } = &directive {
                let errors = capability.output_schema.validate_value(output);
                if !errors.is_empty() {
                    self.record_malformed(run, iteration, thought);
                    return Ok(Stop::new(
                        PhaseStatus::VerificationFailed,
                        format!("final output failed schema: {}", errors.join("; ")),
                    ));
                }
                run.trace
                    .push(TraceEntry::new(iteration, TraceOutcome::Final).with_plan(thought));
                return Ok(Stop::new(PhaseStatus::Completed, "planner declared final output")
                    .with_output(output.clone()));
            }

            let batched = matches!(directive, PlannerDirective::ToolBatch { .. });
            let calls = directive.tool_calls();
            if batched && self.params.max_parallel_tools > 1 {
                self.run_batch(calls, thought, iteration, &admission, tools, run)
                    .await?;
            } else {
                for call in calls {
                    self.run_call(call, batched, thought.clone(), iteration, &admission, tools, run)
                        .await?;
                }
            }

            if let Some(condition) = capability
                .stop_conditions
                .iter()
                .find(|c| c.holds(&run.context))
            {
                return Ok(Stop::new(
                    PhaseStatus::Completed,
                    format!("stop condition met: {}", condition.describe()),
                ));
            }
        }

        Ok(Stop::new(
            PhaseStatus::MaxIterations,
            format!("iteration budget of {} exhausted", capability.max_iterations),
        ))
    }

    async fn plan_with_cancellation(
        &self,
        request: &PlanningRequest,
    ) -> Result<Result<Value, PlannerError>, RunPhaseError> {
        match &self.cancellation_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(RunPhaseError::Cancelled),
                result = self.planner.plan(request) => Ok(result),
            },
            None => Ok(self.planner.plan(request).await),
        }
    }

    fn check_kill(&self) -> Result<(), RunPhaseError> {
        match self.session.kill_check(&self.kill_switch) {
            Some(trigger) => Err(RunPhaseError::KillSwitch(trigger)),
            None => Ok(()),
        }
    }

    fn record_malformed(&self, run: &mut LoopState, iteration: usize, plan: Option<String>) {
        let count = self.session.write(|s| s.record_malformed_output());
        warn!(
            state = %run.context.state,
            iteration,
            malformed_outputs = count,
            "Malformed planner output"
        );
        run.trace
            .push(TraceEntry::new(iteration, TraceOutcome::Invalid).with_plan(plan));
    }

    /// Admit, dispatch and apply one call, in order.
    #[allow(clippy::too_many_arguments)]
    async fn run_call(
        &self,
        call: ToolCall,
        batched: bool,
        thought: Option<String>,
        iteration: usize,
        admission: &Admission<'_>,
        tools: &dyn ToolExecutorPort,
        run: &mut LoopState,
    ) -> Result<(), RunPhaseError> {
        match admission.admit(tools, call.clone(), &mut run.context, batched) {
            Ok(admitted) => {
                let result = self.dispatch(&admitted, tools, &run.context.trade_id).await;
                self.apply_result(admitted, result, true, thought, iteration, tools, run);
            }
            Err(error) => {
                let refusal = ToolResult::failure(&call.tool_name, error);
                self.apply_result(call, refusal, false, thought, iteration, tools, run);
            }
        }
        check_cancelled(self.cancellation_token.as_ref())?;
        self.check_kill()
    }

    /// Admit every call against the current context, then dispatch the
    /// admitted ones with bounded concurrency. Results are applied in
    /// completion order.
    async fn run_batch(
        &self,
        calls: Vec<ToolCall>,
        thought: Option<String>,
        iteration: usize,
        admission: &Admission<'_>,
        tools: &dyn ToolExecutorPort,
        run: &mut LoopState,
    ) -> Result<(), RunPhaseError> {
        let mut admitted = Vec::with_capacity(calls.len());
        for call in calls {
            match admission.admit(tools, call.clone(), &mut run.context, true) {
                Ok(call) => admitted.push(call),
                Err(error) => {
                    let refusal = ToolResult::failure(&call.tool_name, error);
                    self.apply_result(call, refusal, false, thought.clone(), iteration, tools, run);
                }
            }
        }
        self.check_kill()?;

        let trade_id = run.context.trade_id.clone();
        let trade_id = trade_id.as_str();
        let mut completed = stream::iter(admitted)
            .map(|call| async move {
                let result = self.dispatch(&call, tools, trade_id).await;
                (call, result)
            })
            .buffer_unordered(self.params.max_parallel_tools);

        while let Some((call, result)) = completed.next().await {
            self.apply_result(call, result, true, thought.clone(), iteration, tools, run);
            self.check_kill()?;
        }
        check_cancelled(self.cancellation_token.as_ref())
    }

    /// Execute an admitted call. Order-placing calls hold the trade's order
    /// slot for the duration of the handler, and any call whose handler ran
    /// records the trade as executed.
    async fn dispatch(
        &self,
        call: &ToolCall,
        tools: &dyn ToolExecutorPort,
        trade_id: &str,
    ) -> ToolResult {
        self.progress.on_tool_call(call);
        let places_order = tools
            .descriptor(&call.tool_name)
            .is_some_and(|d| d.places_order());
        if !places_order {
            return tools.execute(call).await;
        }

        let Some(_permit) = self.in_flight.try_acquire(trade_id) else {
            warn!(trade_id, tool = %call.tool_name, "Order already in flight");
            return ToolResult::failure(&call.tool_name, ToolError::order_in_flight(trade_id));
        };

        if self.session.read(|s| s.has_executed(trade_id)) {
            self.session.write(|s| s.flag_duplicate_execution());
            warn!(trade_id, tool = %call.tool_name, "Duplicate order attempt");
            return ToolResult::failure(&call.tool_name, ToolError::duplicate_execution(trade_id));
        }

        let result = tools.execute(call).await;
        let handler_ran =
            result.is_success() || result.error().is_some_and(ToolError::handler_ran);
        if !handler_ran {
            return result;
        }

        // A handler that ran may have sent the order; the slot is spent.
        let placed = result.handler_returned();
        self.session.write(|s| {
            if s.record_execution(trade_id) && placed {
                s.open_position();
            }
        });
        match result.error() {
            None => info!(trade_id, tool = %call.tool_name, "Order placed"),
            Some(error) if placed => warn!(
                trade_id,
                tool = %call.tool_name,
                error = %error,
                "Order placed but its receipt was refused"
            ),
            Some(error) => warn!(
                trade_id,
                tool = %call.tool_name,
                error = %error,
                "Order handler failed; no retry for this trade"
            ),
        }
        result
    }

    /// Fold one result into the context and trace.
    ///
    /// Calls refused before dispatch (`dispatched == false`) and calls the
    /// order guard turned away do not count toward the tool's call cap.
    #[allow(clippy::too_many_arguments)]
    fn apply_result(
        &self,
        call: ToolCall,
        result: ToolResult,
        dispatched: bool,
        thought: Option<String>,
        iteration: usize,
        tools: &dyn ToolExecutorPort,
        run: &mut LoopState,
    ) {
        let descriptor = tools.descriptor(&call.tool_name);
        let produces = descriptor
            .map(|d| d.dependencies.produces.clone())
            .unwrap_or_default();
        let places_order = descriptor.is_some_and(|d| d.places_order());

        let outcome = match result.error() {
            Some(error) if !dispatched || error.is_rejection() => {
                self.report_rejection(&run.context, &call, error);
                TraceOutcome::Rejected
            }
            _ => {
                run.context.record_call(&call.tool_name);
                if places_order && result.handler_returned() {
                    run.context.record_event(EVENT_ORDER_PLACED);
                    if !result.is_success() {
                        // Surface the broker's reply as an error receipt
                        for key in &produces {
                            run.context.insert_output(key.clone(), result.to_wire());
                        }
                    }
                }
                self.progress.on_tool_result(&result);
                self.audit.log(AuditEvent::new(
                    "tool_call",
                    json!({
                        "trade_id": run.context.trade_id,
                        "phase": run.context.state,
                        "iteration": iteration,
                        "call": call,
                        "result": result.to_wire(),
                        "duration_ms": result.duration_ms,
                    }),
                ));
                debug!(tool = %call.tool_name, success = result.is_success(), "Tool result applied");
                TraceOutcome::Executed
            }
        };

        run.trace.push(
            TraceEntry::new(iteration, outcome)
                .with_plan(thought)
                .with_call(call)
                .with_result(result.clone()),
        );
        run.context.record_result(result, &produces);
    }

    fn report_rejection(&self, context: &ExecutionContext, call: &ToolCall, error: &ToolError) {
        if error.code == "SAFETY_VETO" {
            info!(tool = %call.tool_name, reason = %error.message, "Safety veto");
            self.progress.on_safety_veto(&call.tool_name, &error.message);
            self.audit.log(AuditEvent::new(
                "safety_veto",
                json!({
                    "trade_id": context.trade_id,
                    "phase": context.state,
                    "tool": call.tool_name,
                    "reason": error.message,
                    "errors": error.details,
                }),
            ));
            return;
        }

        info!(tool = %call.tool_name, code = %error.code, "Call rejected before dispatch");
        if error.code == "DEPENDENCY_FAILED" {
            self.progress
                .on_dependency_rejected(&call.tool_name, &error.details);
        }
        self.audit.log(AuditEvent::new(
            "tool_rejected",
            json!({
                "trade_id": context.trade_id,
                "phase": context.state,
                "tool": call.tool_name,
                "code": error.code,
                "message": error.message,
                "errors": error.details,
            }),
        ));
    }
}
