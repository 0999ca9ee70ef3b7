//! The four lifecycle phases.
//!
//! Each returns the context to seed the next phase with, or the terminal
//! condition that ends the run.

use super::cascade::run_cascade;
use super::{FinalStatus, RunTradeUseCase, Step, TradeRun};
use crate::ports::audit_logger::AuditEvent;
use crate::use_cases::track_position::PositionTracker;
use serde_json::{Value, json};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tradegate_domain::{
    CascadeOutcome, CheckStage, EVENT_ORDER_PLACED, ExecutionContext, Phase, PhaseResult,
    PhaseStatus, RiskConverter, RiskDecision, TierCascade, TrackingEvent, TradePlan,
    TradeRiskInput,
};

impl RunTradeUseCase {
    /// Tier cascade, then the planner loop that produces the trade plan.
    pub(super) async fn analysis(
        &self,
        run: &mut TradeRun,
        mut context: ExecutionContext,
    ) -> Step<ExecutionContext> {
        self.advance(run, Phase::Analysis)?;

        // With providers configured the cascade gates the planner: a halt
        // means the analysis planner is never consulted.
        let signalled = if self.tiers.is_empty() {
            None
        } else {
            match run_cascade(&self.tiers, &context).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    let reason = format!("tier signal failed: {}", e);
                    self.mark_phase(run, Phase::Analysis, PhaseStatus::Error, reason.clone());
                    return Err(self.reject(run, FinalStatus::AnalysisFailed, reason));
                }
            }
        };
        if let Some(outcome) = &signalled {
            context.insert_output("cascade", outcome.to_context_value());
            if let CascadeOutcome::Halted { halt, .. } = outcome {
                let reason = format!("cascade halted: {}", halt.reason());
                self.mark_phase(run, Phase::Analysis, PhaseStatus::Rejected, reason.clone());
                return Err(self.reject(run, FinalStatus::NoTrade, reason));
            }
        }

        let mut context = self
            .run_planned(run, Phase::Analysis, context, FinalStatus::AnalysisFailed)
            .await?;

        let raw = run
            .phases
            .get(Phase::Analysis.as_str())
            .and_then(|r| {
                r.final_output
                    .clone()
                    .or_else(|| r.find_output("trade_plan").cloned())
            })
            .or_else(|| context.lookup("trade_plan").cloned());
        let Some(raw) = raw else {
            let reason = "analysis produced no trade plan";
            self.mark_phase(run, Phase::Analysis, PhaseStatus::VerificationFailed, reason);
            return Err(self.reject(run, FinalStatus::AnalysisFailed, reason));
        };

        let plan = match TradePlan::from_output(&raw) {
            Ok(plan) => plan,
            Err(errors) => {
                let count = self.session.write(|s| s.record_malformed_output());
                warn!(trade_id = %run.trade_id, malformed_outputs = count, "Trade plan failed validation");
                let reason = format!("trade plan rejected: {}", errors.join("; "));
                self.mark_phase(run, Phase::Analysis, PhaseStatus::VerificationFailed, reason.clone());
                return Err(self.reject(run, FinalStatus::AnalysisFailed, reason));
            }
        };

        let outcome = signalled.unwrap_or_else(|| TierCascade::evaluate(plan.tiers.clone()));
        context.insert_output("cascade", outcome.to_context_value());
        let plan = plan.with_tiers(outcome.assessments().to_vec());

        let mismatch = match &outcome {
            CascadeOutcome::Halted { halt, .. } => Some(format!("cascade halted: {}", halt.reason())),
            CascadeOutcome::Aligned { direction, .. } if *direction != plan.bias.direction() => {
                Some(format!(
                    "plan bias points {} but the cascade aligned {}",
                    plan.bias.direction(),
                    direction
                ))
            }
            CascadeOutcome::Aligned { .. } => None,
        };
        if let Some(reason) = mismatch {
            self.mark_phase(run, Phase::Analysis, PhaseStatus::Rejected, reason.clone());
            return Err(self.reject(run, FinalStatus::NoTrade, reason));
        }

        match serde_json::to_value(&plan) {
            Ok(value) => context.insert_output("trade_plan", value),
            Err(e) => {
                return Err(self.reject(
                    run,
                    FinalStatus::AnalysisFailed,
                    format!("trade plan not serialisable: {}", e),
                ));
            }
        }
        info!(
            trade_id = %run.trade_id,
            bias = ?plan.bias,
            candidates = plan.candidates.len(),
            "Trade plan accepted"
        );
        run.trade_plan = Some(plan);

        self.run_checklist(run, Phase::Analysis, CheckStage::Post, &mut context)?;
        Ok(context)
    }

    /// Planner loop for live inputs, then the deterministic risk converter.
    pub(super) async fn validation(
        &self,
        run: &mut TradeRun,
        context: ExecutionContext,
    ) -> Step<ExecutionContext> {
        self.advance(run, Phase::Validation)?;
        let context = context.seed_next_phase(Phase::Validation.as_str());
        let mut context = self
            .run_planned(run, Phase::Validation, context, FinalStatus::ValidationFailed)
            .await?;

        let decision = run
            .phases
            .get(Phase::Validation.as_str())
            .and_then(|r| r.final_output.clone());
        let field = |key: &str| decision.as_ref().and_then(|d| d.get(key)).cloned();

        if field("decision").as_ref().and_then(Value::as_str) == Some("abort") {
            let notes = field("notes")
                .and_then(|n| n.as_str().map(str::to_string))
                .unwrap_or_else(|| "no reason given".to_string());
            let reason = format!("planner aborted validation: {}", notes);
            self.mark_phase(run, Phase::Validation, PhaseStatus::Rejected, reason.clone());
            return Err(self.reject(run, FinalStatus::NoTrade, reason));
        }

        // Observed premium first; the planner's figure only as a fallback
        let entry = context
            .lookup_f64("quote.ltp")
            .or_else(|| context.lookup_f64("ltp"))
            .or_else(|| field("entry_price").and_then(|v| v.as_f64()));
        let Some(entry_price) = entry else {
            let reason = "no entry price: no quote observed and none proposed";
            self.mark_phase(run, Phase::Validation, PhaseStatus::Error, reason);
            return Err(self.reject(run, FinalStatus::ValidationFailed, reason));
        };
        let Some(exit_logic) = run.trade_plan.as_ref().map(|p| p.exit_logic.clone()) else {
            let reason = "validation reached without a trade plan";
            self.mark_phase(run, Phase::Validation, PhaseStatus::Error, reason);
            return Err(self.reject(run, FinalStatus::ValidationFailed, reason));
        };

        let input = TradeRiskInput {
            entry_price,
            stop_loss_text: exit_logic.stop_loss,
            target_text: exit_logic.target,
            available_capital: context.lookup_f64("available_capital"),
        };
        let converter = RiskConverter::new(self.config.risk.clone(), run.instrument.clone());
        let decision = converter.validate_trade_plan(&input);

        self.audit.log(AuditEvent::new(
            "risk_decision",
            json!({
                "trade_id": run.trade_id,
                "entry_price": input.entry_price,
                "stop_loss": input.stop_loss_text,
                "target": input.target_text,
                "available_capital": input.available_capital,
                "approved": decision.is_approved(),
                "detail": match &decision {
                    RiskDecision::Approved(plan) => plan.to_value(),
                    RiskDecision::Rejected(rejection) => json!(rejection),
                },
            }),
        ));

        match decision {
            RiskDecision::Approved(plan) => {
                info!(
                    trade_id = %run.trade_id,
                    lots = plan.lots(),
                    quantity = plan.quantity(),
                    stop_loss = plan.stop_loss(),
                    "Risk approved"
                );
                context.insert_output("executable_plan", plan.to_value());
                context.insert_output("stop_loss", json!(plan.stop_loss()));
                context.mark_guard("risk_validated");
                self.mark_phase(
                    run,
                    Phase::Validation,
                    PhaseStatus::Approved,
                    format!("risk approved: {} lot(s), quantity {}", plan.lots(), plan.quantity()),
                );
                run.executable_plan = Some(plan);

                self.run_checklist(run, Phase::Validation, CheckStage::Post, &mut context)?;
                Ok(context)
            }
            RiskDecision::Rejected(rejection) => {
                let reason = format!("risk rejected: {}", rejection);
                self.mark_phase(run, Phase::Validation, PhaseStatus::Rejected, reason.clone());
                Err(self.reject(run, FinalStatus::Rejected, reason))
            }
        }
    }

    /// Planner loop with order calls bound to the executable plan.
    pub(super) async fn execution(
        &self,
        run: &mut TradeRun,
        context: ExecutionContext,
    ) -> Step<ExecutionContext> {
        let approved = run
            .phases
            .get(Phase::Validation.as_str())
            .is_some_and(|r| r.is(PhaseStatus::Approved));
        if !approved || run.executable_plan.is_none() {
            return Err(self.reject(
                run,
                FinalStatus::ExecutionFailed,
                "execution requires an approved executable plan",
            ));
        }

        self.advance(run, Phase::Execution)?;
        let context = context.seed_next_phase(Phase::Execution.as_str());
        let mut context = self
            .run_planned(run, Phase::Execution, context, FinalStatus::ExecutionFailed)
            .await?;

        if !context.has_event(EVENT_ORDER_PLACED) {
            let reason = "execution phase ended without a placed order";
            self.mark_phase(run, Phase::Execution, PhaseStatus::Error, reason);
            return Err(self.reject(run, FinalStatus::ExecutionFailed, reason));
        }

        run.order_receipt = run
            .final_output
            .as_ref()
            .and_then(|o| o.get("order_receipt"))
            .filter(|r| !r.is_null())
            .or_else(|| context.lookup("order_receipt"))
            .cloned();
        info!(trade_id = %run.trade_id, receipt = ?run.order_receipt, "Order placed");

        self.run_checklist(run, Phase::Execution, CheckStage::Post, &mut context)?;
        Ok(context)
    }

    /// Planner-free exit tracking until the position closes.
    pub(super) async fn tracking(&self, run: &mut TradeRun) -> Step<()> {
        self.advance(run, Phase::PostExecutionTracking)?;
        let phase = Phase::PostExecutionTracking;
        let started = Instant::now();

        let Some(plan) = run.executable_plan.clone() else {
            let reason = "tracking reached without an executable plan";
            self.record_phase(run, PhaseResult::new(phase, PhaseStatus::Error, reason));
            return Err(self.reject(run, FinalStatus::TrackingFailed, reason));
        };
        let Some(feed) = &self.price_feed else {
            self.record_phase(
                run,
                PhaseResult::new(phase, PhaseStatus::Completed, "no price feed configured"),
            );
            return Ok(());
        };

        let prices = match feed.subscribe(plan.instrument()).await {
            Ok(prices) => prices,
            Err(e) => {
                self.session.write(|s| s.set_feed_connected(false));
                let reason = format!("price feed subscription failed: {}", e);
                self.record_phase(run, PhaseResult::new(phase, PhaseStatus::Error, reason.clone()));
                return Err(self.reject(run, FinalStatus::TrackingFailed, reason));
            }
        };
        self.session.write(|s| s.set_feed_connected(true));

        let token = self
            .cancellation_token
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let mut tracker = PositionTracker::spawn(&plan, prices, token);

        while let Some(event) = tracker.next_event().await {
            self.session.write(|s| {
                s.record_pnl(event.pnl());
                if event.closes_position() {
                    s.close_position();
                }
                if matches!(event, TrackingEvent::FeedLost { .. }) {
                    s.set_feed_connected(false);
                }
            });
            self.audit.log(AuditEvent::new(
                "position_exit",
                json!({"trade_id": run.trade_id, "exit": event}),
            ));
            self.progress.on_tracking_event(&event);
            run.tracking_events.push(event);

            if let Some(trigger) = self.session.kill_check(&run.kill_switch) {
                tracker.cancel();
                if let Err(e) = tracker.join().await {
                    warn!(trade_id = %run.trade_id, error = %e, "Tracker task failed during halt");
                }
                self.record_phase(
                    run,
                    PhaseResult::new(phase, PhaseStatus::Error, trigger.to_string())
                        .with_duration_ms(started.elapsed().as_millis() as u64),
                );
                return Err(self.halt(run, trigger));
            }
        }

        let position = match tracker.join().await {
            Ok(position) => position,
            Err(e) => {
                let reason = format!("tracker task failed: {}", e);
                self.record_phase(run, PhaseResult::new(phase, PhaseStatus::Error, reason.clone()));
                return Err(self.reject(run, FinalStatus::TrackingFailed, reason));
            }
        };

        let elapsed = started.elapsed().as_millis() as u64;
        if position.is_open() {
            let reason = format!(
                "tracking ended with {} unit(s) still open",
                position.open_quantity()
            );
            self.record_phase(
                run,
                PhaseResult::new(phase, PhaseStatus::Error, reason.clone()).with_duration_ms(elapsed),
            );
            return Err(self.reject(run, FinalStatus::TrackingFailed, reason));
        }

        self.record_phase(
            run,
            PhaseResult::new(
                phase,
                PhaseStatus::Completed,
                format!("position closed, realised pnl {:.2}", position.realised_pnl()),
            )
            .with_duration_ms(elapsed),
        );
        Ok(())
    }
}
