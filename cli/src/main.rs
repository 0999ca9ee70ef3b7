//! CLI entrypoint for tradegate
//!
//! Loads the layered configuration, installs logging and runs one of the
//! offline subcommands against the same rule sets the orchestrator uses.

mod commands;
mod logging;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Cli, Command};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tradegate_application::GateConfig;
use tradegate_domain::{
    CheckStage, ChecklistEvaluator, ConfigIssue, ExecutionContext, RiskConverter, RiskDecision,
    Severity, TradeRiskInput,
};
use tradegate_infrastructure::{ConfigLoader, FileConfig, load_checklist};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };

    let _log_guard = logging::init(cli.verbose, config.logging.dir.as_deref());
    info!("Starting tradegate");

    match cli.command {
        Command::CheckConfig { tools } => check_config(&config, &tools),
        Command::Risk {
            instrument,
            entry,
            stop_loss,
            target,
            capital,
            json,
        } => {
            let input = TradeRiskInput {
                entry_price: entry,
                stop_loss_text: stop_loss,
                target_text: target,
                available_capital: capital,
            };
            risk(&config, &instrument, input, json)
        }
        Command::Checklist {
            phase,
            context,
            stage,
            file,
        } => checklist(&config, &phase, &context, stage.into(), file),
        Command::ConfigSources => {
            config_sources(cli.config.as_ref());
            Ok(())
        }
    }
}

/// Gate config for today, refusing to continue on fatal issues.
fn gate_config(config: &FileConfig) -> Result<GateConfig> {
    let (gate, issues) = config.to_gate_config();
    if ConfigIssue::has_errors(&issues) {
        print_issues(&issues);
        bail!("configuration has errors; run `tradegate check-config` for details");
    }
    Ok(gate)
}

fn print_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        let label = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("  [{}] {}", label, issue.message);
    }
}

fn check_config(config: &FileConfig, tools: &[String]) -> Result<()> {
    let mut issues = config.validate();
    if !tools.is_empty() {
        issues.extend(config.validate_tools(tools));
    }

    if issues.is_empty() {
        println!("Configuration OK");
        return Ok(());
    }

    print_issues(&issues);
    if ConfigIssue::has_errors(&issues) {
        bail!("{} configuration issue(s) found", issues.len());
    }
    println!("Configuration usable with {} warning(s)", issues.len());
    Ok(())
}

fn risk(config: &FileConfig, instrument: &str, input: TradeRiskInput, json: bool) -> Result<()> {
    let gate = gate_config(config)?;
    let instrument = gate.instruments.get(instrument)?.clone();
    debug!(instrument = %instrument.symbol, entry = input.entry_price, "Converting trade idea");

    let decision = RiskConverter::new(gate.risk, instrument).validate_trade_plan(&input);
    match decision {
        RiskDecision::Approved(plan) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&plan.to_value())?);
            } else {
                println!("Approved {} x{} lots ({} qty)", plan.instrument(), plan.lots(), plan.quantity());
                println!("  entry          {:.2}", plan.entry_price());
                println!("  stop loss      {:.2} ({:.1}%)", plan.stop_loss(), plan.stop_loss_pct());
                println!("  partial target {:.2}", plan.partial_target());
                println!("  final target   {:.2}", plan.final_target());
                println!("  total risk     {:.2}", plan.total_risk());
                println!("  capital        {:.2}", plan.capital_required());
            }
            Ok(())
        }
        RiskDecision::Rejected(rejection) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&rejection)?);
            }
            bail!("risk rejected: {}", rejection)
        }
    }
}

/// Context file layout for the `checklist` subcommand. A bare object is
/// taken as the outputs map.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContextFile {
    outputs: Map<String, Value>,
    events: Vec<String>,
    guards: Vec<String>,
}

fn load_context(path: &Path, phase: &str) -> Result<ExecutionContext> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read context file {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let structured = value
        .as_object()
        .is_some_and(|map| ["outputs", "events", "guards"].iter().any(|k| map.contains_key(*k)));
    let file = match value {
        Value::Object(_) if structured => serde_json::from_value::<ContextFile>(value)?,
        Value::Object(outputs) => ContextFile {
            outputs,
            ..Default::default()
        },
        _ => bail!("{} must contain a JSON object", path.display()),
    };

    let mut context = ExecutionContext::new("cli", phase);
    for (key, value) in file.outputs {
        context.insert_output(key, value);
    }
    for event in file.events {
        context.record_event(event);
    }
    for guard in file.guards {
        context.mark_guard(guard);
    }
    Ok(context)
}

fn checklist(
    config: &FileConfig,
    phase: &str,
    context_path: &Path,
    stage: CheckStage,
    file: Option<PathBuf>,
) -> Result<()> {
    let Some(path) = file.or_else(|| config.checklist.path.clone()) else {
        bail!("no checklist file: pass --file or set [checklist].path");
    };
    let document = load_checklist(&path)?;
    let context = load_context(context_path, phase)?;

    let report = ChecklistEvaluator::evaluate(&document, phase, stage, &context);
    if report.outcomes.is_empty() {
        println!("No checks defined for {} ({:?})", phase, stage);
        return Ok(());
    }

    for outcome in &report.outcomes {
        let mark = match (outcome.passed, outcome.required) {
            (true, _) => "PASS",
            (false, true) => "FAIL",
            (false, false) => "WARN",
        };
        println!("  [{}] {} {}", mark, outcome.id, outcome.message);
    }

    match report.action() {
        None => {
            println!("Checklist passed");
            Ok(())
        }
        Some(action) => bail!("checklist failed ({}): {}", action.as_str(), report.reason()),
    }
}

fn config_sources(config_path: Option<&PathBuf>) {
    println!("Configuration sources (in priority order):");
    for source in ConfigLoader::config_sources(config_path) {
        let mark = if source.found { "FOUND" } else { "     " };
        println!("  [{}] {:<8} {}", mark, format!("{}:", source.label), source.location);
    }
}
