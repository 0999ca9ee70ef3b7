//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tradegate_domain::CheckStage;

/// CLI arguments for tradegate
#[derive(Parser, Debug)]
#[command(name = "tradegate")]
#[command(author, version, about = "Guarded control layer between an LLM planner and order placement")]
#[command(long_about = r#"
tradegate checks every planner-proposed action against dependency rules,
safety vetoes, checklists and kill switches before anything reaches a broker.

The subcommands here work offline against the same configuration the
orchestrator uses.

Configuration files are loaded from (in priority order):
1. TRADEGATE_* env     e.g. TRADEGATE_SAFETY__DRY_RUN=false
2. --config <path>     Explicit config file
3. ./tradegate.toml    Project-level config
4. ~/.config/tradegate/config.toml   Global config

Example:
  tradegate check-config
  tradegate risk --instrument NIFTY --entry 95.25 --stop-loss "below 85"
  tradegate checklist --phase validation --context ctx.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the merged configuration and report every issue
    CheckConfig {
        /// Registered tool names; allowlist entries outside this set are reported
        #[arg(long, value_name = "NAME", value_delimiter = ',')]
        tools: Vec<String>,
    },

    /// Run the risk converter on one trade idea
    Risk {
        #[arg(long, default_value = "NIFTY")]
        instrument: String,

        /// Entry premium
        #[arg(long)]
        entry: f64,

        /// Stop-loss guidance text, e.g. "85" or "below 85" or "15%"
        #[arg(long, value_name = "TEXT")]
        stop_loss: String,

        /// Target guidance text, e.g. "107, 116"
        #[arg(long, value_name = "TEXT")]
        target: Option<String>,

        /// Available capital for the funds check
        #[arg(long)]
        capital: Option<f64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a checklist against a JSON execution context
    Checklist {
        /// Phase whose checklist to run
        #[arg(long)]
        phase: String,

        /// JSON file: {"outputs": {...}, "events": [...], "guards": [...]}
        #[arg(long, value_name = "PATH")]
        context: PathBuf,

        #[arg(long, value_enum, default_value = "post")]
        stage: Stage,

        /// Checklist file; defaults to [checklist].path from the config
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Show configuration file locations and exit
    ConfigSources,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Stage {
    Pre,
    Post,
}

impl From<Stage> for CheckStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Pre => CheckStage::Pre,
            Stage::Post => CheckStage::Post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_risk_command() {
        let cli = Cli::parse_from([
            "tradegate",
            "-vv",
            "risk",
            "--entry",
            "95.25",
            "--stop-loss",
            "below 85",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Risk {
                instrument,
                entry,
                stop_loss,
                target,
                ..
            } => {
                assert_eq!(instrument, "NIFTY");
                assert_eq!(entry, 95.25);
                assert_eq!(stop_loss, "below 85");
                assert!(target.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_list() {
        let cli = Cli::parse_from([
            "tradegate",
            "check-config",
            "--tools",
            "get_quote,place_order",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::CheckConfig { tools } if tools.len() == 2));
    }
}
