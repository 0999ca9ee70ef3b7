//! Phase loop configuration from TOML (`[loop]` and `[phases.*]` sections)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tradegate_application::ExecutionParams;
use tradegate_domain::{CapabilityTable, ConfigIssue, ConfigIssueCode, Phase};

/// Raw loop configuration
///
/// # Example
///
/// ```toml
/// [loop]
/// max_parallel_tools = 1
/// planner_view_results = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoopConfig {
    /// >1 enables bounded concurrency for side-effect-free batches
    pub max_parallel_tools: usize,
    pub planner_view_results: usize,
}

impl Default for FileLoopConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            max_parallel_tools: params.max_parallel_tools,
            planner_view_results: params.planner_view_results,
        }
    }
}

impl FileLoopConfig {
    pub fn to_execution_params(&self) -> (ExecutionParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        if self.max_parallel_tools == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "loop.max_parallel_tools".to_string(),
                },
                "loop.max_parallel_tools: must be at least 1, using 1 (sequential)",
            ));
        }
        let params = ExecutionParams::default()
            .with_max_parallel_tools(self.max_parallel_tools)
            .with_planner_view_results(self.planner_view_results);
        (params, issues)
    }
}

/// Overrides for one planner-driven phase. Unset fields keep the built-in
/// capability record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePhaseConfig {
    pub max_iterations: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub tools: Option<Vec<String>>,
}

/// Raw per-phase configuration
///
/// # Example
///
/// ```toml
/// [phases.analysis]
/// max_iterations = 8
/// timeout_secs = 120
/// tools = ["get_market_snapshot", "get_option_chain", "get_expiry_list"]
/// ```
///
/// Post-execution tracking is planner-free and has no section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePhasesConfig {
    pub analysis: FilePhaseConfig,
    pub validation: FilePhaseConfig,
    pub execution: FilePhaseConfig,
}

impl FilePhasesConfig {
    fn entries(&self) -> [(Phase, &FilePhaseConfig); 3] {
        [
            (Phase::Analysis, &self.analysis),
            (Phase::Validation, &self.validation),
            (Phase::Execution, &self.execution),
        ]
    }

    /// Apply the overrides on top of the built-in capability table.
    pub fn to_capabilities(&self) -> (CapabilityTable, Vec<ConfigIssue>) {
        let mut table = CapabilityTable::default();
        let mut issues = Vec::new();

        for (phase, file) in self.entries() {
            let Some(capability) = table.get_mut(phase) else {
                continue;
            };

            match file.max_iterations {
                Some(0) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::OutOfRange {
                        field: format!("phases.{}.max_iterations", phase),
                    },
                    format!(
                        "phases.{}.max_iterations: must be at least 1, keeping {}",
                        phase, capability.max_iterations
                    ),
                )),
                Some(n) => capability.max_iterations = n,
                None => {}
            }

            match file.timeout_secs {
                Some(0) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::OutOfRange {
                        field: format!("phases.{}.timeout_secs", phase),
                    },
                    format!(
                        "phases.{}.timeout_secs: must be at least 1, keeping {}s",
                        phase,
                        capability.timeout.as_secs()
                    ),
                )),
                Some(secs) => capability.timeout = Duration::from_secs(secs),
                None => {}
            }

            if let Some(tools) = &file.tools {
                capability.tools = tools.clone();
            }
        }

        (table, issues)
    }

    /// Allowlisted tools that no registered handler provides.
    pub fn unknown_tools(
        capabilities: &CapabilityTable,
        registered: &[String],
    ) -> Vec<ConfigIssue> {
        capabilities
            .iter()
            .flat_map(|capability| {
                capability
                    .tools
                    .iter()
                    .filter(|tool| !registered.contains(tool))
                    .map(move |tool| {
                        ConfigIssue::error(
                            ConfigIssueCode::UnknownTool {
                                phase: capability.phase.to_string(),
                                tool: tool.clone(),
                            },
                            format!(
                                "phases.{}.tools: '{}' is not a registered tool",
                                capability.phase, tool
                            ),
                        )
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_keep_builtin_budgets() {
        let config: super::super::FileConfig = toml::from_str("").unwrap();
        let (table, issues) = config.phases.to_capabilities();
        assert!(issues.is_empty());
        assert_eq!(table, CapabilityTable::default());
    }

    #[test]
    fn test_overrides_apply_per_phase() {
        let toml_str = r#"
[phases.analysis]
max_iterations = 4
tools = ["get_market_snapshot"]

[phases.execution]
timeout_secs = 10
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (table, issues) = config.phases.to_capabilities();
        assert!(issues.is_empty());

        let analysis = table.get(Phase::Analysis).unwrap();
        assert_eq!(analysis.max_iterations, 4);
        assert_eq!(analysis.tools, vec!["get_market_snapshot".to_string()]);

        let execution = table.get(Phase::Execution).unwrap();
        assert_eq!(execution.timeout, Duration::from_secs(10));
        assert!(execution.allows_tool("place_order"));
    }

    #[test]
    fn test_zero_budget_is_an_error() {
        let phases = FilePhasesConfig {
            validation: FilePhaseConfig {
                max_iterations: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let (table, issues) = phases.to_capabilities();
        assert!(ConfigIssue::has_errors(&issues));
        assert_eq!(table.get(Phase::Validation).unwrap().max_iterations, 6);
    }

    #[test]
    fn test_unknown_tools_are_reported() {
        let (table, _) = FilePhasesConfig::default().to_capabilities();
        let registered: Vec<String> = ["get_market_snapshot", "get_expiry_list", "get_option_chain", "get_quote"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let issues = FilePhasesConfig::unknown_tools(&table, &registered);
        let unknown: Vec<&str> = issues
            .iter()
            .filter_map(|i| match &i.code {
                ConfigIssueCode::UnknownTool { tool, .. } => Some(tool.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(unknown, vec!["get_available_capital", "place_order"]);
    }

    #[test]
    fn test_zero_parallelism_falls_back_to_sequential() {
        let (params, issues) = FileLoopConfig {
            max_parallel_tools: 0,
            planner_view_results: 5,
        }
        .to_execution_params();
        assert_eq!(issues.len(), 1);
        assert_eq!(params.max_parallel_tools, 1);
        assert_eq!(params.planner_view_results, 5);
    }
}
