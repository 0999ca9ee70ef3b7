//! The analysis phase's qualitative output.

use super::cascade::{Direction, Tier, TierAssessment};
use crate::tool::schema::{FieldSpec, FieldType, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on execution candidates carried by a plan.
pub const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn direction(&self) -> Direction {
        match self {
            Bias::Bullish => Direction::Long,
            Bias::Bearish => Direction::Short,
            Bias::Neutral => Direction::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE", alias = "call")]
    Call,
    #[serde(rename = "PE", alias = "put")]
    Put,
}

/// A strike/instrument the plan may execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCandidate {
    pub symbol: String,
    #[serde(default)]
    pub strike: Option<f64>,
    #[serde(default)]
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub expiry: Option<String>,
}

/// Exit guidance in words; converted to prices only by the risk converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitLogic {
    pub stop_loss: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Immutable result of a successful analysis phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub bias: Bias,
    /// Fixed-order tier assessments (structural, directional, tactical).
    #[serde(default)]
    pub tiers: Vec<TierAssessment>,
    pub candidates: Vec<ExecutionCandidate>,
    pub exit_logic: ExitLogic,
}

impl TradePlan {
    /// Parse and validate the planner's final analysis output.
    pub fn from_output(output: &Value) -> Result<Self, Vec<String>> {
        let plan: TradePlan = serde_json::from_value(output.clone())
            .map_err(|e| vec![format!("Malformed trade plan: {}", e)])?;
        let errors = plan.validate();
        if errors.is_empty() {
            Ok(plan)
        } else {
            Err(errors)
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.candidates.is_empty() {
            errors.push("Trade plan has no execution candidates".to_string());
        } else if self.candidates.len() > MAX_CANDIDATES {
            errors.push(format!(
                "Trade plan has {} candidates (max {})",
                self.candidates.len(),
                MAX_CANDIDATES
            ));
        }

        if self.exit_logic.stop_loss.trim().is_empty() {
            errors.push("Exit logic is missing stop-loss guidance".to_string());
        }

        if !self.tiers.is_empty() {
            let order: Vec<Tier> = self.tiers.iter().map(|t| t.tier).collect();
            if order != Tier::ALL {
                errors.push(format!(
                    "Tier assessments must be in order structural, directional, tactical; got {:?}",
                    order
                ));
            }
        }

        errors
    }

    /// Replace the tiers with the cascade's authoritative assessments.
    pub fn with_tiers(mut self, tiers: Vec<TierAssessment>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn primary_candidate(&self) -> Option<&ExecutionCandidate> {
        self.candidates.first()
    }

    /// Output schema the planner's `final` analysis directive must satisfy.
    pub fn output_schema() -> Schema {
        Schema::new()
            .field(
                FieldSpec::new("bias", FieldType::String)
                    .required()
                    .with_enum(["bullish", "bearish", "neutral"]),
            )
            .field(FieldSpec::new("tiers", FieldType::Array))
            .field(FieldSpec::new("candidates", FieldType::Array).required())
            .field(
                FieldSpec::new("exit_logic", FieldType::Object)
                    .required()
                    .with_description("Qualitative stop_loss and target guidance"),
            )
    }
}
