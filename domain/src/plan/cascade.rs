//! Three-tier analysis cascade.
//!
//! Tiers are decided strictly in order, slow to fast:
//! structural → directional → tactical. A lower tier may only confirm the
//! direction already fixed by the tiers above it; it can never revise it.
//! The first disagreement (or "no opportunity") halts the cascade for good.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One priority tier of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Structural,
    Directional,
    Tactical,
}

impl Tier {
    /// All tiers in evaluation order.
    pub const ALL: [Tier; 3] = [Tier::Structural, Tier::Directional, Tier::Tactical];

    pub fn as_str(&self) -> &str {
        match self {
            Tier::Structural => "structural",
            Tier::Directional => "directional",
            Tier::Tactical => "tactical",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
            Direction::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_opportunity() -> bool {
    true
}

/// A single tier's judgement: regime, direction and trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssessment {
    pub tier: Tier,
    pub regime: String,
    pub direction: Direction,
    #[serde(default)]
    pub trigger: Option<String>,
    /// `false` means the tier sees nothing actionable.
    #[serde(default = "default_opportunity")]
    pub opportunity: bool,
}

impl TierAssessment {
    pub fn new(tier: Tier, regime: impl Into<String>, direction: Direction) -> Self {
        Self {
            tier,
            regime: regime.into(),
            direction,
            trigger: None,
            opportunity: true,
        }
    }

    pub fn no_opportunity(tier: Tier, regime: impl Into<String>) -> Self {
        Self {
            opportunity: false,
            ..Self::new(tier, regime, Direction::Neutral)
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }
}

/// Why the cascade stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeHalt {
    NoOpportunity { tier: Tier, regime: String },
    Disagreement { tier: Tier, expected: Direction, got: Direction },
    OutOfOrder { expected: Option<Tier>, got: Tier },
}

impl CascadeHalt {
    pub fn tier(&self) -> Tier {
        match self {
            CascadeHalt::NoOpportunity { tier, .. }
            | CascadeHalt::Disagreement { tier, .. }
            | CascadeHalt::OutOfOrder { got: tier, .. } => *tier,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            CascadeHalt::NoOpportunity { tier, regime } => {
                format!("{} tier reports no opportunity (regime '{}')", tier, regime)
            }
            CascadeHalt::Disagreement { tier, expected, got } => format!(
                "{} tier direction '{}' disagrees with higher tiers ('{}')",
                tier, got, expected
            ),
            CascadeHalt::OutOfOrder { expected, got } => match expected {
                Some(e) => format!("tier '{}' assessed before '{}'", got, e),
                None => format!("tier '{}' assessed after the cascade finished", got),
            },
        }
    }
}

/// Final state of a cascade run.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOutcome {
    Aligned {
        direction: Direction,
        assessments: Vec<TierAssessment>,
    },
    Halted {
        halt: CascadeHalt,
        assessments: Vec<TierAssessment>,
    },
}

impl CascadeOutcome {
    pub fn is_aligned(&self) -> bool {
        matches!(self, CascadeOutcome::Aligned { .. })
    }

    pub fn assessments(&self) -> &[TierAssessment] {
        match self {
            CascadeOutcome::Aligned { assessments, .. }
            | CascadeOutcome::Halted { assessments, .. } => assessments,
        }
    }

    /// Context value published under `cascade` for checklists and tools.
    pub fn to_context_value(&self) -> Value {
        let tiers: Vec<Value> = self
            .assessments()
            .iter()
            .map(|a| {
                json!({
                    "tier": a.tier.as_str(),
                    "regime": a.regime,
                    "direction": a.direction.as_str(),
                    "trigger": a.trigger,
                    "opportunity": a.opportunity,
                })
            })
            .collect();
        let regime = self.assessments().first().map(|a| a.regime.clone());
        match self {
            CascadeOutcome::Aligned { direction, .. } => json!({
                "aligned": true,
                "direction": direction.as_str(),
                "regime": regime,
                "tiers": tiers,
            }),
            CascadeOutcome::Halted { halt, .. } => json!({
                "aligned": false,
                "halted_at": halt.tier().as_str(),
                "reason": halt.reason(),
                "regime": regime,
                "tiers": tiers,
            }),
        }
    }
}

/// One-directional, run-once cascade state.
#[derive(Debug, Clone, Default)]
pub struct TierCascade {
    decided: Vec<TierAssessment>,
    halted: Option<CascadeHalt>,
}

impl TierCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tier to ask next, or `None` once halted or complete.
    pub fn next_tier(&self) -> Option<Tier> {
        if self.halted.is_some() {
            return None;
        }
        Tier::ALL.get(self.decided.len()).copied()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Direction fixed by the highest tier, if any.
    pub fn direction(&self) -> Option<Direction> {
        self.decided.first().map(|a| a.direction)
    }

    pub fn assessments(&self) -> &[TierAssessment] {
        &self.decided
    }

    /// Record the next tier's judgement.
    ///
    /// After a halt every further call returns the same halt.
    pub fn accept(&mut self, assessment: TierAssessment) -> Result<(), CascadeHalt> {
        if let Some(halt) = &self.halted {
            return Err(halt.clone());
        }
        let expected = self.next_tier();
        if expected != Some(assessment.tier) {
            return Err(self.halt(CascadeHalt::OutOfOrder {
                expected,
                got: assessment.tier,
            }));
        }
        if !assessment.opportunity || assessment.direction == Direction::Neutral {
            let halt = CascadeHalt::NoOpportunity {
                tier: assessment.tier,
                regime: assessment.regime.clone(),
            };
            self.decided.push(assessment);
            return Err(self.halt(halt));
        }
        if let Some(expected) = self.direction()
            && expected != assessment.direction
        {
            let halt = CascadeHalt::Disagreement {
                tier: assessment.tier,
                expected,
                got: assessment.direction,
            };
            self.decided.push(assessment);
            return Err(self.halt(halt));
        }
        self.decided.push(assessment);
        Ok(())
    }

    fn halt(&mut self, halt: CascadeHalt) -> CascadeHalt {
        self.halted = Some(halt.clone());
        halt
    }

    pub fn outcome(&self) -> Option<CascadeOutcome> {
        if let Some(halt) = &self.halted {
            return Some(CascadeOutcome::Halted {
                halt: halt.clone(),
                assessments: self.decided.clone(),
            });
        }
        if self.decided.len() == Tier::ALL.len() {
            return self.direction().map(|direction| CascadeOutcome::Aligned {
                direction,
                assessments: self.decided.clone(),
            });
        }
        None
    }

    /// Run a complete cascade over already-produced assessments.
    ///
    /// Missing tiers halt as out-of-order at the first gap.
    pub fn evaluate(assessments: impl IntoIterator<Item = TierAssessment>) -> CascadeOutcome {
        let mut cascade = Self::new();
        for assessment in assessments {
            if cascade.accept(assessment).is_err() {
                break;
            }
        }
        match cascade.outcome() {
            Some(outcome) => outcome,
            None => CascadeOutcome::Halted {
                halt: CascadeHalt::NoOpportunity {
                    tier: cascade.next_tier().unwrap_or(Tier::Tactical),
                    regime: "missing assessment".to_string(),
                },
                assessments: cascade.decided,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(tier: Tier) -> TierAssessment {
        TierAssessment::new(tier, "trending", Direction::Long)
    }

    #[test]
    fn test_aligned_cascade() {
        let outcome = TierCascade::evaluate(Tier::ALL.map(long));
        assert!(outcome.is_aligned());
        assert_eq!(outcome.assessments().len(), 3);
        assert_eq!(outcome.to_context_value()["direction"], "long");
    }

    #[test]
    fn test_no_opportunity_halts_before_lower_tiers() {
        let mut cascade = TierCascade::new();
        let halt = cascade
            .accept(TierAssessment::no_opportunity(Tier::Structural, "choppy"))
            .unwrap_err();
        assert_eq!(halt.tier(), Tier::Structural);
        assert_eq!(cascade.next_tier(), None);
        assert!(cascade.accept(long(Tier::Directional)).is_err());
        assert_eq!(cascade.assessments().len(), 1);
    }

    #[test]
    fn test_lower_tier_cannot_revise_direction() {
        let mut cascade = TierCascade::new();
        cascade.accept(long(Tier::Structural)).unwrap();
        let halt = cascade
            .accept(TierAssessment::new(Tier::Directional, "trending", Direction::Short))
            .unwrap_err();
        assert!(matches!(halt, CascadeHalt::Disagreement { expected: Direction::Long, .. }));
        assert_eq!(cascade.direction(), Some(Direction::Long));
        assert!(!cascade.outcome().unwrap().is_aligned());
    }

    #[test]
    fn test_out_of_order_tier_halts() {
        let mut cascade = TierCascade::new();
        let halt = cascade.accept(long(Tier::Tactical)).unwrap_err();
        assert!(matches!(halt, CascadeHalt::OutOfOrder { .. }));
    }

    #[test]
    fn test_missing_tier_is_not_aligned() {
        let outcome = TierCascade::evaluate([long(Tier::Structural), long(Tier::Directional)]);
        assert!(!outcome.is_aligned());
    }

    #[test]
    fn test_assessment_deserializes_with_default_opportunity() {
        let a: TierAssessment = serde_json::from_value(serde_json::json!({
            "tier": "directional", "regime": "trending", "direction": "short"
        }))
        .unwrap();
        assert!(a.opportunity);
        assert_eq!(a.direction, Direction::Short);
    }
}
