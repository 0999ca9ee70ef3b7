//! Plans produced by the analysis and validation phases.
//!
//! - [`TradePlan`]: qualitative; bias, tier assessments, candidates, exit
//!   logic in words.
//! - [`ExecutablePlan`]: numeric; built only by the risk converter.
//! - [`TierCascade`]: the fixed structural → directional → tactical cascade
//!   run inside the analysis phase.

pub mod cascade;
pub mod executable_plan;
pub mod trade_plan;

pub use cascade::{CascadeHalt, CascadeOutcome, Direction, Tier, TierAssessment, TierCascade};
pub use executable_plan::ExecutablePlan;
pub use trade_plan::{Bias, ExecutionCandidate, ExitLogic, MAX_CANDIDATES, OptionType, TradePlan};
