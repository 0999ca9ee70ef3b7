//! Tier signal port
//!
//! Structural, directional and tactical scoring (structure, volatility,
//! momentum heuristics) lives outside the core. Each provider answers for
//! exactly one [`Tier`] of the analysis cascade.

use async_trait::async_trait;
use tradegate_domain::{ExecutionContext, Tier, TierAssessment};

#[async_trait]
pub trait TierSignalProvider: Send + Sync {
    fn tier(&self) -> Tier;

    /// Judge this tier against the current analysis context.
    async fn assess(&self, context: &ExecutionContext) -> Result<TierAssessment, String>;
}
