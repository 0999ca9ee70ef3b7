//! Drives the tier cascade through the configured signal providers.

use crate::ports::tier_signal::TierSignalProvider;
use std::sync::Arc;
use tracing::{debug, info};
use tradegate_domain::{CascadeOutcome, ExecutionContext, TierCascade};

/// Ask each tier's provider in fixed order, stopping at the first halt.
///
/// Lower tiers are never asked once a higher tier has halted the cascade.
pub(super) async fn run_cascade(
    providers: &[Arc<dyn TierSignalProvider>],
    context: &ExecutionContext,
) -> Result<CascadeOutcome, String> {
    let mut cascade = TierCascade::new();

    while let Some(tier) = cascade.next_tier() {
        let provider = providers
            .iter()
            .find(|p| p.tier() == tier)
            .ok_or_else(|| format!("no signal provider for the {} tier", tier))?;

        let assessment = provider
            .assess(context)
            .await
            .map_err(|e| format!("{} tier: {}", tier, e))?;
        debug!(
            tier = %tier,
            regime = %assessment.regime,
            direction = %assessment.direction,
            "Tier assessed"
        );

        if let Err(halt) = cascade.accept(assessment) {
            info!(tier = %tier, reason = %halt.reason(), "Cascade halted");
            break;
        }
    }

    cascade
        .outcome()
        .ok_or_else(|| "cascade ended without a decision".to_string())
}
