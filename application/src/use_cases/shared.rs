//! Helpers shared by the phase loop and the orchestrator.

use crate::use_cases::run_phase::RunPhaseError;
use tokio_util::sync::CancellationToken;

/// `Err(RunPhaseError::Cancelled)` once an attached token has fired.
///
/// A run without a token can only end through its own budget.
pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> Result<(), RunPhaseError> {
    match token {
        Some(token) if token.is_cancelled() => Err(RunPhaseError::Cancelled),
        _ => Ok(()),
    }
}
