use thiserror::Error;

use crate::provider::ProviderError;

/// Routing failures surfaced to callers
#[derive(Debug, Error)]
pub enum RouterError {
    /// The next attempt's estimated cost would breach a cap; terminal
    /// for the current route, and no spend was recorded
    #[error(
        "estimated cost {requested:.6} would exceed remaining budget (daily {remaining_daily:.6}, monthly {remaining_monthly:.6})"
    )]
    BudgetExceeded {
        requested: f64,
        remaining_daily: f64,
        remaining_monthly: f64,
    },

    /// Even the terminal local fallback failed
    #[error("local fallback failed: {0}")]
    FallbackFailed(#[source] ProviderError),
}
