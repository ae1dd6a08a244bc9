//! Rate engine error types.

use ratequote_common::Currency;
use thiserror::Error;

/// Errors that can occur when fetching or crossing rates.
#[derive(Debug, Error)]
pub enum RateError {
    /// The rate table has no entry for the given currency.
    #[error("currency {0} not found in rate table")]
    UnknownCurrency(Currency),

    /// The upstream fetch failed as a single unit: transport error, timeout,
    /// non-success status, or an unusable payload.
    #[error("rate source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
