//! Store error types.

use ratequote_common::{CurrencyPair, RequestId};
use thiserror::Error;

/// Errors returned by request store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No request exists with the given id.
    #[error("quote request {0} not found")]
    RequestNotFound(RequestId),

    /// No quote has been resolved yet for the pair.
    #[error("no quote for pair {0}")]
    QuoteNotFound(CurrencyPair),

    /// The backing store failed to execute the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if this is a lookup miss rather than a backend fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RequestNotFound(_) | StoreError::QuoteNotFound(_)
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
