//! RateQuote Store
//!
//! The request store contract and its in-memory reference implementation.
//! The store owns quote requests and resolved quotes; backing technology is
//! interchangeable as long as the dedup-sensitive operations stay atomic.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use ratequote_common::{CurrencyPair, Quote, QuoteRequest, RequestId, RequestStatus};
use rust_decimal::Decimal;

use crate::error::StoreResult;

pub use error::StoreError;
pub use memory::MemoryStore;

/// Contract for durable storage of quote requests and resolved quotes.
///
/// Implementations must serialize [`create_or_get_pending`] and
/// [`transition_status`] so that concurrent callers can neither create two
/// pending requests for the same pair nor observe a half-applied status.
///
/// [`create_or_get_pending`]: RequestStore::create_or_get_pending
/// [`transition_status`]: RequestStore::transition_status
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Atomically return the existing pending request for the pair, or
    /// create a new one. On the dedup hit the existing request's
    /// `updated_at` is refreshed best-effort; a failed refresh is not fatal.
    async fn create_or_get_pending(&self, pair: &CurrencyPair) -> StoreResult<QuoteRequest>;

    /// Overwrite the status of a request and refresh its `updated_at`.
    async fn transition_status(&self, id: RequestId, status: RequestStatus) -> StoreResult<()>;

    /// All pending requests, oldest created first.
    async fn list_pending(&self) -> StoreResult<Vec<QuoteRequest>>;

    /// Look up a request by id.
    async fn get_request(&self, id: RequestId) -> StoreResult<QuoteRequest>;

    /// Latest resolved quote for a pair.
    async fn get_quote(&self, pair: &CurrencyPair) -> StoreResult<Quote>;

    /// Create or replace the quote for a pair.
    async fn upsert_quote(&self, pair: &CurrencyPair, rate: Decimal) -> StoreResult<()>;
}
