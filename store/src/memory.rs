//! In-memory reference implementation of the request store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use ratequote_common::{CurrencyPair, Quote, QuoteRequest, RequestId, RequestStatus};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::RequestStore;

#[derive(Default)]
struct Inner {
    requests: HashMap<RequestId, QuoteRequest>,
    /// Index enforcing at most one pending request per pair.
    pending_by_pair: HashMap<CurrencyPair, RequestId>,
    quotes: HashMap<CurrencyPair, Quote>,
}

/// Thread-safe in-memory store.
///
/// A single mutex serializes every operation, which is what makes
/// `create_or_get_pending` atomic under concurrent callers racing on the
/// same pair.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create_or_get_pending(&self, pair: &CurrencyPair) -> StoreResult<QuoteRequest> {
        let mut inner = self.inner.lock();

        if let Some(id) = inner.pending_by_pair.get(pair).copied() {
            if let Some(existing) = inner.requests.get_mut(&id) {
                existing.updated_at = Utc::now();
                debug!(request_id = %id, pair = %pair, "Reusing pending quote request");
                return Ok(existing.clone());
            }
        }

        let request = QuoteRequest::new(pair.clone());
        inner.pending_by_pair.insert(pair.clone(), request.id);
        inner.requests.insert(request.id, request.clone());
        debug!(request_id = %request.id, pair = %pair, "Created pending quote request");
        Ok(request)
    }

    async fn transition_status(&self, id: RequestId, status: RequestStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock();

        let pair = {
            let request = inner
                .requests
                .get_mut(&id)
                .ok_or(StoreError::RequestNotFound(id))?;
            request.status = status;
            request.updated_at = Utc::now();
            request.pair.clone()
        };

        // Keep the pending index in step with the new status.
        if status.is_pending() {
            inner.pending_by_pair.insert(pair, id);
        } else if inner.pending_by_pair.get(&pair) == Some(&id) {
            inner.pending_by_pair.remove(&pair);
        }

        Ok(())
    }

    async fn list_pending(&self) -> StoreResult<Vec<QuoteRequest>> {
        let inner = self.inner.lock();
        let mut pending: Vec<QuoteRequest> = inner
            .requests
            .values()
            .filter(|r| r.status.is_pending())
            .cloned()
            .collect();
        // Oldest first; ids break created_at ties deterministically.
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }

    async fn get_request(&self, id: RequestId) -> StoreResult<QuoteRequest> {
        let inner = self.inner.lock();
        inner
            .requests
            .get(&id)
            .cloned()
            .ok_or(StoreError::RequestNotFound(id))
    }

    async fn get_quote(&self, pair: &CurrencyPair) -> StoreResult<Quote> {
        let inner = self.inner.lock();
        inner
            .quotes
            .get(pair)
            .cloned()
            .ok_or_else(|| StoreError::QuoteNotFound(pair.clone()))
    }

    async fn upsert_quote(&self, pair: &CurrencyPair, rate: Decimal) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        match inner.quotes.get_mut(pair) {
            Some(existing) => existing.refresh(rate),
            None => {
                inner.quotes.insert(pair.clone(), Quote::new(pair.clone(), rate));
            }
        }
        Ok(())
    }
}
