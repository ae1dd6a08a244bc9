//! One processing cycle of the quote-request lifecycle.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ratequote_common::{Currency, CurrencyPair, QuoteRequest, RequestStatus};
use ratequote_rates::{RateSource, RateTable};
use ratequote_store::error::StoreResult;
use ratequote_store::RequestStore;
use tracing::{debug, error, info, instrument, warn};

/// Counters describing what a single cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Pending requests discovered at the start of the cycle.
    pub discovered: usize,
    /// Requests that reached `completed`.
    pub completed: usize,
    /// Requests that reached `failed`.
    pub failed: usize,
}

/// Drives quote requests from `pending` to a terminal status.
///
/// A cycle makes at most one rate source call; a source failure fails every
/// discovered request, while a failure inside one pair group is contained to
/// that group. Re-running a cycle is harmless because discovery only selects
/// pending requests.
pub struct LifecycleEngine {
    store: Arc<dyn RequestStore>,
    source: Arc<dyn RateSource>,
}

impl LifecycleEngine {
    /// Create a new engine over a store and a rate source.
    pub fn new(store: Arc<dyn RequestStore>, source: Arc<dyn RateSource>) -> Self {
        Self { store, source }
    }

    /// Run one discover-fetch-resolve cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> StoreResult<CycleOutcome> {
        let pending = self.store.list_pending().await?;
        if pending.is_empty() {
            debug!("No pending quote requests");
            return Ok(CycleOutcome::default());
        }

        let mut outcome = CycleOutcome {
            discovered: pending.len(),
            ..CycleOutcome::default()
        };
        info!(count = pending.len(), "Found pending quote requests");

        let currencies = collect_currencies(&pending);
        let table = match self.source.fetch_usd_rates(&currencies).await {
            Ok(rates) => RateTable::from_usd_rates(rates),
            Err(e) => {
                error!(error = %e, "Rate source fetch failed, failing all discovered requests");
                self.mark_failed(&pending).await;
                outcome.failed = pending.len();
                return Ok(outcome);
            }
        };

        for group in group_by_pair(pending) {
            if self.resolve_group(&group, &table).await {
                outcome.completed += group.requests.len();
            } else {
                outcome.failed += group.requests.len();
            }
        }

        info!(
            discovered = outcome.discovered,
            completed = outcome.completed,
            failed = outcome.failed,
            "Cycle finished"
        );
        Ok(outcome)
    }

    /// Resolve every request in one pair group. Returns whether the group
    /// completed.
    async fn resolve_group(&self, group: &PairGroup, table: &RateTable) -> bool {
        self.transition_all(&group.requests, RequestStatus::Processing)
            .await;

        let rate = match table.cross_rate(&group.pair) {
            Ok(rate) => rate,
            Err(e) => {
                warn!(pair = %group.pair, error = %e, "Cannot derive rate for pair");
                self.mark_failed(&group.requests).await;
                return false;
            }
        };

        if let Err(e) = self.store.upsert_quote(&group.pair, rate).await {
            error!(pair = %group.pair, error = %e, "Failed to save quote");
            self.mark_failed(&group.requests).await;
            return false;
        }

        self.transition_all(&group.requests, RequestStatus::Completed)
            .await;
        info!(
            pair = %group.pair,
            rate = %rate,
            count = group.requests.len(),
            "Resolved quote requests"
        );
        true
    }

    async fn mark_failed(&self, requests: &[QuoteRequest]) {
        self.transition_all(requests, RequestStatus::Failed).await;
    }

    /// Transition every request in the slice, logging individual misses
    /// instead of aborting the remainder.
    async fn transition_all(&self, requests: &[QuoteRequest], status: RequestStatus) {
        for request in requests {
            if let Err(e) = self.store.transition_status(request.id, status).await {
                error!(
                    request_id = %request.id,
                    status = %status,
                    error = %e,
                    "Failed to update request status"
                );
            }
        }
    }
}

/// Union of every currency appearing in the discovered requests.
fn collect_currencies(requests: &[QuoteRequest]) -> BTreeSet<Currency> {
    let mut currencies = BTreeSet::new();
    for request in requests {
        currencies.insert(request.pair.from.clone());
        currencies.insert(request.pair.to.clone());
    }
    currencies
}

/// Requests sharing a pair, resolved as one unit.
struct PairGroup {
    pair: CurrencyPair,
    requests: Vec<QuoteRequest>,
}

/// Partition discovered requests by pair, preserving discovery order.
fn group_by_pair(pending: Vec<QuoteRequest>) -> Vec<PairGroup> {
    let mut groups: Vec<PairGroup> = Vec::new();
    let mut index: HashMap<CurrencyPair, usize> = HashMap::new();

    for request in pending {
        match index.get(&request.pair) {
            Some(&i) => groups[i].requests.push(request),
            None => {
                index.insert(request.pair.clone(), groups.len());
                groups.push(PairGroup {
                    pair: request.pair.clone(),
                    requests: vec![request],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratequote_rates::MockRateSource;
    use ratequote_store::{MemoryStore, StoreError};
    use rust_decimal_macros::dec;

    fn eur_mxn() -> CurrencyPair {
        CurrencyPair::new(Currency::eur(), Currency::mxn())
    }

    fn usd_eur() -> CurrencyPair {
        CurrencyPair::new(Currency::usd(), Currency::eur())
    }

    fn setup() -> (Arc<MemoryStore>, Arc<MockRateSource>, LifecycleEngine) {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(MockRateSource::new());
        let engine = LifecycleEngine::new(store.clone(), source.clone());
        (store, source, engine)
    }

    #[tokio::test]
    async fn test_empty_cycle_does_nothing_observable() {
        let (_store, source, engine) = setup();

        let outcome = engine.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::default());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cycle_resolves_groups_with_one_fetch() {
        let (store, source, engine) = setup();
        source.set_rate(Currency::eur(), dec!(0.85));
        source.set_rate(Currency::mxn(), dec!(18.5));

        // Two requests for EUR/MXN collapse into one pending row plus one
        // request for USD/EUR.
        let shared = store.create_or_get_pending(&eur_mxn()).await.unwrap();
        let duplicate = store.create_or_get_pending(&eur_mxn()).await.unwrap();
        let other = store.create_or_get_pending(&usd_eur()).await.unwrap();
        assert_eq!(shared.id, duplicate.id);

        let outcome = engine.run_cycle().await.unwrap();

        assert_eq!(outcome.discovered, 2);
        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(source.calls(), 1);

        let shared = store.get_request(shared.id).await.unwrap();
        let other = store.get_request(other.id).await.unwrap();
        assert_eq!(shared.status, RequestStatus::Completed);
        assert_eq!(other.status, RequestStatus::Completed);

        let cross = store.get_quote(&eur_mxn()).await.unwrap();
        assert_eq!(cross.rate.round_dp(4), dec!(21.7647));
        let direct = store.get_quote(&usd_eur()).await.unwrap();
        assert_eq!(direct.rate, dec!(0.85));
    }

    #[tokio::test]
    async fn test_source_failure_fails_every_discovered_request() {
        let (store, source, engine) = setup();
        source.set_unavailable(true);

        let a = store.create_or_get_pending(&eur_mxn()).await.unwrap();
        let b = store.create_or_get_pending(&usd_eur()).await.unwrap();

        let outcome = engine.run_cycle().await.unwrap();

        assert_eq!(outcome.discovered, 2);
        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.failed, 2);

        for id in [a.id, b.id] {
            let request = store.get_request(id).await.unwrap();
            assert_eq!(request.status, RequestStatus::Failed);
        }
        assert!(matches!(
            store.get_quote(&eur_mxn()).await,
            Err(StoreError::QuoteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_currency_fails_only_its_group() {
        let (store, source, engine) = setup();
        // MXN is silently missing from the source response.
        source.set_rate(Currency::eur(), dec!(0.85));

        let doomed = store.create_or_get_pending(&eur_mxn()).await.unwrap();
        let fine = store.create_or_get_pending(&usd_eur()).await.unwrap();

        let outcome = engine.run_cycle().await.unwrap();

        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.failed, 1);

        let doomed = store.get_request(doomed.id).await.unwrap();
        assert_eq!(doomed.status, RequestStatus::Failed);
        assert!(matches!(
            store.get_quote(&eur_mxn()).await,
            Err(StoreError::QuoteNotFound(_))
        ));

        let fine = store.get_request(fine.id).await.unwrap();
        assert_eq!(fine.status, RequestStatus::Completed);
        assert_eq!(store.get_quote(&usd_eur()).await.unwrap().rate, dec!(0.85));
    }

    #[tokio::test]
    async fn test_terminal_requests_are_never_revisited() {
        let (store, source, engine) = setup();
        source.set_rate(Currency::eur(), dec!(0.85));

        let request = store.create_or_get_pending(&usd_eur()).await.unwrap();
        engine.run_cycle().await.unwrap();

        let after_first = store.get_request(request.id).await.unwrap();
        assert_eq!(after_first.status, RequestStatus::Completed);

        // A second cycle discovers nothing and touches nothing.
        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::default());
        assert_eq!(source.calls(), 1);

        let after_second = store.get_request(request.id).await.unwrap();
        assert_eq!(after_second.status, RequestStatus::Completed);
        assert_eq!(after_second.updated_at, after_first.updated_at);
    }

    #[test]
    fn test_groups_follow_discovery_order() {
        let requests = vec![
            QuoteRequest::new(eur_mxn()),
            QuoteRequest::new(usd_eur()),
            QuoteRequest::new(eur_mxn()),
        ];

        let groups = group_by_pair(requests);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pair, eur_mxn());
        assert_eq!(groups[0].requests.len(), 2);
        assert_eq!(groups[1].pair, usd_eur());
    }

    #[test]
    fn test_collect_currencies_dedups() {
        let requests = vec![
            QuoteRequest::new(eur_mxn()),
            QuoteRequest::new(usd_eur()),
            QuoteRequest::new(eur_mxn()),
        ];

        let currencies = collect_currencies(&requests);

        assert_eq!(currencies.len(), 3);
        assert!(currencies.contains(&Currency::usd()));
        assert!(currencies.contains(&Currency::eur()));
        assert!(currencies.contains(&Currency::mxn()));
    }
}
