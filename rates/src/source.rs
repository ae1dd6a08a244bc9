//! Rate source trait and the HTTP client implementation.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use ratequote_common::Currency;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{RateError, RateResult};

/// Trait for upstream providers of USD-relative rates.
///
/// A fetch covers the whole currency set in one call and fails as a single
/// unit; partial results are never returned.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch USD-relative rates for every currency in the set. USD is part
    /// of the result whether or not the upstream includes it.
    async fn fetch_usd_rates(
        &self,
        currencies: &BTreeSet<Currency>,
    ) -> RateResult<HashMap<Currency, Decimal>>;
}

/// Response envelope returned by the fxratesapi-style upstream.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    success: bool,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// HTTP rate source querying an fxratesapi-compatible endpoint.
pub struct FxRatesApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FxRatesApiSource {
    /// Create a new source. The timeout bounds every fetch; a fetch that
    /// exceeds it fails with [`RateError::SourceUnavailable`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> RateResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ratequote/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::SourceUnavailable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl RateSource for FxRatesApiSource {
    async fn fetch_usd_rates(
        &self,
        currencies: &BTreeSet<Currency>,
    ) -> RateResult<HashMap<Currency, Decimal>> {
        if currencies.is_empty() {
            return Ok(HashMap::new());
        }

        // USD is the request base and never appears in the symbols list.
        let symbols: Vec<&str> = currencies
            .iter()
            .filter(|c| !c.is_usd())
            .map(|c| c.code())
            .collect();
        let url = format!(
            "{}/latest?base=USD&symbols={}",
            self.base_url,
            symbols.join(",")
        );
        debug!(url = %url, "Requesting USD-relative rates");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RateError::SourceUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::SourceUnavailable(format!(
                "upstream returned status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RateError::SourceUnavailable(format!("failed to read response body: {e}")))?;
        let parsed: RatesResponse = serde_json::from_str(&body)
            .map_err(|e| RateError::SourceUnavailable(format!("unparsable payload: {e}")))?;

        if !parsed.success {
            return Err(RateError::SourceUnavailable(
                "upstream reported success=false".to_string(),
            ));
        }

        let mut rates = HashMap::with_capacity(parsed.rates.len() + 1);
        for (code, rate) in parsed.rates {
            if rate <= Decimal::ZERO {
                return Err(RateError::SourceUnavailable(format!(
                    "non-positive rate {rate} for {code}"
                )));
            }
            rates.insert(Currency::new(code), rate);
        }
        rates.insert(Currency::usd(), Decimal::ONE);

        info!(
            requested = symbols.len(),
            received = rates.len(),
            "Fetched USD-relative rates"
        );
        Ok(rates)
    }
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    rates: parking_lot::Mutex<HashMap<Currency, Decimal>>,
    unavailable: std::sync::atomic::AtomicBool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a mock with no rates configured.
    pub fn new() -> Self {
        Self {
            rates: parking_lot::Mutex::new(HashMap::new()),
            unavailable: std::sync::atomic::AtomicBool::new(false),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the USD-relative rate returned for a currency.
    pub fn set_rate(&self, currency: Currency, rate: Decimal) {
        self.rates.lock().insert(currency, rate);
    }

    /// Make every fetch fail as a whole, or restore availability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of fetches attempted against this mock.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    async fn fetch_usd_rates(
        &self,
        _currencies: &BTreeSet<Currency>,
    ) -> RateResult<HashMap<Currency, Decimal>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RateError::SourceUnavailable("mock unavailable".to_string()));
        }
        Ok(self.rates.lock().clone())
    }
}
