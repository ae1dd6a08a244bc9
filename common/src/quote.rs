//! Resolved exchange-rate quotes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CurrencyPair;

/// The latest resolved rate for a currency pair.
///
/// Exactly zero or one quote exists per pair; a new resolution replaces the
/// rate in place rather than keeping history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// The pair the rate applies to.
    pub pair: CurrencyPair,
    /// Units of the `to` currency per unit of the `from` currency.
    pub rate: Decimal,
    /// When the quote was first written.
    pub created_at: DateTime<Utc>,
    /// When the rate was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Create a freshly resolved quote.
    pub fn new(pair: CurrencyPair, rate: Decimal) -> Self {
        let now = Utc::now();
        Self {
            pair,
            rate,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the rate in place, keeping the original creation time.
    pub fn refresh(&mut self, rate: Decimal) {
        self.rate = rate;
        self.updated_at = Utc::now();
    }
}
