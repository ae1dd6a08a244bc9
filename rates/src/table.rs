//! USD-relative rate tables and cross-rate arithmetic.

use std::collections::HashMap;

use ratequote_common::{Currency, CurrencyPair};
use rust_decimal::Decimal;

use crate::error::{RateError, RateResult};

/// Ephemeral table of USD-relative rates, built once per processing cycle.
///
/// Every entry expresses how many units of the currency one US dollar buys.
/// USD itself is always present with rate 1, even when the upstream source
/// omits it.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<Currency, Decimal>,
}

impl RateTable {
    /// Build a table from upstream USD-relative rates, pinning USD to
    /// exactly 1.
    pub fn from_usd_rates(rates: HashMap<Currency, Decimal>) -> Self {
        let mut rates = rates;
        rates.insert(Currency::usd(), Decimal::ONE);
        Self { rates }
    }

    /// Look up the USD-relative rate for a currency.
    pub fn get(&self, currency: &Currency) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    /// Number of currencies in the table.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check if the table holds no rates at all.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Derive the rate for an arbitrary pair by crossing through USD.
    ///
    /// Fails with [`RateError::UnknownCurrency`] when either side of the
    /// pair is missing from the table; a missing rate is never substituted
    /// with a default.
    pub fn cross_rate(&self, pair: &CurrencyPair) -> RateResult<Decimal> {
        let from_rate = self
            .get(&pair.from)
            .ok_or_else(|| RateError::UnknownCurrency(pair.from.clone()))?;
        let to_rate = self
            .get(&pair.to)
            .ok_or_else(|| RateError::UnknownCurrency(pair.to.clone()))?;

        if pair.from == pair.to {
            return Ok(Decimal::ONE);
        }

        let rate = if pair.from.is_usd() {
            to_rate
        } else if pair.to.is_usd() {
            Decimal::ONE / from_rate
        } else {
            to_rate / from_rate
        };

        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sample_table() -> RateTable {
        let mut rates = HashMap::new();
        rates.insert(Currency::eur(), dec!(0.85));
        rates.insert(Currency::mxn(), dec!(18.5));
        RateTable::from_usd_rates(rates)
    }

    fn pair(from: &str, to: &str) -> CurrencyPair {
        CurrencyPair::new(Currency::new(from), Currency::new(to))
    }

    #[test]
    fn test_usd_is_pinned_to_one() {
        let mut rates = HashMap::new();
        rates.insert(Currency::usd(), dec!(1.0001));
        rates.insert(Currency::eur(), dec!(0.85));
        let table = RateTable::from_usd_rates(rates);

        assert_eq!(table.get(&Currency::usd()), Some(Decimal::ONE));
    }

    #[test]
    fn test_usd_present_even_when_source_omits_it() {
        let table = RateTable::from_usd_rates(HashMap::new());
        assert_eq!(table.get(&Currency::usd()), Some(Decimal::ONE));
    }

    #[test]
    fn test_identity_pairs() {
        let table = sample_table();
        for code in ["USD", "EUR", "MXN"] {
            assert_eq!(table.cross_rate(&pair(code, code)).unwrap(), Decimal::ONE);
        }
    }

    #[test]
    fn test_usd_edges() {
        let table = sample_table();
        assert_eq!(table.cross_rate(&pair("USD", "EUR")).unwrap(), dec!(0.85));
        assert_eq!(table.cross_rate(&pair("USD", "MXN")).unwrap(), dec!(18.5));
        assert_eq!(
            table.cross_rate(&pair("EUR", "USD")).unwrap().round_dp(6),
            dec!(1.176471)
        );
        assert_eq!(
            table.cross_rate(&pair("MXN", "USD")).unwrap().round_dp(6),
            dec!(0.054054)
        );
    }

    #[test]
    fn test_cross_rate_through_usd() {
        let table = sample_table();
        // 18.5 / 0.85
        assert_eq!(
            table.cross_rate(&pair("EUR", "MXN")).unwrap().round_dp(4),
            dec!(21.7647)
        );
        assert_eq!(
            table.cross_rate(&pair("MXN", "EUR")).unwrap().round_dp(6),
            dec!(0.045946)
        );
    }

    #[test]
    fn test_unknown_currency() {
        let table = sample_table();
        assert!(matches!(
            table.cross_rate(&pair("CAD", "USD")),
            Err(RateError::UnknownCurrency(c)) if c.code() == "CAD"
        ));
        assert!(matches!(
            table.cross_rate(&pair("USD", "CAD")),
            Err(RateError::UnknownCurrency(c)) if c.code() == "CAD"
        ));
        assert!(matches!(
            table.cross_rate(&pair("CAD", "AUD")),
            Err(RateError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_empty_table_knows_only_usd() {
        let table = RateTable::from_usd_rates(HashMap::new());
        assert_eq!(table.cross_rate(&pair("USD", "USD")).unwrap(), Decimal::ONE);
        assert!(matches!(
            table.cross_rate(&pair("USD", "EUR")),
            Err(RateError::UnknownCurrency(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_usd_edges_match_table(ra in 1i64..5_000_000, rb in 1i64..5_000_000) {
            let ra = Decimal::new(ra, 4);
            let rb = Decimal::new(rb, 4);
            let mut rates = HashMap::new();
            rates.insert(Currency::new("AAA"), ra);
            rates.insert(Currency::new("BBB"), rb);
            let table = RateTable::from_usd_rates(rates);

            prop_assert_eq!(table.cross_rate(&pair("USD", "BBB")).unwrap(), rb);
            prop_assert_eq!(table.cross_rate(&pair("AAA", "USD")).unwrap(), Decimal::ONE / ra);
            prop_assert_eq!(table.cross_rate(&pair("AAA", "BBB")).unwrap(), rb / ra);
        }

        #[test]
        fn prop_round_trip_is_close_to_one(ra in 1i64..5_000_000, rb in 1i64..5_000_000) {
            let ra = Decimal::new(ra, 4);
            let rb = Decimal::new(rb, 4);
            let mut rates = HashMap::new();
            rates.insert(Currency::new("AAA"), ra);
            rates.insert(Currency::new("BBB"), rb);
            let table = RateTable::from_usd_rates(rates);

            let forward = table.cross_rate(&pair("AAA", "BBB")).unwrap();
            let backward = table.cross_rate(&pair("BBB", "AAA")).unwrap();
            let drift = (forward * backward - Decimal::ONE).abs();
            prop_assert!(drift < dec!(0.000000000001));
        }
    }
}
