//! RateQuote Rates
//!
//! USD-relative rate tables, cross-rate arithmetic, and the external rate
//! source that feeds them. A rate table is built once per processing cycle
//! from a single batch fetch and discarded afterwards.

pub mod error;
pub mod source;
pub mod table;

pub use error::{RateError, RateResult};
pub use source::{FxRatesApiSource, RateSource};
pub use table::RateTable;

#[cfg(any(test, feature = "test-utils"))]
pub use source::MockRateSource;
