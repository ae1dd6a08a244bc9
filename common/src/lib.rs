//! RateQuote Common Types
//!
//! Shared types used across the RateQuote service: currency codes and pairs,
//! quote request records with their lifecycle status, and resolved quotes.

pub mod currency;
pub mod quote;
pub mod request;

pub use currency::*;
pub use quote::*;
pub use request::*;
