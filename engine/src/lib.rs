//! RateQuote Engine
//!
//! The quote-request lifecycle engine and the scheduler loop that drives it.
//! Each cycle discovers pending requests, fetches USD-relative rates once,
//! and resolves every requested pair against that table.

pub mod cycle;
pub mod scheduler;

pub use cycle::{CycleOutcome, LifecycleEngine};
pub use scheduler::{Scheduler, SchedulerState};
