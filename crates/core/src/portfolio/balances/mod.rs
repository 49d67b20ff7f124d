//! Per-bucket balance tracking over the event ledger.
//!
//! Events are mapped onto buckets (`bucket`), accumulated by the
//! `HistoricalBalanceProcessor` and persisted as a metric trail that the
//! historical queries read from.

mod balances_model;
mod balances_traits;
mod bucket;
mod processor;

pub use balances_model::*;
pub use balances_traits::*;
pub use bucket::*;
pub use processor::*;
