//! Ledgerfolio Core - historical balance tracking over an event ledger.
//!
//! This crate maps ledger events onto balance buckets, accumulates them into
//! a per-event metric trail and answers point-in-time, time-series and net
//! worth queries from it. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod cache;
pub mod constants;
pub mod errors;
pub mod history;
pub mod notifications;
pub mod portfolio;
pub mod prices;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export common types from the portfolio module
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
