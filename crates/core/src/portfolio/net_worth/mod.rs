//! Net worth calculation module.
//!
//! Replays the ledger per asset across all locations and values the daily
//! balances in the main currency.

mod net_worth_model;
mod net_worth_service;
mod net_worth_traits;

pub use net_worth_model::*;
pub use net_worth_service::*;
pub use net_worth_traits::*;

#[cfg(test)]
mod net_worth_service_tests;
