//! Net worth service traits.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::net_worth_model::NetWorthSeries;
use crate::errors::Result;
use crate::history::TimestampMs;

/// Trait defining the contract for net worth service operations.
pub trait NetWorthServiceTrait: Send + Sync {
    /// Daily net worth between `from` and `to` (inclusive, UTC days).
    ///
    /// Days without any non-zero balance are left out. Missing prices are
    /// collected instead of failing the calculation.
    fn get_net_worth(&self, from: TimestampMs, to: TimestampMs) -> Result<NetWorthSeries>;

    /// Current amounts of `assets` held by `address`, replayed from the
    /// events labelled with it. Only positive balances are returned.
    fn get_address_balances(
        &self,
        address: &str,
        assets: &[String],
    ) -> Result<BTreeMap<String, Decimal>>;
}
