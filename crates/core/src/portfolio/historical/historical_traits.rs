use crate::errors::Result;
use crate::history::{HistoryEventFilter, TimestampMs};
use crate::portfolio::balances::BalanceQuery;

use super::historical_model::{DailyBalances, HistoricalAmounts, HistoricalBalances};

/// Read-only queries over the metric trail. None of them triggers processing.
pub trait HistoricalBalancesServiceTrait: Send + Sync {
    /// Balances per asset at `query.timestamp`, valued in the main currency.
    fn get_balances(&self, query: &BalanceQuery) -> Result<HistoricalBalances>;

    /// Cumulative balance change of `assets` within `[from, to]`.
    fn get_asset_amounts(
        &self,
        assets: &[String],
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<HistoricalAmounts>;

    /// End-of-day balances within `[from, to]`, carried forward over days
    /// without activity.
    fn get_daily_balances(
        &self,
        assets: Option<&[String]>,
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<DailyBalances>;

    /// Whether events matching `filter` still lack metric rows.
    fn processing_required(&self, filter: &HistoryEventFilter) -> Result<bool>;
}
