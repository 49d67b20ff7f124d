use serde::{Deserialize, Serialize};

use crate::history::TimestampMs;

/// Keys of the static cache. Every value is a millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticCacheKey {
    /// Earliest ledger timestamp whose balances may be wrong.
    StaleBalancesFromTs,
    /// Wall-clock time of the ledger mutation that set the marker.
    StaleBalancesModificationTs,
    /// Wall-clock time of the last completed processing run.
    LastHistoricalBalanceProcessingTs,
}

impl StaticCacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticCacheKey::StaleBalancesFromTs => "stale_balances_from_ts",
            StaticCacheKey::StaleBalancesModificationTs => "stale_balances_modification_ts",
            StaticCacheKey::LastHistoricalBalanceProcessingTs => {
                "last_historical_balance_processing_ts"
            }
        }
    }
}

/// Persisted stale marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleMarker {
    pub from_ts: TimestampMs,
    pub modification_ts: Option<TimestampMs>,
}
