use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::TimestampMs;
use crate::portfolio::balances::Bucket;

/// Subtype of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSubtype {
    HistoricalBalanceProcessing,
}

/// Message delivered to the user-facing notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    ProgressUpdate {
        subtype: ProgressSubtype,
        total: usize,
        processed: usize,
    },
    #[serde(rename_all = "camelCase")]
    NegativeBalanceDetected {
        event_identifier: i64,
        group_identifier: String,
        asset: String,
        bucket: Bucket,
        balance_before: Decimal,
        last_run_ts: Option<TimestampMs>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ProgressUpdate { .. } => "progress_update",
            Notification::NegativeBalanceDetected { .. } => "negative_balance_detected",
        }
    }
}
