use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::history::TimestampMs;

/// Balance of one asset summed over every matching bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    pub amount: Decimal,
    /// Price in the main currency, zero when unknown.
    pub price: Decimal,
    pub value: Decimal,
}

/// Point-in-time snapshot.
///
/// `balances` is `None` when nothing was found. `processing_required` tells
/// the caller that unprocessed events exist in the requested scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalBalances {
    pub processing_required: bool,
    pub balances: Option<Vec<AssetBalance>>,
}

/// Cumulative change of the requested assets inside a time range, keyed by
/// event timestamp and starting from zero at the range start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalAmounts {
    pub processing_required: bool,
    pub amounts: Option<BTreeMap<TimestampMs, Decimal>>,
}

/// End-of-day balances per asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBalance {
    /// Start of the UTC day.
    pub timestamp: TimestampMs,
    pub balances: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBalances {
    pub processing_required: bool,
    pub days: Option<Vec<DailyBalance>>,
}
