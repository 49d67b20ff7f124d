//! Net worth domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::TimestampMs;

/// Portfolio value at the end of one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthPoint {
    /// Start of the UTC day.
    pub timestamp: TimestampMs,
    pub value: Decimal,
}

/// Asset that could not be valued on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPrice {
    pub asset: String,
    pub timestamp: TimestampMs,
}

/// Event that would have driven an asset balance below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeBalanceEvent {
    pub identifier: i64,
    pub group_identifier: String,
}

/// Daily net worth series.
///
/// When `negative_balance` is set, `points` only covers the days completed
/// before the offending event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSeries {
    pub points: Vec<NetWorthPoint>,
    pub missing_prices: Vec<MissingPrice>,
    pub negative_balance: Option<NegativeBalanceEvent>,
}
