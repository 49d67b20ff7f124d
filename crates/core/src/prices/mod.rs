//! Price lookup interface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::history::TimestampMs;

/// Price substituted when a lookup finds nothing.
pub const ZERO_PRICE: Decimal = Decimal::ZERO;

/// Price of one unit of `from_asset` in `to_asset` at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub from_asset: String,
    pub to_asset: String,
    pub timestamp: TimestampMs,
    pub price: Decimal,
    pub source: Option<String>,
}

/// Historical price lookup for an asset pair.
pub trait PriceServiceTrait: Send + Sync {
    /// Price of one unit of `from_asset` in `to_asset` at `timestamp`.
    /// `Ok(None)` means no price is known.
    fn get_price(
        &self,
        from_asset: &str,
        to_asset: &str,
        timestamp: TimestampMs,
    ) -> Result<Option<Decimal>>;
}
