use diesel::prelude::*;

use crate::utils::decimal_to_db;
use ledgerfolio_core::prices::PricePoint;

/// Database model for one stored price
#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::price_history)]
pub struct PriceHistoryDB {
    pub from_asset: String,
    pub to_asset: String,
    pub timestamp: i64,
    pub price: String,
    pub source: Option<String>,
}

impl From<PricePoint> for PriceHistoryDB {
    fn from(point: PricePoint) -> Self {
        Self {
            from_asset: point.from_asset,
            to_asset: point.to_asset,
            timestamp: point.timestamp,
            price: decimal_to_db(point.price),
            source: point.source,
        }
    }
}
