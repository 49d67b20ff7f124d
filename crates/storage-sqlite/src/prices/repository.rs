use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use super::model::PriceHistoryDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::price_history;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::history::TimestampMs;
use ledgerfolio_core::prices::{PricePoint, PriceServiceTrait};

/// Price lookup backed by the `price_history` table.
///
/// A pair resolves to the latest price at or before the requested time. When
/// only the reverse pair is stored its inverse is used.
pub struct PriceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PriceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PriceRepository { pool, writer }
    }

    /// Inserts or replaces prices keyed by (from_asset, to_asset, timestamp).
    pub async fn upsert_prices(&self, points: Vec<PricePoint>) -> Result<usize> {
        let rows: Vec<PriceHistoryDB> = points.into_iter().map(PriceHistoryDB::from).collect();

        self.writer
            .exec(move |conn| {
                let mut written = 0;
                for row in &rows {
                    written += diesel::replace_into(price_history::table)
                        .values(row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                debug!("Stored {} prices", written);
                Ok(written)
            })
            .await
    }
}

fn latest_price(
    conn: &mut SqliteConnection,
    from_asset: &str,
    to_asset: &str,
    timestamp: TimestampMs,
) -> Result<Option<Decimal>> {
    let stored = price_history::table
        .filter(price_history::from_asset.eq(from_asset))
        .filter(price_history::to_asset.eq(to_asset))
        .filter(price_history::timestamp.le(timestamp))
        .order(price_history::timestamp.desc())
        .select(price_history::price)
        .first::<String>(conn)
        .optional()
        .map_err(StorageError::from)?;

    stored
        .map(|price| {
            Decimal::from_str(&price).map_err(|e| {
                StorageError::DecodeError(format!(
                    "price {}/{} '{}': {}",
                    from_asset, to_asset, price, e
                ))
                .into()
            })
        })
        .transpose()
}

impl PriceServiceTrait for PriceRepository {
    fn get_price(
        &self,
        from_asset: &str,
        to_asset: &str,
        timestamp: TimestampMs,
    ) -> Result<Option<Decimal>> {
        if from_asset == to_asset {
            return Ok(Some(Decimal::ONE));
        }
        let mut conn = get_connection(&self.pool)?;

        if let Some(price) = latest_price(&mut conn, from_asset, to_asset, timestamp)? {
            return Ok(Some(price));
        }
        Ok(latest_price(&mut conn, to_asset, from_asset, timestamp)?
            .filter(|price| !price.is_zero())
            .map(|price| Decimal::ONE / price))
    }
}
