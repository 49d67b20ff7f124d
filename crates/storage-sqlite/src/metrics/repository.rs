use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::{parse_decimal, EventMetricDB, MetricTransitionDB, NewEventMetricDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::history::type_pairs_missing_metrics;
use crate::schema::event_metrics;
use crate::utils::placeholders;
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::history::{HistoryEventFilter, TimestampMs};
use ledgerfolio_core::portfolio::balances::{
    BalanceQuery, Bucket, BucketBalance, EventMetric, EventMetricsRepositoryTrait, MetricKey,
    MetricTransition, MetricsPurge,
};

/// Rows per multi-row INSERT statement.
const INSERT_CHUNK_SIZE: usize = 100;

const BUCKET_PARTITION: &str =
    "PARTITION BY location, IFNULL(location_label, ''), IFNULL(protocol, ''), asset";
const TRAIL_ORDER: &str = "ORDER BY timestamp, sequence_index, event_identifier";
const TRAIL_ORDER_DESC: &str =
    "ORDER BY timestamp DESC, sequence_index DESC, event_identifier DESC";
const METRIC_COLUMNS: &str = "id, event_identifier, location, location_label, protocol, asset, \
     metric_key, metric_value, timestamp, sequence_index";

pub struct EventMetricsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl EventMetricsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        EventMetricsRepository { pool, writer }
    }

    /// Latest balance row per bucket, restricted by `condition` (with `?` placeholders
    /// bound from `params` in order).
    fn latest_rows(&self, condition: &str, params: Vec<QueryParam>) -> Result<Vec<EventMetricDB>> {
        let mut conn = get_connection(&self.pool)?;

        let sql = format!(
            "WITH ranked AS ( \
                SELECT {columns}, \
                    ROW_NUMBER() OVER ({partition} {order}) AS rn \
                FROM event_metrics \
                WHERE metric_key = ? AND {condition} \
            ) \
            SELECT {columns} FROM ranked WHERE rn = 1 \
            ORDER BY location, location_label, protocol, asset",
            columns = METRIC_COLUMNS,
            partition = BUCKET_PARTITION,
            order = TRAIL_ORDER_DESC,
            condition = condition,
        );

        let mut query_builder = sql_query(sql)
            .into_boxed::<Sqlite>()
            .bind::<Text, _>(MetricKey::Balance.as_str());
        for param in params {
            query_builder = match param {
                QueryParam::Int(value) => query_builder.bind::<BigInt, _>(value),
                QueryParam::Str(value) => query_builder.bind::<Text, _>(value),
            };
        }

        Ok(query_builder
            .load::<EventMetricDB>(&mut conn)
            .map_err(StorageError::from)?)
    }
}

enum QueryParam {
    Int(i64),
    Str(String),
}

/// SQL condition and parameters for the bucket filters of a balance query.
fn balance_query_condition(query: &BalanceQuery) -> (String, Vec<QueryParam>) {
    let mut conditions = vec!["timestamp <= ?".to_string()];
    let mut params = vec![QueryParam::Int(query.timestamp)];

    if let Some(ref assets) = query.assets {
        conditions.push(format!("asset IN ({})", placeholders(assets.len())));
        params.extend(assets.iter().cloned().map(QueryParam::Str));
    }
    if let Some(ref location) = query.location {
        conditions.push("location = ?".to_string());
        params.push(QueryParam::Str(location.clone()));
    }
    if let Some(ref label) = query.location_label {
        conditions.push("location_label = ?".to_string());
        params.push(QueryParam::Str(label.clone()));
    }
    if let Some(ref protocol) = query.protocol {
        conditions.push("protocol = ?".to_string());
        params.push(QueryParam::Str(protocol.clone()));
    }
    (conditions.join(" AND "), params)
}

#[async_trait]
impl EventMetricsRepositoryTrait for EventMetricsRepository {
    fn load_latest_balances_before(&self, ts: TimestampMs) -> Result<HashMap<Bucket, Decimal>> {
        let rows = self.latest_rows("timestamp < ?", vec![QueryParam::Int(ts)])?;

        let mut balances = HashMap::with_capacity(rows.len());
        for row in rows {
            let value = parse_decimal(&row.metric_value)?;
            if !value.is_zero() {
                balances.insert(row.bucket(), value);
            }
        }
        Ok(balances)
    }

    async fn write_metrics_batch(
        &self,
        rows: Vec<EventMetric>,
        purge: Option<MetricsPurge>,
    ) -> Result<usize> {
        let rows: Vec<NewEventMetricDB> = rows.into_iter().map(NewEventMetricDB::from).collect();

        self.writer
            .exec(move |conn| {
                match purge {
                    Some(MetricsPurge::All) => {
                        let purged = diesel::delete(event_metrics::table)
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        debug!("Purged all {} metric rows", purged);
                    }
                    Some(MetricsPurge::FromTimestamp(ts)) => {
                        let purged = diesel::delete(
                            event_metrics::table.filter(event_metrics::timestamp.ge(ts)),
                        )
                        .execute(conn)
                        .map_err(StorageError::from)?;
                        debug!("Purged {} metric rows from {}", purged, ts);
                    }
                    None => {}
                }

                let mut written = 0;
                for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
                    written += diesel::replace_into(event_metrics::table)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(written)
            })
            .await
    }

    fn get_latest_bucket_balances(&self, query: &BalanceQuery) -> Result<Vec<BucketBalance>> {
        if query.assets.as_ref().is_some_and(|assets| assets.is_empty()) {
            return Ok(Vec::new());
        }
        let (condition, params) = balance_query_condition(query);

        self.latest_rows(&condition, params)?
            .into_iter()
            .map(|row| {
                Ok(BucketBalance {
                    bucket: row.bucket(),
                    balance: parse_decimal(&row.metric_value)?,
                    timestamp: row.timestamp,
                })
            })
            .collect()
    }

    fn get_metric_transitions(
        &self,
        assets: Option<&[String]>,
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<Vec<MetricTransition>> {
        if assets.is_some_and(|a| a.is_empty()) {
            return Ok(Vec::new());
        }
        let mut conn = get_connection(&self.pool)?;

        let asset_condition = match assets {
            Some(assets) => format!("AND asset IN ({})", placeholders(assets.len())),
            None => String::new(),
        };
        // The window runs over the whole trail so that the predecessor of the
        // first row in range is found even when it lies before `from`.
        let sql = format!(
            "WITH trail AS ( \
                SELECT event_identifier, location, location_label, protocol, asset, \
                    metric_value, timestamp, sequence_index, \
                    LAG(metric_value) OVER ({partition} {order}) AS previous_value \
                FROM event_metrics \
                WHERE metric_key = ? {asset_condition} \
            ) \
            SELECT * FROM trail \
            WHERE timestamp >= ? AND timestamp <= ? \
            {order}",
            partition = BUCKET_PARTITION,
            order = TRAIL_ORDER,
            asset_condition = asset_condition,
        );

        let mut query_builder = sql_query(sql)
            .into_boxed::<Sqlite>()
            .bind::<Text, _>(MetricKey::Balance.as_str());
        for asset in assets.unwrap_or_default() {
            query_builder = query_builder.bind::<Text, _>(asset.clone());
        }
        query_builder = query_builder.bind::<BigInt, _>(from).bind::<BigInt, _>(to);

        query_builder
            .load::<MetricTransitionDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| Ok(row.into_domain()?))
            .collect()
    }

    fn has_events_missing_metrics(&self, filter: &HistoryEventFilter) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        Ok(!type_pairs_missing_metrics(&mut conn, filter)?.is_empty())
    }

    fn list_metrics(&self) -> Result<Vec<EventMetric>> {
        let mut conn = get_connection(&self.pool)?;
        event_metrics::table
            .select(EventMetricDB::as_select())
            .order((
                event_metrics::timestamp.asc(),
                event_metrics::sequence_index.asc(),
                event_metrics::event_identifier.asc(),
                event_metrics::id.asc(),
            ))
            .load::<EventMetricDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| Ok(row.into_domain()?))
            .collect()
    }
}
