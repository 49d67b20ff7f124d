use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::balances_model::{
    BalanceQuery, BucketBalance, EventMetric, MetricTransition, MetricsPurge,
};
use super::bucket::Bucket;
use crate::errors::Result;
use crate::history::{HistoryEventFilter, TimestampMs};

/// Read/write access to the per-event metric trail.
///
/// Rows are ordered per bucket by (timestamp, sequence_index, event_identifier).
#[async_trait]
pub trait EventMetricsRepositoryTrait: Send + Sync {
    /// Latest balance per bucket among rows with timestamp strictly before `ts`.
    /// Zero balances are omitted.
    fn load_latest_balances_before(&self, ts: TimestampMs) -> Result<HashMap<Bucket, Decimal>>;

    /// Applies `purge` and inserts `rows` (insert-or-replace) in one transaction.
    /// Returns the number of rows written.
    async fn write_metrics_batch(
        &self,
        rows: Vec<EventMetric>,
        purge: Option<MetricsPurge>,
    ) -> Result<usize>;

    /// Latest row per bucket at or before `query.timestamp`, restricted to matching buckets.
    fn get_latest_bucket_balances(&self, query: &BalanceQuery) -> Result<Vec<BucketBalance>>;

    /// Rows with timestamp in `[from, to]` and the preceding row value of their bucket.
    /// The predecessor may lie before `from`.
    fn get_metric_transitions(
        &self,
        assets: Option<&[String]>,
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<Vec<MetricTransition>>;

    /// Whether any event matching `filter` has no metric row.
    fn has_events_missing_metrics(&self, filter: &HistoryEventFilter) -> Result<bool>;

    fn list_metrics(&self) -> Result<Vec<EventMetric>>;
}
