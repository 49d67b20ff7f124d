//! Metric trail and processing run models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::bucket::Bucket;
use crate::constants::{METRICS_BATCH_SIZE, PROGRESS_STEPS};
use crate::history::TimestampMs;

/// Key of a derived per-event metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Balance,
}

impl MetricKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Balance => "balance",
        }
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "balance" => Ok(MetricKey::Balance),
            _ => Err(format!("Unknown metric key: {}", s)),
        }
    }
}

/// One row of the metric trail: the balance of `bucket` right after the event
/// `event_identifier` was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetric {
    pub event_identifier: Option<i64>,
    pub bucket: Bucket,
    pub metric_key: MetricKey,
    pub value: Decimal,
    pub timestamp: TimestampMs,
    pub sequence_index: i32,
}

impl EventMetric {
    pub fn sort_key(&self) -> (TimestampMs, i32, i64) {
        (
            self.timestamp,
            self.sequence_index,
            self.event_identifier.unwrap_or(i64::MIN),
        )
    }
}

/// Metric rows superseded by a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsPurge {
    All,
    /// Rows whose event timestamp is at or after the given time.
    FromTimestamp(TimestampMs),
}

/// Latest known balance of a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketBalance {
    pub bucket: Bucket,
    pub balance: Decimal,
    pub timestamp: TimestampMs,
}

/// A metric row together with the value of the preceding row of the same bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTransition {
    pub bucket: Bucket,
    pub event_identifier: Option<i64>,
    pub timestamp: TimestampMs,
    pub sequence_index: i32,
    pub balance: Decimal,
    /// Zero when the row is the first of its bucket.
    pub previous_balance: Decimal,
}

impl MetricTransition {
    pub fn delta(&self) -> Decimal {
        self.balance - self.previous_balance
    }

    pub fn sort_key(&self) -> (TimestampMs, i32, i64) {
        (
            self.timestamp,
            self.sequence_index,
            self.event_identifier.unwrap_or(i64::MIN),
        )
    }
}

/// Point-in-time balance query. Every filter is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceQuery {
    pub timestamp: TimestampMs,
    /// One asset or a collection of equivalent assets.
    pub assets: Option<Vec<String>>,
    pub location: Option<String>,
    pub location_label: Option<String>,
    pub protocol: Option<String>,
}

impl BalanceQuery {
    pub fn at(timestamp: TimestampMs) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_location_label(mut self, label: impl Into<String>) -> Self {
        self.location_label = Some(label.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn matches(&self, bucket: &Bucket) -> bool {
        self.assets
            .as_ref()
            .map_or(true, |assets| assets.contains(&bucket.asset))
            && self
                .location
                .as_ref()
                .map_or(true, |l| &bucket.location == l)
            && self
                .location_label
                .as_ref()
                .map_or(true, |l| bucket.location_label.as_ref() == Some(l))
            && self
                .protocol
                .as_ref()
                .map_or(true, |p| bucket.protocol.as_ref() == Some(p))
    }
}

/// Stage of the processor. A run goes through every stage in order and
/// returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Idle,
    Loading,
    Accumulating,
    Flushing,
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceProcessingConfig {
    pub metrics_batch_size: usize,
    pub progress_steps: usize,
}

impl Default for BalanceProcessingConfig {
    fn default() -> Self {
        Self {
            metrics_batch_size: METRICS_BATCH_SIZE,
            progress_steps: PROGRESS_STEPS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    NotStale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub from_ts: Option<TimestampMs>,
    pub started_at: TimestampMs,
    pub events_processed: usize,
    pub metrics_written: usize,
    pub interest_events_created: usize,
    pub negative_balances_detected: usize,
    pub stale_marker_cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Skipped(SkipReason),
    Completed(ProcessingSummary),
}
