//! Database models for metric rows.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;
use crate::utils::decimal_to_db;
use ledgerfolio_core::portfolio::balances::{Bucket, EventMetric, MetricTransition};

/// Database model for a stored metric row
#[derive(Queryable, QueryableByName, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::event_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventMetricDB {
    pub id: i64,
    pub event_identifier: Option<i64>,
    pub location: String,
    pub location_label: Option<String>,
    pub protocol: Option<String>,
    pub asset: String,
    pub metric_key: String,
    pub metric_value: String,
    pub timestamp: i64,
    pub sequence_index: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::event_metrics)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewEventMetricDB {
    pub event_identifier: Option<i64>,
    pub location: String,
    pub location_label: Option<String>,
    pub protocol: Option<String>,
    pub asset: String,
    pub metric_key: String,
    pub metric_value: String,
    pub timestamp: i64,
    pub sequence_index: i32,
}

impl From<EventMetric> for NewEventMetricDB {
    fn from(metric: EventMetric) -> Self {
        Self {
            event_identifier: metric.event_identifier,
            location: metric.bucket.location,
            location_label: metric.bucket.location_label,
            protocol: metric.bucket.protocol,
            asset: metric.bucket.asset,
            metric_key: metric.metric_key.as_str().to_string(),
            metric_value: decimal_to_db(metric.value),
            timestamp: metric.timestamp,
            sequence_index: metric.sequence_index,
        }
    }
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value)
        .map_err(|e| StorageError::DecodeError(format!("metric value '{}': {}", value, e)))
}

impl EventMetricDB {
    pub fn bucket(&self) -> Bucket {
        Bucket::new(
            self.location.clone(),
            self.location_label.clone(),
            self.protocol.clone(),
            self.asset.clone(),
        )
    }

    pub fn into_domain(self) -> Result<EventMetric, StorageError> {
        let metric_key = self
            .metric_key
            .parse()
            .map_err(StorageError::DecodeError)?;
        Ok(EventMetric {
            bucket: self.bucket(),
            event_identifier: self.event_identifier,
            metric_key,
            value: parse_decimal(&self.metric_value)?,
            timestamp: self.timestamp,
            sequence_index: self.sequence_index,
        })
    }
}

/// Metric row joined with the value of the preceding row of its bucket
#[derive(QueryableByName, Debug)]
pub(crate) struct MetricTransitionDB {
    #[diesel(sql_type = Nullable<BigInt>)]
    pub event_identifier: Option<i64>,
    #[diesel(sql_type = Text)]
    pub location: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub location_label: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub protocol: Option<String>,
    #[diesel(sql_type = Text)]
    pub asset: String,
    #[diesel(sql_type = Text)]
    pub metric_value: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub previous_value: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub timestamp: i64,
    #[diesel(sql_type = Integer)]
    pub sequence_index: i32,
}

impl MetricTransitionDB {
    pub fn into_domain(self) -> Result<MetricTransition, StorageError> {
        let previous_balance = match self.previous_value.as_deref() {
            Some(value) => parse_decimal(value)?,
            None => Decimal::ZERO,
        };
        Ok(MetricTransition {
            bucket: Bucket::new(self.location, self.location_label, self.protocol, self.asset),
            event_identifier: self.event_identifier,
            timestamp: self.timestamp,
            sequence_index: self.sequence_index,
            balance: parse_decimal(&self.metric_value)?,
            previous_balance,
        })
    }
}
