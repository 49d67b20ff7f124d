//! Database models for ledger events and assets.

use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::StorageError;
use crate::utils::decimal_to_db;
use ledgerfolio_core::history::{AssetInfo, HistoryEvent, NewHistoryEvent};

/// Database model for a stored ledger event
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::history_events)]
#[diesel(primary_key(identifier))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct HistoryEventDB {
    pub identifier: i64,
    pub entry_type: String,
    pub group_identifier: String,
    pub sequence_index: i32,
    pub timestamp: i64,
    pub location: String,
    pub location_label: Option<String>,
    pub asset: String,
    pub amount: String,
    pub event_type: String,
    pub event_subtype: String,
    pub notes: Option<String>,
    pub counterparty: Option<String>,
    pub address: Option<String>,
    pub is_virtual: bool,
}

/// Database model for inserting a ledger event. The identifier is assigned by SQLite.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::history_events)]
pub struct NewHistoryEventDB {
    pub entry_type: String,
    pub group_identifier: String,
    pub sequence_index: i32,
    pub timestamp: i64,
    pub location: String,
    pub location_label: Option<String>,
    pub asset: String,
    pub amount: String,
    pub event_type: String,
    pub event_subtype: String,
    pub notes: Option<String>,
    pub counterparty: Option<String>,
    pub address: Option<String>,
    pub is_virtual: bool,
}

impl From<NewHistoryEvent> for NewHistoryEventDB {
    fn from(event: NewHistoryEvent) -> Self {
        Self {
            entry_type: event.entry_type.as_str().to_string(),
            group_identifier: event.group_identifier,
            sequence_index: event.sequence_index,
            timestamp: event.timestamp,
            location: event.location,
            location_label: event.location_label,
            asset: event.asset,
            amount: decimal_to_db(event.amount),
            event_type: event.event_type.as_str().to_string(),
            event_subtype: event.event_subtype.as_str().to_string(),
            notes: event.notes,
            counterparty: event.counterparty,
            address: event.address,
            is_virtual: event.is_virtual,
        }
    }
}

impl HistoryEventDB {
    /// Converts to the domain model. Unknown type strings or a malformed
    /// amount are decode errors, never silently dropped.
    pub fn into_domain(
        self,
        asset_protocol: Option<String>,
    ) -> Result<HistoryEvent, StorageError> {
        let decode = |field: &str, e: String| {
            StorageError::DecodeError(format!("event {} {}: {}", self.identifier, field, e))
        };
        let entry_type = self
            .entry_type
            .parse()
            .map_err(|e| decode("entry_type", e))?;
        let event_type = self
            .event_type
            .parse()
            .map_err(|e| decode("event_type", e))?;
        let event_subtype = self
            .event_subtype
            .parse()
            .map_err(|e| decode("event_subtype", e))?;
        let amount = Decimal::from_str(&self.amount)
            .map_err(|e| decode("amount", e.to_string()))?;

        Ok(HistoryEvent {
            identifier: self.identifier,
            entry_type,
            group_identifier: self.group_identifier,
            sequence_index: self.sequence_index,
            timestamp: self.timestamp,
            location: self.location,
            location_label: self.location_label,
            asset: self.asset,
            asset_protocol,
            amount,
            event_type,
            event_subtype,
            notes: self.notes,
            counterparty: self.counterparty,
            address: self.address,
            is_virtual: self.is_virtual,
        })
    }
}

/// Database model for the asset registry
#[derive(Queryable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::assets)]
#[serde(rename_all = "camelCase")]
pub struct AssetDB {
    pub identifier: String,
    pub name: Option<String>,
    pub protocol: Option<String>,
}

impl From<AssetInfo> for AssetDB {
    fn from(asset: AssetInfo) -> Self {
        Self {
            identifier: asset.identifier,
            name: asset.name,
            protocol: asset.protocol,
        }
    }
}
