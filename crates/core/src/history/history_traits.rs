//! Ledger repository trait.

use async_trait::async_trait;

use super::history_model::{
    AssetInfo, HistoryEvent, HistoryEventFilter, InterestBooking, NewHistoryEvent,
};
use crate::errors::Result;

/// Access to the event ledger.
///
/// Mutations made through `insert_events` and `delete_events` advance the
/// stale marker in the same transaction. The synthetic-event methods are
/// reserved for the balance processor and leave the marker alone.
#[async_trait]
pub trait HistoryEventRepositoryTrait: Send + Sync {
    /// Events matching `filter`, ordered by (timestamp, sequence_index, identifier).
    fn list_events(&self, filter: &HistoryEventFilter) -> Result<Vec<HistoryEvent>>;

    fn count_events(&self, filter: &HistoryEventFilter) -> Result<usize>;

    async fn insert_events(&self, events: Vec<NewHistoryEvent>) -> Result<Vec<i64>>;

    async fn delete_events(&self, identifiers: &[i64]) -> Result<usize>;

    async fn insert_synthetic_event(&self, event: NewHistoryEvent) -> Result<HistoryEvent>;

    /// Shifts every event of the group with `sequence_index >= from_index` up by one.
    /// Returns the number of shifted events.
    async fn resequence_group(&self, group_identifier: &str, from_index: i32) -> Result<usize>;

    /// Applies `booking` in one transaction: resequences the group, rewrites
    /// the withdrawal and inserts the interest event, or none of it.
    /// Returns the events to account for, in ledger order.
    async fn record_interest(&self, booking: InterestBooking) -> Result<Vec<HistoryEvent>>;

    async fn upsert_asset(&self, asset: AssetInfo) -> Result<()>;
}
