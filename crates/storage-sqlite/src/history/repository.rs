use async_trait::async_trait;
use diesel::dsl::{min, sql};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Bool, Integer, Text};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::{AssetDB, HistoryEventDB, NewHistoryEventDB};
use crate::cache::mark_stale_in;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{assets, history_events, ignored_assets};
use crate::utils::{chunk_for_sqlite, decimal_to_db};
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::history::{
    AssetInfo, HistoryEvent, HistoryEventFilter, HistoryEventRepositoryTrait,
    HistoryEventSubType, HistoryEventType, InterestBooking, NewHistoryEvent,
};
use ledgerfolio_core::utils::time_utils::now_ms;

pub struct HistoryEventRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HistoryEventRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        HistoryEventRepository { pool, writer }
    }
}

/// Applies every SQL-expressible part of `filter` to a ledger query.
/// `exclude_type_pairs` has to be checked by the caller.
fn apply_filter<'a, ST>(
    mut query: history_events::BoxedQuery<'a, Sqlite, ST>,
    filter: &HistoryEventFilter,
) -> history_events::BoxedQuery<'a, Sqlite, ST> {
    if let Some(from_ts) = filter.from_ts {
        query = query.filter(history_events::timestamp.ge(from_ts));
    }
    if let Some(to_ts) = filter.to_ts {
        query = query.filter(history_events::timestamp.le(to_ts));
    }
    if let Some(ref asset_ids) = filter.assets {
        query = query.filter(history_events::asset.eq_any(asset_ids.clone()));
    }
    if let Some(ref location) = filter.location {
        query = query.filter(history_events::location.eq(location.clone()));
    }
    if let Some(ref labels) = filter.location_labels {
        query = query.filter(history_events::location_label.eq_any(labels.clone()));
    }
    if let Some(ref groups) = filter.group_identifiers {
        query = query.filter(history_events::group_identifier.eq_any(groups.clone()));
    }
    if !filter.exclude_subtypes.is_empty() {
        let subtypes: Vec<&'static str> =
            filter.exclude_subtypes.iter().map(|s| s.as_str()).collect();
        query = query.filter(history_events::event_subtype.ne_all(subtypes));
    }
    if filter.exclude_ignored_assets {
        query = query.filter(
            history_events::asset.ne_all(ignored_assets::table.select(ignored_assets::asset)),
        );
    }
    query
}

/// Events matching `filter` in ledger order, with their asset protocol resolved.
pub(crate) fn filtered_events(
    conn: &mut SqliteConnection,
    filter: &HistoryEventFilter,
) -> Result<Vec<HistoryEvent>> {
    let rows: Vec<HistoryEventDB> = apply_filter(history_events::table.into_boxed(), filter)
        .order((
            history_events::timestamp.asc(),
            history_events::sequence_index.asc(),
            history_events::identifier.asc(),
        ))
        .load::<HistoryEventDB>(conn)
        .map_err(StorageError::from)?;

    let rows: Vec<HistoryEventDB> = rows
        .into_iter()
        .filter(|row| {
            filter.exclude_type_pairs.is_empty()
                || !filter
                    .exclude_type_pairs
                    .iter()
                    .any(|(t, s)| {
                        t.as_str() == row.event_type.as_str()
                            && s.as_str() == row.event_subtype.as_str()
                    })
        })
        .collect();

    let mut asset_ids: Vec<String> = rows.iter().map(|row| row.asset.clone()).collect();
    asset_ids.sort();
    asset_ids.dedup();
    let protocols = load_asset_protocols(conn, &asset_ids)?;

    rows.into_iter()
        .map(|row| {
            let protocol = protocols.get(&row.asset).cloned();
            Ok(row.into_domain(protocol)?)
        })
        .collect()
}

fn load_asset_protocols(
    conn: &mut SqliteConnection,
    asset_ids: &[String],
) -> Result<HashMap<String, String>> {
    let mut protocols = HashMap::new();
    for chunk in chunk_for_sqlite(asset_ids) {
        let rows = assets::table
            .filter(assets::identifier.eq_any(chunk))
            .filter(assets::protocol.is_not_null())
            .select((assets::identifier, assets::protocol))
            .load::<(String, Option<String>)>(conn)
            .map_err(StorageError::from)?;
        protocols.extend(
            rows.into_iter()
                .filter_map(|(identifier, protocol)| protocol.map(|p| (identifier, p))),
        );
    }
    Ok(protocols)
}

/// Event types present among events matching `filter` that have no metric row.
pub(crate) fn type_pairs_missing_metrics(
    conn: &mut SqliteConnection,
    filter: &HistoryEventFilter,
) -> Result<Vec<(String, String)>> {
    let query = history_events::table
        .select((history_events::event_type, history_events::event_subtype))
        .distinct()
        .into_boxed();
    let pairs = apply_filter(query, filter)
        .filter(sql::<Bool>(
            "NOT EXISTS (SELECT 1 FROM event_metrics m \
             WHERE m.event_identifier = history_events.identifier)",
        ))
        .load::<(String, String)>(conn)
        .map_err(StorageError::from)?;

    Ok(pairs
        .into_iter()
        .filter(|(event_type, event_subtype)| {
            !filter
                .exclude_type_pairs
                .iter()
                .any(|(t, s)| {
                    t.as_str() == event_type.as_str() && s.as_str() == event_subtype.as_str()
                })
        })
        .collect())
}

fn load_event(conn: &mut SqliteConnection, row: HistoryEventDB) -> Result<HistoryEvent> {
    let protocol = load_asset_protocols(conn, std::slice::from_ref(&row.asset))?
        .remove(&row.asset);
    Ok(row.into_domain(protocol)?)
}

fn insert_synthetic_in(conn: &mut SqliteConnection, event: NewHistoryEvent) -> Result<HistoryEvent> {
    let row = diesel::insert_into(history_events::table)
        .values(&NewHistoryEventDB::from(event))
        .returning(HistoryEventDB::as_returning())
        .get_result::<HistoryEventDB>(conn)
        .map_err(StorageError::from)?;
    load_event(conn, row)
}

/// Shifts group events at or after `from_index` up by one.
fn resequence_group_in(
    conn: &mut SqliteConnection,
    group_identifier: &str,
    from_index: i32,
) -> Result<usize> {
    // Two passes keep (group_identifier, sequence_index) unique at every step.
    let shifted = sql_query(
        "UPDATE history_events SET sequence_index = -(sequence_index + 1) \
         WHERE group_identifier = ? AND sequence_index >= ?",
    )
    .bind::<Text, _>(group_identifier.to_string())
    .bind::<Integer, _>(from_index)
    .execute(conn)
    .map_err(StorageError::from)?;

    sql_query(
        "UPDATE history_events SET sequence_index = -sequence_index \
         WHERE group_identifier = ? AND sequence_index < 0",
    )
    .bind::<Text, _>(group_identifier.to_string())
    .execute(conn)
    .map_err(StorageError::from)?;

    Ok(shifted)
}

#[async_trait]
impl HistoryEventRepositoryTrait for HistoryEventRepository {
    fn list_events(&self, filter: &HistoryEventFilter) -> Result<Vec<HistoryEvent>> {
        let mut conn = get_connection(&self.pool)?;
        filtered_events(&mut conn, filter)
    }

    fn count_events(&self, filter: &HistoryEventFilter) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        if filter.exclude_type_pairs.is_empty() {
            let count = apply_filter(history_events::table.into_boxed(), filter)
                .count()
                .get_result::<i64>(&mut conn)
                .map_err(StorageError::from)?;
            return Ok(count as usize);
        }
        Ok(filtered_events(&mut conn, filter)?.len())
    }

    async fn insert_events(&self, events: Vec<NewHistoryEvent>) -> Result<Vec<i64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        for event in &events {
            event.validate()?;
        }

        self.writer
            .exec(move |conn| {
                let min_ts = events.iter().map(|e| e.timestamp).min();
                let mut identifiers = Vec::with_capacity(events.len());
                for event in events {
                    let identifier = diesel::insert_into(history_events::table)
                        .values(&NewHistoryEventDB::from(event))
                        .returning(history_events::identifier)
                        .get_result::<i64>(conn)
                        .map_err(StorageError::from)?;
                    identifiers.push(identifier);
                }
                if let Some(min_ts) = min_ts {
                    mark_stale_in(conn, min_ts, now_ms())?;
                }
                debug!("Inserted {} ledger events", identifiers.len());
                Ok(identifiers)
            })
            .await
    }

    async fn delete_events(&self, identifiers: &[i64]) -> Result<usize> {
        if identifiers.is_empty() {
            return Ok(0);
        }
        let identifiers = identifiers.to_vec();

        self.writer
            .exec(move |conn| {
                let mut min_ts: Option<i64> = None;
                let mut deleted = 0;
                for chunk in chunk_for_sqlite(&identifiers) {
                    let chunk_min = history_events::table
                        .filter(history_events::identifier.eq_any(chunk))
                        .select(min(history_events::timestamp))
                        .first::<Option<i64>>(conn)
                        .map_err(StorageError::from)?;
                    min_ts = match (min_ts, chunk_min) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                    deleted += diesel::delete(
                        history_events::table.filter(history_events::identifier.eq_any(chunk)),
                    )
                    .execute(conn)
                    .map_err(StorageError::from)?;
                }
                if let Some(min_ts) = min_ts {
                    mark_stale_in(conn, min_ts, now_ms())?;
                }
                debug!("Deleted {} ledger events", deleted);
                Ok(deleted)
            })
            .await
    }

    async fn insert_synthetic_event(&self, event: NewHistoryEvent) -> Result<HistoryEvent> {
        event.validate()?;
        self.writer
            .exec(move |conn| insert_synthetic_in(conn, event))
            .await
    }

    async fn resequence_group(&self, group_identifier: &str, from_index: i32) -> Result<usize> {
        let group_identifier = group_identifier.to_string();
        self.writer
            .exec(move |conn| resequence_group_in(conn, &group_identifier, from_index))
            .await
    }

    async fn record_interest(&self, booking: InterestBooking) -> Result<Vec<HistoryEvent>> {
        if let InterestBooking::Split { ref interest, .. } = booking {
            interest.validate()?;
        }

        self.writer
            .exec(move |conn| match booking {
                InterestBooking::Convert { identifier, notes } => {
                    let row = diesel::update(history_events::table.find(identifier))
                        .set((
                            history_events::event_type.eq(HistoryEventType::Receive.as_str()),
                            history_events::event_subtype
                                .eq(HistoryEventSubType::Interest.as_str()),
                            history_events::notes.eq(Some(notes)),
                            history_events::is_virtual.eq(true),
                        ))
                        .returning(HistoryEventDB::as_returning())
                        .get_result::<HistoryEventDB>(conn)
                        .map_err(StorageError::from)?;
                    debug!("Converted withdrawal {} into an interest event", identifier);
                    Ok(vec![load_event(conn, row)?])
                }
                InterestBooking::Split {
                    identifier,
                    remaining_amount,
                    notes,
                    interest,
                } => {
                    resequence_group_in(conn, &interest.group_identifier, interest.sequence_index)?;
                    let row = diesel::update(history_events::table.find(identifier))
                        .set((
                            history_events::amount.eq(decimal_to_db(remaining_amount)),
                            history_events::notes.eq(notes),
                        ))
                        .returning(HistoryEventDB::as_returning())
                        .get_result::<HistoryEventDB>(conn)
                        .map_err(StorageError::from)?;
                    let withdrawal = load_event(conn, row)?;
                    let interest = insert_synthetic_in(conn, interest)?;
                    debug!(
                        "Split {} {} of interest out of withdrawal {}",
                        interest.amount, interest.asset, identifier
                    );
                    Ok(vec![interest, withdrawal])
                }
            })
            .await
    }

    async fn upsert_asset(&self, asset: AssetInfo) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::replace_into(assets::table)
                    .values(&AssetDB::from(asset))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
