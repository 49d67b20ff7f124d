use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use ledgerfolio_core::history::{
    HistoryEntryType, HistoryEventSubType, HistoryEventType, NewHistoryEvent,
};

pub const WALLET: &str = "0xwallet";

/// Migrated database in a temporary directory. Keep the `TempDir` alive for
/// the duration of the test.
pub fn setup_db() -> (TempDir, Arc<DbPool>, WriteHandle) {
    let dir = tempdir().expect("temp dir");
    let db_path = init(dir.path().join("ledger.db").to_str().expect("utf-8 path"))
        .expect("init database");
    let pool = create_pool(&db_path).expect("create pool");
    run_migrations(&pool).expect("run migrations");
    let writer = spawn_writer((*pool).clone());
    (dir, pool, writer)
}

/// On-chain event of `WALLET` on ethereum at sequence index 0.
pub fn new_event(
    group: &str,
    timestamp: i64,
    event_type: HistoryEventType,
    event_subtype: HistoryEventSubType,
    asset: &str,
    amount: Decimal,
) -> NewHistoryEvent {
    NewHistoryEvent {
        entry_type: HistoryEntryType::OnchainEvent,
        group_identifier: group.to_string(),
        sequence_index: 0,
        timestamp,
        location: "ethereum".to_string(),
        location_label: Some(WALLET.to_string()),
        asset: asset.to_string(),
        amount,
        event_type,
        event_subtype,
        notes: None,
        counterparty: None,
        address: None,
        is_virtual: false,
    }
}
