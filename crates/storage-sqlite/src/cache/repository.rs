use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::KeyValueCacheDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::key_value_cache::dsl::*;
use ledgerfolio_core::cache::{StaticCacheKey, StaticCacheRepositoryTrait};
use ledgerfolio_core::errors::Result;
use ledgerfolio_core::history::TimestampMs;

pub struct StaticCacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl StaticCacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        StaticCacheRepository { pool, writer }
    }
}

fn read_in(conn: &mut SqliteConnection, key: StaticCacheKey) -> Result<Option<TimestampMs>> {
    Ok(key_value_cache
        .filter(name.eq(key.as_str()))
        .select(value)
        .first::<i64>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

fn write_in(conn: &mut SqliteConnection, key: StaticCacheKey, new_value: TimestampMs) -> Result<()> {
    diesel::replace_into(key_value_cache)
        .values(&KeyValueCacheDB {
            name: key.as_str().to_string(),
            value: new_value,
        })
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

/// Moves the stale point back to `from_ts` within the caller's transaction.
pub(crate) fn mark_stale_in(
    conn: &mut SqliteConnection,
    from_ts: TimestampMs,
    modification_ts: TimestampMs,
) -> Result<()> {
    let stale_from = match read_in(conn, StaticCacheKey::StaleBalancesFromTs)? {
        Some(current) => current.min(from_ts),
        None => from_ts,
    };
    write_in(conn, StaticCacheKey::StaleBalancesFromTs, stale_from)?;
    write_in(
        conn,
        StaticCacheKey::StaleBalancesModificationTs,
        modification_ts,
    )?;
    debug!("Balances marked stale from {}", stale_from);
    Ok(())
}

#[async_trait]
impl StaticCacheRepositoryTrait for StaticCacheRepository {
    fn get(&self, key: StaticCacheKey) -> Result<Option<TimestampMs>> {
        let mut conn = get_connection(&self.pool)?;
        read_in(&mut conn, key)
    }

    async fn set(&self, key: StaticCacheKey, new_value: TimestampMs) -> Result<()> {
        self.writer
            .exec(move |conn| write_in(conn, key, new_value))
            .await
    }

    async fn delete(&self, key: StaticCacheKey) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::delete(key_value_cache.filter(name.eq(key.as_str())))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_stale(&self, from_ts: TimestampMs, modification_ts: TimestampMs) -> Result<()> {
        self.writer
            .exec(move |conn| mark_stale_in(conn, from_ts, modification_ts))
            .await
    }

    async fn clear_stale_marker(&self, processing_started_at: TimestampMs) -> Result<bool> {
        self.writer
            .exec(move |conn| {
                let modified_before_run = read_in(conn, StaticCacheKey::StaleBalancesModificationTs)?
                    .is_some_and(|ts| ts < processing_started_at);
                if !modified_before_run {
                    return Ok(false);
                }
                diesel::delete(key_value_cache.filter(name.eq_any([
                    StaticCacheKey::StaleBalancesFromTs.as_str(),
                    StaticCacheKey::StaleBalancesModificationTs.as_str(),
                ])))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(true)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_db;

    #[tokio::test]
    async fn test_set_get_delete() {
        let (_dir, pool, writer) = setup_db();
        let repo = StaticCacheRepository::new(pool, writer);

        let key = StaticCacheKey::LastHistoricalBalanceProcessingTs;
        assert_eq!(repo.get(key).unwrap(), None);
        repo.set(key, 42).await.unwrap();
        repo.set(key, 43).await.unwrap();
        assert_eq!(repo.get(key).unwrap(), Some(43));
        repo.delete(key).await.unwrap();
        assert_eq!(repo.get(key).unwrap(), None);
    }

    #[tokio::test]
    async fn test_mark_stale_keeps_earliest_point() {
        let (_dir, pool, writer) = setup_db();
        let repo = StaticCacheRepository::new(pool, writer);

        repo.mark_stale(500, 10).await.unwrap();
        repo.mark_stale(900, 20).await.unwrap();
        let marker = repo.get_stale_marker().unwrap().unwrap();
        assert_eq!(marker.from_ts, 500);
        assert_eq!(marker.modification_ts, Some(20));

        repo.mark_stale(100, 30).await.unwrap();
        assert_eq!(repo.get_stale_marker().unwrap().unwrap().from_ts, 100);
    }

    #[tokio::test]
    async fn test_clear_stale_marker_only_when_modified_before_run() {
        let (_dir, pool, writer) = setup_db();
        let repo = StaticCacheRepository::new(pool, writer);
        repo.mark_stale(500, 1_000).await.unwrap();

        assert!(!repo.clear_stale_marker(1_000).await.unwrap());
        assert!(repo.get_stale_marker().unwrap().is_some());

        assert!(repo.clear_stale_marker(1_001).await.unwrap());
        assert!(repo.get_stale_marker().unwrap().is_none());
        assert_eq!(
            repo.get(StaticCacheKey::StaleBalancesModificationTs).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_clear_without_modification_ts_keeps_marker() {
        let (_dir, pool, writer) = setup_db();
        let repo = StaticCacheRepository::new(pool, writer);
        repo.set(StaticCacheKey::StaleBalancesFromTs, 7).await.unwrap();

        assert!(!repo.clear_stale_marker(i64::MAX).await.unwrap());
        assert_eq!(repo.get_stale_marker().unwrap().unwrap().from_ts, 7);
    }
}
