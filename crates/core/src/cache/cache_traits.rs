use async_trait::async_trait;

use super::cache_model::{StaleMarker, StaticCacheKey};
use crate::errors::Result;
use crate::history::TimestampMs;

#[async_trait]
pub trait StaticCacheRepositoryTrait: Send + Sync {
    fn get(&self, key: StaticCacheKey) -> Result<Option<TimestampMs>>;

    async fn set(&self, key: StaticCacheKey, value: TimestampMs) -> Result<()>;

    async fn delete(&self, key: StaticCacheKey) -> Result<()>;

    /// Current stale marker, if balances are stale.
    fn get_stale_marker(&self) -> Result<Option<StaleMarker>> {
        let Some(from_ts) = self.get(StaticCacheKey::StaleBalancesFromTs)? else {
            return Ok(None);
        };
        Ok(Some(StaleMarker {
            from_ts,
            modification_ts: self.get(StaticCacheKey::StaleBalancesModificationTs)?,
        }))
    }

    /// Moves the stale point back to `from_ts` if it is earlier than the stored
    /// one and records `modification_ts` as the latest mutation time.
    async fn mark_stale(&self, from_ts: TimestampMs, modification_ts: TimestampMs) -> Result<()>;

    /// Deletes the stale marker in one transaction, but only when its
    /// modification time is strictly before `processing_started_at`.
    /// Returns whether the marker was cleared.
    async fn clear_stale_marker(&self, processing_started_at: TimestampMs) -> Result<bool>;
}
