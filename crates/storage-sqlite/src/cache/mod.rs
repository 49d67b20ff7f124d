//! SQLite storage for the static cache (stale marker and last run time).

mod model;
mod repository;

pub use model::KeyValueCacheDB;
pub use repository::StaticCacheRepository;
pub(crate) use repository::mark_stale_in;

// Re-export trait from core for convenience
pub use ledgerfolio_core::cache::StaticCacheRepositoryTrait;
