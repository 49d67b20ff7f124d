//! Small persisted key/value state: stale marker and last processing run.

mod cache_model;
mod cache_traits;

pub use cache_model::*;
pub use cache_traits::StaticCacheRepositoryTrait;
