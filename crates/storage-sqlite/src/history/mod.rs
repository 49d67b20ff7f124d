//! SQLite storage for the event ledger and the asset registry.

mod model;
mod repository;

pub use model::{AssetDB, HistoryEventDB, NewHistoryEventDB};
pub use repository::HistoryEventRepository;
pub(crate) use repository::{filtered_events, type_pairs_missing_metrics};

// Re-export trait from core for convenience
pub use ledgerfolio_core::history::HistoryEventRepositoryTrait;
