//! SQLite storage for the per-event metric trail.

mod model;
mod repository;

pub use model::{EventMetricDB, NewEventMetricDB};
pub use repository::EventMetricsRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::portfolio::balances::EventMetricsRepositoryTrait;
