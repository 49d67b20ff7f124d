//! SQLite storage for historical prices.

mod model;
mod repository;

pub use model::PriceHistoryDB;
pub use repository::PriceRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::prices::PriceServiceTrait;
