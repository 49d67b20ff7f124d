//! SQLite storage implementation for settings and the ignored asset list.

mod model;
mod repository;

pub use model::{AppSettingDB, IgnoredAssetDB};
pub use repository::SettingsRepository;

// Re-export trait from core for convenience
pub use ledgerfolio_core::settings::SettingsRepositoryTrait;
