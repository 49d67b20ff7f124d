//! Repository traits for settings.

use async_trait::async_trait;

use crate::errors::Result;
use crate::settings::{Settings, SettingsUpdate};

/// Repository trait for managing application settings.
#[async_trait]
pub trait SettingsRepositoryTrait: Send + Sync {
    /// Get all settings, with defaults for keys that were never stored.
    fn get_settings(&self) -> Result<Settings>;

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()>;

    /// Adds an asset to the ignored set. Balances become stale from the start of history.
    async fn add_ignored_asset(&self, asset: &str) -> Result<()>;

    /// Removes an asset from the ignored set. Balances become stale from the start of history.
    async fn remove_ignored_asset(&self, asset: &str) -> Result<()>;
}
