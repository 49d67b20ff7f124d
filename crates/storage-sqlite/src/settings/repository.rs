use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use super::model::{AppSettingDB, IgnoredAssetDB};
use crate::cache::mark_stale_in;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::app_settings::dsl::*;
use crate::schema::ignored_assets;
use ledgerfolio_core::errors::{Result, ValidationError};
use ledgerfolio_core::settings::{
    Settings, SettingsRepositoryTrait, SettingsUpdate, SETTING_AUTO_CREATE_INTEREST_EVENTS,
    SETTING_MAIN_CURRENCY,
};
use ledgerfolio_core::utils::time_utils::now_ms;

pub struct SettingsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SettingsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SettingsRepository { pool, writer }
    }
}

fn write_setting(conn: &mut SqliteConnection, key: &str, value: String) -> Result<()> {
    diesel::replace_into(app_settings)
        .values(&AppSettingDB {
            setting_key: key.to_string(),
            setting_value: value,
        })
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
    fn get_settings(&self) -> Result<Settings> {
        let mut conn = get_connection(&self.pool)?;
        let all_settings: Vec<(String, String)> = app_settings
            .select((setting_key, setting_value))
            .load::<(String, String)>(&mut conn)
            .map_err(StorageError::from)?;

        let mut settings = Settings::default();

        for (key, value) in all_settings {
            match key.as_str() {
                SETTING_MAIN_CURRENCY => settings.main_currency = value,
                SETTING_AUTO_CREATE_INTEREST_EVENTS => match value.parse() {
                    Ok(enabled) => settings.auto_create_interest_events = enabled,
                    Err(_) => warn!(
                        "Invalid value '{}' for {}, using default",
                        value, SETTING_AUTO_CREATE_INTEREST_EVENTS
                    ),
                },
                _ => {} // Ignore unknown settings
            }
        }

        settings.ignored_assets = ignored_assets::table
            .select(ignored_assets::asset)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        Ok(settings)
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        if let Some(ref currency) = update.main_currency {
            if currency.trim().is_empty() {
                return Err(ValidationError::MissingField("mainCurrency".to_string()).into());
            }
        }
        let update = update.clone();

        self.writer
            .exec(move |conn| {
                if let Some(currency) = update.main_currency {
                    write_setting(conn, SETTING_MAIN_CURRENCY, currency)?;
                }
                if let Some(enabled) = update.auto_create_interest_events {
                    write_setting(conn, SETTING_AUTO_CREATE_INTEREST_EVENTS, enabled.to_string())?;
                }
                Ok(())
            })
            .await
    }

    async fn add_ignored_asset(&self, asset: &str) -> Result<()> {
        let new_asset = IgnoredAssetDB {
            asset: asset.to_string(),
        };

        self.writer
            .exec(move |conn| {
                let inserted = diesel::insert_or_ignore_into(ignored_assets::table)
                    .values(&new_asset)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if inserted > 0 {
                    debug!("Asset {} is now ignored", new_asset.asset);
                    mark_stale_in(conn, 0, now_ms())?;
                }
                Ok(())
            })
            .await
    }

    async fn remove_ignored_asset(&self, asset: &str) -> Result<()> {
        let asset = asset.to_string();

        self.writer
            .exec(move |conn| {
                let removed = diesel::delete(
                    ignored_assets::table.filter(ignored_assets::asset.eq(&asset)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                if removed > 0 {
                    debug!("Asset {} is no longer ignored", asset);
                    mark_stale_in(conn, 0, now_ms())?;
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StaticCacheRepository;
    use crate::test_utils::setup_db;
    use ledgerfolio_core::cache::StaticCacheRepositoryTrait;

    #[tokio::test]
    async fn test_seeded_defaults() {
        let (_dir, pool, writer) = setup_db();
        let repo = SettingsRepository::new(pool, writer);

        let settings = repo.get_settings().unwrap();
        assert_eq!(settings.main_currency, "USD");
        assert!(settings.auto_create_interest_events);
        assert!(settings.ignored_assets.is_empty());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (_dir, pool, writer) = setup_db();
        let repo = SettingsRepository::new(pool, writer);

        repo.update_settings(&SettingsUpdate {
            main_currency: None,
            auto_create_interest_events: Some(false),
        })
        .await
        .unwrap();
        let settings = repo.get_settings().unwrap();
        assert_eq!(settings.main_currency, "USD");
        assert!(!settings.auto_create_interest_events);

        repo.update_settings(&SettingsUpdate {
            main_currency: Some("EUR".to_string()),
            auto_create_interest_events: None,
        })
        .await
        .unwrap();
        assert_eq!(repo.get_settings().unwrap().main_currency, "EUR");
    }

    #[tokio::test]
    async fn test_empty_currency_is_rejected() {
        let (_dir, pool, writer) = setup_db();
        let repo = SettingsRepository::new(pool, writer);

        let result = repo
            .update_settings(&SettingsUpdate {
                main_currency: Some(" ".to_string()),
                auto_create_interest_events: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ignored_assets_mark_whole_history_stale() {
        let (_dir, pool, writer) = setup_db();
        let repo = SettingsRepository::new(pool.clone(), writer.clone());
        let cache = StaticCacheRepository::new(pool, writer);

        repo.add_ignored_asset("SPAM").await.unwrap();
        repo.add_ignored_asset("SPAM").await.unwrap();
        assert!(repo.get_settings().unwrap().ignored_assets.contains("SPAM"));
        assert_eq!(cache.get_stale_marker().unwrap().unwrap().from_ts, 0);

        cache.clear_stale_marker(i64::MAX).await.unwrap();
        repo.remove_ignored_asset("SPAM").await.unwrap();
        assert!(repo.get_settings().unwrap().ignored_assets.is_empty());
        assert!(cache.get_stale_marker().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_removing_unknown_asset_keeps_balances_fresh() {
        let (_dir, pool, writer) = setup_db();
        let repo = SettingsRepository::new(pool.clone(), writer.clone());
        let cache = StaticCacheRepository::new(pool, writer);

        repo.remove_ignored_asset("NOPE").await.unwrap();
        assert!(cache.get_stale_marker().unwrap().is_none());
    }
}
