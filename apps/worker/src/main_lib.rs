use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::notifications::TracingNotificationSink;
use ledgerfolio_core::portfolio::balances::{BalanceProcessingConfig, HistoricalBalanceProcessor};
use ledgerfolio_storage_sqlite::{
    cache::StaticCacheRepository,
    db::{self, write_actor},
    history::HistoryEventRepository,
    metrics::EventMetricsRepository,
    settings::SettingsRepository,
};

pub struct AppContext {
    pub processor: Arc<HistoricalBalanceProcessor>,
    pub history_repository: Arc<HistoryEventRepository>,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_context(config: &Config) -> anyhow::Result<Arc<AppContext>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let history_repository = Arc::new(HistoryEventRepository::new(pool.clone(), writer.clone()));
    let metrics_repository = Arc::new(EventMetricsRepository::new(pool.clone(), writer.clone()));
    let cache_repository = Arc::new(StaticCacheRepository::new(pool.clone(), writer.clone()));
    let settings_repository = Arc::new(SettingsRepository::new(pool, writer));

    let processor = Arc::new(
        HistoricalBalanceProcessor::new(
            history_repository.clone(),
            metrics_repository,
            cache_repository,
            settings_repository,
            Arc::new(TracingNotificationSink),
        )
        .with_config(BalanceProcessingConfig {
            metrics_batch_size: config.metrics_batch_size,
            ..BalanceProcessingConfig::default()
        }),
    );

    Ok(Arc::new(AppContext {
        processor,
        history_repository,
    }))
}
