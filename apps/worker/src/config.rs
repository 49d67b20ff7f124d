//! Worker configuration read from the environment.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "./ledgerfolio.db";
const DEFAULT_PROCESS_INTERVAL_SECS: u64 = 300;
const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;
const DEFAULT_METRICS_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub process_interval: Duration,
    pub initial_delay: Duration,
    pub metrics_batch_size: usize,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads `.env` if present, then reads the `LF_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("LF_DB_PATH")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let process_interval_secs: u64 = parse_or(
            &lookup,
            "LF_PROCESS_INTERVAL_SECS",
            DEFAULT_PROCESS_INTERVAL_SECS,
        )?;
        if process_interval_secs == 0 {
            anyhow::bail!("LF_PROCESS_INTERVAL_SECS must be greater than zero");
        }
        let initial_delay_secs: u64 =
            parse_or(&lookup, "LF_INITIAL_DELAY_SECS", DEFAULT_INITIAL_DELAY_SECS)?;
        let metrics_batch_size: usize =
            parse_or(&lookup, "LF_METRICS_BATCH_SIZE", DEFAULT_METRICS_BATCH_SIZE)?;
        if metrics_batch_size == 0 {
            anyhow::bail!("LF_METRICS_BATCH_SIZE must be greater than zero");
        }

        let log_format = match lookup("LF_LOG_FORMAT") {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            db_path,
            process_interval: Duration::from_secs(process_interval_secs),
            initial_delay: Duration::from_secs(initial_delay_secs),
            metrics_batch_size,
            log_format,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
        None => Ok(default),
    }
}
