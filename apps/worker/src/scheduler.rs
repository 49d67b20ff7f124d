//! Background scheduler for historical balance processing.
//!
//! Wakes up on a fixed interval and runs the processor whenever the ledger
//! changed since the last run.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::main_lib::AppContext;
use ledgerfolio_core::portfolio::balances::{ProcessingOutcome, SkipReason};

/// Starts the background processing scheduler.
pub fn start_balance_processing_scheduler(
    context: Arc<AppContext>,
    config: &Config,
) -> JoinHandle<()> {
    let initial_delay = config.initial_delay;
    let process_interval = config.process_interval;

    tokio::spawn(async move {
        info!(
            "Balance processing scheduler started ({}s interval)",
            process_interval.as_secs()
        );

        tokio::time::sleep(initial_delay).await;

        // First tick is immediate
        let mut ticker = interval(process_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_scheduled_processing(&context).await;
        }
    })
}

/// Runs one processing pass if balances are stale.
pub async fn run_scheduled_processing(context: &AppContext) -> Option<ProcessingOutcome> {
    match context.processor.run_if_stale().await {
        Ok(ProcessingOutcome::Skipped(SkipReason::NotStale)) => {
            debug!("Balances are up to date");
            Some(ProcessingOutcome::Skipped(SkipReason::NotStale))
        }
        Ok(ProcessingOutcome::Skipped(SkipReason::AlreadyRunning)) => {
            debug!("Balance processing already running");
            Some(ProcessingOutcome::Skipped(SkipReason::AlreadyRunning))
        }
        Ok(ProcessingOutcome::Completed(summary)) => {
            info!(
                events = summary.events_processed,
                metrics = summary.metrics_written,
                interest_events = summary.interest_events_created,
                negative_balances = summary.negative_balances_detected,
                marker_cleared = summary.stale_marker_cleared,
                "Balance processing completed"
            );
            Some(ProcessingOutcome::Completed(summary))
        }
        Err(e) => {
            error!("Balance processing failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::main_lib::build_context;
    use ledgerfolio_core::history::{
        HistoryEntryType, HistoryEventRepositoryTrait, HistoryEventSubType, HistoryEventType,
        NewHistoryEvent,
    };
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(db_path: String) -> Config {
        Config {
            db_path,
            process_interval: Duration::from_secs(60),
            initial_delay: Duration::ZERO,
            metrics_batch_size: 2,
            log_format: crate::config::LogFormat::Text,
        }
    }

    #[tokio::test]
    async fn test_scheduled_pass_processes_then_skips() {
        let dir = tempdir().unwrap();
        let config = config(dir.path().join("worker.db").to_string_lossy().into_owned());
        let context = build_context(&config).await.unwrap();

        context
            .history_repository
            .insert_events(vec![NewHistoryEvent {
                entry_type: HistoryEntryType::HistoryEvent,
                group_identifier: "deposit-1".to_string(),
                sequence_index: 0,
                timestamp: 1_672_531_200_000,
                location: "kraken".to_string(),
                location_label: None,
                asset: "BTC".to_string(),
                amount: "0.5".parse().unwrap(),
                event_type: HistoryEventType::Receive,
                event_subtype: HistoryEventSubType::None,
                notes: None,
                counterparty: None,
                address: None,
                is_virtual: false,
            }])
            .await
            .unwrap();

        // The marker is only cleared by a run starting after the last write.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let first = run_scheduled_processing(&context).await;
        assert!(matches!(
            first,
            Some(ProcessingOutcome::Completed(ref s)) if s.events_processed == 1 && s.stale_marker_cleared
        ));

        let second = run_scheduled_processing(&context).await;
        assert_eq!(second, Some(ProcessingOutcome::Skipped(SkipReason::NotStale)));
    }
}
