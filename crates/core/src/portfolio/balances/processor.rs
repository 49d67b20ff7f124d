//! Incremental accumulation of bucket balances over the ledger.
//!
//! A run loads the balances known before its starting point, replays the
//! ledger from there and rewrites the metric trail. Only one run executes at
//! a time per process; overlapping calls are skipped, not queued.

use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use super::balances_model::{
    BalanceProcessingConfig, EventMetric, MetricKey, MetricsPurge, ProcessingOutcome,
    ProcessingPhase, ProcessingSummary, SkipReason,
};
use super::balances_traits::EventMetricsRepositoryTrait;
use super::bucket::{buckets_for, is_interest_eligible_withdrawal, Bucket};
use crate::cache::{StaticCacheKey, StaticCacheRepositoryTrait};
use crate::errors::{BalanceError, Result};
use crate::history::{
    EventDirection, HistoryEvent, HistoryEventFilter, HistoryEventRepositoryTrait,
    InterestBooking, TimestampMs,
};
use crate::notifications::{Notification, NotificationSink, ProgressSubtype};
use crate::settings::SettingsRepositoryTrait;
use crate::utils::time_utils::now_ms;

/// Run flag shared by every processor of the process.
fn process_run_flag() -> Arc<AtomicBool> {
    static RUN_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();
    RUN_FLAG
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Holds the run flag for the duration of a run. Dropping it resets the
/// phase to `Idle` and releases the flag, also when the run fails.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
    phase: &'a RwLock<ProcessingPhase>,
}

impl<'a> RunGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool, phase: &'a RwLock<ProcessingPhase>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, phase })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut phase) = self.phase.write() {
            *phase = ProcessingPhase::Idle;
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// In-memory state of one run.
struct RunState {
    balances: HashMap<Bucket, Decimal>,
    batch: Vec<EventMetric>,
    pending_purge: Option<MetricsPurge>,
    last_run_ts: Option<TimestampMs>,
    summary: ProcessingSummary,
}

pub struct HistoricalBalanceProcessor {
    history_repository: Arc<dyn HistoryEventRepositoryTrait>,
    metrics_repository: Arc<dyn EventMetricsRepositoryTrait>,
    cache_repository: Arc<dyn StaticCacheRepositoryTrait>,
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
    notifier: Arc<dyn NotificationSink>,
    config: BalanceProcessingConfig,
    is_running: Arc<AtomicBool>,
    phase: RwLock<ProcessingPhase>,
}

impl HistoricalBalanceProcessor {
    pub fn new(
        history_repository: Arc<dyn HistoryEventRepositoryTrait>,
        metrics_repository: Arc<dyn EventMetricsRepositoryTrait>,
        cache_repository: Arc<dyn StaticCacheRepositoryTrait>,
        settings_repository: Arc<dyn SettingsRepositoryTrait>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            history_repository,
            metrics_repository,
            cache_repository,
            settings_repository,
            notifier,
            config: BalanceProcessingConfig::default(),
            is_running: process_run_flag(),
            phase: RwLock::new(ProcessingPhase::Idle),
        }
    }

    pub fn with_config(mut self, config: BalanceProcessingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the process-wide run flag, so that at most one of the
    /// processors sharing `flag` runs at a time.
    pub fn with_run_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.is_running = flag;
        self
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> ProcessingPhase {
        self.phase
            .read()
            .map(|phase| *phase)
            .unwrap_or(ProcessingPhase::Idle)
    }

    fn set_phase(&self, phase: ProcessingPhase) {
        if let Ok(mut current) = self.phase.write() {
            *current = phase;
        }
    }

    /// Processes from the stale marker when balances are stale.
    ///
    /// Without a previous completed run, the whole history is processed.
    pub async fn run_if_stale(&self) -> Result<ProcessingOutcome> {
        // Taken before the marker is read, so a write landing after the read
        // keeps the marker alive.
        let started_at = now_ms();
        let Some(marker) = self.cache_repository.get_stale_marker()? else {
            return Ok(ProcessingOutcome::Skipped(SkipReason::NotStale));
        };
        let last_run_ts = self
            .cache_repository
            .get(StaticCacheKey::LastHistoricalBalanceProcessingTs)?;
        let from_ts = last_run_ts.map(|_| marker.from_ts);
        self.process_from(from_ts, started_at).await
    }

    /// Rebuilds the metric trail from `from_ts`, or from scratch when `None`.
    pub async fn process(&self, from_ts: Option<TimestampMs>) -> Result<ProcessingOutcome> {
        self.process_from(from_ts, now_ms()).await
    }

    /// Runs the accumulation. The stale marker is only cleared when it was
    /// last modified before `started_at`.
    async fn process_from(
        &self,
        from_ts: Option<TimestampMs>,
        started_at: TimestampMs,
    ) -> Result<ProcessingOutcome> {
        let Some(_guard) = RunGuard::try_acquire(&self.is_running, &self.phase) else {
            debug!("Historical balance processing already running, skipping");
            return Ok(ProcessingOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        self.set_phase(ProcessingPhase::Loading);
        let settings = self.settings_repository.get_settings()?;
        let last_run_ts = self
            .cache_repository
            .get(StaticCacheKey::LastHistoricalBalanceProcessingTs)?;

        let mut filter = HistoryEventFilter::new().exclude_ignored_assets(true);
        let (balances, purge) = match from_ts {
            Some(ts) => {
                filter = filter.from_ts(ts);
                (
                    self.metrics_repository.load_latest_balances_before(ts)?,
                    MetricsPurge::FromTimestamp(ts),
                )
            }
            None => (HashMap::new(), MetricsPurge::All),
        };
        let mut events = self.history_repository.list_events(&filter)?;
        info!(
            "Processing historical balances for {} events from {:?} ({} buckets loaded)",
            events.len(),
            from_ts,
            balances.len()
        );

        let mut state = RunState {
            balances,
            batch: Vec::with_capacity(self.config.metrics_batch_size),
            pending_purge: Some(purge),
            last_run_ts,
            summary: ProcessingSummary {
                from_ts,
                started_at,
                ..Default::default()
            },
        };

        self.set_phase(ProcessingPhase::Accumulating);
        let total = events.len();
        let progress_every = (total / self.config.progress_steps.max(1)).max(1);
        for i in 0..total {
            if events[i].amount < Decimal::ZERO {
                return Err(BalanceError::NegativeAmount {
                    identifier: events[i].identifier,
                    amount: events[i].amount.to_string(),
                }
                .into());
            }

            let booked = if settings.auto_create_interest_events {
                self.maybe_book_interest(&mut events, i, &state.balances)
                    .await?
            } else {
                None
            };
            match booked {
                Some(booked) => {
                    for event in &booked {
                        self.apply_event(event, &mut state);
                    }
                    state.summary.interest_events_created += 1;
                }
                None => self.apply_event(&events[i], &mut state),
            }
            state.summary.events_processed += 1;

            if state.batch.len() >= self.config.metrics_batch_size {
                self.flush(&mut state).await?;
            }
            if (i + 1) % progress_every == 0 || i + 1 == total {
                self.notifier.notify(Notification::ProgressUpdate {
                    subtype: ProgressSubtype::HistoricalBalanceProcessing,
                    total,
                    processed: i + 1,
                });
            }
        }
        self.flush(&mut state).await?;

        self.set_phase(ProcessingPhase::Finalizing);
        self.cache_repository
            .set(StaticCacheKey::LastHistoricalBalanceProcessingTs, now_ms())
            .await?;
        state.summary.stale_marker_cleared =
            self.cache_repository.clear_stale_marker(started_at).await?;
        if !state.summary.stale_marker_cleared {
            debug!("Stale marker kept, the ledger may have changed during processing");
        }

        let summary = state.summary;
        info!(
            "Historical balance processing finished: {} events, {} metric rows, {} interest events, {} negative balances",
            summary.events_processed,
            summary.metrics_written,
            summary.interest_events_created,
            summary.negative_balances_detected
        );
        Ok(ProcessingOutcome::Completed(summary))
    }

    /// Books interest when a protocol withdrawal takes out more than the
    /// tracked deposit. The withdrawal shrinks by the excess, which becomes an
    /// interest event at the withdrawal's place in its group. A withdrawal
    /// made only of yield turns into the interest event itself.
    ///
    /// Returns the rewritten events to account for instead of `events[i]`,
    /// with the remaining in-memory events of the group resequenced.
    async fn maybe_book_interest(
        &self,
        events: &mut [HistoryEvent],
        i: usize,
        balances: &HashMap<Bucket, Decimal>,
    ) -> Result<Option<Vec<HistoryEvent>>> {
        let event = &events[i];
        if !event.entry_type.supports_synthetic_events()
            || !is_interest_eligible_withdrawal(event.event_type, event.event_subtype)
        {
            return Ok(None);
        }

        let overflow = buckets_for(event).into_iter().find_map(|effect| {
            let protocol = effect.bucket.protocol.clone()?;
            if effect.direction != EventDirection::Out {
                return None;
            }
            let current = balances
                .get(&effect.bucket)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let overflow = event.amount - current;
            (overflow > Decimal::ZERO).then_some((protocol, overflow))
        });
        let Some((protocol, interest)) = overflow else {
            return Ok(None);
        };

        let booking = InterestBooking::for_withdrawal(event, interest, &protocol);
        let shifts_group = matches!(booking, InterestBooking::Split { .. });
        let group_identifier = event.group_identifier.clone();
        let sequence_index = event.sequence_index;
        let booked = self
            .history_repository
            .record_interest(booking)
            .await
            .map_err(|e| BalanceError::SyntheticEventRejected {
                group_identifier: group_identifier.clone(),
                reason: e.to_string(),
            })?;

        if shifts_group {
            shift_group_indices(&mut events[i + 1..], &group_identifier, sequence_index);
            events[i + 1..].sort_by_key(HistoryEvent::sort_key);
        }
        info!(
            "Booked {} {} of interest earned in {} out of withdrawal {}",
            interest.normalize(),
            events[i].asset,
            protocol,
            events[i].identifier
        );
        Ok(Some(booked))
    }

    fn apply_event(&self, event: &HistoryEvent, state: &mut RunState) {
        for effect in buckets_for(event) {
            let current = state
                .balances
                .get(&effect.bucket)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let new_balance = match effect.direction {
                EventDirection::In => current + event.amount,
                EventDirection::Out => current - event.amount,
                EventDirection::Neutral => continue,
            };

            if new_balance < Decimal::ZERO {
                warn!(
                    "Negative balance detected for {} at event {}. Skipping bucket {:?}",
                    event.asset, event.identifier, effect.bucket
                );
                state.summary.negative_balances_detected += 1;
                self.notifier.notify(Notification::NegativeBalanceDetected {
                    event_identifier: event.identifier,
                    group_identifier: event.group_identifier.clone(),
                    asset: event.asset.clone(),
                    bucket: effect.bucket,
                    balance_before: current,
                    last_run_ts: state.last_run_ts,
                });
                continue;
            }

            if new_balance.is_zero() {
                state.balances.remove(&effect.bucket);
            } else {
                state.balances.insert(effect.bucket.clone(), new_balance);
            }
            state.batch.push(EventMetric {
                event_identifier: Some(event.identifier),
                bucket: effect.bucket,
                metric_key: MetricKey::Balance,
                value: new_balance.normalize(),
                timestamp: event.timestamp,
                sequence_index: event.sequence_index,
            });
        }
    }

    /// Writes buffered rows. The first flush of a run also purges the rows
    /// the run supersedes, even when nothing is buffered.
    async fn flush(&self, state: &mut RunState) -> Result<()> {
        if state.batch.is_empty() && state.pending_purge.is_none() {
            return Ok(());
        }
        self.set_phase(ProcessingPhase::Flushing);
        let rows = std::mem::take(&mut state.batch);
        let purge = state.pending_purge.take();
        let row_count = rows.len();
        let written = self
            .metrics_repository
            .write_metrics_batch(rows, purge)
            .await?;
        state.summary.metrics_written += written;
        debug!("Flushed {} metric rows (purge: {:?})", row_count, purge);
        self.set_phase(ProcessingPhase::Accumulating);
        Ok(())
    }
}

fn shift_group_indices(events: &mut [HistoryEvent], group_identifier: &str, from_index: i32) {
    for event in events
        .iter_mut()
        .filter(|e| e.group_identifier == group_identifier && e.sequence_index >= from_index)
    {
        event.sequence_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MockNotificationSink;
    use crate::testing::InMemoryLedger;

    fn processor(ledger: &InMemoryLedger) -> HistoricalBalanceProcessor {
        let ledger = Arc::new(ledger.clone());
        HistoricalBalanceProcessor::new(
            ledger.clone(),
            ledger.clone(),
            ledger.clone(),
            ledger,
            Arc::new(MockNotificationSink::new()),
        )
    }

    #[test]
    fn test_processors_share_process_wide_run_flag() {
        let first = processor(&InMemoryLedger::new());
        let second = processor(&InMemoryLedger::new());
        assert!(Arc::ptr_eq(&first.is_running, &second.is_running));

        let isolated = processor(&InMemoryLedger::new())
            .with_run_flag(Arc::new(AtomicBool::new(false)));
        assert!(!Arc::ptr_eq(&first.is_running, &isolated.is_running));
    }

    #[test]
    fn test_shift_group_indices_only_moves_later_group_events() {
        let mut events = vec![event("g", 0), event("g", 2), event("other", 1)];
        shift_group_indices(&mut events, "g", 1);
        let indexes: Vec<i32> = events.iter().map(|e| e.sequence_index).collect();
        assert_eq!(indexes, vec![0, 3, 1]);
    }

    fn event(group: &str, sequence_index: i32) -> HistoryEvent {
        HistoryEvent {
            identifier: 1,
            entry_type: crate::history::HistoryEntryType::OnchainEvent,
            group_identifier: group.to_string(),
            sequence_index,
            timestamp: 0,
            location: "ethereum".to_string(),
            location_label: None,
            asset: "ETH".to_string(),
            asset_protocol: None,
            amount: Decimal::ONE,
            event_type: crate::history::HistoryEventType::Receive,
            event_subtype: crate::history::HistoryEventSubType::None,
            notes: None,
            counterparty: None,
            address: None,
            is_virtual: false,
        }
    }
}
