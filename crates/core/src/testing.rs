//! In-memory implementations of the repository traits for unit tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::{StaticCacheKey, StaticCacheRepositoryTrait};
use crate::errors::{DatabaseError, Error, Result};
use crate::history::{
    AssetInfo, HistoryEntryType, HistoryEvent, HistoryEventFilter, HistoryEventRepositoryTrait,
    HistoryEventSubType, HistoryEventType, InterestBooking, NewHistoryEvent, TimestampMs,
};
use crate::notifications::{MockNotificationSink, NotificationSink};
use crate::portfolio::balances::{
    BalanceQuery, Bucket, BucketBalance, EventMetric, EventMetricsRepositoryTrait,
    HistoricalBalanceProcessor, MetricTransition, MetricsPurge,
};
use crate::prices::PriceServiceTrait;
use crate::settings::{Settings, SettingsRepositoryTrait, SettingsUpdate};
use crate::utils::time_utils::now_ms;

#[derive(Default)]
struct LedgerState {
    events: Vec<HistoryEvent>,
    next_identifier: i64,
    asset_protocols: HashMap<String, Option<String>>,
    metrics: Vec<EventMetric>,
    cache: HashMap<StaticCacheKey, TimestampMs>,
    settings: Settings,
    fail_metric_writes: bool,
    fail_interest_bookings: bool,
    insert_on_marker_read: Option<NewHistoryEvent>,
}

impl LedgerState {
    fn mark_stale(&mut self, from_ts: TimestampMs, modification_ts: TimestampMs) {
        let from = self
            .cache
            .get(&StaticCacheKey::StaleBalancesFromTs)
            .map_or(from_ts, |current| (*current).min(from_ts));
        self.cache.insert(StaticCacheKey::StaleBalancesFromTs, from);
        self.cache
            .insert(StaticCacheKey::StaleBalancesModificationTs, modification_ts);
    }

    fn store_event(&mut self, event: NewHistoryEvent) -> HistoryEvent {
        self.next_identifier += 1;
        let stored = HistoryEvent {
            identifier: self.next_identifier,
            entry_type: event.entry_type,
            group_identifier: event.group_identifier,
            sequence_index: event.sequence_index,
            timestamp: event.timestamp,
            location: event.location,
            location_label: event.location_label,
            asset_protocol: self.asset_protocols.get(&event.asset).cloned().flatten(),
            asset: event.asset,
            amount: event.amount,
            event_type: event.event_type,
            event_subtype: event.event_subtype,
            notes: event.notes,
            counterparty: event.counterparty,
            address: event.address,
            is_virtual: event.is_virtual,
        };
        self.events.push(stored.clone());
        stored
    }

    fn sorted_metrics(&self) -> Vec<EventMetric> {
        let mut metrics = self.metrics.clone();
        metrics.sort_by_key(EventMetric::sort_key);
        metrics
    }
}

/// Ledger, metric trail, static cache and settings sharing one state, the
/// way the SQLite repositories share one database. Processors built from
/// the same ledger share one run flag.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    run_flag: Arc<AtomicBool>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn events(&self) -> Vec<HistoryEvent> {
        let mut events = self.lock().events.clone();
        events.sort_by_key(HistoryEvent::sort_key);
        events
    }

    pub fn metrics(&self) -> Vec<EventMetric> {
        self.lock().sorted_metrics()
    }

    pub fn set_cache(&self, key: StaticCacheKey, value: TimestampMs) {
        self.lock().cache.insert(key, value);
    }

    pub fn set_auto_create_interest_events(&self, enabled: bool) {
        self.lock().settings.auto_create_interest_events = enabled;
    }

    pub fn fail_metric_writes(&self, fail: bool) {
        self.lock().fail_metric_writes = fail;
    }

    pub fn fail_interest_bookings(&self, fail: bool) {
        self.lock().fail_interest_bookings = fail;
    }

    /// Inserts `event` right after the next read of the stale point, the way
    /// a concurrent writer would.
    pub fn insert_on_next_marker_read(&self, event: NewHistoryEvent) {
        self.lock().insert_on_marker_read = Some(event);
    }

    /// Runs `insert_events` and backdates the stale modification time so a
    /// following run can clear the marker.
    pub async fn seed(&self, events: Vec<NewHistoryEvent>) -> Vec<i64> {
        let ids = self.insert_events(events).await.unwrap();
        self.set_cache(StaticCacheKey::StaleBalancesModificationTs, 0);
        ids
    }

    pub fn processor(&self, notifier: MockNotificationSink) -> HistoricalBalanceProcessor {
        self.processor_with_sink(Arc::new(notifier))
    }

    pub fn processor_with_sink(
        &self,
        notifier: Arc<dyn NotificationSink>,
    ) -> HistoricalBalanceProcessor {
        let ledger = Arc::new(self.clone());
        HistoricalBalanceProcessor::new(
            ledger.clone(),
            ledger.clone(),
            ledger.clone(),
            ledger,
            notifier,
        )
        .with_run_flag(self.run_flag.clone())
    }
}

#[async_trait]
impl HistoryEventRepositoryTrait for InMemoryLedger {
    fn list_events(&self, filter: &HistoryEventFilter) -> Result<Vec<HistoryEvent>> {
        let state = self.lock();
        let mut events: Vec<HistoryEvent> = state
            .events
            .iter()
            .filter(|e| filter.matches(e, &state.settings.ignored_assets))
            .cloned()
            .collect();
        events.sort_by_key(HistoryEvent::sort_key);
        Ok(events)
    }

    fn count_events(&self, filter: &HistoryEventFilter) -> Result<usize> {
        Ok(self.list_events(filter)?.len())
    }

    async fn insert_events(&self, events: Vec<NewHistoryEvent>) -> Result<Vec<i64>> {
        for event in &events {
            event.validate()?;
        }
        let mut state = self.lock();
        let min_ts = events.iter().map(|e| e.timestamp).min();
        let ids = events
            .into_iter()
            .map(|e| state.store_event(e).identifier)
            .collect();
        if let Some(min_ts) = min_ts {
            state.mark_stale(min_ts, now_ms());
        }
        Ok(ids)
    }

    async fn delete_events(&self, identifiers: &[i64]) -> Result<usize> {
        let mut state = self.lock();
        let min_ts = state
            .events
            .iter()
            .filter(|e| identifiers.contains(&e.identifier))
            .map(|e| e.timestamp)
            .min();
        let before = state.events.len();
        state.events.retain(|e| !identifiers.contains(&e.identifier));
        state
            .metrics
            .retain(|m| !m.event_identifier.is_some_and(|id| identifiers.contains(&id)));
        if let Some(min_ts) = min_ts {
            state.mark_stale(min_ts, now_ms());
        }
        Ok(before - state.events.len())
    }

    async fn insert_synthetic_event(&self, event: NewHistoryEvent) -> Result<HistoryEvent> {
        event.validate()?;
        let mut state = self.lock();
        let clash = state.events.iter().any(|e| {
            e.group_identifier == event.group_identifier
                && e.sequence_index == event.sequence_index
        });
        if clash {
            return Err(Error::Database(DatabaseError::UniqueViolation(format!(
                "{}/{}",
                event.group_identifier, event.sequence_index
            ))));
        }
        Ok(state.store_event(event))
    }

    async fn resequence_group(&self, group_identifier: &str, from_index: i32) -> Result<usize> {
        let mut state = self.lock();
        let mut shifted = 0;
        for event in state.events.iter_mut().filter(|e| {
            e.group_identifier == group_identifier && e.sequence_index >= from_index
        }) {
            event.sequence_index += 1;
            shifted += 1;
        }
        Ok(shifted)
    }

    async fn record_interest(&self, booking: InterestBooking) -> Result<Vec<HistoryEvent>> {
        if let InterestBooking::Split { ref interest, .. } = booking {
            interest.validate()?;
        }
        let mut state = self.lock();
        if state.fail_interest_bookings {
            return Err(Error::Database(DatabaseError::TransactionFailed(
                "interest bookings disabled".to_string(),
            )));
        }
        let identifier = match &booking {
            InterestBooking::Convert { identifier, .. }
            | InterestBooking::Split { identifier, .. } => *identifier,
        };
        let position = state
            .events
            .iter()
            .position(|e| e.identifier == identifier)
            .ok_or_else(|| Error::Database(DatabaseError::NotFound(identifier.to_string())))?;

        match booking {
            InterestBooking::Convert { notes, .. } => {
                let event = &mut state.events[position];
                event.event_type = HistoryEventType::Receive;
                event.event_subtype = HistoryEventSubType::Interest;
                event.notes = Some(notes);
                event.is_virtual = true;
                Ok(vec![event.clone()])
            }
            InterestBooking::Split {
                remaining_amount,
                notes,
                interest,
                ..
            } => {
                for event in state.events.iter_mut().filter(|e| {
                    e.group_identifier == interest.group_identifier
                        && e.sequence_index >= interest.sequence_index
                }) {
                    event.sequence_index += 1;
                }
                let withdrawal = &mut state.events[position];
                withdrawal.amount = remaining_amount;
                withdrawal.notes = notes;
                let withdrawal = withdrawal.clone();
                let interest = state.store_event(interest);
                Ok(vec![interest, withdrawal])
            }
        }
    }

    async fn upsert_asset(&self, asset: AssetInfo) -> Result<()> {
        let mut state = self.lock();
        for event in state.events.iter_mut().filter(|e| e.asset == asset.identifier) {
            event.asset_protocol = asset.protocol.clone();
        }
        state.asset_protocols.insert(asset.identifier, asset.protocol);
        Ok(())
    }
}

fn latest_per_bucket<'a>(
    metrics: impl Iterator<Item = &'a EventMetric>,
) -> HashMap<Bucket, &'a EventMetric> {
    let mut latest: HashMap<Bucket, &EventMetric> = HashMap::new();
    for metric in metrics {
        match latest.get(&metric.bucket) {
            Some(current) if current.sort_key() >= metric.sort_key() => {}
            _ => {
                latest.insert(metric.bucket.clone(), metric);
            }
        }
    }
    latest
}

#[async_trait]
impl EventMetricsRepositoryTrait for InMemoryLedger {
    fn load_latest_balances_before(&self, ts: TimestampMs) -> Result<HashMap<Bucket, Decimal>> {
        let state = self.lock();
        Ok(latest_per_bucket(state.metrics.iter().filter(|m| m.timestamp < ts))
            .into_iter()
            .filter(|(_, m)| !m.value.is_zero())
            .map(|(bucket, m)| (bucket, m.value))
            .collect())
    }

    async fn write_metrics_batch(
        &self,
        rows: Vec<EventMetric>,
        purge: Option<MetricsPurge>,
    ) -> Result<usize> {
        let mut state = self.lock();
        if state.fail_metric_writes {
            return Err(Error::Database(DatabaseError::TransactionFailed(
                "metric writes disabled".to_string(),
            )));
        }
        match purge {
            Some(MetricsPurge::All) => state.metrics.clear(),
            Some(MetricsPurge::FromTimestamp(ts)) => state.metrics.retain(|m| m.timestamp < ts),
            None => {}
        }
        let written = rows.len();
        for row in rows {
            state.metrics.retain(|m| {
                !(m.event_identifier == row.event_identifier
                    && m.bucket == row.bucket
                    && m.metric_key == row.metric_key)
            });
            state.metrics.push(row);
        }
        Ok(written)
    }

    fn get_latest_bucket_balances(&self, query: &BalanceQuery) -> Result<Vec<BucketBalance>> {
        let state = self.lock();
        let mut balances: Vec<BucketBalance> = latest_per_bucket(
            state
                .metrics
                .iter()
                .filter(|m| m.timestamp <= query.timestamp && query.matches(&m.bucket)),
        )
        .into_values()
        .map(|m| BucketBalance {
            bucket: m.bucket.clone(),
            balance: m.value,
            timestamp: m.timestamp,
        })
        .collect();
        balances.sort_by(|a, b| a.bucket.cmp(&b.bucket));
        Ok(balances)
    }

    fn get_metric_transitions(
        &self,
        assets: Option<&[String]>,
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<Vec<MetricTransition>> {
        let metrics = self.lock().sorted_metrics();
        let mut previous: HashMap<Bucket, Decimal> = HashMap::new();
        let mut transitions = Vec::new();
        for metric in metrics {
            if assets.is_some_and(|a| !a.contains(&metric.bucket.asset)) {
                continue;
            }
            let previous_balance = previous
                .insert(metric.bucket.clone(), metric.value)
                .unwrap_or_default();
            if metric.timestamp >= from && metric.timestamp <= to {
                transitions.push(MetricTransition {
                    bucket: metric.bucket,
                    event_identifier: metric.event_identifier,
                    timestamp: metric.timestamp,
                    sequence_index: metric.sequence_index,
                    balance: metric.value,
                    previous_balance,
                });
            }
        }
        Ok(transitions)
    }

    fn has_events_missing_metrics(&self, filter: &HistoryEventFilter) -> Result<bool> {
        let state = self.lock();
        let with_metrics: HashSet<i64> = state
            .metrics
            .iter()
            .filter_map(|m| m.event_identifier)
            .collect();
        Ok(state.events.iter().any(|e| {
            filter.matches(e, &state.settings.ignored_assets)
                && !with_metrics.contains(&e.identifier)
        }))
    }

    fn list_metrics(&self) -> Result<Vec<EventMetric>> {
        Ok(self.lock().sorted_metrics())
    }
}

#[async_trait]
impl StaticCacheRepositoryTrait for InMemoryLedger {
    fn get(&self, key: StaticCacheKey) -> Result<Option<TimestampMs>> {
        let mut state = self.lock();
        let value = state.cache.get(&key).copied();
        if key == StaticCacheKey::StaleBalancesFromTs {
            if let Some(event) = state.insert_on_marker_read.take() {
                let timestamp = event.timestamp;
                state.store_event(event);
                state.mark_stale(timestamp, now_ms());
            }
        }
        Ok(value)
    }

    async fn set(&self, key: StaticCacheKey, value: TimestampMs) -> Result<()> {
        self.lock().cache.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: StaticCacheKey) -> Result<()> {
        self.lock().cache.remove(&key);
        Ok(())
    }

    async fn mark_stale(&self, from_ts: TimestampMs, modification_ts: TimestampMs) -> Result<()> {
        self.lock().mark_stale(from_ts, modification_ts);
        Ok(())
    }

    async fn clear_stale_marker(&self, processing_started_at: TimestampMs) -> Result<bool> {
        let mut state = self.lock();
        let modified_before_run = state
            .cache
            .get(&StaticCacheKey::StaleBalancesModificationTs)
            .is_some_and(|ts| *ts < processing_started_at);
        if modified_before_run {
            state.cache.remove(&StaticCacheKey::StaleBalancesFromTs);
            state.cache.remove(&StaticCacheKey::StaleBalancesModificationTs);
        }
        Ok(modified_before_run)
    }
}

#[async_trait]
impl SettingsRepositoryTrait for InMemoryLedger {
    fn get_settings(&self) -> Result<Settings> {
        Ok(self.lock().settings.clone())
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        let mut state = self.lock();
        if let Some(currency) = &update.main_currency {
            state.settings.main_currency = currency.clone();
        }
        if let Some(enabled) = update.auto_create_interest_events {
            state.settings.auto_create_interest_events = enabled;
        }
        Ok(())
    }

    async fn add_ignored_asset(&self, asset: &str) -> Result<()> {
        let mut state = self.lock();
        state.settings.ignored_assets.insert(asset.to_string());
        state.mark_stale(0, now_ms());
        Ok(())
    }

    async fn remove_ignored_asset(&self, asset: &str) -> Result<()> {
        let mut state = self.lock();
        state.settings.ignored_assets.remove(asset);
        state.mark_stale(0, now_ms());
        Ok(())
    }
}

/// Price table returning the latest price at or before the requested time.
#[derive(Default)]
pub struct StaticPriceService {
    prices: Mutex<HashMap<(String, String), Vec<(TimestampMs, Decimal)>>>,
}

impl StaticPriceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, from: &str, to: &str, ts: TimestampMs, price: Decimal) -> Self {
        self.prices
            .lock()
            .unwrap()
            .entry((from.to_string(), to.to_string()))
            .or_default()
            .push((ts, price));
        self
    }
}

impl PriceServiceTrait for StaticPriceService {
    fn get_price(
        &self,
        from_asset: &str,
        to_asset: &str,
        timestamp: TimestampMs,
    ) -> Result<Option<Decimal>> {
        let prices = self.prices.lock().unwrap();
        Ok(prices
            .get(&(from_asset.to_string(), to_asset.to_string()))
            .and_then(|series| {
                series
                    .iter()
                    .filter(|(ts, _)| *ts <= timestamp)
                    .max_by_key(|(ts, _)| *ts)
                    .map(|(_, price)| *price)
            }))
    }
}

/// Builder-style constructor for ledger events used across the tests.
pub fn new_event(
    group: &str,
    timestamp: TimestampMs,
    event_type: HistoryEventType,
    event_subtype: HistoryEventSubType,
    asset: &str,
    amount: Decimal,
) -> NewHistoryEvent {
    NewHistoryEvent {
        entry_type: HistoryEntryType::OnchainEvent,
        group_identifier: group.to_string(),
        sequence_index: 0,
        timestamp,
        location: "ethereum".to_string(),
        location_label: Some(WALLET.to_string()),
        asset: asset.to_string(),
        amount,
        event_type,
        event_subtype,
        notes: None,
        counterparty: None,
        address: None,
        is_virtual: false,
    }
}

pub const WALLET: &str = "0xwallet";

pub fn wallet_bucket(asset: &str) -> Bucket {
    Bucket::new("ethereum", Some(WALLET.to_string()), None, asset)
}

pub fn protocol_bucket(asset: &str, protocol: &str) -> Bucket {
    Bucket::new(
        "ethereum",
        Some(WALLET.to_string()),
        Some(protocol.to_string()),
        asset,
    )
}
