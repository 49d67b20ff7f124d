//! Historical balance queries.

use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::historical_model::{
    AssetBalance, DailyBalance, DailyBalances, HistoricalAmounts, HistoricalBalances,
};
use super::historical_traits::HistoricalBalancesServiceTrait;
use crate::cache::{StaticCacheKey, StaticCacheRepositoryTrait};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{BalanceError, Result};
use crate::history::{balance_neutral_pairs, HistoryEventFilter, TimestampMs};
use crate::portfolio::balances::{BalanceQuery, Bucket, EventMetricsRepositoryTrait};
use crate::prices::{PriceServiceTrait, ZERO_PRICE};
use crate::settings::SettingsRepositoryTrait;
use crate::utils::time_utils::{day_end_ms, get_day_starts_between};

pub struct HistoricalBalancesService {
    metrics_repository: Arc<dyn EventMetricsRepositoryTrait>,
    cache_repository: Arc<dyn StaticCacheRepositoryTrait>,
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
    price_service: Arc<dyn PriceServiceTrait>,
}

impl HistoricalBalancesService {
    pub fn new(
        metrics_repository: Arc<dyn EventMetricsRepositoryTrait>,
        cache_repository: Arc<dyn StaticCacheRepositoryTrait>,
        settings_repository: Arc<dyn SettingsRepositoryTrait>,
        price_service: Arc<dyn PriceServiceTrait>,
    ) -> Self {
        Self {
            metrics_repository,
            cache_repository,
            settings_repository,
            price_service,
        }
    }

    fn resolve_price(
        &self,
        asset: &str,
        main_currency: &str,
        timestamp: TimestampMs,
    ) -> Result<Decimal> {
        if asset == main_currency {
            return Ok(Decimal::ONE);
        }
        match self.price_service.get_price(asset, main_currency, timestamp)? {
            Some(price) => Ok(price),
            None => {
                warn!(
                    "No {} price found for {} at {}, using zero",
                    main_currency, asset, timestamp
                );
                Ok(ZERO_PRICE)
            }
        }
    }
}

fn check_range(from: TimestampMs, to: TimestampMs) -> Result<()> {
    if from > to {
        return Err(BalanceError::InvalidRange { from, to }.into());
    }
    Ok(())
}

/// Sums bucket balances per asset, keeping positive totals of non-ignored assets.
fn totals_by_asset<'a>(
    balances: impl Iterator<Item = (&'a Bucket, Decimal)>,
    ignored_assets: &HashSet<String>,
) -> BTreeMap<String, Decimal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for (bucket, balance) in balances {
        if ignored_assets.contains(&bucket.asset) {
            continue;
        }
        *totals.entry(bucket.asset.clone()).or_default() += balance;
    }
    totals.retain(|_, amount| *amount > Decimal::ZERO);
    totals
}

impl HistoricalBalancesServiceTrait for HistoricalBalancesService {
    fn get_balances(&self, query: &BalanceQuery) -> Result<HistoricalBalances> {
        let settings = self.settings_repository.get_settings()?;
        let bucket_balances = self.metrics_repository.get_latest_bucket_balances(query)?;
        debug!(
            "Found {} bucket balances at {}",
            bucket_balances.len(),
            query.timestamp
        );

        let totals = totals_by_asset(
            bucket_balances.iter().map(|b| (&b.bucket, b.balance)),
            &settings.ignored_assets,
        );
        let balances = totals
            .into_iter()
            .map(|(asset, amount)| {
                let price = self.resolve_price(&asset, &settings.main_currency, query.timestamp)?;
                Ok(AssetBalance {
                    value: (amount * price).round_dp(DECIMAL_PRECISION),
                    asset,
                    amount,
                    price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut filter = HistoryEventFilter::new().to_ts(query.timestamp);
        filter.assets = query.assets.clone();
        filter.location = query.location.clone();
        filter.location_labels = query.location_label.clone().map(|label| vec![label]);

        Ok(HistoricalBalances {
            processing_required: self.processing_required(&filter)?,
            balances: (!balances.is_empty()).then_some(balances),
        })
    }

    fn get_asset_amounts(
        &self,
        assets: &[String],
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<HistoricalAmounts> {
        check_range(from, to)?;
        let mut transitions = self
            .metrics_repository
            .get_metric_transitions(Some(assets), from, to)?;
        transitions.sort_by_key(|t| t.sort_key());

        let mut amounts = BTreeMap::new();
        let mut running = Decimal::ZERO;
        for transition in &transitions {
            running += transition.delta();
            amounts.insert(transition.timestamp, running.normalize());
        }

        let filter = HistoryEventFilter::new()
            .assets(assets.to_vec())
            .from_ts(from)
            .to_ts(to);
        Ok(HistoricalAmounts {
            processing_required: self.processing_required(&filter)?,
            amounts: (!amounts.is_empty()).then_some(amounts),
        })
    }

    fn get_daily_balances(
        &self,
        assets: Option<&[String]>,
        from: TimestampMs,
        to: TimestampMs,
    ) -> Result<DailyBalances> {
        check_range(from, to)?;
        let settings = self.settings_repository.get_settings()?;

        let mut bucket_balances: HashMap<Bucket, Decimal> = self
            .metrics_repository
            .load_latest_balances_before(from)?
            .into_iter()
            .filter(|(bucket, _)| assets.map_or(true, |a| a.contains(&bucket.asset)))
            .collect();
        let mut transitions = self
            .metrics_repository
            .get_metric_transitions(assets, from, to)?;
        transitions.sort_by_key(|t| t.sort_key());

        let mut days = Vec::new();
        let mut pending = transitions.into_iter().peekable();
        for day in get_day_starts_between(from, to) {
            let day_end = day_end_ms(day).min(to);
            while let Some(transition) = pending.next_if(|t| t.timestamp <= day_end) {
                bucket_balances.insert(transition.bucket, transition.balance);
            }
            let totals = totals_by_asset(
                bucket_balances.iter().map(|(bucket, balance)| (bucket, *balance)),
                &settings.ignored_assets,
            );
            if !totals.is_empty() {
                days.push(DailyBalance {
                    timestamp: day,
                    balances: totals,
                });
            }
        }

        let mut filter = HistoryEventFilter::new().from_ts(from).to_ts(to);
        filter.assets = assets.map(|a| a.to_vec());
        Ok(DailyBalances {
            processing_required: self.processing_required(&filter)?,
            days: (!days.is_empty()).then_some(days),
        })
    }

    /// False when balances are not stale. Otherwise looks for events in scope
    /// that move a balance and have no metric row; after a completed run only
    /// events from the stale point onwards need checking.
    fn processing_required(&self, filter: &HistoryEventFilter) -> Result<bool> {
        let Some(marker) = self.cache_repository.get_stale_marker()? else {
            return Ok(false);
        };

        let mut filter = filter
            .clone()
            .exclude_ignored_assets(true)
            .exclude_type_pairs(balance_neutral_pairs());
        if self
            .cache_repository
            .get(StaticCacheKey::LastHistoricalBalanceProcessingTs)?
            .is_some()
        {
            filter.from_ts = Some(
                filter
                    .from_ts
                    .map_or(marker.from_ts, |from| from.max(marker.from_ts)),
            );
        }
        self.metrics_repository.has_events_missing_metrics(&filter)
    }
}
