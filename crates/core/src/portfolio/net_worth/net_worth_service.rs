//! Net worth calculation service implementation.

use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::net_worth_model::{MissingPrice, NegativeBalanceEvent, NetWorthPoint, NetWorthSeries};
use super::net_worth_traits::NetWorthServiceTrait;
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{BalanceError, Result};
use crate::history::{
    EventDirection, HistoryEvent, HistoryEventFilter, HistoryEventRepositoryTrait,
    HistoryEventSubType, TimestampMs,
};
use crate::prices::PriceServiceTrait;
use crate::settings::SettingsRepositoryTrait;
use crate::utils::time_utils::{day_end_ms, day_start_ms, get_day_starts_between};

/// Service for calculating net worth from the ledger.
pub struct NetWorthService {
    history_repository: Arc<dyn HistoryEventRepositoryTrait>,
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
    price_service: Arc<dyn PriceServiceTrait>,
}

impl NetWorthService {
    pub fn new(
        history_repository: Arc<dyn HistoryEventRepositoryTrait>,
        settings_repository: Arc<dyn SettingsRepositoryTrait>,
        price_service: Arc<dyn PriceServiceTrait>,
    ) -> Self {
        Self {
            history_repository,
            settings_repository,
            price_service,
        }
    }

    /// Ledger events that change the portfolio's holdings. Staking moves
    /// value inside the portfolio without changing it.
    fn holdings_filter() -> HistoryEventFilter {
        HistoryEventFilter::new()
            .exclude_ignored_assets(true)
            .exclude_subtypes(vec![
                HistoryEventSubType::DepositAsset,
                HistoryEventSubType::RemoveAsset,
            ])
    }

    /// Applies one event to the per-asset balances.
    ///
    /// Returns the event when it would drive its asset below zero; balances
    /// are left untouched in that case.
    fn update_balances(
        event: &HistoryEvent,
        balances: &mut HashMap<String, Decimal>,
    ) -> Option<NegativeBalanceEvent> {
        match event.direction(false) {
            Some(EventDirection::In) => {
                *balances.entry(event.asset.clone()).or_default() += event.amount;
            }
            Some(EventDirection::Out) => {
                let current = balances.get(&event.asset).copied().unwrap_or_default();
                let new_balance = current - event.amount;
                if new_balance < Decimal::ZERO {
                    return Some(NegativeBalanceEvent {
                        identifier: event.identifier,
                        group_identifier: event.group_identifier.clone(),
                    });
                }
                if new_balance.is_zero() {
                    balances.remove(&event.asset);
                } else {
                    balances.insert(event.asset.clone(), new_balance);
                }
            }
            Some(EventDirection::Neutral) | None => {}
        }
        None
    }

    /// Values the balances of one day. Returns `None` for days without any
    /// non-zero balance.
    fn value_day(
        &self,
        day: TimestampMs,
        balances: &HashMap<String, Decimal>,
        main_currency: &str,
        missing_prices: &mut Vec<MissingPrice>,
    ) -> Result<Option<NetWorthPoint>> {
        if balances.is_empty() {
            return Ok(None);
        }

        let mut total = Decimal::ZERO;
        let mut assets: Vec<&String> = balances.keys().collect();
        assets.sort();
        for asset in assets {
            let amount = balances[asset];
            let price = if asset == main_currency {
                Some(Decimal::ONE)
            } else {
                self.price_service.get_price(asset, main_currency, day)?
            };
            match price {
                Some(price) => total += amount * price,
                None => {
                    warn!("Missing {} price for {} on day {}", main_currency, asset, day);
                    missing_prices.push(MissingPrice {
                        asset: asset.clone(),
                        timestamp: day,
                    });
                }
            }
        }

        Ok(Some(NetWorthPoint {
            timestamp: day,
            value: total.round_dp(DECIMAL_PRECISION),
        }))
    }
}

impl NetWorthServiceTrait for NetWorthService {
    fn get_net_worth(&self, from: TimestampMs, to: TimestampMs) -> Result<NetWorthSeries> {
        if from > to {
            return Err(BalanceError::InvalidRange { from, to }.into());
        }

        let settings = self.settings_repository.get_settings()?;
        let filter = Self::holdings_filter().to_ts(to);
        let events = self.history_repository.list_events(&filter)?;
        debug!("Calculating net worth from {} events", events.len());

        let mut series = NetWorthSeries::default();
        let Some(first_event) = events.first() else {
            return Ok(series);
        };
        let start = from.max(day_start_ms(first_event.timestamp));

        let mut balances: HashMap<String, Decimal> = HashMap::new();
        let mut pending = events.iter().peekable();
        for day in get_day_starts_between(start, to) {
            let day_end = day_end_ms(day).min(to);
            while let Some(event) = pending.next_if(|e| e.timestamp <= day_end) {
                if let Some(negative) = Self::update_balances(event, &mut balances) {
                    warn!(
                        "Negative balance for {} at event {}, stopping net worth calculation",
                        event.asset, event.identifier
                    );
                    series.negative_balance = Some(negative);
                    return Ok(series);
                }
            }
            if let Some(point) = self.value_day(
                day,
                &balances,
                &settings.main_currency,
                &mut series.missing_prices,
            )? {
                series.points.push(point);
            }
        }

        Ok(series)
    }

    fn get_address_balances(
        &self,
        address: &str,
        assets: &[String],
    ) -> Result<BTreeMap<String, Decimal>> {
        let filter = Self::holdings_filter()
            .assets(assets.to_vec())
            .location_labels(vec![address.to_string()]);
        let events = self.history_repository.list_events(&filter)?;
        if events.is_empty() {
            return Err(BalanceError::NoEventsForAddress {
                address: address.to_string(),
                assets: assets.to_vec(),
            }
            .into());
        }

        let mut balances: HashMap<String, Decimal> = HashMap::new();
        for event in &events {
            if Self::update_balances(event, &mut balances).is_some() {
                warn!(
                    "Skipping event {} of {}: it would make the {} balance negative",
                    event.identifier, address, event.asset
                );
            }
        }
        Ok(balances
            .into_iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .collect())
    }
}
