//! Unit tests for net worth service.

use super::*;
use crate::constants::DAY_IN_MS;
use crate::history::{HistoryEventSubType as Sub, HistoryEventType as Type, NewHistoryEvent};
use crate::settings::SettingsRepositoryTrait;
use crate::errors::{BalanceError, Error};
use crate::testing::{new_event, InMemoryLedger, StaticPriceService, WALLET};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const T0: i64 = 1_672_531_200_000;

fn day(n: i64) -> i64 {
    T0 + n * DAY_IN_MS
}

fn prices() -> StaticPriceService {
    StaticPriceService::new()
        .with_price("BTC", "USD", T0, dec!(100))
        .with_price("BTC", "USD", day(2), dec!(120))
        .with_price("ETH", "USD", T0, dec!(10))
}

async fn service_for(
    events: Vec<NewHistoryEvent>,
    prices: StaticPriceService,
) -> (InMemoryLedger, NetWorthService) {
    let ledger = InMemoryLedger::new();
    ledger.seed(events).await;
    let repository = Arc::new(ledger.clone());
    let service = NetWorthService::new(repository.clone(), repository, Arc::new(prices));
    (ledger, service)
}

fn values(series: &NetWorthSeries) -> Vec<(i64, Decimal)> {
    series.points.iter().map(|p| (p.timestamp, p.value)).collect()
}

#[tokio::test]
async fn test_days_without_balances_are_omitted() {
    let (_, service) = service_for(
        vec![
            new_event("btc-in", T0 + 1_000, Type::Receive, Sub::None, "BTC", dec!(1)),
            new_event("btc-out", day(1) + 1_000, Type::Spend, Sub::None, "BTC", dec!(1)),
            new_event("eth-in", day(2) + 1_000, Type::Receive, Sub::None, "ETH", dec!(2)),
        ],
        prices(),
    )
    .await;

    let series = service.get_net_worth(T0, day(2) + 5_000).unwrap();
    assert_eq!(values(&series), vec![(T0, dec!(100)), (day(2), dec!(20))]);
    assert!(series.missing_prices.is_empty());
    assert_eq!(series.negative_balance, None);
}

#[tokio::test]
async fn test_balances_before_range_are_carried_in() {
    let (_, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(2)),
            new_event("usd-in", day(1), Type::Receive, Sub::None, "USD", dec!(50)),
        ],
        prices(),
    )
    .await;

    let series = service.get_net_worth(day(1), day(2)).unwrap();
    assert_eq!(
        values(&series),
        vec![(day(1), dec!(250)), (day(2), dec!(290))]
    );
}

#[tokio::test]
async fn test_range_before_first_event_starts_at_first_event_day() {
    let (_, service) = service_for(
        vec![new_event("btc-in", day(1) + 10, Type::Receive, Sub::None, "BTC", dec!(1))],
        prices(),
    )
    .await;

    let series = service.get_net_worth(T0 - 10 * DAY_IN_MS, day(1) + 20).unwrap();
    assert_eq!(values(&series), vec![(day(1), dec!(100))]);
}

#[tokio::test]
async fn test_negative_balance_stops_calculation() {
    let (ledger, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(1)),
            new_event("btc-overspend", day(1), Type::Spend, Sub::None, "BTC", dec!(2)),
            new_event("btc-in-2", day(2), Type::Receive, Sub::None, "BTC", dec!(5)),
        ],
        prices(),
    )
    .await;
    let overspend = ledger
        .events()
        .into_iter()
        .find(|e| e.group_identifier == "btc-overspend")
        .unwrap();

    let series = service.get_net_worth(T0, day(2)).unwrap();
    assert_eq!(values(&series), vec![(T0, dec!(100))]);
    assert_eq!(
        series.negative_balance,
        Some(NegativeBalanceEvent {
            identifier: overspend.identifier,
            group_identifier: "btc-overspend".to_string(),
        })
    );
}

#[tokio::test]
async fn test_missing_prices_are_reported_per_day() {
    let (_, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(1)),
            new_event("doge-in", T0, Type::Receive, Sub::None, "DOGE", dec!(1000)),
        ],
        prices(),
    )
    .await;

    let series = service.get_net_worth(T0, day(1)).unwrap();
    assert_eq!(values(&series), vec![(T0, dec!(100)), (day(1), dec!(100))]);
    assert_eq!(
        series.missing_prices,
        vec![
            MissingPrice {
                asset: "DOGE".to_string(),
                timestamp: T0,
            },
            MissingPrice {
                asset: "DOGE".to_string(),
                timestamp: day(1),
            },
        ]
    );
}

#[tokio::test]
async fn test_staking_and_own_transfers_do_not_change_net_worth() {
    let mut transfer = new_event("move", T0 + 2_000, Type::Transfer, Sub::None, "BTC", dec!(1));
    transfer.address = Some("0xcold".to_string());
    let (_, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(1)),
            new_event("stake", T0 + 1_000, Type::Staking, Sub::DepositAsset, "BTC", dec!(1)),
            transfer,
        ],
        prices(),
    )
    .await;

    let series = service.get_net_worth(T0, T0 + 5_000).unwrap();
    assert_eq!(values(&series), vec![(T0, dec!(100))]);
}

#[tokio::test]
async fn test_ignored_assets_are_excluded() {
    let (ledger, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(1)),
            new_event("scam-in", T0, Type::Receive, Sub::Airdrop, "SCAM", dec!(1)),
        ],
        prices(),
    )
    .await;
    ledger.add_ignored_asset("SCAM").await.unwrap();

    let series = service.get_net_worth(T0, T0 + 1).unwrap();
    assert_eq!(values(&series), vec![(T0, dec!(100))]);
    assert!(series.missing_prices.is_empty());
}

#[tokio::test]
async fn test_empty_ledger_and_invalid_range() {
    let (_, service) = service_for(Vec::new(), prices()).await;
    assert_eq!(
        service.get_net_worth(T0, day(3)).unwrap(),
        NetWorthSeries::default()
    );
    assert!(service.get_net_worth(day(3), T0).is_err());
}

#[tokio::test]
async fn test_address_balances_replay_only_that_address() {
    let mut other_wallet = new_event("other", T0, Type::Receive, Sub::None, "BTC", dec!(9));
    other_wallet.location_label = Some("0xother".to_string());
    let (_, service) = service_for(
        vec![
            new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(2)),
            new_event("btc-out", day(1), Type::Spend, Sub::None, "BTC", dec!(0.5)),
            new_event("eth-in", day(1), Type::Receive, Sub::None, "ETH", dec!(3)),
            new_event("eth-out", day(2), Type::Spend, Sub::None, "ETH", dec!(3)),
            new_event("btc-overspend", day(3), Type::Spend, Sub::None, "BTC", dec!(5)),
            other_wallet,
        ],
        prices(),
    )
    .await;

    let assets = vec!["BTC".to_string(), "ETH".to_string()];
    let balances = service.get_address_balances(WALLET, &assets).unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances["BTC"], dec!(1.5));

    let btc_only = service
        .get_address_balances("0xother", &["BTC".to_string()])
        .unwrap();
    assert_eq!(btc_only["BTC"], dec!(9));
}

#[tokio::test]
async fn test_address_without_events_is_an_error() {
    let (_, service) = service_for(
        vec![new_event("btc-in", T0, Type::Receive, Sub::None, "BTC", dec!(2))],
        prices(),
    )
    .await;

    let result = service.get_address_balances(WALLET, &["ETH".to_string()]);
    assert!(matches!(
        result,
        Err(Error::Balance(BalanceError::NoEventsForAddress { ref address, .. }))
            if address == WALLET
    ));
}
