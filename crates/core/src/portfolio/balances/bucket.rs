//! Mapping of ledger events onto balance buckets.

use serde::{Deserialize, Serialize};

use crate::history::{
    EventDirection, HistoryEvent, HistoryEventSubType as Sub, HistoryEventType as Type,
};

/// Subtypes tracked against the issuing protocol instead of the wallet.
pub const PROTOCOL_BUCKET_SUBTYPES: [Sub; 4] = [
    Sub::ReceiveWrapped,
    Sub::GenerateDebt,
    Sub::ReturnWrapped,
    Sub::PaybackDebt,
];

/// Protocol withdrawals that may reveal yield earned inside the protocol.
pub const PROTOCOL_WITHDRAWAL_EVENTS: [(Type, Sub); 2] = [
    (Type::Withdrawal, Sub::WithdrawFromProtocol),
    (Type::Staking, Sub::RemoveAsset),
];

/// Events that move a balance between the wallet and a protocol.
pub const DUAL_BUCKET_PROTOCOL_EVENTS: [(Type, Sub); 4] = [
    (Type::Withdrawal, Sub::WithdrawFromProtocol),
    (Type::Staking, Sub::RemoveAsset),
    (Type::Deposit, Sub::DepositToProtocol),
    (Type::Staking, Sub::DepositAsset),
];

/// Events that move a balance from the sender to the receiver.
pub const DUAL_BUCKET_TRANSFER_EVENTS: [(Type, Sub); 2] =
    [(Type::Transfer, Sub::None), (Type::Transfer, Sub::Donate)];

/// Events that move a protocol token into another protocol and back.
pub const DUAL_BUCKET_WRAPPED_EVENTS: [(Type, Sub); 2] = [
    (Type::Deposit, Sub::DepositForWrapped),
    (Type::Withdrawal, Sub::RedeemWrapped),
];

/// One place a balance of an asset is held. `protocol == None` is the
/// wallet/account itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub location: String,
    pub location_label: Option<String>,
    pub protocol: Option<String>,
    pub asset: String,
}

impl Bucket {
    pub fn new(
        location: impl Into<String>,
        location_label: Option<String>,
        protocol: Option<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            location_label,
            protocol,
            asset: asset.into(),
        }
    }

    fn for_event(event: &HistoryEvent, protocol: Option<String>) -> Self {
        Self::new(
            event.location.clone(),
            event.location_label.clone(),
            protocol,
            event.asset.clone(),
        )
    }

    pub fn is_protocol(&self) -> bool {
        self.protocol.is_some()
    }
}

/// Effect of one event on one bucket. Direction is always `In` or `Out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEffect {
    pub bucket: Bucket,
    pub direction: EventDirection,
}

impl BucketEffect {
    fn new(bucket: Bucket, direction: EventDirection) -> Self {
        Self { bucket, direction }
    }
}

/// Whether an overspending event of this kind may be reconciled with a
/// synthetic interest event.
pub fn is_interest_eligible_withdrawal(event_type: Type, event_subtype: Sub) -> bool {
    PROTOCOL_WITHDRAWAL_EVENTS.contains(&(event_type, event_subtype))
}

fn is_moving(direction: Option<EventDirection>) -> Option<EventDirection> {
    direction.filter(|d| matches!(d, EventDirection::In | EventDirection::Out))
}

/// Buckets affected by `event`, first matching rule wins:
///
/// 1. Protocol deposits and withdrawals move the wallet and the protocol bucket in opposite directions.
/// 2. Transfers move the sender bucket out and the receiver (`address`) bucket in.
/// 3. Wrapped protocol tokens move between the asset's protocol and the counterparty.
/// 4. Otherwise the generic balance-tracking direction applies, neutral events have no effect.
/// 5. Wrapped receipts and debt are booked in the counterparty's bucket.
/// 6. Anything else lands in the wallet bucket, or the asset's own protocol bucket.
pub fn buckets_for(event: &HistoryEvent) -> Vec<BucketEffect> {
    let pair = event.type_pair();

    if DUAL_BUCKET_PROTOCOL_EVENTS.contains(&pair) {
        if let (Some(counterparty), Some(wallet_direction)) =
            (&event.counterparty, is_moving(event.direction(true)))
        {
            return vec![
                BucketEffect::new(
                    Bucket::for_event(event, event.asset_protocol.clone()),
                    wallet_direction,
                ),
                BucketEffect::new(
                    Bucket::for_event(event, Some(counterparty.clone())),
                    wallet_direction.opposite(),
                ),
            ];
        }
    }

    if DUAL_BUCKET_TRANSFER_EVENTS.contains(&pair) {
        if let Some(address) = &event.address {
            let protocol = event.asset_protocol.clone();
            return vec![
                BucketEffect::new(Bucket::for_event(event, protocol.clone()), EventDirection::Out),
                BucketEffect::new(
                    Bucket::new(
                        event.location.clone(),
                        Some(address.clone()),
                        protocol,
                        event.asset.clone(),
                    ),
                    EventDirection::In,
                ),
            ];
        }
    }

    if DUAL_BUCKET_WRAPPED_EVENTS.contains(&pair) {
        if let (Some(asset_protocol), Some(counterparty)) =
            (&event.asset_protocol, &event.counterparty)
        {
            let (source, destination) = if event.event_subtype == Sub::DepositForWrapped {
                (asset_protocol, counterparty)
            } else {
                (counterparty, asset_protocol)
            };
            return vec![
                BucketEffect::new(
                    Bucket::for_event(event, Some(source.clone())),
                    EventDirection::Out,
                ),
                BucketEffect::new(
                    Bucket::for_event(event, Some(destination.clone())),
                    EventDirection::In,
                ),
            ];
        }
    }

    let Some(direction) = is_moving(event.direction(true)) else {
        return Vec::new();
    };

    if let Some(counterparty) = &event.counterparty {
        if PROTOCOL_BUCKET_SUBTYPES.contains(&event.event_subtype) {
            return vec![BucketEffect::new(
                Bucket::for_event(event, Some(counterparty.clone())),
                direction,
            )];
        }
    }

    vec![BucketEffect::new(
        Bucket::for_event(event, event.asset_protocol.clone()),
        direction,
    )]
}
