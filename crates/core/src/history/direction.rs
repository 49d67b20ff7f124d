//! Balance direction of ledger events.

use serde::{Deserialize, Serialize};

use super::history_model::{HistoryEventSubType as Sub, HistoryEventType as Type};

/// Whether an event increases, decreases, or leaves a balance alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventDirection {
    In,
    Out,
    Neutral,
}

impl EventDirection {
    pub fn opposite(self) -> Self {
        match self {
            EventDirection::In => EventDirection::Out,
            EventDirection::Out => EventDirection::In,
            EventDirection::Neutral => EventDirection::Neutral,
        }
    }
}

/// Direction of a (type, subtype) pair. `None` means the pair carries no
/// determinable direction.
///
/// `for_balance_tracking` makes plain transfers count as outgoing. Outside of
/// balance tracking a transfer between own accounts nets to nothing.
pub fn event_direction(
    event_type: Type,
    event_subtype: Sub,
    for_balance_tracking: bool,
) -> Option<EventDirection> {
    use EventDirection::*;

    match (event_type, event_subtype) {
        (Type::Informational | Type::Renew | Type::Fail, _) => Some(Neutral),
        (_, Sub::Fee) => Some(Out),
        (_, Sub::Approve | Sub::Governance | Sub::PlaceOrder | Sub::Fail) => Some(Neutral),
        (Type::Transfer, Sub::None) => Some(if for_balance_tracking { Out } else { Neutral }),
        (Type::Transfer, Sub::Donate) => Some(Out),
        (Type::Transfer, _) => None,
        (Type::Receive | Type::Withdrawal | Type::Mint, _) => Some(In),
        (Type::Spend | Type::Deposit | Type::Loss | Type::Burn, _) => Some(Out),
        (Type::Staking, Sub::DepositAsset) => Some(Out),
        (Type::Staking, Sub::RemoveAsset | Sub::Reward) => Some(In),
        (Type::Staking, _) => Some(Neutral),
        (Type::Trade | Type::Migrate | Type::Adjustment, Sub::Receive) => Some(In),
        (Type::Trade | Type::Migrate | Type::Adjustment, Sub::Spend) => Some(Out),
        (Type::Trade | Type::Migrate | Type::Adjustment, _) => None,
    }
}

/// Every (type, subtype) pair that never moves a tracked balance.
pub fn balance_neutral_pairs() -> Vec<(Type, Sub)> {
    Type::ALL
        .iter()
        .flat_map(|t| Sub::ALL.iter().map(move |s| (*t, *s)))
        .filter(|(t, s)| {
            !matches!(
                event_direction(*t, *s, true),
                Some(EventDirection::In | EventDirection::Out)
            )
        })
        .collect()
}
