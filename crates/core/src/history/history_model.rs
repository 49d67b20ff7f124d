//! Ledger event domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use super::direction::{event_direction, EventDirection};
use super::history_constants::*;
use crate::errors::{Result, ValidationError};

/// Milliseconds since the Unix epoch, UTC.
pub type TimestampMs = i64;

/// Semantic type of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    Trade,
    Staking,
    Deposit,
    Withdrawal,
    Transfer,
    Spend,
    Receive,
    Adjustment,
    Informational,
    Migrate,
    Renew,
    Fail,
    Loss,
    Mint,
    Burn,
}

impl HistoryEventType {
    pub const ALL: [HistoryEventType; 15] = [
        HistoryEventType::Trade,
        HistoryEventType::Staking,
        HistoryEventType::Deposit,
        HistoryEventType::Withdrawal,
        HistoryEventType::Transfer,
        HistoryEventType::Spend,
        HistoryEventType::Receive,
        HistoryEventType::Adjustment,
        HistoryEventType::Informational,
        HistoryEventType::Migrate,
        HistoryEventType::Renew,
        HistoryEventType::Fail,
        HistoryEventType::Loss,
        HistoryEventType::Mint,
        HistoryEventType::Burn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventType::Trade => EVENT_TYPE_TRADE,
            HistoryEventType::Staking => EVENT_TYPE_STAKING,
            HistoryEventType::Deposit => EVENT_TYPE_DEPOSIT,
            HistoryEventType::Withdrawal => EVENT_TYPE_WITHDRAWAL,
            HistoryEventType::Transfer => EVENT_TYPE_TRANSFER,
            HistoryEventType::Spend => EVENT_TYPE_SPEND,
            HistoryEventType::Receive => EVENT_TYPE_RECEIVE,
            HistoryEventType::Adjustment => EVENT_TYPE_ADJUSTMENT,
            HistoryEventType::Informational => EVENT_TYPE_INFORMATIONAL,
            HistoryEventType::Migrate => EVENT_TYPE_MIGRATE,
            HistoryEventType::Renew => EVENT_TYPE_RENEW,
            HistoryEventType::Fail => EVENT_TYPE_FAIL,
            HistoryEventType::Loss => EVENT_TYPE_LOSS,
            HistoryEventType::Mint => EVENT_TYPE_MINT,
            HistoryEventType::Burn => EVENT_TYPE_BURN,
        }
    }
}

impl FromStr for HistoryEventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HistoryEventType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown event type: {}", s))
    }
}

/// Finer classification of a ledger event within its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventSubType {
    None,
    Reward,
    DepositAsset,
    RemoveAsset,
    Fee,
    Spend,
    Receive,
    Approve,
    Deploy,
    Interest,
    Donate,
    DepositToProtocol,
    WithdrawFromProtocol,
    GenerateDebt,
    PaybackDebt,
    ReceiveWrapped,
    ReturnWrapped,
    DepositForWrapped,
    RedeemWrapped,
    Governance,
    Airdrop,
    PlaceOrder,
    Bridge,
    Liquidate,
    Payment,
    Grant,
    Cashback,
    Refund,
    Hack,
    Clawback,
    Fail,
}

impl HistoryEventSubType {
    pub const ALL: [HistoryEventSubType; 31] = [
        HistoryEventSubType::None,
        HistoryEventSubType::Reward,
        HistoryEventSubType::DepositAsset,
        HistoryEventSubType::RemoveAsset,
        HistoryEventSubType::Fee,
        HistoryEventSubType::Spend,
        HistoryEventSubType::Receive,
        HistoryEventSubType::Approve,
        HistoryEventSubType::Deploy,
        HistoryEventSubType::Interest,
        HistoryEventSubType::Donate,
        HistoryEventSubType::DepositToProtocol,
        HistoryEventSubType::WithdrawFromProtocol,
        HistoryEventSubType::GenerateDebt,
        HistoryEventSubType::PaybackDebt,
        HistoryEventSubType::ReceiveWrapped,
        HistoryEventSubType::ReturnWrapped,
        HistoryEventSubType::DepositForWrapped,
        HistoryEventSubType::RedeemWrapped,
        HistoryEventSubType::Governance,
        HistoryEventSubType::Airdrop,
        HistoryEventSubType::PlaceOrder,
        HistoryEventSubType::Bridge,
        HistoryEventSubType::Liquidate,
        HistoryEventSubType::Payment,
        HistoryEventSubType::Grant,
        HistoryEventSubType::Cashback,
        HistoryEventSubType::Refund,
        HistoryEventSubType::Hack,
        HistoryEventSubType::Clawback,
        HistoryEventSubType::Fail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventSubType::None => EVENT_SUBTYPE_NONE,
            HistoryEventSubType::Reward => EVENT_SUBTYPE_REWARD,
            HistoryEventSubType::DepositAsset => EVENT_SUBTYPE_DEPOSIT_ASSET,
            HistoryEventSubType::RemoveAsset => EVENT_SUBTYPE_REMOVE_ASSET,
            HistoryEventSubType::Fee => EVENT_SUBTYPE_FEE,
            HistoryEventSubType::Spend => EVENT_SUBTYPE_SPEND,
            HistoryEventSubType::Receive => EVENT_SUBTYPE_RECEIVE,
            HistoryEventSubType::Approve => EVENT_SUBTYPE_APPROVE,
            HistoryEventSubType::Deploy => EVENT_SUBTYPE_DEPLOY,
            HistoryEventSubType::Interest => EVENT_SUBTYPE_INTEREST,
            HistoryEventSubType::Donate => EVENT_SUBTYPE_DONATE,
            HistoryEventSubType::DepositToProtocol => EVENT_SUBTYPE_DEPOSIT_TO_PROTOCOL,
            HistoryEventSubType::WithdrawFromProtocol => EVENT_SUBTYPE_WITHDRAW_FROM_PROTOCOL,
            HistoryEventSubType::GenerateDebt => EVENT_SUBTYPE_GENERATE_DEBT,
            HistoryEventSubType::PaybackDebt => EVENT_SUBTYPE_PAYBACK_DEBT,
            HistoryEventSubType::ReceiveWrapped => EVENT_SUBTYPE_RECEIVE_WRAPPED,
            HistoryEventSubType::ReturnWrapped => EVENT_SUBTYPE_RETURN_WRAPPED,
            HistoryEventSubType::DepositForWrapped => EVENT_SUBTYPE_DEPOSIT_FOR_WRAPPED,
            HistoryEventSubType::RedeemWrapped => EVENT_SUBTYPE_REDEEM_WRAPPED,
            HistoryEventSubType::Governance => EVENT_SUBTYPE_GOVERNANCE,
            HistoryEventSubType::Airdrop => EVENT_SUBTYPE_AIRDROP,
            HistoryEventSubType::PlaceOrder => EVENT_SUBTYPE_PLACE_ORDER,
            HistoryEventSubType::Bridge => EVENT_SUBTYPE_BRIDGE,
            HistoryEventSubType::Liquidate => EVENT_SUBTYPE_LIQUIDATE,
            HistoryEventSubType::Payment => EVENT_SUBTYPE_PAYMENT,
            HistoryEventSubType::Grant => EVENT_SUBTYPE_GRANT,
            HistoryEventSubType::Cashback => EVENT_SUBTYPE_CASHBACK,
            HistoryEventSubType::Refund => EVENT_SUBTYPE_REFUND,
            HistoryEventSubType::Hack => EVENT_SUBTYPE_HACK,
            HistoryEventSubType::Clawback => EVENT_SUBTYPE_CLAWBACK,
            HistoryEventSubType::Fail => EVENT_SUBTYPE_FAIL,
        }
    }
}

impl FromStr for HistoryEventSubType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HistoryEventSubType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown event subtype: {}", s))
    }
}

/// Kind of ledger entry. Only on-chain events can be augmented with
/// processor-generated events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEntryType {
    #[default]
    HistoryEvent,
    OnchainEvent,
    EthWithdrawalEvent,
    EthBlockEvent,
    EthDepositEvent,
}

impl HistoryEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEntryType::HistoryEvent => ENTRY_TYPE_HISTORY_EVENT,
            HistoryEntryType::OnchainEvent => ENTRY_TYPE_ONCHAIN_EVENT,
            HistoryEntryType::EthWithdrawalEvent => ENTRY_TYPE_ETH_WITHDRAWAL_EVENT,
            HistoryEntryType::EthBlockEvent => ENTRY_TYPE_ETH_BLOCK_EVENT,
            HistoryEntryType::EthDepositEvent => ENTRY_TYPE_ETH_DEPOSIT_EVENT,
        }
    }

    pub fn supports_synthetic_events(&self) -> bool {
        matches!(self, HistoryEntryType::OnchainEvent)
    }
}

impl FromStr for HistoryEntryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            s if s == ENTRY_TYPE_HISTORY_EVENT => Ok(HistoryEntryType::HistoryEvent),
            s if s == ENTRY_TYPE_ONCHAIN_EVENT => Ok(HistoryEntryType::OnchainEvent),
            s if s == ENTRY_TYPE_ETH_WITHDRAWAL_EVENT => Ok(HistoryEntryType::EthWithdrawalEvent),
            s if s == ENTRY_TYPE_ETH_BLOCK_EVENT => Ok(HistoryEntryType::EthBlockEvent),
            s if s == ENTRY_TYPE_ETH_DEPOSIT_EVENT => Ok(HistoryEntryType::EthDepositEvent),
            _ => Err(format!("Unknown entry type: {}", s)),
        }
    }
}

/// A stored ledger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub identifier: i64,
    pub entry_type: HistoryEntryType,
    pub group_identifier: String,
    pub sequence_index: i32,
    pub timestamp: TimestampMs,
    pub location: String,
    pub location_label: Option<String>,
    pub asset: String,
    /// Protocol the asset itself belongs to (LP and receipt tokens).
    pub asset_protocol: Option<String>,
    pub amount: Decimal,
    pub event_type: HistoryEventType,
    pub event_subtype: HistoryEventSubType,
    pub notes: Option<String>,
    pub counterparty: Option<String>,
    pub address: Option<String>,
    pub is_virtual: bool,
}

impl HistoryEvent {
    pub fn direction(&self, for_balance_tracking: bool) -> Option<EventDirection> {
        event_direction(self.event_type, self.event_subtype, for_balance_tracking)
    }

    /// Ledger order: timestamp, then position inside the group, then insertion order.
    pub fn sort_key(&self) -> (TimestampMs, i32, i64) {
        (self.timestamp, self.sequence_index, self.identifier)
    }

    pub fn type_pair(&self) -> (HistoryEventType, HistoryEventSubType) {
        (self.event_type, self.event_subtype)
    }
}

/// Input model for creating a ledger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEvent {
    #[serde(default)]
    pub entry_type: HistoryEntryType,
    pub group_identifier: String,
    pub sequence_index: i32,
    pub timestamp: TimestampMs,
    pub location: String,
    pub location_label: Option<String>,
    pub asset: String,
    pub amount: Decimal,
    pub event_type: HistoryEventType,
    pub event_subtype: HistoryEventSubType,
    pub notes: Option<String>,
    pub counterparty: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl NewHistoryEvent {
    pub fn validate(&self) -> Result<()> {
        if self.group_identifier.trim().is_empty() {
            return Err(ValidationError::MissingField("groupIdentifier".to_string()).into());
        }
        if self.asset.trim().is_empty() {
            return Err(ValidationError::MissingField("asset".to_string()).into());
        }
        if self.sequence_index < 0 {
            return Err(ValidationError::InvalidInput(format!(
                "Sequence index must not be negative, got {}",
                self.sequence_index
            ))
            .into());
        }
        if self.amount.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "Event amount must not be negative, got {}",
                self.amount
            ))
            .into());
        }
        Ok(())
    }
}

/// Asset registry entry. `protocol` is set for tokens custodied by a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub identifier: String,
    pub name: Option<String>,
    pub protocol: Option<String>,
}

/// Ledger rewrite that books the yield found in a protocol withdrawal.
/// Repositories apply it in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InterestBooking {
    /// The whole withdrawal is yield: the event itself becomes the interest event.
    Convert { identifier: i64, notes: String },
    /// The withdrawal keeps `remaining_amount` and `interest` takes its
    /// sequence index. The withdrawal and later group events move up by one.
    Split {
        identifier: i64,
        remaining_amount: Decimal,
        notes: Option<String>,
        interest: NewHistoryEvent,
    },
}

impl InterestBooking {
    /// Books `interest` out of `withdrawal`, earned in `protocol`.
    pub fn for_withdrawal(withdrawal: &HistoryEvent, interest: Decimal, protocol: &str) -> Self {
        let interest_notes = format!("Interest earned from {} in {}", withdrawal.asset, protocol);
        let remaining_amount = (withdrawal.amount - interest).normalize();
        if remaining_amount.is_zero() {
            return InterestBooking::Convert {
                identifier: withdrawal.identifier,
                notes: interest_notes,
            };
        }

        let old_amount = format!(" {} ", withdrawal.amount.normalize());
        let new_amount = format!(" {} ", remaining_amount);
        InterestBooking::Split {
            identifier: withdrawal.identifier,
            remaining_amount,
            notes: withdrawal
                .notes
                .as_ref()
                .map(|notes| notes.replace(&old_amount, &new_amount)),
            interest: NewHistoryEvent {
                entry_type: withdrawal.entry_type,
                group_identifier: withdrawal.group_identifier.clone(),
                sequence_index: withdrawal.sequence_index,
                timestamp: withdrawal.timestamp,
                location: withdrawal.location.clone(),
                location_label: withdrawal.location_label.clone(),
                asset: withdrawal.asset.clone(),
                amount: interest.normalize(),
                event_type: HistoryEventType::Receive,
                event_subtype: HistoryEventSubType::Interest,
                notes: Some(interest_notes),
                counterparty: Some(protocol.to_string()),
                address: withdrawal.address.clone(),
                is_virtual: true,
            },
        }
    }
}

/// Ledger query predicate. Results are always returned in ledger order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryEventFilter {
    pub from_ts: Option<TimestampMs>,
    pub to_ts: Option<TimestampMs>,
    pub assets: Option<Vec<String>>,
    pub location: Option<String>,
    pub location_labels: Option<Vec<String>>,
    pub group_identifiers: Option<Vec<String>>,
    pub exclude_subtypes: Vec<HistoryEventSubType>,
    pub exclude_type_pairs: Vec<(HistoryEventType, HistoryEventSubType)>,
    pub exclude_ignored_assets: bool,
}

impl HistoryEventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ts(mut self, ts: TimestampMs) -> Self {
        self.from_ts = Some(ts);
        self
    }

    pub fn to_ts(mut self, ts: TimestampMs) -> Self {
        self.to_ts = Some(ts);
        self
    }

    pub fn assets(mut self, assets: Vec<String>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn location_labels(mut self, labels: Vec<String>) -> Self {
        self.location_labels = Some(labels);
        self
    }

    pub fn group_identifiers(mut self, groups: Vec<String>) -> Self {
        self.group_identifiers = Some(groups);
        self
    }

    pub fn exclude_subtypes(mut self, subtypes: Vec<HistoryEventSubType>) -> Self {
        self.exclude_subtypes = subtypes;
        self
    }

    pub fn exclude_type_pairs(mut self, pairs: Vec<(HistoryEventType, HistoryEventSubType)>) -> Self {
        self.exclude_type_pairs = pairs;
        self
    }

    pub fn exclude_ignored_assets(mut self, exclude: bool) -> Self {
        self.exclude_ignored_assets = exclude;
        self
    }

    /// Evaluates the predicate against one event. `ignored_assets` is only
    /// consulted when `exclude_ignored_assets` is set.
    pub fn matches(&self, event: &HistoryEvent, ignored_assets: &HashSet<String>) -> bool {
        if self.from_ts.is_some_and(|from| event.timestamp < from) {
            return false;
        }
        if self.to_ts.is_some_and(|to| event.timestamp > to) {
            return false;
        }
        if let Some(assets) = &self.assets {
            if !assets.contains(&event.asset) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if &event.location != location {
                return false;
            }
        }
        if let Some(labels) = &self.location_labels {
            match &event.location_label {
                Some(label) if labels.contains(label) => {}
                _ => return false,
            }
        }
        if let Some(groups) = &self.group_identifiers {
            if !groups.contains(&event.group_identifier) {
                return false;
            }
        }
        if self.exclude_subtypes.contains(&event.event_subtype) {
            return false;
        }
        if self.exclude_type_pairs.contains(&event.type_pair()) {
            return false;
        }
        if self.exclude_ignored_assets && ignored_assets.contains(&event.asset) {
            return false;
        }
        true
    }
}
