//! Stored string forms of ledger event classifications.

// Event types
pub const EVENT_TYPE_TRADE: &str = "trade";
pub const EVENT_TYPE_STAKING: &str = "staking";
pub const EVENT_TYPE_DEPOSIT: &str = "deposit";
pub const EVENT_TYPE_WITHDRAWAL: &str = "withdrawal";
pub const EVENT_TYPE_TRANSFER: &str = "transfer";
pub const EVENT_TYPE_SPEND: &str = "spend";
pub const EVENT_TYPE_RECEIVE: &str = "receive";
pub const EVENT_TYPE_ADJUSTMENT: &str = "adjustment";
pub const EVENT_TYPE_INFORMATIONAL: &str = "informational";
pub const EVENT_TYPE_MIGRATE: &str = "migrate";
pub const EVENT_TYPE_RENEW: &str = "renew";
pub const EVENT_TYPE_FAIL: &str = "fail";
pub const EVENT_TYPE_LOSS: &str = "loss";
pub const EVENT_TYPE_MINT: &str = "mint";
pub const EVENT_TYPE_BURN: &str = "burn";

// Event subtypes
pub const EVENT_SUBTYPE_NONE: &str = "none";
pub const EVENT_SUBTYPE_REWARD: &str = "reward";
pub const EVENT_SUBTYPE_DEPOSIT_ASSET: &str = "deposit_asset";
pub const EVENT_SUBTYPE_REMOVE_ASSET: &str = "remove_asset";
pub const EVENT_SUBTYPE_FEE: &str = "fee";
pub const EVENT_SUBTYPE_SPEND: &str = "spend";
pub const EVENT_SUBTYPE_RECEIVE: &str = "receive";
pub const EVENT_SUBTYPE_APPROVE: &str = "approve";
pub const EVENT_SUBTYPE_DEPLOY: &str = "deploy";
pub const EVENT_SUBTYPE_INTEREST: &str = "interest";
pub const EVENT_SUBTYPE_DONATE: &str = "donate";
pub const EVENT_SUBTYPE_DEPOSIT_TO_PROTOCOL: &str = "deposit_to_protocol";
pub const EVENT_SUBTYPE_WITHDRAW_FROM_PROTOCOL: &str = "withdraw_from_protocol";
pub const EVENT_SUBTYPE_GENERATE_DEBT: &str = "generate_debt";
pub const EVENT_SUBTYPE_PAYBACK_DEBT: &str = "payback_debt";
pub const EVENT_SUBTYPE_RECEIVE_WRAPPED: &str = "receive_wrapped";
pub const EVENT_SUBTYPE_RETURN_WRAPPED: &str = "return_wrapped";
pub const EVENT_SUBTYPE_DEPOSIT_FOR_WRAPPED: &str = "deposit_for_wrapped";
pub const EVENT_SUBTYPE_REDEEM_WRAPPED: &str = "redeem_wrapped";
pub const EVENT_SUBTYPE_GOVERNANCE: &str = "governance";
pub const EVENT_SUBTYPE_AIRDROP: &str = "airdrop";
pub const EVENT_SUBTYPE_PLACE_ORDER: &str = "place_order";
pub const EVENT_SUBTYPE_BRIDGE: &str = "bridge";
pub const EVENT_SUBTYPE_LIQUIDATE: &str = "liquidate";
pub const EVENT_SUBTYPE_PAYMENT: &str = "payment";
pub const EVENT_SUBTYPE_GRANT: &str = "grant";
pub const EVENT_SUBTYPE_CASHBACK: &str = "cashback";
pub const EVENT_SUBTYPE_REFUND: &str = "refund";
pub const EVENT_SUBTYPE_HACK: &str = "hack";
pub const EVENT_SUBTYPE_CLAWBACK: &str = "clawback";
pub const EVENT_SUBTYPE_FAIL: &str = "fail";

// Entry types
pub const ENTRY_TYPE_HISTORY_EVENT: &str = "history_event";
pub const ENTRY_TYPE_ONCHAIN_EVENT: &str = "onchain_event";
pub const ENTRY_TYPE_ETH_WITHDRAWAL_EVENT: &str = "eth_withdrawal_event";
pub const ENTRY_TYPE_ETH_BLOCK_EVENT: &str = "eth_block_event";
pub const ENTRY_TYPE_ETH_DEPOSIT_EVENT: &str = "eth_deposit_event";
