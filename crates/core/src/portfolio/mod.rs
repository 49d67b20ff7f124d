pub mod balances;
pub mod historical;
pub mod net_worth;
