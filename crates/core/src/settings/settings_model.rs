//! Settings that influence balance processing and valuation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::DEFAULT_MAIN_CURRENCY;

pub const SETTING_MAIN_CURRENCY: &str = "main_currency";
pub const SETTING_AUTO_CREATE_INTEREST_EVENTS: &str = "auto_create_interest_events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Currency every valuation is expressed in.
    pub main_currency: String,
    /// Whether the processor may add interest events for protocol withdrawals
    /// that exceed the tracked deposit.
    pub auto_create_interest_events: bool,
    /// Assets excluded from balance tracking and net worth.
    pub ignored_assets: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            main_currency: DEFAULT_MAIN_CURRENCY.to_string(),
            auto_create_interest_events: true,
            ignored_assets: HashSet::new(),
        }
    }
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub main_currency: Option<String>,
    pub auto_create_interest_events: Option<bool>,
}
