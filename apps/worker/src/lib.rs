//! Ledgerfolio worker: wires the SQLite storage into the balance tracking
//! core and keeps historical balances current in the background.

pub mod config;
pub mod main_lib;
pub mod notifications;
pub mod scheduler;

pub use main_lib::{build_context, init_tracing, AppContext};
