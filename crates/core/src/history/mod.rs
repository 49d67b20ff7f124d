//! Event ledger: models, direction rules and the repository contract.

mod direction;
mod history_constants;
mod history_model;
mod history_traits;

pub use direction::*;
pub use history_constants::*;
pub use history_model::*;
pub use history_traits::*;
