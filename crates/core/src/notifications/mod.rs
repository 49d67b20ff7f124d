//! Fire-and-forget notifications emitted by balance processing.

mod notification_model;
mod sink;

pub use notification_model::*;
pub use sink::*;
