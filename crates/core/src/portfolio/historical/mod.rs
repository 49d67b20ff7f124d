//! Point-in-time and time-series balance queries over the metric trail.

mod historical_model;
mod historical_service;
mod historical_traits;

pub use historical_model::*;
pub use historical_service::*;
pub use historical_traits::*;
