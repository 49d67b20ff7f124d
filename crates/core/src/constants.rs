/// Decimal precision for valuation calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Number of metric rows buffered before a transactional flush
pub const METRICS_BATCH_SIZE: usize = 500;

/// How many progress notifications a processing run emits at most
pub const PROGRESS_STEPS: usize = 10;

/// Currency used when no main currency setting is stored
pub const DEFAULT_MAIN_CURRENCY: &str = "USD";

/// Milliseconds in one UTC day
pub const DAY_IN_MS: i64 = 86_400_000;
