use chrono::{DateTime, NaiveDate, Utc};

use crate::constants::DAY_IN_MS;
use crate::errors::{BalanceError, Result};
use crate::history::TimestampMs;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}

/// Start of the UTC day containing `ts`.
pub fn day_start_ms(ts: TimestampMs) -> TimestampMs {
    ts.div_euclid(DAY_IN_MS) * DAY_IN_MS
}

/// Last millisecond of the UTC day containing `ts`.
pub fn day_end_ms(ts: TimestampMs) -> TimestampMs {
    day_start_ms(ts) + DAY_IN_MS - 1
}

pub fn ms_to_datetime(ts: TimestampMs) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .ok_or_else(|| BalanceError::TimestampOutOfRange(ts).into())
}

pub fn ms_to_date(ts: TimestampMs) -> Result<NaiveDate> {
    Ok(ms_to_datetime(ts)?.date_naive())
}

/// Day starts (UTC, ms) for every day touched by `[start, end]`.
pub fn get_day_starts_between(start: TimestampMs, end: TimestampMs) -> Vec<TimestampMs> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = day_start_ms(start);
    while current <= end {
        days.push(current);
        current += DAY_IN_MS;
    }
    days
}
