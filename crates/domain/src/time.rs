//! Wall-clock timestamps and tick formatting.
//!
//! Scheduling never reads the wall clock; it is only used to stamp events.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp attached to engine events.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render `ticks` of `tick` length as `HH:MM:SS`.
#[must_use]
pub fn format_ticks(ticks: u64, tick: Duration) -> String {
    let total = Duration::from_millis(
        u64::try_from(tick.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(ticks),
    )
    .as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}
