//! Clock helper.

use chrono::{DateTime, TimeZone, Utc};

/// Current time truncated to millisecond precision.
///
/// Timestamps serialize as UTC milliseconds, so anything finer would be
/// invisible on the wire yet make snapshot round-trips inexact.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}
