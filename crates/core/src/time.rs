//! Calendar arithmetic shared by the "within N days" queries.

use chrono::{DateTime, Days, Utc};

/// `now` plus `days` calendar days, saturating at the latest representable
/// instant instead of overflowing.
pub fn days_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whether `at` falls within `[now, now + days]`, both ends inclusive.
pub fn within_days(at: DateTime<Utc>, now: DateTime<Utc>, days: u32) -> bool {
    at >= now && at <= days_after(now, days)
}
