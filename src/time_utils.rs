// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

/// How far back the first sync of a member reaches.
pub const INITIAL_SYNC_LOOKBACK_DAYS: i64 = 365;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Midnight UTC on January 1st of `year`.
pub fn year_start(year: i32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Lower bound of the activity fetch window: the last sync if there was one,
/// otherwise one year before `now`.
pub fn sync_window_start(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    last_sync.unwrap_or_else(|| now - Duration::days(INITIAL_SYNC_LOOKBACK_DAYS))
}

/// Current calendar year (UTC).
pub fn current_year(now: DateTime<Utc>) -> i32 {
    now.year()
}
