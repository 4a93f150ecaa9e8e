// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and bounded I/O.

use crate::error::AppError;
use chrono::{DateTime, Datelike, NaiveTime, SecondsFormat, TimeZone, Utc};
use std::future::Future;
use std::time::Duration;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Millisecond precision keeps the width fixed, so string order matches
/// time order for stored values.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First instant of the calendar month containing `now` (UTC).
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Next occurrence of `at` (UTC wall clock) strictly after `now`.
pub fn next_daily_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Run a collaborator call with an upper bound on its duration.
pub async fn with_deadline<T, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce() -> AppError,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Serde adapter storing `DateTime<Utc>` in the fixed-width RFC3339 form.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_utc_rfc3339(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(format_utc_rfc3339(a), "2026-01-05T09:00:00.000Z");
        assert_eq!(format_utc_rfc3339(b), "2026-01-05T09:00:01.500Z");
        assert!(format_utc_rfc3339(a) < format_utc_rfc3339(b));
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 13, 45, 12).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_daily_occurrence() {
        let at = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 3, 1, 1, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();

        assert_eq!(
            next_daily_occurrence(before, at),
            Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap()
        );
        assert_eq!(
            next_daily_occurrence(after, at),
            Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap()
        );
    }
}
