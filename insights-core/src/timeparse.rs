//! Parsing of the timestamp and duration strings found in issue-metrics JSON
//!
//! Durations are written by the issue-metrics action as Python `timedelta`
//! strings, e.g. `"3 days, 4:05:06.250000"` or `"0:41:02"`. Humantime strings
//! (`"3days 4h"`) are accepted as well. Anything else is treated as missing.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;

static TIMEDELTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(-?\d+) days?(?:,\s*|$))?(?:(\d+):(\d{2}):(\d{2})(?:\.(\d{1,9}))?)?$")
        .expect("valid timedelta pattern")
});

/// Parse a duration string, returning `None` when it cannot be understood
pub fn parse_timedelta(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = TIMEDELTA.captures(text) {
        let days = caps.get(1);
        let clock = caps.get(2);
        if days.is_none() && clock.is_none() {
            return None;
        }

        let num = |i: usize| -> Option<i64> {
            caps.get(i)
                .map_or(Some(0), |m| m.as_str().parse::<i64>().ok())
        };
        let total_secs = num(1)?
            .checked_mul(86_400)?
            .checked_add(num(2)?.checked_mul(3_600)?)?
            .checked_add(num(3)? * 60)?
            .checked_add(num(4)?)?;

        let nanos = caps
            .get(5)
            .map(|m| {
                let digits = m.as_str();
                let scale = 10_i64.pow(9 - digits.len() as u32);
                digits.parse::<i64>().map(|v| v * scale)
            })
            .transpose()
            .ok()?
            .unwrap_or(0);

        return Duration::try_seconds(total_secs).map(|d| d + Duration::nanoseconds(nanos));
    }

    humantime::parse_duration(text)
        .ok()
        .and_then(|d| Duration::from_std(d).ok())
}

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
