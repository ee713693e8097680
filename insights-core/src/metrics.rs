//! Aggregations over issue and release datasets
//!
//! These are the numbers the dashboards display: headline counts, open issues
//! over time, monthly opened/closed counts, milestone coverage, response
//! trends and the per-minor-version release timeline.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;

use crate::issue::IssueRow;
use crate::release::{ReleaseRecord, ReleaseType};

static MINOR_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?(\d+)\.(\d+)").expect("valid minor version pattern"));

/// Year and month, ordered chronologically
pub type Month = (i32, u32);

/// Headline numbers for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub first_month: Option<Month>,
    pub last_month: Option<Month>,
    pub total: usize,
    pub still_open: usize,
    pub closed: usize,
    /// Whole days, rounded down; `None` when nothing is closed
    pub avg_close_days: Option<i64>,
    pub median_close_days: Option<i64>,
    /// Open issues nobody from the maintainer set answered; `None` when the
    /// dataset was never classified
    pub no_maintainer_response: Option<usize>,
}

impl IssueSummary {
    pub fn compute(rows: &[IssueRow]) -> Self {
        let month = |dt: DateTime<Utc>| (dt.year(), dt.month());
        let first_month = rows.iter().map(|r| r.created_at).min().map(month);
        let last_month = rows.iter().map(|r| r.created_at).max().map(month);

        let still_open = rows.iter().filter(|r| r.is_open()).count();
        let close_times: Vec<Duration> = rows.iter().filter_map(|r| r.time_to_close).collect();

        let no_maintainer_response = rows
            .iter()
            .any(|r| r.maintainer_responded.is_some())
            .then(|| {
                rows.iter()
                    .filter(|r| r.is_open() && !r.maintainer_responded.unwrap_or(false))
                    .count()
            });

        Self {
            first_month,
            last_month,
            total: rows.len(),
            still_open,
            closed: rows.len() - still_open,
            avg_close_days: mean(&close_times).map(floor_days),
            median_close_days: median(&close_times).map(floor_days),
            no_maintainer_response,
        }
    }
}

fn mean(values: &[Duration]) -> Option<Duration> {
    if values.is_empty() {
        return None;
    }
    let total_ms: i64 = values.iter().map(|d| d.num_milliseconds()).sum();
    Some(Duration::milliseconds(total_ms / values.len() as i64))
}

fn median(values: &[Duration]) -> Option<Duration> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some(Duration::milliseconds(
            (sorted[mid - 1].num_milliseconds() + sorted[mid].num_milliseconds()) / 2,
        ))
    }
}

fn floor_days(d: Duration) -> i64 {
    d.num_seconds().div_euclid(86_400)
}

/// Number of open issues on every day from the first issue until `today`
///
/// Each issue counts from the day it was opened through the day it was closed
/// (inclusive); open issues count through `today`.
pub fn open_issue_counts(rows: &[IssueRow], today: NaiveDate) -> Vec<(NaiveDate, u32)> {
    let Some(start) = rows.iter().map(|r| r.created_at.date_naive()).min() else {
        return Vec::new();
    };
    if today < start {
        return Vec::new();
    }

    let days = (today - start).num_days() as usize + 1;
    let mut delta = vec![0i64; days + 1];

    for row in rows {
        let opened = row.created_at.date_naive();
        let closed = match row.time_to_close {
            Some(ttc) => opened + ttc,
            None => today,
        };
        let closed = closed.min(today);
        if closed < opened {
            continue;
        }
        let from = (opened - start).num_days() as usize;
        let to = (closed - start).num_days() as usize;
        delta[from] += 1;
        delta[to + 1] -= 1;
    }

    let mut running = 0i64;
    (0..days)
        .map(|i| {
            running += delta[i];
            (start + Duration::days(i as i64), running.max(0) as u32)
        })
        .collect()
}

/// Issues opened per creation month, and how many of those are closed by now
pub fn monthly_opened_closed(rows: &[IssueRow]) -> BTreeMap<Month, (usize, usize)> {
    let mut months: BTreeMap<Month, (usize, usize)> = BTreeMap::new();
    for row in rows {
        let entry = months
            .entry((row.created_at.year(), row.created_at.month()))
            .or_default();
        entry.0 += 1;
        if !row.is_open() {
            entry.1 += 1;
        }
    }
    months
}

/// Open issues per milestone, largest first; `None` collects unplanned issues
pub fn open_milestone_counts(rows: &[IssueRow]) -> Vec<(Option<String>, usize)> {
    let mut counts: BTreeMap<Option<String>, usize> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.is_open()) {
        *counts.entry(row.milestone.clone()).or_default() += 1;
    }
    let mut counts: Vec<(Option<String>, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Monthly average and median days to first response, with sample counts
pub fn first_response_trend(rows: &[IssueRow]) -> BTreeMap<Month, (f64, f64, usize)> {
    let mut by_month: BTreeMap<Month, Vec<i64>> = BTreeMap::new();
    for row in rows {
        if let Some(ttfr) = row.time_to_first_response {
            by_month
                .entry((row.created_at.year(), row.created_at.month()))
                .or_default()
                .push(floor_days(ttfr));
        }
    }

    by_month
        .into_iter()
        .map(|(month, mut days)| {
            days.sort_unstable();
            let n = days.len();
            let avg = days.iter().sum::<i64>() as f64 / n as f64;
            let med = if n % 2 == 1 {
                days[n / 2] as f64
            } else {
                (days[n / 2 - 1] + days[n / 2]) as f64 / 2.0
            };
            (month, (avg, med, n))
        })
        .collect()
}

/// Leading `MAJOR.MINOR` of a tag, keeping a `v` prefix if present
pub fn minor_version(tag: &str) -> Option<&str> {
    MINOR_VERSION.find(tag).map(|m| m.as_str())
}

fn minor_key(minor: &str) -> (u64, u64) {
    MINOR_VERSION
        .captures(minor)
        .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .unwrap_or((u64::MAX, u64::MAX))
}

/// One bar of the release timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpan {
    pub tag: String,
    pub release_type: ReleaseType,
    pub minor_version: String,
    pub published_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub span_days: i64,
}

/// Release timeline bucketed by minor version
///
/// Releases published before `since` or without a `MAJOR.MINOR` tag are left
/// out. Rows are ordered by version-aware minor bucket, then publish time;
/// each span runs until the next row's release and the last one until `now`.
pub fn release_timeline(
    releases: &[ReleaseRecord],
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<ReleaseSpan> {
    let mut rows: Vec<(&ReleaseRecord, &str)> = releases
        .iter()
        .filter(|r| r.published_at >= since)
        .filter_map(|r| minor_version(&r.tag).map(|m| (r, m)))
        .collect();
    rows.sort_by(|a, b| {
        minor_key(a.1)
            .cmp(&minor_key(b.1))
            .then_with(|| a.0.published_at.cmp(&b.0.published_at))
    });

    let ends: Vec<DateTime<Utc>> = rows
        .iter()
        .skip(1)
        .map(|(r, _)| r.published_at)
        .chain(std::iter::once(now))
        .collect();

    rows.into_iter()
        .zip(ends)
        .map(|((release, minor), ends_at)| ReleaseSpan {
            tag: release.tag.clone(),
            release_type: release.release_type,
            minor_version: minor.to_string(),
            published_at: release.published_at,
            ends_at,
            span_days: (ends_at - release.published_at).num_days(),
        })
        .collect()
}

/// Most recent release and the whole days elapsed since it
pub fn last_release(
    releases: &[ReleaseRecord],
    now: DateTime<Utc>,
) -> Option<(&ReleaseRecord, i64)> {
    releases
        .iter()
        .max_by_key(|r| r.published_at)
        .map(|r| (r, (now - r.published_at).num_days()))
}

/// Release counts per year and type
pub fn releases_per_year(releases: &[ReleaseRecord]) -> BTreeMap<(i32, ReleaseType), usize> {
    let mut counts = BTreeMap::new();
    for release in releases {
        *counts
            .entry((release.published_at.year(), release.release_type))
            .or_default() += 1;
    }
    counts
}
