//! Summary command - dashboard headline numbers in the terminal

use std::fmt::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use insights_core::metrics::{
    first_response_trend, last_release, monthly_opened_closed, open_issue_counts,
    open_milestone_counts, release_timeline, releases_per_year, IssueSummary, Month,
};
use insights_core::release::read_releases_csv;
use insights_core::{IssueDataset, IssueRow, ReleaseRecord};

/// Print issue (and optionally release) metrics for an enriched dataset
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Enriched issue-metrics JSON file
    pub input: PathBuf,

    /// Days of open-issue history to print
    #[arg(short, long, default_value_t = 14)]
    pub days: usize,

    /// Releases CSV to summarise alongside the issues
    #[arg(short, long)]
    pub releases: Option<PathBuf>,

    /// Release timeline window in days
    #[arg(long, default_value_t = 5 * 365)]
    pub window: i64,
}

impl SummaryArgs {
    /// Execute the summary command
    pub fn execute(&self) -> anyhow::Result<()> {
        let dataset = IssueDataset::load(&self.input)?;
        let rows = dataset.rows()?;
        let now = Utc::now();

        let mut out = String::new();
        write_issues(&mut out, &rows, now, self.days)?;
        if let Some(path) = &self.releases {
            let releases = read_releases_csv(path)?;
            write_releases(&mut out, &releases, now, self.window)?;
        }

        print!("{}", out);
        Ok(())
    }
}

fn month(m: Option<Month>) -> String {
    m.map(|(y, m)| format!("{:04}-{:02}", y, m))
        .unwrap_or_else(|| "-".to_string())
}

fn days(d: Option<i64>) -> String {
    d.map(|d| format!("{} days", d))
        .unwrap_or_else(|| "-".to_string())
}

pub fn write_issues(
    out: &mut impl Write,
    rows: &[IssueRow],
    now: DateTime<Utc>,
    history_days: usize,
) -> fmt::Result {
    let summary = IssueSummary::compute(rows);

    writeln!(out, "Issues")?;
    writeln!(out, "======")?;
    writeln!(
        out,
        "  period:           {} to {}",
        month(summary.first_month),
        month(summary.last_month)
    )?;
    writeln!(out, "  total:            {}", summary.total)?;
    writeln!(out, "  still open:       {}", summary.still_open)?;
    writeln!(out, "  closed:           {}", summary.closed)?;
    writeln!(out, "  avg close time:   {}", days(summary.avg_close_days))?;
    writeln!(out, "  median close:     {}", days(summary.median_close_days))?;
    if let Some(n) = summary.no_maintainer_response {
        writeln!(out, "  open, no maintainer response: {}", n)?;
    }

    let monthly = monthly_opened_closed(rows);
    if !monthly.is_empty() {
        writeln!(out)?;
        writeln!(out, "Opened and closed by month:")?;
        for (m, (opened, closed)) in monthly {
            writeln!(out, "  {}  opened {:<5} closed {}", month(Some(m)), opened, closed)?;
        }
    }

    let trend = first_response_trend(rows);
    if !trend.is_empty() {
        writeln!(out)?;
        writeln!(out, "Days to first response by month:")?;
        for (m, (avg, median, n)) in trend {
            writeln!(
                out,
                "  {}  avg {:.1}  median {:.1}  (n={})",
                month(Some(m)),
                avg,
                median,
                n
            )?;
        }
    }

    let milestones = open_milestone_counts(rows);
    if !milestones.is_empty() {
        writeln!(out)?;
        writeln!(out, "Open issues by milestone:")?;
        for (milestone, count) in milestones {
            writeln!(
                out,
                "  {:<20} {}",
                milestone.as_deref().unwrap_or("(none)"),
                count
            )?;
        }
    }

    let history = open_issue_counts(rows, now.date_naive());
    if !history.is_empty() && history_days > 0 {
        writeln!(out)?;
        writeln!(out, "Open issues, last {} days:", history_days)?;
        let skip = history.len().saturating_sub(history_days);
        for (date, count) in &history[skip..] {
            writeln!(out, "  {}  {}", date, count)?;
        }
    }

    Ok(())
}

pub fn write_releases(
    out: &mut impl Write,
    releases: &[ReleaseRecord],
    now: DateTime<Utc>,
    window_days: i64,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "Releases")?;
    writeln!(out, "========")?;
    match last_release(releases, now) {
        Some((release, since)) => writeln!(
            out,
            "  last release:     {} ({} days ago)",
            release.tag, since
        )?,
        None => writeln!(out, "  last release:     -")?,
    }

    let per_year = releases_per_year(releases);
    if !per_year.is_empty() {
        writeln!(out)?;
        writeln!(out, "Releases per year:")?;
        for ((year, release_type), count) in per_year {
            writeln!(out, "  {}  {:<6} {}", year, release_type, count)?;
        }
    }

    let timeline = release_timeline(releases, now - Duration::days(window_days), now);
    if !timeline.is_empty() {
        writeln!(out)?;
        writeln!(out, "Timeline, last {} days:", window_days)?;
        for span in timeline {
            writeln!(
                out,
                "  {:<8} {:<12} {:<6} {} +{}d",
                span.minor_version,
                span.tag,
                span.release_type,
                span.published_at.date_naive(),
                span.span_days
            )?;
        }
    }

    Ok(())
}
