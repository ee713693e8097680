//! Issue records, issue datasets and the enrichment merge
//!
//! An issue dataset is the JSON document written by the issue-metrics action:
//! an object with an `issues` array plus arbitrary summary keys. Records are
//! kept as JSON objects so every field of the input survives a round trip;
//! typed access goes through [`IssueRecord`] accessors or [`IssueRow`].

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::timeparse::{parse_timedelta, parse_timestamp};
use crate::{Error, Result};

/// Duration fields carried by issue-metrics records
pub const DURATION_FIELDS: [&str; 4] = [
    "time_to_first_response",
    "time_to_close",
    "time_to_answer",
    "time_in_draft",
];

/// Extract the issue number from an issue URL
///
/// `https://github.com/holoviz/panel/issues/42` gives `Some(42)`.
pub fn issue_number_from_url(url: &str) -> Option<u64> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .parse()
        .ok()
}

/// One issue as found in the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueRecord {
    fields: Map<String, Value>,
}

impl IssueRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn html_url(&self) -> Option<&str> {
        self.get_str("html_url")
    }

    /// Issue number derived from `html_url`
    pub fn issue_number(&self) -> Option<u64> {
        self.html_url().and_then(issue_number_from_url)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get_str("created_at").and_then(parse_timestamp)
    }

    /// Parse one of the [`DURATION_FIELDS`]
    pub fn duration(&self, key: &str) -> Option<Duration> {
        self.get_str(key).and_then(parse_timedelta)
    }

    pub fn milestone(&self) -> Option<&str> {
        self.get_str("milestone")
    }

    pub fn assignees(&self) -> Vec<String> {
        self.get("assignees")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_linked_pr(&self) -> Option<bool> {
        self.get("has_linked_pr").and_then(Value::as_bool)
    }

    pub fn maintainer_responded(&self) -> Option<bool> {
        self.get("maintainer_responded").and_then(Value::as_bool)
    }

    /// Overwrite the enrichment fields of this record
    ///
    /// A linked-PR answer that was not obtained leaves any earlier answer in
    /// place; a record that never had one is marked unchecked.
    pub fn apply(&mut self, enrichment: &Enrichment) {
        let milestone = enrichment
            .milestone
            .clone()
            .map_or(Value::Null, Value::String);
        self.fields.insert("milestone".into(), milestone);
        self.fields.insert(
            "assignees".into(),
            Value::Array(
                enrichment
                    .assignees
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        match enrichment.linked_pr {
            Some(linked) => {
                self.fields
                    .insert("has_linked_pr".into(), Value::Bool(linked));
                self.fields
                    .insert("linked_pr_checked".into(), Value::Bool(true));
            }
            None if self.has_linked_pr().is_none() => {
                self.fields
                    .insert("has_linked_pr".into(), Value::Bool(false));
                self.fields
                    .insert("linked_pr_checked".into(), Value::Bool(false));
            }
            None => {}
        }
    }

    pub fn set_maintainer_responded(&mut self, responded: bool) {
        self.fields
            .insert("maintainer_responded".into(), Value::Bool(responded));
    }
}

/// Metadata fetched from the issue tracker for a single issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub milestone: Option<String>,
    pub assignees: Vec<String>,
    /// `None` when the timeline was not inspected (closed issue) or could
    /// not be read
    pub linked_pr: Option<bool>,
}

/// Enrichment entries keyed by issue `html_url`
pub type EnrichmentMap = HashMap<String, Enrichment>;

/// Outcome of [`IssueDataset::merge`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: usize,
    /// URLs of records without an enrichment entry (`<none>` if the record has no URL)
    pub missing: Vec<String>,
}

/// Issue-metrics JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueDataset {
    pub issues: Vec<IssueRecord>,
    /// Top-level keys other than `issues`, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IssueDataset {
    pub fn new(issues: Vec<IssueRecord>) -> Self {
        Self {
            issues,
            extra: Map::new(),
        }
    }

    /// Build a dataset from parsed JSON, failing if there is no `issues` array
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::InvalidData(
                "top-level JSON value is not an object".to_string(),
            ));
        };

        let issues = map
            .remove("issues")
            .ok_or_else(|| Error::MissingField("issues".to_string()))?;
        let issues: Vec<IssueRecord> = serde_json::from_value(issues)?;

        Ok(Self { issues, extra: map })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&text)?;
        debug!(path = %path.display(), count = dataset.issues.len(), "Loaded issue dataset");
        Ok(dataset)
    }

    /// Write the dataset as indented JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), count = self.issues.len(), "Saved issue dataset");
        Ok(())
    }

    /// Merge enrichment entries into matching records by URL
    ///
    /// Matching records have their enrichment fields overwritten, so merging
    /// the same map twice is a no-op. Records without an entry are untouched
    /// and produce one warning each.
    pub fn merge(&mut self, enrichment: &EnrichmentMap) -> MergeReport {
        let mut report = MergeReport::default();

        for issue in &mut self.issues {
            match issue.html_url().and_then(|url| enrichment.get(url)) {
                Some(entry) => {
                    issue.apply(entry);
                    report.merged += 1;
                }
                None => {
                    let url = issue.html_url().unwrap_or("<none>").to_string();
                    warn!(url = %url, "No enrichment data found for issue");
                    report.missing.push(url);
                }
            }
        }

        info!(
            merged = report.merged,
            missing = report.missing.len(),
            "Merged enrichment data"
        );
        report
    }
}

/// Typed view of an issue record used by the aggregations
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRow {
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub time_to_first_response: Option<Duration>,
    /// `None` while the issue is open; never negative
    pub time_to_close: Option<Duration>,
    pub time_to_answer: Option<Duration>,
    pub time_in_draft: Option<Duration>,
    pub milestone: Option<String>,
    pub assignees: Vec<String>,
    pub has_linked_pr: Option<bool>,
    pub maintainer_responded: Option<bool>,
}

impl IssueRow {
    pub fn from_record(record: &IssueRecord) -> Result<Self> {
        let created_at = record
            .created_at()
            .ok_or_else(|| Error::MissingField("created_at".to_string()))?;

        let time_to_close = match record.duration("time_to_close") {
            Some(d) if d < Duration::zero() => {
                warn!(
                    url = record.html_url().unwrap_or("<none>"),
                    "Negative time_to_close, treating issue as open"
                );
                None
            }
            other => other,
        };

        Ok(Self {
            url: record.html_url().map(str::to_string),
            created_at,
            time_to_first_response: record.duration("time_to_first_response"),
            time_to_close,
            time_to_answer: record.duration("time_to_answer"),
            time_in_draft: record.duration("time_in_draft"),
            milestone: record.milestone().map(str::to_string),
            assignees: record.assignees(),
            has_linked_pr: record.has_linked_pr(),
            maintainer_responded: record.maintainer_responded(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.time_to_close.is_none()
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.time_to_close.map(|d| self.created_at + d)
    }
}

impl IssueDataset {
    /// Typed rows for every record; fails on the first record without `created_at`
    pub fn rows(&self) -> Result<Vec<IssueRow>> {
        self.issues.iter().map(IssueRow::from_record).collect()
    }
}
