//! Release records and semantic-version classification

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;

static SEMVER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)").expect("valid semver pattern"));

/// Kind of release derived from its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
    Unknown,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classify a release tag as major, minor or patch
///
/// Only the leading `vMAJOR.MINOR.PATCH` part is looked at, so pre-release
/// suffixes such as `v1.2.0rc1` still classify. A `0.x.0` tag is `minor`.
pub fn classify_release(tag: &str) -> ReleaseType {
    let Some(caps) = SEMVER_TAG.captures(tag) else {
        return ReleaseType::Unknown;
    };

    let part = |i: usize| caps[i].parse::<u64>().ok();
    let (Some(major), Some(minor), Some(patch)) = (part(1), part(2), part(3)) else {
        // Components too large for u64
        return ReleaseType::Unknown;
    };

    if major > 0 && minor == 0 && patch == 0 {
        ReleaseType::Major
    } else if patch == 0 {
        ReleaseType::Minor
    } else {
        ReleaseType::Patch
    }
}

/// One published release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub published_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub release_type: ReleaseType,
}

impl ReleaseRecord {
    /// Build a record, classifying the tag
    pub fn new(tag: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        let tag = tag.into();
        let release_type = classify_release(&tag);
        Self {
            tag,
            published_at,
            release_type,
        }
    }
}

/// Write releases as `tag,published_at,type` CSV, creating parent directories
pub fn write_releases_csv(path: &Path, releases: &[ReleaseRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    if releases.is_empty() {
        writer.write_record(["tag", "published_at", "type"])?;
    }
    for release in releases {
        writer.serialize(release)?;
    }
    writer.flush()?;

    info!(path = %path.display(), count = releases.len(), "Saved releases");
    Ok(())
}

/// Read releases previously written by [`write_releases_csv`]
pub fn read_releases_csv(path: &Path) -> Result<Vec<ReleaseRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut releases = Vec::new();
    for row in reader.deserialize() {
        releases.push(row?);
    }
    Ok(releases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classify_major() {
        assert_eq!(classify_release("v1.0.0"), ReleaseType::Major);
        assert_eq!(classify_release("2.0.0"), ReleaseType::Major);
    }

    #[test]
    fn test_classify_minor() {
        assert_eq!(classify_release("v1.1.0"), ReleaseType::Minor);
        assert_eq!(classify_release("v1.15.0"), ReleaseType::Minor);
    }

    #[test]
    fn test_classify_zero_major_is_minor() {
        assert_eq!(classify_release("v0.5.0"), ReleaseType::Minor);
        assert_eq!(classify_release("v0.0.0"), ReleaseType::Minor);
    }

    #[test]
    fn test_classify_patch() {
        assert_eq!(classify_release("v1.0.1"), ReleaseType::Patch);
        assert_eq!(classify_release("v0.5.3"), ReleaseType::Patch);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_release("release-1"), ReleaseType::Unknown);
        assert_eq!(classify_release("1.2"), ReleaseType::Unknown);
        assert_eq!(classify_release(""), ReleaseType::Unknown);
        assert_eq!(classify_release("V1.0.0"), ReleaseType::Unknown);
    }

    #[test]
    fn test_classify_with_suffix() {
        assert_eq!(classify_release("v1.2.0rc1"), ReleaseType::Minor);
        assert_eq!(classify_release("v1.2.3a1"), ReleaseType::Patch);
    }

    #[test]
    fn test_classify_release_sequence() {
        let types: Vec<ReleaseType> = ["v1.0.0", "v1.0.1", "v1.1.0", "v2.0.0"]
            .iter()
            .map(|t| classify_release(t))
            .collect();
        assert_eq!(
            types,
            vec![
                ReleaseType::Major,
                ReleaseType::Patch,
                ReleaseType::Minor,
                ReleaseType::Major
            ]
        );
    }

    #[test]
    fn test_write_and_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("releases.csv");
        let releases = vec![
            ReleaseRecord::new("v1.0.0", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ReleaseRecord::new("v1.0.1", Utc.with_ymd_and_hms(2024, 2, 2, 3, 4, 5).unwrap()),
        ];

        write_releases_csv(&path, &releases).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("tag,published_at,type"));
        assert_eq!(lines.next(), Some("v1.0.0,2024-01-02T03:04:05Z,major"));

        let back = read_releases_csv(&path).unwrap();
        assert_eq!(back, releases);
    }

    #[test]
    fn test_write_empty_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.csv");
        write_releases_csv(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "tag,published_at,type");
    }
}
