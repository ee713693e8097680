//! Issue-tracker capability used by the enrichment pipeline
//!
//! [`GitHubApi`] is a single-request interface: each method fetches exactly
//! one page and reports failures as [`crate::Error`] so the retry policy can
//! classify them. [`crate::GitHubClient`] implements it over HTTP; tests use
//! an in-memory fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// GitHub user reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// Milestone reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
}

/// Issue as returned by the issue listing
///
/// Only the fields the enrichment needs are decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Present when the listing entry is a pull request
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }
}

/// Issue comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Missing for deleted ("ghost") accounts
    #[serde(default)]
    pub user: Option<User>,
}

impl Comment {
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// Issue the timeline event points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSourceIssue {
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    #[serde(default)]
    pub issue: Option<EventSourceIssue>,
}

/// Issue timeline event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
}

impl TimelineEvent {
    /// Whether this event ties the issue to a pull request
    ///
    /// A `cross-referenced` event whose source is a pull request, or a
    /// `connected` event (manual link from the development sidebar).
    pub fn links_pull_request(&self) -> bool {
        match self.event.as_deref() {
            Some("connected") => true,
            Some("cross-referenced") => self
                .source
                .as_ref()
                .and_then(|s| s.issue.as_ref())
                .is_some_and(|i| i.pull_request.is_some()),
            _ => false,
        }
    }
}

/// Repository release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    /// `None` for drafts
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Page-level access to one repository's issues, comments, timelines and releases
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `owner/repo` this API is bound to, for log lines
    fn repo_name(&self) -> String;

    /// One page of `GET /repos/{repo}/issues?state=all`
    async fn issues_page(&self, page: u32, per_page: u8) -> Result<Vec<Issue>>;

    /// One page of `GET /repos/{repo}/issues/{number}/comments`
    async fn comments_page(&self, number: u64, page: u32, per_page: u8) -> Result<Vec<Comment>>;

    /// One page of `GET /repos/{repo}/issues/{number}/timeline`
    async fn timeline_page(
        &self,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<TimelineEvent>>;

    /// One page of `GET /repos/{repo}/releases`
    async fn releases_page(&self, page: u32, per_page: u8) -> Result<Vec<Release>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_decoding() {
        let issue: Issue = serde_json::from_value(json!({
            "number": 42,
            "html_url": "https://github.com/holoviz/panel/issues/42",
            "state": "open",
            "title": "ignored",
            "milestone": { "title": "v1.0", "number": 3 },
            "assignees": [{ "login": "alice", "id": 1 }]
        }))
        .unwrap();

        assert!(issue.is_open());
        assert!(!issue.is_pull_request());
        assert_eq!(issue.milestone.unwrap().title, "v1.0");
        assert_eq!(issue.assignees[0].login, "alice");
    }

    #[test]
    fn test_pull_request_entry() {
        let issue: Issue = serde_json::from_value(json!({
            "number": 7,
            "html_url": "https://github.com/holoviz/panel/pull/7",
            "state": "closed",
            "milestone": null,
            "pull_request": { "url": "https://api.github.com/repos/holoviz/panel/pulls/7" }
        }))
        .unwrap();
        assert!(issue.is_pull_request());
        assert!(!issue.is_open());
    }

    #[test]
    fn test_timeline_links() {
        let cross_pr: TimelineEvent = serde_json::from_value(json!({
            "event": "cross-referenced",
            "source": { "type": "issue", "issue": { "number": 9, "pull_request": {} } }
        }))
        .unwrap();
        let cross_issue: TimelineEvent = serde_json::from_value(json!({
            "event": "cross-referenced",
            "source": { "type": "issue", "issue": { "number": 10 } }
        }))
        .unwrap();
        let connected: TimelineEvent =
            serde_json::from_value(json!({ "event": "connected" })).unwrap();
        let labeled: TimelineEvent =
            serde_json::from_value(json!({ "event": "labeled", "label": {} })).unwrap();

        assert!(cross_pr.links_pull_request());
        assert!(!cross_issue.links_pull_request());
        assert!(connected.links_pull_request());
        assert!(!labeled.links_pull_request());
    }

    #[test]
    fn test_ghost_comment_author() {
        let comment: Comment = serde_json::from_value(json!({ "user": null, "body": "hi" })).unwrap();
        assert_eq!(comment.author(), None);
    }
}
