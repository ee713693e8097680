//! In-memory [`GitHubApi`] for tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::api::{
    Comment, EventSource, EventSourceIssue, GitHubApi, Issue, Milestone, Release, TimelineEvent,
    User,
};
use crate::{Error, Result};

/// Serves canned pages and replays scripted failures per endpoint
///
/// Endpoint keys are `issues`, `releases`, `comments/{n}` and `timeline/{n}`.
/// Each request pops the next scripted failure queued for `endpoint?page=n`,
/// then for `endpoint`, before serving data.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub issues: Vec<Issue>,
    pub comments: HashMap<u64, Vec<Comment>>,
    pub timelines: HashMap<u64, Vec<TimelineEvent>>,
    pub releases: Vec<Release>,
    failures: Mutex<HashMap<String, VecDeque<Error>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_comments(mut self, number: u64, authors: &[&str]) -> Self {
        self.comments
            .insert(number, authors.iter().map(|a| comment(a)).collect());
        self
    }

    pub fn with_timeline(mut self, number: u64, events: Vec<TimelineEvent>) -> Self {
        self.timelines.insert(number, events);
        self
    }

    pub fn with_release(mut self, tag: &str, published_at: Option<DateTime<Utc>>) -> Self {
        self.releases.push(Release {
            tag_name: tag.to_string(),
            published_at,
        });
        self
    }

    /// Queue `err` for the next request to `endpoint` (or `endpoint?page=n`)
    pub fn fail(self, endpoint: &str, err: Error) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(err);
        self
    }

    /// Requests served so far, as `endpoint?page=n`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, endpoint: &str) -> usize {
        let prefix = format!("{}?", endpoint);
        self.requests()
            .iter()
            .filter(|r| r.starts_with(&prefix))
            .count()
    }

    fn serve<T: Clone>(&self, endpoint: &str, items: &[T], page: u32, per_page: u8) -> Result<Vec<T>> {
        let request = format!("{}?page={}", endpoint, page);
        self.requests.lock().unwrap().push(request.clone());

        {
            let mut failures = self.failures.lock().unwrap();
            let scripted = failures
                .get_mut(&request)
                .and_then(VecDeque::pop_front)
                .or_else(|| failures.get_mut(endpoint).and_then(VecDeque::pop_front));
            if let Some(err) = scripted {
                return Err(err);
            }
        }

        let per_page = usize::from(per_page.max(1));
        let start = (page.max(1) as usize - 1) * per_page;
        Ok(items.iter().skip(start).take(per_page).cloned().collect())
    }
}

#[async_trait]
impl GitHubApi for FakeApi {
    fn repo_name(&self) -> String {
        "holoviz/panel".to_string()
    }

    async fn issues_page(&self, page: u32, per_page: u8) -> Result<Vec<Issue>> {
        self.serve("issues", &self.issues, page, per_page)
    }

    async fn comments_page(&self, number: u64, page: u32, per_page: u8) -> Result<Vec<Comment>> {
        let comments = self.comments.get(&number).map(Vec::as_slice).unwrap_or(&[]);
        self.serve(&format!("comments/{}", number), comments, page, per_page)
    }

    async fn timeline_page(
        &self,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<TimelineEvent>> {
        let events = self.timelines.get(&number).map(Vec::as_slice).unwrap_or(&[]);
        self.serve(&format!("timeline/{}", number), events, page, per_page)
    }

    async fn releases_page(&self, page: u32, per_page: u8) -> Result<Vec<Release>> {
        self.serve("releases", &self.releases, page, per_page)
    }
}

pub(crate) fn issue_url(number: u64) -> String {
    format!("https://github.com/holoviz/panel/issues/{}", number)
}

pub(crate) fn issue(number: u64, state: &str, milestone: Option<&str>, assignees: &[&str]) -> Issue {
    Issue {
        number,
        html_url: issue_url(number),
        state: state.to_string(),
        milestone: milestone.map(|title| Milestone {
            title: title.to_string(),
        }),
        assignees: assignees
            .iter()
            .map(|login| User {
                login: login.to_string(),
            })
            .collect(),
        pull_request: None,
    }
}

pub(crate) fn pull_request(number: u64) -> Issue {
    Issue {
        html_url: format!("https://github.com/holoviz/panel/pull/{}", number),
        pull_request: Some(json!({})),
        ..issue(number, "open", None, &[])
    }
}

pub(crate) fn comment(login: &str) -> Comment {
    Comment {
        user: Some(User {
            login: login.to_string(),
        }),
    }
}

pub(crate) fn event(name: &str) -> TimelineEvent {
    TimelineEvent {
        event: Some(name.to_string()),
        source: None,
    }
}

pub(crate) fn cross_referenced_pr() -> TimelineEvent {
    TimelineEvent {
        event: Some("cross-referenced".to_string()),
        source: Some(EventSource {
            issue: Some(EventSourceIssue {
                pull_request: Some(json!({})),
            }),
        }),
    }
}
