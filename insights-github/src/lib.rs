//! Insights GitHub - GitHub fetching for holoviz-insights
//!
//! This crate talks to the GitHub REST API behind the [`GitHubApi`]
//! capability, applies one retry policy to every request, and enriches issue
//! datasets with milestone, assignee, linked-PR and maintainer-response data.

mod api;
mod client;
mod enrich;
mod error;
mod fetch;
mod maintainers;
mod releases;
mod retry;

#[cfg(test)]
mod fake;

pub use api::{Comment, GitHubApi, Issue, Milestone, Release, TimelineEvent, User};
pub use client::{parse_github_url, GitHubClient};
pub use enrich::{Enricher, UpdateReport};
pub use error::{Error, Result};
pub use fetch::{Fetched, Paginator};
pub use maintainers::maintainer_responded;
pub use releases::fetch_releases;
pub use retry::RetryPolicy;
