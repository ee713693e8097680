//! GitHub REST client over reqwest

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insights_core::GitHubSettings;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::{Comment, GitHubApi, Issue, Release, TimelineEvent};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub API client bound to one repository
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    /// Create a client for `owner/repo` authenticating with `token`
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        settings: &GitHubSettings,
    ) -> Result<Self> {
        let owner = owner.into();
        let repo = repo.into();

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        info!(owner = %owner, repo = %repo, api_url = %settings.api_url, "Created GitHub client");

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            owner,
            repo,
            token: token.into(),
        })
    }

    /// Create a client from a repository reference
    ///
    /// `token` is the already-resolved GitHub token; `None` is an
    /// authentication error.
    ///
    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    pub fn from_url(url: &str, token: Option<&str>, settings: &GitHubSettings) -> Result<Self> {
        let (owner, repo) = parse_github_url(url)?;
        let token = token.ok_or_else(|| {
            Error::Auth(
                "GitHub token not found. Set GH_TOKEN or GITHUB_TOKEN \
                 or add token to ~/.config/holoviz-insights/secrets.toml"
                    .to_string(),
            )
        })?;

        Self::new(owner, repo, token, settings)
    }

    fn repo_endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, path
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send a paged GET and decode the JSON array body
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        page: u32,
        per_page: u8,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        debug!(url, page, per_page, "GET");

        let response = self
            .get(url)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .query(extra)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Failed to decode {}: {}", url, e)))
    }
}

/// Map a non-success response onto the retry-relevant error kinds
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if is_rate_limit(status, response.headers()) {
        let reset_at = rate_limit_reset(response.headers(), Utc::now());
        return Err(Error::RateLimited { reset_at });
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response".to_string());
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}

/// 429 always; 403 only when the quota is spent or a retry delay is given
fn is_rate_limit(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    if headers.contains_key("retry-after") {
        return true;
    }
    match headers.get("x-ratelimit-remaining") {
        Some(remaining) => remaining.to_str().map(|v| v.trim() == "0").unwrap_or(false),
        None => true,
    }
}

/// Reset time from `X-RateLimit-Reset` (epoch seconds) or `Retry-After` (seconds)
fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let header_int = |name: &str| -> Option<i64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    };

    if let Some(epoch) = header_int("x-ratelimit-reset") {
        return DateTime::from_timestamp(epoch, 0);
    }
    header_int("retry-after").map(|secs| now + chrono::Duration::seconds(secs))
}

#[async_trait]
impl GitHubApi for GitHubClient {
    fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    async fn issues_page(&self, page: u32, per_page: u8) -> Result<Vec<Issue>> {
        let url = self.repo_endpoint("issues");
        self.get_page(&url, page, per_page, &[("state", "all")])
            .await
    }

    async fn comments_page(&self, number: u64, page: u32, per_page: u8) -> Result<Vec<Comment>> {
        let url = self.repo_endpoint(&format!("issues/{}/comments", number));
        self.get_page(&url, page, per_page, &[]).await
    }

    async fn timeline_page(
        &self,
        number: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<TimelineEvent>> {
        let url = self.repo_endpoint(&format!("issues/{}/timeline", number));
        self.get_page(&url, page, per_page, &[]).await
    }

    async fn releases_page(&self, page: u32, per_page: u8) -> Result<Vec<Release>> {
        let url = self.repo_endpoint("releases");
        self.get_page(&url, page, per_page, &[]).await
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// Parse a GitHub URL into owner and repo
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    // Handle shorthand: owner/repo
    if !url.contains(':') && !url.contains('/') {
        return Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            url
        )));
    }

    if !url.contains("://") && !url.contains('@') {
        let parts: Vec<&str> = url.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok((
                parts[0].to_string(),
                parts[1].trim_end_matches(".git").to_string(),
            ));
        }
        return Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            url
        )));
    }

    // Handle HTTPS URL: https://github.com/owner/repo
    if url.starts_with("https://") || url.starts_with("http://") {
        let url = url::Url::parse(url).map_err(|e| Error::Parse(e.to_string()))?;
        let path = url.path().trim_start_matches('/').trim_end_matches(".git");
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() >= 2 {
            return Ok((parts[0].to_string(), parts[1].to_string()));
        }
        return Err(Error::Parse(format!("Invalid GitHub URL path: {}", path)));
    }

    // Handle SSH URL: git@github.com:owner/repo.git
    if url.starts_with("git@") {
        if let Some(path) = url.split(':').nth(1) {
            let path = path.trim_end_matches(".git");
            let parts: Vec<&str> = path.split('/').collect();
            if parts.len() >= 2 {
                return Ok((parts[0].to_string(), parts[1].to_string()));
            }
        }
        return Err(Error::Parse(format!("Invalid SSH URL: {}", url)));
    }

    Err(Error::Parse(format!("Unrecognized URL format: {}", url)))
}
