//! Maintainer-response classification

use insights_core::{issue_number_from_url, MaintainerSet};
use tracing::{debug, warn};

use crate::api::GitHubApi;
use crate::fetch::Paginator;
use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Whether any maintainer commented on the issue at `url`
///
/// Comment pages are read one at a time and the scan stops at the first
/// maintainer comment. A URL without an issue number, or a comment listing
/// that fails after retries, yields `false` with a warning.
pub async fn maintainer_responded(
    api: &dyn GitHubApi,
    policy: &RetryPolicy,
    per_page: u8,
    url: &str,
    maintainers: &MaintainerSet,
) -> bool {
    let repo = api.repo_name();

    let Some(number) = issue_number_from_url(url) else {
        let err = Error::InvalidIssueUrl(url.to_string());
        warn!(repo = %repo, url, error = %err, "Skipping maintainer check");
        return false;
    };

    if maintainers.is_empty() {
        debug!(repo = %repo, issue = number, "No maintainers configured");
        return false;
    }

    policy.throttle().await;

    match scan_comments(api, policy, per_page, number, maintainers).await {
        Ok(Some(login)) => {
            debug!(repo = %repo, issue = number, maintainer = %login, "Maintainer responded");
            true
        }
        Ok(None) => false,
        Err(err) => {
            warn!(
                repo = %repo,
                issue = number,
                error = %err,
                "Could not read comments, assuming no maintainer response"
            );
            false
        }
    }
}

/// Login of the first maintainer comment, if any
async fn scan_comments(
    api: &dyn GitHubApi,
    policy: &RetryPolicy,
    per_page: u8,
    number: u64,
    maintainers: &MaintainerSet,
) -> Result<Option<String>> {
    let mut pages = Paginator::new(policy, format!("comments for #{}", number), per_page);

    while let Some(comments) = pages
        .next_batch(|page, per_page| api.comments_page(number, page, per_page))
        .await?
    {
        if let Some(login) = comments
            .iter()
            .filter_map(|c| c.author())
            .find(|login| maintainers.contains(login))
        {
            return Ok(Some(login.to_string()));
        }
    }

    Ok(None)
}
