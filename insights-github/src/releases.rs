//! Release listing

use insights_core::ReleaseRecord;
use tracing::{debug, info};

use crate::api::GitHubApi;
use crate::fetch::{Fetched, Paginator};
use crate::retry::RetryPolicy;

/// Fetch every published release of the repository and classify its tag
///
/// Releases without a publish time (drafts) are skipped. On a listing
/// failure the releases read so far are returned with the error.
pub async fn fetch_releases(
    api: &dyn GitHubApi,
    policy: &RetryPolicy,
    per_page: u8,
) -> Fetched<ReleaseRecord> {
    let repo = api.repo_name();
    let fetched = Paginator::new(policy, format!("{} releases", repo), per_page)
        .collect(|page, per_page| api.releases_page(page, per_page))
        .await;

    let total = fetched.items.len();
    let Fetched { items, error } = fetched;
    let items: Vec<ReleaseRecord> = items
        .into_iter()
        .filter_map(|release| match release.published_at {
            Some(published_at) => Some(ReleaseRecord::new(release.tag_name, published_at)),
            None => {
                debug!(repo = %repo, tag = %release.tag_name, "Skipping unpublished release");
                None
            }
        })
        .collect();

    info!(
        repo = %repo,
        published = items.len(),
        skipped = total - items.len(),
        "Fetched releases"
    );

    Fetched { items, error }
}
