//! Issue enrichment: fetch milestone, assignee and linked-PR data and merge it
//! into an issue dataset together with the maintainer-response flag

use insights_core::{Enrichment, EnrichmentMap, IssueDataset, MaintainerSet, MergeReport};
use tracing::{debug, info, warn};

use crate::api::{GitHubApi, Issue};
use crate::fetch::{Fetched, Paginator};
use crate::maintainers::maintainer_responded;
use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Outcome of [`Enricher::update_dataset`]
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Issues (not pull requests) returned by the listing
    pub fetched: usize,
    pub merge: MergeReport,
    /// Records with a maintainer comment
    pub maintainer_responded: usize,
    /// Set when the issue listing stopped early
    pub listing_error: Option<Error>,
}

/// Enrichment run against one repository
pub struct Enricher<'a> {
    api: &'a dyn GitHubApi,
    policy: &'a RetryPolicy,
    per_page: u8,
}

impl<'a> Enricher<'a> {
    pub fn new(api: &'a dyn GitHubApi, policy: &'a RetryPolicy, per_page: u8) -> Self {
        Self {
            api,
            policy,
            per_page,
        }
    }

    /// Walk every issue of the repository and build its enrichment entry
    ///
    /// Pull requests in the listing are skipped. The linked-PR lookup is
    /// only done for open issues; closed issues and failed lookups carry no
    /// linked-PR answer. If the listing fails part way, the entries built so
    /// far are returned with the error.
    pub async fn fetch_enrichment(&self) -> Fetched<(String, Enrichment)> {
        let repo = self.api.repo_name();
        let mut pages = Paginator::new(self.policy, format!("{} issues", repo), self.per_page);
        let mut items = Vec::new();

        loop {
            let batch = pages
                .next_batch(|page, per_page| self.api.issues_page(page, per_page))
                .await;

            match batch {
                Ok(Some(issues)) => {
                    for issue in issues.into_iter().filter(|i| !i.is_pull_request()) {
                        let enrichment = self.enrich_issue(&issue).await;
                        items.push((issue.html_url, enrichment));
                    }
                }
                Ok(None) => {
                    info!(repo = %repo, count = items.len(), "Fetched issue enrichment");
                    return Fetched { items, error: None };
                }
                Err(err) => {
                    warn!(
                        repo = %repo,
                        kept = items.len(),
                        error = %err,
                        "Issue listing aborted, continuing with partial enrichment"
                    );
                    return Fetched {
                        items,
                        error: Some(err),
                    };
                }
            }
        }
    }

    async fn enrich_issue(&self, issue: &Issue) -> Enrichment {
        let mut enrichment = Enrichment {
            milestone: issue.milestone.as_ref().map(|m| m.title.clone()),
            assignees: issue.assignees.iter().map(|u| u.login.clone()).collect(),
            linked_pr: None,
        };

        if issue.is_open() {
            self.policy.throttle().await;
            match self.has_linked_pr(issue.number).await {
                Ok(linked) => enrichment.linked_pr = Some(linked),
                Err(err) => warn!(
                    repo = %self.api.repo_name(),
                    issue = issue.number,
                    error = %err,
                    "Could not read timeline, linked PR unknown"
                ),
            }
        }

        enrichment
    }

    /// Scan the issue timeline for a linked pull request, stopping at the first one
    pub async fn has_linked_pr(&self, number: u64) -> Result<bool> {
        let mut pages = Paginator::new(self.policy, format!("timeline for #{}", number), self.per_page);

        while let Some(events) = pages
            .next_batch(|page, per_page| self.api.timeline_page(number, page, per_page))
            .await?
        {
            if events.iter().any(|e| e.links_pull_request()) {
                debug!(repo = %self.api.repo_name(), issue = number, "Found linked pull request");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Enrich `dataset` in place
    ///
    /// Merges the fetched enrichment by URL, then classifies every record for
    /// a maintainer response. Nothing here is fatal: listing failures leave
    /// unmatched records untouched, comment failures count as no response.
    pub async fn update_dataset(
        &self,
        dataset: &mut IssueDataset,
        maintainers: &MaintainerSet,
    ) -> UpdateReport {
        let repo = self.api.repo_name();
        info!(repo = %repo, records = dataset.issues.len(), "Updating issue dataset");

        let fetched = self.fetch_enrichment().await;
        let enrichment: EnrichmentMap = fetched.items.into_iter().collect();
        let fetched_count = enrichment.len();

        let merge = dataset.merge(&enrichment);

        let mut responded = 0;
        for record in &mut dataset.issues {
            let result = match record.html_url() {
                Some(url) => {
                    maintainer_responded(self.api, self.policy, self.per_page, url, maintainers)
                        .await
                }
                None => {
                    warn!(repo = %repo, "Record has no html_url, skipping maintainer check");
                    false
                }
            };
            if result {
                responded += 1;
            }
            record.set_maintainer_responded(result);
        }

        info!(
            repo = %repo,
            merged = merge.merged,
            missing = merge.missing.len(),
            maintainer_responded = responded,
            "Issue dataset updated"
        );

        UpdateReport {
            fetched: fetched_count,
            merge,
            maintainer_responded: responded,
            listing_error: fetched.error,
        }
    }
}
