//! Releases command - fetch and classify repository releases

use std::path::{Path, PathBuf};

use clap::Args;
use insights_core::release::write_releases_csv;
use insights_core::{Config, Secrets};
use insights_github::{fetch_releases, GitHubClient, RetryPolicy};
use tracing::{info, warn};

/// Fetch all published releases and write them as `tag,published_at,type` CSV
#[derive(Args, Debug)]
pub struct ReleasesArgs {
    /// Repository (owner/repo or GitHub URL)
    pub repo: String,

    /// CSV file to write
    pub output: PathBuf,
}

impl ReleasesArgs {
    /// Execute the releases command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let token = Secrets::resolve_github_token()?;
        releases(config, token.as_deref(), &self.repo, &self.output).await
    }
}

pub async fn releases(
    config: &Config,
    token: Option<&str>,
    repo: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let client = GitHubClient::from_url(repo, token, &config.github)?;
    let policy = RetryPolicy::from(&config.retry);

    let fetched = fetch_releases(&client, &policy, config.github.per_page).await;
    if let Some(err) = &fetched.error {
        warn!(repo, error = %err, "Release listing incomplete, writing partial list");
    }

    write_releases_csv(output, &fetched.items)?;
    info!(
        repo,
        output = %output.display(),
        count = fetched.items.len(),
        "Wrote releases"
    );
    Ok(())
}
