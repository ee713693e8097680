//! Process command - refresh every configured repository

use clap::Args;
use insights_core::{Config, RepoConfig, Secrets};
use tracing::{error, info};

use super::convert::convert;
use super::releases::releases;
use super::update::update_issues;

/// Run update-issues, convert and releases for each configured repository
///
/// Reads `{name}_metrics.json` from the data directory and writes
/// `{name}_updated.json`, `{name}_metrics.parq` and `{name}_releases.csv`.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Only process these repositories (short name or owner/repo)
    #[arg(short, long = "repo")]
    pub repos: Vec<String>,

    /// Delete each `{name}_metrics.json` after it has been enriched
    #[arg(long)]
    pub remove_input: bool,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let selected = select_repos(config, &self.repos)?;
        let token = Secrets::resolve_github_token()?;
        let mut failed = Vec::new();

        for repo in selected {
            info!(repo = %repo.repo, "Processing repository");
            if let Err(e) = process_repo(config, token.as_deref(), repo, self.remove_input).await {
                error!(repo = %repo.repo, error = %e, "Processing failed");
                failed.push(repo.name.clone());
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("Failed to process: {}", failed.join(", "));
        }
        Ok(())
    }
}

fn select_repos<'a>(config: &'a Config, filter: &[String]) -> anyhow::Result<Vec<&'a RepoConfig>> {
    if filter.is_empty() {
        return Ok(config.repos.iter().collect());
    }

    filter
        .iter()
        .map(|key| {
            config
                .repo(key)
                .ok_or_else(|| anyhow::anyhow!("Repository not configured: {}", key))
        })
        .collect()
}

async fn process_repo(
    config: &Config,
    token: Option<&str>,
    repo: &RepoConfig,
    remove_input: bool,
) -> anyhow::Result<()> {
    let dir = &config.data.dir;
    let input = repo.metrics_json(dir);
    let updated = repo.updated_json(dir);

    update_issues(
        config,
        token,
        &input,
        &repo.repo,
        &updated,
        &repo.maintainer_set(),
        remove_input,
    )
    .await?;
    convert(&updated, &repo.metrics_parquet(dir))?;
    releases(config, token, &repo.repo, &repo.releases_csv(dir)).await?;

    info!(repo = %repo.repo, "Repository processed");
    Ok(())
}
