//! Update-issues command - enrich an issue-metrics JSON file

use std::path::{Path, PathBuf};

use clap::Args;
use insights_core::{Config, IssueDataset, MaintainerSet, Secrets};
use insights_github::{Enricher, GitHubClient, RetryPolicy};
use tracing::{info, warn};

/// Add milestone, assignee, linked-PR and maintainer-response data to an
/// issue-metrics JSON file
#[derive(Args, Debug)]
pub struct UpdateIssuesArgs {
    /// Issue-metrics JSON file to read
    pub input: PathBuf,

    /// Repository (owner/repo or GitHub URL)
    pub repo: String,

    /// Where to write the enriched JSON
    pub output: PathBuf,

    /// Comma-separated maintainer logins (defaults to the configured list)
    #[arg(short, long)]
    pub maintainers: Option<String>,

    /// Delete the input file after the output is written
    #[arg(long)]
    pub remove_input: bool,
}

impl UpdateIssuesArgs {
    /// Execute the update-issues command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let maintainers = resolve_maintainers(self.maintainers.as_deref(), &self.repo, config);
        let token = Secrets::resolve_github_token()?;
        update_issues(
            config,
            token.as_deref(),
            &self.input,
            &self.repo,
            &self.output,
            &maintainers,
            self.remove_input,
        )
        .await
    }
}

/// Maintainers from the flag, else from the matching configured repository
pub fn resolve_maintainers(flag: Option<&str>, repo: &str, config: &Config) -> MaintainerSet {
    if let Some(list) = flag {
        return MaintainerSet::parse(list);
    }

    let configured = insights_github::parse_github_url(repo)
        .ok()
        .and_then(|(owner, name)| config.repo(&format!("{}/{}", owner, name)))
        .or_else(|| config.repo(repo));

    match configured {
        Some(entry) => entry.maintainer_set(),
        None => {
            warn!(repo, "No maintainers configured, every issue will be marked unanswered");
            MaintainerSet::default()
        }
    }
}

/// Enrich `input` from `repo` and write the result to `output`
///
/// The input is only removed once the output has been written.
pub async fn update_issues(
    config: &Config,
    token: Option<&str>,
    input: &Path,
    repo: &str,
    output: &Path,
    maintainers: &MaintainerSet,
    remove_input: bool,
) -> anyhow::Result<()> {
    let client = GitHubClient::from_url(repo, token, &config.github)?;
    let mut dataset = IssueDataset::load(input)?;

    let policy = RetryPolicy::from(&config.retry);
    let report = Enricher::new(&client, &policy, config.github.per_page)
        .update_dataset(&mut dataset, maintainers)
        .await;

    if let Some(err) = &report.listing_error {
        warn!(repo, error = %err, "Issue listing incomplete, output has partial enrichment");
    }

    dataset.save(output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        merged = report.merge.merged,
        missing = report.merge.missing.len(),
        "Wrote enriched issues"
    );

    if remove_input {
        std::fs::remove_file(input)?;
        info!(path = %input.display(), "Removed input file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const METRICS: &str = r#"{
        "issues": [
            {
                "title": "Plot fails",
                "html_url": "https://github.com/holoviz/panel/issues/42",
                "created_at": "2024-01-01T00:00:00Z",
                "time_to_close": null
            }
        ]
    }"#;

    /// Config pointing at a server that answers every listing with an empty page
    async fn empty_github() -> (MockServer, Config) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.github.api_url = server.uri();
        config.retry.throttle = Duration::ZERO;
        (server, config)
    }

    fn metrics_file(dir: &TempDir) -> PathBuf {
        let input = dir.path().join("panel_metrics.json");
        std::fs::write(&input, METRICS).unwrap();
        input
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_output() {
        let (_server, config) = empty_github().await;
        let dir = TempDir::new().unwrap();
        let input = metrics_file(&dir);
        let output = dir.path().join("panel_updated.json");

        let result = update_issues(
            &config,
            None,
            &input,
            "holoviz/panel",
            &output,
            &MaintainerSet::default(),
            true,
        )
        .await;

        assert!(result.is_err());
        assert!(!output.exists());
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_remove_input_after_write() {
        let (_server, config) = empty_github().await;
        let dir = TempDir::new().unwrap();
        let input = metrics_file(&dir);
        let output = dir.path().join("panel_updated.json");

        update_issues(
            &config,
            Some("test-token"),
            &input,
            "holoviz/panel",
            &output,
            &MaintainerSet::default(),
            true,
        )
        .await
        .unwrap();

        assert!(!input.exists());
        let written = IssueDataset::load(&output).unwrap();
        assert_eq!(written.issues.len(), 1);
        assert_eq!(written.issues[0].maintainer_responded(), Some(false));
    }

    #[tokio::test]
    async fn test_input_kept_when_write_fails() {
        let (_server, config) = empty_github().await;
        let dir = TempDir::new().unwrap();
        let input = metrics_file(&dir);
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "").unwrap();
        let output = blocker.join("panel_updated.json");

        let result = update_issues(
            &config,
            Some("test-token"),
            &input,
            "holoviz/panel",
            &output,
            &MaintainerSet::default(),
            true,
        )
        .await;

        assert!(result.is_err());
        assert!(input.exists());
    }

    #[test]
    fn test_flag_wins_over_config() {
        let config = Config::default();
        let set = resolve_maintainers(Some("Alice, bob"), "holoviz/panel", &config);
        assert_eq!(set.to_sorted_vec(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_configured_maintainers_by_url() {
        let config = Config::default();
        let set = resolve_maintainers(None, "https://github.com/holoviz/datashader", &config);
        assert!(set.contains("jbednar"));
        assert!(set.contains("Hoxbro"));
    }

    #[test]
    fn test_unknown_repo_has_no_maintainers() {
        let config = Config::default();
        assert!(resolve_maintainers(None, "someone/else", &config).is_empty());
    }
}
