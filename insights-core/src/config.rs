//! Configuration management for holoviz-insights
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (INSIGHTS_*)
//! 3. Config file (~/.config/holoviz-insights/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::maintainers::MaintainerSet;
use crate::{Error, Result};

/// GitHub API settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// Base URL of the REST API
    pub api_url: String,

    /// Page size for listings (GitHub caps this at 100)
    pub per_page: u8,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            per_page: 100,
            user_agent: concat!("holoviz-insights/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Retry and throttling settings for API requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per request before giving up on transient failures
    pub max_attempts: u32,

    /// Linear backoff unit; attempt `n` waits `n * backoff`
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,

    /// Wait used when a rate-limit response carries no reset time
    #[serde(with = "humantime_serde")]
    pub rate_limit_fallback: Duration,

    /// Consecutive rate-limit waits on one request before giving up
    pub max_rate_limit_waits: u32,

    /// Pause before every per-issue request
    #[serde(with = "humantime_serde")]
    pub throttle: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            rate_limit_fallback: Duration::from_secs(60),
            max_rate_limit_waits: 10,
            throttle: Duration::from_millis(100),
        }
    }
}

/// Where datasets are read from and written to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSettings {
    pub dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

/// A tracked repository and its maintainers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoConfig {
    /// Short name used for file names (e.g. `panel`)
    pub name: String,

    /// `owner/repo`
    pub repo: String,

    #[serde(default)]
    pub maintainers: Vec<String>,
}

impl RepoConfig {
    fn new(name: &str, repo: &str, maintainers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            repo: repo.to_string(),
            maintainers: maintainers.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn maintainer_set(&self) -> MaintainerSet {
        MaintainerSet::new(&self.maintainers)
    }

    /// Input issue-metrics JSON for this repository
    pub fn metrics_json(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_metrics.json", self.name))
    }

    /// Enriched issue JSON
    pub fn updated_json(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_updated.json", self.name))
    }

    /// Parquet issue table
    pub fn metrics_parquet(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_metrics.parq", self.name))
    }

    /// Releases CSV
    pub fn releases_csv(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_releases.csv", self.name))
    }
}

fn default_repos() -> Vec<RepoConfig> {
    vec![
        RepoConfig::new(
            "holoviews",
            "holoviz/holoviews",
            &["hoxbro", "philippjfr", "jlstevens"],
        ),
        RepoConfig::new(
            "hvplot",
            "holoviz/hvplot",
            &["maximlt", "philippjfr", "hoxbro", "ahuang11"],
        ),
        RepoConfig::new(
            "panel",
            "holoviz/panel",
            &["philippjfr", "ahaung11", "maximlt", "hoxbro"],
        ),
        RepoConfig::new(
            "datashader",
            "holoviz/datashader",
            &["jbednar", "philippjfr", "hoxbro", "amaloney"],
        ),
    ]
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubSettings,
    pub retry: RetrySettings,
    pub data: DataSettings,
    pub repos: Vec<RepoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GitHubSettings::default(),
            retry: RetrySettings::default(),
            data: DataSettings::default(),
            repos: default_repos(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/holoviz-insights/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("holoviz-insights").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.github.per_page == 0 || self.github.per_page > 100 {
            return Err(Error::Config(format!(
                "github.per_page must be between 1 and 100, got {}",
                self.github.per_page
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - INSIGHTS_API_URL: GitHub REST API base URL
    /// - INSIGHTS_DATA_DIR: Data directory
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(api_url) = std::env::var("INSIGHTS_API_URL") {
            self.github.api_url = api_url;
        }

        if let Ok(dir) = std::env::var("INSIGHTS_DATA_DIR") {
            self.data.dir = PathBuf::from(dir);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, api_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = api_url {
            self.github.api_url = url;
        }

        if let Some(dir) = data_dir {
            self.data.dir = dir;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(api_url: Option<String>, data_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(api_url, data_dir))
    }

    /// Find a repository by short name or `owner/repo`
    pub fn repo(&self, key: &str) -> Option<&RepoConfig> {
        self.repos
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(key) || r.repo.eq_ignore_ascii_case(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.rate_limit_fallback, Duration::from_secs(60));
        assert_eq!(config.retry.max_rate_limit_waits, 10);
        assert_eq!(config.retry.throttle, Duration::from_millis(100));
        assert_eq!(config.repos.len(), 4);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some("http://localhost:8080".to_string()),
            Some(PathBuf::from("/tmp/data")),
        );

        assert_eq!(config.github.api_url, "http://localhost:8080");
        assert_eq!(config.data.dir, PathBuf::from("/tmp/data"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[github]
per_page = 50

[retry]
max_attempts = 5
backoff = "500ms"
rate_limit_fallback = "2m"

[[repos]]
name = "lumen"
repo = "holoviz/lumen"
maintainers = ["philippjfr"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.github.per_page, 50);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, Duration::from_millis(500));
        assert_eq!(config.retry.rate_limit_fallback, Duration::from_secs(120));
        assert_eq!(config.retry.throttle, Duration::from_millis(100));
        assert_eq!(config.repos.len(), 1);
        assert!(config.repos[0].maintainer_set().contains("PhilippJFR"));
    }

    #[test]
    fn test_invalid_per_page_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[github]\nper_page = 0\n").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("per_page"));
    }

    #[test]
    fn test_repo_lookup_and_paths() {
        let config = Config::default();
        let panel = config.repo("holoviz/panel").unwrap();
        assert_eq!(panel.name, "panel");
        assert_eq!(config.repo("Panel"), Some(panel));
        assert!(config.repo("lumen").is_none());

        let dir = Path::new("data");
        assert_eq!(panel.metrics_json(dir), PathBuf::from("data/panel_metrics.json"));
        assert_eq!(panel.updated_json(dir), PathBuf::from("data/panel_updated.json"));
        assert_eq!(panel.metrics_parquet(dir), PathBuf::from("data/panel_metrics.parq"));
        assert_eq!(panel.releases_csv(dir), PathBuf::from("data/panel_releases.csv"));
    }
}
