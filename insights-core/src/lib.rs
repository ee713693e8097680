//! Insights Core - data model and dataset preparation for holoviz-insights
//!
//! This crate holds the issue and release records behind the dashboards,
//! the enrichment merge, the release and maintainer classifiers, the
//! Parquet/CSV materializers and the metric aggregations.

pub mod config;
pub mod error;
pub mod issue;
pub mod maintainers;
pub mod materialize;
pub mod metrics;
pub mod release;
pub mod secrets;
pub mod timeparse;

pub use config::{Config, DataSettings, GitHubSettings, RepoConfig, RetrySettings};
pub use error::{Error, Result};
pub use issue::{
    issue_number_from_url, Enrichment, EnrichmentMap, IssueDataset, IssueRecord, IssueRow,
    MergeReport,
};
pub use maintainers::MaintainerSet;
pub use materialize::{convert_json_to_parquet, IssueTable};
pub use release::{classify_release, ReleaseRecord, ReleaseType};
pub use secrets::Secrets;
