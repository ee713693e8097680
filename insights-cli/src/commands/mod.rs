//! CLI command implementations

pub mod convert;
pub mod process;
pub mod releases;
pub mod summary;
pub mod update;

pub use convert::ConvertArgs;
pub use process::ProcessArgs;
pub use releases::ReleasesArgs;
pub use summary::SummaryArgs;
pub use update::UpdateIssuesArgs;
