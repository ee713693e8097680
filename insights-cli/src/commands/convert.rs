//! Convert command - issue-metrics JSON to Parquet

use std::path::{Path, PathBuf};

use clap::Args;
use insights_core::convert_json_to_parquet;
use tracing::info;

/// Convert an (enriched) issue-metrics JSON file into a Parquet table
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Issue-metrics JSON file
    pub input: PathBuf,

    /// Parquet file to write
    pub output: PathBuf,
}

impl ConvertArgs {
    /// Execute the convert command
    pub fn execute(&self) -> anyhow::Result<()> {
        convert(&self.input, &self.output)
    }
}

pub fn convert(input: &Path, output: &Path) -> anyhow::Result<()> {
    let rows = convert_json_to_parquet(input, output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows,
        "Converted issues to Parquet"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_writes_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("panel_updated.json");
        let output = dir.path().join("panel_metrics.parq");
        std::fs::write(
            &input,
            r#"{"issues": [{"html_url": "https://github.com/holoviz/panel/issues/1",
                "created_at": "2024-03-01T08:00:00Z",
                "time_to_first_response": "2:00:00",
                "time_to_close": null, "time_to_answer": null, "time_in_draft": null}]}"#,
        )
        .unwrap();

        convert(&input, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_missing_created_at_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.json");
        let output = dir.path().join("bad.parq");
        std::fs::write(&input, r#"{"issues": [{"html_url": "x"}]}"#).unwrap();

        assert!(convert(&input, &output).is_err());
        assert!(!output.exists());
    }
}
