//! Columnar materialization of enriched issue datasets
//!
//! Turns an [`IssueDataset`] into an Arrow record batch and writes it as a
//! Parquet file for the dashboards. `created_at` becomes a naive UTC timestamp
//! and the first column, duration fields become Int64 microsecond columns
//! (unparsable values are null), enrichment fields get fixed types, and every
//! other key is carried with an inferred scalar type. `label_metrics` is
//! dropped.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListBuilder, StringArray, StringBuilder,
    TimestampMicrosecondArray,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use tracing::{info, warn};

use crate::issue::{IssueDataset, IssueRecord, DURATION_FIELDS};
use crate::timeparse::parse_timestamp;
use crate::{Error, Result};

const DROPPED_FIELDS: [&str; 1] = ["label_metrics"];
const BOOL_FIELDS: [&str; 3] = ["has_linked_pr", "linked_pr_checked", "maintainer_responded"];

/// Arrow columns built from an issue dataset
#[derive(Debug, Clone)]
pub struct IssueTable {
    columns: Vec<(String, ArrayRef)>,
    num_rows: usize,
}

impl IssueTable {
    /// Build the table; fails if no record carries `created_at`
    pub fn from_dataset(dataset: &IssueDataset) -> Result<Self> {
        let issues = &dataset.issues;
        let present = |key: &str| issues.iter().any(|i| i.fields().contains_key(key));

        if !present("created_at") {
            return Err(Error::MissingField("created_at".to_string()));
        }

        let mut columns: Vec<(String, ArrayRef)> = Vec::new();

        let created: Vec<Option<i64>> = issues
            .iter()
            .map(|i| {
                i.fields()
                    .get("created_at")
                    .and_then(Value::as_str)
                    .and_then(parse_timestamp)
                    .map(|dt| dt.timestamp_micros())
            })
            .collect();
        columns.push((
            "created_at".to_string(),
            Arc::new(TimestampMicrosecondArray::from(created)),
        ));

        for key in DURATION_FIELDS {
            if !present(key) {
                warn!(column = key, "Column not found in data; skipping conversion");
                continue;
            }
            let values: Vec<Option<i64>> = issues
                .iter()
                .map(|i| i.duration(key).and_then(|d| d.num_microseconds()))
                .collect();
            columns.push((key.to_string(), Arc::new(Int64Array::from(values))));
        }

        if present("milestone") {
            let values: Vec<Option<String>> = issues
                .iter()
                .map(|i| i.milestone().map(str::to_string))
                .collect();
            columns.push(("milestone".to_string(), Arc::new(StringArray::from(values))));
        }

        if present("assignees") {
            columns.push(("assignees".to_string(), assignees_column(issues)));
        }

        for key in BOOL_FIELDS {
            if present(key) {
                let values: Vec<Option<bool>> = issues
                    .iter()
                    .map(|i| i.get(key).and_then(Value::as_bool))
                    .collect();
                columns.push((key.to_string(), Arc::new(BooleanArray::from(values))));
            }
        }

        let fixed: BTreeSet<&str> = ["created_at", "milestone", "assignees"]
            .into_iter()
            .chain(DURATION_FIELDS)
            .chain(BOOL_FIELDS)
            .chain(DROPPED_FIELDS)
            .collect();
        let other_keys: BTreeSet<&str> = issues
            .iter()
            .flat_map(|i| i.fields().keys().map(String::as_str))
            .filter(|k| !fixed.contains(k))
            .collect();

        for key in other_keys {
            columns.push((key.to_string(), inferred_column(issues, key)));
        }

        Ok(Self {
            columns,
            num_rows: issues.len(),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Ok(RecordBatch::try_from_iter(self.columns.iter().cloned())?)
    }

    /// Write the table as a Snappy-compressed Parquet file
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let batch = self.to_record_batch()?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        info!(path = %path.display(), rows = self.num_rows, "Parquet file saved");
        Ok(())
    }
}

fn assignees_column(issues: &[IssueRecord]) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for issue in issues {
        match issue.get("assignees").and_then(Value::as_array) {
            Some(list) => {
                for login in list.iter().filter_map(Value::as_str) {
                    builder.values().append_value(login);
                }
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

/// Pick the narrowest scalar type holding every non-null value of `key`
fn inferred_column(issues: &[IssueRecord], key: &str) -> ArrayRef {
    let values: Vec<Option<&Value>> = issues.iter().map(|i| i.get(key)).collect();
    let non_null = || values.iter().flatten();

    if non_null().all(|v| v.is_boolean()) {
        let col: Vec<Option<bool>> = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
        return Arc::new(BooleanArray::from(col));
    }
    if non_null().all(|v| v.is_i64()) {
        let col: Vec<Option<i64>> = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
        return Arc::new(Int64Array::from(col));
    }
    if non_null().all(|v| v.is_number()) {
        let col: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
        return Arc::new(Float64Array::from(col));
    }

    let col: Vec<Option<String>> = values
        .iter()
        .map(|v| {
            v.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Arc::new(StringArray::from(col))
}

/// Convert an issue-metrics JSON file into a Parquet file
///
/// Returns the number of rows written.
pub fn convert_json_to_parquet(json_path: &Path, parquet_path: &Path) -> Result<usize> {
    let dataset = IssueDataset::load(json_path)?;
    let table = IssueTable::from_dataset(&dataset)?;
    table.write_parquet(parquet_path)?;
    Ok(table.num_rows())
}
