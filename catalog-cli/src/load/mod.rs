//! Upload CSV rows as documents
//!
//! Every data row becomes one new document in the target collection, with the
//! header names as field names and the cell text as string values. Nothing is
//! deduplicated: loading the same file twice creates every document twice.

pub mod rows;

pub use rows::CsvSource;

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::api::DocumentStore;
use crate::report::{FailurePolicy, ItemOutcome, RunReport};

/// Create one document per row of `csv_path` in `collection`
pub async fn load_csv(
    store: &dyn DocumentStore,
    csv_path: &Path,
    collection: &str,
    policy: FailurePolicy,
) -> Result<RunReport> {
    let mut source = CsvSource::open(csv_path)?;
    log::info!(
        "Loading {} into '{}' (columns: {})",
        csv_path.display(),
        collection,
        source.headers().iter().collect::<Vec<_>>().join(", ")
    );

    let mut report = RunReport::new();
    let mut record_index = 0usize;

    for next in source.rows() {
        record_index += 1;
        let (item, result) = match next {
            Ok(numbered) => {
                let item = format!("line {}", numbered.line);
                let result = store
                    .create_document(collection, numbered.row.fields())
                    .await
                    .with_context(|| format!("Failed to upload CSV line {}", numbered.line))
                    .map(|doc| {
                        log::info!("line {} -> {}", numbered.line, doc.name);
                        ItemOutcome::created(item.clone(), doc.id)
                    });
                (item, result)
            }
            Err(err) => {
                let item = format!("record {}", record_index);
                let result: Result<ItemOutcome> = Err(err).with_context(|| {
                    format!("Failed to parse CSV record {} of {}", record_index, csv_path.display())
                });
                (item, result)
            }
        };
        report.handle(policy, &item, result)?;
    }

    if report.is_success() {
        println!(
            "{}",
            format!(
                "{} document(s) added to '{}'.",
                report.created_count(),
                collection
            )
            .bright_green()
        );
    } else {
        println!(
            "{}",
            format!(
                "{} document(s) added to '{}', {} row(s) failed.",
                report.created_count(),
                collection,
                report.failed_count()
            )
            .yellow()
        );
    }

    Ok(report)
}
