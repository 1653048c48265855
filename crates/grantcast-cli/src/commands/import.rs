use std::path::Path;

use chrono::NaiveDate;
use grantcast_core::ImportBatch;

use super::{open_engine, print_json};

pub fn run(path: &Path, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let batch = ImportBatch::from_path(path)?;
    let engine = open_engine(today)?;
    let summary = engine.ingest(&batch)?;
    for message in &summary.rejected {
        tracing::warn!(%message, "rejected import entry");
    }
    print_json(&summary)
}
