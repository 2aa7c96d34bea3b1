// CSV export of the current result set

use crate::record::RegistryRecord;
use anyhow::{Context, Result};
use std::path::Path;

pub const EXPORT_FILE_NAME: &str = "building-register.csv";

/// Header row of column keys, then one row per record.
/// Every field is quoted and inner quotes are doubled.
/// Returns None for an empty result set: there is nothing to export.
pub fn export_csv(records: &[RegistryRecord], columns: &[String]) -> Result<Option<Vec<u8>>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(columns)
        .context("Failed to write CSV header")?;

    for record in records {
        writer
            .write_record(columns.iter().map(|key| record.text(key)))
            .context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV")?;
    Ok(Some(bytes))
}

/// Write the export to `dir/building-register.csv`; Ok(None) when there was nothing to write
pub fn save_csv(
    records: &[RegistryRecord],
    columns: &[String],
    dir: impl AsRef<Path>,
) -> Result<Option<std::path::PathBuf>> {
    let Some(bytes) = export_csv(records, columns)? else {
        return Ok(None);
    };
    let path = dir.as_ref().join(EXPORT_FILE_NAME);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = records.len(), "CSV exported");
    Ok(Some(path))
}
