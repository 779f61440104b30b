//! CSV ingest.
//!
//! This module only turns a CSV file into a `RawTable` of trimmed string cells.
//! Column resolution and row validation live in `data::dataset`, so the same
//! rules apply to files and to in-memory tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::RawTable;
use crate::error::PseError;

/// Read a trial CSV from disk.
pub fn load_table(path: &Path) -> Result<RawTable, PseError> {
    let file = File::open(path).map_err(|e| PseError::io(path, e))?;
    let table = read_table(file)?;
    log::info!(
        "read {} rows x {} columns from '{}'",
        table.rows().len(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

/// Read a trial CSV from any reader.
///
/// Rows may have fewer or more cells than the header; missing cells read as
/// blank and are handled by row validation.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, PseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(PseError::invalid_input("The input has no header row."));
    }
    let mut table = RawTable::new(headers.iter());

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        // Prefer the reader's own line number (handles quoted newlines).
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        table.push_row_at(line, record.iter());
    }

    Ok(table)
}
