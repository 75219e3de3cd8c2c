//! CSV output.
//!
//! One header row with the fifteen column names, then one row per record.
//! Quoting and CRLF record terminators follow RFC 4180, so commas, quotes
//! and line breaks inside a field survive a round trip.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use calexport_core::{FLAT_RECORD_HEADERS, FlatRecord};

use crate::error::{ExportError, ExportResult};

/// Writes `records` as CSV to any writer.
pub fn write_records<W: Write>(writer: W, records: &[FlatRecord]) -> csv::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    // serialize() only emits the header alongside the first row
    if records.is_empty() {
        csv.write_record(FLAT_RECORD_HEADERS)?;
    }
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Creates (or truncates) `path` and writes `records` into it.
pub fn write_csv_file(path: &Path, records: &[FlatRecord]) -> ExportResult<()> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_records(file, records).map_err(|source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    })
}
