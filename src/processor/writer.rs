//! CSV output for tables.
//!
//! Writes the table header plus a trailing `FileName` provenance column,
//! then every row followed by the file it was parsed from. Records go
//! through `csv::Writer`, which quotes fields holding a comma, quote, CR or
//! LF. Fields with leading or trailing whitespace must be quoted too, which
//! no `QuoteStyle` expresses per field, so records holding one are written
//! with `QuoteStyle::Always`.

use crate::constants::{PROVENANCE_COLUMN, is_safe_table_name, output_filename};
use crate::error::{Result, XerError};
use crate::models::Table;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const WRITE_BUFFER_BYTES: usize = 256 * 1024;

/// A table written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes tables as `<output_dir>/<table name>.csv`
#[derive(Debug, Clone)]
pub struct CsvWriter {
    output_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target file for `table_name`, refusing names that would leave the
    /// output directory
    pub fn output_path(&self, table_name: &str) -> Result<PathBuf> {
        if !is_safe_table_name(table_name) {
            return Err(XerError::UnsafeTableName {
                name: table_name.to_string(),
            });
        }
        Ok(self.output_dir.join(output_filename(table_name)))
    }

    /// Write `table` to its CSV file.
    ///
    /// Returns `Ok(None)` without touching the disk when the table has no
    /// header. The file is flushed and closed before this returns.
    pub fn write_table(&self, table: &Table) -> Result<Option<WrittenTable>> {
        if !table.has_headers() {
            debug!("Skipping {}: no header", table.name());
            return Ok(None);
        }
        let path = self.output_path(table.name())?;

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| XerError::write(&self.output_dir, e))?;

        let file = File::create(&path).map_err(|e| XerError::write(&path, e))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

        let rows = write_csv(table, &mut writer).map_err(|e| XerError::write(&path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| XerError::write(&path, e.into_error()))?;
        file.sync_all().map_err(|e| XerError::write(&path, e))?;
        drop(file);

        debug!("Wrote {} rows to {}", rows, path.display());
        Ok(Some(WrittenTable {
            name: table.name().to_string(),
            path,
            rows,
        }))
    }
}

/// Serialize `table` to any writer, returning the number of data rows
pub fn write_csv<W: Write>(table: &Table, writer: &mut W) -> io::Result<usize> {
    let mut csv_writer = record_writer(QuoteStyle::Necessary, &mut *writer);

    let mut header: Vec<&str> = table.headers().iter().map(|h| h.as_ref()).collect();
    header.push(PROVENANCE_COLUMN);
    csv_writer = write_record(csv_writer, &header)?;

    let mut record: Vec<&str> = Vec::with_capacity(header.len());
    for row in table.rows() {
        record.clear();
        record.extend(row.fields().iter().map(|f| f.as_ref()));
        record.push(row.file_name());
        csv_writer = write_record(csv_writer, &record)?;
    }
    csv_writer.flush()?;
    Ok(table.row_count())
}

fn record_writer<W: Write>(style: QuoteStyle, writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .quote_style(style)
        .terminator(Terminator::CRLF)
        .has_headers(false)
        .from_writer(writer)
}

fn write_record<'a, W: Write>(
    mut csv_writer: csv::Writer<&'a mut W>,
    record: &[&str],
) -> io::Result<csv::Writer<&'a mut W>> {
    if !record.iter().any(|field| has_edge_whitespace(field)) {
        csv_writer.write_record(record).map_err(io::Error::from)?;
        return Ok(csv_writer);
    }
    // Buffered records must land before this one
    let inner = csv_writer.into_inner().map_err(|e| e.into_error())?;
    let mut quoted = record_writer(QuoteStyle::Always, &mut *inner);
    quoted.write_record(record)?;
    quoted.flush()?;
    drop(quoted);
    Ok(record_writer(QuoteStyle::Necessary, inner))
}

/// Leading or trailing whitespace, which plain CSV readers may trim
pub fn has_edge_whitespace(value: &str) -> bool {
    value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace)
}
