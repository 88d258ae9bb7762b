//! XER line parser.
//!
//! Streams an export file line by line and rebuilds its section-tagged
//! tables into a [`DataStore`]. Only lines starting with `%T`, `%F` or `%R`
//! carry data; everything else is skipped. Row values are never trimmed so
//! payloads such as calendar descriptions survive intact.

use crate::caches::intern::{intern, intern_bounded};
use crate::config::XerConfig;
use crate::constants::{FIELD_DELIMITER, LINE_MARKER, TAG_FIELDS, TAG_ROW, TAG_TABLE};
use crate::error::{Result, XerError};
use crate::models::{DataRow, DataStore, Field, Table};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Parser for one XER file
#[derive(Debug, Clone)]
pub struct XerParser {
    progress_line_interval: usize,
    intern_max_len: usize,
}

impl XerParser {
    pub fn new(config: &XerConfig) -> Self {
        Self {
            progress_line_interval: config.progress_line_interval.max(1),
            intern_max_len: config.intern_max_len,
        }
    }

    /// Parse the file at `path`, reporting whole-number percentages through
    /// `progress` whenever they increase, then a final 100
    pub fn parse_file(&self, path: &Path, progress: impl FnMut(u8)) -> Result<DataStore> {
        let file = File::open(path).map_err(|e| XerError::parse(path, 0, 0, e))?;
        let total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);
        self.parse_reader(reader, path, &file_name, total_bytes, progress)
    }

    /// Parse from any buffered reader. `path` is only used for error context;
    /// `file_name` becomes every row's origin.
    pub fn parse_reader<R: BufRead>(
        &self,
        mut reader: R,
        path: &Path,
        file_name: &str,
        total_bytes: u64,
        mut progress: impl FnMut(u8),
    ) -> Result<DataStore> {
        let origin = intern(file_name);
        let mut state = SectionState::new(origin, self.intern_max_len);

        let mut buffer = Vec::new();
        let mut line_number = 0usize;
        let mut bytes_read = 0u64;
        let mut last_percent = 0u8;

        loop {
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|e| XerError::parse(path, line_number + 1, bytes_read, e))?;
            if read == 0 {
                break;
            }
            line_number += 1;
            bytes_read += read as u64;

            let decoded = decode_line(&buffer);
            let mut line = decoded.trim_end_matches(['\r', '\n']);
            if line_number == 1 {
                line = line.trim_start_matches('\u{feff}');
            }
            state.consume(line);

            if line_number % self.progress_line_interval == 0 && total_bytes > 0 {
                let percent = ((bytes_read.saturating_mul(100)) / total_bytes).min(100) as u8;
                if percent > last_percent {
                    last_percent = percent;
                    progress(percent);
                }
            }
        }

        let store = state.finish();
        debug!(
            "Parsed {}: {} lines, {} tables, {} rows",
            file_name,
            line_number,
            store.len(),
            store.total_rows()
        );
        progress(100);
        Ok(store)
    }
}

/// Tracks the table currently being filled
struct SectionState {
    origin: Field,
    intern_max_len: usize,
    current: Option<Table>,
    store: DataStore,
}

impl SectionState {
    fn new(origin: Field, intern_max_len: usize) -> Self {
        Self {
            origin,
            intern_max_len,
            current: None,
            store: DataStore::new(),
        }
    }

    fn consume(&mut self, line: &str) {
        let mut chars = line.chars();
        if chars.next() != Some(LINE_MARKER) {
            return;
        }
        let Some(tag) = chars.next() else {
            return;
        };
        let rest = chars.as_str();

        match tag {
            TAG_TABLE => {
                self.close_current();
                self.current = Some(Table::new(intern(rest.trim())));
            }
            TAG_FIELDS => {
                if let Some(table) = self.current.as_mut() {
                    let rest = rest.strip_prefix(FIELD_DELIMITER).unwrap_or(rest);
                    let headers = rest
                        .split(FIELD_DELIMITER)
                        .map(|name| intern(name.trim()))
                        .collect();
                    table.set_headers(headers);
                }
            }
            TAG_ROW => {
                if let Some(table) = self.current.as_mut().filter(|t| t.has_headers()) {
                    let rest = rest.strip_prefix(FIELD_DELIMITER).unwrap_or(rest);
                    let fields = rest
                        .split(FIELD_DELIMITER)
                        .map(|value| intern_bounded(value, self.intern_max_len))
                        .collect();
                    table.add_row(DataRow::new(fields, self.origin.clone()));
                }
            }
            _ => {}
        }
    }

    fn close_current(&mut self) {
        if let Some(table) = self.current.take() {
            if table.is_empty() {
                debug!("Dropping table {} with no rows", table.name());
            } else {
                self.store.insert(table);
            }
        }
    }

    fn finish(mut self) -> DataStore {
        self.close_current();
        self.store
    }
}

/// UTF-8 first; anything else is read as Windows-1252
fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}
