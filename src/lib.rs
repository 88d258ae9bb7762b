//! XER Processor Library
//!
//! Reads Primavera P6 XER exports (tab-delimited, `%T`/`%F`/`%R` sections)
//! and turns them into CSV tables for reporting.
//!
//! This library provides tools for:
//! - Streaming many XER files into one merged in-memory [`DataStore`]
//! - Decoding calendar descriptions into per-day work hours and exceptions
//! - Building enhanced tables with composite `_key` columns, readable
//!   status labels, percent complete and a baseline snapshot
//! - Writing any table to CSV with a trailing `FileName` column
//! - Running both stages concurrently with progress reporting and
//!   cooperative cancellation

pub mod caches;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod parser;
pub mod processor;
pub mod transform;

// Re-export commonly used types
pub use config::XerConfig;
pub use error::{Result, XerError};
pub use models::{DataRow, DataStore, Table};
pub use parser::XerParser;
pub use processor::progress::{NoProgress, ProgressSink};
pub use processor::writer::{CsvWriter, WrittenTable};
pub use processor::{ExportOutcome, ParseOutcome, UnitFailure, XerProcessor};
pub use transform::{EnhancedTable, Transformer, available_tables};
