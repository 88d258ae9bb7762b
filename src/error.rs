//! Error handling for XER processing operations.
//!
//! Only hard failures live here: unreadable inputs, unwritable outputs,
//! bad configuration and crashed workers. Malformed-but-tolerable input is
//! repaired where it is detected and missing prerequisites surface as
//! `Ok(None)` from the transformer, so neither appears in this enum.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XerError {
    #[error(
        "Failed to read XER file {path} at line {line} ({bytes_read} bytes consumed): {source}"
    )]
    Parse {
        path: PathBuf,
        line: usize,
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("No XER files found under: {path}")]
    NoInputFiles { path: PathBuf },

    #[error("Table name {name:?} cannot be used as a file name")]
    UnsafeTableName { name: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Worker for {unit} did not complete: {reason}")]
    Task { unit: String, reason: String },
}

impl XerError {
    /// Wrap a read failure with the position reached in the file
    pub fn parse(
        path: impl Into<PathBuf>,
        line: usize,
        bytes_read: u64,
        source: std::io::Error,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            bytes_read,
            source,
        }
    }

    /// Wrap a write failure with the target file
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a worker failure for the named unit
    pub fn task(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Task {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_position() {
        let err = XerError::parse(
            "plan.xer",
            42,
            1024,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes"),
        );
        let message = err.to_string();
        assert!(message.contains("plan.xer"));
        assert!(message.contains("line 42"));
        assert!(message.contains("1024 bytes"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_write_error_names_file() {
        let err = XerError::write(
            "out/01_XER_TASK.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("01_XER_TASK.csv"));
    }

    #[test]
    fn test_unsafe_table_name_quotes_name() {
        let err = XerError::UnsafeTableName {
            name: "../escaped".to_string(),
        };
        assert!(err.to_string().contains("\"../escaped\""));
    }
}
