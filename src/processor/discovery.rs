//! Input discovery
//!
//! Expands the paths given on the command line into the list of XER files
//! to parse. Files named explicitly are taken as-is; directories are walked
//! recursively for `*.xer` files.

use crate::constants::XER_EXTENSION;
use crate::error::{Result, XerError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Sorted, de-duplicated input files for a mix of files and directories
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for path in paths {
        if !path.exists() {
            return Err(XerError::InputNotFound { path: path.clone() });
        }
        if path.is_file() {
            files.insert(path.clone());
            continue;
        }

        let mut found = 0usize;
        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let candidate = entry.path();
            if entry.file_type().is_file() && is_xer_file(candidate) {
                files.insert(candidate.to_path_buf());
                found += 1;
            }
        }
        debug!("Found {} XER files under {}", found, path.display());
    }

    if files.is_empty() {
        let path = match paths {
            [single] => single.clone(),
            _ => PathBuf::from("."),
        };
        return Err(XerError::NoInputFiles { path });
    }

    Ok(files.into_iter().collect())
}

/// Case-insensitive `.xer` extension check
pub fn is_xer_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(XER_EXTENSION))
}
