//! Integration tests for the processor module
//!
//! Drives parse and export over XER files written to temporary directories.


use crate::config::XerConfig;
use crate::transform::tests::sample_xer;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write one sample export per `(file name, data date)` pair
pub fn write_samples(temp_dir: &TempDir, files: &[(&str, &str)]) -> Vec<PathBuf> {
    let input = temp_dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    files
        .iter()
        .map(|(name, data_date)| {
            let path = input.join(name);
            fs::write(&path, sample_xer(data_date)).unwrap();
            path
        })
        .collect()
}

pub fn test_config() -> XerConfig {
    XerConfig::default()
        .with_workers(2)
        .with_progress_line_interval(1)
}
