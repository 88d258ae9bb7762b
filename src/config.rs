//! Configuration management and validation.
//!
//! Settings come in layers: built-in defaults, then an optional TOML file,
//! then command-line overrides applied by the caller through the `with_*`
//! builders.

use crate::constants::{
    DEFAULT_HOURS_PER_DAY, DEFAULT_INTERN_MAX_LEN, DEFAULT_PROGRESS_LINE_INTERVAL,
};
use crate::error::{Result, XerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// System profiling information used to size worker pools
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// Number of logical CPUs available
    pub cpu_cores: usize,
}

impl SystemProfile {
    /// Auto-detect system capabilities
    pub fn detect() -> Self {
        Self {
            cpu_cores: num_cpus::get(),
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct XerConfig {
    /// Upper bound on files parsed or tables exported at the same time
    pub workers: usize,

    /// Lines read between parser progress checks
    pub progress_line_interval: usize,

    /// Hours per day assumed when a calendar leaves `day_hr_cnt` blank
    pub default_hours_per_day: f64,

    /// Field values up to this many bytes are interned while parsing
    pub intern_max_len: usize,

    /// Clear the intern and date caches at the start of each parse batch
    pub clear_caches_between_runs: bool,

    /// Export base tables alongside enhanced ones when no table list is given
    pub include_base_tables: bool,
}

impl Default for XerConfig {
    fn default() -> Self {
        Self {
            workers: SystemProfile::detect().cpu_cores.max(1),
            progress_line_interval: DEFAULT_PROGRESS_LINE_INTERVAL,
            default_hours_per_day: DEFAULT_HOURS_PER_DAY,
            intern_max_len: DEFAULT_INTERN_MAX_LEN,
            clear_caches_between_runs: true,
            include_base_tables: false,
        }
    }
}

impl XerConfig {
    /// Default config file location: `<config dir>/xer-processor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("xer-processor").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            XerError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            XerError::configuration(format!(
                "Invalid config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, else the default file if it exists, else defaults
    pub fn load_layered(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Reject settings the processor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(XerError::configuration("workers must be at least 1"));
        }
        if self.progress_line_interval == 0 {
            return Err(XerError::configuration(
                "progress_line_interval must be at least 1",
            ));
        }
        if !self.default_hours_per_day.is_finite() || self.default_hours_per_day <= 0.0 {
            return Err(XerError::configuration(format!(
                "default_hours_per_day must be positive, got {}",
                self.default_hours_per_day
            )));
        }
        Ok(())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_progress_line_interval(mut self, lines: usize) -> Self {
        self.progress_line_interval = lines;
        self
    }

    pub fn with_default_hours_per_day(mut self, hours: f64) -> Self {
        self.default_hours_per_day = hours;
        self
    }

    pub fn with_intern_max_len(mut self, bytes: usize) -> Self {
        self.intern_max_len = bytes;
        self
    }

    pub fn with_cache_clearing(mut self, enabled: bool) -> Self {
        self.clear_caches_between_runs = enabled;
        self
    }

    pub fn with_base_tables(mut self, enabled: bool) -> Self {
        self.include_base_tables = enabled;
        self
    }
}
