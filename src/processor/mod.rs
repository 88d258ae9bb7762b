//! Batch orchestration.
//!
//! Parses many XER files concurrently into one merged [`DataStore`], then
//! exports a requested set of base and enhanced tables to CSV, again
//! concurrently. Both stages are bounded by the configured worker count,
//! report a non-decreasing `(percent, message)` stream and stop starting
//! new units once the cancellation token fires. Units already finished stay
//! in the outcome.

pub mod discovery;
pub mod progress;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::progress::{NoProgress, ProgressSink, ProgressTracker, overall_percent};
use self::writer::{CsvWriter, WrittenTable};

use crate::caches;
use crate::config::XerConfig;
use crate::constants::is_safe_table_name;
use crate::error::{Result, XerError};
use crate::models::{DataStore, Table};
use crate::parser::XerParser;
use crate::transform::{EnhancedTable, Transformer};

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A unit (file or table) that failed, with its error
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: XerError,
}

/// Result of parsing a batch of files
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Every successfully parsed file merged in input order
    pub store: DataStore,
    pub files_parsed: usize,
    pub failures: Vec<UnitFailure>,
    /// Some files were never started because cancellation was requested
    pub cancelled: bool,
}

/// Result of exporting a set of tables
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub written: Vec<WrittenTable>,
    /// Unknown names, missing base tables and enhanced tables whose
    /// prerequisites were absent
    pub skipped: Vec<String>,
    pub failures: Vec<UnitFailure>,
    pub cancelled: bool,
}

/// What one requested name resolved to
#[derive(Debug, Clone)]
enum ExportTarget {
    Base(String),
    Enhanced(EnhancedTable),
}

impl ExportTarget {
    fn label(&self) -> &str {
        match self {
            ExportTarget::Base(name) => name,
            ExportTarget::Enhanced(table) => table.name(),
        }
    }
}

enum UnitResult<T> {
    Done(T),
    NotStarted,
}

type ParsedFile = (PathBuf, UnitResult<Result<DataStore>>);

/// Parses and exports XER data with bounded parallelism
pub struct XerProcessor {
    config: XerConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl XerProcessor {
    pub fn new(config: XerConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &XerConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn workers(&self) -> usize {
        self.config.workers.max(1)
    }

    /// Parse every file and merge the results in input order.
    ///
    /// A file that fails is reported in `failures` without discarding the
    /// others.
    pub async fn parse_files(&self, paths: &[PathBuf]) -> ParseOutcome {
        if self.config.clear_caches_between_runs {
            caches::clear_all();
        }

        let total = paths.len();
        let tracker = Arc::new(ProgressTracker::new(self.progress.clone()));
        tracker.report(0, &format!("Parsing {} files", total));
        info!("Parsing {} XER files with {} workers", total, self.workers());

        let parser = XerParser::new(&self.config);
        let finished = Arc::new(AtomicUsize::new(0));

        let results: Vec<ParsedFile> = stream::iter(paths.to_vec())
            .map(|path| {
                let parser = parser.clone();
                let tracker = tracker.clone();
                let finished = finished.clone();
                let cancel = self.cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (path, UnitResult::NotStarted);
                    }
                    let unit = path.clone();
                    let result = task::spawn_blocking(move || {
                        let name = file_label(&unit);
                        let message = format!("Parsing {}", name);
                        let parsed = parser.parse_file(&unit, |local| {
                            let current = finished.load(Ordering::SeqCst) + 1;
                            tracker.report(overall_percent(current, local, total), &message);
                        });
                        let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                        tracker.report(
                            overall_percent(done, 100, total),
                            &format!("Parsed {}", name),
                        );
                        parsed
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(XerError::task(path.display().to_string(), e.to_string()))
                    });
                    (path, UnitResult::Done(result))
                }
            })
            .buffered(self.workers())
            .collect()
            .await;

        let mut outcome = ParseOutcome::default();
        for (path, result) in results {
            match result {
                UnitResult::Done(Ok(store)) => {
                    debug!(
                        "Merging {}: {} tables, {} rows",
                        path.display(),
                        store.len(),
                        store.total_rows()
                    );
                    outcome.store.merge(store);
                    outcome.files_parsed += 1;
                }
                UnitResult::Done(Err(e)) => {
                    error!("Failed to parse {}: {}", path.display(), e);
                    outcome.failures.push(UnitFailure {
                        unit: path.display().to_string(),
                        error: e,
                    });
                }
                UnitResult::NotStarted => outcome.cancelled = true,
            }
        }

        if outcome.cancelled {
            warn!(
                "Parsing cancelled after {} of {} files",
                outcome.files_parsed + outcome.failures.len(),
                total
            );
        } else {
            tracker.report(100, &format!("Parsed {} files", outcome.files_parsed));
        }
        info!(
            "Merged store holds {} tables, {} rows",
            outcome.store.len(),
            outcome.store.total_rows()
        );
        outcome
    }

    /// Enhanced table names, plus the base tables in `store` when configured
    pub fn default_table_names(&self, store: &DataStore) -> Vec<String> {
        let mut names: Vec<String> = EnhancedTable::ALL
            .iter()
            .map(|table| table.name().to_string())
            .collect();
        if self.config.include_base_tables {
            names.extend(store.table_names());
        }
        names
    }

    /// Write each named table to `<output_dir>/<name>.csv`.
    ///
    /// Names resolve to a base table in `store` or to an enhanced table
    /// built on demand. The primary task table is built at most once per
    /// call when the baseline is also requested.
    pub async fn export_tables(
        &self,
        store: Arc<DataStore>,
        names: &[String],
        output_dir: &Path,
    ) -> Result<ExportOutcome> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| XerError::write(output_dir, e))?;

        let mut outcome = ExportOutcome::default();
        let targets = resolve_targets(&store, names, &mut outcome.skipped);
        let total = targets.len();
        let tracker = Arc::new(ProgressTracker::new(self.progress.clone()));
        tracker.report(0, &format!("Exporting {} tables", total));
        info!("Exporting {} tables to {}", total, output_dir.display());

        let task_table = self.shared_task_table(&store, &targets).await?;
        let writer = CsvWriter::new(output_dir);
        let hours = self.config.default_hours_per_day;
        let finished = Arc::new(AtomicUsize::new(0));

        let results: Vec<(ExportTarget, UnitResult<Result<Option<WrittenTable>>>)> =
            stream::iter(targets)
                .map(|target| {
                    let store = store.clone();
                    let task_table = task_table.clone();
                    let writer = writer.clone();
                    let tracker = tracker.clone();
                    let finished = finished.clone();
                    let cancel = self.cancel.clone();
                    async move {
                        if cancel.is_cancelled() {
                            return (target, UnitResult::NotStarted);
                        }
                        let unit = target.clone();
                        let result = task::spawn_blocking(move || {
                            let label = unit.label().to_string();
                            let current = finished.load(Ordering::SeqCst) + 1;
                            tracker.report(
                                overall_percent(current, 0, total),
                                &format!("Exporting {}", label),
                            );
                            let written =
                                export_one(&store, &unit, task_table.as_deref(), &writer, hours);
                            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                            tracker.report(
                                overall_percent(done, 100, total),
                                &format!("Finished {}", label),
                            );
                            written
                        })
                        .await
                        .unwrap_or_else(|e| Err(XerError::task(target.label(), e.to_string())));
                        (target, UnitResult::Done(result))
                    }
                })
                .buffer_unordered(self.workers())
                .collect()
                .await;

        for (target, result) in results {
            match result {
                UnitResult::Done(Ok(Some(written))) => {
                    info!("Wrote {} ({} rows)", written.path.display(), written.rows);
                    outcome.written.push(written);
                }
                UnitResult::Done(Ok(None)) => outcome.skipped.push(target.label().to_string()),
                UnitResult::Done(Err(e)) => {
                    error!("Failed to export {}: {}", target.label(), e);
                    outcome.failures.push(UnitFailure {
                        unit: target.label().to_string(),
                        error: e,
                    });
                }
                UnitResult::NotStarted => outcome.cancelled = true,
            }
        }
        outcome.written.sort_by(|a, b| a.name.cmp(&b.name));

        if outcome.cancelled {
            warn!("Export cancelled after {} tables", outcome.written.len());
        } else {
            tracker.report(100, &format!("Exported {} tables", outcome.written.len()));
        }
        Ok(outcome)
    }

    /// Build the primary task table up front when the baseline needs it
    async fn shared_task_table(
        &self,
        store: &Arc<DataStore>,
        targets: &[ExportTarget],
    ) -> Result<Option<Arc<Table>>> {
        let needs_baseline = targets
            .iter()
            .any(|t| matches!(t, ExportTarget::Enhanced(table) if table.depends_on_task_table()));
        if !needs_baseline || self.cancel.is_cancelled() {
            return Ok(None);
        }

        let store = store.clone();
        let hours = self.config.default_hours_per_day;
        let table = task::spawn_blocking(move || {
            Transformer::new(&store, hours).build(EnhancedTable::Task, None)
        })
        .await
        .map_err(|e| XerError::task(EnhancedTable::Task.name(), e.to_string()))?;
        Ok(table.map(Arc::new))
    }
}

/// Map requested names to export targets; unknown names and base tables
/// whose names cannot be file names go to `skipped`
fn resolve_targets(
    store: &DataStore,
    names: &[String],
    skipped: &mut Vec<String>,
) -> Vec<ExportTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || !seen.insert(name.to_ascii_uppercase()) {
            continue;
        }
        if let Some(table) = EnhancedTable::from_name(name) {
            targets.push(ExportTarget::Enhanced(table));
        } else if let Some(table) = store.get(name) {
            if is_safe_table_name(table.name()) {
                targets.push(ExportTarget::Base(table.name().to_string()));
            } else {
                warn!("Table name {:?} is not a usable file name", table.name());
                skipped.push(table.name().to_string());
            }
        } else {
            warn!("Unknown or absent table: {}", name);
            skipped.push(name.to_string());
        }
    }
    targets
}

/// Build (if enhanced) and write one table
fn export_one(
    store: &DataStore,
    target: &ExportTarget,
    task_table: Option<&Table>,
    writer: &CsvWriter,
    default_hours_per_day: f64,
) -> Result<Option<WrittenTable>> {
    match target {
        ExportTarget::Base(name) => match store.get(name) {
            Some(table) => writer.write_table(table),
            None => Ok(None),
        },
        ExportTarget::Enhanced(kind) => {
            let built;
            let table = match (kind, task_table) {
                (EnhancedTable::Task, Some(cached)) => cached,
                _ => match Transformer::new(store, default_hours_per_day).build(*kind, task_table) {
                    Some(table) => {
                        built = table;
                        &built
                    }
                    None => return Ok(None),
                },
            };
            writer.write_table(table)
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
