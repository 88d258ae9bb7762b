//! Progress reporting for parse and export runs.
//!
//! The processor emits a `(percent, message)` stream through a
//! [`ProgressSink`]. [`ProgressTracker`] keeps each run's stream
//! non-decreasing even though units finish out of order, and
//! [`ConsoleProgress`] renders it as an indicatif bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};

/// Receiver of progress updates; implemented for plain closures
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Sink that discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Overall percent for a batch of units:
/// `((completed - 1) * 100 + unit_percent) / total`, clamped to [0, 100].
///
/// `completed` counts the unit currently reporting.
pub fn overall_percent(completed: usize, unit_percent: u8, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = completed.saturating_sub(1).min(total) as u64;
    let percent = (done * 100 + u64::from(unit_percent.min(100))) / total as u64;
    percent.min(100) as u8
}

/// Clamps one run's updates so the percent never goes backwards.
///
/// The sink is called under the lock so concurrent workers cannot deliver
/// updates out of order.
pub struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    highest: Mutex<u8>,
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            highest: Mutex::new(0),
        }
    }

    pub fn report(&self, percent: u8, message: &str) {
        let mut highest = self.highest.lock().unwrap_or_else(|e| e.into_inner());
        *highest = (*highest).max(percent.min(100));
        self.sink.report(*highest, message);
    }

    pub fn current(&self) -> u8 {
        *self.highest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Terminal progress bar driven by the percent stream
#[derive(Debug, Clone)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% | {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    /// Progress bar that draws nothing, for `--quiet`
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, percent: u8, message: &str) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(message.to_string());
    }
}
