//! Command-line interface.
//!
//! A thin shell over [`XerProcessor`]: discover inputs, parse them, then
//! export the requested tables while drawing a progress bar, and finish
//! with a colored summary.

use crate::caches;
use crate::config::XerConfig;
use crate::constants::DEFAULT_OUTPUT_DIR;
use crate::models::DataStore;
use crate::processor::discovery::discover_inputs;
use crate::processor::progress::ConsoleProgress;
use crate::processor::{ExportOutcome, ParseOutcome, UnitFailure, XerProcessor};
use crate::transform::available_tables;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "xer-processor")]
#[command(about = "Convert XER schedule exports into enriched CSV tables")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// XER files or directories to search for *.xer files
    #[arg(value_name = "INPUTS", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Directory the CSV files are written to
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Comma-separated table names, base or enhanced (default: all enhanced)
    #[arg(short, long, value_name = "LIST", value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// Print the tables available after parsing and exit
    #[arg(long)]
    pub list: bool,

    /// Also export every base table when no table list is given
    #[arg(long)]
    pub include_base: bool,

    /// Number of files or tables processed at the same time
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Path to configuration file (TOML format)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Defaults, then the config file, then flags
    pub fn load_config(&self) -> crate::error::Result<XerConfig> {
        let mut config = XerConfig::load_layered(self.config_file.as_deref())?;
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.include_base {
            config = config.with_base_tables(true);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Totals reported back to `main` for the exit code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_parsed: usize,
    pub files_failed: usize,
    pub tables_written: usize,
    pub tables_failed: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0 || self.tables_failed > 0
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xer_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// Parse the inputs and export the requested tables
pub async fn run(args: Args, cancel: CancellationToken) -> Result<RunSummary> {
    let start_time = Instant::now();
    let config = args.load_config().context("Failed to load configuration")?;
    let inputs = discover_inputs(&args.inputs).context("Failed to find input files")?;

    if !args.quiet {
        println!("{}", "Starting XER processing".bright_green().bold());
        println!(
            "  {} {} files",
            "Inputs:".bright_cyan(),
            inputs.len().to_string().bright_white()
        );
        println!("  {} {}", "Output:".bright_cyan(), args.output.display());
    }

    let console = Arc::new(if args.show_progress() {
        ConsoleProgress::new()
    } else {
        ConsoleProgress::hidden()
    });
    let processor = XerProcessor::new(config)
        .with_progress(console.clone())
        .with_cancellation(cancel);

    let ParseOutcome {
        store,
        files_parsed,
        failures: parse_failures,
        cancelled,
    } = processor.parse_files(&inputs).await;
    let total_rows = store.total_rows();
    let mut summary = RunSummary {
        files_parsed,
        files_failed: parse_failures.len(),
        cancelled,
        ..Default::default()
    };

    if args.list {
        console.finish("Parsed");
        print_available_tables(&store);
        print_failures("Files failed:", &parse_failures);
        return Ok(summary);
    }
    if cancelled {
        console.abandon("Cancelled");
        print_summary(&summary, total_rows, &parse_failures, None, start_time);
        return Ok(summary);
    }

    let store = Arc::new(store);
    let requested = args
        .tables
        .clone()
        .unwrap_or_else(|| processor.default_table_names(&store));
    let exported = processor
        .export_tables(store, &requested, &args.output)
        .await
        .with_context(|| format!("Failed to export to {}", args.output.display()))?;

    if exported.cancelled {
        console.abandon("Cancelled");
    } else {
        console.finish("Done");
    }

    summary.tables_written = exported.written.len();
    summary.tables_failed = exported.failures.len();
    summary.cancelled = exported.cancelled;

    if !args.quiet {
        print_summary(&summary, total_rows, &parse_failures, Some(&exported), start_time);
    }

    caches::clear_all();
    Ok(summary)
}

fn print_available_tables(store: &DataStore) {
    println!("\n{}", "Available tables".bright_green().bold());
    for name in available_tables(store) {
        let rows = store
            .get(&name)
            .map(|table| format!("{} rows", table.row_count()))
            .unwrap_or_else(|| "enhanced".to_string());
        println!("  {} {}", name.bright_white(), format!("({})", rows).bright_black());
    }
}

fn print_summary(
    summary: &RunSummary,
    total_rows: usize,
    parse_failures: &[UnitFailure],
    exported: Option<&ExportOutcome>,
    start_time: Instant,
) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        start_time.elapsed().as_millis().to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files parsed:".bright_cyan(),
        summary.files_parsed.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Total rows:".bright_cyan(),
        total_rows.to_string().bright_white().bold()
    );
    print_failures("Files failed:", parse_failures);

    if let Some(exported) = exported {
        println!(
            "  {} {}",
            "Tables written:".bright_cyan(),
            exported.written.len().to_string().bright_white().bold()
        );
        for written in &exported.written {
            println!(
                "    {} {}",
                written.path.display(),
                format!("({} rows)", written.rows).bright_black()
            );
        }
        if !exported.skipped.is_empty() {
            println!(
                "  {} {}",
                "Tables skipped:".bright_yellow(),
                exported.skipped.join(", ")
            );
        }
        print_failures("Tables failed:", &exported.failures);
    }

    if summary.cancelled {
        println!("  {}", "Cancelled before all work finished".bright_red().bold());
    }
}

fn print_failures(label: &str, failures: &[UnitFailure]) {
    if failures.is_empty() {
        return;
    }
    println!(
        "  {} {}",
        label.bright_red(),
        failures.len().to_string().bright_red().bold()
    );
    for failure in failures {
        println!(
            "    {} {}",
            failure.unit.bright_white(),
            failure.error.to_string().bright_black()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_list_and_flags() {
        let args = Args::parse_from([
            "xer-processor",
            "a.xer",
            "exports/",
            "-t",
            "01_XER_TASK,04_XER_BASELINE",
            "-j",
            "3",
            "-vv",
        ]);
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(
            args.tables,
            Some(vec!["01_XER_TASK".to_string(), "04_XER_BASELINE".to_string()])
        );
        assert_eq!(args.workers, Some(3));
        assert_eq!(args.get_log_level(), "debug");
        assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["xer-processor", "a.xer", "-j", "5", "--include-base", "-q"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.workers, 5);
        assert!(config.include_base_tables);
        assert_eq!(args.get_log_level(), "error");
        assert!(!args.show_progress());
    }

    #[test]
    fn test_inputs_required() {
        assert!(Args::try_parse_from(["xer-processor"]).is_err());
    }
}
