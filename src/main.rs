use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;
use xer_processor::cli::{self, Args};

fn main() {
    let args = Args::parse();
    cli::setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // Ctrl+C asks running work to stop; completed tables stay on disk
        let watcher = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, finishing current work...");
                watcher.cancel();
            }
        });

        cli::run(args, cancellation_token).await
    });

    match result {
        Ok(summary) if summary.cancelled => process::exit(130),
        Ok(summary) if summary.has_failures() => process::exit(1),
        Ok(_) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
