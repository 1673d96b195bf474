// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so a JSON report on stdout stays clean)
// 3. Load the config file and apply command-line overrides
// 4. Run the pipeline until it finishes, Ctrl-C is pressed, or --timeout hits
// 5. Print the report and exit with a proper code:
//      0 = nothing to report, 1 = report has entries,
//      2 = error, 130 = cancelled
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - anyhow::Result: any error type can bubble up to main with `?`
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod archive; // src/archive/ - snapshot lookups and captures
mod checker; // src/checker/ - link extraction and liveness
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - TOML config file
mod error; // src/error.rs - shared error type
mod pipeline; // src/pipeline/ - per-document state machine and the run loop
mod report; // src/report.rs - report entries and printing
mod rewrite; // src/rewrite.rs - inserting archive references
mod scan; // src/scan/ - finding markdown pages

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use tracing::{error, info};

use cli::{Cli, Commands, LogFormat, RunArgs};
use crate::error::ArchivistError;
use pipeline::{Mode, Orchestrator};
use report::{print_results, RunReport};

const EXIT_CANCELLED: i32 = 130;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) if matches!(
            e.downcast_ref::<ArchivistError>(),
            Some(ArchivistError::Cancelled)
        ) => {
            eprintln!("⏹️  Cancelled");
            EXIT_CANCELLED
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

// Sets up the tracing subscriber
//
// RUST_LOG wins when set; otherwise -v picks the level for our own crate.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "link_archivist=info",
        1 => "link_archivist=debug",
        _ => "link_archivist=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// This is the main application logic
// Returns: the process exit code
async fn run(cli: Cli) -> Result<i32> {
    let mut config = config::load(cli.config.as_deref())?;

    let (mode, args) = match cli.command {
        Commands::Archive { run, dry_run } => {
            config.run.dry_run |= dry_run;
            (Mode::Archive, run)
        }
        Commands::Check { run } => (Mode::Check, run),
    };

    if let Some(concurrency) = args.concurrency {
        config.run.concurrency = concurrency;
    }

    let orchestrator = Orchestrator::new(&config, mode)?;
    let shutdown = shutdown_signal(args.timeout.map(Duration::from_secs));

    info!(path = %args.path.display(), ?mode, "link-archivist starting");
    let report = orchestrator.run(&args.path, shutdown).await?;

    finish(&report, &args)
}

// Prints and saves the report, then picks the exit code
fn finish(report: &RunReport, args: &RunArgs) -> Result<i32> {
    print_results(report, args.json)?;

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("could not write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if report.cancelled {
        Err(ArchivistError::Cancelled.into())
    } else if report.has_entries() {
        Ok(1) // Exit code 1 = something needs a human
    } else {
        Ok(0) // Exit code 0 = all good
    }
}

// Resolves on Ctrl-C, or when `limit` has passed
fn shutdown_signal(limit: Option<Duration>) -> impl Future<Output = ()> {
    async move {
        let ctrl_c = async {
            // Without a signal handler only the timeout can stop the run
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match limit {
            Some(limit) => {
                tokio::select! {
                    _ = ctrl_c => info!("interrupted"),
                    _ = tokio::time::sleep(limit) => info!(secs = limit.as_secs(), "timeout reached"),
                }
            }
            None => {
                ctrl_c.await;
                info!("interrupted");
            }
        }
    }
}
