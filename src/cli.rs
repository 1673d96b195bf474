// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use clap's "derive" API: the CLI is described by plain structs and enums,
// and clap generates the parsing, --help and --version for us.
//
// Layout:
//   link-archivist [-v...] [--log-format text|json] [--config FILE] <COMMAND>
//     archive [PATH]   check links, record snapshots, rewrite pages
//     check [PATH]     check links only, change nothing
//
// Rust concepts:
// - Derive macros: Automatically generate code for our types
// - Option<T>: flags the user didn't pass stay None and the config file wins
// =============================================================================

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "link-archivist",
    version,
    about = "Check outbound links in a markdown wiki and record archived snapshots next to them",
    long_about = "link-archivist walks a directory of markdown pages, checks whether every outbound \
                  link still works, and writes a link to an archived snapshot right after each live \
                  link. Dead links and anything that could not be handled end up in a report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// More log output (-v = debug, -vv = trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Config file (default: ./link-archivist.toml when it exists)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check links, archive live ones and rewrite the pages
    ///
    /// Example: link-archivist archive ./wiki --report report.json
    Archive {
        #[command(flatten)]
        run: RunArgs,

        /// Work out every change but don't write any page
        #[arg(long)]
        dry_run: bool,
    },

    /// Only check links and report dead or unreachable ones
    ///
    /// No archive requests are made and no page is modified.
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
}

// Arguments shared by both subcommands
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Wiki checkout (a directory of markdown pages, or a single page)
    #[arg(env = "WIKI_WORKSPACE", default_value = ".")]
    pub path: PathBuf,

    /// Output the report in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Maximum number of links worked on at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_archive_args() {
        let cli = Cli::try_parse_from([
            "link-archivist",
            "-vv",
            "archive",
            "wiki",
            "--dry-run",
            "--concurrency",
            "3",
            "--timeout",
            "60",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Text);
        match cli.command {
            Commands::Archive { run, dry_run } => {
                assert!(dry_run);
                assert_eq!(run.path, PathBuf::from("wiki"));
                assert_eq!(run.concurrency, Some(3));
                assert_eq!(run.timeout, Some(60));
                assert!(run.json);
                assert!(run.report.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "link-archivist",
            "check",
            "wiki",
            "--log-format",
            "json",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
