// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `bootqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bootqueue",
    version,
    about = "Inspect and drive a persistent bootstrap job queue.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file at the default location falls back to built-in
    /// defaults; an explicitly named file must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store file to open, overriding `[store].path`.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BOOTQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print it, but don't open the store.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show pending, runnable and missing counts.
    Stats {
        /// Also print cache metrics in prometheus text format.
        #[arg(long)]
        metrics: bool,
    },
    /// List ids depended upon but not stored locally.
    Missing,
    /// Store each file as a job and queue it as runnable.
    Push {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Dequeue runnable jobs and print their ids.
    Drain {
        /// Stop after this many jobs.
        #[arg(long, value_name = "N")]
        limit: Option<u64>,
    },
    /// Delete all queue state.
    Reset,
    /// Rewrite the store log keeping only live records.
    Compact,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
