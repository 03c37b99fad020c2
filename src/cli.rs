// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::CreateMode;

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Deploy, run and tear down task graphs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Taskdag.toml")]
    pub config: String,

    /// Path to the backend state file.
    #[arg(long, value_name = "PATH", default_value = ".taskdag/state.toml")]
    pub state: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the creation order and task definitions without deploying.
    Plan,

    /// Create every task of the graph and resume it.
    Deploy {
        /// errorIfExists, orReplace or ifNotExists (any casing, `-`/`_` allowed).
        #[arg(long, value_name = "MODE", default_value = "error-if-exists")]
        mode: CreateMode,
    },

    /// Trigger an immediate run of the deployed graph.
    Run {
        /// Retry only the failed tasks of the last run.
        #[arg(long)]
        retry_last: bool,
    },

    /// Remove the deployed graph.
    Drop {
        /// Leave the finalizer task in place.
        #[arg(long)]
        keep_finalizer: bool,
    },

    /// List deployed graphs.
    List {
        /// SQL LIKE pattern (`%` and `_`), case-insensitive.
        #[arg(long, value_name = "PATTERN", default_value = "%")]
        like: String,
    },

    /// Show run history of the graph.
    Runs {
        /// Show in-progress and upcoming runs instead of completed ones.
        #[arg(long)]
        current: bool,

        /// Include successful completed runs, not only failures.
        #[arg(long)]
        all: bool,
    },
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
