// src/logging.rs

//! Logging setup for `taskdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TASKDAG_LOG` environment variable: a bare level ("info", "debug")
//!    or `EnvFilter` directives such as "taskdag::ops=debug,warn"
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout carries command output such as `plan` and
//! `runs`.

use anyhow::Result;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

const LOG_ENV: &str = "TASKDAG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();

    fmt()
        .with_env_filter(build_filter(cli_level, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    let level = match (cli_level, env) {
        (Some(lvl), _) => level_from_log_level(lvl),
        (None, Some(s)) => match parse_level_str(s) {
            Some(level) => level,
            None => match EnvFilter::try_new(s.trim()) {
                Ok(filter) if !s.trim().is_empty() => return filter,
                _ => tracing::Level::INFO,
            },
        },
        (None, None) => tracing::Level::INFO,
    };
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
