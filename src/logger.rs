//! Logging setup for sedmcp
//!
//! Stdout belongs to the RPC server and to `apply` output, so logs never go
//! there. With `logging.debug` enabled, records go to a log file
//! (`~/.sedmcp/sedmcp.log` unless `logging.log_dir` is set); otherwise only
//! warnings and errors are written to stderr.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

use crate::config::{sedmcp_dir, LoggingConfig};

const LOG_FILE_NAME: &str = "sedmcp.log";

/// Keeps the non-blocking writer alive; drop it only at process exit.
#[derive(Debug)]
pub struct LogHandle {
    pub log_path: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

/// Initialize the logging system
///
/// Returns a handle carrying the path of the log file, if one is used.
pub fn init_logging(config: &LoggingConfig) -> Result<LogHandle> {
    if !config.debug {
        let subscriber = registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .with(env_filter("warn"));

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

        return Ok(LogHandle {
            log_path: None,
            _guard: None,
        });
    }

    let log_dir = get_log_dir(config)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(env_filter(&config.level));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(LogHandle {
        log_path: Some(log_dir.join(LOG_FILE_NAME)),
        _guard: Some(guard),
    })
}

/// `RUST_LOG` wins when set; otherwise log the sedmcp target at `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sedmcp={}", level.to_lowercase())))
}

fn get_log_dir(config: &LoggingConfig) -> Result<PathBuf> {
    match &config.log_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => sedmcp_dir(),
    }
}

/// Get the log file path without initializing logging
pub fn get_current_log_path(config: &LoggingConfig) -> Result<PathBuf> {
    Ok(get_log_dir(config)?.join(LOG_FILE_NAME))
}
