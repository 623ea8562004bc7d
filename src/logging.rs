//! Log sink construction and log viewing.
//!
//! The library only emits `tracing` events. The binary builds a [`Dispatch`]
//! from [`LogConfig`] with [`build_dispatch`] and scopes it to its runtime
//! thread; nothing here installs a process-wide subscriber.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;

/// Subscriber writing `timestamp LEVEL message fields` lines to stderr and,
/// appending, to `config.file`. Keep the guard alive until exit so buffered
/// lines reach the file.
pub fn build_dispatch(config: &LogConfig) -> Result<(Dispatch, WorkerGuard)> {
    let (dir, file_name) = split_log_path(&config.file)?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&dir)
        .with_context(|| format!("Failed to open log file {}", config.file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = || {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .with_context(|| format!("Invalid log level {:?}", config.level))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter()?);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter()?);

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);
    Ok((Dispatch::new(subscriber), guard))
}

/// Stderr-only subscriber for the window before the config (and with it the
/// log file) is known.
pub fn bootstrap_dispatch() -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish();
    Dispatch::new(subscriber)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("Log path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

/// Last `lines` lines of the log file; empty when the file does not exist yet.
pub fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file {}", path.display()))?;
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|l| l.to_string()).collect())
}
