//! Tracing setup for the command-line tool.
//!
//! Diagnostics go to stderr, since stdout carries match reports, and to one
//! log file per command run under the application's `logs` directory. Only
//! the newest [`MAX_RUN_LOGS`] run logs are kept.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Run logs retained after pruning.
pub const MAX_RUN_LOGS: usize = 20;
/// Environment variable holding a tracing filter directive.
pub const LOG_FILTER_ENV: &str = "EARMARK_LOG";

const RUN_LOG_PREFIX: &str = "earmark-";
const DEFAULT_FILTER: &str = "earmark=info";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No application directory available for run logs")]
    NoLogDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to scan log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old run log {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create run log {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format run log timestamp: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Log `command` to stderr and to a fresh run log in the application directory.
///
/// Returns the run log path. Calls after the first succeed without effect and
/// return `None`.
pub fn init(command: &str) -> Result<Option<PathBuf>, LoggingError> {
    let dir = app_dirs::logs_dir().map_err(|err| match err {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoLogDir,
        app_dirs::AppDirError::CreateDir { path, source } => LoggingError::CreateDir { path, source },
    })?;
    init_in(&dir, command)
}

/// Same as [`init`] with run logs written to `dir`.
pub fn init_in(dir: &Path, command: &str) -> Result<Option<PathBuf>, LoggingError> {
    if FILE_GUARD.get().is_some() {
        return Ok(None);
    }
    fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = run_log_name(command, now_local_or_utc())?;
    let path = dir.join(&file_name);
    touch(&path)?;
    prune_run_logs(dir, MAX_RUN_LOGS)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(dir, file_name));
    let subscriber = Registry::default()
        .with(env_filter())
        .with(fmt::layer().with_timer(timer()).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(timer())
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = FILE_GUARD.set(guard);
    tracing::debug!("Run log for `{command}` at {}", path.display());
    Ok(Some(path))
}

/// Stderr-only logging, for when no run log can be created.
pub fn init_console() -> Result<(), LoggingError> {
    let subscriber = Registry::default()
        .with(env_filter())
        .with(fmt::layer().with_timer(timer()).with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY: &[FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn run_log_name(command: &str, at: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'_>] =
        format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = at.format(STAMP).map_err(LoggingError::FormatTime)?;
    let command: String = command
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    Ok(format!("{RUN_LOG_PREFIX}{command}-{stamp}.log"))
}

fn is_run_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(RUN_LOG_PREFIX) && name.ends_with(".log"))
}

fn touch(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove the oldest run logs so at most `keep` remain. Other files are left alone.
fn prune_run_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let read = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<(SystemTime, PathBuf)> = read
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_run_log(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}
