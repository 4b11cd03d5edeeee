use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("could not open log file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log level '{level}': {message}")]
    Level { level: String, message: String },
    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::Level {
        level: level.to_string(),
        message: e.to_string(),
    })
}

/// Send `tracing` output to a file. The terminal belongs to the TUI, so
/// nothing is ever written to stdout or stderr.
pub fn init(log_path: &Path, level: &str) -> Result<(), LoggingError> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| LoggingError::Open {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|source| LoggingError::Open {
            path: log_path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level)?)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_is_reported() {
        // RUST_LOG takes precedence over the configured level
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(
            build_filter("tiki=loud"),
            Err(LoggingError::Level { .. })
        ));
        assert!(build_filter("debug").is_ok());
    }
}
