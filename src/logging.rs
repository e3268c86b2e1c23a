use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_NAME: &str = "doublecontact.log";

/// Where log lines go. The terminal UI owns the screen, so it logs to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// `<local data dir>/doublecontact/doublecontact.log`, or the working
/// directory when the platform has no data dir.
pub fn default_log_file() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.data_local_dir().join("doublecontact"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_FILE_NAME)
}

/// Map a level name to a filter directive. Unknown names fall back to
/// `info`; `RUST_LOG` wins over both.
fn filter_for(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let normalised = match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

pub fn init(level: &str, target: &LogTarget) -> Result<()> {
    let filter = filter_for(level);
    match target {
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?,
        LogTarget::File(path) => {
            let file = open_log(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_log_file_is_named() {
        assert!(default_log_file().ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn log_file_and_parent_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(LOG_FILE_NAME);
        open_log(&path).unwrap();
        assert!(path.is_file());
    }
}
