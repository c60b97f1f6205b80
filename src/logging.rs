//! Tracing subscriber initialization.
//!
//! The terminal front-end prints answers on stdout, so logs go to stderr
//! or, with `--log-file`, to a file that can be followed with `tail -f`.

use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log directory at {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log file path: {0:?}")]
    InvalidPath(PathBuf),

    #[error("Tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// `RUST_LOG` if set, otherwise `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Where a log file lives: its directory (created if missing) and file name.
fn split_log_path(log_path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?
        .to_string();

    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(|source| LoggingError::DirectoryCreation {
        path: directory.clone(),
        source,
    })?;

    Ok((directory, file_name))
}

/// Install the global subscriber. Call once, from the binary.
pub fn init(log_file: Option<&Path>) -> Result<(), LoggingError> {
    let installed = match log_file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(appender)
                .with_ansi(false)
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
    };
    installed.map_err(|_| LoggingError::SubscriberAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let log_path = temp.path().join("logs/nested/bid-box.log");

        let (directory, file_name) = split_log_path(&log_path).unwrap();

        assert!(directory.is_dir());
        assert_eq!(directory, temp.path().join("logs/nested"));
        assert_eq!(file_name, "bid-box.log");
    }

    #[test]
    fn test_split_log_path_bare_file_name() {
        let (directory, file_name) = split_log_path(Path::new("bid-box.log")).unwrap();
        assert_eq!(directory, PathBuf::from("."));
        assert_eq!(file_name, "bid-box.log");
    }

    #[test]
    fn test_split_log_path_rejects_directory_only() {
        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }
}
