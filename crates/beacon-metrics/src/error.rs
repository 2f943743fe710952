//! Metric sampling error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sampling operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors that can occur while reading host metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("cannot resolve storage directory {path}: {source}")]
    StorageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no mounted filesystem contains {0}")]
    NoFilesystem(PathBuf),

    #[error("current process not visible: {0}")]
    Process(String),

    #[error("metrics unavailable: {0}")]
    Unavailable(String),
}
