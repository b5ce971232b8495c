//! Log subsystem error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by log queries, tailing, and retention
///
/// Malformed log lines never produce an error; they are skipped by the
/// reader.
#[derive(Debug, Error)]
pub enum LogError {
    /// A `since`/`until`/`before` value that is neither relative nor a date
    #[error("invalid time expression '{0}' (expected e.g. 30m, 2h, 7d, today, yesterday, 2024-01-15)")]
    InvalidTimeExpression(String),

    /// `show` called without an identifier
    #[error("a log entry id is required")]
    MissingId,

    /// `clear` called without explicit confirmation
    #[error("refusing to delete log files without confirmation (pass --confirm)")]
    ConfirmationRequired,

    /// No record with the requested id in any scope
    #[error("log entry not found: {0}")]
    NotFound(String),

    /// Filesystem failure outside the tolerant read path
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is bad caller input rather than a runtime failure
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeExpression(_) | Self::MissingId | Self::ConfirmationRequired
        )
    }
}

/// Result type for log operations
pub type LogResult<T> = Result<T, LogError>;
