use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The index file could not be read or parsed. Fatal for the run.
    #[error("failed to read input file {path}: {message}")]
    InputRead { path: PathBuf, message: String },

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Flat classification of a per-record failure, kept in the outcome log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputRead,
    MalformedRecord,
    Network,
    HttpStatus,
    Filesystem,
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::InputRead { .. } => ErrorKind::InputRead,
            ArchiveError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            ArchiveError::Network(_) => ErrorKind::Network,
            ArchiveError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ArchiveError::Filesystem { .. } => ErrorKind::Filesystem,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ArchiveError::HttpStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArchiveError::Network(_) => true,
            ArchiveError::HttpStatus { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(ArchiveError::HttpStatus { status: 503 }.is_retryable());
        assert!(ArchiveError::HttpStatus { status: 429 }.is_retryable());
        assert!(!ArchiveError::HttpStatus { status: 404 }.is_retryable());
        assert!(ArchiveError::Network("connection reset".to_string()).is_retryable());
        assert!(!ArchiveError::MalformedRecord {
            reason: "empty".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn kind_and_status() {
        let err = ArchiveError::HttpStatus { status: 404 };
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.to_string(), "HTTP status 404");
    }
}
