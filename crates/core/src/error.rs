//! Unified error types for the daybook sync engine.
//!
//! Expected protocol outcomes (not-modified, not-found, precondition
//! failure, transport failure) are NOT errors; they are variants of the
//! per-operation result enums in `daybook-client`. This enum covers the
//! genuinely unrecoverable cases.

use tokio_rusqlite::rusqlite;

/// Unified error types for the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("store error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("store error: migration failed: {0}")]
    MigrationFailed(String),

    /// A resource key that no key space could have produced.
    #[error("invalid resource key: {0}")]
    InvalidKey(String),

    /// Explicit remote rejection (application-level, never retried).
    #[error("remote rejected request: status {status}")]
    Rejected { status: u16 },

    /// Transport failure with no cached copy to fall back on.
    #[error("remote unreachable and no cached copy: {0}")]
    Unreachable(String),

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Http(String),

    /// Document serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Rejected { status: 400 };
        assert!(err.to_string().contains("400"));

        let err = Error::InvalidKey("nope".to_string());
        assert!(err.to_string().contains("nope"));
    }
}
