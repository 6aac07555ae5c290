//! Store error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// SQLite primary result codes that signal contention rather than a broken
/// database (`SQLITE_BUSY`, `SQLITE_LOCKED`).
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// Errors raised by an entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The call did not complete within the configured bound.
    #[error("{op} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        op: &'static str,
        /// Configured bound.
        after: Duration,
    },

    /// The backend could not be reached or is temporarily contended.
    #[error("{op}: store unavailable: {source}")]
    Unavailable {
        /// Operation that failed.
        op: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Any other database failure (constraint violation, bad SQL, closed pool).
    #[error("{op}: database error: {source}")]
    Database {
        /// Operation that failed.
        op: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A persisted row could not be turned back into an entity.
    #[error("corrupt {collection} row '{key}': {reason}")]
    Corrupt {
        /// Collection the row belongs to.
        collection: &'static str,
        /// Row key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An entity could not be encoded for storage.
    #[error("failed to encode {collection} '{key}': {source}")]
    Serialization {
        /// Collection the entity belongs to.
        collection: &'static str,
        /// Entity key.
        key: String,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Classify a driver error raised during `op`.
    pub fn from_sqlx(op: &'static str, source: sqlx::Error) -> Self {
        let transient = match &source {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Tls(_) => true,
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                // Extended result codes carry the primary code in the low byte.
                .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
                .unwrap_or(false),
            _ => false,
        };

        if transient {
            StoreError::Unavailable { op, source }
        } else {
            StoreError::Database { op, source }
        }
    }

    /// Whether re-attempting the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout { .. } | StoreError::Unavailable { .. }
        )
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = StoreError::Timeout {
            op: "load_review",
            after: Duration::from_millis(5),
        };
        assert!(timeout.is_retryable());

        let pool = StoreError::from_sqlx("save_user", sqlx::Error::PoolTimedOut);
        assert!(pool.is_retryable());

        let closed = StoreError::from_sqlx("save_user", sqlx::Error::PoolClosed);
        assert!(!closed.is_retryable());

        let missing = StoreError::from_sqlx("load_user", sqlx::Error::RowNotFound);
        assert!(!missing.is_retryable());

        let corrupt = StoreError::Corrupt {
            collection: "users",
            key: "0x00".to_string(),
            reason: "bad roles".to_string(),
        };
        assert!(!corrupt.is_retryable());
        assert!(corrupt.to_string().contains("users"));
    }
}
