//! Error types for the storage layer

use thiserror::Error;

/// Errors produced by the catalogs and the message store.
///
/// Absence is never an error: lookups return `None`, an empty `Vec`, or a
/// zero row count instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required argument was empty, missing, or out of range.
    /// Raised before any database work is attempted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An explicit create or rename targeted a directory name that already exists.
    #[error("Directory already exists: {0}")]
    DuplicateName(String),

    /// A directory cannot be deleted while emails still reference it.
    #[error("Directory '{name}' still holds {emails} email(s)")]
    DirectoryInUse { name: String, emails: usize },

    /// The database configuration failed validation.
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),

    /// Any failure reported by SQLite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema bootstrap failed.
    #[error("Migration failed: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    /// A stored column could not be encoded or decoded.
    #[error("Corrupt column '{column}': {reason}")]
    Corrupt { column: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument(message.into())
    }

    /// True for errors raised by argument validation.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StoreError::InvalidArgument(_))
    }

    /// True for failures coming from the database or filesystem.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(_)
                | StoreError::Migration(_)
                | StoreError::Corrupt { .. }
                | StoreError::Io(_)
        )
    }
}

/// Convenience alias for `Result<T, StoreError>`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Returns true when `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detected() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE NOT NULL); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = conn
            .execute("INSERT INTO t VALUES (NULL)", [])
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_classification() {
        assert!(StoreError::invalid("empty").is_invalid_argument());
        assert!(!StoreError::DuplicateName("inbox".into()).is_storage_failure());
        assert!(StoreError::Sqlite(rusqlite::Error::InvalidQuery).is_storage_failure());
    }
}
