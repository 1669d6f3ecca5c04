//! Error types for the PostgreSQL storage backend.

use gatherly_storage::StorageError;
use thiserror::Error;

/// Errors raised while talking to PostgreSQL.
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    #[error("Schema error: {0}")]
    Schema(String),
}

/// Convenience result type for backend-internal operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(db) => db_error(db),
            PostgresError::Schema(message) => StorageError::internal(message),
        }
    }
}

/// Maps a raw sqlx error onto the storage taxonomy.
pub(crate) fn db_error(err: sqlx_core::Error) -> StorageError {
    use sqlx_core::Error;
    match err {
        Error::Io(_) | Error::Tls(_) | Error::PoolTimedOut | Error::PoolClosed => {
            StorageError::connection_error(err.to_string())
        }
        other => StorageError::internal(other.to_string()),
    }
}
