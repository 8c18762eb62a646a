//! Database-specific error types and conversions.

use oncall_core::error::OncallError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed record {key}: {reason}")]
    Decode { key: String, reason: String },
}

impl From<DbError> for OncallError {
    fn from(err: DbError) -> Self {
        OncallError::External(err.to_string())
    }
}
