//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("job not found: {0}")]
    JobNotFound(i64),
}

impl StoreError {
    pub fn corrupt_row(msg: impl Into<String>) -> Self {
        Self::CorruptRow(msg.into())
    }
}
