//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] vibes_store::StoreError),

    #[error("backend error: {0}")]
    Backend(#[from] vibes_youtube::BackendError),

    #[error("worker setup failed: {0}")]
    Setup(String),
}

impl WorkerError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }
}
