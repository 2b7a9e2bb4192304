//! Store operations the worker depends on.
//!
//! A narrow trait over [`vibes_store::Store`] so the pipeline can run
//! against an in-memory store in tests.

use async_trait::async_trait;

use vibes_models::{Job, JobStatus, PlaylistStats};
use vibes_store::{Store, StoreResult};

#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    async fn lease_next_pending(&self, batch: i64) -> StoreResult<Vec<Job>>;

    async fn update_job_progress(&self, job_id: i64, progress: i16) -> StoreResult<()>;

    async fn mark_job_status(
        &self,
        job_id: i64,
        status: JobStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()>;

    async fn upsert_playlist_stats(&self, stats: &PlaylistStats) -> StoreResult<PlaylistStats>;
}

#[async_trait]
impl JobStore for Store {
    async fn lease_next_pending(&self, batch: i64) -> StoreResult<Vec<Job>> {
        Store::lease_next_pending(self, batch).await
    }

    async fn update_job_progress(&self, job_id: i64, progress: i16) -> StoreResult<()> {
        Store::update_job_progress(self, job_id, progress).await
    }

    async fn mark_job_status(
        &self,
        job_id: i64,
        status: JobStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()> {
        Store::mark_job_status(self, job_id, status, last_error).await
    }

    async fn upsert_playlist_stats(&self, stats: &PlaylistStats) -> StoreResult<PlaylistStats> {
        Store::upsert_playlist_stats(self, stats).await
    }
}
