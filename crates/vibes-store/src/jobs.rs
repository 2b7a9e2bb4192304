//! Job queue operations over `playlist_jobs`.

use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{debug, info};

use vibes_models::{Job, JobStatus, NormalizedUrl};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

const JOB_COLUMNS: &str =
    "id, playlist_url, status, progress, attempts, last_error, created_at, started_at, finished_at";

fn job_from_row(row: &PgRow) -> StoreResult<Job> {
    let status_raw: String = row.try_get("status")?;
    let status = JobStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::corrupt_row(format!("unknown job status '{status_raw}'")))?;
    Ok(Job {
        id: row.try_get("id")?,
        playlist_url: row.try_get("playlist_url")?,
        status,
        progress: row.try_get("progress")?,
        attempts: row.try_get("attempts")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

impl Store {
    /// Insert a new pending job for a normalized URL. Returns the job id.
    pub async fn enqueue_job(&self, url: &NormalizedUrl) -> StoreResult<i64> {
        let row = sqlx::query("INSERT INTO playlist_jobs (playlist_url) VALUES ($1) RETURNING id")
            .bind(url.as_str())
            .fetch_one(&self.pool)
            .await?;
        let id: i64 = row.try_get("id")?;
        info!(job_id = id, url = %url, "Enqueued analysis job");
        Ok(id)
    }

    /// Insert a pending job only if the URL has no non-terminal job.
    ///
    /// Returns `Some(id)` when a row was inserted, `None` when an in-flight
    /// job already exists. Without a partial unique index two racing inserts
    /// can both commit; callers tolerate that by re-reading the newest job
    /// afterwards.
    pub async fn enqueue_if_idle(&self, url: &NormalizedUrl) -> StoreResult<Option<i64>> {
        let row = sqlx::query(
            r#"
            INSERT INTO playlist_jobs (playlist_url)
            SELECT $1
            WHERE NOT EXISTS (
                SELECT 1 FROM playlist_jobs
                WHERE playlist_url = $1 AND status IN ('pending', 'processing')
            )
            RETURNING id
            "#,
        )
        .bind(url.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                info!(job_id = id, url = %url, "Enqueued analysis job");
                Ok(Some(id))
            }
            None => {
                debug!(url = %url, "Skipped enqueue, job already in flight");
                Ok(None)
            }
        }
    }

    /// Atomically claim up to `batch` pending jobs for this worker.
    ///
    /// The `FOR UPDATE SKIP LOCKED` subselect guarantees no job id appears in
    /// two concurrent lease batches; claimed rows come back already flipped to
    /// `processing` with `started_at` set and `attempts` bumped.
    pub async fn lease_next_pending(&self, batch: i64) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query(&format!(
            r#"
            UPDATE playlist_jobs
            SET status = 'processing', started_at = now(), attempts = attempts + 1
            WHERE id IN (
                SELECT id FROM playlist_jobs
                WHERE status = 'pending'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;

        let jobs = rows
            .iter()
            .map(job_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        if !jobs.is_empty() {
            info!(count = jobs.len(), "Leased pending jobs");
        }
        Ok(jobs)
    }

    /// Write a progress percentage onto a processing job.
    ///
    /// Capped at 99 here: progress 100 is reserved for the `complete`
    /// transition so `progress = 100 <=> complete` holds.
    pub async fn update_job_progress(&self, job_id: i64, progress: i16) -> StoreResult<()> {
        sqlx::query(
            "UPDATE playlist_jobs SET progress = $2 WHERE id = $1 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(progress.clamp(0, 99))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Transition a job to a new status.
    ///
    /// Terminal statuses stamp `finished_at`; `complete` also forces progress
    /// to 100 so `progress = 100 <=> complete` holds.
    pub async fn mark_job_status(
        &self,
        job_id: i64,
        status: JobStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE playlist_jobs
            SET status = $2,
                last_error = $3,
                finished_at = CASE WHEN $2 IN ('complete', 'failed', 'blocked')
                                   THEN now() ELSE finished_at END,
                progress = CASE WHEN $2 = 'complete' THEN 100 ELSE progress END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(last_error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id));
        }
        debug!(job_id, status = %status, "Job status updated");
        Ok(())
    }

    /// Newest job for a URL, by `created_at`.
    pub async fn latest_job(&self, url: &NormalizedUrl) -> StoreResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM playlist_jobs
             WHERE playlist_url = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(url.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Fetch a job by id.
    pub async fn get_job(&self, job_id: i64) -> StoreResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM playlist_jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Pending jobs in queue order, for operational listing.
    pub async fn pending_jobs(&self, limit: i64) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM playlist_jobs
             WHERE status = 'pending' ORDER BY created_at LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }
}
