//! The worker loop and per-job pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};

use vibes_models::{enrich, Job, JobStatus, NormalizedUrl, PlaylistMetadata, PlaylistStats, VideoData};
use vibes_store::StoreResult;
use vibes_youtube::{BackendError, BackendResult, ProgressSender, YoutubeBackend};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::progress::ProgressReporter;
use crate::store_port::JobStore;

/// Error text stored on the job row is capped at this length.
const MAX_STORED_ERROR_LEN: usize = 500;

/// Pause before giving a failed store write its second chance.
const STORE_RETRY_PAUSE: Duration = Duration::from_millis(250);

/// What happened to one leased job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: i64,
    pub status: JobStatus,
    pub error: Option<String>,
}

/// Polls the job table and drives leased jobs to a terminal state.
pub struct Worker {
    store: Arc<dyn JobStore>,
    primary: Arc<dyn YoutubeBackend>,
    /// Scraper fallback used when the primary reports quota exhaustion
    fallback: Option<Arc<dyn YoutubeBackend>>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        primary: Arc<dyn YoutubeBackend>,
        fallback: Option<Arc<dyn YoutubeBackend>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            primary,
            fallback,
            config,
        }
    }

    /// Run until the wall-clock budget is spent or shutdown is signaled.
    ///
    /// On shutdown, in-flight jobs are abandoned mid-call and stay
    /// `processing`; an operator reset re-queues them. Returns the number of
    /// jobs driven to a terminal state.
    pub async fn run(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> WorkerResult<u64> {
        let deadline = Instant::now() + self.config.max_runtime;
        let mut processed: u64 = 0;

        info!(
            batch_size = self.config.batch_size,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_runtime_secs = self.config.max_runtime.as_secs(),
            backend = %self.primary.kind(),
            has_fallback = self.fallback.is_some(),
            "Worker loop starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                info!("Wall-clock budget spent, exiting cleanly");
                break;
            }

            let jobs = match self.store.lease_next_pending(self.config.batch_size).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "Lease query failed, backing off");
                    tokio::time::sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            if jobs.is_empty() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let nap = self.config.poll_interval.min(remaining);
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_ok() && *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(nap) => {}
                }
                continue;
            }

            let batch = join_all(jobs.into_iter().map(|job| self.process_one(job)));
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_ok() && *shutdown.borrow() {
                        warn!("Shutdown signaled, abandoning in-flight jobs");
                        break;
                    }
                }
                outcomes = batch => {
                    for outcome in &outcomes {
                        info!(
                            job_id = outcome.job_id,
                            status = %outcome.status,
                            "Job finished"
                        );
                    }
                    processed += outcomes.len() as u64;
                }
            }
        }

        self.primary.close().await;
        if let Some(fallback) = &self.fallback {
            fallback.close().await;
        }

        info!(processed, "Worker loop stopped");
        Ok(processed)
    }

    /// Drive one leased job to a terminal state.
    ///
    /// This is the only place backend error kinds become job states:
    /// bot challenge -> `blocked`, everything else terminal -> `failed`.
    pub async fn process_one(&self, job: Job) -> JobOutcome {
        let job_id = job.id;
        let url = NormalizedUrl::from_stored(job.playlist_url.clone());
        info!(job_id, url = %url, attempt = job.attempts, "Processing job");

        // Advisory only; a failed preview must not fail the job.
        if let Ok(preview) = self.primary.fetch_preview(&url).await {
            let estimate = self
                .primary
                .estimate_time(preview.video_count, self.config.max_expanded.is_none());
            info!(job_id, videos = preview.video_count, eta = %estimate, "Processing estimate");
        }

        let (progress_tx, reporter) = ProgressReporter::attach(self.store.clone(), job_id);
        let fetched = self.fetch_with_fallback(&url, Some(progress_tx)).await;
        // The sender was moved into the fetch; once it returns the channel is
        // closed and the reporter drains whatever is left.
        reporter.await.ok();

        let outcome = match fetched {
            Ok((rows, metadata)) => self.persist_analysis(&job, &url, rows, metadata).await,
            Err(e) if e.is_bot_challenge() => {
                warn!(job_id, error = %e, "Job blocked by bot challenge");
                metrics::counter!("worker_jobs_blocked_total").increment(1);
                self.finish(job_id, JobStatus::Blocked, Some(e.to_string())).await
            }
            Err(e) => {
                error!(job_id, error = %e, "Job failed");
                metrics::counter!("worker_jobs_failed_total").increment(1);
                self.finish(job_id, JobStatus::Failed, Some(e.to_string())).await
            }
        };
        outcome
    }

    /// Fetch via the primary backend, falling through to the scraper within
    /// the same job when the API quota is exhausted.
    async fn fetch_with_fallback(
        &self,
        url: &NormalizedUrl,
        progress: Option<ProgressSender>,
    ) -> BackendResult<(Vec<VideoData>, PlaylistMetadata)> {
        let result = self
            .primary
            .fetch_videos(url, self.config.max_expanded, progress.clone())
            .await;

        match result {
            Err(BackendError::QuotaExceeded(msg)) => match &self.fallback {
                Some(fallback) => {
                    warn!(url = %url, "API quota exhausted, falling through to {}", fallback.kind());
                    metrics::counter!("worker_quota_fallbacks_total").increment(1);
                    fallback
                        .fetch_videos(url, self.config.max_expanded, progress)
                        .await
                }
                None => Err(BackendError::QuotaExceeded(msg)),
            },
            other => other,
        }
    }

    async fn persist_analysis(
        &self,
        job: &Job,
        url: &NormalizedUrl,
        rows: Vec<VideoData>,
        metadata: PlaylistMetadata,
    ) -> JobOutcome {
        let (enriched, summary) = enrich(rows, metadata.video_count);
        let processed_date = job.started_at.unwrap_or_else(Utc::now).date_naive();
        let stats =
            PlaylistStats::from_analysis(url, processed_date, &metadata, enriched, summary);

        let upsert =
            store_write_retry("playlist stats upsert", || self.store.upsert_playlist_stats(&stats))
                .await;

        match upsert {
            Ok(saved) => {
                info!(
                    job_id = job.id,
                    videos = saved.processed_video_count,
                    of = saved.video_count,
                    "Analysis persisted"
                );
                metrics::counter!("worker_jobs_completed_total").increment(1);
                self.finish(job.id, JobStatus::Complete, None).await
            }
            Err(e) => {
                error!(job_id = job.id, error = %e, "Stats upsert failed after retry");
                metrics::counter!("worker_jobs_failed_total").increment(1);
                self.finish(job.id, JobStatus::Failed, Some(e.to_string()))
                    .await
            }
        }
    }

    /// Write the terminal status, retrying once; a job we cannot mark stays
    /// `processing` for the operator to reset.
    async fn finish(&self, job_id: i64, status: JobStatus, error: Option<String>) -> JobOutcome {
        let stored_error = error.as_deref().map(|e| truncate_error(e));
        let result = store_write_retry("terminal status", || {
            self.store
                .mark_job_status(job_id, status, stored_error.as_deref())
        })
        .await;

        if let Err(e) = result {
            error!(job_id, status = %status, error = %e, "Failed to record terminal status");
        }

        JobOutcome {
            job_id,
            status,
            error,
        }
    }
}

/// Give a failed store write one second chance after a short pause.
///
/// The job table is the source of truth for a finished analysis; a single
/// transient write failure should not burn the whole fetch. Anything that
/// fails twice is reported to the caller.
async fn store_write_retry<T, F, Fut>(what: &str, write: F) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    match write().await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(write = what, error = %first, "Store write failed, retrying once");
            tokio::time::sleep(STORE_RETRY_PAUSE).await;
            write().await
        }
    }
}

fn truncate_error(message: &str) -> String {
    if message.len() <= MAX_STORED_ERROR_LEN {
        return message.to_string();
    }
    let mut end = MAX_STORED_ERROR_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &message[..end])
}
