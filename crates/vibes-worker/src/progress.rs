//! Progress reporting from backend callbacks to job-row writes.
//!
//! Progress is non-critical: updates that cannot be coerced are dropped and
//! store failures are logged and swallowed. A later-arriving smaller value is
//! possible under reordering; readers must tolerate it.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vibes_youtube::{ProgressPayload, ProgressSender};

use crate::store_port::JobStore;

/// Extract `(processed, total)` from any payload shape.
///
/// Numbers may arrive as integers, floats, or numeric strings; anything else
/// fails coercion and the update is dropped.
pub fn coerce_progress(payload: &ProgressPayload) -> Option<(u64, u64)> {
    match payload {
        ProgressPayload::Counts { processed, total } => Some((*processed, *total)),
        ProgressPayload::CountsWithMeta {
            processed, total, ..
        } => Some((*processed, *total)),
        ProgressPayload::Map(map) => {
            let processed = coerce_int(map.get("processed")?)?;
            let total = coerce_int(map.get("total")?)?;
            Some((processed, total))
        }
    }
}

fn coerce_int(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f >= 0.0 {
            return Some(f as u64);
        }
        return None;
    }
    value.as_str()?.trim().parse().ok()
}

/// Percent complete: `floor(100 * processed / max(total, 1))`, clipped to
/// 0..=100.
pub fn progress_pct(processed: u64, total: u64) -> i16 {
    let pct = processed.saturating_mul(100) / total.max(1);
    pct.min(100) as i16
}

/// Drains a progress channel into `update_job_progress` writes.
pub struct ProgressReporter;

impl ProgressReporter {
    /// Spawn the drain task for one job.
    ///
    /// The returned sender goes to the backend; dropping it ends the task.
    pub fn attach(store: Arc<dyn JobStore>, job_id: i64) -> (ProgressSender, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressPayload>();
        let handle = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let Some((processed, total)) = coerce_progress(&payload) else {
                    debug!(job_id, ?payload, "Dropping uncoercible progress update");
                    continue;
                };
                let pct = progress_pct(processed, total);
                if let Err(e) = store.update_job_progress(job_id, pct).await {
                    warn!(job_id, error = %e, "Progress write failed (non-critical)");
                }
            }
        });
        (tx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use vibes_models::{Job, JobStatus, PlaylistStats};
    use vibes_store::{StoreError, StoreResult};

    #[derive(Default)]
    struct RecordingStore {
        progress: Mutex<Vec<(i64, i16)>>,
        fail_progress: bool,
    }

    #[async_trait]
    impl JobStore for RecordingStore {
        async fn lease_next_pending(&self, _batch: i64) -> StoreResult<Vec<Job>> {
            Ok(Vec::new())
        }

        async fn update_job_progress(&self, job_id: i64, progress: i16) -> StoreResult<()> {
            if self.fail_progress {
                return Err(StoreError::corrupt_row("simulated write failure"));
            }
            self.progress.lock().unwrap().push((job_id, progress));
            Ok(())
        }

        async fn mark_job_status(
            &self,
            _job_id: i64,
            _status: JobStatus,
            _last_error: Option<&str>,
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn upsert_playlist_stats(
            &self,
            stats: &PlaylistStats,
        ) -> StoreResult<PlaylistStats> {
            Ok(stats.clone())
        }
    }

    fn map_payload(entries: &[(&str, Value)]) -> ProgressPayload {
        let mut map = serde_json::Map::new();
        for (k, v) in entries {
            map.insert(k.to_string(), v.clone());
        }
        ProgressPayload::Map(map)
    }

    #[test]
    fn all_three_shapes_coerce_identically() {
        let shapes = [
            ProgressPayload::counts(5, 10),
            ProgressPayload::with_meta(5, 10, serde_json::Map::new()),
            map_payload(&[("processed", json!(5)), ("total", json!(10))]),
        ];
        for shape in &shapes {
            assert_eq!(coerce_progress(shape), Some((5, 10)));
        }
    }

    #[test]
    fn map_shape_tolerates_floats_and_strings() {
        assert_eq!(
            coerce_progress(&map_payload(&[
                ("processed", json!(3.7)),
                ("total", json!("10"))
            ])),
            Some((3, 10))
        );
        assert_eq!(
            coerce_progress(&map_payload(&[
                ("processed", json!("nope")),
                ("total", json!(10))
            ])),
            None
        );
        assert_eq!(coerce_progress(&map_payload(&[("total", json!(10))])), None);
        assert_eq!(
            coerce_progress(&map_payload(&[
                ("processed", json!(-1.0)),
                ("total", json!(10))
            ])),
            None
        );
    }

    #[test]
    fn pct_is_floored_and_clipped() {
        assert_eq!(progress_pct(0, 10), 0);
        assert_eq!(progress_pct(1, 3), 33);
        assert_eq!(progress_pct(10, 10), 100);
        assert_eq!(progress_pct(15, 10), 100);
        // total = 0 must not divide by zero
        assert_eq!(progress_pct(0, 0), 0);
        assert_eq!(progress_pct(5, 0), 100);
    }

    #[tokio::test]
    async fn reporter_writes_each_coercible_update() {
        let store = Arc::new(RecordingStore::default());
        let (tx, handle) = ProgressReporter::attach(store.clone(), 7);

        tx.send(ProgressPayload::counts(3, 10)).unwrap();
        tx.send(map_payload(&[("junk", json!(true))])).unwrap();
        tx.send(ProgressPayload::counts(7, 10)).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*store.progress.lock().unwrap(), vec![(7, 30), (7, 70)]);
    }

    #[tokio::test]
    async fn reporter_swallows_store_failures() {
        let store = Arc::new(RecordingStore {
            fail_progress: true,
            ..Default::default()
        });
        let (tx, handle) = ProgressReporter::attach(store, 7);
        tx.send(ProgressPayload::counts(1, 2)).unwrap();
        drop(tx);
        // Completes without panicking despite every write failing.
        handle.await.unwrap();
    }
}
