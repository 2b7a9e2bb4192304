//! Worker configuration.

use std::time::Duration;

use vibes_youtube::BackendKind;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between empty polls
    pub poll_interval: Duration,
    /// Jobs leased (and processed concurrently) per tick
    pub batch_size: i64,
    /// Wall-clock budget; the loop exits cleanly once it is spent
    pub max_runtime: Duration,
    /// Primary fetch backend
    pub backend: BackendKind,
    /// Cap on videos expanded per playlist (`None` = all)
    pub max_expanded: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 3,
            max_runtime: Duration::from_secs(300),
            backend: BackendKind::Api,
            max_expanded: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("WORKER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.poll_interval.as_secs()),
            ),
            batch_size: std::env::var("WORKER_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
            max_runtime: Duration::from_secs(
                std::env::var("WORKER_MAX_RUNTIME_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.max_runtime.as_secs()),
            ),
            backend: std::env::var("VIBES_BACKEND")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backend),
            max_expanded: std::env::var("WORKER_MAX_EXPANDED")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}
