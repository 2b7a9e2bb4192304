//! Processing estimates and resilience counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Advisory estimate of how long a full fetch will take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEstimate {
    pub total_videos: i64,
    pub videos_to_expand: i64,
    pub estimated_seconds: f64,
    pub batch_count: i64,
}

impl ProcessingEstimate {
    pub fn estimated_minutes(&self) -> f64 {
        self.estimated_seconds / 60.0
    }
}

impl std::fmt::Display for ProcessingEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let minutes = self.estimated_minutes();
        if minutes < 1.0 {
            write!(f, "~{} seconds", self.estimated_seconds as i64)
        } else if minutes < 60.0 {
            write!(f, "~{} minutes", minutes as i64)
        } else {
            write!(f, "~{:.1} hours", minutes / 60.0)
        }
    }
}

/// Snapshot of the resilience counters after (or during) a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_retries: u64,
    pub failed_videos: u64,
    pub bot_challenges: u64,
    pub rate_limits: u64,
}

/// Shared mutable counters, safe to bump from concurrent batch tasks.
///
/// Each bump also increments the matching Prometheus counter.
#[derive(Debug, Default, Clone)]
pub struct ProcessingCounters {
    inner: Arc<CounterCells>,
}

#[derive(Debug, Default)]
struct CounterCells {
    total_retries: AtomicU64,
    failed_videos: AtomicU64,
    bot_challenges: AtomicU64,
    rate_limits: AtomicU64,
}

impl ProcessingCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_retry(&self) {
        self.inner.total_retries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("youtube_fetch_retries_total").increment(1);
    }

    pub fn record_failed_video(&self) {
        self.inner.failed_videos.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("youtube_failed_videos_total").increment(1);
    }

    pub fn record_bot_challenge(&self) {
        self.inner.bot_challenges.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("youtube_bot_challenges_total").increment(1);
    }

    pub fn record_rate_limit(&self) {
        self.inner.rate_limits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("youtube_rate_limits_total").increment(1);
    }

    pub fn snapshot(&self) -> ProcessingStats {
        ProcessingStats {
            total_retries: self.inner.total_retries.load(Ordering::Relaxed),
            failed_videos: self.inner.failed_videos.load(Ordering::Relaxed),
            bot_challenges: self.inner.bot_challenges.load(Ordering::Relaxed),
            rate_limits: self.inner.rate_limits.load(Ordering::Relaxed),
        }
    }
}
