//! The uniform fetch contract implemented by both backends.

use async_trait::async_trait;

use vibes_models::{NormalizedUrl, PlaylistMetadata, VideoData};

use crate::error::BackendResult;
use crate::progress::ProgressSender;
use crate::types::{ProcessingEstimate, ProcessingStats};

/// Which implementation a backend handle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Api,
    Scraper,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Api => "api",
            BackendKind::Scraper => "scraper",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(BackendKind::Api),
            "scraper" => Ok(BackendKind::Scraper),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Uniform contract for fetching playlist data.
///
/// Implementations differ in cost and failure modes (quota vs bot
/// challenges) but deliver identical shapes, so the worker can swap one for
/// the other mid-job.
#[async_trait]
pub trait YoutubeBackend: Send + Sync {
    /// Cheap metadata fetch with no per-video calls.
    async fn fetch_preview(&self, url: &NormalizedUrl) -> BackendResult<PlaylistMetadata>;

    /// Full fetch with streaming progress.
    ///
    /// `max_videos` bounds how many videos are expanded (`None` = all).
    /// Returned rows are ordered by playlist rank regardless of fetch
    /// completion order.
    async fn fetch_videos(
        &self,
        url: &NormalizedUrl,
        max_videos: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> BackendResult<(Vec<VideoData>, PlaylistMetadata)>;

    /// Advisory wall-clock estimate for processing `count` videos.
    fn estimate_time(&self, count: i64, expand_all: bool) -> ProcessingEstimate;

    /// Resilience counters accumulated so far.
    fn processing_stats(&self) -> ProcessingStats;

    fn kind(&self) -> BackendKind;

    /// Release connections. Backends must be safe to drop without calling
    /// this; it exists so a worker can tear down eagerly on shutdown.
    async fn close(&self);
}
