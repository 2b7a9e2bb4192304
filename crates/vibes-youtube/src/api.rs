//! YouTube Data API v3 backend.
//!
//! Fast and reliable but quota limited: roughly one unit per request against
//! a 10,000-unit daily budget. Fetching is three-phase — playlist metadata,
//! paginated video ids, batched statistics — with pages and batches of 50
//! (the API maximum). Dislikes are not exposed by the API and always report
//! as zero.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use vibes_models::{playlist_url::extract_playlist_id, NormalizedUrl, PlaylistMetadata, VideoData};

use crate::backend::{BackendKind, YoutubeBackend};
use crate::duration::parse_iso8601_duration;
use crate::error::{BackendError, BackendResult};
use crate::progress::{send_progress, ProgressPayload, ProgressSender};
use crate::types::{ProcessingCounters, ProcessingEstimate, ProcessingStats};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Pages and statistics batches are capped at 50 items by the API.
const MAX_RESULTS_PER_REQUEST: usize = 50;

/// Data API backend configuration.
#[derive(Debug, Clone)]
pub struct ApiBackendConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ApiBackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Read `YOUTUBE_API_KEY` (and an optional base-URL override).
    pub fn from_env() -> BackendResult<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| BackendError::other("YOUTUBE_API_KEY environment variable not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("YOUTUBE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        })
    }
}

pub struct ApiBackend {
    http: reqwest::Client,
    config: ApiBackendConfig,
    counters: ProcessingCounters,
}

// ---- wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PlaylistResource {
    snippet: Option<Snippet>,
    #[serde(rename = "contentDetails")]
    content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Deserialize, Default)]
struct Snippet {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "channelTitle", default)]
    channel_title: Option<String>,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistContentDetails {
    #[serde(rename = "itemCount", default)]
    item_count: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct PlaylistItemResource {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize, Default)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct VideoResource {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<VideoStatistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<VideoContentDetails>,
}

/// Statistics arrive as decimal strings on the wire.
#[derive(Debug, Deserialize, Default)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "commentCount", default)]
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoContentDetails {
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: Option<String>,
}

// ---------------------------------------------------------------------------

impl ApiBackend {
    pub fn new(config: ApiBackendConfig) -> BackendResult<Self> {
        if config.api_key.is_empty() {
            return Err(BackendError::other("YouTube API key is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            config,
            counters: ProcessingCounters::new(),
        })
    }

    pub fn from_env() -> BackendResult<Self> {
        Self::new(ApiBackendConfig::from_env()?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> BackendResult<T> {
        let url = format!("{}/{}", self.config.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(classify_api_error(status.as_u16(), &body))
    }

    fn playlist_id(url: &NormalizedUrl) -> BackendResult<String> {
        extract_playlist_id(url.as_str())
            .ok_or_else(|| BackendError::other("playlist URL has no list id"))
    }

    /// Paginate `playlistItems` to collect video ids.
    async fn fetch_all_video_ids(
        &self,
        playlist_id: &str,
        max_videos: Option<usize>,
        total_count: i64,
        progress: Option<&ProgressSender>,
    ) -> BackendResult<Vec<String>> {
        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let remaining = max_videos
                .map(|m| m.saturating_sub(video_ids.len()))
                .unwrap_or(MAX_RESULTS_PER_REQUEST);
            if remaining == 0 {
                break;
            }
            let max_results = remaining.min(MAX_RESULTS_PER_REQUEST).to_string();

            let mut params = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: ListResponse<PlaylistItemResource> =
                self.get_json("playlistItems", &params).await?;
            pages += 1;

            for item in page.items {
                video_ids.push(item.content_details.video_id);
            }

            send_progress(
                progress,
                ProgressPayload::with_meta(
                    video_ids.len() as u64,
                    total_count.max(0) as u64,
                    meta_phase("fetching_ids"),
                ),
            );

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(count = video_ids.len(), pages, "Fetched playlist video ids");
        Ok(video_ids)
    }

    /// Fetch statistics for ids in batches of 50.
    async fn fetch_video_statistics(
        &self,
        video_ids: &[String],
        total_count: i64,
        progress: Option<&ProgressSender>,
    ) -> BackendResult<Vec<VideoData>> {
        let mut videos: Vec<VideoData> = Vec::with_capacity(video_ids.len());

        for (batch_idx, batch) in video_ids.chunks(MAX_RESULTS_PER_REQUEST).enumerate() {
            let offset = batch_idx * MAX_RESULTS_PER_REQUEST;
            let joined = batch.join(",");
            let params = [
                ("part", "snippet,statistics,contentDetails"),
                ("id", joined.as_str()),
            ];

            let page: ListResponse<VideoResource> = match self.get_json("videos", &params).await {
                Ok(page) => page,
                Err(e @ BackendError::QuotaExceeded(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        batch = batch_idx + 1,
                        error = %e,
                        "Statistics batch failed, videos will be missing from results"
                    );
                    for _ in batch {
                        self.counters.record_failed_video();
                    }
                    continue;
                }
            };

            for (idx, item) in page.items.into_iter().enumerate() {
                let snippet = item.snippet.unwrap_or_default();
                let stats = item.statistics.unwrap_or_default();
                let details = item.content_details.unwrap_or_default();
                let duration = details
                    .duration
                    .as_deref()
                    .and_then(parse_iso8601_duration)
                    .unwrap_or_else(|| {
                        debug!(video_id = %item.id, "Unparseable duration, storing 0");
                        0
                    });

                videos.push(VideoData {
                    rank: (offset + idx + 1) as u32,
                    id: item.id,
                    title: snippet.title.unwrap_or_else(|| "N/A".to_string()),
                    views: parse_count(&stats.view_count),
                    likes: parse_count(&stats.like_count),
                    // the API stopped exposing dislikes
                    dislikes: 0,
                    comments: parse_count(&stats.comment_count),
                    duration_seconds: duration,
                    uploader: snippet.channel_title.unwrap_or_else(|| "N/A".to_string()),
                    thumbnail: best_thumbnail(snippet.thumbnails),
                    rating: None,
                });
            }

            send_progress(
                progress,
                ProgressPayload::with_meta(
                    videos.len() as u64,
                    total_count.max(0) as u64,
                    meta_phase("fetching_stats"),
                ),
            );
        }

        Ok(videos)
    }
}

fn parse_count(raw: &Option<String>) -> i64 {
    raw.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn best_thumbnail(thumbnails: Option<Thumbnails>) -> String {
    let Some(t) = thumbnails else {
        return String::new();
    };
    t.high
        .or(t.default)
        .map(|thumb| thumb.url)
        .unwrap_or_default()
}

fn meta_phase(phase: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut meta = serde_json::Map::new();
    meta.insert("phase".to_string(), json!(phase));
    meta
}

/// Map a non-2xx API response to the backend taxonomy.
///
/// A 403 is quota exhaustion only when the error body says so; other 403s
/// (bad key, disabled API) are terminal backend errors.
fn classify_api_error(status: u16, body: &str) -> BackendError {
    let detail: Option<ApiErrorDetail> = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    let reason_is = |needle: &str| {
        detail
            .as_ref()
            .map(|d| d.errors.iter().any(|e| e.reason.as_deref() == Some(needle)))
            .unwrap_or(false)
    };
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        403 if reason_is("quotaExceeded") => BackendError::QuotaExceeded(
            "YouTube API quota exceeded; try again tomorrow or enable the scraper fallback"
                .to_string(),
        ),
        403 => BackendError::Other(format!("API access forbidden: {message}")),
        429 => BackendError::RateLimit(message),
        _ => BackendError::Other(format!("API request failed: {message}")),
    }
}

#[async_trait]
impl YoutubeBackend for ApiBackend {
    async fn fetch_preview(&self, url: &NormalizedUrl) -> BackendResult<PlaylistMetadata> {
        let playlist_id = Self::playlist_id(url)?;
        let resp: ListResponse<PlaylistResource> = self
            .get_json(
                "playlists",
                &[
                    ("part", "snippet,contentDetails"),
                    ("id", playlist_id.as_str()),
                    ("maxResults", "1"),
                ],
            )
            .await?;

        let Some(item) = resp.items.into_iter().next() else {
            return Err(BackendError::other(format!(
                "playlist not found: {playlist_id}; it may be private or deleted"
            )));
        };

        let snippet = item.snippet.unwrap_or_default();
        Ok(PlaylistMetadata {
            title: snippet
                .title
                .unwrap_or_else(|| "Untitled Playlist".to_string()),
            channel_name: snippet
                .channel_title
                .unwrap_or_else(|| "Unknown Channel".to_string()),
            channel_thumbnail: best_thumbnail(snippet.thumbnails),
            video_count: item
                .content_details
                .and_then(|cd| cd.item_count)
                .unwrap_or(0),
        })
    }

    async fn fetch_videos(
        &self,
        url: &NormalizedUrl,
        max_videos: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> BackendResult<(Vec<VideoData>, PlaylistMetadata)> {
        let playlist_id = Self::playlist_id(url)?;

        info!(playlist_id = %playlist_id, "Fetching playlist via Data API");
        let metadata = self.fetch_preview(url).await?;

        let video_ids = self
            .fetch_all_video_ids(
                &playlist_id,
                max_videos,
                metadata.video_count,
                progress.as_ref(),
            )
            .await?;

        if video_ids.is_empty() {
            warn!(playlist_id = %playlist_id, "No videos found in playlist");
            return Ok((Vec::new(), metadata));
        }

        let videos = self
            .fetch_video_statistics(&video_ids, metadata.video_count, progress.as_ref())
            .await?;

        info!(
            fetched = videos.len(),
            requested = video_ids.len(),
            "Data API fetch complete"
        );
        Ok((videos, metadata))
    }

    fn estimate_time(&self, count: i64, expand_all: bool) -> ProcessingEstimate {
        let videos_to_expand = if expand_all {
            count
        } else {
            count.min(MAX_RESULTS_PER_REQUEST as i64)
        };
        // One page pass for ids, one batch pass for statistics.
        let per_pass =
            (videos_to_expand + MAX_RESULTS_PER_REQUEST as i64 - 1) / MAX_RESULTS_PER_REQUEST as i64;
        let total_batches = per_pass * 2;
        ProcessingEstimate {
            total_videos: count,
            videos_to_expand,
            estimated_seconds: total_batches as f64 * 0.5 + 1.0,
            batch_count: total_batches,
        }
    }

    fn processing_stats(&self) -> ProcessingStats {
        self.counters.snapshot()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Api
    }

    async fn close(&self) {}
}
