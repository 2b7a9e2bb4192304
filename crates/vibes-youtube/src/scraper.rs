//! Scraper backend built on yt-dlp.
//!
//! Useful when the Data API quota is gone, at the cost of being slower and
//! exposed to bot detection. The fetch runs in three concurrent layers:
//! flat-list skeleton extraction, per-video detail expansion in small
//! batches, and a dislike-service lookup per video running alongside the
//! detail call. A video whose expansion fails keeps its skeleton row; the
//! playlist is never truncated by per-video failures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use rand::Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use vibes_models::{NormalizedUrl, PlaylistMetadata, VideoData};

use crate::backend::{BackendKind, YoutubeBackend};
use crate::dislikes::{DislikeClient, DislikeConfig, DislikeData};
use crate::error::{is_bot_challenge_message, BackendError, BackendResult};
use crate::progress::{send_progress, ProgressPayload, ProgressSender};
use crate::types::{ProcessingCounters, ProcessingEstimate, ProcessingStats};
use crate::user_agent::random_user_agent;
use crate::ytdlp::{FlatEntry, VideoInfo, YtDlp};

/// Scraper throttling and retry configuration.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Videos expanded concurrently per batch
    pub batch_size: usize,
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_delay: Duration,
    /// Jitter window before each detail call, in seconds
    pub min_video_delay: f64,
    pub max_video_delay: f64,
    /// Jitter window between batches, in seconds
    pub min_batch_delay: f64,
    pub max_batch_delay: f64,
    pub cookies_file: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            min_video_delay: 0.5,
            max_video_delay: 2.0,
            min_batch_delay: 1.0,
            max_batch_delay: 3.0,
            cookies_file: None,
        }
    }
}

impl ScraperConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let float = |key: &str, fallback: f64| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback)
        };
        Self {
            batch_size: std::env::var("SCRAPER_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: Duration::from_secs_f64(float(
                "RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs_f64(),
            )),
            min_video_delay: float("MIN_VIDEO_DELAY", defaults.min_video_delay),
            max_video_delay: float("MAX_VIDEO_DELAY", defaults.max_video_delay),
            min_batch_delay: float("MIN_BATCH_DELAY", defaults.min_batch_delay),
            max_batch_delay: float("MAX_BATCH_DELAY", defaults.max_batch_delay),
            cookies_file: std::env::var("COOKIES_FILE").ok().map(PathBuf::from),
        }
    }
}

pub struct ScraperBackend {
    ytdlp: YtDlp,
    dislikes: DislikeClient,
    config: ScraperConfig,
    counters: ProcessingCounters,
}

impl ScraperBackend {
    pub fn new(config: ScraperConfig, dislike_config: DislikeConfig) -> BackendResult<Self> {
        let counters = ProcessingCounters::new();
        let ytdlp = YtDlp::new(config.cookies_file.clone())?;
        let dislikes = DislikeClient::new(dislike_config, counters.clone())?;
        Ok(Self {
            ytdlp,
            dislikes,
            config,
            counters,
        })
    }

    pub fn from_env() -> BackendResult<Self> {
        Self::new(ScraperConfig::from_env(), DislikeConfig::from_env())
    }

    /// Build from parts; tests inject a stubbed yt-dlp binary here.
    pub fn with_parts(
        ytdlp: YtDlp,
        dislikes: DislikeClient,
        config: ScraperConfig,
        counters: ProcessingCounters,
    ) -> Self {
        Self {
            ytdlp,
            dislikes,
            config,
            counters,
        }
    }

    async fn jitter(&self, min_secs: f64, max_secs: f64) {
        let secs = if max_secs > min_secs {
            rand::thread_rng().gen_range(min_secs..=max_secs)
        } else {
            min_secs
        };
        if secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    /// Flat skeleton extraction with the shared retry policy.
    async fn fetch_flat(&self, url: &str) -> BackendResult<crate::ytdlp::FlatPlaylist> {
        let mut attempt: u32 = 0;
        loop {
            match self.ytdlp.flat_playlist(url, random_user_agent()).await {
                Ok(flat) => return Ok(flat),
                Err(e) => {
                    let msg = e.to_string();
                    if is_bot_challenge_message(&msg) {
                        self.counters.record_bot_challenge();
                        if attempt < self.config.max_retries {
                            let wait = self.config.retry_delay * 2u32.pow(attempt);
                            warn!(
                                wait_secs = wait.as_secs_f64(),
                                attempt = attempt + 1,
                                "Bot challenge on playlist fetch, rotating user agent"
                            );
                            tokio::time::sleep(wait).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(BackendError::BotChallenge(format!(
                            "bot challenge persisted after {} retries: {msg}",
                            self.config.max_retries
                        )));
                    }
                    if attempt < self.config.max_retries {
                        self.counters.record_retry();
                        tokio::time::sleep(self.config.retry_delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Expand one video with retry, backoff, and user-agent rotation.
    ///
    /// A video that stays unreachable after the retry budget raises
    /// [`BackendError::VideoFetchFailed`], which the batch loop absorbs by
    /// keeping the skeleton row. A bot challenge that survives the budget
    /// aborts the whole fetch instead.
    async fn fetch_video_detail(&self, url: &str, video_id: &str) -> BackendResult<VideoInfo> {
        let mut attempt: u32 = 0;
        loop {
            self.jitter(self.config.min_video_delay, self.config.max_video_delay)
                .await;

            match self.ytdlp.video_info(url, random_user_agent()).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    let msg = e.to_string();
                    if is_bot_challenge_message(&msg) {
                        self.counters.record_bot_challenge();
                        if attempt < self.config.max_retries {
                            let wait = self.config.retry_delay * 2u32.pow(attempt);
                            warn!(
                                video_id,
                                wait_secs = wait.as_secs_f64(),
                                attempt = attempt + 1,
                                max = self.config.max_retries,
                                "Bot challenge, backing off with a fresh user agent"
                            );
                            tokio::time::sleep(wait).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(BackendError::BotChallenge(format!(
                            "bot challenge persisted after {} retries for {video_id}",
                            self.config.max_retries
                        )));
                    }

                    if attempt < self.config.max_retries {
                        self.counters.record_retry();
                        debug!(video_id, attempt = attempt + 1, "Video fetch failed, retrying");
                        tokio::time::sleep(self.config.retry_delay).await;
                        attempt += 1;
                        continue;
                    }

                    self.counters.record_failed_video();
                    return Err(BackendError::VideoFetchFailed(format!(
                        "{video_id} unreachable after {} retries: {msg}",
                        self.config.max_retries
                    )));
                }
            }
        }
    }

    fn entry_watch_url(entry: &FlatEntry) -> Option<String> {
        if let Some(url) = &entry.url {
            return Some(url.clone());
        }
        entry
            .id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={id}"))
    }

    /// Merge an expanded detail and dislike lookup into a skeleton entry,
    /// column by column: expanded values win, skeleton values fill the gaps.
    fn merge_row(
        rank: u32,
        entry: &FlatEntry,
        channel_name: &str,
        detail: Option<&VideoInfo>,
        dislike: Option<&DislikeData>,
    ) -> VideoData {
        let id = entry.id.clone().unwrap_or_default();
        let skeleton_views = entry.view_count.unwrap_or(0);
        let skeleton_duration = entry.duration.unwrap_or(0.0) as i64;

        let views = detail.and_then(|d| d.view_count).unwrap_or(skeleton_views);
        let likes = dislike
            .and_then(|d| d.likes)
            .or_else(|| detail.and_then(|d| d.like_count))
            .unwrap_or(0);
        let dislikes = dislike.and_then(|d| d.dislikes).unwrap_or(0);
        let comments = detail.and_then(|d| d.comment_count).unwrap_or(0);
        let duration = detail
            .and_then(|d| d.duration)
            .map(|d| d as i64)
            .unwrap_or(skeleton_duration);

        VideoData {
            rank,
            id: detail.and_then(|d| d.id.clone()).unwrap_or(id),
            title: detail
                .and_then(|d| d.title.clone())
                .or_else(|| entry.title.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            views,
            likes,
            dislikes,
            comments,
            duration_seconds: duration,
            uploader: detail
                .and_then(|d| d.uploader.clone())
                .or_else(|| entry.uploader.clone())
                .unwrap_or_else(|| channel_name.to_string()),
            thumbnail: detail
                .and_then(|d| d.thumbnail.clone())
                .or_else(|| entry.thumbnail.clone())
                .unwrap_or_default(),
            rating: dislike.and_then(|d| d.rating),
        }
    }
}

#[async_trait]
impl YoutubeBackend for ScraperBackend {
    async fn fetch_preview(&self, url: &NormalizedUrl) -> BackendResult<PlaylistMetadata> {
        let flat = self
            .ytdlp
            .flat_playlist(url.as_str(), random_user_agent())
            .await?;
        Ok(PlaylistMetadata {
            video_count: flat.playlist_count.unwrap_or(flat.entries.len() as i64),
            channel_thumbnail: flat.best_thumbnail(),
            title: flat.title.unwrap_or_else(|| "Untitled Playlist".to_string()),
            channel_name: flat.uploader.unwrap_or_else(|| "Unknown Channel".to_string()),
        })
    }

    async fn fetch_videos(
        &self,
        url: &NormalizedUrl,
        max_videos: Option<usize>,
        progress: Option<ProgressSender>,
    ) -> BackendResult<(Vec<VideoData>, PlaylistMetadata)> {
        info!(url = %url, "Fetching playlist via scraper");
        let flat = self.fetch_flat(url.as_str()).await?;

        let metadata = PlaylistMetadata {
            video_count: flat.playlist_count.unwrap_or(flat.entries.len() as i64),
            channel_thumbnail: flat.best_thumbnail(),
            title: flat
                .title
                .clone()
                .unwrap_or_else(|| "Untitled Playlist".to_string()),
            channel_name: flat
                .uploader
                .clone()
                .unwrap_or_else(|| "Unknown Channel".to_string()),
        };

        let mut entries: Vec<FlatEntry> = flat
            .entries
            .into_iter()
            .filter(|e| e.id.is_some())
            .collect();
        if let Some(max) = max_videos {
            entries.truncate(max);
        }
        if entries.is_empty() {
            warn!(url = %url, "No entries found in playlist");
            return Ok((Vec::new(), metadata));
        }

        let estimate = self.estimate_time(metadata.video_count, max_videos.is_none());
        info!(
            videos = entries.len(),
            batches = estimate.batch_count,
            eta = %estimate,
            "Starting detail expansion"
        );

        let total_batches = (entries.len() + self.config.batch_size - 1) / self.config.batch_size;
        let started = Instant::now();
        let mut details: HashMap<String, VideoInfo> = HashMap::new();
        let mut dislikes: HashMap<String, DislikeData> = HashMap::new();

        for (batch_idx, batch) in entries.chunks(self.config.batch_size).enumerate() {
            let batch_num = batch_idx + 1;
            debug!(batch = batch_num, total_batches, "Processing batch");

            let detail_futures = batch.iter().map(|entry| {
                let watch_url = Self::entry_watch_url(entry).unwrap_or_default();
                let video_id = entry.id.clone().unwrap_or_default();
                async move {
                    let detail = self.fetch_video_detail(&watch_url, &video_id).await?;
                    Ok::<_, BackendError>((video_id, detail))
                }
            });
            let dislike_futures = batch.iter().filter_map(|entry| {
                entry.id.clone().map(|id| async move {
                    let data = self.dislikes.votes(&id).await;
                    (id, data)
                })
            });

            let (detail_results, dislike_results) =
                tokio::join!(join_all(detail_futures), join_all(dislike_futures));

            for result in detail_results {
                match result {
                    Ok((video_id, info)) => {
                        details.insert(video_id, info);
                    }
                    Err(BackendError::VideoFetchFailed(reason)) => {
                        // The skeleton row stands in for this video.
                        warn!(%reason, "Video expansion failed, keeping skeleton row");
                    }
                    // A persistent bot challenge aborts the whole job.
                    Err(e) => return Err(e),
                }
            }
            for (video_id, data) in dislike_results {
                dislikes.insert(video_id, data);
            }

            let processed = (batch_idx * self.config.batch_size + batch.len()) as u64;
            let elapsed = started.elapsed().as_secs_f64();
            let remaining = if processed > 0 {
                elapsed / processed as f64 * entries.len() as f64 - elapsed
            } else {
                0.0
            };
            let mut meta = serde_json::Map::new();
            meta.insert("processed".to_string(), json!(processed));
            meta.insert("total".to_string(), json!(metadata.video_count.max(0)));
            meta.insert("elapsed".to_string(), json!(elapsed));
            meta.insert("remaining".to_string(), json!(remaining.max(0.0)));
            meta.insert("batch".to_string(), json!(batch_num));
            meta.insert("total_batches".to_string(), json!(total_batches));
            send_progress(progress.as_ref(), ProgressPayload::Map(meta));

            if batch_num < total_batches {
                self.jitter(self.config.min_batch_delay, self.config.max_batch_delay)
                    .await;
            }
        }

        let videos: Vec<VideoData> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let id = entry.id.as_deref().unwrap_or_default();
                Self::merge_row(
                    (idx + 1) as u32,
                    entry,
                    &metadata.channel_name,
                    details.get(id),
                    dislikes.get(id),
                )
            })
            .collect();

        let stats = self.counters.snapshot();
        info!(
            expanded = details.len(),
            total = videos.len(),
            ?stats,
            "Scraper fetch complete"
        );
        Ok((videos, metadata))
    }

    fn estimate_time(&self, count: i64, expand_all: bool) -> ProcessingEstimate {
        let videos_to_expand = if expand_all { count } else { count.min(20) };
        let flat_fetch_time = 2.0;
        let avg_video_fetch = (self.config.min_video_delay + self.config.max_video_delay) / 2.0;
        let avg_dislike_fetch = 0.2;
        let avg_batch_delay = (self.config.min_batch_delay + self.config.max_batch_delay) / 2.0;

        let batch_size = self.config.batch_size as i64;
        let batch_count = (videos_to_expand + batch_size - 1) / batch_size.max(1);

        // Detail and dislike calls run concurrently, so a batch costs the
        // slower of the two plus the inter-batch delay.
        let time_per_batch = (avg_video_fetch * batch_size as f64)
            .max(avg_dislike_fetch * batch_size as f64)
            + avg_batch_delay;
        // 20% headroom for retries
        let total = (flat_fetch_time + time_per_batch * batch_count as f64) * 1.2;

        ProcessingEstimate {
            total_videos: count,
            videos_to_expand,
            estimated_seconds: total,
            batch_count,
        }
    }

    fn processing_stats(&self) -> ProcessingStats {
        self.counters.snapshot()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Scraper
    }

    async fn close(&self) {
        // reqwest pools tear down on drop; nothing to release eagerly
    }
}
