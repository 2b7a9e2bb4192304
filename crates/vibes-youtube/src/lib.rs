//! YouTube fetch engine for the Vibes backend.
//!
//! Two interchangeable implementations of the [`YoutubeBackend`] contract:
//! - [`ApiBackend`] — the official Data API v3; fast and reliable but quota
//!   limited. Quota exhaustion surfaces as [`BackendError::QuotaExceeded`] so
//!   the worker can fall through to the scraper.
//! - [`ScraperBackend`] — yt-dlp driven extraction with bot-challenge
//!   handling, jittered throttling, user-agent rotation, and concurrent
//!   dislike enrichment from the Return YouTube Dislike service.

mod api;
mod backend;
mod dislikes;
mod duration;
mod error;
mod progress;
mod scraper;
mod types;
mod user_agent;
mod ytdlp;

pub use api::{ApiBackend, ApiBackendConfig};
pub use backend::{BackendKind, YoutubeBackend};
pub use dislikes::{DislikeClient, DislikeConfig, DislikeData};
pub use duration::parse_iso8601_duration;
pub use error::{BackendError, BackendResult};
pub use progress::{send_progress, ProgressPayload, ProgressSender};
pub use scraper::{ScraperBackend, ScraperConfig};
pub use types::{ProcessingCounters, ProcessingEstimate, ProcessingStats};
pub use user_agent::random_user_agent;
pub use ytdlp::{FlatEntry, FlatPlaylist, FlatThumbnail, VideoInfo, YtDlp};
