//! Backend error taxonomy.
//!
//! The worker is the only translator from these kinds to job states:
//! `QuotaExceeded` triggers scraper fallback, `BotChallenge` marks the job
//! blocked, everything else terminal is `Failed`. `VideoFetchFailed` never
//! escapes a backend; it degrades the affected row to its skeleton values.

use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Daily API quota exhausted (API backend only).
    #[error("YouTube API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Bot verification persisted through all retries (scraper only).
    #[error("bot challenge: {0}")]
    BotChallenge(String),

    /// HTTP 429 that survived the backoff budget.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// A single video could not be fetched; non-fatal for the playlist.
    #[error("video fetch failed: {0}")]
    VideoFetchFailed(String),

    /// Anything else; terminal for the job.
    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the worker should fall through to a secondary backend.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, BackendError::QuotaExceeded(_))
    }

    pub fn is_bot_challenge(&self) -> bool {
        matches!(self, BackendError::BotChallenge(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Other(e.to_string())
    }
}

/// Keywords that identify a human-verification page in an error message.
const BOT_CHALLENGE_MARKERS: [&str; 5] = [
    "sign in to confirm",
    "captcha",
    "verify",
    "unusual traffic",
    "automated requests",
];

/// Classify an error message as a bot challenge.
pub(crate) fn is_bot_challenge_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    BOT_CHALLENGE_MARKERS.iter().any(|kw| lower.contains(kw))
}
