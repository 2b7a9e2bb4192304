//! Analysis job rows and their status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job processing status.
///
/// Transitions move only forward:
/// `pending -> processing -> {complete | failed | blocked}`.
/// `blocked` is distinct from `failed` so the UI can tell "wait and retry
/// later" (bot challenge) apart from "something broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker to lease it
    #[default]
    Pending,
    /// Leased by a worker, exclusively owned until a terminal state
    Processing,
    /// Analysis finished and stats were persisted
    Complete,
    /// Terminal error
    Failed,
    /// Terminal bot challenge from the scraped service
    Blocked,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Blocked => "blocked",
        }
    }

    /// Parse a stored status string.
    ///
    /// Accepts `done` as a legacy synonym of `complete` on read; writers must
    /// only ever emit `complete`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "complete" | "done" => Some(JobStatus::Complete),
            "failed" => Some(JobStatus::Failed),
            "blocked" => Some(JobStatus::Blocked),
            _ => None,
        }
    }

    /// Terminal states receive no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Blocked
        )
    }

    /// Non-terminal states block a new submission for the same URL.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown job status: {s}"))
    }
}

/// A row in the `playlist_jobs` table.
///
/// Jobs are append-only history: a failed analysis is retried by inserting a
/// fresh `pending` row, never by resetting an old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    /// Normalized playlist URL this job analyzes
    pub playlist_url: String,
    pub status: JobStatus,
    /// Percent complete, 0..=100; reaches 100 only on `complete`
    pub progress: i16,
    /// Number of times a worker has leased this row
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Seconds since the worker leased this job, if it has started.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at.map(|t| (now - t).num_seconds().max(0))
    }

    /// Naive remaining-time estimate from elapsed time and progress.
    ///
    /// Returns `None` until progress is strictly between 0 and 100.
    pub fn estimated_remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        let elapsed = self.elapsed_seconds(now)? as f64;
        if self.progress <= 0 || self.progress >= 100 {
            return None;
        }
        let fraction = f64::from(self.progress) / 100.0;
        let total = elapsed / fraction;
        Some((total - elapsed).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: JobStatus, progress: i16) -> Job {
        Job {
            id: 1,
            playlist_url: "https://www.youtube.com/playlist?list=pl_test".into(),
            status,
            progress,
            attempts: 1,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn status_roundtrip_and_done_synonym() {
        for s in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Complete,
            JobStatus::Failed,
            JobStatus::Blocked,
        ] {
            assert_eq!(JobStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(JobStatus::parse("done"), Some(JobStatus::Complete));
        assert_eq!(JobStatus::parse("stale"), None);
    }

    #[test]
    fn terminal_and_in_flight_partition() {
        assert!(JobStatus::Pending.is_in_flight());
        assert!(JobStatus::Processing.is_in_flight());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Blocked.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn remaining_estimate_requires_partial_progress() {
        let now = Utc::now();
        let mut j = job(JobStatus::Processing, 50);
        j.started_at = Some(now - Duration::seconds(60));

        assert_eq!(j.elapsed_seconds(now), Some(60));
        assert_eq!(j.estimated_remaining_seconds(now), Some(60));

        j.progress = 0;
        assert_eq!(j.estimated_remaining_seconds(now), None);
        j.progress = 100;
        assert_eq!(j.estimated_remaining_seconds(now), None);
    }
}
