//! Progress polling for the analysis UI.
//!
//! The UI re-polls every 2 seconds until it sees a terminal payload; on
//! `complete` the payload carries the dashboard redirect instead of further
//! polling hints.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use vibes_models::{fingerprint, normalize, JobStatus};

use crate::error::ApiResult;
use crate::state::AppState;

/// Poll cadence handed to the client, in seconds.
const POLL_AFTER_SECONDS: u32 = 2;

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub playlist_url: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_after_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressView {
    fn terminal(status: &str) -> Self {
        Self {
            status: status.to_string(),
            progress: None,
            elapsed_seconds: None,
            estimated_remaining_seconds: None,
            poll_after_seconds: None,
            redirect: None,
            message: None,
            error: None,
        }
    }
}

/// GET /job-progress?playlist_url=…
pub async fn job_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<ProgressView>> {
    let url = match normalize(&query.playlist_url) {
        Ok(url) => url,
        Err(e) => {
            return Ok(Json(ProgressView {
                error: Some(e.to_string()),
                ..ProgressView::terminal("invalid")
            }))
        }
    };

    let Some(job) = state.store.latest_job(&url).await? else {
        return Ok(Json(ProgressView {
            message: Some("No analysis job found for this playlist.".to_string()),
            ..ProgressView::terminal("none")
        }));
    };

    info!(url = %url, job_id = job.id, status = %job.status, progress = job.progress, "Progress poll");

    let view = match job.status {
        JobStatus::Complete => ProgressView {
            progress: Some(100),
            redirect: Some(format!("/d/{}", fingerprint(&url))),
            message: Some("Analysis complete! Redirecting to dashboard...".to_string()),
            ..ProgressView::terminal("complete")
        },
        JobStatus::Failed => ProgressView {
            error: job.last_error.clone(),
            message: Some("We couldn't complete the analysis for this playlist.".to_string()),
            ..ProgressView::terminal("failed")
        },
        JobStatus::Blocked => ProgressView {
            message: Some(
                "YouTube's bot protection blocked this analysis. Please try again in a few minutes."
                    .to_string(),
            ),
            ..ProgressView::terminal("blocked")
        },
        JobStatus::Pending | JobStatus::Processing => {
            let now = Utc::now();
            ProgressView {
                progress: Some(job.progress),
                elapsed_seconds: job.elapsed_seconds(now),
                estimated_remaining_seconds: job.estimated_remaining_seconds(now),
                poll_after_seconds: Some(POLL_AFTER_SECONDS),
                ..ProgressView::terminal(job.status.as_str())
            }
        }
    };

    Ok(Json(view))
}
