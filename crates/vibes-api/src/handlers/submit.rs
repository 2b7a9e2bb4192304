//! Submit handler: validate, coalesce, and either redirect or hand the UI a
//! progress token.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use vibes_models::normalize;

use crate::error::ApiResult;
use crate::services::{decide_submit, SubmitDecision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub playlist_url: String,
}

/// Body of a submit response when no redirect happens.
///
/// UI fragments always get a 200 with the state in-body; `redirect` is set
/// when the client should navigate to the dashboard.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_after_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "invalid".to_string(),
            redirect: None,
            job_id: None,
            progress: None,
            poll_url: None,
            poll_after_seconds: None,
            error: Some(message.into()),
        }
    }

    fn progress(status: &str, job_id: i64, progress: i16, playlist_url: &str) -> Self {
        Self {
            status: status.to_string(),
            redirect: None,
            job_id: Some(job_id),
            progress: Some(progress),
            poll_url: Some(format!(
                "/job-progress?playlist_url={}",
                urlencoding::encode(playlist_url)
            )),
            poll_after_seconds: Some(2),
            error: None,
        }
    }
}

/// POST /submit-job
///
/// Fragment-style clients (the polling UI sends an `HX-Request` header) get
/// the decision in-body with a 200; plain form posts to a cached playlist
/// get an explicit 303 to the dashboard.
pub async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SubmitForm>,
) -> ApiResult<Response> {
    let url = match normalize(&form.playlist_url) {
        Ok(url) => url,
        Err(e) => {
            info!(input = %form.playlist_url, "Rejected playlist URL: {e}");
            return Ok(Json(SubmitResponse::error(e.to_string())).into_response());
        }
    };

    let decision = decide_submit(&state.store, &url).await?;
    info!(url = %url, ?decision, "Submit decision");

    let is_fragment = headers.contains_key("hx-request");

    let response = match decision {
        SubmitDecision::CachedDashboard { dashboard_id } => {
            let target = format!("/d/{dashboard_id}");
            if is_fragment {
                Json(SubmitResponse {
                    status: "complete".to_string(),
                    redirect: Some(target),
                    job_id: None,
                    progress: Some(100),
                    poll_url: None,
                    poll_after_seconds: None,
                    error: None,
                })
                .into_response()
            } else {
                (StatusCode::SEE_OTHER, [(header::LOCATION, target)]).into_response()
            }
        }
        SubmitDecision::InProgress { job } => Json(SubmitResponse::progress(
            job.status.as_str(),
            job.id,
            job.progress,
            url.as_str(),
        ))
        .into_response(),
        SubmitDecision::Enqueued { job_id } => {
            Json(SubmitResponse::progress("pending", job_id, 0, url.as_str())).into_response()
        }
        SubmitDecision::Blocked { job } => Json(SubmitResponse {
            status: "blocked".to_string(),
            redirect: None,
            job_id: Some(job.id),
            progress: None,
            poll_url: None,
            poll_after_seconds: None,
            error: Some(
                "YouTube's bot protection blocked this analysis. Please try again in a few minutes."
                    .to_string(),
            ),
        })
        .into_response(),
    };

    Ok(response)
}

