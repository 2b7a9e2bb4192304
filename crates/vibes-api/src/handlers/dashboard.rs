//! Dashboard read API.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vibes_models::{EventCounts, EventKind, PlaylistStats};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub dashboard_id: String,
    #[serde(flatten)]
    pub stats: PlaylistStats,
    pub interest: EventCounts,
}

fn is_valid_dashboard_id(id: &str) -> bool {
    id.len() == 16 && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// GET /d/:dashboard_id
///
/// Resolves the id to the newest materialized stats row and records a `view`
/// event. Event failures must never block the response.
pub async fn view_dashboard(
    State(state): State<AppState>,
    Path(dashboard_id): Path<String>,
) -> ApiResult<Json<DashboardView>> {
    if !is_valid_dashboard_id(&dashboard_id) {
        return Err(ApiError::not_found("This playlist dashboard does not exist."));
    }

    let stats = state
        .store
        .find_stats_by_dashboard_id(&dashboard_id)
        .await?
        .ok_or_else(|| ApiError::not_found("This playlist dashboard does not exist."))?;

    info!(dashboard_id, url = %stats.playlist_url, "Dashboard view");

    if let Err(e) = state
        .store
        .record_dashboard_event(&dashboard_id, EventKind::View)
        .await
    {
        warn!(dashboard_id, error = %e, "View event not recorded");
    }
    let interest = state
        .store
        .dashboard_event_counts(&dashboard_id)
        .await
        .unwrap_or_default();

    Ok(Json(DashboardView {
        dashboard_id,
        stats,
        interest,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecordEventBody {
    pub event_type: String,
}

#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    pub ok: bool,
    pub interest: EventCounts,
}

/// POST /d/:dashboard_id/events
///
/// Records a share/export interaction from the dashboard UI.
pub async fn record_event(
    State(state): State<AppState>,
    Path(dashboard_id): Path<String>,
    Json(body): Json<RecordEventBody>,
) -> ApiResult<Json<RecordEventResponse>> {
    if !is_valid_dashboard_id(&dashboard_id) {
        return Err(ApiError::not_found("This playlist dashboard does not exist."));
    }
    let kind = EventKind::parse(&body.event_type)
        .ok_or_else(|| ApiError::bad_request(format!("unknown event type: {}", body.event_type)))?;

    // Only record against dashboards that exist.
    if state
        .store
        .find_stats_by_dashboard_id(&dashboard_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("This playlist dashboard does not exist."));
    }

    if let Err(e) = state.store.record_dashboard_event(&dashboard_id, kind).await {
        warn!(dashboard_id, error = %e, "Event not recorded");
    }
    let interest = state
        .store
        .dashboard_event_counts(&dashboard_id)
        .await
        .unwrap_or_default();

    Ok(Json(RecordEventResponse { ok: true, interest }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_id_validation() {
        assert!(is_valid_dashboard_id("0123456789abcdef"));
        assert!(!is_valid_dashboard_id("0123456789ABCDEF"));
        assert!(!is_valid_dashboard_id("0123456789abcde"));
        assert!(!is_valid_dashboard_id("0123456789abcdef0"));
        assert!(!is_valid_dashboard_id("0123456789abcdeg"));
        assert!(!is_valid_dashboard_id(""));
    }
}
