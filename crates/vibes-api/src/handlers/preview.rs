//! Lightweight playlist preview.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use vibes_models::{normalize, PlaylistMetadata};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub playlist_url: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PlaylistMetadata>,
    /// "cache" when served from a stored stats row, "live" otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /preview?playlist_url=…
///
/// Serves stored metadata when any stats row exists for the playlist;
/// otherwise one cheap backend call. Errors are in-body (this feeds a UI
/// fragment).
pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let url = match normalize(&query.playlist_url) {
        Ok(url) => url,
        Err(e) => {
            return Ok(Json(PreviewResponse {
                preview: None,
                source: None,
                error: Some(e.to_string()),
            }))
        }
    };

    if let Some(stats) = state.store.get_cached_stats(&url, false).await? {
        return Ok(Json(PreviewResponse {
            preview: Some(PlaylistMetadata {
                title: stats.title,
                channel_name: stats.channel_name,
                channel_thumbnail: stats.channel_thumbnail,
                video_count: stats.video_count,
            }),
            source: Some("cache".to_string()),
            error: None,
        }));
    }

    match state.backend.fetch_preview(&url).await {
        Ok(meta) => Ok(Json(PreviewResponse {
            preview: Some(meta),
            source: Some("live".to_string()),
            error: None,
        })),
        Err(e) => {
            warn!(url = %url, error = %e, "Preview fetch failed");
            Ok(Json(PreviewResponse {
                preview: None,
                source: None,
                error: Some("Preview unavailable".to_string()),
            }))
        }
    }
}
