//! Per-video rows and the serialized dataset blob.

use serde::{Deserialize, Serialize};

use crate::format::{format_count, format_duration, format_percent};

/// Current schema version written into [`VideoDataset`] envelopes.
pub const DATASET_SCHEMA_VERSION: u32 = 1;

/// Raw per-video data as delivered by a fetch backend.
///
/// Counts default to zero when the source omits them (a skeleton row from
/// flat extraction carries views and duration but no likes or comments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    /// 1-based position in the playlist
    pub rank: u32,
    pub id: String,
    pub title: String,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub comments: i64,
    /// Duration in whole seconds
    pub duration_seconds: i64,
    pub uploader: String,
    pub thumbnail: String,
    /// Like/dislike rating from the dislike service, when available
    pub rating: Option<f64>,
}

impl VideoData {
    /// A skeleton row carrying only what cheap flat extraction provides.
    pub fn skeleton(
        rank: u32,
        id: impl Into<String>,
        title: impl Into<String>,
        views: i64,
        duration_seconds: i64,
        uploader: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            rank,
            id: id.into(),
            title: title.into(),
            views,
            likes: 0,
            dislikes: 0,
            comments: 0,
            duration_seconds,
            uploader: uploader.into(),
            thumbnail: thumbnail.into(),
            rating: None,
        }
    }
}

/// An enriched video row: raw data plus derived metrics and display mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRow {
    pub rank: u32,
    pub id: String,
    pub title: String,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub comments: i64,
    pub duration_seconds: i64,
    pub uploader: String,
    pub thumbnail: String,
    pub rating: Option<f64>,
    /// `1 - |likes - dislikes| / (likes + dislikes + 1)`, in [0, 1]
    pub controversy: f64,
    /// `(likes + dislikes + comments) / (views + 1)`, in [0, 1]
    pub engagement_rate_raw: f64,
    pub views_display: String,
    pub likes_display: String,
    pub dislikes_display: String,
    pub comments_display: String,
    pub duration_display: String,
    pub controversy_display: String,
    pub engagement_display: String,
}

impl VideoRow {
    /// Attach derived metrics and formatted mirrors to a raw row.
    pub fn from_data(data: VideoData, controversy: f64, engagement_rate_raw: f64) -> Self {
        Self {
            views_display: format_count(data.views),
            likes_display: format_count(data.likes),
            dislikes_display: format_count(data.dislikes),
            comments_display: format_count(data.comments),
            duration_display: format_duration(data.duration_seconds),
            controversy_display: format_percent(controversy),
            engagement_display: format_percent(engagement_rate_raw),
            rank: data.rank,
            id: data.id,
            title: data.title,
            views: data.views,
            likes: data.likes,
            dislikes: data.dislikes,
            comments: data.comments,
            duration_seconds: data.duration_seconds,
            uploader: data.uploader,
            thumbnail: data.thumbnail,
            rating: data.rating,
            controversy,
            engagement_rate_raw,
        }
    }
}

/// Schema-versioned envelope for the serialized per-video dataset.
///
/// Stored as an opaque JSON column on the stats row so dashboard readers can
/// evolve independently of the worker that wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDataset {
    pub schema_version: u32,
    pub rows: Vec<VideoRow>,
}

impl VideoDataset {
    pub fn new(rows: Vec<VideoRow>) -> Self {
        Self {
            schema_version: DATASET_SCHEMA_VERSION,
            rows,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_json_roundtrip_keeps_rank_order() {
        let rows = vec![
            VideoRow::from_data(
                VideoData::skeleton(1, "a", "First", 100, 60, "Chan", ""),
                0.0,
                0.0,
            ),
            VideoRow::from_data(
                VideoData::skeleton(2, "b", "Second", 200, 90, "Chan", ""),
                0.5,
                0.1,
            ),
        ];
        let ds = VideoDataset::new(rows.clone());
        let parsed = VideoDataset::from_json(&ds.to_json().unwrap()).unwrap();

        assert_eq!(parsed.schema_version, DATASET_SCHEMA_VERSION);
        assert_eq!(parsed.rows, rows);
        assert_eq!(parsed.rows[0].rank, 1);
        assert_eq!(parsed.rows[1].rank, 2);
    }

    #[test]
    fn skeleton_rows_have_zeroed_engagement_fields() {
        let row = VideoData::skeleton(3, "v", "Title", 1000, 120, "Chan", "thumb.jpg");
        assert_eq!(row.likes, 0);
        assert_eq!(row.dislikes, 0);
        assert_eq!(row.comments, 0);
        assert_eq!(row.rating, None);
        assert_eq!(row.views, 1000);
    }
}
