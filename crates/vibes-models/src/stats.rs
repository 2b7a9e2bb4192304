//! Materialized playlist statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::playlist_url::NormalizedUrl;
use crate::video::{VideoDataset, VideoRow};

/// Lightweight playlist metadata, uniform across fetch backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    pub title: String,
    pub channel_name: String,
    pub channel_thumbnail: String,
    /// Total videos the playlist reports, which may exceed what was fetched
    pub video_count: i64,
}

/// Summary aggregates computed by the enricher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SummaryStats {
    pub total_views: i64,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub total_comments: i64,
    /// Mean of per-row raw engagement rates
    pub avg_engagement: f64,
    pub actual_playlist_count: i64,
    pub processed_video_count: i64,
}

/// A row in the `playlist_stats` table, unique per `(playlist_url,
/// processed_date)`. Written once by the worker and never mutated for that
/// date; a re-analysis on a later date inserts a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistStats {
    /// Normalized playlist URL
    pub playlist_url: String,
    /// UTC date the analysis ran
    pub processed_date: NaiveDate,
    pub title: String,
    pub channel_name: String,
    pub channel_thumbnail: String,
    pub view_count: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    /// Total videos in the playlist
    pub video_count: i64,
    /// Videos actually fetched and present in the dataset
    pub processed_video_count: i64,
    pub avg_duration_seconds: i64,
    pub engagement_rate: f64,
    pub controversy_score: f64,
    pub summary_stats: SummaryStats,
    pub dataset: VideoDataset,
}

impl PlaylistStats {
    /// Assemble the materialized row from an enriched analysis.
    pub fn from_analysis(
        url: &NormalizedUrl,
        processed_date: NaiveDate,
        metadata: &PlaylistMetadata,
        rows: Vec<VideoRow>,
        summary: SummaryStats,
    ) -> Self {
        let processed = rows.len() as i64;
        let avg_duration_seconds = if processed > 0 {
            rows.iter().map(|r| r.duration_seconds).sum::<i64>() / processed
        } else {
            0
        };
        let controversy_score = if processed > 0 {
            rows.iter().map(|r| r.controversy).sum::<f64>() / processed as f64
        } else {
            0.0
        };

        Self {
            playlist_url: url.as_str().to_string(),
            processed_date,
            title: metadata.title.clone(),
            channel_name: metadata.channel_name.clone(),
            channel_thumbnail: metadata.channel_thumbnail.clone(),
            view_count: summary.total_views,
            like_count: summary.total_likes,
            dislike_count: summary.total_dislikes,
            comment_count: summary.total_comments,
            video_count: metadata.video_count,
            processed_video_count: processed,
            avg_duration_seconds,
            engagement_rate: summary.avg_engagement,
            controversy_score,
            summary_stats: summary,
            dataset: VideoDataset::new(rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::enrich;
    use crate::playlist_url::normalize;
    use crate::video::VideoData;

    #[test]
    fn from_analysis_aggregates_duration_and_controversy() {
        let url = normalize("https://www.youtube.com/playlist?list=PL_T").unwrap();
        let meta = PlaylistMetadata {
            title: "T".into(),
            channel_name: "C".into(),
            channel_thumbnail: String::new(),
            video_count: 3,
        };
        let data = vec![
            VideoData {
                likes: 10,
                comments: 2,
                ..VideoData::skeleton(1, "a", "A", 100, 60, "C", "")
            },
            VideoData::skeleton(2, "b", "B", 0, 120, "C", ""),
        ];
        let (rows, summary) = enrich(data, 3);
        let stats = PlaylistStats::from_analysis(
            &url,
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            &meta,
            rows,
            summary,
        );

        assert_eq!(stats.video_count, 3);
        assert_eq!(stats.processed_video_count, 2);
        assert_eq!(stats.avg_duration_seconds, 90);
        // row one is one-sided (1 - 10/11), row two has no votes at all (1.0)
        let expected_controversy = ((1.0 - 10.0 / 11.0) + 1.0) / 2.0;
        assert!((stats.controversy_score - expected_controversy).abs() < 1e-9);
        assert_eq!(stats.view_count, 100);
        assert_eq!(stats.like_count, 10);
    }

    #[test]
    fn from_analysis_with_no_rows_is_all_zeros() {
        let url = normalize("https://www.youtube.com/playlist?list=PL_E").unwrap();
        let meta = PlaylistMetadata {
            title: "Empty".into(),
            channel_name: "C".into(),
            channel_thumbnail: String::new(),
            video_count: 0,
        };
        let (rows, summary) = enrich(vec![], 0);
        let stats = PlaylistStats::from_analysis(
            &url,
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            &meta,
            rows,
            summary,
        );

        assert_eq!(stats.processed_video_count, 0);
        assert_eq!(stats.avg_duration_seconds, 0);
        assert_eq!(stats.controversy_score, 0.0);
        assert!(stats.dataset.is_empty());
    }
}
