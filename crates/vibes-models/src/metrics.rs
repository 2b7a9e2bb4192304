//! Metric enrichment for fetched video rows.
//!
//! Pure and deterministic: the same input rows always produce the same
//! enriched rows and summary. The `+1` in each denominator keeps every ratio
//! defined for zero-view and zero-vote videos.

use crate::stats::SummaryStats;
use crate::video::{VideoData, VideoRow};

/// Raw engagement rate: `(likes + dislikes + comments) / (views + 1)`,
/// clipped to [0, 1].
pub fn engagement_rate_raw(views: i64, likes: i64, dislikes: i64, comments: i64) -> f64 {
    let interactions = (likes + dislikes + comments) as f64;
    let rate = interactions / (views + 1) as f64;
    rate.clamp(0.0, 1.0)
}

/// Controversy: `1 - |likes - dislikes| / (likes + dislikes + 1)`, clipped to
/// [0, 1]. Peaks near 1 at a balanced split, approaches 0 for one-sided
/// votes.
pub fn controversy(likes: i64, dislikes: i64) -> f64 {
    let spread = (likes - dislikes).abs() as f64;
    let score = 1.0 - spread / (likes + dislikes + 1) as f64;
    score.clamp(0.0, 1.0)
}

/// Derive per-row metrics, formatted display mirrors, and the summary
/// aggregates. Rows come out ordered by rank regardless of input order.
pub fn enrich(rows: Vec<VideoData>, total_in_playlist: i64) -> (Vec<VideoRow>, SummaryStats) {
    let mut data = rows;
    data.sort_by_key(|r| r.rank);

    let mut enriched = Vec::with_capacity(data.len());
    let mut summary = SummaryStats {
        actual_playlist_count: total_in_playlist,
        processed_video_count: data.len() as i64,
        ..SummaryStats::default()
    };

    for row in data {
        let engagement = engagement_rate_raw(row.views, row.likes, row.dislikes, row.comments);
        let contro = controversy(row.likes, row.dislikes);

        summary.total_views += row.views;
        summary.total_likes += row.likes;
        summary.total_dislikes += row.dislikes;
        summary.total_comments += row.comments;
        summary.avg_engagement += engagement;

        enriched.push(VideoRow::from_data(row, contro, engagement));
    }

    if !enriched.is_empty() {
        summary.avg_engagement /= enriched.len() as f64;
    }

    (enriched, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn video(rank: u32, views: i64, likes: i64, dislikes: i64, comments: i64) -> VideoData {
        VideoData {
            likes,
            dislikes,
            comments,
            ..VideoData::skeleton(rank, format!("v{rank}"), format!("V{rank}"), views, 60, "C", "")
        }
    }

    #[test]
    fn formulas_match_definitions() {
        // 100 views, 10 likes, 1 comment: 11 / 101
        assert!((engagement_rate_raw(100, 10, 0, 1) - 11.0 / 101.0).abs() < EPS);
        // zero views never divides by zero
        assert!((engagement_rate_raw(0, 0, 0, 0) - 0.0).abs() < EPS);
        // interactions exceeding views clip at 1
        assert!((engagement_rate_raw(1, 10, 0, 0) - 1.0).abs() < EPS);

        // one-sided votes approach 0
        assert!(controversy(1000, 0) < 0.01);
        // balanced votes approach 1
        assert!(controversy(500, 500) > 0.99);
        // no votes at all is exactly zero spread over one
        assert!((controversy(0, 0) - 1.0).abs() < EPS);
    }

    #[test]
    fn bounds_hold_for_extreme_inputs() {
        for (views, likes, dislikes, comments) in [
            (0i64, 0i64, 0i64, 0i64),
            (0, 1_000_000, 1_000_000, 1_000_000),
            (1, 0, 0, 0),
            (i32::MAX as i64, 1, 2, 3),
        ] {
            let e = engagement_rate_raw(views, likes, dislikes, comments);
            let c = controversy(likes, dislikes);
            assert!((0.0..=1.0).contains(&e), "engagement {e} out of bounds");
            assert!((0.0..=1.0).contains(&c), "controversy {c} out of bounds");
        }
    }

    #[test]
    fn summary_matches_expected_averages() {
        // The three-video scenario: (100, 10, 0, 1), (0, 0, 0, 0), (200, 20, 0, 2)
        let rows = vec![
            video(1, 100, 10, 0, 1),
            video(2, 0, 0, 0, 0),
            video(3, 200, 20, 0, 2),
        ];
        let (enriched, summary) = enrich(rows, 3);

        assert_eq!(enriched.len(), 3);
        assert_eq!(summary.total_views, 300);
        assert_eq!(summary.total_likes, 30);
        assert_eq!(summary.total_comments, 3);
        assert_eq!(summary.actual_playlist_count, 3);
        assert_eq!(summary.processed_video_count, 3);

        let expected = (11.0 / 101.0 + 0.0 + 22.0 / 201.0) / 3.0;
        assert!((summary.avg_engagement - expected).abs() < EPS);
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let (rows, summary) = enrich(vec![], 0);
        assert!(rows.is_empty());
        assert_eq!(summary, SummaryStats::default());
    }

    #[test]
    fn rows_are_reordered_by_rank() {
        let rows = vec![video(3, 1, 0, 0, 0), video(1, 1, 0, 0, 0), video(2, 1, 0, 0, 0)];
        let (enriched, _) = enrich(rows, 3);
        let ranks: Vec<u32> = enriched.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn enrich_is_deterministic() {
        let rows = vec![video(1, 123, 45, 6, 7), video(2, 89, 10, 11, 12)];
        let (a_rows, a_sum) = enrich(rows.clone(), 2);
        let (b_rows, b_sum) = enrich(rows, 2);
        assert_eq!(a_rows, b_rows);
        assert!((a_sum.avg_engagement - b_sum.avg_engagement).abs() < EPS);
    }

    #[test]
    fn single_zero_view_video_is_bounded() {
        let (enriched, summary) = enrich(vec![video(1, 0, 3, 1, 2)], 1);
        // (3 + 1 + 2) / (0 + 1) = 6, clipped to 1
        assert!((enriched[0].engagement_rate_raw - 1.0).abs() < EPS);
        assert!((summary.avg_engagement - 1.0).abs() < EPS);
    }
}
