//! Materialized stats operations over `playlist_stats`.

use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{debug, info};

use vibes_models::{fingerprint, NormalizedUrl, PlaylistStats, SummaryStats, VideoDataset};

use crate::error::StoreResult;
use crate::store::Store;

const STATS_COLUMNS: &str = "playlist_url, processed_date, title, channel_name, \
     channel_thumbnail, view_count, like_count, dislike_count, comment_count, video_count, \
     processed_video_count, avg_duration, engagement_rate, controversy_score, summary_stats, \
     df_json";

fn stats_from_row(row: &PgRow) -> StoreResult<PlaylistStats> {
    let summary: serde_json::Value = row.try_get("summary_stats")?;
    let dataset: serde_json::Value = row.try_get("df_json")?;
    Ok(PlaylistStats {
        playlist_url: row.try_get("playlist_url")?,
        processed_date: row.try_get("processed_date")?,
        title: row.try_get("title")?,
        channel_name: row.try_get("channel_name")?,
        channel_thumbnail: row.try_get("channel_thumbnail")?,
        view_count: row.try_get("view_count")?,
        like_count: row.try_get("like_count")?,
        dislike_count: row.try_get("dislike_count")?,
        comment_count: row.try_get("comment_count")?,
        video_count: row.try_get("video_count")?,
        processed_video_count: row.try_get("processed_video_count")?,
        avg_duration_seconds: row.try_get("avg_duration")?,
        engagement_rate: row.try_get("engagement_rate")?,
        controversy_score: row.try_get("controversy_score")?,
        summary_stats: serde_json::from_value::<SummaryStats>(summary)?,
        dataset: serde_json::from_value::<VideoDataset>(dataset)?,
    })
}

impl Store {
    /// Insert or refresh the stats row for `(playlist_url, processed_date)`.
    ///
    /// Idempotent: upserting the same analysis twice leaves a single row and
    /// returns equal reads. The dashboard id is derived from the stored URL
    /// at write time so reads can look it up directly.
    pub async fn upsert_playlist_stats(&self, stats: &PlaylistStats) -> StoreResult<PlaylistStats> {
        let url = NormalizedUrl::from_stored(stats.playlist_url.clone());
        let dashboard_id = fingerprint(&url);
        let summary = serde_json::to_value(&stats.summary_stats)?;
        let dataset = serde_json::to_value(&stats.dataset)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO playlist_stats (
                playlist_url, processed_date, dashboard_id, title, channel_name,
                channel_thumbnail, view_count, like_count, dislike_count, comment_count,
                video_count, processed_video_count, avg_duration, engagement_rate,
                controversy_score, summary_stats, df_json
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (playlist_url, processed_date) DO UPDATE SET
                title = EXCLUDED.title,
                channel_name = EXCLUDED.channel_name,
                channel_thumbnail = EXCLUDED.channel_thumbnail,
                view_count = EXCLUDED.view_count,
                like_count = EXCLUDED.like_count,
                dislike_count = EXCLUDED.dislike_count,
                comment_count = EXCLUDED.comment_count,
                video_count = EXCLUDED.video_count,
                processed_video_count = EXCLUDED.processed_video_count,
                avg_duration = EXCLUDED.avg_duration,
                engagement_rate = EXCLUDED.engagement_rate,
                controversy_score = EXCLUDED.controversy_score,
                summary_stats = EXCLUDED.summary_stats,
                df_json = EXCLUDED.df_json
            RETURNING {STATS_COLUMNS}
            "#
        ))
        .bind(&stats.playlist_url)
        .bind(stats.processed_date)
        .bind(&dashboard_id)
        .bind(&stats.title)
        .bind(&stats.channel_name)
        .bind(&stats.channel_thumbnail)
        .bind(stats.view_count)
        .bind(stats.like_count)
        .bind(stats.dislike_count)
        .bind(stats.comment_count)
        .bind(stats.video_count)
        .bind(stats.processed_video_count)
        .bind(stats.avg_duration_seconds)
        .bind(stats.engagement_rate)
        .bind(stats.controversy_score)
        .bind(summary)
        .bind(dataset)
        .fetch_one(&self.pool)
        .await?;

        info!(url = %stats.playlist_url, date = %stats.processed_date, "Upserted playlist stats");
        stats_from_row(&row)
    }

    /// Cached stats for a URL.
    ///
    /// With `check_date` only a row processed today (UTC) counts as fresh;
    /// otherwise the newest row for the URL is returned regardless of age.
    pub async fn get_cached_stats(
        &self,
        url: &NormalizedUrl,
        check_date: bool,
    ) -> StoreResult<Option<PlaylistStats>> {
        let row = if check_date {
            let today: NaiveDate = Utc::now().date_naive();
            sqlx::query(&format!(
                "SELECT {STATS_COLUMNS} FROM playlist_stats
                 WHERE playlist_url = $1 AND processed_date = $2 LIMIT 1"
            ))
            .bind(url.as_str())
            .bind(today)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {STATS_COLUMNS} FROM playlist_stats
                 WHERE playlist_url = $1 ORDER BY processed_date DESC LIMIT 1"
            ))
            .bind(url.as_str())
            .fetch_optional(&self.pool)
            .await?
        };

        if row.is_none() {
            debug!(url = %url, check_date, "Stats cache miss");
        }
        row.as_ref().map(stats_from_row).transpose()
    }

    /// Newest stats row whose stored dashboard id matches.
    pub async fn find_stats_by_dashboard_id(
        &self,
        dashboard_id: &str,
    ) -> StoreResult<Option<PlaylistStats>> {
        let row = sqlx::query(&format!(
            "SELECT {STATS_COLUMNS} FROM playlist_stats
             WHERE dashboard_id = $1 ORDER BY processed_date DESC LIMIT 1"
        ))
        .bind(dashboard_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(stats_from_row).transpose()
    }
}
