//! Dashboard event recording and aggregation.

use sqlx::Row;
use tracing::debug;

use vibes_models::{EventCounts, EventKind};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

impl Store {
    /// Append one dashboard event. Events are never updated or deleted.
    pub async fn record_dashboard_event(
        &self,
        dashboard_id: &str,
        kind: EventKind,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO dashboard_events (dashboard_id, event_type) VALUES ($1, $2)")
            .bind(dashboard_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;
        debug!(dashboard_id, kind = %kind, "Recorded dashboard event");
        Ok(())
    }

    /// Aggregate event counts for one dashboard.
    pub async fn dashboard_event_counts(&self, dashboard_id: &str) -> StoreResult<EventCounts> {
        let rows = sqlx::query(
            r#"
            SELECT event_type, COUNT(*)::BIGINT AS count
            FROM dashboard_events
            WHERE dashboard_id = $1
            GROUP BY event_type
            "#,
        )
        .bind(dashboard_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = EventCounts::default();
        for row in rows {
            let kind_raw: String = row.try_get("event_type")?;
            let count: i64 = row.try_get("count")?;
            let kind = EventKind::parse(&kind_raw).ok_or_else(|| {
                StoreError::corrupt_row(format!("unknown event type '{kind_raw}'"))
            })?;
            counts.add(kind, count);
        }
        Ok(counts)
    }
}
