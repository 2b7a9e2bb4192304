//! Dashboard interest events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of dashboard interaction recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    Share,
    Export,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Share => "share",
            EventKind::Export => "export",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(EventKind::View),
            "share" => Some(EventKind::Share),
            "export" => Some(EventKind::Export),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only row in `dashboard_events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub dashboard_id: String,
    pub event_type: EventKind,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregated event counts for one dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub view: i64,
    pub share: i64,
    pub export: i64,
}

impl EventCounts {
    pub fn add(&mut self, kind: EventKind, count: i64) {
        match kind {
            EventKind::View => self.view += count,
            EventKind::Share => self.share += count,
            EventKind::Export => self.export += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_roundtrip() {
        for kind in [EventKind::View, EventKind::Share, EventKind::Export] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("click"), None);
    }

    #[test]
    fn counts_accumulate_by_kind() {
        let mut counts = EventCounts::default();
        counts.add(EventKind::View, 3);
        counts.add(EventKind::Share, 1);
        counts.add(EventKind::View, 2);
        assert_eq!(counts.view, 5);
        assert_eq!(counts.share, 1);
        assert_eq!(counts.export, 0);
    }
}
