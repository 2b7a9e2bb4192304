//! Shared data models for the Vibes backend.
//!
//! This crate provides Serde-serializable types and pure functions for:
//! - Playlist URL normalization and dashboard fingerprints
//! - Analysis jobs and their status machine
//! - Per-video rows and the schema-versioned dataset blob
//! - Materialized playlist statistics
//! - Dashboard view/share/export events
//! - Metric enrichment (engagement, controversy, summary aggregates)

pub mod event;
pub mod format;
pub mod job;
pub mod metrics;
pub mod playlist_url;
pub mod stats;
pub mod video;

pub use event::{DashboardEvent, EventCounts, EventKind};
pub use format::{format_count, format_duration, format_percent};
pub use job::{Job, JobStatus};
pub use metrics::enrich;
pub use playlist_url::{fingerprint, normalize, InvalidUrl, NormalizedUrl};
pub use stats::{PlaylistMetadata, PlaylistStats, SummaryStats};
pub use video::{VideoData, VideoDataset, VideoRow, DATASET_SCHEMA_VERSION};
