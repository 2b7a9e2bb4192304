//! Postgres persistence for the Vibes backend.
//!
//! Typed accessors over three tables:
//! - `playlist_jobs` — the job queue; the atomic lease in [`Store::lease_next_pending`]
//!   is the only coordination primitive between workers
//! - `playlist_stats` — materialized analysis results, unique per
//!   `(playlist_url, processed_date)`
//! - `dashboard_events` — append-only view/share/export events

mod error;
mod events;
mod jobs;
mod stats;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{Store, StoreConfig};
