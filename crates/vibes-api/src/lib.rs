//! Axum HTTP surface for the playlist analysis core.
//!
//! Routes: submit a playlist for analysis, preview a playlist before
//! submitting, poll job progress, and read a materialized dashboard by its
//! stable 16-char id. UI-facing fragments answer 200 with errors in-body;
//! explicit redirects use 303.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
