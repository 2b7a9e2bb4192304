//! Application state.

use std::sync::Arc;

use vibes_store::Store;
use vibes_youtube::{ApiBackend, BackendKind, ScraperBackend, YoutubeBackend};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    /// Backend used for lightweight previews only; full fetches belong to
    /// the worker.
    pub backend: Arc<dyn YoutubeBackend>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Store::from_env().await?;
        store.run_migrations().await?;

        let kind: BackendKind = std::env::var("VIBES_BACKEND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(BackendKind::Api);
        let backend: Arc<dyn YoutubeBackend> = match kind {
            BackendKind::Api => Arc::new(ApiBackend::from_env()?),
            BackendKind::Scraper => Arc::new(ScraperBackend::from_env()?),
        };

        Ok(Self {
            config,
            store,
            backend,
        })
    }
}
