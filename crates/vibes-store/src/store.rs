//! Connection handling and configuration.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::StoreResult;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/vibes".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/vibes".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            acquire_timeout: Duration::from_secs(
                std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Shared handle over the Postgres pool.
///
/// Cheap to clone; all accessors take `&self`.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: PgPool,
}

impl Store {
    /// Connect to Postgres with the given configuration.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;
        info!("Connected to Postgres ({} max connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Connect using `DATABASE_URL` and friends.
    pub async fn from_env() -> StoreResult<Self> {
        Self::connect(&StoreConfig::from_env()).await
    }

    /// Wrap an existing pool (used by tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from the workspace `migrations/` directory.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
