//! HTTP API for the showcase site: page content, themes, testimonials, blog,
//! newsletter signups, page-view counters and region resolution.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

use showcase_core::store::PgStore;
use showcase_core::Store;

use crate::config::AppConfig;

/// Open the store the configuration asks for: PostgreSQL with migrations
/// applied when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Store> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections, config.db_min_connections)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            tracing::info!("Connected to PostgreSQL");

            store
                .migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            tracing::info!("Database migrations applied");

            Ok(Store::Postgres(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; content will not persist");
            Ok(Store::memory())
        }
    }
}
