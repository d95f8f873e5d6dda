//! Shared application state
//!
//! Built once during startup and cloned into every handler. All shared
//! resources are constructed eagerly and passed in explicitly; there is no
//! lazily-initialized global state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::Config, middleware::RateLimiter, repository::ItemRepository};

/// Application state injected into handlers and middleware
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Shared PostgreSQL connection pool
    pub db: PgPool,
    /// Configured rate limiter (token bucket or Redis fixed window)
    pub limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Create state from startup-built resources
    pub fn new(config: Config, db: PgPool, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            limiter,
        }
    }

    /// Item repository over the shared pool
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.db.clone())
    }
}
