//! vocab-seed library interface
//!
//! Vocabulary seeding pipeline: lease-guarded jobs that generate words,
//! translate them, link the translations and clean up afterwards. The
//! binary wraps this in an HTTP trigger API and a CLI.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use vocab_common::TableRegistry;

use crate::db::SeedLock;
use crate::models::JobRecord;
use crate::services::{Seeder, Validator, WordGenerator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Language pairs with a translation table
    pub registry: TableRegistry,
    /// Generation requests for jobs started by this server
    pub generator: WordGenerator,
    /// Bearer secret for trigger endpoints; `None` disables the check
    pub trigger_secret: Option<String>,
    /// Seed lease expiry; `None` means no expiry
    pub lease_ttl: Option<Duration>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Most recent seeding job started through the API
    pub last_job: Arc<RwLock<Option<JobRecord>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, registry: TableRegistry, generator: WordGenerator) -> Self {
        Self {
            db,
            registry,
            generator,
            trigger_secret: None,
            lease_ttl: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            last_job: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_trigger_secret(mut self, secret: Option<String>) -> Self {
        self.trigger_secret = secret;
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub fn seed_lock(&self) -> SeedLock {
        SeedLock::new(self.db.clone()).with_ttl(self.lease_ttl)
    }

    pub fn seeder(&self) -> Seeder {
        Seeder::new(self.db.clone(), self.registry.clone(), self.generator.clone())
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.db.clone(), self.generator.clone())
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::seed_routes())
        .merge(api::maintenance_routes())
        .merge(api::validate_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
