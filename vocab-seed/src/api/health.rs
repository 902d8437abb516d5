//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok" or "degraded")
    pub status: String,
    /// Module name ("vocab-seed")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether a seeding job currently holds the lease
    pub seeding: bool,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
///
/// Unauthenticated. Reports "degraded" when the database cannot be read.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let (status, seeding) = match state.seed_lock().is_locked().await {
        Ok(locked) => ("ok", locked),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read lease");
            ("degraded", false)
        }
    };

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: status.to_string(),
        module: "vocab-seed".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        seeding,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
