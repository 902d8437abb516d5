//! Maintenance API handlers
//!
//! POST /maintenance/dedup, POST /maintenance/orphans
//!
//! Both passes run under the seed lease so they never interleave with a
//! running job.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use vocab_common::Language;

use super::auth::Authorized;
use crate::error::ApiResult;
use crate::services::{dedup_language, remove_orphans};
use crate::AppState;

/// Maintenance request body
#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub language: Language,
}

/// Maintenance response body
#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub language: Language,
    pub removed: u64,
}

/// POST /maintenance/dedup
pub async fn dedup(
    _auth: Authorized,
    State(state): State<AppState>,
    Json(request): Json<MaintenanceRequest>,
) -> ApiResult<Json<MaintenanceResponse>> {
    let language = request.language;
    let db = state.db.clone();
    let registry = state.registry.clone();
    let removed = state
        .seed_lock()
        .run_exclusive(|_lease| async move { dedup_language(&db, &registry, language).await })
        .await??;

    Ok(Json(MaintenanceResponse {
        language,
        removed,
    }))
}

/// POST /maintenance/orphans
pub async fn orphans(
    _auth: Authorized,
    State(state): State<AppState>,
    Json(request): Json<MaintenanceRequest>,
) -> ApiResult<Json<MaintenanceResponse>> {
    let language = request.language;
    let db = state.db.clone();
    let registry = state.registry.clone();
    let removed = state
        .seed_lock()
        .run_exclusive(|_lease| async move { remove_orphans(&db, &registry, language).await })
        .await??;

    Ok(Json(MaintenanceResponse {
        language,
        removed,
    }))
}

/// Build maintenance routes
pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance/dedup", post(dedup))
        .route("/maintenance/orphans", post(orphans))
}
