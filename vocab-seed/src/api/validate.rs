//! Validator API handler
//!
//! POST /validate runs a correction pass inside the request, under the
//! seed lease.

use axum::{extract::State, routing::post, Json, Router};

use super::auth::Authorized;
use crate::error::ApiResult;
use crate::models::{ValidationOptions, ValidationReport};
use crate::AppState;

/// POST /validate
pub async fn validate(
    _auth: Authorized,
    State(state): State<AppState>,
    Json(options): Json<ValidationOptions>,
) -> ApiResult<Json<ValidationReport>> {
    options.validate()?;

    let validator = state.validator();
    let report = state
        .seed_lock()
        .run_exclusive(|_lease| async move { validator.run(&options).await })
        .await??;

    Ok(Json(report))
}

/// Build validator routes
pub fn validate_routes() -> Router<AppState> {
    Router::new().route("/validate", post(validate))
}
