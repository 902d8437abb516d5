//! Seeding trigger API handlers
//!
//! POST /seed, GET /seed/status, GET /seed/lock, POST /seed/lock/release

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vocab_common::time;

use super::auth::Authorized;
use crate::db::LeaseStatus;
use crate::error::{ApiError, ApiResult};
use crate::models::{GenerationJobOptions, JobRecord, JobState, SeedReport};
use crate::AppState;

/// POST /seed request
#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    #[serde(flatten)]
    pub options: GenerationJobOptions,

    /// Run the job inside the request and return its report
    #[serde(default)]
    pub wait: bool,
}

/// POST /seed response (background job)
#[derive(Debug, Serialize)]
pub struct SeedAccepted {
    pub job_id: Uuid,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
}

/// POST /seed response (`wait: true`)
#[derive(Debug, Serialize)]
pub struct SeedCompleted {
    pub job_id: Uuid,
    pub report: SeedReport,
}

/// POST /seed/lock/release response
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

/// POST /seed
///
/// Checks the lease, acquires it and starts the job. Returns 202 with the
/// lease owner as job id, or 200 with the report when `wait` is set. A held
/// lease is 409 and the generator is never called.
pub async fn start_seed(
    _auth: Authorized,
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> ApiResult<Response> {
    let options = request.options;
    options.validate()?;
    state
        .registry
        .translation_table(options.language, options.translation_language)?;

    let lock = state.seed_lock();
    if lock.is_locked().await? {
        let status = lock.status().await?;
        return Err(ApiError::Locked {
            owner: status.owner.unwrap_or_else(|| "unknown".to_string()),
        });
    }
    let lease = lock.acquire().await?;
    let job_id = lease.owner;

    *state.last_job.write().await = Some(JobRecord::running(job_id, options.clone(), lease.acquired_at));

    if request.wait {
        let seeder = state.seeder();
        let result = lock.scoped(lease, seeder.run(&options)).await;
        return match result {
            Ok(report) => {
                finish_job(&state, job_id, Ok(report.clone())).await;
                Ok(Json(SeedCompleted { job_id, report }).into_response())
            }
            Err(e) => {
                finish_job(&state, job_id, Err(e.to_string())).await;
                Err(e.into())
            }
        };
    }

    let started_at = lease.acquired_at;
    let task_state = state.clone();
    tokio::spawn(async move {
        tracing::info!(job_id = %job_id, "Background seeding task started");

        let seeder = task_state.seeder();
        let result = lock.scoped(lease, seeder.run(&options)).await;

        match result {
            Ok(report) => {
                tracing::info!(
                    job_id = %job_id,
                    total_generated = report.total_generated,
                    "Background seeding task completed successfully"
                );
                finish_job(&task_state, job_id, Ok(report)).await;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Background seeding task failed");
                finish_job(&task_state, job_id, Err(e.to_string())).await;
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SeedAccepted {
            job_id,
            state: JobState::Running,
            started_at,
        }),
    )
        .into_response())
}

async fn finish_job(state: &AppState, job_id: Uuid, result: Result<SeedReport, String>) {
    if let Err(message) = &result {
        state.record_error(message.clone()).await;
    }

    let mut last_job = state.last_job.write().await;
    if let Some(record) = last_job.as_mut().filter(|r| r.job_id == job_id) {
        match result {
            Ok(report) => record.succeed(report),
            Err(message) => record.fail(message, time::now()),
        }
    }
}

/// GET /seed/status
pub async fn seed_status(_auth: Authorized, State(state): State<AppState>) -> ApiResult<Json<JobRecord>> {
    state
        .last_job
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No seeding job has been started".to_string()))
}

/// GET /seed/lock
pub async fn lock_status(_auth: Authorized, State(state): State<AppState>) -> ApiResult<Json<LeaseStatus>> {
    Ok(Json(state.seed_lock().status().await?))
}

/// POST /seed/lock/release
///
/// Clears the lease regardless of owner, for leases left behind by a
/// crashed process.
pub async fn release_lock(_auth: Authorized, State(state): State<AppState>) -> ApiResult<Json<ReleaseResponse>> {
    let released = state.seed_lock().force_release().await?;
    Ok(Json(ReleaseResponse { released }))
}

/// Build seeding routes
pub fn seed_routes() -> Router<AppState> {
    Router::new()
        .route("/seed", post(start_seed))
        .route("/seed/status", get(seed_status))
        .route("/seed/lock", get(lock_status))
        .route("/seed/lock/release", post(release_lock))
}
