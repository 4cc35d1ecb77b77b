//! Worker endpoint
//!
//! Consumes queued jobs delivered by the queue service. Deliveries must
//! carry a valid signature; anything else is rejected before the payload is
//! even parsed. Songs are processed strictly in order: the catalog's rate
//! budget leaves no room for intra-job parallelism.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use trackdate_common::auth::verify_payload;
use trackdate_common::model::{JobStatus, WorkerPayload};

use crate::error::{ApiError, ApiResult};
use crate::store::StoreError;
use crate::AppState;

/// Freshness window for queue deliveries
const MAX_SIGNATURE_AGE_MS: i64 = 300_000;

/// POST /worker
///
/// Runs one job to completion. A store failure mid-job is fatal: the status
/// is flipped to `worker_failed` best-effort and the queue sees a 500.
pub async fn worker(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    verify_payload(&body, &state.config.queue_token, MAX_SIGNATURE_AGE_MS)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let payload: WorkerPayload = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid worker payload: {e}")))?;

    let job_id = payload.job_id;
    tracing::info!(
        job_id = %job_id,
        songs = payload.songs_to_process.len(),
        "worker job started"
    );

    if let Err(e) = run_job(&state, &payload).await {
        tracing::error!(job_id = %job_id, error = %e, "worker job failed");
        if let Err(status_err) = state.jobs.set_status(job_id, JobStatus::WorkerFailed).await {
            tracing::error!(
                job_id = %job_id,
                error = %status_err,
                "failed to record worker_failed status"
            );
        }
        return Err(ApiError::Store(e));
    }

    tracing::info!(job_id = %job_id, "worker job complete");
    Ok(Json(json!({ "success": true })))
}

async fn run_job(state: &AppState, payload: &WorkerPayload) -> Result<(), StoreError> {
    state
        .jobs
        .set_status(payload.job_id, JobStatus::Processing)
        .await?;

    for song in &payload.songs_to_process {
        let processed = state.resolver.resolve(song).await;
        let appended = state.jobs.append_result(payload.job_id, &processed).await?;

        tracing::debug!(
            job_id = %payload.job_id,
            artist = %song.artist,
            title = %song.title,
            year = %processed.release_year,
            appended,
            "song processed"
        );
    }

    state
        .jobs
        .set_status(payload.job_id, JobStatus::Complete)
        .await
}

/// Build worker routes
pub fn worker_routes() -> Router<AppState> {
    Router::new().route("/worker", post(worker))
}
