//! Quiz processing endpoint
//!
//! Resolves the first song inline so the client can start playing
//! immediately, then hands the remaining songs to the queue for background
//! resolution.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use trackdate_common::model::{JobStatus, ProcessedSong, Song};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /process request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub first_song: Song,
    #[serde(default)]
    pub remaining_songs: Vec<Song>,
}

/// POST /process response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub processed_song: ProcessedSong,
    pub job_id: Uuid,
}

/// POST /process
///
/// Returns the resolved first song together with the job id the client
/// polls on `/stream`. Only a job-store failure produces a 500; a queue
/// publish failure degrades to `publish_failed` but still answers 200.
pub async fn process(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ProcessResponse>> {
    let request: ProcessRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;

    if request.first_song.artist.trim().is_empty() || request.first_song.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "firstSong must have an artist and a title".to_string(),
        ));
    }

    let processed_song = state.resolver.resolve(&request.first_song).await;

    let job_id = Uuid::new_v4();
    state.jobs.init_job(job_id, &processed_song.release_year).await?;

    tracing::info!(
        job_id = %job_id,
        first_year = %processed_song.release_year,
        remaining = request.remaining_songs.len(),
        "quiz job created"
    );

    if request.remaining_songs.is_empty() {
        state.jobs.set_status(job_id, JobStatus::Complete).await?;
    } else {
        let publish = state
            .queue
            .publish_job(
                &state.config.worker_url(),
                job_id,
                request.remaining_songs,
            )
            .await;

        if let Err(e) = publish {
            tracing::error!(job_id = %job_id, error = %e, "queue publish failed");
            // The first song is still good; report the degradation through
            // the job status and let the stream deliver it as `done`
            if let Err(store_err) = state.jobs.set_status(job_id, JobStatus::PublishFailed).await {
                tracing::error!(
                    job_id = %job_id,
                    error = %store_err,
                    "failed to record publish_failed status"
                );
            }
        }
    }

    Ok(Json(ProcessResponse {
        processed_song,
        job_id,
    }))
}

/// Build processing routes
pub fn process_routes() -> Router<AppState> {
    Router::new().route("/process", post(process))
}
