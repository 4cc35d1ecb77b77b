//! Playlist sampling endpoint
//!
//! The front door: turns a playlist reference into the song set the client
//! then submits to `/process`.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use trackdate_common::model::Song;

use crate::error::{ApiError, ApiResult};
use crate::services::sampler::{extract_playlist_id, SamplerError};
use crate::AppState;

/// POST /playlist request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRequest {
    pub playlist_url: String,
    /// Override for the configured quiz size (capped by it)
    pub quiz_size: Option<usize>,
}

/// POST /playlist response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub first_song: Song,
    pub remaining_songs: Vec<Song>,
}

/// POST /playlist
pub async fn sample_playlist(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<PlaylistResponse>> {
    let request: PlaylistRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;

    let playlist_id = extract_playlist_id(&request.playlist_url)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let quiz_size = request
        .quiz_size
        .filter(|&size| size > 0)
        .map(|size| size.min(state.config.quiz_size))
        .unwrap_or(state.config.quiz_size);

    let mut songs = state
        .sampler
        .sample(&playlist_id, quiz_size)
        .await
        .map_err(|e| match e {
            SamplerError::InvalidReference(_) | SamplerError::EmptyPlaylist => {
                ApiError::BadRequest(e.to_string())
            }
            SamplerError::Streaming(inner) => ApiError::Internal(inner.to_string()),
        })?;

    let first_song = songs.remove(0);
    Ok(Json(PlaylistResponse {
        first_song,
        remaining_songs: songs,
    }))
}

/// Build playlist routes
pub fn playlist_routes() -> Router<AppState> {
    Router::new().route("/playlist", post(sample_playlist))
}
