//! Playlist sampling
//!
//! Turns a playlist reference into a randomized candidate set of songs:
//! page through the playlist at the API's maximum page size, shuffle, and
//! keep enough for one quiz.

use rand::seq::SliceRandom;
use rand::thread_rng;
use std::sync::Arc;
use thiserror::Error;

use trackdate_common::model::Song;

use crate::services::streaming::{StreamingClient, StreamingError, PAGE_SIZE};

/// Sampler errors
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Invalid playlist reference: {0}")]
    InvalidReference(String),

    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error(transparent)]
    Streaming(#[from] StreamingError),
}

/// Extract the playlist id from a playlist URL or accept a bare id.
///
/// Accepts `https://open.spotify.com/playlist/<id>?si=...` or `<id>`.
pub fn extract_playlist_id(reference: &str) -> Result<String, SamplerError> {
    let reference = reference.trim();

    let candidate = match reference.find("playlist/") {
        Some(at) => {
            let tail = &reference[at + "playlist/".len()..];
            tail.split(['/', '?', '#']).next().unwrap_or("")
        }
        None if !reference.contains('/') && !reference.contains(':') => reference,
        None => "",
    };

    if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SamplerError::InvalidReference(reference.to_string()));
    }

    Ok(candidate.to_string())
}

/// Playlist sampler backed by the streaming client
pub struct Sampler {
    streaming: Arc<StreamingClient>,
}

impl Sampler {
    pub fn new(streaming: Arc<StreamingClient>) -> Self {
        Self { streaming }
    }

    /// Fetch the playlist's tracks and return a shuffled sample of at most
    /// `quiz_size` songs. Tracks with a missing artist or title are skipped.
    pub async fn sample(
        &self,
        playlist_id: &str,
        quiz_size: usize,
    ) -> Result<Vec<Song>, SamplerError> {
        let total = self.streaming.get_playlist_total(playlist_id).await?;
        if total == 0 {
            return Err(SamplerError::EmptyPlaylist);
        }

        let mut songs = Vec::with_capacity(total);
        let mut offset = 0;
        while offset < total {
            let tracks = self
                .streaming
                .get_playlist_tracks(playlist_id, offset)
                .await?;
            if tracks.is_empty() {
                break;
            }

            for track in &tracks {
                let artist = track
                    .artists
                    .first()
                    .map(|a| a.name.trim())
                    .unwrap_or_default();
                let title = track.name.trim();
                if artist.is_empty() || title.is_empty() {
                    continue;
                }

                songs.push(Song {
                    artist: artist.to_string(),
                    title: title.to_string(),
                    spotify_url: track.external_urls.spotify.clone(),
                    current_release_date: track.album.release_date.clone(),
                });
            }

            offset += PAGE_SIZE;
        }

        if songs.is_empty() {
            return Err(SamplerError::EmptyPlaylist);
        }

        songs.shuffle(&mut thread_rng());
        songs.truncate(quiz_size);

        tracing::info!(
            playlist_id,
            total,
            sampled = songs.len(),
            "playlist sampled"
        );

        Ok(songs)
    }
}
