//! Streaming service client
//!
//! Client-credentials calls against the streaming service's playlist API.
//! The bearer token is cached and refreshed when absent or within the final
//! second of its lifetime.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const USER_AGENT: &str = "trackdate/0.1.0 (+https://github.com/trackdate/trackdate)";
/// The playlist tracks endpoint's maximum page size
pub const PAGE_SIZE: usize = 50;

/// Streaming client errors
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("Streaming network error: {0}")]
    Network(String),

    #[error("Streaming API error {0}: {1}")]
    Api(u16, String),

    #[error("Streaming parse error: {0}")]
    Parse(String),

    #[error("Token request failed: {0}")]
    Token(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TotalResponse {
    total: usize,
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    /// Null for removed or unavailable tracks
    track: Option<PlaylistTrack>,
}

/// One playlist track with the fields the sampler needs
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    pub album: TrackAlbum,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackAlbum {
    #[serde(default)]
    pub release_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Streaming service API client with token caching
pub struct StreamingClient {
    http_client: reqwest::Client,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl StreamingClient {
    pub fn new(
        api_url: &str,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, StreamingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StreamingError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Number of tracks in a playlist
    pub async fn get_playlist_total(&self, playlist_id: &str) -> Result<usize, StreamingError> {
        let url = format!("{}/playlists/{}/tracks", self.api_url, playlist_id);
        let response: TotalResponse = self
            .request(&url, &[("fields", "total"), ("limit", "1")])
            .await?;
        Ok(response.total)
    }

    /// One page of playlist tracks, at the API's maximum page size
    pub async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
    ) -> Result<Vec<PlaylistTrack>, StreamingError> {
        let url = format!("{}/playlists/{}/tracks", self.api_url, playlist_id);
        let offset = offset.to_string();
        let limit = PAGE_SIZE.to_string();

        let page: TracksPage = self
            .request(&url, &[
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
                (
                    "fields",
                    "items(track(name,artists(name),album(release_date),external_urls(spotify)))",
                ),
            ])
            .await?;

        Ok(page.items.into_iter().filter_map(|item| item.track).collect())
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StreamingError> {
        let token = self.bearer_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| StreamingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamingError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| StreamingError::Parse(e.to_string()))
    }

    /// Cached bearer token, refreshed when absent or about to expire
    async fn bearer_token(&self) -> Result<String, StreamingError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| StreamingError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamingError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StreamingError::Token(e.to_string()))?;

        tracing::debug!(expires_in = token.expires_in, "streaming token refreshed");

        // Treat the token as expired one second early so a request started
        // at the edge of the window cannot go out with a dead token
        let expires_at =
            Instant::now() + Duration::from_secs(token.expires_in.saturating_sub(1));
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });

        Ok(value)
    }
}
