//! trackdate-server library interface
//!
//! Builds a music-release-year quiz from a streaming-service playlist: the
//! playlist is sampled into a candidate set, the first song is resolved
//! inline, the rest are queued for a background worker, and resolved songs
//! stream to the client over server-sent events.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use crate::config::Config;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use trackdate_common::{Error, Result};

use crate::services::{CatalogClient, QueueClient, Resolver, Sampler, StreamingClient};
use crate::store::{JobStore, KeyValueStore, RestKv};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jobs: JobStore,
    pub resolver: Arc<Resolver>,
    pub sampler: Arc<Sampler>,
    pub queue: Arc<QueueClient>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire up all clients from configuration over the given store backend.
    ///
    /// The catalog client (and with it the process-wide rate gate) is
    /// created exactly once here and shared by every handler.
    pub fn new(config: Arc<Config>, kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let catalog = Arc::new(
            CatalogClient::new(&config.catalog_api_url, &config.catalog_api_token)
                .map_err(|e| Error::Internal(e.to_string()))?,
        );
        let streaming = Arc::new(
            StreamingClient::new(
                &config.streaming_api_url,
                &config.streaming_token_url,
                &config.streaming_client_id,
                &config.streaming_client_secret,
            )
            .map_err(|e| Error::Internal(e.to_string()))?,
        );
        let queue = Arc::new(
            QueueClient::new(&config.queue_url, &config.queue_token)
                .map_err(|e| Error::Internal(e.to_string()))?,
        );

        Ok(Self {
            jobs: JobStore::new(kv),
            resolver: Arc::new(Resolver::new(catalog, &config.catalog_site_url)),
            sampler: Arc::new(Sampler::new(streaming)),
            queue,
            config,
            startup_time: Utc::now(),
        })
    }

    /// State over the configured REST key/value backend
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let kv = RestKv::new(&config.kv_rest_api_url, &config.kv_rest_api_token)
            .map_err(|e| Error::Internal(e.to_string()))?;
        Self::new(config, Arc::new(kv))
    }
}

/// Build application router
///
/// - POST /playlist - sample a playlist into a quiz song set
/// - POST /process - resolve the first song, enqueue the rest
/// - POST /worker - queue-delivered background job (signed)
/// - GET /stream - server-sent events for resolved songs
/// - GET /health - health check
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::playlist_routes())
        .merge(api::process_routes())
        .merge(api::worker_routes())
        .merge(api::stream_routes())
        .merge(api::health_routes())
        .with_state(state)
}
