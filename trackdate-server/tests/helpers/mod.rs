//! Shared fixtures for integration tests
//!
//! Local axum servers stand in for the catalog, streaming, and queue APIs;
//! state is built over the in-memory store with a fast rate gate so suites
//! run in seconds.

#![allow(dead_code)]

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use trackdate_common::model::Song;
use trackdate_server::services::{CatalogClient, QueueClient, Resolver, Sampler, StreamingClient};
use trackdate_server::store::{JobStore, KeyValueStore, MemoryKv, StoreError};
use trackdate_server::{AppState, Config};

/// Shared secret between the queue fixture and the worker endpoint
pub const QUEUE_TOKEN: &str = "test-queue-token";

/// Rate-gate spacing for tests; the contract is exercised separately
pub const TEST_RATE_LIMIT_MS: u64 = 10;

/// Serve a router on an ephemeral port, returning its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Catalog fixture serving canned search/master/release bodies
pub fn catalog_fixture(search_results: Value, master: Value, release: Value) -> Router {
    let search_body = json!({ "results": search_results });
    Router::new()
        .route(
            "/database/search",
            get(move || {
                let body = search_body.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/masters/:id",
            get(move |_path: axum::extract::Path<u64>| {
                let body = master.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/releases/:id",
            get(move |_path: axum::extract::Path<u64>| {
                let body = release.clone();
                async move { Json(body) }
            }),
        )
}

/// Catalog fixture answering 500 to everything
pub fn broken_catalog_fixture() -> Router {
    let down = || async { (StatusCode::INTERNAL_SERVER_ERROR, "catalog down") };
    Router::new()
        .route("/database/search", get(down))
        .route("/masters/:id", get(down))
        .route("/releases/:id", get(down))
}

/// Query parameters the streaming client sends to the tracks endpoint
#[derive(Debug, serde::Deserialize)]
pub struct TracksQuery {
    pub fields: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Streaming fixture: token endpoint plus a playlist of the given tracks
pub fn streaming_fixture(tracks: Value) -> Router {
    let total = tracks.as_array().map(|t| t.len()).unwrap_or(0);
    Router::new()
        .route(
            "/token",
            post(|| async {
                Json(json!({
                    "access_token": "test-access-token",
                    "token_type": "Bearer",
                    "expires_in": 3600,
                }))
            }),
        )
        .route(
            "/playlists/:id/tracks",
            get(
                move |axum::extract::Query(params): axum::extract::Query<TracksQuery>| {
                    let tracks = tracks.clone();
                    async move {
                        if params.fields.as_deref() == Some("total") {
                            return Json(json!({ "total": total }));
                        }
                        let offset = params.offset.unwrap_or(0);
                        let limit = params.limit.unwrap_or(50);
                        let items: Vec<Value> = tracks
                            .as_array()
                            .unwrap()
                            .iter()
                            .skip(offset)
                            .take(limit)
                            .map(|track| json!({ "track": track }))
                            .collect();
                        Json(json!({ "items": items }))
                    }
                },
            ),
        )
}

/// One streaming-API track object
pub fn track_json(artist: &str, title: &str, release_date: &str) -> Value {
    json!({
        "name": title,
        "artists": [{ "name": artist }],
        "album": { "release_date": release_date },
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{title}") },
    })
}

/// Configuration pointing every client at the given fixture URLs
pub fn test_config(catalog_url: &str, streaming_url: &str, queue_url: &str) -> Config {
    Config {
        streaming_client_id: "client-id".to_string(),
        streaming_client_secret: "client-secret".to_string(),
        catalog_api_token: "catalog-token".to_string(),
        kv_rest_api_url: "http://127.0.0.1:1/unused".to_string(),
        kv_rest_api_token: "kv-token".to_string(),
        queue_token: QUEUE_TOKEN.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        public_base_url: "http://127.0.0.1:5780".to_string(),
        queue_url: queue_url.to_string(),
        catalog_api_url: catalog_url.to_string(),
        catalog_site_url: "https://catalog.test".to_string(),
        streaming_api_url: streaming_url.to_string(),
        streaming_token_url: format!("{streaming_url}/token"),
        quiz_size: 10,
        stream_max_secs: 5,
    }
}

/// Application state over an in-memory store and a fast rate gate
pub fn test_state(config: Config, kv: Arc<dyn KeyValueStore>) -> AppState {
    let catalog = Arc::new(
        CatalogClient::with_rate_limit(
            &config.catalog_api_url,
            &config.catalog_api_token,
            TEST_RATE_LIMIT_MS,
        )
        .unwrap(),
    );
    let streaming = Arc::new(
        StreamingClient::new(
            &config.streaming_api_url,
            &config.streaming_token_url,
            &config.streaming_client_id,
            &config.streaming_client_secret,
        )
        .unwrap(),
    );
    let queue = Arc::new(QueueClient::new(&config.queue_url, &config.queue_token).unwrap());
    let site_url = config.catalog_site_url.clone();

    AppState {
        jobs: JobStore::new(kv),
        resolver: Arc::new(Resolver::new(catalog, &site_url)),
        sampler: Arc::new(Sampler::new(streaming)),
        queue,
        config: Arc::new(config),
        startup_time: Utc::now(),
    }
}

/// State wired to fixture servers in their default happy configuration
pub async fn default_state() -> AppState {
    let catalog_url = spawn_server(catalog_fixture(
        hook_search_results(),
        hook_master(),
        hook_release(),
    ))
    .await;
    let streaming_url = spawn_server(streaming_fixture(json!([]))).await;
    let queue_url = spawn_server(accepting_queue_fixture()).await;

    test_state(
        test_config(&catalog_url, &streaming_url, &queue_url),
        Arc::new(MemoryKv::new()),
    )
}

/// Queue fixture that accepts any publish
pub fn accepting_queue_fixture() -> Router {
    Router::new().route("/*path", post(|| async { Json(json!({"messageId": "m1"})) }))
}

/// Queue fixture that rejects every publish
pub fn failing_queue_fixture() -> Router {
    Router::new().route(
        "/*path",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "queue down") }),
    )
}

/// Canned catalog data for Blues Traveler's "Hook": the ascending-year
/// search puts the original 1994 single ahead of the reissue
pub fn hook_search_results() -> Value {
    json!([
        {
            "id": 56990,
            "title": "Blues Traveler - Hook",
            "year": "1994",
            "format": ["CD", "Single"],
        },
        {
            "id": 88231,
            "title": "Blues Traveler - Hook",
            "year": "2015",
            "format": ["Vinyl", "Reissue"],
        },
    ])
}

pub fn hook_master() -> Value {
    json!({
        "id": 56990,
        "title": "Hook",
        "year": 1994,
        "main_release": 741553,
    })
}

pub fn hook_release() -> Value {
    json!({
        "id": 741553,
        "title": "Hook",
        "released": "1994-09-13",
        "formats": [{ "name": "CD", "descriptions": ["Single"] }],
    })
}

pub fn song(artist: &str, title: &str, current_release_date: &str) -> Song {
    Song {
        artist: artist.to_string(),
        title: title.to_string(),
        spotify_url: format!("https://open.spotify.com/track/{title}"),
        current_release_date: current_release_date.to_string(),
    }
}

/// Store backend that refuses every operation
pub struct FailingKv;

#[async_trait::async_trait]
impl KeyValueStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(unreachable_store())
    }
    async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), StoreError> {
        Err(unreachable_store())
    }
    async fn expire(&self, _key: &str, _ttl: u64) -> Result<(), StoreError> {
        Err(unreachable_store())
    }
    async fn rpush(&self, _key: &str, _value: &str) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }
    async fn lrange_from(&self, _key: &str, _from: usize) -> Result<Vec<String>, StoreError> {
        Err(unreachable_store())
    }
    async fn sadd(&self, _key: &str, _member: &str) -> Result<bool, StoreError> {
        Err(unreachable_store())
    }
    async fn smembers(
        &self,
        _key: &str,
    ) -> Result<std::collections::HashSet<String>, StoreError> {
        Err(unreachable_store())
    }
    async fn del(&self, _keys: &[&str]) -> Result<(), StoreError> {
        Err(unreachable_store())
    }
}

/// Store backend that works until the list append, then fails
pub struct AppendFailingKv(pub MemoryKv);

#[async_trait::async_trait]
impl KeyValueStore for AppendFailingKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.get(key).await
    }
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), StoreError> {
        self.0.set_ex(key, value, ttl).await
    }
    async fn expire(&self, key: &str, ttl: u64) -> Result<(), StoreError> {
        self.0.expire(key, ttl).await
    }
    async fn rpush(&self, _key: &str, _value: &str) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }
    async fn lrange_from(&self, key: &str, from: usize) -> Result<Vec<String>, StoreError> {
        self.0.lrange_from(key, from).await
    }
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.0.sadd(key, member).await
    }
    async fn smembers(
        &self,
        key: &str,
    ) -> Result<std::collections::HashSet<String>, StoreError> {
        self.0.smembers(key).await
    }
    async fn del(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.0.del(keys).await
    }
}

fn unreachable_store() -> StoreError {
    StoreError::Network("kv unreachable".to_string())
}

/// Parse an SSE body into `(event, data)` pairs, skipping comments
pub fn parse_sse(body: &str) -> Vec<(String, String)> {
    let mut events = Vec::new();
    for block in body.split("\n\n") {
        let mut event = None;
        let mut data = None;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event: ") {
                event = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("data: ") {
                data = Some(rest.to_string());
            }
        }
        if let (Some(event), Some(data)) = (event, data) {
            events.push((event, data));
        }
    }
    events
}
