//! Playlist sampling endpoint integration tests

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

use helpers::{
    accepting_queue_fixture, broken_catalog_fixture, spawn_server, streaming_fixture, test_config,
    test_state, track_json,
};
use trackdate_server::store::MemoryKv;
use trackdate_server::{build_router, AppState};

async fn playlist_state(tracks: Value) -> AppState {
    let catalog_url = spawn_server(broken_catalog_fixture()).await;
    let streaming_url = spawn_server(streaming_fixture(tracks)).await;
    let queue_url = spawn_server(accepting_queue_fixture()).await;
    test_state(
        test_config(&catalog_url, &streaming_url, &queue_url),
        Arc::new(MemoryKv::new()),
    )
}

fn playlist_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/playlist")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_sample_returns_first_and_remaining() {
    let tracks = json!([
        track_json("Led Zeppelin", "Stairway To Heaven", "1971-11-08"),
        track_json("Prince", "When Doves Cry", "1984-07-15"),
        track_json("Oasis", "Wonderwall", "1995-10-02"),
        track_json("Toto", "Africa", "1982-04-08"),
    ]);
    let state = playlist_state(tracks).await;
    let app = build_router(state);

    let body = json!({
        "playlistUrl": "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=x",
    });
    let response = app.oneshot(playlist_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    let remaining = json["remainingSongs"].as_array().unwrap();
    assert_eq!(remaining.len(), 3);

    // The sample is a permutation of the playlist: no duplicates, no inventions
    let mut titles: HashSet<String> = HashSet::new();
    titles.insert(json["firstSong"]["title"].as_str().unwrap().to_string());
    for entry in remaining {
        titles.insert(entry["title"].as_str().unwrap().to_string());
    }
    assert_eq!(titles.len(), 4);
    assert!(titles.contains("Wonderwall"));
}

#[tokio::test]
async fn test_sample_respects_quiz_size() {
    let tracks: Vec<Value> = (0..30)
        .map(|i| track_json(&format!("Artist {i}"), &format!("Song {i}"), "1999-01-01"))
        .collect();
    let state = playlist_state(json!(tracks)).await;
    let app = build_router(state);

    let body = json!({
        "playlistUrl": "37i9dQZF1DXcBWIGoYBM5M",
        "quizSize": 5,
    });
    let response = app.oneshot(playlist_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["remainingSongs"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_tracks_without_artist_or_title_are_skipped() {
    let tracks = json!([
        track_json("Led Zeppelin", "Stairway To Heaven", "1971-11-08"),
        { "name": "", "artists": [{ "name": "Nobody" }], "album": { "release_date": "2001" }, "external_urls": { "spotify": "u" } },
        { "name": "Orphan", "artists": [], "album": { "release_date": "2001" }, "external_urls": { "spotify": "u" } },
    ]);
    let state = playlist_state(tracks).await;
    let app = build_router(state);

    let body = json!({ "playlistUrl": "37i9dQZF1DXcBWIGoYBM5M" });
    let response = app.oneshot(playlist_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["firstSong"]["title"], "Stairway To Heaven");
    assert!(json["remainingSongs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_reference_is_rejected() {
    let state = playlist_state(json!([])).await;
    let app = build_router(state);

    let body = json!({ "playlistUrl": "https://open.spotify.com/album/xyz" });
    let response = app.oneshot(playlist_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_playlist_is_rejected() {
    let state = playlist_state(json!([])).await;
    let app = build_router(state);

    let body = json!({ "playlistUrl": "37i9dQZF1DXcBWIGoYBM5M" });
    let response = app.oneshot(playlist_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
