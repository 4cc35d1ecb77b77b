//! Job event stream
//!
//! Long-lived `text/event-stream` response that polls the job store once a
//! second and forwards new results as `song` events. When the job reaches a
//! terminal status and every result has been delivered, a final `done`
//! event closes the stream. The stream is a read-only observer: job keys
//! are left to their TTL so a reconnecting client can replay from the top.

use axum::{
    extract::{Query, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::store::JobStore;
use crate::AppState;

/// Poll interval against the job store
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// GET /stream query parameters
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
}

/// GET /stream?jobId=…
///
/// Events:
/// - `song` — one resolved song as compact JSON, in insertion order
/// - `done` — terminal status string; always the last event when the job
///   finishes within the connection's lifetime
/// - `error` — `{"message": …}` on store failure or an unknown job
///
/// The connection is bounded by `stream_max_secs`; past the deadline it
/// closes without `done` and the client reconnects.
pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let job_id = params.job_id;
    let jobs = state.jobs.clone();
    let max_lifetime = Duration::from_secs(state.config.stream_max_secs);

    tracing::info!(job_id = %job_id, "event stream opened");

    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(job_events(jobs, job_id, max_lifetime)).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("heartbeat"),
        ),
    )
}

/// Poll the job store and yield `song`, `done`, and `error` events until
/// the job terminates or the lifetime budget runs out
fn job_events(
    jobs: JobStore,
    job_id: Uuid,
    max_lifetime: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let started = Instant::now();
        let mut last_index: usize = 0;

        loop {
            match jobs.list_results(job_id, last_index).await {
                Ok(new_results) => {
                    for processed in new_results {
                        match serde_json::to_string(&processed) {
                            Ok(data) => {
                                last_index += 1;
                                yield Ok::<_, Infallible>(
                                    Event::default().event("song").data(data),
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    job_id = %job_id,
                                    error = %e,
                                    "failed to serialize result"
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Ok(error_event(&e.to_string()));
                    break;
                }
            }

            match jobs.get_status(job_id).await {
                Ok(Some(status)) if status.is_terminal() => {
                    // The worker may have appended its last result between
                    // the reads above; drain once more so `done` is last
                    match jobs.list_results(job_id, last_index).await {
                        Ok(tail) => {
                            for processed in tail {
                                if let Ok(data) = serde_json::to_string(&processed) {
                                    last_index += 1;
                                    yield Ok(Event::default().event("song").data(data));
                                }
                            }
                            tracing::info!(
                                job_id = %job_id,
                                status = %status,
                                songs = last_index,
                                "event stream finished"
                            );
                            yield Ok(Event::default().event("done").data(status.as_str()));
                        }
                        Err(e) => {
                            yield Ok(error_event(&e.to_string()));
                        }
                    }
                    break;
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    // Never-created or TTL-expired job: nothing will ever
                    // arrive, tell the client instead of idling
                    yield Ok(error_event("job not found"));
                    break;
                }
                Err(e) => {
                    yield Ok(error_event(&e.to_string()));
                    break;
                }
            }

            if started.elapsed() + POLL_INTERVAL > max_lifetime {
                tracing::debug!(job_id = %job_id, "event stream deadline reached");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "message": message }).to_string())
}

/// Build stream routes
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/stream", get(stream))
}
