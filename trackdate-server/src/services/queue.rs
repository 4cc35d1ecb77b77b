//! Queue service client
//!
//! Hands background jobs to an external queue service that later delivers
//! them to the worker endpoint. Publishing is durable: the queue retries
//! delivery on its own schedule, so a process restart here cannot lose an
//! accepted job. Payloads are signed so the worker can reject anything that
//! did not come through this path.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use trackdate_common::auth::sign_payload;
use trackdate_common::model::{Song, WorkerPayload};
use uuid::Uuid;

const USER_AGENT: &str = "trackdate/0.1.0 (+https://github.com/trackdate/trackdate)";

/// Queue client errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue network error: {0}")]
    Network(String),

    #[error("Queue publish failed {0}: {1}")]
    Publish(u16, String),

    #[error("Queue payload error: {0}")]
    Payload(String),
}

/// Queue service client
pub struct QueueClient {
    http_client: reqwest::Client,
    queue_url: String,
    token: String,
}

impl QueueClient {
    pub fn new(queue_url: &str, token: &str) -> Result<Self, QueueError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QueueError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            queue_url: queue_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Publish a worker job for delivery to `worker_url`.
    ///
    /// The payload is signed with the queue token; the worker endpoint
    /// verifies the same signature on delivery.
    pub async fn publish_job(
        &self,
        worker_url: &str,
        job_id: Uuid,
        songs: Vec<Song>,
    ) -> Result<(), QueueError> {
        let payload = WorkerPayload {
            job_id,
            songs_to_process: songs,
        };
        let mut body: Value =
            serde_json::to_value(&payload).map_err(|e| QueueError::Payload(e.to_string()))?;
        sign_payload(&mut body, &self.token).map_err(|e| QueueError::Payload(e.to_string()))?;

        let url = format!("{}/{}", self.queue_url, worker_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueueError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(QueueError::Publish(status.as_u16(), detail));
        }

        tracing::info!(
            job_id = %job_id,
            songs = payload.songs_to_process.len(),
            "worker job published"
        );
        Ok(())
    }
}
