//! Discography catalog client
//!
//! Rate-limited lookups against the catalog's search, master, and release
//! endpoints. The catalog allows roughly one request per second per token;
//! a single process-wide gate serializes every outbound call, including
//! retries, so concurrent jobs in the same process share the budget.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const USER_AGENT: &str = "trackdate/0.1.0 (+https://github.com/trackdate/trackdate)";
/// Minimum spacing between outbound catalog requests
const RATE_LIMIT_MS: u64 = 1_000;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog network error: {0}")]
    Network(String),

    #[error("Catalog API error {0}: {1}")]
    Api(u16, String),

    #[error("Catalog parse error: {0}")]
    Parse(String),
}

/// One search result; `title` is formatted `"Artist - Title"`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    pub id: u64,
    pub title: String,
    /// Year as reported by the search index (string, possibly absent)
    pub year: Option<String>,
    pub format: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchEntry>,
}

/// A master: the abstract work grouping all its pressings
#[derive(Debug, Clone, Deserialize)]
pub struct Master {
    pub id: u64,
    pub title: Option<String>,
    pub year: Option<i32>,
    /// The canonical pressing carrying the most reliable date
    pub main_release: Option<u64>,
}

/// One specific pressing of a master
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub title: Option<String>,
    /// ISO date, possibly partial (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`)
    pub released: Option<String>,
    pub formats: Option<Vec<ReleaseFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFormat {
    pub name: Option<String>,
    pub descriptions: Option<Vec<String>>,
}

/// Serializing gate spacing outbound requests at least `min_interval` apart
struct RateGate {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateGate {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait until the interval since the previous request has elapsed.
    ///
    /// The slot is claimed while the mutex is held, so callers queue up
    /// rather than racing through together.
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("catalog rate gate: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Discography catalog API client
pub struct CatalogClient {
    http_client: reqwest::Client,
    rate_gate: Arc<RateGate>,
    base_url: String,
    token: String,
}

impl CatalogClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, CatalogError> {
        Self::with_rate_limit(base_url, token, RATE_LIMIT_MS)
    }

    /// Custom request spacing, for tests that exercise the client without
    /// paying the full one-second interval
    pub fn with_rate_limit(
        base_url: &str,
        token: &str,
        rate_limit_ms: u64,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_gate: Arc::new(RateGate::new(rate_limit_ms)),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Search masters, sorted ascending by year
    pub async fn search(
        &self,
        query: &str,
        per_page: u32,
    ) -> Result<Vec<SearchEntry>, CatalogError> {
        let url = format!("{}/database/search", self.base_url);
        let per_page = per_page.to_string();

        let response: SearchResponse = self
            .request(&url, &[
                ("q", query),
                ("type", "master"),
                ("per_page", per_page.as_str()),
                ("sort", "year"),
                ("sort_order", "asc"),
            ])
            .await?;

        tracing::debug!(query, results = response.results.len(), "catalog search");
        Ok(response.results)
    }

    pub async fn get_master(&self, id: u64) -> Result<Master, CatalogError> {
        let url = format!("{}/masters/{}", self.base_url, id);
        self.request(&url, &[]).await
    }

    pub async fn get_release(&self, id: u64) -> Result<Release, CatalogError> {
        let url = format!("{}/releases/{}", self.base_url, id);
        self.request(&url, &[]).await
    }

    /// One rate-gated, authorized GET; non-2xx fails without retry
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        self.rate_gate.wait().await;

        let response = self
            .http_client
            .get(url)
            .header("Authorization", format!("Discogs token={}", self.token))
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}
