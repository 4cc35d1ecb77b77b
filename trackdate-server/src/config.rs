//! Configuration resolution for trackdate-server
//!
//! All credentials and endpoints come from the environment, loaded once at
//! startup. A missing required variable is a startup error; endpoint URLs
//! are overridable so tests can point the service at local fixtures.

use trackdate_common::{Error, Result};

/// Default bind address for the HTTP server
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
/// Hosted queue endpoint used when QUEUE_URL is not set
const DEFAULT_QUEUE_URL: &str = "https://qstash.upstash.io/v2/publish";
const DEFAULT_CATALOG_API_URL: &str = "https://api.discogs.com";
const DEFAULT_CATALOG_SITE_URL: &str = "https://www.discogs.com";
const DEFAULT_STREAMING_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_STREAMING_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Songs per quiz, first song included
const DEFAULT_QUIZ_SIZE: usize = 10;
/// Upper bound on a single event-stream connection
const DEFAULT_STREAM_MAX_SECS: u64 = 60;

/// Runtime configuration, resolved from the environment at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth client credentials for the streaming service
    pub streaming_client_id: String,
    pub streaming_client_secret: String,
    /// Bearer token for the discography catalog
    pub catalog_api_token: String,
    /// Key/value store REST endpoint and credential
    pub kv_rest_api_url: String,
    pub kv_rest_api_token: String,
    /// Queue service credential; also the worker signature secret
    pub queue_token: String,

    pub bind_addr: String,
    /// Externally reachable base URL, used to build the worker callback
    pub public_base_url: String,
    pub queue_url: String,
    pub catalog_api_url: String,
    /// Human-facing catalog site, used for citation URLs
    pub catalog_site_url: String,
    pub streaming_api_url: String,
    pub streaming_token_url: String,
    pub quiz_size: usize,
    pub stream_max_secs: u64,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Required: `STREAMING_CLIENT_ID`, `STREAMING_CLIENT_SECRET`,
    /// `CATALOG_API_TOKEN`, `KV_REST_API_URL`, `KV_REST_API_TOKEN`,
    /// `QUEUE_TOKEN`. Everything else has a default.
    pub fn from_env() -> Result<Self> {
        let bind_addr = optional("BIND_ADDR", DEFAULT_BIND_ADDR);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_addr));

        Ok(Self {
            streaming_client_id: required("STREAMING_CLIENT_ID")?,
            streaming_client_secret: required("STREAMING_CLIENT_SECRET")?,
            catalog_api_token: required("CATALOG_API_TOKEN")?,
            kv_rest_api_url: required("KV_REST_API_URL")?,
            kv_rest_api_token: required("KV_REST_API_TOKEN")?,
            queue_token: required("QUEUE_TOKEN")?,
            bind_addr,
            public_base_url,
            queue_url: optional("QUEUE_URL", DEFAULT_QUEUE_URL),
            catalog_api_url: optional("CATALOG_API_URL", DEFAULT_CATALOG_API_URL),
            catalog_site_url: optional("CATALOG_SITE_URL", DEFAULT_CATALOG_SITE_URL),
            streaming_api_url: optional("STREAMING_API_URL", DEFAULT_STREAMING_API_URL),
            streaming_token_url: optional("STREAMING_TOKEN_URL", DEFAULT_STREAMING_TOKEN_URL),
            quiz_size: parse_optional("QUIZ_SIZE", DEFAULT_QUIZ_SIZE)?,
            stream_max_secs: parse_optional("STREAM_MAX_SECS", DEFAULT_STREAM_MAX_SECS)?,
        })
    }

    /// Worker callback URL the queue service delivers jobs to
    pub fn worker_url(&self) -> String {
        format!("{}/worker", self.public_base_url.trim_end_matches('/'))
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} must be set"))),
    }
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_optional<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid number: {value}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const REQUIRED: [&str; 6] = [
        "STREAMING_CLIENT_ID",
        "STREAMING_CLIENT_SECRET",
        "CATALOG_API_TOKEN",
        "KV_REST_API_URL",
        "KV_REST_API_TOKEN",
        "QUEUE_TOKEN",
    ];

    const OPTIONAL: [&str; 9] = [
        "BIND_ADDR",
        "PUBLIC_BASE_URL",
        "QUEUE_URL",
        "CATALOG_API_URL",
        "CATALOG_SITE_URL",
        "STREAMING_API_URL",
        "STREAMING_TOKEN_URL",
        "QUIZ_SIZE",
        "STREAM_MAX_SECS",
    ];

    fn set_required() {
        for name in REQUIRED {
            std::env::set_var(name, "test-value");
        }
        for name in OPTIONAL {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_all_required_present() {
        set_required();
        let config = Config::from_env().unwrap();
        assert_eq!(config.catalog_api_token, "test-value");
        assert_eq!(config.quiz_size, 10);
        assert_eq!(config.stream_max_secs, 60);
        assert_eq!(config.worker_url(), "http://127.0.0.1:5780/worker");
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_startup_error() {
        set_required();
        std::env::remove_var("CATALOG_API_TOKEN");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CATALOG_API_TOKEN"));
    }

    #[test]
    #[serial]
    fn test_public_base_url_overrides_worker_callback() {
        set_required();
        std::env::set_var("PUBLIC_BASE_URL", "https://quiz.example.com/");
        let config = Config::from_env().unwrap();
        assert_eq!(config.worker_url(), "https://quiz.example.com/worker");
    }

    #[test]
    #[serial]
    fn test_invalid_quiz_size_rejected() {
        set_required();
        std::env::set_var("QUIZ_SIZE", "lots");
        assert!(Config::from_env().is_err());
    }
}
