//! Key/value store backends
//!
//! The deployment target is a Redis-compatible REST service: each command is
//! a JSON array POSTed to the endpoint, the response is `{"result": ...}`.
//! The in-memory backend implements the same contract for tests and local
//! runs, including the atomic `SADD` guard the job store relies on.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Key/value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store network error: {0}")]
    Network(String),

    #[error("Store API error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected store response: {0}")]
    Protocol(String),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Minimal command set the job store needs from a Redis-shaped backend
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;
    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError>;
    /// List contents from `from` to the end
    async fn lrange_from(&self, key: &str, from: usize) -> Result<Vec<String>, StoreError>;
    /// Returns true when the member was newly added
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn smembers(&self, key: &str) -> Result<HashSet<String>, StoreError>;
    async fn del(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// REST-backed store client
pub struct RestKv {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestKv {
    pub fn new(base_url: &str, token: &str) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Execute one command, returning the `result` field
    async fn command(&self, cmd: &[&str]) -> Result<Value, StoreError> {
        let response = self
            .http_client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        if !status.is_success() {
            let detail = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(StoreError::Api(status.as_u16(), detail));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| StoreError::Protocol("missing result field".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RestKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(StoreError::Protocol(format!("GET returned {other}"))),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let ttl = ttl_secs.to_string();
        self.command(&["SET", key, value, "EX", ttl.as_str()]).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let ttl = ttl_secs.to_string();
        self.command(&["EXPIRE", key, ttl.as_str()]).await?;
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.command(&["RPUSH", key, value])
            .await?
            .as_u64()
            .ok_or_else(|| StoreError::Protocol("RPUSH returned non-integer".to_string()))
    }

    async fn lrange_from(&self, key: &str, from: usize) -> Result<Vec<String>, StoreError> {
        let from = from.to_string();
        let result = self.command(&["LRANGE", key, from.as_str(), "-1"]).await?;
        match result {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(StoreError::Protocol(format!("LRANGE item {other}"))),
                })
                .collect(),
            other => Err(StoreError::Protocol(format!("LRANGE returned {other}"))),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let added = self
            .command(&["SADD", key, member])
            .await?
            .as_u64()
            .ok_or_else(|| StoreError::Protocol("SADD returned non-integer".to_string()))?;
        Ok(added == 1)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        match self.command(&["SMEMBERS", key]).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(StoreError::Protocol(format!("SMEMBERS item {other}"))),
                })
                .collect(),
            Value::Null => Ok(HashSet::new()),
            other => Err(StoreError::Protocol(format!("SMEMBERS returned {other}"))),
        }
    }

    async fn del(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut cmd = vec!["DEL"];
        cmd.extend_from_slice(keys);
        self.command(&cmd).await?;
        Ok(())
    }
}

enum MemoryValue {
    Str(String),
    List(Vec<String>),
    Set(HashSet<String>),
}

struct MemoryEntry {
    value: MemoryValue,
    expires_at: Option<Instant>,
}

/// In-memory store with the same semantics as the REST backend
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn live<'a>(
        entries: &'a mut HashMap<String, MemoryEntry>,
        key: &str,
    ) -> Option<&'a mut MemoryEntry> {
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.expires_at.is_some_and(|at| at <= Instant::now()));
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match Self::live(&mut entries, key).map(|e| &e.value) {
            Some(MemoryValue::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::Protocol(format!("{key} is not a string"))),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: MemoryValue::Str(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = Self::live(&mut entries, key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        match Self::live(&mut entries, key) {
            Some(MemoryEntry {
                value: MemoryValue::List(list),
                ..
            }) => {
                list.push(value.to_string());
                Ok(list.len() as u64)
            }
            Some(_) => Err(StoreError::Protocol(format!("{key} is not a list"))),
            None => {
                entries.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: MemoryValue::List(vec![value.to_string()]),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn lrange_from(&self, key: &str, from: usize) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match Self::live(&mut entries, key).map(|e| &e.value) {
            Some(MemoryValue::List(list)) => Ok(list.iter().skip(from).cloned().collect()),
            Some(_) => Err(StoreError::Protocol(format!("{key} is not a list"))),
            None => Ok(Vec::new()),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        match Self::live(&mut entries, key) {
            Some(MemoryEntry {
                value: MemoryValue::Set(set),
                ..
            }) => Ok(set.insert(member.to_string())),
            Some(_) => Err(StoreError::Protocol(format!("{key} is not a set"))),
            None => {
                let mut set = HashSet::new();
                set.insert(member.to_string());
                entries.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: MemoryValue::Set(set),
                        expires_at: None,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match Self::live(&mut entries, key).map(|e| &e.value) {
            Some(MemoryValue::Set(set)) => Ok(set.clone()),
            Some(_) => Err(StoreError::Protocol(format!("{key} is not a set"))),
            None => Ok(HashSet::new()),
        }
    }

    async fn del(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
