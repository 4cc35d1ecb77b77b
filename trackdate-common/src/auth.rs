//! Queue delivery signing
//!
//! The worker endpoint must only accept requests that originated from the
//! queue service. Every published payload carries a `timestamp` (Unix epoch
//! ms) and a `hash` (SHA-256 over the canonical JSON body plus the shared
//! queue secret); the worker recomputes the hash and checks the timestamp
//! freshness window before touching the payload.
//!
//! This module is pure: no HTTP framework types. The axum glue lives in the
//! server crate.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Dummy value substituted for the hash field during hashing
const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Tolerated clock drift into the future, in milliseconds
const MAX_FUTURE_MS: i64 = 1_000;

/// Signature validation errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing timestamp field")]
    MissingTimestamp,

    #[error("Missing hash field")]
    MissingHash,

    #[error("Timestamp {age_ms}ms too old (max {max_age_ms}ms)")]
    Stale { age_ms: i64, max_age_ms: i64 },

    #[error("Timestamp {0}ms in the future")]
    FutureTimestamp(i64),

    #[error("Hash mismatch")]
    Mismatch,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// Convert JSON to canonical form: object keys sorted, no whitespace
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            // Re-keying through a BTreeMap yields the sorted iteration order
            let sorted: BTreeMap<&str, &Value> =
                map.iter().map(|(key, value)| (key.as_str(), value)).collect();
            out.push('{');
            for (position, (key, value)) in sorted.into_iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(entries) => {
            out.push('[');
            for (position, entry) in entries.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_canonical(entry, out);
            }
            out.push(']');
        }
        Value::String(s) => write_escaped(s, out),
        // Numbers, booleans, and null already have one compact rendering
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

/// Hash of the canonical payload (hash field replaced by a dummy) plus the
/// shared secret, as 64 hex characters
pub fn calculate_hash(payload: &Value, secret: &str) -> String {
    let mut value = payload.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let mut hasher = Sha256::new();
    hasher.update(to_canonical_json(&value).as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Inject `timestamp` and `hash` fields into a payload before publishing
pub fn sign_payload(payload: &mut Value, secret: &str) -> Result<(), AuthError> {
    let obj = payload.as_object_mut().ok_or(AuthError::NotAnObject)?;
    obj.insert("timestamp".to_string(), Value::from(now_ms()));

    let hash = calculate_hash(payload, secret);
    payload
        .as_object_mut()
        .expect("object checked above")
        .insert("hash".to_string(), Value::String(hash));

    Ok(())
}

/// Validate a signed payload: timestamp within `max_age_ms` of now (with a
/// small future tolerance for clock drift), hash matching the recomputation
pub fn verify_payload(payload: &Value, secret: &str, max_age_ms: i64) -> Result<(), AuthError> {
    let obj = payload.as_object().ok_or(AuthError::NotAnObject)?;

    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_i64)
        .ok_or(AuthError::MissingTimestamp)?;
    let provided = obj
        .get("hash")
        .and_then(Value::as_str)
        .ok_or(AuthError::MissingHash)?;

    let age_ms = now_ms() - timestamp;
    if age_ms > max_age_ms {
        return Err(AuthError::Stale { age_ms, max_age_ms });
    }
    if age_ms < -MAX_FUTURE_MS {
        return Err(AuthError::FutureTimestamp(age_ms.abs()));
    }

    let calculated = calculate_hash(payload, secret);
    if provided != calculated {
        tracing::warn!(provided, calculated = %calculated, "queue signature mismatch");
        return Err(AuthError::Mismatch);
    }

    Ok(())
}
