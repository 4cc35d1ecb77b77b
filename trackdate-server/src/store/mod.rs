//! Job state persistence
//!
//! A thin key/value abstraction (REST-backed in deployment, in-memory for
//! tests and local runs) and the typed job store that owns the per-job keys.

pub mod jobs;
pub mod kv;

pub use jobs::{JobStore, JOB_TTL_SECS};
pub use kv::{KeyValueStore, MemoryKv, RestKv, StoreError};
