//! Typed job store
//!
//! Owns the three per-job keys: `job:{id}:status` (plain enum string),
//! `job:{id}:results` (append-only list of serialized songs), and
//! `job:{id}:years` (set of committed release years). Every write refreshes
//! the shared TTL on all three keys.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use trackdate_common::model::{JobStatus, ProcessedSong};

use crate::store::kv::{KeyValueStore, StoreError};

/// Job keys expire one hour after the last write
pub const JOB_TTL_SECS: u64 = 3_600;

/// Typed wrapper over the key/value backend
#[derive(Clone)]
pub struct JobStore {
    kv: Arc<dyn KeyValueStore>,
}

impl JobStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn status_key(job_id: Uuid) -> String {
        format!("job:{job_id}:status")
    }

    fn results_key(job_id: Uuid) -> String {
        format!("job:{job_id}:results")
    }

    fn years_key(job_id: Uuid) -> String {
        format!("job:{job_id}:years")
    }

    /// Create a fresh job: status `queued`, empty results, the first song's
    /// year seeded into the year set
    pub async fn init_job(&self, job_id: Uuid, first_year: &str) -> Result<(), StoreError> {
        let status = Self::status_key(job_id);
        let results = Self::results_key(job_id);
        let years = Self::years_key(job_id);

        // Re-init must start clean
        self.kv
            .del(&[status.as_str(), results.as_str(), years.as_str()])
            .await?;

        self.kv
            .set_ex(&status, JobStatus::Queued.as_str(), JOB_TTL_SECS)
            .await?;
        self.kv.sadd(&years, first_year).await?;
        self.kv.expire(&years, JOB_TTL_SECS).await?;

        tracing::debug!(job_id = %job_id, first_year, "job initialized");
        Ok(())
    }

    /// Overwrite the status, refreshing the TTL on all three keys
    pub async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.kv
            .set_ex(&Self::status_key(job_id), status.as_str(), JOB_TTL_SECS)
            .await?;
        self.refresh_ttl(job_id).await?;

        tracing::debug!(job_id = %job_id, status = %status, "job status updated");
        Ok(())
    }

    /// Append a processed song unless its release year is already committed.
    ///
    /// The year set is the atomicity guard: only the appender that first adds
    /// the year gets to push onto the results list, so concurrent appenders
    /// on the same job cannot produce duplicate years.
    pub async fn append_result(
        &self,
        job_id: Uuid,
        processed: &ProcessedSong,
    ) -> Result<bool, StoreError> {
        let newly_added = self
            .kv
            .sadd(&Self::years_key(job_id), &processed.release_year)
            .await?;

        if newly_added {
            let serialized = serde_json::to_string(processed)?;
            self.kv
                .rpush(&Self::results_key(job_id), &serialized)
                .await?;
        } else {
            tracing::debug!(
                job_id = %job_id,
                year = %processed.release_year,
                "duplicate year dropped"
            );
        }

        self.refresh_ttl(job_id).await?;
        Ok(newly_added)
    }

    /// Read results from index `from` to the end, in insertion order
    pub async fn list_results(
        &self,
        job_id: Uuid,
        from: usize,
    ) -> Result<Vec<ProcessedSong>, StoreError> {
        let raw = self.kv.lrange_from(&Self::results_key(job_id), from).await?;
        raw.iter()
            .map(|entry| serde_json::from_str(entry).map_err(StoreError::from))
            .collect()
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<Option<JobStatus>, StoreError> {
        match self.kv.get(&Self::status_key(job_id)).await? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| StoreError::Protocol(format!("invalid status value: {raw}"))),
            None => Ok(None),
        }
    }

    /// Years already committed to this job's results (first song included)
    pub async fn years(&self, job_id: Uuid) -> Result<HashSet<String>, StoreError> {
        self.kv.smembers(&Self::years_key(job_id)).await
    }

    /// Drop all three keys
    pub async fn delete(&self, job_id: Uuid) -> Result<(), StoreError> {
        let status = Self::status_key(job_id);
        let results = Self::results_key(job_id);
        let years = Self::years_key(job_id);
        self.kv
            .del(&[status.as_str(), results.as_str(), years.as_str()])
            .await
    }

    async fn refresh_ttl(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.kv
            .expire(&Self::status_key(job_id), JOB_TTL_SECS)
            .await?;
        self.kv
            .expire(&Self::results_key(job_id), JOB_TTL_SECS)
            .await?;
        self.kv.expire(&Self::years_key(job_id), JOB_TTL_SECS).await
    }
}
