//! Domain model for the release-year quiz pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel for an unknown year, month, or day component
pub const NOT_AVAILABLE: &str = "N/A";

/// A track before resolution, as sampled from a streaming-service playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Primary artist name
    pub artist: String,
    /// Track title
    pub title: String,
    /// Link back to the track on the streaming service
    pub spotify_url: String,
    /// Album release date as reported by the streaming service
    /// (`YYYY`, `YYYY-MM`, or `YYYY-MM-DD`; may be empty)
    pub current_release_date: String,
}

/// Which data source supplied the resolved year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Discography catalog (master/main-release lookup)
    Catalog,
    /// The streaming service's own album metadata
    Streaming,
}

/// A song augmented with its resolved original release date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSong {
    pub artist: String,
    pub title: String,
    pub spotify_url: String,
    pub current_release_date: String,
    /// Four-digit year string, or `"N/A"`
    pub release_year: String,
    /// English month name, or `"N/A"`
    pub release_month: String,
    /// Numeric day string, or `"N/A"`
    pub release_day: String,
    pub source: Source,
    /// Citation URL for the resolved date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Present only when resolution raised a caught error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Background job status, stored as a plain string in the job store via
/// `as_str`/`FromStr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    PublishFailed,
    WorkerFailed,
}

impl JobStatus {
    /// Terminal states end the event stream once all results are drained
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::PublishFailed | JobStatus::WorkerFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::PublishFailed => "publish_failed",
            JobStatus::WorkerFailed => "worker_failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "complete" => Ok(JobStatus::Complete),
            "publish_failed" => Ok(JobStatus::PublishFailed),
            "worker_failed" => Ok(JobStatus::WorkerFailed),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// Payload handed to the worker endpoint through the queue service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPayload {
    pub job_id: Uuid,
    pub songs_to_process: Vec<Song>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Complete,
            JobStatus::PublishFailed,
            JobStatus::WorkerFailed,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::PublishFailed.is_terminal());
        assert!(JobStatus::WorkerFailed.is_terminal());
    }

    #[test]
    fn test_song_wire_format_is_camel_case() {
        let song = Song {
            artist: "Blues Traveler".to_string(),
            title: "Hook".to_string(),
            spotify_url: "https://open.spotify.com/track/abc".to_string(),
            current_release_date: "1995-05-01".to_string(),
        };

        let json = serde_json::to_value(&song).unwrap();
        assert!(json.get("spotifyUrl").is_some());
        assert!(json.get("currentReleaseDate").is_some());
        assert!(json.get("spotify_url").is_none());
    }

    #[test]
    fn test_processed_song_omits_absent_error() {
        let processed = ProcessedSong {
            artist: "a".to_string(),
            title: "t".to_string(),
            spotify_url: "u".to_string(),
            current_release_date: "1999".to_string(),
            release_year: "1999".to_string(),
            release_month: NOT_AVAILABLE.to_string(),
            release_day: NOT_AVAILABLE.to_string(),
            source: Source::Streaming,
            source_url: Some("u".to_string()),
            error: None,
        };

        let json = serde_json::to_string(&processed).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"source\":\"streaming\""));
    }
}
