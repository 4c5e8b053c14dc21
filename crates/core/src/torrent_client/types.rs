//! Types for torrent client operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Operation interrupted by shutdown")]
    Interrupted,
}

/// Announce state of a single tracker entry, as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    /// Entry is not a real tracker (DHT, PeX, LSD).
    Disabled,
    /// Tracker has not been contacted yet.
    NotContacted,
    /// Tracker has been contacted and is working.
    Ok,
    /// Announce is in flight.
    Updating,
    /// Tracker was contacted but is not working.
    NotWorking,
}

impl TrackerStatus {
    /// Returns the name used in diagnostic report lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Disabled => "Disabled",
            TrackerStatus::NotContacted => "NotContacted",
            TrackerStatus::Ok => "OK",
            TrackerStatus::Updating => "Updating",
            TrackerStatus::NotWorking => "NotWorking",
        }
    }
}

/// One tracker row known to the daemon for a torrent.
///
/// Refetched on every poll iteration; never cached across iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerRecord {
    /// Announce URL.
    pub url: String,
    /// Announce state.
    pub status: TrackerStatus,
    /// Free-text diagnostic from the tracker or daemon.
    pub message: String,
    /// Seeds reported by this tracker.
    pub num_seeds: i64,
    /// Peers reported by this tracker.
    pub num_peers: i64,
}

/// Read-only snapshot of a torrent, fetched fresh on each query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentHandle {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// When the torrent was added to the daemon.
    pub added_at: DateTime<Utc>,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Connected or known seeds.
    pub num_seeds: i64,
    /// Connected or known peers.
    pub num_peers: i64,
    /// Aggregate tracker status text, may be empty.
    pub status_message: String,
    /// Seconds until the next scheduled announce (None when the backend
    /// cannot report it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_announce_secs: Option<i64>,
}

impl TorrentHandle {
    /// Age of the torrent relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.added_at)
    }
}

/// Trait for torrent client backends.
///
/// All operations are idempotent from the caller's perspective and safe to
/// retry.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch a torrent snapshot by hash.
    async fn fetch_torrent(&self, hash: &str) -> Result<TorrentHandle, TorrentClientError>;

    /// Fetch the per-tracker status records for a torrent, in daemon order.
    async fn fetch_trackers(&self, hash: &str) -> Result<Vec<TrackerRecord>, TorrentClientError>;

    /// Ask the daemon to re-contact the torrent's trackers immediately.
    async fn force_reannounce(&self, hash: &str) -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_status_as_str() {
        assert_eq!(TrackerStatus::Disabled.as_str(), "Disabled");
        assert_eq!(TrackerStatus::NotContacted.as_str(), "NotContacted");
        assert_eq!(TrackerStatus::Ok.as_str(), "OK");
        assert_eq!(TrackerStatus::Updating.as_str(), "Updating");
        assert_eq!(TrackerStatus::NotWorking.as_str(), "NotWorking");
    }

    #[test]
    fn test_tracker_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TrackerStatus::NotWorking).unwrap(),
            "\"not_working\""
        );
        assert_eq!(serde_json::to_string(&TrackerStatus::Ok).unwrap(), "\"ok\"");
    }

    #[test]
    fn test_handle_age() {
        let now = Utc::now();
        let handle = TorrentHandle {
            hash: "abc123".to_string(),
            name: "Test Torrent".to_string(),
            added_at: now - chrono::Duration::seconds(90),
            progress: 0.5,
            num_seeds: 3,
            num_peers: 7,
            status_message: String::new(),
            next_announce_secs: Some(120),
        };

        assert_eq!(handle.age(now).num_seconds(), 90);
    }

    #[test]
    fn test_handle_serialization_roundtrip() {
        let handle = TorrentHandle {
            hash: "abc123".to_string(),
            name: "Test Torrent".to_string(),
            added_at: Utc::now(),
            progress: 1.0,
            num_seeds: 12,
            num_peers: 4,
            status_message: "Announce OK".to_string(),
            next_announce_secs: None,
        };

        let json = serde_json::to_string(&handle).unwrap();
        let parsed: TorrentHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.hash, "abc123");
        assert_eq!(parsed.next_announce_secs, None);
    }
}
