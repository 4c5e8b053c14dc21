//! Deluge torrent client implementation (web UI JSON-RPC).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::DelugeConfig;

use super::{TorrentClient, TorrentClientError, TorrentHandle, TrackerRecord, TrackerStatus};

/// Status keys requested from core.get_torrent_status.
const STATUS_KEYS: &[&str] = &[
    "name",
    "time_added",
    "tracker_status",
    "next_announce",
    "num_seeds",
    "total_seeds",
    "num_peers",
    "total_peers",
    "progress",
    "trackers",
];

/// Deluge web JSON-RPC error code for a missing session.
const NOT_AUTHENTICATED: i64 = 1;

/// Deluge client implementation.
pub struct DelugeClient {
    client: Client,
    config: DelugeConfig,
    /// Session marker (refreshed on auth failure); the session cookie lives
    /// in the reqwest cookie jar.
    session: Arc<RwLock<Option<String>>>,
    request_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
    code: i64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

impl DelugeClient {
    /// Create a new Deluge client.
    pub fn new(config: DelugeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
            request_id: AtomicU64::new(1),
        }
    }

    fn rpc_url(&self) -> String {
        format!("{}/json", self.config.url.trim_end_matches('/'))
    }

    /// Login and mark the session authenticated.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let result = self
            .rpc_call("auth.login", json!([self.config.password]))
            .await?;

        if result.as_bool() == Some(true) {
            debug!("Deluge login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid password".to_string(),
            ))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Issue one JSON-RPC call without auth handling.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, TorrentClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "method": method, "params": params, "id": id });

        let response = self
            .client
            .post(self.rpc_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if let Some(err) = rpc.error {
            if err.code == NOT_AUTHENTICATED {
                return Err(TorrentClientError::AuthenticationFailed(err.message));
            }
            return Err(TorrentClientError::ApiError(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }

        Ok(rpc.result.unwrap_or(Value::Null))
    }

    /// Issue an authenticated JSON-RPC call, re-logging-in once on a stale
    /// session.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TorrentClientError> {
        self.ensure_authenticated().await?;

        match self.rpc_call(method, params.clone()).await {
            Err(TorrentClientError::AuthenticationFailed(_)) => {
                warn!("Deluge session expired, re-authenticating");
                {
                    let mut session = self.session.write().await;
                    *session = None;
                }
                self.login().await?;
                self.rpc_call(method, params).await
            }
            other => other,
        }
    }

    async fn torrent_status(&self, hash: &str) -> Result<DelugeTorrentStatus, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let result = self
            .call(
                "core.get_torrent_status",
                json!([hash_lower, STATUS_KEYS]),
            )
            .await?;

        // Deluge returns an empty dict for unknown hashes.
        if result.as_object().is_none_or(|o| o.is_empty()) {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        }

        serde_json::from_value(result)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))
    }
}

/// core.get_torrent_status response (subset).
#[derive(Debug, Deserialize)]
struct DelugeTorrentStatus {
    name: String,
    time_added: f64,
    #[serde(default)]
    tracker_status: String,
    #[serde(default)]
    next_announce: i64,
    #[serde(default)]
    num_seeds: i64,
    #[serde(default)]
    total_seeds: i64,
    #[serde(default)]
    num_peers: i64,
    #[serde(default)]
    total_peers: i64,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    trackers: Vec<DelugeTrackerEntry>,
}

#[derive(Debug, Deserialize)]
struct DelugeTrackerEntry {
    url: String,
}

impl DelugeTorrentStatus {
    fn into_handle(self, hash: &str) -> TorrentHandle {
        TorrentHandle {
            hash: hash.to_lowercase(),
            name: self.name,
            added_at: Utc
                .timestamp_opt(self.time_added as i64, 0)
                .single()
                .unwrap_or_else(Utc::now),
            // Deluge reports progress as 0-100.
            progress: self.progress / 100.0,
            num_seeds: self.num_seeds.max(self.total_seeds),
            num_peers: self.total_peers.max(self.num_peers),
            status_message: self.tracker_status,
            next_announce_secs: Some(self.next_announce),
        }
    }
}

/// Derive a TrackerStatus from Deluge's aggregate tracker_status string.
///
/// Deluge has no per-tracker status table; the daemon reports one line of
/// text for the active tracker, e.g. "Announce OK", "Announce Sent" or
/// "Error: unregistered torrent".
fn parse_deluge_tracker_status(message: &str) -> TrackerStatus {
    let msg = message.to_lowercase();
    if msg.is_empty() {
        TrackerStatus::NotContacted
    } else if msg.contains("announce ok") {
        TrackerStatus::Ok
    } else if msg.contains("announce sent") {
        TrackerStatus::Updating
    } else if msg.contains("error") || msg.contains("warning") {
        TrackerStatus::NotWorking
    } else {
        TrackerStatus::NotContacted
    }
}

#[async_trait]
impl TorrentClient for DelugeClient {
    fn name(&self) -> &str {
        "deluge"
    }

    async fn fetch_torrent(&self, hash: &str) -> Result<TorrentHandle, TorrentClientError> {
        let status = self.torrent_status(hash).await?;
        Ok(status.into_handle(hash))
    }

    async fn fetch_trackers(&self, hash: &str) -> Result<Vec<TrackerRecord>, TorrentClientError> {
        let status = self.torrent_status(hash).await?;

        let tracker_status = parse_deluge_tracker_status(&status.tracker_status);
        let num_seeds = status.num_seeds.max(status.total_seeds);
        let num_peers = status.total_peers.max(status.num_peers);

        // The aggregate status applies to every configured tracker row.
        Ok(status
            .trackers
            .into_iter()
            .map(|t| TrackerRecord {
                url: t.url,
                status: tracker_status,
                message: status.tracker_status.clone(),
                num_seeds,
                num_peers,
            })
            .collect())
    }

    async fn force_reannounce(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.call("core.force_reannounce", json!([[hash_lower]]))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deluge_tracker_status() {
        assert_eq!(parse_deluge_tracker_status(""), TrackerStatus::NotContacted);
        assert_eq!(
            parse_deluge_tracker_status("Announce OK"),
            TrackerStatus::Ok
        );
        assert_eq!(
            parse_deluge_tracker_status("Announce Sent"),
            TrackerStatus::Updating
        );
        assert_eq!(
            parse_deluge_tracker_status("Error: unregistered torrent"),
            TrackerStatus::NotWorking
        );
        assert_eq!(
            parse_deluge_tracker_status("Warning: tracker timeout"),
            TrackerStatus::NotWorking
        );
    }

    #[test]
    fn test_status_into_handle() {
        let status: DelugeTorrentStatus = serde_json::from_str(
            r#"{
                "name": "Test Torrent",
                "time_added": 1703980800.0,
                "tracker_status": "Announce OK",
                "next_announce": 1680,
                "num_seeds": 1,
                "total_seeds": 14,
                "num_peers": 2,
                "total_peers": 9,
                "progress": 42.5,
                "trackers": [{"url": "http://tracker.example.org/announce"}]
            }"#,
        )
        .unwrap();

        let handle = status.into_handle("ABC123");
        assert_eq!(handle.hash, "abc123");
        assert_eq!(handle.num_seeds, 14);
        assert_eq!(handle.num_peers, 9);
        assert!((handle.progress - 0.425).abs() < 1e-9);
        assert_eq!(handle.next_announce_secs, Some(1680));
        assert_eq!(handle.added_at.timestamp(), 1703980800);
    }

    #[test]
    fn test_status_missing_fields_default() {
        let status: DelugeTorrentStatus = serde_json::from_str(
            r#"{"name": "Bare", "time_added": 1703980800.0}"#,
        )
        .unwrap();

        assert_eq!(status.tracker_status, "");
        assert!(status.trackers.is_empty());
    }

    #[test]
    fn test_rpc_error_parse() {
        let rpc: RpcResponse = serde_json::from_str(
            r#"{"result": null, "error": {"message": "Not authenticated", "code": 1}, "id": 3}"#,
        )
        .unwrap();

        let err = rpc.error.unwrap();
        assert_eq!(err.code, NOT_AUTHENTICATED);
        assert_eq!(err.message, "Not authenticated");
    }
}
