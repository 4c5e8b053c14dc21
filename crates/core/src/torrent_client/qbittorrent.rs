//! qBittorrent torrent client implementation (WebUI API v2).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{TorrentClient, TorrentClientError, TorrentHandle, TrackerRecord, TrackerStatus};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (refreshed on auth failure); the actual cookie lives
    /// in the reqwest cookie jar.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and mark the session authenticated.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
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

    /// Make an authenticated GET request.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.as_u16() == 403 {
            // Session expired, retry after login
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.as_u16() == 403 {
            // Session expired, retry after login
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

/// qBittorrent torrent info response (subset).
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    num_seeds: i64,
    num_leechs: i64,
    added_on: i64,
}

/// qBittorrent torrent properties response (subset).
#[derive(Debug, Deserialize)]
struct QBTorrentProperties {
    /// Seconds until next announce.
    reannounce: i64,
}

/// qBittorrent tracker row.
#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
    status: i32,
    msg: String,
    num_seeds: i64,
    num_peers: i64,
}

impl QBTracker {
    fn into_record(self) -> TrackerRecord {
        TrackerRecord {
            url: self.url,
            status: parse_qb_tracker_status(self.status),
            message: self.msg,
            num_seeds: self.num_seeds,
            num_peers: self.num_peers,
        }
    }
}

/// Map qBittorrent's tracker status integer to TrackerStatus.
///
/// 0 disabled (DHT/PeX/LSD), 1 not contacted, 2 working, 3 updating,
/// 4 not working. Unknown values are treated as not working so they never
/// read as healthy.
fn parse_qb_tracker_status(status: i32) -> TrackerStatus {
    match status {
        0 => TrackerStatus::Disabled,
        1 => TrackerStatus::NotContacted,
        2 => TrackerStatus::Ok,
        3 => TrackerStatus::Updating,
        _ => TrackerStatus::NotWorking,
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn fetch_torrent(&self, hash: &str) -> Result<TorrentHandle, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let endpoint = format!("/api/v2/torrents/info?hashes={}", hash_lower);
        let response = self.get(&endpoint).await?;

        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        let info = torrents
            .into_iter()
            .next()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))?;

        // The reannounce countdown lives in the per-torrent properties
        // endpoint. Older servers lack it, so a failure here degrades the
        // snapshot rather than failing the fetch.
        let next_announce_secs = match self
            .get(&format!("/api/v2/torrents/properties?hash={}", hash_lower))
            .await
        {
            Ok(body) => serde_json::from_str::<QBTorrentProperties>(&body)
                .ok()
                .map(|p| p.reannounce),
            Err(e) => {
                debug!("qBittorrent properties unavailable for {}: {}", hash, e);
                None
            }
        };

        Ok(TorrentHandle {
            hash: info.hash.to_lowercase(),
            name: info.name,
            added_at: Utc
                .timestamp_opt(info.added_on, 0)
                .single()
                .unwrap_or_else(Utc::now),
            progress: info.progress,
            num_seeds: info.num_seeds,
            num_peers: info.num_leechs,
            status_message: info.state,
            next_announce_secs,
        })
    }

    async fn fetch_trackers(&self, hash: &str) -> Result<Vec<TrackerRecord>, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let endpoint = format!("/api/v2/torrents/trackers?hash={}", hash_lower);
        let response = self.get(&endpoint).await?;

        let trackers: Vec<QBTracker> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(trackers.into_iter().map(|t| t.into_record()).collect())
    }

    async fn force_reannounce(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        self.post_form("/api/v2/torrents/reannounce", &[("hashes", hash_lower.as_str())])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qb_tracker_status() {
        assert_eq!(parse_qb_tracker_status(0), TrackerStatus::Disabled);
        assert_eq!(parse_qb_tracker_status(1), TrackerStatus::NotContacted);
        assert_eq!(parse_qb_tracker_status(2), TrackerStatus::Ok);
        assert_eq!(parse_qb_tracker_status(3), TrackerStatus::Updating);
        assert_eq!(parse_qb_tracker_status(4), TrackerStatus::NotWorking);
    }

    #[test]
    fn test_parse_qb_tracker_status_unknown_is_not_working() {
        assert_eq!(parse_qb_tracker_status(9), TrackerStatus::NotWorking);
        assert_eq!(parse_qb_tracker_status(-1), TrackerStatus::NotWorking);
    }

    #[test]
    fn test_tracker_row_conversion() {
        let row: QBTracker = serde_json::from_str(
            r#"{
                "url": "http://tracker.example.org:6969/announce",
                "status": 4,
                "msg": "torrent not registered with this tracker",
                "num_seeds": 0,
                "num_peers": 0
            }"#,
        )
        .unwrap();

        let record = row.into_record();
        assert_eq!(record.status, TrackerStatus::NotWorking);
        assert_eq!(record.message, "torrent not registered with this tracker");
        assert_eq!(record.url, "http://tracker.example.org:6969/announce");
    }

    #[test]
    fn test_torrent_info_parse() {
        let infos: Vec<QBTorrentInfo> = serde_json::from_str(
            r#"[{
                "hash": "ABC123",
                "name": "Test Torrent",
                "state": "stalledDL",
                "progress": 0.25,
                "num_seeds": 2,
                "num_leechs": 5,
                "added_on": 1703980800
            }]"#,
        )
        .unwrap();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "Test Torrent");
        assert_eq!(infos[0].added_on, 1703980800);
    }
}
